use thiserror::Error;

/// ATCommander unified error type
#[derive(Error, Debug)]
pub enum AtCommanderError {
    #[error("Serial port error: {0}")]
    Serial(#[from] serialport::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Script error: {message}")]
    Script { message: String },

    #[error("Channel error: {0}")]
    Channel(#[from] ChannelError),

    #[error("Transaction failed: {0}")]
    Transaction(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Output error: {0}")]
    Output(String),
}

pub type AtCommanderResult<T> = Result<T, AtCommanderError>;

/// Transport-level failure on the serial channel
#[derive(Error, Debug)]
pub enum ChannelError {
    #[error("Channel is already open")]
    AlreadyOpen,

    #[error("Channel is not open")]
    NotOpen,

    #[error("Serial device unavailable: {0}")]
    DeviceUnavailable(String),

    #[error("Serial I/O error: {0}")]
    Io(#[from] std::io::Error),
}
