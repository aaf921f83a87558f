// Serial module - Hardware serial channel implementation
pub mod channel;

pub use channel::SerialChannel;
