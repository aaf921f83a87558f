use clap::{Args as ClapArgs, Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};

/// Command line arguments for ATCommander
#[derive(Parser, Debug)]
#[command(
    name = "atcommander",
    version = env!("CARGO_PKG_VERSION"),
    about = "AT command bench tool for cellular modems",
    long_about = "A bench tool for exercising AT-command modems over a serial port, with single command sends, scripted command sequences and live unsolicited notification monitoring."
)]
pub struct Args {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress diagnostic logging
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Configuration file path
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    pub output: OutputFormat,

    /// Command to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Send a single AT command and print its response
    Send(SendArgs),
    /// Script playback and inspection
    Script(ScriptArgs),
    /// Interactive monitor mode
    Monitor(MonitorArgs),
    /// List available serial ports
    Ports,
    /// Command catalog inspection
    Catalog(CatalogArgs),
    /// Configuration management commands
    Config(ConfigArgs),
    /// Display version information
    Version,
}

/// Output format options
#[derive(ValueEnum, Debug, Clone, Serialize, Deserialize)]
pub enum OutputFormat {
    /// Human-readable text output
    Text,
    /// JSON output
    Json,
    /// Table output
    Table,
}

/// Single command send arguments
#[derive(ClapArgs, Debug)]
pub struct SendArgs {
    /// AT command text
    pub command: String,

    /// Serial port path (overrides the settings source)
    #[arg(short, long)]
    pub port: Option<String>,

    /// Baud rate (default 115200)
    #[arg(short, long)]
    pub baud: Option<u32>,

    /// Response deadline in milliseconds
    #[arg(short, long)]
    pub timeout_ms: Option<u64>,

    /// Tee the transcript to a log file
    #[arg(short, long)]
    pub log: Option<String>,
}

/// Script arguments
#[derive(ClapArgs, Debug)]
pub struct ScriptArgs {
    /// Script subcommand
    #[command(subcommand)]
    pub command: ScriptCommand,
}

/// Monitor mode arguments
#[derive(ClapArgs, Debug)]
pub struct MonitorArgs {
    /// Serial port path (overrides the settings source)
    #[arg(short, long)]
    pub port: Option<String>,

    /// Baud rate (default 115200)
    #[arg(short, long)]
    pub baud: Option<u32>,

    /// Disable the unsolicited notification tailer
    #[arg(long)]
    pub no_tail: bool,

    /// Tee the transcript to a log file
    #[arg(short, long)]
    pub log: Option<String>,
}

/// Catalog arguments
#[derive(ClapArgs, Debug)]
pub struct CatalogArgs {
    /// Catalog subcommand
    #[command(subcommand)]
    pub command: CatalogCommand,
}

/// Configuration management arguments
#[derive(ClapArgs, Debug)]
pub struct ConfigArgs {
    /// Configuration subcommand
    #[command(subcommand)]
    pub command: ConfigCommand,
}

/// Script subcommands
#[derive(Subcommand, Debug)]
pub enum ScriptCommand {
    /// Play a script against the modem
    Run {
        /// Script name from the registry, or a .script file path
        name: String,
        /// Serial port path (overrides the settings source)
        #[arg(short, long)]
        port: Option<String>,
        /// Baud rate (default 115200)
        #[arg(short, long)]
        baud: Option<u32>,
        /// Tee the transcript to a log file
        #[arg(short, long)]
        log: Option<String>,
    },
    /// List loaded scripts
    List,
    /// Show a script's directives
    Show {
        /// Script name
        name: String,
    },
}

/// Catalog subcommands
#[derive(Subcommand, Debug)]
pub enum CatalogCommand {
    /// List the command catalog
    List,
    /// Show one catalog entry
    Show {
        /// Catalog command text
        command: String,
    },
}

/// Configuration management subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Show current configuration
    Show,
    /// Validate configuration
    Validate {
        /// Configuration file path
        file: Option<String>,
    },
    /// Create default configuration
    Init {
        /// Output directory path
        #[arg(short, long)]
        output: Option<String>,
        /// Global configuration
        #[arg(short, long)]
        global: bool,
    },
}

impl Default for OutputFormat {
    fn default() -> Self {
        Self::Text
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Table => write!(f, "table"),
        }
    }
}
