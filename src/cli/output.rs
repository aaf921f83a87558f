use crate::cli::args::OutputFormat;
use crate::core::catalog::Command;
use crate::core::player::DEFAULT_PACING_MS;
use crate::core::script::{Directive, Script};
use crate::core::sink::OutputSink;
use crate::core::stamp::{now_stamp, StampMode};
use crate::domain::config::AtCommanderConfig;
use serde::Serialize;
use serde_json;
use serialport::{SerialPortInfo, SerialPortType};
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tabled::{Table, Tabled};

/// Output writer trait for different formats
pub trait OutputWriter {
    fn write_ports(&self, ports: &[SerialPortInfo]) -> Result<(), OutputError>;
    fn write_catalog(&self, commands: &[Command]) -> Result<(), OutputError>;
    fn write_catalog_entry(&self, command: &Command) -> Result<(), OutputError>;
    fn write_scripts(&self, scripts: &[Script]) -> Result<(), OutputError>;
    fn write_script_detail(&self, script: &Script) -> Result<(), OutputError>;
    fn write_config(&self, config: &AtCommanderConfig) -> Result<(), OutputError>;
    fn write_message(&self, message: &str) -> Result<(), OutputError>;
    fn write_error(&self, error: &str) -> Result<(), OutputError>;
}

/// Output formatting errors
#[derive(Debug, thiserror::Error)]
pub enum OutputError {
    #[error("JSON serialization error: {0}")]
    JsonError(#[from] serde_json::Error),
    #[error("IO error: {0}")]
    IoError(#[from] io::Error),
}

impl From<OutputError> for crate::domain::error::AtCommanderError {
    fn from(err: OutputError) -> Self {
        Self::Output(err.to_string())
    }
}

/// Console output writer
pub struct ConsoleWriter {
    format: OutputFormat,
}

impl ConsoleWriter {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }
}

impl OutputWriter for ConsoleWriter {
    fn write_ports(&self, ports: &[SerialPortInfo]) -> Result<(), OutputError> {
        let rows: Vec<PortRow> = ports.iter().map(PortRow::from).collect();
        match self.format {
            OutputFormat::Text => {
                if rows.is_empty() {
                    println!("No serial ports found");
                } else {
                    println!("Available serial ports:");
                    for row in &rows {
                        println!("  {} ({})", row.name, row.kind);
                    }
                }
            }
            OutputFormat::Json => {
                println!("{}", serde_json::to_string_pretty(&rows)?);
            }
            OutputFormat::Table => {
                if !rows.is_empty() {
                    println!("{}", Table::new(rows));
                }
            }
        }
        Ok(())
    }

    fn write_catalog(&self, commands: &[Command]) -> Result<(), OutputError> {
        let rows: Vec<CatalogRow> = commands.iter().map(CatalogRow::from).collect();
        match self.format {
            OutputFormat::Text => {
                for command in commands {
                    print_command_text(command);
                    println!();
                }
            }
            OutputFormat::Json => {
                println!("{}", serde_json::to_string_pretty(&rows)?);
            }
            OutputFormat::Table => {
                if !rows.is_empty() {
                    println!("{}", Table::new(rows));
                }
            }
        }
        Ok(())
    }

    fn write_catalog_entry(&self, command: &Command) -> Result<(), OutputError> {
        match self.format {
            OutputFormat::Text => {
                print_command_text(command);
            }
            OutputFormat::Json => {
                println!("{}", serde_json::to_string_pretty(&CatalogRow::from(command))?);
            }
            OutputFormat::Table => {
                println!("{}", Table::new(vec![CatalogRow::from(command)]));
            }
        }
        Ok(())
    }

    fn write_scripts(&self, scripts: &[Script]) -> Result<(), OutputError> {
        let rows: Vec<ScriptRow> = scripts.iter().map(ScriptRow::from).collect();
        match self.format {
            OutputFormat::Text => {
                if scripts.is_empty() {
                    println!("No scripts loaded");
                }
                for script in scripts {
                    println!("Script: {}", script.name);
                    if !script.description.is_empty() {
                        println!("  Description: {}", script.description);
                    }
                    println!("  Commands: {}", script.send_count());
                    println!("  Pacing: {}ms", pacing_ms(script));
                    println!();
                }
            }
            OutputFormat::Json => {
                println!("{}", serde_json::to_string_pretty(&rows)?);
            }
            OutputFormat::Table => {
                if !rows.is_empty() {
                    println!("{}", Table::new(rows));
                }
            }
        }
        Ok(())
    }

    fn write_script_detail(&self, script: &Script) -> Result<(), OutputError> {
        match self.format {
            OutputFormat::Text => {
                println!("Script: {}", script.name);
                if !script.description.is_empty() {
                    println!("  Description: {}", script.description);
                }
                println!("  Pacing: {}ms", pacing_ms(script));
                println!("  Directives:");
                for directive in &script.directives {
                    match directive {
                        Directive::SendCommand(text) => println!("    send {}", text),
                        Directive::Wait(seconds) => println!("    wait {}s", seconds),
                    }
                }
            }
            OutputFormat::Json => {
                let directives: Vec<String> = script
                    .directives
                    .iter()
                    .map(|directive| match directive {
                        Directive::SendCommand(text) => format!("send {}", text),
                        Directive::Wait(seconds) => format!("wait {}s", seconds),
                    })
                    .collect();
                let output = serde_json::json!({
                    "name": script.name,
                    "description": script.description,
                    "pacing_ms": pacing_ms(script),
                    "directives": directives,
                });
                println!("{}", serde_json::to_string_pretty(&output)?);
            }
            OutputFormat::Table => {
                let rows: Vec<DirectiveRow> = script
                    .directives
                    .iter()
                    .enumerate()
                    .map(|(index, directive)| DirectiveRow::new(index + 1, directive))
                    .collect();
                if !rows.is_empty() {
                    println!("{}", Table::new(rows));
                }
            }
        }
        Ok(())
    }

    fn write_config(&self, config: &AtCommanderConfig) -> Result<(), OutputError> {
        match self.format {
            OutputFormat::Text => {
                println!("ATCommander Configuration:");
                println!("  Log level: {}", config.global.log_level);
                println!("  Response timeout: {}ms", config.global.response_timeout_ms);
                println!("  Poll interval: {}ms", config.global.poll_interval_ms);
                println!("  Settle delay: {}ms", config.global.settle_delay_ms);
                println!("  Pacing: {}ms", config.global.pacing_ms);
                if let Some(path) = &config.global.settings_path {
                    println!("  Settings source: {}", path.display());
                }
                if let Some(path) = &config.global.catalog_path {
                    println!("  Catalog source: {}", path.display());
                }
                if let Some(dir) = &config.global.scripts_dir {
                    println!("  Scripts directory: {}", dir.display());
                }
                if let Some(dir) = &config.global.log_dir {
                    println!("  Log directory: {}", dir.display());
                }
            }
            OutputFormat::Json => {
                println!("{}", serde_json::to_string_pretty(config)?);
            }
            OutputFormat::Table => {
                let rows = config_rows(config);
                println!("{}", Table::new(rows));
            }
        }
        Ok(())
    }

    fn write_message(&self, message: &str) -> Result<(), OutputError> {
        match self.format {
            OutputFormat::Json => {
                let output = serde_json::json!({
                    "message": message,
                    "level": "info"
                });
                println!("{}", serde_json::to_string_pretty(&output)?);
            }
            _ => {
                println!("{}", message);
            }
        }
        Ok(())
    }

    fn write_error(&self, error: &str) -> Result<(), OutputError> {
        match self.format {
            OutputFormat::Json => {
                let output = serde_json::json!({
                    "error": error,
                    "level": "error"
                });
                eprintln!("{}", serde_json::to_string_pretty(&output)?);
            }
            _ => {
                eprintln!("Error: {}", error);
            }
        }
        Ok(())
    }
}

fn print_command_text(command: &Command) {
    println!("Command: {}", command.text);
    if let Some(hint) = &command.hint {
        println!("  Description: {}", hint);
    }
    println!(
        "  Response: {}",
        if command.single_line {
            "single line"
        } else {
            "multi line"
        }
    );
    if let Some(ignore) = &command.ignore {
        println!("  Ignore: {}", ignore);
    }
}

fn config_rows(config: &AtCommanderConfig) -> Vec<ConfigRow> {
    let mut rows = vec![
        ConfigRow::new("log_level", config.global.log_level.clone()),
        ConfigRow::new("response_timeout_ms", config.global.response_timeout_ms),
        ConfigRow::new("poll_interval_ms", config.global.poll_interval_ms),
        ConfigRow::new("settle_delay_ms", config.global.settle_delay_ms),
        ConfigRow::new("pacing_ms", config.global.pacing_ms),
    ];
    if let Some(path) = &config.global.settings_path {
        rows.push(ConfigRow::new("settings_path", path.display()));
    }
    if let Some(path) = &config.global.catalog_path {
        rows.push(ConfigRow::new("catalog_path", path.display()));
    }
    if let Some(dir) = &config.global.scripts_dir {
        rows.push(ConfigRow::new("scripts_dir", dir.display()));
    }
    if let Some(dir) = &config.global.log_dir {
        rows.push(ConfigRow::new("log_dir", dir.display()));
    }
    rows
}

/// Table row for a serial port
#[derive(Tabled, Serialize)]
struct PortRow {
    name: String,
    kind: String,
}

impl From<&SerialPortInfo> for PortRow {
    fn from(info: &SerialPortInfo) -> Self {
        Self {
            name: info.port_name.clone(),
            kind: describe_port_type(&info.port_type),
        }
    }
}

fn describe_port_type(port_type: &SerialPortType) -> String {
    match port_type {
        SerialPortType::UsbPort(info) => {
            let mut kind = format!("USB {:04x}:{:04x}", info.vid, info.pid);
            if let Some(product) = &info.product {
                kind.push(' ');
                kind.push_str(product);
            }
            kind
        }
        SerialPortType::PciPort => "PCI".to_string(),
        SerialPortType::BluetoothPort => "Bluetooth".to_string(),
        SerialPortType::Unknown => "unknown".to_string(),
    }
}

/// Table row for a catalog command
#[derive(Tabled, Serialize)]
struct CatalogRow {
    command: String,
    description: String,
    response: String,
    ignore: String,
}

impl From<&Command> for CatalogRow {
    fn from(command: &Command) -> Self {
        Self {
            command: command.text.clone(),
            description: command.hint.clone().unwrap_or_default(),
            response: if command.single_line {
                "single line".to_string()
            } else {
                "multi line".to_string()
            },
            ignore: command.ignore.clone().unwrap_or_default(),
        }
    }
}

/// Table row for a script summary
#[derive(Tabled, Serialize)]
struct ScriptRow {
    name: String,
    description: String,
    commands: usize,
    pacing_ms: u64,
}

impl From<&Script> for ScriptRow {
    fn from(script: &Script) -> Self {
        Self {
            name: script.name.clone(),
            description: script.description.clone(),
            commands: script.send_count(),
            pacing_ms: pacing_ms(script),
        }
    }
}

/// Pacing shown for a script, default applied when no `[DELAY]` is set.
fn pacing_ms(script: &Script) -> u64 {
    script
        .pacing
        .map(|pacing| pacing.as_millis() as u64)
        .unwrap_or(DEFAULT_PACING_MS)
}

/// Table row for a script directive
#[derive(Tabled)]
struct DirectiveRow {
    step: usize,
    action: String,
    value: String,
}

impl DirectiveRow {
    fn new(step: usize, directive: &Directive) -> Self {
        match directive {
            Directive::SendCommand(text) => Self {
                step,
                action: "send".to_string(),
                value: text.clone(),
            },
            Directive::Wait(seconds) => Self {
                step,
                action: "wait".to_string(),
                value: format!("{}s", seconds),
            },
        }
    }
}

/// Table row for a configuration setting
#[derive(Tabled)]
struct ConfigRow {
    setting: String,
    value: String,
}

impl ConfigRow {
    fn new(setting: &str, value: impl ToString) -> Self {
        Self {
            setting: setting.to_string(),
            value: value.to_string(),
        }
    }
}

/// Transcript sink that prints to stdout
pub struct ConsoleSink;

impl OutputSink for ConsoleSink {
    fn emit(&self, line: &str) -> io::Result<()> {
        let mut stdout = io::stdout().lock();
        writeln!(stdout, "{}", line)?;
        stdout.flush()
    }
}

/// Transcript sink that appends to a log file
pub struct FileSink {
    file: Mutex<std::fs::File>,
    path: PathBuf,
}

impl FileSink {
    /// Open (or create) the given log file for appending.
    pub fn create(path: impl Into<PathBuf>) -> io::Result<Self> {
        let path = path.into();
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self {
            file: Mutex::new(file),
            path,
        })
    }

    /// Create a stamped `at_<stamp>.log` file in the given directory.
    pub fn in_dir(dir: &Path) -> io::Result<Self> {
        let name = format!("at_{}.log", now_stamp(StampMode::FileName));
        Self::create(dir.join(name))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl OutputSink for FileSink {
    fn emit(&self, line: &str) -> io::Result<()> {
        let mut file = self
            .file
            .lock()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "log file lock poisoned"))?;
        writeln!(file, "{}", line)
    }
}

/// Transcript sink that duplicates lines to several sinks.
///
/// A failing member does not stop the others; the first error is reported
/// after every sink has seen the line.
pub struct FanoutSink {
    sinks: Vec<Arc<dyn OutputSink>>,
}

impl FanoutSink {
    pub fn new(sinks: Vec<Arc<dyn OutputSink>>) -> Self {
        Self { sinks }
    }
}

impl OutputSink for FanoutSink {
    fn emit(&self, line: &str) -> io::Result<()> {
        let mut first_err = None;
        for sink in &self.sinks {
            if let Err(err) = sink.emit(line) {
                if first_err.is_none() {
                    first_err = Some(err);
                }
            }
        }
        match first_err {
            None => Ok(()),
            Some(err) => Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::sink::MemorySink;
    use tempfile::TempDir;

    struct FailingSink;

    impl OutputSink for FailingSink {
        fn emit(&self, _line: &str) -> io::Result<()> {
            Err(io::Error::new(io::ErrorKind::Other, "sink rejected line"))
        }
    }

    #[test]
    fn test_file_sink_appends_lines() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("transcript.log");

        let sink = FileSink::create(&path).unwrap();
        sink.emit("-> AT+CGMI").unwrap();
        sink.emit("<- Nordic Semiconductor ASA").unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, "-> AT+CGMI\n<- Nordic Semiconductor ASA\n");
    }

    #[test]
    fn test_file_sink_stamped_name() {
        let temp_dir = TempDir::new().unwrap();
        let sink = FileSink::in_dir(temp_dir.path()).unwrap();

        let name = sink.path().file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("at_"));
        assert!(name.ends_with(".log"));
        sink.emit("-> AT").unwrap();
    }

    #[test]
    fn test_fanout_keeps_going_after_failure() {
        let memory = Arc::new(MemorySink::new());
        let fanout = FanoutSink::new(vec![
            Arc::new(FailingSink) as Arc<dyn OutputSink>,
            memory.clone() as Arc<dyn OutputSink>,
        ]);

        let result = fanout.emit("<! +CEREG: 1");
        assert!(result.is_err());
        assert_eq!(memory.lines(), vec!["<! +CEREG: 1"]);
    }
}
