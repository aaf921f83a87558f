use crate::cli::args::{
    Args, CatalogCommand, Command, ConfigCommand, MonitorArgs, ScriptCommand, SendArgs,
};
use crate::cli::output::{ConsoleSink, ConsoleWriter, FanoutSink, FileSink, OutputWriter};
use crate::core::channel::{Channel, ChannelGate};
use crate::core::dispatch::spawn_worker;
use crate::core::player::ScriptPlayer;
use crate::core::script::Script;
use crate::core::sink::OutputSink;
use crate::core::stamp::{now_stamp, StampMode};
use crate::core::tailer::NotificationTailer;
use crate::core::transaction::TransactionEngine;
use crate::domain::config::{AtCommanderConfig, PortSettings, SettingsFile};
use crate::domain::error::AtCommanderError;
use crate::infrastructure::config::ConfigManager;
use crate::infrastructure::logging::init_logging;
use crate::infrastructure::serial::SerialChannel;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncBufReadExt;
use tracing::{debug, warn};

/// Baud rate used when neither the CLI nor the settings source names one
const DEFAULT_BAUD: u32 = 115200;

/// Read timeout handed to the serial layer
const SERIAL_TIMEOUT: Duration = Duration::from_millis(100);

/// Execute CLI command
pub async fn execute_command(args: Args) -> Result<(), AtCommanderError> {
    let writer = ConsoleWriter::new(args.output.clone());

    // Load configuration using ConfigManager
    let config_manager = ConfigManager::new()?;
    let config = if let Some(config_path) = &args.config {
        config_manager.load_config_from_path(config_path.as_ref())?
    } else {
        config_manager.load_config()?
    };

    // Initialize logging
    if !args.quiet {
        init_logging(&config.global, args.verbose)?;
    }

    match args.command {
        Command::Send(send_args) => {
            execute_send(send_args, &config, &config_manager).await
        }
        Command::Script(script_args) => {
            execute_script_command(script_args, &writer, &config, &config_manager).await
        }
        Command::Monitor(monitor_args) => {
            execute_monitor(monitor_args, &writer, &config, &config_manager).await
        }
        Command::Ports => execute_ports(&writer).await,
        Command::Catalog(catalog_args) => {
            execute_catalog_command(catalog_args, &writer, &config, &config_manager).await
        }
        Command::Config(config_args) => {
            execute_config_command(config_args, &writer, &config, &config_manager).await
        }
        Command::Version => {
            writer.write_message(&format!("atcommander {}", env!("CARGO_PKG_VERSION")))?;
            Ok(())
        }
    }
}

async fn execute_send(
    args: SendArgs,
    config: &AtCommanderConfig,
    config_manager: &ConfigManager,
) -> Result<(), AtCommanderError> {
    let settings = config_manager.load_settings(&config.global)?;
    let resolved = resolve_port(&args.port, args.baud, &settings)?;
    let catalog = config_manager.load_catalog(&config.global)?;

    let sink = build_sink(&args.log, &config.global.log_dir)?;
    let channel: Arc<dyn Channel> = Arc::new(SerialChannel::new());
    let gate = Arc::new(ChannelGate::new());

    open_channel(&channel, &resolved, &sink).await?;

    let deadline = args.timeout_ms.unwrap_or(config.global.response_timeout_ms);
    let engine = TransactionEngine::new(Arc::clone(&channel), Arc::clone(&gate), Arc::clone(&sink))
        .with_deadline(Duration::from_millis(deadline))
        .with_poll_interval(Duration::from_millis(config.global.poll_interval_ms));

    let command = catalog.resolve(&args.command);
    let outcome = engine.submit(&command).await;

    close_channel(&channel, &resolved, &sink).await;
    outcome?;
    Ok(())
}

async fn execute_script_command(
    args: crate::cli::args::ScriptArgs,
    writer: &ConsoleWriter,
    config: &AtCommanderConfig,
    config_manager: &ConfigManager,
) -> Result<(), AtCommanderError> {
    match args.command {
        ScriptCommand::Run {
            name,
            port,
            baud,
            log,
        } => {
            let registry = config_manager.load_scripts(&config.global)?;
            let script = match registry.find(&name) {
                Some(script) => script.clone(),
                None => {
                    // A registry miss may still be a direct file path
                    let path = Path::new(&name);
                    if path.is_file() {
                        let content =
                            fs::read_to_string(path).map_err(|e| AtCommanderError::Script {
                                message: format!(
                                    "Failed to read script file {}: {}",
                                    path.display(),
                                    e
                                ),
                            })?;
                        Script::parse(&content)?
                    } else {
                        writer.write_error(&format!("Script '{}' not found", name))?;
                        return Ok(());
                    }
                }
            };

            let settings = config_manager.load_settings(&config.global)?;
            let resolved = resolve_port(&port, baud, &settings)?;
            let sink = build_sink(&log, &config.global.log_dir)?;
            let channel: Arc<dyn Channel> = Arc::new(SerialChannel::new());
            let gate = Arc::new(ChannelGate::new());

            open_channel(&channel, &resolved, &sink).await?;

            let player = Arc::new(
                ScriptPlayer::new(Arc::clone(&channel), Arc::clone(&gate), Arc::clone(&sink))
                    .with_settle(Duration::from_millis(config.global.settle_delay_ms))
                    .with_pacing(Duration::from_millis(config.global.pacing_ms)),
            );

            // Playback runs on its own task, the CLI just waits for it
            let playback = {
                let player = Arc::clone(&player);
                tokio::spawn(async move { player.play(&script).await })
            };
            let outcome = playback.await;

            close_channel(&channel, &resolved, &sink).await;
            match outcome {
                Ok(result) => {
                    result?;
                    Ok(())
                }
                Err(join_err) => Err(AtCommanderError::Script {
                    message: format!("Script playback task failed: {}", join_err),
                }),
            }
        }
        ScriptCommand::List => {
            let registry = config_manager.load_scripts(&config.global)?;
            writer.write_scripts(registry.scripts())?;
            Ok(())
        }
        ScriptCommand::Show { name } => {
            let registry = config_manager.load_scripts(&config.global)?;
            match registry.find(&name) {
                Some(script) => writer.write_script_detail(script)?,
                None => writer.write_error(&format!("Script '{}' not found", name))?,
            }
            Ok(())
        }
    }
}

async fn execute_monitor(
    args: MonitorArgs,
    writer: &ConsoleWriter,
    config: &AtCommanderConfig,
    config_manager: &ConfigManager,
) -> Result<(), AtCommanderError> {
    let settings = config_manager.load_settings(&config.global)?;
    let resolved = resolve_port(&args.port, args.baud, &settings)?;
    let catalog = config_manager.load_catalog(&config.global)?;
    let registry = config_manager.load_scripts(&config.global)?;

    let sink = build_sink(&args.log, &config.global.log_dir)?;
    let channel: Arc<dyn Channel> = Arc::new(SerialChannel::new());
    let gate = Arc::new(ChannelGate::new());

    open_channel(&channel, &resolved, &sink).await?;

    let engine = Arc::new(
        TransactionEngine::new(Arc::clone(&channel), Arc::clone(&gate), Arc::clone(&sink))
            .with_deadline(Duration::from_millis(config.global.response_timeout_ms))
            .with_poll_interval(Duration::from_millis(config.global.poll_interval_ms)),
    );
    let player = Arc::new(
        ScriptPlayer::new(Arc::clone(&channel), Arc::clone(&gate), Arc::clone(&sink))
            .with_settle(Duration::from_millis(config.global.settle_delay_ms))
            .with_pacing(Duration::from_millis(config.global.pacing_ms)),
    );
    let tailer = NotificationTailer::new(Arc::clone(&channel), Arc::clone(&gate), Arc::clone(&sink));
    if !args.no_tail {
        tailer.enable().await;
    }

    let (queue, worker) = spawn_worker(Arc::clone(&engine), Arc::clone(&player));

    writer.write_message(
        "Monitor mode: type an AT command, :run <script> to play a script, :tail on|off to toggle notifications, :quit to exit",
    )?;

    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    let mut lines = stdin.lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line == ":quit" || line == ":q" {
            break;
        }
        if line == ":run" {
            writer.write_error("Usage: :run <script>")?;
            continue;
        }
        if let Some(rest) = line.strip_prefix(":run ") {
            let name = rest.trim();
            match registry.find(name) {
                Some(script) => {
                    if !queue.submit_script(script.clone()) {
                        break;
                    }
                }
                None => writer.write_error(&format!("Script '{}' not found", name))?,
            }
            continue;
        }
        if let Some(rest) = line.strip_prefix(":tail ") {
            match rest.trim() {
                "on" => tailer.enable().await,
                "off" => tailer.disable().await,
                _ => writer.write_error("Usage: :tail on|off")?,
            }
            continue;
        }
        if line.starts_with(':') {
            writer.write_error(&format!("Unknown directive '{}'", line))?;
            continue;
        }
        if !queue.submit_command(catalog.resolve(line)) {
            break;
        }
    }

    tailer.disable().await;
    drop(queue);
    if let Err(err) = worker.await {
        warn!(error = %err, "work queue task failed");
    }
    close_channel(&channel, &resolved, &sink).await;
    Ok(())
}

async fn execute_ports(writer: &ConsoleWriter) -> Result<(), AtCommanderError> {
    let ports = serialport::available_ports()?;
    writer.write_ports(&ports)?;
    Ok(())
}

async fn execute_catalog_command(
    args: crate::cli::args::CatalogArgs,
    writer: &ConsoleWriter,
    config: &AtCommanderConfig,
    config_manager: &ConfigManager,
) -> Result<(), AtCommanderError> {
    let catalog = config_manager.load_catalog(&config.global)?;
    match args.command {
        CatalogCommand::List => {
            writer.write_catalog(catalog.commands())?;
            Ok(())
        }
        CatalogCommand::Show { command } => {
            match catalog.find(&command) {
                Some(entry) => writer.write_catalog_entry(entry)?,
                None => writer.write_error(&format!("Command '{}' is not in the catalog", command))?,
            }
            Ok(())
        }
    }
}

async fn execute_config_command(
    args: crate::cli::args::ConfigArgs,
    writer: &ConsoleWriter,
    config: &AtCommanderConfig,
    config_manager: &ConfigManager,
) -> Result<(), AtCommanderError> {
    match args.command {
        ConfigCommand::Show => {
            writer.write_config(config)?;
            Ok(())
        }
        ConfigCommand::Validate { file } => {
            if let Some(config_path) = file {
                match config_manager.load_config_from_path(config_path.as_ref()) {
                    Ok(_) => writer
                        .write_message(&format!("Configuration file '{}' is valid", config_path))?,
                    Err(e) => {
                        writer.write_error(&format!("Configuration validation failed: {}", e))?
                    }
                }
            } else {
                match config_manager.load_config() {
                    Ok(_) => writer.write_message("Current configuration is valid")?,
                    Err(e) => {
                        writer.write_error(&format!("Configuration validation failed: {}", e))?
                    }
                }
            }
            Ok(())
        }
        ConfigCommand::Init { output, global } => {
            if global {
                let global_path = config_manager.get_global_config_path_ref();
                if let Some(parent) = global_path.parent() {
                    fs::create_dir_all(parent).map_err(|e| AtCommanderError::Config {
                        message: format!("Failed to create config directory: {}", e),
                    })?;
                }
                config_manager.save_config_to_path(global_path, &AtCommanderConfig::default())?;
                writer.write_message(&format!(
                    "Global configuration initialized at '{}'",
                    global_path.display()
                ))?;
            } else if let Some(output_path) = output {
                config_manager.init_project_config(output_path.as_ref())?;
                writer.write_message(&format!(
                    "Project configuration initialized at '{}'",
                    output_path
                ))?;
            } else {
                let current_dir = std::env::current_dir().map_err(|e| AtCommanderError::Config {
                    message: format!("Failed to get current directory: {}", e),
                })?;
                config_manager.init_project_config(&current_dir)?;
                writer.write_message("Project configuration initialized in current directory")?;
            }
            Ok(())
        }
    }
}

// Private methods

/// Explicit CLI port wins, then the first enabled settings record.
fn resolve_port(
    cli_port: &Option<String>,
    cli_baud: Option<u32>,
    settings: &Option<SettingsFile>,
) -> Result<PortSettings, AtCommanderError> {
    if let Some(port) = cli_port {
        return Ok(PortSettings {
            port: port.clone(),
            baud: cli_baud.unwrap_or(DEFAULT_BAUD),
        });
    }
    if let Some(settings) = settings {
        if let Some(resolved) = settings.resolve() {
            return Ok(PortSettings {
                port: resolved.port,
                baud: cli_baud.unwrap_or(resolved.baud),
            });
        }
    }
    Err(AtCommanderError::InvalidInput(
        "No serial port selected".to_string(),
    ))
}

/// Console sink, teed to a log file when requested or configured.
fn build_sink(
    log: &Option<String>,
    log_dir: &Option<PathBuf>,
) -> Result<Arc<dyn OutputSink>, AtCommanderError> {
    let console: Arc<dyn OutputSink> = Arc::new(ConsoleSink);
    let file = match log {
        Some(path) => Some(FileSink::create(path)?),
        None => match log_dir {
            Some(dir) => {
                fs::create_dir_all(dir)?;
                Some(FileSink::in_dir(dir)?)
            }
            None => None,
        },
    };
    Ok(match file {
        Some(file) => Arc::new(FanoutSink::new(vec![console, Arc::new(file)])),
        None => console,
    })
}

async fn open_channel(
    channel: &Arc<dyn Channel>,
    resolved: &PortSettings,
    sink: &Arc<dyn OutputSink>,
) -> Result<(), AtCommanderError> {
    match channel.open(&resolved.port, resolved.baud, SERIAL_TIMEOUT).await {
        Ok(()) => {
            emit(
                sink,
                &format!(
                    "{} connected: port={} baud={}",
                    now_stamp(StampMode::Display),
                    resolved.port,
                    resolved.baud
                ),
            );
            Ok(())
        }
        Err(err) => {
            emit(
                sink,
                &format!(
                    "{} !! Failed to open serial device, please check your connection and settings.",
                    now_stamp(StampMode::Display)
                ),
            );
            Err(AtCommanderError::Channel(err))
        }
    }
}

async fn close_channel(
    channel: &Arc<dyn Channel>,
    resolved: &PortSettings,
    sink: &Arc<dyn OutputSink>,
) {
    match channel.close().await {
        Ok(()) => emit(
            sink,
            &format!(
                "{} disconnected: port={}",
                now_stamp(StampMode::Display),
                resolved.port
            ),
        ),
        Err(err) => debug!(error = %err, "close after run failed"),
    }
}

fn emit(sink: &Arc<dyn OutputSink>, line: &str) {
    if let Err(err) = sink.emit(line) {
        warn!(error = %err, "output sink rejected line");
    }
}
