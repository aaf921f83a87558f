use crate::core::catalog::CommandCatalog;
use crate::core::script::{Script, ScriptRegistry};
use crate::domain::{
    config::{AtCommanderConfig, GlobalConfig, SettingsFile},
    error::{AtCommanderError, AtCommanderResult},
};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

const SETTINGS_FILE: &str = "settings.json";
const CATALOG_FILE: &str = "commands.json";
const SCRIPTS_DIR: &str = "scripts";

/// Configuration manager
pub struct ConfigManager {
    global_config_path: PathBuf,
    project_config_path: Option<PathBuf>,
}

impl ConfigManager {
    /// Create new configuration manager
    pub fn new() -> AtCommanderResult<Self> {
        let global_config_path = Self::get_global_config_path()?;
        let project_config_path = Self::find_project_config_path();

        Ok(Self {
            global_config_path,
            project_config_path,
        })
    }

    /// Load configuration from files
    pub fn load_config(&self) -> AtCommanderResult<AtCommanderConfig> {
        // Start with default configuration
        let mut config = AtCommanderConfig::default();

        // Load global configuration if exists
        if self.global_config_path.exists() {
            let global_config = self.load_config_from_path(&self.global_config_path)?;
            config.global = global_config.global;
        }

        // Project configuration overrides the global layer
        if let Some(project_path) = &self.project_config_path {
            if project_path.exists() {
                let project_config = self.load_config_from_path(project_path)?;
                config.global = project_config.global;
            }
        }

        Ok(config)
    }

    /// Load the serial settings source, if one can be located
    pub fn load_settings(&self, global: &GlobalConfig) -> AtCommanderResult<Option<SettingsFile>> {
        let path = match self.resolve_source(&global.settings_path, SETTINGS_FILE) {
            Some(path) => path,
            None => return Ok(None),
        };

        let content = fs::read_to_string(&path).map_err(|e| AtCommanderError::Config {
            message: format!("Failed to read settings file {}: {}", path.display(), e),
        })?;
        let file = serde_json::from_str(&content).map_err(|e| AtCommanderError::Config {
            message: format!("Failed to parse settings file {}: {}", path.display(), e),
        })?;
        Ok(Some(file))
    }

    /// Load the command catalog, falling back to the built-in set
    pub fn load_catalog(&self, global: &GlobalConfig) -> AtCommanderResult<CommandCatalog> {
        let path = match self.resolve_source(&global.catalog_path, CATALOG_FILE) {
            Some(path) => path,
            None => return Ok(CommandCatalog::default_set()),
        };

        let content = fs::read_to_string(&path).map_err(|e| AtCommanderError::Config {
            message: format!("Failed to read catalog file {}: {}", path.display(), e),
        })?;
        let file: crate::domain::config::CatalogFile =
            serde_json::from_str(&content).map_err(|e| AtCommanderError::Config {
                message: format!("Failed to parse catalog file {}: {}", path.display(), e),
            })?;
        Ok(CommandCatalog::from_entries(&file.commands))
    }

    /// Load every parseable script from the scripts directory.
    ///
    /// A malformed script file is logged and skipped rather than aborting
    /// the whole load.
    pub fn load_scripts(&self, global: &GlobalConfig) -> AtCommanderResult<ScriptRegistry> {
        let mut registry = ScriptRegistry::new();
        let dir = match self.resolve_scripts_dir(global) {
            Some(dir) => dir,
            None => return Ok(registry),
        };

        let entries = fs::read_dir(&dir).map_err(|e| AtCommanderError::Config {
            message: format!("Failed to read scripts directory {}: {}", dir.display(), e),
        })?;

        let mut paths: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.extension().map(|ext| ext == "script").unwrap_or(false))
            .collect();
        paths.sort();

        for path in paths {
            let content = match fs::read_to_string(&path) {
                Ok(content) => content,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "skipping unreadable script");
                    continue;
                }
            };
            match Script::parse(&content) {
                Ok(script) => registry.insert(script),
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "skipping malformed script");
                }
            }
        }

        Ok(registry)
    }

    /// Load configuration from specific path
    pub fn load_config_from_path(&self, path: &Path) -> AtCommanderResult<AtCommanderConfig> {
        let content = fs::read_to_string(path).map_err(|e| AtCommanderError::Config {
            message: format!("Failed to read config file {}: {}", path.display(), e),
        })?;

        toml::from_str(&content).map_err(|e| AtCommanderError::Config {
            message: format!("Failed to parse config file {}: {}", path.display(), e),
        })
    }

    /// Save configuration to specific path
    pub fn save_config_to_path(&self, path: &Path, config: &AtCommanderConfig) -> AtCommanderResult<()> {
        let content = toml::to_string_pretty(config).map_err(|e| AtCommanderError::Config {
            message: format!("Failed to serialize config: {}", e),
        })?;

        fs::write(path, content).map_err(|e| AtCommanderError::Config {
            message: format!("Failed to write config file {}: {}", path.display(), e),
        })
    }

    /// Scaffold a project configuration under the given directory
    pub fn init_project_config(&self, path: &Path) -> AtCommanderResult<()> {
        let config_dir = path.join(".atcommander");
        let config_file = config_dir.join("config.toml");

        if config_file.exists() {
            return Err(AtCommanderError::Config {
                message: "Project configuration already exists".to_string(),
            });
        }

        let scripts_dir = config_dir.join(SCRIPTS_DIR);
        fs::create_dir_all(&scripts_dir).map_err(|e| AtCommanderError::Config {
            message: format!("Failed to create .atcommander directory: {}", e),
        })?;

        self.save_config_to_path(&config_file, &AtCommanderConfig::default())?;

        let settings_file = config_dir.join(SETTINGS_FILE);
        fs::write(&settings_file, SAMPLE_SETTINGS).map_err(|e| AtCommanderError::Config {
            message: format!("Failed to write settings file {}: {}", settings_file.display(), e),
        })?;

        let script_file = scripts_dir.join("identity.script");
        fs::write(&script_file, SAMPLE_SCRIPT).map_err(|e| AtCommanderError::Config {
            message: format!("Failed to write script file {}: {}", script_file.display(), e),
        })?;

        Ok(())
    }

    /// Get the current project config path (if any)
    pub fn get_project_config_path(&self) -> Option<&PathBuf> {
        self.project_config_path.as_ref()
    }

    /// Get the global config path
    pub fn get_global_config_path_ref(&self) -> &PathBuf {
        &self.global_config_path
    }

    // Private methods

    /// Get global configuration path
    fn get_global_config_path() -> AtCommanderResult<PathBuf> {
        let home = dirs::home_dir().ok_or_else(|| AtCommanderError::Config {
            message: "Could not determine home directory".to_string(),
        })?;

        Ok(home.join(".config").join("atcommander").join("config.toml"))
    }

    /// Find project configuration path by walking up directory tree
    fn find_project_config_path() -> Option<PathBuf> {
        let current_dir = std::env::current_dir().ok()?;
        let mut path = current_dir.as_path();

        loop {
            let config_path = path.join(".atcommander").join("config.toml");
            if config_path.exists() {
                return Some(config_path);
            }

            path = path.parent()?;
        }
    }

    /// Parent of the discovered `.atcommander` directory, if any
    fn project_dir(&self) -> Option<&Path> {
        self.project_config_path
            .as_deref()
            .and_then(|config| config.parent())
    }

    /// Resolve a data source: explicit path wins, then the project
    /// directory, then the working directory.
    fn resolve_source(&self, explicit: &Option<PathBuf>, file_name: &str) -> Option<PathBuf> {
        if let Some(path) = explicit {
            return Some(path.clone());
        }
        if let Some(project_dir) = self.project_dir() {
            let candidate = project_dir.join(file_name);
            if candidate.exists() {
                return Some(candidate);
            }
        }
        let local = PathBuf::from(file_name);
        if local.exists() {
            return Some(local);
        }
        None
    }

    fn resolve_scripts_dir(&self, global: &GlobalConfig) -> Option<PathBuf> {
        if let Some(dir) = &global.scripts_dir {
            return Some(dir.clone());
        }
        if let Some(project_dir) = self.project_dir() {
            let candidate = project_dir.join(SCRIPTS_DIR);
            if candidate.is_dir() {
                return Some(candidate);
            }
        }
        let local = PathBuf::from(SCRIPTS_DIR);
        if local.is_dir() {
            return Some(local);
        }
        None
    }
}

const SAMPLE_SETTINGS: &str = r#"{
    "settings": [
        { "enable": "false", "port": "/dev/ttyACM0", "baudrate": 115200 }
    ]
}
"#;

const SAMPLE_SCRIPT: &str = r#"// Query basic modem identity
[NAME] "identity"
[DESC] "Read manufacturer, model and revision"
[START]
AT+CGMI
AT+CGMM
[WAIT] 1
AT+CGMR
[END]
"#;
