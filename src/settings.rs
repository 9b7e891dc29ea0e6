//! Program settings for lvcgym.
//!
//! Settings are read from INI-format files with the following precedence:
//!
//! 1. Local configuration (`./lvcgym_config.cfg`)
//! 2. User configuration (`~/.config/lvcgym/lvcgym_config.cfg`)
//! 3. System configuration (`/etc/lvcgym/lvcgym_config.cfg`)
//! 4. Built-in defaults
//!
//! Each file only needs the values it changes; everything else is inherited
//! from the lower-precedence layers.
//!
//! # Configuration File Format
//!
//! ```ini
//! [general]
//! print_level = 0
//! overwrite = true
//!
//! [output]
//! template_file = LVC.template
//! sidecar_file = changed_parameters
//! directory_list = setup_directories
//! parameters_file = parameters.json
//! molden_file = init.molden
//!
//! [logging]
//! level = info
//! file_logging = false
//! ```
//!
//! # Usage
//!
//! ```no_run
//! use lvcgym::settings::SettingsManager;
//!
//! let settings = SettingsManager::load()?;
//! println!("Templates are written to {}", settings.output().template_file);
//! # Ok::<(), lvcgym::settings::ConfigError>(())
//! ```

use configparser::ini::Ini;
use log::{debug, info, warn, LevelFilter};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Name of the settings file at every configuration layer.
pub const SETTINGS_FILE: &str = "lvcgym_config.cfg";

/// Errors that can occur during configuration loading and processing.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// I/O error when reading configuration files
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// INI parsing error
    #[error("INI parsing error: {0}")]
    IniParse(String),
    /// Invalid configuration value
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

/// Main configuration structure containing all program settings.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Settings {
    /// General program settings
    pub general: GeneralSettings,
    /// Names of the files written by the sweeps
    pub output: OutputSettings,
    /// Logging configuration
    pub logging: LoggingSettings,
}

/// General program settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GeneralSettings {
    /// Print level for progress output (default: 0)
    /// 0 = quiet, 1 = normal, 2 = verbose (list every written file)
    pub print_level: u32,
    /// Reuse non-empty output directories when the input file does not say
    /// otherwise (default: true)
    pub overwrite: bool,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            print_level: 0,
            overwrite: true,
        }
    }
}

/// File names used inside the loop directories.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OutputSettings {
    /// Reduced Hamiltonian template (default: "LVC.template")
    pub template_file: String,
    /// Removed-parameter sidecar (default: "changed_parameters")
    pub sidecar_file: String,
    /// List of created directories at the loop root (default: "setup_directories")
    pub directory_list: String,
    /// Per-trajectory option record (default: "parameters.json")
    pub parameters_file: String,
    /// Masked molden copy (default: "init.molden")
    pub molden_file: String,
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            template_file: "LVC.template".to_string(),
            sidecar_file: "changed_parameters".to_string(),
            directory_list: "setup_directories".to_string(),
            parameters_file: "parameters.json".to_string(),
            molden_file: "init.molden".to_string(),
        }
    }
}

/// Logging configuration settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingSettings {
    /// Log level (default: "info")
    pub level: String,
    /// Enable file-based logging (default: false)
    /// When enabled, lvcgym_<input_basename>.log receives a start line and
    /// the JSON run summary
    pub file_logging: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file_logging: false,
        }
    }
}

impl LoggingSettings {
    /// Log filter matching the configured level.
    pub fn level_filter(&self) -> Result<LevelFilter, ConfigError> {
        self.level
            .parse()
            .map_err(|_| ConfigError::InvalidValue(format!("Invalid log level: {}", self.level)))
    }
}

/// Configuration manager that handles loading and accessing program settings.
pub struct SettingsManager {
    settings: Settings,
    config_source: String,
}

impl SettingsManager {
    /// Loads configuration from available configuration files.
    ///
    /// Searches for configuration files in the following order, each layer
    /// overriding the previous one:
    /// 1. `/etc/lvcgym/lvcgym_config.cfg` (system configuration)
    /// 2. `~/.config/lvcgym/lvcgym_config.cfg` (user configuration)
    /// 3. `./lvcgym_config.cfg` (current working directory)
    ///
    /// A layer that fails to parse is reported and skipped.
    pub fn load() -> Result<Self, ConfigError> {
        let mut layers = Vec::new();
        if let Some(system_path) = Self::get_system_config_path() {
            layers.push(("system", system_path));
        }
        if let Some(user_path) = Self::get_user_config_path() {
            layers.push(("user", user_path));
        }
        layers.push(("local", PathBuf::from(SETTINGS_FILE)));

        let mut settings = Settings::default();
        let mut config_source = "built-in defaults".to_string();

        for (label, path) in layers {
            if !path.exists() {
                continue;
            }
            match Self::load_config(&path, &settings) {
                Ok(layered) => {
                    settings = layered;
                    config_source = format!("{} config ({})", label, path.display());
                    debug!("Loaded {} configuration from: {}", label, path.display());
                }
                Err(e) => {
                    warn!(
                        "Failed to load {} config from {}: {}",
                        label,
                        path.display(),
                        e
                    );
                }
            }
        }

        info!("Configuration loaded from: {}", config_source);
        Ok(Self {
            settings,
            config_source,
        })
    }

    /// Builds a manager from a single settings file on top of the defaults.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let settings = Self::load_config(path, &Settings::default())?;
        Ok(Self {
            settings,
            config_source: path.display().to_string(),
        })
    }

    /// Returns the source of the loaded configuration.
    pub fn config_source(&self) -> &str {
        &self.config_source
    }

    /// Gets a reference to the settings.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Gets the general settings.
    pub fn general(&self) -> &GeneralSettings {
        &self.settings.general
    }

    /// Gets the output file names.
    pub fn output(&self) -> &OutputSettings {
        &self.settings.output
    }

    /// Gets the logging settings.
    pub fn logging(&self) -> &LoggingSettings {
        &self.settings.logging
    }

    /// Parses INI text on top of `base`.
    pub fn parse_str(content: &str, base: &Settings) -> Result<Settings, ConfigError> {
        let mut ini = Ini::new();
        ini.read(content.to_string())
            .map_err(|e| ConfigError::IniParse(format!("Failed to parse INI: {}", e)))?;

        let mut settings = base.clone();
        let map = ini.get_map_ref();

        if let Some(general_map) = map.get("general") {
            Self::parse_general(general_map, &mut settings.general)?;
        }
        if let Some(output_map) = map.get("output") {
            Self::parse_output(output_map, &mut settings.output);
        }
        if let Some(logging_map) = map.get("logging") {
            Self::parse_logging(logging_map, &mut settings.logging)?;
        }

        Ok(settings)
    }

    /// Loads configuration from a single INI file on top of `base`.
    fn load_config(path: &Path, base: &Settings) -> Result<Settings, ConfigError> {
        let content = fs::read_to_string(path)?;
        Self::parse_str(&content, base)
    }

    fn parse_general(
        section: &HashMap<String, Option<String>>,
        general: &mut GeneralSettings,
    ) -> Result<(), ConfigError> {
        if let Some(Some(print_level)) = section.get("print_level") {
            general.print_level = print_level.parse().map_err(|_| {
                ConfigError::InvalidValue(format!("Invalid print_level: {}", print_level))
            })?;
        }
        if let Some(Some(overwrite)) = section.get("overwrite") {
            general.overwrite = overwrite.parse().map_err(|_| {
                ConfigError::InvalidValue(format!("Invalid overwrite value: {}", overwrite))
            })?;
        }
        Ok(())
    }

    fn parse_output(section: &HashMap<String, Option<String>>, output: &mut OutputSettings) {
        let fields = [
            ("template_file", &mut output.template_file),
            ("sidecar_file", &mut output.sidecar_file),
            ("directory_list", &mut output.directory_list),
            ("parameters_file", &mut output.parameters_file),
            ("molden_file", &mut output.molden_file),
        ];
        for (key, field) in fields {
            if let Some(Some(value)) = section.get(key) {
                if !value.is_empty() {
                    *field = value.clone();
                }
            }
        }
    }

    fn parse_logging(
        section: &HashMap<String, Option<String>>,
        logging: &mut LoggingSettings,
    ) -> Result<(), ConfigError> {
        if let Some(Some(level)) = section.get("level") {
            logging.level = level.clone();
            logging.level_filter()?;
        }
        if let Some(Some(file_logging)) = section.get("file_logging") {
            logging.file_logging = file_logging.parse().map_err(|_| {
                ConfigError::InvalidValue(format!("Invalid file_logging value: {}", file_logging))
            })?;
        }
        Ok(())
    }

    /// Gets the system configuration file path.
    fn get_system_config_path() -> Option<PathBuf> {
        #[cfg(unix)]
        {
            Some(PathBuf::from("/etc/lvcgym").join(SETTINGS_FILE))
        }
        #[cfg(windows)]
        {
            std::env::var("PROGRAMDATA")
                .ok()
                .map(|pd| PathBuf::from(pd).join("lvcgym").join(SETTINGS_FILE))
        }
    }

    /// Gets the user configuration file path.
    fn get_user_config_path() -> Option<PathBuf> {
        #[cfg(unix)]
        {
            std::env::var("HOME").ok().map(|home| {
                PathBuf::from(home)
                    .join(".config")
                    .join("lvcgym")
                    .join(SETTINGS_FILE)
            })
        }
        #[cfg(windows)]
        {
            std::env::var("APPDATA")
                .ok()
                .map(|appdata| PathBuf::from(appdata).join("lvcgym").join(SETTINGS_FILE))
        }
    }
}

impl SettingsManager {
    /// Creates a commented lvcgym_config.cfg with every option at its default.
    ///
    /// # Arguments
    ///
    /// * `path` - Path where the settings file should be created
    pub fn create_template(path: &Path) -> Result<(), ConfigError> {
        let template_content = Self::generate_template_content();
        fs::write(path, template_content)?;
        info!("Created settings template at: {}", path.display());
        Ok(())
    }

    /// Generates the content for a lvcgym_config.cfg template file.
    pub fn generate_template_content() -> String {
        let general = GeneralSettings::default();
        let output = OutputSettings::default();
        let logging = LoggingSettings::default();

        format!(
            r#"# lvcgym Configuration File
#
# Configuration files are loaded in hierarchical order with local settings taking precedence:
#
# 1. Current working directory (./lvcgym_config.cfg) - highest priority
# 2. User config directory (~/.config/lvcgym/lvcgym_config.cfg)
# 3. System config directory (/etc/lvcgym/lvcgym_config.cfg)
# 4. Built-in defaults (fallback)
#
# Any missing sections or values keep the value of the lower layers.

[general]
# Print level for progress output (default: 0)
# 0 = quiet, 1 = normal, 2 = verbose (list every written file)
print_level = {}

# Reuse output directories that already contain files (default: true)
# The 'overwrite' keyword of the gym input file takes precedence
overwrite = {}

[output]
# Reduced Hamiltonian written into every loop directory
template_file = {}

# Record of removed modes and states in every Hamiltonian loop directory
sidecar_file = {}

# List of created directories, written at the loop root
directory_list = {}

# Surface hopping options of every parameter loop directory
parameters_file = {}

# Molden copy with the frequencies of removed modes set to zero
molden_file = {}

[logging]
# Log level: trace, debug, info, warn, error (default: info)
level = {}

# Write a start line and the JSON run summary to lvcgym_<input_basename>.log
# (default: false)
file_logging = {}
"#,
            general.print_level,
            general.overwrite,
            output.template_file,
            output.sidecar_file,
            output.directory_list,
            output.parameters_file,
            output.molden_file,
            logging.level,
            logging.file_logging,
        )
    }
}
