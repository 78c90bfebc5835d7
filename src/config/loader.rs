//! Configuration loader with file resolution and environment override support.

use super::error::{ConfigError, ConfigResult};
use super::schema::{Config, LogFormat};
use std::path::{Path, PathBuf};

/// Environment variable prefix for overrides
const ENV_PREFIX: &str = "PARPORT";

/// Config file name
const CONFIG_FILE_NAME: &str = "parport.toml";

/// Environment variable for explicit config path
const CONFIG_PATH_ENV: &str = "PARPORT_CONFIG";

/// Configuration loader with resolution and override logic.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    /// Resolved config file path (if any)
    pub config_path: Option<PathBuf>,
    /// The loaded configuration
    pub config: Config,
}

impl ConfigLoader {
    /// Load configuration using standard resolution order.
    ///
    /// Resolution priority (highest to lowest):
    /// 1. `PARPORT_CONFIG` environment variable (explicit path)
    /// 2. `./parport.toml` (current directory)
    /// 3. `$XDG_CONFIG_HOME/parport/parport.toml` or `~/.config/parport/parport.toml`
    /// 4. Built-in defaults (no file required)
    ///
    /// Environment variables can override any config file values.
    pub fn load() -> ConfigResult<Self> {
        let config_path = resolve_config_path();

        let mut config = if let Some(ref path) = config_path {
            load_from_file(path)?
        } else {
            Config::default()
        };

        apply_env_overrides(&mut config)?;
        config.validate()?;

        Ok(Self { config_path, config })
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref().to_path_buf();
        if !path.exists() {
            return Err(ConfigError::NotFound(path));
        }
        let mut config = load_from_file(&path)?;
        apply_env_overrides(&mut config)?;
        config.validate()?;

        Ok(Self {
            config_path: Some(path),
            config,
        })
    }

    /// Create a loader with default configuration (no file).
    pub fn with_defaults() -> Self {
        let mut config = Config::default();
        // Still apply env overrides even with defaults, but never end up invalid
        if apply_env_overrides(&mut config).is_err() || config.validate().is_err() {
            config = Config::default();
        }

        Self {
            config_path: None,
            config,
        }
    }

    /// Get the loaded configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Consume the loader and return the configuration.
    pub fn into_config(self) -> Config {
        self.config
    }
}

/// Resolve the configuration file path using standard locations.
pub fn resolve_config_path() -> Option<PathBuf> {
    // 1. Explicit environment variable
    if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
        let path = PathBuf::from(path);
        if path.exists() {
            return Some(path);
        }
    }

    // 2. Current directory
    let cwd_config = PathBuf::from(CONFIG_FILE_NAME);
    if cwd_config.exists() {
        return Some(cwd_config);
    }

    // 3. XDG config directory
    if let Some(config_dir) = get_config_dir() {
        let app_config = config_dir.join("parport").join(CONFIG_FILE_NAME);
        if app_config.exists() {
            return Some(app_config);
        }
    }

    // 4. No config file found - will use defaults
    None
}

/// Get the platform-specific config directory.
fn get_config_dir() -> Option<PathBuf> {
    std::env::var("XDG_CONFIG_HOME")
        .ok()
        .map(PathBuf::from)
        .or_else(|| {
            std::env::var("HOME")
                .ok()
                .map(|h| PathBuf::from(h).join(".config"))
        })
}

/// Load configuration from a file.
fn load_from_file(path: &Path) -> ConfigResult<Config> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
        path: path.to_path_buf(),
        source: e,
    })?;

    toml::from_str(&content).map_err(ConfigError::ParseError)
}

/// Apply environment variable overrides to the configuration.
///
/// Environment variables follow the pattern: `PARPORT_<SECTION>_<KEY>`
/// For example:
/// - `PARPORT_PORTS_SLOT0=/dev/parport2`
/// - `PARPORT_LOGGING_LEVEL=debug`
/// - `PARPORT_LOGGING_FORMAT=json`
fn apply_env_overrides(config: &mut Config) -> ConfigResult<()> {
    // Port overrides
    for (index, address) in config.ports.addresses.iter_mut().enumerate() {
        if let Ok(val) = std::env::var(format!("{}_PORTS_SLOT{}", ENV_PREFIX, index)) {
            *address = val;
        }
    }

    // Logging overrides
    if let Ok(val) = std::env::var(format!("{}_LOGGING_LEVEL", ENV_PREFIX)) {
        config.logging.level = val;
    }
    if let Ok(val) = std::env::var(format!("{}_LOGGING_FORMAT", ENV_PREFIX)) {
        config.logging.format = val.parse::<LogFormat>().map_err(|message| {
            ConfigError::env_parse(format!("{}_LOGGING_FORMAT", ENV_PREFIX), message)
        })?;
    }

    Ok(())
}

/// Get the default config file path for creating new config files.
pub fn get_default_config_path() -> Option<PathBuf> {
    get_config_dir().map(|d| d.join("parport").join(CONFIG_FILE_NAME))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::env;
    use std::io::Write;

    #[test]
    #[serial]
    fn test_default_loader() {
        let loader = ConfigLoader::with_defaults();
        assert_eq!(loader.config().ports.addresses[1], "/dev/parport1");
        assert!(loader.config_path.is_none());
    }

    #[test]
    #[serial]
    fn test_env_override() {
        env::set_var("PARPORT_PORTS_SLOT2", "/dev/parport7");
        env::set_var("PARPORT_LOGGING_LEVEL", "debug");

        let loader = ConfigLoader::with_defaults();
        assert_eq!(loader.config().ports.addresses[2], "/dev/parport7");
        assert_eq!(loader.config().logging.level, "debug");

        // Clean up
        env::remove_var("PARPORT_PORTS_SLOT2");
        env::remove_var("PARPORT_LOGGING_LEVEL");
    }

    #[test]
    #[serial]
    fn test_bad_env_format_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[logging]\nlevel = \"warn\"").unwrap();
        env::set_var("PARPORT_LOGGING_FORMAT", "xml");

        let err = ConfigLoader::load_from(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::EnvParseError { .. }));

        // with_defaults falls back instead of failing
        assert_eq!(
            ConfigLoader::with_defaults().config().logging.format,
            LogFormat::Pretty
        );

        env::remove_var("PARPORT_LOGGING_FORMAT");
    }

    #[test]
    #[serial]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[ports]\naddresses = [\"/dev/pp-a\", \"/dev/pp-b\", \"/dev/pp-c\"]\n\n[logging]\nformat = \"compact\""
        )
        .unwrap();

        let loader = ConfigLoader::load_from(file.path()).unwrap();
        assert_eq!(loader.config().ports.addresses[0], "/dev/pp-a");
        assert_eq!(loader.config().logging.format, LogFormat::Compact);
        assert_eq!(loader.config_path.as_deref(), Some(file.path()));
    }

    #[test]
    #[serial]
    fn test_load_from_missing_file() {
        let err = ConfigLoader::load_from("/nonexistent/parport.toml").unwrap_err();
        assert!(matches!(err, ConfigError::NotFound(_)));
    }

    #[test]
    #[serial]
    fn test_load_rejects_duplicate_addresses() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[ports]\naddresses = [\"/dev/parport0\", \"/dev/parport0\", \"/dev/parport4\"]"
        )
        .unwrap();

        let err = ConfigLoader::load_from(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError { .. }));
    }

    #[test]
    #[serial]
    fn test_config_path_env() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[logging]\nlevel = \"trace\"").unwrap();
        env::set_var("PARPORT_CONFIG", file.path());

        assert_eq!(resolve_config_path().as_deref(), Some(file.path()));
        let loader = ConfigLoader::load().unwrap();
        assert_eq!(loader.config().logging.level, "trace");

        env::remove_var("PARPORT_CONFIG");
    }
}
