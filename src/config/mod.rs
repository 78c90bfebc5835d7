//! Configuration module for parport.
//!
//! This module provides TOML-based configuration with environment variable overrides.
//!
//! # Configuration Resolution
//!
//! Configuration is loaded from the following locations (in order of priority):
//!
//! 1. `PARPORT_CONFIG` environment variable (explicit path)
//! 2. `./parport.toml` (current directory)
//! 3. `~/.config/parport/parport.toml` (XDG)
//! 4. Built-in defaults (no file required)
//!
//! # Environment Overrides
//!
//! Any configuration value can be overridden via environment variables.
//! The pattern is: `PARPORT_<SECTION>_<KEY>`
//!
//! Examples:
//! - `PARPORT_PORTS_SLOT0=/dev/parport2`
//! - `PARPORT_LOGGING_LEVEL=debug`
//!
//! # Example
//!
//! ```rust,no_run
//! use parport_manager::config::ConfigLoader;
//!
//! let loader = ConfigLoader::load()?;
//! let config = loader.config();
//!
//! println!("Write port: {}", config.ports.addresses[1]);
//! # Ok::<(), parport_manager::config::ConfigError>(())
//! ```

mod error;
mod loader;
mod schema;

pub use error::{ConfigError, ConfigResult};
pub use loader::{get_default_config_path, resolve_config_path, ConfigLoader};
pub use schema::{Config, LogFormat, LoggingConfig, PortsConfig};
