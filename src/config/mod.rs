//! Configuration Module
//!
//! Loads and validates configuration from TOML files and the environment.

pub mod loader;

pub use loader::{
    config_from_env, load_config, Config, ConfigError, EndpointEntry, DEFAULT_RPC_URL,
};
