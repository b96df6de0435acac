// src/config/mod.rs

//! Configuration loading and validation for stylewatch.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a config file from disk (`loader.rs`).
//! - Validate references between targets and aliases (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{load_and_validate, load_from_path, parse_str};
pub use model::{ConfigFile, ConfigSection, LessTarget, WatchOptions, WatchTarget};
