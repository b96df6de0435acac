// src/errors.rs

//! Crate-wide error aliases and helpers.

use thiserror::Error;

use crate::compile::CompileError;

#[derive(Error, Debug)]
pub enum StylewatchError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Task not found: {0}")]
    TaskNotFound(String),

    #[error("Cycle detected in task aliases: {0}")]
    AliasCycle(String),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    Compile(#[from] CompileError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, StylewatchError>;
