// src/watch/mod.rs

//! File watching and change detection.
//!
//! This module is responsible for:
//! - Compiling `files` / `exclude` glob patterns per watch target.
//! - Wiring up a cross-platform filesystem watcher (`notify`).
//! - Debouncing bursts of events and (optionally) skipping targets whose
//!   watched content did not actually change.
//!
//! It only turns filesystem changes into compile triggers; running them is
//! the engine's job.

pub mod cache;
pub mod event_handler;
pub mod hash;
pub mod path_utils;
pub mod patterns;
pub mod watcher;

pub use event_handler::{classify_event, ChangeFilter, Debouncer};
pub use patterns::{build_profiles_from_config, WatchProfile};
pub use watcher::{spawn_watcher, WatcherHandle};
