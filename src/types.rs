// src/types.rs

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

/// Behaviour when a new trigger arrives while a compile run is in progress.
///
/// - `Queue`: remember the trigger and start a new run when the current one
///   finishes (default behaviour).
/// - `Cancel`: drop any previously queued run and only keep the latest
///   trigger. The running compile itself always completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TriggerWhileRunningBehaviour {
    #[default]
    Queue,
    Cancel,
}

impl FromStr for TriggerWhileRunningBehaviour {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "queue" => Ok(TriggerWhileRunningBehaviour::Queue),
            "cancel" => Ok(TriggerWhileRunningBehaviour::Cancel),
            other => Err(format!(
                "invalid triggered_while_running_behaviour: {other} (expected \"queue\" or \"cancel\")"
            )),
        }
    }
}

/// Kind of filesystem change a watch target reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WatchEventKind {
    Added,
    Deleted,
    Changed,
}

impl WatchEventKind {
    pub const ALL: [WatchEventKind; 3] = [
        WatchEventKind::Added,
        WatchEventKind::Deleted,
        WatchEventKind::Changed,
    ];
}

impl fmt::Display for WatchEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WatchEventKind::Added => "added",
            WatchEventKind::Deleted => "deleted",
            WatchEventKind::Changed => "changed",
        };
        f.write_str(name)
    }
}

impl FromStr for WatchEventKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "added" => Ok(WatchEventKind::Added),
            "deleted" => Ok(WatchEventKind::Deleted),
            "changed" => Ok(WatchEventKind::Changed),
            other => Err(format!(
                "invalid watch event: {other} (expected \"added\", \"deleted\", \"changed\" or \"all\")"
            )),
        }
    }
}
