use std::path::PathBuf;

use crate::identity::MonitorIdentity;

/// Failure of a profile or switch operation.
///
/// Every variant is terminal for the current invocation. Nothing is retried
/// and a partially applied layout is never rolled back.
#[derive(Debug, thiserror::Error)]
pub enum ProfileError {
    #[error("invalid profile name '{0}' (allowed: letters, digits, '_' and '-')")]
    InvalidProfileName(String),

    #[error("profile '{0}' does not exist")]
    ProfileNotFound(String),

    #[error("profile '{name}' is corrupt: {reason}")]
    CorruptProfile { name: String, reason: String },

    #[error("profile '{profile}' requires {} monitor(s) that are not connected", missing.len())]
    MonitorUnavailable {
        profile: String,
        missing: Vec<MonitorIdentity>,
    },

    #[error("no stored profile matches the connected monitors")]
    NoAutoMatch,

    #[error("hook {hook} failed: {status}")]
    HookFailure { hook: String, status: String },

    #[error("display backend failed: {0}")]
    BackendFailure(String),

    #[error("profile storage error at {}", path.display())]
    Storage {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ProfileError {
    pub(crate) fn storage(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Storage {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn corrupt(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::CorruptProfile {
            name: name.into(),
            reason: reason.into(),
        }
    }
}
