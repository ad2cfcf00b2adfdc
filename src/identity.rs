//! Monitor identity retrieval
//!
//! A [`MonitorSource`] enumerates display ports and where their identity
//! data lives. An [`IdentityReader`] turns that data into a canonical
//! [`MonitorIdentity`]. Missing data is never an error: the port simply has
//! no identity and drops out of every fingerprint.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use tracing::{debug, warn};

use crate::constants::hardware;

/// Canonical identity of one physical monitor.
///
/// Always whitespace-normalized and free of newlines, so a fingerprint can
/// store one identity per line.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MonitorIdentity(String);

impl MonitorIdentity {
    /// Normalize `raw` into an identity. Returns `None` when nothing but
    /// whitespace remains.
    pub fn new(raw: &str) -> Option<Self> {
        let normalized = normalize_whitespace(raw);
        if normalized.is_empty() {
            None
        } else {
            Some(Self(normalized))
        }
    }

    #[cfg(test)]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MonitorIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Collapse every whitespace run into a single space and trim both ends
pub fn normalize_whitespace(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// One display port as seen by the kernel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Port {
    /// Connector name, e.g. `HDMI-A-1`
    pub connector: String,
    /// File holding the raw identity data (EDID)
    pub identity_path: PathBuf,
    /// Output is administratively enabled
    pub enabled: bool,
}

/// Enumerates display ports
pub trait MonitorSource {
    fn ports(&self) -> Vec<Port>;
}

/// Reads the canonical identity of the monitor behind a port
pub trait IdentityReader {
    fn read(&self, port: &Port) -> Option<MonitorIdentity>;
}

/// Port enumeration over the DRM connector tree (`/sys/class/drm`)
#[derive(Debug, Clone)]
pub struct SysfsSource {
    root: PathBuf,
}

impl SysfsSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl MonitorSource for SysfsSource {
    fn ports(&self) -> Vec<Port> {
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(path = %self.root.display(), error = %e, "Cannot read DRM connector directory");
                return Vec::new();
            }
        };

        let mut ports = Vec::new();
        for entry in entries.flatten() {
            let dir = entry.path();
            let file_name = entry.file_name().to_string_lossy().into_owned();

            // Connectors are named card<N>-<connector>; card<N> itself has no edid
            let Some((_card, connector)) = file_name.split_once('-') else {
                continue;
            };

            let identity_path = dir.join(hardware::EDID_FILE);
            if !identity_path.exists() {
                continue;
            }

            let enabled = fs::read_to_string(dir.join(hardware::ENABLED_FILE))
                .map(|state| state.trim() == hardware::ENABLED_VALUE)
                .unwrap_or(false);

            debug!(connector = %connector, enabled, "Discovered display port");
            ports.push(Port {
                connector: connector.to_string(),
                identity_path,
                enabled,
            });
        }
        ports
    }
}

/// Built-in decoder: the raw EDID bytes rendered as lowercase hex
#[derive(Debug, Clone, Copy, Default)]
pub struct EdidHexReader;

impl IdentityReader for EdidHexReader {
    fn read(&self, port: &Port) -> Option<MonitorIdentity> {
        let bytes = fs::read(&port.identity_path).ok()?;
        if bytes.is_empty() {
            return None;
        }
        let hex: String = bytes.iter().map(|b| format!("{b:02x}")).collect();
        MonitorIdentity::new(&hex)
    }
}

/// Decoder override: a shell command receiving the identity file path as `$1`.
///
/// Spawn failures, non-zero exits and empty output all mean "no identity".
#[derive(Debug, Clone)]
pub struct CommandIdentityReader {
    command: String,
}

impl CommandIdentityReader {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }

    fn run(&self, path: &Path) -> Option<String> {
        let output = Command::new("sh")
            .arg("-c")
            .arg(format!("{} \"$1\"", self.command))
            .arg("moniprof")
            .arg(path)
            .stdin(Stdio::null())
            .stderr(Stdio::null())
            .output()
            .inspect_err(|e| warn!(command = %self.command, error = %e, "Failed to spawn identity command"))
            .ok()?;

        if !output.status.success() {
            debug!(command = %self.command, path = %path.display(), status = %output.status, "Identity command reported no identity");
            return None;
        }
        Some(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl IdentityReader for CommandIdentityReader {
    fn read(&self, port: &Port) -> Option<MonitorIdentity> {
        self.run(&port.identity_path)
            .and_then(|raw| MonitorIdentity::new(&raw))
    }
}
