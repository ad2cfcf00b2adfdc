//! Directory-backed profile storage
//!
//! ```text
//! <root>/
//!   preswitch, postswitch     global hooks (optional)
//!   <name>/
//!     fingerprint             sorted monitor identities
//!     config                  layout records
//!     preswitch, postswitch   profile hooks (optional)
//! ```

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::backend::DisplayBackend;
use crate::constants::files;
use crate::error::ProfileError;
use crate::fingerprint::{Fingerprint, FingerprintExtractor};
use crate::layout::Layout;

/// Validated profile name: non-empty, `[A-Za-z0-9_-]` only
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct ProfileName(String);

impl ProfileName {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for ProfileName {
    type Err = ProfileError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let valid = !s.is_empty()
            && s.chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if valid {
            Ok(Self(s.to_string()))
        } else {
            Err(ProfileError::InvalidProfileName(s.to_string()))
        }
    }
}

impl fmt::Display for ProfileName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Paths of executable hook scripts, when present
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HookScripts {
    pub preswitch: Option<PathBuf>,
    pub postswitch: Option<PathBuf>,
}

impl HookScripts {
    fn discover(dir: &Path) -> Self {
        Self {
            preswitch: executable(dir.join(files::PRESWITCH)),
            postswitch: executable(dir.join(files::POSTSWITCH)),
        }
    }
}

#[cfg(unix)]
fn executable(path: PathBuf) -> Option<PathBuf> {
    use std::os::unix::fs::PermissionsExt;

    let metadata = fs::metadata(&path).ok()?;
    if !metadata.is_file() {
        return None;
    }
    if metadata.permissions().mode() & 0o111 == 0 {
        warn!(path = %path.display(), "Hook script is not executable, ignoring");
        return None;
    }
    Some(path)
}

#[cfg(not(unix))]
fn executable(path: PathBuf) -> Option<PathBuf> {
    path.is_file().then_some(path)
}

/// A complete stored profile
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Profile {
    pub name: ProfileName,
    pub fingerprint: Fingerprint,
    pub layout: Layout,
    pub hooks: HookScripts,
}

/// Listing entry with composite status
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProfileStatus {
    pub name: ProfileName,
    /// Fingerprint equals the live enabled fingerprint
    pub active: bool,
    /// Every monitor of the fingerprint is connected
    pub available: bool,
}

impl fmt::Display for ProfileStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        match (self.active, self.available) {
            (true, _) => write!(f, " (active)"),
            (false, true) => write!(f, " (available)"),
            (false, false) => Ok(()),
        }
    }
}

/// Named profiles under one root directory
#[derive(Debug, Clone)]
pub struct ProfileStore {
    root: PathBuf,
}

impl ProfileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn profile_dir(&self, name: &ProfileName) -> PathBuf {
        self.root.join(name.as_str())
    }

    /// Create or fully overwrite a profile's fingerprint and layout.
    /// Hook scripts already in the directory are left alone.
    pub fn save(
        &self,
        name: &ProfileName,
        fingerprint: &Fingerprint,
        layout: &Layout,
    ) -> Result<(), ProfileError> {
        let dir = self.profile_dir(name);
        fs::create_dir_all(&dir).map_err(|e| ProfileError::storage(&dir, e))?;

        // Stage both files first so a failed write never leaves a mixed pair
        let fingerprint_tmp = stage(&dir, files::FINGERPRINT, &fingerprint.to_file_contents())?;
        let config_tmp = stage(&dir, files::CONFIG, &layout.to_file_contents())?;
        commit(&fingerprint_tmp, &dir.join(files::FINGERPRINT))?;
        commit(&config_tmp, &dir.join(files::CONFIG))?;

        info!(profile = %name, monitors = fingerprint.identities().len(), outputs = layout.records().len(), "Saved profile");
        Ok(())
    }

    /// Load a complete profile
    /// Save the live layout under `name`, keyed by the enabled monitors
    pub fn save_current(
        &self,
        name: &ProfileName,
        extractor: &FingerprintExtractor,
        backend: &dyn DisplayBackend,
    ) -> Result<Profile, ProfileError> {
        let fingerprint = extractor.enabled();
        if fingerprint.is_empty() {
            warn!(profile = %name, "No enabled monitor reported an identity");
        }
        let layout = backend
            .query_layout()
            .map_err(|e| ProfileError::BackendFailure(format!("{e:#}")))?;

        self.save(name, &fingerprint, &layout)?;
        self.load(name)
    }

    pub fn load(&self, name: &ProfileName) -> Result<Profile, ProfileError> {
        let dir = self.profile_dir(name);
        if !dir.is_dir() {
            return Err(ProfileError::ProfileNotFound(name.to_string()));
        }

        let fingerprint = Fingerprint::parse(&read_required(name, &dir, files::FINGERPRINT)?);
        let layout = Layout::parse(&read_required(name, &dir, files::CONFIG)?)
            .map_err(|e| ProfileError::corrupt(name.as_str(), format!("{}: {e}", files::CONFIG)))?;

        debug!(profile = %name, "Loaded profile");
        Ok(Profile {
            name: name.clone(),
            fingerprint,
            layout,
            hooks: HookScripts::discover(&dir),
        })
    }

    /// Delete a profile's directory, hooks included
    pub fn remove(&self, name: &ProfileName) -> Result<(), ProfileError> {
        let dir = self.profile_dir(name);
        if !dir.is_dir() {
            return Err(ProfileError::ProfileNotFound(name.to_string()));
        }
        fs::remove_dir_all(&dir).map_err(|e| ProfileError::storage(&dir, e))?;
        info!(profile = %name, "Removed profile");
        Ok(())
    }

    /// Names of complete profiles, sorted lexicographically.
    ///
    /// Directories with an invalid name or missing either file are skipped.
    pub fn names(&self) -> Result<Vec<ProfileName>, ProfileError> {
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(ProfileError::storage(&self.root, e)),
        };

        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| ProfileError::storage(&self.root, e))?;
            let path = entry.path();
            if !path.is_dir() {
                continue;
            }
            let Ok(name) = entry.file_name().to_string_lossy().parse::<ProfileName>() else {
                continue;
            };
            if path.join(files::FINGERPRINT).is_file() && path.join(files::CONFIG).is_file() {
                names.push(name);
            } else {
                debug!(profile = %name, "Skipping incomplete profile");
            }
        }
        names.sort();
        Ok(names)
    }

    /// Every complete profile in name order. Profiles that fail to load are skipped.
    pub fn profiles(&self) -> Result<Vec<Profile>, ProfileError> {
        Ok(self
            .names()?
            .iter()
            .filter_map(|name| {
                self.load(name)
                    .inspect_err(|e| warn!(profile = %name, error = %e, "Skipping unreadable profile"))
                    .ok()
            })
            .collect())
    }

    /// One status entry per profile
    pub fn list(
        &self,
        connected: &Fingerprint,
        enabled: &Fingerprint,
    ) -> Result<Vec<ProfileStatus>, ProfileError> {
        Ok(self
            .profiles()?
            .into_iter()
            .map(|profile| ProfileStatus {
                active: profile.fingerprint == *enabled,
                available: profile.fingerprint.is_subset_of(connected),
                name: profile.name,
            })
            .collect())
    }

    /// Hooks in the store root, used when a profile has none of its own
    pub fn global_hooks(&self) -> HookScripts {
        HookScripts::discover(&self.root)
    }
}

fn read_required(name: &ProfileName, dir: &Path, file: &str) -> Result<String, ProfileError> {
    let path = dir.join(file);
    match fs::read_to_string(&path) {
        Ok(contents) => Ok(contents),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(ProfileError::corrupt(name.as_str(), format!("missing {file}")))
        }
        Err(e) => Err(ProfileError::storage(path, e)),
    }
}

fn stage(dir: &Path, file: &str, contents: &str) -> Result<PathBuf, ProfileError> {
    let tmp = dir.join(format!(".{file}.tmp"));
    fs::write(&tmp, contents).map_err(|e| ProfileError::storage(&tmp, e))?;
    Ok(tmp)
}

fn commit(tmp: &Path, target: &Path) -> Result<(), ProfileError> {
    fs::rename(tmp, target).map_err(|e| ProfileError::storage(target, e))
}
