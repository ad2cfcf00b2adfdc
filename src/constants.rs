//! Application-wide constants
//!
//! File names, environment variables and literals shared between the
//! store, the switch controller and the CLI.

/// Profile directory layout
pub mod files {
    /// Sorted identity list, one identity per line
    pub const FINGERPRINT: &str = "fingerprint";

    /// Layout records, one output per line
    pub const CONFIG: &str = "config";

    /// Hook run before the layout is applied
    pub const PRESWITCH: &str = "preswitch";

    /// Hook run after the layout is applied
    pub const POSTSWITCH: &str = "postswitch";

    /// Advisory lock file in the store root
    pub const LOCK: &str = ".lock";
}

/// Configuration file location (relative to the XDG config dir)
pub mod config {
    pub const APP_DIR: &str = "moniprof";
    pub const FILENAME: &str = "config.toml";
    pub const PROFILES_DIR: &str = "profiles";
}

/// Environment variables read at startup
pub mod env {
    /// Tracing max level (trace|debug|info|warn|error)
    pub const LOG_LEVEL: &str = "LOG_LEVEL";

    /// Overrides the profile root
    pub const PROFILE_DIR: &str = "MONIPROF_PROFILE_DIR";

    /// Replaces the identity decoder with a shell command
    pub const IDENTITY_CMD: &str = "MONIPROF_IDENTITY_CMD";
}

/// Bindings passed to hook scripts
pub mod hooks {
    pub const PREVIOUS_PROFILE: &str = "PREVIOUS_PROFILE";
    pub const CURRENT_PROFILE: &str = "CURRENT_PROFILE";
    pub const NEXT_PROFILE: &str = "NEXT_PROFILE";

    /// Value bound when no stored profile matches
    pub const NO_PROFILE: &str = "none";
}

/// Hardware defaults
pub mod hardware {
    /// DRM connector tree exposing `edid` and `enabled` per port
    pub const SYSFS_DRM: &str = "/sys/class/drm";

    /// Per-connector identity data file
    pub const EDID_FILE: &str = "edid";

    /// Per-connector administrative state file
    pub const ENABLED_FILE: &str = "enabled";

    /// Content of `enabled` for an active output
    pub const ENABLED_VALUE: &str = "enabled";

    /// Display configuration command used for apply
    pub const XRANDR: &str = "xrandr";
}
