//! Pre/post switch hooks
//!
//! A hook receives the [`SwitchContext`] and either succeeds or aborts the
//! switch. Profile-specific hooks take precedence over the global ones.

use std::path::PathBuf;
use std::process::Command;

use tracing::info;

use crate::constants::hooks::{CURRENT_PROFILE, NEXT_PROFILE, NO_PROFILE, PREVIOUS_PROFILE};
use crate::error::ProfileError;
use crate::store::{HookScripts, ProfileName};

/// Which side of the apply step a hook runs on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookPhase {
    PreSwitch,
    PostSwitch,
}

/// Profile names visible to a hook; `None` means no stored profile matched
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SwitchContext {
    PreSwitch {
        current: Option<ProfileName>,
        next: ProfileName,
    },
    PostSwitch {
        previous: Option<ProfileName>,
        current: ProfileName,
    },
}

impl SwitchContext {
    pub fn phase(&self) -> HookPhase {
        match self {
            SwitchContext::PreSwitch { .. } => HookPhase::PreSwitch,
            SwitchContext::PostSwitch { .. } => HookPhase::PostSwitch,
        }
    }

    /// Environment bindings exported to hook scripts
    pub fn bindings(&self) -> Vec<(&'static str, String)> {
        match self {
            SwitchContext::PreSwitch { current, next } => vec![
                (CURRENT_PROFILE, or_none(current.as_ref())),
                (NEXT_PROFILE, next.to_string()),
            ],
            SwitchContext::PostSwitch { previous, current } => vec![
                (PREVIOUS_PROFILE, or_none(previous.as_ref())),
                (CURRENT_PROFILE, current.to_string()),
            ],
        }
    }
}

fn or_none(name: Option<&ProfileName>) -> String {
    name.map_or_else(|| NO_PROFILE.to_string(), ToString::to_string)
}

pub trait Hook {
    /// Label used in logs and errors
    fn describe(&self) -> String;

    fn run(&self, ctx: &SwitchContext) -> Result<(), ProfileError>;
}

impl<F> Hook for F
where
    F: Fn(&SwitchContext) -> Result<(), ProfileError>,
{
    fn describe(&self) -> String {
        "callback".to_string()
    }

    fn run(&self, ctx: &SwitchContext) -> Result<(), ProfileError> {
        self(ctx)
    }
}

/// An executable run with the context as environment variables
#[derive(Debug, Clone)]
pub struct ScriptHook {
    path: PathBuf,
}

impl ScriptHook {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl Hook for ScriptHook {
    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    fn run(&self, ctx: &SwitchContext) -> Result<(), ProfileError> {
        let bindings = ctx.bindings();
        info!(hook = %self.path.display(), phase = ?ctx.phase(), env = ?bindings, "Running hook");

        let status = Command::new(&self.path)
            .envs(bindings)
            .status()
            .map_err(|e| ProfileError::HookFailure {
                hook: self.describe(),
                status: e.to_string(),
            })?;

        if status.success() {
            Ok(())
        } else {
            Err(ProfileError::HookFailure {
                hook: self.describe(),
                status: status.to_string(),
            })
        }
    }
}

/// Optional hook per phase
#[derive(Default)]
pub struct Hooks {
    preswitch: Option<Box<dyn Hook>>,
    postswitch: Option<Box<dyn Hook>>,
}

impl Hooks {
    pub fn from_scripts(scripts: &HookScripts) -> Self {
        Self {
            preswitch: scripts
                .preswitch
                .clone()
                .map(|path| Box::new(ScriptHook::new(path)) as Box<dyn Hook>),
            postswitch: scripts
                .postswitch
                .clone()
                .map(|path| Box::new(ScriptHook::new(path)) as Box<dyn Hook>),
        }
    }

    #[cfg(test)]
    pub fn with_preswitch(mut self, hook: impl Hook + 'static) -> Self {
        self.preswitch = Some(Box::new(hook));
        self
    }

    #[cfg(test)]
    pub fn with_postswitch(mut self, hook: impl Hook + 'static) -> Self {
        self.postswitch = Some(Box::new(hook));
        self
    }

    pub fn get(&self, phase: HookPhase) -> Option<&dyn Hook> {
        match phase {
            HookPhase::PreSwitch => self.preswitch.as_deref(),
            HookPhase::PostSwitch => self.postswitch.as_deref(),
        }
    }

    /// The hook of `self` for `phase`, falling back to `fallback`'s
    pub fn resolve<'h>(&'h self, fallback: &'h Hooks, phase: HookPhase) -> Option<&'h dyn Hook> {
        self.get(phase).or_else(|| fallback.get(phase))
    }
}
