//! Profile switching
//!
//! `Idle -> Validating -> PreHook -> Applying -> PostHook -> Done`
//!
//! Validation runs before any side effect, so a missing monitor aborts with
//! nothing changed. Hook and backend failures later in the sequence surface
//! as-is; a partially applied layout is not rolled back.

use tracing::{debug, info, warn};

use crate::backend::DisplayBackend;
use crate::error::ProfileError;
use crate::fingerprint::FingerprintExtractor;
use crate::hooks::{HookPhase, Hooks, SwitchContext};
use crate::layout::Clause;
use crate::matcher::ProfileMatcher;
use crate::store::{Profile, ProfileName, ProfileStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwitchState {
    Idle,
    Validating,
    PreHook,
    Applying,
    PostHook,
    Done,
    Failed,
}

/// Outcome of a completed switch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwitchReport {
    pub profile: ProfileName,
    /// Clauses sent to the backend (or that would be, on a dry run)
    pub clauses: Vec<Clause>,
    /// States visited in order
    pub states: Vec<SwitchState>,
    pub dry_run: bool,
}

impl SwitchReport {
    /// Outputs forced off by this switch
    pub fn disabled_outputs(&self) -> Vec<&str> {
        self.clauses
            .iter()
            .filter_map(|clause| match clause {
                Clause::Disable(output) => Some(output.as_str()),
                Clause::Configure(_) => None,
            })
            .collect()
    }
}

/// Records state transitions for one switch
struct Transitions {
    profile: ProfileName,
    states: Vec<SwitchState>,
}

impl Transitions {
    fn new(profile: &ProfileName) -> Self {
        Self {
            profile: profile.clone(),
            states: vec![SwitchState::Idle],
        }
    }

    fn enter(&mut self, state: SwitchState) {
        debug!(profile = %self.profile, from = ?self.states.last(), to = ?state, "Switch state transition");
        self.states.push(state);
    }
}

pub struct SwitchController<'a> {
    store: &'a ProfileStore,
    extractor: &'a FingerprintExtractor,
    backend: &'a dyn DisplayBackend,
    global_hooks: Hooks,
    dry_run: bool,
}

impl<'a> SwitchController<'a> {
    /// Controller using the store's global hook scripts
    pub fn new(
        store: &'a ProfileStore,
        extractor: &'a FingerprintExtractor,
        backend: &'a dyn DisplayBackend,
    ) -> Self {
        Self {
            store,
            extractor,
            backend,
            global_hooks: Hooks::from_scripts(&store.global_hooks()),
            dry_run: false,
        }
    }

    #[cfg(test)]
    pub fn with_global_hooks(mut self, hooks: Hooks) -> Self {
        self.global_hooks = hooks;
        self
    }

    /// Stop after validation and report the clauses without running hooks or applying
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Switch to the profile matching the connected monitors exactly
    pub fn auto(&self) -> Result<SwitchReport, ProfileError> {
        let connected = self.extractor.connected();
        let name = ProfileMatcher::new(self.store)
            .find(&connected)?
            .ok_or(ProfileError::NoAutoMatch)?;
        info!(profile = %name, "Detected profile for connected monitors");
        self.switch_to(&name)
    }

    pub fn switch_to(&self, name: &ProfileName) -> Result<SwitchReport, ProfileError> {
        let mut transitions = Transitions::new(name);

        transitions.enter(SwitchState::Validating);
        let profile = match self.validate(name) {
            Ok(profile) => profile,
            Err(e) => {
                transitions.enter(SwitchState::Failed);
                warn!(profile = %name, error = %e, "Switch validation failed");
                return Err(e);
            }
        };

        if self.dry_run {
            let clauses = self.clauses_for(&profile)?;
            transitions.enter(SwitchState::Done);
            return Ok(SwitchReport {
                profile: profile.name,
                clauses,
                states: transitions.states,
                dry_run: true,
            });
        }

        let profile_hooks = Hooks::from_scripts(&profile.hooks);

        transitions.enter(SwitchState::PreHook);
        if let Some(hook) = profile_hooks.resolve(&self.global_hooks, HookPhase::PreSwitch) {
            let ctx = SwitchContext::PreSwitch {
                current: self.current_profile()?,
                next: profile.name.clone(),
            };
            debug!(hook = %hook.describe(), "Running pre-switch hook");
            hook.run(&ctx)?;
        }

        transitions.enter(SwitchState::Applying);
        let clauses = self.clauses_for(&profile)?;
        self.backend
            .apply(&clauses)
            .map_err(|e| ProfileError::BackendFailure(format!("{e:#}")))?;

        transitions.enter(SwitchState::PostHook);
        if let Some(hook) = profile_hooks.resolve(&self.global_hooks, HookPhase::PostSwitch) {
            let ctx = SwitchContext::PostSwitch {
                previous: self.current_profile()?,
                current: profile.name.clone(),
            };
            debug!(hook = %hook.describe(), "Running post-switch hook");
            hook.run(&ctx)?;
        }

        transitions.enter(SwitchState::Done);
        info!(profile = %profile.name, outputs = clauses.len(), "Switched profile");
        Ok(SwitchReport {
            profile: profile.name,
            clauses,
            states: transitions.states,
            dry_run: false,
        })
    }

    /// Load the profile and require each of its monitors to be connected
    fn validate(&self, name: &ProfileName) -> Result<Profile, ProfileError> {
        let profile = self.store.load(name)?;
        let connected = self.extractor.connected();
        let missing = profile.fingerprint.missing_from(&connected);
        if !missing.is_empty() {
            return Err(ProfileError::MonitorUnavailable {
                profile: name.to_string(),
                missing,
            });
        }
        Ok(profile)
    }

    fn clauses_for(&self, profile: &Profile) -> Result<Vec<Clause>, ProfileError> {
        let connected_outputs = self
            .backend
            .connected_outputs()
            .map_err(|e| ProfileError::BackendFailure(format!("{e:#}")))?;
        Ok(profile.layout.decode(&connected_outputs))
    }

    /// Profile matching what is enabled right now
    fn current_profile(&self) -> Result<Option<ProfileName>, ProfileError> {
        ProfileMatcher::new(self.store).find(&self.extractor.enabled())
    }
}
