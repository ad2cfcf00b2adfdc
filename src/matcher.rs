use tracing::debug;

use crate::error::ProfileError;
use crate::fingerprint::Fingerprint;
use crate::store::{ProfileName, ProfileStore};

/// Finds the stored profile whose fingerprint equals a live one
pub struct ProfileMatcher<'a> {
    store: &'a ProfileStore,
}

impl<'a> ProfileMatcher<'a> {
    pub fn new(store: &'a ProfileStore) -> Self {
        Self { store }
    }

    /// First profile, in name order, whose fingerprint is exactly `live`
    pub fn find(&self, live: &Fingerprint) -> Result<Option<ProfileName>, ProfileError> {
        let found = self
            .store
            .profiles()?
            .into_iter()
            .find(|profile| profile.fingerprint == *live)
            .map(|profile| profile.name);
        debug!(matched = ?found, "Matched live fingerprint");
        Ok(found)
    }
}
