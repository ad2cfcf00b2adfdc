//! Order-independent fingerprints of monitor sets

use std::fmt;

use tracing::debug;

use crate::identity::{IdentityReader, MonitorIdentity, MonitorSource};

/// Which ports contribute to a fingerprint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorSet {
    /// Every port with readable identity data
    Connected,
    /// Connected ports whose output is also administratively enabled
    Enabled,
}

/// Sorted sequence of monitor identities.
///
/// Construction always sorts, so equality of two fingerprints is equality
/// of the underlying monitor sets regardless of port order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Fingerprint(Vec<MonitorIdentity>);

impl Fingerprint {
    pub fn new(mut identities: Vec<MonitorIdentity>) -> Self {
        identities.sort();
        Self(identities)
    }

    /// Parse the newline-separated stored form. Blank lines are ignored.
    pub fn parse(text: &str) -> Self {
        Self::new(text.lines().filter_map(MonitorIdentity::new).collect())
    }

    /// Newline-separated stored form, one identity per line
    pub fn to_file_contents(&self) -> String {
        self.0.iter().map(|id| format!("{id}\n")).collect()
    }

    pub fn identities(&self) -> &[MonitorIdentity] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Identities of `self` not covered by `other`, counting duplicates.
    ///
    /// Two identical monitors in `self` need two matching entries in `other`.
    pub fn missing_from(&self, other: &Fingerprint) -> Vec<MonitorIdentity> {
        let mut available = other.0.iter().peekable();
        let mut missing = Vec::new();
        for id in &self.0 {
            while available.next_if(|candidate| *candidate < id).is_some() {}
            if available.next_if(|candidate| *candidate == id).is_none() {
                missing.push(id.clone());
            }
        }
        missing
    }

    /// Every monitor of `self` is present in `other`
    pub fn is_subset_of(&self, other: &Fingerprint) -> bool {
        self.missing_from(other).is_empty()
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_file_contents())
    }
}

/// Builds fingerprints from live hardware
pub struct FingerprintExtractor {
    source: Box<dyn MonitorSource>,
    reader: Box<dyn IdentityReader>,
}

impl FingerprintExtractor {
    pub fn new(source: Box<dyn MonitorSource>, reader: Box<dyn IdentityReader>) -> Self {
        Self { source, reader }
    }

    pub fn fingerprint(&self, set: MonitorSet) -> Fingerprint {
        let identities = self
            .source
            .ports()
            .into_iter()
            .filter(|port| set == MonitorSet::Connected || port.enabled)
            .filter_map(|port| {
                let identity = self.reader.read(&port);
                if identity.is_none() {
                    debug!(connector = %port.connector, "No identity for port, skipping");
                }
                identity
            })
            .collect();

        let fingerprint = Fingerprint::new(identities);
        debug!(set = ?set, monitors = fingerprint.identities().len(), "Computed fingerprint");
        fingerprint
    }

    pub fn connected(&self) -> Fingerprint {
        self.fingerprint(MonitorSet::Connected)
    }

    pub fn enabled(&self) -> Fingerprint {
        self.fingerprint(MonitorSet::Enabled)
    }
}
