//! In-memory hardware for unit tests

use std::cell::RefCell;
use std::path::PathBuf;
use std::rc::Rc;

use anyhow::{Result, bail};

use crate::backend::DisplayBackend;
use crate::fingerprint::FingerprintExtractor;
use crate::identity::{IdentityReader, MonitorIdentity, MonitorSource, Port};
use crate::layout::{self, ActiveOutput, Clause, Layout, LayoutRecord, Position, Resolution, Rotation};

pub fn id(s: &str) -> MonitorIdentity {
    MonitorIdentity::new(s).unwrap()
}

fn record(output: &str, primary: bool, x: i32, sequence: u32) -> LayoutRecord {
    LayoutRecord {
        output: output.to_string(),
        primary,
        resolution: Resolution::new(1920, 1080),
        position: Position::new(x, 0),
        rotation: Rotation::Normal,
        sequence,
    }
}

/// Two side-by-side 1080p outputs, HDMI-1 primary
pub fn office_layout() -> Layout {
    Layout::new(vec![record("HDMI-1", true, 0, 0), record("DP-1", false, 1920, 1)])
}

/// A port and whatever is plugged into it
#[derive(Debug, Clone)]
pub struct FakeMonitor {
    pub connector: String,
    pub identity: Option<String>,
    pub enabled: bool,
}

impl FakeMonitor {
    pub fn enabled(connector: &str, identity: &str) -> Self {
        Self {
            connector: connector.to_string(),
            identity: Some(identity.to_string()),
            enabled: true,
        }
    }

    pub fn disabled(connector: &str, identity: &str) -> Self {
        Self {
            enabled: false,
            ..Self::enabled(connector, identity)
        }
    }

    pub fn unplugged(connector: &str) -> Self {
        Self {
            connector: connector.to_string(),
            identity: None,
            enabled: false,
        }
    }
}

/// Ports carry their identity in `identity_path`; an empty path means none
struct FakeSource(Vec<FakeMonitor>);

fn to_ports(monitors: &[FakeMonitor]) -> Vec<Port> {
    monitors
        .iter()
        .map(|m| Port {
            connector: m.connector.clone(),
            identity_path: PathBuf::from(m.identity.clone().unwrap_or_default()),
            enabled: m.enabled,
        })
        .collect()
}

impl MonitorSource for FakeSource {
    fn ports(&self) -> Vec<Port> {
        to_ports(&self.0)
    }
}

pub struct FakeReader;

impl IdentityReader for FakeReader {
    fn read(&self, port: &Port) -> Option<MonitorIdentity> {
        MonitorIdentity::new(port.identity_path.to_str()?)
    }
}

pub fn fake_extractor(monitors: &[FakeMonitor]) -> FingerprintExtractor {
    FingerprintExtractor::new(Box::new(FakeSource(monitors.to_vec())), Box::new(FakeReader))
}

#[derive(Debug, Default)]
struct HardwareState {
    monitors: Vec<FakeMonitor>,
    applied: Vec<Vec<Clause>>,
    fail_apply: bool,
}

/// Shared mutable hardware acting as both monitor source and display backend.
///
/// Applying a layout enables configured outputs and disables the rest, so
/// the enabled fingerprint follows the last apply like real hardware.
#[derive(Debug, Clone, Default)]
pub struct FakeHardware(Rc<RefCell<HardwareState>>);

impl FakeHardware {
    pub fn new(monitors: Vec<FakeMonitor>) -> Self {
        Self(Rc::new(RefCell::new(HardwareState {
            monitors,
            ..Default::default()
        })))
    }

    pub fn extractor(&self) -> FingerprintExtractor {
        FingerprintExtractor::new(Box::new(self.clone()), Box::new(FakeReader))
    }

    pub fn set_monitors(&self, monitors: Vec<FakeMonitor>) {
        self.0.borrow_mut().monitors = monitors;
    }

    pub fn fail_apply(&self) {
        self.0.borrow_mut().fail_apply = true;
    }

    pub fn applied(&self) -> Vec<Vec<Clause>> {
        self.0.borrow().applied.clone()
    }
}

impl MonitorSource for FakeHardware {
    fn ports(&self) -> Vec<Port> {
        to_ports(&self.0.borrow().monitors)
    }
}

impl DisplayBackend for FakeHardware {
    fn query_layout(&self) -> Result<Layout> {
        let active = self
            .0
            .borrow()
            .monitors
            .iter()
            .filter(|m| m.enabled && m.identity.is_some())
            .enumerate()
            .map(|(idx, m)| ActiveOutput {
                name: m.connector.clone(),
                primary: idx == 0,
                resolution: Resolution::new(1920, 1080),
                position: Position::new(1920 * idx as i32, 0),
                rotation: Rotation::Normal,
            })
            .collect();
        Ok(layout::encode(active))
    }

    fn connected_outputs(&self) -> Result<Vec<String>> {
        Ok(self
            .0
            .borrow()
            .monitors
            .iter()
            .filter(|m| m.identity.is_some())
            .map(|m| m.connector.clone())
            .collect())
    }

    fn apply(&self, clauses: &[Clause]) -> Result<()> {
        let mut state = self.0.borrow_mut();
        if state.fail_apply {
            bail!("fake backend refused the layout");
        }
        for monitor in state.monitors.iter_mut() {
            monitor.enabled = clauses
                .iter()
                .any(|c| matches!(c, Clause::Configure(r) if r.output == monitor.connector));
        }
        state.applied.push(clauses.to_vec());
        Ok(())
    }
}
