use anyhow::{Context, Result, bail};
use std::process::Command;
use tracing::{debug, info};
use x11rb::connection::Connection;
use x11rb::protocol::randr::{self, ConnectionExt as RandrExt};
use x11rb::rust_connection::RustConnection;

use super::DisplayBackend;
use crate::layout::{self, ActiveOutput, Clause, Layout, Position, Resolution, Rotation};

/// RandR state of one output
#[derive(Debug, Clone)]
struct OutputState {
    name: String,
    connected: bool,
    active: Option<ActiveOutput>,
}

/// Queries through the RandR extension and applies by invoking `xrandr`
#[derive(Debug, Clone)]
pub struct XrandrBackend {
    program: String,
}

impl XrandrBackend {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn query_outputs(&self) -> Result<Vec<OutputState>> {
        let (conn, screen_num) = RustConnection::connect(None)
            .context("Failed to connect to X server")?;
        let root = conn.setup().roots[screen_num].root;

        let version = conn
            .randr_query_version(1, 3)
            .context("Failed to query RandR version")?
            .reply()
            .context("RandR extension is not available")?;
        debug!(major = version.major_version, minor = version.minor_version, "RandR version");

        let resources = conn
            .randr_get_screen_resources_current(root)
            .context("Failed to query RandR screen resources")?
            .reply()
            .context("Failed to get reply for RandR screen resources")?;
        let primary = conn
            .randr_get_output_primary(root)
            .context("Failed to query primary output")?
            .reply()
            .context("Failed to get reply for primary output query")?
            .output;

        let mut outputs = Vec::with_capacity(resources.outputs.len());
        for &output in &resources.outputs {
            let info = conn
                .randr_get_output_info(output, resources.config_timestamp)
                .context(format!("Failed to query RandR output {}", output))?
                .reply()
                .context(format!("Failed to get reply for RandR output {}", output))?;
            let name = String::from_utf8_lossy(&info.name).into_owned();

            let active = if info.crtc == x11rb::NONE {
                None
            } else {
                let crtc = conn
                    .randr_get_crtc_info(info.crtc, resources.config_timestamp)
                    .context(format!("Failed to query CRTC {} of output {}", info.crtc, name))?
                    .reply()
                    .context(format!("Failed to get reply for CRTC {} of output {}", info.crtc, name))?;

                if crtc.mode == x11rb::NONE {
                    None
                } else {
                    let mode = resources
                        .modes
                        .iter()
                        .find(|mode| mode.id == crtc.mode)
                        .context(format!("Output {} uses unknown mode {}", name, crtc.mode))?;
                    Some(ActiveOutput {
                        name: name.clone(),
                        primary: output == primary,
                        resolution: Resolution::new(mode.width.into(), mode.height.into()),
                        position: Position::new(crtc.x.into(), crtc.y.into()),
                        rotation: rotation_from_randr(crtc.rotation),
                    })
                }
            };

            debug!(output = %name, connection = ?info.connection, active = active.is_some(), "Queried output");
            outputs.push(OutputState {
                name,
                connected: info.connection == randr::Connection::CONNECTED,
                active,
            });
        }
        Ok(outputs)
    }
}

impl DisplayBackend for XrandrBackend {
    fn query_layout(&self) -> Result<Layout> {
        let active = self
            .query_outputs()?
            .into_iter()
            .filter_map(|output| output.active)
            .collect();
        Ok(layout::encode(active))
    }

    fn connected_outputs(&self) -> Result<Vec<String>> {
        Ok(self
            .query_outputs()?
            .into_iter()
            .filter(|output| output.connected)
            .map(|output| output.name)
            .collect())
    }

    fn apply(&self, clauses: &[Clause]) -> Result<()> {
        let args = xrandr_args(clauses);
        info!(program = %self.program, args = ?args, "Applying layout");

        let status = Command::new(&self.program)
            .args(&args)
            .status()
            .context(format!("Failed to run {}", self.program))?;
        if !status.success() {
            bail!("{} exited with {}", self.program, status);
        }
        Ok(())
    }
}

fn rotation_from_randr(rotation: randr::Rotation) -> Rotation {
    let bits = u16::from(rotation);
    let has = |flag: randr::Rotation| bits & u16::from(flag) != 0;
    if has(randr::Rotation::ROTATE90) {
        Rotation::Left
    } else if has(randr::Rotation::ROTATE180) {
        Rotation::Inverted
    } else if has(randr::Rotation::ROTATE270) {
        Rotation::Right
    } else {
        Rotation::Normal
    }
}

/// Render clauses as one `xrandr` argument list, preserving clause order.
///
/// The stored sequence index is passed as `--crtc N`. xrandr rejects the
/// whole invocation when output and CRTC N are incompatible, which surfaces
/// as a backend failure; re-saving the profile on that machine records
/// indices its outputs can drive.
pub fn xrandr_args(clauses: &[Clause]) -> Vec<String> {
    let mut args = Vec::new();
    for clause in clauses {
        match clause {
            Clause::Configure(record) => {
                args.extend(["--output".to_string(), record.output.clone()]);
                if record.primary {
                    args.push("--primary".to_string());
                }
                args.extend([
                    "--mode".to_string(),
                    record.resolution.to_string(),
                    "--pos".to_string(),
                    record.position.to_string(),
                    "--rotate".to_string(),
                    record.rotation.to_string(),
                    "--crtc".to_string(),
                    record.sequence.to_string(),
                ]);
            }
            Clause::Disable(output) => {
                args.extend(["--output".to_string(), output.clone(), "--off".to_string()]);
            }
        }
    }
    args
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::LayoutRecord;

    #[test]
    fn test_xrandr_args_for_configure_and_disable() {
        let clauses = vec![
            Clause::Configure(LayoutRecord {
                output: "HDMI-1".to_string(),
                primary: true,
                resolution: Resolution::new(1920, 1080),
                position: Position::new(0, 0),
                rotation: Rotation::Normal,
                sequence: 0,
            }),
            Clause::Configure(LayoutRecord {
                output: "DP-1".to_string(),
                primary: false,
                resolution: Resolution::new(1080, 1920),
                position: Position::new(1920, 0),
                rotation: Rotation::Left,
                sequence: 1,
            }),
            Clause::Disable("eDP-1".to_string()),
        ];

        assert_eq!(
            xrandr_args(&clauses).join(" "),
            "--output HDMI-1 --primary --mode 1920x1080 --pos 0x0 --rotate normal --crtc 0 \
             --output DP-1 --mode 1080x1920 --pos 1920x0 --rotate left --crtc 1 \
             --output eDP-1 --off"
        );
    }

    #[test]
    fn test_rotation_from_randr() {
        assert_eq!(rotation_from_randr(randr::Rotation::ROTATE0), Rotation::Normal);
        assert_eq!(rotation_from_randr(randr::Rotation::ROTATE90), Rotation::Left);
        assert_eq!(rotation_from_randr(randr::Rotation::ROTATE180), Rotation::Inverted);
        assert_eq!(rotation_from_randr(randr::Rotation::ROTATE270), Rotation::Right);
    }

    #[test]
    fn test_apply_reports_failing_program() {
        let backend = XrandrBackend::new("false");
        assert!(backend.apply(&[Clause::Disable("VGA-1".to_string())]).is_err());

        let backend = XrandrBackend::new("true");
        assert!(backend.apply(&[Clause::Disable("VGA-1".to_string())]).is_ok());
    }
}
