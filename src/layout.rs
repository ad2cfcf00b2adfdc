//! Layout records and their stored `config` form
//!
//! One line per managed output:
//! `name,primary|noprimary,WxH,XxY,rotation,sequence`.
//! Record order is significant and preserved verbatim through decode.

use std::fmt;
use std::str::FromStr;

/// Output rotation as named by xrandr
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rotation {
    Normal,
    Left,
    Inverted,
    Right,
}

impl Rotation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Rotation::Normal => "normal",
            Rotation::Left => "left",
            Rotation::Inverted => "inverted",
            Rotation::Right => "right",
        }
    }
}

impl fmt::Display for Rotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Rotation {
    type Err = LayoutParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "normal" => Ok(Rotation::Normal),
            "left" => Ok(Rotation::Left),
            "inverted" => Ok(Rotation::Inverted),
            "right" => Ok(Rotation::Right),
            other => Err(LayoutParseError::field("rotation", other)),
        }
    }
}

/// Mode size in pixels, written `WxH`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

impl FromStr for Resolution {
    type Err = LayoutParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (w, h) = s
            .split_once('x')
            .ok_or_else(|| LayoutParseError::field("resolution", s))?;
        Ok(Self {
            width: w.parse().map_err(|_| LayoutParseError::field("resolution", s))?,
            height: h.parse().map_err(|_| LayoutParseError::field("resolution", s))?,
        })
    }
}

/// Top-left corner of an output on the screen, written `XxY`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.x, self.y)
    }
}

impl FromStr for Position {
    type Err = LayoutParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (x, y) = s
            .split_once('x')
            .ok_or_else(|| LayoutParseError::field("position", s))?;
        Ok(Self {
            x: x.parse().map_err(|_| LayoutParseError::field("position", s))?,
            y: y.parse().map_err(|_| LayoutParseError::field("position", s))?,
        })
    }
}

/// Configuration of one output
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayoutRecord {
    pub output: String,
    pub primary: bool,
    pub resolution: Resolution,
    pub position: Position,
    pub rotation: Rotation,
    /// Zero-based index in the backend's enumeration of active outputs
    pub sequence: u32,
}

impl fmt::Display for LayoutRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{},{},{},{},{},{}",
            self.output,
            if self.primary { "primary" } else { "noprimary" },
            self.resolution,
            self.position,
            self.rotation,
            self.sequence
        )
    }
}

impl FromStr for LayoutRecord {
    type Err = LayoutParseError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let fields: Vec<&str> = line.trim().split(',').collect();
        let [output, primary, resolution, position, rotation, sequence] = fields[..] else {
            return Err(LayoutParseError::FieldCount(fields.len()));
        };

        if output.is_empty() {
            return Err(LayoutParseError::field("output", output));
        }
        let primary = match primary {
            "primary" => true,
            "noprimary" => false,
            other => return Err(LayoutParseError::field("primary flag", other)),
        };

        Ok(Self {
            output: output.to_string(),
            primary,
            resolution: resolution.parse()?,
            position: position.parse()?,
            rotation: rotation.parse()?,
            sequence: sequence
                .parse()
                .map_err(|_| LayoutParseError::field("sequence index", sequence))?,
        })
    }
}

/// Malformed `config` line
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LayoutParseError {
    #[error("expected 6 comma-separated fields, found {0}")]
    FieldCount(usize),
    #[error("invalid {kind} '{value}'")]
    Field { kind: &'static str, value: String },
    #[error("line {line}: {source}")]
    Line {
        line: usize,
        #[source]
        source: Box<LayoutParseError>,
    },
}

impl LayoutParseError {
    fn field(kind: &'static str, value: &str) -> Self {
        Self::Field {
            kind,
            value: value.to_string(),
        }
    }
}

/// Ordered layout of every output a profile manages
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Layout(Vec<LayoutRecord>);

impl Layout {
    #[cfg(test)]
    pub fn new(records: Vec<LayoutRecord>) -> Self {
        Self(records)
    }

    pub fn records(&self) -> &[LayoutRecord] {
        &self.0
    }

    pub fn names_output(&self, output: &str) -> bool {
        self.0.iter().any(|record| record.output == output)
    }

    /// Parse the stored `config` form. Blank lines are ignored.
    pub fn parse(text: &str) -> Result<Self, LayoutParseError> {
        text.lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(idx, line)| {
                line.parse::<LayoutRecord>().map_err(|e| LayoutParseError::Line {
                    line: idx + 1,
                    source: Box::new(e),
                })
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Self)
    }

    pub fn to_file_contents(&self) -> String {
        self.0.iter().map(|record| format!("{record}\n")).collect()
    }

    /// Turn this layout into backend clauses.
    ///
    /// Configure clauses come first in stored order, followed by a disable
    /// clause for every connected output this layout does not name.
    pub fn decode(&self, connected_outputs: &[String]) -> Vec<Clause> {
        let configure = self.0.iter().cloned().map(Clause::Configure);
        let disable = connected_outputs
            .iter()
            .filter(|output| !self.names_output(output))
            .cloned()
            .map(Clause::Disable);
        configure.chain(disable).collect()
    }
}

/// Build layout records from active outputs in backend enumeration order
pub fn encode(active: Vec<ActiveOutput>) -> Layout {
    Layout(
        active
            .into_iter()
            .enumerate()
            .map(|(sequence, output)| LayoutRecord {
                output: output.name,
                primary: output.primary,
                resolution: output.resolution,
                position: output.position,
                rotation: output.rotation,
                sequence: sequence as u32,
            })
            .collect(),
    )
}

/// An output the backend reports as currently driving a mode
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveOutput {
    pub name: String,
    pub primary: bool,
    pub resolution: Resolution,
    pub position: Position,
    pub rotation: Rotation,
}

/// One instruction for the backend's apply step
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Clause {
    Configure(LayoutRecord),
    Disable(String),
}

#[cfg(test)]
mod tests {
    use super::*;

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

    #[test]
    fn test_record_line_format() {
        let line = record("HDMI-1", true, 0, 0).to_string();
        assert_eq!(line, "HDMI-1,primary,1920x1080,0x0,normal,0");

        let parsed: LayoutRecord = "DP-2,noprimary,2560x1440,-1920x120,left,3".parse().unwrap();
        assert_eq!(parsed.output, "DP-2");
        assert!(!parsed.primary);
        assert_eq!(parsed.resolution, Resolution::new(2560, 1440));
        assert_eq!(parsed.position, Position::new(-1920, 120));
        assert_eq!(parsed.rotation, Rotation::Left);
        assert_eq!(parsed.sequence, 3);
    }

    #[test]
    fn test_record_rejects_malformed_lines() {
        assert_eq!(
            "HDMI-1,primary,1920x1080".parse::<LayoutRecord>(),
            Err(LayoutParseError::FieldCount(3))
        );
        assert!("HDMI-1,yes,1920x1080,0x0,normal,0".parse::<LayoutRecord>().is_err());
        assert!("HDMI-1,primary,1920,0x0,normal,0".parse::<LayoutRecord>().is_err());
        assert!("HDMI-1,primary,1920x1080,0x0,sideways,0".parse::<LayoutRecord>().is_err());
        assert!("HDMI-1,primary,1920x1080,0x0,normal,-1".parse::<LayoutRecord>().is_err());
        assert!(",primary,1920x1080,0x0,normal,0".parse::<LayoutRecord>().is_err());
    }

    #[test]
    fn test_layout_parse_reports_line_number() {
        let err = Layout::parse("HDMI-1,primary,1920x1080,0x0,normal,0\nbroken\n").unwrap_err();
        assert!(matches!(err, LayoutParseError::Line { line: 2, .. }));
    }

    #[test]
    fn test_layout_file_contents_preserve_order() {
        let layout = Layout::new(vec![record("DP-1", false, 1920, 1), record("HDMI-1", true, 0, 0)]);
        let text = layout.to_file_contents();
        assert_eq!(
            text,
            "DP-1,noprimary,1920x1080,1920x0,normal,1\nHDMI-1,primary,1920x1080,0x0,normal,0\n"
        );
        assert_eq!(Layout::parse(&text).unwrap(), layout);
    }

    #[test]
    fn test_encode_assigns_sequence_in_enumeration_order() {
        let active = vec![
            ActiveOutput {
                name: "eDP-1".to_string(),
                primary: false,
                resolution: Resolution::new(1366, 768),
                position: Position::new(1920, 0),
                rotation: Rotation::Normal,
            },
            ActiveOutput {
                name: "HDMI-1".to_string(),
                primary: true,
                resolution: Resolution::new(1920, 1080),
                position: Position::new(0, 0),
                rotation: Rotation::Inverted,
            },
        ];
        let layout = encode(active);
        let names: Vec<_> = layout.records().iter().map(|r| (r.output.as_str(), r.sequence)).collect();
        assert_eq!(names, vec![("eDP-1", 0), ("HDMI-1", 1)]);
        assert_eq!(layout.records()[1].rotation, Rotation::Inverted);
    }

    #[test]
    fn test_decode_disables_unmanaged_outputs() {
        let layout = Layout::new(vec![record("DP-1", false, 1920, 1), record("HDMI-1", true, 0, 0)]);
        let connected = vec!["HDMI-1".to_string(), "VGA-1".to_string(), "DP-1".to_string()];

        let clauses = layout.decode(&connected);
        assert_eq!(
            clauses,
            vec![
                Clause::Configure(record("DP-1", false, 1920, 1)),
                Clause::Configure(record("HDMI-1", true, 0, 0)),
                Clause::Disable("VGA-1".to_string()),
            ]
        );
    }

    #[test]
    fn test_decode_with_nothing_extra_connected() {
        let layout = Layout::new(vec![record("HDMI-1", true, 0, 0)]);
        let clauses = layout.decode(&["HDMI-1".to_string()]);
        assert_eq!(clauses, vec![Clause::Configure(record("HDMI-1", true, 0, 0))]);
    }
}
