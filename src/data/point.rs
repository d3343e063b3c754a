//! Probe point definitions.
//!
//! A tramming run probes a fixed table of bed positions, one per adjusting
//! screw. The first entry is the reference every other point is compared to.

/// Minimum number of points a tramming table may hold.
pub const MIN_PROBE_POINTS: usize = 3;

/// Maximum number of points a tramming table may hold.
pub const MAX_PROBE_POINTS: usize = 9;

/// A fixed bed position probed during tramming.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ProbePoint {
    /// X coordinate in millimeters.
    pub x: f64,
    /// Y coordinate in millimeters.
    pub y: f64,
    /// Human-readable name shown in reports ("Front-Left", ...).
    pub name: String,
}

impl ProbePoint {
    /// Create a new probe point.
    pub fn new(x: f64, y: f64, name: impl Into<String>) -> Self {
        Self {
            x,
            y,
            name: name.into(),
        }
    }

    /// Get the point coordinates as an `(x, y)` pair.
    pub fn xy(&self) -> (f64, f64) {
        (self.x, self.y)
    }
}

impl std::fmt::Display for ProbePoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} X{:.2} Y{:.2}", self.name, self.x, self.y)
    }
}

/// The stock four-corner table for a 200x200 mm bed.
///
/// Order is front-left, front-right, back-right, back-left, so front-left is
/// the reference screw.
pub fn default_points() -> Vec<ProbePoint> {
    vec![
        ProbePoint::new(20.0, 20.0, "Front-Left"),
        ProbePoint::new(180.0, 20.0, "Front-Right"),
        ProbePoint::new(180.0, 180.0, "Back-Right"),
        ProbePoint::new(20.0, 180.0, "Back-Left"),
    ]
}
