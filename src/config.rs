//! Tramming configuration.
//!
//! Site-specific settings: the probe point table, the default screw thread
//! and the behavior switches of the procedure. Defaults match a stock
//! 200x200 mm machine with M3 clockwise bed screws.

use crate::data::{default_points, ProbePoint, ScrewThread, MAX_PROBE_POINTS, MIN_PROBE_POINTS};
use crate::error::{Error, Result};
use crate::machine::Position;
use crate::protocol::DisplayLayout;

/// Default Z clearance between probe points in millimeters.
pub const DEFAULT_Z_CLEARANCE: f64 = 5.0;

/// Settings for the assisted tramming procedure.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct TrammingConfig {
    /// Points to probe, reference first.
    pub points: Vec<ProbePoint>,
    /// Thread used when the command gives none.
    pub default_screw_thread: ScrewThread,
    /// Re-enable leveling afterwards if it was on before.
    pub restore_leveling_after: bool,
    /// Append the height difference in millimeters to each instruction.
    pub report_mm: bool,
    /// Z height to raise to before moving to the next point.
    pub z_clearance_between_probes: f64,
    /// Where to park when done.
    pub wait_position: Position,
    /// The machine uses parking extruders; tool restore then parks.
    pub parking_extruder: bool,
    /// Touchscreen layout, or `None` for console-only output.
    pub display: Option<DisplayLayout>,
}

impl Default for TrammingConfig {
    fn default() -> Self {
        Self {
            points: default_points(),
            default_screw_thread: ScrewThread::M3Clockwise,
            restore_leveling_after: false,
            report_mm: true,
            z_clearance_between_probes: DEFAULT_Z_CLEARANCE,
            wait_position: Position::new(100.0, 100.0, 30.0),
            parking_extruder: false,
            display: Some(DisplayLayout::default()),
        }
    }
}

impl TrammingConfig {
    /// Create the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the probe point table.
    pub fn with_points(mut self, points: Vec<ProbePoint>) -> Self {
        self.points = points;
        self
    }

    /// Set the default screw thread.
    pub fn with_default_screw_thread(mut self, thread: ScrewThread) -> Self {
        self.default_screw_thread = thread;
        self
    }

    /// Restore the leveling flag after tramming.
    pub fn with_restore_leveling_after(mut self, restore: bool) -> Self {
        self.restore_leveling_after = restore;
        self
    }

    /// Report height differences in millimeters.
    pub fn with_report_mm(mut self, report_mm: bool) -> Self {
        self.report_mm = report_mm;
        self
    }

    /// Set the Z clearance between probes.
    pub fn with_z_clearance(mut self, z: f64) -> Self {
        self.z_clearance_between_probes = z;
        self
    }

    /// Set the parking position.
    pub fn with_wait_position(mut self, position: Position) -> Self {
        self.wait_position = position;
        self
    }

    /// Declare parking extruders.
    pub fn with_parking_extruder(mut self, parking: bool) -> Self {
        self.parking_extruder = parking;
        self
    }

    /// Set or remove the touchscreen layout.
    pub fn with_display(mut self, layout: Option<DisplayLayout>) -> Self {
        self.display = layout;
        self
    }

    /// Number of points probed per run.
    pub fn probe_count(&self) -> usize {
        self.points.len()
    }

    /// Check the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if the point table does not hold
    /// 3 to 9 named points with finite coordinates, or the clearance is not
    /// a finite non-negative height.
    pub fn validate(&self) -> Result<()> {
        let count = self.points.len();
        if !(MIN_PROBE_POINTS..=MAX_PROBE_POINTS).contains(&count) {
            return Err(Error::InvalidConfig {
                reason: format!(
                    "tramming needs between {} and {} points, got {}",
                    MIN_PROBE_POINTS, MAX_PROBE_POINTS, count
                ),
            });
        }

        for (i, point) in self.points.iter().enumerate() {
            if point.name.trim().is_empty() {
                return Err(Error::InvalidConfig {
                    reason: format!("point {} has no name", i + 1),
                });
            }
            if !point.x.is_finite() || !point.y.is_finite() {
                return Err(Error::InvalidConfig {
                    reason: format!("point {} ({}) has a non-finite coordinate", i + 1, point.name),
                });
            }
        }

        if !self.z_clearance_between_probes.is_finite() || self.z_clearance_between_probes < 0.0 {
            return Err(Error::InvalidConfig {
                reason: format!(
                    "z clearance must be a non-negative height, got {}",
                    self.z_clearance_between_probes
                ),
            });
        }

        Ok(())
    }
}
