//! Machine state shared between firmware features.
//!
//! Instead of process-wide globals, the flags the tramming procedure reads
//! and changes live in one [`MachineState`] value owned by the caller and
//! lent to the procedure for its duration.

use std::ops::{BitOr, BitOrAssign};

/// A linear axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Axis {
    /// X axis.
    X,
    /// Y axis.
    Y,
    /// Z axis.
    Z,
}

impl Axis {
    fn bit(&self) -> u8 {
        match self {
            Self::X => 0b001,
            Self::Y => 0b010,
            Self::Z => 0b100,
        }
    }
}

/// A set of axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AxisMask(u8);

impl AxisMask {
    /// No axes.
    pub const NONE: Self = Self(0);
    /// X only.
    pub const X: Self = Self(0b001);
    /// Y only.
    pub const Y: Self = Self(0b010);
    /// Z only.
    pub const Z: Self = Self(0b100);
    /// X and Y.
    pub const XY: Self = Self(0b011);
    /// All three axes.
    pub const XYZ: Self = Self(0b111);

    /// Check if `axis` is in the set.
    pub fn contains(&self, axis: Axis) -> bool {
        self.0 & axis.bit() != 0
    }

    /// Check if every axis of `other` is in the set.
    pub fn contains_all(&self, other: AxisMask) -> bool {
        self.0 & other.0 == other.0
    }

    /// Check if the set is empty.
    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// Remove `axis` from the set.
    pub fn without(self, axis: Axis) -> Self {
        Self(self.0 & !axis.bit())
    }
}

impl From<Axis> for AxisMask {
    fn from(axis: Axis) -> Self {
        Self(axis.bit())
    }
}

impl BitOr for AxisMask {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for AxisMask {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl std::fmt::Display for AxisMask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (axis, name) in [(Axis::X, 'X'), (Axis::Y, 'Y'), (Axis::Z, 'Z')] {
            if self.contains(axis) {
                write!(f, "{}", name)?;
            }
        }
        Ok(())
    }
}

/// A machine position in millimeters.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Position {
    /// X coordinate.
    pub x: f64,
    /// Y coordinate.
    pub y: f64,
    /// Z coordinate.
    pub z: f64,
}

impl Position {
    /// Create a new position.
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}

/// The state flags the tramming procedure reads and changes.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MachineState {
    /// Whether the machine has any bed leveling compensation.
    leveling_available: bool,
    /// Whether leveling compensation is applied to moves.
    leveling_active: bool,
    /// Number of hotends fitted.
    hotend_count: u8,
    /// Active tool index.
    active_tool: u8,
    /// Whether the machine has a duplication/mirroring mode.
    duplication_supported: bool,
    /// Whether duplication mode is on.
    duplication_enabled: bool,
    /// Axes homed since power-up.
    homed: AxisMask,
    /// Axes whose position is known to be accurate.
    trusted: AxisMask,
}

impl Default for MachineState {
    fn default() -> Self {
        Self {
            leveling_available: true,
            leveling_active: false,
            hotend_count: 1,
            active_tool: 0,
            duplication_supported: false,
            duplication_enabled: false,
            homed: AxisMask::NONE,
            trusted: AxisMask::NONE,
        }
    }
}

impl MachineState {
    /// Create a single-hotend machine with leveling available but off and
    /// nothing homed.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set leveling availability and whether it is currently active.
    pub fn with_leveling(mut self, available: bool, active: bool) -> Self {
        self.leveling_available = available;
        self.leveling_active = available && active;
        self
    }

    /// Set the number of hotends and the active tool.
    pub fn with_hotends(mut self, count: u8, active_tool: u8) -> Self {
        self.hotend_count = count.max(1);
        self.active_tool = active_tool.min(self.hotend_count - 1);
        self
    }

    /// Set duplication mode support and whether it is on.
    pub fn with_duplication(mut self, supported: bool, enabled: bool) -> Self {
        self.duplication_supported = supported;
        self.duplication_enabled = supported && enabled;
        self
    }

    /// Mark axes as homed and trusted.
    pub fn with_homed(mut self, axes: AxisMask) -> Self {
        self.mark_homed(axes);
        self
    }

    // === Bed leveling ===

    /// Whether the machine has leveling compensation.
    pub fn has_leveling(&self) -> bool {
        self.leveling_available
    }

    /// Whether leveling compensation is active.
    pub fn is_leveling_active(&self) -> bool {
        self.leveling_active
    }

    /// Enable or disable leveling compensation. Ignored without leveling.
    pub fn set_leveling_enabled(&mut self, enabled: bool) {
        if self.leveling_available {
            self.leveling_active = enabled;
        }
    }

    // === Tools ===

    /// Number of hotends fitted.
    pub fn hotend_count(&self) -> u8 {
        self.hotend_count
    }

    /// Whether more than one hotend is fitted.
    pub fn has_multi_hotend(&self) -> bool {
        self.hotend_count > 1
    }

    /// Active tool index.
    pub fn active_tool(&self) -> u8 {
        self.active_tool
    }

    /// Record a completed tool change.
    pub fn set_active_tool(&mut self, index: u8) {
        if index < self.hotend_count {
            self.active_tool = index;
        }
    }

    // === Duplication ===

    /// Whether the machine supports duplication mode.
    pub fn has_duplication(&self) -> bool {
        self.duplication_supported
    }

    /// Whether duplication mode is on.
    pub fn is_duplication_enabled(&self) -> bool {
        self.duplication_enabled
    }

    /// Turn duplication mode on or off. Ignored without duplication support.
    pub fn set_duplication_enabled(&mut self, enabled: bool) {
        if self.duplication_supported {
            self.duplication_enabled = enabled;
        }
    }

    // === Homing ===

    /// Axes homed since power-up.
    pub fn homed(&self) -> AxisMask {
        self.homed
    }

    /// Axes whose position is trusted.
    pub fn trusted(&self) -> AxisMask {
        self.trusted
    }

    /// Whether `axis` has been homed.
    pub fn is_homed(&self, axis: Axis) -> bool {
        self.homed.contains(axis)
    }

    /// Whether every axis position is trusted.
    pub fn all_axes_trusted(&self) -> bool {
        self.trusted.contains_all(AxisMask::XYZ)
    }

    /// Record that `axes` were homed.
    pub fn mark_homed(&mut self, axes: AxisMask) {
        self.homed |= axes;
        self.trusted |= axes;
    }

    /// Forget that `axis` was ever homed.
    pub fn set_axis_never_homed(&mut self, axis: Axis) {
        self.homed = self.homed.without(axis);
        self.trusted = self.trusted.without(axis);
    }

    /// Capture the flags the tramming procedure changes.
    pub fn snapshot(&self) -> MachineStateSnapshot {
        MachineStateSnapshot {
            leveling_active: self.leveling_active,
            active_tool: self.active_tool,
            duplication_enabled: self.duplication_enabled,
            z_homed: self.is_homed(Axis::Z),
        }
    }
}

/// Flags captured before a tramming run mutates them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MachineStateSnapshot {
    /// Leveling compensation was active.
    pub leveling_active: bool,
    /// Active tool index.
    pub active_tool: u8,
    /// Duplication mode was on.
    pub duplication_enabled: bool,
    /// Z had been homed.
    pub z_homed: bool,
}
