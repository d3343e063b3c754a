//! Data structures for tramming runs.
//!
//! This module contains the probe point table, screw thread types, measured
//! heights and the pure adjustment computation.

pub mod adjustment;
pub mod measurement;
pub mod point;
pub mod thread;

pub use adjustment::{
    compute_adjustments, decompose_turns, turn_direction, Adjustment, TurnDirection,
    NEGLIGIBLE_DIFF_MM,
};
pub use measurement::MeasurementSet;
pub use point::{default_points, ProbePoint, MAX_PROBE_POINTS, MIN_PROBE_POINTS};
pub use thread::{ScrewSize, ScrewThread};
