//! Screw adjustment computation.
//!
//! Turns the height differences measured during a tramming run into screw
//! instructions: how many full turns plus how many degrees, and which way.
//! Everything here is pure so the arithmetic can be checked without a machine.

use super::measurement::MeasurementSet;
use super::point::ProbePoint;
use super::thread::ScrewThread;

/// Height differences below this many millimeters are treated as level.
pub const NEGLIGIBLE_DIFF_MM: f64 = 0.001;

/// Resolution used when splitting a rotation into turns and degrees.
///
/// Heights and pitches such as 0.7 or 0.8 mm are not exact in binary, so a
/// rotation of exactly 1.4 turns arrives as 1.39999... Snapping to a
/// micro-degree keeps those cases on the intended degree while still
/// truncating toward zero.
const MICRODEGREES_PER_DEGREE: i64 = 1_000_000;
const MICRODEGREES_PER_TURN: i64 = 360 * MICRODEGREES_PER_DEGREE;

/// Direction to turn a bed screw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TurnDirection {
    /// Clockwise, seen from above the screw head.
    Clockwise,
    /// Counter-clockwise, seen from above the screw head.
    CounterClockwise,
}

impl TurnDirection {
    /// Short form used in reports ("CW" / "CCW").
    pub fn abbreviation(&self) -> &'static str {
        match self {
            Self::Clockwise => "CW",
            Self::CounterClockwise => "CCW",
        }
    }

    /// Check if this is counter-clockwise.
    pub fn is_counter_clockwise(&self) -> bool {
        matches!(self, Self::CounterClockwise)
    }
}

impl std::fmt::Display for TurnDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.abbreviation())
    }
}

/// Decide the turn direction for a signed adjustment.
///
/// Counter-clockwise when the thread code parity equals `adjust > 0`.
/// A zero adjustment follows the same rule.
pub fn turn_direction(thread: ScrewThread, adjust: f64) -> TurnDirection {
    if thread.is_odd() == (adjust > 0.0) {
        TurnDirection::CounterClockwise
    } else {
        TurnDirection::Clockwise
    }
}

/// Split a signed number of turns into `(full_turns, degrees)`.
///
/// Both parts truncate toward zero and carry the sign of `adjust`, so
/// `-0.875` gives `(0, -315)` and `-1.5` gives `(-1, -180)`. Rotations too
/// large for an `i32` of turns saturate instead of wrapping.
///
/// # Example
///
/// ```
/// use bed_tramming::data::decompose_turns;
///
/// assert_eq!(decompose_turns(1.4), (1, 144));
/// assert_eq!(decompose_turns(-0.875), (0, -315));
/// ```
pub fn decompose_turns(adjust: f64) -> (i32, i32) {
    // Float to int casts saturate, NaN becomes 0.
    let micro = (adjust * MICRODEGREES_PER_TURN as f64).round() as i64;
    // Integer division and remainder truncate toward zero.
    let full_turns = micro / MICRODEGREES_PER_TURN;
    let degrees = (micro % MICRODEGREES_PER_TURN) / MICRODEGREES_PER_DEGREE;

    let full_turns = i32::try_from(full_turns).unwrap_or(if full_turns < 0 {
        i32::MIN
    } else {
        i32::MAX
    });
    // |degrees| < 360
    let degrees = i32::try_from(degrees).unwrap_or_default();
    (full_turns, degrees)
}

/// Screw instruction for one non-reference point.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Adjustment {
    /// Index of the point in the probe table (never 0).
    pub point_index: usize,
    /// Name of the point.
    pub point_name: String,
    /// `reference height - point height` in millimeters.
    pub diff: f64,
    /// Signed screw turns (`diff / threads_factor`, or 0 when negligible).
    pub turns: f64,
    /// Whole turns, truncated toward zero.
    pub full_turns: i32,
    /// Degrees within the last turn, truncated toward zero, signed.
    pub degrees: i32,
    /// Which way to turn.
    pub direction: TurnDirection,
}

impl Adjustment {
    /// Compute the adjustment for a point from its height difference.
    pub fn new(
        point_index: usize,
        point_name: impl Into<String>,
        diff: f64,
        thread: ScrewThread,
    ) -> Self {
        let turns = if diff.abs() < NEGLIGIBLE_DIFF_MM {
            0.0
        } else {
            diff / thread.threads_factor()
        };
        let (full_turns, degrees) = decompose_turns(turns);

        Self {
            point_index,
            point_name: point_name.into(),
            diff,
            turns,
            full_turns,
            degrees,
            direction: turn_direction(thread, turns),
        }
    }

    /// Whole turns to apply, without sign.
    pub fn abs_full_turns(&self) -> u32 {
        self.full_turns.unsigned_abs()
    }

    /// Degrees to apply after the whole turns, without sign.
    pub fn abs_degrees(&self) -> u32 {
        self.degrees.unsigned_abs()
    }

    /// Whether the point needs no adjustment.
    pub fn is_level(&self) -> bool {
        self.full_turns == 0 && self.degrees == 0
    }

    /// Height of the point relative to the reference, in millimeters.
    pub fn offset_mm(&self) -> f64 {
        -self.diff
    }
}

/// Compute screw adjustments for every point after the reference.
///
/// Point 0 is the reference and never appears in the result. Points missing
/// from `points` are named by their 1-based number.
pub fn compute_adjustments(
    measurements: &MeasurementSet,
    points: &[ProbePoint],
    thread: ScrewThread,
) -> Vec<Adjustment> {
    let heights = measurements.heights();
    let Some(&reference) = heights.first() else {
        return Vec::new();
    };

    heights
        .iter()
        .enumerate()
        .skip(1)
        .map(|(i, &height)| {
            let name = points
                .get(i)
                .map(|p| p.name.clone())
                .unwrap_or_else(|| format!("Point {}", i + 1));
            Adjustment::new(i, name, reference - height, thread)
        })
        .collect()
}
