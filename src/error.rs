//! Error types for the bed-tramming crate.

use thiserror::Error;

/// The main error type for this crate.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// The screw thread code is not one of 30, 31, 40, 41, 50 or 51.
    #[error("Invalid screw thread: {code} (must be 30, 31, 40, 41, 50, or 51)")]
    InvalidScrewThread {
        /// The rejected code.
        code: i32,
    },

    /// A probe point could not be measured and the procedure was aborted.
    #[error("Probing failed at point {number} ({name}) X{x:.2} Y{y:.2}: {reason}")]
    ProbeFailed {
        /// 1-based number of the failing point.
        number: usize,
        /// Display name of the failing point.
        name: String,
        /// X coordinate of the failing point.
        x: f64,
        /// Y coordinate of the failing point.
        y: f64,
        /// Why the probe could not measure.
        reason: String,
    },

    /// The tramming configuration cannot be used.
    #[error("Invalid configuration: {reason}")]
    InvalidConfig {
        /// Description of what is wrong with the configuration.
        reason: String,
    },

    /// A display protocol frame could not be decoded.
    #[error("Invalid display frame: {context}")]
    InvalidFrame {
        /// Description of what was invalid about the frame.
        context: String,
    },
}

/// A specialized Result type for this crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Failure reported by a probe collaborator for a single measurement.
///
/// Retrying is the probe's own business; the tramming procedure treats any
/// fault as terminal for the current run.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProbeFault {
    /// The probe never triggered within its travel.
    #[error("probe did not trigger")]
    NoTrigger,

    /// The probe triggered before it was expected to (stuck pin, debris).
    #[error("probe triggered before descent")]
    TriggeredEarly,

    /// The point lies outside the reachable probing area.
    #[error("point unreachable")]
    Unreachable,

    /// Any other fault described by the probe driver.
    #[error("{0}")]
    Other(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_screw_thread_message() {
        let err = Error::InvalidScrewThread { code: 32 };
        assert_eq!(
            err.to_string(),
            "Invalid screw thread: 32 (must be 30, 31, 40, 41, 50, or 51)"
        );
    }

    #[test]
    fn test_probe_failed_message() {
        let err = Error::ProbeFailed {
            number: 2,
            name: "Front-Right".to_string(),
            x: 180.0,
            y: 20.0,
            reason: ProbeFault::NoTrigger.to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Probing failed at point 2 (Front-Right) X180.00 Y20.00: probe did not trigger"
        );
    }
}
