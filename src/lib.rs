//! # bed-tramming
//!
//! Assisted bed tramming (`G35`) for 3D printer firmware.
//!
//! The procedure probes one point above each bed adjusting screw, compares
//! every point with the first one and tells the user how far to turn each
//! screw: whole turns plus degrees, clockwise or counter-clockwise for the
//! configured screw thread. Results go to the host console and to the
//! vendor touchscreen.
//!
//! ## Features
//!
//! - **Probe loop**: 3 to 9 configured points, aborting cleanly on the first
//!   failed measurement
//! - **Screw arithmetic**: M3/M4/M5 threads of either handedness, turns and
//!   degrees truncated toward zero
//! - **State restoration**: tool, leveling, probe stow, parking and Z re-home
//!   marking, also after an abort
//! - **Touchscreen output**: framed display commands per adjusted point
//! - **Simulator**: a screw-adjustable bed for demos and tests
//!
//! ## Quick Start
//!
//! ```rust
//! use bed_tramming::simulator::SimulatedPrinter;
//! use bed_tramming::{
//!     AxisMask, Hardware, MachineState, MemorySink, Result, TrammingConfig, TrammingController,
//! };
//!
//! fn main() -> Result<()> {
//!     let config = TrammingConfig::default();
//!     let mut printer = SimulatedPrinter::new(&config.points, &[0.10, 0.25, 0.05, 0.10]);
//!     let controller = TrammingController::new(config)?;
//!
//!     let mut motion = printer.clone();
//!     let mut homing = printer.clone();
//!     let mut hw = Hardware::new(&mut motion, &mut printer, &mut homing);
//!     let mut state = MachineState::new().with_homed(AxisMask::XYZ);
//!     let mut sink = MemorySink::new();
//!
//!     let report = controller.run(Some(30), &mut hw, &mut state, &mut sink)?;
//!     for line in sink.lines() {
//!         println!("{}", line);
//!     }
//!     assert_eq!(report.adjustments.len(), 3);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! - `serde`: Enable serialization/deserialization for configuration and
//!   report types

// Public modules
pub mod config;
pub mod controller;
pub mod data;
pub mod error;
pub mod machine;
pub mod protocol;
pub mod simulator;

// Re-exports for convenience
pub use config::TrammingConfig;
pub use controller::{TrammingController, TrammingReport};
pub use error::{Error, ProbeFault, Result};

// Re-export commonly used types from submodules
pub use data::{
    compute_adjustments, Adjustment, MeasurementSet, ProbePoint, ScrewThread, TurnDirection,
};
pub use machine::{
    Axis, AxisMask, Hardware, Homing, MachineState, Motion, Position, ProbeRaise, ToolChanger,
    ZProbe,
};
pub use protocol::{DisplayCommand, DisplayLayout, MemorySink, ReportSink, SerialSink};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_exports() {
        // Verify that key types are exported
        let _ = std::any::TypeId::of::<TrammingController>();
        let _ = std::any::TypeId::of::<TrammingReport>();
        let _ = std::any::TypeId::of::<Error>();
        let _ = std::any::TypeId::of::<ScrewThread>();
        let _ = std::any::TypeId::of::<MachineState>();
        let _ = std::any::TypeId::of::<DisplayCommand>();
    }

    #[test]
    fn test_worked_examples() {
        let adj = Adjustment::new(1, "B", 1.0 - 0.3, ScrewThread::M3Clockwise);
        assert_eq!((adj.full_turns, adj.degrees), (1, 144));
        assert_eq!(adj.direction, TurnDirection::Clockwise);

        let adj = Adjustment::new(1, "B", 0.2 - 0.9, ScrewThread::M5CounterClockwise);
        assert_eq!((adj.full_turns, adj.abs_degrees()), (0, 315));
        assert_eq!(adj.direction, TurnDirection::Clockwise);
    }
}
