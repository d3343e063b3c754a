//! Machine interface module.
//!
//! This module provides the state context and the hardware collaborator
//! traits the tramming procedure runs against.

pub mod collaborators;
pub mod state;

pub use collaborators::{Hardware, Homing, Motion, ProbeRaise, ToolChanger, ZProbe};
pub use state::{Axis, AxisMask, MachineState, MachineStateSnapshot, Position};

#[cfg(test)]
pub use collaborators::{MockHoming, MockMotion, MockToolChanger, MockZProbe};
