//! Hardware collaborators driven by the tramming procedure.
//!
//! Every call here blocks until the machine has finished the action. The
//! procedure never runs concurrently with other motion.

#[cfg(test)]
use mockall::automock;

use super::state::{AxisMask, Position};
use crate::data::ProbePoint;
use crate::error::ProbeFault;

/// What the probe does after taking a measurement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ProbeRaise {
    /// Stay at the trigger height.
    None,
    /// Stow the probe.
    Stow,
    /// Stow the probe if this was the last point.
    LastStow,
    /// Raise to the clearance height, probe stays deployed.
    #[default]
    Raise,
    /// Raise extra far.
    BigRaise,
}

/// Motion planner.
#[cfg_attr(test, automock)]
pub trait Motion {
    /// Block until every queued move has finished.
    fn synchronize(&mut self);

    /// Move Z to `z` and wait.
    fn move_to_z(&mut self, z: f64);

    /// Move to `position` and wait.
    fn move_to(&mut self, position: Position);
}

/// Bed probe.
#[cfg_attr(test, automock)]
pub trait ZProbe {
    /// Probe at `point` and return the measured Z height.
    ///
    /// With `probe_relative` the coordinates are where the probe, not the
    /// nozzle, should touch the bed.
    fn probe_at_point(
        &mut self,
        point: &ProbePoint,
        raise: ProbeRaise,
        probe_relative: bool,
    ) -> Result<f64, ProbeFault>;

    /// Stow the probe.
    fn stow(&mut self);

    /// Extra Z clearance needed while the probe travels deployed.
    fn extra_clearance(&self) -> f64 {
        0.0
    }
}

/// Tool changer on multi-hotend machines.
#[cfg_attr(test, automock)]
pub trait ToolChanger {
    /// Switch to tool `index`; `no_park` skips the parking moves.
    fn change_tool(&mut self, index: u8, no_park: bool);
}

/// Homing routine.
#[cfg_attr(test, automock)]
pub trait Homing {
    /// Home `axes` and wait.
    fn home_axes(&mut self, axes: AxisMask);
}

/// The collaborators lent to one tramming run.
pub struct Hardware<'a> {
    /// Motion planner.
    pub motion: &'a mut dyn Motion,
    /// Bed probe.
    pub probe: &'a mut dyn ZProbe,
    /// Homing routine.
    pub homing: &'a mut dyn Homing,
    /// Tool changer, if the machine has more than one hotend.
    pub tools: Option<&'a mut dyn ToolChanger>,
}

impl<'a> Hardware<'a> {
    /// Bundle single-tool hardware.
    pub fn new(
        motion: &'a mut dyn Motion,
        probe: &'a mut dyn ZProbe,
        homing: &'a mut dyn Homing,
    ) -> Self {
        Self {
            motion,
            probe,
            homing,
            tools: None,
        }
    }

    /// Attach a tool changer.
    pub fn with_tools(mut self, tools: &'a mut dyn ToolChanger) -> Self {
        self.tools = Some(tools);
        self
    }
}

impl std::fmt::Debug for Hardware<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Hardware")
            .field("tools", &self.tools.is_some())
            .finish()
    }
}
