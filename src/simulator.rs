//! Simulated printer for demos and tests.
//!
//! Models a bed whose height at each adjusting screw can be changed by
//! turning that screw, and records every hardware call in a journal.

use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, trace};

use crate::controller::TrammingReport;
use crate::data::{Adjustment, ProbePoint, ScrewThread};
use crate::error::ProbeFault;
use crate::machine::{AxisMask, Homing, Motion, Position, ProbeRaise, ToolChanger, ZProbe};

/// Coordinates closer than this are treated as the same screw.
const POINT_TOLERANCE_MM: f64 = 0.01;

/// A hardware call seen by the simulator.
#[derive(Debug, Clone, PartialEq)]
pub enum SimEvent {
    /// Planner synchronize.
    Synchronize,
    /// Z-only move.
    MoveToZ(f64),
    /// Full move.
    MoveTo(Position),
    /// Probe at the named point.
    Probe(String),
    /// Probe stowed.
    Stow,
    /// Axes homed.
    Home(AxisMask),
    /// Tool changed.
    ToolChange {
        /// New tool index.
        index: u8,
        /// Parking moves skipped.
        no_park: bool,
    },
}

#[derive(Debug, Clone)]
struct Screw {
    x: f64,
    y: f64,
    height: f64,
    fails: bool,
}

#[derive(Debug)]
struct SimState {
    screws: Vec<Screw>,
    position: Position,
    extra_clearance: f64,
    probe_deployed: bool,
    journal: Vec<SimEvent>,
}

impl SimState {
    fn screw_at(&self, x: f64, y: f64) -> Option<&Screw> {
        self.screws
            .iter()
            .find(|s| (s.x - x).abs() < POINT_TOLERANCE_MM && (s.y - y).abs() < POINT_TOLERANCE_MM)
    }
}

/// A printer with a screw-adjustable bed.
///
/// Clones share the same machine, so one printer can be lent as motion,
/// probe and homing collaborator of the same run.
#[derive(Debug, Clone)]
pub struct SimulatedPrinter {
    state: Arc<Mutex<SimState>>,
}

impl SimulatedPrinter {
    /// Create a printer with a screw under each point and the given heights.
    ///
    /// Missing heights default to 0.
    pub fn new(points: &[ProbePoint], heights: &[f64]) -> Self {
        let screws = points
            .iter()
            .enumerate()
            .map(|(i, p)| Screw {
                x: p.x,
                y: p.y,
                height: heights.get(i).copied().unwrap_or(0.0),
                fails: false,
            })
            .collect();

        Self {
            state: Arc::new(Mutex::new(SimState {
                screws,
                position: Position::default(),
                extra_clearance: 0.0,
                probe_deployed: false,
                journal: Vec::new(),
            })),
        }
    }

    /// Make the probe fail at the screw with table index `index`.
    pub fn with_failing_point(self, index: usize) -> Self {
        self.set_failing_point(index, true);
        self
    }

    /// Set the deployed-pin clearance the probe reports.
    pub fn with_extra_clearance(self, clearance: f64) -> Self {
        self.state.lock().extra_clearance = clearance;
        self
    }

    /// Make the probe fail, or stop failing, at the screw with table index
    /// `index`.
    pub fn set_failing_point(&self, index: usize, fails: bool) {
        if let Some(screw) = self.state.lock().screws.get_mut(index) {
            screw.fails = fails;
        }
    }

    /// Current bed heights at the screws.
    pub fn heights(&self) -> Vec<f64> {
        self.state.lock().screws.iter().map(|s| s.height).collect()
    }

    /// Current toolhead position.
    pub fn position(&self) -> Position {
        self.state.lock().position
    }

    /// Whether the probe is deployed.
    pub fn is_probe_deployed(&self) -> bool {
        self.state.lock().probe_deployed
    }

    /// Every hardware call so far.
    pub fn journal(&self) -> Vec<SimEvent> {
        self.state.lock().journal.clone()
    }

    /// Count journal entries matching `f`.
    pub fn count(&self, f: impl Fn(&SimEvent) -> bool) -> usize {
        self.state.lock().journal.iter().filter(|e| f(e)).count()
    }

    /// Forget the journal.
    pub fn clear_journal(&self) {
        self.state.lock().journal.clear();
    }

    /// Turn one screw as instructed.
    ///
    /// Turning in the direction the report gives for a positive adjustment
    /// raises the bed at that screw by one thread pitch per turn.
    pub fn turn_screw(&self, adjustment: &Adjustment, thread: ScrewThread) {
        let mut state = self.state.lock();
        let Some(screw) = state.screws.get_mut(adjustment.point_index) else {
            return;
        };

        let turns = adjustment.abs_full_turns() as f64 + adjustment.abs_degrees() as f64 / 360.0;
        let raises = adjustment.direction.is_counter_clockwise() == thread.is_odd();
        let delta = turns * thread.threads_factor();
        screw.height += if raises { delta } else { -delta };
        debug!(
            "Turned screw {} {} by {:.3} turns, height now {:.4}",
            adjustment.point_index, adjustment.direction, turns, screw.height
        );
    }

    /// Turn every screw as the report instructs.
    pub fn apply_report(&self, report: &TrammingReport) {
        for adjustment in &report.adjustments {
            self.turn_screw(adjustment, report.screw_thread);
        }
    }
}

impl Motion for SimulatedPrinter {
    fn synchronize(&mut self) {
        self.state.lock().journal.push(SimEvent::Synchronize);
    }

    fn move_to_z(&mut self, z: f64) {
        let mut state = self.state.lock();
        state.position.z = z;
        state.journal.push(SimEvent::MoveToZ(z));
    }

    fn move_to(&mut self, position: Position) {
        let mut state = self.state.lock();
        state.position = position;
        state.journal.push(SimEvent::MoveTo(position));
    }
}

impl ZProbe for SimulatedPrinter {
    fn probe_at_point(
        &mut self,
        point: &ProbePoint,
        raise: ProbeRaise,
        _probe_relative: bool,
    ) -> Result<f64, ProbeFault> {
        let mut state = self.state.lock();
        state.journal.push(SimEvent::Probe(point.name.clone()));
        state.probe_deployed = true;

        let screw = state.screw_at(point.x, point.y).ok_or(ProbeFault::Unreachable)?;
        if screw.fails {
            return Err(ProbeFault::NoTrigger);
        }
        let height = screw.height;
        trace!("Simulated probe at {} read {:.4}", point, height);

        state.position = Position::new(point.x, point.y, height);
        match raise {
            ProbeRaise::Stow | ProbeRaise::LastStow => state.probe_deployed = false,
            ProbeRaise::Raise | ProbeRaise::BigRaise => {
                state.position.z += state.extra_clearance;
            }
            ProbeRaise::None => {}
        }
        Ok(height)
    }

    fn stow(&mut self) {
        let mut state = self.state.lock();
        state.probe_deployed = false;
        state.journal.push(SimEvent::Stow);
    }

    fn extra_clearance(&self) -> f64 {
        self.state.lock().extra_clearance
    }
}

impl Homing for SimulatedPrinter {
    fn home_axes(&mut self, axes: AxisMask) {
        self.state.lock().journal.push(SimEvent::Home(axes));
    }
}

impl ToolChanger for SimulatedPrinter {
    fn change_tool(&mut self, index: u8, no_park: bool) {
        self.state
            .lock()
            .journal
            .push(SimEvent::ToolChange { index, no_park });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::default_points;

    #[test]
    fn test_probe_reads_screw_height() {
        let points = default_points();
        let mut sim = SimulatedPrinter::new(&points, &[0.1, 0.2]);

        assert_eq!(sim.probe_at_point(&points[1], ProbeRaise::Raise, true), Ok(0.2));
        assert_eq!(sim.probe_at_point(&points[3], ProbeRaise::Raise, true), Ok(0.0));
        assert!(sim.is_probe_deployed());
        sim.stow();
        assert!(!sim.is_probe_deployed());
        assert_eq!(sim.count(|e| matches!(e, SimEvent::Probe(_))), 2);
    }

    #[test]
    fn test_unknown_and_failing_points() {
        let points = default_points();
        let mut sim = SimulatedPrinter::new(&points, &[]).with_failing_point(2);
        let view = sim.clone();

        let elsewhere = ProbePoint::new(55.0, 55.0, "Middle");
        assert_eq!(
            sim.probe_at_point(&elsewhere, ProbeRaise::Raise, true),
            Err(ProbeFault::Unreachable)
        );
        assert_eq!(
            sim.probe_at_point(&points[2], ProbeRaise::Raise, true),
            Err(ProbeFault::NoTrigger)
        );
        assert_eq!(view.count(|e| matches!(e, SimEvent::Probe(_))), 2);

        view.set_failing_point(2, false);
        assert_eq!(sim.probe_at_point(&points[2], ProbeRaise::Raise, true), Ok(0.0));
    }

    #[test]
    fn test_turn_screw_raises_low_point() {
        let points = default_points();
        for thread in [ScrewThread::M3Clockwise, ScrewThread::M3CounterClockwise] {
            let sim = SimulatedPrinter::new(&points, &[1.0, 0.3]);
            let adj = Adjustment::new(1, "Front-Right", 0.7, thread);
            sim.turn_screw(&adj, thread);
            // 1 turn + 144 degrees of 0.5 mm pitch
            assert!((sim.heights()[1] - 1.0).abs() < 1e-9);
        }

        let sim = SimulatedPrinter::new(&points, &[1.0, 0.3]);
        let adj = Adjustment::new(1, "Front-Right", -0.2, ScrewThread::M4Clockwise);
        sim.turn_screw(&adj, ScrewThread::M4Clockwise);
        assert!(sim.heights()[1] < 0.3);
    }
}
