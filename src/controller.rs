//! Assisted tramming controller (G35).
//!
//! Probes the configured bed points, tells the user how far to turn each bed
//! screw relative to the first point, and leaves the machine in a known
//! state: probe stowed, parked, Z marked as needing a re-home.

use tracing::{debug, info, info_span, warn};

use crate::config::TrammingConfig;
use crate::data::{compute_adjustments, Adjustment, MeasurementSet, ProbePoint, ScrewThread};
use crate::error::{Error, ProbeFault, Result};
use crate::machine::{Axis, AxisMask, Hardware, MachineState, MachineStateSnapshot, ProbeRaise};
use crate::protocol::{
    probe_failure_line, report_adjustments, ReportSink, ABORTED_MESSAGE, INVALID_THREAD_MESSAGE,
};

/// Result of a completed tramming run.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TrammingReport {
    /// Thread the adjustments were computed for.
    pub screw_thread: ScrewThread,
    /// Heights measured at every point.
    pub measurements: MeasurementSet,
    /// Instructions for every point after the reference.
    pub adjustments: Vec<Adjustment>,
}

impl TrammingReport {
    /// Whether no screw needs turning.
    pub fn is_level(&self) -> bool {
        self.adjustments.iter().all(Adjustment::is_level)
    }

    /// Largest height difference to the reference, in millimeters.
    pub fn max_abs_diff(&self) -> f64 {
        self.adjustments
            .iter()
            .map(|a| a.diff.abs())
            .fold(0.0, f64::max)
    }
}

/// Runs the G35 assisted tramming procedure.
#[derive(Debug, Clone)]
pub struct TrammingController {
    config: TrammingConfig,
}

impl TrammingController {
    /// Create a controller.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if the configuration is unusable.
    pub fn new(config: TrammingConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Get the configuration.
    pub fn config(&self) -> &TrammingConfig {
        &self.config
    }

    /// Run `G35 [S<screw_thread>]`.
    ///
    /// `screw_thread` falls back to the configured default when `None`.
    /// All output goes to `sink`; the returned value mirrors it for callers
    /// that want structured results.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidScrewThread`] if the code is not accepted. Nothing
    ///   has been touched in that case.
    /// - [`Error::ProbeFailed`] if a point could not be measured. Probing
    ///   stops at that point, but the tool, leveling, probe, parking and
    ///   homing cleanup has still been done.
    /// - [`Error::InvalidConfig`] if a tool other than 0 is active on a
    ///   multi-hotend machine and `hw` has no tool changer. Nothing has been
    ///   touched in that case.
    pub fn run(
        &self,
        screw_thread: Option<i32>,
        hw: &mut Hardware<'_>,
        state: &mut MachineState,
        sink: &mut dyn ReportSink,
    ) -> Result<TrammingReport> {
        let span = info_span!("g35");
        let _enter = span.enter();

        let thread = match screw_thread {
            None => self.config.default_screw_thread,
            Some(code) => match ScrewThread::from_code(code) {
                Ok(thread) => thread,
                Err(e) => {
                    warn!("Rejected G35: {}", e);
                    sink.echo_line(INVALID_THREAD_MESSAGE);
                    return Err(e);
                }
            },
        };

        if state.has_multi_hotend() && state.active_tool() != 0 && hw.tools.is_none() {
            let e = Error::InvalidConfig {
                reason: format!(
                    "tool {} is active on a multi-hotend machine but no tool changer was given",
                    state.active_tool()
                ),
            };
            warn!("Rejected G35: {}", e);
            return Err(e);
        }

        info!("Starting assisted tramming with {}", thread);
        debug!("Machine state before tramming: {:?}", state);

        hw.motion.synchronize();

        let snapshot = state.snapshot();
        state.set_leveling_enabled(false);
        let previous_tool = self.select_primary_tool(hw, state);
        state.set_duplication_enabled(false);
        self.home_if_needed(hw, state);

        let outcome = match self.probe_all(hw, sink) {
            Ok(measurements) => {
                let adjustments = compute_adjustments(&measurements, &self.config.points, thread);
                report_adjustments(
                    sink,
                    &adjustments,
                    self.config.report_mm,
                    self.config.display.as_ref(),
                );
                Ok(TrammingReport {
                    screw_thread: thread,
                    measurements,
                    adjustments,
                })
            }
            Err(e) => {
                sink.echo_line(ABORTED_MESSAGE);
                Err(e)
            }
        };

        self.restore(hw, state, previous_tool, &snapshot);

        match &outcome {
            Ok(report) => info!(
                "Tramming finished, largest difference {:.3}mm",
                report.max_abs_diff()
            ),
            Err(e) => warn!("Tramming aborted: {}", e),
        }
        outcome
    }

    /// Switch to tool 0 and return the tool to restore afterwards.
    fn select_primary_tool(&self, hw: &mut Hardware<'_>, state: &mut MachineState) -> Option<u8> {
        let previous = state.active_tool();
        if !state.has_multi_hotend() || previous == 0 {
            return None;
        }

        // Checked up front in `run`.
        let tools = hw.tools.as_deref_mut()?;
        debug!("Switching from tool {} to tool 0", previous);
        tools.change_tool(0, true);
        state.set_active_tool(0);
        Some(previous)
    }

    /// Home what is not trusted yet.
    ///
    /// Nothing when every axis is trusted, Z alone when X and Y are, all
    /// three otherwise.
    fn home_if_needed(&self, hw: &mut Hardware<'_>, state: &mut MachineState) {
        if state.all_axes_trusted() {
            debug!("All axes trusted, no homing needed");
            return;
        }

        let axes = if state.trusted().contains_all(AxisMask::XY) {
            AxisMask::Z
        } else {
            AxisMask::XYZ
        };
        info!("Homing {}", axes);
        hw.homing.home_axes(axes);
        state.mark_homed(axes);
    }

    /// Probe every point in order, stopping at the first failure.
    fn probe_all(&self, hw: &mut Hardware<'_>, sink: &mut dyn ReportSink) -> Result<MeasurementSet> {
        let mut measurements = MeasurementSet::new(self.config.probe_count());

        for (i, point) in self.config.points.iter().enumerate() {
            // The probe may travel deployed, so clear its pin as well.
            let clearance = self.config.z_clearance_between_probes + hw.probe.extra_clearance();
            hw.motion.move_to_z(clearance);

            let fault = match hw.probe.probe_at_point(point, ProbeRaise::Raise, true) {
                Ok(z) if z.is_finite() => {
                    debug!("Probing point {} ({}) Z{:.3}", i + 1, point, z);
                    if !measurements.record(i, z) {
                        warn!("Height for point {} recorded out of order, ignored", i + 1);
                    }
                    continue;
                }
                Ok(z) => ProbeFault::Other(format!("non-finite height {}", z)),
                Err(fault) => fault,
            };

            sink.echo_line(&probe_failure_line(i, point));
            return Err(probe_failed(i, point, fault));
        }

        Ok(measurements)
    }

    /// Put the machine back into a usable state after probing.
    fn restore(
        &self,
        hw: &mut Hardware<'_>,
        state: &mut MachineState,
        previous_tool: Option<u8>,
        snapshot: &MachineStateSnapshot,
    ) {
        if let Some(tool) = previous_tool {
            if let Some(tools) = hw.tools.as_deref_mut() {
                debug!("Restoring tool {}", tool);
                tools.change_tool(tool, !self.config.parking_extruder);
                state.set_active_tool(tool);
            }
        }

        if self.config.restore_leveling_after {
            state.set_leveling_enabled(snapshot.leveling_active);
        }

        // The last successful probe leaves the probe deployed.
        hw.probe.stow();
        hw.motion.move_to(self.config.wait_position);

        // Probing without leveling invalidates the Z reference.
        state.set_axis_never_homed(Axis::Z);
    }
}

fn probe_failed(index: usize, point: &ProbePoint, fault: ProbeFault) -> Error {
    Error::ProbeFailed {
        number: index + 1,
        name: point.name.clone(),
        x: point.x,
        y: point.y,
        reason: fault.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::TurnDirection;
    use crate::machine::{MockHoming, MockMotion, MockToolChanger, MockZProbe, Position};
    use crate::protocol::{DisplayCommand, MemorySink};
    use mockall::predicate::eq;
    use mockall::Sequence;
    use pretty_assertions::assert_eq;

    fn three_points() -> Vec<ProbePoint> {
        vec![
            ProbePoint::new(20.0, 20.0, "Front-Left"),
            ProbePoint::new(180.0, 20.0, "Front-Right"),
            ProbePoint::new(100.0, 180.0, "Back"),
        ]
    }

    fn controller(config: TrammingConfig) -> TrammingController {
        TrammingController::new(config.with_points(three_points())).unwrap()
    }

    fn trusted_state() -> MachineState {
        MachineState::new().with_homed(AxisMask::XYZ)
    }

    /// Probe returning `readings` in order, with no extra clearance.
    fn probe_with(readings: Vec<std::result::Result<f64, ProbeFault>>) -> MockZProbe {
        let calls = readings.len();
        let mut readings = readings.into_iter();
        let mut probe = MockZProbe::new();
        probe.expect_extra_clearance().return_const(0.0);
        probe
            .expect_probe_at_point()
            .withf(|_, raise, relative| *raise == ProbeRaise::Raise && *relative)
            .times(calls)
            .returning(move |_, _, _| readings.next().unwrap_or(Err(ProbeFault::NoTrigger)));
        probe.expect_stow().times(1).return_const(());
        probe
    }

    /// Motion expecting one clearance move per probe and one park.
    fn motion_with(probes: usize) -> MockMotion {
        let mut motion = MockMotion::new();
        motion.expect_synchronize().times(1).return_const(());
        motion
            .expect_move_to_z()
            .with(eq(DEFAULT_Z))
            .times(probes)
            .return_const(());
        motion
            .expect_move_to()
            .with(eq(Position::new(100.0, 100.0, 30.0)))
            .times(1)
            .return_const(());
        motion
    }

    const DEFAULT_Z: f64 = crate::config::DEFAULT_Z_CLEARANCE;

    #[test]
    fn test_invalid_thread_has_no_side_effects() {
        let controller = controller(TrammingConfig::default());

        for code in [-1, 0, 29, 32, 39, 42, 45, 52, 99, 1000] {
            // No expectations: any collaborator call panics.
            let mut motion = MockMotion::new();
            let mut probe = MockZProbe::new();
            let mut homing = MockHoming::new();
            let mut tools = MockToolChanger::new();
            let mut hw = Hardware::new(&mut motion, &mut probe, &mut homing).with_tools(&mut tools);

            let mut state = MachineState::new()
                .with_leveling(true, true)
                .with_hotends(2, 1)
                .with_duplication(true, true);
            let before = state.clone();
            let mut sink = MemorySink::new();

            let result = controller.run(Some(code), &mut hw, &mut state, &mut sink);

            assert_eq!(result.unwrap_err(), Error::InvalidScrewThread { code });
            assert_eq!(state, before);
            assert_eq!(sink.lines(), vec![INVALID_THREAD_MESSAGE.to_string()]);
            assert!(sink.display_commands().is_empty());
        }
    }

    #[test]
    fn test_successful_run_reports_adjustments() {
        let controller = controller(TrammingConfig::default().with_report_mm(false));
        let mut motion = motion_with(3);
        let mut probe = probe_with(vec![Ok(1.0), Ok(0.3), Ok(1.0005)]);
        let mut homing = MockHoming::new();
        let mut hw = Hardware::new(&mut motion, &mut probe, &mut homing);
        let mut state = trusted_state();
        let mut sink = MemorySink::new();

        let report = controller
            .run(Some(30), &mut hw, &mut state, &mut sink)
            .unwrap();

        assert_eq!(report.screw_thread, ScrewThread::M3Clockwise);
        assert_eq!(report.measurements.heights(), &[1.0, 0.3, 1.0005]);
        assert_eq!(report.adjustments.len(), 2);

        let first = &report.adjustments[0];
        assert_eq!(
            (first.full_turns, first.degrees, first.direction),
            (1, 144, TurnDirection::Clockwise)
        );
        assert!(report.adjustments[1].is_level());
        assert!(!report.is_level());

        assert_eq!(
            sink.lines(),
            vec![
                "Turn Front-Right CW by 1 turns and 144 degrees".to_string(),
                "Turn Back CCW by 0 turns and 0 degrees".to_string(),
            ]
        );
        assert_eq!(
            sink.display_commands()[..3].to_vec(),
            vec![
                DisplayCommand::text("t41", "Turn Front-Right CW by 1 turns and 144 degree"),
                DisplayCommand::picture("p0", 207),
                DisplayCommand::picture("p2", 194),
            ]
        );
        assert!(!state.is_homed(Axis::Z));
    }

    #[test]
    fn test_default_thread_used_without_parameter() {
        let controller = controller(
            TrammingConfig::default().with_default_screw_thread(ScrewThread::M5CounterClockwise),
        );
        let mut motion = motion_with(3);
        let mut probe = probe_with(vec![Ok(0.2), Ok(0.9), Ok(0.2)]);
        let mut homing = MockHoming::new();
        let mut hw = Hardware::new(&mut motion, &mut probe, &mut homing);
        let mut sink = MemorySink::new();

        let report = controller
            .run(None, &mut hw, &mut trusted_state(), &mut sink)
            .unwrap();

        assert_eq!(report.screw_thread, ScrewThread::M5CounterClockwise);
        let adj = &report.adjustments[0];
        assert_eq!(
            (adj.full_turns, adj.degrees, adj.direction),
            (0, -315, TurnDirection::Clockwise)
        );
        assert_eq!(
            sink.lines()[0],
            "Turn Front-Right CW by 0 turns and 315 degrees (0.700mm)"
        );
    }

    #[test]
    fn test_probe_failure_aborts_and_cleans_up() {
        let controller = controller(TrammingConfig::default().with_restore_leveling_after(true));
        let mut motion = motion_with(2);
        let mut probe = probe_with(vec![Ok(0.1), Err(ProbeFault::NoTrigger)]);
        let mut homing = MockHoming::new();
        let mut tools = MockToolChanger::new();
        let mut seq = Sequence::new();
        tools
            .expect_change_tool()
            .with(eq(0), eq(true))
            .times(1)
            .in_sequence(&mut seq)
            .return_const(());
        tools
            .expect_change_tool()
            .with(eq(1), eq(true))
            .times(1)
            .in_sequence(&mut seq)
            .return_const(());
        let mut hw = Hardware::new(&mut motion, &mut probe, &mut homing).with_tools(&mut tools);
        let mut state = trusted_state().with_leveling(true, true).with_hotends(2, 1);
        let mut sink = MemorySink::new();

        let err = controller
            .run(Some(40), &mut hw, &mut state, &mut sink)
            .unwrap_err();

        assert_eq!(
            err,
            Error::ProbeFailed {
                number: 2,
                name: "Front-Right".to_string(),
                x: 180.0,
                y: 20.0,
                reason: "probe did not trigger".to_string(),
            }
        );
        assert_eq!(
            sink.lines(),
            vec![
                "G35 failed at point 2 (Front-Right) X180.00 Y20.00".to_string(),
                ABORTED_MESSAGE.to_string(),
            ]
        );
        assert!(sink.display_commands().is_empty());
        assert_eq!(state.active_tool(), 1);
        assert!(state.is_leveling_active());
        assert!(!state.is_homed(Axis::Z));
    }

    #[test]
    fn test_non_finite_height_is_a_failure() {
        let controller = controller(TrammingConfig::default());
        let mut motion = motion_with(1);
        let mut probe = probe_with(vec![Ok(f64::NAN)]);
        let mut homing = MockHoming::new();
        let mut hw = Hardware::new(&mut motion, &mut probe, &mut homing);
        let mut sink = MemorySink::new();

        let err = controller
            .run(Some(31), &mut hw, &mut trusted_state(), &mut sink)
            .unwrap_err();

        assert!(matches!(err, Error::ProbeFailed { number: 1, .. }));
        assert_eq!(sink.lines().last().unwrap(), ABORTED_MESSAGE);
    }

    #[test]
    fn test_no_tool_change_on_tool_zero() {
        let controller = controller(TrammingConfig::default());
        let mut motion = motion_with(3);
        let mut probe = probe_with(vec![Ok(0.0); 3]);
        let mut homing = MockHoming::new();
        // No expectations: a tool change would panic.
        let mut tools = MockToolChanger::new();
        let mut hw = Hardware::new(&mut motion, &mut probe, &mut homing).with_tools(&mut tools);
        let mut state = trusted_state().with_hotends(2, 0);

        let report = controller
            .run(Some(50), &mut hw, &mut state, &mut MemorySink::new())
            .unwrap();

        assert!(report.is_level());
        assert_eq!(state.active_tool(), 0);
    }

    #[test]
    fn test_rejects_secondary_tool_without_changer() {
        let controller = controller(TrammingConfig::default());
        // No expectations: any hardware call would panic.
        let mut motion = MockMotion::new();
        let mut probe = MockZProbe::new();
        let mut homing = MockHoming::new();
        let mut hw = Hardware::new(&mut motion, &mut probe, &mut homing);
        let mut state = trusted_state().with_hotends(2, 1);
        let before = state.clone();
        let mut sink = MemorySink::new();

        let err = controller
            .run(Some(30), &mut hw, &mut state, &mut sink)
            .unwrap_err();

        assert!(matches!(err, Error::InvalidConfig { .. }));
        assert_eq!(state, before);
        assert_eq!(state.active_tool(), 1);
        assert!(sink.lines().is_empty());
    }

    #[test]
    fn test_tool_zero_without_changer_runs() {
        let controller = controller(TrammingConfig::default());
        let mut motion = motion_with(3);
        let mut probe = probe_with(vec![Ok(0.0); 3]);
        let mut homing = MockHoming::new();
        let mut hw = Hardware::new(&mut motion, &mut probe, &mut homing);
        let mut state = trusted_state().with_hotends(2, 0);

        let report = controller
            .run(Some(30), &mut hw, &mut state, &mut MemorySink::new())
            .unwrap();

        assert!(report.is_level());
        assert_eq!(state.active_tool(), 0);
    }

    #[test]
    fn test_parking_extruder_restores_with_park() {
        let controller = controller(TrammingConfig::default().with_parking_extruder(true));
        let mut motion = motion_with(3);
        let mut probe = probe_with(vec![Ok(0.0); 3]);
        let mut homing = MockHoming::new();
        let mut tools = MockToolChanger::new();
        tools
            .expect_change_tool()
            .with(eq(0), eq(true))
            .times(1)
            .return_const(());
        tools
            .expect_change_tool()
            .with(eq(2), eq(false))
            .times(1)
            .return_const(());
        let mut hw = Hardware::new(&mut motion, &mut probe, &mut homing).with_tools(&mut tools);
        let mut state = trusted_state().with_hotends(3, 2);

        controller
            .run(Some(30), &mut hw, &mut state, &mut MemorySink::new())
            .unwrap();

        assert_eq!(state.active_tool(), 2);
    }

    #[test]
    fn test_leveling_and_duplication_left_off_by_default() {
        let controller = controller(TrammingConfig::default());
        let mut motion = motion_with(3);
        let mut probe = probe_with(vec![Ok(0.0); 3]);
        let mut homing = MockHoming::new();
        let mut hw = Hardware::new(&mut motion, &mut probe, &mut homing);
        let mut state = trusted_state()
            .with_leveling(true, true)
            .with_duplication(true, true);

        controller
            .run(Some(30), &mut hw, &mut state, &mut MemorySink::new())
            .unwrap();

        assert!(!state.is_leveling_active());
        assert!(!state.is_duplication_enabled());
    }

    #[test]
    fn test_homes_z_only_when_xy_trusted() {
        let controller = controller(TrammingConfig::default());
        let mut motion = motion_with(3);
        let mut probe = probe_with(vec![Ok(0.0); 3]);
        let mut homing = MockHoming::new();
        homing
            .expect_home_axes()
            .with(eq(AxisMask::Z))
            .times(1)
            .return_const(());
        let mut hw = Hardware::new(&mut motion, &mut probe, &mut homing);
        let mut state = MachineState::new().with_homed(AxisMask::XY);

        controller
            .run(Some(30), &mut hw, &mut state, &mut MemorySink::new())
            .unwrap();

        assert_eq!(state.homed(), AxisMask::XY);
    }

    #[test]
    fn test_homes_all_axes_when_untrusted() {
        let controller = controller(TrammingConfig::default());
        let mut motion = motion_with(3);
        let mut probe = probe_with(vec![Ok(0.0); 3]);
        let mut homing = MockHoming::new();
        homing
            .expect_home_axes()
            .with(eq(AxisMask::XYZ))
            .times(1)
            .return_const(());
        let mut hw = Hardware::new(&mut motion, &mut probe, &mut homing);
        let mut state = MachineState::new();

        controller
            .run(Some(30), &mut hw, &mut state, &mut MemorySink::new())
            .unwrap();

        assert_eq!(state.trusted(), AxisMask::XY);
    }

    #[test]
    fn test_call_order() {
        let controller = controller(TrammingConfig::default());
        let mut seq = Sequence::new();
        let mut motion = MockMotion::new();
        let mut probe = MockZProbe::new();
        let mut homing = MockHoming::new();

        probe.expect_extra_clearance().return_const(2.0);
        motion
            .expect_synchronize()
            .times(1)
            .in_sequence(&mut seq)
            .return_const(());
        homing
            .expect_home_axes()
            .times(1)
            .in_sequence(&mut seq)
            .return_const(());
        for point in three_points() {
            motion
                .expect_move_to_z()
                .with(eq(DEFAULT_Z + 2.0))
                .times(1)
                .in_sequence(&mut seq)
                .return_const(());
            probe
                .expect_probe_at_point()
                .withf(move |p, _, _| p.name == point.name)
                .times(1)
                .in_sequence(&mut seq)
                .returning(|_, _, _| Ok(0.05));
        }
        probe
            .expect_stow()
            .times(1)
            .in_sequence(&mut seq)
            .return_const(());
        motion
            .expect_move_to()
            .times(1)
            .in_sequence(&mut seq)
            .return_const(());

        let mut hw = Hardware::new(&mut motion, &mut probe, &mut homing);
        controller
            .run(Some(41), &mut hw, &mut MachineState::new(), &mut MemorySink::new())
            .unwrap();
    }

    #[test]
    fn test_console_only_without_display() {
        let controller = controller(TrammingConfig::default().with_display(None));
        let mut motion = motion_with(3);
        let mut probe = probe_with(vec![Ok(0.5), Ok(0.4), Ok(0.6)]);
        let mut homing = MockHoming::new();
        let mut hw = Hardware::new(&mut motion, &mut probe, &mut homing);
        let mut sink = MemorySink::new();

        controller
            .run(Some(30), &mut hw, &mut trusted_state(), &mut sink)
            .unwrap();

        assert_eq!(sink.lines().len(), 2);
        assert!(sink.display_commands().is_empty());
    }

    #[test]
    fn test_rejects_invalid_config() {
        let config = TrammingConfig::default().with_points(Vec::new());
        assert!(matches!(
            TrammingController::new(config),
            Err(Error::InvalidConfig { .. })
        ));
    }

    #[test]
    fn test_report_helpers() {
        let report = TrammingReport {
            screw_thread: ScrewThread::M3Clockwise,
            measurements: MeasurementSet::from_heights(vec![0.0, 0.2, -0.5]),
            adjustments: vec![
                Adjustment::new(1, "B", -0.2, ScrewThread::M3Clockwise),
                Adjustment::new(2, "C", 0.5, ScrewThread::M3Clockwise),
            ],
        };
        assert!((report.max_abs_diff() - 0.5).abs() < 1e-12);
        assert!(!report.is_level());
    }
}
