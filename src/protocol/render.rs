//! Rendering of tramming results.
//!
//! Maps computed adjustments and failures to console lines and touchscreen
//! commands. Nothing here touches the machine.

use super::display::DisplayCommand;
use super::report::ReportSink;
use crate::data::{Adjustment, ProbePoint, TurnDirection};

/// Console message for a rejected screw thread code.
pub const INVALID_THREAD_MESSAGE: &str = "?(S)crew thread must be 30, 31, 40, 41, 50, or 51.";

/// Console message closing an aborted run.
pub const ABORTED_MESSAGE: &str = "G35 aborted.";

/// Degrees covered by one angle picture.
const ANGLE_SECTOR_HALF_DEGREES: u32 = 45;

/// Number of angle pictures per direction.
const ANGLE_SECTORS: u16 = 16;

/// Widgets showing the instruction for one adjusted point.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct WidgetSlot {
    /// Label receiving the instruction text.
    pub instruction_widget: String,
    /// Optional second label for the turn amount. Without it the amount is
    /// part of the instruction text.
    pub amount_widget: Option<String>,
    /// Image showing the turn direction.
    pub direction_picture_widget: String,
    /// Image showing the partial-turn angle.
    pub angle_picture_widget: String,
}

/// Picture resource ids used by the tramming page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DisplayTheme {
    /// Direction arrow for counter-clockwise.
    pub ccw_direction_picture: u16,
    /// Direction arrow for clockwise.
    pub cw_direction_picture: u16,
    /// First of the 16 counter-clockwise angle pictures.
    pub ccw_angle_base: u16,
    /// First of the 16 clockwise angle pictures.
    pub cw_angle_base: u16,
}

impl Default for DisplayTheme {
    fn default() -> Self {
        Self {
            ccw_direction_picture: 171,
            cw_direction_picture: 207,
            ccw_angle_base: 172,
            cw_angle_base: 188,
        }
    }
}

impl DisplayTheme {
    /// Picture for the direction arrow.
    pub fn direction_picture(&self, direction: TurnDirection) -> u16 {
        match direction {
            TurnDirection::CounterClockwise => self.ccw_direction_picture,
            TurnDirection::Clockwise => self.cw_direction_picture,
        }
    }

    /// Picture for a partial turn of `degrees` in `direction`.
    pub fn angle_picture(&self, direction: TurnDirection, degrees: u32) -> u16 {
        let base = match direction {
            TurnDirection::CounterClockwise => self.ccw_angle_base,
            TurnDirection::Clockwise => self.cw_angle_base,
        };
        base + angle_sector(degrees)
    }
}

/// Page layout: which widgets show which adjusted point.
///
/// Slot `n` shows the point at table index `n + 1`. Points without a slot are
/// only reported on the console.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DisplayLayout {
    /// Widget slots in point order.
    pub slots: Vec<WidgetSlot>,
    /// Picture ids.
    pub theme: DisplayTheme,
}

impl Default for DisplayLayout {
    fn default() -> Self {
        Self {
            slots: vec![
                WidgetSlot {
                    instruction_widget: "t41".to_string(),
                    amount_widget: None,
                    direction_picture_widget: "p0".to_string(),
                    angle_picture_widget: "p2".to_string(),
                },
                WidgetSlot {
                    instruction_widget: "t4".to_string(),
                    amount_widget: Some("t40".to_string()),
                    direction_picture_widget: "p1".to_string(),
                    angle_picture_widget: "p3".to_string(),
                },
            ],
            theme: DisplayTheme::default(),
        }
    }
}

impl DisplayLayout {
    /// Get the slot for the point at `point_index`.
    pub fn slot_for(&self, point_index: usize) -> Option<&WidgetSlot> {
        point_index
            .checked_sub(1)
            .and_then(|slot| self.slots.get(slot))
    }
}

/// Index of the 22.5 degree sector holding `degrees`.
///
/// Sector `k` covers `(22.5 * k, 22.5 * (k + 1)]`, with 0 falling into the
/// first sector and anything past 360 into the last.
pub fn angle_sector(degrees: u32) -> u16 {
    // ceil(degrees / 22.5) - 1, in integers.
    let sector = (2 * degrees + ANGLE_SECTOR_HALF_DEGREES - 1) / ANGLE_SECTOR_HALF_DEGREES;
    (sector.saturating_sub(1) as u16).min(ANGLE_SECTORS - 1)
}

/// Console line for one adjusted point.
///
/// # Example
///
/// ```
/// use bed_tramming::data::{Adjustment, ScrewThread};
/// use bed_tramming::protocol::adjustment_line;
///
/// let adj = Adjustment::new(1, "Front-Right", 0.7, ScrewThread::M3Clockwise);
/// assert_eq!(
///     adjustment_line(&adj, false),
///     "Turn Front-Right CW by 1 turns and 144 degrees"
/// );
/// ```
pub fn adjustment_line(adjustment: &Adjustment, report_mm: bool) -> String {
    let mut line = format!(
        "Turn {} {} by {} turns and {} degrees",
        adjustment.point_name,
        adjustment.direction,
        adjustment.abs_full_turns(),
        adjustment.abs_degrees()
    );
    if report_mm {
        line.push_str(&format!(" ({:.3}mm)", adjustment.offset_mm()));
    }
    line
}

/// Console line for a point that could not be probed.
pub fn probe_failure_line(index: usize, point: &ProbePoint) -> String {
    format!(
        "G35 failed at point {} ({}) X{:.2} Y{:.2}",
        index + 1,
        point.name,
        point.x,
        point.y
    )
}

/// Display commands for one adjusted point.
pub fn display_commands(
    adjustment: &Adjustment,
    slot: &WidgetSlot,
    theme: &DisplayTheme,
) -> Vec<DisplayCommand> {
    let direction = adjustment.direction;
    let turns = adjustment.abs_full_turns();
    let degrees = adjustment.abs_degrees();

    let mut commands = Vec::with_capacity(4);
    match &slot.amount_widget {
        None => commands.push(DisplayCommand::text(
            slot.instruction_widget.as_str(),
            format!(
                "Turn {} {} by {} turns and {} degree",
                adjustment.point_name, direction, turns, degrees
            ),
        )),
        Some(amount_widget) => {
            commands.push(DisplayCommand::text(
                slot.instruction_widget.as_str(),
                format!("Turn {} {}", adjustment.point_name, direction),
            ));
            commands.push(DisplayCommand::text(
                amount_widget.as_str(),
                format!("{} Turns and {} Degree", turns, degrees),
            ));
        }
    }
    commands.push(DisplayCommand::picture(
        slot.direction_picture_widget.as_str(),
        theme.direction_picture(direction),
    ));
    commands.push(DisplayCommand::picture(
        slot.angle_picture_widget.as_str(),
        theme.angle_picture(direction, degrees),
    ));
    commands
}

/// Write the instructions for all adjusted points to `sink`.
///
/// Each point gets its console line; points with a display slot also get
/// their display commands, sent before the console line.
pub fn report_adjustments(
    sink: &mut dyn ReportSink,
    adjustments: &[Adjustment],
    report_mm: bool,
    layout: Option<&DisplayLayout>,
) {
    for adjustment in adjustments {
        if let Some(layout) = layout {
            if let Some(slot) = layout.slot_for(adjustment.point_index) {
                for command in display_commands(adjustment, slot, &layout.theme) {
                    sink.send_display(&command);
                }
            }
        }
        sink.echo_line(&adjustment_line(adjustment, report_mm));
    }
}
