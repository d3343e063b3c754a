//! Protocol module for reporting tramming results.
//!
//! This module contains the implementations for:
//! - Touchscreen display command framing
//! - Report sinks (memory, serial stream)
//! - Rendering of adjustments and failures

pub mod display;
pub mod render;
pub mod report;

pub use display::{decode_frames, DisplayCommand, DisplayValue};
pub use render::{
    adjustment_line, angle_sector, display_commands, probe_failure_line, report_adjustments,
    DisplayLayout, DisplayTheme, WidgetSlot, ABORTED_MESSAGE, INVALID_THREAD_MESSAGE,
};
pub use report::{MemorySink, ReportLog, ReportSink, SerialSink};
