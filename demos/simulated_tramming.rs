//! Simulated tramming example
//!
//! Demonstrates a full assisted tramming session on a simulated printer:
//! - Probing the four bed corners
//! - Reading the turn instructions from the console and touchscreen output
//! - Turning the screws and re-running to confirm the bed is level
//!
//! Run with: cargo run --example simulated_tramming
//!
//! To use another screw thread:
//!   cargo run --example simulated_tramming -- --thread 41

use bed_tramming::simulator::SimulatedPrinter;
use bed_tramming::{
    AxisMask, Hardware, MachineState, MemorySink, Result, TrammingConfig, TrammingController,
};

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("bed_tramming=debug".parse().unwrap()),
        )
        .init();

    println!("Assisted Bed Tramming");
    println!("=====================\n");

    // Parse command line arguments
    let args: Vec<String> = std::env::args().collect();
    let thread = args
        .iter()
        .position(|arg| arg == "--thread")
        .and_then(|i| args.get(i + 1))
        .and_then(|s| s.parse::<i32>().ok());

    let config = TrammingConfig::default();
    let printer = SimulatedPrinter::new(&config.points, &[0.10, 0.38, -0.12, 0.21]);
    let controller = TrammingController::new(config)?;
    let mut state = MachineState::new().with_homed(AxisMask::XYZ);

    for pass in 1..=2 {
        println!("=== Pass {} ===", pass);

        let mut motion = printer.clone();
        let mut probe = printer.clone();
        let mut homing = printer.clone();
        let mut hw = Hardware::new(&mut motion, &mut probe, &mut homing);
        let mut sink = MemorySink::new();

        let result = controller.run(thread, &mut hw, &mut state, &mut sink);
        let log = sink.drain();

        for line in &log.lines {
            println!("  {}", line);
        }
        println!("  ({} touchscreen commands)", log.display.len());

        let report = match result {
            Ok(report) => report,
            Err(e) => {
                println!("\nTramming failed: {}", e);
                return Err(e);
            }
        };

        println!("  Largest difference: {:.3}mm\n", report.max_abs_diff());
        if pass == 1 {
            println!("Turning screws as instructed...\n");
            printer.apply_report(&report);
        }
    }

    println!("Final heights:");
    for (point, height) in controller.config().points.iter().zip(printer.heights()) {
        println!("  {:<12} {:>7.3}mm", point.name, height);
    }

    Ok(())
}
