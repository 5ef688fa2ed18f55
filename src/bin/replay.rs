//! L3GD20 session replay
//!
//! Runs a recorded session (CSV of raw x,y,z register counts, one line per
//! 500 ms tick) through the full conditioning/window/distance pipeline with
//! no real-time delays, and writes the batch report and the calibrated
//! distance.
//!
//! Usage:
//!   replay --input session.csv --output report.txt --mode plot

use clap::Parser;
use ft232_l3gd20_spi::{
    plot_rows, Calibration, Mode, ReplayBus, Tracker, TrackerConfig, DEFAULT_ZERO_OFFSETS,
    WINDOW_CAPACITY,
};
use std::fs::File;
use std::io::{self, BufReader, Write};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "replay")]
#[command(about = "Replay a recorded L3GD20 session through the distance pipeline", long_about = None)]
struct Args {
    /// Input CSV of raw samples: one "x,y,z" line of register counts per tick
    #[arg(short, long)]
    input: PathBuf,

    /// Batch report destination (stdout if omitted)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Replay mode: "normal", "calibration" or "plot"
    #[arg(short, long, default_value = "normal")]
    mode: String,

    /// Zero-rate offset overrides, raw counts
    #[arg(long, default_value_t = DEFAULT_ZERO_OFFSETS[0])]
    zero_x: i16,
    #[arg(long, default_value_t = DEFAULT_ZERO_OFFSETS[1])]
    zero_y: i16,
    #[arg(long, default_value_t = DEFAULT_ZERO_OFFSETS[2])]
    zero_z: i16,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let mode = match args.mode.as_str() {
        "normal" => Mode::Normal,
        "calibration" => Mode::Calibration,
        "plot" => Mode::Plot,
        other => {
            eprintln!("Error: mode must be 'normal', 'calibration' or 'plot' (got '{other}')");
            std::process::exit(1);
        }
    };

    let file = File::open(&args.input)?;
    let bus = ReplayBus::from_csv_reader(BufReader::new(file))?;
    let total_ticks = bus.sample_count();

    println!("L3GD20 Session Replay");
    println!("=====================");
    println!(
        "Replay started {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    println!("Input: {} ({} ticks)", args.input.display(), total_ticks);
    println!();

    if mode == Mode::Calibration {
        return replay_calibration(bus, [args.zero_x, args.zero_y, args.zero_z]);
    }

    let config = TrackerConfig {
        zero_offsets: [args.zero_x, args.zero_y, args.zero_z],
        mode,
        ..TrackerConfig::default()
    };

    let mut tracker = Tracker::new(bus, config)?;
    println!("Gyro ID: {}", tracker.device_id());

    let mut completion = None;
    for _ in 0..total_ticks {
        let report = tracker.tick()?;
        if let Some(done) = report.completion {
            completion = Some(done);
        }
    }

    let done = match completion {
        Some(done) => done,
        None => {
            println!(
                "Window not filled: {}/{} ticks recorded; no distance or report produced.",
                total_ticks, WINDOW_CAPACITY
            );
            return Ok(());
        }
    };

    // Batch report goes to the requested sink, everything else to the console
    let mut sink: Box<dyn Write> = match &args.output {
        Some(path) => Box::new(File::create(path)?),
        None => Box::new(io::stdout()),
    };
    for block in &done.batch {
        write!(sink, "{block}")?;
    }
    sink.flush()?;

    if let Some(path) = &args.output {
        println!("Batch report written to {}", path.display());
    }

    println!();
    println!("Distance: {:.2} m", done.distance);

    if mode == Mode::Plot {
        println!();
        for row in plot_rows(tracker.state().window()) {
            println!("{row}");
        }
    }

    Ok(())
}

/// Re-derive zero offsets from a recorded still run.
fn replay_calibration(
    mut bus: ReplayBus,
    base_offsets: [i16; 3],
) -> Result<(), Box<dyn std::error::Error>> {
    use ft232_l3gd20_spi::GyroBus;
    use ft232_l3gd20_spi::l3gd20::{OUT_X_L, OUT_Y_L, OUT_Z_L};

    let total = bus.sample_count();
    let mut cal = Calibration::new();

    for _ in 0..total {
        if cal.is_complete() {
            break;
        }
        let mut raw = [0i16; 3];
        for (axis, addr) in [OUT_X_L, OUT_Y_L, OUT_Z_L].into_iter().enumerate() {
            let (low, high) = bus.read_register_pair(addr)?;
            raw[axis] = i16::from_le_bytes([low, high]);
        }
        cal.record(raw);
    }

    if !cal.is_complete() {
        println!(
            "Recording too short for a calibration run: {}/{} samples.",
            cal.samples().len(),
            ft232_l3gd20_spi::CALIBRATION_SAMPLE_COUNT
        );
        return Ok(());
    }

    println!("x;y;z;");
    for sample in cal.samples() {
        println!("{};{};{};", sample[0], sample[1], sample[2]);
    }

    let offsets = cal.apply_to(base_offsets);
    println!();
    println!(
        "Updated zero offsets: [{}, {}, {}]",
        offsets[0], offsets[1], offsets[2]
    );

    Ok(())
}
