//! L3GD20 distance tracker - live acquisition, distance estimate, batch report
//!
//! This executable reads the gyroscope over the FT232H SPI bridge every
//! 500 ms, displays live readings, and once the 40-sample window completes
//! prints the calibrated distance and the one-shot batch report.

use clap::Parser;
use ft232_l3gd20_spi::{
    create_bar, distance_readout, live_readout, plot_rows, Calibration, L3gd20, L3gd20Error,
    LiveSample, Mode, SpiTransport, TickPacer, Tracker, TrackerConfig,
    CALIBRATION_SAMPLE_COUNT, DEFAULT_ZERO_OFFSETS, MAX_GYRO_DPS, TICK_INTERVAL,
};
use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(name = "l3gd20-tracker")]
#[command(about = "Track distance traveled from an L3GD20 gyroscope over FT232H SPI", long_about = None)]
struct Args {
    /// SPI channel index
    #[arg(short, long, default_value = "0")]
    channel: u32,

    /// Operating mode: "normal", "calibration" or "plot"
    #[arg(short, long, default_value = "normal")]
    mode: String,
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

    println!("L3GD20 Distance Tracker");
    println!("=======================");
    println!(
        "Session started {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    println!("Initializing FT232H SPI interface...");

    let bus = match SpiTransport::open(args.channel) {
        Ok(b) => {
            println!("SPI channel {} opened", args.channel);
            b
        }
        Err(L3gd20Error::NoChannelsFound) => {
            eprintln!("Error: No FT232H devices found.");
            eprintln!("Please check:");
            eprintln!("  1. FT232H is connected via USB");
            eprintln!("  2. FTDI drivers are installed");
            eprintln!("  3. No other application is using the device");
            return Err(Box::new(L3gd20Error::NoChannelsFound));
        }
        Err(e) => {
            eprintln!("Error opening SPI channel: {}", e);
            return Err(Box::new(e));
        }
    };

    // Setup Ctrl+C handler
    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        println!("\nReceived Ctrl+C, stopping...");
        r.store(false, Ordering::SeqCst);
    })?;

    match mode {
        Mode::Calibration => {
            let mut gyro = L3gd20::new(bus, DEFAULT_ZERO_OFFSETS)?;
            println!("Gyro ID: {}", gyro.device_id());
            run_calibration(&mut gyro, &running)
        }
        _ => {
            let config = TrackerConfig {
                mode,
                ..TrackerConfig::default()
            };
            let mut tracker = Tracker::new(bus, config)?;
            println!("Gyro ID: {}", tracker.device_id());
            run_tracking(&mut tracker, mode, &running)
        }
    }
}

/// Fill one observation window, then emit the distance and the batch report.
fn run_tracking(
    tracker: &mut Tracker<SpiTransport>,
    mode: Mode,
    running: &Arc<AtomicBool>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut pacer = TickPacer::new(TICK_INTERVAL);

    // Clear screen once at start
    print!("\x1B[2J\x1B[H");
    io::stdout().flush()?;

    let completion = loop {
        if !running.load(Ordering::SeqCst) {
            println!("Aborted before the window filled.");
            return Ok(());
        }

        let report = tracker.tick()?;

        if let Some(live) = report.live {
            render_live(&live)?;
        }

        if let Some(done) = report.completion {
            break done;
        }

        pacer.wait();
    };

    // The window is frozen now; a new run needs a fresh session
    println!();
    println!("Distance");
    println!("{}", distance_readout(completion.distance));
    println!();

    for block in &completion.batch {
        print!("{block}");
    }

    if mode == Mode::Plot {
        for row in plot_rows(tracker.state().window()) {
            println!("{row}");
        }
    }

    io::stdout().flush()?;
    Ok(())
}

/// Redraw the live view in place (cursor home, no clear, reduces flicker).
fn render_live(live: &LiveSample) -> io::Result<()> {
    let readout = live_readout(&live.angular, &live.linear, live.tick_index);
    let angular = live.angular.to_array();

    print!("\x1B[H");
    println!("L3GD20 Distance Tracker - Live Data                              ");
    println!("===================================                              ");
    println!("Time: {}                                                         ", readout.elapsed);
    println!();

    println!("GYRO (°/s)                     -500 ◄─────────┼─────────► +500");
    for (line, value) in readout.angular.iter().zip(angular) {
        println!("  {}  [{}]", line, create_bar(value, MAX_GYRO_DPS, 40));
    }

    println!();
    println!("VELOCITY (m/s)");
    for line in readout.velocity.iter() {
        println!("  {line}                  ");
    }

    println!();
    println!("Press Ctrl+C to abort                                            ");

    io::stdout().flush()
}

/// Zero-rate level measurement: 100 still samples, then the updated offsets.
fn run_calibration(
    gyro: &mut L3gd20<SpiTransport>,
    running: &Arc<AtomicBool>,
) -> Result<(), Box<dyn std::error::Error>> {
    println!("Calibration run: keep the sensor still.");

    let mut pacer = TickPacer::new(TICK_INTERVAL);
    let mut cal = Calibration::new();

    while !cal.is_complete() {
        if !running.load(Ordering::SeqCst) {
            println!("\nCalibration aborted.");
            return Ok(());
        }

        let raw = gyro.read_raw()?;
        cal.record(raw);
        print!("\rSample {:3}/{}", cal.samples().len(), CALIBRATION_SAMPLE_COUNT);
        io::stdout().flush()?;

        pacer.wait();
    }

    println!();
    println!("x;y;z;");
    for sample in cal.samples() {
        println!("{};{};{};", sample[0], sample[1], sample[2]);
    }

    let offsets = cal.apply_to(DEFAULT_ZERO_OFFSETS);
    println!();
    println!(
        "Updated zero offsets: [{}, {}, {}]",
        offsets[0], offsets[1], offsets[2]
    );

    Ok(())
}
