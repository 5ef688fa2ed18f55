//! FT232H-based distance tracker for the L3GD20 gyroscope
//!
//! This library polls an L3GD20 3-axis gyroscope over SPI (via the FTDI
//! FT232H MPSSE bridge and the libMPSSE library), conditions the angular-rate
//! samples and integrates them into an approximate linear distance over a
//! fixed 20-second observation window of 40 samples at 500 ms.
//!
//! # Quick Start
//!
//! ## Live Tracking (hardware, feature `hardware`)
//! ```ignore
//! use ft232_l3gd20_spi::{SpiTransport, Tracker, TrackerConfig};
//!
//! let bus = SpiTransport::open(0)?;
//! let mut tracker = Tracker::new(bus, TrackerConfig::default())?;
//! println!("Gyro ID: {}", tracker.device_id());
//!
//! loop {
//!     let report = tracker.tick()?;
//!     if let Some(live) = report.live {
//!         println!("X: {:.2} dps at tick {}", live.angular.x, live.tick_index);
//!     }
//!     if let Some(done) = report.completion {
//!         println!("distance: {:.2} m", done.distance);
//!         break;
//!     }
//! }
//! # Ok::<(), ft232_l3gd20_spi::L3gd20Error>(())
//! ```
//!
//! ## Replaying a Recording
//! ```
//! use ft232_l3gd20_spi::{ReplayBus, Tracker, TrackerConfig};
//!
//! // One raw [x, y, z] count triple per 500 ms tick
//! let bus = ReplayBus::new(vec![[120, -40, 8]; 45]);
//! let mut tracker = Tracker::new(bus, TrackerConfig::default())?;
//!
//! for _ in 0..45 {
//!     let report = tracker.tick()?;
//!     if let Some(done) = report.completion {
//!         println!("distance: {:.2} m", done.distance);
//!         for block in &done.batch {
//!             print!("{block}");
//!         }
//!     }
//! }
//! # Ok::<(), ft232_l3gd20_spi::L3gd20Error>(())
//! ```
//!
//! ## Driving the State Machine Directly
//! ```
//! use ft232_l3gd20_spi::{AngularVelocity, SessionState, RADIUS_MM, WINDOW_CAPACITY};
//!
//! let mut state = SessionState::new();
//! for _ in 0..WINDOW_CAPACITY {
//!     state.advance(AngularVelocity::new(1.0, 0.0, 0.0), RADIUS_MM);
//! }
//! assert!(state.distance().is_some());
//! ```

pub mod bus;
pub mod common;
pub mod error;
mod ffi;
pub mod l3gd20;
pub mod report;
pub mod session;
pub mod tracking;

// Re-export public API
pub use bus::{GyroBus, ReplayBus};
#[cfg(feature = "hardware")]
pub use bus::SpiTransport;
pub use common::{create_bar, TickPacer, TimeKeeper};
pub use error::{L3gd20Error, Result};
pub use l3gd20::{
    decode_axis, AngularVelocity, Calibration, L3gd20, CALIBRATION_SAMPLE_COUNT,
    DEFAULT_ZERO_OFFSETS, FS_500_SENSITIVITY,
};
pub use report::{batch_report, distance_readout, live_readout, plot_rows, LiveReadout};
pub use session::{
    Completion, LiveSample, Mode, SessionState, TickReport, Tracker, TrackerConfig,
};
pub use tracking::{
    condition, estimate_distance, LinearVelocity, ObservationWindow, ReportLatch, WindowState,
    MAX_GYRO_DPS, MIN_GYRO_DPS, RADIUS_MM, TICK_INTERVAL, TICK_INTERVAL_SECS, WINDOW_CAPACITY,
};
