//! Tick orchestration: one session from power-on to the one-shot report.
//!
//! [`Tracker`] owns the driver and a [`SessionState`]; every 500 ms tick
//! reads the sensor, conditions the sample, stores it in the window and -
//! exactly once, when the window fills - produces the calibrated distance
//! and the batch report. The state machine itself ([`SessionState::advance`])
//! takes samples rather than time, so tests drive it without real delays.

use crate::bus::GyroBus;
use crate::error::Result;
use crate::l3gd20::{AngularVelocity, L3gd20, DEFAULT_ZERO_OFFSETS};
use crate::report::batch_report;
use crate::tracking::{
    condition, estimate_distance, LinearVelocity, ObservationWindow, ReportLatch, WindowState,
    RADIUS_MM, WINDOW_CAPACITY,
};

/// Operating mode, chosen at configuration time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Live readings, one-shot distance and batch report
    Normal,
    /// Zero-rate level measurement run
    Calibration,
    /// Normal, plus per-axis plot rows once the window completes
    Plot,
}

/// Session configuration.
#[derive(Debug, Clone, Copy)]
pub struct TrackerConfig {
    /// Per-axis zero-rate level in raw counts
    pub zero_offsets: [i16; 3],
    /// Per-axis lever-arm radius in millimeters
    pub radii_mm: [f32; 3],
    pub mode: Mode,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            zero_offsets: DEFAULT_ZERO_OFFSETS,
            radii_mm: RADIUS_MM,
            mode: Mode::Normal,
        }
    }
}

/// The conditioned reading of one tick, for live display.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LiveSample {
    pub angular: AngularVelocity,
    pub linear: LinearVelocity,
    pub tick_index: u32,
}

/// Produced exactly once per session, when the window fills.
#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    /// Calibrated distance in meters
    pub distance: f64,
    /// Batch report blocks in wire format, one per stored sample
    pub batch: Vec<String>,
}

/// What one tick yielded.
#[derive(Debug, Clone, PartialEq)]
pub struct TickReport {
    /// Present while the window is still filling; `None` from tick 40 on
    pub live: Option<LiveSample>,
    /// Present exactly once, on the tick that completes the window
    pub completion: Option<Completion>,
}

/// All mutable state of one observation session.
///
/// Owned by the tracker and threaded through every component call; nothing
/// here is global.
pub struct SessionState {
    tick_index: u32,
    previous: Option<AngularVelocity>,
    window: ObservationWindow,
    latch: ReportLatch,
    distance: Option<f64>,
}

impl SessionState {
    pub fn new() -> Self {
        Self {
            tick_index: 0,
            previous: None,
            window: ObservationWindow::new(),
            latch: ReportLatch::new(),
            distance: None,
        }
    }

    /// Advance one tick with an already-decoded angular-velocity sample.
    pub fn advance(&mut self, raw: AngularVelocity, radii_mm: [f32; 3]) -> TickReport {
        let tick_index = self.tick_index;
        let (angular, linear) = condition(raw, self.previous, radii_mm);
        let state = self.window.push(tick_index as usize, angular, linear);
        self.previous = Some(angular);

        let live = if (tick_index as usize) < WINDOW_CAPACITY {
            Some(LiveSample {
                angular,
                linear,
                tick_index,
            })
        } else {
            None
        };

        let completion = if state == WindowState::JustCompleted {
            self.latch.mark_complete();
            let distance = estimate_distance(&self.window);
            self.distance = Some(distance);

            if self.latch.try_fire() {
                Some(Completion {
                    distance,
                    batch: batch_report(&self.window),
                })
            } else {
                None
            }
        } else {
            None
        };

        self.tick_index += 1;

        TickReport { live, completion }
    }

    pub fn tick_index(&self) -> u32 {
        self.tick_index
    }

    pub fn window(&self) -> &ObservationWindow {
        &self.window
    }

    /// Calibrated distance, once the window has completed.
    pub fn distance(&self) -> Option<f64> {
        self.distance
    }

    pub fn report_sent(&self) -> bool {
        self.latch.has_fired()
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}

/// One gyroscope, one session.
pub struct Tracker<B> {
    gyro: L3gd20<B>,
    config: TrackerConfig,
    state: SessionState,
}

impl<B: GyroBus> Tracker<B> {
    /// Bring up the sensor and start a fresh session.
    pub fn new(bus: B, config: TrackerConfig) -> Result<Self> {
        let gyro = L3gd20::new(bus, config.zero_offsets)?;
        Ok(Self {
            gyro,
            config,
            state: SessionState::new(),
        })
    }

    /// Identity byte read at bring-up, for logging.
    pub fn device_id(&self) -> u8 {
        self.gyro.device_id()
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Read the sensor and advance the session by one tick.
    pub fn tick(&mut self) -> Result<TickReport> {
        let raw = self.gyro.read_angular()?;
        Ok(self.state.advance(raw, self.config.radii_mm))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::ReplayBus;

    fn av(x: f32, y: f32, z: f32) -> AngularVelocity {
        AngularVelocity::new(x, y, z)
    }

    #[test]
    fn completion_fires_exactly_once_across_many_ticks() {
        let mut state = SessionState::new();
        let mut completions = 0;

        for _ in 0..WINDOW_CAPACITY as u32 + 100 {
            let report = state.advance(av(1.0, 0.0, 0.0), RADIUS_MM);
            if report.completion.is_some() {
                completions += 1;
            }
        }

        assert_eq!(completions, 1);
        assert!(state.report_sent());
    }

    #[test]
    fn live_samples_stop_when_the_window_completes() {
        let mut state = SessionState::new();

        for expected_tick in 0..WINDOW_CAPACITY as u32 {
            let report = state.advance(AngularVelocity::ZERO, RADIUS_MM);
            let live = report.live.expect("window still filling");
            assert_eq!(live.tick_index, expected_tick);
        }

        for _ in 0..10 {
            let report = state.advance(AngularVelocity::ZERO, RADIUS_MM);
            assert!(report.live.is_none());
        }
    }

    #[test]
    fn completion_arrives_with_the_fortieth_sample() {
        let mut state = SessionState::new();

        for i in 0..WINDOW_CAPACITY as u32 - 1 {
            let report = state.advance(AngularVelocity::ZERO, RADIUS_MM);
            assert!(report.completion.is_none(), "tick {i} completed early");
        }

        let report = state.advance(AngularVelocity::ZERO, RADIUS_MM);
        let done = report.completion.expect("final sample completes the window");
        assert_eq!(done.batch.len(), WINDOW_CAPACITY);
        assert_eq!(state.distance(), Some(done.distance));
    }

    #[test]
    fn constant_rotation_yields_zero_distance() {
        // A constant reading has zero backward difference, so the raw sum is
        // zero and the offset floors the result at zero.
        let mut state = SessionState::new();
        let mut result = None;

        for _ in 0..WINDOW_CAPACITY {
            let report = state.advance(av(57.0, -21.0, 8.0), RADIUS_MM);
            if let Some(done) = report.completion {
                result = Some(done.distance);
            }
        }

        assert_eq!(result, Some(0.0));
    }

    #[test]
    fn tracker_runs_a_session_over_a_replayed_recording() {
        // 45 recorded ticks of a constant raw reading
        let bus = ReplayBus::new(vec![[113, 22, 3]; 45]);
        let mut tracker = Tracker::new(bus, TrackerConfig::default()).unwrap();
        assert_eq!(tracker.device_id(), crate::l3gd20::L3GD20_DEVICE_ID);

        let mut completions = Vec::new();
        for _ in 0..45 {
            let report = tracker.tick().unwrap();
            if let Some(done) = report.completion {
                completions.push(done);
            }
        }

        assert_eq!(completions.len(), 1);
        let done = &completions[0];
        assert_eq!(done.distance, 0.0);
        assert_eq!(done.batch.len(), WINDOW_CAPACITY);

        // Raw 113/22/3 against offsets 13/22/3 decodes to (1.75, 0, 0) dps
        assert!(done.batch[5].contains("x value: 1.75000"));
        assert!(done.batch[5].contains("y value: 0.00000"));
    }

    #[test]
    fn alternating_rotation_accumulates_distance() {
        let mut state = SessionState::new();
        let mut result = None;

        for i in 0..WINDOW_CAPACITY {
            let sample = if i % 2 == 0 {
                av(100.0, 0.0, 0.0)
            } else {
                av(-100.0, 0.0, 0.0)
            };
            if let Some(done) = state.advance(sample, RADIUS_MM).completion {
                result = Some(done.distance);
            }
        }

        // Every slot from 1 on holds |Δω| = 200 dps * 0.002 = 0.4 m/s, so the
        // raw sum is 39 * 0.2 m
        let expected = (39.0 * 0.2 - 0.035) / 0.165;
        let got = result.expect("window completed");
        assert!((got - expected).abs() < 1e-3, "got {got}, expected {expected}");
    }
}
