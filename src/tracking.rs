//! Sample conditioning, windowed accumulation and distance estimation.
//!
//! This is the stateful core of the tracker: glitch clamping, the
//! backward-difference linear-velocity estimate, the fixed 40-tick
//! observation window and the one-pass distance integral. The arithmetic
//! quirks here (difference-based "linear velocity", the untouched first
//! window slot during integration) are deliberate, measured-device behavior;
//! tests pin them.

use std::time::Duration;

use crate::l3gd20::AngularVelocity;

/// Corrected readings beyond this magnitude (dps) are glitches; the axis is
/// zeroed, the other axes are kept.
pub const MAX_GYRO_DPS: f32 = 500.0;
pub const MIN_GYRO_DPS: f32 = -500.0;

/// Effective lever-arm radius per axis, millimeters
pub const RADIUS_MM: [f32; 3] = [2.0, 2.0, 0.55];

/// Cadence of the sampling loop
pub const TICK_INTERVAL: Duration = Duration::from_millis(500);

/// Seconds between two ticks, as used by the integrator
pub const TICK_INTERVAL_SECS: f32 = 0.5;

/// Ticks per observation window: 40 ticks at 500 ms = 20 s
pub const WINDOW_CAPACITY: usize = 40;

// Distance calibration from the reference track runs
const DISTANCE_OFFSET: f64 = 0.035;
const DISTANCE_SCALE: f64 = 0.165;

/// Per-axis linear velocity estimate in meters/second.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearVelocity {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl LinearVelocity {
    pub const ZERO: Self = Self {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    pub fn to_array(self) -> [f32; 3] {
        [self.x, self.y, self.z]
    }
}

fn clamp_axis(value: f32) -> f32 {
    if value > MAX_GYRO_DPS || value < MIN_GYRO_DPS {
        0.0
    } else {
        value
    }
}

/// Condition one tick's reading.
///
/// Clamps each *corrected* axis outside [-500, 500] dps to zero, then derives
/// the linear-velocity estimate as the difference against the previous tick's
/// stored sample, scaled by the per-axis radius (millimeters). The first tick
/// has no previous sample and yields zero linear velocity.
pub fn condition(
    raw: AngularVelocity,
    previous: Option<AngularVelocity>,
    radii_mm: [f32; 3],
) -> (AngularVelocity, LinearVelocity) {
    let clamped = AngularVelocity {
        x: clamp_axis(raw.x),
        y: clamp_axis(raw.y),
        z: clamp_axis(raw.z),
    };

    let linear = match previous {
        None => LinearVelocity::ZERO,
        Some(prev) => LinearVelocity {
            x: (prev.x - clamped.x) * (radii_mm[0] * 0.001),
            y: (prev.y - clamped.y) * (radii_mm[1] * 0.001),
            z: (prev.z - clamped.z) * (radii_mm[2] * 0.001),
        },
    };

    (clamped, linear)
}

/// Result of pushing a sample into the observation window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowState {
    /// Sample stored, window not yet full
    Filling,
    /// This push stored the final sample
    JustCompleted,
    /// Window is frozen; nothing was written
    AlreadyComplete,
}

/// Fixed-capacity window of one 20-second observation run.
///
/// Slot `i` is written exactly once, at tick `i`; the window never wraps and
/// is never reused after it fills.
pub struct ObservationWindow {
    angular: [AngularVelocity; WINDOW_CAPACITY],
    linear: [LinearVelocity; WINDOW_CAPACITY],
    filled: usize,
}

impl ObservationWindow {
    pub fn new() -> Self {
        Self {
            angular: [AngularVelocity::ZERO; WINDOW_CAPACITY],
            linear: [LinearVelocity::ZERO; WINDOW_CAPACITY],
            filled: 0,
        }
    }

    /// Store a conditioned sample at its tick slot.
    pub fn push(
        &mut self,
        tick_index: usize,
        angular: AngularVelocity,
        linear: LinearVelocity,
    ) -> WindowState {
        if tick_index >= WINDOW_CAPACITY {
            return WindowState::AlreadyComplete;
        }

        debug_assert_eq!(tick_index, self.filled, "window writes follow tick order");

        self.angular[tick_index] = angular;
        self.linear[tick_index] = linear;
        self.filled = self.filled.max(tick_index + 1);

        if tick_index == WINDOW_CAPACITY - 1 {
            WindowState::JustCompleted
        } else {
            WindowState::Filling
        }
    }

    /// Populated slot count.
    pub fn len(&self) -> usize {
        self.filled
    }

    pub fn is_empty(&self) -> bool {
        self.filled == 0
    }

    pub fn is_complete(&self) -> bool {
        self.filled == WINDOW_CAPACITY
    }

    /// Stored angular-velocity samples, oldest first.
    pub fn angular(&self) -> &[AngularVelocity] {
        &self.angular[..self.filled]
    }

    /// Stored linear-velocity samples, oldest first.
    pub fn linear(&self) -> &[LinearVelocity] {
        &self.linear[..self.filled]
    }
}

impl Default for ObservationWindow {
    fn default() -> Self {
        Self::new()
    }
}

/// Integrate the window into a calibrated distance in meters.
///
/// One pass over slots 1..=39 - slot 0 never contributes. Each slot's linear
/// velocity times the 0.5 s tick gives a per-axis displacement whose
/// Euclidean norm is accumulated, then the fixed offset and scale from the
/// reference runs are applied, flooring at zero.
pub fn estimate_distance(window: &ObservationWindow) -> f64 {
    let mut total = 0.0f64;

    for i in 1..WINDOW_CAPACITY {
        let v = window.linear[i];
        let dx = v.x * TICK_INTERVAL_SECS;
        let dy = v.y * TICK_INTERVAL_SECS;
        let dz = v.z * TICK_INTERVAL_SECS;
        total += f64::from(dx * dx + dy * dy + dz * dz).sqrt();
    }

    let calibrated = total - DISTANCE_OFFSET;
    let calibrated = if calibrated < 0.0 { 0.0 } else { calibrated };
    calibrated / DISTANCE_SCALE
}

/// One-shot gate for the batch transmission.
#[derive(Debug, Default, Clone, Copy)]
pub struct ReportLatch {
    window_complete: bool,
    batch_sent: bool,
}

impl ReportLatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mark_complete(&mut self) {
        self.window_complete = true;
    }

    /// True exactly once: the first call after the window completes.
    pub fn try_fire(&mut self) -> bool {
        if self.window_complete && !self.batch_sent {
            self.batch_sent = true;
            true
        } else {
            false
        }
    }

    pub fn is_complete(&self) -> bool {
        self.window_complete
    }

    pub fn has_fired(&self) -> bool {
        self.batch_sent
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn av(x: f32, y: f32, z: f32) -> AngularVelocity {
        AngularVelocity::new(x, y, z)
    }

    #[test]
    fn condition_zeroes_only_the_out_of_range_axes() {
        let (clamped, _) = condition(av(600.0, 10.0, -501.0), None, RADIUS_MM);
        assert_eq!(clamped, av(0.0, 10.0, 0.0));

        // Boundary values stay
        let (clamped, _) = condition(av(500.0, -500.0, 499.9), None, RADIUS_MM);
        assert_eq!(clamped, av(500.0, -500.0, 499.9));
    }

    #[test]
    fn first_tick_linear_velocity_is_zero() {
        let (_, linear) = condition(av(123.0, -45.0, 6.0), None, RADIUS_MM);
        assert_eq!(linear, LinearVelocity::ZERO);
    }

    #[test]
    fn linear_velocity_is_radius_scaled_backward_difference() {
        let prev = av(1.0, 2.0, 3.0);
        let (_, linear) = condition(av(0.5, 1.0, 2.0), Some(prev), RADIUS_MM);

        assert!((linear.x - 0.5 * 0.002).abs() < 1e-7);
        assert!((linear.y - 1.0 * 0.002).abs() < 1e-7);
        assert!((linear.z - 1.0 * 0.00055).abs() < 1e-7);
    }

    #[test]
    fn clamped_value_feeds_the_difference() {
        // The difference uses the clamped current value, not the raw one
        let prev = av(10.0, 0.0, 0.0);
        let (_, linear) = condition(av(9999.0, 0.0, 0.0), Some(prev), RADIUS_MM);
        assert!((linear.x - 10.0 * 0.002).abs() < 1e-6);
    }

    #[test]
    fn window_reports_states_in_order() {
        let mut window = ObservationWindow::new();
        for i in 0..WINDOW_CAPACITY - 1 {
            assert_eq!(
                window.push(i, AngularVelocity::ZERO, LinearVelocity::ZERO),
                WindowState::Filling
            );
        }
        assert_eq!(
            window.push(
                WINDOW_CAPACITY - 1,
                AngularVelocity::ZERO,
                LinearVelocity::ZERO
            ),
            WindowState::JustCompleted
        );
        assert!(window.is_complete());
    }

    #[test]
    fn pushes_past_capacity_never_mutate() {
        let mut window = ObservationWindow::new();
        for i in 0..WINDOW_CAPACITY {
            window.push(i, av(1.0, 1.0, 1.0), LinearVelocity::ZERO);
        }

        for i in WINDOW_CAPACITY..WINDOW_CAPACITY + 100 {
            let state = window.push(
                i,
                av(f32::MAX, f32::MAX, f32::MAX),
                LinearVelocity {
                    x: f32::MAX,
                    y: f32::MAX,
                    z: f32::MAX,
                },
            );
            assert_eq!(state, WindowState::AlreadyComplete);
        }

        assert!(window.angular().iter().all(|s| *s == av(1.0, 1.0, 1.0)));
        assert!(window.linear().iter().all(|s| *s == LinearVelocity::ZERO));
    }

    #[test]
    fn slot_zero_contributes_nothing_to_the_distance() {
        let mut window = ObservationWindow::new();
        // Extreme outlier in slot 0, zeros everywhere else
        window.push(
            0,
            AngularVelocity::ZERO,
            LinearVelocity {
                x: 1e6,
                y: 1e6,
                z: 1e6,
            },
        );
        for i in 1..WINDOW_CAPACITY {
            window.push(i, AngularVelocity::ZERO, LinearVelocity::ZERO);
        }

        // Raw sum is 0.0, the offset pulls it negative, the floor holds it at 0
        assert_eq!(estimate_distance(&window), 0.0);
    }

    #[test]
    fn unit_velocity_window_integrates_to_calibrated_distance() {
        let mut window = ObservationWindow::new();
        window.push(0, AngularVelocity::ZERO, LinearVelocity::ZERO);
        for i in 1..WINDOW_CAPACITY {
            window.push(
                i,
                AngularVelocity::ZERO,
                LinearVelocity {
                    x: 1.0,
                    y: 0.0,
                    z: 0.0,
                },
            );
        }

        // 39 steps of 0.5 m = 19.5 m raw, then (19.5 - 0.035) / 0.165
        let expected = (19.5 - 0.035) / 0.165;
        let got = estimate_distance(&window);
        assert!((got - expected).abs() < 1e-9, "got {got}, expected {expected}");
        assert!((got - 118.0).abs() < 0.05);
    }

    #[test]
    fn latch_fires_exactly_once() {
        let mut latch = ReportLatch::new();
        assert!(!latch.try_fire(), "must not fire before completion");

        latch.mark_complete();
        assert!(latch.try_fire());
        for _ in 0..100 {
            assert!(!latch.try_fire());
        }
        assert!(latch.has_fired());
    }
}
