//! Output formatting: batch wire format, plot rows, live display strings.
//!
//! Everything here is pure formatting. Delivery - console drawing, writing a
//! report file, pushing bytes down a serial link - belongs to the binaries.

use crate::l3gd20::AngularVelocity;
use crate::tracking::{LinearVelocity, ObservationWindow, TICK_INTERVAL_SECS};

/// Format the completed window's angular samples for batch transmission.
///
/// One block per stored sample, in the fixed wire format:
/// `"<index> sample:\nx value: <x>\ny value: <y>\nz value: <z>\n\n"` with the
/// index two columns wide and the axis values to five decimal places.
pub fn batch_report(window: &ObservationWindow) -> Vec<String> {
    window
        .angular()
        .iter()
        .enumerate()
        .map(|(index, sample)| {
            format!(
                "{:2} sample:\nx value: {:.5}\ny value: {:.5}\nz value: {:.5}\n\n",
                index, sample.x, sample.y, sample.z
            )
        })
        .collect()
}

/// Format the window for plotting: per-axis comma-joined rows of all stored
/// angular samples, then all stored linear samples, each block preceded by
/// its header row.
pub fn plot_rows(window: &ObservationWindow) -> Vec<String> {
    let mut rows = Vec::with_capacity(8);

    rows.push("Plot data for Angular velocity".to_string());
    for axis in 0..3 {
        rows.push(join_axis(
            window.angular().iter().map(|s| s.to_array()[axis]),
        ));
    }

    rows.push("Plot data for Linear velocity".to_string());
    for axis in 0..3 {
        rows.push(join_axis(window.linear().iter().map(|s| s.to_array()[axis])));
    }

    rows
}

fn join_axis(values: impl Iterator<Item = f32>) -> String {
    values
        .map(|v| format!("{v:.6}"))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Per-tick display strings for the live view.
#[derive(Debug, Clone, PartialEq)]
pub struct LiveReadout {
    /// "X Value: ..." lines, degrees/second
    pub angular: [String; 3],
    /// "X Vel: ..." lines, meters/second
    pub velocity: [String; 3],
    /// Elapsed session time, "12.50 s"
    pub elapsed: String,
}

/// Format the current tick for display. Produced only while the window is
/// still filling; callers stop asking once it completes.
pub fn live_readout(
    angular: &AngularVelocity,
    linear: &LinearVelocity,
    tick_index: u32,
) -> LiveReadout {
    LiveReadout {
        angular: [
            format!("X Value: {:5.2}", angular.x),
            format!("Y Value: {:5.2}", angular.y),
            format!("Z Value: {:5.2}", angular.z),
        ],
        velocity: [
            format!("X Vel: {:5.2}", linear.x),
            format!("Y Vel: {:5.2}", linear.y),
            format!("Z Vel: {:5.2}", linear.z),
        ],
        elapsed: format!("{:5.2} s", tick_index as f32 * TICK_INTERVAL_SECS),
    }
}

/// Format a calibrated distance for display.
pub fn distance_readout(distance_m: f64) -> String {
    format!("{distance_m:5.2} m")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracking::WINDOW_CAPACITY;

    fn full_window() -> ObservationWindow {
        let mut window = ObservationWindow::new();
        for i in 0..WINDOW_CAPACITY {
            window.push(
                i,
                AngularVelocity::new(1.5, -2.0, 0.0),
                LinearVelocity {
                    x: 0.25,
                    y: 0.0,
                    z: -0.5,
                },
            );
        }
        window
    }

    #[test]
    fn batch_report_matches_the_wire_format() {
        let report = batch_report(&full_window());
        assert_eq!(report.len(), WINDOW_CAPACITY);

        assert_eq!(
            report[0],
            " 0 sample:\nx value: 1.50000\ny value: -2.00000\nz value: 0.00000\n\n"
        );
        // Two-digit indices fill the width
        assert!(report[39].starts_with("39 sample:\n"));
    }

    #[test]
    fn plot_rows_cover_both_sample_kinds() {
        let rows = plot_rows(&full_window());
        assert_eq!(rows.len(), 8);
        assert_eq!(rows[0], "Plot data for Angular velocity");
        assert_eq!(rows[4], "Plot data for Linear velocity");

        // 40 comma-joined values per axis row
        assert_eq!(rows[1].split(", ").count(), WINDOW_CAPACITY);
        assert!(rows[1].starts_with("1.500000, "));
        assert!(rows[7].ends_with("-0.500000"));
    }

    #[test]
    fn live_readout_formats_match_the_display() {
        let readout = live_readout(
            &AngularVelocity::new(1.0, -12.25, 0.0),
            &LinearVelocity {
                x: 0.5,
                y: 0.0,
                z: 0.0,
            },
            5,
        );

        assert_eq!(readout.angular[0], "X Value:  1.00");
        assert_eq!(readout.angular[1], "Y Value: -12.25");
        assert_eq!(readout.velocity[0], "X Vel:  0.50");
        assert_eq!(readout.elapsed, " 2.50 s");
    }

    #[test]
    fn distance_readout_is_meters_to_two_places() {
        assert_eq!(distance_readout(117.9697), "117.97 m");
        assert_eq!(distance_readout(0.0), " 0.00 m");
    }
}
