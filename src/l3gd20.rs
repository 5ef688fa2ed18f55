//! L3GD20 gyroscope driver over a [`GyroBus`] transport
//!
//! Owns the register map, the bring-up configuration and the raw-count to
//! degrees/second conversion. The identity register is read at init and
//! reported to the caller; it is never validated.

use crate::bus::GyroBus;
use crate::error::Result;

// L3GD20 register addresses
pub const WHO_AM_I: u8 = 0x0F;
pub const CTRL_REG1: u8 = 0x20;
pub const CTRL_REG2: u8 = 0x21;
pub const CTRL_REG4: u8 = 0x23;
pub const CTRL_REG5: u8 = 0x24;
pub const OUT_X_L: u8 = 0x28;
pub const OUT_Y_L: u8 = 0x2A;
pub const OUT_Z_L: u8 = 0x2C;

// Bring-up configuration values
pub const REG_1_CONFIG: u8 = 0x3F; // data rate 100 Hz, cutoff 25, enable, X/Y/Z on
pub const REG_2_CONFIG: u8 = 0x00; // high-pass filter normal mode, 8 Hz cutoff
pub const REG_4_CONFIG: u8 = 0x10; // data LSB first, full scale 500 dps, 4-wire SPI
pub const REG_5_CONFIG: u8 = 0x10; // normal boot, FIFO disabled, HPF enabled

/// WHO_AM_I response of an L3GD20 (informational only)
pub const L3GD20_DEVICE_ID: u8 = 0xD3;

/// Sensitivity at the 500 dps full-scale setting, in dps per count
pub const FS_500_SENSITIVITY: f32 = 0.0175;

/// Zero-rate level of this unit in raw counts, from a calibration run
pub const DEFAULT_ZERO_OFFSETS: [i16; 3] = [13, 22, 3];

/// Samples averaged by a calibration run
pub const CALIBRATION_SAMPLE_COUNT: usize = 100;

/// Angular velocity in degrees/second, one value per axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AngularVelocity {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl AngularVelocity {
    pub const ZERO: Self = Self {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn to_array(self) -> [f32; 3] {
        [self.x, self.y, self.z]
    }
}

/// Decode one axis register pair into degrees/second.
///
/// Combines the bytes little-endian into a two's-complement 16-bit count,
/// subtracts the zero-rate offset and applies the 500 dps sensitivity.
pub fn decode_axis(raw_low: u8, raw_high: u8, zero_offset: i16) -> f32 {
    let raw = i16::from_le_bytes([raw_low, raw_high]);
    (i32::from(raw) - i32::from(zero_offset)) as f32 * FS_500_SENSITIVITY
}

/// L3GD20 gyroscope interface
pub struct L3gd20<B> {
    bus: B,
    zero_offsets: [i16; 3],
    device_id: u8,
}

impl<B: GyroBus> L3gd20<B> {
    /// Configure the sensor and capture its identity byte.
    ///
    /// # Arguments
    /// * `bus` - Register-level transport to the sensor
    /// * `zero_offsets` - Per-axis zero-rate level in raw counts
    pub fn new(bus: B, zero_offsets: [i16; 3]) -> Result<Self> {
        let mut gyro = Self {
            bus,
            zero_offsets,
            device_id: 0,
        };
        gyro.init()?;
        Ok(gyro)
    }

    fn init(&mut self) -> Result<()> {
        self.device_id = self.bus.read_register(WHO_AM_I)?;

        self.bus.write_register(CTRL_REG1, REG_1_CONFIG)?;
        self.bus.write_register(CTRL_REG2, REG_2_CONFIG)?;
        self.bus.write_register(CTRL_REG4, REG_4_CONFIG)?;
        self.bus.write_register(CTRL_REG5, REG_5_CONFIG)?;

        Ok(())
    }

    /// Identity byte captured at bring-up. Callers log it; nothing checks it.
    pub fn device_id(&self) -> u8 {
        self.device_id
    }

    /// Read the three axis register pairs as raw counts, offsets not applied.
    pub fn read_raw(&mut self) -> Result<[i16; 3]> {
        let (xl, xh) = self.bus.read_register_pair(OUT_X_L)?;
        let (yl, yh) = self.bus.read_register_pair(OUT_Y_L)?;
        let (zl, zh) = self.bus.read_register_pair(OUT_Z_L)?;

        Ok([
            i16::from_le_bytes([xl, xh]),
            i16::from_le_bytes([yl, yh]),
            i16::from_le_bytes([zl, zh]),
        ])
    }

    /// Read angular velocity in degrees/second, zero offsets applied.
    pub fn read_angular(&mut self) -> Result<AngularVelocity> {
        let (xl, xh) = self.bus.read_register_pair(OUT_X_L)?;
        let (yl, yh) = self.bus.read_register_pair(OUT_Y_L)?;
        let (zl, zh) = self.bus.read_register_pair(OUT_Z_L)?;

        Ok(AngularVelocity {
            x: decode_axis(xl, xh, self.zero_offsets[0]),
            y: decode_axis(yl, yh, self.zero_offsets[1]),
            z: decode_axis(zl, zh, self.zero_offsets[2]),
        })
    }
}

/// Accumulates raw samples for a zero-rate calibration run.
///
/// Mirrors the bring-up procedure used to measure the default offsets: 100
/// raw triples are collected and each sample contributes `raw / 100` (integer
/// division) on top of the offsets already in use.
pub struct Calibration {
    samples: Vec<[i16; 3]>,
}

impl Calibration {
    pub fn new() -> Self {
        Self {
            samples: Vec::with_capacity(CALIBRATION_SAMPLE_COUNT),
        }
    }

    /// Record one raw triple. Returns true once the run is complete;
    /// further samples are discarded.
    pub fn record(&mut self, raw: [i16; 3]) -> bool {
        if !self.is_complete() {
            self.samples.push(raw);
        }
        self.is_complete()
    }

    pub fn is_complete(&self) -> bool {
        self.samples.len() >= CALIBRATION_SAMPLE_COUNT
    }

    /// Raw samples recorded so far, in order.
    pub fn samples(&self) -> &[[i16; 3]] {
        &self.samples
    }

    /// Fold the run into an existing set of zero offsets.
    pub fn apply_to(&self, offsets: [i16; 3]) -> [i16; 3] {
        let mut out = offsets;
        for sample in &self.samples {
            for (axis, raw) in sample.iter().enumerate() {
                out[axis] += raw / CALIBRATION_SAMPLE_COUNT as i16;
            }
        }
        out
    }
}

impl Default for Calibration {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::ReplayBus;

    #[test]
    fn decode_axis_is_affine_in_the_raw_count() {
        // (raw bytes, zero offset, expected dps)
        let table: &[(u8, u8, i16, f32)] = &[
            (0x00, 0x00, 0, 0.0),
            (0x64, 0x00, 0, 100.0 * FS_500_SENSITIVITY),
            (0x64, 0x00, 13, 87.0 * FS_500_SENSITIVITY),
            (0xFF, 0xFF, 0, -FS_500_SENSITIVITY), // -1 two's complement
            (0x00, 0x80, 0, -32768.0 * FS_500_SENSITIVITY),
            (0x00, 0x00, 22, -22.0 * FS_500_SENSITIVITY),
        ];

        for &(low, high, zero, expected) in table {
            let got = decode_axis(low, high, zero);
            assert!(
                (got - expected).abs() < 1e-4,
                "decode({low:#04x}, {high:#04x}, {zero}) = {got}, expected {expected}"
            );
        }
    }

    #[test]
    fn init_writes_all_four_control_registers() {
        let bus = ReplayBus::new(vec![[0, 0, 0]]);
        let gyro = L3gd20::new(bus, DEFAULT_ZERO_OFFSETS).unwrap();
        assert_eq!(gyro.device_id(), L3GD20_DEVICE_ID);

        let writes = gyro.bus.config_writes().to_vec();
        assert_eq!(
            writes,
            vec![
                (CTRL_REG1, REG_1_CONFIG),
                (CTRL_REG2, REG_2_CONFIG),
                (CTRL_REG4, REG_4_CONFIG),
                (CTRL_REG5, REG_5_CONFIG),
            ]
        );
    }

    #[test]
    fn read_angular_applies_offsets_per_axis() {
        let bus = ReplayBus::new(vec![[113, 22, -97]]);
        let mut gyro = L3gd20::new(bus, DEFAULT_ZERO_OFFSETS).unwrap();

        let sample = gyro.read_angular().unwrap();
        assert!((sample.x - 100.0 * FS_500_SENSITIVITY).abs() < 1e-4);
        assert!(sample.y.abs() < 1e-6);
        assert!((sample.z - -100.0 * FS_500_SENSITIVITY).abs() < 1e-4);
    }

    #[test]
    fn calibration_uses_per_sample_integer_division() {
        let mut cal = Calibration::new();
        for _ in 0..CALIBRATION_SAMPLE_COUNT {
            cal.record([100, -100, 50]);
        }
        assert!(cal.is_complete());

        // 50 / 100 truncates to zero on every sample, so the z offset
        // is left untouched.
        let offsets = cal.apply_to(DEFAULT_ZERO_OFFSETS);
        assert_eq!(offsets, [113, -78, 3]);
    }

    #[test]
    fn calibration_discards_samples_past_the_run() {
        let mut cal = Calibration::new();
        for _ in 0..CALIBRATION_SAMPLE_COUNT + 10 {
            cal.record([1, 1, 1]);
        }
        assert_eq!(cal.samples().len(), CALIBRATION_SAMPLE_COUNT);
    }
}
