//! FFI bindings for FTDI libMPSSE SPI library
//!
//! This module provides low-level bindings to the libMPSSE SPI DLL.
//! Based on libmpsse_spi.h from FTDI's libMPSSE library.
//!
//! Types, status codes and option constants are always compiled (the error
//! type references them); the extern block is only present with the
//! `hardware` feature, which also makes build.rs emit the link directives.

#![allow(non_camel_case_types)]
#![allow(dead_code)]

use std::ffi::c_void;

// Windows types (matching WinTypes.h and ftd2xx.h)
pub type DWORD = u32;
pub type UCHAR = u8;
pub type USHORT = u16;
pub type LPDWORD = *mut DWORD;
pub type BOOL = i32;

// FTDI types
pub type FT_STATUS = DWORD;
pub type FT_HANDLE = *mut c_void;

// FT_STATUS return codes (from ftd2xx.h)
pub const FT_OK: FT_STATUS = 0;
pub const FT_INVALID_HANDLE: FT_STATUS = 1;
pub const FT_DEVICE_NOT_FOUND: FT_STATUS = 2;
pub const FT_DEVICE_NOT_OPENED: FT_STATUS = 3;
pub const FT_IO_ERROR: FT_STATUS = 4;
pub const FT_INSUFFICIENT_RESOURCES: FT_STATUS = 5;
pub const FT_INVALID_PARAMETER: FT_STATUS = 6;
pub const FT_INVALID_BAUD_RATE: FT_STATUS = 7;
pub const FT_DEVICE_NOT_OPENED_FOR_ERASE: FT_STATUS = 8;
pub const FT_DEVICE_NOT_OPENED_FOR_WRITE: FT_STATUS = 9;
pub const FT_FAILED_TO_WRITE_DEVICE: FT_STATUS = 10;
pub const FT_EEPROM_READ_FAILED: FT_STATUS = 11;
pub const FT_EEPROM_WRITE_FAILED: FT_STATUS = 12;
pub const FT_EEPROM_ERASE_FAILED: FT_STATUS = 13;
pub const FT_EEPROM_NOT_PRESENT: FT_STATUS = 14;
pub const FT_EEPROM_NOT_PROGRAMMED: FT_STATUS = 15;
pub const FT_INVALID_ARGS: FT_STATUS = 16;
pub const FT_NOT_SUPPORTED: FT_STATUS = 17;
pub const FT_OTHER_ERROR: FT_STATUS = 18;

// SPI configOptions bits (from libmpsse_spi.h)
pub const SPI_CONFIG_OPTION_MODE0: DWORD = 0x00000000;
pub const SPI_CONFIG_OPTION_MODE1: DWORD = 0x00000001;
pub const SPI_CONFIG_OPTION_MODE2: DWORD = 0x00000002;
pub const SPI_CONFIG_OPTION_MODE3: DWORD = 0x00000003;
pub const SPI_CONFIG_OPTION_CS_DBUS3: DWORD = 0x00000000;
pub const SPI_CONFIG_OPTION_CS_DBUS4: DWORD = 0x00000004;
pub const SPI_CONFIG_OPTION_CS_DBUS5: DWORD = 0x00000008;
pub const SPI_CONFIG_OPTION_CS_DBUS6: DWORD = 0x0000000C;
pub const SPI_CONFIG_OPTION_CS_DBUS7: DWORD = 0x00000010;
pub const SPI_CONFIG_OPTION_CS_ACTIVELOW: DWORD = 0x00000020;

// SPI transfer options (from libmpsse_spi.h)
pub const SPI_TRANSFER_OPTIONS_SIZE_IN_BYTES: DWORD = 0x00000000;
pub const SPI_TRANSFER_OPTIONS_SIZE_IN_BITS: DWORD = 0x00000001;
pub const SPI_TRANSFER_OPTIONS_CHIPSELECT_ENABLE: DWORD = 0x00000002;
pub const SPI_TRANSFER_OPTIONS_CHIPSELECT_DISABLE: DWORD = 0x00000004;

// SPI clock rate: 1 MHz, well under the L3GD20's 10 MHz limit
pub const SPI_CLOCK_RATE_HZ: DWORD = 1_000_000;

// FT_DEVICE_LIST_INFO_NODE structure (from ftd2xx.h)
#[repr(C)]
#[derive(Debug, Clone)]
#[allow(non_snake_case)]
pub struct FT_DEVICE_LIST_INFO_NODE {
    pub Flags: DWORD,
    pub Type: DWORD,
    pub ID: DWORD,
    pub LocId: DWORD,
    pub SerialNumber: [u8; 16],
    pub Description: [u8; 64],
    pub ftHandle: FT_HANDLE,
}

// ChannelConfig structure (from libmpsse_spi.h)
#[repr(C)]
#[derive(Debug, Clone)]
#[allow(non_snake_case)]
pub struct ChannelConfig {
    pub ClockRate: DWORD,
    pub LatencyTimer: UCHAR,
    pub configOptions: DWORD,
    pub Pin: DWORD,
    pub reserved: USHORT,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            ClockRate: SPI_CLOCK_RATE_HZ,
            LatencyTimer: 8,
            // SPI mode 3, CS on ADBUS3, active low - the L3GD20 wiring
            configOptions: SPI_CONFIG_OPTION_MODE3
                | SPI_CONFIG_OPTION_CS_DBUS3
                | SPI_CONFIG_OPTION_CS_ACTIVELOW,
            Pin: 0,
            reserved: 0,
        }
    }
}

// External function declarations from libmpsse.dll
#[cfg(feature = "hardware")]
#[link(name = "libmpsse")]
extern "C" {
    /// Initialize libMPSSE library
    pub fn Init_libMPSSE();

    /// Cleanup libMPSSE library
    pub fn Cleanup_libMPSSE();

    /// Get the number of SPI channels available
    pub fn SPI_GetNumChannels(numChannels: *mut DWORD) -> FT_STATUS;

    /// Get information about a specific channel
    pub fn SPI_GetChannelInfo(
        index: DWORD,
        chanInfo: *mut FT_DEVICE_LIST_INFO_NODE,
    ) -> FT_STATUS;

    /// Open an SPI channel
    pub fn SPI_OpenChannel(index: DWORD, handle: *mut FT_HANDLE) -> FT_STATUS;

    /// Initialize an SPI channel with configuration
    pub fn SPI_InitChannel(handle: FT_HANDLE, config: *mut ChannelConfig) -> FT_STATUS;

    /// Close an SPI channel
    pub fn SPI_CloseChannel(handle: FT_HANDLE) -> FT_STATUS;

    /// Read data from the SPI slave
    pub fn SPI_Read(
        handle: FT_HANDLE,
        buffer: *mut UCHAR,
        sizeToTransfer: DWORD,
        sizeTransferred: LPDWORD,
        transferOptions: DWORD,
    ) -> FT_STATUS;

    /// Write data to the SPI slave
    pub fn SPI_Write(
        handle: FT_HANDLE,
        buffer: *const UCHAR,
        sizeToTransfer: DWORD,
        sizeTransferred: LPDWORD,
        transferOptions: DWORD,
    ) -> FT_STATUS;

    /// Simultaneous write/read transfer
    pub fn SPI_ReadWrite(
        handle: FT_HANDLE,
        inBuffer: *mut UCHAR,
        outBuffer: *mut UCHAR,
        sizeToTransfer: DWORD,
        sizeTransferred: LPDWORD,
        transferOptions: DWORD,
    ) -> FT_STATUS;
}

/// Helper function to convert FT_STATUS to a string description
pub fn status_to_string(status: FT_STATUS) -> &'static str {
    match status {
        FT_OK => "FT_OK",
        FT_INVALID_HANDLE => "FT_INVALID_HANDLE",
        FT_DEVICE_NOT_FOUND => "FT_DEVICE_NOT_FOUND",
        FT_DEVICE_NOT_OPENED => "FT_DEVICE_NOT_OPENED",
        FT_IO_ERROR => "FT_IO_ERROR",
        FT_INSUFFICIENT_RESOURCES => "FT_INSUFFICIENT_RESOURCES",
        FT_INVALID_PARAMETER => "FT_INVALID_PARAMETER",
        FT_INVALID_BAUD_RATE => "FT_INVALID_BAUD_RATE",
        FT_DEVICE_NOT_OPENED_FOR_ERASE => "FT_DEVICE_NOT_OPENED_FOR_ERASE",
        FT_DEVICE_NOT_OPENED_FOR_WRITE => "FT_DEVICE_NOT_OPENED_FOR_WRITE",
        FT_FAILED_TO_WRITE_DEVICE => "FT_FAILED_TO_WRITE_DEVICE",
        FT_EEPROM_READ_FAILED => "FT_EEPROM_READ_FAILED",
        FT_EEPROM_WRITE_FAILED => "FT_EEPROM_WRITE_FAILED",
        FT_EEPROM_ERASE_FAILED => "FT_EEPROM_ERASE_FAILED",
        FT_EEPROM_NOT_PRESENT => "FT_EEPROM_NOT_PRESENT",
        FT_EEPROM_NOT_PROGRAMMED => "FT_EEPROM_NOT_PROGRAMMED",
        FT_INVALID_ARGS => "FT_INVALID_ARGS",
        FT_NOT_SUPPORTED => "FT_NOT_SUPPORTED",
        FT_OTHER_ERROR => "FT_OTHER_ERROR",
        _ => "UNKNOWN_ERROR",
    }
}
