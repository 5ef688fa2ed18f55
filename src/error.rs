//! Error types for the L3GD20 SPI interface

use thiserror::Error;

use crate::ffi::{status_to_string, FT_STATUS, FT_OK};

/// Error type for L3GD20 operations
#[derive(Error, Debug)]
pub enum L3gd20Error {
    /// FTDI driver error
    #[error("FTDI error: {status} ({description})")]
    FtdiError {
        status: FT_STATUS,
        description: String,
    },

    /// No SPI channels found
    #[error("No SPI channels found")]
    NoChannelsFound,

    /// Invalid channel index
    #[error("Invalid channel index: {0}")]
    InvalidChannel(u32),

    /// Data transfer error
    #[error("Data transfer error: expected {expected} bytes, transferred {actual}")]
    TransferError { expected: u32, actual: u32 },

    /// Invalid parameter
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Malformed recorded sample data
    #[error("Malformed sample record at line {line}: {reason}")]
    MalformedRecord { line: usize, reason: String },

    /// File I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<FT_STATUS> for L3gd20Error {
    fn from(status: FT_STATUS) -> Self {
        if status == FT_OK {
            panic!("Cannot convert FT_OK to error");
        }
        L3gd20Error::FtdiError {
            status,
            description: status_to_string(status).to_string(),
        }
    }
}

/// Result type for L3GD20 operations
pub type Result<T> = std::result::Result<T, L3gd20Error>;
