//! Error types for the Linux GPIO backend

use thiserror::Error;

/// Errors raised while configuring or opening the GPIO lines
#[derive(Debug, Error)]
pub enum LinuxGpioError {
    /// Failed to request GPIO lines
    #[error("Failed to request GPIO lines on '{path}': {source}")]
    LineRequestFailed {
        path: String,
        #[source]
        source: gpiocdev::Error,
    },

    /// Invalid parameter value
    #[error("Invalid {name} value: {value}")]
    InvalidParameter { name: &'static str, value: String },

    /// Missing required parameter
    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),

    /// GPIO chip or device not specified
    #[error("No GPIO chip specified. Use dev=/dev/gpiochipN or gpiochip=N")]
    NoDevice,

    /// Both a device path and a chip number were given
    #[error("Only one of 'dev' or 'gpiochip' can be specified")]
    ConflictingDevice,

    /// The same line was assigned to two signals
    #[error("GPIO line {0} is assigned to more than one signal")]
    DuplicateLine(u32),
}

/// Result type for Linux GPIO backend setup
pub type Result<T> = std::result::Result<T, LinuxGpioError>;
