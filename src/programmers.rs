//! Programmer registration and dispatch
//!
//! This module provides a centralized registry for all programmers, with support
//! for feature-gated inclusion and dynamic help text generation.

use spibang_core::programmer::SpiMaster;
use thiserror::Error;

/// Information about a programmer
pub struct ProgrammerInfo {
    /// Primary name (used for matching)
    pub name: &'static str,
    /// Alternative names/aliases
    pub aliases: &'static [&'static str],
    /// Short description
    pub description: &'static str,
}

/// Errors from programmer string handling
#[derive(Debug, Error)]
pub enum ProgrammerError {
    /// No compiled-in programmer has this name
    #[error("Unknown programmer: {name}\n\nAvailable programmers: {available}\nUse 'spibang list-programmers' for more details")]
    Unknown { name: String, available: String },

    /// An option was not of the form key=value
    #[error("Invalid parameter format: '{0}' (expected key=value)")]
    InvalidParameter(String),
}

/// Get information about all available programmers (enabled at compile time)
#[allow(unused_mut, clippy::vec_init_then_push)]
pub fn available_programmers() -> Vec<ProgrammerInfo> {
    let mut programmers = Vec::new();

    #[cfg(feature = "sim")]
    programmers.push(ProgrammerInfo {
        name: "sim",
        aliases: &["dummy"],
        description: "Simulated SPI flash on a virtual bus (size=<KiB>,busy=<polls>)",
    });

    #[cfg(feature = "linux-gpio")]
    programmers.push(ProgrammerInfo {
        name: "linux_gpio_spi",
        aliases: &["linux-gpio", "gpio"],
        description: "Linux GPIO bitbang (dev=<path>|gpiochip=<n>,cs,sck,mosi,miso[,spispeed=<kHz>])",
    });

    programmers
}

/// Comma-separated list of programmer names for help text
pub fn programmer_names_short() -> String {
    let programmers = available_programmers();
    let names: Vec<&str> = programmers.iter().map(|p| p.name).collect();
    names.join(", ")
}

/// Resolve a programmer name or alias to its primary name
pub fn find_programmer(name: &str) -> Option<&'static str> {
    available_programmers()
        .into_iter()
        .find(|p| p.name == name || p.aliases.contains(&name))
        .map(|p| p.name)
}

/// Parse a programmer string into name and options
///
/// Format: "name" or "name:option1=value1,option2=value2"
pub fn parse_programmer_string(s: &str) -> Result<(&str, Vec<(&str, &str)>), ProgrammerError> {
    let Some((name, opts)) = s.split_once(':') else {
        return Ok((s, Vec::new()));
    };

    let mut options = Vec::new();
    for opt in opts.split(',').filter(|opt| !opt.is_empty()) {
        let (key, value) = opt
            .split_once('=')
            .ok_or_else(|| ProgrammerError::InvalidParameter(opt.to_string()))?;
        options.push((key, value));
    }
    Ok((name, options))
}

/// Open the programmer described by `programmer`
///
/// The programmer string can be just the name (e.g., "sim") or include
/// parameters (e.g., "sim:size=64").
#[allow(unused_variables)]
pub fn open_programmer(
    programmer: &str,
) -> Result<Box<dyn SpiMaster + Send>, Box<dyn std::error::Error>> {
    let (name, options) = parse_programmer_string(programmer)?;

    let canonical_name = find_programmer(name).ok_or_else(|| ProgrammerError::Unknown {
        name: name.to_string(),
        available: programmer_names_short(),
    })?;

    log::debug!("Opening {} programmer", canonical_name);

    match canonical_name {
        #[cfg(feature = "sim")]
        "sim" => spibang_sim::open_sim(&options),

        #[cfg(feature = "linux-gpio")]
        "linux_gpio_spi" => spibang_linux_gpio::open_linux_gpio_spi(&options).map_err(|e| {
            format!(
                "Failed to open Linux GPIO lines: {}\n\
                 Make sure the GPIO chip exists and you have read/write permissions.",
                e
            )
            .into()
        }),

        _ => Err(ProgrammerError::Unknown {
            name: name.to_string(),
            available: programmer_names_short(),
        }
        .into()),
    }
}
