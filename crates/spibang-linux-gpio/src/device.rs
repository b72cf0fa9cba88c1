//! Linux GPIO bitbang backend
//!
//! This module provides [`LinuxGpioBackend`], which drives the four SPI
//! signals through the Linux GPIO character device interface (gpiocdev) and
//! implements [`BitbangBackend`], so the core bus master can clock commands
//! through it.

use crate::error::{LinuxGpioError, Result};

use gpiocdev::line::{Offset, Value};
use gpiocdev::request::{Config, Request};

use spibang_core::error::{Error as CoreError, Result as CoreResult};
use spibang_core::programmer::{BitbangBackend, BitbangConfig};

/// GPIO line indices
#[derive(Debug, Clone, Copy)]
enum Line {
    Cs = 0,
    Sck = 1,
    Mosi = 2,
    Miso = 3,
}

const NUM_LINES: usize = 4;

/// Default half-period delay in microseconds (for ~100 kHz SPI clock)
pub const DEFAULT_HALF_PERIOD_US: u32 = 5;

/// Configuration for opening the GPIO lines
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinuxGpioConfig {
    /// Device path (e.g., "/dev/gpiochip0")
    pub device: String,
    /// CS (Chip Select) GPIO line offset
    pub cs: Offset,
    /// SCK (Clock) GPIO line offset
    pub sck: Offset,
    /// MOSI (Master Out Slave In) GPIO line offset
    pub mosi: Offset,
    /// MISO (Master In Slave Out) GPIO line offset
    pub miso: Offset,
    /// Half-period delay in microseconds
    pub half_period_us: u32,
}

impl Default for LinuxGpioConfig {
    fn default() -> Self {
        Self {
            device: String::new(),
            cs: 0,
            sck: 0,
            mosi: 0,
            miso: 0,
            half_period_us: DEFAULT_HALF_PERIOD_US,
        }
    }
}

impl LinuxGpioConfig {
    /// Create a new configuration with the given device path and pins
    pub fn new(
        device: impl Into<String>,
        cs: Offset,
        sck: Offset,
        mosi: Offset,
        miso: Offset,
    ) -> Self {
        Self {
            device: device.into(),
            cs,
            sck,
            mosi,
            miso,
            ..Default::default()
        }
    }

    /// Set SPI speed in Hz (approximate, via half-period calculation)
    pub fn with_speed_hz(mut self, hz: u32) -> Self {
        self.half_period_us = BitbangConfig::default().with_speed_hz(hz).half_period_us;
        self
    }

    /// Bus timing for the core bus master
    pub fn bitbang_config(&self) -> BitbangConfig {
        BitbangConfig::new(self.half_period_us)
    }

    fn offsets(&self) -> [Offset; NUM_LINES] {
        let mut offsets = [0; NUM_LINES];
        offsets[Line::Cs as usize] = self.cs;
        offsets[Line::Sck as usize] = self.sck;
        offsets[Line::Mosi as usize] = self.mosi;
        offsets[Line::Miso as usize] = self.miso;
        offsets
    }

    fn check_distinct(&self) -> Result<()> {
        let offsets = self.offsets();
        for (i, offset) in offsets.iter().enumerate() {
            if offsets[i + 1..].contains(offset) {
                return Err(LinuxGpioError::DuplicateLine(*offset));
            }
        }
        Ok(())
    }
}

/// Bitbang backend on Linux GPIO lines
///
/// Holds the line request for CS, SCK and MOSI (outputs) and MISO (input).
/// The lines are released when the backend is dropped.
pub struct LinuxGpioBackend {
    /// GPIO line request handle
    request: Request,
    /// GPIO line offsets indexed by Line enum
    offsets: [Offset; NUM_LINES],
}

impl LinuxGpioBackend {
    /// Request the GPIO lines described by `config`
    ///
    /// CS starts deselected (high), SCK and MOSI start low.
    pub fn open(config: &LinuxGpioConfig) -> Result<Self> {
        if config.device.is_empty() {
            return Err(LinuxGpioError::NoDevice);
        }
        config.check_distinct()?;

        log::debug!("linux_gpio_spi: Opening device {}", config.device);

        let mut req_config = Config::default();
        req_config.with_line(config.cs).as_output(Value::Active);
        req_config.with_line(config.sck).as_output(Value::Inactive);
        req_config.with_line(config.mosi).as_output(Value::Inactive);
        req_config.with_line(config.miso).as_input();

        let request = Request::from_config(req_config)
            .on_chip(&config.device)
            .with_consumer("spibang")
            .request()
            .map_err(|source| LinuxGpioError::LineRequestFailed {
                path: config.device.clone(),
                source,
            })?;

        log::info!(
            "linux_gpio_spi: Opened {} (cs={}, sck={}, mosi={}, miso={}, half period {} us)",
            config.device,
            config.cs,
            config.sck,
            config.mosi,
            config.miso,
            config.half_period_us
        );

        Ok(Self {
            request,
            offsets: config.offsets(),
        })
    }

    fn set_line(&mut self, line: Line, high: bool) -> CoreResult<()> {
        let value = if high { Value::Active } else { Value::Inactive };
        self.request
            .set_value(self.offsets[line as usize], value)
            .map(|_| ())
            .map_err(|e| {
                log::error!("Failed to set {:?}: {}", line, e);
                CoreError::BackendFault
            })
    }
}

impl BitbangBackend for LinuxGpioBackend {
    fn set_cs(&mut self, active: bool) -> CoreResult<()> {
        // CS is active low
        self.set_line(Line::Cs, !active)
    }

    fn set_sck(&mut self, high: bool) -> CoreResult<()> {
        self.set_line(Line::Sck, high)
    }

    fn set_mosi(&mut self, high: bool) -> CoreResult<()> {
        self.set_line(Line::Mosi, high)
    }

    fn get_miso(&mut self) -> CoreResult<bool> {
        match self.request.value(self.offsets[Line::Miso as usize]) {
            Ok(Value::Active) => Ok(true),
            Ok(Value::Inactive) => Ok(false),
            Err(e) => {
                log::error!("Failed to get MISO: {}", e);
                Err(CoreError::BackendFault)
            }
        }
    }

    fn delay_us(&mut self, us: u32) {
        if us > 0 {
            std::thread::sleep(std::time::Duration::from_micros(us as u64));
        }
    }
}

fn parse_value<T: core::str::FromStr>(name: &'static str, value: &str) -> Result<T> {
    value.parse().map_err(|_| LinuxGpioError::InvalidParameter {
        name,
        value: value.to_string(),
    })
}

/// Parse programmer options from key-value pairs
///
/// Supported options:
///
/// - `dev=/dev/gpiochipN` - GPIO chip device path (required, or use gpiochip)
/// - `gpiochip=N` - GPIO chip number (alternative to dev)
/// - `cs=N` - CS (chip select) GPIO line offset (required)
/// - `sck=N` - SCK (clock) GPIO line offset (required)
/// - `mosi=N` - MOSI GPIO line offset (required)
/// - `miso=N` - MISO GPIO line offset (required)
/// - `spispeed=N` - SPI speed in kHz (optional, default ~100 kHz)
/// - `half_period=N` - half clock period in microseconds (overrides spispeed)
pub fn parse_options(options: &[(&str, &str)]) -> Result<LinuxGpioConfig> {
    let mut config = LinuxGpioConfig::default();
    let mut cs = None;
    let mut sck = None;
    let mut mosi = None;
    let mut miso = None;
    let mut gpiochip: Option<u32> = None;
    let mut half_period_us: Option<u32> = None;

    for &(key, value) in options {
        match key {
            "dev" => config.device = value.to_string(),
            "gpiochip" => gpiochip = Some(parse_value("gpiochip", value)?),
            "cs" => cs = Some(parse_value("cs", value)?),
            "sck" => sck = Some(parse_value("sck", value)?),
            "mosi" => mosi = Some(parse_value("mosi", value)?),
            "miso" => miso = Some(parse_value("miso", value)?),
            "spispeed" => {
                let speed_khz: u32 = parse_value("spispeed", value)?;
                if speed_khz == 0 {
                    return Err(LinuxGpioError::InvalidParameter {
                        name: "spispeed",
                        value: value.to_string(),
                    });
                }
                config = config.with_speed_hz(speed_khz.saturating_mul(1000));
            }
            "half_period" => half_period_us = Some(parse_value("half_period", value)?),
            _ => {
                log::warn!("linux_gpio_spi: Unknown option: {}={}", key, value);
            }
        }
    }

    // Handle dev vs gpiochip
    match (config.device.is_empty(), gpiochip) {
        (true, Some(n)) => config.device = format!("/dev/gpiochip{}", n),
        (true, None) => return Err(LinuxGpioError::NoDevice),
        (false, Some(_)) => return Err(LinuxGpioError::ConflictingDevice),
        (false, None) => {}
    }

    config.cs = cs.ok_or(LinuxGpioError::MissingParameter("cs"))?;
    config.sck = sck.ok_or(LinuxGpioError::MissingParameter("sck"))?;
    config.mosi = mosi.ok_or(LinuxGpioError::MissingParameter("mosi"))?;
    config.miso = miso.ok_or(LinuxGpioError::MissingParameter("miso"))?;
    if let Some(us) = half_period_us {
        config.half_period_us = us;
    }

    config.check_distinct()?;
    Ok(config)
}
