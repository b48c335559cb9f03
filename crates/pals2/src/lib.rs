//! # PALS2 proximity and ambient light sensor driver
//!
//! Platform-agnostic driver for the Infineon PALS2 (packaged by Vishay as
//! VCNL4135X01), built on the [`embedded-hal`] I2C traits.
//!
//! The driver keeps shadow copies of the proximity, IRED, ALS and interrupt
//! configuration registers. Every setter edits one field of a shadow and
//! writes the whole byte back; the configuration registers are never read.
//! Measurements are fetched either periodically (the device samples on its
//! own, [`Pals2::update_data`] burst-reads the result registers) or on demand
//! (the driver triggers one conversion and polls for the done flag).
//!
//! ```rust,ignore
//! use pals2::{ConversionStatus, EmbassyClock, Pals2};
//!
//! let mut sensor = Pals2::new(i2c, EmbassyClock);
//! sensor.begin()?;
//! sensor.set_proximity_rate(64)?;
//! sensor.set_adc_gain(800)?;
//!
//! sensor.update_data()?;
//! let proximity = sensor.raw_proximity();
//!
//! let reading = sensor.raw_ambient_light_on_demand()?;
//! if reading.status == ConversionStatus::TimedOut {
//!     // value may be stale
//! }
//! ```
//!
//! The driver owns the bus handle and is not internally synchronized. Share
//! it between tasks behind a mutex, or hand it a shared-bus device.
//!
//! # Features
//!
//! - **`async`**: `_async` twins of every bus operation over
//!   [`embedded-hal-async`].
//! - **`embassy-time`**: [`EmbassyClock`], a [`Clock`] backed by
//!   `embassy_time::Instant`.
//! - **`defmt`**: `defmt::Format` on public types and debug/warn logging.
//!
//! [`embedded-hal`]: https://crates.io/crates/embedded-hal
//! [`embedded-hal-async`]: https://crates.io/crates/embedded-hal-async

#![no_std]

use byteorder::{BigEndian, ByteOrder};
use embedded_hal::i2c::I2c;
use heapless::Vec;

#[cfg(feature = "embassy-time")]
pub use crate::clock::EmbassyClock;
pub use crate::clock::{Clock, ConversionStatus};
pub use crate::config::{ErrorPolicy, Pals2Config};
pub use crate::errors::Error;
pub use crate::registers::*;

use crate::clock::Deadline;

#[cfg(feature = "async")]
mod asynch;
mod clock;
mod config;
pub mod errors;
pub mod registers;

/// Register writes performed by [`Pals2::reset`].
const RESET_SEQUENCE: [(Register, u8); 5] = [
    (Register::ProximityConfig, 0x00),
    (Register::IredConfig, 0x00),
    (Register::AlsConfig, 0x00),
    (Register::AlsCompensation, 0x00),
    (Register::InterruptConfig, 0x00),
];

/// Writes performed by [`Pals2::begin`]: a full reset, then periodic mode.
const BEGIN_SEQUENCE: [(Register, u8); 6] = [
    RESET_SEQUENCE[0],
    RESET_SEQUENCE[1],
    RESET_SEQUENCE[2],
    RESET_SEQUENCE[3],
    RESET_SEQUENCE[4],
    (Register::Command, Command::PERIODIC.bits()),
];

/// Upper bound on writes issued by [`Pals2::apply_config`]: three
/// configuration registers, two threshold windows, color compensation.
const MAX_CONFIG_WRITES: usize = 12;
const _: () = assert!(MAX_CONFIG_WRITES >= 3 + 4 + 4 + 1);

/// Most recent values fetched by [`Pals2::update_data`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Measurements {
    pub proximity: u16,
    pub ambient_light: u16,
    /// Only refreshed while color compensation is enabled.
    pub blue1: u16,
    /// Only refreshed while color compensation is enabled.
    pub blue2: u16,
}

impl Measurements {
    /// Decode a burst starting at the proximity high byte.
    ///
    /// Bytes 4 and 5 of the 10-byte form belong to registers the driver does
    /// not model and are skipped.
    fn update(&mut self, buffer: &[u8]) {
        self.proximity = BigEndian::read_u16(&buffer[0..2]);
        self.ambient_light = BigEndian::read_u16(&buffer[2..4]);
        if buffer.len() >= MEASUREMENT_LEN_BLUE {
            self.blue1 = BigEndian::read_u16(&buffer[6..8]);
            self.blue2 = BigEndian::read_u16(&buffer[8..10]);
        }
    }
}

/// Result of an on-demand measurement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct OnDemand {
    pub value: u16,
    pub status: ConversionStatus,
}

/// Last values successfully written to the configuration registers.
#[derive(Debug, Clone, Copy, Default)]
struct Shadows {
    proximity: ProximityConfig,
    ired: IredConfig,
    als: AlsConfig,
    interrupt: InterruptConfig,
    color_compensation: bool,
}

impl Shadows {
    fn commit(&mut self, register: Register, value: u8) {
        match register {
            Register::ProximityConfig => {
                self.proximity = ProximityConfig::from_bits_retain(value)
            }
            Register::IredConfig => self.ired = IredConfig::from_bits_retain(value),
            Register::AlsConfig => self.als = AlsConfig::from_bits_retain(value),
            Register::InterruptConfig => {
                self.interrupt = InterruptConfig::from_bits_retain(value)
            }
            Register::AlsCompensation => {
                self.color_compensation =
                    AlsCompensation::from_bits_retain(value).blue_enabled()
            }
            _ => {}
        }
    }
}

pub struct Pals2<I2C, C> {
    i2c: I2C,
    clock: C,
    policy: ErrorPolicy,
    shadows: Shadows,
    data: Measurements,
}

impl<I2C, C> Pals2<I2C, C> {
    pub fn new(i2c: I2C, clock: C) -> Self {
        Self::with_policy(i2c, clock, ErrorPolicy::default())
    }

    pub fn with_policy(i2c: I2C, clock: C, policy: ErrorPolicy) -> Self {
        Self {
            i2c,
            clock,
            policy,
            shadows: Shadows::default(),
            data: Measurements::default(),
        }
    }

    /// Release the bus and the clock.
    pub fn destroy(self) -> (I2C, C) {
        (self.i2c, self.clock)
    }

    pub fn policy(&self) -> ErrorPolicy {
        self.policy
    }

    pub fn set_policy(&mut self, policy: ErrorPolicy) {
        self.policy = policy;
    }

    /// Proximity counts from the last [`update_data`](Self::update_data).
    pub fn raw_proximity(&self) -> u16 {
        self.data.proximity
    }

    /// ALS counts from the last [`update_data`](Self::update_data).
    pub fn raw_ambient_light(&self) -> u16 {
        self.data.ambient_light
    }

    /// Blue photodiode 1 and 2 counts from the last update.
    pub fn raw_blue(&self) -> (u16, u16) {
        (self.data.blue1, self.data.blue2)
    }

    pub fn measurements(&self) -> Measurements {
        self.data
    }

    /// Placeholder conversion: the ALS count divided by 100 with integer
    /// division. Not a calibrated lux value.
    pub fn illuminance(&self) -> f32 {
        (self.data.ambient_light / 100) as f32
    }

    /// `(blue1 - blue2) / blue1`.
    ///
    /// Unverified: the blue photodiode registers have not been observed to
    /// update on real hardware. `None` while color compensation is off or
    /// when blue1 reads zero.
    pub fn blue_ratio(&self) -> Option<f32> {
        if !self.shadows.color_compensation || self.data.blue1 == 0 {
            return None;
        }
        let blue1 = self.data.blue1 as f32;
        Some((blue1 - self.data.blue2 as f32) / blue1)
    }

    pub fn gain(&self) -> AdcGain {
        self.shadows.als.gain()
    }

    /// Scale factor paired with the active ADC gain.
    pub fn gain_factor(&self) -> f32 {
        self.gain().factor()
    }

    pub fn color_compensation_enabled(&self) -> bool {
        self.shadows.color_compensation
    }

    pub fn proximity_config(&self) -> ProximityConfig {
        self.shadows.proximity
    }

    pub fn ired_config(&self) -> IredConfig {
        self.shadows.ired
    }

    pub fn als_config(&self) -> AlsConfig {
        self.shadows.als
    }

    pub fn interrupt_config(&self) -> InterruptConfig {
        self.shadows.interrupt
    }

    fn measurement_len(&self) -> usize {
        if self.shadows.color_compensation {
            MEASUREMENT_LEN_BLUE
        } else {
            MEASUREMENT_LEN
        }
    }

    /// Decide whether a failed transfer inside a sequence ends it.
    fn absorb<E>(
        &self,
        _register: Register,
        error: Error<E>,
        first_error: &mut Option<Error<E>>,
    ) -> Result<(), Error<E>> {
        match self.policy {
            ErrorPolicy::Strict => Err(error),
            ErrorPolicy::BestEffort => {
                #[cfg(feature = "defmt")]
                defmt::warn!("Transfer on {:?} failed, continuing", _register);
                first_error.get_or_insert(error);
                Ok(())
            }
        }
    }

    fn check_conversion<E>(
        &self,
        status: ConversionStatus,
    ) -> Result<(), Error<E>> {
        match (status, self.policy) {
            (ConversionStatus::TimedOut, ErrorPolicy::Strict) => {
                Err(Error::Timeout)
            }
            _ => Ok(()),
        }
    }

    fn interrupt_writes(
        &self,
        channel: Channel,
        thresholds: Thresholds,
    ) -> [(Register, u8); 5] {
        let config = match channel {
            Channel::Proximity => {
                self.shadows.interrupt.with_proximity_interrupt(true)
            }
            Channel::AmbientLight => {
                self.shadows.interrupt.with_als_interrupt(true)
            }
        };
        let [bottom_high, bottom_low, top_high, top_low] =
            Self::threshold_writes(channel, thresholds);
        [
            (Register::InterruptConfig, config.bits()),
            bottom_high,
            bottom_low,
            top_high,
            top_low,
        ]
    }

    fn config_writes(
        &self,
        config: &Pals2Config,
    ) -> Vec<(Register, u8), MAX_CONFIG_WRITES> {
        let mut writes = Vec::new();

        let proximity = self
            .shadows
            .proximity
            .with_rate(config.proximity_rate)
            .with_offset_compensation(config.offset_compensation);
        let als = self
            .shadows
            .als
            .with_rate(config.als_rate)
            .with_gain(config.gain);
        let interrupt = self
            .shadows
            .interrupt
            .with_persistence(config.persistence)
            .with_proximity_interrupt(config.proximity_interrupt.is_some())
            .with_als_interrupt(config.als_interrupt.is_some());

        let _ = writes.push((Register::ProximityConfig, proximity.bits()));
        let _ = writes.push((Register::AlsConfig, als.bits()));
        let _ = writes.push((Register::InterruptConfig, interrupt.bits()));

        for (channel, thresholds) in [
            (Channel::Proximity, config.proximity_interrupt),
            (Channel::AmbientLight, config.als_interrupt),
        ] {
            if let Some(thresholds) = thresholds {
                let _ = writes.extend_from_slice(
                    &Self::threshold_writes(channel, thresholds),
                );
            }
        }

        if let Some(period) = config.color_compensation {
            let _ = writes.push((
                Register::AlsCompensation,
                AlsCompensation::enabled(period).bits(),
            ));
        }

        writes
    }

    fn threshold_writes(
        channel: Channel,
        thresholds: Thresholds,
    ) -> [(Register, u8); 4] {
        let registers = channel.threshold_registers();
        let bytes = thresholds.bytes();
        [
            (registers[0], bytes[0]),
            (registers[1], bytes[1]),
            (registers[2], bytes[2]),
            (registers[3], bytes[3]),
        ]
    }
}

impl<I2C, C, E> Pals2<I2C, C>
where
    I2C: I2c<Error = E>,
    C: Clock,
{
    /// Single-byte write. Writes to a configuration register also update its
    /// shadow, but only once the bus acknowledged them.
    pub fn write_register(
        &mut self,
        register: Register,
        value: u8,
    ) -> Result<(), Error<E>> {
        #[cfg(feature = "defmt")]
        defmt::debug!("{:?} <- {=u8:#x}", register, value);
        self.i2c.write(I2C_ADDRESS, &[register.addr(), value])?;
        self.shadows.commit(register, value);
        Ok(())
    }

    /// Read `buffer.len()` consecutive registers starting at `start`.
    pub fn read_burst(
        &mut self,
        start: Register,
        buffer: &mut [u8],
    ) -> Result<(), Error<E>> {
        #[cfg(feature = "defmt")]
        defmt::debug!("{:?} -> {=usize} bytes", start, buffer.len());
        self.i2c.write_read(I2C_ADDRESS, &[start.addr()], buffer)?;
        Ok(())
    }

    fn write_sequence(
        &mut self,
        writes: &[(Register, u8)],
    ) -> Result<(), Error<E>> {
        let mut first_error = None;
        for &(register, value) in writes {
            if let Err(e) = self.write_register(register, value) {
                self.absorb(register, e, &mut first_error)?;
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    /// Reset every configuration register and start periodic measurements.
    pub fn begin(&mut self) -> Result<(), Error<E>> {
        self.write_sequence(&BEGIN_SEQUENCE)
    }

    /// Zero the proximity, IRED, ALS, ALS compensation and interrupt
    /// configuration registers.
    pub fn reset(&mut self) -> Result<(), Error<E>> {
        self.write_sequence(&RESET_SEQUENCE)
    }

    /// Self-timed proximity and ALS measurements with standby in between.
    pub fn enable_periodic_measurements(&mut self) -> Result<(), Error<E>> {
        self.write_register(Register::Command, Command::PERIODIC.bits())
    }

    /// Write a whole configuration. With [`ErrorPolicy::BestEffort`] every
    /// write is attempted and the first failure is returned.
    pub fn apply_config(
        &mut self,
        config: &Pals2Config,
    ) -> Result<(), Error<E>> {
        self.policy = config.policy;
        let writes = self.config_writes(config);
        self.write_sequence(&writes)
    }

    /// With offset compensation the device runs two measurements per cycle
    /// and reports their difference.
    pub fn enable_proximity_offset_compensation(
        &mut self,
    ) -> Result<(), Error<E>> {
        let reg = self.shadows.proximity.with_offset_compensation(true);
        self.write_register(Register::ProximityConfig, reg.bits())
    }

    pub fn disable_proximity_offset_compensation(
        &mut self,
    ) -> Result<(), Error<E>> {
        let reg = self.shadows.proximity.with_offset_compensation(false);
        self.write_register(Register::ProximityConfig, reg.bits())
    }

    /// Measurements per second, clamped to 256 and truncated to a power of
    /// two.
    pub fn set_proximity_rate(&mut self, per_second: u16) -> Result<(), Error<E>> {
        let reg = self
            .shadows
            .proximity
            .with_rate(ProximityRate::from_per_second(per_second));
        self.write_register(Register::ProximityConfig, reg.bits())
    }

    /// Consecutive out-of-window measurements before an interrupt fires,
    /// clamped to 128 and truncated to a power of two.
    pub fn set_interrupt_persistence(
        &mut self,
        count: u8,
    ) -> Result<(), Error<E>> {
        let reg = self
            .shadows
            .interrupt
            .with_persistence(Persistence::from_count(count));
        self.write_register(Register::InterruptConfig, reg.bits())
    }

    /// Interrupt when proximity leaves `[bottom, top]`.
    pub fn enable_proximity_interrupt(
        &mut self,
        top: u16,
        bottom: u16,
    ) -> Result<(), Error<E>> {
        let writes =
            self.interrupt_writes(Channel::Proximity, Thresholds::new(top, bottom));
        self.write_sequence(&writes)
    }

    pub fn disable_proximity_interrupt(&mut self) -> Result<(), Error<E>> {
        let reg = self.shadows.interrupt.with_proximity_interrupt(false);
        self.write_register(Register::InterruptConfig, reg.bits())
    }

    /// Interrupt when ambient light leaves `[bottom, top]`.
    pub fn enable_ambient_light_interrupt(
        &mut self,
        top: u16,
        bottom: u16,
    ) -> Result<(), Error<E>> {
        let writes = self
            .interrupt_writes(Channel::AmbientLight, Thresholds::new(top, bottom));
        self.write_sequence(&writes)
    }

    pub fn disable_ambient_light_interrupt(&mut self) -> Result<(), Error<E>> {
        let reg = self.shadows.interrupt.with_als_interrupt(false);
        self.write_register(Register::InterruptConfig, reg.bits())
    }

    /// Enable the blue photodiode. From here on [`update_data`] reads all
    /// ten result bytes. There is no disable short of [`reset`].
    ///
    /// [`update_data`]: Self::update_data
    /// [`reset`]: Self::reset
    pub fn enable_color_compensation(
        &mut self,
        period: ColorCompPeriod,
    ) -> Result<(), Error<E>> {
        self.write_register(
            Register::AlsCompensation,
            AlsCompensation::enabled(period).bits(),
        )
    }

    /// ADC gain in femtoamps; anything but 200, 800, 3200 or 25600 selects
    /// 200.
    pub fn set_adc_gain(&mut self, femtoamps: u16) -> Result<(), Error<E>> {
        let reg = self.shadows.als.with_gain(AdcGain::from_femtoamps(femtoamps));
        self.write_register(Register::AlsConfig, reg.bits())
    }

    /// ALS measurements per second, clamped to 1..=8.
    pub fn set_ambient_light_rate(
        &mut self,
        per_second: u8,
    ) -> Result<(), Error<E>> {
        let reg = self.shadows.als.with_rate(AlsRate::from_per_second(per_second));
        self.write_register(Register::AlsConfig, reg.bits())
    }

    /// Raw IRED configuration byte.
    pub fn set_ired_config(&mut self, value: u8) -> Result<(), Error<E>> {
        if value != 0 {
            #[cfg(feature = "defmt")]
            defmt::warn!(
                "Non-default IRED config {=u8:#x} may stall measurements",
                value
            );
        }
        self.write_register(Register::IredConfig, value)
    }

    /// Burst-read the result registers into the cached measurements.
    pub fn update_data(&mut self) -> Result<(), Error<E>> {
        let mut buffer = [0u8; MEASUREMENT_LEN_BLUE];
        let len = self.measurement_len();
        self.read_burst(Register::ProximityHigh, &mut buffer[..len])?;
        self.data.update(&buffer[..len]);
        Ok(())
    }

    /// Trigger one conversion and read the proximity result.
    pub fn raw_proximity_on_demand(&mut self) -> Result<OnDemand, Error<E>> {
        self.read_on_demand(Channel::Proximity)
    }

    /// Trigger one conversion and read the ALS result.
    pub fn raw_ambient_light_on_demand(
        &mut self,
    ) -> Result<OnDemand, Error<E>> {
        self.read_on_demand(Channel::AmbientLight)
    }

    fn read_on_demand(
        &mut self,
        channel: Channel,
    ) -> Result<OnDemand, Error<E>> {
        let mut first_error = None;
        let status = self.wait_for_conversion(&mut first_error)?;
        self.check_conversion::<E>(status)?;

        let mut buffer = [0u8; 2];
        let read = self.read_burst(channel.data_high(), &mut buffer);
        if let Some(e) = first_error {
            return Err(e);
        }
        read?;
        Ok(OnDemand { value: BigEndian::read_u16(&buffer), status })
    }

    /// Request an on-demand conversion, then poll the done flag until it is
    /// set or the deadline passes. No delay between polls.
    ///
    /// With [`ErrorPolicy::BestEffort`] a failed trigger or poll is stored in
    /// `first_error` and polling continues.
    fn wait_for_conversion(
        &mut self,
        first_error: &mut Option<Error<E>>,
    ) -> Result<ConversionStatus, Error<E>> {
        if let Err(e) =
            self.write_register(Register::Command, Command::ON_DEMAND.bits())
        {
            self.absorb(Register::Command, e, first_error)?;
        }
        let deadline = Deadline::start(&mut self.clock, ON_DEMAND_TIMEOUT_MS);

        loop {
            let mut status = [0u8];
            match self.read_burst(Register::Command, &mut status) {
                Ok(()) if Command::from_bits_retain(status[0]).data_ready() => {
                    return Ok(ConversionStatus::Ready);
                }
                Ok(()) => {}
                Err(e) => self.absorb(Register::Command, e, first_error)?,
            }
            if deadline.expired(&mut self.clock) {
                #[cfg(feature = "defmt")]
                defmt::warn!("On-demand conversion did not finish in time");
                return Ok(ConversionStatus::TimedOut);
            }
        }
    }
}
