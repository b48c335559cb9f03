//! Async twins of the bus operations, over `embedded-hal-async`.
//!
//! Semantics match the blocking methods of the same name without the
//! `_async` suffix.

use byteorder::{BigEndian, ByteOrder};
use embedded_hal_async::i2c::I2c as AsyncI2c;

use crate::clock::{Clock, ConversionStatus, Deadline};
use crate::errors::Error;
use crate::registers::*;
use crate::{OnDemand, Pals2, Pals2Config, BEGIN_SEQUENCE, RESET_SEQUENCE};

impl<I2C, C, E> Pals2<I2C, C>
where
    I2C: AsyncI2c<Error = E>,
    C: Clock,
{
    pub async fn write_register_async(
        &mut self,
        register: Register,
        value: u8,
    ) -> Result<(), Error<E>> {
        #[cfg(feature = "defmt")]
        defmt::debug!("{:?} <- {=u8:#x}", register, value);
        self.i2c
            .write(I2C_ADDRESS, &[register.addr(), value])
            .await?;
        self.shadows.commit(register, value);
        Ok(())
    }

    pub async fn read_burst_async(
        &mut self,
        start: Register,
        buffer: &mut [u8],
    ) -> Result<(), Error<E>> {
        #[cfg(feature = "defmt")]
        defmt::debug!("{:?} -> {=usize} bytes", start, buffer.len());
        self.i2c
            .write_read(I2C_ADDRESS, &[start.addr()], buffer)
            .await?;
        Ok(())
    }

    async fn write_sequence_async(
        &mut self,
        writes: &[(Register, u8)],
    ) -> Result<(), Error<E>> {
        let mut first_error = None;
        for &(register, value) in writes {
            if let Err(e) = self.write_register_async(register, value).await {
                self.absorb(register, e, &mut first_error)?;
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    pub async fn begin_async(&mut self) -> Result<(), Error<E>> {
        self.write_sequence_async(&BEGIN_SEQUENCE).await
    }

    pub async fn reset_async(&mut self) -> Result<(), Error<E>> {
        self.write_sequence_async(&RESET_SEQUENCE).await
    }

    pub async fn enable_periodic_measurements_async(
        &mut self,
    ) -> Result<(), Error<E>> {
        self.write_register_async(Register::Command, Command::PERIODIC.bits())
            .await
    }

    pub async fn apply_config_async(
        &mut self,
        config: &Pals2Config,
    ) -> Result<(), Error<E>> {
        self.policy = config.policy;
        let writes = self.config_writes(config);
        self.write_sequence_async(&writes).await
    }

    pub async fn enable_proximity_offset_compensation_async(
        &mut self,
    ) -> Result<(), Error<E>> {
        let reg = self.shadows.proximity.with_offset_compensation(true);
        self.write_register_async(Register::ProximityConfig, reg.bits()).await
    }

    pub async fn disable_proximity_offset_compensation_async(
        &mut self,
    ) -> Result<(), Error<E>> {
        let reg = self.shadows.proximity.with_offset_compensation(false);
        self.write_register_async(Register::ProximityConfig, reg.bits()).await
    }

    pub async fn set_proximity_rate_async(
        &mut self,
        per_second: u16,
    ) -> Result<(), Error<E>> {
        let reg = self
            .shadows
            .proximity
            .with_rate(ProximityRate::from_per_second(per_second));
        self.write_register_async(Register::ProximityConfig, reg.bits()).await
    }

    pub async fn set_interrupt_persistence_async(
        &mut self,
        count: u8,
    ) -> Result<(), Error<E>> {
        let reg = self
            .shadows
            .interrupt
            .with_persistence(Persistence::from_count(count));
        self.write_register_async(Register::InterruptConfig, reg.bits()).await
    }

    pub async fn enable_proximity_interrupt_async(
        &mut self,
        top: u16,
        bottom: u16,
    ) -> Result<(), Error<E>> {
        let writes =
            self.interrupt_writes(Channel::Proximity, Thresholds::new(top, bottom));
        self.write_sequence_async(&writes).await
    }

    pub async fn disable_proximity_interrupt_async(
        &mut self,
    ) -> Result<(), Error<E>> {
        let reg = self.shadows.interrupt.with_proximity_interrupt(false);
        self.write_register_async(Register::InterruptConfig, reg.bits()).await
    }

    pub async fn enable_ambient_light_interrupt_async(
        &mut self,
        top: u16,
        bottom: u16,
    ) -> Result<(), Error<E>> {
        let writes = self
            .interrupt_writes(Channel::AmbientLight, Thresholds::new(top, bottom));
        self.write_sequence_async(&writes).await
    }

    pub async fn disable_ambient_light_interrupt_async(
        &mut self,
    ) -> Result<(), Error<E>> {
        let reg = self.shadows.interrupt.with_als_interrupt(false);
        self.write_register_async(Register::InterruptConfig, reg.bits()).await
    }

    pub async fn enable_color_compensation_async(
        &mut self,
        period: ColorCompPeriod,
    ) -> Result<(), Error<E>> {
        self.write_register_async(
            Register::AlsCompensation,
            AlsCompensation::enabled(period).bits(),
        )
        .await
    }

    pub async fn set_adc_gain_async(
        &mut self,
        femtoamps: u16,
    ) -> Result<(), Error<E>> {
        let reg = self.shadows.als.with_gain(AdcGain::from_femtoamps(femtoamps));
        self.write_register_async(Register::AlsConfig, reg.bits()).await
    }

    pub async fn set_ambient_light_rate_async(
        &mut self,
        per_second: u8,
    ) -> Result<(), Error<E>> {
        let reg = self.shadows.als.with_rate(AlsRate::from_per_second(per_second));
        self.write_register_async(Register::AlsConfig, reg.bits()).await
    }

    pub async fn set_ired_config_async(
        &mut self,
        value: u8,
    ) -> Result<(), Error<E>> {
        if value != 0 {
            #[cfg(feature = "defmt")]
            defmt::warn!(
                "Non-default IRED config {=u8:#x} may stall measurements",
                value
            );
        }
        self.write_register_async(Register::IredConfig, value).await
    }

    pub async fn update_data_async(&mut self) -> Result<(), Error<E>> {
        let mut buffer = [0u8; MEASUREMENT_LEN_BLUE];
        let len = self.measurement_len();
        self.read_burst_async(Register::ProximityHigh, &mut buffer[..len])
            .await?;
        self.data.update(&buffer[..len]);
        Ok(())
    }

    pub async fn raw_proximity_on_demand_async(
        &mut self,
    ) -> Result<OnDemand, Error<E>> {
        self.read_on_demand_async(Channel::Proximity).await
    }

    pub async fn raw_ambient_light_on_demand_async(
        &mut self,
    ) -> Result<OnDemand, Error<E>> {
        self.read_on_demand_async(Channel::AmbientLight).await
    }

    async fn read_on_demand_async(
        &mut self,
        channel: Channel,
    ) -> Result<OnDemand, Error<E>> {
        let mut first_error = None;
        let status = self.wait_for_conversion_async(&mut first_error).await?;
        self.check_conversion::<E>(status)?;

        let mut buffer = [0u8; 2];
        let read = self.read_burst_async(channel.data_high(), &mut buffer).await;
        if let Some(e) = first_error {
            return Err(e);
        }
        read?;
        Ok(OnDemand { value: BigEndian::read_u16(&buffer), status })
    }

    async fn wait_for_conversion_async(
        &mut self,
        first_error: &mut Option<Error<E>>,
    ) -> Result<ConversionStatus, Error<E>> {
        if let Err(e) = self
            .write_register_async(Register::Command, Command::ON_DEMAND.bits())
            .await
        {
            self.absorb(Register::Command, e, first_error)?;
        }
        let deadline = Deadline::start(&mut self.clock, ON_DEMAND_TIMEOUT_MS);

        loop {
            let mut status = [0u8];
            match self.read_burst_async(Register::Command, &mut status).await {
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
