use crate::registers::{
    AdcGain, AlsRate, ColorCompPeriod, Persistence, ProximityRate, Thresholds,
};

/// How the driver reacts to bus failures and handshake timeouts.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ErrorPolicy {
    /// Multi-register sequences keep writing after a failed transaction and
    /// report the first failure at the end. An on-demand read that times out
    /// still reads the data registers and flags the value as
    /// [`ConversionStatus::TimedOut`](crate::ConversionStatus::TimedOut).
    #[default]
    BestEffort,
    /// The first failed transaction aborts the operation and an on-demand
    /// timeout is returned as [`Error::Timeout`](crate::Error::Timeout).
    Strict,
}

/// Whole-device configuration, applied with
/// [`Pals2::apply_config`](crate::Pals2::apply_config).
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Pals2Config {
    pub proximity_rate: ProximityRate,
    pub offset_compensation: bool,
    pub als_rate: AlsRate,
    pub gain: AdcGain,
    pub persistence: Persistence,
    /// `Some` enables the proximity interrupt with this window.
    pub proximity_interrupt: Option<Thresholds>,
    /// `Some` enables the ALS interrupt with this window.
    pub als_interrupt: Option<Thresholds>,
    /// `Some` enables the blue photodiode. The device has no way back, so
    /// `None` leaves the current setting alone.
    pub color_compensation: Option<ColorCompPeriod>,
    pub policy: ErrorPolicy,
}

impl Default for Pals2Config {
    fn default() -> Self {
        Self {
            proximity_rate: ProximityRate::Hz2,
            offset_compensation: false,
            als_rate: AlsRate::Hz1,
            gain: AdcGain::Fa200,
            persistence: Persistence::Count1,
            proximity_interrupt: None,
            als_interrupt: None,
            color_compensation: None,
            policy: ErrorPolicy::BestEffort,
        }
    }
}
