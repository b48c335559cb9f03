use bitflags::bitflags;

/// 7-bit bus address of the PALS2, fixed by the chip.
pub const I2C_ADDRESS: u8 = 0x13;

/// Bytes fetched by a periodic update: proximity and ALS, high byte first.
pub const MEASUREMENT_LEN: usize = 4;
/// Bytes fetched by a periodic update once the blue photodiode is enabled.
pub const MEASUREMENT_LEN_BLUE: usize = 10;

/// Upper bound on an on-demand conversion before the poll gives up.
pub const ON_DEMAND_TIMEOUT_MS: u64 = 1000;

///
/// Device registers
///
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Register {
    /// Command register, also carries the conversion-done flag
    Command = 0x80,
    /// Proximity rate and offset compensation
    ProximityConfig = 0x82,
    /// IRED (proximity emitter) configuration
    IredConfig = 0x83,
    /// ALS rate and ADC gain
    AlsConfig = 0x84,
    /// Blue photodiode (color) compensation
    AlsCompensation = 0x85,
    ProximityHigh = 0x86,
    ProximityLow = 0x87,
    AlsHigh = 0x88,
    AlsLow = 0x89,
    Blue1High = 0x8C,
    Blue1Low = 0x8D,
    Blue2High = 0x8E,
    Blue2Low = 0x8F,
    /// Interrupt enables and persistence
    InterruptConfig = 0x90,
    ProximityBottomHigh = 0x92,
    ProximityBottomLow = 0x93,
    ProximityTopHigh = 0x94,
    ProximityTopLow = 0x95,
    AlsBottomHigh = 0x96,
    AlsBottomLow = 0x97,
    AlsTopHigh = 0x98,
    AlsTopLow = 0x99,
}

impl Register {
    pub const fn addr(self) -> u8 {
        self as u8
    }
}

/// Configuration enums
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ProximityRate {
    #[default]
    Hz2,
    Hz4,
    Hz8,
    Hz16,
    Hz32,
    Hz64,
    Hz128,
    Hz256,
}

impl ProximityRate {
    /// Map a measurements-per-second request onto the device code.
    ///
    /// The request is clamped to 256 and truncated to the power of two at or
    /// below it, so 100/s selects [`ProximityRate::Hz64`]. Requests below 2
    /// select the slowest rate.
    pub const fn from_per_second(per_second: u16) -> Self {
        let rate = if per_second > 256 {
            256
        } else if per_second == 0 {
            1
        } else {
            per_second
        };
        let log2 = (u16::BITS - 1 - rate.leading_zeros()) as u8;
        Self::from_code(log2.saturating_sub(1))
    }

    pub const fn from_code(code: u8) -> Self {
        match code & 0b111 {
            0b000 => Self::Hz2,
            0b001 => Self::Hz4,
            0b010 => Self::Hz8,
            0b011 => Self::Hz16,
            0b100 => Self::Hz32,
            0b101 => Self::Hz64,
            0b110 => Self::Hz128,
            _ => Self::Hz256,
        }
    }

    pub const fn code(self) -> u8 {
        self as u8
    }
}

impl From<u16> for ProximityRate {
    fn from(per_second: u16) -> Self {
        Self::from_per_second(per_second)
    }
}

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AlsRate {
    #[default]
    Hz1,
    Hz2,
    Hz3,
    Hz4,
    Hz5,
    Hz6,
    Hz7,
    Hz8,
}

impl AlsRate {
    /// Clamp to 1..=8 measurements per second; the code is `rate - 1`.
    pub const fn from_per_second(per_second: u8) -> Self {
        let rate = if per_second > 8 {
            8
        } else if per_second == 0 {
            1
        } else {
            per_second
        };
        Self::from_code(rate - 1)
    }

    pub const fn from_code(code: u8) -> Self {
        match code & 0b111 {
            0 => Self::Hz1,
            1 => Self::Hz2,
            2 => Self::Hz3,
            3 => Self::Hz4,
            4 => Self::Hz5,
            5 => Self::Hz6,
            6 => Self::Hz7,
            _ => Self::Hz8,
        }
    }

    pub const fn code(self) -> u8 {
        self as u8
    }
}

impl From<u8> for AlsRate {
    fn from(per_second: u8) -> Self {
        Self::from_per_second(per_second)
    }
}

/// ALS ADC gain, named by its full-scale photocurrent step.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AdcGain {
    #[default]
    Fa200,
    Fa800,
    Fa3200,
    Fa25600,
}

impl AdcGain {
    /// Exact lookup; any value outside {200, 800, 3200, 25600} falls back to
    /// the 200 fA default.
    pub const fn from_femtoamps(femtoamps: u16) -> Self {
        match femtoamps {
            800 => Self::Fa800,
            3200 => Self::Fa3200,
            25600 => Self::Fa25600,
            _ => Self::Fa200,
        }
    }

    pub const fn from_code(code: u8) -> Self {
        match code & 0b11 {
            0b00 => Self::Fa200,
            0b01 => Self::Fa800,
            0b10 => Self::Fa3200,
            _ => Self::Fa25600,
        }
    }

    pub const fn code(self) -> u8 {
        self as u8
    }

    /// Scale factor paired with this gain.
    pub const fn factor(self) -> f32 {
        match self {
            Self::Fa200 => 81.79,
            Self::Fa800 => 22.17,
            Self::Fa3200 => 6.02,
            Self::Fa25600 => 0.75,
        }
    }
}

impl From<u16> for AdcGain {
    fn from(femtoamps: u16) -> Self {
        Self::from_femtoamps(femtoamps)
    }
}

/// Consecutive out-of-window measurements needed to raise an interrupt.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Persistence {
    #[default]
    Count1,
    Count2,
    Count4,
    Count8,
    Count16,
    Count32,
    Count64,
    Count128,
}

impl Persistence {
    /// Clamp to 128 and keep the highest set bit; 0 behaves like 1.
    pub const fn from_count(count: u8) -> Self {
        let counts = if count > 128 { 128 } else { count };
        if counts == 0 {
            return Self::Count1;
        }
        Self::from_code((u8::BITS - 1 - counts.leading_zeros()) as u8)
    }

    pub const fn from_code(code: u8) -> Self {
        match code & 0b111 {
            0 => Self::Count1,
            1 => Self::Count2,
            2 => Self::Count4,
            3 => Self::Count8,
            4 => Self::Count16,
            5 => Self::Count32,
            6 => Self::Count64,
            _ => Self::Count128,
        }
    }

    pub const fn code(self) -> u8 {
        self as u8
    }
}

impl From<u8> for Persistence {
    fn from(count: u8) -> Self {
        Self::from_count(count)
    }
}

/// Blue photodiode measurement period.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ColorCompPeriod {
    /// 0 - 10 ms
    #[default]
    Short,
    /// 1 - 100 ms
    Long,
}

/// Window for a proximity or ALS interrupt.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Thresholds {
    pub top: u16,
    pub bottom: u16,
}

impl Thresholds {
    pub const fn new(top: u16, bottom: u16) -> Self {
        Self { top, bottom }
    }

    /// Threshold bytes in write order: bottom high, bottom low, top high,
    /// top low.
    pub const fn bytes(&self) -> [u8; 4] {
        let bottom = self.bottom.to_be_bytes();
        let top = self.top.to_be_bytes();
        [bottom[0], bottom[1], top[0], top[1]]
    }
}

bitflags! {
    /// COMMAND
    #[derive(Debug, Copy, Clone, PartialEq, Eq)]
    pub struct Command: u8 {
        const DATA_RDY   = 0b0100_0000;
        const ALS_OD     = 0b0001_0000;
        const PROX_OD    = 0b0000_1000;
        const ALS_EN     = 0b0000_0100;
        const PROX_EN    = 0b0000_0010;
        const STANDBY_EN = 0b0000_0001;
    }
}

impl Command {
    /// Self-timed proximity and ALS measurements.
    pub const PERIODIC: Self = Self::STANDBY_EN.union(Self::PROX_EN).union(Self::ALS_EN);
    /// One proximity and one ALS conversion, standby in between.
    pub const ON_DEMAND: Self = Self::STANDBY_EN.union(Self::PROX_OD).union(Self::ALS_OD);

    pub const fn data_ready(&self) -> bool {
        self.contains(Self::DATA_RDY)
    }
}

bitflags! {
    /// PROXIMITY_CONFIG
    #[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
    pub struct ProximityConfig: u8 {
        const OFFSET_COMP = 0b0000_1000;
        const RATE2       = 0b0000_0100;
        const RATE1       = 0b0000_0010;
        const RATE0       = 0b0000_0001;

        const RATE = Self::RATE2.bits() | Self::RATE1.bits() | Self::RATE0.bits();
    }
}

impl ProximityConfig {
    pub const fn rate(&self) -> ProximityRate {
        ProximityRate::from_code(self.intersection(Self::RATE).bits())
    }

    pub const fn with_rate(self, rate: ProximityRate) -> Self {
        self.difference(Self::RATE).union(Self::from_bits_retain(rate.code()))
    }

    pub const fn offset_compensation(&self) -> bool {
        self.contains(Self::OFFSET_COMP)
    }

    pub const fn with_offset_compensation(self, en: bool) -> Self {
        let reg = self.difference(Self::OFFSET_COMP);
        match en {
            false => reg,
            true => reg.union(Self::OFFSET_COMP),
        }
    }
}

bitflags! {
    /// IRED_CONFIG
    ///
    /// Only the all-zero default is known to keep measurements running, so
    /// no fields are modelled.
    #[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
    pub struct IredConfig: u8 {
        const _ = !0;
    }
}

bitflags! {
    /// ALS_CONFIG
    #[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
    pub struct AlsConfig: u8 {
        const GAIN1 = 0b0001_0000;
        const GAIN0 = 0b0000_1000;
        const RATE2 = 0b0000_0100;
        const RATE1 = 0b0000_0010;
        const RATE0 = 0b0000_0001;

        const GAIN = Self::GAIN1.bits() | Self::GAIN0.bits();
        const RATE = Self::RATE2.bits() | Self::RATE1.bits() | Self::RATE0.bits();
    }
}

impl AlsConfig {
    pub const fn rate(&self) -> AlsRate {
        AlsRate::from_code(self.intersection(Self::RATE).bits())
    }

    pub const fn with_rate(self, rate: AlsRate) -> Self {
        self.difference(Self::RATE).union(Self::from_bits_retain(rate.code()))
    }

    pub const fn gain(&self) -> AdcGain {
        AdcGain::from_code(self.intersection(Self::GAIN).bits() >> 3)
    }

    pub const fn with_gain(self, gain: AdcGain) -> Self {
        self.difference(Self::GAIN)
            .union(Self::from_bits_retain(gain.code() << 3))
    }
}

bitflags! {
    /// ALS_COMPENSATION
    #[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
    pub struct AlsCompensation: u8 {
        const BLUE_PERIOD = 0b0000_0010;
        const BLUE_EN     = 0b0000_0001;
    }
}

impl AlsCompensation {
    pub const fn enabled(period: ColorCompPeriod) -> Self {
        match period {
            ColorCompPeriod::Short => Self::BLUE_EN,
            ColorCompPeriod::Long => Self::BLUE_EN.union(Self::BLUE_PERIOD),
        }
    }

    pub const fn blue_enabled(&self) -> bool {
        self.contains(Self::BLUE_EN)
    }
}

bitflags! {
    /// INTERRUPT_CONFIG
    #[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
    pub struct InterruptConfig: u8 {
        const PERSIST2     = 0b1000_0000;
        const PERSIST1     = 0b0100_0000;
        const PERSIST0     = 0b0010_0000;
        const PROX_TOP_EN  = 0b0001_0000;
        const PROX_BOT_EN  = 0b0000_1000;
        const ALS_TOP_EN   = 0b0000_0100;
        const ALS_BOT_EN   = 0b0000_0010;

        const PERSIST = Self::PERSIST2.bits() | Self::PERSIST1.bits() | Self::PERSIST0.bits();
        const PROX_INT = Self::PROX_TOP_EN.bits() | Self::PROX_BOT_EN.bits();
        const ALS_INT = Self::ALS_TOP_EN.bits() | Self::ALS_BOT_EN.bits();
    }
}

impl InterruptConfig {
    pub const fn persistence(&self) -> Persistence {
        Persistence::from_code(self.intersection(Self::PERSIST).bits() >> 5)
    }

    pub const fn with_persistence(self, persistence: Persistence) -> Self {
        self.difference(Self::PERSIST)
            .union(Self::from_bits_retain(persistence.code() << 5))
    }

    pub const fn proximity_interrupt(&self) -> bool {
        self.contains(Self::PROX_INT)
    }

    pub const fn with_proximity_interrupt(self, en: bool) -> Self {
        let reg = self.difference(Self::PROX_INT);
        match en {
            false => reg,
            true => reg.union(Self::PROX_INT),
        }
    }

    pub const fn als_interrupt(&self) -> bool {
        self.contains(Self::ALS_INT)
    }

    pub const fn with_als_interrupt(self, en: bool) -> Self {
        let reg = self.difference(Self::ALS_INT);
        match en {
            false => reg,
            true => reg.union(Self::ALS_INT),
        }
    }
}

/// Which interrupt window a threshold write targets.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Channel {
    Proximity,
    AmbientLight,
}

impl Channel {
    pub(crate) const fn data_high(self) -> Register {
        match self {
            Self::Proximity => Register::ProximityHigh,
            Self::AmbientLight => Register::AlsHigh,
        }
    }

    /// Threshold registers in write order, matching [`Thresholds::bytes`].
    pub(crate) const fn threshold_registers(self) -> [Register; 4] {
        match self {
            Self::Proximity => [
                Register::ProximityBottomHigh,
                Register::ProximityBottomLow,
                Register::ProximityTopHigh,
                Register::ProximityTopLow,
            ],
            Self::AmbientLight => [
                Register::AlsBottomHigh,
                Register::AlsBottomLow,
                Register::AlsTopHigh,
                Register::AlsTopLow,
            ],
        }
    }
}
