#[derive(derive_more::From, Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error<I2cError> {
    /// Bus transaction failed (no acknowledge, arbitration loss, ...).
    I2c(I2cError),
    /// The conversion-done flag was not seen before the deadline.
    Timeout,
}

impl<E: core::fmt::Display> core::fmt::Display for Error<E> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Error::I2c(err) => {
                write!(f, "I2C communication error: {}", err)
            }
            Error::Timeout => {
                write!(f, "On-demand conversion timed out")
            }
        }
    }
}
