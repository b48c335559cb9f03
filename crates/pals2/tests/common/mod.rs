#![allow(dead_code)]

use embedded_hal_mock::eh1::i2c::Transaction as I2cTransaction;
use pals2::{Clock, Register, I2C_ADDRESS};

/// Clock that advances by a fixed step every time it is read.
pub struct StepClock {
    now: u64,
    step: u64,
}

impl StepClock {
    pub fn new(step: u64) -> Self {
        Self { now: 0, step }
    }

    pub fn reads(&self) -> u64 {
        self.now / self.step
    }
}

impl Clock for StepClock {
    fn now_ms(&mut self) -> u64 {
        let now = self.now;
        self.now += self.step;
        now
    }
}

/// With a 250 ms step the deadline passes on the fifth poll.
pub const TIMEOUT_STEP_MS: u64 = 250;
pub const POLLS_UNTIL_TIMEOUT: usize = 5;

pub fn write(register: Register, value: u8) -> I2cTransaction {
    I2cTransaction::write(I2C_ADDRESS, vec![register.addr(), value])
}

pub fn burst(start: Register, response: &[u8]) -> I2cTransaction {
    I2cTransaction::write_read(I2C_ADDRESS, vec![start.addr()], response.to_vec())
}

pub fn poll(status: u8) -> I2cTransaction {
    burst(Register::Command, &[status])
}

pub fn begin_sequence() -> Vec<I2cTransaction> {
    vec![
        write(Register::ProximityConfig, 0x00),
        write(Register::IredConfig, 0x00),
        write(Register::AlsConfig, 0x00),
        write(Register::AlsCompensation, 0x00),
        write(Register::InterruptConfig, 0x00),
        write(Register::Command, 0x07),
    ]
}
