mod common;

use common::*;
use embedded_hal::i2c::ErrorKind;
use embedded_hal_mock::eh1::i2c::{Mock as I2cMock, Transaction as I2cTransaction};
use pals2::{
    AdcGain, ColorCompPeriod, ConversionStatus, Error, ErrorPolicy,
    Measurements, Pals2, Register,
};

fn finish(sensor: Pals2<I2cMock, StepClock>) {
    let (mut i2c, _) = sensor.destroy();
    i2c.done();
}

#[futures_test::test]
async fn begin_async_writes_reset_then_periodic() {
    let mut sensor = Pals2::new(I2cMock::new(&begin_sequence()), StepClock::new(1));

    sensor.begin_async().await.unwrap();

    assert_eq!(sensor.gain(), AdcGain::Fa200);
    finish(sensor);
}

#[futures_test::test]
async fn configuration_async_updates_shadows() {
    let expectations = [
        write(Register::ProximityConfig, 0x06),
        write(Register::ProximityConfig, 0x0E),
        write(Register::AlsConfig, 0x18),
        write(Register::AlsConfig, 0x19),
        write(Register::InterruptConfig, 0x60),
        write(Register::IredConfig, 0x00),
    ];
    let mut sensor = Pals2::new(I2cMock::new(&expectations), StepClock::new(1));

    sensor.set_proximity_rate_async(128).await.unwrap();
    sensor.enable_proximity_offset_compensation_async().await.unwrap();
    sensor.set_adc_gain_async(25600).await.unwrap();
    sensor.set_ambient_light_rate_async(2).await.unwrap();
    sensor.set_interrupt_persistence_async(8).await.unwrap();
    sensor.set_ired_config_async(0).await.unwrap();

    assert_eq!(sensor.gain_factor(), 0.75);
    assert!(sensor.proximity_config().offset_compensation());
    finish(sensor);
}

#[futures_test::test]
async fn interrupts_async_write_thresholds_in_order() {
    let expectations = [
        write(Register::InterruptConfig, 0b0000_0110),
        write(Register::AlsBottomHigh, 0x01),
        write(Register::AlsBottomLow, 0x02),
        write(Register::AlsTopHigh, 0xFF),
        write(Register::AlsTopLow, 0xFE),
        write(Register::InterruptConfig, 0b0001_1110),
        write(Register::ProximityBottomHigh, 0x00),
        write(Register::ProximityBottomLow, 0x00),
        write(Register::ProximityTopHigh, 0x10),
        write(Register::ProximityTopLow, 0x00),
        write(Register::InterruptConfig, 0b0001_1000),
        write(Register::InterruptConfig, 0b0000_0000),
    ];
    let mut sensor = Pals2::new(I2cMock::new(&expectations), StepClock::new(1));

    sensor
        .enable_ambient_light_interrupt_async(0xFFFE, 0x0102)
        .await
        .unwrap();
    sensor.enable_proximity_interrupt_async(0x1000, 0).await.unwrap();
    sensor.disable_ambient_light_interrupt_async().await.unwrap();
    sensor.disable_proximity_interrupt_async().await.unwrap();
    finish(sensor);
}

#[futures_test::test]
async fn update_data_async_reads_blue_channels() {
    let expectations = [
        write(Register::AlsCompensation, 0x01),
        burst(
            Register::ProximityHigh,
            &[0x01, 0x00, 0x00, 0x64, 0x00, 0x00, 0x00, 0x08, 0x00, 0x02],
        ),
    ];
    let mut sensor = Pals2::new(I2cMock::new(&expectations), StepClock::new(1));

    sensor
        .enable_color_compensation_async(ColorCompPeriod::Short)
        .await
        .unwrap();
    sensor.update_data_async().await.unwrap();

    assert_eq!(sensor.raw_proximity(), 256);
    assert_eq!(sensor.illuminance(), 1.0);
    assert_eq!(sensor.blue_ratio(), Some(0.75));
    finish(sensor);
}

#[futures_test::test]
async fn on_demand_async_polls_until_ready() {
    let expectations = [
        write(Register::Command, 0x19),
        poll(0x19),
        poll(0x59),
        burst(Register::AlsHigh, &[0x00, 0x7B]),
    ];
    let mut sensor = Pals2::new(I2cMock::new(&expectations), StepClock::new(1));

    let reading = sensor.raw_ambient_light_on_demand_async().await.unwrap();

    assert_eq!(reading.value, 123);
    assert_eq!(reading.status, ConversionStatus::Ready);
    finish(sensor);
}

#[futures_test::test]
async fn on_demand_async_times_out_after_deadline() {
    let mut expectations = vec![write(Register::Command, 0x19)];
    expectations.extend((0..POLLS_UNTIL_TIMEOUT).map(|_| poll(0x00)));
    expectations.push(burst(Register::ProximityHigh, &[0x00, 0x00]));
    let mut sensor =
        Pals2::new(I2cMock::new(&expectations), StepClock::new(TIMEOUT_STEP_MS));

    let reading = sensor.raw_proximity_on_demand_async().await.unwrap();
    assert_eq!(reading.status, ConversionStatus::TimedOut);

    let (mut i2c, clock) = sensor.destroy();
    // One read to start the deadline, one after every poll.
    assert_eq!(clock.reads(), POLLS_UNTIL_TIMEOUT as u64 + 1);
    i2c.done();
}

#[futures_test::test]
async fn strict_reset_async_stops_at_first_failure() {
    let expectations = [
        write(Register::ProximityConfig, 0x00),
        write(Register::IredConfig, 0x00),
        write(Register::AlsConfig, 0x00).with_error(ErrorKind::Other),
    ];
    let mut sensor = Pals2::with_policy(
        I2cMock::new(&expectations),
        StepClock::new(1),
        ErrorPolicy::Strict,
    );

    let result = sensor.reset_async().await;

    assert_eq!(result, Err(Error::I2c(ErrorKind::Other)));
    finish(sensor);
}

#[futures_test::test]
async fn best_effort_reset_async_reports_first_failure() {
    let expectations: Vec<I2cTransaction> = vec![
        write(Register::ProximityConfig, 0x00).with_error(ErrorKind::Bus),
        write(Register::IredConfig, 0x00),
        write(Register::AlsConfig, 0x00).with_error(ErrorKind::Other),
        write(Register::AlsCompensation, 0x00),
        write(Register::InterruptConfig, 0x00),
    ];
    let mut sensor = Pals2::new(I2cMock::new(&expectations), StepClock::new(1));

    let result = sensor.reset_async().await;

    assert_eq!(result, Err(Error::I2c(ErrorKind::Bus)));
    finish(sensor);
}

#[futures_test::test]
async fn best_effort_on_demand_async_keeps_polling_after_failed_poll() {
    let expectations = [
        write(Register::Command, 0x19),
        poll(0x00).with_error(ErrorKind::Other),
        poll(0x40),
        burst(Register::ProximityHigh, &[0x00, 0x2A]),
    ];
    let mut sensor = Pals2::new(I2cMock::new(&expectations), StepClock::new(1));

    let result = sensor.raw_proximity_on_demand_async().await;

    assert_eq!(result, Err(Error::I2c(ErrorKind::Other)));
    finish(sensor);
}

#[futures_test::test]
async fn strict_on_demand_async_stops_at_failed_trigger() {
    let expectations =
        [write(Register::Command, 0x19).with_error(ErrorKind::Other)];
    let mut sensor = Pals2::with_policy(
        I2cMock::new(&expectations),
        StepClock::new(1),
        ErrorPolicy::Strict,
    );

    let result = sensor.raw_ambient_light_on_demand_async().await;

    assert_eq!(result, Err(Error::I2c(ErrorKind::Other)));
    finish(sensor);
}

#[futures_test::test]
async fn failed_update_async_keeps_previous_measurements() {
    let expectations = [
        burst(Register::ProximityHigh, &[0x00, 0x05, 0x00, 0x06]),
        burst(Register::ProximityHigh, &[0x00, 0x00, 0x00, 0x00])
            .with_error(ErrorKind::Other),
    ];
    let mut sensor = Pals2::new(I2cMock::new(&expectations), StepClock::new(1));

    sensor.update_data_async().await.unwrap();
    let result = sensor.update_data_async().await;

    assert_eq!(result, Err(Error::I2c(ErrorKind::Other)));
    assert_eq!(
        sensor.measurements(),
        Measurements { proximity: 5, ambient_light: 6, blue1: 0, blue2: 0 }
    );
    finish(sensor);
}
