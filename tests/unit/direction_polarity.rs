//! DIR/ENABLE pin polarity through the arbiter, checked with
//! embedded-hal-mock transaction expectations.

use embedded_hal_mock::eh1::digital::{
    Mock as PinMock, State as PinState, Transaction as PinTransaction,
};

use rail_motion::backend::PioProgramCache;
use rail_motion::hal::mock::{MockClock, MockDma, MockPio, MockPwmSlice, MockStepPin};
use rail_motion::motor::MotorBuilder;

#[test]
fn dir_pin_follows_forward_and_invert() {
    // init drives forward (high), then the test toggles.
    let dir_expectations = [
        PinTransaction::set(PinState::High),
        PinTransaction::set(PinState::Low),
        PinTransaction::set(PinState::High),
    ];
    let mut dir = PinMock::new(&dir_expectations);

    let sm = MockPio::new(0, 0);
    let mut cache = PioProgramCache::new();
    let mut arbiter = MotorBuilder::<_, _, _, _, _, _>::new()
        .step_pin(MockStepPin::new())
        .dir_pin(dir.clone())
        .pwm_slice(MockPwmSlice::new(0))
        .state_machine(sm.clone())
        .dma_channel(MockDma::feeding(&sm, 1))
        .clock(MockClock::new())
        .sys_clock_hz(125_000_000)
        .build(&mut cache)
        .unwrap();

    arbiter.set_direction(false).unwrap();
    arbiter.set_direction(true).unwrap();

    dir.done();
}

#[test]
fn inverted_dir_pin_flips_levels() {
    let dir_expectations = [
        PinTransaction::set(PinState::Low), // init: forward, inverted
        PinTransaction::set(PinState::High), // reverse, inverted
    ];
    let mut dir = PinMock::new(&dir_expectations);

    let sm = MockPio::new(0, 0);
    let mut cache = PioProgramCache::new();
    let mut arbiter = MotorBuilder::<_, _, _, _, _, _>::new()
        .step_pin(MockStepPin::new())
        .dir_pin(dir.clone())
        .pwm_slice(MockPwmSlice::new(0))
        .state_machine(sm.clone())
        .dma_channel(MockDma::feeding(&sm, 1))
        .clock(MockClock::new())
        .sys_clock_hz(125_000_000)
        .dir_invert(true)
        .build(&mut cache)
        .unwrap();

    arbiter.set_direction(false).unwrap();

    dir.done();
}

#[test]
fn enable_pin_honors_active_low_polarity() {
    // enable_invert = true models an active-low ENABLE input:
    // init disables (high), enable() drives low, disable() back high.
    let en_expectations = [
        PinTransaction::set(PinState::High),
        PinTransaction::set(PinState::Low),
        PinTransaction::set(PinState::High),
    ];
    let mut en = PinMock::new(&en_expectations);

    let dir = PinMock::new(&[PinTransaction::set(PinState::High)]);

    let sm = MockPio::new(0, 0);
    let mut cache = PioProgramCache::new();
    let mut arbiter = MotorBuilder::<_, _, _, _, _, _, _>::new()
        .step_pin(MockStepPin::new())
        .dir_pin(dir.clone())
        .pwm_slice(MockPwmSlice::new(0))
        .state_machine(sm.clone())
        .dma_channel(MockDma::feeding(&sm, 1))
        .clock(MockClock::new())
        .sys_clock_hz(125_000_000)
        .enable_pin(en.clone())
        .enable_invert(true)
        .build(&mut cache)
        .unwrap();

    arbiter.enable().unwrap();
    arbiter.disable().unwrap();

    en.done();
    let mut dir = dir;
    dir.done();
}
