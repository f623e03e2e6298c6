use core::cell::RefCell;

use bb_core::utils::controllers::{
    i2c::{init_pwm, Icm42670Tilt, Pca9685Motor},
    Actuator, IdleMode,
};
use embedded_hal_bus::i2c::RefCellDevice;
use embedded_hal_mock::eh1::i2c::{Mock as I2cMock, Transaction as I2cTrans};
use pwm_pca9685::{Address as PwmAddress, Channel, Pca9685};

/// Default I2C address for the PWM motor controller.
pub const PWM_ADDRESS: u8 = 0x55;
/// Default I2C address for the IMU sensor.
pub const IMU_ADDRESS: u8 = 0x68;

/// Create a write transaction for the given I2C address and data payload.
pub fn write(
    addr: u8,
    data: Vec<u8>,
) -> I2cTrans {
    I2cTrans::write(addr, data)
}
/// Create a write_read transaction for the given I2C address/payloads.
pub fn write_read(
    addr: u8,
    write: Vec<u8>,
    read: Vec<u8>,
) -> I2cTrans {
    I2cTrans::write_read(addr, write, read)
}

/// Auto-increment enable, written before the first channel update.
fn auto_increment() -> I2cTrans {
    write(PWM_ADDRESS, vec![0x00, 0x31])
}

/// Channel register write: `[LEDn_ON_L, on_l, on_h, off_l, off_h]`.
fn channel(
    reg: u8,
    off: u16,
) -> I2cTrans {
    write(
        PWM_ADDRESS,
        vec![reg, 0x00, 0x00, (off & 0xFF) as u8, (off >> 8) as u8],
    )
}

#[test]
fn test_tilt_sensor_init() {
    let expectations = [
        write_read(IMU_ADDRESS, vec![0x75], vec![0x67]),
        write_read(IMU_ADDRESS, vec![0x21], vec![0x00]),
        write(IMU_ADDRESS, vec![0x21, 0x00]),
        write_read(IMU_ADDRESS, vec![0x20], vec![0x00]),
        write(IMU_ADDRESS, vec![0x20, 0x00]),
        write_read(IMU_ADDRESS, vec![0x1F], vec![0x0F]),
        write(IMU_ADDRESS, vec![0x1F, 0x0F]),
    ];

    let mock = I2cMock::new(&expectations);
    let i2c_bus = RefCell::new(mock);
    let tilt = Icm42670Tilt::new(&i2c_bus);
    assert!(tilt.is_ok());
    drop(tilt);
    i2c_bus.borrow_mut().done();
}

#[test]
fn test_init_pwm() {
    // Enable, then set prescale (includes sleep handling)
    let expectations = [
        write(PWM_ADDRESS, vec![0x00, 0x01]),
        write(PWM_ADDRESS, vec![0x00, 0x11]),
        write(PWM_ADDRESS, vec![0xFE, 100]),
        write(PWM_ADDRESS, vec![0x00, 0x01]),
    ];

    let mock = I2cMock::new(&expectations);
    let i2c_bus = RefCell::new(mock);
    let pwm = init_pwm(&i2c_bus, PWM_ADDRESS, 100).unwrap();
    drop(pwm);
    i2c_bus.borrow_mut().done();
}

#[test]
fn test_motor_zero_brakes_both_inputs() {
    let expectations = [auto_increment(), channel(0x1E, 4095), channel(0x22, 4095)];

    let mock = I2cMock::new(&expectations);
    let i2c_bus = RefCell::new(mock);
    let pwm = RefCell::new(
        Pca9685::new(RefCellDevice::new(&i2c_bus), PwmAddress::from(PWM_ADDRESS)).unwrap(),
    );
    let mut motor = Pca9685Motor::new(&pwm, Channel::C6, Channel::C7);
    motor.set(0.0).unwrap();
    drop(motor);
    i2c_bus.borrow_mut().done();
}

#[test]
fn test_motor_direction_selects_input() {
    let expectations = [
        auto_increment(),
        channel(0x06, 2047),
        channel(0x0A, 0),
        channel(0x06, 0),
        channel(0x0A, 2047),
    ];

    let mock = I2cMock::new(&expectations);
    let i2c_bus = RefCell::new(mock);
    let pwm = RefCell::new(
        Pca9685::new(RefCellDevice::new(&i2c_bus), PwmAddress::from(PWM_ADDRESS)).unwrap(),
    );
    let mut motor = Pca9685Motor::new(&pwm, Channel::C0, Channel::C1);
    motor.set(0.5).unwrap();
    assert_eq!(motor.get(), 0.5);
    motor.set(-0.5).unwrap();
    assert_eq!(motor.get(), -0.5);
    drop(motor);
    i2c_bus.borrow_mut().done();
}

#[test]
fn test_motor_output_is_limited() {
    let expectations = [auto_increment(), channel(0x06, 4095), channel(0x0A, 0)];

    let mock = I2cMock::new(&expectations);
    let i2c_bus = RefCell::new(mock);
    let pwm = RefCell::new(
        Pca9685::new(RefCellDevice::new(&i2c_bus), PwmAddress::from(PWM_ADDRESS)).unwrap(),
    );
    let mut motor = Pca9685Motor::new(&pwm, Channel::C0, Channel::C1);
    motor.set(3.0).unwrap();
    assert_eq!(motor.get(), 1.0);
    drop(motor);
    i2c_bus.borrow_mut().done();
}

#[test]
fn test_coast_while_stopped_releases_bridge() {
    let expectations = [auto_increment(), channel(0x06, 0), channel(0x0A, 0)];

    let mock = I2cMock::new(&expectations);
    let i2c_bus = RefCell::new(mock);
    let pwm = RefCell::new(
        Pca9685::new(RefCellDevice::new(&i2c_bus), PwmAddress::from(PWM_ADDRESS)).unwrap(),
    );
    let mut motor = Pca9685Motor::new(&pwm, Channel::C0, Channel::C1);
    // Already braking: no bus traffic.
    motor.set_idle_mode(IdleMode::Brake).unwrap();
    motor.set_idle_mode(IdleMode::Coast).unwrap();
    assert_eq!(motor.idle_mode(), IdleMode::Coast);
    drop(motor);
    i2c_bus.borrow_mut().done();
}
