use bb_core::utils::controllers::{DifferentialDrive, DriveConfig, DriveError, IdleMode, Wheel};

mod mock_devices;
use mock_devices::*;

fn close(a: f32, b: f32) -> bool {
    (a - b).abs() < 1e-6
}

fn drivetrain(config: DriveConfig) -> (DifferentialDrive<FakeMotor, FakeEncoder>, [std::rc::Rc<std::cell::Cell<f32>>; 4]) {
    let (encs, cells) = encoders();
    let drive = DifferentialDrive::new(Default::default(), encs, config).unwrap();
    (drive, cells)
}

#[test]
fn test_forward_is_scaled_equally() {
    let (mut drive, _) = drivetrain(DriveConfig::default());
    drive.drive(1.0, 0.0).unwrap();
    let out = drive.output();
    assert!(close(out.left, 0.85));
    assert!(close(out.right, 0.85));
}

#[test]
fn test_positive_rotation_drives_left_forward() {
    let (mut drive, _) = drivetrain(DriveConfig::default());
    drive.drive(0.0, 1.0).unwrap();
    let out = drive.output();
    assert!(close(out.left, 0.85));
    assert!(close(out.right, -0.85));
}

#[test]
fn test_right_side_inversion_reaches_motors() {
    let (mut drive, _) = drivetrain(DriveConfig::default());
    drive.drive(1.0, 0.0).unwrap();
    assert!(close(drive.motor(Wheel::LeftFront).output, 0.85));
    assert!(close(drive.motor(Wheel::LeftRear).output, 0.85));
    assert!(close(drive.motor(Wheel::RightFront).output, -0.85));
    assert!(close(drive.motor(Wheel::RightRear).output, -0.85));
}

#[test]
fn test_outputs_never_leave_actuator_range() {
    let (mut drive, _) = drivetrain(DriveConfig::default());
    for &(f, r) in &[(1.0, 1.0), (-1.0, 1.0), (2.0, -3.0), (0.3, -0.9)] {
        drive.drive(f, r).unwrap();
        let out = drive.output();
        assert!(out.left.abs() <= 1.0 && out.right.abs() <= 1.0, "{f} {r} -> {out:?}");
    }
}

#[test]
fn test_stop_zeroes_all_motors() {
    let (mut drive, _) = drivetrain(DriveConfig::default());
    drive.drive(0.7, 0.2).unwrap();
    drive.stop().unwrap();
    for wheel in Wheel::ALL {
        assert_eq!(drive.motor(wheel).output, 0.0);
    }
}

#[test]
fn test_construction_applies_brake_and_resets_encoders() {
    let (encs, cells) = encoders();
    cells[1].set(12.0);
    let motors: [FakeMotor; 4] = std::array::from_fn(|_| FakeMotor {
        idle: IdleMode::Coast,
        ..Default::default()
    });
    let drive = DifferentialDrive::new(motors, encs, DriveConfig::default()).unwrap();
    assert_eq!(drive.idle_mode(), IdleMode::Brake);
    for wheel in Wheel::ALL {
        assert_eq!(drive.motor(wheel).idle, IdleMode::Brake);
    }
    assert_eq!(cells[1].get(), 0.0);
}

#[test]
fn test_idle_mode_applies_to_every_motor() {
    let (mut drive, _) = drivetrain(DriveConfig::default());
    drive.set_coast_mode().unwrap();
    for wheel in Wheel::ALL {
        assert_eq!(drive.motor(wheel).idle, IdleMode::Coast);
    }
    drive.set_brake_mode().unwrap();
    for wheel in Wheel::ALL {
        assert_eq!(drive.motor(wheel).idle, IdleMode::Brake);
    }
    assert_eq!(drive.idle_mode(), IdleMode::Brake);
}

#[test]
fn test_failed_idle_change_rolls_back() {
    let mut motors: [FakeMotor; 4] = Default::default();
    motors[Wheel::RightRear as usize].fail_on = Some(IdleMode::Coast);
    let (encs, _) = encoders();
    let mut drive = DifferentialDrive::new(motors, encs, DriveConfig::default()).unwrap();

    let err = drive.set_coast_mode();
    assert!(matches!(err, Err(DriveError::Motor(Wheel::RightRear, _))));
    assert_eq!(drive.idle_mode(), IdleMode::Brake);
    for wheel in Wheel::ALL {
        assert_eq!(drive.motor(wheel).idle, IdleMode::Brake, "{wheel:?}");
    }
}

#[test]
fn test_aggregates_skip_left_front_encoder() {
    let (mut drive, cells) = drivetrain(DriveConfig::default());
    cells[Wheel::LeftFront as usize].set(100.0);
    cells[Wheel::LeftRear as usize].set(2.0);
    cells[Wheel::RightFront as usize].set(4.0);
    cells[Wheel::RightRear as usize].set(6.0);

    let factor = drive.config().encoder_conversion;
    assert!(close(drive.average_position().unwrap(), 4.0));
    assert!(close(drive.average_distance().unwrap(), factor * 4.0));
    assert!(close(drive.average_rotation().unwrap(), 2.0 - 5.0));
}

#[test]
fn test_reset_encoders_zeroes_all_four() {
    let (mut drive, cells) = drivetrain(DriveConfig::default());
    for (i, c) in cells.iter().enumerate() {
        c.set(i as f32 + 1.0);
    }
    drive.reset_encoders().unwrap();
    assert_eq!(drive.encoder_positions().unwrap(), [0.0; 4]);
}

#[test]
fn test_publish_reports_dashboard_keys() {
    let (mut drive, cells) = drivetrain(DriveConfig::default());
    cells[Wheel::LeftRear as usize].set(3.0);
    cells[Wheel::RightFront as usize].set(3.0);
    cells[Wheel::RightRear as usize].set(3.0);
    drive.drive(1.0, 0.0).unwrap();

    let mut sink = VecSink::default();
    drive.publish(&mut sink);
    assert_eq!(sink.get("LR_Enc"), Some(3.0));
    assert_eq!(sink.get("LF_Enc"), Some(0.0));
    assert_eq!(sink.get("AveragePosition"), Some(3.0));
    assert_eq!(sink.get("AverageRotation"), Some(0.0));
    assert!(close(sink.get("AveragePosition(inch)").unwrap(), 3.0 * 1.76));
    assert!(close(sink.get("RR_Speed").unwrap(), -0.85));
}

#[test]
fn test_squared_inputs_when_configured() {
    let (mut drive, _) = drivetrain(DriveConfig {
        square_inputs: true,
        ..Default::default()
    });
    drive.drive(1.0, 0.0).unwrap();
    assert!(close(drive.output().left, 0.85 * 0.85));
}

#[test]
fn test_failed_motor_write_still_reaches_other_wheels() {
    let mut motors: [FakeMotor; 4] = Default::default();
    motors[Wheel::LeftFront as usize].reject_zero = true;
    let (encs, _) = encoders();
    let mut drive = DifferentialDrive::new(motors, encs, DriveConfig::default()).unwrap();
    drive.drive(0.5, 0.0).unwrap();
    let before = drive.output();

    let result = drive.stop();
    assert!(matches!(result, Err(DriveError::Motor(Wheel::LeftFront, _))));
    for wheel in [Wheel::LeftRear, Wheel::RightFront, Wheel::RightRear] {
        assert_eq!(drive.motor(wheel).output, 0.0);
    }
    // Output only reflects fully applied commands.
    assert_eq!(drive.output(), before);
}
