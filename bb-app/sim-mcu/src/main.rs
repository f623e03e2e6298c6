use std::{
    collections::{BTreeMap, VecDeque},
    error::Error,
    fs,
    path::{Path, PathBuf},
};

use bb_core::utils::{
    COMMAND_CHANNEL, Duration, Instant, RobotCommand, TelemetrySink,
    controllers::{
        Actuator, ArmCommand, ArmConfig, ArmController, ArmLevel, ArmStatus, BalanceConfig,
        BalanceController, Calibration, DifferentialDrive, DriveConfig, Encoder, Potentiometer,
        calibrate, parse_command,
    },
};
use clap::{Parser, ValueEnum};
use serde::Deserialize;
use tracing::{error, info, warn};

mod world;
use world::{SimAdc, SimEncoder, SimImu, SimMotor, World};

/// Scheduler period.
const TICK_MS: u64 = 20;

#[derive(Parser)]
#[clap(version = "1.0")]
struct Opts {
    /// Built-in command script to run
    #[clap(long, value_enum, default_value = "both")]
    scenario: Scenario,
    /// Number of 20 ms ticks to simulate
    #[clap(long, default_value_t = 1500)]
    ticks: u64,
    /// JSON file with `drive`, `balance` and `arm` configuration sections
    #[clap(long)]
    config: Option<PathBuf>,
    /// JSON-lines file of `{"tick": n, "cmd": {...}}` entries replacing the scenario
    #[clap(long)]
    script: Option<PathBuf>,
    /// Print a telemetry frame every N ticks
    #[clap(long, default_value_t = 25)]
    every: u64,
    /// Where the robot stops on the platform, metres from the pivot
    #[clap(long, default_value_t = -0.45, allow_hyphen_values = true)]
    start: f32,
    /// IMU mounting error the startup calibration has to remove (deg)
    #[clap(long, default_value_t = 3.5, allow_hyphen_values = true)]
    mount_offset: f32,
    /// Sleep between ticks instead of running as fast as possible
    #[clap(long)]
    realtime: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum Scenario {
    Balance,
    Arm,
    Both,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SimConfig {
    drive: DriveConfig,
    balance: BalanceConfig,
    arm: ArmConfig,
}

#[derive(Debug, Deserialize)]
struct ScriptLine {
    tick: u64,
    cmd: serde_json::Value,
}

/// Who currently owns the drivetrain.
#[derive(Debug, Clone, Copy, PartialEq)]
enum DriveMode {
    Teleop { f: f32, r: f32 },
    Balance,
}

/// One telemetry frame, printed as a JSON object.
#[derive(Default)]
struct Frame(BTreeMap<&'static str, f32>);

impl TelemetrySink for Frame {
    fn put(
        &mut self,
        key: &'static str,
        value: f32,
    ) {
        self.0.insert(key, value);
    }
}

type Drive = DifferentialDrive<SimMotor, SimEncoder>;
type Arm = ArmController<Potentiometer<SimAdc>, SimMotor>;

/// Plays the external scheduler: fixed-period ticks, command routing and telemetry.
struct Scheduler {
    tick: u64,
    ticks: u64,
    every: u64,
    realtime: bool,
    script: VecDeque<(u64, RobotCommand)>,
    world: World,
    arm: Arm,
}

impl Scheduler {
    /// Start the current tick: release due script entries and return its timestamp.
    fn begin(&mut self) -> Option<Instant> {
        if self.tick >= self.ticks {
            return None;
        }
        while self.script.front().is_some_and(|(at, _)| *at <= self.tick) {
            if let Some((_, cmd)) = self.script.pop_front() {
                if COMMAND_CHANNEL.try_send(cmd).is_err() {
                    warn!(?cmd, "command channel full, dropping");
                }
            }
        }
        Some(Instant::from_millis(self.tick * TICK_MS))
    }

    /// Drain the command channel. Arm commands are applied here; a drive
    /// handoff is returned to the caller.
    fn drain(&mut self) -> Option<DriveMode> {
        let mut next = None;
        while let Ok(cmd) = COMMAND_CHANNEL.try_receive() {
            info!(tick = self.tick, ?cmd, "command");
            match cmd {
                RobotCommand::Balance => next = Some(DriveMode::Balance),
                RobotCommand::Drive { f, r } => next = Some(DriveMode::Teleop { f, r }),
                RobotCommand::A(ArmCommand::Level { l }) => self.arm.go_to_level(l),
                RobotCommand::A(ArmCommand::MoveTo { a, s, o }) => self.arm.move_to(a, s, o),
                RobotCommand::A(ArmCommand::JogUp) => self.arm.jog_up(),
                RobotCommand::A(ArmCommand::JogDown) => self.arm.jog_down(),
                RobotCommand::A(ArmCommand::Stop) => self.arm.stop(),
            }
        }
        next
    }

    /// Finish the tick: run the arm, step the plant, publish.
    fn end<M: Actuator, E: Encoder>(
        &mut self,
        now: Instant,
        drive: &mut DifferentialDrive<M, E>,
        extra: Frame,
    ) {
        match self.arm.tick(now) {
            ArmStatus::Arrived => info!(tick = self.tick, angle = self.arm.angle(), "arm arrived"),
            ArmStatus::TimedOut => warn!(tick = self.tick, "arm move timed out"),
            _ => {}
        }

        let dt = TICK_MS as f32 / 1000.0;
        self.world.step(
            dt,
            drive.output(),
            drive.idle_mode(),
            self.arm.output(),
            self.arm.idle_mode(),
        );

        if self.tick % self.every == 0 {
            let mut frame = extra;
            frame.put("tick", self.tick as f32);
            drive.publish(&mut frame);
            self.arm.publish(&mut frame);
            self.world.publish(&mut frame);
            match serde_json::to_string(&frame.0) {
                Ok(line) => println!("{line}"),
                Err(e) => error!(?e, "failed to encode telemetry"),
            }
        }

        self.tick += 1;
        if self.realtime {
            std::thread::sleep(std::time::Duration::from_millis(TICK_MS));
        }
    }
}

fn teleop(
    sched: &mut Scheduler,
    drive: &mut Drive,
    f: f32,
    r: f32,
) -> DriveMode {
    info!(f, r, "teleop drive");
    while let Some(now) = sched.begin() {
        if let Some(next) = sched.drain() {
            return next;
        }
        if let Err(e) = drive.drive(f, r) {
            error!(?e, "drive command failed");
        }
        sched.end(now, drive, Frame::default());
    }
    DriveMode::Teleop { f, r }
}

fn balance(
    sched: &mut Scheduler,
    drive: &mut Drive,
    imu: &mut SimImu,
    calibration: Calibration,
    config: BalanceConfig,
) -> DriveMode {
    let mut balance = match BalanceController::new(drive, imu, calibration, config) {
        Ok(balance) => balance,
        Err(e) => {
            error!(?e, "auto-balance refused to start");
            return DriveMode::Teleop { f: 0.0, r: 0.0 };
        }
    };

    while let Some(now) = sched.begin() {
        match sched.drain() {
            None | Some(DriveMode::Balance) => {}
            Some(next) => return next,
        }
        balance.tick(now);
        let mut frame = Frame::default();
        balance.publish(&mut frame);
        sched.end(now, balance.drivetrain_mut(), frame);
    }
    DriveMode::Balance
}

fn scenario_script(scenario: Scenario) -> Vec<(u64, RobotCommand)> {
    let arm = |l| RobotCommand::A(ArmCommand::Level { l });
    let balance = vec![
        (0, RobotCommand::Drive { f: 0.0, r: 0.0 }),
        (10, RobotCommand::Balance),
    ];
    let arm_moves = vec![
        (0, arm(ArmLevel::Middle)),
        (200, arm(ArmLevel::Top)),
        (400, RobotCommand::A(ArmCommand::JogDown)),
        (430, RobotCommand::A(ArmCommand::Stop)),
        (500, arm(ArmLevel::Loading)),
        (700, arm(ArmLevel::Bottom)),
    ];
    let mut script = match scenario {
        Scenario::Balance => balance,
        Scenario::Arm => arm_moves,
        Scenario::Both => balance.into_iter().chain(arm_moves).collect(),
    };
    script.sort_by_key(|(tick, _)| *tick);
    script
}

fn load_script(path: &Path) -> Result<Vec<(u64, RobotCommand)>, Box<dyn Error>> {
    let text = fs::read_to_string(path)?;
    let mut script = Vec::new();
    for (n, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let entry: ScriptLine = serde_json::from_str(line)
            .map_err(|e| format!("{}:{}: {e}", path.display(), n + 1))?;
        let cmd = parse_command(entry.cmd.to_string().as_bytes())
            .map_err(|e| format!("{}:{}: {e}", path.display(), n + 1))?;
        script.push((entry.tick, cmd));
    }
    script.sort_by_key(|(tick, _)| *tick);
    Ok(script)
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let opts: Opts = Opts::parse();
    let config: SimConfig = match &opts.config {
        Some(path) => serde_json::from_slice(&fs::read(path)?)?,
        None => SimConfig::default(),
    };
    config
        .balance
        .validate()
        .map_err(|e| format!("invalid balance config: {e:?}"))?;
    let script = match &opts.script {
        Some(path) => load_script(path)?,
        None => scenario_script(opts.scenario),
    };

    let mut world = World::new(opts.mount_offset, 0.0, config.drive.encoder_conversion);
    let mut drive = DifferentialDrive::new(Default::default(), world.encoders(), config.drive)
        .map_err(|e| format!("drive init failed: {e:?}"))?;

    // Calibrate at rest on the floor, before the platform tips.
    let mut imu = world.imu();
    let calibration = calibrate(&mut imu, 50);
    world.place_on_platform(opts.start);

    let arm = ArmController::new(world.pot(), SimMotor::default(), config.arm);
    let mut sched = Scheduler {
        tick: 0,
        ticks: opts.ticks,
        every: opts.every.max(1),
        realtime: opts.realtime,
        script: script.into(),
        world,
        arm,
    };

    info!(
        ticks = opts.ticks,
        period_ms = Duration::from_millis(TICK_MS).as_millis(),
        "simulation starting"
    );
    let mut mode = DriveMode::Teleop { f: 0.0, r: 0.0 };
    while sched.tick < sched.ticks {
        mode = match mode {
            DriveMode::Teleop { f, r } => teleop(&mut sched, &mut drive, f, r),
            DriveMode::Balance => balance(
                &mut sched,
                &mut drive,
                &mut imu,
                calibration,
                config.balance,
            ),
        };
    }
    info!(platform = sched.world.platform(), "simulation finished");
    Ok(())
}
