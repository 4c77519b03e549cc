// Keyboard teleop: WASD walk/turn, Q/E stand/sit, V wave, R/F speed, Esc quit
//
// Runs against the serial servo bus when --port is given, or as a dry run
// against the recording driver otherwise.
//
// Usage: cargo run --example teleop -- [--port /dev/ttyUSB0] [--speed 50]

use std::time::Duration;

use clap::Parser;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use tracing::info;
use tracing_subscriber::EnvFilter;

use quadcrawler::config::{CALIBRATION_PATH, DEFAULT_SPEED, MAX_SPEED, PIN_MAP};
use quadcrawler::tracker::PositionTracker;
use quadcrawler::{CalibrationStore, Crawler, RecordingDriver, SerialServoDriver, ServoDriver};

#[derive(Parser)]
#[command(about = "Drive the crawler from the keyboard")]
struct Args {
    /// Serial port of the servo bus; omit for a dry run without hardware.
    #[arg(long)]
    port: Option<String>,

    /// Calibration file.
    #[arg(long, default_value = CALIBRATION_PATH)]
    calibration: String,

    /// Initial speed, 0-100.
    #[arg(long, default_value_t = DEFAULT_SPEED)]
    speed: u8,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    let args = Args::parse();
    let calibration = CalibrationStore::load_or_identity(&args.calibration);
    let driver: Box<dyn ServoDriver> = match &args.port {
        Some(port) => {
            let mut driver = SerialServoDriver::open(port)?;
            driver.initialize(&PIN_MAP)?;
            Box::new(driver)
        }
        None => {
            info!("no --port given, dry run against the recording driver");
            Box::new(RecordingDriver::new())
        }
    };
    let mut crawler = Crawler::new(driver, calibration);
    let mut tracker = PositionTracker::new();

    crawler.do_action("stand", 1, args.speed).await?;
    info!("controls: WASD=walk/turn, Q/E=stand/sit, V=wave, R/F=speed, I=pose, Esc=quit");

    enable_raw_mode()?;
    let result = drive(&mut crawler, &mut tracker, args.speed).await;
    disable_raw_mode()?;

    // Park the robot on the way out.
    crawler.do_action("sit", 1, args.speed).await?;
    result
}

async fn drive(
    crawler: &mut Crawler<Box<dyn ServoDriver>>,
    tracker: &mut PositionTracker,
    mut speed: u8,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    loop {
        // Poll the keyboard at 20 Hz; actions block until their last frame
        // settles, so there is never more than one in flight.
        if !event::poll(Duration::from_millis(50))? {
            continue;
        }
        let Event::Key(KeyEvent { code, kind, .. }) = event::read()? else {
            continue;
        };
        if kind != KeyEventKind::Press && kind != KeyEventKind::Repeat {
            continue;
        }

        let action = match code {
            KeyCode::Char('w') => Some(("forward", 2)),
            KeyCode::Char('s') => Some(("backward", 2)),
            KeyCode::Char('a') => Some(("turn left", 1)),
            KeyCode::Char('d') => Some(("turn right", 1)),
            KeyCode::Char('q') => Some(("stand", 1)),
            KeyCode::Char('e') => Some(("sit", 1)),
            KeyCode::Char('v') => Some(("wave", 1)),
            KeyCode::Char('r') => {
                speed = speed.saturating_add(10).min(MAX_SPEED);
                info!(speed, "speed up");
                None
            }
            KeyCode::Char('f') => {
                speed = speed.saturating_sub(10);
                info!(speed, "speed down");
                None
            }
            KeyCode::Char('i') => {
                let (x, y, heading) = tracker.position();
                info!(x, y, heading, "dead-reckoned pose");
                None
            }
            KeyCode::Esc => break,
            _ => None,
        };
        if let Some((name, steps)) = action {
            crawler.do_action(name, steps, speed).await?;
            tracker.record(name, steps);
        }
    }
    Ok(())
}
