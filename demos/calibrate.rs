// Calibration tool: inspect and edit the per-servo offset store
//
// Usage:
//   cargo run --example calibrate                              # print the table
//   cargo run --example calibrate -- --servo 0 --offset 5      # set an offset
//   cargo run --example calibrate -- --servo 4 --invert true   # flip mounting

use clap::Parser;
use tracing_subscriber::EnvFilter;

use quadcrawler::config::{CALIBRATION_PATH, PIN_MAP, SERVO_COUNT};
use quadcrawler::CalibrationStore;

#[derive(Parser)]
#[command(about = "Inspect and edit the crawler's servo calibration")]
struct Args {
    /// Calibration file.
    #[arg(long, default_value = CALIBRATION_PATH)]
    calibration: String,

    /// Servo index to edit (0-11); omit to just print the table.
    #[arg(long)]
    servo: Option<usize>,

    /// New offset in degrees.
    #[arg(long, requires = "servo", allow_hyphen_values = true)]
    offset: Option<i32>,

    /// New inversion flag.
    #[arg(long, requires = "servo")]
    invert: Option<bool>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    let args = Args::parse();
    let mut store = CalibrationStore::load_or_identity(&args.calibration);

    if let Some(servo) = args.servo {
        if let Some(offset) = args.offset {
            store.set_offset(servo, offset)?;
        }
        if let Some(invert) = args.invert {
            store.set_inverted(servo, invert)?;
        }
    }

    println!("calibration store: {}", args.calibration);
    for servo in 0..SERVO_COUNT {
        let trim = store.offset_for(servo);
        println!(
            "  servo {servo:2}  pin {:2}  offset {:+4}  inverted {}",
            PIN_MAP[servo], trim.offset_degrees, trim.inverted
        );
    }

    Ok(())
}
