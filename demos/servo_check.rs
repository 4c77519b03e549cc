// Servo diagnostic: READ-ONLY check that every bus servo responds
//
// This tool does not write anything to the servos; run it before the first
// teleop session to verify wiring and IDs.
//
// Usage: cargo run --example servo_check -- [port]

use quadcrawler::config::{PIN_MAP, SERVO_PORT};
use quadcrawler::servo::bus::{Register, ServoBus};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("debug".parse().unwrap()),
        )
        .init();

    let port = std::env::args()
        .nth(1)
        .unwrap_or_else(|| SERVO_PORT.to_string());

    println!("Crawler servo diagnostic (read-only)");
    println!("Serial port: {port}");
    println!("Expected pins: {PIN_MAP:?}");
    println!();

    let mut bus = ServoBus::open(&port)?;
    let mut missing = 0;

    for (servo, &pin) in PIN_MAP.iter().enumerate() {
        print!("  servo {servo:2} (pin {pin:2}): ");
        match bus.ping(pin) {
            Ok(true) => {
                let position = bus
                    .read_position_deg(pin)
                    .map(|deg| format!("{deg:6.1} deg"))
                    .unwrap_or_else(|e| format!("position read failed: {e}"));
                let torque = bus
                    .read_u8(pin, Register::TorqueEnable)
                    .map(|t| if t == 1 { "torque ON" } else { "torque off" })
                    .unwrap_or("torque unknown");
                println!("responding, {position}, {torque}");
            }
            Ok(false) => {
                println!("NO RESPONSE");
                missing += 1;
            }
            Err(e) => {
                println!("ERROR: {e}");
                missing += 1;
            }
        }
    }

    println!();
    if missing == 0 {
        println!("All {} servos responding.", PIN_MAP.len());
        println!("Next step: cargo run --example teleop -- --port {port}");
    } else {
        println!("{missing} servo(s) did not respond.");
        println!("Check servo power, bus wiring, and the configured IDs.");
    }

    Ok(())
}
