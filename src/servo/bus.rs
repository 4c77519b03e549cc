// Serial servo bus protocol
//
// Half-duplex packet protocol spoken by STS-series bus servos:
// [0xFF, 0xFF, ID, Length, Instruction, Params..., Checksum]
//
// The crawler only needs position mode: ping, torque on/off, goal position
// writes (batched over all twelve servos with a sync write, which gets no
// reply), and position reads for diagnostics.

use std::io::{Read, Write};
use std::time::Duration;

use serialport::{self, SerialPort};
use tracing::debug;

pub const DEFAULT_BAUDRATE: u32 = 1_000_000;
pub const DEFAULT_TIMEOUT_MS: u64 = 100;

const HEADER: [u8; 2] = [0xFF, 0xFF];

/// Broadcast address: every servo listens, none replies.
const BROADCAST_ID: u8 = 0xFE;

/// Encoder counts per revolution. The usable 0-180 degree command range sits
/// in the middle half of the encoder, 90 degrees at count 2048.
const COUNTS_PER_REV: f32 = 4096.0;
const COUNTS_PER_DEG: f32 = COUNTS_PER_REV / 360.0;

#[repr(u8)]
#[derive(Debug, Clone, Copy)]
pub enum Instruction {
    Ping = 0x01,
    Read = 0x02,
    Write = 0x03,
    SyncWrite = 0x83,
}

/// Register addresses used by the crawler.
#[repr(u8)]
#[derive(Debug, Clone, Copy)]
pub enum Register {
    // EEPROM area
    ModelNumber = 3, // 2 bytes, read-only
    Id = 5,          // 1 byte

    // RAM area
    TorqueEnable = 40,    // 1 byte: 0=off, 1=on
    GoalPosition = 42,    // 2 bytes
    Lock = 55,            // 1 byte: 0=unlocked, 1=locked
    PresentPosition = 56, // 2 bytes, read-only
}

#[derive(Debug, thiserror::Error)]
pub enum BusError {
    #[error("serial port error: {0}")]
    Serial(#[from] serialport::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid response from servo {id}: {reason}")]
    InvalidResponse { id: u8, reason: String },

    #[error("checksum mismatch for servo {id}")]
    ChecksumMismatch { id: u8 },

    #[error("servo {id} reported fault status 0x{status:02X}")]
    Fault { id: u8, status: u8 },

    #[error("timeout waiting for servo {id}")]
    Timeout { id: u8 },
}

pub type Result<T> = std::result::Result<T, BusError>;

/// Connection to the servo bus over one serial port.
pub struct ServoBus {
    port: Box<dyn SerialPort>,
}

impl ServoBus {
    pub fn open(port_name: &str) -> Result<Self> {
        Self::open_with_baudrate(port_name, DEFAULT_BAUDRATE)
    }

    pub fn open_with_baudrate(port_name: &str, baudrate: u32) -> Result<Self> {
        let port = serialport::new(port_name, baudrate)
            .timeout(Duration::from_millis(DEFAULT_TIMEOUT_MS))
            .open()?;
        Ok(Self { port })
    }

    /// Inverted 8-bit sum over everything after the header.
    fn checksum(data: &[u8]) -> u8 {
        let sum: u16 = data.iter().map(|&b| u16::from(b)).sum();
        (!sum & 0xFF) as u8
    }

    fn frame_packet(id: u8, instruction: Instruction, params: &[u8]) -> Vec<u8> {
        let length = (params.len() + 2) as u8; // instruction + params + checksum
        let mut packet = Vec::with_capacity(6 + params.len());
        packet.extend_from_slice(&HEADER);
        packet.push(id);
        packet.push(length);
        packet.push(instruction as u8);
        packet.extend_from_slice(params);
        let checksum = Self::checksum(&packet[2..]);
        packet.push(checksum);
        packet
    }

    fn transmit(&mut self, packet: &[u8]) -> Result<()> {
        self.port.write_all(packet)?;
        self.port.flush()?;
        Ok(())
    }

    /// Read one status packet from `expected_id` and return its parameters.
    fn read_status(&mut self, expected_id: u8) -> Result<Vec<u8>> {
        let mut prefix = [0u8; 4]; // header, id, length
        self.port.read_exact(&mut prefix).map_err(|e| {
            if e.kind() == std::io::ErrorKind::TimedOut {
                BusError::Timeout { id: expected_id }
            } else {
                BusError::Io(e)
            }
        })?;
        if prefix[..2] != HEADER {
            return Err(BusError::InvalidResponse {
                id: expected_id,
                reason: format!("bad header {:02X?}", &prefix[..2]),
            });
        }
        let id = prefix[2];
        let length = prefix[3] as usize;
        if id != expected_id {
            return Err(BusError::InvalidResponse {
                id: expected_id,
                reason: format!("reply from servo {id}"),
            });
        }
        if length < 2 {
            return Err(BusError::InvalidResponse {
                id,
                reason: format!("status length {length}"),
            });
        }

        // status byte + params + checksum
        let mut body = vec![0u8; length];
        self.port.read_exact(&mut body)?;

        let mut summed = vec![id, length as u8];
        summed.extend_from_slice(&body[..length - 1]);
        if Self::checksum(&summed) != body[length - 1] {
            return Err(BusError::ChecksumMismatch { id });
        }
        if body[0] != 0 {
            return Err(BusError::Fault {
                id,
                status: body[0],
            });
        }
        Ok(body[1..length - 1].to_vec())
    }

    /// Check whether a servo is present on the bus.
    pub fn ping(&mut self, id: u8) -> Result<bool> {
        let packet = Self::frame_packet(id, Instruction::Ping, &[]);
        self.transmit(&packet)?;
        match self.read_status(id) {
            Ok(_) => Ok(true),
            Err(BusError::Timeout { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }

    pub fn write_u8(&mut self, id: u8, register: Register, value: u8) -> Result<()> {
        let params = [register as u8, value];
        let packet = Self::frame_packet(id, Instruction::Write, &params);
        self.transmit(&packet)?;
        let _ = self.read_status(id)?;
        Ok(())
    }

    pub fn write_u16(&mut self, id: u8, register: Register, value: u16) -> Result<()> {
        let params = [register as u8, (value & 0xFF) as u8, (value >> 8) as u8];
        let packet = Self::frame_packet(id, Instruction::Write, &params);
        self.transmit(&packet)?;
        let _ = self.read_status(id)?;
        Ok(())
    }

    pub fn read_u8(&mut self, id: u8, register: Register) -> Result<u8> {
        let params = [register as u8, 1]; // address, byte count
        let packet = Self::frame_packet(id, Instruction::Read, &params);
        self.transmit(&packet)?;
        let response = self.read_status(id)?;
        response.first().copied().ok_or(BusError::InvalidResponse {
            id,
            reason: "empty read reply".to_string(),
        })
    }

    pub fn read_u16(&mut self, id: u8, register: Register) -> Result<u16> {
        let params = [register as u8, 2];
        let packet = Self::frame_packet(id, Instruction::Read, &params);
        self.transmit(&packet)?;
        let response = self.read_status(id)?;
        if response.len() < 2 {
            return Err(BusError::InvalidResponse {
                id,
                reason: format!("expected 2 bytes, got {}", response.len()),
            });
        }
        Ok(u16::from_le_bytes([response[0], response[1]]))
    }

    /// Write the same register on many servos in one broadcast packet.
    /// Sync writes get no reply, which makes them best-effort by design.
    pub fn sync_write_u16(&mut self, register: Register, data: &[(u8, u16)]) -> Result<()> {
        if data.is_empty() {
            return Ok(());
        }
        // [start_addr, bytes_per_servo, id1, lo1, hi1, id2, lo2, hi2, ...]
        let mut params = vec![register as u8, 2];
        for &(id, value) in data {
            params.push(id);
            params.push((value & 0xFF) as u8);
            params.push((value >> 8) as u8);
        }
        let packet = Self::frame_packet(BROADCAST_ID, Instruction::SyncWrite, &params);
        debug!(servos = data.len(), register = ?register, "sync write");
        self.transmit(&packet)
    }

    // === Angle-level API ===

    /// Command one servo to an angle in degrees.
    pub fn set_position_deg(&mut self, id: u8, degrees: f32) -> Result<()> {
        self.write_u16(id, Register::GoalPosition, position_counts(degrees))
    }

    /// Command many servos in one sync write.
    pub fn sync_write_positions(&mut self, targets: &[(u8, f32)]) -> Result<()> {
        let encoded: Vec<(u8, u16)> = targets
            .iter()
            .map(|&(id, degrees)| (id, position_counts(degrees)))
            .collect();
        self.sync_write_u16(Register::GoalPosition, &encoded)
    }

    /// Present position of one servo, degrees.
    pub fn read_position_deg(&mut self, id: u8) -> Result<f32> {
        let counts = self.read_u16(id, Register::PresentPosition)?;
        Ok(counts_to_degrees(counts))
    }

    pub fn enable_torque(&mut self, id: u8) -> Result<()> {
        self.write_u8(id, Register::TorqueEnable, 1)?;
        self.write_u8(id, Register::Lock, 1)
    }

    pub fn disable_torque(&mut self, id: u8) -> Result<()> {
        self.write_u8(id, Register::TorqueEnable, 0)?;
        self.write_u8(id, Register::Lock, 0)
    }
}

/// Degrees [0, 180] -> encoder counts, 90 degrees at mid-travel.
fn position_counts(degrees: f32) -> u16 {
    ((degrees.clamp(0.0, 180.0) + 90.0) * COUNTS_PER_DEG).round() as u16
}

fn counts_to_degrees(counts: u16) -> f32 {
    counts as f32 / COUNTS_PER_DEG - 90.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checksum_inverts_the_byte_sum() {
        // ID=2, Length=4, WRITE, addr=42, value=8 little-endian
        let data = [2u8, 4, 0x03, 42, 8, 0];
        // !(2+4+3+42+8+0) = !59 = 196
        assert_eq!(ServoBus::checksum(&data), 196);
    }

    #[test]
    fn ping_packet_layout() {
        let packet = ServoBus::frame_packet(3, Instruction::Ping, &[]);
        assert_eq!(packet.len(), 6);
        assert_eq!(&packet[..2], &HEADER);
        assert_eq!(packet[2], 3); // id
        assert_eq!(packet[3], 2); // instruction + checksum
        assert_eq!(packet[4], 0x01);
        // checksum over [3, 2, 1]
        assert_eq!(packet[5], !(3u8 + 2 + 1));
    }

    #[test]
    fn sync_write_broadcasts_per_servo_payloads() {
        let mut params = vec![Register::GoalPosition as u8, 2];
        params.extend_from_slice(&[1, 0x00, 0x08, 2, 0x00, 0x0C]);
        let packet = ServoBus::frame_packet(BROADCAST_ID, Instruction::SyncWrite, &params);
        assert_eq!(packet[2], BROADCAST_ID);
        assert_eq!(packet[4], Instruction::SyncWrite as u8);
        assert_eq!(packet[5], Register::GoalPosition as u8);
    }

    #[test]
    fn position_counts_centers_ninety_degrees() {
        assert_eq!(position_counts(90.0), 2048);
        assert_eq!(position_counts(0.0), 1024);
        assert_eq!(position_counts(180.0), 3072);
    }

    #[test]
    fn position_counts_clamps_to_the_servo_range() {
        assert_eq!(position_counts(-20.0), position_counts(0.0));
        assert_eq!(position_counts(200.0), position_counts(180.0));
    }

    #[test]
    fn counts_round_trip_to_degrees() {
        for degrees in [0.0_f32, 45.0, 90.0, 135.0, 180.0] {
            let back = counts_to_degrees(position_counts(degrees));
            assert!((back - degrees).abs() < 0.1, "{degrees} -> {back}");
        }
    }
}
