// Feetech STS-series serial bus protocol, position-control subset
//
// Instruction packet: [0xFF, 0xFF, ID, Length, Instruction, Params..., Checksum]
// Status packet:      [0xFF, 0xFF, ID, Length, Error, Params..., Checksum]
// Length counts everything after itself; the checksum is the inverted low
// byte of the sum from ID to the last param.

use serialport::SerialPort;
use std::io::{ErrorKind, Read, Write};
use std::time::Duration;
use tracing::{debug, trace};

pub const DEFAULT_BAUDRATE: u32 = 1_000_000;
pub const DEFAULT_TIMEOUT_MS: u64 = 100;

const HEADER: [u8; 2] = [0xFF, 0xFF];

#[repr(u8)]
#[derive(Debug, Clone, Copy)]
enum Instruction {
    Ping = 0x01,
    Read = 0x02,
    Write = 0x03,
}

/// Control table addresses used by the hexapod
#[repr(u8)]
#[derive(Debug, Clone, Copy)]
pub enum Register {
    // EEPROM area
    ModelNumber = 3,    // 2 bytes, read-only
    Id = 5,             // 1 byte
    MinAngleLimit = 9,  // 2 bytes
    MaxAngleLimit = 11, // 2 bytes

    // RAM area
    OperatingMode = 33,      // 1 byte: 0=position, 1=velocity, 2=PWM, 3=step
    TorqueEnable = 40,       // 1 byte
    GoalPosition = 42,       // 2 bytes
    Lock = 55,               // 1 byte
    PresentPosition = 56,    // 2 bytes, read-only
    PresentVoltage = 62,     // 1 byte, 0.1 V units
    PresentTemperature = 63, // 1 byte, °C
}

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OperatingMode {
    Position = 0,
    Velocity = 1,
    Pwm = 2,
    Step = 3,
}

impl OperatingMode {
    pub fn from_raw(raw: u8) -> Option<Self> {
        match raw {
            0 => Some(Self::Position),
            1 => Some(Self::Velocity),
            2 => Some(Self::Pwm),
            3 => Some(Self::Step),
            _ => None,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum FeetechError {
    #[error("Serial port error: {0}")]
    Serial(#[from] serialport::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid response from servo {id}: {reason}")]
    InvalidResponse { id: u8, reason: String },

    #[error("Checksum mismatch for servo {id}")]
    ChecksumMismatch { id: u8 },

    #[error("Servo {id} returned error status: 0x{status:02X}")]
    ServoStatus { id: u8, status: u8 },

    #[error("Timeout waiting for response from servo {id}")]
    Timeout { id: u8 },
}

pub type Result<T> = std::result::Result<T, FeetechError>;

fn checksum(bytes: &[u8]) -> u8 {
    !bytes.iter().fold(0u8, |sum, &b| sum.wrapping_add(b))
}

fn frame(id: u8, instruction: Instruction, params: &[u8]) -> Vec<u8> {
    let mut packet = Vec::with_capacity(6 + params.len());
    packet.extend_from_slice(&HEADER);
    packet.extend_from_slice(&[id, (params.len() + 2) as u8, instruction as u8]);
    packet.extend_from_slice(params);
    packet.push(checksum(&packet[2..]));
    packet
}

/// Servo bus over any byte stream; a serial port in production
pub struct FeetechBus<P = Box<dyn SerialPort>> {
    port: P,
}

impl FeetechBus {
    pub fn open(port_name: &str) -> Result<Self> {
        Self::open_with_baudrate(port_name, DEFAULT_BAUDRATE)
    }

    pub fn open_with_baudrate(port_name: &str, baudrate: u32) -> Result<Self> {
        let port = serialport::new(port_name, baudrate)
            .timeout(Duration::from_millis(DEFAULT_TIMEOUT_MS))
            .open()?;
        Ok(Self::from_port(port))
    }
}

impl<P: Read + Write> FeetechBus<P> {
    pub fn from_port(port: P) -> Self {
        Self { port }
    }

    #[cfg(test)]
    pub(crate) fn port_mut(&mut self) -> &mut P {
        &mut self.port
    }

    fn send(&mut self, id: u8, instruction: Instruction, params: &[u8]) -> Result<()> {
        let packet = frame(id, instruction, params);
        trace!("tx {:02X?}", packet);
        self.port.write_all(&packet)?;
        self.port.flush()?;
        Ok(())
    }

    fn read_exact(&mut self, id: u8, buf: &mut [u8]) -> Result<()> {
        self.port.read_exact(buf).map_err(|e| match e.kind() {
            ErrorKind::TimedOut | ErrorKind::UnexpectedEof => FeetechError::Timeout { id },
            _ => FeetechError::Io(e),
        })
    }

    /// Read one status packet from `id`, returning its params
    fn receive(&mut self, id: u8) -> Result<Vec<u8>> {
        let mut head = [0u8; 4];
        self.read_exact(id, &mut head)?;
        if head[..2] != HEADER {
            return Err(FeetechError::InvalidResponse {
                id,
                reason: format!("Invalid header: {:02X?}", &head[..2]),
            });
        }
        let (from, length) = (head[2], head[3] as usize);
        if from != id {
            return Err(FeetechError::InvalidResponse {
                id,
                reason: format!("ID mismatch: expected {}, got {}", id, from),
            });
        }
        if length < 2 {
            return Err(FeetechError::InvalidResponse {
                id,
                reason: format!("Length {} too short", length),
            });
        }

        // error byte + params + checksum
        let mut body = vec![0u8; length];
        self.read_exact(id, &mut body)?;
        trace!("rx {:02X?} {:02X?}", head, body);

        let (payload, received) = body.split_at(length - 1);
        let expected = !payload
            .iter()
            .fold(from.wrapping_add(head[3]), |sum, &b| sum.wrapping_add(b));
        if expected != received[0] {
            return Err(FeetechError::ChecksumMismatch { id });
        }
        if payload[0] != 0 {
            return Err(FeetechError::ServoStatus {
                id,
                status: payload[0],
            });
        }
        Ok(payload[1..].to_vec())
    }

    /// True if the servo answers, false on timeout
    pub fn ping(&mut self, id: u8) -> Result<bool> {
        self.send(id, Instruction::Ping, &[])?;
        match self.receive(id) {
            Ok(_) => Ok(true),
            Err(FeetechError::Timeout { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }

    pub fn read(&mut self, id: u8, register: Register, len: u8) -> Result<Vec<u8>> {
        self.send(id, Instruction::Read, &[register as u8, len])?;
        let data = self.receive(id)?;
        if data.len() < len as usize {
            return Err(FeetechError::InvalidResponse {
                id,
                reason: format!("Expected {} bytes, got {}", len, data.len()),
            });
        }
        Ok(data)
    }

    pub fn write(&mut self, id: u8, register: Register, data: &[u8]) -> Result<()> {
        let mut params = Vec::with_capacity(1 + data.len());
        params.push(register as u8);
        params.extend_from_slice(data);
        debug!("Write to servo {}: reg={:?}, data={:?}", id, register, data);
        self.send(id, Instruction::Write, &params)?;
        self.receive(id).map(|_| ())
    }

    pub fn read_u8(&mut self, id: u8, register: Register) -> Result<u8> {
        Ok(self.read(id, register, 1)?[0])
    }

    pub fn read_u16(&mut self, id: u8, register: Register) -> Result<u16> {
        let data = self.read(id, register, 2)?;
        Ok(u16::from_le_bytes([data[0], data[1]]))
    }

    pub fn write_u8(&mut self, id: u8, register: Register, value: u8) -> Result<()> {
        self.write(id, register, &[value])
    }

    pub fn write_u16(&mut self, id: u8, register: Register, value: u16) -> Result<()> {
        self.write(id, register, &value.to_le_bytes())
    }

    /// Torque and EEPROM lock follow each other
    pub fn set_torque(&mut self, id: u8, enabled: bool) -> Result<()> {
        let flag = u8::from(enabled);
        self.write_u8(id, Register::TorqueEnable, flag)?;
        self.write_u8(id, Register::Lock, flag)
    }

    /// Torque must be off while the mode changes
    pub fn set_operating_mode(&mut self, id: u8, mode: OperatingMode) -> Result<()> {
        self.write_u8(id, Register::OperatingMode, mode as u8)
    }

    pub fn set_goal_position(&mut self, id: u8, raw: u16) -> Result<()> {
        self.write_u16(id, Register::GoalPosition, raw)
    }

    pub fn present_position(&mut self, id: u8) -> Result<u16> {
        self.read_u16(id, Register::PresentPosition)
    }
}

#[cfg(test)]
pub(crate) mod test_port {
    use std::collections::VecDeque;
    use std::io::{self, Read, Write};

    /// In-memory port: replies are queued up front, writes are captured.
    /// Reading past the queued bytes behaves like a serial timeout.
    #[derive(Default)]
    pub struct ScriptedPort {
        pub rx: VecDeque<u8>,
        pub tx: Vec<u8>,
    }

    impl ScriptedPort {
        pub fn reply(&mut self, id: u8, status: u8, params: &[u8]) {
            let mut packet = vec![0xFF, 0xFF, id, (params.len() + 2) as u8, status];
            packet.extend_from_slice(params);
            let sum = packet[2..].iter().fold(0u8, |s, &b| s.wrapping_add(b));
            packet.push(!sum);
            self.rx.extend(packet);
        }
    }

    impl Read for ScriptedPort {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.rx.is_empty() {
                return Err(io::ErrorKind::TimedOut.into());
            }
            let n = buf.len().min(self.rx.len());
            for (slot, byte) in buf.iter_mut().zip(self.rx.drain(..n)) {
                *slot = byte;
            }
            Ok(n)
        }
    }

    impl Write for ScriptedPort {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.tx.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }
}
