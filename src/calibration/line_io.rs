// Line-oriented console I/O for the calibration session

use serialport::SerialPort;
use std::io::{self, BufRead, ErrorKind, Read, Write};
use std::time::Duration;

pub const DEFAULT_READ_TIMEOUT_MS: u64 = 100;

pub trait LineIo {
    /// Next line without its terminator; `None` once the input is closed
    fn read_line(&mut self) -> io::Result<Option<String>>;

    fn write_line(&mut self, line: &str) -> io::Result<()>;
}

/// Terminal on stdin/stdout
pub struct StdioLines {
    stdin: io::Stdin,
    stdout: io::Stdout,
}

impl StdioLines {
    pub fn new() -> Self {
        Self {
            stdin: io::stdin(),
            stdout: io::stdout(),
        }
    }
}

impl Default for StdioLines {
    fn default() -> Self {
        Self::new()
    }
}

impl LineIo for StdioLines {
    fn read_line(&mut self) -> io::Result<Option<String>> {
        let mut line = String::new();
        if self.stdin.lock().read_line(&mut line)? == 0 {
            return Ok(None);
        }
        let trimmed = line.trim_end_matches(['\r', '\n']).len();
        line.truncate(trimmed);
        Ok(Some(line))
    }

    fn write_line(&mut self, line: &str) -> io::Result<()> {
        let mut out = self.stdout.lock();
        writeln!(out, "{}", line)?;
        out.flush()
    }
}

/// Serial console. A line ends on `\n` or `\r`; the `\n` of a `\r\n` pair is
/// swallowed so it does not produce an empty line. Read timeouts just mean
/// the operator has not typed anything yet.
pub struct SerialLines<P: Read + Write = Box<dyn SerialPort>> {
    port: P,
    after_cr: bool,
}

impl SerialLines {
    pub fn open(path: &str, baudrate: u32) -> Result<Self, serialport::Error> {
        let port = serialport::new(path, baudrate)
            .timeout(Duration::from_millis(DEFAULT_READ_TIMEOUT_MS))
            .open()?;
        Ok(Self::new(port))
    }
}

impl<P: Read + Write> SerialLines<P> {
    pub fn new(port: P) -> Self {
        Self {
            port,
            after_cr: false,
        }
    }
}

impl<P: Read + Write> LineIo for SerialLines<P> {
    fn read_line(&mut self) -> io::Result<Option<String>> {
        let mut bytes = Vec::new();
        let mut byte = [0u8; 1];
        loop {
            match self.port.read(&mut byte) {
                Ok(0) if bytes.is_empty() => return Ok(None),
                Ok(0) => break,
                Ok(_) => {}
                Err(e) if matches!(e.kind(), ErrorKind::TimedOut | ErrorKind::Interrupted) => {
                    continue;
                }
                Err(e) => return Err(e),
            }

            let after_cr = std::mem::replace(&mut self.after_cr, byte[0] == b'\r');
            match byte[0] {
                b'\n' if after_cr => continue,
                b'\n' | b'\r' => break,
                b => bytes.push(b),
            }
        }
        Ok(Some(String::from_utf8_lossy(&bytes).into_owned()))
    }

    fn write_line(&mut self, line: &str) -> io::Result<()> {
        self.port.write_all(line.as_bytes())?;
        self.port.write_all(b"\r\n")?;
        self.port.flush()
    }
}
