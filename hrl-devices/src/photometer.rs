use hrl_core::{HrlError, HrlResult, Photometer, PhotometerKind, PhotometerLink};
use serialport::{DataBits, FlowControl, Parity, SerialPort, StopBits};
use std::io::{BufRead, BufReader, ErrorKind, Read, Write};
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_PORT: &str = "/dev/ttyUSB0";

/// How long a reply may take. A Minolta measurement alone takes about a second.
pub const DEFAULT_REPLY_TIMEOUT: Duration = Duration::from_secs(5);

/// The request/reply shape of a photometer's measurement command, and the
/// serial line settings it talks over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Protocol {
    pub command: &'static str,
    /// Prefix of a successful reply, if the device sends a status code.
    pub ok_prefix: Option<&'static str>,
    pub error_prefix: Option<&'static str>,
    pub baud_rate: u32,
    pub data_bits: DataBits,
    pub parity: Parity,
    pub stop_bits: StopBits,
}

impl Protocol {
    pub fn for_kind(kind: PhotometerKind) -> Self {
        match kind {
            PhotometerKind::Minolta => Protocol {
                command: "MES",
                ok_prefix: Some("OK"),
                error_prefix: Some("ER"),
                baud_rate: 4800,
                data_bits: DataBits::Seven,
                parity: Parity::Even,
                stop_bits: StopBits::Two,
            },
            PhotometerKind::OptiCal => Protocol {
                command: "L",
                ok_prefix: None,
                error_prefix: None,
                baud_rate: 9600,
                data_bits: DataBits::Eight,
                parity: Parity::None,
                stop_bits: StopBits::One,
            },
        }
    }

    /// Extracts the luminance from a reply. With a status prefix the value
    /// is the last comma-separated field, e.g. `OK00,+123.45`.
    pub fn parse(&self, reply: &str) -> HrlResult<f64> {
        let reply = reply.trim();
        if let Some(err) = self.error_prefix {
            if reply.starts_with(err) {
                return Err(HrlError::Photometer(reply.to_string()));
            }
        }
        let value = match self.ok_prefix {
            Some(ok) if !reply.starts_with(ok) => {
                return Err(HrlError::Photometer(format!("unexpected reply '{reply}'")));
            }
            Some(_) => reply.rsplit(',').next().unwrap_or(reply).trim(),
            None => reply,
        };
        value
            .parse()
            .map_err(|_| HrlError::Photometer(format!("unreadable luminance in '{reply}'")))
    }
}

/// Photometer that answers each command with one line.
#[derive(Debug)]
pub struct LinePhotometer<L> {
    link: L,
    protocol: Protocol,
}

impl<L: PhotometerLink> LinePhotometer<L> {
    pub fn new(link: L, protocol: Protocol) -> Self {
        Self { link, protocol }
    }
}

impl<L: PhotometerLink> Photometer for LinePhotometer<L> {
    fn read_luminance(&mut self) -> HrlResult<f64> {
        let reply = self.link.transact(self.protocol.command)?;
        let luminance = self.protocol.parse(&reply)?;
        tracing::debug!(luminance, "photometer sample");
        Ok(luminance)
    }
}

/// Line-oriented link over any byte stream, typically a serial tty.
/// Commands are terminated with `\r\n`; replies end at `\n`.
#[derive(Debug)]
pub struct SerialLink<T> {
    port: BufReader<T>,
}

impl<T: Read + Write> SerialLink<T> {
    pub fn new(port: T) -> Self {
        Self {
            port: BufReader::new(port),
        }
    }
}

impl SerialLink<Box<dyn SerialPort>> {
    /// Opens a serial device such as `/dev/ttyUSB0` with the line settings
    /// of `protocol`. Reads give up after `timeout`.
    pub fn open(path: &Path, protocol: &Protocol, timeout: Duration) -> HrlResult<Self> {
        let port = serialport::new(path.to_string_lossy(), protocol.baud_rate)
            .data_bits(protocol.data_bits)
            .parity(protocol.parity)
            .stop_bits(protocol.stop_bits)
            .flow_control(FlowControl::None)
            .timeout(timeout)
            .open()
            .map_err(|e| HrlError::Device(format!("opening {}: {e}", path.display())))?;
        tracing::info!(
            port = %path.display(),
            baud = protocol.baud_rate,
            ?timeout,
            "photometer port opened"
        );
        Ok(Self::new(port))
    }
}

impl<T: Read + Write> PhotometerLink for SerialLink<T> {
    fn transact(&mut self, command: &str) -> HrlResult<String> {
        let port = self.port.get_mut();
        write!(port, "{command}\r\n")?;
        port.flush()?;

        let mut reply = String::new();
        match self.port.read_line(&mut reply) {
            Ok(0) => Err(HrlError::Device("photometer closed the connection".into())),
            Ok(_) => Ok(reply.trim_end().to_string()),
            Err(e) if e.kind() == ErrorKind::TimedOut => {
                Err(HrlError::Timeout(command.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }
}
