use std::fs;
use std::path::PathBuf;

use clap::{Args, Subcommand, ValueEnum};
use xbeeprims_frame::{AddressingMode, TransmitRequest};
use xbeeprims_transport::DEFAULT_BAUD_RATE;

use crate::exit::{io_error, CliError, CliResult, USAGE};
use crate::output::OutputFormat;

pub mod decode;
pub mod encode;
pub mod listen;
pub mod send;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Send one transmit request to a device.
    Send(SendArgs),
    /// Print frames received from a device.
    Listen(ListenArgs),
    /// Encode a transmit request and print its wire bytes.
    Encode(EncodeArgs),
    /// Decode wire bytes from a file, stdin or the command line.
    Decode(DecodeArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Send(args) => send::run(args, format),
        Command::Listen(args) => listen::run(args, format),
        Command::Encode(args) => encode::run(args, format),
        Command::Decode(args) => decode::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

/// Addressing generation of the attached module.
#[derive(Copy, Clone, Debug, Default, ValueEnum)]
pub enum ModeArg {
    /// 16-bit addressing (type 0x01 transmit requests).
    #[default]
    Short,
    /// 64-bit addressing (type 0x10 transmit requests).
    Extended,
}

impl From<ModeArg> for AddressingMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Short => AddressingMode::Short16,
            ModeArg::Extended => AddressingMode::Extended64,
        }
    }
}

/// Payload and addressing shared by `send` and `encode`.
#[derive(Args, Debug)]
pub struct TransmitArgs {
    /// Addressing mode.
    #[arg(long, value_enum, default_value = "short")]
    pub mode: ModeArg,
    /// Raw string payload.
    #[arg(long, conflicts_with_all = ["hex", "file"])]
    pub data: Option<String>,
    /// Hex payload (whitespace ignored).
    #[arg(long, conflicts_with_all = ["data", "file"])]
    pub hex: Option<String>,
    /// Read payload from file.
    #[arg(long, conflicts_with_all = ["data", "hex"])]
    pub file: Option<PathBuf>,
    /// 16-bit destination address (decimal or 0x-prefixed). Default: broadcast.
    #[arg(long, short = 'a', value_parser = parse_u16)]
    pub address: Option<u16>,
    /// 64-bit destination address (extended mode only).
    #[arg(long, value_parser = parse_u64)]
    pub dest64: Option<u64>,
    /// Frame id; non-zero asks the module for a transmit status.
    #[arg(long, default_value = "0", value_parser = parse_u8)]
    pub frame_id: u8,
    /// Transmit options byte.
    #[arg(long, value_parser = parse_u8)]
    pub options: Option<u8>,
    /// Broadcast radius (extended mode only).
    #[arg(long, value_parser = parse_u8)]
    pub radius: Option<u8>,
}

impl TransmitArgs {
    pub fn mode(&self) -> AddressingMode {
        self.mode.into()
    }

    /// Build the request; an empty payload is left for the encoder to reject.
    pub fn request(&self) -> CliResult<TransmitRequest> {
        let mut request = TransmitRequest::new(self.payload()?).with_frame_id(self.frame_id);
        if let Some(address) = self.address {
            request = request.to(address);
        }
        if let Some(dest64) = self.dest64 {
            request = request.with_destination64(dest64);
        }
        if let Some(options) = self.options {
            request = request.with_options(options);
        }
        if let Some(radius) = self.radius {
            request = request.with_broadcast_radius(radius);
        }
        Ok(request)
    }

    fn payload(&self) -> CliResult<Vec<u8>> {
        if let Some(data) = &self.data {
            return Ok(data.as_bytes().to_vec());
        }
        if let Some(hex) = &self.hex {
            return parse_hex(hex);
        }
        if let Some(path) = &self.file {
            return fs::read(path)
                .map_err(|err| io_error(&format!("failed reading {}", path.display()), err));
        }
        Ok(Vec::new())
    }
}

#[derive(Args, Debug)]
pub struct SendArgs {
    /// Serial device to write to (e.g. /dev/ttyUSB0).
    pub device: PathBuf,
    /// Line speed; the port is opened 8N1.
    #[arg(long, default_value_t = DEFAULT_BAUD_RATE)]
    pub baud: u32,
    #[command(flatten)]
    pub transmit: TransmitArgs,
    /// Wait for one inbound frame and print it.
    #[arg(long)]
    pub wait: bool,
    /// Maximum time to wait when --wait is set (e.g. 5s, 500ms).
    #[arg(long, default_value = "5s")]
    pub wait_timeout: String,
}

#[derive(Args, Debug)]
pub struct ListenArgs {
    /// Serial device to read from (e.g. /dev/ttyUSB0).
    pub device: PathBuf,
    /// Line speed; the port is opened 8N1.
    #[arg(long, default_value_t = DEFAULT_BAUD_RATE)]
    pub baud: u32,
    /// Addressing mode.
    #[arg(long, value_enum, default_value = "short")]
    pub mode: ModeArg,
    /// Exit after receiving N frames.
    #[arg(long)]
    pub count: Option<usize>,
    /// Only print these frame types (comma-separated, e.g. 0x81,0x90).
    #[arg(long, value_delimiter = ',', value_parser = parse_u8)]
    pub types: Option<Vec<u8>>,
    /// Poll interval (e.g. 10ms).
    #[arg(long, default_value = "10ms")]
    pub poll_interval: String,
}

#[derive(Args, Debug)]
pub struct EncodeArgs {
    #[command(flatten)]
    pub transmit: TransmitArgs,
}

#[derive(Args, Debug)]
pub struct DecodeArgs {
    /// File holding raw wire bytes. Reads stdin when omitted.
    #[arg(conflicts_with = "hex")]
    pub input: Option<PathBuf>,
    /// Wire bytes as hex (whitespace ignored).
    #[arg(long)]
    pub hex: Option<String>,
    /// Addressing mode.
    #[arg(long, value_enum, default_value = "short")]
    pub mode: ModeArg,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

pub fn parse_hex(input: &str) -> CliResult<Vec<u8>> {
    let compact: String = input.chars().filter(|c| !c.is_whitespace()).collect();
    let compact = compact
        .strip_prefix("0x")
        .or_else(|| compact.strip_prefix("0X"))
        .unwrap_or(&compact);
    hex::decode(compact).map_err(|err| CliError::new(USAGE, format!("invalid hex: {err}")))
}

fn parse_number(input: &str) -> Result<u64, String> {
    let input = input.trim();
    let parsed = match input
        .strip_prefix("0x")
        .or_else(|| input.strip_prefix("0X"))
    {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => input.parse(),
    };
    parsed.map_err(|err| format!("invalid number {input:?}: {err}"))
}

fn parse_u8(input: &str) -> Result<u8, String> {
    let value = parse_number(input)?;
    u8::try_from(value).map_err(|_| format!("{input} does not fit in 8 bits"))
}

fn parse_u16(input: &str) -> Result<u16, String> {
    let value = parse_number(input)?;
    u16::try_from(value).map_err(|_| format!("{input} does not fit in 16 bits"))
}

fn parse_u64(input: &str) -> Result<u64, String> {
    parse_number(input)
}

pub fn parse_duration(input: &str) -> CliResult<std::time::Duration> {
    use std::time::Duration;

    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, millis) = if let Some(num) = input.strip_suffix("ms") {
        (num, true)
    } else if let Some(num) = input.strip_suffix('s') {
        (num, false)
    } else {
        (input, false)
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;

    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    if millis {
        Ok(Duration::from_millis(value))
    } else {
        Ok(Duration::from_secs(value))
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn numbers_accept_hex_and_decimal() {
        assert_eq!(parse_u16("0xFFFE"), Ok(0xFFFE));
        assert_eq!(parse_u16("42"), Ok(42));
        assert!(parse_u16("0x10000").is_err());
        assert_eq!(parse_u8("0x7e"), Ok(0x7E));
        assert!(parse_u8("256").is_err());
        assert_eq!(parse_u64("0x0013A20040000001"), Ok(0x0013_A200_4000_0001));
    }

    #[test]
    fn hex_payload_ignores_whitespace() {
        assert_eq!(parse_hex("7E 00 10\n81").unwrap(), vec![0x7E, 0x00, 0x10, 0x81]);
        assert_eq!(parse_hex("0x7d31").unwrap(), vec![0x7D, 0x31]);
        assert_eq!(parse_hex("7").unwrap_err().code, USAGE);
    }

    #[test]
    fn parse_duration_seconds_and_millis() {
        assert_eq!(parse_duration("2s").unwrap(), Duration::from_secs(2));
        assert_eq!(parse_duration("150ms").unwrap(), Duration::from_millis(150));
        assert_eq!(parse_duration("3").unwrap(), Duration::from_secs(3));
    }

    #[test]
    fn parse_duration_rejects_invalid_values() {
        assert!(parse_duration("0s").is_err());
        assert!(parse_duration("bad").is_err());
    }

    #[test]
    fn request_applies_overrides() {
        let args = TransmitArgs {
            mode: ModeArg::Extended,
            data: Some("hi".to_string()),
            hex: None,
            file: None,
            address: Some(0x1234),
            dest64: Some(0x0013_A200_4000_0001),
            frame_id: 3,
            options: Some(0),
            radius: Some(2),
        };
        let request = args.request().unwrap();

        assert_eq!(args.mode(), AddressingMode::Extended64);
        assert_eq!(&request.payload[..], b"hi");
        assert_eq!(request.address, Some(0x1234));
        assert_eq!(request.destination64, 0x0013_A200_4000_0001);
        assert_eq!(request.frame_id, 3);
        assert_eq!(request.options, 0);
        assert_eq!(request.broadcast_radius, 2);
    }
}
