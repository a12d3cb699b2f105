use std::io::{IsTerminal, Write};
use std::time::{SystemTime, UNIX_EPOCH};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;
use xbeeprims_frame::{frame_type_name, AddressingMode, ApiFrame, Frame, HexBytes, SourceAddress};

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
struct FrameOutput {
    frame_type: String,
    type_name: &'static str,
    length: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    source: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    rssi_dbm: Option<i16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    frame_id: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    delivery_status: Option<u8>,
    payload_size: usize,
    payload: String,
    timestamp: String,
}

impl FrameOutput {
    fn new(frame: &Frame) -> (Self, Vec<u8>) {
        let mut out = Self {
            frame_type: format!("0x{:02x}", frame.frame_type),
            type_name: frame_type_name(frame.frame_type),
            length: frame.content_len(),
            source: None,
            rssi_dbm: None,
            frame_id: None,
            delivery_status: None,
            payload_size: frame.data.len(),
            payload: String::new(),
            timestamp: now_unix_seconds(),
        };

        let payload = match ApiFrame::parse(frame) {
            Ok(ApiFrame::Receive(packet)) => {
                out.source = Some(source_label(&packet.source));
                out.rssi_dbm = packet.rssi_dbm();
                packet.data.to_vec()
            }
            Ok(ApiFrame::TransmitStatus(status)) => {
                out.frame_id = Some(status.frame_id);
                out.delivery_status = Some(status.delivery);
                Vec::new()
            }
            Ok(ApiFrame::Other(frame)) => frame.data.to_vec(),
            Err(err) => {
                tracing::debug!(error = %err, "frame body not decodable, showing raw data");
                frame.data.to_vec()
            }
        };

        out.payload_size = payload.len();
        out.payload = payload_preview(&payload);
        (out, payload)
    }
}

pub fn print_frame(frame: &Frame, format: OutputFormat) {
    let (out, payload) = FrameOutput::new(frame);
    match format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["TYPE", "SOURCE", "RSSI", "SIZE", "PAYLOAD"])
                .add_row(vec![
                    out.type_name.to_string(),
                    out.source.clone().unwrap_or_else(|| "-".to_string()),
                    out.rssi_dbm
                        .map(|rssi| format!("{rssi} dBm"))
                        .unwrap_or_else(|| "-".to_string()),
                    out.payload_size.to_string(),
                    out.payload.clone(),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            let mut line = format!("type={} ({})", out.frame_type, out.type_name);
            if let Some(source) = &out.source {
                line.push_str(&format!(" source={source}"));
            }
            if let Some(rssi) = out.rssi_dbm {
                line.push_str(&format!(" rssi={rssi}dBm"));
            }
            if let (Some(id), Some(status)) = (out.frame_id, out.delivery_status) {
                line.push_str(&format!(" frame_id={id} status=0x{status:02x}"));
            }
            println!("{line} size={} payload={}", out.payload_size, out.payload);
        }
        OutputFormat::Raw => {
            print_raw(&payload);
        }
    }
}

#[derive(Serialize)]
struct WireOutput<'a> {
    mode: &'a str,
    frame_type: String,
    payload_size: usize,
    wire_size: usize,
    wire: String,
}

pub fn print_wire(
    wire: &[u8],
    frame_type: u8,
    payload_size: usize,
    mode: AddressingMode,
    format: OutputFormat,
) {
    let out = WireOutput {
        mode: mode.name(),
        frame_type: format!("0x{frame_type:02x}"),
        payload_size,
        wire_size: wire.len(),
        wire: HexBytes(wire).to_string(),
    };
    match format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["MODE", "TYPE", "PAYLOAD", "WIRE SIZE", "WIRE"])
                .add_row(vec![
                    out.mode.to_string(),
                    out.frame_type.clone(),
                    out.payload_size.to_string(),
                    out.wire_size.to_string(),
                    out.wire.clone(),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "mode={} type={} payload={} wire_size={} wire={}",
                out.mode, out.frame_type, out.payload_size, out.wire_size, out.wire
            );
        }
        OutputFormat::Raw => print_raw(wire),
    }
}

pub fn print_raw(data: &[u8]) {
    let mut out = std::io::stdout();
    let _ = out.write_all(data);
    let _ = out.flush();
}

fn source_label(source: &SourceAddress) -> String {
    match source {
        SourceAddress::Short(address) => format!("0x{address:04x}"),
        SourceAddress::Extended {
            address64,
            address16: Some(address16),
        } => format!("0x{address64:016x}/0x{address16:04x}"),
        SourceAddress::Extended {
            address64,
            address16: None,
        } => format!("0x{address64:016x}"),
    }
}

fn payload_preview(payload: &[u8]) -> String {
    match std::str::from_utf8(payload) {
        Ok(text) => text.to_string(),
        Err(_) => format!("<binary {}>", HexBytes(payload)),
    }
}

fn now_unix_seconds() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs().to_string())
        .unwrap_or_else(|_| "0".to_string())
}
