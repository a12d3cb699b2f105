use tracing::info;
use xbeeprims_frame::FrameWriter;
use xbeeprims_link::{LinkConfig, XBeeLink};
use xbeeprims_transport::{SerialConfig, SerialTransport};

use crate::cmd::{parse_duration, SendArgs};
use crate::exit::{
    frame_error, link_error, transport_error, CliError, CliResult, SUCCESS, TIMEOUT,
};
use crate::output::{print_frame, OutputFormat};

pub fn run(args: SendArgs, format: OutputFormat) -> CliResult<i32> {
    let wait_timeout = parse_duration(&args.wait_timeout)?;
    let mode = args.transmit.mode();
    let request = args.transmit.request()?;

    let serial = SerialConfig::default().with_baud_rate(args.baud);
    let transport = SerialTransport::open_with_config(&args.device, &serial)
        .map_err(|err| transport_error("open failed", err))?;

    if !args.wait {
        let mut writer = FrameWriter::with_mode(transport, mode);
        let written = writer
            .send(&request)
            .map_err(|err| frame_error("send failed", err))?;
        info!(bytes = written, device = %args.device.display(), "sent");
        return Ok(SUCCESS);
    }

    let link = XBeeLink::open_with_config(transport, LinkConfig::for_mode(mode))
        .map_err(|err| link_error("link start failed", err))?;
    let written = link
        .send(&request)
        .map_err(|err| link_error("send failed", err))?;
    info!(bytes = written, device = %args.device.display(), "sent");

    // Transmit status frames (0x89, 0x8B) are shorter than the smallest
    // candidate the assembler accepts, so the first delivered frame is the
    // remote's reply.
    let response = link
        .receive_timeout(wait_timeout)
        .map_err(|err| link_error("receive failed", err))?;
    link.shutdown()
        .map_err(|err| link_error("shutdown failed", err))?;

    match response {
        Some(frame) => {
            print_frame(&frame, format);
            Ok(SUCCESS)
        }
        None => Err(CliError::new(
            TIMEOUT,
            format!("no response within {wait_timeout:?}"),
        )),
    }
}
