use xbeeprims_frame::FrameWriter;

use crate::cmd::EncodeArgs;
use crate::exit::{frame_error, CliResult, SUCCESS};
use crate::output::{print_wire, OutputFormat};

pub fn run(args: EncodeArgs, format: OutputFormat) -> CliResult<i32> {
    let mode = args.transmit.mode();
    let request = args.transmit.request()?;

    let mut writer = FrameWriter::with_mode(Vec::new(), mode);
    writer
        .send(&request)
        .map_err(|err| frame_error("encode failed", err))?;
    let wire = writer.into_inner();

    print_wire(
        &wire,
        mode.transmit_frame_type(),
        request.payload.len(),
        mode,
        format,
    );
    Ok(SUCCESS)
}
