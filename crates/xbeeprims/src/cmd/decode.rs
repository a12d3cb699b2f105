use std::fs::File;
use std::io::{self, Cursor, Read};

use tracing::{info, warn};
use xbeeprims_frame::{FrameConfig, FrameError, FrameReader, HexBytes};

use crate::cmd::{parse_hex, DecodeArgs};
use crate::exit::{frame_error, io_error, CliError, CliResult, DATA_INVALID, SUCCESS};
use crate::output::{print_frame, OutputFormat};

pub fn run(args: DecodeArgs, format: OutputFormat) -> CliResult<i32> {
    let source: Box<dyn Read> = if let Some(hex) = &args.hex {
        Box::new(Cursor::new(parse_hex(hex)?))
    } else if let Some(path) = &args.input {
        let file = File::open(path)
            .map_err(|err| io_error(&format!("failed opening {}", path.display()), err))?;
        Box::new(file)
    } else {
        Box::new(io::stdin())
    };

    let mut reader = FrameReader::with_config(source, FrameConfig::for_mode(args.mode.into()));
    let mut decoded = 0usize;

    loop {
        match reader.read_frame() {
            Ok(frame) => {
                print_frame(&frame, format);
                decoded = decoded.saturating_add(1);
            }
            Err(FrameError::ConnectionClosed) => break,
            Err(err) => return Err(frame_error("read failed", err)),
        }
    }

    if !reader.pending().is_empty() {
        warn!(bytes = %HexBytes(reader.pending()), "input ended inside a frame");
    }
    info!(decoded, discarded = reader.discarded(), "decode finished");

    if decoded == 0 {
        return Err(CliError::new(DATA_INVALID, "no valid frames in input"));
    }
    Ok(SUCCESS)
}
