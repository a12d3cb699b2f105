use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tracing::info;
use xbeeprims_link::{LinkConfig, XBeeLink};
use xbeeprims_transport::{SerialConfig, SerialTransport};

use crate::cmd::{parse_duration, ListenArgs};
use crate::exit::{link_error, transport_error, CliError, CliResult, SUCCESS};
use crate::output::{print_frame, OutputFormat};

// Bounds how long a ctrl-c takes to be noticed.
const RECEIVE_SLICE: Duration = Duration::from_millis(200);

pub fn run(args: ListenArgs, format: OutputFormat) -> CliResult<i32> {
    let poll_interval = parse_duration(&args.poll_interval)?;
    let serial = SerialConfig::default().with_baud_rate(args.baud);
    let transport = SerialTransport::open_with_config(&args.device, &serial)
        .map_err(|err| transport_error("open failed", err))?;

    let config = LinkConfig::for_mode(args.mode.into()).with_poll_interval(poll_interval);
    let link = XBeeLink::open_with_config(transport, config)
        .map_err(|err| link_error("link start failed", err))?;

    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(running.clone())?;

    let mut printed = 0usize;

    while running.load(Ordering::SeqCst) {
        let frame = match link.receive_timeout(RECEIVE_SLICE) {
            Ok(Some(frame)) => frame,
            Ok(None) => continue,
            Err(err) => return Err(link_error("receive failed", err)),
        };

        if let Some(types) = &args.types {
            if !types.contains(&frame.frame_type) {
                continue;
            }
        }

        print_frame(&frame, format);
        printed = printed.saturating_add(1);

        if let Some(count) = args.count {
            if printed >= count {
                break;
            }
        }
    }

    let stats = link.stats();
    link.shutdown()
        .map_err(|err| link_error("shutdown failed", err))?;
    info!(
        printed,
        bytes_read = stats.bytes_read,
        delivered = stats.frames_delivered,
        discarded = stats.frames_discarded,
        read_failures = stats.read_failures,
        "listen finished"
    );

    Ok(SUCCESS)
}

fn install_ctrlc_handler(running: Arc<AtomicBool>) -> CliResult<()> {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .map_err(|err| {
        CliError::new(
            crate::exit::INTERNAL,
            format!("signal handler setup failed: {err}"),
        )
    })
}
