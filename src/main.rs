use crate::config::{Config, app_name, app_version};
use crate::stream::session::StreamSession;
use clap::{Arg, Command};
use log::{error, info};
use std::time::Duration;
use std::{panic, process};

pub mod assets;
pub mod config;
pub mod stream;
pub mod utils;

fn main() {
    tracing_subscriber::fmt::init();

    let matches = Command::new(app_name())
        .version(app_version())
        .author(env!("CARGO_PKG_AUTHORS"))
        .about(env!("CARGO_PKG_DESCRIPTION"))
        .arg(
            Arg::new("endpoint")
                .short('e')
                .long("endpoint")
                .value_name("URL")
                .help("WebSocket endpoint of the PCM stream source.")
                .default_value(assets::DEFAULT_ENDPOINT),
        )
        .arg(
            Arg::new("sample-rate")
                .short('r')
                .long("sample-rate")
                .value_name("HZ")
                .help("Output sample rate, must match the sender convention.")
                .value_parser(clap::value_parser!(u32))
                .default_value("44100"),
        )
        .arg(
            Arg::new("block")
                .short('b')
                .long("block")
                .value_name("FRAMES")
                .help("Frames per render callback.")
                .value_parser(clap::value_parser!(u32))
                .default_value("128"),
        )
        .arg(
            Arg::new("queue-depth")
                .short('q')
                .long("queue-depth")
                .value_name("CHUNKS")
                .help("Maximum buffered chunks before old audio is dropped (minimum 2).")
                .value_parser(clap::value_parser!(u64).range(2..))
                .default_value("10"),
        )
        .arg(
            Arg::new("retry-delay")
                .long("retry-delay")
                .value_name("MS")
                .help("Delay before a reconnection attempt.")
                .value_parser(clap::value_parser!(u64))
                .default_value("2000"),
        )
        .get_matches();

    let config = Config {
        endpoint: matches
            .get_one::<String>("endpoint")
            .cloned()
            .unwrap_or_else(|| assets::DEFAULT_ENDPOINT.to_string()),
        sample_rate: *matches
            .get_one::<u32>("sample-rate")
            .unwrap_or(&assets::SAMPLE_RATE),
        render_block: *matches
            .get_one::<u32>("block")
            .unwrap_or(&assets::RENDER_BLOCK_FRAMES),
        max_queue_chunks: matches
            .get_one::<u64>("queue-depth")
            .map(|v| *v as usize)
            .unwrap_or(assets::MAX_QUEUE_CHUNKS),
        retry_delay: Duration::from_millis(
            *matches
                .get_one::<u64>("retry-delay")
                .unwrap_or(&assets::RETRY_DELAY_MS),
        ),
        ..Config::default()
    };

    // kill the main thread as soon as a secondary thread panics
    let orig_hook = panic::take_hook();
    panic::set_hook(Box::new(move |panic_info| {
        // invoke the default handler and exit the process
        orig_hook(panic_info);
        process::exit(105);
    }));

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            error!("Failed to start async runtime: {}", e);
            process::exit(1);
        }
    };
    let _guard = runtime.enter();

    let mut session = StreamSession::new(config);
    if let Err(e) = session.start() {
        // resource acquisition at stream start is the one hard failure
        error!("Failed to start audio stream: {:#}", e);
        process::exit(1);
    }
    info!("{} {} streaming, Ctrl-C to stop", app_name(), app_version());

    // gracefully close the session on Ctrl-C
    let (stop_tx, stop_rx) = std::sync::mpsc::channel::<()>();
    ctrlc::set_handler(move || {
        let _ = stop_tx.send(());
    })
    .expect("Error setting Ctrl-C handler");

    let _ = stop_rx.recv();
    info!("stopping stream session");
    session.stop();
}
