use std::io;
use std::io::prelude::*;

use tracing_subscriber::prelude::*;

use reactor_volume::Reactor;

/// Envelope side used when the caller gives none; matches the classic
/// -50..50 problem envelope.
const DEFAULT_SIDE_SIZE: u32 = 101;

fn run(side_size: u32) -> Result<u64, String> {
    let mut reactor = Reactor::new(side_size).map_err(|e| e.to_string())?;
    for line in io::BufReader::new(io::stdin()).lines() {
        let line = line.map_err(|e| format!("failed to read input: {}", e))?;
        reactor.process_step(&line).map_err(|e| e.to_string())?;
    }
    Ok(reactor.on_count())
}

fn main() {
    let fmt_layer = tracing_subscriber::fmt::layer().with_target(true);
    let filter_layer = match tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new("info"))
    {
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(1);
        }
        Ok(layer) => layer,
    };

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt_layer)
        .init();

    // Optional first argument: envelope side size (odd, or 0 for an
    // unbounded sparse reactor).
    let side_size: u32 = match std::env::args().nth(1) {
        None => DEFAULT_SIDE_SIZE,
        Some(arg) => match arg.parse() {
            Ok(n) => n,
            Err(e) => {
                eprintln!("bad side size '{}': {}", arg, e);
                std::process::exit(1);
            }
        },
    };

    match run(side_size) {
        Ok(count) => {
            println!("{}", count);
        }
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(1);
        }
    }
}
