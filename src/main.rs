use clap::Parser;
use log_tailer::{Compression, Config, Error, Tailer, WatcherConfig};
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Follow a file and print every line written to it, surviving rotation,
/// truncation and deletion.
#[derive(Parser, Debug)]
#[command(name = "tailer", version, about)]
struct Args {
    /// File to follow
    path: PathBuf,

    /// Byte offset to start reading from
    #[arg(long, default_value_t = 0)]
    offset: u64,

    /// Encoding label of the file, e.g. UTF-16LE
    #[arg(long)]
    encoding: Option<String>,

    /// Compression format of the file: gz, z or bz2. The file is read once
    /// to the end instead of being followed.
    #[arg(long)]
    compression: Option<Compression>,

    /// Shortest interval between metadata polls
    #[arg(long, value_parser = humantime::parse_duration, default_value = "250ms")]
    min_poll: Duration,

    /// Longest interval between metadata polls
    #[arg(long, value_parser = humantime::parse_duration, default_value = "250ms")]
    max_poll: Duration,

    /// Prefix every line with the offset to resume from
    #[arg(long)]
    offsets: bool,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let mut config = Config::new(&args.path)
        .with_offset(args.offset)
        .with_watcher(WatcherConfig::new(args.min_poll, args.max_poll));
    if let Some(label) = args.encoding {
        config = config.with_encoding(label);
    }
    if let Some(compression) = args.compression {
        config = config.with_compression(compression);
    }

    let tailer = match Tailer::new(config).await {
        Ok(tailer) => Arc::new(tailer),
        Err(e) => {
            eprintln!("Error opening {}: {}", args.path.display(), e);
            process::exit(1);
        }
    };

    let stopper = Arc::clone(&tailer);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = stopper.stop().await;
        }
    });

    loop {
        match tailer.next_line().await {
            Ok(line) if args.offsets => println!("{}\t{}", line.byte_offset, line.text),
            Ok(line) => println!("{}", line.text),
            Err(Error::Cancelled | Error::EndOfInput) => break,
            Err(e @ Error::Decode { .. }) => eprintln!("Skipping line: {}", e),
            Err(e) => {
                eprintln!("Error reading {}: {}", args.path.display(), e);
                process::exit(1);
            }
        }
    }
}
