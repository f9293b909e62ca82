use log_tailer::{Config, Tailer, WatcherConfig};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::time::Duration;
use tokio_stream::StreamExt;

const POLL: WatcherConfig = WatcherConfig::fixed(Duration::from_millis(50));

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== Log Tailer Comprehensive Example ===\n");

    let dir = tempfile::tempdir()?;
    let path = dir.path().join("app.log");
    fs::write(&path, "INFO starting\nWARN disk almost full\n")?;

    // Example 1: Reading lines and remembering where to resume
    println!("1. Basic usage - reading lines with offsets:");
    let resume_at = basic_usage(&path).await?;

    println!("\n{}\n", "=".repeat(50));

    // Example 2: Resuming from a saved offset across a rotation
    println!("2. Resuming - continuing from offset {} across a rotation:", resume_at);
    resume_across_rotation(&path, resume_at).await?;

    println!("\n{}\n", "=".repeat(50));

    // Example 3: Stream of lines with per-level counts
    println!("3. Streaming - counting lines by log level:");
    stream_processing(&path).await?;

    Ok(())
}

async fn basic_usage(path: &Path) -> Result<u64, Box<dyn std::error::Error>> {
    let tailer = Tailer::new(Config::new(path).with_watcher(POLL)).await?;

    let mut offset = 0;
    for _ in 0..2 {
        let line = tailer.next_line().await?;
        println!("  [{}] {}", line.byte_offset, line.text);
        offset = line.byte_offset;
    }

    tailer.stop().await?;
    Ok(offset)
}

async fn resume_across_rotation(
    path: &Path,
    offset: u64,
) -> Result<(), Box<dyn std::error::Error>> {
    let tailer = Tailer::new(Config::new(path).with_offset(offset).with_watcher(POLL)).await?;

    append(path, "ERROR request failed\n")?;
    let line = tailer.next_line().await?;
    println!("  before rotation: [{}] {}", line.byte_offset, line.text);

    let rotated = path.with_extension("log.1");
    fs::rename(path, &rotated)?;
    fs::write(path, "INFO fresh file\n")?;

    let line = tailer.next_line().await?;
    println!("  after rotation:  [{}] {}", line.byte_offset, line.text);

    tailer.stop().await?;
    Ok(())
}

async fn stream_processing(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    append(path, "DEBUG cache warm\nERROR timeout\nINFO done\n")?;

    let mut stream = Tailer::new(Config::new(path).with_watcher(POLL))
        .await?
        .into_stream();

    let timeout_duration = Duration::from_millis(200);
    let mut counts = std::collections::BTreeMap::new();

    while let Ok(Some(line)) = tokio::time::timeout(timeout_duration, stream.next()).await {
        match line {
            Ok(line) => {
                let level = line.text.split_whitespace().next().unwrap_or("").to_string();
                *counts.entry(level).or_insert(0) += 1;
            }
            Err(e) => {
                eprintln!("  Error: {}", e);
                break;
            }
        }
    }

    println!("  Log level statistics:");
    for (level, count) in counts {
        println!("    {}: {} lines", level, count);
    }

    Ok(())
}

fn append(path: &Path, content: &str) -> std::io::Result<()> {
    let mut file = OpenOptions::new().append(true).open(path)?;
    file.write_all(content.as_bytes())?;
    file.sync_all()
}
