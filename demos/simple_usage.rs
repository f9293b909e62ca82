use log_tailer::{Config, tail_file};
use tokio_stream::StreamExt;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let path = std::env::args().nth(1).unwrap_or_else(|| "app.log".to_string());

    // Follow a log file and print each line with its resume offset
    let mut lines = tail_file(Config::new(&path)).await?;

    println!("Tailing {}...", path);

    let mut count = 0;
    while let Some(line) = lines.next().await {
        match line {
            Ok(line) => println!("[{}] {}", line.byte_offset, line.text),
            Err(e) => {
                eprintln!("Error: {}", e);
                break;
            }
        }

        count += 1;
        if count >= 10 {
            // Only show the first few lines for the demo
            break;
        }
    }

    Ok(())
}
