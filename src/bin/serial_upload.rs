use anyhow::{Context, Result};
use clap::Parser;
use slopemap::serial::{self, SerialLink, DEFAULT_BAUD_RATE, DEFAULT_LOG_FILE};
use slopemap::{logging, ApiClient};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "serial_upload")]
#[command(about = "Dump the logger's data file over serial and upload it", long_about = None)]
struct Args {
    /// Serial device (any readable and writable byte stream path)
    #[arg(long)]
    device: PathBuf,

    /// Route service base URL
    #[arg(long, default_value = "http://localhost:8080")]
    endpoint: String,

    /// File on the logger to read
    #[arg(long, default_value = DEFAULT_LOG_FILE)]
    file: String,

    /// Nominal line rate; configure the port itself beforehand
    #[arg(long, default_value_t = DEFAULT_BAUD_RATE)]
    baud: u32,
}

#[tokio::main]
async fn main() -> Result<()> {
    logging::init();
    let args = Args::parse();

    let device = tokio::fs::OpenOptions::new()
        .read(true)
        .write(true)
        .open(&args.device)
        .await
        .with_context(|| format!("Failed to open {}", args.device.display()))?;
    log::info!("Opened {} ({} baud)", args.device.display(), args.baud);

    let (reader, writer) = tokio::io::split(device);
    let mut link = SerialLink::new(reader, writer);
    let client = ApiClient::new(&args.endpoint)?;

    link.write_command(&serial::read_command(&args.file)).await?;
    let report = serial::pump(&mut link, &client).await?;

    log::info!(
        "Serial stream closed: {} chunk(s), {} uploaded, {} failed, {} point(s) stored",
        report.chunks,
        report.uploaded,
        report.failed,
        report.points
    );
    Ok(())
}
