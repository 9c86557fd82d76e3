mod client;
mod scan;

use anyhow::Result;
use clap::{Parser, Subcommand};
use client::DaemonClient;
use scan::{scan_wav, ScanOptions};
use shared::ipc::{Command, Response};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "wakegate")]
#[command(about = "CLI tool for the wakegate loudness trigger daemon")]
struct Cli {
    /// Daemon socket (defaults to $XDG_RUNTIME_DIR/wakegated.sock)
    #[arg(long, global = true)]
    socket: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    Start,
    Stop,
    Toggle,
    Status,
    /// Re-arm the detector, discarding the current loud run
    Reset,
    /// Run a 16-bit PCM WAV file through the detector offline
    Scan {
        file: PathBuf,
        #[arg(long, default_value_t = shared::DEFAULT_THRESHOLD)]
        threshold: u32,
        #[arg(long, default_value_t = shared::DEFAULT_REQUIRED)]
        required: u32,
        #[arg(long, default_value_t = 512, value_parser = clap::value_parser!(u32).range(1..))]
        block_size: u32,
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let command = match cli.command {
        Commands::Start => Command::Start,
        Commands::Stop => Command::Stop,
        Commands::Toggle => Command::Toggle,
        Commands::Status => Command::Status,
        Commands::Reset => Command::Reset,
        Commands::Scan {
            file,
            threshold,
            required,
            block_size,
            json,
        } => {
            let options = ScanOptions {
                threshold,
                required,
                block_size: block_size as usize,
            };
            return run_scan(&file, options, json);
        }
    };

    let client = DaemonClient::new(cli.socket);
    match client.send_command(command).await {
        Ok(Response::Ok) => {
            println!("Success");
        }
        Ok(Response::Status(info)) => {
            println!("Status:");
            println!("  Running: {}", info.is_running);
            println!("  Active: {}", info.is_active);
            println!("  Threshold: {}", info.threshold);
            println!("  Required: {}", info.required);
            println!("  Loud run: {}/{}", info.consecutive, info.required);
            println!("  Blocks: {}", info.blocks_processed);
            println!("  Triggers: {}", info.triggers);
        }
        Ok(Response::Error(msg)) => {
            eprintln!("Error: {}", msg);
            std::process::exit(1);
        }
        Err(e) => {
            eprintln!("Failed to connect to wakegated: {}", e);
            std::process::exit(1);
        }
    }

    Ok(())
}

fn run_scan(file: &Path, options: ScanOptions, json: bool) -> Result<()> {
    let report = scan_wav(file, options)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    for trigger in &report.triggers {
        println!(
            "Trigger at block {} ({} ms, average {})",
            trigger.block_index, trigger.offset_ms, trigger.average
        );
    }
    println!(
        "{} blocks of {} samples at {} Hz, {} trigger(s)",
        report.blocks,
        options.block_size,
        report.sample_rate,
        report.triggers.len()
    );

    Ok(())
}
