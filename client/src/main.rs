//! smbcore - legacy file-sharing client core
//!
//! Small front end over the protocol and client crates: status lookup,
//! NT hash derivation and chunked reads from a local share.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tracing::info;
use tracing_subscriber::EnvFilter;

use smbcore::config::Config;
use smbcore::{ChunkedReader, CountingGate, LocalFileSource};

#[derive(Parser, Debug)]
#[command(name = "smbcore")]
#[command(author = "Florian Schüller <schuellerf@gmail.com>")]
#[command(version = "0.1.0")]
#[command(about = "Legacy file-sharing client core", long_about = None)]
struct Args {
    /// Configuration file path
    #[arg(short, long, default_value = "client.conf")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Describe an NTSTATUS code (hex with 0x prefix, or decimal)
    Status { code: String },

    /// Print the NT hash of a password
    NtHash { password: String },

    /// Read a file from the share through the chunked reader
    Read {
        /// Path relative to the share root
        path: String,

        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = Config::load_or_default(&args.config)?;

    // RUST_LOG wins over the configured level
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.logging.level))
        .with_context(|| format!("Invalid log level: {}", config.logging.level))?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match args.command {
        Command::Status { code } => run_status(&code),
        Command::NtHash { password } => {
            println!("{}", protocol::crypto::to_hex(&protocol::ntlm::nt_hash(&password)));
            Ok(())
        }
        Command::Read { path, output } => run_read(&config, &path, output).await,
    }
}

fn parse_status_code(text: &str) -> Result<u32> {
    let text = text.trim();
    let parsed = match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => text.parse(),
    };
    parsed.with_context(|| format!("Invalid status code: {}", text))
}

fn run_status(code: &str) -> Result<()> {
    let info = protocol::status_description(parse_status_code(code)?);

    println!("{}", info.code);
    println!("  {}", info.description);
    if info.localized_description != info.description {
        println!("  {}", info.localized_description);
    }
    match protocol::check_status(info.code.to_u32()) {
        Ok(_) => println!("  outcome: ok"),
        Err(e) => println!("  outcome: error ({})", e.status.name()),
    }
    Ok(())
}

async fn run_read(config: &Config, path: &str, output: Option<PathBuf>) -> Result<()> {
    let source = Arc::new(LocalFileSource::new(&config.general.share_root));
    let gate = Arc::new(CountingGate::new(config.transfer.max_parallel_reads.into()));
    let reader = ChunkedReader::new("cli", source.clone(), config.transfer.max_read_size)
        .with_gate(gate);

    info!(
        share = %source.root().display(),
        path,
        chunk = reader.max_read_size(),
        "reading file"
    );

    let handle = reader
        .open(path)
        .await
        .with_context(|| format!("Failed to open {}", path))?;
    let data = reader.read_all(handle).await;
    reader.close_file(handle).await?;
    reader.close();
    let data = data.with_context(|| format!("Failed to read {}", path))?;

    match output {
        Some(output_path) => {
            tokio::fs::write(&output_path, &data)
                .await
                .with_context(|| format!("Failed to write {:?}", output_path))?;
            info!("Wrote {} bytes to {:?}", data.len(), output_path);
        }
        None => {
            let mut stdout = tokio::io::stdout();
            stdout.write_all(&data).await?;
            stdout.flush().await?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_status_code() {
        assert_eq!(parse_status_code("0xC0000022").unwrap(), 0xC000_0022);
        assert_eq!(parse_status_code("0XC0000022").unwrap(), 0xC000_0022);
        assert_eq!(parse_status_code("259").unwrap(), 0x103);
        assert!(parse_status_code("0xZZ").is_err());
        assert!(parse_status_code("-1").is_err());
    }

    #[test]
    fn test_args_parse() {
        let args = Args::try_parse_from(["smbcore", "read", "docs/a.txt", "-o", "out.bin"]).unwrap();
        assert_eq!(args.config, PathBuf::from("client.conf"));
        assert!(matches!(
            args.command,
            Command::Read { ref path, output: Some(_) } if path == "docs/a.txt"
        ));
    }
}
