use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Args, Subcommand};
use cointoss_flip::CoinSide;
use cointoss_frame::{LabelPolicy, DEFAULT_MAX_FRAME_SIZE};
use cointoss_transport::IMAGE_PATH;

use crate::exit::{io_error, CliError, CliResult, USAGE};
use crate::output::OutputFormat;

pub mod encode;
pub mod flip;
pub mod inspect;
pub mod listen;
pub mod send;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Send a custom coin over a device channel.
    Send(SendArgs),
    /// Receive custom coins and install them into a store.
    Listen(ListenArgs),
    /// Flip a coin.
    Flip(FlipArgs),
    /// Decode a frame file and describe its contents.
    Inspect(InspectArgs),
    /// Write a frame file from two images and a name.
    Encode(EncodeArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Send(args) => send::run(args, format),
        Command::Listen(args) => listen::run(args, format),
        Command::Flip(args) => flip::run(args, format),
        Command::Inspect(args) => inspect::run(args, format),
        Command::Encode(args) => encode::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

/// The two faces and name of a coin, read from files.
#[derive(Args, Debug)]
pub struct CoinArgs {
    /// Heads image file.
    #[arg(long, value_name = "FILE")]
    pub heads: PathBuf,
    /// Tails image file.
    #[arg(long, value_name = "FILE")]
    pub tails: PathBuf,
    /// Coin name.
    #[arg(long)]
    pub name: String,
}

#[derive(Args, Debug)]
pub struct SendArgs {
    /// Socket path of the receiving device.
    #[arg(env = "COINTOSS_SOCKET")]
    pub socket: PathBuf,
    #[command(flatten)]
    pub coin: CoinArgs,
    /// Channel path to open.
    #[arg(long, default_value = IMAGE_PATH)]
    pub channel_path: String,
    /// Write timeout (e.g. 5s, 500ms).
    #[arg(long, default_value = "10s")]
    pub timeout: String,
    /// Refuse to send frames larger than this many bytes.
    #[arg(long, default_value_t = DEFAULT_MAX_FRAME_SIZE)]
    pub max_frame_size: usize,
}

#[derive(Args, Debug)]
pub struct ListenArgs {
    /// Socket path to bind.
    #[arg(env = "COINTOSS_SOCKET")]
    pub socket: PathBuf,
    /// Store directory for received coins.
    #[arg(long, value_name = "DIR", env = "COINTOSS_STORE_DIR")]
    pub store: PathBuf,
    /// Channel path that carries coin transfers.
    #[arg(long, default_value = IMAGE_PATH)]
    pub channel_path: String,
    /// Exit after installing N coins.
    #[arg(long)]
    pub count: Option<usize>,
    /// Per-channel read timeout (e.g. 5s, 500ms).
    #[arg(long, default_value = "30s")]
    pub timeout: String,
    /// Drop frames larger than this many bytes.
    #[arg(long, default_value_t = DEFAULT_MAX_FRAME_SIZE)]
    pub max_frame_size: usize,
    /// Accept names that are not valid UTF-8, replacing bad bytes.
    #[arg(long)]
    pub lossy_names: bool,
}

#[derive(Args, Debug)]
pub struct FlipArgs {
    /// Seed for a reproducible sequence.
    #[arg(long)]
    pub seed: Option<u64>,
    /// Number of flips.
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..=10_000))]
    pub count: u32,
    /// Side showing before the first flip.
    #[arg(long, default_value = "heads")]
    pub from: CoinSide,
    /// Sample each flip's animation at this many evenly spaced points.
    #[arg(long, value_name = "STEPS", value_parser = clap::value_parser!(u32).range(1..=1_000))]
    pub timeline: Option<u32>,
}

#[derive(Args, Debug)]
pub struct InspectArgs {
    /// Frame file to decode.
    pub file: PathBuf,
    /// Write the heads and tails images into this directory.
    #[arg(long, value_name = "DIR")]
    pub extract: Option<PathBuf>,
    /// Accept names that are not valid UTF-8, replacing bad bytes.
    #[arg(long)]
    pub lossy_names: bool,
}

#[derive(Args, Debug)]
pub struct EncodeArgs {
    #[command(flatten)]
    pub coin: CoinArgs,
    /// Frame file to write.
    #[arg(long, short = 'o', value_name = "FILE")]
    pub output: PathBuf,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

pub fn label_policy(lossy: bool) -> LabelPolicy {
    if lossy {
        LabelPolicy::Replace
    } else {
        LabelPolicy::Reject
    }
}

pub fn read_file(path: &Path) -> CliResult<Vec<u8>> {
    std::fs::read(path).map_err(|err| io_error(&format!("failed reading {}", path.display()), err))
}

pub fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, millis) = match input.strip_suffix("ms") {
        Some(number) => (number, true),
        None => (input.strip_suffix('s').unwrap_or(input), false),
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration: {input}")))?;
    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    Ok(if millis {
        Duration::from_millis(value)
    } else {
        Duration::from_secs(value)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_duration_seconds_and_millis() {
        assert_eq!(parse_duration("2s").unwrap(), Duration::from_secs(2));
        assert_eq!(parse_duration("150ms").unwrap(), Duration::from_millis(150));
        assert_eq!(parse_duration("3").unwrap(), Duration::from_secs(3));
    }

    #[test]
    fn parse_duration_rejects_invalid_values() {
        for bad in ["", "0s", "bad", "5m"] {
            let err = parse_duration(bad).unwrap_err();
            assert_eq!(err.code, USAGE, "{bad:?}");
        }
    }

    #[test]
    fn lossy_flag_selects_replace() {
        assert_eq!(label_policy(true), LabelPolicy::Replace);
        assert_eq!(label_policy(false), LabelPolicy::Reject);
    }
}
