mod cmd;
mod exit;
mod logging;
mod output;

use clap::Parser;

use crate::cmd::Command;
use crate::logging::{init_logging, LogFormat, LogLevel};
use crate::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(name = "cointoss", version, about = "Send, receive and flip custom coins")]
struct Cli {
    /// Output format.
    #[arg(long, value_name = "FORMAT", global = true)]
    format: Option<OutputFormat>,

    /// Log output format (stderr).
    #[arg(long, value_name = "FORMAT", default_value = "text", global = true)]
    log_format: LogFormat,

    /// Minimum log level (stderr). `RUST_LOG` takes precedence when set.
    #[arg(
        long,
        value_name = "LEVEL",
        env = "COINTOSS_LOG_LEVEL",
        default_value = "info",
        global = true
    )]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Command,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_format, cli.log_level);

    let format = cli.format.unwrap_or_else(OutputFormat::default_for_stdout);

    match cmd::run(cli.command, format) {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(err.code);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_send_subcommand() {
        let cli = Cli::try_parse_from([
            "cointoss",
            "send",
            "/tmp/link.sock",
            "--heads",
            "heads.png",
            "--tails",
            "tails.png",
            "--name",
            "Lucky Coin",
        ])
        .expect("send args should parse");

        match cli.command {
            Command::Send(args) => {
                assert_eq!(args.coin.name, "Lucky Coin");
                assert_eq!(args.channel_path, cointoss_transport::IMAGE_PATH);
            }
            other => panic!("expected send, got {other:?}"),
        }
    }

    #[test]
    fn send_requires_both_faces() {
        let err = Cli::try_parse_from([
            "cointoss",
            "send",
            "/tmp/link.sock",
            "--heads",
            "heads.png",
            "--name",
            "x",
        ])
        .expect_err("missing --tails should fail");

        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn parses_flip_options() {
        let cli = Cli::try_parse_from([
            "cointoss", "flip", "--seed", "7", "--count", "3", "--from", "tails",
        ])
        .expect("flip args should parse");

        match cli.command {
            Command::Flip(args) => {
                assert_eq!(args.seed, Some(7));
                assert_eq!(args.count, 3);
                assert_eq!(args.from, cointoss_flip::CoinSide::Tails);
            }
            other => panic!("expected flip, got {other:?}"),
        }
    }

    #[test]
    fn flip_rejects_unknown_side() {
        let err = Cli::try_parse_from(["cointoss", "flip", "--from", "edge"])
            .expect_err("unknown side should fail");
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }

    #[test]
    fn flip_timeline_is_capped() {
        let err = Cli::try_parse_from(["cointoss", "flip", "--timeline", "4000000000"])
            .expect_err("oversized timeline should fail");
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);

        let err = Cli::try_parse_from(["cointoss", "flip", "--timeline", "1001"])
            .expect_err("timeline above cap should fail");
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);

        assert!(Cli::try_parse_from(["cointoss", "flip", "--timeline", "1000"]).is_ok());
    }

    #[test]
    fn parses_listen_with_count() {
        let cli = Cli::try_parse_from([
            "cointoss",
            "listen",
            "/tmp/link.sock",
            "--store",
            "/tmp/coins",
            "--count",
            "1",
        ])
        .expect("listen args should parse");
        assert!(matches!(cli.command, Command::Listen(_)));
    }
}
