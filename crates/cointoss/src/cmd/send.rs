use cointoss_frame::{CoinTransfer, TransferConfig, TransferWriter};
use cointoss_store::validate_name;
use cointoss_transport::ChannelClient;
use serde::Serialize;
use tracing::info;

use crate::cmd::{parse_duration, read_file, CoinArgs, SendArgs};
use crate::exit::{frame_error, store_error, transport_error, CliResult, SUCCESS};
use crate::output::{emit, human_size, OutputFormat, Report};

#[derive(Serialize)]
struct SentReport {
    channel_path: String,
    name: String,
    heads_size: usize,
    tails_size: usize,
    frame_size: usize,
}

impl Report for SentReport {
    const SCHEMA: &'static str = "coin-sent.schema.json";

    fn header(&self) -> Vec<&'static str> {
        vec!["CHANNEL", "NAME", "HEADS", "TAILS", "FRAME"]
    }

    fn rows(&self) -> Vec<Vec<String>> {
        vec![vec![
            self.channel_path.clone(),
            self.name.clone(),
            human_size(self.heads_size),
            human_size(self.tails_size),
            human_size(self.frame_size),
        ]]
    }

    fn pretty(&self) -> String {
        format!(
            "sent {:?} on {} ({} bytes)",
            self.name, self.channel_path, self.frame_size
        )
    }

    fn raw(&self) -> Vec<u8> {
        format!("{}\n", self.frame_size).into_bytes()
    }
}

/// Read both faces from disk and check the name the way the phone's editor does.
pub fn load_coin(args: &CoinArgs) -> CliResult<CoinTransfer> {
    let name = validate_name(&args.name).map_err(|err| store_error("invalid --name", err))?;
    let heads = read_file(&args.heads)?;
    let tails = read_file(&args.tails)?;
    Ok(CoinTransfer::new(heads, tails, name))
}

pub fn run(args: SendArgs, format: OutputFormat) -> CliResult<i32> {
    let transfer = load_coin(&args.coin)?;
    let config = TransferConfig {
        max_frame_size: args.max_frame_size,
        write_timeout: Some(parse_duration(&args.timeout)?),
        ..TransferConfig::default()
    };

    let stream = ChannelClient::open(&args.socket, &args.channel_path)
        .map_err(|err| transport_error("connect failed", err))?;
    let mut writer = TransferWriter::with_config_channel(stream, config)
        .map_err(|err| frame_error("channel setup failed", err))?;
    writer
        .send(&transfer)
        .map_err(|err| frame_error("send failed", err))?;
    writer
        .finish()
        .map_err(|err| frame_error("close failed", err))?;

    info!(name = %transfer.name, channel_path = %args.channel_path, "coin sent");

    emit(
        &SentReport {
            channel_path: args.channel_path,
            heads_size: transfer.heads.len(),
            tails_size: transfer.tails.len(),
            frame_size: transfer.wire_size(),
            name: transfer.name,
        },
        format,
    );
    Ok(SUCCESS)
}
