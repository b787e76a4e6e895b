use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use cointoss_frame::{CoinTransfer, TransferConfig, TransferReader};
use cointoss_store::{
    install_transfer, CoinRepository, ImageStore, InstalledCoin, StoreConfig, StoreError,
};
use cointoss_transport::{ChannelListener, OpenedChannel};
use serde::Serialize;
use tracing::{info, warn};

use crate::cmd::{label_policy, parse_duration, ListenArgs};
use crate::exit::{frame_error, store_error, transport_error, CliError, CliResult, INTERNAL, SUCCESS};
use crate::output::{emit, human_size, OutputFormat, Report};

#[derive(Serialize)]
struct InstalledReport {
    id: u64,
    name: String,
    heads: String,
    tails: String,
    heads_size: usize,
    tails_size: usize,
    replaced: Option<String>,
}

impl InstalledReport {
    fn new(installed: &InstalledCoin, transfer: &CoinTransfer) -> Self {
        Self {
            id: installed.coin.id,
            name: installed.coin.name.clone(),
            heads: installed.coin.heads.to_string(),
            tails: installed.coin.tails.to_string(),
            heads_size: transfer.heads.len(),
            tails_size: transfer.tails.len(),
            replaced: installed.replaced.as_ref().map(|old| old.name.clone()),
        }
    }
}

impl Report for InstalledReport {
    const SCHEMA: &'static str = "coin-installed.schema.json";

    fn header(&self) -> Vec<&'static str> {
        vec!["ID", "NAME", "HEADS", "TAILS", "REPLACED"]
    }

    fn rows(&self) -> Vec<Vec<String>> {
        vec![vec![
            self.id.to_string(),
            self.name.clone(),
            format!("{} ({})", self.heads, human_size(self.heads_size)),
            format!("{} ({})", self.tails, human_size(self.tails_size)),
            self.replaced.clone().unwrap_or_else(|| "-".to_string()),
        ]]
    }

    fn pretty(&self) -> String {
        match &self.replaced {
            Some(old) => format!("installed {:?} (id {}), replacing {old:?}", self.name, self.id),
            None => format!("installed {:?} (id {})", self.name, self.id),
        }
    }

    fn raw(&self) -> Vec<u8> {
        format!("{}\n", self.name).into_bytes()
    }
}

pub fn run(args: ListenArgs, format: OutputFormat) -> CliResult<i32> {
    let store_config = StoreConfig::new(&args.store);
    let images =
        ImageStore::open(&store_config).map_err(|err| store_error("store open failed", err))?;
    let mut repo = CoinRepository::open(&store_config)
        .map_err(|err| store_error("repository open failed", err))?;

    let read_timeout = parse_duration(&args.timeout)?;
    let transfer_config = TransferConfig {
        max_frame_size: args.max_frame_size,
        label_policy: label_policy(args.lossy_names),
        read_timeout: Some(read_timeout),
        ..TransferConfig::default()
    };

    let mut listener =
        ChannelListener::bind(&args.socket).map_err(|err| transport_error("bind failed", err))?;
    listener.set_preamble_timeout(Some(read_timeout));

    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(running.clone())?;

    let mut installed = 0usize;

    while running.load(Ordering::SeqCst) {
        let opened = match listener.accept() {
            Ok(opened) => opened,
            Err(err) if err.is_channel_local() => {
                warn!(error = %err, "dropping channel");
                continue;
            }
            Err(err) => return Err(transport_error("accept failed", err)),
        };

        if opened.path != args.channel_path {
            warn!(path = %opened.path, "ignoring channel on unexpected path");
            continue;
        }

        let Some(transfer) = receive(opened, &transfer_config) else {
            continue;
        };

        let coin = match install_transfer(&transfer, &images, &mut repo) {
            Ok(coin) => coin,
            Err(err @ StoreError::Io { .. }) => return Err(store_error("install failed", err)),
            Err(err) => {
                warn!(error = %err, name = %transfer.name, "rejecting coin");
                continue;
            }
        };

        emit(&InstalledReport::new(&coin, &transfer), format);
        installed += 1;

        if args.count.is_some_and(|count| installed >= count) {
            break;
        }
    }

    info!(installed, "listener stopped");
    Ok(SUCCESS)
}

/// Read one transfer from a channel. Problems with a single channel are
/// logged and never stop the listener.
fn receive(opened: OpenedChannel, config: &TransferConfig) -> Option<CoinTransfer> {
    let result = TransferReader::with_config_channel(opened.stream, config.clone())
        .and_then(|mut reader| reader.read_transfer());

    match result {
        Ok(transfer) => Some(transfer),
        Err(err) => {
            let err = frame_error("receive failed", err);
            warn!(path = %opened.path, code = err.code, error = %err, "dropping channel");
            None
        }
    }
}

fn install_ctrlc_handler(running: Arc<AtomicBool>) -> CliResult<()> {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))
}
