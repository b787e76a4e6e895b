use cointoss_frame::CoinTransfer;
use tracing::{info, warn};

use crate::error::Result;
use crate::image::{ImageRef, ImageStore};
use crate::repository::{validate_name, CoinRepository, CustomCoin};

/// Result of installing a received coin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstalledCoin {
    pub coin: CustomCoin,
    /// The custom coin that was active before, whose images have been deleted.
    pub replaced: Option<CustomCoin>,
}

/// Persist a received transfer as the active custom coin.
///
/// Both images are stored before anything else changes. If storing an image
/// or writing the repository fails, the new images are removed, the previous
/// coin stays active and the error is returned as-is. On success the coin
/// type switches to [`CoinType::Custom`](crate::CoinType::Custom) and the
/// previous custom coin's images are deleted.
pub fn install_transfer(
    transfer: &CoinTransfer,
    images: &ImageStore,
    repo: &mut CoinRepository,
) -> Result<InstalledCoin> {
    let name = validate_name(&transfer.name)?;

    let heads = images.store(&transfer.heads)?;
    let tails = match images.store(&transfer.tails) {
        Ok(tails) => tails,
        Err(err) => {
            discard(images, &heads);
            return Err(err);
        }
    };

    let (coin, replaced) = match repo.activate_custom_coin(heads.clone(), tails.clone(), &name) {
        Ok(activated) => activated,
        Err(err) => {
            discard(images, &heads);
            discard(images, &tails);
            return Err(err);
        }
    };

    if let Some(old) = &replaced {
        discard(images, &old.heads);
        discard(images, &old.tails);
    }

    info!(id = coin.id, name = %coin.name, "installed custom coin");

    Ok(InstalledCoin { coin, replaced })
}

fn discard(images: &ImageStore, image: &ImageRef) {
    if let Err(err) = images.delete(image) {
        warn!(%image, error = %err, "failed to delete image");
    }
}
