//! One-shot credential provisioning
//!
//! Built only with the `provision` feature: the DER files under
//! `aeris-firmware/certs/` are compiled in and written to the credentials
//! partition, replacing whatever was there, before the normal load. Flash a
//! regular build afterwards so the key does not stay in the image.

use aeris_hal_rp2040::{FlashStorageTrait, StorageKey};
use defmt::{error, info};

const PRIVATE_KEY: &[u8] = include_bytes!("../certs/private.key.der");
const CERTIFICATE: &[u8] = include_bytes!("../certs/certificate.crt.der");

pub async fn store_credentials<S: FlashStorageTrait>(storage: &mut S) {
    // Old items would otherwise stay behind the new ones
    if let Err(e) = storage.erase_all().await {
        error!("failed to erase credentials partition: {}", e);
        return;
    }

    for (key, blob) in [
        (StorageKey::PrivateKey, PRIVATE_KEY),
        (StorageKey::Certificate, CERTIFICATE),
    ] {
        match storage.write(key, blob).await {
            Ok(()) => info!("provisioned {} ({} bytes)", key, blob.len()),
            Err(e) => error!("failed to provision {}: {}", key, e),
        }
    }
}
