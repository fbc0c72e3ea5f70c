//! TLS client identity
//!
//! Loaded once at boot from persistent storage and handed to the session
//! manager, which keeps it for the life of the process.

use aeris_hal::{FlashError, FlashStorage, StorageKey};
use heapless::Vec;

/// Largest accepted DER blob
pub const MAX_CREDENTIAL_LEN: usize = 2048;

/// Errors while loading credentials
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CredentialError {
    /// Blob missing or unreadable
    Io(FlashError),
    /// Blob present but zero length
    Empty,
    /// Blob larger than [`MAX_CREDENTIAL_LEN`]
    TooLarge,
}

impl From<FlashError> for CredentialError {
    fn from(error: FlashError) -> Self {
        match error {
            FlashError::BufferTooSmall => CredentialError::TooLarge,
            other => CredentialError::Io(other),
        }
    }
}

/// Private key and certificate, both DER encoded and non-empty
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    key: Vec<u8, MAX_CREDENTIAL_LEN>,
    certificate: Vec<u8, MAX_CREDENTIAL_LEN>,
}

impl core::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Credentials")
            .field("key_len", &self.key.len())
            .field("certificate_len", &self.certificate.len())
            .finish()
    }
}

impl Credentials {
    /// Build from in-memory blobs
    pub fn new(key: &[u8], certificate: &[u8]) -> Result<Self, CredentialError> {
        Ok(Self {
            key: copy_blob(key)?,
            certificate: copy_blob(certificate)?,
        })
    }

    /// Read both blobs from `store`
    ///
    /// Fails on the first missing, empty or oversized blob.
    pub async fn load<S: FlashStorage>(
        store: &mut S,
        key: StorageKey,
        certificate: StorageKey,
    ) -> Result<Self, CredentialError> {
        Ok(Self {
            key: read_blob(store, key).await?,
            certificate: read_blob(store, certificate).await?,
        })
    }

    /// DER private key
    pub fn key(&self) -> &[u8] {
        &self.key
    }

    /// DER certificate
    pub fn certificate(&self) -> &[u8] {
        &self.certificate
    }
}

fn copy_blob(data: &[u8]) -> Result<Vec<u8, MAX_CREDENTIAL_LEN>, CredentialError> {
    if data.is_empty() {
        return Err(CredentialError::Empty);
    }
    Vec::from_slice(data).map_err(|_| CredentialError::TooLarge)
}

async fn read_blob<S: FlashStorage>(
    store: &mut S,
    key: StorageKey,
) -> Result<Vec<u8, MAX_CREDENTIAL_LEN>, CredentialError> {
    let mut buffer = [0u8; MAX_CREDENTIAL_LEN];
    let len = store.read(key, &mut buffer).await.map_err(|e| {
        warn!("credential {} unreadable: {}", key, e);
        CredentialError::from(e)
    })?;
    copy_blob(&buffer[..len])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MemoryStore;
    use embassy_futures::block_on;

    #[test]
    fn test_load_both_blobs() {
        let mut store = MemoryStore::default();
        store.insert(StorageKey::PrivateKey, &[1, 2, 3]);
        store.insert(StorageKey::Certificate, &[4, 5]);

        let credentials = block_on(Credentials::load(
            &mut store,
            StorageKey::PrivateKey,
            StorageKey::Certificate,
        ))
        .unwrap();

        assert_eq!(credentials.key(), &[1, 2, 3]);
        assert_eq!(credentials.certificate(), &[4, 5]);
    }

    #[test]
    fn test_missing_certificate_is_io_failure() {
        let mut store = MemoryStore::default();
        store.insert(StorageKey::PrivateKey, &[1]);

        let result = block_on(Credentials::load(
            &mut store,
            StorageKey::PrivateKey,
            StorageKey::Certificate,
        ));
        assert_eq!(result, Err(CredentialError::Io(FlashError::NotFound)));
    }

    #[test]
    fn test_erased_store_has_no_credentials() {
        let mut store = MemoryStore::default();
        store.insert(StorageKey::PrivateKey, &[1]);
        store.insert(StorageKey::Certificate, &[2]);
        block_on(store.erase_all()).unwrap();

        let result = block_on(Credentials::load(
            &mut store,
            StorageKey::PrivateKey,
            StorageKey::Certificate,
        ));
        assert_eq!(result, Err(CredentialError::Io(FlashError::NotFound)));
    }

    #[test]
    fn test_empty_blob_rejected() {
        let mut store = MemoryStore::default();
        store.insert(StorageKey::PrivateKey, &[]);
        store.insert(StorageKey::Certificate, &[4]);

        let result = block_on(Credentials::load(
            &mut store,
            StorageKey::PrivateKey,
            StorageKey::Certificate,
        ));
        assert_eq!(result, Err(CredentialError::Empty));
    }

    #[test]
    fn test_new_rejects_oversized() {
        let big = [0u8; MAX_CREDENTIAL_LEN + 1];
        assert_eq!(
            Credentials::new(&big, &[1]),
            Err(CredentialError::TooLarge)
        );
        assert_eq!(Credentials::new(&[1], &[]), Err(CredentialError::Empty));
    }

    #[test]
    fn test_debug_hides_key_material() {
        let credentials = Credentials::new(&[0xAB; 4], &[0xCD; 2]).unwrap();
        let text = std::format!("{:?}", credentials);
        assert!(text.contains("key_len: 4"));
        assert!(!text.contains("171"));
    }
}
