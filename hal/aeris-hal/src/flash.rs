//! Persistent credential storage
//!
//! The node keeps exactly two blobs across reboots, its DER private key
//! and its DER client certificate. Chip HALs store them in a reserved
//! flash partition behind [`FlashStorage`].

/// Slot a blob is stored under
///
/// The discriminant is the on-flash key byte and must never be reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum StorageKey {
    /// Device private key (DER, ECDSA P-256)
    PrivateKey = 0x10,
    /// Device certificate (DER, X.509)
    Certificate = 0x11,
}

impl From<StorageKey> for u8 {
    fn from(key: StorageKey) -> u8 {
        key as u8
    }
}

impl TryFrom<u8> for StorageKey {
    type Error = FlashError;

    fn try_from(byte: u8) -> Result<Self, FlashError> {
        match byte {
            0x10 => Ok(StorageKey::PrivateKey),
            0x11 => Ok(StorageKey::Certificate),
            _ => Err(FlashError::Corrupted),
        }
    }
}

/// Storage failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FlashError {
    /// Raw flash erase/program failed
    Flash,
    /// Storage layer failed for another reason
    Storage,
    /// Slot was never written
    NotFound,
    /// Blob does not fit the caller's buffer or the item limit
    BufferTooSmall,
    /// Partition contents failed their integrity check
    Corrupted,
    /// No room left in the partition
    Full,
}

/// Blob store for the credential slots
///
/// Writes replace the previous blob in that slot. Implementations take
/// care of wear leveling and integrity.
pub trait FlashStorage {
    /// Copy the blob stored under `key` into `buffer`
    ///
    /// Returns its length, [`FlashError::NotFound`] for an unwritten slot
    /// or [`FlashError::BufferTooSmall`] when it does not fit.
    fn read(
        &mut self,
        key: StorageKey,
        buffer: &mut [u8],
    ) -> impl core::future::Future<Output = Result<usize, FlashError>>;

    fn write(
        &mut self,
        key: StorageKey,
        data: &[u8],
    ) -> impl core::future::Future<Output = Result<(), FlashError>>;

    /// Wipe the whole partition
    fn erase_all(&mut self) -> impl core::future::Future<Output = Result<(), FlashError>>;
}

#[cfg(feature = "sequential-storage")]
mod key {
    use sequential_storage::map::{Key, SerializationError};

    use super::StorageKey;

    impl Key for StorageKey {
        fn serialize_into(&self, buffer: &mut [u8]) -> Result<usize, SerializationError> {
            let slot = buffer
                .first_mut()
                .ok_or(SerializationError::BufferTooSmall)?;
            *slot = u8::from(*self);
            Ok(1)
        }

        fn deserialize_from(buffer: &[u8]) -> Result<(Self, usize), SerializationError> {
            let byte = *buffer.first().ok_or(SerializationError::BufferTooSmall)?;
            let key = StorageKey::try_from(byte).map_err(|_| SerializationError::InvalidFormat)?;
            Ok((key, 1))
        }
    }
}
