//! Credentials partition on the Pico W flash
//!
//! The last 64KB of the 2MB W25Q16 hold a sequential-storage map with the
//! node's two credential blobs. `memory.x` keeps the application image
//! below [`CREDENTIALS_PARTITION_START`].

use core::ops::Range;

use embassy_rp::dma::Channel;
use embassy_rp::flash::{Async, Flash};
use embassy_rp::peripherals::FLASH;
use embassy_rp::Peri;
use embedded_storage_async::nor_flash::NorFlash;
use sequential_storage::cache::NoCache;
use sequential_storage::map;

pub use aeris_hal::flash::{FlashError, StorageKey};

pub const FLASH_SIZE: usize = 2 * 1024 * 1024;
pub const CREDENTIALS_PARTITION_SIZE: usize = 64 * 1024;
pub const CREDENTIALS_PARTITION_START: usize = FLASH_SIZE - CREDENTIALS_PARTITION_SIZE;

const CREDENTIALS_RANGE: Range<u32> = (CREDENTIALS_PARTITION_START as u32)..(FLASH_SIZE as u32);

/// One DER blob plus map item header
const ITEM_BUFFER_LEN: usize = 2048 + 64;

fn storage_error<E>(error: sequential_storage::Error<E>) -> FlashError {
    match error {
        sequential_storage::Error::Storage { .. } => FlashError::Flash,
        sequential_storage::Error::Corrupted { .. } => FlashError::Corrupted,
        sequential_storage::Error::FullStorage => FlashError::Full,
        sequential_storage::Error::ItemTooBig => FlashError::BufferTooSmall,
        _ => FlashError::Storage,
    }
}

/// Credential store backed by on-board flash
pub struct Rp2040FlashStorage<'d> {
    flash: Flash<'d, FLASH, Async, FLASH_SIZE>,
}

impl<'d> Rp2040FlashStorage<'d> {
    pub fn new(flash: Peri<'d, FLASH>, dma: Peri<'d, impl Channel>) -> Self {
        Self {
            flash: Flash::new(flash, dma),
        }
    }
}

impl aeris_hal::FlashStorage for Rp2040FlashStorage<'_> {
    async fn read(&mut self, key: StorageKey, buffer: &mut [u8]) -> Result<usize, FlashError> {
        let mut item = [0u8; ITEM_BUFFER_LEN];
        let blob = map::fetch_item::<StorageKey, &[u8], _>(
            &mut self.flash,
            CREDENTIALS_RANGE,
            &mut NoCache::new(),
            &mut item,
            &key,
        )
        .await
        .map_err(storage_error)?
        .ok_or(FlashError::NotFound)?;

        buffer
            .get_mut(..blob.len())
            .ok_or(FlashError::BufferTooSmall)?
            .copy_from_slice(blob);
        Ok(blob.len())
    }

    async fn write(&mut self, key: StorageKey, data: &[u8]) -> Result<(), FlashError> {
        let mut item = [0u8; ITEM_BUFFER_LEN];
        map::store_item(
            &mut self.flash,
            CREDENTIALS_RANGE,
            &mut NoCache::new(),
            &mut item,
            &key,
            &data,
        )
        .await
        .map_err(storage_error)
    }

    async fn erase_all(&mut self) -> Result<(), FlashError> {
        self.flash
            .erase(CREDENTIALS_RANGE.start, CREDENTIALS_RANGE.end)
            .await
            .map_err(|_| FlashError::Flash)
    }
}
