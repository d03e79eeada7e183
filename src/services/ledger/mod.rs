//! Gateway to the external ownership ledger.
//!
//! Two variants implement [`Ledger`]: [`RemoteLedger`] wraps a concrete
//! [`LedgerTransport`] binding and converts every transport failure into a
//! fallback value (reads) or a [`AppError::TransactionRejected`] (writes);
//! [`SimulatedLedger`] answers deterministically with no ledger at all. The
//! variant is chosen when the store is built.

use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::{
    error::{AppError, Result},
    services::grid::{self, Coordinates, PixelId},
    types::{Address, Color, Wei},
};

pub mod remote;
pub mod simulated;
pub mod transaction;
pub mod types;

pub use remote::RemoteLedger;
pub use simulated::SimulatedLedger;
pub use transaction::{TransactionHandle, TransactionReceipt};
pub use types::*;

#[async_trait]
pub trait Ledger: Send + Sync {
    fn mode(&self) -> LedgerMode;

    /// Loads ledger constants. Never fails; defaults are kept on error.
    async fn initialize(&self);

    fn grid_size(&self) -> u32;

    async fn pixel_price(&self) -> Wei;

    /// Current owner and colour. Never fails; see [`InfoSource`].
    async fn pixel_info(&self, id: PixelId) -> PixelInfo;

    async fn pixel_info_at(&self, x: u32, y: u32) -> Result<PixelInfo> {
        let id = grid::to_id(x, y, self.grid_size())?;
        Ok(self.pixel_info(id).await)
    }

    async fn claim_pixel(&self, x: u32, y: u32, value: Wei) -> Result<TransactionHandle>;

    /// Claims a batch in one logical transaction.
    async fn claim_pixels(&self, coords: &[Coordinates], value: Wei) -> Result<TransactionHandle>;

    async fn change_pixel_color(&self, id: PixelId, color: Color) -> Result<TransactionHandle>;

    async fn change_pixel_color_at(&self, x: u32, y: u32, color: Color) -> Result<TransactionHandle> {
        let id = grid::to_id(x, y, self.grid_size())?;
        self.change_pixel_color(id, color).await
    }

    fn subscribe(&self, kinds: &[EventKind]) -> EventSubscription;
}

/// Concrete binding to a deployed ownership contract.
///
/// Implementations report failures as [`TransportError`]; they are not
/// expected to retry or substitute data.
#[async_trait]
pub trait LedgerTransport: Send + Sync {
    async fn grid_size(&self) -> TransportResult<u32>;

    async fn pixel_price(&self) -> TransportResult<Wei>;

    /// Raw `(owner, color)` as stored by the contract.
    async fn pixel_info(&self, id: PixelId) -> TransportResult<(Address, String)>;

    async fn claim_pixel(&self, x: u32, y: u32, value: Wei) -> TransportResult<TransactionHandle>;

    async fn claim_pixels(
        &self,
        coords: &[Coordinates],
        value: Wei,
    ) -> TransportResult<TransactionHandle>;

    async fn change_pixel_color(
        &self,
        id: PixelId,
        color: &Color,
    ) -> TransportResult<TransactionHandle>;

    fn events(&self) -> TransportResult<broadcast::Receiver<LedgerEvent>>;
}

pub(crate) fn ensure_batch(coords: &[Coordinates]) -> Result<()> {
    if coords.is_empty() {
        return Err(AppError::PreconditionFailed("No pixels to claim".into()));
    }
    Ok(())
}
