use std::{
    sync::atomic::{AtomicBool, Ordering},
    time::Duration,
};

use async_trait::async_trait;
use rand::{Rng, SeedableRng, rngs::StdRng};

use crate::{
    config::LedgerConfig,
    error::{AppError, Result},
    services::{
        grid::{Coordinates, PixelId},
        ledger::{
            EventKind, EventSubscription, InfoSource, Ledger, LedgerMode, PixelInfo,
            TransactionHandle, ensure_batch,
        },
    },
    types::{Address, Color, Owner, Wei},
};

/// Ledger stand-in used when no contract is reachable.
///
/// Reads are derived from the pixel id so repeated reads agree, transactions
/// confirm after a fixed delay, and events are never emitted.
pub struct SimulatedLedger {
    grid_size: u32,
    price: Wei,
    confirmation_delay: Duration,
    demo_owner: Address,
    rejecting: AtomicBool,
}

impl SimulatedLedger {
    /// Synthesized owned pixels belong to `demo_owner`, normally the
    /// configured mock account.
    pub fn new(config: &LedgerConfig, demo_owner: Address) -> Self {
        Self {
            grid_size: config.default_grid_size,
            price: config.fallback_price_wei,
            confirmation_delay: config.simulated_confirmation,
            demo_owner,
            rejecting: AtomicBool::new(false),
        }
    }

    /// Makes every following transaction fail confirmation.
    pub fn set_rejecting(&self, rejecting: bool) {
        self.rejecting.store(rejecting, Ordering::SeqCst);
    }

    fn submit(&self, action: &str) -> Result<TransactionHandle> {
        if self.rejecting.load(Ordering::SeqCst) {
            tracing::warn!(action, "Simulated ledger rejecting transaction");
            return Err(AppError::TransactionRejected(format!(
                "Simulated ledger rejected {action}"
            )));
        }

        let handle = TransactionHandle::simulated(self.confirmation_delay);
        tracing::info!(action, tx_hash = %handle.hash(), "Simulated transaction submitted");
        Ok(handle)
    }
}

/// Deterministic stand-in state for `id`: roughly 30% owned by
/// `demo_owner`, colour seeded from the id.
pub fn synthetic_pixel_info(id: PixelId, demo_owner: &Address) -> PixelInfo {
    let mut rng = StdRng::seed_from_u64(id);
    let owner = if rng.random_bool(0.3) {
        Owner::Account(demo_owner.clone())
    } else {
        Owner::Unclaimed
    };

    PixelInfo {
        owner,
        color: Color::from_u24(rng.random_range(0..=0xFF_FFFF)),
        source: InfoSource::Fallback,
    }
}

#[async_trait]
impl Ledger for SimulatedLedger {
    fn mode(&self) -> LedgerMode {
        LedgerMode::Simulated
    }

    async fn initialize(&self) {
        tracing::info!(grid_size = self.grid_size, "Using simulated ledger");
    }

    fn grid_size(&self) -> u32 {
        self.grid_size
    }

    async fn pixel_price(&self) -> Wei {
        self.price
    }

    async fn pixel_info(&self, id: PixelId) -> PixelInfo {
        synthetic_pixel_info(id, &self.demo_owner)
    }

    async fn claim_pixel(&self, x: u32, y: u32, value: Wei) -> Result<TransactionHandle> {
        tracing::debug!(x, y, value = %value, "Simulated claim");
        self.submit("claimPixel")
    }

    async fn claim_pixels(&self, coords: &[Coordinates], value: Wei) -> Result<TransactionHandle> {
        ensure_batch(coords)?;
        tracing::debug!(count = coords.len(), value = %value, "Simulated batch claim");
        self.submit("claimPixels")
    }

    async fn change_pixel_color(&self, id: PixelId, color: Color) -> Result<TransactionHandle> {
        tracing::debug!(pixel_id = id, color = %color, "Simulated color change");
        self.submit("changePixelColor")
    }

    fn subscribe(&self, kinds: &[EventKind]) -> EventSubscription {
        tracing::debug!(?kinds, "Simulated ledger does not emit events");
        EventSubscription::inert()
    }
}
