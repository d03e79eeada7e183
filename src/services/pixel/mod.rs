//! Ownership store: the client-side cache of pixel state plus the session,
//! selection and error slot the view renders from.
//!
//! Every mutation waits for ledger confirmation before touching the cache, and
//! is dropped if the session it started under has ended in the meantime.

use std::{
    collections::hash_map::Entry,
    sync::{
        Arc, Mutex, PoisonError,
        atomic::{AtomicUsize, Ordering},
    },
};

use chrono::Utc;
use tokio::{
    sync::{RwLock, broadcast},
    task::JoinHandle,
};
use uuid::Uuid;

use crate::{
    config::Config,
    error::{AppError, ErrorNotice, Result},
    services::{
        grid::{self, Coordinates, PixelId},
        ledger::{Ledger, LedgerMode, TransactionHandle, TransactionReceipt},
        pixel::{inflight::*, validation::*},
        portfolio::{self, PortfolioFile, PortfolioSummary},
        wallet::WalletProvider,
    },
    types::{Address, Color, Owner},
};

pub mod events;
pub mod inflight;
pub mod session;
pub mod types;
pub mod validation;

pub use types::*;

const UPDATE_BUFFER_SIZE: usize = 256;

#[derive(Clone)]
pub struct OwnershipStore {
    config: Arc<Config>,
    ledger: Arc<dyn Ledger>,
    wallet: Option<Arc<dyn WalletProvider>>,
    state: Arc<RwLock<StoreState>>,
    inflight: Arc<InFlightGuard>,
    updates: broadcast::Sender<StoreUpdate>,
    tasks: Arc<Mutex<Vec<JoinHandle<()>>>>,
    pending: Arc<AtomicUsize>,
}

/// Holds the loading flag up while alive.
struct LoadingGuard {
    pending: Arc<AtomicUsize>,
    updates: broadcast::Sender<StoreUpdate>,
}

impl Drop for LoadingGuard {
    fn drop(&mut self) {
        if self.pending.fetch_sub(1, Ordering::SeqCst) == 1 {
            let _ = self.updates.send(StoreUpdate::Loading(false));
        }
    }
}

impl OwnershipStore {
    pub fn new(
        config: Arc<Config>,
        ledger: Arc<dyn Ledger>,
        wallet: Option<Arc<dyn WalletProvider>>,
    ) -> Self {
        let (updates, _) = broadcast::channel(UPDATE_BUFFER_SIZE);
        let state = StoreState::new(
            ledger.grid_size(),
            ledger.mode(),
            config.canvas.default_color,
        );

        Self {
            config,
            ledger,
            wallet,
            state: Arc::new(RwLock::new(state)),
            inflight: Arc::new(InFlightGuard::default()),
            updates,
            tasks: Arc::new(Mutex::new(Vec::new())),
            pending: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn ledger_mode(&self) -> LedgerMode {
        self.ledger.mode()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StoreUpdate> {
        self.updates.subscribe()
    }

    pub async fn snapshot(&self) -> StoreState {
        let mut snapshot = self.state.read().await.clone();
        snapshot.is_loading = self.is_loading();
        snapshot
    }

    pub async fn pixel(&self, id: PixelId) -> Option<PixelRecord> {
        self.state.read().await.pixels.get(&id).cloned()
    }

    pub fn is_loading(&self) -> bool {
        self.pending.load(Ordering::SeqCst) > 0
    }

    pub fn is_pending(&self, id: PixelId) -> bool {
        self.inflight.is_pending(id)
    }

    pub async fn error(&self) -> Option<ErrorNotice> {
        self.state.read().await.error.clone()
    }

    pub async fn set_error(&self, notice: ErrorNotice) {
        self.replace_error(Some(notice)).await;
    }

    pub async fn clear_error(&self) {
        self.replace_error(None).await;
    }

    async fn replace_error(&self, notice: Option<ErrorNotice>) {
        self.state.write().await.error = notice.clone();
        self.notify(StoreUpdate::Error(notice));
    }

    /// Puts a failed result into the error slot and hands it back.
    async fn report<T>(&self, result: Result<T>) -> Result<T> {
        if let Some(notice) = result.as_ref().err().map(AppError::notice) {
            self.set_error(notice).await;
        }
        result
    }

    fn notify(&self, update: StoreUpdate) {
        // No receivers is fine; the view may not be listening yet.
        let _ = self.updates.send(update);
    }

    fn begin_loading(&self) -> LoadingGuard {
        if self.pending.fetch_add(1, Ordering::SeqCst) == 0 {
            self.notify(StoreUpdate::Loading(true));
        }
        LoadingGuard {
            pending: Arc::clone(&self.pending),
            updates: self.updates.clone(),
        }
    }

    fn track(&self, handle: JoinHandle<()>) {
        let mut tasks = self.tasks.lock().unwrap_or_else(PoisonError::into_inner);
        tasks.retain(|task| !task.is_finished());
        tasks.push(handle);
    }

    fn stop_tasks(&self) {
        let tasks: Vec<_> = self
            .tasks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain(..)
            .collect();
        for task in tasks {
            task.abort();
        }
    }

    async fn grid_size(&self) -> u32 {
        self.state.read().await.grid_size
    }

    async fn require_session(&self) -> Result<(Address, Uuid)> {
        self.state
            .read()
            .await
            .session
            .active()
            .ok_or_else(|| AppError::PreconditionFailed("Connect your wallet first".into()))
    }

    fn reserve(&self, ids: &[PixelId]) -> Result<InFlightPermit> {
        self.inflight.acquire(ids).ok_or_else(|| {
            tracing::warn!(?ids, "Mutation already pending for pixel");
            AppError::PreconditionFailed("A transaction for this pixel is already pending".into())
        })
    }

    async fn confirm(&self, handle: TransactionHandle) -> Result<TransactionReceipt> {
        handle.wait(self.config.ledger.transaction_timeout).await
    }

    /// Writes `records` in one step if `session_id` is still current.
    async fn apply_confirmed(
        &self,
        session_id: Uuid,
        receipt: &TransactionReceipt,
        records: Vec<PixelRecord>,
    ) -> Result<Vec<PixelRecord>> {
        {
            let mut state = self.state.write().await;
            if !state.session.is_current(session_id) {
                tracing::warn!(tx_hash = %receipt.hash, "Session ended before confirmation, discarding local update");
                return Err(AppError::PreconditionFailed(format!(
                    "Session ended before transaction {} was confirmed",
                    receipt.hash
                )));
            }
            for record in &records {
                state.pixels.insert(record.id, record.clone());
            }
        }

        self.notify(StoreUpdate::Pixels(records.iter().map(|r| r.id).collect()));
        Ok(records)
    }

    /// Reads `id` from the ledger and caches it unless something newer
    /// landed while the read was in flight.
    pub async fn load_pixel(&self, id: PixelId) -> Result<PixelRecord> {
        let result = self.fill(id).await;
        self.report(result).await
    }

    pub async fn load_pixel_at(&self, x: u32, y: u32) -> Result<PixelRecord> {
        let result = match grid::to_id(x, y, self.grid_size().await) {
            Ok(id) => self.fill(id).await,
            Err(error) => Err(error),
        };
        self.report(result).await
    }

    async fn fill(&self, id: PixelId) -> Result<PixelRecord> {
        let coords = validate_pixel_id(id, self.grid_size().await)?;
        let _loading = self.begin_loading();
        let info = self.ledger.pixel_info(id).await;

        let record = {
            let mut state = self.state.write().await;
            match state.pixels.entry(id) {
                Entry::Occupied(entry) => {
                    tracing::debug!(pixel_id = id, "Pixel updated during read, keeping newer state");
                    entry.get().clone()
                }
                Entry::Vacant(entry) => entry.insert(PixelRecord::from_info(id, coords, info)).clone(),
            }
        };

        self.notify(StoreUpdate::Pixels(vec![id]));
        Ok(record)
    }

    /// Sets the selected pixel. Returns what is known about it right now; an
    /// uncached pixel comes back as a placeholder while it loads.
    pub async fn select(&self, id: Option<PixelId>) -> Result<Option<PixelRecord>> {
        let result = self.select_pixel(id).await;
        self.report(result).await
    }

    async fn select_pixel(&self, id: Option<PixelId>) -> Result<Option<PixelRecord>> {
        let (selected, needs_fill) = {
            let mut state = self.state.write().await;
            if let Some(id) = id {
                validate_pixel_id(id, state.grid_size)?;
            }
            state.selection.pixel = id;
            let needs_fill = id.is_some_and(|id| !state.pixels.contains_key(&id));
            (state.selected_pixel(), needs_fill)
        };
        self.notify(StoreUpdate::Selection);

        if let (Some(id), true) = (id, needs_fill) {
            let store = self.clone();
            tokio::spawn(async move {
                if let Err(error) = store.fill(id).await {
                    tracing::warn!(pixel_id = id, error = %error, "Failed to load selected pixel");
                }
            });
        }

        Ok(selected)
    }

    pub async fn set_multi_select(&self, enabled: bool) {
        {
            let mut state = self.state.write().await;
            state.selection.multi_select = enabled;
            state.selection.blocks.clear();
        }
        self.notify(StoreUpdate::Selection);
    }

    /// Adds or removes a block from the selection. Returns the new block list.
    pub async fn toggle_block(&self, coords: Coordinates) -> Result<Vec<Coordinates>> {
        let result = self.toggle(coords).await;
        self.report(result).await
    }

    async fn toggle(&self, coords: Coordinates) -> Result<Vec<Coordinates>> {
        let blocks = {
            let mut state = self.state.write().await;
            grid::coordinates_to_id(coords, state.grid_size)?;
            let blocks = &mut state.selection.blocks;
            match blocks.iter().position(|block| *block == coords) {
                Some(index) => {
                    blocks.remove(index);
                }
                None => blocks.push(coords),
            }
            blocks.clone()
        };
        self.notify(StoreUpdate::Selection);
        Ok(blocks)
    }

    /// Canvas click on a block. Multi-select toggles it; otherwise it becomes
    /// the single selection, or clears the selection if already selected.
    pub async fn handle_block_click(&self, coords: Coordinates) -> Result<Option<PixelRecord>> {
        let (multi_select, already_selected, id) = {
            let state = self.state.read().await;
            let id = grid::coordinates_to_id(coords, state.grid_size);
            (
                state.selection.multi_select,
                state.selection.blocks == [coords],
                id,
            )
        };
        let id = self.report(id).await?;

        if multi_select {
            self.toggle_block(coords).await?;
            return Ok(None);
        }

        if already_selected {
            self.clear_selection().await;
            return Ok(None);
        }

        self.state.write().await.selection.blocks = vec![coords];
        self.select(Some(id)).await
    }

    pub async fn clear_selection(&self) {
        {
            let mut state = self.state.write().await;
            state.selection.pixel = None;
            state.selection.blocks.clear();
        }
        self.notify(StoreUpdate::Selection);
    }

    pub async fn claim_selected(&self) -> Result<PixelRecord> {
        let result = self.claim_selected_pixel().await;
        self.report(result).await
    }

    async fn claim_selected_pixel(&self) -> Result<PixelRecord> {
        let (id, price, grid_size) = {
            let state = self.state.read().await;
            let id = state
                .selection
                .pixel
                .ok_or_else(|| AppError::PreconditionFailed("No pixel selected".into()))?;
            let price = state
                .pixel_price
                .ok_or_else(|| AppError::PreconditionFailed("Pixel price not loaded".into()))?;
            (id, price, state.grid_size)
        };
        let (account, session_id) = self.require_session().await?;
        let coords = validate_pixel_id(id, grid_size)?;
        let _permit = self.reserve(&[id])?;
        let _loading = self.begin_loading();

        tracing::info!(pixel_id = id, x = coords.x, y = coords.y, account = %account, "Claiming pixel");
        let handle = self.ledger.claim_pixel(coords.x, coords.y, price).await?;
        let receipt = self.confirm(handle).await?;

        let record = PixelRecord {
            id,
            x: coords.x,
            y: coords.y,
            owner: Owner::Account(account),
            color: Color::random(),
            source: RecordSource::Optimistic,
        };
        let mut applied = self.apply_confirmed(session_id, &receipt, vec![record]).await?;
        tracing::info!(pixel_id = id, tx_hash = %receipt.hash, "Pixel claimed");
        applied
            .pop()
            .ok_or_else(|| AppError::PreconditionFailed("Claim produced no record".into()))
    }

    /// Claims every coordinate in one transaction; the cache changes only if
    /// the whole batch confirms.
    pub async fn claim_multiple(&self, coords: &[Coordinates]) -> Result<Vec<PixelRecord>> {
        let result = self.claim_batch(coords).await;
        self.report(result).await
    }

    pub async fn claim_chunk(
        &self,
        start: Coordinates,
        width: u32,
        height: u32,
    ) -> Result<Vec<PixelRecord>> {
        let result = match grid::chunk(start, width, height, self.grid_size().await) {
            Ok(coords) => self.claim_batch(&coords).await,
            Err(error) => Err(error),
        };
        self.report(result).await
    }

    /// Claims the block selection: a single block goes through the single
    /// claim path, several through one batch.
    pub async fn claim_selected_blocks(&self) -> Result<Vec<PixelRecord>> {
        let result = self.claim_blocks().await;
        self.report(result).await
    }

    async fn claim_blocks(&self) -> Result<Vec<PixelRecord>> {
        let (blocks, grid_size) = {
            let state = self.state.read().await;
            (state.selection.blocks.clone(), state.grid_size)
        };

        let claimed = match blocks.as_slice() {
            [] => return Err(AppError::PreconditionFailed("No pixel blocks selected".into())),
            [single] => {
                let id = grid::coordinates_to_id(*single, grid_size)?;
                self.select_pixel(Some(id)).await?;
                vec![self.claim_selected_pixel().await?]
            }
            _ => self.claim_batch(&blocks).await?,
        };

        self.state.write().await.selection.blocks.clear();
        self.notify(StoreUpdate::Selection);
        Ok(claimed)
    }

    async fn claim_batch(&self, coords: &[Coordinates]) -> Result<Vec<PixelRecord>> {
        let (price, grid_size) = {
            let state = self.state.read().await;
            let price = state
                .pixel_price
                .ok_or_else(|| AppError::PreconditionFailed("Pixel price not loaded".into()))?;
            (price, state.grid_size)
        };
        let (account, session_id) = self.require_session().await?;
        let batch = validate_batch(coords, grid_size)?;
        let value = batch_value(price, batch.len())?;
        let ids: Vec<PixelId> = batch.iter().map(|(id, _)| *id).collect();
        let _permit = self.reserve(&ids)?;
        let _loading = self.begin_loading();

        let coords: Vec<Coordinates> = batch.iter().map(|(_, coords)| *coords).collect();
        tracing::info!(count = coords.len(), value = %value, account = %account, "Claiming pixel batch");
        let handle = self.ledger.claim_pixels(&coords, value).await?;
        let receipt = self.confirm(handle).await?;

        let color = Color::random();
        let records = batch
            .into_iter()
            .map(|(id, coords)| PixelRecord {
                id,
                x: coords.x,
                y: coords.y,
                owner: Owner::Account(account.clone()),
                color,
                source: RecordSource::Optimistic,
            })
            .collect();
        let applied = self.apply_confirmed(session_id, &receipt, records).await?;
        tracing::info!(count = applied.len(), tx_hash = %receipt.hash, "Pixel batch claimed");
        Ok(applied)
    }

    /// Recolours a pixel owned by the session account.
    pub async fn change_color(&self, id: PixelId, color: &str) -> Result<PixelRecord> {
        let result = self.recolor(id, color).await;
        self.report(result).await
    }

    async fn recolor(&self, id: PixelId, color: &str) -> Result<PixelRecord> {
        let color = validate_pixel_color(color)?;
        let (account, session_id) = self.require_session().await?;

        let current = {
            let state = self.state.read().await;
            validate_pixel_id(id, state.grid_size)?;
            state.pixels.get(&id).cloned()
        };
        let mut record = match current {
            Some(record) if record.owner.is(&account) => record,
            _ => {
                tracing::warn!(pixel_id = id, account = %account, "Color change refused, pixel not owned");
                return Err(AppError::Authorization("You don't own this pixel".into()));
            }
        };

        let _permit = self.reserve(&[id])?;
        let _loading = self.begin_loading();

        let handle = self.ledger.change_pixel_color(id, color).await?;
        let receipt = self.confirm(handle).await?;

        {
            let mut state = self.state.write().await;
            if !state.session.is_current(session_id) {
                tracing::warn!(tx_hash = %receipt.hash, "Session ended before confirmation, discarding local update");
                return Err(AppError::PreconditionFailed(format!(
                    "Session ended before transaction {} was confirmed",
                    receipt.hash
                )));
            }
            // Only the colour is ours to change; the owner may have moved on via events.
            if let Some(cached) = state.pixels.get_mut(&id) {
                cached.color = color;
                cached.source = RecordSource::Optimistic;
                record = cached.clone();
            } else {
                record.color = color;
                record.source = RecordSource::Optimistic;
                state.pixels.insert(id, record.clone());
            }
        }
        self.notify(StoreUpdate::Pixels(vec![id]));
        tracing::info!(pixel_id = id, color = %color, tx_hash = %receipt.hash, "Pixel color changed");
        Ok(record)
    }

    /// Builds the portfolio file for the connected account.
    pub async fn export_portfolio(&self) -> Result<PortfolioFile> {
        let result = {
            let state = self.state.read().await;
            match &state.session.account {
                Some(account) if state.session.is_connected() => {
                    portfolio::export(account, state.owned_by(account), Utc::now())
                }
                _ => Err(AppError::PreconditionFailed("Connect your wallet first".into())),
            }
        };
        self.report(result).await
    }

    /// Ownership summary for the connected account, if any.
    pub async fn portfolio_summary(&self) -> Option<PortfolioSummary> {
        let state = self.state.read().await;
        let account = state.session.account.as_ref()?;
        Some(portfolio::summarize(state.owned_by(account)))
    }
}
