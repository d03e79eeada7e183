use std::{collections::hash_map::Entry, sync::Arc};

use futures::{StreamExt, stream};
use tokio::sync::broadcast::error::RecvError;
use uuid::Uuid;

use crate::{
    error::{AppError, Result},
    services::{
        grid::{self, PixelId},
        pixel::{OwnershipStore, PixelRecord, SessionState, SessionStatus, StoreUpdate},
        wallet::{WalletEvent, ensure_network},
    },
    types::Address,
    utils::format::{format_eth, network_name},
};

impl OwnershipStore {
    /// Connects the wallet (or the mock identity when there is none), moves
    /// it onto the default network and opens a new session.
    ///
    /// Pixel data arrives afterwards: the viewport prefetch runs in the
    /// background once this returns.
    pub async fn connect(&self) -> Result<()> {
        {
            let mut state = self.state.write().await;
            match state.session.status {
                SessionStatus::Connected => return Ok(()),
                SessionStatus::Connecting => {
                    return Err(AppError::PreconditionFailed(
                        "Wallet connection already in progress".into(),
                    ));
                }
                SessionStatus::Disconnected => state.session.status = SessionStatus::Connecting,
            }
        }
        self.notify(StoreUpdate::Session(SessionStatus::Connecting));

        let result = self.open_session().await;
        if let Err(error) = &result {
            tracing::error!(error = %error, "Wallet connection failed");
            {
                let mut state = self.state.write().await;
                if state.session.status == SessionStatus::Connecting {
                    state.session = SessionState::default();
                }
            }
            self.notify(StoreUpdate::Session(SessionStatus::Disconnected));
        }
        self.report(result).await
    }

    async fn open_session(&self) -> Result<()> {
        let _loading = self.begin_loading();
        let (account, chain_id) = self.resolve_identity().await?;

        let session_id = Uuid::new_v4();
        {
            let mut state = self.state.write().await;
            if state.session.status != SessionStatus::Connecting {
                return Err(AppError::ConnectionFailed("Connection was cancelled".into()));
            }
            state.session = SessionState::connected(account.clone(), chain_id, session_id);
        }
        tracing::info!(
            account = %account,
            chain_id,
            network = network_name(chain_id),
            session_id = %session_id,
            mode = ?self.ledger.mode(),
            "Wallet connected"
        );
        self.notify(StoreUpdate::Session(SessionStatus::Connected));

        self.initialize_ledger(session_id).await;
        self.spawn_wallet_listener(session_id);
        self.spawn_prefetch(session_id);
        Ok(())
    }

    async fn resolve_identity(&self) -> Result<(Address, u64)> {
        let Some(wallet) = &self.wallet else {
            tracing::info!(account = %self.config.wallet.mock_account, "No wallet provider, using mock identity");
            return Ok((
                self.config.wallet.mock_account.clone(),
                self.config.network.default_chain_id,
            ));
        };

        let account = wallet
            .request_accounts()
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| AppError::ConnectionFailed("Wallet returned no accounts".into()))?;
        let chain_id = ensure_network(wallet.as_ref(), &self.config.network.chain).await?;
        Ok((account, chain_id))
    }

    async fn initialize_ledger(&self, session_id: Uuid) {
        self.ledger.initialize().await;
        let grid_size = self.ledger.grid_size();
        let pixel_price = self.ledger.pixel_price().await;

        {
            let mut state = self.state.write().await;
            if !state.session.is_current(session_id) {
                return;
            }
            state.grid_size = grid_size;
            state.pixel_price = Some(pixel_price);
        }
        tracing::info!(grid_size, price = %format_eth(Some(pixel_price), 4), "Ledger ready");
        self.notify(StoreUpdate::Ledger {
            grid_size,
            pixel_price,
        });

        self.spawn_ledger_listener();
    }

    /// Ends the session. The pixel cache survives; selection does not.
    pub async fn disconnect(&self) {
        {
            let mut state = self.state.write().await;
            state.session = SessionState::default();
            state.selection = Default::default();
        }
        tracing::info!("Wallet disconnected");
        self.notify(StoreUpdate::Session(SessionStatus::Disconnected));
        self.notify(StoreUpdate::Selection);
        self.stop_tasks();
    }

    async fn end_session(&self, session_id: Uuid) {
        if self.state.read().await.session.is_current(session_id) {
            self.disconnect().await;
        }
    }

    /// Moves the session to `account`. Returns the session id to use from
    /// now on, or `None` once the session is gone.
    async fn switch_account(&self, session_id: Uuid, account: Address) -> Option<Uuid> {
        let next = {
            let mut state = self.state.write().await;
            if !state.session.is_current(session_id) {
                return None;
            }
            if state.session.account.as_ref() == Some(&account) {
                return Some(session_id);
            }
            let next = Uuid::new_v4();
            state.session.account = Some(account.clone());
            state.session.session_id = Some(next);
            state.selection.pixel = None;
            state.selection.blocks.clear();
            next
        };
        tracing::info!(account = %account, session_id = %next, "Wallet account changed");
        self.notify(StoreUpdate::Session(SessionStatus::Connected));
        self.notify(StoreUpdate::Selection);
        Some(next)
    }

    async fn set_chain(&self, session_id: Uuid, chain_id: u64) {
        {
            let mut state = self.state.write().await;
            if !state.session.is_current(session_id) {
                return;
            }
            state.session.chain_id = Some(chain_id);
        }
        if chain_id != self.config.network.default_chain_id {
            tracing::warn!(
                chain_id,
                network = network_name(chain_id),
                expected = self.config.network.default_chain_id,
                "Wallet switched away from the default network"
            );
        }
        self.notify(StoreUpdate::Session(SessionStatus::Connected));
    }

    fn spawn_wallet_listener(&self, session_id: Uuid) {
        let Some(mut events) = self.wallet.as_ref().and_then(|wallet| wallet.events()) else {
            return;
        };
        let store = self.clone();

        self.track(tokio::spawn(async move {
            let mut session_id = session_id;
            loop {
                match events.recv().await {
                    Ok(WalletEvent::AccountsChanged(accounts)) => match accounts.into_iter().next() {
                        None => {
                            tracing::info!("Wallet reported no accounts");
                            store.end_session(session_id).await;
                            break;
                        }
                        Some(account) => match store.switch_account(session_id, account).await {
                            Some(next) => session_id = next,
                            None => break,
                        },
                    },
                    Ok(WalletEvent::ChainChanged(chain_id)) => {
                        store.set_chain(session_id, chain_id).await;
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "Wallet listener lagged");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        }));
    }

    fn spawn_prefetch(&self, session_id: Uuid) {
        let blocks = self.config.canvas.prefetch_blocks;
        if blocks == 0 {
            return;
        }
        let store = self.clone();
        self.track(tokio::spawn(async move {
            store.prefetch(session_id, blocks).await;
        }));
    }

    /// Reads the top-left `blocks` x `blocks` square into the cache.
    async fn prefetch(&self, session_id: Uuid, blocks: u32) {
        let _loading = self.begin_loading();
        let grid_size = self.grid_size().await;
        let side = blocks.min(grid_size);
        let ids: Vec<PixelId> = (0..side)
            .flat_map(|y| (0..side).filter_map(move |x| grid::to_id(x, y, grid_size).ok()))
            .collect();

        let ledger = Arc::clone(&self.ledger);
        let infos: Vec<_> = stream::iter(ids)
            .map(|id| {
                let ledger = Arc::clone(&ledger);
                async move { (id, ledger.pixel_info(id).await) }
            })
            .buffer_unordered(self.config.canvas.prefetch_concurrency)
            .collect()
            .await;

        let mut inserted = Vec::new();
        {
            let mut state = self.state.write().await;
            if !state.session.is_current(session_id) {
                tracing::debug!(session_id = %session_id, "Session ended during prefetch, discarding");
                return;
            }
            for (id, info) in infos {
                let Ok(coords) = grid::to_coordinates(id, grid_size) else {
                    continue;
                };
                if let Entry::Vacant(entry) = state.pixels.entry(id) {
                    entry.insert(PixelRecord::from_info(id, coords, info));
                    inserted.push(id);
                }
            }
        }

        tracing::info!(count = inserted.len(), side, "Viewport prefetched");
        if !inserted.is_empty() {
            self.notify(StoreUpdate::Pixels(inserted));
        }
    }
}
