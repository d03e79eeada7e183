use crate::{
    services::{
        grid::{self, Coordinates},
        ledger::{EventKind, LedgerEvent},
        pixel::{OwnershipStore, PixelRecord, RecordSource, StoreUpdate},
    },
    types::Owner,
};

impl OwnershipStore {
    /// Folds a ledger event into the cache. Last write wins.
    ///
    /// Claims are recorded even for uncached pixels; colour changes and
    /// transfers only touch pixels already in the cache.
    pub async fn apply_event(&self, event: LedgerEvent) {
        let pixel_id = event.pixel_id();
        let changed = {
            let mut state = self.state.write().await;
            let grid_size = state.grid_size;
            let default_color = state.default_color;

            match event {
                LedgerEvent::PixelClaimed { owner, x, y, .. } => {
                    let coords = match grid::to_coordinates(pixel_id, grid_size) {
                        Ok(coords) => coords,
                        Err(error) => {
                            tracing::warn!(pixel_id, error = %error, "Ignoring claim event outside the grid");
                            return;
                        }
                    };
                    if coords != Coordinates::new(x, y) {
                        tracing::warn!(pixel_id, x, y, "Claim event coordinates disagree with pixel id");
                    }
                    let color = state
                        .pixels
                        .get(&pixel_id)
                        .map_or(default_color, |record| record.color);
                    state.pixels.insert(
                        pixel_id,
                        PixelRecord {
                            id: pixel_id,
                            x: coords.x,
                            y: coords.y,
                            owner: Owner::from_ledger(owner),
                            color,
                            source: RecordSource::Event,
                        },
                    );
                    true
                }
                LedgerEvent::PixelColorChanged { color, .. } => match state.pixels.get_mut(&pixel_id) {
                    Some(record) => {
                        record.color = color;
                        record.source = RecordSource::Event;
                        true
                    }
                    None => false,
                },
                LedgerEvent::PixelTransferred { to, .. } => match state.pixels.get_mut(&pixel_id) {
                    Some(record) => {
                        record.owner = Owner::from_ledger(to);
                        record.source = RecordSource::Event;
                        true
                    }
                    None => false,
                },
            }
        };

        if changed {
            tracing::debug!(pixel_id, "Applied ledger event");
            self.notify(StoreUpdate::Pixels(vec![pixel_id]));
        }
    }

    pub(super) fn spawn_ledger_listener(&self) {
        let mut subscription = self.ledger.subscribe(&EventKind::ALL);
        if !subscription.is_active() {
            tracing::info!("Live ledger events unavailable, cache refreshes on demand only");
            return;
        }
        let store = self.clone();

        self.track(tokio::spawn(async move {
            while let Some(event) = subscription.recv().await {
                store.apply_event(event).await;
            }
            tracing::debug!("Ledger event stream closed");
        }));
    }
}
