use std::collections::HashMap;

use serde::Serialize;
use uuid::Uuid;

use crate::{
    error::ErrorNotice,
    services::{
        grid::{self, Coordinates, PixelId},
        ledger::{InfoSource, LedgerMode, PixelInfo},
    },
    types::{Address, Color, Owner, Wei},
};

/// Where a cached record's current content came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordSource {
    /// Read from the ledger.
    Ledger,
    /// Substituted because the ledger could not be read.
    Fallback,
    /// Synthesized locally while the real state loads.
    Placeholder,
    /// Written locally after our own transaction confirmed.
    Optimistic,
    /// Pushed by a ledger event.
    Event,
}

impl From<InfoSource> for RecordSource {
    fn from(value: InfoSource) -> Self {
        match value {
            InfoSource::Ledger => Self::Ledger,
            InfoSource::Fallback => Self::Fallback,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PixelRecord {
    pub id: PixelId,
    pub x: u32,
    pub y: u32,
    pub owner: Owner,
    pub color: Color,
    pub source: RecordSource,
}

impl PixelRecord {
    pub fn placeholder(id: PixelId, coords: Coordinates, color: Color) -> Self {
        Self {
            id,
            x: coords.x,
            y: coords.y,
            owner: Owner::Unknown,
            color,
            source: RecordSource::Placeholder,
        }
    }

    pub fn from_info(id: PixelId, coords: Coordinates, info: PixelInfo) -> Self {
        Self {
            id,
            x: coords.x,
            y: coords.y,
            owner: info.owner,
            color: info.color,
            source: info.source.into(),
        }
    }

    pub fn coordinates(&self) -> Coordinates {
        Coordinates::new(self.x, self.y)
    }

    /// True when the content reflects ledger state rather than a local guess.
    pub fn is_confirmed(&self) -> bool {
        matches!(self.source, RecordSource::Ledger | RecordSource::Event)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionState {
    pub status: SessionStatus,
    pub account: Option<Address>,
    pub chain_id: Option<u64>,
    pub session_id: Option<Uuid>,
}

impl SessionState {
    pub fn connected(account: Address, chain_id: u64, session_id: Uuid) -> Self {
        Self {
            status: SessionStatus::Connected,
            account: Some(account),
            chain_id: Some(chain_id),
            session_id: Some(session_id),
        }
    }

    pub fn is_connected(&self) -> bool {
        self.status == SessionStatus::Connected
    }

    pub fn active(&self) -> Option<(Address, Uuid)> {
        match (&self.status, &self.account, self.session_id) {
            (SessionStatus::Connected, Some(account), Some(session_id)) => {
                Some((account.clone(), session_id))
            }
            _ => None,
        }
    }

    pub fn is_current(&self, session_id: Uuid) -> bool {
        self.is_connected() && self.session_id == Some(session_id)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    pub pixel: Option<PixelId>,
    pub blocks: Vec<Coordinates>,
    pub multi_select: bool,
}

#[derive(Debug, Clone)]
pub struct StoreState {
    pub session: SessionState,
    pub grid_size: u32,
    pub pixel_price: Option<Wei>,
    pub ledger_mode: LedgerMode,
    pub default_color: Color,
    pub pixels: HashMap<PixelId, PixelRecord>,
    pub selection: Selection,
    pub error: Option<ErrorNotice>,
    pub is_loading: bool,
}

impl StoreState {
    pub fn new(grid_size: u32, ledger_mode: LedgerMode, default_color: Color) -> Self {
        Self {
            session: SessionState::default(),
            grid_size,
            pixel_price: None,
            ledger_mode,
            default_color,
            pixels: HashMap::new(),
            selection: Selection::default(),
            error: None,
            is_loading: false,
        }
    }

    pub fn pixel(&self, id: PixelId) -> Option<&PixelRecord> {
        self.pixels.get(&id)
    }

    /// The selected pixel, or a placeholder if its state has not loaded yet.
    pub fn selected_pixel(&self) -> Option<PixelRecord> {
        let id = self.selection.pixel?;
        if let Some(record) = self.pixels.get(&id) {
            return Some(record.clone());
        }
        let coords = grid::to_coordinates(id, self.grid_size).ok()?;
        Some(PixelRecord::placeholder(id, coords, self.default_color))
    }

    pub fn owned_by(&self, account: &Address) -> Vec<&PixelRecord> {
        let mut owned: Vec<&PixelRecord> = self
            .pixels
            .values()
            .filter(|record| record.owner.is(account))
            .collect();
        owned.sort_by_key(|record| record.id);
        owned
    }

    /// Ledger data is synthetic in this mode and should be flagged to the user.
    pub fn is_degraded(&self) -> bool {
        self.ledger_mode == LedgerMode::Simulated
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreUpdate {
    Session(SessionStatus),
    Ledger { grid_size: u32, pixel_price: Wei },
    Pixels(Vec<PixelId>),
    Selection,
    Error(Option<ErrorNotice>),
    Loading(bool),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> StoreState {
        StoreState::new(1000, LedgerMode::Remote, Color::WHITE)
    }

    #[test]
    fn selected_pixel_falls_back_to_placeholder() {
        let mut state = state();
        assert!(state.selected_pixel().is_none());

        state.selection.pixel = Some(105);
        let placeholder = state.selected_pixel().unwrap();
        assert_eq!(placeholder.coordinates(), Coordinates::new(105, 0));
        assert_eq!(placeholder.owner, Owner::Unknown);
        assert!(!placeholder.is_confirmed());
    }

    #[test]
    fn owned_by_matches_case_insensitively_in_id_order() {
        let mut state = state();
        let owner = Address::parse("0xabcd").unwrap();
        for id in [7, 3, 5] {
            state.pixels.insert(
                id,
                PixelRecord {
                    owner: if id == 5 { Owner::Unclaimed } else { Owner::Account(owner.clone()) },
                    ..PixelRecord::placeholder(id, Coordinates::new(id as u32, 0), Color::WHITE)
                },
            );
        }

        let owned = state.owned_by(&Address::parse("0xABCD").unwrap());
        assert_eq!(owned.iter().map(|r| r.id).collect::<Vec<_>>(), vec![3, 7]);
    }

    #[test]
    fn session_is_current_only_while_connected() {
        let session_id = Uuid::new_v4();
        let session = SessionState::connected(Address::zero(), 1, session_id);
        assert!(session.is_current(session_id));
        assert!(!session.is_current(Uuid::new_v4()));
        assert!(!SessionState::default().is_current(session_id));
    }
}
