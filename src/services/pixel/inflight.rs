use std::{
    collections::HashSet,
    sync::{Arc, Mutex, PoisonError},
};

use crate::services::grid::PixelId;

/// Tracks pixel ids with a mutating transaction in flight.
#[derive(Debug, Default)]
pub struct InFlightGuard {
    pending: Arc<Mutex<HashSet<PixelId>>>,
}

impl InFlightGuard {
    /// Reserves every id in `ids`, or none of them if any is already pending.
    pub fn acquire(&self, ids: &[PixelId]) -> Option<InFlightPermit> {
        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        if ids.iter().any(|id| pending.contains(id)) {
            return None;
        }
        pending.extend(ids.iter().copied());

        Some(InFlightPermit {
            ids: ids.to_vec(),
            pending: Arc::clone(&self.pending),
        })
    }

    pub fn is_pending(&self, id: PixelId) -> bool {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&id)
    }
}

/// Releases its ids when dropped.
#[derive(Debug)]
pub struct InFlightPermit {
    ids: Vec<PixelId>,
    pending: Arc<Mutex<HashSet<PixelId>>>,
}

impl Drop for InFlightPermit {
    fn drop(&mut self) {
        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        for id in &self.ids {
            pending.remove(id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overlapping_reservations_are_refused() {
        let guard = InFlightGuard::default();
        let permit = guard.acquire(&[1, 2]).unwrap();
        assert!(guard.acquire(&[2, 3]).is_none());
        assert!(!guard.is_pending(3));

        drop(permit);
        assert!(guard.acquire(&[2, 3]).is_some());
    }
}
