#![allow(dead_code)]

use std::{
    collections::HashMap,
    ops::Deref,
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use pixel_market::{
    config::Config,
    services::{
        grid::{Coordinates, PixelId},
        ledger::{LedgerEvent, LedgerTransport, TransactionHandle, TransportError, TransportResult},
        pixel::{OwnershipStore, StoreUpdate},
        wallet::{SimulatedWallet, WalletProvider},
    },
    types::{Address, Color, Wei},
};
use tokio::sync::broadcast;

pub const ACCOUNT: &str = "0xABCD";
pub const PRICE: Wei = 10_000_000_000_000_000;

pub fn account() -> Address {
    Address::parse(ACCOUNT).unwrap()
}

/// Defaults with prefetch off so only the test decides what gets cached.
pub fn config() -> Config {
    let mut config = Config::default();
    config.canvas.prefetch_blocks = 0;
    config
}

pub fn wallet(chain_id: u64) -> Arc<SimulatedWallet> {
    Arc::new(SimulatedWallet::new(vec![account()], chain_id))
}

pub fn as_provider(wallet: &Arc<SimulatedWallet>) -> Option<Arc<dyn WalletProvider>> {
    let provider: Arc<dyn WalletProvider> = wallet.clone();
    Some(provider)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Submitted {
    Claim { x: u32, y: u32, value: Wei },
    Batch { coords: Vec<Coordinates>, value: Wei },
    Recolor { id: PixelId, color: Color },
}

/// Contract binding with scripted state. Reads for unknown ids fail so the
/// fallback path is exercised. Clones share state, so a test can keep one
/// while the store owns another.
#[derive(Clone)]
pub struct ScriptedTransport(Arc<Script>);

pub struct Script {
    pub pixels: Mutex<HashMap<PixelId, (Address, String)>>,
    pub events: broadcast::Sender<LedgerEvent>,
    pub submitted: Mutex<Vec<Submitted>>,
    pub reject_writes: AtomicBool,
    pub reads_down: AtomicBool,
    pub confirmation: Duration,
}

impl Deref for ScriptedTransport {
    type Target = Script;

    fn deref(&self) -> &Script {
        &self.0
    }
}

impl ScriptedTransport {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(64);
        Self(Arc::new(Script {
            pixels: Mutex::new(HashMap::new()),
            events,
            submitted: Mutex::new(Vec::new()),
            reject_writes: AtomicBool::new(false),
            reads_down: AtomicBool::new(false),
            confirmation: Duration::from_millis(500),
        }))
    }

    pub fn with_pixel(self, id: PixelId, owner: &str, color: &str) -> Self {
        self.pixels
            .lock()
            .unwrap()
            .insert(id, (Address::parse(owner).unwrap(), color.to_string()));
        self
    }

    pub fn submitted(&self) -> Vec<Submitted> {
        self.submitted.lock().unwrap().clone()
    }

    fn submit(&self, what: Submitted) -> TransportResult<TransactionHandle> {
        if self.reject_writes.load(Ordering::SeqCst) {
            return Err(TransportError::Rejected("execution reverted".into()));
        }
        self.submitted.lock().unwrap().push(what);
        Ok(TransactionHandle::simulated(self.confirmation))
    }
}

#[async_trait]
impl LedgerTransport for ScriptedTransport {
    async fn grid_size(&self) -> TransportResult<u32> {
        if self.reads_down.load(Ordering::SeqCst) {
            return Err(TransportError::Unavailable);
        }
        Ok(1000)
    }

    async fn pixel_price(&self) -> TransportResult<Wei> {
        if self.reads_down.load(Ordering::SeqCst) {
            return Err(TransportError::Unavailable);
        }
        Ok(PRICE)
    }

    async fn pixel_info(&self, id: PixelId) -> TransportResult<(Address, String)> {
        if self.reads_down.load(Ordering::SeqCst) {
            return Err(TransportError::Unavailable);
        }
        self.pixels
            .lock()
            .unwrap()
            .get(&id)
            .cloned()
            .ok_or_else(|| TransportError::Rpc("call exception".into()))
    }

    async fn claim_pixel(&self, x: u32, y: u32, value: Wei) -> TransportResult<TransactionHandle> {
        self.submit(Submitted::Claim { x, y, value })
    }

    async fn claim_pixels(&self, coords: &[Coordinates], value: Wei) -> TransportResult<TransactionHandle> {
        self.submit(Submitted::Batch {
            coords: coords.to_vec(),
            value,
        })
    }

    async fn change_pixel_color(&self, id: PixelId, color: &Color) -> TransportResult<TransactionHandle> {
        self.submit(Submitted::Recolor { id, color: *color })
    }

    fn events(&self) -> TransportResult<broadcast::Receiver<LedgerEvent>> {
        Ok(self.events.subscribe())
    }
}

/// Waits for the next pixel notification and returns the ids it names.
pub async fn next_pixels(updates: &mut broadcast::Receiver<StoreUpdate>) -> Vec<PixelId> {
    loop {
        match tokio::time::timeout(Duration::from_secs(5), updates.recv()).await {
            Ok(Ok(StoreUpdate::Pixels(ids))) => return ids,
            Ok(Ok(_)) => continue,
            Ok(Err(error)) => panic!("store updates closed: {error}"),
            Err(_) => panic!("no pixel update within 5s"),
        }
    }
}

pub async fn wait_for<F>(store: &OwnershipStore, mut done: F)
where
    F: FnMut(&pixel_market::services::pixel::StoreState) -> bool,
{
    for _ in 0..200 {
        if done(&store.snapshot().await) {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not reached");
}
