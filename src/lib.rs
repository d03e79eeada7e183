pub mod config;
pub mod error;
pub mod services;
pub mod types;
pub mod utils;

use std::sync::Arc;

use crate::{
    config::Config,
    services::{
        ledger::{LedgerTransport, RemoteLedger, SimulatedLedger},
        pixel::OwnershipStore,
        wallet::WalletProvider,
    },
};

/// Store backed by the offline ledger. The ledger handle is returned so the
/// caller can steer it (e.g. make it reject transactions).
pub fn simulated_store(
    config: Config,
    wallet: Option<Arc<dyn WalletProvider>>,
) -> (OwnershipStore, Arc<SimulatedLedger>) {
    let ledger = Arc::new(SimulatedLedger::new(&config.ledger, config.wallet.mock_account.clone()));
    let store = OwnershipStore::new(Arc::new(config), ledger.clone(), wallet);
    (store, ledger)
}

/// Store backed by a deployed contract reached through `transport`.
pub fn remote_store<T: LedgerTransport + 'static>(
    config: Config,
    transport: T,
    wallet: Option<Arc<dyn WalletProvider>>,
) -> OwnershipStore {
    let ledger = Arc::new(RemoteLedger::new(
        transport,
        &config.ledger,
        config.canvas.default_color,
        config.wallet.mock_account.clone(),
    ));
    OwnershipStore::new(Arc::new(config), ledger, wallet)
}
