use std::{
    future::Future,
    sync::atomic::{AtomicU32, Ordering},
    time::Duration,
};

use async_trait::async_trait;

use crate::{
    config::{LedgerConfig, ReadFallback},
    error::{AppError, Result},
    services::{
        grid::{Coordinates, PixelId},
        ledger::{
            EventKind, EventSubscription, InfoSource, Ledger, LedgerMode, LedgerTransport,
            PixelInfo, TransactionHandle, TransportError, TransportResult, ensure_batch,
            simulated::synthetic_pixel_info,
        },
    },
    types::{Address, Color, Owner, Wei},
};

/// Ledger backed by a deployed contract through `T`.
pub struct RemoteLedger<T> {
    transport: T,
    contract_address: String,
    grid_size: AtomicU32,
    fallback_price: Wei,
    read_fallback: ReadFallback,
    read_timeout: Duration,
    default_color: Color,
    demo_owner: Address,
}

impl<T: LedgerTransport> RemoteLedger<T> {
    /// `demo_owner` only matters for [`ReadFallback::Synthetic`], where it
    /// owns the synthesized pixels.
    pub fn new(transport: T, config: &LedgerConfig, default_color: Color, demo_owner: Address) -> Self {
        Self {
            transport,
            contract_address: config.contract_address.clone(),
            grid_size: AtomicU32::new(config.default_grid_size),
            fallback_price: config.fallback_price_wei,
            read_fallback: config.read_fallback,
            read_timeout: config.read_timeout,
            default_color,
            demo_owner,
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Read failures stay inside this type: callers log them and fall back.
    async fn read<V>(&self, call: impl Future<Output = TransportResult<V>>) -> Result<V> {
        tokio::time::timeout(self.read_timeout, call)
            .await
            .unwrap_or(Err(TransportError::Timeout))
            .map_err(|error| AppError::TransportFailure(error.to_string()))
    }

    fn fallback_info(&self, id: PixelId) -> PixelInfo {
        match self.read_fallback {
            ReadFallback::Unknown => PixelInfo {
                owner: Owner::Unknown,
                color: self.default_color,
                source: InfoSource::Fallback,
            },
            ReadFallback::Synthetic => synthetic_pixel_info(id, &self.demo_owner),
        }
    }
}

#[async_trait]
impl<T: LedgerTransport> Ledger for RemoteLedger<T> {
    fn mode(&self) -> LedgerMode {
        LedgerMode::Remote
    }

    async fn initialize(&self) {
        match self.read(self.transport.grid_size()).await {
            Ok(0) => {
                tracing::warn!(
                    contract = %self.contract_address,
                    "Ledger reported zero grid size, keeping default"
                );
            }
            Ok(size) => {
                self.grid_size.store(size, Ordering::SeqCst);
                tracing::info!(contract = %self.contract_address, grid_size = size, "Ledger initialized");
            }
            Err(error) => {
                tracing::warn!(
                    contract = %self.contract_address,
                    error = %error,
                    grid_size = self.grid_size(),
                    "Failed to read grid size, using default"
                );
            }
        }
    }

    fn grid_size(&self) -> u32 {
        self.grid_size.load(Ordering::SeqCst)
    }

    async fn pixel_price(&self) -> Wei {
        match self.read(self.transport.pixel_price()).await {
            Ok(price) => price,
            Err(error) => {
                tracing::warn!(error = %error, "Failed to read pixel price, using fallback price");
                self.fallback_price
            }
        }
    }

    async fn pixel_info(&self, id: PixelId) -> PixelInfo {
        match self.read(self.transport.pixel_info(id)).await {
            Ok((owner, color)) => {
                let color = match Color::parse(&color) {
                    Ok(color) => color,
                    Err(_) => {
                        if !color.is_empty() {
                            tracing::warn!(pixel_id = id, color = %color, "Ledger returned malformed color");
                        }
                        self.default_color
                    }
                };
                PixelInfo {
                    owner: Owner::from_ledger(owner),
                    color,
                    source: InfoSource::Ledger,
                }
            }
            Err(error) => {
                tracing::warn!(pixel_id = id, error = %error, fallback = ?self.read_fallback, "Failed to read pixel, using fallback data");
                self.fallback_info(id)
            }
        }
    }

    async fn claim_pixel(&self, x: u32, y: u32, value: Wei) -> Result<TransactionHandle> {
        let handle = self
            .transport
            .claim_pixel(x, y, value)
            .await
            .inspect_err(|error| tracing::error!(x, y, error = %error, "claimPixel rejected"))?;
        tracing::info!(x, y, tx_hash = %handle.hash(), "claimPixel submitted");
        Ok(handle)
    }

    async fn claim_pixels(&self, coords: &[Coordinates], value: Wei) -> Result<TransactionHandle> {
        ensure_batch(coords)?;
        let handle = self
            .transport
            .claim_pixels(coords, value)
            .await
            .inspect_err(|error| {
                tracing::error!(count = coords.len(), error = %error, "Batch claim rejected")
            })?;
        tracing::info!(count = coords.len(), tx_hash = %handle.hash(), "Batch claim submitted");
        Ok(handle)
    }

    async fn change_pixel_color(&self, id: PixelId, color: Color) -> Result<TransactionHandle> {
        let handle = self
            .transport
            .change_pixel_color(id, &color)
            .await
            .inspect_err(|error| {
                tracing::error!(pixel_id = id, error = %error, "changePixelColor rejected")
            })?;
        tracing::info!(pixel_id = id, color = %color, tx_hash = %handle.hash(), "changePixelColor submitted");
        Ok(handle)
    }

    fn subscribe(&self, kinds: &[EventKind]) -> EventSubscription {
        match self.transport.events() {
            Ok(receiver) => EventSubscription::new(receiver, kinds),
            Err(error) => {
                tracing::warn!(error = %error, "Event listener not supported");
                EventSubscription::inert()
            }
        }
    }
}
