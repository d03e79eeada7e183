use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use pixel_market::{
    config::Config,
    error::Result,
    services::{
        canvas::CanvasRenderer,
        grid::Coordinates,
        pixel::OwnershipStore,
        wallet::{SimulatedWallet, WalletProvider},
    },
    simulated_store,
    utils::{
        format::{format_address, format_eth},
        telemetry::{init_tracing, shutdown_signal},
    },
};

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing()?;

    let config = Config::from_env()?;
    config.validate()?;
    tracing::info!("Configuration loaded");

    if !config.ledger.simulated {
        tracing::warn!(
            contract = %config.ledger.contract_address,
            "No contract transport is bundled with this binary, running against the simulated ledger"
        );
    }

    let output_dir = PathBuf::from(std::env::var("OUTPUT_DIR").unwrap_or_else(|_| "out".into()));
    tokio::fs::create_dir_all(&output_dir).await?;

    // Starts on mainnet so the session exercises the network switch.
    let wallet: Arc<dyn WalletProvider> = Arc::new(
        SimulatedWallet::new(vec![config.wallet.mock_account.clone()], 1).with_known_chains(&[1]),
    );
    let (store, _ledger) = simulated_store(config.clone(), Some(wallet));
    let renderer = CanvasRenderer::new(&config.canvas);

    tokio::select! {
        result = run_session(&store, &renderer, &output_dir) => result?,
        _ = shutdown_signal() => {}
    }

    store.disconnect().await;
    tracing::info!("Session finished");

    Ok(())
}

async fn run_session(
    store: &OwnershipStore,
    renderer: &CanvasRenderer,
    output_dir: &Path,
) -> Result<()> {
    store.connect().await?;
    let snapshot = store.snapshot().await;
    tracing::info!(
        account = %format_address(snapshot.session.account.as_ref(), 4),
        price = %format_eth(snapshot.pixel_price, 4),
        grid_size = snapshot.grid_size,
        "Session open"
    );

    store.handle_block_click(Coordinates::new(5, 5)).await?;
    let claimed = store.claim_selected_blocks().await?;
    tracing::info!(pixels = claimed.len(), "Single block claimed");

    store.set_multi_select(true).await;
    for coords in [Coordinates::new(1, 1), Coordinates::new(2, 2), Coordinates::new(3, 3)] {
        store.toggle_block(coords).await?;
    }
    let claimed = store.claim_selected_blocks().await?;
    tracing::info!(pixels = claimed.len(), "Block batch claimed");

    if let Some(record) = claimed.first() {
        store.change_color(record.id, "#0052FF").await?;
    }

    let snapshot = store.snapshot().await;
    tracing::info!(status = %renderer.status_line(&snapshot), "Canvas status");

    let png = renderer.paint(&snapshot).encode_png()?;
    let canvas_path = output_dir.join("canvas.png");
    tokio::fs::write(&canvas_path, png).await?;
    tracing::info!(path = %canvas_path.display(), "Canvas written");

    let portfolio = store.export_portfolio().await?;
    let portfolio_path = output_dir.join(&portfolio.file_name);
    tokio::fs::write(&portfolio_path, portfolio.contents).await?;
    tracing::info!(path = %portfolio_path.display(), "Portfolio written");

    Ok(())
}
