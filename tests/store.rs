mod common;

use std::time::Duration;

use common::*;
use pixel_market::{
    error::{AppError, ErrorKind},
    remote_store,
    services::{
        grid::{self, Coordinates},
        pixel::{RecordSource, SessionStatus},
    },
    simulated_store,
    types::{Color, Owner},
};

#[tokio::test(start_paused = true)]
async fn scenario_select_claim_recolor_105() {
    let wallet = wallet(84531);
    let (store, _ledger) = simulated_store(config(), as_provider(&wallet));
    store.connect().await.unwrap();
    assert!(store.pixel(105).await.is_none());

    let placeholder = store.select(Some(105)).await.unwrap().unwrap();
    assert_eq!((placeholder.x, placeholder.y), (105, 0));
    assert_eq!(placeholder.owner, Owner::Unknown);
    assert_eq!(placeholder.color, Color::WHITE);

    let claimed = store.claim_selected().await.unwrap();
    assert_eq!(claimed.owner, Owner::Account(account()));
    assert_eq!((claimed.x, claimed.y), (105, 0));
    assert_eq!(claimed.source, RecordSource::Optimistic);

    let recolored = store.change_color(105, "#FF0000").await.unwrap();
    assert_eq!(recolored.color, Color::rgb(0xFF, 0, 0));
    assert_eq!(recolored.owner, Owner::Account(account()));
    assert_eq!(store.pixel(105).await, Some(recolored));
    assert!(store.error().await.is_none());
}

#[tokio::test(start_paused = true)]
async fn batch_claim_is_one_transaction_at_scaled_price() {
    let transport = ScriptedTransport::new();
    let store = remote_store(config(), transport.clone(), None);
    store.connect().await.unwrap();

    let coords = [
        Coordinates::new(1, 1),
        Coordinates::new(2, 2),
        Coordinates::new(3, 3),
        Coordinates::new(2, 2),
    ];
    let claimed = store.claim_multiple(&coords).await.unwrap();

    assert_eq!(claimed.iter().map(|r| r.id).collect::<Vec<_>>(), vec![1001, 2002, 3003]);
    assert!(claimed.windows(2).all(|pair| pair[0].color == pair[1].color));
    assert_eq!(Color::parse(&claimed[0].color.to_hex()).unwrap(), claimed[0].color);
    assert_eq!(
        transport.submitted(),
        vec![Submitted::Batch {
            coords: coords[..3].to_vec(),
            value: PRICE * 3,
        }]
    );
    let mock = store.config().wallet.mock_account.clone();
    for id in [1001, 2002, 3003] {
        assert!(store.pixel(id).await.unwrap().owner.is(&mock));
    }
}

#[tokio::test(start_paused = true)]
async fn batch_claim_shares_one_fresh_color() {
    let (store, _ledger) = simulated_store(config(), None);
    store.connect().await.unwrap();

    let coords = [Coordinates::new(1, 1), Coordinates::new(2, 2), Coordinates::new(3, 3)];
    let claimed = store.claim_multiple(&coords).await.unwrap();
    assert_eq!(claimed.len(), 3);

    let color = claimed[0].color;
    for id in [1001, 2002, 3003] {
        let record = store.pixel(id).await.unwrap();
        assert_eq!(record.color, color);
        assert_eq!(record.source, RecordSource::Optimistic);
    }
}

#[tokio::test]
async fn simulated_owned_pixels_belong_to_configured_mock_account() {
    let mut config = config();
    let mock = pixel_market::types::Address::parse("0x2222222222222222222222222222222222222222").unwrap();
    config.wallet.mock_account = mock.clone();
    let (store, _ledger) = simulated_store(config, None);
    store.connect().await.unwrap();

    for id in 0..100 {
        store.load_pixel(id).await.unwrap();
    }
    let snapshot = store.snapshot().await;
    assert_eq!(snapshot.session.account.as_ref(), Some(&mock));
    assert!(!snapshot.owned_by(&mock).is_empty());
    assert!(snapshot.pixels.values().all(|record| match &record.owner {
        Owner::Account(owner) => owner == &mock,
        _ => true,
    }));
}

#[tokio::test(start_paused = true)]
async fn rejected_batch_leaves_cache_untouched() {
    let (store, ledger) = simulated_store(config(), None);
    store.connect().await.unwrap();
    ledger.set_rejecting(true);

    let coords = [Coordinates::new(1, 1), Coordinates::new(2, 2), Coordinates::new(3, 3)];
    let err = store.claim_multiple(&coords).await.unwrap_err();
    assert!(matches!(err, AppError::TransactionRejected(_)));

    for id in [1001, 2002, 3003] {
        assert!(store.pixel(id).await.is_none());
    }
    assert_eq!(store.error().await.unwrap().kind, ErrorKind::TransactionRejected);
}

#[tokio::test(start_paused = true)]
async fn failed_confirmation_is_rejected_without_cache_write() {
    let transport = ScriptedTransport::new();
    transport.reject_writes.store(true, std::sync::atomic::Ordering::SeqCst);
    let store = remote_store(config(), transport.clone(), None);
    store.connect().await.unwrap();
    store.select(Some(7)).await.unwrap();

    let err = store.claim_selected().await.unwrap_err();
    assert!(matches!(err, AppError::TransactionRejected(msg) if msg.contains("reverted")));
    let cached = store.pixel(7).await;
    assert!(cached.is_none_or(|record| record.source != RecordSource::Optimistic));
}

#[tokio::test(start_paused = true)]
async fn recolor_twice_is_idempotent() {
    let (store, _ledger) = simulated_store(config(), None);
    store.connect().await.unwrap();
    store.select(Some(42)).await.unwrap();
    store.claim_selected().await.unwrap();

    let first = store.change_color(42, "#00ff00").await.unwrap();
    let second = store.change_color(42, "#00FF00").await.unwrap();
    assert_eq!(first, second);
    assert_eq!(store.pixel(42).await.unwrap().color, Color::rgb(0, 0xFF, 0));
}

#[tokio::test(start_paused = true)]
async fn recolor_checks_color_then_session_then_owner() {
    let transport = ScriptedTransport::new().with_pixel(9, "0x1234", "#000000");
    let store = remote_store(config(), transport.clone(), None);

    let err = store.change_color(9, "red").await.unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));

    let err = store.change_color(9, "#FFFFFF").await.unwrap_err();
    assert!(matches!(err, AppError::PreconditionFailed(_)));

    store.connect().await.unwrap();
    store.load_pixel(9).await.unwrap();
    let err = store.change_color(9, "#FFFFFF").await.unwrap_err();
    assert!(matches!(err, AppError::Authorization(_)));
    assert_eq!(store.pixel(9).await.unwrap().color, Color::rgb(0, 0, 0));

    let err = store.change_color(10, "#FFFFFF").await.unwrap_err();
    assert!(matches!(err, AppError::Authorization(_)));
    assert!(store.pixel(10).await.is_none());

    assert!(transport.submitted().is_empty());
    assert_eq!(store.error().await.unwrap().kind, ErrorKind::Authorization);
}

#[tokio::test(start_paused = true)]
async fn claim_requires_selection_and_session() {
    let (store, _ledger) = simulated_store(config(), None);
    let err = store.claim_selected().await.unwrap_err();
    assert!(matches!(err, AppError::PreconditionFailed(_)));

    store.select(Some(5)).await.unwrap();
    let err = store.claim_selected().await.unwrap_err();
    assert!(matches!(err, AppError::PreconditionFailed(_)));

    let err = store.select(Some(1_000_000)).await.unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
}

#[tokio::test(start_paused = true)]
async fn concurrent_claims_of_one_pixel_submit_once() {
    let transport = ScriptedTransport::new();
    let store = remote_store(config(), transport.clone(), None);
    store.connect().await.unwrap();
    store.select(Some(105)).await.unwrap();

    let (first, second) = tokio::join!(store.claim_selected(), store.claim_selected());
    let outcomes = [first.is_ok(), second.is_ok()];
    assert_eq!(outcomes.iter().filter(|ok| **ok).count(), 1);
    let failure = first.err().or(second.err()).unwrap();
    assert!(matches!(failure, AppError::PreconditionFailed(_)));
    assert_eq!(transport.submitted().len(), 1);
    assert!(!store.is_pending(105));
}

#[tokio::test(start_paused = true)]
async fn disconnect_while_pending_discards_result() {
    let (store, _ledger) = simulated_store(config(), None);
    store.connect().await.unwrap();
    store.select(Some(105)).await.unwrap();

    let pending = tokio::spawn({
        let store = store.clone();
        async move { store.claim_selected().await }
    });
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(store.is_loading());
    store.disconnect().await;

    let err = pending.await.unwrap().unwrap_err();
    assert!(matches!(err, AppError::PreconditionFailed(msg) if msg.contains("Session ended")));
    let cached = store.pixel(105).await;
    assert!(cached.is_none_or(|record| record.source != RecordSource::Optimistic));

    let snapshot = store.snapshot().await;
    assert_eq!(snapshot.session.status, SessionStatus::Disconnected);
    assert!(snapshot.selection.pixel.is_none());
    assert!(!snapshot.is_loading);
}

#[tokio::test(start_paused = true)]
async fn unreachable_ledger_degrades_reads() {
    let transport = ScriptedTransport::new();
    transport.reads_down.store(true, std::sync::atomic::Ordering::SeqCst);
    let store = remote_store(config(), transport, None);
    store.connect().await.unwrap();

    let snapshot = store.snapshot().await;
    assert_eq!(snapshot.grid_size, 1000);
    assert_eq!(snapshot.pixel_price, Some(PRICE));

    let record = store.load_pixel_at(5, 5).await.unwrap();
    assert_eq!(record.id, 5005);
    assert_eq!(record.owner, Owner::Unknown);
    assert_eq!(record.source, RecordSource::Fallback);
    assert!(store.error().await.is_none());
}

#[tokio::test(start_paused = true)]
async fn ledger_reads_populate_cache() {
    let transport = ScriptedTransport::new().with_pixel(1001, "0x0000000000000000000000000000000000000000", "");
    let store = remote_store(config(), transport, None);
    store.connect().await.unwrap();

    let record = store.load_pixel(1001).await.unwrap();
    assert_eq!(record.owner, Owner::Unclaimed);
    assert_eq!(record.source, RecordSource::Ledger);
    assert_eq!(record.coordinates(), grid::to_coordinates(1001, 1000).unwrap());
}

#[tokio::test(start_paused = true)]
async fn block_selection_claims_single_and_multiple() {
    let (store, _ledger) = simulated_store(config(), None);
    store.connect().await.unwrap();

    let selected = store.handle_block_click(Coordinates::new(4, 0)).await.unwrap();
    assert_eq!(selected.unwrap().id, 4);
    assert!(store.handle_block_click(Coordinates::new(4, 0)).await.unwrap().is_none());
    assert!(store.snapshot().await.selection.blocks.is_empty());

    store.handle_block_click(Coordinates::new(4, 0)).await.unwrap();
    let claimed = store.claim_selected_blocks().await.unwrap();
    assert_eq!(claimed.len(), 1);

    store.set_multi_select(true).await;
    store.handle_block_click(Coordinates::new(6, 6)).await.unwrap();
    store.handle_block_click(Coordinates::new(7, 7)).await.unwrap();
    store.handle_block_click(Coordinates::new(8, 8)).await.unwrap();
    assert_eq!(
        store.toggle_block(Coordinates::new(8, 8)).await.unwrap(),
        vec![Coordinates::new(6, 6), Coordinates::new(7, 7)]
    );

    let claimed = store.claim_selected_blocks().await.unwrap();
    assert_eq!(claimed.iter().map(|r| r.id).collect::<Vec<_>>(), vec![6006, 7007]);
    assert!(store.snapshot().await.selection.blocks.is_empty());

    let err = store.claim_selected_blocks().await.unwrap_err();
    assert!(matches!(err, AppError::PreconditionFailed(_)));
}

#[tokio::test(start_paused = true)]
async fn claim_chunk_covers_rectangle() {
    let (store, _ledger) = simulated_store(config(), None);
    store.connect().await.unwrap();

    let claimed = store.claim_chunk(Coordinates::new(10, 10), 2, 2).await.unwrap();
    assert_eq!(
        claimed.iter().map(|r| r.id).collect::<Vec<_>>(),
        vec![10010, 10011, 11010, 11011]
    );

    let err = store.claim_chunk(Coordinates::new(999, 0), 2, 1).await.unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
}

#[tokio::test(start_paused = true)]
async fn errors_persist_until_cleared() {
    let (store, _ledger) = simulated_store(config(), None);
    store.claim_selected().await.unwrap_err();
    let notice = store.error().await.unwrap();
    assert_eq!(notice.kind, ErrorKind::PreconditionFailed);

    store.connect().await.unwrap();
    assert_eq!(store.error().await, Some(notice));

    store.clear_error().await;
    assert!(store.error().await.is_none());
}

#[tokio::test(start_paused = true)]
async fn portfolio_lists_owned_pixels() {
    let (store, _ledger) = simulated_store(config(), None);
    assert!(store.export_portfolio().await.is_err());

    store.connect().await.unwrap();
    store.claim_multiple(&[Coordinates::new(5, 0), Coordinates::new(1, 2)]).await.unwrap();

    let file = store.export_portfolio().await.unwrap();
    assert!(file.file_name.starts_with("pixel-portfolio-0x742d-"));
    let document: serde_json::Value = serde_json::from_str(&file.contents).unwrap();
    let ids: Vec<u64> = document["pixels"]
        .as_array()
        .unwrap()
        .iter()
        .map(|pixel| pixel["id"].as_u64().unwrap())
        .collect();
    assert_eq!(ids, vec![5, 2001]);
    assert_eq!(store.portfolio_summary().await.unwrap().pixels_owned, 2);
}
