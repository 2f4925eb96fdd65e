mod common;

use core_types::{ExecutionMode, OrderRequest, OrderStatus};
use engine::{ErrorKind, LedgerError};
use rust_decimal_macros::dec;
use std::sync::Arc;

#[tokio::test]
async fn buy_then_oversell_then_sell() -> anyhow::Result<()> {
    let ledger = common::ledger().await?;

    let bought = ledger
        .place_order(&OrderRequest::immediate("A1", "IBM", dec!(105.0), 10), None)
        .await?;
    assert_eq!(bought.status, OrderStatus::Applied);
    assert_eq!(bought.hold_stocks, 10);
    assert!(bought.created);

    let err = ledger
        .sell_stocks(&OrderRequest::immediate("A1", "IBM", dec!(95.0), 15), None)
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::InsufficientHoldings { held: 10, requested: 15 }));
    assert_eq!(err.kind(), ErrorKind::PreconditionFailed);

    let sold = ledger
        .sell_stocks(&OrderRequest::immediate("A1", "IBM", dec!(95.0), 5), None)
        .await?;
    assert_eq!(sold.status, OrderStatus::Applied);
    assert_eq!(sold.hold_stocks, 5);
    assert_eq!(sold.portfolio_id, bought.portfolio_id);

    let row = ledger.find_portfolio("A1", "IBM", None).await?.unwrap();
    assert_eq!(row.hold_stocks, 5);
    Ok(())
}

#[tokio::test]
async fn first_immediate_buy_creates_one_clean_row() -> anyhow::Result<()> {
    let ledger = common::ledger().await?;

    ledger
        .place_order(&OrderRequest::immediate("A2", "MSFT", dec!(50), 7), None)
        .await?;

    let rows = ledger.find_portfolios_for_account("A2", None).await?;
    assert_eq!(rows.len(), 1);
    let row = &rows[0];
    assert_eq!(row.symbol, "MSFT");
    assert_eq!(row.hold_stocks, 7);
    assert!(!row.has_pending_intent());
    assert_eq!(ledger.portfolio_count().await?, 1);

    // A second buy of the same pair reuses the row.
    let again = ledger
        .place_order(&OrderRequest::immediate("A2", "MSFT", dec!(60), 3), None)
        .await?;
    assert!(!again.created);
    assert_eq!(again.hold_stocks, 10);
    assert_eq!(ledger.portfolio_count().await?, 1);
    Ok(())
}

#[tokio::test]
async fn rejected_orders_change_nothing() -> anyhow::Result<()> {
    let ledger = common::ledger().await?;
    ledger
        .place_order(&OrderRequest::immediate("A1", "IBM", dec!(100), 10), None)
        .await?;
    let before = common::snapshot(&ledger).await?;

    // Ceiling below the market, on an existing row and on a new pair.
    let err = ledger
        .place_order(&OrderRequest::immediate("A1", "IBM", dec!(99.9), 5), None)
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::PriceCheckFailed { .. }));
    let err = ledger
        .place_order(&OrderRequest::immediate("A3", "ORCL", dec!(19), 5), None)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::PreconditionFailed);

    // Floor above the market, and more than is held.
    let err = ledger
        .sell_stocks(&OrderRequest::immediate("A1", "IBM", dec!(100.1), 5), None)
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::PriceCheckFailed { .. }));
    ledger
        .sell_stocks(&OrderRequest::immediate("A1", "IBM", dec!(1), 11), None)
        .await
        .unwrap_err();
    ledger
        .sell_stocks(&OrderRequest::deferred("A1", "IBM", dec!(1), 11), None)
        .await
        .unwrap_err();

    assert_eq!(common::snapshot(&ledger).await?, before);
    Ok(())
}

#[tokio::test]
async fn deferred_orders_are_stored_as_intents() -> anyhow::Result<()> {
    let ledger = common::ledger().await?;

    let queued = ledger
        .place_order(&OrderRequest::deferred("A1", "ORCL", dec!(18), 4), None)
        .await?;
    assert_eq!(queued.status, OrderStatus::Queued);
    assert!(queued.created);
    assert_eq!(queued.hold_stocks, 0);

    // A later deferred buy replaces the earlier intent.
    ledger
        .place_order(&OrderRequest::deferred("A1", "ORCL", dec!(17.5), 9), None)
        .await?;
    let row = ledger.find_portfolio("A1", "ORCL", None).await?.unwrap();
    assert!(row.to_buy);
    assert_eq!(row.number_buy, 9);
    assert_eq!(row.price_buy, dec!(17.5));
    assert_eq!(row.hold_stocks, 0);
    assert!(!row.to_sell);

    // Intents are never settled: an immediate buy applies on top of them.
    ledger
        .place_order(&OrderRequest::immediate("A1", "ORCL", dec!(25), 6), None)
        .await?;
    let sell = ledger
        .sell_stocks(&OrderRequest::deferred("A1", "ORCL", dec!(30), 2), None)
        .await?;
    assert_eq!(sell.status, OrderStatus::Queued);
    assert_eq!(sell.hold_stocks, 6);

    let row = ledger.find_portfolio("A1", "ORCL", None).await?.unwrap();
    assert!(row.to_buy && row.to_sell);
    assert_eq!((row.number_sell, row.price_sell), (2, dec!(30)));
    Ok(())
}

#[tokio::test]
async fn selling_a_pair_never_bought_is_not_found() -> anyhow::Result<()> {
    let ledger = common::ledger().await?;

    let err = ledger
        .sell_stocks(&OrderRequest::immediate("A1", "MSFT", dec!(1), 1), None)
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::PortfolioNotFound { .. }));
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert_eq!(ledger.portfolio_count().await?, 0);
    Ok(())
}

#[tokio::test]
async fn unknown_identities_and_bad_amounts_are_rejected() -> anyhow::Result<()> {
    let ledger = common::ledger().await?;

    let err = ledger
        .place_order(&OrderRequest::immediate("NOPE", "IBM", dec!(200), 1), None)
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::AccountNotFound(ref id) if id == "NOPE"));

    let err = ledger
        .place_order(&OrderRequest::immediate("A1", "XYZ", dec!(200), 1), None)
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::SymbolNotFound(_)));

    for amount in [0, -5] {
        let request = OrderRequest {
            account_id: "A1".to_string(),
            symbol: "IBM".to_string(),
            price: dec!(200),
            amount,
            mode: ExecutionMode::Immediate,
        };
        let err = ledger.place_order(&request, None).await.unwrap_err();
        assert!(matches!(err, LedgerError::InvalidInput(_)));
    }

    assert_eq!(ledger.portfolio_count().await?, 0);
    Ok(())
}

#[tokio::test]
async fn id_collisions_are_reported_not_overwritten() -> anyhow::Result<()> {
    let ledger = common::ledger_with(
        database::MemoryStore::default(),
        Arc::new(common::StuckIds("77")),
        Arc::new(common::FixedWalk(true)),
    )
    .await?;

    ledger
        .place_order(&OrderRequest::immediate("A1", "IBM", dec!(100), 1), None)
        .await?;
    let err = ledger
        .place_order(&OrderRequest::immediate("A2", "IBM", dec!(100), 1), None)
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::DuplicatePortfolio(ref id) if id == "77"));

    let row = ledger.find_portfolio("A1", "IBM", None).await?.unwrap();
    assert_eq!(row.portfolio_id, "77");
    assert!(ledger.find_portfolio("A2", "IBM", None).await?.is_none());
    Ok(())
}
