//! Caller-owned transactions: the ledger works inside them and never finishes
//! them itself.

mod common;

use core_types::{OrderRequest, OrderTicket};
use database::LedgerStore;
use engine::{ErrorKind, LedgerError, PriceUpdate};
use rust_decimal_macros::dec;

#[tokio::test]
async fn caller_abort_discards_work_done_in_a_borrowed_transaction() -> anyhow::Result<()> {
    let ledger = common::ledger().await?;

    let mut txn = ledger.begin("CALLER").await?;
    ledger
        .place_order(&OrderRequest::immediate("A1", "IBM", dec!(100), 10), Some(&mut txn))
        .await?;
    ledger
        .set_price("IBM", PriceUpdate::Set(dec!(1)), Some(&mut txn))
        .await?;
    // The work is visible inside the transaction.
    let row = ledger.find_portfolio("A1", "IBM", Some(&mut txn)).await?;
    assert_eq!(row.map(|p| p.hold_stocks), Some(10));
    ledger.abort(txn).await?;

    assert_eq!(ledger.portfolio_count().await?, 0);
    let quote = ledger.get_quote("IBM", false, None).await?;
    assert_eq!(quote.current_price, dec!(100));
    Ok(())
}

#[tokio::test]
async fn a_failure_inside_a_borrowed_transaction_leaves_it_open() -> anyhow::Result<()> {
    let ledger = common::ledger().await?;

    let mut txn = ledger.begin("CALLER").await?;
    ledger
        .place_order(&OrderRequest::immediate("A1", "IBM", dec!(100), 10), Some(&mut txn))
        .await?;
    let err = ledger
        .sell_stocks(&OrderRequest::immediate("A1", "IBM", dec!(100), 50), Some(&mut txn))
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::InsufficientHoldings { .. }));

    // The transaction is still usable and the caller decides to keep the buy.
    ledger
        .place_orders(&[OrderTicket::new("A2", "MSFT", dec!(50), 1)], Some(&mut txn))
        .await?;
    ledger.commit(txn).await?;

    assert_eq!(ledger.portfolio_count().await?, 2);
    Ok(())
}

#[tokio::test]
async fn a_busy_store_surfaces_a_retryable_timeout() -> anyhow::Result<()> {
    let ledger = common::ledger_with(
        common::short_timeout_store(),
        std::sync::Arc::new(engine::AtomicIdAllocator::default()),
        std::sync::Arc::new(common::FixedWalk(true)),
    )
    .await?;

    let holder = ledger.store().begin("HOLDER").await?;
    let err = ledger
        .place_order(&OrderRequest::immediate("A1", "IBM", dec!(100), 1), None)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Timeout);
    assert!(err.is_retryable());
    ledger.store().abort(holder).await?;

    // Once the holder is gone the same request goes through.
    ledger
        .place_order(&OrderRequest::immediate("A1", "IBM", dec!(100), 1), None)
        .await?;
    Ok(())
}

#[tokio::test]
async fn committed_reads_answer_while_a_caller_transaction_is_open() -> anyhow::Result<()> {
    let ledger = common::ledger_with(
        common::short_timeout_store(),
        std::sync::Arc::new(engine::AtomicIdAllocator::default()),
        std::sync::Arc::new(common::FixedWalk(true)),
    )
    .await?;

    let mut txn = ledger.begin("CALLER").await?;
    ledger
        .place_order(&OrderRequest::immediate("A1", "IBM", dec!(100), 10), Some(&mut txn))
        .await?;

    // The row is staged, not committed, and counting it does not wait on the
    // open transaction.
    assert_eq!(ledger.portfolio_count().await?, 0);
    assert_eq!(
        ledger.list_symbols(Some(&mut txn)).await?,
        ["IBM", "MSFT", "ORCL"]
    );

    ledger.commit(txn).await?;
    assert_eq!(ledger.portfolio_count().await?, 1);
    Ok(())
}

#[tokio::test]
async fn an_aborted_creation_uses_up_its_portfolio_id() -> anyhow::Result<()> {
    let ledger = common::ledger().await?;

    let first = ledger
        .place_order(&OrderRequest::immediate("A1", "IBM", dec!(100), 1), None)
        .await?;
    assert_eq!(first.portfolio_id, "1");

    let mut txn = ledger.begin("CALLER").await?;
    let aborted = ledger
        .place_order(&OrderRequest::immediate("A2", "IBM", dec!(100), 1), Some(&mut txn))
        .await?;
    assert_eq!(aborted.portfolio_id, "2");
    ledger.abort(txn).await?;
    assert!(ledger.find_portfolio("A2", "IBM", None).await?.is_none());

    // Ids are never handed back, so the next creation skips the aborted one.
    let next = ledger
        .place_order(&OrderRequest::immediate("A3", "IBM", dec!(100), 1), None)
        .await?;
    assert_eq!(next.portfolio_id, "3");
    assert!(next.created);
    assert_eq!(ledger.portfolio_count().await?, 2);
    Ok(())
}
