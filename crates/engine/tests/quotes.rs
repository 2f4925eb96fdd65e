mod common;

use database::MemoryStore;
use engine::{AtomicIdAllocator, LedgerError, PriceUpdate};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;

#[tokio::test]
async fn set_price_round_trips() -> anyhow::Result<()> {
    let ledger = common::ledger().await?;

    let stored = ledger
        .set_price("IBM", PriceUpdate::Set(dec!(123.45)), None)
        .await?;
    assert_eq!(stored.current_price, dec!(123.45));

    let quote = ledger.get_quote("IBM", false, None).await?;
    assert_eq!(quote.current_price, dec!(123.45));
    Ok(())
}

#[tokio::test]
async fn random_walk_steps_by_a_tenth_and_never_down_from_zero() -> anyhow::Result<()> {
    let ledger = common::ledger_with(
        MemoryStore::default(),
        Arc::new(AtomicIdAllocator::default()),
        Arc::new(common::FixedWalk(false)),
    )
    .await?;

    let quote = ledger.set_price("IBM", PriceUpdate::RandomWalk, None).await?;
    assert_eq!(quote.current_price, dec!(99.9));

    ledger.set_price("IBM", PriceUpdate::Set(Decimal::ZERO), None).await?;
    let quote = ledger.set_price("IBM", PriceUpdate::RandomWalk, None).await?;
    assert_eq!(quote.current_price, dec!(0.1));

    // Negative prices are accepted as given.
    let quote = ledger.set_price("IBM", PriceUpdate::Set(dec!(-2)), None).await?;
    assert_eq!(quote.current_price, dec!(-2));
    let quote = ledger.set_price("IBM", PriceUpdate::RandomWalk, None).await?;
    assert_eq!(quote.current_price, dec!(-1.9));
    Ok(())
}

#[tokio::test]
async fn refresh_is_all_or_nothing() -> anyhow::Result<()> {
    let ledger = common::ledger().await?;

    let refreshed = ledger.refresh_quotes(&common::symbols(), None).await?;
    let prices: Vec<_> = refreshed.iter().map(|q| q.current_price).collect();
    assert_eq!(prices, [dec!(100.1), dec!(50.1), dec!(20.1)]);

    let before = common::snapshot(&ledger).await?;
    let batch = vec!["IBM".to_string(), "MSFT".to_string(), "NOPE".to_string()];
    let err = ledger.refresh_quotes(&batch, None).await.unwrap_err();
    assert!(matches!(err, LedgerError::QuoteNotFound(ref s) if s == "NOPE"));
    assert_eq!(common::snapshot(&ledger).await?, before);
    Ok(())
}

#[tokio::test]
async fn view_quotes_follow_the_requested_order() -> anyhow::Result<()> {
    let ledger = common::ledger().await?;

    let wanted = vec!["ORCL".to_string(), "IBM".to_string()];
    let quotes = ledger.view_quotes(&wanted, None).await?;
    let symbols: Vec<_> = quotes.iter().map(|q| q.symbol.as_str()).collect();
    assert_eq!(symbols, ["ORCL", "IBM"]);

    assert_eq!(ledger.list_symbols(None).await?, ["IBM", "MSFT", "ORCL"]);
    Ok(())
}
