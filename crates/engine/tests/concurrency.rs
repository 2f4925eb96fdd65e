mod common;

use core_types::OrderRequest;
use futures::future::join_all;
use rust_decimal_macros::dec;
use std::collections::HashSet;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn racing_first_buys_create_exactly_one_row() -> anyhow::Result<()> {
    let ledger = common::ledger().await?;
    const BUYERS: i64 = 16;

    let tasks = (0..BUYERS).map(|_| {
        let ledger = ledger.clone();
        tokio::spawn(async move {
            ledger
                .place_order(&OrderRequest::immediate("A1", "IBM", dec!(105), 2), None)
                .await
        })
    });
    let receipts = join_all(tasks)
        .await
        .into_iter()
        .map(|joined| joined.map_err(anyhow::Error::from)?.map_err(anyhow::Error::from))
        .collect::<anyhow::Result<Vec<_>>>()?;

    assert_eq!(receipts.iter().filter(|r| r.created).count(), 1);
    let ids: HashSet<_> = receipts.iter().map(|r| r.portfolio_id.clone()).collect();
    assert_eq!(ids.len(), 1);

    assert_eq!(ledger.portfolio_count().await?, 1);
    let row = ledger.find_portfolio("A1", "IBM", None).await?.unwrap();
    assert_eq!(row.hold_stocks, BUYERS * 2);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn parallel_buys_of_distinct_pairs_get_distinct_ids() -> anyhow::Result<()> {
    let ledger = common::ledger().await?;

    let mut tasks = Vec::new();
    for account in common::ACCOUNTS {
        for symbol in common::symbols() {
            let ledger = ledger.clone();
            tasks.push(tokio::spawn(async move {
                ledger
                    .place_order(&OrderRequest::immediate(account, symbol, dec!(1000), 1), None)
                    .await
            }));
        }
    }
    let mut ids = HashSet::new();
    for joined in join_all(tasks).await {
        let receipt = joined??;
        assert!(ids.insert(receipt.portfolio_id));
    }
    assert_eq!(ids.len(), 9);
    assert_eq!(ledger.portfolio_count().await?, 9);
    Ok(())
}
