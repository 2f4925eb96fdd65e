//! The order engine: decides whether a buy or sell executes against the
//! current quote or is stored as a pending intent, and applies the outcome to
//! the portfolio row.
//!
//! Every check runs before the first write, so a rejected order leaves the
//! transaction without any staged change of its own.

use crate::error::LedgerError;
use crate::identity;
use crate::ids::IdAllocator;
use crate::portfolio_index;
use crate::quotes;
use core_types::{CoreError, ExecutionMode, OrderRequest, OrderSide, OrderStatus};
use database::{LedgerStore, LockMode, PutPolicy};
use rust_decimal::Decimal;

/// What an accepted order did to the ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderReceipt {
    pub portfolio_id: String,
    pub status: OrderStatus,
    /// Holdings after the order.
    pub hold_stocks: i64,
    /// Whether the order created the portfolio row.
    pub created: bool,
}

/// The pricing rule: a buy executes when the market is at or below the
/// buyer's ceiling, a sell when it is at or above the seller's floor.
pub fn price_acceptable(side: OrderSide, limit: Decimal, current: Decimal) -> bool {
    match side {
        OrderSide::Buy => current <= limit,
        OrderSide::Sell => current >= limit,
    }
}

async fn check_price<S: LedgerStore>(
    store: &S,
    txn: &mut S::Txn,
    side: OrderSide,
    symbol: &str,
    limit: Decimal,
) -> Result<(), LedgerError> {
    let quote = quotes::get_quote(store, txn, symbol, false).await?;
    if !price_acceptable(side, limit, quote.current_price) {
        return Err(LedgerError::PriceCheckFailed {
            side,
            limit,
            current: quote.current_price,
        });
    }
    Ok(())
}

/// Account and symbol must exist. The account row stays locked until the
/// transaction ends.
async fn check_identity<S: LedgerStore>(
    store: &S,
    txn: &mut S::Txn,
    request: &OrderRequest,
) -> Result<(), LedgerError> {
    request.validate()?;
    identity::ensure_account(store, txn, &request.account_id, LockMode::ForUpdate).await?;
    identity::ensure_symbol(store, txn, &request.symbol).await?;
    Ok(())
}

/// Applies a buy request.
///
/// A pair without a portfolio row gets one: holding `amount` for an immediate
/// buy that passes the price check, or empty with the intent recorded for a
/// deferred one. A deferred buy on an existing row replaces any earlier
/// pending buy.
pub async fn place_order<S: LedgerStore>(
    store: &S,
    txn: &mut S::Txn,
    ids: &dyn IdAllocator,
    request: &OrderRequest,
) -> Result<OrderReceipt, LedgerError> {
    check_identity(store, txn, request).await?;

    let existing = portfolio_index::find_portfolio(
        store,
        txn,
        &request.account_id,
        &request.symbol,
        LockMode::ForUpdate,
    )
    .await?;

    let Some(mut portfolio) = existing else {
        if request.mode.is_immediate() {
            check_price(store, txn, OrderSide::Buy, &request.symbol, request.price).await?;
        }
        let portfolio = portfolio_index::create_portfolio(
            store,
            txn,
            ids,
            &request.account_id,
            &request.symbol,
            request.price,
            request.amount,
            request.mode,
        )
        .await?;
        return Ok(OrderReceipt {
            status: status_of(request.mode),
            hold_stocks: portfolio.hold_stocks,
            portfolio_id: portfolio.portfolio_id,
            created: true,
        });
    };

    match request.mode {
        ExecutionMode::Immediate => {
            check_price(store, txn, OrderSide::Buy, &request.symbol, request.price).await?;
            portfolio.hold_stocks = portfolio
                .hold_stocks
                .checked_add(request.amount)
                .ok_or_else(|| {
                    CoreError::InvalidInput(
                        "amount".to_string(),
                        format!("{} would overflow the holding", request.amount),
                    )
                })?;
        }
        ExecutionMode::Deferred => portfolio.queue_buy(request.amount, request.price),
    }
    store
        .put_portfolio(txn, &portfolio, PutPolicy::Overwrite)
        .await?;
    tracing::debug!(
        portfolio_id = %portfolio.portfolio_id,
        hold_stocks = portfolio.hold_stocks,
        mode = ?request.mode,
        "buy applied"
    );

    Ok(OrderReceipt {
        status: status_of(request.mode),
        hold_stocks: portfolio.hold_stocks,
        portfolio_id: portfolio.portfolio_id,
        created: false,
    })
}

/// Applies a sell request.
///
/// Selling needs an existing portfolio row holding at least `amount`, in
/// either mode. An immediate sell must also pass the price floor; a deferred
/// one replaces any earlier pending sell.
pub async fn sell_stocks<S: LedgerStore>(
    store: &S,
    txn: &mut S::Txn,
    request: &OrderRequest,
) -> Result<OrderReceipt, LedgerError> {
    check_identity(store, txn, request).await?;

    let mut portfolio = portfolio_index::find_portfolio(
        store,
        txn,
        &request.account_id,
        &request.symbol,
        LockMode::ForUpdate,
    )
    .await?
    .ok_or_else(|| LedgerError::PortfolioNotFound {
        account: request.account_id.clone(),
        symbol: request.symbol.clone(),
    })?;

    if portfolio.hold_stocks < request.amount {
        return Err(LedgerError::InsufficientHoldings {
            held: portfolio.hold_stocks,
            requested: request.amount,
        });
    }

    match request.mode {
        ExecutionMode::Immediate => {
            check_price(store, txn, OrderSide::Sell, &request.symbol, request.price).await?;
            portfolio.hold_stocks -= request.amount;
        }
        ExecutionMode::Deferred => portfolio.queue_sell(request.amount, request.price),
    }
    store
        .put_portfolio(txn, &portfolio, PutPolicy::Overwrite)
        .await?;
    tracing::debug!(
        portfolio_id = %portfolio.portfolio_id,
        hold_stocks = portfolio.hold_stocks,
        mode = ?request.mode,
        "sell applied"
    );

    Ok(OrderReceipt {
        status: status_of(request.mode),
        hold_stocks: portfolio.hold_stocks,
        portfolio_id: portfolio.portfolio_id,
        created: false,
    })
}

fn status_of(mode: ExecutionMode) -> OrderStatus {
    match mode {
        ExecutionMode::Immediate => OrderStatus::Applied,
        ExecutionMode::Deferred => OrderStatus::Queued,
    }
}
