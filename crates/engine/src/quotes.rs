use crate::error::LedgerError;
use core_types::Quote;
use database::{LedgerStore, LockMode, PutPolicy};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Mutex;

/// Size of one random-walk step.
pub const WALK_STEP: Decimal = dec!(0.1);

/// How `set_price` changes a quote.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriceUpdate {
    /// Replace the price. Any value is accepted, including negative ones.
    Set(Decimal),
    /// Move the price one `WALK_STEP` up or down.
    RandomWalk,
}

/// Chooses the direction of each random-walk step.
pub trait PriceWalk: Send + Sync {
    /// `true` to step up, `false` to step down.
    fn step_up(&self) -> bool;
}

/// Fair coin flips from a `StdRng`.
#[derive(Debug)]
pub struct RandomPriceWalk {
    rng: Mutex<StdRng>,
}

impl RandomPriceWalk {
    pub fn from_entropy() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl PriceWalk for RandomPriceWalk {
    fn step_up(&self) -> bool {
        match self.rng.lock() {
            Ok(mut rng) => rng.gen_bool(0.5),
            // A poisoned coin is still a coin.
            Err(poisoned) => poisoned.into_inner().gen_bool(0.5),
        }
    }
}

/// The price after one random-walk step. A price at or below zero always
/// steps up.
pub fn walk_price(current: Decimal, walk: &dyn PriceWalk) -> Decimal {
    if current <= Decimal::ZERO || walk.step_up() {
        current + WALK_STEP
    } else {
        current - WALK_STEP
    }
}

/// Reads the quote of `symbol`. Pass `lock_for_update` when the read will be
/// followed by a write of the same quote.
pub async fn get_quote<S: LedgerStore>(
    store: &S,
    txn: &mut S::Txn,
    symbol: &str,
    lock_for_update: bool,
) -> Result<Quote, LedgerError> {
    let lock = if lock_for_update {
        LockMode::ForUpdate
    } else {
        LockMode::ReadCommitted
    };
    store
        .get_quote(txn, symbol, lock)
        .await?
        .ok_or_else(|| LedgerError::QuoteNotFound(symbol.to_string()))
}

/// Applies `update` to the quote of `symbol` and returns the stored quote.
pub async fn set_price<S: LedgerStore>(
    store: &S,
    txn: &mut S::Txn,
    walk: &dyn PriceWalk,
    symbol: &str,
    update: PriceUpdate,
) -> Result<Quote, LedgerError> {
    let mut quote = get_quote(store, txn, symbol, true).await?;
    let previous = quote.current_price;
    quote.current_price = match update {
        PriceUpdate::Set(price) => price,
        PriceUpdate::RandomWalk => walk_price(previous, walk),
    };
    store.put_quote(txn, &quote, PutPolicy::Overwrite).await?;
    tracing::debug!(symbol, %previous, current = %quote.current_price, "quote updated");
    Ok(quote)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Always(bool);

    impl PriceWalk for Always {
        fn step_up(&self) -> bool {
            self.0
        }
    }

    #[test]
    fn walk_moves_one_step_in_the_chosen_direction() {
        assert_eq!(walk_price(dec!(100), &Always(true)), dec!(100.1));
        assert_eq!(walk_price(dec!(100), &Always(false)), dec!(99.9));
    }

    #[test]
    fn walk_never_steps_down_from_zero_or_below() {
        assert_eq!(walk_price(Decimal::ZERO, &Always(false)), dec!(0.1));
        assert_eq!(walk_price(dec!(-0.3), &Always(false)), dec!(-0.2));
        assert_eq!(walk_price(dec!(0.1), &Always(false)), Decimal::ZERO);
    }

    #[test]
    fn seeded_walks_are_reproducible() {
        let a = RandomPriceWalk::seeded(7);
        let b = RandomPriceWalk::seeded(7);
        let left: Vec<bool> = (0..32).map(|_| a.step_up()).collect();
        let right: Vec<bool> = (0..32).map(|_| b.step_up()).collect();
        assert_eq!(left, right);
    }
}
