use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderSide {
    Buy,
    Sell,
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderSide::Buy => f.write_str("buy"),
            OrderSide::Sell => f.write_str("sell"),
        }
    }
}

/// How an order is applied against the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExecutionMode {
    /// Price-check against the current quote and mutate holdings synchronously.
    Immediate,
    /// Record the request as a pending intent on the portfolio row.
    Deferred,
}

impl ExecutionMode {
    pub fn is_immediate(&self) -> bool {
        matches!(self, ExecutionMode::Immediate)
    }
}

/// Terminal state of an order that was not rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderStatus {
    /// Executed against the quote; `hold_stocks` changed.
    Applied,
    /// Stored as a pending buy/sell intent.
    Queued,
}
