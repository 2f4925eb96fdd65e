use crate::enums::ExecutionMode;
use crate::error::CoreError;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Longest identifier accepted for accounts, symbols and portfolio ids.
///
/// The ledger keys every table by a fixed-width 10 byte field, one byte of
/// which was always reserved for the terminator.
pub const MAX_ID_LEN: usize = 9;

/// Checks that `value` can be used as a ledger key of the given `kind`.
pub fn validate_identifier(kind: &str, value: &str) -> Result<(), CoreError> {
    if value.is_empty() {
        return Err(CoreError::InvalidInput(kind.to_string(), "must not be empty".to_string()));
    }
    if value.len() > MAX_ID_LEN {
        return Err(CoreError::InvalidInput(
            kind.to_string(),
            format!("'{value}' is longer than {MAX_ID_LEN} bytes"),
        ));
    }
    if value.contains('#') || value.chars().any(char::is_whitespace) {
        return Err(CoreError::InvalidInput(
            kind.to_string(),
            format!("'{value}' contains a delimiter or whitespace"),
        ));
    }
    Ok(())
}

/// Immutable reference data for a listed company.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Stock {
    pub symbol: String,
    pub full_name: String,
}

/// The live market state of one symbol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Quote {
    pub symbol: String,
    pub current_price: Decimal,
    pub trade_time: String,
    pub low_price_day: Decimal,
    pub high_price_day: Decimal,
    pub perc_price_change: Decimal,
    pub bid: Decimal,
    pub ask: Decimal,
    pub trade_volume: i64,
    pub market_cap: String,
}

impl Quote {
    /// A quote carrying only a price, used by seeding and tests.
    pub fn at_price(symbol: impl Into<String>, price: Decimal) -> Self {
        Self {
            symbol: symbol.into(),
            current_price: price,
            trade_time: String::new(),
            low_price_day: price,
            high_price_day: price,
            perc_price_change: Decimal::ZERO,
            bid: price,
            ask: price,
            trade_volume: 0,
            market_cap: String::new(),
        }
    }
}

/// One account's position in one symbol, plus any pending buy/sell intent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Portfolio {
    pub portfolio_id: String,
    pub account_id: String,
    pub symbol: String,
    pub hold_stocks: i64,
    pub to_sell: bool,
    pub number_sell: i64,
    pub price_sell: Decimal,
    pub to_buy: bool,
    pub number_buy: i64,
    pub price_buy: Decimal,
}

impl Portfolio {
    /// A fresh row holding `hold_stocks` shares with no pending intents.
    pub fn holding(
        portfolio_id: impl Into<String>,
        account_id: impl Into<String>,
        symbol: impl Into<String>,
        hold_stocks: i64,
    ) -> Self {
        Self {
            portfolio_id: portfolio_id.into(),
            account_id: account_id.into(),
            symbol: symbol.into(),
            hold_stocks,
            to_sell: false,
            number_sell: 0,
            price_sell: Decimal::ZERO,
            to_buy: false,
            number_buy: 0,
            price_buy: Decimal::ZERO,
        }
    }

    /// Records a deferred buy, replacing any earlier pending buy.
    pub fn queue_buy(&mut self, amount: i64, price: Decimal) {
        self.to_buy = true;
        self.number_buy = amount;
        self.price_buy = price;
    }

    /// Records a deferred sell, replacing any earlier pending sell.
    pub fn queue_sell(&mut self, amount: i64, price: Decimal) {
        self.to_sell = true;
        self.number_sell = amount;
        self.price_sell = price;
    }

    pub fn has_pending_intent(&self) -> bool {
        self.to_buy || self.to_sell
    }
}

/// Account holder reference data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Account {
    pub account_id: String,
    pub last_name: String,
    pub first_name: String,
    pub address: String,
    pub city: String,
    pub state: String,
    pub country: String,
    pub phone: String,
}

impl Account {
    /// An account with only its id set.
    pub fn with_id(account_id: impl Into<String>) -> Self {
        Self {
            account_id: account_id.into(),
            last_name: String::new(),
            first_name: String::new(),
            address: String::new(),
            city: String::new(),
            state: String::new(),
            country: String::new(),
            phone: String::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Currency {
    pub currency_symbol: String,
    pub country: String,
    pub currency_name: String,
}

/// A single buy or sell request as submitted by a client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderRequest {
    pub account_id: String,
    pub symbol: String,
    /// Ceiling for buys, floor for sells.
    pub price: Decimal,
    pub amount: i64,
    pub mode: ExecutionMode,
}

impl OrderRequest {
    pub fn immediate(
        account_id: impl Into<String>,
        symbol: impl Into<String>,
        price: Decimal,
        amount: i64,
    ) -> Self {
        Self {
            account_id: account_id.into(),
            symbol: symbol.into(),
            price,
            amount,
            mode: ExecutionMode::Immediate,
        }
    }

    pub fn deferred(
        account_id: impl Into<String>,
        symbol: impl Into<String>,
        price: Decimal,
        amount: i64,
    ) -> Self {
        Self {
            mode: ExecutionMode::Deferred,
            ..Self::immediate(account_id, symbol, price, amount)
        }
    }

    pub fn validate(&self) -> Result<(), CoreError> {
        validate_identifier("account_id", &self.account_id)?;
        validate_identifier("symbol", &self.symbol)?;
        if self.amount <= 0 {
            return Err(CoreError::NonPositiveAmount(self.amount));
        }
        Ok(())
    }
}

/// One entry of a batch order. Batches always execute immediately.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderTicket {
    pub account_id: String,
    pub symbol: String,
    pub price: Decimal,
    pub amount: i64,
}

impl OrderTicket {
    pub fn new(
        account_id: impl Into<String>,
        symbol: impl Into<String>,
        price: Decimal,
        amount: i64,
    ) -> Self {
        Self {
            account_id: account_id.into(),
            symbol: symbol.into(),
            price,
            amount,
        }
    }
}

impl From<&OrderTicket> for OrderRequest {
    fn from(ticket: &OrderTicket) -> Self {
        OrderRequest::immediate(
            ticket.account_id.clone(),
            ticket.symbol.clone(),
            ticket.price,
            ticket.amount,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn identifiers_must_fit_the_key_width() {
        assert!(validate_identifier("symbol", "IBM").is_ok());
        assert!(validate_identifier("symbol", "ABCDEFGHI").is_ok());
        assert!(validate_identifier("symbol", "ABCDEFGHIJ").is_err());
        assert!(validate_identifier("symbol", "").is_err());
        assert!(validate_identifier("symbol", "A#B").is_err());
        assert!(validate_identifier("account_id", "A 1").is_err());
    }

    #[test]
    fn order_amount_must_be_positive() {
        let order = OrderRequest::immediate("A1", "IBM", dec!(10), 0);
        assert_eq!(order.validate(), Err(CoreError::NonPositiveAmount(0)));

        let order = OrderRequest::deferred("A1", "IBM", dec!(10), -3);
        assert_eq!(order.validate(), Err(CoreError::NonPositiveAmount(-3)));

        assert!(OrderRequest::immediate("A1", "IBM", dec!(10), 1).validate().is_ok());
    }

    #[test]
    fn queued_intents_overwrite_previous_ones() {
        let mut portfolio = Portfolio::holding("7", "A1", "IBM", 0);
        assert!(!portfolio.has_pending_intent());

        portfolio.queue_buy(5, dec!(99.5));
        portfolio.queue_buy(8, dec!(101));
        assert!(portfolio.to_buy);
        assert_eq!(portfolio.number_buy, 8);
        assert_eq!(portfolio.price_buy, dec!(101));
        assert!(!portfolio.to_sell);
    }

    #[test]
    fn ticket_converts_to_immediate_request() {
        let ticket = OrderTicket::new("A1", "IBM", dec!(105), 10);
        let request = OrderRequest::from(&ticket);
        assert_eq!(request.mode, ExecutionMode::Immediate);
        assert_eq!(request.amount, 10);
    }
}
