use std::fmt;

use rust_decimal::Decimal;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    pub fn as_bybit_str(&self) -> &'static str {
        match self {
            OrderSide::Buy => "Buy",
            OrderSide::Sell => "Sell",
        }
    }

    pub fn from_bybit_str(s: &str) -> Option<Self> {
        match s {
            "Buy" => Some(OrderSide::Buy),
            "Sell" => Some(OrderSide::Sell),
            _ => None,
        }
    }
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderSide::Buy => write!(f, "BUY"),
            OrderSide::Sell => write!(f, "SELL"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderType {
    Market,
    Limit,
}

impl OrderType {
    pub fn as_bybit_str(&self) -> &'static str {
        match self {
            OrderType::Market => "Market",
            OrderType::Limit => "Limit",
        }
    }
}

impl fmt::Display for OrderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderType::Market => write!(f, "MARKET"),
            OrderType::Limit => write!(f, "LIMIT"),
        }
    }
}

/// A fully-validated order ready for submission. Constructed only from a
/// complete session draft; `price` is present iff the order is a limit order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderRequest {
    pub symbol: String,
    pub side: OrderSide,
    pub order_type: OrderType,
    pub qty: Decimal,
    pub price: Option<Decimal>,
}

/// Strip a known quote suffix from a symbol, e.g. "BTCUSDT" -> "BTC".
/// Falls back to the full symbol when no known quote matches.
pub fn base_asset(symbol: &str) -> &str {
    for quote in ["USDT", "USDC", "BTC", "ETH"] {
        if let Some(base) = symbol.strip_suffix(quote) {
            if !base.is_empty() {
                return base;
            }
        }
    }
    symbol
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn side_round_trips_bybit_strings() {
        assert_eq!(OrderSide::from_bybit_str("Buy"), Some(OrderSide::Buy));
        assert_eq!(OrderSide::from_bybit_str("Sell"), Some(OrderSide::Sell));
        assert_eq!(OrderSide::from_bybit_str("HOLD"), None);
        assert_eq!(OrderSide::Buy.as_bybit_str(), "Buy");
    }

    #[test]
    fn base_asset_strips_quote() {
        assert_eq!(base_asset("BTCUSDT"), "BTC");
        assert_eq!(base_asset("ETHUSDC"), "ETH");
        assert_eq!(base_asset("WEIRD"), "WEIRD");
    }
}
