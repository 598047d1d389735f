//! Exchange gateway abstraction.
//!
//! The orchestrator talks to the exchange only through `ExchangeGateway`,
//! which deals in validated records. Loosely-typed exchange responses are
//! converted at this boundary; a record that fails validation becomes an
//! explicit skip decision in the caller, not an exception deep in rendering.

use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::error::AppError;
use crate::model::order::{OrderRequest, OrderSide};

/// Per-asset wallet balance, already parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BalanceRecord {
    pub asset: String,
    pub wallet_balance: Decimal,
    pub available_to_withdraw: Decimal,
}

/// One open position as reported by the exchange, numerics still
/// string-encoded. Validation happens in [`PositionRaw::validate`].
#[derive(Debug, Clone, Default)]
pub struct PositionRaw {
    pub symbol: String,
    pub side: String,
    pub size: String,
    pub entry_price: String,
    pub mark_price: String,
    pub unrealized_pnl: String,
    pub margin: String,
    pub leverage: String,
}

/// A position record that passed boundary validation.
#[derive(Debug, Clone, PartialEq)]
pub struct PositionRecord {
    pub symbol: String,
    pub side: OrderSide,
    pub size: Decimal,
    pub entry_price: Decimal,
    pub mark_price: Decimal,
    pub unrealized_pnl: Decimal,
    /// Initial margin; the exchange omits it in some margin modes.
    pub margin: Option<Decimal>,
    pub leverage: String,
}

impl PositionRaw {
    pub fn validate(&self) -> Result<PositionRecord, AppError> {
        let side = OrderSide::from_bybit_str(&self.side).ok_or_else(|| {
            AppError::InvalidRecord(format!("{}: unknown side '{}'", self.symbol, self.side))
        })?;
        let size = parse_field(&self.symbol, "size", &self.size)?;
        let entry_price = parse_field(&self.symbol, "entry_price", &self.entry_price)?;
        let mark_price = parse_field(&self.symbol, "mark_price", &self.mark_price)?;
        let unrealized_pnl = parse_field(&self.symbol, "unrealized_pnl", &self.unrealized_pnl)?;
        let margin = if self.margin.trim().is_empty() {
            None
        } else {
            Some(parse_field(&self.symbol, "margin", &self.margin)?)
        };
        Ok(PositionRecord {
            symbol: self.symbol.clone(),
            side,
            size,
            entry_price,
            mark_price,
            unrealized_pnl,
            margin,
            leverage: self.leverage.clone(),
        })
    }
}

fn parse_field(symbol: &str, field: &str, raw: &str) -> Result<Decimal, AppError> {
    raw.trim().parse::<Decimal>().map_err(|_| {
        AppError::InvalidRecord(format!("{symbol}: field '{field}' is not numeric: '{raw}'"))
    })
}

/// One open order, listed verbatim (no derived metrics).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderRecord {
    pub symbol: String,
    pub order_id: String,
    pub side: String,
    pub price: String,
    pub qty: String,
    pub order_type: String,
    pub status: String,
}

/// Application-level acknowledgement of a mutating call.
/// `code == 0` is success; anything else carries the exchange's message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiAck {
    pub code: i64,
    pub message: String,
}

impl ApiAck {
    pub fn is_ok(&self) -> bool {
        self.code == 0
    }
}

/// Narrow interface over the exchange's account/trading API.
///
/// Read calls return `Err` on any failure (transport or exchange-reported).
/// Mutating calls return `Ok(ApiAck)` for application-level outcomes and
/// reserve `Err` for transport failures, so callers can surface the
/// exchange's own rejection message verbatim.
#[async_trait]
pub trait ExchangeGateway: Send + Sync {
    async fn get_wallet_balance(&self) -> Result<Vec<BalanceRecord>, AppError>;
    async fn get_ticker(&self, symbol: &str) -> Result<Decimal, AppError>;
    async fn get_positions(&self) -> Result<Vec<PositionRaw>, AppError>;
    async fn get_open_orders(&self) -> Result<Vec<OrderRecord>, AppError>;
    async fn place_order(&self, req: &OrderRequest) -> Result<ApiAck, AppError>;
    async fn cancel_all_orders(&self) -> Result<ApiAck, AppError>;
    async fn set_leverage(
        &self,
        symbol: &str,
        buy_leverage: u32,
        sell_leverage: u32,
    ) -> Result<ApiAck, AppError>;
}
