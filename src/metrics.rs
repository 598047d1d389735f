//! Derived account metrics.
//!
//! Pure computation over already-fetched records: no I/O, no logging.
//! Monetary sums stay in `Decimal` end to end so portfolio totals and
//! aggregate PnL never accumulate binary floating-point error.

use std::collections::HashMap;

use rust_decimal::Decimal;

use crate::gateway::{BalanceRecord, PositionRecord};
use crate::model::order::OrderSide;

pub const REFERENCE_ASSET: &str = "USDT";

const HUNDRED: Decimal = Decimal::ONE_HUNDRED;

/// Price-move PnL percentage relative to entry.
/// A non-positive entry price yields 0 rather than an error.
pub fn percent_pnl(entry_price: Decimal, mark_price: Decimal, side: OrderSide) -> Decimal {
    if entry_price <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    match side {
        OrderSide::Buy => (mark_price - entry_price) / entry_price * HUNDRED,
        OrderSide::Sell => (entry_price - mark_price) / entry_price * HUNDRED,
    }
}

/// Return on equity: unrealized PnL over committed margin.
pub fn roe(unrealized_pnl: Decimal, margin: Decimal) -> Decimal {
    if margin <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    unrealized_pnl / margin * HUNDRED
}

/// Sum of unrealized PnL across open positions.
pub fn total_pnl(positions: &[PositionRecord]) -> Decimal {
    positions.iter().map(|p| p.unrealized_pnl).sum()
}

/// Portfolio valuation in the reference currency.
///
/// Reference-asset balances count directly; other assets convert through
/// `price_lookup`. An asset with no available price is omitted from the
/// total — valuation degrades in accuracy instead of failing.
pub fn portfolio_value<F>(balances: &[BalanceRecord], price_lookup: F) -> Decimal
where
    F: Fn(&str) -> Option<Decimal>,
{
    let mut total = Decimal::ZERO;
    for bal in balances {
        if bal.asset == REFERENCE_ASSET {
            total += bal.wallet_balance;
        } else if let Some(price) = price_lookup(&bal.asset) {
            total += bal.wallet_balance * price;
        }
    }
    total
}

/// Display-ready view of one open position.
#[derive(Debug, Clone, PartialEq)]
pub struct PositionSnapshot {
    pub symbol: String,
    pub side: OrderSide,
    pub size: Decimal,
    pub entry_price: Decimal,
    pub mark_price: Decimal,
    pub unrealized_pnl: Decimal,
    pub pnl_percent: Decimal,
    pub margin: Option<Decimal>,
    pub roe: Decimal,
    pub leverage: String,
}

/// Per-position snapshots plus the aggregate PnL, from validated records.
/// Zero-size records are not displayed.
pub fn build_position_snapshots(
    positions: &[PositionRecord],
) -> (Vec<PositionSnapshot>, Decimal) {
    let open: Vec<&PositionRecord> = positions
        .iter()
        .filter(|p| p.size > Decimal::ZERO)
        .collect();
    let snapshots = open
        .iter()
        .map(|p| PositionSnapshot {
            symbol: p.symbol.clone(),
            side: p.side,
            size: p.size,
            entry_price: p.entry_price,
            mark_price: p.mark_price,
            unrealized_pnl: p.unrealized_pnl,
            pnl_percent: percent_pnl(p.entry_price, p.mark_price, p.side),
            margin: p.margin,
            roe: roe(p.unrealized_pnl, p.margin.unwrap_or(Decimal::ZERO)),
            leverage: p.leverage.clone(),
        })
        .collect();
    let total = open.iter().map(|p| p.unrealized_pnl).sum();
    (snapshots, total)
}

/// One balance line in the wallet view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BalanceLine {
    pub asset: String,
    pub wallet_balance: Decimal,
    pub available_to_withdraw: Decimal,
    /// Converted reference-currency value; `None` for the reference asset
    /// itself and for assets whose price was unavailable.
    pub value: Option<Decimal>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BalanceSnapshot {
    pub lines: Vec<BalanceLine>,
    pub total_value: Decimal,
}

/// Assemble the wallet view from balance records and whatever prices the
/// caller managed to fetch. Zero balances are not displayed.
pub fn build_balance_snapshot(
    balances: &[BalanceRecord],
    prices: &HashMap<String, Decimal>,
) -> BalanceSnapshot {
    let positive: Vec<BalanceRecord> = balances
        .iter()
        .filter(|b| b.wallet_balance > Decimal::ZERO)
        .cloned()
        .collect();
    let lines = positive
        .iter()
        .map(|b| BalanceLine {
            asset: b.asset.clone(),
            wallet_balance: b.wallet_balance,
            available_to_withdraw: b.available_to_withdraw,
            value: if b.asset == REFERENCE_ASSET {
                None
            } else {
                prices.get(&b.asset).map(|p| b.wallet_balance * *p)
            },
        })
        .collect();
    let total_value = portfolio_value(&positive, |asset| prices.get(asset).copied());
    BalanceSnapshot { lines, total_value }
}
