//! Binds session outcomes to gateway calls and metrics computation.
//!
//! Every operation resolves to a `RenderInstruction`; errors never escape.
//! Mutating calls are fire-and-report: an application-level rejection is
//! surfaced with the exchange's own message, a transport failure with a
//! generic one, and neither is retried.

use std::collections::HashMap;

use rust_decimal::Decimal;

use crate::chat::render::{self, RenderInstruction};
use crate::gateway::{ExchangeGateway, PositionRecord};
use crate::metrics::{self, REFERENCE_ASSET};
use crate::model::order::OrderRequest;

pub struct Orchestrator<G> {
    gateway: G,
}

impl<G: ExchangeGateway> Orchestrator<G> {
    pub fn new(gateway: G) -> Self {
        Self { gateway }
    }

    pub async fn submit_order(&self, req: &OrderRequest) -> RenderInstruction {
        match self.gateway.place_order(req).await {
            Ok(ack) if ack.is_ok() => render::order_success(req),
            Ok(ack) => {
                tracing::warn!(code = ack.code, msg = %ack.message, "Order rejected by exchange");
                render::order_failed(&ack.message)
            }
            Err(e) => {
                tracing::error!(error = %e, "Order submission failed");
                render::generic_failure("placing order")
            }
        }
    }

    pub async fn submit_leverage(&self, symbol: &str, leverage: u32) -> RenderInstruction {
        // Hedge-mode asymmetry is unsupported: both legs get the same value.
        match self.gateway.set_leverage(symbol, leverage, leverage).await {
            Ok(ack) if ack.is_ok() => render::leverage_success(symbol, leverage),
            Ok(ack) => {
                tracing::warn!(code = ack.code, msg = %ack.message, "Leverage rejected by exchange");
                render::leverage_failed(&ack.message)
            }
            Err(e) => {
                tracing::error!(error = %e, "Leverage submission failed");
                render::generic_failure("setting leverage")
            }
        }
    }

    pub async fn render_balances(&self) -> RenderInstruction {
        let balances = match self.gateway.get_wallet_balance().await {
            Ok(b) => b,
            Err(e) => {
                tracing::error!(error = %e, "Failed to fetch wallet balance");
                return render::generic_failure("fetching balance");
            }
        };

        // One price per non-reference asset with a positive balance. A
        // failed lookup degrades the total instead of aborting the view.
        let mut prices: HashMap<String, Decimal> = HashMap::new();
        for bal in &balances {
            if bal.asset == REFERENCE_ASSET || bal.wallet_balance <= Decimal::ZERO {
                continue;
            }
            let pair = format!("{}{}", bal.asset, REFERENCE_ASSET);
            match self.gateway.get_ticker(&pair).await {
                Ok(price) => {
                    prices.insert(bal.asset.clone(), price);
                }
                Err(e) => {
                    tracing::warn!(asset = %bal.asset, error = %e, "No price for asset, omitting from total");
                }
            }
        }

        render::balances(&metrics::build_balance_snapshot(&balances, &prices))
    }

    pub async fn render_positions(&self) -> RenderInstruction {
        let raw = match self.gateway.get_positions().await {
            Ok(p) => p,
            Err(e) => {
                tracing::error!(error = %e, "Failed to fetch positions");
                return render::generic_failure("fetching positions");
            }
        };

        let mut valid: Vec<PositionRecord> = Vec::with_capacity(raw.len());
        for item in &raw {
            match item.validate() {
                Ok(rec) => valid.push(rec),
                Err(e) => {
                    tracing::warn!(symbol = %item.symbol, error = %e, "Skipping malformed position record");
                }
            }
        }

        let (snapshots, total_pnl) = metrics::build_position_snapshots(&valid);
        render::positions(&snapshots, total_pnl)
    }

    pub async fn render_open_orders(&self) -> RenderInstruction {
        match self.gateway.get_open_orders().await {
            Ok(orders) => render::open_orders(&orders),
            Err(e) => {
                tracing::error!(error = %e, "Failed to fetch open orders");
                render::generic_failure("fetching orders")
            }
        }
    }

    pub async fn cancel_all_orders(&self) -> RenderInstruction {
        match self.gateway.cancel_all_orders().await {
            Ok(ack) if ack.is_ok() => render::cancel_orders_success(),
            Ok(ack) => {
                tracing::warn!(code = ack.code, msg = %ack.message, "Cancel-all rejected by exchange");
                render::cancel_orders_failed(&ack.message)
            }
            Err(e) => {
                tracing::error!(error = %e, "Cancel-all failed");
                render::generic_failure("cancelling orders")
            }
        }
    }
}
