#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rust_decimal::Decimal;
use tokio::sync::Notify;

use tradegram::chat::render::RenderInstruction;
use tradegram::chat::ReplySink;
use tradegram::error::AppError;
use tradegram::gateway::{
    ApiAck, BalanceRecord, ExchangeGateway, OrderRecord, PositionRaw,
};
use tradegram::model::order::OrderRequest;

#[derive(Debug, Clone, PartialEq)]
pub enum GatewayCall {
    PlaceOrder(OrderRequest),
    SetLeverage {
        symbol: String,
        buy: u32,
        sell: u32,
    },
    CancelAll,
}

pub type CallLog = Arc<Mutex<Vec<GatewayCall>>>;

/// Recording in-memory gateway. Mutating calls append to the shared log;
/// read calls serve canned data.
pub struct FakeGateway {
    calls: CallLog,
    pub balances: Vec<BalanceRecord>,
    /// Keyed by ticker pair, e.g. "BTCUSDT".
    pub prices: HashMap<String, Decimal>,
    pub positions: Vec<PositionRaw>,
    pub orders: Vec<OrderRecord>,
    pub place_order_ack: ApiAck,
    pub set_leverage_ack: ApiAck,
    pub cancel_ack: ApiAck,
    /// Simulate transport failure on every mutating call.
    pub transport_down: bool,
    /// When set, `place_order` parks until the gate is notified, simulating
    /// a slow exchange.
    pub place_order_gate: Option<Arc<Notify>>,
}

pub fn ok_ack() -> ApiAck {
    ApiAck {
        code: 0,
        message: "OK".to_string(),
    }
}

impl FakeGateway {
    pub fn new() -> Self {
        Self {
            calls: Arc::new(Mutex::new(Vec::new())),
            balances: Vec::new(),
            prices: HashMap::new(),
            positions: Vec::new(),
            orders: Vec::new(),
            place_order_ack: ok_ack(),
            set_leverage_ack: ok_ack(),
            cancel_ack: ok_ack(),
            transport_down: false,
            place_order_gate: None,
        }
    }

    pub fn call_log(&self) -> CallLog {
        Arc::clone(&self.calls)
    }

    fn record(&self, call: GatewayCall) {
        self.calls.lock().unwrap().push(call);
    }

    fn transport_check(&self) -> Result<(), AppError> {
        if self.transport_down {
            Err(AppError::Config("simulated transport failure".to_string()))
        } else {
            Ok(())
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    Sent {
        chat_id: i64,
        text: String,
    },
    Edited {
        chat_id: i64,
        message_id: i64,
        text: String,
    },
}

pub type DeliveryLog = Arc<Mutex<Vec<Delivery>>>;

/// Recording reply sink standing in for the Telegram client.
pub struct FakeSink {
    deliveries: DeliveryLog,
}

impl FakeSink {
    pub fn new() -> Self {
        Self {
            deliveries: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn delivery_log(&self) -> DeliveryLog {
        Arc::clone(&self.deliveries)
    }
}

#[async_trait]
impl ReplySink for FakeSink {
    async fn send_message(
        &self,
        chat_id: i64,
        instruction: &RenderInstruction,
    ) -> Result<(), AppError> {
        self.deliveries.lock().unwrap().push(Delivery::Sent {
            chat_id,
            text: instruction.text.clone(),
        });
        Ok(())
    }

    async fn edit_message_text(
        &self,
        chat_id: i64,
        message_id: i64,
        instruction: &RenderInstruction,
    ) -> Result<(), AppError> {
        self.deliveries.lock().unwrap().push(Delivery::Edited {
            chat_id,
            message_id,
            text: instruction.text.clone(),
        });
        Ok(())
    }
}

#[async_trait]
impl ExchangeGateway for FakeGateway {
    async fn get_wallet_balance(&self) -> Result<Vec<BalanceRecord>, AppError> {
        Ok(self.balances.clone())
    }

    async fn get_ticker(&self, symbol: &str) -> Result<Decimal, AppError> {
        self.prices
            .get(symbol)
            .copied()
            .ok_or_else(|| AppError::InvalidRecord(format!("no ticker for {symbol}")))
    }

    async fn get_positions(&self) -> Result<Vec<PositionRaw>, AppError> {
        Ok(self.positions.clone())
    }

    async fn get_open_orders(&self) -> Result<Vec<OrderRecord>, AppError> {
        Ok(self.orders.clone())
    }

    async fn place_order(&self, req: &OrderRequest) -> Result<ApiAck, AppError> {
        self.transport_check()?;
        if let Some(gate) = &self.place_order_gate {
            gate.notified().await;
        }
        self.record(GatewayCall::PlaceOrder(req.clone()));
        Ok(self.place_order_ack.clone())
    }

    async fn cancel_all_orders(&self) -> Result<ApiAck, AppError> {
        self.transport_check()?;
        self.record(GatewayCall::CancelAll);
        Ok(self.cancel_ack.clone())
    }

    async fn set_leverage(
        &self,
        symbol: &str,
        buy_leverage: u32,
        sell_leverage: u32,
    ) -> Result<ApiAck, AppError> {
        self.transport_check()?;
        self.record(GatewayCall::SetLeverage {
            symbol: symbol.to_string(),
            buy: buy_leverage,
            sell: sell_leverage,
        });
        Ok(self.set_leverage_ack.clone())
    }
}
