//! Transport-agnostic chat events.
//!
//! The Telegram layer decodes raw updates into these; everything past the
//! dispatcher only sees `ChatEvent`.

use crate::model::order::{OrderSide, OrderType};

/// A button press from the fixed callback vocabulary. Anything outside this
/// set is a protocol violation and never reaches the session machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackAction {
    Balance,
    Positions,
    Orders,
    PlaceOrder,
    CancelOrders,
    SetLeverage,
    Start,
    BackToMenu,
    Symbol(String),
    OrderTypeChoice(OrderType),
    SideChoice(OrderSide),
    LeverageSymbol(String),
}

impl CallbackAction {
    pub fn parse(data: &str) -> Option<Self> {
        match data {
            "balance" => Some(Self::Balance),
            "positions" => Some(Self::Positions),
            "orders" => Some(Self::Orders),
            "place_order" => Some(Self::PlaceOrder),
            "cancel_orders" => Some(Self::CancelOrders),
            "set_leverage" => Some(Self::SetLeverage),
            "start" => Some(Self::Start),
            "back_to_menu" => Some(Self::BackToMenu),
            "type_market" => Some(Self::OrderTypeChoice(OrderType::Market)),
            "type_limit" => Some(Self::OrderTypeChoice(OrderType::Limit)),
            "side_buy" => Some(Self::SideChoice(OrderSide::Buy)),
            "side_sell" => Some(Self::SideChoice(OrderSide::Sell)),
            _ => {
                if let Some(sym) = data.strip_prefix("symbol_") {
                    (!sym.is_empty()).then(|| Self::Symbol(sym.to_string()))
                } else if let Some(sym) = data.strip_prefix("leverage_") {
                    (!sym.is_empty()).then(|| Self::LeverageSymbol(sym.to_string()))
                } else {
                    None
                }
            }
        }
    }

    /// The wire form used when building keyboards.
    pub fn as_data(&self) -> String {
        match self {
            Self::Balance => "balance".to_string(),
            Self::Positions => "positions".to_string(),
            Self::Orders => "orders".to_string(),
            Self::PlaceOrder => "place_order".to_string(),
            Self::CancelOrders => "cancel_orders".to_string(),
            Self::SetLeverage => "set_leverage".to_string(),
            Self::Start => "start".to_string(),
            Self::BackToMenu => "back_to_menu".to_string(),
            Self::Symbol(sym) => format!("symbol_{sym}"),
            Self::OrderTypeChoice(OrderType::Market) => "type_market".to_string(),
            Self::OrderTypeChoice(OrderType::Limit) => "type_limit".to_string(),
            Self::SideChoice(OrderSide::Buy) => "side_buy".to_string(),
            Self::SideChoice(OrderSide::Sell) => "side_sell".to_string(),
            Self::LeverageSymbol(sym) => format!("leverage_{sym}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatCommand {
    Start,
    Cancel,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatEventKind {
    Command(ChatCommand),
    Callback(CallbackAction),
    Text(String),
}

/// One user interaction, tagged with identity and reply routing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatEvent {
    pub user_id: i64,
    pub chat_id: i64,
    /// Present for button presses; lets the reply edit the menu message
    /// in place instead of sending a new one.
    pub message_id: Option<i64>,
    pub kind: ChatEventKind,
}
