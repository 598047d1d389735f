//! Outgoing message construction: texts and inline keyboards.
//!
//! Everything here is plain data; the Telegram client serializes keyboards
//! into reply markup. Texts mirror the trading console's chat surface,
//! including the menu layout and success/failure wording.

use rust_decimal::Decimal;

use crate::chat::event::CallbackAction;
use crate::gateway::OrderRecord;
use crate::metrics::{BalanceSnapshot, PositionSnapshot, REFERENCE_ASSET};
use crate::model::order::{base_asset, OrderRequest, OrderSide, OrderType};
use crate::session::Prompt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Button {
    pub text: String,
    pub callback_data: String,
}

impl Button {
    fn new(text: &str, action: CallbackAction) -> Self {
        Self {
            text: text.to_string(),
            callback_data: action.as_data(),
        }
    }
}

/// Rows of buttons, in Telegram inline-keyboard layout.
pub type Keyboard = Vec<Vec<Button>>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderInstruction {
    pub text: String,
    pub keyboard: Option<Keyboard>,
}

impl RenderInstruction {
    pub fn with_keyboard(text: String, keyboard: Keyboard) -> Self {
        Self {
            text,
            keyboard: Some(keyboard),
        }
    }

    pub fn text_only(text: String) -> Self {
        Self {
            text,
            keyboard: None,
        }
    }
}

pub fn main_menu_keyboard() -> Keyboard {
    vec![
        vec![
            Button::new("📊 Balance", CallbackAction::Balance),
            Button::new("📈 Positions", CallbackAction::Positions),
        ],
        vec![
            Button::new("📝 Open Orders", CallbackAction::Orders),
            Button::new("🛠 Place Order", CallbackAction::PlaceOrder),
        ],
        vec![
            Button::new("❌ Cancel Orders", CallbackAction::CancelOrders),
            Button::new("⚙️ Set Leverage", CallbackAction::SetLeverage),
        ],
    ]
}

fn back_row() -> Vec<Button> {
    vec![Button::new("🔙 Back to Menu", CallbackAction::BackToMenu)]
}

fn back_only_keyboard() -> Keyboard {
    vec![back_row()]
}

fn symbol_row<F: Fn(String) -> CallbackAction>(symbols: &[String], to_action: F) -> Vec<Button> {
    symbols
        .iter()
        .map(|sym| {
            let label = format!("{}/{}", base_asset(sym), REFERENCE_ASSET);
            Button::new(&label, to_action(sym.clone()))
        })
        .collect()
}

pub fn main_menu() -> RenderInstruction {
    let text = "Welcome to the trading console! 🤖\n\n\
        Commands:\n\
        /start - Show main menu\n\
        /cancel - Cancel current operation\n\n\
        Select an option:"
        .to_string();
    RenderInstruction::with_keyboard(text, main_menu_keyboard())
}

pub fn cancelled() -> RenderInstruction {
    RenderInstruction::with_keyboard("Operation cancelled.".to_string(), back_only_keyboard())
}

/// The prompt for a state-machine step, with its choice keyboard.
pub fn prompt(p: &Prompt, symbols: &[String]) -> RenderInstruction {
    match p {
        Prompt::SelectSymbol => RenderInstruction::with_keyboard(
            "Select trading pair:".to_string(),
            vec![symbol_row(symbols, CallbackAction::Symbol), back_row()],
        ),
        Prompt::SelectOrderType { symbol } => RenderInstruction::with_keyboard(
            format!("Selected {symbol}\nChoose order type:"),
            vec![
                vec![
                    Button::new("Market", CallbackAction::OrderTypeChoice(OrderType::Market)),
                    Button::new("Limit", CallbackAction::OrderTypeChoice(OrderType::Limit)),
                ],
                back_row(),
            ],
        ),
        Prompt::SelectSide { order_type } => RenderInstruction::with_keyboard(
            format!("Order Type: {order_type}\nChoose side:"),
            vec![
                vec![
                    Button::new("Long", CallbackAction::SideChoice(OrderSide::Buy)),
                    Button::new("Short", CallbackAction::SideChoice(OrderSide::Sell)),
                ],
                back_row(),
            ],
        ),
        Prompt::EnterQuantity { symbol } => RenderInstruction::with_keyboard(
            format!("Enter quantity (in {}):", base_asset(symbol)),
            back_only_keyboard(),
        ),
        Prompt::EnterPrice => RenderInstruction::with_keyboard(
            format!("Enter limit price (in {REFERENCE_ASSET}):"),
            back_only_keyboard(),
        ),
        Prompt::SelectLeverageSymbol => RenderInstruction::with_keyboard(
            "Select symbol to set leverage:".to_string(),
            vec![
                symbol_row(symbols, CallbackAction::LeverageSymbol),
                back_row(),
            ],
        ),
        Prompt::EnterLeverage { symbol } => RenderInstruction::with_keyboard(
            format!("Enter leverage (1-100) for {symbol}:"),
            back_only_keyboard(),
        ),
    }
}

/// Validation failure: error line on top, same prompt again.
pub fn rejection(error: &str, p: &Prompt, symbols: &[String]) -> RenderInstruction {
    let base = prompt(p, symbols);
    RenderInstruction {
        text: format!("{error}\n{}", base.text),
        keyboard: base.keyboard,
    }
}

pub fn balances(snapshot: &BalanceSnapshot) -> RenderInstruction {
    if snapshot.lines.is_empty() {
        return RenderInstruction::with_keyboard(
            "No balance found".to_string(),
            back_only_keyboard(),
        );
    }
    let mut text = "💰 Wallet Balance:\n\n".to_string();
    for line in &snapshot.lines {
        text.push_str(&format!("{}:\n", line.asset));
        text.push_str(&format!("Balance: {:.8}\n", line.wallet_balance));
        text.push_str(&format!("Available: {:.8}\n", line.available_to_withdraw));
        if let Some(value) = line.value {
            text.push_str(&format!("Value in {REFERENCE_ASSET}: {value:.2}\n"));
        }
        text.push('\n');
    }
    text.push_str(&format!(
        "\nTotal Portfolio Value: {:.2} {REFERENCE_ASSET}",
        snapshot.total_value
    ));
    RenderInstruction::with_keyboard(text, back_only_keyboard())
}

pub fn positions(snapshots: &[PositionSnapshot], total_pnl: Decimal) -> RenderInstruction {
    let keyboard = vec![
        vec![Button::new("🔄 Refresh", CallbackAction::Positions)],
        back_row(),
    ];
    if snapshots.is_empty() {
        let text = "📊 No Open Positions\n\n\
            Start trading by:\n\
            1. Set leverage first\n\
            2. Place a new order\n\
            3. Monitor your positions here"
            .to_string();
        return RenderInstruction::with_keyboard(text, keyboard);
    }

    let mut text = "📊 Current Positions\n\n".to_string();
    let rule = "=".repeat(30);
    for pos in snapshots {
        let side_label = match pos.side {
            OrderSide::Buy => "🟢 Long",
            OrderSide::Sell => "🔴 Short",
        };
        let pnl_color = if pos.unrealized_pnl >= Decimal::ZERO { "🟢" } else { "🔴" };
        let roe_color = if pos.roe >= Decimal::ZERO { "🟢" } else { "🔴" };
        let trend = if pos.mark_price > pos.entry_price { "📈" } else { "📉" };

        text.push_str(&format!("{rule}\n"));
        text.push_str(&format!("{} {trend}\n", pos.symbol));
        text.push_str(&format!("Side: {side_label}\n"));
        text.push_str(&format!("Size: {} ({}x)\n", pos.size, pos.leverage));
        text.push_str(&format!("Entry: ${:.4}\n", pos.entry_price));
        text.push_str(&format!("Current: ${:.4}\n\n", pos.mark_price));
        text.push_str("PnL Information:\n");
        text.push_str(&format!(
            "{pnl_color} PnL: ${:.2} ({:.2}%)\n",
            pos.unrealized_pnl, pos.pnl_percent
        ));
        if let Some(margin) = pos.margin {
            text.push_str(&format!("Margin: ${margin} {REFERENCE_ASSET}\n"));
        }
        text.push_str(&format!("{roe_color} ROE: {:.2}%\n\n", pos.roe));
    }

    let total_color = if total_pnl >= Decimal::ZERO { "🟢" } else { "🔴" };
    text.push_str(&format!("{rule}\n"));
    text.push_str("\nPortfolio Summary:\n");
    text.push_str(&format!(
        "{total_color} Total PnL: ${total_pnl:.2} {REFERENCE_ASSET}\n"
    ));
    RenderInstruction::with_keyboard(text, keyboard)
}

pub fn open_orders(orders: &[OrderRecord]) -> RenderInstruction {
    if orders.is_empty() {
        return RenderInstruction::with_keyboard(
            "No open orders".to_string(),
            back_only_keyboard(),
        );
    }
    let mut text = "📝 Open Orders:\n\n".to_string();
    for order in orders {
        text.push_str(&format!("{}:\n", order.symbol));
        text.push_str(&format!("Order ID: {}\n", order.order_id));
        text.push_str(&format!("Side: {}\n", order.side));
        text.push_str(&format!("Price: {}\n", order.price));
        text.push_str(&format!("Quantity: {}\n", order.qty));
        text.push_str(&format!("Type: {}\n", order.order_type));
        text.push_str(&format!("Status: {}\n\n", order.status));
    }
    RenderInstruction::with_keyboard(text, back_only_keyboard())
}

pub fn order_success(req: &OrderRequest) -> RenderInstruction {
    let mut text = "✅ Order placed successfully!\n\n".to_string();
    text.push_str(&format!("Symbol: {}\n", req.symbol));
    text.push_str(&format!("Type: {}\n", req.order_type));
    text.push_str(&format!("Side: {}\n", req.side));
    text.push_str(&format!("Quantity: {}\n", req.qty));
    if let Some(price) = req.price {
        text.push_str(&format!("Price: {price}\n"));
    }
    RenderInstruction::with_keyboard(text, back_only_keyboard())
}

pub fn order_failed(message: &str) -> RenderInstruction {
    RenderInstruction::with_keyboard(
        format!("❌ Order failed: {message}"),
        back_only_keyboard(),
    )
}

pub fn leverage_success(symbol: &str, leverage: u32) -> RenderInstruction {
    RenderInstruction::with_keyboard(
        format!("✅ Leverage set to {leverage}x for {symbol}"),
        back_only_keyboard(),
    )
}

pub fn leverage_failed(message: &str) -> RenderInstruction {
    RenderInstruction::with_keyboard(
        format!("❌ Failed to set leverage: {message}"),
        back_only_keyboard(),
    )
}

pub fn cancel_orders_success() -> RenderInstruction {
    RenderInstruction::with_keyboard(
        "✅ All orders cancelled successfully!".to_string(),
        back_only_keyboard(),
    )
}

pub fn cancel_orders_failed(message: &str) -> RenderInstruction {
    RenderInstruction::with_keyboard(
        format!("❌ Failed to cancel orders: {message}"),
        back_only_keyboard(),
    )
}

/// Generic transport-failure message for a read or mutation that never got
/// an application-level answer.
pub fn generic_failure(what: &str) -> RenderInstruction {
    RenderInstruction::with_keyboard(
        format!("❌ Error {what}. Please try again."),
        back_only_keyboard(),
    )
}
