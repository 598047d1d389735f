//! Per-user conversation state machine.
//!
//! Pure and transport-free: events in, outcomes out. The dispatcher owns one
//! `Session` per user and feeds it events in arrival order; rendering and
//! gateway calls happen in the orchestrator based on the returned `Outcome`.

use rust_decimal::Decimal;

use crate::chat::event::CallbackAction;
use crate::model::order::{OrderRequest, OrderSide, OrderType};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderStep {
    SelectSymbol,
    SelectOrderType,
    SelectSide,
    EnterQuantity,
    EnterPrice,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeverageStep {
    SelectSymbol,
    EnterLeverage,
}

/// Order fields accumulated step by step. Only ever populated in step order,
/// so a field is `Some` iff its step has been passed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderDraft {
    pub symbol: Option<String>,
    pub order_type: Option<OrderType>,
    pub side: Option<OrderSide>,
    pub qty: Option<Decimal>,
    pub price: Option<Decimal>,
}

/// At most one workflow is active; its fields live inside the variant and
/// cannot leak into the other workflow.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum WorkflowState {
    #[default]
    Idle,
    PlaceOrder {
        step: OrderStep,
        draft: OrderDraft,
    },
    SetLeverage {
        step: LeverageStep,
        symbol: Option<String>,
    },
}

/// What the user should be asked next; the render layer turns this into
/// message text and a keyboard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Prompt {
    SelectSymbol,
    SelectOrderType { symbol: String },
    SelectSide { order_type: OrderType },
    EnterQuantity { symbol: String },
    EnterPrice,
    SelectLeverageSymbol,
    EnterLeverage { symbol: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    Select(CallbackAction),
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Transition accepted; show the next prompt.
    Prompt(Prompt),
    /// Free-text input failed validation; state unchanged, re-prompt.
    Reject { error: String, prompt: Prompt },
    /// Order draft complete; session already reset to idle.
    SubmitOrder(OrderRequest),
    /// Leverage workflow complete; session already reset to idle.
    SubmitLeverage { symbol: String, leverage: u32 },
    /// Cancellation accepted from any state; session reset to idle.
    MainMenu,
    /// Event makes no sense for the current state. Caller logs and drops it.
    Ignored,
}

#[derive(Debug, Default)]
pub struct Session {
    state: WorkflowState,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &WorkflowState {
        &self.state
    }

    pub fn is_idle(&self) -> bool {
        self.state == WorkflowState::Idle
    }

    pub fn reset(&mut self) {
        self.state = WorkflowState::Idle;
    }

    pub fn apply(&mut self, event: SessionEvent) -> Outcome {
        // Cancellation wins from every state, discarding partial input.
        if let SessionEvent::Select(CallbackAction::BackToMenu) = &event {
            self.reset();
            return Outcome::MainMenu;
        }

        match &event {
            // Workflow entry points restart their workflow from scratch.
            SessionEvent::Select(CallbackAction::PlaceOrder) => {
                self.state = WorkflowState::PlaceOrder {
                    step: OrderStep::SelectSymbol,
                    draft: OrderDraft::default(),
                };
                return Outcome::Prompt(Prompt::SelectSymbol);
            }
            SessionEvent::Select(CallbackAction::SetLeverage) => {
                self.state = WorkflowState::SetLeverage {
                    step: LeverageStep::SelectSymbol,
                    symbol: None,
                };
                return Outcome::Prompt(Prompt::SelectLeverageSymbol);
            }
            _ => {}
        }

        match std::mem::take(&mut self.state) {
            WorkflowState::Idle => Outcome::Ignored,
            WorkflowState::PlaceOrder { step, draft } => self.apply_order(step, draft, event),
            WorkflowState::SetLeverage { step, symbol } => {
                self.apply_leverage(step, symbol, event)
            }
        }
    }

    fn apply_order(&mut self, step: OrderStep, mut draft: OrderDraft, event: SessionEvent) -> Outcome {
        match (step, event) {
            (OrderStep::SelectSymbol, SessionEvent::Select(CallbackAction::Symbol(sym))) => {
                draft.symbol = Some(sym.clone());
                self.state = WorkflowState::PlaceOrder {
                    step: OrderStep::SelectOrderType,
                    draft,
                };
                Outcome::Prompt(Prompt::SelectOrderType { symbol: sym })
            }
            (
                OrderStep::SelectOrderType,
                SessionEvent::Select(CallbackAction::OrderTypeChoice(order_type)),
            ) => {
                draft.order_type = Some(order_type);
                self.state = WorkflowState::PlaceOrder {
                    step: OrderStep::SelectSide,
                    draft,
                };
                Outcome::Prompt(Prompt::SelectSide { order_type })
            }
            (OrderStep::SelectSide, SessionEvent::Select(CallbackAction::SideChoice(side))) => {
                draft.side = Some(side);
                let symbol = draft.symbol.clone().unwrap_or_default();
                self.state = WorkflowState::PlaceOrder {
                    step: OrderStep::EnterQuantity,
                    draft,
                };
                Outcome::Prompt(Prompt::EnterQuantity { symbol })
            }
            (OrderStep::EnterQuantity, SessionEvent::Text(text)) => {
                match parse_positive_decimal(&text) {
                    Some(qty) => {
                        draft.qty = Some(qty);
                        if draft.order_type == Some(OrderType::Limit) {
                            self.state = WorkflowState::PlaceOrder {
                                step: OrderStep::EnterPrice,
                                draft,
                            };
                            Outcome::Prompt(Prompt::EnterPrice)
                        } else {
                            self.finish_order(draft)
                        }
                    }
                    None => {
                        let symbol = draft.symbol.clone().unwrap_or_default();
                        self.state = WorkflowState::PlaceOrder {
                            step: OrderStep::EnterQuantity,
                            draft,
                        };
                        Outcome::Reject {
                            error: "Invalid quantity. Please enter a valid number.".to_string(),
                            prompt: Prompt::EnterQuantity { symbol },
                        }
                    }
                }
            }
            (OrderStep::EnterPrice, SessionEvent::Text(text)) => {
                match parse_positive_decimal(&text) {
                    Some(price) => {
                        draft.price = Some(price);
                        self.finish_order(draft)
                    }
                    None => {
                        self.state = WorkflowState::PlaceOrder {
                            step: OrderStep::EnterPrice,
                            draft,
                        };
                        Outcome::Reject {
                            error: "Invalid price. Please enter a valid number.".to_string(),
                            prompt: Prompt::EnterPrice,
                        }
                    }
                }
            }
            // Anything else is a protocol violation; restore the state.
            (step, _) => {
                self.state = WorkflowState::PlaceOrder { step, draft };
                Outcome::Ignored
            }
        }
    }

    fn finish_order(&mut self, draft: OrderDraft) -> Outcome {
        // All fields are set in step order, so a completed walk guarantees
        // them; bail to idle rather than panic if that ever breaks.
        let (Some(symbol), Some(order_type), Some(side), Some(qty)) =
            (draft.symbol, draft.order_type, draft.side, draft.qty)
        else {
            self.reset();
            return Outcome::Ignored;
        };
        self.reset();
        Outcome::SubmitOrder(OrderRequest {
            symbol,
            side,
            order_type,
            qty,
            price: draft.price.filter(|_| order_type == OrderType::Limit),
        })
    }

    fn apply_leverage(
        &mut self,
        step: LeverageStep,
        symbol: Option<String>,
        event: SessionEvent,
    ) -> Outcome {
        match (step, event) {
            (
                LeverageStep::SelectSymbol,
                SessionEvent::Select(CallbackAction::LeverageSymbol(sym)),
            ) => {
                self.state = WorkflowState::SetLeverage {
                    step: LeverageStep::EnterLeverage,
                    symbol: Some(sym.clone()),
                };
                Outcome::Prompt(Prompt::EnterLeverage { symbol: sym })
            }
            (LeverageStep::EnterLeverage, SessionEvent::Text(text)) => {
                let Some(sym) = symbol else {
                    self.reset();
                    return Outcome::Ignored;
                };
                match text.trim().parse::<u32>() {
                    Ok(lev) if (1..=100).contains(&lev) => {
                        self.reset();
                        Outcome::SubmitLeverage {
                            symbol: sym,
                            leverage: lev,
                        }
                    }
                    // Out of range and unparseable are handled identically.
                    _ => {
                        self.state = WorkflowState::SetLeverage {
                            step: LeverageStep::EnterLeverage,
                            symbol: Some(sym.clone()),
                        };
                        Outcome::Reject {
                            error: "Leverage must be a whole number between 1 and 100."
                                .to_string(),
                            prompt: Prompt::EnterLeverage { symbol: sym },
                        }
                    }
                }
            }
            (step, _) => {
                self.state = WorkflowState::SetLeverage { step, symbol };
                Outcome::Ignored
            }
        }
    }
}

fn parse_positive_decimal(text: &str) -> Option<Decimal> {
    text.trim()
        .parse::<Decimal>()
        .ok()
        .filter(|v| *v > Decimal::ZERO)
}
