//! Per-user session routing.
//!
//! Each user gets a dedicated worker task fed through a bounded mpsc
//! channel, so one user's events are processed strictly in arrival order
//! while a slow gateway call for one user never blocks another. The worker
//! owns the user's `Session`; no session state is shared across tasks.
//! Routing never waits on a worker: events for a full queue are dropped,
//! and workers stop after sitting idle.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use crate::chat::event::{CallbackAction, ChatCommand, ChatEvent, ChatEventKind};
use crate::chat::render::{self, RenderInstruction};
use crate::chat::ReplySink;
use crate::gateway::ExchangeGateway;
use crate::orchestrator::Orchestrator;
use crate::session::{Outcome, Session, SessionEvent};

const WORKER_QUEUE_DEPTH: usize = 32;

/// Workers parked on an empty queue for this long shut down; the next event
/// from that user spawns a fresh worker with an idle session.
pub const SESSION_IDLE_SECS: u64 = 1800;

/// Handle one event against one user's session. Returns what to render, or
/// `None` when the event is dropped as a protocol violation.
pub async fn respond<G: ExchangeGateway>(
    session: &mut Session,
    orchestrator: &Orchestrator<G>,
    symbols: &[String],
    event: &ChatEventKind,
) -> Option<RenderInstruction> {
    match event {
        ChatEventKind::Command(ChatCommand::Start) => {
            session.reset();
            Some(render::main_menu())
        }
        ChatEventKind::Command(ChatCommand::Cancel) => {
            session.reset();
            Some(render::cancelled())
        }
        ChatEventKind::Callback(action) => match action {
            // Account reads and cancel-all bypass the state machine.
            CallbackAction::Balance => Some(orchestrator.render_balances().await),
            CallbackAction::Positions => Some(orchestrator.render_positions().await),
            CallbackAction::Orders => Some(orchestrator.render_open_orders().await),
            CallbackAction::CancelOrders => Some(orchestrator.cancel_all_orders().await),
            CallbackAction::Start => {
                session.reset();
                Some(render::main_menu())
            }
            other => {
                let outcome = session.apply(SessionEvent::Select(other.clone()));
                resolve(orchestrator, symbols, outcome).await
            }
        },
        ChatEventKind::Text(text) => {
            let outcome = session.apply(SessionEvent::Text(text.clone()));
            resolve(orchestrator, symbols, outcome).await
        }
    }
}

async fn resolve<G: ExchangeGateway>(
    orchestrator: &Orchestrator<G>,
    symbols: &[String],
    outcome: Outcome,
) -> Option<RenderInstruction> {
    match outcome {
        Outcome::Prompt(p) => Some(render::prompt(&p, symbols)),
        Outcome::Reject { error, prompt } => Some(render::rejection(&error, &prompt, symbols)),
        Outcome::SubmitOrder(req) => Some(orchestrator.submit_order(&req).await),
        Outcome::SubmitLeverage { symbol, leverage } => {
            Some(orchestrator.submit_leverage(&symbol, leverage).await)
        }
        Outcome::MainMenu => Some(render::main_menu()),
        Outcome::Ignored => {
            tracing::warn!("Event does not fit the current session state, ignoring");
            None
        }
    }
}

pub struct SessionRouter<G, S> {
    workers: HashMap<i64, mpsc::Sender<ChatEvent>>,
    orchestrator: Arc<Orchestrator<G>>,
    sink: Arc<S>,
    symbols: Arc<Vec<String>>,
}

impl<G: ExchangeGateway + 'static, S: ReplySink + 'static> SessionRouter<G, S> {
    pub fn new(orchestrator: Arc<Orchestrator<G>>, sink: Arc<S>, symbols: Vec<String>) -> Self {
        Self {
            workers: HashMap::new(),
            orchestrator,
            sink,
            symbols: Arc::new(symbols),
        }
    }

    /// Queue an event for its user's worker, spawning the worker lazily on
    /// the user's first event. Never awaits the worker: a full queue drops
    /// the event, so one flooded session cannot stall delivery to others.
    pub fn route(&mut self, event: ChatEvent) {
        // Reap entries whose workers shut down after going idle.
        self.workers.retain(|_, tx| !tx.is_closed());

        let user_id = event.user_id;
        let tx = self.workers.entry(user_id).or_insert_with(|| {
            let (tx, rx) = mpsc::channel(WORKER_QUEUE_DEPTH);
            tokio::spawn(session_worker(
                user_id,
                rx,
                Arc::clone(&self.orchestrator),
                Arc::clone(&self.sink),
                Arc::clone(&self.symbols),
            ));
            tracing::info!(user_id, "Started session worker");
            tx
        });
        match tx.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                tracing::warn!(user_id, "Session queue full, dropping event");
            }
            Err(TrySendError::Closed(_)) => {
                // Worker stopped between the reap above and the send; the
                // user's next event gets a fresh worker.
                tracing::warn!(user_id, "Session worker gone, dropping event");
                self.workers.remove(&user_id);
            }
        }
    }
}

async fn session_worker<G: ExchangeGateway, S: ReplySink>(
    user_id: i64,
    mut rx: mpsc::Receiver<ChatEvent>,
    orchestrator: Arc<Orchestrator<G>>,
    sink: Arc<S>,
    symbols: Arc<Vec<String>>,
) {
    let mut session = Session::new();
    loop {
        let idle = Duration::from_secs(SESSION_IDLE_SECS);
        let event = match tokio::time::timeout(idle, rx.recv()).await {
            Ok(Some(event)) => event,
            Ok(None) => break,
            Err(_) => {
                tracing::info!(user_id, "Session idle, shutting worker down");
                break;
            }
        };
        let reply = respond(&mut session, &orchestrator, &symbols, &event.kind).await;
        let Some(instruction) = reply else {
            continue;
        };
        // Button presses edit the originating menu message in place; text
        // input gets a fresh reply.
        let result = match event.message_id {
            Some(message_id) => {
                sink.edit_message_text(event.chat_id, message_id, &instruction)
                    .await
            }
            None => sink.send_message(event.chat_id, &instruction).await,
        };
        if let Err(e) = result {
            tracing::warn!(user_id, error = %e, "Failed to deliver reply");
        }
    }
    tracing::info!(user_id, "Session worker stopped");
}
