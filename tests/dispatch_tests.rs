mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{Delivery, FakeGateway, FakeSink, GatewayCall};
use rust_decimal_macros::dec;
use tokio::sync::Notify;

use tradegram::chat::event::{CallbackAction, ChatEvent, ChatEventKind};
use tradegram::dispatch::{SessionRouter, SESSION_IDLE_SECS};
use tradegram::model::order::{OrderRequest, OrderSide, OrderType};
use tradegram::orchestrator::Orchestrator;

fn symbols() -> Vec<String> {
    vec!["BTCUSDT".to_string(), "ETHUSDT".to_string()]
}

fn callback(user_id: i64, action: CallbackAction) -> ChatEvent {
    ChatEvent {
        user_id,
        chat_id: user_id,
        message_id: Some(1),
        kind: ChatEventKind::Callback(action),
    }
}

fn text(user_id: i64, s: &str) -> ChatEvent {
    ChatEvent {
        user_id,
        chat_id: user_id,
        message_id: None,
        kind: ChatEventKind::Text(s.to_string()),
    }
}

fn router_with(
    gateway: FakeGateway,
    sink: Arc<FakeSink>,
) -> SessionRouter<FakeGateway, FakeSink> {
    SessionRouter::new(Arc::new(Orchestrator::new(gateway)), sink, symbols())
}

/// Poll until `cond` holds; workers run on their own tasks, so tests have
/// to wait for them to drain their queues.
async fn wait_for<F: Fn() -> bool>(cond: F) {
    for _ in 0..500 {
        if cond() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("worker did not reach expected state in time");
}

#[tokio::test]
async fn one_users_events_are_processed_in_arrival_order() {
    let gateway = FakeGateway::new();
    let log = gateway.call_log();
    let sink = Arc::new(FakeSink::new());
    let deliveries = sink.delivery_log();
    let mut router = router_with(gateway, sink);

    for ev in [
        callback(7, CallbackAction::PlaceOrder),
        callback(7, CallbackAction::Symbol("BTCUSDT".to_string())),
        callback(7, CallbackAction::OrderTypeChoice(OrderType::Limit)),
        callback(7, CallbackAction::SideChoice(OrderSide::Buy)),
        text(7, "0.01"),
        text(7, "50000"),
    ] {
        router.route(ev);
    }

    wait_for(|| !log.lock().unwrap().is_empty()).await;
    // Quantity lands before price only if the queue preserved arrival order.
    assert_eq!(
        *log.lock().unwrap(),
        vec![GatewayCall::PlaceOrder(OrderRequest {
            symbol: "BTCUSDT".to_string(),
            side: OrderSide::Buy,
            order_type: OrderType::Limit,
            qty: dec!(0.01),
            price: Some(dec!(50000)),
        })]
    );

    // Button presses were edited in place; the final text input got a
    // fresh confirmation message.
    wait_for(|| deliveries.lock().unwrap().len() == 6).await;
    let log = deliveries.lock().unwrap();
    assert!(matches!(
        &log[0],
        Delivery::Edited { chat_id: 7, message_id: 1, .. }
    ));
    match log.last().unwrap() {
        Delivery::Sent { chat_id: 7, text } => {
            assert!(text.contains("Order placed successfully"))
        }
        other => panic!("unexpected final delivery: {other:?}"),
    }
}

#[tokio::test]
async fn slow_gateway_call_for_one_user_does_not_block_another() {
    let gate = Arc::new(Notify::new());
    let mut gateway = FakeGateway::new();
    gateway.place_order_gate = Some(Arc::clone(&gate));
    let log = gateway.call_log();
    let mut router = router_with(gateway, Arc::new(FakeSink::new()));

    // User 1's market order parks inside the gateway until released.
    for ev in [
        callback(1, CallbackAction::PlaceOrder),
        callback(1, CallbackAction::Symbol("BTCUSDT".to_string())),
        callback(1, CallbackAction::OrderTypeChoice(OrderType::Market)),
        callback(1, CallbackAction::SideChoice(OrderSide::Buy)),
        text(1, "0.5"),
    ] {
        router.route(ev);
    }

    // User 2 completes a leverage change in the meantime.
    for ev in [
        callback(2, CallbackAction::SetLeverage),
        callback(2, CallbackAction::LeverageSymbol("ETHUSDT".to_string())),
        text(2, "25"),
    ] {
        router.route(ev);
    }

    wait_for(|| {
        log.lock()
            .unwrap()
            .iter()
            .any(|c| matches!(c, GatewayCall::SetLeverage { .. }))
    })
    .await;
    assert!(!log
        .lock()
        .unwrap()
        .iter()
        .any(|c| matches!(c, GatewayCall::PlaceOrder(_))));

    gate.notify_one();
    wait_for(|| {
        log.lock()
            .unwrap()
            .iter()
            .any(|c| matches!(c, GatewayCall::PlaceOrder(_)))
    })
    .await;
}

#[tokio::test]
async fn full_queue_drops_events_without_stalling_other_users() {
    let gate = Arc::new(Notify::new());
    let mut gateway = FakeGateway::new();
    gateway.place_order_gate = Some(Arc::clone(&gate));
    let log = gateway.call_log();
    let mut router = router_with(gateway, Arc::new(FakeSink::new()));

    // Park user 1's worker inside a gateway call, then flood the queue far
    // past its depth. route() returns immediately every time; the overflow
    // is dropped rather than queued.
    for ev in [
        callback(1, CallbackAction::PlaceOrder),
        callback(1, CallbackAction::Symbol("BTCUSDT".to_string())),
        callback(1, CallbackAction::OrderTypeChoice(OrderType::Market)),
        callback(1, CallbackAction::SideChoice(OrderSide::Buy)),
        text(1, "0.5"),
    ] {
        router.route(ev);
    }
    for _ in 0..100 {
        router.route(callback(1, CallbackAction::BackToMenu));
    }

    // Another user's request still goes through.
    router.route(callback(2, CallbackAction::CancelOrders));
    wait_for(|| log.lock().unwrap().contains(&GatewayCall::CancelAll)).await;
    assert!(!log
        .lock()
        .unwrap()
        .iter()
        .any(|c| matches!(c, GatewayCall::PlaceOrder(_))));

    // Releasing the gate lets user 1's worker finish its backlog.
    gate.notify_one();
    wait_for(|| {
        log.lock()
            .unwrap()
            .iter()
            .any(|c| matches!(c, GatewayCall::PlaceOrder(_)))
    })
    .await;
}

#[tokio::test(start_paused = true)]
async fn idle_worker_stops_and_next_event_gets_a_fresh_one() {
    let gateway = FakeGateway::new();
    let log = gateway.call_log();
    let mut router = router_with(gateway, Arc::new(FakeSink::new()));

    router.route(callback(5, CallbackAction::CancelOrders));
    wait_for(|| log.lock().unwrap().len() == 1).await;

    // Past the idle cutoff the worker parked on its queue shuts down.
    tokio::time::sleep(Duration::from_secs(SESSION_IDLE_SECS + 1)).await;
    tokio::task::yield_now().await;

    router.route(callback(5, CallbackAction::CancelOrders));
    wait_for(|| log.lock().unwrap().len() == 2).await;
    assert_eq!(
        *log.lock().unwrap(),
        vec![GatewayCall::CancelAll, GatewayCall::CancelAll]
    );
}
