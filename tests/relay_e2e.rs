//! End-to-end relay tests using a real WebSocket client.

#![allow(clippy::panic)]

mod common;

use common::{
    boot_server, connect, connect_refused, expect_closed, field, read_json, send_text,
};

#[tokio::test]
async fn message_reaches_all_clients_including_sender() {
    let server = boot_server().await;
    let mut alice = connect(&server.ws_url(Some("alice"))).await;
    let mut bob = connect(&server.ws_url(Some("bob"))).await;
    server.wait_for_subscriptions(2).await;

    send_text(&mut alice, "hello").await;

    for ws in [&mut alice, &mut bob] {
        let msg = read_json(ws).await;
        assert_eq!(field(&msg, "username"), Some("alice"));
        assert_eq!(field(&msg, "message"), Some("hello"));
    }
}

#[tokio::test]
async fn missing_username_is_anonymous() {
    let server = boot_server().await;
    let mut ws = connect(&server.ws_url(None)).await;
    server.wait_for_subscriptions(1).await;

    send_text(&mut ws, "hi").await;

    let msg = read_json(&mut ws).await;
    assert_eq!(field(&msg, "username"), Some("Anonymous"));
    assert_eq!(field(&msg, "message"), Some("hi"));
}

#[tokio::test]
async fn messages_from_one_client_keep_their_order() {
    let server = boot_server().await;
    let mut alice = connect(&server.ws_url(Some("alice"))).await;
    server.wait_for_subscriptions(1).await;

    for i in 0..10 {
        send_text(&mut alice, &format!("line {i}")).await;
    }
    for i in 0..10 {
        let msg = read_json(&mut alice).await;
        assert_eq!(field(&msg, "message"), Some(format!("line {i}").as_str()));
    }
}

#[tokio::test]
async fn closing_one_client_leaves_others_running() {
    let server = boot_server().await;
    let mut alice = connect(&server.ws_url(Some("alice"))).await;
    let mut bob = connect(&server.ws_url(Some("bob"))).await;
    server.wait_for_subscriptions(2).await;

    let Ok(()) = alice.close(None).await else {
        panic!("close failed");
    };
    server.wait_for_subscriptions(1).await;

    send_text(&mut bob, "anyone?").await;
    let msg = read_json(&mut bob).await;
    assert_eq!(field(&msg, "username"), Some("bob"));
    assert_eq!(field(&msg, "message"), Some("anyone?"));
}

#[tokio::test]
async fn shutdown_closes_every_connection() {
    let server = boot_server().await;
    let mut alice = connect(&server.ws_url(Some("alice"))).await;
    let mut bob = connect(&server.ws_url(Some("bob"))).await;
    server.wait_for_subscriptions(2).await;

    server.supervisor.shutdown();

    expect_closed(&mut alice).await;
    expect_closed(&mut bob).await;
    server.wait_for_subscriptions(0).await;
}

#[tokio::test]
async fn broker_loss_closes_connections() {
    let server = boot_server().await;
    let mut ws = connect(&server.ws_url(Some("alice"))).await;
    server.wait_for_subscriptions(1).await;

    let Ok(()) = chat_relay::broker::Broker::disconnect(server.broker.as_ref()).await else {
        panic!("disconnect failed");
    };

    expect_closed(&mut ws).await;
    server.wait_for_subscriptions(0).await;
}

#[tokio::test]
async fn connections_after_shutdown_are_refused() {
    let server = boot_server().await;
    server.supervisor.shutdown();

    assert_eq!(connect_refused(&server.ws_url(Some("late"))).await, 503);
    assert_eq!(server.broker.active_subscriptions(), 0);
}

#[tokio::test]
async fn connections_without_broker_are_refused() {
    let server = boot_server().await;
    let Ok(()) = chat_relay::broker::Broker::disconnect(server.broker.as_ref()).await else {
        panic!("disconnect failed");
    };

    assert_eq!(connect_refused(&server.ws_url(Some("alice"))).await, 503);
}
