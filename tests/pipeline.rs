//! End-to-end pipeline tests: framing, decode, filter matching, and
//! dispatch semantics over an in-memory connection.

mod common;

use std::sync::Arc;

use common::{start, test_config};
use slirc_client::{command, Client, Event, Filter, HandlerError};
use tokio::sync::mpsc;

#[tokio::test]
async fn test_ping_is_answered_with_exactly_one_pong() {
    let client = Arc::new(Client::new(test_config()));
    let (run, mut peer) = start(client.clone());

    assert_eq!(peer.recv_line().await, "NICK testbot");

    // Sent during the registration grace period: the PONG must not wait
    // behind the authentication handler.
    peer.send_line("PING :server123").await;

    let pong = peer.recv_line().await;
    let event = Event::decode(&pong).unwrap();
    assert_eq!(event.command, "PONG");
    assert_eq!(event.params, vec!["server123"]);

    // USER goes out only after the grace period, so it trails the PONG.
    let user = peer.recv_line().await;
    assert!(user.starts_with("USER "), "expected USER, got {user:?}");

    client.disconnect().await.unwrap();
    run.await.unwrap().unwrap();

    let mut pongs = 1;
    while let Some(line) = peer.try_recv_line().await {
        if line.starts_with("PONG") {
            pongs += 1;
        }
    }
    assert_eq!(pongs, 1);
}

#[tokio::test]
async fn test_handler_runs_once_per_matching_filter() {
    let client = Arc::new(Client::new(test_config()));
    let (tx, mut rx) = mpsc::unbounded_channel();

    // Both filters match a PRIVMSG to #test, so the handler fires twice
    // for a single event.
    client.handle(
        vec![Filter::command("PRIVMSG"), Filter::channel("#test")],
        move |event, _ctx| {
            let tx = tx.clone();
            async move {
                let _ = tx.send(event.params.clone());
                Ok(())
            }
        },
    );

    let (run, mut peer) = start(client.clone());
    assert_eq!(peer.recv_line().await, "NICK testbot");

    peer.send_line(":nick!user@host PRIVMSG #test :hi").await;
    peer.send_line(":nick!user@host PRIVMSG #other :hi").await;

    // Twice for #test (command + channel), once for #other (command only).
    let mut invocations = Vec::new();
    for _ in 0..3 {
        let params = tokio::time::timeout(std::time::Duration::from_secs(5), rx.recv())
            .await
            .expect("timed out waiting for a handler invocation")
            .unwrap();
        invocations.push(params);
    }

    client.disconnect().await.unwrap();
    run.await.unwrap().unwrap();
    assert!(rx.try_recv().is_err(), "unexpected extra invocation");
    assert_eq!(
        invocations
            .iter()
            .filter(|params| params[0] == "#test")
            .count(),
        2
    );
}

#[tokio::test]
async fn test_failing_and_panicking_handlers_do_not_stop_dispatch() {
    let client = Arc::new(Client::new(test_config()));

    client.handle(vec![Filter::command("PRIVMSG")], |_event, _ctx| async move {
        panic!("boom")
    });
    client.handle(vec![Filter::command("PRIVMSG")], |_event, _ctx| async move {
        Err(HandlerError::Other("declined".to_owned()))
    });

    let (tx, mut rx) = mpsc::unbounded_channel();
    client.handle(vec![Filter::command("PRIVMSG")], move |event, _ctx| {
        let tx = tx.clone();
        async move {
            let _ = tx.send(event.params.clone());
            Ok(())
        }
    });

    let (run, mut peer) = start(client.clone());
    assert_eq!(peer.recv_line().await, "NICK testbot");

    peer.send_line(":nick!user@host PRIVMSG #test :survives").await;

    // The recorder registered after the failing handlers still runs.
    let params = tokio::time::timeout(std::time::Duration::from_secs(5), rx.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(params, vec!["#test", "survives"]);

    // And the event loop is still alive.
    peer.send_line("PING :still-up").await;
    let pong = peer.recv_line().await;
    assert_eq!(Event::decode(&pong).unwrap().command, "PONG");

    client.disconnect().await.unwrap();
    run.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_malformed_lines_are_dropped_without_events() {
    let client = Arc::new(Client::new(test_config()));

    let (tx, mut rx) = mpsc::unbounded_channel();
    client.handle(vec![Filter::command("*")], move |event, _ctx| {
        let tx = tx.clone();
        async move {
            let _ = tx.send(event.command.clone());
            Ok(())
        }
    });

    let (run, mut peer) = start(client.clone());
    assert_eq!(peer.recv_line().await, "NICK testbot");

    peer.send_raw(b"\r\n").await;
    peer.send_raw(b"\xff\xfe\r\n").await;
    peer.send_line(":prefix-without-command").await;
    peer.send_line("PING :alive").await;

    // The loop survived the garbage and still answers.
    let pong = peer.recv_line().await;
    assert_eq!(Event::decode(&pong).unwrap().command, "PONG");

    client.disconnect().await.unwrap();
    run.await.unwrap().unwrap();

    let mut commands = Vec::new();
    while let Ok(cmd) = rx.try_recv() {
        commands.push(cmd);
    }
    // Only the pseudo-events and the PING made it through; none of the
    // malformed lines produced an event.
    commands.sort();
    let mut expected = vec![
        command::CONNECTED.to_owned(),
        command::PING.to_owned(),
        command::DISCONNECTED.to_owned(),
    ];
    expected.sort();
    assert_eq!(commands, expected);
}

#[tokio::test]
async fn test_client_write_reaches_the_server() {
    let client = Arc::new(Client::new(test_config()));
    let (run, mut peer) = start(client.clone());

    assert_eq!(peer.recv_line().await, "NICK testbot");

    client
        .write(Event::new(
            "PRIVMSG",
            vec!["#rust".to_owned(), "hello world".to_owned()],
        ))
        .unwrap();

    assert_eq!(peer.recv_line().await, "PRIVMSG #rust :hello world");

    client.disconnect().await.unwrap();
    run.await.unwrap().unwrap();
}
