use super::common::*;
use crate::error::{AckError, NackError};
use crate::message::MessageState;
use crate::relay::command::QueueCommand;
use uuid::Uuid;

#[test]
fn ack_settles_delivered_message() {
    let (tx, mut queue) = test_queue();

    let _worker_rx = register_worker(&tx, "w1", 64);

    let msg = test_message("hello", 1);
    let msg_id = msg.id;
    let _ = send_enqueue(&tx, msg);

    let mut ack_rx = send_ack(&tx, msg_id);
    let mut stats_rx = request_stats(&tx);

    tx.send(QueueCommand::Shutdown).unwrap();
    queue.run();

    assert!(ack_rx.try_recv().unwrap().is_ok());

    let stats = stats_rx.try_recv().unwrap();
    assert_eq!(stats.delivered, 1);
    assert_eq!(stats.in_flight, 0);
    assert_eq!(stats.pending, 0);
    assert!(queue.messages.is_empty(), "acked message is removed");
}

#[test]
fn ack_unknown_message_returns_not_found() {
    let (tx, mut queue) = test_queue();

    let mut ack_rx = send_ack(&tx, Uuid::now_v7());

    tx.send(QueueCommand::Shutdown).unwrap();
    queue.run();

    let err = ack_rx.try_recv().unwrap().unwrap_err();
    assert!(
        matches!(err, AckError::MessageNotFound(_)),
        "expected MessageNotFound, got {err:?}"
    );
}

#[test]
fn ack_without_lease_returns_not_found() {
    let (tx, mut queue) = test_queue();

    // No worker registered, so the message is pending but never leased
    let msg = test_message("hello", 1);
    let msg_id = msg.id;
    let _ = send_enqueue(&tx, msg);
    let mut ack_rx = send_ack(&tx, msg_id);

    tx.send(QueueCommand::Shutdown).unwrap();
    queue.run();

    let err = ack_rx.try_recv().unwrap().unwrap_err();
    assert!(matches!(err, AckError::MessageNotFound(_)));
}

#[test]
fn ack_twice_second_is_a_noop() {
    let (tx, mut queue) = test_queue();

    let _worker_rx = register_worker(&tx, "w1", 64);

    let msg = test_message("hello", 1);
    let msg_id = msg.id;
    let _ = send_enqueue(&tx, msg);

    let mut ack1_rx = send_ack(&tx, msg_id);
    let mut ack2_rx = send_ack(&tx, msg_id);
    let mut stats_rx = request_stats(&tx);

    tx.send(QueueCommand::Shutdown).unwrap();
    queue.run();

    assert!(ack1_rx.try_recv().unwrap().is_ok(), "first ack succeeds");
    assert!(
        ack2_rx.try_recv().unwrap().is_ok(),
        "repeated ack is a harmless no-op"
    );

    let stats = stats_rx.try_recv().unwrap();
    assert_eq!(stats.delivered, 1, "message counted once");
}

#[test]
fn nack_with_zero_delay_is_redelivered() {
    let (tx, mut queue) = test_queue();

    let mut worker_rx = register_worker(&tx, "w1", 64);

    let msg = test_message("retry", 1);
    let msg_id = msg.id;
    let _ = send_enqueue(&tx, msg);

    let mut nack_rx = send_nack(&tx, msg_id, 0, "sink unavailable");

    tx.send(QueueCommand::Shutdown).unwrap();
    queue.run();

    assert!(nack_rx.try_recv().unwrap().is_ok());

    let first = worker_rx.try_recv().unwrap();
    assert_eq!(first.attempt, 1);
    let second = worker_rx.try_recv().unwrap();
    assert_eq!(second.msg_id, msg_id);
    assert_eq!(second.attempt, 2, "attempt count grows by one per lease");
}

#[test]
fn nack_with_delay_defers_redelivery() {
    let (tx, mut queue) = test_queue();

    let mut worker_rx = register_worker(&tx, "w1", 64);

    let msg = test_message("later", 1);
    let msg_id = msg.id;
    let _ = send_enqueue(&tx, msg);

    let mut nack_rx = send_nack(&tx, msg_id, 60_000, "sink unavailable");
    let mut stats_rx = request_stats(&tx);

    tx.send(QueueCommand::Shutdown).unwrap();
    queue.run();

    assert!(nack_rx.try_recv().unwrap().is_ok());

    // Delivered once, then parked in the delay area
    assert!(worker_rx.try_recv().is_ok());
    assert!(worker_rx.try_recv().is_err(), "no redelivery before the delay");

    let stats = stats_rx.try_recv().unwrap();
    assert_eq!(stats.pending, 1);
    assert_eq!(stats.in_flight, 0);
}

#[test]
fn nack_after_final_attempt_moves_message_to_failed() {
    let config = crate::relay::config::QueueConfig {
        max_attempts: 1,
        ..test_config()
    };
    let (tx, mut queue) = test_queue_with(config);

    let mut worker_rx = register_worker(&tx, "w1", 64);

    let msg = test_message("doomed", 1);
    let msg_id = msg.id;
    let _ = send_enqueue(&tx, msg);

    let mut nack_rx = send_nack(&tx, msg_id, 0, "boom");
    let (failed_tx, mut failed_rx) = tokio::sync::oneshot::channel();
    tx.send(QueueCommand::ListFailed { reply: failed_tx }).unwrap();
    let mut stats_rx = request_stats(&tx);

    tx.send(QueueCommand::Shutdown).unwrap();
    queue.run();

    assert!(nack_rx.try_recv().unwrap().is_ok());

    let stats = stats_rx.try_recv().unwrap();
    assert_eq!(stats.failed, 1);
    assert_eq!(stats.pending, 0);
    assert_eq!(stats.in_flight, 0);

    let failed = failed_rx.try_recv().unwrap();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].id, msg_id);
    assert_eq!(failed[0].state, MessageState::Failed);
    assert_eq!(failed[0].attempt_count, 1);
    assert_eq!(failed[0].last_error.as_deref(), Some("boom"));

    // Exactly one delivery ever happened
    assert!(worker_rx.try_recv().is_ok());
    assert!(
        worker_rx.try_recv().is_err(),
        "failed message is never leased again"
    );
}

#[test]
fn nack_unknown_message_returns_not_found() {
    let (tx, mut queue) = test_queue();

    let mut nack_rx = send_nack(&tx, Uuid::now_v7(), 0, "boom");

    tx.send(QueueCommand::Shutdown).unwrap();
    queue.run();

    let err = nack_rx.try_recv().unwrap().unwrap_err();
    assert!(
        matches!(err, NackError::MessageNotFound(_)),
        "expected MessageNotFound, got {err:?}"
    );
}
