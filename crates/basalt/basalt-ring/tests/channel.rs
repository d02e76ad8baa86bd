//! Concurrency and protocol tests for the ring channel.
//!
//! These run producer and consumer on separate threads of one process. The
//! kernel objects behind the channel are process-global, so the semaphore and
//! shared-memory behavior is exactly what separate processes would see; the
//! two-process spawn test lives in `e2e_channel.rs`.

use basalt_graph::Solution;
use basalt_ring::{ChannelName, RingChannel, RingError, ShutdownToken};
use std::thread;
use std::time::{Duration, Instant};

/// Small capacity so wraparound and full-ring blocking are easy to provoke.
const TEST_CAPACITY: usize = 16;

type TestChannel = RingChannel<TEST_CAPACITY>;

/// Unique prefix per test so parallel tests never share kernel names.
fn test_name(tag: &str) -> ChannelName {
    ChannelName::new(&format!("basalt-ring-test-{tag}-{}", std::process::id())).unwrap()
}

#[test]
fn end_to_end_candidate_roundtrip() {
    let name = test_name("e2e");
    let owner = TestChannel::create(&name).unwrap();
    let token = ShutdownToken::new();

    // 14 payload bytes plus the terminator is 15, fits the 16-byte ring.
    let producer = {
        let name = name.clone();
        let token = token.clone();
        thread::spawn(move || {
            let channel = TestChannel::attach(&name).unwrap();
            channel.write(b"3 0-1 0-2 1-2", &token).unwrap();
            channel.close().unwrap();
        })
    };

    let message = owner.read(&token).unwrap();
    assert_eq!(message, b"3 0-1 0-2 1-2");

    let solution = Solution::decode(&message).unwrap();
    assert_eq!(solution.cost(), 3);
    assert_eq!(solution.to_string(), "0-1 0-2 1-2");

    producer.join().unwrap();
    owner.close().unwrap();
}

#[test]
fn delivers_messages_in_fifo_order() {
    let name = test_name("fifo");
    let owner = TestChannel::create(&name).unwrap();
    let token = ShutdownToken::new();

    let producer = TestChannel::attach(&name).unwrap();
    producer.write(b"one", &token).unwrap();
    producer.write(b"two", &token).unwrap();

    assert_eq!(owner.read(&token).unwrap(), b"one");
    assert_eq!(owner.read(&token).unwrap(), b"two");

    producer.close().unwrap();
    owner.close().unwrap();
}

#[test]
fn wraparound_preserves_bytes() {
    let name = test_name("wrap");
    let owner = TestChannel::create(&name).unwrap();
    let token = ShutdownToken::new();
    let producer = TestChannel::attach(&name).unwrap();

    // First message advances the cursors to 9; the second then crosses the
    // end of the 16-byte buffer mid-message.
    producer.write(b"abcdefgh", &token).unwrap();
    assert_eq!(owner.read(&token).unwrap(), b"abcdefgh");

    producer.write(b"ijklmnopqrst", &token).unwrap();
    assert_eq!(owner.read(&token).unwrap(), b"ijklmnopqrst");

    producer.close().unwrap();
    owner.close().unwrap();
}

#[test]
fn concurrent_producers_never_interleave() {
    let name = test_name("excl");
    let owner = TestChannel::create(&name).unwrap();
    let token = ShutdownToken::new();

    const PER_PRODUCER: usize = 25;
    let spawn_producer = |payload: &'static [u8]| {
        let name = name.clone();
        let token = token.clone();
        thread::spawn(move || {
            let channel = TestChannel::attach(&name).unwrap();
            for _ in 0..PER_PRODUCER {
                channel.write(payload, &token).unwrap();
            }
            channel.close().unwrap();
        })
    };

    // Both messages are longer than half the ring, so the producers contend
    // for slots constantly and would interleave without the writer turn.
    let a = spawn_producer(b"aaaaaaaaaa");
    let b = spawn_producer(b"bbbbbbbbbb");

    for _ in 0..2 * PER_PRODUCER {
        let message = owner.read(&token).unwrap();
        assert!(
            message == b"aaaaaaaaaa" || message == b"bbbbbbbbbb",
            "interleaved message: {message:?}"
        );
    }

    a.join().unwrap();
    b.join().unwrap();
    owner.close().unwrap();
}

#[test]
fn free_and_used_slots_sum_to_capacity_when_quiescent() {
    let name = test_name("slots");
    let owner = TestChannel::create(&name).unwrap();
    let token = ShutdownToken::new();

    let (free, used) = owner.slot_counts().unwrap();
    assert_eq!((free, used), (TEST_CAPACITY as i32, 0));

    let producer = TestChannel::attach(&name).unwrap();
    producer.write(b"abc", &token).unwrap();

    let (free, used) = owner.slot_counts().unwrap();
    assert_eq!(free + used, TEST_CAPACITY as i32);
    assert_eq!(used, 4);

    owner.read(&token).unwrap();
    let (free, used) = owner.slot_counts().unwrap();
    assert_eq!((free, used), (TEST_CAPACITY as i32, 0));

    producer.close().unwrap();
    owner.close().unwrap();
}

#[test]
fn close_wakes_a_producer_blocked_on_a_full_ring() {
    let name = test_name("wake");
    let owner = TestChannel::create(&name).unwrap();
    let token = ShutdownToken::new();

    let producer = {
        let name = name.clone();
        let token = token.clone();
        thread::spawn(move || {
            let channel = TestChannel::attach(&name).unwrap();
            // 20 bytes into a 16-byte ring with no consumer: the write parks
            // on the free-slots semaphore once the ring fills.
            let result = channel.write(b"aaaaaaaaaaaaaaaaaaaa", &token);
            let woke = Instant::now();
            channel.close().unwrap();
            (result, woke)
        })
    };

    // Give the producer time to fill the ring and park.
    thread::sleep(Duration::from_millis(100));
    let shutdown_at = Instant::now();
    owner.close().unwrap();

    let (result, woke_at) = producer.join().unwrap();
    assert!(matches!(result, Err(RingError::Closed)), "got {result:?}");
    assert!(
        woke_at.duration_since(shutdown_at) < Duration::from_secs(1),
        "blocked producer did not wake promptly"
    );
}

#[test]
fn writes_after_shutdown_fail_without_blocking() {
    let name = test_name("dead");
    let owner = TestChannel::create(&name).unwrap();
    let token = ShutdownToken::new();

    let producer = TestChannel::attach(&name).unwrap();
    let optimal = Solution { removed: vec![] }.encode().unwrap();
    producer.write(&optimal, &token).unwrap();

    // Consumer accepts the terminal candidate and shuts the channel down.
    let message = owner.read(&token).unwrap();
    assert!(Solution::decode(&message).unwrap().is_optimal());
    owner.close().unwrap();

    let started = Instant::now();
    let result = producer.write(b"1 0-1", &token);
    assert!(matches!(result, Err(RingError::Closed)), "got {result:?}");
    assert!(started.elapsed() < Duration::from_secs(1));

    producer.close().unwrap();
}

#[test]
fn cancellation_token_aborts_a_blocked_read() {
    let name = test_name("cancel");
    let owner = TestChannel::create(&name).unwrap();
    let token = ShutdownToken::new();

    let consumer = {
        let token = token.clone();
        thread::spawn(move || {
            let result = owner.read(&token);
            (result, owner)
        })
    };

    thread::sleep(Duration::from_millis(100));
    token.cancel();

    let (result, owner) = consumer.join().unwrap();
    assert!(matches!(result, Err(RingError::Cancelled)), "got {result:?}");
    owner.close().unwrap();
}

#[test]
fn attach_without_a_supervisor_fails() {
    let name = test_name("orphan");
    assert!(TestChannel::attach(&name).is_err());
}

#[test]
fn close_after_external_unlink_reports_failure_but_finishes() {
    let name = test_name("unlinked");
    let owner = TestChannel::create(&name).unwrap();

    // Simulate a crash-recovery sweep racing the owner's teardown.
    basalt_shm::ShmObject::remove(&name.segment()).unwrap();

    let err = owner.close().unwrap_err();
    assert_eq!(err.steps, vec!["unlink segment"]);
}
