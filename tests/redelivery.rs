//! Redelivery, commit and fulfillment behaviour driven by a scripted backend.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use bytes::Bytes;
use tx_mediator::backend::BackendOutcome;
use tx_mediator::queue::{Headers, Message};
use tx_mediator::reply::ReplyStatus;
use tx_mediator::routing::{RedeliveryPolicy, RoutingDecision};
use tx_mediator::transaction::DeliveryObserver;
use tx_mediator::Mediator;

mod common;

use common::{FlakyCommitLog, ScriptedInvoker};

fn unreachable() -> BackendOutcome {
    BackendOutcome::Unreachable("connection refused".into())
}

fn accepted() -> BackendOutcome {
    BackendOutcome::Accepted(Bytes::from_static(common::OK_BODY.as_bytes()))
}

async fn start(invoker: Arc<ScriptedInvoker>, workers: usize) -> Mediator {
    let mut config = common::test_config("http://127.0.0.1:1/");
    config.queue.workers = workers;
    Mediator::builder(config).invoker(invoker).start().await.unwrap()
}

#[tokio::test]
async fn test_transient_failures_then_success() {
    let invoker = Arc::new(
        ScriptedInvoker::new(accepted())
            .script("r", vec![unreachable(), unreachable(), unreachable(), accepted()]),
    );
    let mediator = start(invoker.clone(), 2).await;

    let reply = mediator.gateway().send("r", Headers::new(), None).await.unwrap();

    assert_eq!(reply.status, ReplyStatus::Ok);
    assert_eq!(reply.redelivery_count, 3);
    let counts: Vec<u32> = invoker.attempts_for("r").iter().map(|a| a.redelivery_count).collect();
    assert_eq!(counts, vec![0, 1, 2, 3]);
    assert_eq!(mediator.stats().snapshot().rollbacks, 3);

    mediator.shutdown().await;
}

#[tokio::test]
async fn test_rejection_is_never_retried() {
    let invoker = Arc::new(ScriptedInvoker::new(BackendOutcome::Rejected(Bytes::from_static(
        common::DENIED_BODY.as_bytes(),
    ))));
    let mediator = start(invoker.clone(), 2).await;

    let reply = mediator.gateway().send("r", Headers::new(), None).await.unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert_eq!(reply.status, ReplyStatus::Rejected);
    assert_eq!(invoker.attempts_for("r").len(), 1);
    assert_eq!(mediator.stats().snapshot().rollbacks, 0);

    mediator.shutdown().await;
}

#[tokio::test]
async fn test_attempts_for_one_correlation_never_overlap() {
    let invoker = Arc::new(
        ScriptedInvoker::new(accepted())
            .with_call_delay(Duration::from_millis(30))
            .script("r", vec![unreachable(), unreachable(), unreachable(), unreachable(), accepted()]),
    );
    let mediator = start(invoker.clone(), 4).await;

    let reply = mediator.gateway().send("r", Headers::new(), None).await.unwrap();
    assert_eq!(reply.redelivery_count, 4);

    let mut attempts = invoker.attempts_for("r");
    attempts.sort_by_key(|a| a.started);
    for pair in attempts.windows(2) {
        assert!(pair[1].started >= pair[0].finished, "attempts overlapped");
        assert_eq!(pair[1].redelivery_count, pair[0].redelivery_count + 1);
    }
    assert_eq!(invoker.peak_concurrency(), 1);

    mediator.shutdown().await;
}

#[tokio::test]
async fn test_capped_redelivery_abandons() {
    let invoker = Arc::new(ScriptedInvoker::new(unreachable()));
    let mut config = common::test_config("http://127.0.0.1:1/");
    config.queue.workers = 2;
    let mediator = Mediator::builder(config)
        .invoker(invoker.clone())
        .policy(RedeliveryPolicy::unbounded(Duration::from_millis(10)).with_max_redeliveries(2))
        .start()
        .await
        .unwrap();

    let reply = mediator.gateway().send("r", Headers::new(), None).await.unwrap();

    assert_eq!(reply.status, ReplyStatus::Abandoned);
    assert_eq!(reply.body, tx_mediator::reply::UNAVAILABLE_REPLY);
    assert_eq!(reply.redelivery_count, 2);
    assert_eq!(invoker.attempts_for("r").len(), 3);
    assert_eq!(mediator.stats().snapshot().replies_abandoned, 1);

    mediator.shutdown().await;
}

#[tokio::test]
async fn test_policy_change_applies_to_new_messages_only() {
    let invoker = Arc::new(ScriptedInvoker::new(unreachable()));
    let mediator = start(invoker.clone(), 2).await;

    let gateway = mediator.gateway().clone();
    let old = tokio::spawn(async move {
        gateway
            .send("old", Headers::new(), Some(Duration::from_millis(500)))
            .await
    });
    tokio::time::sleep(Duration::from_millis(50)).await;

    mediator.apply_policy(RedeliveryPolicy::unbounded(Duration::from_millis(10)).with_max_redeliveries(1));
    let reply = mediator.gateway().send("new", Headers::new(), None).await.unwrap();
    assert_eq!(reply.status, ReplyStatus::Abandoned);
    assert_eq!(reply.redelivery_count, 1);

    // The earlier message keeps its unbounded policy and only times out.
    assert!(old.await.unwrap().unwrap_err().is_timeout());
    assert!(invoker.attempts_for("old").len() > 2);

    mediator.shutdown().await;
}

#[tokio::test]
async fn test_commit_failure_rolls_back_and_redelivers() {
    let invoker = Arc::new(ScriptedInvoker::new(accepted()));
    let mut config = common::test_config("http://127.0.0.1:1/");
    config.queue.workers = 1;
    let mediator = Mediator::builder(config)
        .invoker(invoker.clone())
        .commit_log(Arc::new(FlakyCommitLog::new(1)))
        .start()
        .await
        .unwrap();

    let reply = mediator.gateway().send("r", Headers::new(), None).await.unwrap();

    assert_eq!(reply.status, ReplyStatus::Ok);
    assert_eq!(reply.redelivery_count, 1);
    assert_eq!(invoker.attempts_for("r").len(), 2);

    let stats = mediator.stats().snapshot();
    assert_eq!(stats.commit_failures, 1);
    assert_eq!(stats.commits, 1);
    assert_eq!(stats.rollbacks, 1);

    mediator.shutdown().await;
}

#[tokio::test]
async fn test_each_commit_reaches_caller_or_is_discarded_once() {
    let invoker = Arc::new(ScriptedInvoker::new(accepted()).with_call_delay(Duration::from_millis(20)));
    let mediator = start(invoker.clone(), 4).await;

    let requests = 20;
    let mut callers = Vec::new();
    for i in 0..requests {
        let gateway = mediator.gateway().clone();
        callers.push(tokio::spawn(async move {
            gateway
                .send(format!("r{}", i), Headers::new(), Some(Duration::from_millis(45)))
                .await
        }));
    }

    let mut delivered = 0;
    let mut timed_out = 0;
    for caller in callers {
        match caller.await.unwrap() {
            Ok(reply) => {
                assert_eq!(reply.status, ReplyStatus::Ok);
                delivered += 1;
            }
            Err(e) => {
                assert!(e.is_timeout());
                timed_out += 1;
            }
        }
    }
    assert_eq!(delivered + timed_out, requests);

    assert!(
        common::eventually(Duration::from_secs(3), || {
            let stats = mediator.stats().snapshot();
            stats.commits == requests as u64
                && stats.late_replies_discarded + delivered as u64 == stats.commits
        })
        .await
    );
    let stats = mediator.stats().snapshot();
    assert_eq!(stats.exchange_timeouts, timed_out as u64);
    assert!(mediator.correlations().is_empty());

    mediator.shutdown().await;
}

#[tokio::test]
async fn test_stuck_message_does_not_block_fresh_requests() {
    let invoker = Arc::new(ScriptedInvoker::new(accepted()).script("stuck", vec![unreachable()]));
    let mediator = start(invoker.clone(), 1).await;

    let gateway = mediator.gateway().clone();
    let stuck = tokio::spawn(async move {
        gateway
            .send("stuck", Headers::new(), Some(Duration::from_millis(800)))
            .await
    });
    tokio::time::sleep(Duration::from_millis(50)).await;

    let started = std::time::Instant::now();
    let reply = mediator
        .gateway()
        .send("fresh", Headers::new(), Some(Duration::from_millis(500)))
        .await
        .unwrap();
    assert_eq!(reply.status, ReplyStatus::Ok);
    assert_eq!(reply.redelivery_count, 0);
    assert!(started.elapsed() < Duration::from_millis(500));

    assert!(stuck.await.unwrap().unwrap_err().is_timeout());
    mediator.shutdown().await;
}

#[derive(Default)]
struct RecordingObserver {
    decisions: Mutex<Vec<&'static str>>,
}

impl DeliveryObserver for RecordingObserver {
    fn on_decision(&self, _message: &Message, decision: &RoutingDecision) {
        self.decisions.lock().unwrap().push(decision.label());
    }
}

#[tokio::test]
async fn test_observer_sees_every_decision() {
    let invoker = Arc::new(ScriptedInvoker::new(accepted()).script("r", vec![unreachable(), accepted()]));
    let observer = Arc::new(RecordingObserver::default());
    let mediator = Mediator::builder(common::test_config("http://127.0.0.1:1/"))
        .invoker(invoker)
        .observer(observer.clone())
        .start()
        .await
        .unwrap();

    mediator.gateway().send("r", Headers::new(), None).await.unwrap();

    assert_eq!(
        *observer.decisions.lock().unwrap(),
        vec!["retry_later", "reply_success"]
    );
    mediator.shutdown().await;
}
