//! Integration tests for the charm revision worker.
//!
//! The worker runs against a recording facade and a virtual clock, so the
//! only way time passes is through `TestClock::advance`.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::DateTime;
use corral_controller::facade::{CharmRevisionFacade, FacadeError};
use corral_controller::workers::charm_revision::{new_worker, CharmRevisionConfig};
use corral_reconcile::{TestClock, WorkerHandle};
use tokio::sync::mpsc;

const PERIOD: Duration = Duration::from_secs(60);
const LONG_WAIT: Duration = Duration::from_secs(10);
const SHORT_WAIT: Duration = Duration::from_millis(50);

/// Records calls and replays scripted errors.
struct MockFacade {
    errors: Mutex<VecDeque<Option<String>>>,
    calls: mpsc::UnboundedSender<()>,
}

#[async_trait]
impl CharmRevisionFacade for MockFacade {
    async fn update_latest_revisions(&self) -> Result<(), FacadeError> {
        let _ = self.calls.send(());
        let next = self.errors.lock().unwrap().pop_front().flatten();
        match next {
            Some(message) => Err(FacadeError::Api {
                status: 500,
                code: "internal".to_string(),
                message,
            }),
            None => Ok(()),
        }
    }
}

struct Fixture {
    clock: TestClock,
    calls: mpsc::UnboundedReceiver<()>,
    worker: WorkerHandle,
}

impl Fixture {
    fn start(errors: Vec<Option<&str>>) -> Self {
        let (tx, calls) = mpsc::unbounded_channel();
        let facade = Arc::new(MockFacade {
            errors: Mutex::new(errors.into_iter().map(|e| e.map(String::from)).collect()),
            calls: tx,
        });
        let clock = TestClock::new(DateTime::from_timestamp(1_700_000_000, 0).unwrap());
        let worker = new_worker(CharmRevisionConfig {
            facade,
            clock: Arc::new(clock.clone()),
            period: PERIOD,
        })
        .unwrap();
        Self {
            clock,
            calls,
            worker,
        }
    }

    async fn wait_call(&mut self) {
        tokio::time::timeout(LONG_WAIT, self.calls.recv())
            .await
            .expect("timed out waiting for facade call")
            .expect("facade dropped");
    }

    async fn wait_no_call(&mut self) {
        if let Ok(Some(())) = tokio::time::timeout(SHORT_WAIT, self.calls.recv()).await {
            panic!("unexpected facade call");
        }
    }

    /// Advance the clock once the worker is waiting on it.
    async fn advance(&self, by: Duration) {
        tokio::time::timeout(LONG_WAIT, self.clock.wait_alarms(1))
            .await
            .expect("worker never scheduled its next run");
        self.clock.advance(by);
    }
}

#[tokio::test]
async fn test_updates_immediately() {
    let mut fix = Fixture::start(vec![]);
    fix.wait_call().await;
    fix.wait_no_call().await;
    fix.worker.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_no_more_updates_until_period() {
    let mut fix = Fixture::start(vec![]);
    fix.wait_call().await;
    fix.advance(PERIOD - Duration::from_nanos(1)).await;
    fix.wait_no_call().await;
    fix.worker.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_updates_after_period() {
    let mut fix = Fixture::start(vec![]);
    fix.wait_call().await;
    fix.advance(PERIOD).await;
    fix.wait_call().await;
    fix.wait_no_call().await;
    fix.worker.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_immediate_update_error() {
    let mut fix = Fixture::start(vec![Some("no updates for you")]);
    fix.wait_call().await;

    let err = tokio::time::timeout(LONG_WAIT, fix.worker.wait())
        .await
        .expect("worker did not stop")
        .unwrap_err();
    assert_eq!(err.to_string(), "no updates for you");

    fix.wait_no_call().await;
    assert_eq!(fix.clock.alarms(), 0);
}

#[tokio::test]
async fn test_delayed_update_error() {
    let mut fix = Fixture::start(vec![None, Some("no more updates for you")]);
    fix.wait_call().await;
    fix.advance(PERIOD).await;
    fix.wait_call().await;

    let err = tokio::time::timeout(LONG_WAIT, fix.worker.wait())
        .await
        .expect("worker did not stop")
        .unwrap_err();
    assert_eq!(err.to_string(), "no more updates for you");

    fix.clock.advance(PERIOD * 2);
    fix.wait_no_call().await;
    // The latched error survives a later stop.
    assert!(fix.worker.shutdown().await.is_err());
}

#[tokio::test]
async fn test_zero_period_rejected() {
    let (tx, _calls) = mpsc::unbounded_channel();
    let facade = Arc::new(MockFacade {
        errors: Mutex::new(VecDeque::new()),
        calls: tx,
    });
    let clock = TestClock::new(DateTime::from_timestamp(0, 0).unwrap());
    let result = new_worker(CharmRevisionConfig {
        facade,
        clock: Arc::new(clock),
        period: Duration::ZERO,
    });
    assert!(result.is_err());
}
