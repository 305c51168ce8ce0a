//! Integration tests for the tools version checker.

use std::error::Error;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::DateTime;
use corral_controller::facade::{FacadeError, ToolsVersionFacade};
use corral_controller::workers::tools_version::{new_worker, VersionCheckerParams};
use corral_reconcile::{TestClock, WorkerState};

const INTERVAL: Duration = Duration::from_secs(6 * 60 * 60);
const LONG_WAIT: Duration = Duration::from_secs(10);

/// Succeeds `ok_calls` times, then fails.
struct CountingFacade {
    calls: AtomicUsize,
    ok_calls: usize,
}

#[async_trait]
impl ToolsVersionFacade for CountingFacade {
    async fn update_tools_version(&self) -> Result<(), FacadeError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        if n < self.ok_calls {
            return Ok(());
        }
        Err(FacadeError::Api {
            status: 503,
            code: "unavailable".to_string(),
            message: "simplestreams unreachable".to_string(),
        })
    }
}

fn clock() -> TestClock {
    TestClock::new(DateTime::from_timestamp(1_700_000_000, 0).unwrap())
}

#[tokio::test]
async fn test_checks_every_interval() {
    let facade = Arc::new(CountingFacade {
        calls: AtomicUsize::new(0),
        ok_calls: usize::MAX,
    });
    let clock = clock();
    let worker = new_worker(
        facade.clone(),
        VersionCheckerParams {
            check_interval: INTERVAL,
        },
        Arc::new(clock.clone()),
    )
    .unwrap();

    for expected in 1..=3 {
        tokio::time::timeout(LONG_WAIT, clock.wait_alarms(1))
            .await
            .expect("worker never scheduled its next check");
        assert_eq!(facade.calls.load(Ordering::SeqCst), expected);
        clock.advance(INTERVAL);
    }

    worker.shutdown().await.unwrap();
    assert!(matches!(worker.state(), WorkerState::Stopped));
}

#[tokio::test]
async fn test_error_is_annotated() {
    let facade = Arc::new(CountingFacade {
        calls: AtomicUsize::new(0),
        ok_calls: 0,
    });
    let worker = new_worker(
        facade,
        VersionCheckerParams {
            check_interval: INTERVAL,
        },
        Arc::new(clock()),
    )
    .unwrap();

    let err = tokio::time::timeout(LONG_WAIT, worker.wait())
        .await
        .expect("worker did not stop")
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "cannot update tools information: simplestreams unreachable"
    );

    let source = err
        .action_error()
        .and_then(|annotated| annotated.source())
        .map(|source| source.to_string());
    assert_eq!(source.as_deref(), Some("simplestreams unreachable"));
    assert!(matches!(worker.state(), WorkerState::Faulted(_)));
}
