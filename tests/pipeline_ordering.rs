// tests/pipeline_ordering.rs

use std::error::Error;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::mpsc;

use stageline::errors::StagelineError;
use stageline::pipeline::{
    Constraints, FixedConnectivity, Pipeline, SimulatedTask, TaskUnit, UnitFuture, UnitSpec,
    UnitUpdate,
};
use stageline::types::{TaskResult, WorkState, WorkToken};
use stageline_test_utils::fake_executor::FakeExecutor;
use stageline_test_utils::{init_tracing, with_timeout};

type TestResult = Result<(), Box<dyn Error>>;

/// Unit that returns an error.
#[derive(Debug)]
struct ErrUnit;

impl TaskUnit for ErrUnit {
    fn perform(&self, _input: WorkToken) -> UnitFuture<'_> {
        Box::pin(async { Err::<TaskResult, _>(anyhow::anyhow!("boom")) })
    }
}

/// Unit that panics.
#[derive(Debug)]
struct PanicUnit;

impl TaskUnit for PanicUnit {
    fn perform(&self, _input: WorkToken) -> UnitFuture<'_> {
        Box::pin(async { explode() })
    }
}

fn explode() -> anyhow::Result<TaskResult> {
    panic!("unit panicked on purpose")
}

/// Unit that counts how often it was started.
#[derive(Debug)]
struct CountingUnit(Arc<AtomicUsize>);

impl TaskUnit for CountingUnit {
    fn perform(&self, input: WorkToken) -> UnitFuture<'_> {
        Box::pin(async move {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(TaskResult::success(input))
        })
    }
}

fn simulated(name: &str, token: &str, millis: u64) -> UnitSpec {
    UnitSpec::new(name, token, SimulatedTask::new(Duration::from_millis(millis)))
}

fn three_units(millis: u64) -> Pipeline {
    Pipeline::new()
        .unit(simulated("first", "001", millis))
        .unit(simulated("second", "002", millis))
        .unit(simulated("third", "003", millis))
}

type Recorded = Arc<Mutex<Vec<Vec<UnitUpdate>>>>;

fn record_all(handle: &stageline::pipeline::PipelineHandle) -> Result<Recorded, StagelineError> {
    let recorded: Recorded = Arc::new(Mutex::new(vec![Vec::new(); handle.len()]));
    for index in 0..handle.len() {
        let sink = Arc::clone(&recorded);
        handle.subscribe(index, move |update| {
            sink.lock().unwrap()[index].push(update.clone());
        })?;
    }
    Ok(recorded)
}

fn find<'a>(updates: &'a [UnitUpdate], pred: impl Fn(&WorkState) -> bool) -> &'a UnitUpdate {
    updates
        .iter()
        .find(|u| pred(&u.state))
        .expect("expected state not observed")
}

#[tokio::test]
async fn units_run_strictly_in_order() -> TestResult {
    init_tracing();

    let handle = three_units(20).submit(&FixedConnectivity(true)).await?;
    let recorded = record_all(&handle)?;

    let report = with_timeout(handle.join()).await?;
    assert!(report.succeeded(), "report: {report:?}");

    let recorded = recorded.lock().unwrap();

    for (index, updates) in recorded.iter().enumerate() {
        // Ranks only ever go up for a single unit.
        for pair in updates.windows(2) {
            assert!(
                pair[1].state.rank() > pair[0].state.rank(),
                "unit {index} regressed: {:?} -> {:?}",
                pair[0].state,
                pair[1].state
            );
        }
        let last = updates.last().expect("no updates recorded");
        assert!(last.state.is_success(), "unit {index} ended in {}", last.state);
        assert_eq!(last.token.as_str(), ["001", "002", "003"][index]);
    }

    for i in 0..2 {
        let finished = find(&recorded[i], WorkState::is_finished);
        let next_running = find(&recorded[i + 1], |s| *s == WorkState::Running);

        assert!(
            finished.seq < next_running.seq,
            "Finished({i}) seq {} must precede Running({}) seq {}",
            finished.seq,
            i + 1,
            next_running.seq
        );
        assert!(next_running.at >= finished.at);
    }

    Ok(())
}

#[tokio::test]
async fn outputs_follow_the_output_template() -> TestResult {
    init_tracing();

    let task = SimulatedTask::new(Duration::from_millis(5))
        .with_output("Processed second with ID: {token}");
    let handle = Pipeline::new()
        .unit(UnitSpec::new("second", "002", task))
        .submit(&FixedConnectivity(true))
        .await?;

    let report = with_timeout(handle.join()).await?;

    match &report.units[0].state {
        WorkState::Finished(result) => assert_eq!(
            result.output_token,
            Some(WorkToken::from("Processed second with ID: 002"))
        ),
        other => panic!("expected Finished, got {other}"),
    }
    Ok(())
}

#[tokio::test]
async fn late_subscriber_gets_latest_state_once() -> TestResult {
    init_tracing();

    let executed = Arc::new(Mutex::new(Vec::new()));
    let exec_log = Arc::clone(&executed);
    let handle = three_units(0)
        .submit_with(&FixedConnectivity(true), move |tx| {
            FakeExecutor::new(tx, exec_log)
        })
        .await?;

    // Wait until the last unit has finished.
    let (done_tx, mut done_rx) = mpsc::unbounded_channel();
    handle.subscribe(2, move |update| {
        if update.state.is_finished() {
            let _ = done_tx.send(());
        }
    })?;
    with_timeout(done_rx.recv()).await;

    let late = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&late);
    handle.subscribe(0, move |update| sink.lock().unwrap().push(update.clone()))?;

    with_timeout(handle.join()).await?;

    let late = late.lock().unwrap();
    assert_eq!(late.len(), 1, "late subscriber saw {late:?}");
    assert!(late[0].state.is_success());
    assert_eq!(late[0].name, "first");
    assert_eq!(*executed.lock().unwrap(), vec!["first", "second", "third"]);
    Ok(())
}

#[tokio::test]
async fn failure_halts_every_later_unit() -> TestResult {
    init_tracing();

    let executed = Arc::new(Mutex::new(Vec::new()));
    let exec_log = Arc::clone(&executed);
    let handle = three_units(0)
        .submit_with(&FixedConnectivity(true), move |tx| {
            FakeExecutor::new(tx, exec_log).failing("002")
        })
        .await?;
    let recorded = record_all(&handle)?;

    let report = with_timeout(handle.join()).await?;

    assert!(!report.succeeded());
    assert!(!report.cancelled);
    assert_eq!(*executed.lock().unwrap(), vec!["first", "second"]);

    assert!(report.units[0].state.is_success());
    assert_eq!(report.units[1].state, WorkState::Finished(TaskResult::failure()));
    assert_eq!(report.units[2].state, WorkState::Finished(TaskResult::failure()));
    assert_eq!(report.first_failure().map(|u| u.name.as_str()), Some("second"));

    let recorded = recorded.lock().unwrap();
    assert!(
        recorded[2].iter().all(|u| u.state != WorkState::Running),
        "halted unit must never run: {:?}",
        recorded[2]
    );
    Ok(())
}

#[tokio::test]
async fn unit_error_becomes_failure() -> TestResult {
    init_tracing();

    let handle = Pipeline::new()
        .unit(UnitSpec::new("first", "001", ErrUnit))
        .unit(simulated("second", "002", 0))
        .submit(&FixedConnectivity(true))
        .await?;

    let report = with_timeout(handle.join()).await?;

    assert_eq!(report.units[0].state, WorkState::Finished(TaskResult::failure()));
    assert_eq!(report.units[1].state, WorkState::Finished(TaskResult::failure()));
    Ok(())
}

#[tokio::test]
async fn unit_panic_becomes_failure() -> TestResult {
    init_tracing();

    let handle = Pipeline::new()
        .unit(simulated("first", "001", 0))
        .unit(UnitSpec::new("second", "002", PanicUnit))
        .submit(&FixedConnectivity(true))
        .await?;

    let report = with_timeout(handle.join()).await?;

    assert!(report.units[0].state.is_success());
    assert_eq!(report.units[1].state, WorkState::Finished(TaskResult::failure()));
    Ok(())
}

#[tokio::test]
async fn offline_submission_starts_nothing() -> TestResult {
    init_tracing();

    let started = Arc::new(AtomicUsize::new(0));
    let result = Pipeline::new()
        .unit(
            UnitSpec::new("first", "001", CountingUnit(Arc::clone(&started)))
                .with_constraints(Constraints::network()),
        )
        .submit(&FixedConnectivity(false))
        .await;

    match result {
        Err(StagelineError::PreconditionUnmet(msg)) => assert!(msg.contains("first")),
        Err(e) => panic!("Expected PreconditionUnmet, got: {e:?}"),
        Ok(_) => panic!("Expected error, got Ok"),
    }

    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(started.load(Ordering::SeqCst), 0);
    Ok(())
}

#[tokio::test]
async fn probe_is_ignored_when_no_unit_needs_network() -> TestResult {
    init_tracing();

    let handle = three_units(0).submit(&FixedConnectivity(false)).await?;
    let report = with_timeout(handle.join()).await?;
    assert!(report.succeeded());
    Ok(())
}

#[tokio::test]
async fn subscribe_to_unknown_index_fails() -> TestResult {
    init_tracing();

    let handle = three_units(0).submit(&FixedConnectivity(true)).await?;

    match handle.subscribe(3, |_| {}) {
        Err(StagelineError::UnknownUnit(3)) => {}
        other => panic!("Expected UnknownUnit(3), got: {other:?}"),
    }

    with_timeout(handle.join()).await?;
    Ok(())
}

#[tokio::test]
async fn cancellation_aborts_running_unit_without_completion() -> TestResult {
    init_tracing();

    let handle = three_units(10_000).submit(&FixedConnectivity(true)).await?;
    let recorded = record_all(&handle)?;

    let (running_tx, mut running_rx) = mpsc::unbounded_channel();
    handle.subscribe(0, move |update| {
        if update.state == WorkState::Running {
            let _ = running_tx.send(());
        }
    })?;
    with_timeout(running_rx.recv()).await;

    handle.cancel();
    let report = with_timeout(handle.join()).await?;

    assert!(report.cancelled);
    assert!(!report.succeeded());
    assert_eq!(report.units[0].state, WorkState::Running);
    assert_eq!(report.units[1].state, WorkState::Enqueued);
    assert_eq!(report.units[2].state, WorkState::Enqueued);

    let recorded = recorded.lock().unwrap();
    assert!(recorded.iter().flatten().all(|u| !u.state.is_finished()));
    Ok(())
}

#[tokio::test]
async fn empty_pipeline_finishes_immediately() -> TestResult {
    init_tracing();

    let handle = Pipeline::new().submit(&FixedConnectivity(true)).await?;
    assert!(handle.is_empty());

    let report = with_timeout(handle.join()).await?;
    assert!(report.units.is_empty());
    assert!(!report.cancelled);
    Ok(())
}

#[tokio::test]
async fn cancellation_reaches_the_executor_backend() -> TestResult {
    init_tracing();

    let executed = Arc::new(Mutex::new(Vec::new()));
    let cancels = Arc::new(Mutex::new(0));
    let exec_log = Arc::clone(&executed);
    let cancel_count = Arc::clone(&cancels);
    let handle = three_units(0)
        .submit_with(&FixedConnectivity(true), move |tx| {
            FakeExecutor::new(tx, exec_log).count_cancels(cancel_count)
        })
        .await?;

    // The runtime task has not been polled yet on this single-threaded test
    // runtime, so the first unit is still running when the cancel is seen.
    handle.cancel();
    let report = with_timeout(handle.join()).await?;

    assert!(report.cancelled);
    assert_eq!(*cancels.lock().unwrap(), 1);
    assert_eq!(*executed.lock().unwrap(), vec!["first"]);
    assert_eq!(report.units[0].state, WorkState::Running);
    assert_eq!(report.units[1].state, WorkState::Enqueued);
    Ok(())
}
