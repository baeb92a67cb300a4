// tests/announcer_countdown.rs

use std::error::Error;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use stageline::announce::{
    AnnounceOutcome, Announcer, AnnouncerService, AnnouncerState, ChannelSpec, ForegroundSlot,
    NotificationKind, Notifier, ALL_COMPLETE_NOTIF_ID, COUNTDOWN_TICKS,
};
use stageline::bus::CompletionBus;
use stageline::config::ChannelConfig;
use stageline::types::{NotifId, PriorityHint, WorkToken};
use stageline_test_utils::recording_notifier::RecordingNotifier;
use stageline_test_utils::{init_tracing, with_timeout};

type TestResult = Result<(), Box<dyn Error>>;

const TICK: Duration = Duration::from_millis(10);

fn countdown_channel() -> ChannelSpec {
    ChannelSpec::from_config("countdown", &ChannelConfig::countdown(), TICK)
}

fn final_channel() -> ChannelSpec {
    ChannelSpec::from_config("final", &ChannelConfig::final_channel(), TICK)
}

fn announcer(channel: ChannelSpec, notifier: &Arc<RecordingNotifier>, bus: &CompletionBus) -> Announcer {
    let notifier: Arc<dyn Notifier> = notifier.clone();
    Announcer::new(Arc::new(channel), notifier, bus.clone())
}

#[test]
fn state_machine_counts_down_from_five() {
    let mut state = AnnouncerState::Starting;
    let mut seen = vec![state];
    while !state.is_done() {
        state = state.next();
        seen.push(state);
    }

    let counting: Vec<u8> = seen
        .iter()
        .filter_map(|s| match s {
            AnnouncerState::Counting(n) => Some(*n),
            _ => None,
        })
        .collect();

    assert_eq!(counting, vec![5, 4, 3, 2, 1, 0]);
    assert_eq!(counting.len(), COUNTDOWN_TICKS as usize);
    assert_eq!(seen[seen.len() - 2], AnnouncerState::Completed);
    assert_eq!(AnnouncerState::Notified.next(), AnnouncerState::Notified);
}

#[tokio::test]
async fn six_ticks_then_exactly_one_completion() -> TestResult {
    init_tracing();

    let notifier = RecordingNotifier::new().shared();
    let bus = CompletionBus::new();
    let outcome = with_timeout(announcer(countdown_channel(), &notifier, &bus).run(
        WorkToken::from("002"),
        None,
        &CancellationToken::new(),
    ))
    .await;

    assert_eq!(outcome, AnnounceOutcome::Notified);
    assert_eq!(
        notifier.kinds(),
        vec![
            NotificationKind::Started { foreground: false },
            NotificationKind::Tick { remaining: 5 },
            NotificationKind::Tick { remaining: 4 },
            NotificationKind::Tick { remaining: 3 },
            NotificationKind::Tick { remaining: 2 },
            NotificationKind::Tick { remaining: 1 },
            NotificationKind::Tick { remaining: 0 },
            NotificationKind::Completed,
            NotificationKind::Alert,
        ]
    );

    let posts = notifier.posts();
    assert!(posts.iter().all(|p| p.id == NotifId(1002)));
    assert_eq!(posts[3].text, "Task 002: 3 seconds remaining...");
    assert_eq!(posts[7].text, "Task 002 finished successfully ✅");
    assert_eq!(posts[8].channel, "countdown_completion");
    assert_eq!(bus.latest(), Some(WorkToken::from("002")));
    Ok(())
}

#[tokio::test]
async fn only_terminal_channel_broadcasts_all_complete() -> TestResult {
    init_tracing();

    let bus = CompletionBus::new();

    let non_terminal = RecordingNotifier::new().shared();
    with_timeout(announcer(countdown_channel(), &non_terminal, &bus).run(
        WorkToken::from("002"),
        None,
        &CancellationToken::new(),
    ))
    .await;
    assert_eq!(non_terminal.count(&NotificationKind::AllComplete), 0);

    let terminal = RecordingNotifier::new().shared();
    with_timeout(announcer(final_channel(), &terminal, &bus).run(
        WorkToken::from("003"),
        None,
        &CancellationToken::new(),
    ))
    .await;

    let posts = terminal.posts();
    let tail: Vec<_> = posts.iter().rev().take(3).rev().map(|p| p.kind.clone()).collect();
    assert_eq!(
        tail,
        vec![
            NotificationKind::Completed,
            NotificationKind::Alert,
            NotificationKind::AllComplete
        ]
    );

    let broadcast = posts.last().expect("no posts");
    assert_eq!(broadcast.id, ALL_COMPLETE_NOTIF_ID);
    assert_eq!(broadcast.id, NotifId(9999));
    assert_eq!(broadcast.channel, "final_completion");
    assert_eq!(posts[0].text, "Starting final countdown...");
    assert_eq!(bus.latest(), Some(WorkToken::from("003")));
    Ok(())
}

#[tokio::test]
async fn denied_notifications_still_write_the_bus() -> TestResult {
    init_tracing();

    let notifier = RecordingNotifier::denied().shared();
    let bus = CompletionBus::new();
    let outcome = with_timeout(announcer(final_channel(), &notifier, &bus).run(
        WorkToken::from("003"),
        None,
        &CancellationToken::new(),
    ))
    .await;

    assert_eq!(outcome, AnnounceOutcome::Notified);
    assert!(notifier.posts().is_empty());
    assert_eq!(bus.latest(), Some(WorkToken::from("003")));
    Ok(())
}

#[tokio::test]
async fn permission_revoked_mid_countdown_silences_the_rest() -> TestResult {
    init_tracing();

    let notifier = Arc::new_cyclic(|me: &Weak<RecordingNotifier>| {
        let me = me.clone();
        RecordingNotifier::new().with_hook(move |n| {
            if n.kind == (NotificationKind::Tick { remaining: 3 }) {
                if let Some(me) = me.upgrade() {
                    me.set_permitted(false);
                }
            }
        })
    });
    let bus = CompletionBus::new();

    let outcome = with_timeout(announcer(final_channel(), &notifier, &bus).run(
        WorkToken::from("zzz"),
        None,
        &CancellationToken::new(),
    ))
    .await;

    assert_eq!(outcome, AnnounceOutcome::Notified);
    assert_eq!(notifier.ticks(), vec![5, 4, 3]);
    assert_eq!(notifier.kinds().len(), 4);
    assert_eq!(notifier.count(&NotificationKind::Completed), 0);
    assert_eq!(notifier.count(&NotificationKind::Alert), 0);
    assert_eq!(notifier.count(&NotificationKind::AllComplete), 0);
    assert_eq!(bus.latest(), Some(WorkToken::from("zzz")));
    Ok(())
}

#[tokio::test]
async fn cancel_at_counting_three_stops_everything() -> TestResult {
    init_tracing();

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    let notifier = RecordingNotifier::new()
        .with_hook(move |n| {
            if n.kind == (NotificationKind::Tick { remaining: 3 }) {
                trigger.cancel();
            }
        })
        .shared();
    let bus = CompletionBus::new();

    let outcome = with_timeout(announcer(final_channel(), &notifier, &bus).run(
        WorkToken::from("003"),
        None,
        &cancel,
    ))
    .await;

    assert_eq!(
        outcome,
        AnnounceOutcome::Cancelled {
            at: AnnouncerState::Counting(3)
        }
    );
    assert_eq!(notifier.ticks(), vec![5, 4, 3]);
    assert_eq!(notifier.count(&NotificationKind::Completed), 0);
    assert_eq!(notifier.count(&NotificationKind::AllComplete), 0);
    assert_eq!(bus.latest(), None);

    // Nothing else trickles in afterwards.
    tokio::time::sleep(TICK * 3).await;
    assert_eq!(notifier.ticks(), vec![5, 4, 3]);
    Ok(())
}

#[tokio::test]
async fn already_cancelled_run_emits_nothing() -> TestResult {
    init_tracing();

    let cancel = CancellationToken::new();
    cancel.cancel();
    let notifier = RecordingNotifier::new().shared();
    let bus = CompletionBus::new();

    let outcome = announcer(countdown_channel(), &notifier, &bus)
        .run(WorkToken::from("002"), None, &cancel)
        .await;

    assert_eq!(
        outcome,
        AnnounceOutcome::Cancelled {
            at: AnnouncerState::Starting
        }
    );
    assert!(notifier.posts().is_empty());
    assert_eq!(bus.latest(), None);
    Ok(())
}

#[tokio::test]
async fn foreground_lease_is_released_before_completion_is_emitted() -> TestResult {
    init_tracing();

    let slot = ForegroundSlot::new();
    let held_at_completion = Arc::new(AtomicBool::new(true));

    let observed_slot = slot.clone();
    let flag = Arc::clone(&held_at_completion);
    let notifier = RecordingNotifier::new()
        .with_hook(move |n| {
            if n.kind == NotificationKind::Completed {
                flag.store(observed_slot.is_held(), Ordering::SeqCst);
            }
        })
        .shared();
    let bus = CompletionBus::new();

    let lease = slot.try_acquire();
    assert!(lease.is_some());
    assert!(slot.is_held());

    with_timeout(announcer(countdown_channel(), &notifier, &bus).run(
        WorkToken::from("001"),
        lease,
        &CancellationToken::new(),
    ))
    .await;

    assert!(!held_at_completion.load(Ordering::SeqCst));
    assert!(!slot.is_held());
    assert_eq!(
        notifier.kinds()[0],
        NotificationKind::Started { foreground: true }
    );
    Ok(())
}

#[tokio::test]
async fn service_grants_one_foreground_lease_at_a_time() -> TestResult {
    init_tracing();

    let notifier = RecordingNotifier::new().shared();
    let dyn_notifier: Arc<dyn Notifier> = notifier.clone();
    let bus = CompletionBus::new();
    let service = AnnouncerService::new(
        countdown_channel(),
        dyn_notifier,
        bus.clone(),
        CancellationToken::new(),
    );

    let token = WorkToken::from("001");
    assert_eq!(service.priority_for(&token), PriorityHint::Foreground);
    assert_eq!(
        service.priority_for(&WorkToken::from("002")),
        PriorityHint::Background
    );

    let first = service.launch(token.clone(), PriorityHint::Foreground);
    let second = service.launch(token.clone(), PriorityHint::Foreground);
    assert!(service.foreground_held());

    assert_eq!(with_timeout(first).await?, AnnounceOutcome::Notified);
    assert_eq!(with_timeout(second).await?, AnnounceOutcome::Notified);
    with_timeout(service.wait_idle()).await;

    assert!(!service.foreground_held());
    assert_eq!(
        notifier.count(&NotificationKind::Started { foreground: true }),
        1
    );
    assert_eq!(
        notifier.count(&NotificationKind::Started { foreground: false }),
        1
    );
    assert_eq!(notifier.count(&NotificationKind::Completed), 2);
    assert_eq!(bus.latest(), Some(token));
    Ok(())
}

#[tokio::test]
async fn service_shutdown_cancels_in_flight_countdowns() -> TestResult {
    init_tracing();

    let notifier = RecordingNotifier::new().shared();
    let dyn_notifier: Arc<dyn Notifier> = notifier.clone();
    let bus = CompletionBus::new();
    let channel = ChannelSpec::from_config(
        "final",
        &ChannelConfig::final_channel(),
        Duration::from_secs(60),
    );
    let service = AnnouncerService::new(channel, dyn_notifier, bus.clone(), CancellationToken::new());

    let run = service.launch(WorkToken::from("003"), PriorityHint::Foreground);
    assert!(service.foreground_held());

    service.shutdown();

    let outcome = with_timeout(run).await?;
    assert!(outcome.is_cancelled());
    with_timeout(service.wait_idle()).await;

    assert_eq!(service.in_flight(), 0);
    assert!(!service.foreground_held());
    assert_eq!(notifier.count(&NotificationKind::Completed), 0);
    assert_eq!(bus.latest(), None);
    Ok(())
}
