// ABOUTME: Countdown timing tests on a paused tokio clock.
// ABOUTME: Broadcast tiers, prompt cancellation, and the late-join notice.

mod support;

use bedrock_keeper::events::{EventBus, KeeperEvent};
use bedrock_keeper::notify::{
    CancelFlag, Countdown, CountdownBoard, CountdownOutcome, CountdownSession, Notice,
};
use std::sync::Arc;
use std::time::Duration;
use support::FakeServer;

#[tokio::test(start_paused = true)]
async fn broadcasts_follow_the_tiers() {
    let server = FakeServer::running();
    let session = Arc::new(CountdownSession::new(75, Notice::backup()));
    let events = EventBus::new();
    let mut ticks = events.subscribe();
    let started = tokio::time::Instant::now();

    let outcome = Countdown::new(Arc::clone(&session))
        .with_events(events)
        .run(&server, &CancelFlag::new())
        .await;

    assert_eq!(outcome, CountdownOutcome::Completed);
    assert_eq!(started.elapsed(), Duration::from_secs(75));
    assert_eq!(session.remaining_secs(), 0);
    let mut tick_count = 0;
    while let Ok(event) = ticks.try_recv() {
        if let KeeperEvent::CountdownTick { .. } = event {
            tick_count += 1;
        }
    }
    assert_eq!(tick_count, 75);
    let expected: Vec<String> = [75, 60, 30, 25, 20, 15, 10, 9, 8, 7, 6, 5, 4, 3, 2, 1]
        .into_iter()
        .map(|remaining| Notice::backup().scheduled(remaining))
        .collect();
    assert_eq!(server.broadcasts(), expected);
    assert_eq!(server.broadcasts()[0], "Backup will begin in 1 minute");
}

#[tokio::test(start_paused = true)]
async fn cancellation_stops_within_a_tick() {
    let server = Arc::new(FakeServer::running());
    let session = Arc::new(CountdownSession::new(600, Notice::update()));
    let cancel = CancelFlag::new();

    let task = {
        let server = Arc::clone(&server);
        let session = Arc::clone(&session);
        let cancel = cancel.clone();
        tokio::spawn(async move { Countdown::new(session).run(server.as_ref(), &cancel).await })
    };

    tokio::time::sleep(Duration::from_millis(120_500)).await;
    let sent_before = server.broadcasts().len();
    cancel.cancel();
    let cancelled_at = tokio::time::Instant::now();

    assert_eq!(task.await.unwrap(), CountdownOutcome::Cancelled);
    assert!(cancelled_at.elapsed() <= Duration::from_secs(1));
    assert_eq!(server.broadcasts().len(), sent_before);
    assert!(session.remaining_secs() > 0);
}

#[tokio::test(start_paused = true)]
async fn late_join_notice_appears_only_in_long_gaps() {
    let server = Arc::new(FakeServer::running());
    let board = CountdownBoard::new();
    let session = board.begin(600, Notice::update());
    let cancel = CancelFlag::new();

    let task = {
        let server = Arc::clone(&server);
        let session = Arc::clone(&session);
        let cancel = cancel.clone();
        tokio::spawn(async move { Countdown::new(session).run(server.as_ref(), &cancel).await })
    };

    // 600 -> next broadcast at 300, so a minute in there is a 240 s gap
    tokio::time::sleep(Duration::from_secs(60)).await;
    let message = board.late_join_message().expect("gap above a minute");
    assert!(message.starts_with("Update in 9 minutes"));

    cancel.cancel();
    task.await.unwrap();
    board.finish(&session);
    assert!(board.late_join_message().is_none());
}
