use anyhow::Result;
use async_trait::async_trait;
use open_music_tg::{
    audio::{
        ChatId, PlaybackEvent, PlaybackScheduler, PlaybackSink, PlaybackStatus, PlaybackToken,
        SchedulerSettings, SessionRegistry, Track, UserId,
    },
    error::PlayerError,
};
use parking_lot::Mutex;
use pretty_assertions::assert_eq;
use std::{collections::HashMap, sync::Arc, time::Duration};
use tokio::sync::{broadcast, mpsc, oneshot};

/// Sink whose playbacks stay open until the test finishes them.
struct ScriptedSink {
    pending: Mutex<HashMap<PlaybackToken, oneshot::Sender<Result<(), String>>>>,
    plays: mpsc::UnboundedSender<(ChatId, String, PlaybackToken)>,
}

impl ScriptedSink {
    fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<(ChatId, String, PlaybackToken)>) {
        let (plays, rx) = mpsc::unbounded_channel();
        let sink = Arc::new(Self {
            pending: Mutex::new(HashMap::new()),
            plays,
        });
        (sink, rx)
    }

    fn finish(&self, token: PlaybackToken, result: Result<(), String>) {
        if let Some(tx) = self.pending.lock().remove(&token) {
            let _ = tx.send(result);
        }
    }
}

#[async_trait]
impl PlaybackSink for ScriptedSink {
    async fn play(&self, chat_id: ChatId, track: Track, token: PlaybackToken) -> Result<()> {
        let (tx, rx) = oneshot::channel();
        self.pending.lock().insert(token, tx);
        let _ = self.plays.send((chat_id, track.title().to_string(), token));

        match rx.await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(reason)) => anyhow::bail!(reason),
            Err(_) => anyhow::bail!("dropped"),
        }
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}

fn track(title: &str) -> Track {
    Track::new(title, format!("https://cdn.example.com/{title}.mp3"), UserId(9))
}

fn scheduler(sink: Arc<ScriptedSink>, max_queue: usize) -> PlaybackScheduler {
    PlaybackScheduler::new(
        Arc::new(SessionRegistry::new(max_queue)),
        sink,
        SchedulerSettings {
            max_track_secs: 0,
            playback_timeout: None,
        },
    )
}

async fn next_play(
    rx: &mut mpsc::UnboundedReceiver<(ChatId, String, PlaybackToken)>,
) -> (ChatId, String, PlaybackToken) {
    tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("sink was never called")
        .expect("sink channel closed")
}

async fn next_event(rx: &mut broadcast::Receiver<PlaybackEvent>) -> PlaybackEvent {
    tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("no event")
        .expect("event channel closed")
}

fn queued(scheduler: &PlaybackScheduler, chat: ChatId) -> Vec<String> {
    scheduler
        .queue_snapshot(chat, 10)
        .iter()
        .map(|t| t.title().to_string())
        .collect()
}

#[tokio::test]
async fn chats_play_independently() {
    let (sink, mut plays) = ScriptedSink::new();
    let scheduler = scheduler(sink.clone(), 10);
    let (one, two) = (ChatId(1), ChatId(2));

    scheduler.enqueue_track(one, track("a1")).unwrap();
    scheduler.enqueue_track(two, track("b1")).unwrap();
    scheduler.enqueue_track(one, track("a2")).unwrap();

    let mut started = HashMap::new();
    for _ in 0..2 {
        let (chat, title, token) = next_play(&mut plays).await;
        started.insert(chat, (title, token));
    }
    assert_eq!(started[&one].0, "a1");
    assert_eq!(started[&two].0, "b1");

    // Stopping one chat leaves the other untouched.
    scheduler.stop(one).await.unwrap();
    assert_eq!(scheduler.status(one), PlaybackStatus::Idle);
    assert_eq!(scheduler.status(two), PlaybackStatus::Playing);
    assert_eq!(scheduler.now_playing(two).unwrap().title(), "b1");

    sink.finish(started[&two].1, Ok(()));
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(scheduler.status(two), PlaybackStatus::Idle);
    assert!(scheduler.now_playing(two).is_none());
}

#[tokio::test]
async fn bounded_queue_rejects_without_mutating() {
    let (sink, mut plays) = ScriptedSink::new();
    let scheduler = scheduler(sink, 1);
    let chat = ChatId(7);

    assert_eq!(scheduler.enqueue_track(chat, track("A")).unwrap(), 0);
    next_play(&mut plays).await;
    assert_eq!(scheduler.enqueue_track(chat, track("B")).unwrap(), 1);

    let err = scheduler.enqueue_track(chat, track("C")).unwrap_err();
    assert_eq!(err, PlayerError::QueueFull { max: 1 });
    assert_eq!(queued(&scheduler, chat), vec!["B"]);
}

#[tokio::test]
async fn late_failure_after_stop_is_swallowed() {
    let (sink, mut plays) = ScriptedSink::new();
    let scheduler = scheduler(sink.clone(), 10);
    let mut events = scheduler.subscribe();
    let chat = ChatId(3);

    scheduler.enqueue_track(chat, track("A")).unwrap();
    scheduler.enqueue_track(chat, track("B")).unwrap();
    let (_, _, token) = next_play(&mut plays).await;
    assert!(matches!(next_event(&mut events).await, PlaybackEvent::Started { .. }));

    scheduler.stop(chat).await.unwrap();
    sink.finish(token, Err("connection reset".into()));

    match next_event(&mut events).await {
        PlaybackEvent::Discarded { token: discarded, .. } => assert_eq!(discarded, token),
        other => panic!("unexpected event: {other:?}"),
    }
    assert_eq!(scheduler.status(chat), PlaybackStatus::Idle);
    assert!(scheduler.now_playing(chat).is_none());
    assert!(queued(&scheduler, chat).is_empty());
}

#[tokio::test]
async fn control_ops_on_unknown_chat() {
    let (sink, _plays) = ScriptedSink::new();
    let scheduler = scheduler(sink, 10);
    let chat = ChatId(404);

    assert_eq!(scheduler.pause(chat).await, Err(PlayerError::NoActiveSession));
    assert_eq!(scheduler.resume(chat).await, Err(PlayerError::NoActiveSession));
    assert_eq!(scheduler.skip(chat).await.unwrap_err(), PlayerError::NoActiveSession);
    assert_eq!(scheduler.stop(chat).await, Ok(()));
    assert!(scheduler.queue_snapshot(chat, 5).is_empty());
    assert_eq!(scheduler.registry().len(), 0);
}
