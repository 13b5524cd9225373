mod common;

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::time::{sleep, timeout};

use common::Backend;
use nosmoke_core::camera::StaticCamera;
use nosmoke_core::stream::{StreamConfig, StreamError};
use nosmoke_core::{DetectionController, LiveStatus, StreamEvent, StreamPhase};

const WAIT: Duration = Duration::from_secs(5);

fn controller(origin: &str) -> (DetectionController, nosmoke_core::DomainStore) {
    let store = common::store(origin);
    let ws = origin.replacen("http://", "ws://", 1) + "/ws/detect";
    let ctl = DetectionController::new(
        StreamConfig {
            url: ws,
            frame_interval: Duration::from_millis(20),
            connect_timeout: WAIT,
        },
        store.clone(),
    );
    (ctl, store)
}

fn camera() -> Box<StaticCamera> {
    Box::new(StaticCamera::new(vec![common::png_frame()]))
}

fn violation() -> serde_json::Value {
    json!({
        "detections": [
            {"class": "person", "bbox": [2, 2, 20, 22], "confidence": 0.95},
            {"class": "cigarette", "bbox": [10, 12, 14, 14], "confidence": 0.88}
        ],
        "recognized_students": [
            {"name": "Ayesha Khan", "roll_no": "CS001", "department": "Computer Science", "confidence": 0.9}
        ],
        "screenshot_saved": true,
        "screenshot_path": "screenshots/violation_1.jpg",
        "detection_type": "smoking"
    })
}

#[tokio::test]
async fn late_message_after_stop_changes_nothing() {
    let backend = Backend::new();
    backend.reply_with(json!({
        "detections": [{"class": "person", "bbox": [0, 0, 10, 10], "confidence": 0.7}]
    }));
    let (ctl, _store) = controller(&backend.spawn().await);

    let ticket = ctl.start(camera()).await.unwrap();
    assert_eq!(ctl.phase(), StreamPhase::Streaming);

    let mut status = ctl.subscribe();
    let seen = timeout(WAIT, status.wait_for(|s| s.messages_received >= 1))
        .await
        .expect("no reply from detect socket")
        .unwrap()
        .clone();
    assert!(seen.face_detected);
    assert!(!seen.smoking_detected);
    assert_eq!(seen.confidence, 70);
    assert_eq!(seen.frame_size, Some((32, 24)));
    assert!(seen.frames_sent >= 1);

    ctl.stop().await;
    assert_eq!(ctl.status(), LiveStatus::default());

    let late = violation().to_string();
    assert!(!ctl.deliver(ticket, &late));
    assert_eq!(ctl.status(), LiveStatus::default());
}

#[tokio::test]
async fn violation_is_logged_and_alerted() {
    let backend = Backend::new();
    backend.reply_with(violation());
    let (ctl, store) = controller(&backend.spawn().await);
    let mut events = ctl.events();

    ctl.start(camera()).await.unwrap();
    assert!(matches!(
        timeout(WAIT, events.recv()).await.unwrap().unwrap(),
        StreamEvent::Started { .. }
    ));
    match timeout(WAIT, events.recv()).await.unwrap().unwrap() {
        StreamEvent::Violation { names, confidence } => {
            assert_eq!(names, ["Ayesha Khan"]);
            assert_eq!(confidence, 88);
        }
        other => panic!("expected a violation, got {other:?}"),
    }

    let mut state = store.subscribe();
    let logged = timeout(WAIT, state.wait_for(|s| !s.detections.is_empty()))
        .await
        .expect("violation was not logged")
        .unwrap()
        .detections[0]
        .clone();
    assert_eq!(logged.roll_no.as_deref(), Some("CS001"));
    assert!(logged.smoking_detected);
    assert_eq!(logged.action_taken.as_deref(), Some("Alert sent"));
    assert_eq!(logged.screenshot_path.as_deref(), Some("screenshots/violation_1.jpg"));

    let live = ctl.status();
    assert!(live.smoking_detected);
    assert_eq!(live.overlay.boxes.len(), 2);
    assert_eq!(live.screenshot.as_deref(), Some("screenshots/violation_1.jpg"));

    ctl.stop().await;
}

#[tokio::test]
async fn alerts_off_still_logs_without_alerting() {
    let backend = Backend::new();
    backend.reply_with(violation());
    let (ctl, store) = controller(&backend.spawn().await);
    ctl.set_alerts_enabled(false);
    let mut events = ctl.events();

    ctl.start(camera()).await.unwrap();
    let mut state = store.subscribe();
    let logged = timeout(WAIT, state.wait_for(|s| !s.detections.is_empty()))
        .await
        .unwrap()
        .unwrap()
        .detections[0]
        .clone();
    assert_eq!(logged.action_taken.as_deref(), Some("No action"));
    ctl.stop().await;

    while let Ok(event) = events.try_recv() {
        assert!(!matches!(event, StreamEvent::Violation { .. }));
    }
}

#[tokio::test]
async fn second_start_is_rejected_while_streaming() {
    let backend = Backend::new();
    let (ctl, _store) = controller(&backend.spawn().await);

    ctl.start(camera()).await.unwrap();
    assert!(matches!(
        ctl.start(camera()).await,
        Err(StreamError::AlreadyStreaming)
    ));
    ctl.stop().await;
    assert_eq!(ctl.phase(), StreamPhase::Idle);

    // A stopped controller can stream again.
    ctl.start(camera()).await.unwrap();
    ctl.stop().await;
}

/// A listener that accepts TCP but never answers the WebSocket upgrade.
/// Resolves the receiver once the client has connected.
async fn silent_server() -> (String, oneshot::Receiver<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (accepted_tx, accepted_rx) = oneshot::channel();
    tokio::spawn(async move {
        let (socket, _) = listener.accept().await.unwrap();
        let _ = accepted_tx.send(());
        sleep(Duration::from_secs(60)).await;
        drop(socket);
    });
    (format!("ws://{addr}/ws/detect"), accepted_rx)
}

fn silent_controller(url: String, connect_timeout: Duration) -> DetectionController {
    DetectionController::new(
        StreamConfig {
            url,
            frame_interval: Duration::from_millis(20),
            connect_timeout,
        },
        common::store("http://127.0.0.1:9"),
    )
}

#[tokio::test]
async fn stop_cancels_a_start_stuck_in_the_handshake() {
    let (url, accepted) = silent_server().await;
    let ctl = Arc::new(silent_controller(url, Duration::from_secs(60)));
    let mut events = ctl.events();

    let starting = tokio::spawn({
        let ctl = ctl.clone();
        async move { ctl.start(camera()).await }
    });
    timeout(WAIT, accepted).await.unwrap().unwrap();
    assert_eq!(ctl.phase(), StreamPhase::Starting);

    timeout(Duration::from_secs(3), ctl.stop())
        .await
        .expect("stop waited on the pending start");
    let started = timeout(WAIT, starting).await.expect("start never returned").unwrap();
    assert!(matches!(started, Err(StreamError::Cancelled)));
    assert_eq!(ctl.status(), LiveStatus::default());

    assert_eq!(events.try_recv().unwrap(), StreamEvent::Stopped);
    assert!(events.try_recv().is_err());

    // The slot is free again.
    let err = ctl.start(Box::new(StaticCamera::unavailable("unplugged"))).await.unwrap_err();
    assert!(matches!(err, StreamError::Camera(_)));
}

#[tokio::test]
async fn handshake_that_never_completes_times_out() {
    let (url, _accepted) = silent_server().await;
    let ctl = silent_controller(url, Duration::from_millis(200));
    let mut events = ctl.events();

    let err = timeout(WAIT, ctl.start(camera()))
        .await
        .expect("connect timeout not applied")
        .unwrap_err();
    assert!(matches!(err, StreamError::Connection(_)));
    assert_eq!(ctl.phase(), StreamPhase::Idle);
    match events.try_recv().unwrap() {
        StreamEvent::Warning(message) => {
            assert!(message.starts_with("Could not connect to detection server"), "{message}");
        }
        other => panic!("expected a warning, got {other:?}"),
    }
}

#[tokio::test]
async fn dropping_the_controller_closes_the_socket() {
    let backend = Backend::new();
    let (ctl, _store) = controller(&backend.clone().spawn().await);

    ctl.start(camera()).await.unwrap();
    let mut status = ctl.subscribe();
    timeout(WAIT, status.wait_for(|s| s.messages_received >= 1))
        .await
        .expect("no reply from detect socket")
        .unwrap();
    assert_eq!(backend.sockets_closed(), 0);

    drop(ctl);
    timeout(WAIT, async {
        while backend.sockets_closed() == 0 {
            sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("detect socket stayed open after the controller was dropped");
}

#[tokio::test]
async fn server_hangup_warns_and_returns_to_idle() {
    let backend = Backend::new().closing_after_first_reply();
    let (ctl, _store) = controller(&backend.spawn().await);
    let mut events = ctl.events();

    ctl.start(camera()).await.unwrap();
    let mut seen = Vec::new();
    while seen.last() != Some(&StreamEvent::Stopped) {
        seen.push(timeout(WAIT, events.recv()).await.expect("stream never ended").unwrap());
    }
    assert!(
        matches!(
            seen.as_slice(),
            [StreamEvent::Started { .. }, StreamEvent::Warning(message), StreamEvent::Stopped]
                if message == "Detection server closed the connection"
        ),
        "{seen:?}"
    );
    assert_eq!(ctl.status(), LiveStatus::default());

    // Already stopped: a later stop announces nothing.
    ctl.stop().await;
    assert!(events.try_recv().is_err());
    assert_eq!(ctl.phase(), StreamPhase::Idle);
}
