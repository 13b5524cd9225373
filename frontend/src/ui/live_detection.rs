use std::rc::Rc;
use std::time::Duration;

use chrono::Local;
use dioxus::prelude::*;
use nosmoke_core::camera::{DirectoryCamera, FrameSource, SnapshotCamera};
use nosmoke_core::stream::StreamConfig;
use nosmoke_core::{Config, DetectionController, StreamEvent, StreamPhase};
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};

use crate::app::{use_services, use_watch};
use crate::ui::detection_overlay::DetectionOverlay;
use crate::ui::notification::{NotificationService, NotificationServiceStoreImplExt};

/// Configured camera, or a folder of frames chosen by the operator.
async fn choose_camera(config: &Config) -> Option<Box<dyn FrameSource>> {
    if let Some(url) = &config.camera.snapshot_url {
        return Some(Box::new(
            SnapshotCamera::new(url.clone()).with_timeout(config.request_timeout()),
        ));
    }
    if let Some(dir) = &config.camera.directory {
        return Some(Box::new(DirectoryCamera::new(dir.clone())));
    }
    let picked = rfd::AsyncFileDialog::new()
        .set_title("Choose a folder of camera frames")
        .pick_folder()
        .await?;
    Some(Box::new(DirectoryCamera::new(picked.path().to_path_buf())))
}

#[component]
pub fn LiveDetection() -> Element {
    let services = use_services();
    let mut notifs = use_context::<Store<NotificationService>>();

    // Dropping the controller on unmount stops the session.
    let controller = use_hook(|| {
        let controller = DetectionController::new(
            StreamConfig::from_config(&services.config),
            services.domain.clone(),
        );
        controller.set_alerts_enabled(services.config.alerts_enabled);
        Rc::new(controller)
    });
    let status_source = controller.clone();
    let status = use_watch(move || status_source.subscribe());
    let mut alerts = use_signal(|| services.config.alerts_enabled);
    let mut clock = use_signal(Local::now);

    let events_source = controller.clone();
    use_hook(move || {
        let mut rx = events_source.events();
        spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(StreamEvent::Violation { names, confidence }) => {
                        notifs.violation(&names, confidence);
                    }
                    Ok(StreamEvent::Warning(message)) => notifs.warn(message),
                    Ok(StreamEvent::Started { source }) => {
                        notifs.info(format!("Detection started on {source}"));
                    }
                    Ok(StreamEvent::Stopped) => {}
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "dropped stream events");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        })
    });

    use_hook(move || {
        spawn(async move {
            loop {
                tokio::time::sleep(Duration::from_secs(1)).await;
                clock.set(Local::now());
            }
        })
    });

    let start_controller = controller.clone();
    let config = services.config.clone();
    let start = move |_| {
        let controller = start_controller.clone();
        let config = config.clone();
        spawn(async move {
            let Some(camera) = choose_camera(&config).await else {
                info!("no camera chosen");
                return;
            };
            // Failures are surfaced through the Warning event.
            if let Err(e) = controller.start(camera).await {
                warn!(error = %e, "live detection did not start");
            }
        });
    };

    let stop_controller = controller.clone();
    let stop = move |_| {
        let controller = stop_controller.clone();
        spawn(async move {
            controller.stop().await;
        });
    };

    let toggle_controller = controller.clone();
    let toggle_alerts = move |_| {
        let next = !alerts();
        alerts.set(next);
        toggle_controller.set_alerts_enabled(next);
    };

    let live = status();
    let phase_label = match live.phase {
        StreamPhase::Idle => "Idle",
        StreamPhase::Starting => "Connecting...",
        StreamPhase::Streaming => "Live",
        StreamPhase::Stopping => "Stopping...",
    };
    let streaming = live.phase == StreamPhase::Streaming;
    let busy = matches!(live.phase, StreamPhase::Starting | StreamPhase::Stopping);
    let stopping = live.phase == StreamPhase::Stopping;
    let (frame_width, frame_height) = live.frame_size.unwrap_or((0, 0));
    let now = clock().format("%H:%M:%S").to_string();
    let (smoking_class, smoking_text) = if live.smoking_detected {
        ("indicator indicator-red", "Smoking detected")
    } else {
        ("indicator indicator-green", "No smoking")
    };
    let face_text = if live.face_detected { "Yes" } else { "No" };
    let confidence = live.confidence;
    let frames_sent = live.frames_sent;
    let messages = live.messages_received;
    let detection_type = live.detection_type.clone().unwrap_or_else(|| "-".into());
    let recognition = match live.face_recognition_enabled {
        Some(true) => "On",
        Some(false) => "Off",
        None => "-",
    };
    let alerts_label = if alerts() { "Alerts on" } else { "Alerts off" };

    rsx! {
        div { class: "page-header",
            div {
                h1 { "Live Detection" }
                p { class: "muted", "Stream camera frames to the detector and log violations as they happen." }
            }
            div { class: "header-actions",
                span { class: "clock", "{now}" }
                button {
                    class: if alerts() { "btn-secondary active" } else { "btn-secondary" },
                    onclick: toggle_alerts,
                    "{alerts_label}"
                }
                if streaming || busy {
                    button { class: "btn-danger", disabled: stopping, onclick: stop, "Stop Detection" }
                } else {
                    button { class: "btn-primary", onclick: start, "Start Detection" }
                }
            }
        }

        div { class: "live-grid",
            div { class: "card video-card",
                div { class: "video-header",
                    span { class: if streaming { "live-dot on" } else { "live-dot" } }
                    span { "{phase_label}" }
                }
                div { class: "video-frame",
                    if let Some(src) = live.frame.clone() {
                        img { src: "{src}", alt: "camera frame" }
                        DetectionOverlay {
                            overlay: live.overlay.clone(),
                            frame_width,
                            frame_height,
                        }
                    } else {
                        div { class: "video-placeholder",
                            if busy { "Connecting to camera..." } else { "Camera is off" }
                        }
                    }
                }
            }

            div { class: "side-panel",
                div { class: "card",
                    h3 { "Status" }
                    div { class: "{smoking_class}", "{smoking_text}" }
                    div { class: "status-row",
                        span { class: "muted", "Face detected" }
                        span { "{face_text}" }
                    }
                    div { class: "status-row",
                        span { class: "muted", "Confidence" }
                        span { "{confidence}%" }
                    }
                    div { class: "confidence-bar",
                        div { class: "confidence-fill", style: "width: {confidence}%;" }
                    }
                    div { class: "status-row",
                        span { class: "muted", "Detection type" }
                        span { "{detection_type}" }
                    }
                    div { class: "status-row",
                        span { class: "muted", "Face recognition" }
                        span { "{recognition}" }
                    }
                    div { class: "status-row",
                        span { class: "muted", "Frames / replies" }
                        span { "{frames_sent} / {messages}" }
                    }
                }

                div { class: "card",
                    h3 { "Identified" }
                    if live.identified.is_empty() {
                        p { class: "muted", "No one identified." }
                    }
                    for (idx, student) in live.identified.iter().enumerate() {
                        {
                            let roll_no = student.roll_no.clone().unwrap_or_else(|| "N/A".into());
                            let department = student.department.clone().unwrap_or_default();
                            let initial = student.name.chars().next().unwrap_or('?');
                            rsx! {
                                div { key: "{idx}", class: "person-card",
                                    div { class: "avatar", "{initial}" }
                                    div {
                                        div { class: "strong", "{student.name}" }
                                        div { class: "muted small", "{roll_no} \u{2022} {department}" }
                                    }
                                }
                            }
                        }
                    }
                }
            }
        }
    }
}
