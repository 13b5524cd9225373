use dioxus::prelude::*;
use std::time::{Duration, Instant};

/// At most this many toasts are on screen; older ones are dropped first.
const MAX_VISIBLE: usize = 5;

// ─── NotificationService Store ────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NotificationLevel {
    Success,
    Info,
    Warning,
    Error,
    /// A smoking violation raised by live detection.
    Violation,
}

impl NotificationLevel {
    fn ttl(self) -> Duration {
        match self {
            NotificationLevel::Violation => Duration::from_secs(10),
            NotificationLevel::Error => Duration::from_secs(8),
            _ => Duration::from_secs(4),
        }
    }

    fn class(self) -> &'static str {
        match self {
            NotificationLevel::Success => "notif-success",
            NotificationLevel::Info => "notif-info",
            NotificationLevel::Warning => "notif-warning",
            NotificationLevel::Error => "notif-error",
            NotificationLevel::Violation => "notif-error notif-violation",
        }
    }

    fn icon(self) -> &'static str {
        match self {
            NotificationLevel::Success => "\u{2714}",
            NotificationLevel::Info => "\u{2139}",
            NotificationLevel::Warning => "\u{26A0}",
            NotificationLevel::Error => "\u{2716}",
            NotificationLevel::Violation => "\u{1F6AD}",
        }
    }
}

#[derive(Store, Debug, Clone, PartialEq)]
pub struct Notification {
    pub id: u32,
    pub message: String,
    pub level: NotificationLevel,
    pub created_at: Instant,
    pub dismissed: bool,
}

impl Notification {
    pub fn is_expired(&self) -> bool {
        self.dismissed || self.created_at.elapsed() >= self.level.ttl()
    }
}

#[derive(Store, Clone, PartialEq)]
pub struct NotificationService {
    pub notifications: Vec<Notification>,
    pub next_id: u32,
}

impl NotificationService {
    pub fn new() -> Self {
        Self {
            notifications: Vec::new(),
            next_id: 0,
        }
    }
}

#[store(pub)]
impl Store<NotificationService> {
    fn add(&mut self, message: String, level: NotificationLevel) {
        let id = self.next_id().cloned();
        self.next_id().set(id + 1);
        self.notifications().push(Notification {
            id,
            message,
            level,
            created_at: Instant::now(),
            dismissed: false,
        });
    }

    fn success(&mut self, message: String) {
        self.add(message, NotificationLevel::Success);
    }

    fn info(&mut self, message: String) {
        self.add(message, NotificationLevel::Info);
    }

    fn warn(&mut self, message: String) {
        self.add(message, NotificationLevel::Warning);
    }

    fn error(&mut self, message: String) {
        self.add(message, NotificationLevel::Error);
    }

    fn violation(&mut self, names: &[String], confidence: u8) {
        let who = if names.is_empty() {
            "Unknown Person".to_string()
        } else {
            names.join(", ")
        };
        self.add(
            format!("Smoking detected: {who} ({confidence}%)"),
            NotificationLevel::Violation,
        );
    }

    fn dismiss(&mut self, id: u32) {
        let notifs = self.notifications();
        let snapshot = notifs.read();
        if let Some(idx) = snapshot.iter().position(|n| n.id == id) {
            drop(snapshot);
            notifs.index(idx).dismissed().set(true);
        }
    }

    fn cleanup(&mut self) {
        self.notifications().retain(|n| !n.is_expired());
    }
}

// ─── NotificationLayer Component ──────────────────────────────

#[component]
pub fn NotificationLayer(mut notifs: Store<NotificationService>) -> Element {
    use_hook(move || {
        spawn(async move {
            loop {
                tokio::time::sleep(Duration::from_secs(1)).await;
                notifs.cleanup();
            }
        })
    });

    let mut active: Vec<Notification> = notifs
        .notifications()
        .cloned()
        .into_iter()
        .filter(|n| !n.is_expired())
        .collect();
    if active.len() > MAX_VISIBLE {
        active.drain(..active.len() - MAX_VISIBLE);
    }

    if active.is_empty() {
        return rsx! {};
    }

    rsx! {
        div { class: "notification-stack",
            for notif in active.iter().rev() {
                {
                    let id = notif.id;
                    let level_class = notif.level.class();
                    let icon = notif.level.icon();
                    let msg = notif.message.clone();

                    rsx! {
                        div {
                            key: "{id}",
                            class: "notification-toast {level_class}",
                            onclick: move |_| notifs.dismiss(id),

                            span { class: "notif-icon", "{icon}" }
                            span { class: "notif-message", "{msg}" }
                            button {
                                class: "notif-close",
                                onclick: move |e: MouseEvent| {
                                    e.stop_propagation();
                                    notifs.dismiss(id);
                                },
                                "\u{2715}"
                            }
                        }
                    }
                }
            }
        }
    }
}
