use dioxus::prelude::*;

use crate::app::{use_domain, use_services, Route};
use crate::ui::stat_card::StatCard;

const FEATURES: [(&str, &str, &str); 3] = [
    (
        "\u{1F4F7}",
        "Real-time Detection",
        "Camera frames are analysed continuously and cigarettes are boxed the moment they appear.",
    ),
    (
        "\u{1F9D1}",
        "Face Recognition",
        "Violations are matched against the student roster so every record names the person involved.",
    ),
    (
        "\u{1F4CB}",
        "Evidence Logging",
        "Each violation is stored with a screenshot, confidence score and the action taken.",
    ),
];

#[component]
pub fn Home() -> Element {
    let services = use_services();
    let domain = use_domain();

    // Counters are derived; recompute once so "last updated" is fresh.
    use_hook(move || {
        services.domain.refresh_stats();
    });

    let stats = domain().stats;
    let updated = stats.last_updated.with_timezone(&chrono::Local).format("%H:%M:%S").to_string();

    rsx! {
        section { class: "hero",
            h1 { "AI-Powered Smoking Detection" }
            p { class: "hero-sub",
                "Keep campus spaces smoke-free with live camera monitoring, automatic identification and a complete violation history."
            }
            div { class: "hero-actions",
                Link { to: Route::LiveDetection {}, class: "btn-primary", "Start Detection" }
                Link { to: Route::History {}, class: "btn-secondary", "View Logs" }
            }
        }

        section { class: "stat-grid",
            StatCard {
                title: "Total Detections",
                value: stats.total_detections.to_string(),
                icon: "\u{1F6A8}",
                accent: "accent-red",
            }
            StatCard {
                title: "Faces Identified",
                value: stats.faces_identified.to_string(),
                icon: "\u{1F9D1}",
                accent: "accent-blue",
            }
            StatCard {
                title: "Active Cameras",
                value: stats.active_cameras.to_string(),
                icon: "\u{1F4F9}",
                accent: "accent-green",
            }
            StatCard {
                title: "Uptime",
                value: stats.uptime.clone(),
                icon: "\u{23F1}",
                accent: "accent-amber",
            }
        }
        p { class: "muted small", "Updated {updated}" }

        section { class: "feature-grid",
            for (icon, title, body) in FEATURES {
                div { key: "{title}", class: "card feature-card",
                    div { class: "feature-icon", "{icon}" }
                    h3 { "{title}" }
                    p { "{body}" }
                }
            }
        }
    }
}
