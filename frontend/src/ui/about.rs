use dioxus::prelude::*;

const FEATURES: [&str; 6] = [
    "Real-time cigarette detection on live camera frames",
    "Face recognition against the registered student roster",
    "Automatic evidence screenshots for every violation",
    "Searchable, filterable violation history with CSV export",
    "Student database management",
    "Instant on-screen alerts",
];

const TECHNOLOGIES: [(&str, &str); 4] = [
    ("Object detection", "YOLO-based cigarette and person detector"),
    ("Face recognition", "Embedding match against enrolled students"),
    ("Dashboard", "Rust desktop app built with Dioxus"),
    ("Transport", "HTTP for records, WebSocket for live frames"),
];

const TEAM: [(&str, &str); 3] = [
    ("Project Lead", "Coordinates the detection pipeline and deployment."),
    ("ML Engineer", "Trains and evaluates the detection and recognition models."),
    ("Frontend Engineer", "Builds the operator dashboard."),
];

#[component]
pub fn About() -> Element {
    rsx! {
        section { class: "hero",
            h1 { "About NoSmoke" }
            p { class: "hero-sub",
                "Our vision is smoke-free campuses where rules are enforced fairly and consistently, without staff having to watch every corner."
            }
        }

        div { class: "about-grid",
            div { class: "card",
                h3 { "Key Features" }
                ul { class: "check-list",
                    for feature in FEATURES {
                        li { key: "{feature}", "{feature}" }
                    }
                }
            }
            div { class: "card",
                h3 { "Technologies" }
                for (name, detail) in TECHNOLOGIES {
                    div { key: "{name}", class: "tech-row",
                        span { class: "tech-name", "{name}" }
                        span { class: "muted", "{detail}" }
                    }
                }
            }
        }

        div { class: "card",
            h3 { "Team" }
            div { class: "team-grid",
                for (role, blurb) in TEAM {
                    {
                        let initial = role.chars().next().unwrap_or('?');
                        rsx! {
                            div { key: "{role}", class: "team-member",
                                div { class: "avatar", "{initial}" }
                                div { class: "team-role", "{role}" }
                                p { class: "muted small", "{blurb}" }
                            }
                        }
                    }
                }
            }
        }
    }
}
