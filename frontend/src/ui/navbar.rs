use dioxus::prelude::*;

use crate::app::{use_services, use_session, Route};

fn links() -> [(&'static str, Route); 6] {
    [
        ("Home", Route::Home {}),
        ("Live Detection", Route::LiveDetection {}),
        ("Database", Route::Database {}),
        ("History", Route::History {}),
        ("Admin", Route::Admin {}),
        ("About", Route::About {}),
    ]
}

#[component]
pub fn Navbar() -> Element {
    let session = use_session();
    let services = use_services();
    let current = use_route::<Route>();
    let nav = use_navigator();
    let mut menu_open = use_signal(|| false);

    let user_name = session().user.map(|u| u.display_name().to_string());

    rsx! {
        nav { class: "navbar",
            div { class: "navbar-brand",
                span { class: "brand-mark", "\u{1F6AD}" }
                span { class: "brand-name", "NoSmoke" }
            }
            button {
                class: "navbar-toggle",
                onclick: move |_| menu_open.toggle(),
                if menu_open() { "\u{2715}" } else { "\u{2630}" }
            }
            div { class: if menu_open() { "navbar-links open" } else { "navbar-links" },
                for (label, target) in links() {
                    {
                        let active = target == current;
                        rsx! {
                            Link {
                                key: "{label}",
                                to: target,
                                class: if active { "nav-link active" } else { "nav-link" },
                                onclick: move |_| menu_open.set(false),
                                "{label}"
                            }
                        }
                    }
                }
            }
            div { class: "navbar-user",
                if let Some(name) = user_name {
                    span { class: "user-chip", "{name}" }
                    button {
                        class: "btn-ghost",
                        onclick: move |_| {
                            services.session.sign_out();
                            nav.push(Route::Admin {});
                        },
                        "Logout"
                    }
                } else {
                    Link { to: Route::Admin {}, class: "btn-primary", "Login" }
                }
            }
        }
    }
}
