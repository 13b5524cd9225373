use dioxus::prelude::*;
use tracing::info;

use crate::app::{use_domain, use_services, use_session, Route};
use crate::ui::notification::{NotificationService, NotificationServiceStoreImplExt};

#[component]
pub fn Admin() -> Element {
    let session = use_session();

    if session().is_signed_in() {
        rsx! { AdminDashboard {} }
    } else {
        rsx! { AuthForm {} }
    }
}

#[component]
fn AuthForm() -> Element {
    let services = use_services();
    let session = use_session();
    let nav = use_navigator();
    let mut notifs = use_context::<Store<NotificationService>>();

    let mut signing_up = use_signal(|| false);
    let mut email = use_signal(String::new);
    let mut password = use_signal(String::new);
    let mut name = use_signal(String::new);
    let mut show_password = use_signal(|| false);
    let mut error = use_signal(|| Option::<String>::None);

    let loading = session().loading;
    let (title, subtitle, submit_label, toggle_label) = if signing_up() {
        (
            "Create Admin Account",
            "Register as system administrator",
            "Create Account",
            "Already have an account? Sign in",
        )
    } else {
        (
            "Admin Login",
            "Access administrative controls",
            "Login",
            "Need an account? Sign up",
        )
    };
    let password_type = if show_password() { "text" } else { "password" };
    let eye_label = if show_password() { "Hide" } else { "Show" };

    let submit = move |e: FormEvent| {
        e.prevent_default();
        error.set(None);
        let session = services.session.clone();
        let (email, password, name, signing_up) = (email(), password(), name(), signing_up());
        spawn(async move {
            let result = if signing_up {
                session.sign_up(&email, &password, &name).await
            } else {
                session.sign_in(&email, &password).await
            };
            match result {
                Ok(user) => {
                    info!(email = %user.email, "operator signed in");
                    notifs.success(if signing_up {
                        "Account created successfully! Welcome to NoSmoke.".to_string()
                    } else {
                        "Successfully logged in as administrator".to_string()
                    });
                    nav.push(Route::Home {});
                }
                Err(e) => {
                    notifs.error(e.to_string());
                    error.set(Some(e.to_string()));
                }
            }
        });
    };

    rsx! {
        div { class: "auth-page",
            form { class: "card auth-card", onsubmit: submit,
                div { class: "auth-icon", "\u{1F6E1}" }
                h1 { "{title}" }
                p { class: "muted", "{subtitle}" }

                if signing_up() {
                    div { class: "form-row",
                        label { "Full Name" }
                        input {
                            value: "{name}",
                            placeholder: "Enter your full name",
                            oninput: move |e| name.set(e.value()),
                        }
                    }
                }
                div { class: "form-row",
                    label { "Email" }
                    input {
                        r#type: "email",
                        value: "{email}",
                        placeholder: "Enter your email",
                        oninput: move |e| email.set(e.value()),
                    }
                }
                div { class: "form-row",
                    label { "Password" }
                    div { class: "password-field",
                        input {
                            r#type: "{password_type}",
                            value: "{password}",
                            placeholder: "Enter password",
                            oninput: move |e| password.set(e.value()),
                        }
                        button {
                            r#type: "button",
                            class: "btn-ghost",
                            onclick: move |_| show_password.toggle(),
                            "{eye_label}"
                        }
                    }
                }

                if let Some(err) = error() {
                    div { class: "form-error", "{err}" }
                }

                button { r#type: "submit", class: "btn-primary wide", disabled: loading,
                    if loading { "Loading..." } else { "{submit_label}" }
                }
                button {
                    r#type: "button",
                    class: "btn-link",
                    onclick: move |_| {
                        signing_up.toggle();
                        error.set(None);
                    },
                    "{toggle_label}"
                }
            }
        }
    }
}

#[component]
fn AdminDashboard() -> Element {
    let services = use_services();
    let session = use_session();
    let domain = use_domain();
    let nav = use_navigator();
    let mut notifs = use_context::<Store<NotificationService>>();

    let Some(user) = session().user else {
        return rsx! {};
    };
    let stats = domain().stats;
    let registered = services.session.registered_user_count();
    let user_name = user.display_name().to_string();
    let role = user.role().to_string();
    let api_url = services.config.api_url.clone();

    let logout = move |_| {
        services.session.sign_out();
        notifs.success("Successfully logged out".to_string());
        nav.push(Route::Home {});
    };

    rsx! {
        div { class: "page-header",
            div {
                h1 { "Admin Dashboard" }
                p { class: "muted", "Administrative controls and system management" }
            }
        }

        div { class: "admin-grid",
            div { class: "card",
                h3 { "System Status" }
                div { class: "status-row",
                    span { class: "muted", "Backend" }
                    span { class: "small", "{api_url}" }
                }
                div { class: "status-row",
                    span { class: "muted", "Total Detections" }
                    span { class: "strong", "{stats.total_detections}" }
                }
                div { class: "status-row",
                    span { class: "muted", "Smoking Violations" }
                    span { class: "strong", "{stats.smoking_detections}" }
                }
                div { class: "status-row",
                    span { class: "muted", "Total Students" }
                    span { class: "strong", "{stats.total_students}" }
                }
                div { class: "status-row",
                    span { class: "muted", "Accounts on this device" }
                    span { class: "strong", "{registered}" }
                }
            }

            div { class: "card",
                h3 { "Account" }
                div { class: "person-card",
                    div { class: "avatar", "\u{1F6E1}" }
                    div {
                        div { class: "strong", "{user_name}" }
                        div { class: "muted small", "{user.email}" }
                        div { class: "badge badge-green", "{role}" }
                    }
                }
                button { class: "btn-danger wide", onclick: logout, "Logout" }
            }
        }
    }
}
