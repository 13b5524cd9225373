use dioxus::prelude::*;

#[component]
pub fn StatCard(title: String, value: String, icon: String, #[props(default)] accent: String) -> Element {
    rsx! {
        div { class: "stat-card {accent}",
            div { class: "stat-icon", "{icon}" }
            div { class: "stat-body",
                div { class: "stat-title", "{title}" }
                div { class: "stat-value", "{value}" }
            }
        }
    }
}
