use dioxus::prelude::*;
use nosmoke_core::models::NewStudent;

/// Add/edit modal. The parent owns the form state and does the saving.
#[component]
pub fn StudentForm(
    mut form: Signal<NewStudent>,
    editing: bool,
    saving: bool,
    error: Option<String>,
    on_submit: EventHandler,
    on_cancel: EventHandler,
) -> Element {
    let title = if editing { "Edit Student" } else { "Add New Student" };
    let submit_label = match (saving, editing) {
        (true, _) => "Saving...",
        (false, true) => "Save Changes",
        (false, false) => "Add Student",
    };
    let current = form();

    rsx! {
        div { class: "modal-backdrop", onclick: move |_| on_cancel.call(()),
            div {
                class: "modal",
                onclick: move |e: MouseEvent| e.stop_propagation(),
                h2 { "{title}" }

                FormRow {
                    label: "Full Name *",
                    value: current.name.clone(),
                    placeholder: "e.g. Ayesha Khan",
                    oninput: move |v: String| form.write().name = v,
                }
                FormRow {
                    label: "Roll Number *",
                    value: current.roll_no.clone(),
                    placeholder: "e.g. CS-2021-001",
                    oninput: move |v: String| form.write().roll_no = v,
                }
                FormRow {
                    label: "Department *",
                    value: current.department.clone(),
                    placeholder: "e.g. Computer Science",
                    oninput: move |v: String| form.write().department = v,
                }
                FormRow {
                    label: "Email",
                    value: current.email.clone().unwrap_or_default(),
                    placeholder: "student@university.edu",
                    oninput: move |v: String| form.write().email = Some(v),
                }
                FormRow {
                    label: "Phone",
                    value: current.phone.clone().unwrap_or_default(),
                    placeholder: "+92 300 1234567",
                    oninput: move |v: String| form.write().phone = Some(v),
                }
                FormRow {
                    label: "Photo URL",
                    value: current.image.clone().unwrap_or_default(),
                    placeholder: "https://...",
                    oninput: move |v: String| form.write().image = Some(v),
                }

                if let Some(err) = error {
                    div { class: "form-error", "{err}" }
                }

                div { class: "form-actions",
                    button {
                        class: "btn-ghost",
                        disabled: saving,
                        onclick: move |_| on_cancel.call(()),
                        "Cancel"
                    }
                    button {
                        class: "btn-primary",
                        disabled: saving,
                        onclick: move |_| on_submit.call(()),
                        "{submit_label}"
                    }
                }
            }
        }
    }
}

#[component]
fn FormRow(label: String, value: String, placeholder: String, oninput: EventHandler<String>) -> Element {
    rsx! {
        div { class: "form-row",
            label { "{label}" }
            input {
                value: "{value}",
                placeholder: "{placeholder}",
                oninput: move |e| oninput.call(e.value()),
            }
        }
    }
}
