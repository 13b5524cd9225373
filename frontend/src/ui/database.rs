use dioxus::prelude::*;
use nosmoke_core::filter::filter_students;
use nosmoke_core::models::{NewStudent, StudentPatch};
use nosmoke_core::StoreError;

use crate::app::{use_domain, use_services};
use crate::ui::notification::{NotificationService, NotificationServiceStoreImplExt};
use crate::ui::student_form::StudentForm;

#[component]
pub fn Database() -> Element {
    let services = use_services();
    let domain = use_domain();
    let mut notifs = use_context::<Store<NotificationService>>();

    let mut search = use_signal(String::new);
    let mut modal_open = use_signal(|| false);
    // Roll number of the student being edited; None while adding.
    let mut editing = use_signal(|| Option::<String>::None);
    let mut form = use_signal(NewStudent::default);
    let mut saving = use_signal(|| false);
    let mut form_error = use_signal(|| Option::<String>::None);

    let state = domain();
    let students = filter_students(&state.students, &search());
    let total = state.students.len();
    let shown = students.len();

    let open_add = move |_| {
        form.set(NewStudent::default());
        editing.set(None);
        form_error.set(None);
        modal_open.set(true);
    };

    let close_modal = move |_| {
        if !saving() {
            modal_open.set(false);
        }
    };

    let store = services.domain.clone();
    let submit = move |_| {
        let draft = form();
        let missing = draft.missing_fields();
        if !missing.is_empty() {
            form_error.set(Some("Please fill in all required fields".into()));
            return;
        }
        form_error.set(None);
        saving.set(true);

        let store = store.clone();
        let target = editing();
        spawn(async move {
            let result = match &target {
                Some(roll_no) => match store.student(roll_no) {
                    Some(current) => {
                        let patch = StudentPatch::diff(&current, &draft.clone().normalized());
                        store.update_student(roll_no, patch).await.map(|_| ())
                    }
                    None => Err(StoreError::UnknownStudent(roll_no.clone())),
                },
                None => store.add_student(draft).await.map(|_| ()),
            };
            saving.set(false);

            match result {
                Ok(()) => {
                    modal_open.set(false);
                    notifs.success(if target.is_some() {
                        "Student information updated".to_string()
                    } else {
                        "Student added successfully".to_string()
                    });
                }
                Err(e) => form_error.set(Some(e.to_string())),
            }
        });
    };

    rsx! {
        div { class: "page-header",
            div {
                h1 { "Student Database" }
                p { class: "muted", "Manage the students enrolled for face recognition." }
            }
            button { class: "btn-primary", onclick: open_add, "+ Add Student" }
        }

        div { class: "card toolbar",
            input {
                class: "search",
                value: "{search}",
                placeholder: "Search by name, roll number or department...",
                oninput: move |e| search.set(e.value()),
            }
            span { class: "muted", "{shown} of {total} students" }
        }

        div { class: "card table-card",
            table { class: "data-table",
                thead {
                    tr {
                        th { "Photo" }
                        th { "Name" }
                        th { "Roll No" }
                        th { "Department" }
                        th { "Contact" }
                        th { "Status" }
                        th { "Actions" }
                    }
                }
                tbody {
                    if students.is_empty() {
                        tr {
                            td { colspan: "7", class: "empty",
                                if total == 0 { "No students registered yet." } else { "No students match your search." }
                            }
                        }
                    }
                    for student in students.iter() {
                        {
                            let roll_no = student.roll_no.clone();
                            let edit_roll = roll_no.clone();
                            let delete_roll = roll_no.clone();
                            let snapshot = NewStudent::from(student);
                            let store = services.domain.clone();
                            let status_class = if student.is_active() { "badge badge-green" } else { "badge badge-gray" };
                            let initial = student.name.chars().next().unwrap_or('?');
                            let email = student.email.clone().unwrap_or_else(|| "-".into());
                            let phone = student.phone.clone().unwrap_or_default();

                            rsx! {
                                tr { key: "{roll_no}",
                                    td {
                                        if let Some(src) = student.image.clone() {
                                            img { class: "avatar-img", src: "{src}", alt: "{student.name}" }
                                        } else {
                                            div { class: "avatar", "{initial}" }
                                        }
                                    }
                                    td { class: "strong", "{student.name}" }
                                    td { code { "{roll_no}" } }
                                    td { "{student.department}" }
                                    td {
                                        div { "{email}" }
                                        div { class: "muted small", "{phone}" }
                                    }
                                    td { span { class: "{status_class}", "{student.status}" } }
                                    td { class: "row-actions",
                                        button {
                                            class: "btn-ghost",
                                            onclick: move |_| {
                                                form.set(snapshot.clone());
                                                editing.set(Some(edit_roll.clone()));
                                                form_error.set(None);
                                                modal_open.set(true);
                                            },
                                            "Edit"
                                        }
                                        button {
                                            class: "btn-danger",
                                            onclick: move |_| {
                                                let store = store.clone();
                                                let roll_no = delete_roll.clone();
                                                spawn(async move {
                                                    match store.delete_student(&roll_no).await {
                                                        Ok(()) => notifs.success("Student removed".to_string()),
                                                        Err(e) => notifs.error(format!("Failed to delete student: {e}")),
                                                    }
                                                });
                                            },
                                            "Delete"
                                        }
                                    }
                                }
                            }
                        }
                    }
                }
            }
        }

        if modal_open() {
            StudentForm {
                form,
                editing: editing().is_some(),
                saving: saving(),
                error: form_error(),
                on_submit: submit,
                on_cancel: close_modal,
            }
        }
    }
}
