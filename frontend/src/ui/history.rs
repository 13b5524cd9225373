use chrono::{Local, NaiveDate};
use dioxus::prelude::*;
use nosmoke_core::export;
use nosmoke_core::filter::{DateRange, HistoryFilter, StatusFilter};
use nosmoke_core::models::DetectionRecord;
use tracing::{info, warn};

use crate::app::{use_domain, use_services, Services};
use crate::ui::notification::{NotificationService, NotificationServiceStoreImplExt};

const RANGE_OPTIONS: [(&str, &str); 5] = [
    ("all", "All Dates"),
    ("today", "Today"),
    ("7d", "Last 7 Days"),
    ("30d", "Last 30 Days"),
    ("custom", "Custom Range"),
];

fn parse_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()
}

/// Resolve the range picker. An incomplete custom range means no bound.
fn date_range(choice: &str, start: &str, end: &str) -> DateRange {
    match choice {
        "today" => DateRange::Today,
        "7d" => DateRange::Last7Days,
        "30d" => DateRange::Last30Days,
        "custom" => match (parse_date(start), parse_date(end)) {
            (Some(a), Some(b)) => DateRange::custom(a, b),
            _ => DateRange::All,
        },
        _ => DateRange::All,
    }
}

#[component]
pub fn History() -> Element {
    let services = use_services();
    let domain = use_domain();
    let mut notifs = use_context::<Store<NotificationService>>();

    let mut search = use_signal(String::new);
    let mut status = use_signal(StatusFilter::default);
    let mut range_choice = use_signal(|| "all".to_string());
    let mut custom_start = use_signal(String::new);
    let mut custom_end = use_signal(String::new);
    let mut exporting = use_signal(|| false);

    let filter = HistoryFilter {
        search: search(),
        status: status(),
        range: date_range(&range_choice(), &custom_start(), &custom_end()),
    };
    let records = filter.apply(&domain().detections);
    let count = records.len();
    let range_label = filter.range.label();
    let status_label = filter.status.label();

    let export_records = records.clone();
    let export_csv = move |_| {
        let rows = export_records.clone();
        exporting.set(true);
        spawn(async move {
            let file_name = export::default_file_name(Local::now().date_naive());
            let picked = rfd::AsyncFileDialog::new()
                .set_file_name(file_name.as_str())
                .add_filter("CSV", &["csv"])
                .save_file()
                .await;
            if let Some(handle) = picked {
                let path = handle.path().to_path_buf();
                let result = std::fs::File::create(&path)
                    .map_err(export::ExportError::from)
                    .and_then(|file| export::write_csv(file, &rows));
                match result {
                    Ok(()) => {
                        info!(path = %path.display(), rows = rows.len(), "exported history");
                        notifs.success(format!("Exported {} records", rows.len()));
                    }
                    Err(e) => {
                        warn!(error = %e, "export failed");
                        notifs.error(e.to_string());
                    }
                }
            }
            exporting.set(false);
        });
    };

    rsx! {
        div { class: "page-header",
            div {
                h1 { "Detection History" }
                p { class: "muted", "Every logged violation with its evidence." }
            }
            button {
                class: "btn-primary",
                disabled: exporting() || count == 0,
                onclick: export_csv,
                if exporting() { "Exporting..." } else { "Export CSV" }
            }
        }

        div { class: "card toolbar",
            input {
                class: "search",
                value: "{search}",
                placeholder: "Search name, roll number, department or action...",
                oninput: move |e| search.set(e.value()),
            }
            select {
                value: "{status_label}",
                onchange: move |e| {
                    if let Ok(parsed) = e.value().parse::<StatusFilter>() {
                        status.set(parsed);
                    }
                },
                for choice in StatusFilter::ALL {
                    option { key: "{choice}", value: "{choice}", "{choice}" }
                }
            }
            select {
                value: "{range_choice}",
                onchange: move |e| range_choice.set(e.value()),
                for (value, label) in RANGE_OPTIONS {
                    option { key: "{value}", value: "{value}", "{label}" }
                }
            }
            if range_choice() == "custom" {
                input {
                    r#type: "date",
                    value: "{custom_start}",
                    oninput: move |e| custom_start.set(e.value()),
                }
                span { class: "muted", "to" }
                input {
                    r#type: "date",
                    value: "{custom_end}",
                    oninput: move |e| custom_end.set(e.value()),
                }
            }
        }

        p { class: "muted small", "{count} records \u{2022} {range_label}" }

        div { class: "card table-card",
            table { class: "data-table",
                thead {
                    tr {
                        th { "Time" }
                        th { "Evidence" }
                        th { "Name" }
                        th { "Roll No" }
                        th { "Department" }
                        th { "Confidence" }
                        th { "Action" }
                        th { "Status" }
                    }
                }
                tbody {
                    if records.is_empty() {
                        tr {
                            td { colspan: "8", class: "empty", "No detections match the current filters." }
                        }
                    }
                    for (idx, record) in records.iter().enumerate() {
                        HistoryRow {
                            key: "{idx}",
                            record: record.clone(),
                            evidence: record.evidence().map(|path| evidence_src(&services, path)),
                        }
                    }
                }
            }
        }
    }
}

#[component]
fn HistoryRow(record: DetectionRecord, evidence: Option<String>) -> Element {
    let local = record.timestamp.with_timezone(&Local);
    let date = local.format("%Y-%m-%d").to_string();
    let time = local.format("%H:%M:%S").to_string();
    let name = record.display_name().to_string();
    let roll_no = record.display_roll_no().to_string();
    let department = record.department.clone().unwrap_or_default();
    let confidence = record.confidence_pct();
    let action = record.action_taken.clone().unwrap_or_else(|| "-".into());
    let (status_class, status_text) = if record.smoking_detected {
        ("badge badge-red", "Smoking")
    } else {
        ("badge badge-green", "Clear")
    };

    rsx! {
        tr {
            td {
                div { "{time}" }
                div { class: "muted small", "{date}" }
            }
            td {
                if let Some(src) = evidence {
                    a { href: "{src}", target: "_blank",
                        img { class: "evidence-thumb", src: "{src}", alt: "evidence" }
                    }
                } else {
                    span { class: "muted", "-" }
                }
            }
            td { class: "strong", "{name}" }
            td { code { "{roll_no}" } }
            td { "{department}" }
            td {
                div { class: "confidence-bar",
                    div { class: "confidence-fill", style: "width: {confidence}%;" }
                }
                span { class: "small", "{confidence}%" }
            }
            td { "{action}" }
            td { span { class: "{status_class}", "{status_text}" } }
        }
    }
}

/// Screenshot paths are served by the backend; absolute URLs pass through.
fn evidence_src(services: &Services, path: &str) -> String {
    if path.starts_with("http://") || path.starts_with("https://") || path.starts_with("data:") {
        return path.to_string();
    }
    services.domain.api().screenshot_url(path)
}
