mod common;

use serde_json::json;

use common::{student_json, Backend};
use nosmoke_core::models::{NewDetection, NewStudent, StudentPatch};
use nosmoke_core::StoreError;

fn new_student(name: &str, roll_no: &str) -> NewStudent {
    NewStudent {
        name: name.into(),
        roll_no: roll_no.into(),
        department: "Computer Science".into(),
        email: Some("student@campus.edu".into()),
        ..Default::default()
    }
}

#[tokio::test]
async fn load_replaces_collections_newest_first() {
    let backend = Backend::new()
        .with_students(vec![student_json("s1", "Ayesha Khan", "CS001", "Computer Science")])
        .with_detections(vec![
            json!({"id": 1, "timestamp": "2024-02-01T08:00:00", "smokingDetected": true, "confidence": 77}),
            json!({"id": 2, "timestamp": "2024-02-03T08:00:00Z", "smokingDetected": false, "confidence": 0.4}),
        ]);
    let store = common::store(&backend.spawn().await);

    store.load().await.unwrap();
    let state = store.snapshot();
    assert!(state.loaded);
    assert_eq!(state.students.len(), 1);
    assert_eq!(state.detections[0].confidence_pct(), 40);
    assert_eq!(state.stats.total_detections, 2);
    assert_eq!(state.stats.smoking_detections, 1);
    assert_eq!(state.stats.total_students, 1);
}

#[tokio::test]
async fn adding_a_valid_student_grows_the_roster() {
    let backend = Backend::new();
    let store = common::store(&backend.clone().spawn().await);

    let created = store.add_student(new_student(" Bilal Ahmed ", "EE014")).await.unwrap();
    assert_eq!(created.name, "Bilal Ahmed");
    assert_eq!(created.status, "Active");
    assert!(created.enrollment_date.is_some());

    assert_eq!(store.students().len(), 1);
    assert_eq!(store.student("EE014").unwrap().backend_key(), created.backend_key());
    assert_eq!(store.stats().total_students, 1);
    assert_eq!(backend.student_count(), 1);
}

#[tokio::test]
async fn duplicate_roll_number_is_rejected_locally() {
    let backend = Backend::new();
    let store = common::store(&backend.clone().spawn().await);
    store.add_student(new_student("First", "CS001")).await.unwrap();
    let hits = backend.hits();

    let err = store.add_student(new_student("Second", "CS001")).await.unwrap_err();
    assert!(matches!(err, StoreError::DuplicateRollNo(ref r) if r == "CS001"));
    assert_eq!(backend.hits(), hits);
    assert_eq!(store.students().len(), 1);
}

#[tokio::test]
async fn deleting_unknown_roll_number_changes_nothing() {
    let backend = Backend::new()
        .with_students(vec![student_json("s1", "Ayesha Khan", "CS001", "Computer Science")]);
    let store = common::store(&backend.clone().spawn().await);
    store.load().await.unwrap();
    let hits = backend.hits();

    let err = store.delete_student("NOPE").await.unwrap_err();
    assert!(matches!(err, StoreError::UnknownStudent(_)));
    assert_eq!(store.students().len(), 1);
    assert_eq!(backend.hits(), hits);
}

#[tokio::test]
async fn stats_track_roster_and_log_through_mutations() {
    let backend = Backend::new();
    let store = common::store(&backend.spawn().await);

    for (name, roll) in [("A", "R1"), ("B", "R2"), ("C", "R3")] {
        store.add_student(new_student(name, roll)).await.unwrap();
    }
    store.delete_student("R2").await.unwrap();
    store
        .add_detection(NewDetection::unknown(false, 88.0, "Alert sent"))
        .await
        .unwrap();
    store
        .add_detection(NewDetection {
            name: "A".into(),
            roll_no: "R1".into(),
            smoking_detected: false,
            face_detected: true,
            confidence: 60.0,
            action_taken: "No action".into(),
            ..Default::default()
        })
        .await
        .unwrap();

    let state = store.snapshot();
    assert_eq!(state.stats.total_students, state.students.len());
    assert_eq!(state.stats.total_students, 2);
    assert_eq!(
        state.stats.smoking_detections,
        state.detections.iter().filter(|d| d.smoking_detected).count()
    );
    assert_eq!(state.stats.smoking_detections, 1);
    assert_eq!(state.stats.faces_identified, 1);
}

#[tokio::test]
async fn created_detection_goes_first_and_is_counted() {
    let backend = Backend::new().with_detections(vec![json!({
        "id": "d0",
        "timestamp": "2023-12-31T10:00:00Z",
        "smokingDetected": false,
        "confidence": 50
    })]);
    let store = common::store(&backend.spawn().await);
    store.load().await.unwrap();

    let created = store
        .add_detection(NewDetection {
            name: "Ayesha Khan".into(),
            roll_no: "CS001".into(),
            smoking_detected: true,
            face_detected: true,
            confidence: 91.0,
            action_taken: "Alert sent".into(),
            ..Default::default()
        })
        .await
        .unwrap();

    assert_eq!(created.id.as_ref().map(ToString::to_string).as_deref(), Some("d1"));
    let detections = store.detections();
    assert_eq!(detections[0], created);
    assert_eq!(detections[0].timestamp.to_rfc3339(), "2024-01-01T00:00:00+00:00");
    assert_eq!(detections[0].confidence_pct(), 91);
    assert_eq!(store.stats().total_detections, 2);
}

#[tokio::test]
async fn update_merges_patch_and_guards_roll_numbers() {
    let backend = Backend::new().with_students(vec![
        student_json("s1", "Ayesha Khan", "CS001", "Computer Science"),
        student_json("s2", "Bilal Ahmed", "EE014", "Electrical"),
    ]);
    let store = common::store(&backend.clone().spawn().await);
    store.load().await.unwrap();

    let clash = StudentPatch {
        roll_no: Some("EE014".into()),
        ..Default::default()
    };
    assert!(matches!(
        store.update_student("CS001", clash).await,
        Err(StoreError::DuplicateRollNo(_))
    ));

    let patch = StudentPatch {
        department: Some("Data Science".into()),
        phone: Some("0300-1234567".into()),
        ..Default::default()
    };
    let updated = store.update_student("CS001", patch).await.unwrap();
    assert_eq!(updated.department, "Data Science");
    assert_eq!(store.student("CS001").unwrap().phone.as_deref(), Some("0300-1234567"));
    assert_eq!(store.students().len(), 2);
}

#[tokio::test]
async fn backend_rejection_leaves_roster_untouched() {
    let backend = Backend::new();
    let origin = backend.clone().spawn().await;
    let store = common::store(&origin);
    store.add_student(new_student("Ghost", "G1")).await.unwrap();

    // A second dashboard removes the student behind our back.
    let other = common::store(&origin);
    other.load().await.unwrap();
    other.delete_student("G1").await.unwrap();

    let err = store
        .update_student(
            "G1",
            StudentPatch {
                name: Some("Renamed".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::Api(ref e) if e.status() == Some(404)));
    assert_eq!(err.to_string(), "Student not found");
    assert_eq!(store.student("G1").unwrap().name, "Ghost");
}
