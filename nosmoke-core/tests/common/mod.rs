//! In-process stand-in for the detection backend.

#![allow(dead_code)]

use std::io::Cursor;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, Request, State};
use axum::http::StatusCode;
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use image::{ImageFormat, Rgb, RgbImage};
use serde_json::{json, Value};

use nosmoke_core::camera::Frame;
use nosmoke_core::config::DashboardConfig;
use nosmoke_core::{ApiClient, DomainStore};

pub const FIXED_TIMESTAMP: &str = "2024-01-01T00:00:00Z";

#[derive(Clone, Default)]
pub struct Backend {
    students: Arc<Mutex<Vec<Value>>>,
    detections: Arc<Mutex<Vec<Value>>>,
    users: Arc<Mutex<Vec<(Value, String)>>>,
    hits: Arc<AtomicUsize>,
    next_id: Arc<AtomicUsize>,
    detection_seq: Arc<AtomicUsize>,
    ws_reply: Arc<Mutex<Value>>,
    ws_close_after_reply: Arc<AtomicBool>,
    ws_closed: Arc<AtomicUsize>,
}

impl Backend {
    pub fn new() -> Self {
        let backend = Self::default();
        *backend.ws_reply.lock().unwrap() = json!({ "detections": [] });
        backend
    }

    pub fn with_students(self, students: Vec<Value>) -> Self {
        *self.students.lock().unwrap() = students;
        self
    }

    pub fn with_detections(self, detections: Vec<Value>) -> Self {
        *self.detections.lock().unwrap() = detections;
        self
    }

    /// JSON the detect socket answers every frame with.
    pub fn reply_with(&self, reply: Value) {
        *self.ws_reply.lock().unwrap() = reply;
    }

    /// Hang up the detect socket right after the first reply.
    pub fn closing_after_first_reply(self) -> Self {
        self.ws_close_after_reply.store(true, Ordering::SeqCst);
        self
    }

    /// Detect sockets that have ended, from either side.
    pub fn sockets_closed(&self) -> usize {
        self.ws_closed.load(Ordering::SeqCst)
    }

    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }

    pub fn student_count(&self) -> usize {
        self.students.lock().unwrap().len()
    }

    fn next_id(&self, prefix: &str) -> String {
        format!("{prefix}{}", self.next_id.fetch_add(1, Ordering::SeqCst) + 1)
    }

    /// Bind `127.0.0.1:0` and serve in the background. Returns the origin.
    pub async fn spawn(self) -> String {
        let app = Router::new()
            .route("/students", get(list_students).post(create_student))
            .route("/students/{id}", put(update_student).delete(delete_student))
            .route("/database", get(list_detections).post(create_detection))
            .route("/auth/signup", post(sign_up))
            .route("/auth/signin", post(sign_in))
            .route("/screenshots/{name}", get(screenshot))
            .route("/ws/detect", get(detect_socket))
            .layer(middleware::from_fn_with_state(self.clone(), count_hits))
            .with_state(self);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }
}

async fn count_hits(State(backend): State<Backend>, req: Request, next: Next) -> Response {
    backend.hits.fetch_add(1, Ordering::SeqCst);
    next.run(req).await
}

fn not_found(what: &str) -> Response {
    (StatusCode::NOT_FOUND, Json(json!({ "detail": format!("{what} not found") }))).into_response()
}

async fn list_students(State(b): State<Backend>) -> Json<Vec<Value>> {
    Json(b.students.lock().unwrap().clone())
}

async fn create_student(State(b): State<Backend>, Json(mut body): Json<Value>) -> Json<Value> {
    body["id"] = json!(b.next_id("s"));
    b.students.lock().unwrap().push(body.clone());
    Json(body)
}

async fn update_student(
    State(b): State<Backend>,
    Path(id): Path<String>,
    Json(patch): Json<Value>,
) -> Response {
    let mut students = b.students.lock().unwrap();
    let Some(student) = students.iter_mut().find(|s| s["id"] == id.as_str()) else {
        return not_found("Student");
    };
    if let (Some(target), Some(fields)) = (student.as_object_mut(), patch.as_object()) {
        for (k, v) in fields {
            target.insert(k.clone(), v.clone());
        }
    }
    Json(json!({ "message": "updated" })).into_response()
}

async fn delete_student(State(b): State<Backend>, Path(id): Path<String>) -> Response {
    let mut students = b.students.lock().unwrap();
    let before = students.len();
    students.retain(|s| s["id"] != id.as_str());
    if students.len() == before {
        return not_found("Student");
    }
    Json(json!({ "message": "deleted" })).into_response()
}

async fn list_detections(State(b): State<Backend>) -> Json<Vec<Value>> {
    Json(b.detections.lock().unwrap().clone())
}

async fn create_detection(State(b): State<Backend>, Json(mut body): Json<Value>) -> Json<Value> {
    let seq = b.detection_seq.fetch_add(1, Ordering::SeqCst) + 1;
    body["id"] = json!(format!("d{seq}"));
    body["timestamp"] = json!(FIXED_TIMESTAMP);
    b.detections.lock().unwrap().push(body.clone());
    Json(body)
}

async fn sign_up(State(b): State<Backend>, Json(body): Json<Value>) -> Response {
    let email = body["email"].as_str().unwrap_or_default().to_string();
    let mut users = b.users.lock().unwrap();
    if users.iter().any(|(u, _)| u["email"] == email.as_str()) {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "detail": "Email already registered" })),
        )
            .into_response();
    }
    let user = json!({
        "id": format!("u{}", users.len() + 1),
        "email": email,
        "name": body["name"],
        "role": "admin",
    });
    let password = body["password"].as_str().unwrap_or_default().to_string();
    users.push((user.clone(), password));
    Json(user).into_response()
}

async fn sign_in(State(b): State<Backend>, Json(body): Json<Value>) -> Response {
    let users = b.users.lock().unwrap();
    let found = users
        .iter()
        .find(|(u, pw)| u["email"] == body["email"] && body["password"] == pw.as_str());
    match found {
        Some((user, _)) => Json(json!({ "user": user, "access_token": "token-123" })).into_response(),
        None => (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "detail": "Invalid credentials" })),
        )
            .into_response(),
    }
}

async fn screenshot(Path(name): Path<String>) -> Response {
    if name == "violation_1.jpg" {
        ([("content-type", "image/jpeg")], b"JPEGDATA".to_vec()).into_response()
    } else {
        not_found("Screenshot")
    }
}

async fn detect_socket(State(b): State<Backend>, ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(move |socket| answer_frames(socket, b))
}

async fn answer_frames(mut socket: WebSocket, b: Backend) {
    let mut closing = false;
    while let Some(Ok(msg)) = socket.recv().await {
        match msg {
            Message::Text(frame) => {
                if closing || !frame.as_str().starts_with("data:image/") {
                    continue;
                }
                let reply = b.ws_reply.lock().unwrap().to_string();
                if socket.send(Message::Text(reply.into())).await.is_err() {
                    break;
                }
                if b.ws_close_after_reply.load(Ordering::SeqCst) {
                    // Keep reading until the client answers the close.
                    closing = true;
                    if socket.send(Message::Close(None)).await.is_err() {
                        break;
                    }
                }
            }
            Message::Close(_) => break,
            _ => {}
        }
    }
    b.ws_closed.fetch_add(1, Ordering::SeqCst);
}

// ── Client-side helpers ──

pub fn api(origin: &str) -> ApiClient {
    ApiClient::new(origin, Duration::from_secs(5)).unwrap()
}

pub fn store(origin: &str) -> DomainStore {
    DomainStore::new(api(origin), DashboardConfig::default())
}

pub fn png_frame() -> Frame {
    let img = RgbImage::from_pixel(32, 24, Rgb([200, 200, 200]));
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, ImageFormat::Png).unwrap();
    Frame::from_bytes(out.into_inner()).unwrap()
}

pub fn student_json(id: &str, name: &str, roll_no: &str, dept: &str) -> Value {
    json!({
        "id": id,
        "name": name,
        "rollNo": roll_no,
        "department": dept,
        "status": "Active",
    })
}
