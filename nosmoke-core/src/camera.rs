//! Frame sources for live detection.
//!
//! The desktop build has no browser `getUserMedia`, so a camera is anything
//! that can hand out encoded still images on demand: a folder of captures,
//! an IP camera's snapshot endpoint, or frames held in memory.

use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use image::{ImageFormat, ImageReader};
use thiserror::Error;
use tracing::{debug, info};
use walkdir::WalkDir;

const IMAGE_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];

#[derive(Debug, Error)]
pub enum CameraError {
    #[error("camera unavailable: {0}")]
    Unavailable(String),

    #[error("camera is not open")]
    NotOpen,

    #[error("could not read frame: {0}")]
    Decode(String),

    #[error("camera I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// One encoded still image plus the dimensions read from its header.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub bytes: Vec<u8>,
    pub mime: &'static str,
    pub width: u32,
    pub height: u32,
}

impl Frame {
    /// Sniff the format and read dimensions without decoding pixels.
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, CameraError> {
        let format = image::guess_format(&bytes).map_err(|e| CameraError::Decode(e.to_string()))?;
        let (width, height) = ImageReader::with_format(Cursor::new(&bytes), format)
            .into_dimensions()
            .map_err(|e| CameraError::Decode(e.to_string()))?;
        Ok(Self {
            mime: mime_for(format),
            bytes,
            width,
            height,
        })
    }

    /// `data:image/jpeg;base64,...`, the payload the detect socket expects.
    pub fn to_data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime, STANDARD.encode(&self.bytes))
    }
}

fn mime_for(format: ImageFormat) -> &'static str {
    match format {
        ImageFormat::Png => "image/png",
        ImageFormat::Jpeg => "image/jpeg",
        _ => "application/octet-stream",
    }
}

#[async_trait]
pub trait FrameSource: Send {
    /// Acquire the device. Called once before the first capture.
    async fn open(&mut self) -> Result<(), CameraError>;

    /// Next frame, or `None` when nothing is ready this tick.
    async fn capture(&mut self) -> Result<Option<Frame>, CameraError>;

    /// Release the device. Safe to call more than once.
    async fn release(&mut self);

    fn describe(&self) -> String;
}

// ── Directory ──

/// Cycles through the image files of a folder in name order.
pub struct DirectoryCamera {
    dir: PathBuf,
    files: Vec<PathBuf>,
    next: usize,
}

impl DirectoryCamera {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            files: Vec::new(),
            next: 0,
        }
    }

    fn scan(dir: &Path) -> Vec<PathBuf> {
        let mut files: Vec<PathBuf> = WalkDir::new(dir)
            .max_depth(1)
            .into_iter()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_file())
            .map(|entry| entry.into_path())
            .filter(|path| is_image(path))
            .collect();
        files.sort();
        files
    }
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| IMAGE_EXTENSIONS.iter().any(|known| ext.eq_ignore_ascii_case(known)))
}

#[async_trait]
impl FrameSource for DirectoryCamera {
    async fn open(&mut self) -> Result<(), CameraError> {
        if !self.dir.is_dir() {
            return Err(CameraError::Unavailable(format!(
                "{} is not a directory",
                self.dir.display()
            )));
        }
        let dir = self.dir.clone();
        let files = tokio::task::spawn_blocking(move || Self::scan(&dir))
            .await
            .map_err(|e| CameraError::Unavailable(e.to_string()))?;
        if files.is_empty() {
            return Err(CameraError::Unavailable(format!(
                "no images in {}",
                self.dir.display()
            )));
        }
        info!(dir = %self.dir.display(), frames = files.len(), "directory camera opened");
        self.files = files;
        self.next = 0;
        Ok(())
    }

    async fn capture(&mut self) -> Result<Option<Frame>, CameraError> {
        if self.files.is_empty() {
            return Err(CameraError::NotOpen);
        }
        let path = self.files[self.next % self.files.len()].clone();
        self.next = (self.next + 1) % self.files.len();
        let bytes = tokio::fs::read(&path)
            .await
            .map_err(|source| CameraError::Io { path: path.clone(), source })?;
        debug!(path = %path.display(), "captured frame");
        Frame::from_bytes(bytes).map(Some)
    }

    async fn release(&mut self) {
        self.files.clear();
        self.next = 0;
    }

    fn describe(&self) -> String {
        format!("folder {}", self.dir.display())
    }
}

// ── IP camera snapshot ──

/// Polls an HTTP endpoint that returns one JPEG per request.
pub struct SnapshotCamera {
    url: String,
    timeout: Duration,
    http: Option<reqwest::Client>,
}

impl SnapshotCamera {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            timeout: Duration::from_secs(5),
            http: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    async fn fetch(&self, http: &reqwest::Client) -> Result<Frame, CameraError> {
        let resp = http
            .get(&self.url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| CameraError::Unavailable(e.to_string()))?;
        let bytes = resp
            .bytes()
            .await
            .map_err(|e| CameraError::Unavailable(e.to_string()))?;
        Frame::from_bytes(bytes.to_vec())
    }
}

#[async_trait]
impl FrameSource for SnapshotCamera {
    async fn open(&mut self) -> Result<(), CameraError> {
        let http = reqwest::Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(|e| CameraError::Unavailable(e.to_string()))?;
        // One fetch up front so a dead camera fails at start, not on the first tick.
        let first = self.fetch(&http).await?;
        info!(url = %self.url, width = first.width, height = first.height, "snapshot camera opened");
        self.http = Some(http);
        Ok(())
    }

    async fn capture(&mut self) -> Result<Option<Frame>, CameraError> {
        let http = self.http.as_ref().ok_or(CameraError::NotOpen)?;
        self.fetch(http).await.map(Some)
    }

    async fn release(&mut self) {
        self.http = None;
    }

    fn describe(&self) -> String {
        format!("snapshot {}", self.url)
    }
}

// ── In memory ──

/// Fixed frames, repeated in order.
pub struct StaticCamera {
    frames: Vec<Frame>,
    next: usize,
    open: bool,
    fail_open: Option<String>,
}

impl StaticCamera {
    pub fn new(frames: Vec<Frame>) -> Self {
        Self {
            frames,
            next: 0,
            open: false,
            fail_open: None,
        }
    }

    /// A camera whose `open` always fails, e.g. permission denied.
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self {
            fail_open: Some(reason.into()),
            ..Self::new(Vec::new())
        }
    }
}

#[async_trait]
impl FrameSource for StaticCamera {
    async fn open(&mut self) -> Result<(), CameraError> {
        if let Some(reason) = &self.fail_open {
            return Err(CameraError::Unavailable(reason.clone()));
        }
        self.open = true;
        Ok(())
    }

    async fn capture(&mut self) -> Result<Option<Frame>, CameraError> {
        if !self.open {
            return Err(CameraError::NotOpen);
        }
        if self.frames.is_empty() {
            return Ok(None);
        }
        let frame = self.frames[self.next % self.frames.len()].clone();
        self.next += 1;
        Ok(Some(frame))
    }

    async fn release(&mut self) {
        self.open = false;
    }

    fn describe(&self) -> String {
        format!("{} in-memory frame(s)", self.frames.len())
    }
}
