use std::fs::File;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context as _, Result};
use chrono::{Local, NaiveDate};
use nosmoke_core::camera::{DirectoryCamera, FrameSource, SnapshotCamera};
use nosmoke_core::export;
use nosmoke_core::filter::{filter_students, DateRange, HistoryFilter, StatusFilter};
use nosmoke_core::models::{NewStudent, StudentPatch, User};
use nosmoke_core::storage::LocalStorage;
use nosmoke_core::stream::StreamConfig;
use nosmoke_core::{ApiClient, Config, DetectionController, DomainStore, SessionStore, StreamEvent};
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};

pub struct Context {
    pub config: Config,
    pub api: ApiClient,
    pub session: SessionStore,
    pub domain: DomainStore,
}

impl Context {
    pub fn new(api_url: Option<String>) -> Result<Self> {
        let mut config = Config::load().context("failed to load config")?;
        if let Some(url) = api_url {
            config.api_url = url;
        }
        let api = ApiClient::from_config(&config)
            .with_context(|| format!("invalid backend url {}", config.api_url))?;
        let session = SessionStore::new(api.clone(), LocalStorage::new(config.data_dir()));
        session.restore();
        let domain = DomainStore::new(api.clone(), config.dashboard.clone());
        Ok(Self {
            config,
            api,
            session,
            domain,
        })
    }

    /// Roster, history and detection need a signed-in operator.
    fn require_user(&self) -> Result<User> {
        match self.session.current_user() {
            Some(user) => Ok(user),
            None => bail!("not signed in; run `nosmoke login <email> -p <password>` first"),
        }
    }
}

// ── Session ──

pub async fn login(ctx: &Context, email: &str, password: &str) -> Result<()> {
    let user = ctx.session.sign_in(email, password).await?;
    println!("Signed in as {} <{}>", user.display_name(), user.email);
    Ok(())
}

pub async fn signup(ctx: &Context, email: &str, password: &str, name: &str) -> Result<()> {
    let user = ctx.session.sign_up(email, password, name).await?;
    println!("Account created for {} <{}>", user.display_name(), user.email);
    Ok(())
}

pub fn logout(ctx: &Context) -> Result<()> {
    ctx.session.sign_out();
    println!("Signed out");
    Ok(())
}

pub fn whoami(ctx: &Context) -> Result<()> {
    match ctx.session.current_user() {
        Some(user) => println!("{} <{}> ({})", user.display_name(), user.email, user.role()),
        None => println!("Not signed in"),
    }
    Ok(())
}

// ── Students ──

pub async fn list_students(ctx: &Context, search: Option<&str>) -> Result<()> {
    ctx.require_user()?;
    ctx.domain.load().await?;
    let roster = ctx.domain.students();
    let shown = filter_students(&roster, search.unwrap_or(""));

    println!("{:<16} {:<28} {:<24} {:<8}", "ROLL NO", "NAME", "DEPARTMENT", "STATUS");
    for s in &shown {
        println!("{:<16} {:<28} {:<24} {:<8}", s.roll_no, s.name, s.department, s.status);
    }
    println!("{} of {} students", shown.len(), roster.len());
    Ok(())
}

pub async fn add_student(ctx: &Context, student: NewStudent) -> Result<()> {
    ctx.require_user()?;
    ctx.domain.load().await?;
    let created = ctx.domain.add_student(student).await?;
    println!("Added {} ({})", created.name, created.roll_no);
    Ok(())
}

pub async fn update_student(ctx: &Context, roll_no: &str, patch: StudentPatch) -> Result<()> {
    ctx.require_user()?;
    if patch.is_empty() {
        bail!("nothing to update; pass at least one field");
    }
    ctx.domain.load().await?;
    let updated = ctx.domain.update_student(roll_no, patch).await?;
    println!("Updated {} ({})", updated.name, updated.roll_no);
    Ok(())
}

pub async fn delete_student(ctx: &Context, roll_no: &str) -> Result<()> {
    ctx.require_user()?;
    ctx.domain.load().await?;
    ctx.domain.delete_student(roll_no).await?;
    println!("Removed {roll_no}");
    Ok(())
}

// ── History ──

pub fn history_filter(
    search: Option<String>,
    status: &str,
    range: &str,
    custom: Option<(NaiveDate, NaiveDate)>,
) -> Result<HistoryFilter> {
    let status = status.parse::<StatusFilter>().map_err(anyhow::Error::msg)?;
    let range = match custom {
        Some((from, to)) => DateRange::custom(from, to),
        None => match range {
            "all" => DateRange::All,
            "today" => DateRange::Today,
            "7d" => DateRange::Last7Days,
            "30d" => DateRange::Last30Days,
            other => bail!("unknown range {other:?} (expected all, today, 7d or 30d)"),
        },
    };
    Ok(HistoryFilter {
        search: search.unwrap_or_default(),
        status,
        range,
    })
}

pub async fn history(ctx: &Context, filter: HistoryFilter, export_to: Option<PathBuf>) -> Result<()> {
    ctx.require_user()?;
    ctx.domain.load().await?;
    let records = filter.apply(&ctx.domain.detections());

    match export_to {
        Some(path) if path == Path::new("-") => {
            export::write_csv(std::io::stdout().lock(), &records)?;
        }
        Some(path) => {
            let file = File::create(&path).with_context(|| format!("cannot create {}", path.display()))?;
            export::write_csv(file, &records)?;
            info!(path = %path.display(), rows = records.len(), "exported history");
            println!("Wrote {} records to {}", records.len(), path.display());
        }
        None => {
            println!(
                "{:<20} {:<24} {:<14} {:<8} {:>5}  {}",
                "TIME", "NAME", "ROLL NO", "STATUS", "CONF", "ACTION"
            );
            for r in &records {
                let time = r.timestamp.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S");
                let status = if r.smoking_detected { "Smoking" } else { "Clear" };
                println!(
                    "{:<20} {:<24} {:<14} {:<8} {:>4}%  {}",
                    time.to_string(),
                    r.display_name(),
                    r.display_roll_no(),
                    status,
                    r.confidence_pct(),
                    r.action_taken.as_deref().unwrap_or("-"),
                );
            }
            println!("{} records ({})", records.len(), filter.range.label());
        }
    }
    Ok(())
}

pub async fn stats(ctx: &Context) -> Result<()> {
    ctx.domain.load().await?;
    let stats = ctx.domain.stats();
    println!("Total detections:   {}", stats.total_detections);
    println!("Smoking detections: {}", stats.smoking_detections);
    println!("Faces identified:   {}", stats.faces_identified);
    println!("Total students:     {}", stats.total_students);
    println!("Active cameras:     {}", stats.active_cameras);
    println!("Uptime:             {}", stats.uptime);
    Ok(())
}

pub async fn evidence(ctx: &Context, filename: &str, output: Option<PathBuf>) -> Result<()> {
    let bytes = ctx.api.download_screenshot(filename).await?;
    let path = output.unwrap_or_else(|| {
        let name = Path::new(filename)
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "evidence.jpg".into());
        PathBuf::from(name)
    });
    std::fs::write(&path, &bytes).with_context(|| format!("cannot write {}", path.display()))?;
    println!("Saved {} bytes to {}", bytes.len(), path.display());
    Ok(())
}

// ── Live detection ──

pub async fn detect(
    ctx: &Context,
    dir: Option<PathBuf>,
    snapshot: Option<String>,
    duration: Option<u64>,
    alerts: bool,
) -> Result<()> {
    ctx.require_user()?;
    let camera: Box<dyn FrameSource> = match (dir, snapshot) {
        (Some(dir), _) => Box::new(DirectoryCamera::new(dir)),
        (None, Some(url)) => Box::new(SnapshotCamera::new(url).with_timeout(ctx.config.request_timeout())),
        (None, None) => bail!("pass --dir or --snapshot"),
    };

    let controller = DetectionController::new(StreamConfig::from_config(&ctx.config), ctx.domain.clone());
    controller.set_alerts_enabled(alerts);
    let mut events = controller.events();
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    let start = controller.start(camera);
    tokio::pin!(start);
    tokio::select! {
        started = &mut start => {
            started?;
        }
        _ = &mut ctrl_c => {
            info!("interrupted while connecting");
            controller.stop().await;
            // Lets the pending start release the camera.
            let _ = start.await;
            return Ok(());
        }
    }

    let deadline = async {
        match duration {
            Some(secs) => tokio::time::sleep(Duration::from_secs(secs)).await,
            None => std::future::pending().await,
        }
    };
    tokio::pin!(deadline);

    let mut violations = 0usize;
    loop {
        tokio::select! {
            _ = &mut deadline => break,
            _ = &mut ctrl_c => {
                info!("interrupted");
                break;
            }
            event = events.recv() => match event {
                Ok(StreamEvent::Started { source }) => println!("Streaming from {source}"),
                Ok(StreamEvent::Violation { names, confidence }) => {
                    violations += 1;
                    let now = Local::now().format("%H:%M:%S");
                    println!("[{now}] Smoking detected: {} ({confidence}%)", names.join(", "));
                }
                Ok(StreamEvent::Warning(message)) => warn!(%message, "detection warning"),
                Ok(StreamEvent::Stopped) => break,
                Err(RecvError::Lagged(skipped)) => warn!(skipped, "dropped stream events"),
                Err(RecvError::Closed) => break,
            },
        }
    }

    let status = controller.status();
    controller.stop().await;
    println!(
        "Sent {} frames, received {} replies, {} violations alerted",
        status.frames_sent, status.messages_received, violations
    );
    Ok(())
}
