mod commands;

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::commands::Context;

#[derive(Parser, Debug)]
#[command(name = "nosmoke", author, version, about = "Headless NoSmoke operator tool")]
struct Args {
    /// Backend origin. Overrides the config file and NOSMOKE_API_URL.
    #[arg(long, global = true)]
    api_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Sign in and remember the session.
    Login {
        email: String,
        #[arg(long, short)]
        password: String,
    },
    /// Create an operator account and sign in.
    Signup {
        email: String,
        #[arg(long, short)]
        password: String,
        #[arg(long, short)]
        name: String,
    },
    Logout,
    Whoami,
    /// Manage the student roster.
    #[command(subcommand)]
    Students(StudentsCommand),
    /// List logged detections.
    History {
        #[arg(long, short)]
        search: Option<String>,
        /// all, smoking or clear
        #[arg(long, default_value = "all")]
        status: String,
        /// all, today, 7d or 30d
        #[arg(long, default_value = "all", conflicts_with = "from")]
        range: String,
        /// First local date, inclusive (YYYY-MM-DD).
        #[arg(long, requires = "to")]
        from: Option<NaiveDate>,
        /// Last local date, inclusive (YYYY-MM-DD).
        #[arg(long, requires = "from")]
        to: Option<NaiveDate>,
        /// Write CSV to this path, or `-` for stdout.
        #[arg(long)]
        export: Option<PathBuf>,
    },
    /// Dashboard counters.
    Stats,
    /// Download a violation screenshot.
    Evidence {
        filename: String,
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
    /// Stream a camera to the detector and log violations.
    Detect {
        /// Folder of JPEG/PNG frames, replayed in name order.
        #[arg(long, conflicts_with = "snapshot", required_unless_present = "snapshot")]
        dir: Option<PathBuf>,
        /// URL returning one JPEG/PNG frame per request.
        #[arg(long)]
        snapshot: Option<String>,
        /// Stop after this many seconds. Runs until Ctrl-C otherwise.
        #[arg(long)]
        duration: Option<u64>,
        /// Log violations with "No action" instead of raising alerts.
        #[arg(long)]
        no_alerts: bool,
    },
}

#[derive(Subcommand, Debug)]
enum StudentsCommand {
    List {
        #[arg(long, short)]
        search: Option<String>,
    },
    Add {
        #[arg(long)]
        name: String,
        #[arg(long)]
        roll_no: String,
        #[arg(long)]
        department: String,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        phone: Option<String>,
        #[arg(long)]
        image: Option<String>,
    },
    /// Change the given fields of the student with this roll number.
    Update {
        roll_no: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long = "new-roll-no")]
        new_roll_no: Option<String>,
        #[arg(long)]
        department: Option<String>,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        phone: Option<String>,
        #[arg(long)]
        image: Option<String>,
        #[arg(long)]
        status: Option<String>,
    },
    Delete {
        roll_no: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let ctx = Context::new(args.api_url)?;

    match args.command {
        Command::Login { email, password } => commands::login(&ctx, &email, &password).await,
        Command::Signup { email, password, name } => {
            commands::signup(&ctx, &email, &password, &name).await
        }
        Command::Logout => commands::logout(&ctx),
        Command::Whoami => commands::whoami(&ctx),
        Command::Students(cmd) => match cmd {
            StudentsCommand::List { search } => commands::list_students(&ctx, search.as_deref()).await,
            StudentsCommand::Add { name, roll_no, department, email, phone, image } => {
                let student = nosmoke_core::models::NewStudent {
                    name,
                    roll_no,
                    department,
                    email,
                    phone,
                    image,
                };
                commands::add_student(&ctx, student).await
            }
            StudentsCommand::Update {
                roll_no,
                name,
                new_roll_no,
                department,
                email,
                phone,
                image,
                status,
            } => {
                let patch = nosmoke_core::models::StudentPatch {
                    name,
                    roll_no: new_roll_no,
                    department,
                    email,
                    phone,
                    image,
                    status,
                };
                commands::update_student(&ctx, &roll_no, patch).await
            }
            StudentsCommand::Delete { roll_no } => commands::delete_student(&ctx, &roll_no).await,
        },
        Command::History { search, status, range, from, to, export } => {
            let filter = commands::history_filter(search, &status, &range, from.zip(to))?;
            commands::history(&ctx, filter, export).await
        }
        Command::Stats => commands::stats(&ctx).await,
        Command::Evidence { filename, output } => commands::evidence(&ctx, &filename, output).await,
        Command::Detect { dir, snapshot, duration, no_alerts } => {
            commands::detect(&ctx, dir, snapshot, duration, !no_alerts).await
        }
    }
}
