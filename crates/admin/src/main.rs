use std::path::PathBuf;

use anyhow::bail;
use clap::{Parser, Subcommand};
use tokio::sync::broadcast;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use krn_admin::config::AdminConfig;
use krn_admin::dialog::ProjectDialog;
use krn_admin::render;
use krn_admin::state::AppState;
use krn_admin::store::LoadOutcome;
use krn_core::error::CoreError;
use krn_core::form_wizard::ProjectForm;
use krn_core::gallery::ProjectGallery;
use krn_core::project::{ImageSlot, IMAGE_SLOT_COUNT};
use krn_events::Notice;

#[derive(Parser)]
#[command(name = "krn-admin")]
#[command(about = "KRN Construction project portfolio admin")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Store an API token and mark the session as logged in.
    Login {
        #[arg(long)]
        token: String,
    },
    /// End the session.
    Logout,
    /// Show session status and endpoints.
    Status,
    /// List all projects.
    List,
    /// Show one project's details and gallery.
    Show { id: i64 },
    /// Create a project. Images fill slots 1..9 in the order given.
    Create {
        #[arg(long)]
        name: String,
        #[arg(long)]
        desc: String,
        #[arg(long = "image")]
        images: Vec<PathBuf>,
    },
    /// Edit a project.
    Edit {
        id: i64,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        desc: Option<String>,
        /// Replace a slot: `<slot>=<path>`.
        #[arg(long = "image", value_parser = parse_slot_path)]
        images: Vec<(ImageSlot, PathBuf)>,
        /// Clear a slot.
        #[arg(long = "clear", value_parser = parse_slot)]
        clear: Vec<ImageSlot>,
    },
    /// Delete a project permanently.
    Delete {
        id: i64,
        /// Confirm deletion; the project and its data cannot be recovered.
        #[arg(long)]
        yes: bool,
    },
}

fn parse_slot(raw: &str) -> Result<ImageSlot, String> {
    let n: u8 = raw
        .trim()
        .parse()
        .map_err(|_| format!("'{raw}' is not a slot number"))?;
    ImageSlot::new(n).map_err(|e| e.to_string())
}

fn parse_slot_path(raw: &str) -> Result<(ImageSlot, PathBuf), String> {
    let (slot, path) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected <slot>=<path>, got '{raw}'"))?;
    Ok((parse_slot(slot)?, PathBuf::from(path)))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "krn_admin=info,krn_client=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    // --- Configuration ---
    let config = AdminConfig::from_env()?;
    tracing::debug!(api_url = %config.api_url, "Loaded client configuration");

    // --- App state ---
    let state = AppState::build(config)?;
    let mut notices = state.notices.subscribe();

    let result = run(&state, cli.command).await;
    drain_notices(&mut notices);
    result
}

async fn run(state: &AppState, command: Command) -> anyhow::Result<()> {
    match command {
        Command::Login { token } => {
            state.session.login(&token)?;
            println!("Logged in");
        }
        Command::Logout => {
            state.session.set_logged_in(false)?;
            println!("Logged out");
        }
        Command::Status => {
            println!("logged in: {}", state.session.is_logged_in());
            println!("api:       {}", state.config.api_url);
            println!("media:     {}/v1_1/{}", state.config.media_url, state.config.cloud_name);
        }
        Command::List => {
            if load(state).await? {
                print!("{}", render::list(&state.projects.list_view().await));
            }
        }
        Command::Show { id } => {
            if load(state).await? {
                let project = state
                    .projects
                    .get(id)
                    .await
                    .ok_or(CoreError::NotFound {
                        entity: "Project",
                        id,
                    })?;
                print!("{}", render::gallery(&ProjectGallery::from(&project)));
            }
        }
        Command::Create { name, desc, images } => {
            if images.len() > IMAGE_SLOT_COUNT {
                bail!("At most {IMAGE_SLOT_COUNT} images are allowed");
            }
            let mut dialog = ProjectDialog::open_create(state);
            dialog.form_mut().set_name(name);
            dialog.form_mut().set_desc(desc);
            dialog.next()?;
            for (slot, path) in ImageSlot::all().zip(images) {
                dialog.select_file(slot, &path).await?;
            }
            finish_dialog(&mut dialog).await?;
        }
        Command::Edit {
            id,
            name,
            desc,
            images,
            clear,
        } => {
            if !load(state).await? {
                return Ok(());
            }
            let project = state
                .projects
                .get(id)
                .await
                .ok_or(CoreError::NotFound {
                    entity: "Project",
                    id,
                })?;
            let mut dialog = ProjectDialog::open_edit(state, &project);
            if let Some(name) = name {
                dialog.form_mut().set_name(name);
            }
            if let Some(desc) = desc {
                dialog.form_mut().set_desc(desc);
            }
            dialog.next()?;
            for slot in clear {
                dialog.remove_image(slot);
            }
            for (slot, path) in images {
                dialog.select_file(slot, &path).await?;
            }
            finish_dialog(&mut dialog).await?;
        }
        Command::Delete { id, yes } => {
            if !yes {
                bail!("This permanently deletes project {id}; re-run with --yes to confirm");
            }
            state.projects.delete(id).await?;
            println!("Deleted project {id}");
        }
    }
    Ok(())
}

/// Load the collection, reporting a missing session instead of failing.
async fn load(state: &AppState) -> anyhow::Result<bool> {
    match state.projects.load().await? {
        LoadOutcome::Skipped => {
            eprintln!("Not logged in. Run `krn-admin login --token <token>` first.");
            Ok(false)
        }
        LoadOutcome::Loaded(_) => Ok(true),
    }
}

/// Only freshly picked files trigger a batch; hosted images alone are
/// submitted as they are.
fn needs_upload(form: &ProjectForm) -> bool {
    form.has_local_previews() && form.can_upload()
}

/// Upload pending images, walk to the last step and submit.
async fn finish_dialog(dialog: &mut ProjectDialog) -> anyhow::Result<()> {
    if needs_upload(dialog.form()) {
        let report = dialog.upload_images().await?;
        for (slot, err) in &report.failed {
            eprintln!("{slot}: {err}");
        }
    }
    while dialog.next().is_ok() {}
    eprint!("{}", render::form(dialog.form()));

    let project = dialog.submit().await?;
    println!("Saved project #{} ({})", project.id, project.name);
    Ok(())
}

fn drain_notices(rx: &mut broadcast::Receiver<Notice>) {
    while let Ok(notice) = rx.try_recv() {
        eprintln!("{}", render::notice(&notice));
    }
}
