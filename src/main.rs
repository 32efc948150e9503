use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use brainscan::{
    AppState, ClientError, Config,
    models::scan::MlResults,
    models::session::Session,
    models::starred::StarredEntry,
    models::timestamp,
    routes::{Navigation, View},
    services::editor::{NoteEditor, NoteState},
};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    /// Backend base URL, overriding BRAINSCAN_API_URL.
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Local store file, overriding BRAINSCAN_STORE_PATH.
    #[arg(long, global = true)]
    store: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create an account and log in.
    Register {
        name: String,
        email: String,
        #[arg(long, env = "BRAINSCAN_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Log in.
    Login {
        email: String,
        #[arg(long, env = "BRAINSCAN_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Log out.
    Logout,
    /// Show who is logged in.
    Whoami,
    /// Upload a scan for analysis.
    Upload { path: PathBuf },
    /// List past scans.
    History,
    /// Show one scan.
    Show {
        image_id: String,
        /// Write the decoded image here.
        #[arg(long)]
        save: Option<PathBuf>,
    },
    /// Manage starred scans.
    Starred {
        #[command(subcommand)]
        action: StarredCommand,
    },
    /// Dump the backend's diagnostics for the current user.
    Debug,
}

#[derive(Subcommand, Debug)]
enum StarredCommand {
    /// List starred scans.
    List,
    /// Star a scan with a note.
    Add { image_id: String, note: String },
    /// Change the note on a starred scan.
    Edit { image_id: String, note: String },
    /// Unstar a scan.
    Remove { image_id: String },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let mut config = Config::from_env()?;
    if let Some(api_url) = &cli.api_url {
        config = config.with_api_url(api_url)?;
    }
    if let Some(store) = cli.store {
        config = config.with_store_path(store);
    }
    tracing::debug!("✅ Configuration loaded: {:?}", config);

    let state = AppState::new(&config).context("Failed to initialize client")?;

    match run(&state, cli.command).await {
        Ok(()) => Ok(()),
        Err(e) if e.requires_login() => {
            eprintln!("🔒 {}: run `brainscan login <email>` first", e.user_message());
            std::process::exit(2);
        }
        Err(e) => {
            eprintln!("❌ {}", e.user_message());
            std::process::exit(1);
        }
    }
}

/// The session for a protected view, or `NotAuthenticated` when the guard
/// redirects.
fn enter(state: &AppState, view: View) -> brainscan::Result<Session> {
    match state.navigate(view.path()) {
        Navigation::Render(_, Some(session)) => Ok(session),
        Navigation::Render(_, None) | Navigation::Redirect(_) => Err(ClientError::NotAuthenticated),
    }
}

async fn run(state: &AppState, command: Command) -> brainscan::Result<()> {
    match command {
        Command::Register {
            name,
            email,
            password,
        } => {
            let session = state.session.register(&name, &email, &password).await?;
            println!("✅ Registered and logged in as {} <{}>", session.user.name, session.user.email);
        }

        Command::Login { email, password } => {
            let session = state.session.login(&email, &password).await?;
            println!("✅ Logged in as {} <{}>", session.user.name, session.user.email);
        }

        Command::Logout => {
            state.logout()?;
            println!("👋 Logged out");
        }

        Command::Whoami => match state.session.current_session() {
            Some(session) => println!(
                "{} <{}> (id {})",
                session.user.name,
                session.user.email,
                session.user_id()
            ),
            None => println!("Not logged in"),
        },

        Command::Upload { path } => {
            let session = enter(state, View::Upload)?;
            let result = state.scans.upload(session.user_id(), &path).await?;

            if let Some(image_id) = &result.image_id {
                println!("Image id: {}", image_id);
            }
            print_results(&result.ml_results);
        }

        Command::History => {
            let session = enter(state, View::History)?;
            let history = state.scans.history(session.user_id()).await?;

            if let Err(e) = state.starred.list(session.user_id()).await {
                tracing::warn!("Could not load starred images: {}", e);
            }

            if history.is_empty() {
                println!("No scans yet");
            }
            for record in &history {
                let marker = if state.starred.is_starred(&record.image_id) { "⭐" } else { "  " };
                let uploaded = record
                    .upload_time
                    .as_ref()
                    .map(timestamp::format)
                    .unwrap_or_else(|| "-".to_string());
                println!(
                    "{} {}  {}  {}  {}",
                    marker, record.image_id, uploaded, record.filename, record.ml_results.prediction
                );
            }
        }

        Command::Show { image_id, save } => {
            let session = enter(state, View::History)?;
            let record = state.scans.image(session.user_id(), &image_id).await?;

            println!("{} ({})", record.image_id, record.filename);
            print_results(&record.ml_results);
            if record.heatmap().is_some() {
                println!("Heatmap: available");
            }

            if let Some(path) = save {
                let bytes = record.image_bytes()?.ok_or_else(|| {
                    ClientError::Validation(format!("{} has no image data", record.image_id))
                })?;
                tokio::fs::write(&path, bytes).await?;
                println!("Saved image to {}", path.display());
            }
        }

        Command::Starred { action } => {
            let session = enter(state, View::Starred)?;
            starred(state, session.user_id(), action).await?;
        }

        Command::Debug => {
            let session = state.require_session()?;
            let report = state.scans.debug(session.user_id()).await?;
            println!("{}", report.to_pretty_string());
        }
    }

    Ok(())
}

async fn starred(state: &AppState, user_id: &str, action: StarredCommand) -> brainscan::Result<()> {
    match action {
        StarredCommand::List => {
            let starred = state.starred.list(user_id).await?;
            if starred.is_empty() {
                println!("No starred scans");
            }
            for entry in starred.values() {
                print_entry(entry);
            }
        }

        StarredCommand::Add { image_id, note } => {
            state.starred.list(user_id).await?;
            if !state.starred.is_starred(&image_id) && state.starred.known_scan(user_id, &image_id).is_none() {
                if let Err(e) = state.scans.image(user_id, &image_id).await {
                    tracing::warn!("Starring {} without its scan record: {}", image_id, e);
                }
            }

            let mut editor = NoteEditor::for_image(&state.starred, &image_id);
            if matches!(editor.state(), NoteState::Starred { .. }) {
                println!("{} is already starred, updating its note", image_id);
            }
            save_note(&mut editor, state, user_id, note).await?;
        }

        StarredCommand::Edit { image_id, note } => {
            state.starred.list(user_id).await?;

            let mut editor = NoteEditor::for_image(&state.starred, &image_id);
            if editor.state() == &NoteState::Unstarred {
                return Err(ClientError::Validation(format!("{} is not starred", image_id)));
            }
            save_note(&mut editor, state, user_id, note).await?;
        }

        StarredCommand::Remove { image_id } => {
            state.starred.remove(user_id, &image_id).await?;
            println!("Removed star from {}", image_id);
        }
    }

    Ok(())
}

async fn save_note(editor: &mut NoteEditor, state: &AppState, user_id: &str, note: String) -> brainscan::Result<()> {
    editor.begin();
    editor.set_draft(note);
    if !editor.can_save() {
        editor.cancel();
        return Err(ClientError::Validation("Note cannot be empty".to_string()));
    }

    let entry = editor.save(&state.starred, user_id).await?;
    println!("⭐ Starred {}", entry.image_id);
    print_entry(&entry);
    Ok(())
}

fn print_results(results: &MlResults) {
    println!("Result: {}", results.prediction);
    if let Some(confidence) = results.confidence {
        println!("Confidence: {:.1}%", confidence * 100.0);
    }
    if let Some(tumor_type) = &results.tumor_type {
        println!("Tumor type: {}", tumor_type);
    }
    if !results.precautions.is_empty() {
        println!("Precautions:");
        for item in &results.precautions {
            println!("  - {}", item);
        }
    }
    if !results.treatment_options.is_empty() {
        println!("Treatment options:");
        for item in &results.treatment_options {
            println!("  - {}", item);
        }
    }
}

fn print_entry(entry: &StarredEntry) {
    let verdict = entry
        .ml_results
        .as_ref()
        .map(|results| results.prediction.to_string())
        .unwrap_or_default();
    println!(
        "⭐ {}  starred {}  {}  {}",
        entry.image_id,
        timestamp::format(&entry.timestamp),
        entry.filename,
        verdict
    );
    println!("   {}", entry.note);
}
