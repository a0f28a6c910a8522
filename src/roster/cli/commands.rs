//! # CLI Layer
//!
//! This module is **one possible UI client** for roster, not the application
//! itself. It is the only place that knows about stdout, stderr, environment
//! variables and exit codes.
//!
//! ## Responsibilities
//!
//! 1. **Argument Parsing**: shell arguments to typed commands via clap
//! 2. **Context Setup**: home directory, config, session and store
//! 3. **API Dispatch**: call the matching `RosterApi` method
//! 4. **Output Formatting**: `CmdResult` to terminal output
//!
//! ## Environment
//!
//! - `ROSTER_HOME`: directory holding `config.json`, `session.json`, the
//!   default database and blobs. Defaults to the platform data directory.
//! - `ROSTER_DB`: database file, overriding the configured path.
//! - `RUST_LOG`: tracing filter; `-v` defaults it to `roster=debug`.

use super::print::{
    print_config, print_counts, print_messages, print_records, print_session,
};
use super::setup::{Cli, Commands, SessionCommands};
use chrono::Local;
use clap::Parser;
use directories::ProjectDirs;
use roster::api::{ConfigAction, MessageLevel, RosterApi, RosterPaths};
use roster::blob::DirBlobStore;
use roster::commands::RecordPatch;
use roster::config::RosterConfig;
use roster::error::{Result, RosterError};
use roster::model::{RecordDraft, RecordId};
use roster::session::{Privileges, Session, SessionStore};
use roster::store::retry::RetryingStore;
use roster::store::sqlite::SqliteStore;
use roster::upload::Uploader;
use roster::viewmodel::{RosterChange, RosterObserver, RosterViewModel};
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const UPLOAD_POLL_INTERVAL: Duration = Duration::from_millis(20);

type ProductionStore = RetryingStore<SqliteStore>;

struct AppContext {
    api: RosterApi<ProductionStore>,
    config: RosterConfig,
    home: PathBuf,
    sessions: SessionStore,
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let mut ctx = init_context()?;

    match cli.command {
        Some(Commands::Init) => handle_init(&mut ctx),
        Some(Commands::List) | None => handle_list(&ctx),
        Some(Commands::Add {
            first_name,
            last_name,
            department,
            major,
            email,
            image,
        }) => {
            let draft = RecordDraft::new(first_name, last_name, department, major, email)
                .with_image(image.unwrap_or_default());
            handle_add(&mut ctx, draft)
        }
        Some(Commands::Edit {
            id,
            first_name,
            last_name,
            department,
            major,
            email,
            image,
        }) => {
            let patch = RecordPatch {
                first_name,
                last_name,
                department,
                major,
                email,
                image_ref: image,
            };
            handle_edit(&mut ctx, id, patch)
        }
        Some(Commands::Delete { id }) => handle_delete(&mut ctx, id),
        Some(Commands::Import { file }) => handle_import(&mut ctx, file),
        Some(Commands::Export { output }) => handle_export(&ctx, output),
        Some(Commands::Report) => handle_report(&ctx),
        Some(Commands::Attach { id, file }) => handle_attach(ctx, id, file),
        Some(Commands::Config { key, value }) => handle_config(&ctx, key, value),
        Some(Commands::Session { action }) => {
            handle_session(&ctx, action.unwrap_or(SessionCommands::Show))
        }
    }
}

fn init_tracing(verbose: bool) {
    let default_filter = if verbose { "roster=debug" } else { "roster=warn" };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn resolve_home() -> Result<PathBuf> {
    if let Some(home) = std::env::var_os("ROSTER_HOME") {
        return Ok(PathBuf::from(home));
    }
    ProjectDirs::from("edu", "roster", "roster")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .ok_or_else(|| RosterError::Config("Could not determine data directory".to_string()))
}

fn local_session() -> Session {
    let user = std::env::var("USER").unwrap_or_else(|_| "local".to_string());
    Session::new(user, Privileges::User)
}

fn init_context() -> Result<AppContext> {
    let home = resolve_home()?;
    let config = RosterConfig::load(&home)?;
    let db_path = std::env::var_os("ROSTER_DB")
        .map(PathBuf::from)
        .unwrap_or_else(|| config.database_path(&home));
    debug!(home = %home.display(), db = %db_path.display(), "resolved paths");

    let sessions = SessionStore::new(&home);
    let session = match sessions.load() {
        Ok(saved) => saved.unwrap_or_else(local_session),
        Err(e) => {
            warn!(error = %e, "ignoring unreadable session file");
            local_session()
        }
    };

    let store = RetryingStore::new(SqliteStore::new(db_path), config.retry_policy());
    let api = RosterApi::new(store, RosterPaths::new(&home), session);

    Ok(AppContext {
        api,
        config,
        home,
        sessions,
    })
}

fn handle_init(ctx: &mut AppContext) -> Result<()> {
    let result = ctx.api.init()?;
    print_messages(&result.messages);
    Ok(())
}

fn handle_list(ctx: &AppContext) -> Result<()> {
    let result = ctx.api.list()?;
    print_records(&result.listed_records);
    print_messages(&result.messages);
    Ok(())
}

fn handle_add(ctx: &mut AppContext, draft: RecordDraft) -> Result<()> {
    let result = ctx.api.add(&draft)?;
    print_messages(&result.messages);
    Ok(())
}

fn handle_edit(ctx: &mut AppContext, id: RecordId, patch: RecordPatch) -> Result<()> {
    let result = ctx.api.patch(id, &patch)?;
    print_messages(&result.messages);
    Ok(())
}

fn handle_delete(ctx: &mut AppContext, id: RecordId) -> Result<()> {
    let result = ctx.api.delete(id)?;
    print_messages(&result.messages);
    Ok(())
}

fn handle_import(ctx: &mut AppContext, file: PathBuf) -> Result<()> {
    let text = fs::read_to_string(&file)?;
    let result = ctx.api.import(&text)?;
    print_messages(&result.messages);
    Ok(())
}

fn handle_export(ctx: &AppContext, output: Option<String>) -> Result<()> {
    let result = ctx.api.export()?;
    let csv = result.csv.unwrap_or_default();

    // stdout carries only the CSV
    if output.as_deref() == Some("-") {
        print!("{}", csv);
        return Ok(());
    }

    let path = output.map(PathBuf::from).unwrap_or_else(|| {
        PathBuf::from(format!(
            "roster-{}.csv",
            Local::now().format("%Y-%m-%d_%H-%M-%S")
        ))
    });
    fs::write(&path, csv)?;
    print_messages(&result.messages);
    println!("Written to {}", path.display());
    Ok(())
}

fn handle_report(ctx: &AppContext) -> Result<()> {
    let result = ctx.api.report()?;
    if let Some(counts) = &result.counts {
        print_counts(counts);
    }
    print_messages(&result.messages);
    Ok(())
}

/// Prints upload progress on stderr and non-error status lines on stdout.
/// Errors are left to `main`.
struct TerminalObserver;

impl RosterObserver for TerminalObserver {
    fn changed(&mut self, change: &RosterChange) {
        match change {
            RosterChange::UploadProgress(p) => {
                eprint!("\rUploading… {:>3.0}%", p * 100.0);
                if *p >= 1.0 {
                    eprintln!();
                }
            }
            RosterChange::Status(message) if message.level != MessageLevel::Error => {
                print_messages(std::slice::from_ref(message));
            }
            _ => {}
        }
    }
}

fn handle_attach(ctx: AppContext, id: RecordId, file: PathBuf) -> Result<()> {
    let AppContext {
        api, config, home, ..
    } = ctx;
    let session = api.session().clone();
    session.require_write("attach images")?;

    let mut vm = RosterViewModel::new(api.into_store(), session, TerminalObserver)
        .with_debounce(config.debounce());
    vm.load()?;
    let Some(index) = vm.index_of(id) else {
        return Err(RosterError::NotFound(id));
    };
    vm.select(Some(index));

    let runtime = tokio::runtime::Runtime::new()?;
    let uploader = Uploader::new(Arc::new(DirBlobStore::new(config.blob_dir(&home))));
    vm.attach_image(uploader.start(runtime.handle(), file));

    let outcome = loop {
        if let Some(outcome) = vm.poll_upload() {
            break outcome;
        }
        std::thread::sleep(UPLOAD_POLL_INTERVAL);
    };
    outcome?;
    vm.commit_edit()
}

fn handle_config(ctx: &AppContext, key: Option<String>, value: Option<String>) -> Result<()> {
    let show_all = key.is_none();
    let action = match (key, value) {
        (None, _) => ConfigAction::ShowAll,
        (Some(k), None) => ConfigAction::ShowKey(k),
        (Some(k), Some(v)) => ConfigAction::Set(k, v),
    };

    let result = ctx.api.config(action)?;
    if show_all {
        if let Some(config) = &result.config {
            print_config(config);
        }
    }
    print_messages(&result.messages);
    Ok(())
}

fn handle_session(ctx: &AppContext, action: SessionCommands) -> Result<()> {
    match action {
        SessionCommands::Show => {
            match ctx.sessions.load()? {
                Some(session) => print_session(&session),
                None => {
                    print_session(ctx.api.session());
                    println!("No saved session; using the local user.");
                }
            }
            Ok(())
        }
        SessionCommands::Signup { user, password } => {
            let session = Session::sign_up(&user, &password)?;
            ctx.sessions.save(&session)?;
            println!("Signed in as {}.", session.user_name);
            Ok(())
        }
        SessionCommands::Logout => {
            ctx.sessions.clear()?;
            println!("Signed out.");
            Ok(())
        }
    }
}
