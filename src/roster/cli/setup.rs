use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Returns the version string, with the git hash appended for non-release builds.
/// Format: "0.3.2" for releases, "0.3.2@abc1234" for dev builds
fn get_version() -> &'static str {
    const VERSION: &str = env!("CARGO_PKG_VERSION");
    const GIT_HASH: &str = env!("GIT_HASH");
    const IS_RELEASE: &str = env!("IS_RELEASE");

    use std::sync::OnceLock;
    static VERSION_STRING: OnceLock<String> = OnceLock::new();

    VERSION_STRING.get_or_init(|| {
        if IS_RELEASE == "true" || GIT_HASH.is_empty() {
            VERSION.to_string()
        } else {
            format!("{}@{}", VERSION, GIT_HASH)
        }
    })
}

#[derive(Parser, Debug)]
#[command(name = "roster", bin_name = "roster", version = get_version())]
#[command(about = "Student roster manager", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Verbose output (debug logging on stderr)
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create the roster database if needed
    Init,

    /// List all records
    #[command(alias = "ls")]
    List,

    /// Add a record
    Add {
        first_name: String,
        last_name: String,
        department: String,
        major: String,
        email: String,

        /// Profile image reference
        #[arg(long)]
        image: Option<String>,
    },

    /// Change fields of a record
    #[command(alias = "e")]
    Edit {
        id: i64,

        #[arg(long = "first")]
        first_name: Option<String>,

        #[arg(long = "last")]
        last_name: Option<String>,

        #[arg(long)]
        department: Option<String>,

        #[arg(long)]
        major: Option<String>,

        #[arg(long)]
        email: Option<String>,

        #[arg(long)]
        image: Option<String>,
    },

    /// Delete a record
    #[command(alias = "rm")]
    Delete { id: i64 },

    /// Import records from a CSV file (all or nothing)
    Import { file: PathBuf },

    /// Export records as CSV
    Export {
        /// Output file, or "-" for stdout (default: timestamped file in the current directory)
        #[arg(short, long)]
        output: Option<String>,
    },

    /// Show record counts by major and department
    Report,

    /// Upload a profile image and attach it to a record
    Attach { id: i64, file: PathBuf },

    /// Get or set configuration
    Config {
        /// Configuration key (e.g., retry-attempts)
        key: Option<String>,

        /// Value to set (if omitted, prints current value)
        value: Option<String>,
    },

    /// Manage the signed-in session
    Session {
        #[command(subcommand)]
        action: Option<SessionCommands>,
    },
}

#[derive(Subcommand, Debug)]
pub enum SessionCommands {
    /// Show the current session
    Show,

    /// Register and sign in
    Signup { user: String, password: String },

    /// Forget the saved session
    Logout,
}
