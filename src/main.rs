use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use gitport::commands::migrate::MigrateArgs;
use gitport::model::MigrationStatus;
use gitport::output::Format;

fn version_string() -> &'static str {
    let version = match gitport::build_info::git_sha() {
        Some(sha) => format!("{} ({sha})", env!("CARGO_PKG_VERSION")),
        None => env!("CARGO_PKG_VERSION").to_string(),
    };
    Box::leak(version.into_boxed_str())
}

#[derive(Parser)]
#[command(
    name = "gitport",
    version = version_string(),
    about = "Mirror Bitbucket repositories to GitHub with resumable state"
)]
struct Cli {
    /// Output format
    #[arg(long, global = true, value_enum, default_value = "json")]
    format: Format,
    /// Shorthand for --format pretty
    #[arg(long, global = true, hide = true)]
    pretty: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct SelectionArgs {
    /// Workspaces to enumerate (repeatable; defaults to every membership)
    #[arg(long = "workspace")]
    workspaces: Vec<String>,
    /// Specific repositories as workspace/slug (repeatable)
    #[arg(long = "repo")]
    repos: Vec<String>,
    /// Destination override: workspace/slug=name or workspace/slug=owner/name (repeatable)
    #[arg(long = "rename")]
    renames: Vec<String>,
    /// Default destination owner (user or org); overrides GITHUB_OWNER
    #[arg(long)]
    owner: Option<String>,
    /// Rewrite large-file history into LFS on the destination
    #[arg(long)]
    lfs: bool,
    /// Blob size threshold for the LFS rewrite (e.g. 5MB)
    #[arg(long)]
    lfs_threshold: Option<String>,
    /// Re-migrate these workspace/slug keys even if already succeeded (repeatable)
    #[arg(long = "force")]
    force: Vec<String>,
    /// Authorize pushing into a non-empty destination for these keys (repeatable)
    #[arg(long = "overwrite-non-empty")]
    overwrite_non_empty: Vec<String>,
    /// State file path (defaults to ./migration_state.json)
    #[arg(long)]
    state: Option<PathBuf>,
    /// Report file path (defaults to ./migration_report.md)
    #[arg(long)]
    report: Option<PathBuf>,
}

impl SelectionArgs {
    fn into_migrate_args(self, dry_run: bool) -> MigrateArgs {
        MigrateArgs {
            workspaces: self.workspaces,
            repos: self.repos,
            renames: self.renames,
            owner: self.owner,
            lfs: self.lfs,
            lfs_threshold: self.lfs_threshold,
            dry_run,
            force: self.force,
            overwrite_non_empty: self.overwrite_non_empty,
            state: self.state,
            report: self.report,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Mirror the selected repositories to GitHub
    Migrate {
        #[command(flatten)]
        selection: SelectionArgs,
        /// Preview only: existence checks, no clone or push
        #[arg(long)]
        dry_run: bool,
    },
    /// Preview the migration without cloning or pushing
    Plan {
        #[command(flatten)]
        selection: SelectionArgs,
    },
    /// Show recorded migration state
    Status {
        /// Filter by status
        #[arg(long, value_enum)]
        status: Option<MigrationStatus>,
        /// State file path (defaults to ./migration_state.json)
        #[arg(long)]
        state: Option<PathBuf>,
    },
    /// Repoint local clones' origins at the migrated repositories
    UpdateOrigins {
        /// Directory to scan for local repositories (defaults to .)
        #[arg(long)]
        root: Option<PathBuf>,
        /// State file path (defaults to ./migration_state.json)
        #[arg(long)]
        state: Option<PathBuf>,
        /// Fallback owner for repositories missing from the state
        #[arg(long)]
        owner: Option<String>,
        /// Apply the planned updates instead of only printing them
        #[arg(long)]
        apply: bool,
    },
    /// Write the markdown migration report from recorded state
    Report {
        /// State file path (defaults to ./migration_state.json)
        #[arg(long)]
        state: Option<PathBuf>,
        /// Output path (defaults to ./migration_report.md)
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

fn run(cli: Cli, format: Format) -> gitport::error::Result<()> {
    let cwd = std::env::current_dir()?;

    match cli.command {
        Commands::Migrate { selection, dry_run } => {
            gitport::commands::migrate::run(&cwd, selection.into_migrate_args(dry_run), format)
        }
        Commands::Plan { selection } => {
            gitport::commands::migrate::run(&cwd, selection.into_migrate_args(true), format)
        }
        Commands::Status { status, state } => {
            gitport::commands::status::run(&cwd, state, status, format)
        }
        Commands::UpdateOrigins {
            root,
            state,
            owner,
            apply,
        } => gitport::commands::update_origins::run(&cwd, root, state, owner, apply, format),
        Commands::Report { state, out } => {
            gitport::commands::report::run(&cwd, state, out, format)
        }
    }
}

fn main() {
    let cli = Cli::parse();
    let format = if cli.pretty {
        Format::Pretty
    } else {
        cli.format
    };
    if let Err(e) = run(cli, format) {
        match format {
            Format::Json => {
                eprintln!(
                    "{}",
                    serde_json::json!({
                        "error": e.code(),
                        "message": e.to_string()
                    })
                );
            }
            _ => eprintln!("error: {e}"),
        }
        std::process::exit(1);
    }
}
