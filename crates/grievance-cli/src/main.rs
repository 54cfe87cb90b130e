#![forbid(unsafe_code)]

mod cmd;
mod output;

use clap::{CommandFactory, Parser, Subcommand};
use cmd::AppContext;
use output::{OutputMode, resolve_output_mode};
use std::env;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "grv: complaint tracker for mosque management",
    long_about = None
)]
struct Cli {
    /// Enable verbose logging.
    #[arg(short, long)]
    verbose: bool,

    /// Emit JSON output instead of human-readable text.
    #[arg(long, global = true)]
    json: bool,

    /// Output format; overrides --json, FORMAT and `[ui] output`.
    #[arg(long, global = true, value_enum)]
    format: Option<OutputMode>,

    /// Data directory holding config.toml and the local cache (default: GRIEVANCE_HOME).
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(
        next_help_heading = "Setup",
        about = "Write a starter config.toml",
        long_about = "Write a default config.toml into the data directory.",
        after_help = "EXAMPLES:\n    # Create the config in the default data directory\n    grv init\n\n    # Start over\n    grv init --force"
    )]
    Init(cmd::init::InitArgs),

    #[command(
        next_help_heading = "Session",
        about = "Sign in",
        long_about = "Sign in with email and password. The email must be listed in [auth.users].",
        after_help = "EXAMPLES:\n    # Prompt for the password\n    grv login --email admin@example.org\n\n    # Non-interactive\n    GRIEVANCE_PASSWORD=secret grv login -e admin@example.org --json"
    )]
    Login(cmd::session::LoginArgs),

    #[command(
        next_help_heading = "Session",
        about = "Sign out",
        long_about = "End the saved session, locally and with the identity service.",
        after_help = "EXAMPLES:\n    grv logout"
    )]
    Logout,

    #[command(
        next_help_heading = "Session",
        about = "Show the signed-in user",
        after_help = "EXAMPLES:\n    grv whoami\n\n    grv whoami --json"
    )]
    Whoami,

    #[command(
        next_help_heading = "Read",
        about = "List complaints",
        long_about = "List complaints newest first, with search, filters and pagination.",
        after_help = "EXAMPLES:\n    # First page\n    grv list\n\n    # High priority complaints still pending this month\n    grv list --priority high --status ditunda --period month\n\n    # Search and page\n    grv list -s lampu --page 2 --limit 5"
    )]
    List(cmd::list::ListArgs),

    #[command(
        next_help_heading = "Read",
        about = "Show one complaint",
        after_help = "EXAMPLES:\n    grv show BKM-1736920000000-ab12cd34e\n\n    grv show BKM-1736920000000-ab12cd34e --json"
    )]
    Show(cmd::show::ShowArgs),

    #[command(
        next_help_heading = "Write",
        about = "Submit a new complaint",
        long_about = "Submit a new complaint. Reporter, category, priority and description are required.",
        after_help = "EXAMPLES:\n    grv add -r \"Pak Ahmad\" -c Sarana -p High -d \"Lampu teras mati\"\n\n    grv add -r Bu Siti -c Kebersihan -p Low -d \"Karpet kotor\" --assignee \"Ust. Ridho\" --cost 150000"
    )]
    Add(cmd::add::AddArgs),

    #[command(
        next_help_heading = "Write",
        about = "Edit a complaint",
        long_about = "Change fields of a complaint you created, or any complaint as admin.",
        after_help = "EXAMPLES:\n    grv edit BKM-1-x --priority high --resolution \"Ganti bohlam\"\n\n    grv edit BKM-1-x --status selesai --completed 2025-03-01"
    )]
    Edit(cmd::edit::EditArgs),

    #[command(
        next_help_heading = "Write",
        about = "Change a complaint's status",
        after_help = "EXAMPLES:\n    grv status BKM-1-x proses\n\n    grv status BKM-1-x selesai --completed 2025-03-01"
    )]
    Status(cmd::edit::StatusArgs),

    #[command(
        next_help_heading = "Write",
        about = "Delete a complaint",
        after_help = "EXAMPLES:\n    grv delete BKM-1-x"
    )]
    Delete(cmd::delete::DeleteArgs),

    #[command(
        next_help_heading = "Bulk",
        about = "Set the status of many complaints",
        long_about = "Set the status of selected complaints one by one, stopping at the first failure.",
        after_help = "EXAMPLES:\n    grv bulk-status selesai BKM-1-x BKM-2-y\n\n    # Everything pending this week\n    grv bulk-status proses --all-matching --status ditunda --period week"
    )]
    BulkStatus(cmd::bulk::BulkStatusArgs),

    #[command(
        next_help_heading = "Bulk",
        about = "Delete many complaints",
        long_about = "Delete selected complaints in one write. Nothing is deleted if any is not yours to delete.",
        after_help = "EXAMPLES:\n    grv bulk-delete BKM-1-x BKM-2-y\n\n    grv bulk-delete --all-matching -s duplikat"
    )]
    BulkDelete(cmd::bulk::BulkDeleteArgs),

    #[command(
        next_help_heading = "Reports",
        about = "Summary figures",
        after_help = "EXAMPLES:\n    grv stats\n\n    grv stats --json"
    )]
    Stats,

    #[command(
        next_help_heading = "Reports",
        about = "Export complaints",
        long_about = "Export the filtered view as CSV, JSON, a text report or a paginated table.",
        after_help = "EXAMPLES:\n    grv export csv -o keluhan.csv\n\n    # Monthly report saved as Laporan_Keluhan_<Month>_<Year>.txt\n    grv export txt --period month --save\n\n    grv export table --rows 20"
    )]
    Export(cmd::export::ExportArgs),

    #[command(
        next_help_heading = "Setup",
        about = "Refresh from the sheet",
        long_about = "Fetch the collection from the sheet and refresh the local cache.",
        after_help = "EXAMPLES:\n    grv sync"
    )]
    Sync,

    #[command(
        next_help_heading = "Setup",
        about = "Generate shell completions",
        after_help = "EXAMPLES:\n    grv completions bash > ~/.local/share/bash-completion/completions/grv"
    )]
    Completions(cmd::completions::CompletionsArgs),
}

fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_env("GRIEVANCE_LOG").unwrap_or_else(|_| {
        EnvFilter::new(if verbose || env::var("DEBUG").is_ok() {
            "grievance=debug,info"
        } else {
            "grievance=info,warn"
        })
    });

    let format = env::var("GRIEVANCE_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string());

    let registry = tracing_subscriber::registry().with(filter);

    match format.as_str() {
        "json" => {
            registry
                .with(fmt::layer().json().with_ansi(false).with_writer(std::io::stderr))
                .init();
        }
        _ => {
            registry
                .with(fmt::layer().compact().with_writer(std::io::stderr))
                .init();
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if cli.verbose {
        info!("Verbose mode enabled");
    }

    let data_dir = cli.data_dir.as_deref();

    // init must work even when the existing config is broken.
    if let Commands::Init(ref args) = cli.command {
        let dir = grievance_core::config::resolve_data_dir(data_dir)?;
        let output = resolve_output_mode(cli.format, cli.json, None);
        return cmd::init::run_init(args, &dir, output);
    }
    if let Commands::Completions(ref args) = cli.command {
        let mut command = Cli::command();
        return cmd::completions::run_completions(args.shell, &mut command);
    }

    let ctx = AppContext::load(data_dir, cli.format, cli.json)?;

    match cli.command {
        Commands::Login(ref args) => cmd::session::run_login(args, &ctx),
        Commands::Logout => cmd::session::run_logout(&ctx),
        Commands::Whoami => cmd::session::run_whoami(&ctx),
        Commands::List(ref args) => cmd::list::run_list(args, &ctx),
        Commands::Show(ref args) => cmd::show::run_show(args, &ctx),
        Commands::Add(ref args) => cmd::add::run_add(args, &ctx),
        Commands::Edit(ref args) => cmd::edit::run_edit(args, &ctx),
        Commands::Status(ref args) => cmd::edit::run_status(args, &ctx),
        Commands::Delete(ref args) => cmd::delete::run_delete(args, &ctx),
        Commands::BulkStatus(ref args) => cmd::bulk::run_bulk_status(args, &ctx),
        Commands::BulkDelete(ref args) => cmd::bulk::run_bulk_delete(args, &ctx),
        Commands::Stats => cmd::stats::run_stats(&ctx),
        Commands::Export(ref args) => cmd::export::run_export(args, &ctx),
        Commands::Sync => cmd::sync::run_sync(&ctx),
        Commands::Init(_) | Commands::Completions(_) => Ok(()),
    }
}
