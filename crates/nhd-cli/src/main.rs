use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};

mod commands;

#[derive(Parser)]
#[command(name = "nhd")]
#[command(about = "Dashboard state engine CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute layered config hash + print canonical JSON
    ConfigHash {
        /// Paths in merge order (base -> local -> ...)
        #[arg(required = true)]
        paths: Vec<String>,
    },

    /// Validate layered config and report keys nothing reads
    ConfigCheck {
        /// Paths in merge order
        #[arg(required = true)]
        paths: Vec<String>,

        /// Fail when unused keys are present
        #[arg(long, default_value_t = false)]
        strict: bool,
    },

    /// Decode a captured bridge payload and show what the engine would make of it
    Inspect {
        #[arg(long, value_enum)]
        kind: InspectKind,

        /// Path to a JSON file holding one event payload
        #[arg(long)]
        file: String,
    },

    /// Local trade history ledger
    History {
        #[command(subcommand)]
        cmd: HistoryCmd,
    },

    /// Connect to the bridge and print a summary line on every state change
    Watch {
        /// Layered config paths in merge order (default: NHD_CONFIG_PATHS)
        #[arg(long = "config")]
        config_paths: Vec<String>,

        /// Stop after this many updates
        #[arg(long)]
        max_updates: Option<u64>,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum InspectKind {
    State,
    Prices,
    Account,
}

#[derive(Subcommand)]
enum HistoryCmd {
    /// Print stored closed-trade records, newest first
    Show {
        #[arg(long)]
        state_dir: String,

        /// Only the newest N records
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Erase the stored history. Requires --yes.
    Clear {
        #[arg(long)]
        state_dir: String,

        /// Acknowledge the erase (there is no undo)
        #[arg(long, default_value_t = false)]
        yes: bool,

        /// Also erase the telemetry log
        #[arg(long, default_value_t = false)]
        logs: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Silent if the file does not exist.
    let _ = dotenvy::from_filename(".env.local");

    let cli = Cli::parse();

    match cli.cmd {
        Commands::ConfigHash { paths } => commands::config::hash(&paths)?,
        Commands::ConfigCheck { paths, strict } => commands::config::check(&paths, strict)?,
        Commands::Inspect { kind, file } => commands::inspect::run(kind, &file)?,
        Commands::History { cmd } => match cmd {
            HistoryCmd::Show { state_dir, limit } => commands::history::show(&state_dir, limit)?,
            HistoryCmd::Clear {
                state_dir,
                yes,
                logs,
            } => commands::history::clear(&state_dir, yes, logs)?,
        },
        Commands::Watch {
            config_paths,
            max_updates,
        } => {
            commands::init_tracing();
            commands::watch::run(config_paths, max_updates).await?
        }
    }

    Ok(())
}
