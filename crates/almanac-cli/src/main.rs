mod commands;
mod load;

use std::path::PathBuf;

use almanac_engine::{ComponentKind, DefaultZone};
use anyhow::Result;
use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "almanac")]
#[command(about = "List occurrences from calendar snapshots")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Zone for floating times and for "today": UTC, +HH:MM or a zone name
    #[arg(long, global = true, default_value = "UTC")]
    zone: DefaultZone,

    /// Resolve zone names the calendars do not define through the IANA database
    #[arg(long, global = true)]
    system_zones: bool,

    /// Only list components of this kind
    #[arg(long, global = true, value_enum)]
    kind: Option<KindArg>,

    /// Use this date as today (YYYY-MM-DD)
    #[arg(long, global = true)]
    today: Option<NaiveDate>,

    /// Print occurrences as a JSON array
    #[arg(long, global = true)]
    json: bool,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Occurrences happening today
    Today {
        /// Snapshot files or directories of *.json snapshots
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },

    /// Occurrences in the coming days, starting tomorrow
    Upcoming {
        /// Snapshot files or directories of *.json snapshots
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Window end, in days from today
        #[arg(long, default_value = "7")]
        days: u32,
    },

    /// Occurrences in an explicit range
    Range {
        /// Snapshot files or directories of *.json snapshots
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Range start: YYYY-MM-DD or YYYY-MM-DDTHH:MM[:SS][Z]
        #[arg(long)]
        from: String,

        /// Range end (exclusive), same formats as --from
        #[arg(long)]
        to: String,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum KindArg {
    Event,
    Todo,
    Journal,
}

impl From<KindArg> for ComponentKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Event => ComponentKind::Event,
            KindArg::Todo => ComponentKind::Todo,
            KindArg::Journal => ComponentKind::Journal,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("almanac_engine={log_level},almanac={log_level}").into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let settings = commands::Settings {
        zone: cli.zone,
        system_zones: cli.system_zones,
        kind: cli.kind.map(ComponentKind::from),
        today: cli.today,
        json: cli.json,
    };

    match cli.command {
        Commands::Today { paths } => commands::today_command(&settings, &paths),
        Commands::Upcoming { paths, days } => commands::upcoming_command(&settings, &paths, days),
        Commands::Range { paths, from, to } => commands::range_command(&settings, &paths, &from, &to),
    }
}
