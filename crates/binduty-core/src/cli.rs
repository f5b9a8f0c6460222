use std::io::IsTerminal;
use std::path::PathBuf;

use anyhow::anyhow;
use clap::{ArgAction, Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone)]
pub struct KeyVal {
    pub key: String,
    pub value: String,
}

impl std::str::FromStr for KeyVal {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (k, v) = s
            .split_once('=')
            .ok_or_else(|| anyhow!("expected KEY=VALUE, got: {s}"))?;
        Ok(Self {
            key: k.trim().to_string(),
            value: v.trim().to_string(),
        })
    }
}

#[derive(Parser, Debug, Clone)]
#[command(
    name = "binduty",
    version,
    about = "Weekly bin duty rotation for the house",
    disable_help_subcommand = true
)]
pub struct GlobalCli {
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[arg(short = 'q', long = "quiet", action = ArgAction::Count, global = true)]
    pub quiet: u8,

    /// Roster file to use instead of the default location.
    #[arg(long = "config", global = true)]
    pub config: Option<PathBuf>,

    #[arg(
        long = "rc",
        value_parser = clap::builder::ValueParser::new(|s: &str| s.parse::<KeyVal>()),
        action = ArgAction::Append,
        global = true
    )]
    pub rc_overrides: Vec<KeyVal>,

    /// Pretend today is this day (YYYY-MM-DD, tomorrow, +2w, ...).
    #[arg(long = "today", global = true)]
    pub today: Option<String>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Who has the bins today, or who is next.
    Today,
    /// The next few duty days.
    Upcoming {
        #[arg(short = 'n', long = "count", default_value_t = 8)]
        count: usize,
    },
    /// Twelve-week table sized for a quarter page.
    Print,
    /// Find tenants by name and show their next turn.
    Lookup {
        #[arg(default_value = "")]
        query: String,
    },
    /// Month calendar with duty days marked.
    Calendar {
        /// Month to show (YYYY-MM, +1m, ...). Defaults to this month.
        #[arg(long = "month")]
        month: Option<String>,
        /// Highlight this tenant's turns.
        #[arg(long = "tenant")]
        tenant: Option<String>,
        /// Start weeks on Monday instead of Sunday.
        #[arg(long = "monday")]
        monday: bool,
    },
    /// Upcoming duty days as JSON.
    Export {
        #[arg(short = 'n', long = "count", default_value_t = 12)]
        count: usize,
    },
    /// The roster in rotation order.
    Tenants,
}

pub fn init_tracing(verbose: u8, quiet: u8) -> anyhow::Result<()> {
    let default_level = if quiet >= 2 {
        "error"
    } else if quiet == 1 {
        "warn"
    } else if verbose >= 3 {
        "trace"
    } else if verbose == 2 {
        "debug"
    } else if verbose == 1 {
        "info"
    } else {
        "warn"
    };

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .map_err(|e| anyhow!("invalid RUST_LOG / log filter: {e}"))?;

    let init_result = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .with_level(true)
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .try_init();

    if let Err(err) = init_result {
        debug!(error = %err, "tracing subscriber already set, continuing");
    }

    Ok(())
}
