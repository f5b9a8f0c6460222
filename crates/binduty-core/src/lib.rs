pub mod calendar;
pub mod cli;
pub mod commands;
pub mod config;
pub mod datetime;
pub mod grid;
pub mod render;
pub mod rotation;

use std::ffi::OsString;

use anyhow::Context;
use chrono::Utc;
use clap::Parser;
use tracing::{
  debug,
  info
};

pub use crate::grid::{
  CalendarCell,
  build_month_grid
};
pub use crate::rotation::{
  Participant,
  RotationConfig,
  assignee_for_date,
  next_for_participant,
  next_occurrences
};

#[tracing::instrument(skip_all)]
pub fn run(
  raw_args: Vec<OsString>
) -> anyhow::Result<()> {
  let cli =
    cli::GlobalCli::parse_from(raw_args);

  cli::init_tracing(
    cli.verbose,
    cli.quiet
  )?;

  info!(
    verbose = cli.verbose,
    quiet = cli.quiet,
    "starting binduty"
  );

  let settings = config::Settings::load(
    cli.config.as_deref(),
    cli
      .rc_overrides
      .into_iter()
      .map(|kv| (kv.key, kv.value))
  )
  .context("failed to load roster")?;
  debug!(
    source = ?settings.source,
    tenants = settings.rotation.participants().len(),
    "roster ready"
  );

  let tz = datetime::resolve_timezone(
    settings.timezone.as_deref()
  );
  let clock_today =
    datetime::today_in(tz.as_ref(), Utc::now());
  let today = match cli.today.as_deref() {
    | Some(expr) => {
      datetime::parse_date_expr(
        expr,
        clock_today
      )
      .context("invalid --today")?
    }
    | None => clock_today
  };

  let renderer = render::Renderer::new(
    &settings,
    calendar::runtime_locale()
  );
  let command = cli
    .command
    .unwrap_or(cli::Command::Today);

  commands::dispatch_stdout(
    &settings.rotation,
    &renderer,
    &command,
    today
  )?;

  info!("done");
  Ok(())
}
