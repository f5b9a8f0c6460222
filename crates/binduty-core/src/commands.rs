use std::io::{self, Write};

use anyhow::anyhow;
use chrono::{NaiveDate, Weekday};
use tracing::{debug, info, instrument};

use crate::calendar::month_start;
use crate::cli::Command;
use crate::datetime::parse_month_expr;
use crate::render::Renderer;
use crate::rotation::{RotationConfig, next_occurrences};

/// Runs one view against `config` as of `today`.
#[instrument(skip(config, renderer, out))]
pub fn dispatch<W: Write>(
    config: &RotationConfig,
    renderer: &Renderer,
    out: &mut W,
    command: &Command,
    today: NaiveDate,
) -> anyhow::Result<()> {
    debug!(?command, %today, "dispatching command");

    match command {
        Command::Today => renderer.print_today(out, config, today),
        Command::Upcoming { count } => {
            let occurrences: Vec<_> = next_occurrences(config, today, *count).collect();
            renderer.print_occurrences(out, &occurrences, today)
        }
        Command::Print => renderer.print_sheet(out, config, today),
        Command::Lookup { query } => renderer.print_lookup(out, config, query, today),
        Command::Calendar {
            month,
            tenant,
            monday,
        } => cmd_calendar(config, renderer, out, month.as_deref(), tenant.as_deref(), *monday, today),
        Command::Export { count } => {
            let occurrences: Vec<_> = next_occurrences(config, today, *count).collect();
            renderer.print_export(out, config, &occurrences)
        }
        Command::Tenants => renderer.print_roster(out, config),
    }
}

fn cmd_calendar<W: Write>(
    config: &RotationConfig,
    renderer: &Renderer,
    out: &mut W,
    month: Option<&str>,
    tenant: Option<&str>,
    monday: bool,
    today: NaiveDate,
) -> anyhow::Result<()> {
    let month = match month {
        Some(expr) => parse_month_expr(expr, today)?,
        None => month_start(today),
    };

    if let Some(id) = tenant
        && config.participant(id).is_none()
    {
        let known = config
            .participants()
            .iter()
            .map(|p| p.id.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        return Err(anyhow!("unknown tenant: {id} (known: {known})"));
    }

    let week_start = if monday { Weekday::Mon } else { Weekday::Sun };
    info!(%month, ?tenant, "rendering month");
    renderer.print_month(out, config, month, today, tenant, week_start)
}

/// Same as [`dispatch`], writing to stdout.
pub fn dispatch_stdout(
    config: &RotationConfig,
    renderer: &Renderer,
    command: &Command,
    today: NaiveDate,
) -> anyhow::Result<()> {
    let mut out = io::stdout().lock();
    dispatch(config, renderer, &mut out, command, today)?;
    out.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::{Locale, NaiveDate, Weekday};

    use super::dispatch;
    use crate::cli::Command;
    use crate::render::Renderer;
    use crate::rotation::{Participant, RotationConfig};

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    fn run(command: Command, today: NaiveDate) -> anyhow::Result<String> {
        let tenants = ["Basser", "Berman", "Galet", "Leshinsky", "Vale"]
            .into_iter()
            .map(|name| Participant::new(name.to_lowercase(), name))
            .collect();
        let config = RotationConfig::new(tenants, Weekday::Wed, ymd(2025, 8, 13))?;
        let renderer = Renderer::plain(Locale::en_US);
        let mut buf = Vec::new();
        dispatch(&config, &renderer, &mut buf, &command, today)?;
        Ok(String::from_utf8(buf)?)
    }

    #[test]
    fn upcoming_lists_requested_count() {
        let text = run(Command::Upcoming { count: 3 }, ymd(2025, 8, 14)).expect("upcoming");
        let rows: Vec<&str> = text.lines().skip(2).collect();
        assert_eq!(rows.len(), 3);
        assert!(rows[0].contains("Wed, Aug 20") && rows[0].contains("Berman"));
        assert!(rows[2].contains("Wed, Sep 3") && rows[2].contains("Leshinsky"));
    }

    #[test]
    fn calendar_defaults_to_current_month() {
        let text = run(
            Command::Calendar {
                month: None,
                tenant: Some("vale".to_string()),
                monday: true,
            },
            ymd(2025, 9, 2),
        )
        .expect("calendar");
        assert!(text.starts_with("September 2025\n"));
        assert!(text.lines().nth(1).is_some_and(|line| line.starts_with("Mo")));
        assert!(text.contains("Wed, Sep 10  Vale"));
    }

    #[test]
    fn calendar_rejects_unknown_tenant() {
        let err = run(
            Command::Calendar {
                month: Some("2025-10".to_string()),
                tenant: Some("ghost".to_string()),
                monday: false,
            },
            ymd(2025, 9, 2),
        )
        .expect_err("unknown tenant");
        assert!(err.to_string().contains("unknown tenant: ghost"));
    }
}
