use std::io::{self, IsTerminal, Write};

use chrono::{Datelike, Locale, NaiveDate, Weekday};
use serde::Serialize;
use unicode_width::UnicodeWidthStr;

use crate::calendar::{
    format_display_date_in, format_month_title, format_weekday_name, is_same_calendar_day,
    weekday_headers,
};
use crate::config::Settings;
use crate::grid::{CalendarCell, build_month_grid_from};
use crate::rotation::{
    DEFAULT_HORIZON_DAYS, Occurrence, PRINT_OCCURRENCES, RotationConfig, assignee_for_date,
    assignment_for, next_for_participant, next_occurrences,
};

#[derive(Debug, Clone)]
pub struct Renderer {
    color: bool,
    locale: Locale,
}

#[derive(Debug, Serialize)]
struct ExportDoc<'a> {
    duty_weekday: String,
    anchor: NaiveDate,
    occurrences: &'a [Occurrence<'a>],
}

impl Renderer {
    pub fn new(settings: &Settings, locale: Locale) -> Self {
        Self {
            color: settings.color && io::stdout().is_terminal(),
            locale,
        }
    }

    /// No colour, regardless of the terminal.
    pub fn plain(locale: Locale) -> Self {
        Self {
            color: false,
            locale,
        }
    }

    fn date(&self, date: NaiveDate) -> String {
        format_display_date_in(date, self.locale)
    }

    #[tracing::instrument(skip(self, out, config))]
    pub fn print_today<W: Write>(
        &self,
        out: &mut W,
        config: &RotationConfig,
        today: NaiveDate,
    ) -> anyhow::Result<()> {
        let assignment = assignment_for(config, today);
        if let Some(participant) = assignment.participant {
            writeln!(
                out,
                "{}: {} has the bins today",
                self.date(today),
                self.paint(&participant.name, "1;32")
            )?;
            return Ok(());
        }

        writeln!(out, "{}: no bin duty today", self.date(today))?;
        if let Some(next) = next_occurrences(config, today, 1).next() {
            writeln!(
                out,
                "next up: {} on {}",
                self.paint(&next.participant.name, "1"),
                self.date(next.date)
            )?;
        }
        Ok(())
    }

    #[tracing::instrument(skip(self, out, occurrences))]
    pub fn print_occurrences<W: Write>(
        &self,
        out: &mut W,
        occurrences: &[Occurrence<'_>],
        today: NaiveDate,
    ) -> anyhow::Result<()> {
        let headers = vec!["Date".to_string(), "Tenant".to_string()];
        let rows = occurrences
            .iter()
            .map(|occ| {
                let date = self.date(occ.date);
                let date = if is_same_calendar_day(occ.date, today) {
                    self.paint(&date, "33")
                } else {
                    date
                };
                vec![date, occ.participant.name.clone()]
            })
            .collect();

        write_table(out, headers, rows)
    }

    /// Compact twelve-row sheet meant to be printed and pinned up.
    #[tracing::instrument(skip(self, out, config))]
    pub fn print_sheet<W: Write>(
        &self,
        out: &mut W,
        config: &RotationConfig,
        today: NaiveDate,
    ) -> anyhow::Result<()> {
        writeln!(
            out,
            "Bin duty: {}",
            format_weekday_name(config.duty_weekday(), self.locale)
        )?;
        writeln!(out)?;

        let headers = vec!["#".to_string(), "Date".to_string(), "Tenant".to_string()];
        let rows = next_occurrences(config, today, PRINT_OCCURRENCES)
            .enumerate()
            .map(|(idx, occ)| {
                vec![
                    (idx + 1).to_string(),
                    self.date(occ.date),
                    occ.participant.name.clone(),
                ]
            })
            .collect();

        write_table(out, headers, rows)
    }

    #[tracing::instrument(skip(self, out, config))]
    pub fn print_lookup<W: Write>(
        &self,
        out: &mut W,
        config: &RotationConfig,
        query: &str,
        today: NaiveDate,
    ) -> anyhow::Result<()> {
        let matches = config.search(query);
        if matches.is_empty() {
            writeln!(out, "no tenant matches {query:?}")?;
            return Ok(());
        }

        let headers = vec!["Id".to_string(), "Tenant".to_string(), "Next turn".to_string()];
        let rows = matches
            .into_iter()
            .map(|participant| {
                let next = next_for_participant(config, today, &participant.id, DEFAULT_HORIZON_DAYS)
                    .map(|date| self.date(date))
                    .unwrap_or_else(|| "-".to_string());
                vec![
                    self.paint(&participant.id, "33"),
                    participant.name.clone(),
                    next,
                ]
            })
            .collect();

        write_table(out, headers, rows)
    }

    #[tracing::instrument(skip(self, out, config))]
    pub fn print_roster<W: Write>(
        &self,
        out: &mut W,
        config: &RotationConfig,
    ) -> anyhow::Result<()> {
        let headers = vec!["#".to_string(), "Id".to_string(), "Tenant".to_string()];
        let rows = config
            .participants()
            .iter()
            .enumerate()
            .map(|(idx, p)| vec![(idx + 1).to_string(), p.id.clone(), p.name.clone()])
            .collect();
        write_table(&mut *out, headers, rows)?;
        writeln!(
            out,
            "\nrotates every {} from {}",
            format_weekday_name(config.duty_weekday(), self.locale),
            self.date(config.anchor())
        )?;
        Ok(())
    }

    /// Month view: six weeks of days, duty days tagged with the assignee's
    /// initials, the selected tenant's turns highlighted, then a list of the
    /// month's duty days.
    #[tracing::instrument(skip(self, out, config))]
    pub fn print_month<W: Write>(
        &self,
        out: &mut W,
        config: &RotationConfig,
        month: NaiveDate,
        today: NaiveDate,
        selected: Option<&str>,
        week_start: Weekday,
    ) -> anyhow::Result<()> {
        let cells = build_month_grid_from(month, week_start);
        writeln!(out, "{}", format_month_title(month, self.locale))?;

        let headers = weekday_headers(week_start, self.locale);
        let rows = cells
            .chunks(7)
            .map(|week| {
                week.iter()
                    .map(|cell| self.month_cell(config, cell, today, selected))
                    .collect()
            })
            .collect();
        write_table(&mut *out, headers, rows)?;

        writeln!(out)?;
        for cell in cells.iter().filter(|cell| cell.in_month) {
            if let Some(participant) = assignee_for_date(config, cell.date) {
                let name = if selected == Some(participant.id.as_str()) {
                    self.paint(&participant.name, "1;32")
                } else {
                    participant.name.clone()
                };
                writeln!(out, "{}  {}", self.date(cell.date), name)?;
            }
        }
        Ok(())
    }

    fn month_cell(
        &self,
        config: &RotationConfig,
        cell: &CalendarCell,
        today: NaiveDate,
        selected: Option<&str>,
    ) -> String {
        let day = cell.date.day();
        if !cell.in_month {
            return self.paint(&format!("{day:>2}"), "2");
        }

        let mut text = match assignee_for_date(config, cell.date) {
            Some(participant) => format!("{day:>2} {}", initials(&participant.name)),
            None => format!("{day:>2}"),
        };
        if cell.date == today {
            text.push('*');
        }

        let highlighted = assignee_for_date(config, cell.date)
            .is_some_and(|p| selected == Some(p.id.as_str()));
        if highlighted {
            self.paint(&text, "1;32")
        } else if cell.date == today {
            self.paint(&text, "33")
        } else {
            text
        }
    }

    #[tracing::instrument(skip(self, out, config, occurrences))]
    pub fn print_export<W: Write>(
        &self,
        out: &mut W,
        config: &RotationConfig,
        occurrences: &[Occurrence<'_>],
    ) -> anyhow::Result<()> {
        let doc = ExportDoc {
            duty_weekday: weekday_label(config.duty_weekday()).to_string(),
            anchor: config.anchor(),
            occurrences,
        };
        serde_json::to_writer_pretty(&mut *out, &doc)?;
        writeln!(out)?;
        Ok(())
    }

    fn paint(&self, text: &str, code: &str) -> String {
        if !self.color {
            return text.to_string();
        }
        format!("\x1b[{code}m{text}\x1b[0m")
    }
}

/// English weekday name for machine-readable output.
fn weekday_label(weekday: Weekday) -> &'static str {
    match weekday {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

fn initials(name: &str) -> String {
    name.chars().take(2).collect()
}

fn write_table<W: Write>(
    mut writer: W,
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
) -> anyhow::Result<()> {
    let column_count = headers.len();
    let mut widths = vec![0usize; column_count];

    for (idx, header) in headers.iter().enumerate() {
        widths[idx] = widths[idx].max(UnicodeWidthStr::width(header.as_str()));
    }

    for row in &rows {
        for (idx, cell) in row.iter().enumerate().take(column_count) {
            widths[idx] = widths[idx].max(UnicodeWidthStr::width(strip_ansi(cell).as_str()));
        }
    }

    for idx in 0..column_count {
        write!(writer, "{:width$} ", headers[idx], width = widths[idx])?;
    }
    writeln!(writer)?;

    for width in &widths {
        write!(writer, "{:-<width$} ", "", width = *width)?;
    }
    writeln!(writer)?;

    for row in rows {
        for (idx, cell) in row.iter().enumerate().take(column_count) {
            let visible_width = UnicodeWidthStr::width(strip_ansi(cell).as_str());
            let padding = widths[idx].saturating_sub(visible_width);
            write!(writer, "{}{} ", cell, " ".repeat(padding))?;
        }
        writeln!(writer)?;
    }

    Ok(())
}

fn strip_ansi(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut escaped = false;

    for ch in s.chars() {
        if escaped {
            if ch == 'm' {
                escaped = false;
            }
            continue;
        }

        if ch == '\x1b' {
            escaped = true;
            continue;
        }

        out.push(ch);
    }

    out
}
