use anyhow::{
  Context,
  anyhow
};
use chrono::{
  DateTime,
  Datelike,
  Local,
  NaiveDate,
  Utc,
  Weekday
};
use chrono_tz::Tz;
use regex::Regex;

use crate::calendar::{
  add_days,
  add_months,
  month_start
};

/// Zone used to decide which calendar
/// day "today" is. `None` means the
/// machine's local zone.
#[tracing::instrument]
pub fn resolve_timezone(
  configured: Option<&str>
) -> Option<Tz> {
  configured.and_then(|raw| {
    parse_timezone(raw, "settings")
  })
}

/// Calendar day of `now` in `tz`, or in
/// the local zone when none is set.
#[must_use]
pub fn today_in(
  tz: Option<&Tz>,
  now: DateTime<Utc>
) -> NaiveDate {
  match tz {
    | Some(tz) => {
      now.with_timezone(tz).date_naive()
    }
    | None => {
      now.with_timezone(&Local).date_naive()
    }
  }
}

pub fn parse_timezone(
  raw: &str,
  source: &str
) -> Option<Tz> {
  let trimmed = raw.trim();
  if trimmed.is_empty() {
    tracing::warn!(
      source,
      "timezone source was empty"
    );
    return None;
  }

  match trimmed.parse::<Tz>() {
    | Ok(tz) => {
      tracing::info!(
        source,
        timezone = %trimmed,
        "configured timezone"
      );
      Some(tz)
    }
    | Err(err) => {
      tracing::error!(
        source,
        timezone = %trimmed,
        error = %err,
        "failed to parse timezone id"
      );
      None
    }
  }
}

/// Resolves a user supplied day relative
/// to `today`.
#[tracing::instrument(skip(today), fields(input = input))]
pub fn parse_date_expr(
  input: &str,
  today: NaiveDate
) -> anyhow::Result<NaiveDate> {
  let token = input.trim();
  let lower =
    token.to_ascii_lowercase();

  match lower.as_str() {
    | "today" | "now" => {
      return Ok(today);
    }
    | "tomorrow" => {
      return Ok(add_days(today, 1));
    }
    | "yesterday" => {
      return Ok(add_days(today, -1));
    }
    | _ => {}
  }

  if let Some(target) =
    parse_weekday_name(&lower)
  {
    return Ok(next_weekday_date(
      today, target
    ));
  }

  if let Some(date) =
    parse_relative(token, today)?
  {
    return Ok(date);
  }

  if let Ok(date) =
    NaiveDate::parse_from_str(
      token, "%Y-%m-%d"
    )
  {
    return Ok(date);
  }

  if let Some(first) =
    parse_year_month(token)
  {
    return Ok(first);
  }

  Err(anyhow!(
    "unrecognized date expression: \
     {input}"
  ))
  .with_context(|| {
    "supported formats: \
     today/tomorrow/yesterday, weekday \
     names (e.g. wednesday), \
     +Nd/+Nw/+Nm, YYYY-MM-DD, YYYY-MM"
  })
}

/// First day of the month a user
/// expression points into.
pub fn parse_month_expr(
  input: &str,
  today: NaiveDate
) -> anyhow::Result<NaiveDate> {
  if let Some(first) =
    parse_year_month(input.trim())
  {
    return Ok(first);
  }

  parse_date_expr(input, today)
    .map(month_start)
    .context("failed to parse month")
}

fn parse_year_month(
  token: &str
) -> Option<NaiveDate> {
  let (year, month) =
    token.split_once('-')?;
  if year.len() != 4 || month.len() != 2
  {
    return None;
  }
  NaiveDate::from_ymd_opt(
    year.parse().ok()?,
    month.parse().ok()?,
    1
  )
}

fn parse_relative(
  token: &str,
  today: NaiveDate
) -> anyhow::Result<Option<NaiveDate>> {
  let rel_re = Regex::new(r"^(?P<sign>[+-])(?P<num>\d+)(?P<unit>[dwm])$")
        .map_err(|e| anyhow!("internal regex compile failure: {e}"))?;

  let Some(caps) = rel_re.captures(token)
  else {
    return Ok(None);
  };

  let negative = caps
    .name("sign")
    .is_some_and(|m| m.as_str() == "-");
  let num: i32 = caps
    .name("num")
    .map(|m| m.as_str())
    .ok_or_else(|| {
      anyhow!("missing relative amount")
    })?
    .parse()
    .context("invalid relative number")?;
  let num = if negative { -num } else { num };

  let unit = caps
    .name("unit")
    .map(|m| m.as_str())
    .ok_or_else(|| {
      anyhow!("missing relative unit")
    })?;

  let date = match unit {
    | "d" => add_days(today, i64::from(num)),
    | "w" => {
      add_days(today, i64::from(num) * 7)
    }
    | "m" => add_months(today, num),
    | _ => {
      return Err(anyhow!(
        "unknown relative unit: {unit}"
      ))
    }
  };
  Ok(Some(date))
}

pub fn parse_weekday_name(
  token: &str
) -> Option<Weekday> {
  match token.trim().to_ascii_lowercase().as_str() {
    | "monday" | "mon" => {
      Some(Weekday::Mon)
    }
    | "tuesday" | "tue" | "tues" => {
      Some(Weekday::Tue)
    }
    | "wednesday" | "wed" => {
      Some(Weekday::Wed)
    }
    | "thursday" | "thu" | "thur"
    | "thurs" => Some(Weekday::Thu),
    | "friday" | "fri" => {
      Some(Weekday::Fri)
    }
    | "saturday" | "sat" => {
      Some(Weekday::Sat)
    }
    | "sunday" | "sun" => {
      Some(Weekday::Sun)
    }
    | _ => None
  }
}

/// Next `target` strictly after `from`.
fn next_weekday_date(
  from: NaiveDate,
  target: Weekday
) -> NaiveDate {
  let from_idx = from
    .weekday()
    .num_days_from_monday()
    as i64;
  let target_idx = target
    .num_days_from_monday()
    as i64;
  let mut delta =
    (7 + target_idx - from_idx) % 7;
  if delta == 0 {
    delta = 7;
  }
  add_days(from, delta)
}
