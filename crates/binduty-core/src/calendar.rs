//! Calendar-day arithmetic.
//!
//! Every helper works on whole local calendar days. Values that carry a
//! time of day are reduced to their [`NaiveDate`] first, so two instants
//! on the same day always compare equal here.

use chrono::{
  DateTime,
  Datelike,
  Days,
  Locale,
  Months,
  NaiveDate,
  NaiveDateTime,
  NaiveTime,
  TimeZone
};

const LOCALE_ENV_VARS: [&str; 3] =
  ["LC_ALL", "LC_TIME", "LANG"];
const FALLBACK_LOCALE: Locale =
  Locale::en_US;

/// Anything that can be pinned to a
/// local calendar day.
pub trait CalendarDay {
  fn calendar_day(&self) -> NaiveDate;
}

impl CalendarDay for NaiveDate {
  fn calendar_day(&self) -> NaiveDate {
    *self
  }
}

impl CalendarDay for NaiveDateTime {
  fn calendar_day(&self) -> NaiveDate {
    self.date()
  }
}

impl<Tz: TimeZone> CalendarDay
  for DateTime<Tz>
{
  fn calendar_day(&self) -> NaiveDate {
    self.date_naive()
  }
}

impl<T: CalendarDay + ?Sized> CalendarDay
  for &T
{
  fn calendar_day(&self) -> NaiveDate {
    (**self).calendar_day()
  }
}

/// Midnight of the same local calendar
/// day, as a plain date.
#[must_use]
pub fn truncate_to_day(
  d: impl CalendarDay
) -> NaiveDate {
  d.calendar_day()
}

/// Signed number of calendar days from
/// `a` to `b`.
#[must_use]
pub fn days_between(
  a: impl CalendarDay,
  b: impl CalendarDay
) -> i64 {
  b.calendar_day()
    .signed_duration_since(
      a.calendar_day()
    )
    .num_days()
}

/// Moves `n` calendar days, saturating at
/// the ends of the representable range.
#[must_use]
pub fn add_days(
  d: impl CalendarDay,
  n: i64
) -> NaiveDate {
  let day = d.calendar_day();
  let step = Days::new(n.unsigned_abs());
  if n >= 0 {
    day
      .checked_add_days(step)
      .unwrap_or(NaiveDate::MAX)
  } else {
    day
      .checked_sub_days(step)
      .unwrap_or(NaiveDate::MIN)
  }
}

/// Moves the month field by `n`.
///
/// The day of month is kept when the
/// target month has it and clamped to the
/// target month's last day otherwise, so
/// Jan 31 plus one month is the last day
/// of February, never early March.
#[must_use]
pub fn add_months(
  d: impl CalendarDay,
  n: i32
) -> NaiveDate {
  let day = d.calendar_day();
  let step = Months::new(n.unsigned_abs());
  if n >= 0 {
    day
      .checked_add_months(step)
      .unwrap_or(NaiveDate::MAX)
  } else {
    day
      .checked_sub_months(step)
      .unwrap_or(NaiveDate::MIN)
  }
}

#[must_use]
pub fn is_same_calendar_day(
  a: impl CalendarDay,
  b: impl CalendarDay
) -> bool {
  let (a, b) =
    (a.calendar_day(), b.calendar_day());
  a.year() == b.year()
    && a.month() == b.month()
    && a.day() == b.day()
}

/// First day of the month containing `d`.
#[must_use]
pub fn month_start(
  d: impl CalendarDay
) -> NaiveDate {
  let day = d.calendar_day();
  day.with_day(1).unwrap_or(day)
}

/// "Wed, Aug 27" in the runtime locale.
#[must_use]
pub fn format_display_date(
  d: impl CalendarDay
) -> String {
  format_display_date_in(
    d,
    runtime_locale()
  )
}

#[must_use]
pub fn format_display_date_in(
  d: impl CalendarDay,
  locale: Locale
) -> String {
  format_localized(
    d.calendar_day(),
    "%a, %b %-d",
    locale
  )
}

/// "August 2025" style heading for a
/// month view.
#[must_use]
pub fn format_month_title(
  d: impl CalendarDay,
  locale: Locale
) -> String {
  format_localized(
    d.calendar_day(),
    "%B %Y",
    locale
  )
}

/// Two-letter weekday labels starting at
/// `first`, used as month grid headers.
#[must_use]
pub fn weekday_headers(
  first: chrono::Weekday,
  locale: Locale
) -> Vec<String> {
  // 2023-01-01 is a Sunday.
  let sunday = NaiveDate::from_ymd_opt(
    2023, 1, 1
  )
  .unwrap_or(NaiveDate::MIN);
  let offset = i64::from(
    first.num_days_from_sunday()
  );
  (0..7)
    .map(|i| {
      let label = format_localized(
        add_days(sunday, offset + i),
        "%a",
        locale
      );
      label.chars().take(2).collect()
    })
    .collect()
}

/// Full weekday name, e.g. "Wednesday".
#[must_use]
pub fn format_weekday_name(
  weekday: chrono::Weekday,
  locale: Locale
) -> String {
  // 2023-01-01 is a Sunday.
  let sunday = NaiveDate::from_ymd_opt(
    2023, 1, 1
  )
  .unwrap_or(NaiveDate::MIN);
  format_localized(
    add_days(
      sunday,
      i64::from(
        weekday.num_days_from_sunday()
      )
    ),
    "%A",
    locale
  )
}

fn format_localized(
  day: NaiveDate,
  fmt: &str,
  locale: Locale
) -> String {
  day
    .and_time(NaiveTime::MIN)
    .and_utc()
    .format_localized(fmt, locale)
    .to_string()
}

/// Locale named by `LC_ALL`, `LC_TIME` or
/// `LANG`, whichever is set first, falling
/// back to `en_US`.
#[must_use]
pub fn runtime_locale() -> Locale {
  locale_from_env(|var| {
    std::env::var(var).ok()
  })
}

/// [`runtime_locale`] over an arbitrary
/// variable lookup.
pub fn locale_from_env<F>(
  lookup: F
) -> Locale
where
  F: Fn(&str) -> Option<String>
{
  LOCALE_ENV_VARS
    .iter()
    .filter_map(|var| lookup(var))
    .find(|value| {
      !value.trim().is_empty()
    })
    .and_then(|value| {
      let parsed =
        locale_from_tag(&value);
      if parsed.is_none() {
        tracing::debug!(
          tag = %value,
          "unrecognised locale tag; using fallback"
        );
      }
      parsed
    })
    .unwrap_or(FALLBACK_LOCALE)
}

/// Parses POSIX locale tags such as
/// `de_DE.UTF-8` or `sr_RS@latin`.
#[must_use]
pub fn locale_from_tag(
  tag: &str
) -> Option<Locale> {
  let trimmed = tag.trim();
  if trimmed.is_empty() {
    return None;
  }
  if trimmed == "C" || trimmed == "POSIX"
  {
    return Some(FALLBACK_LOCALE);
  }

  if let Ok(locale) =
    Locale::try_from(trimmed)
  {
    return Some(locale);
  }

  let base = trimmed
    .split(['.', '@'])
    .next()
    .unwrap_or(trimmed)
    .replace('-', "_");
  Locale::try_from(base.as_str()).ok()
}

#[cfg(test)]
mod tests {
  use chrono::{
    Locale,
    NaiveDate,
    TimeZone,
    Utc,
    Weekday
  };

  use super::*;

  fn ymd(
    y: i32,
    m: u32,
    d: u32
  ) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d)
      .expect("valid date")
  }

  #[test]
  fn truncation_drops_time_and_is_idempotent()
  {
    let late = ymd(2025, 8, 27)
      .and_hms_opt(23, 59, 59)
      .expect("valid time");
    let once = truncate_to_day(late);
    assert_eq!(once, ymd(2025, 8, 27));
    assert_eq!(
      truncate_to_day(once),
      once
    );
  }

  #[test]
  fn days_between_ignores_time_of_day() {
    let morning = Utc
      .with_ymd_and_hms(
        2025, 8, 13, 0, 5, 0
      )
      .single()
      .expect("valid morning");
    let evening = Utc
      .with_ymd_and_hms(
        2025, 8, 27, 23, 55, 0
      )
      .single()
      .expect("valid evening");
    assert_eq!(
      days_between(morning, evening),
      14
    );
    assert_eq!(
      days_between(evening, morning),
      -14
    );
    assert_eq!(
      days_between(morning, morning),
      0
    );
  }

  #[test]
  fn add_days_crosses_year_boundary() {
    assert_eq!(
      add_days(ymd(2025, 12, 30), 3),
      ymd(2026, 1, 2)
    );
    assert_eq!(
      add_days(ymd(2024, 3, 1), -1),
      ymd(2024, 2, 29)
    );
    assert_eq!(
      add_days(ymd(2025, 8, 13), 0),
      ymd(2025, 8, 13)
    );
  }

  #[test]
  fn add_days_saturates_instead_of_panicking()
  {
    assert_eq!(
      add_days(ymd(2025, 1, 1), i64::MAX),
      NaiveDate::MAX
    );
    assert_eq!(
      add_days(ymd(2025, 1, 1), i64::MIN),
      NaiveDate::MIN
    );
  }

  #[test]
  fn add_months_clamps_to_month_end() {
    assert_eq!(
      add_months(ymd(2024, 1, 31), 1),
      ymd(2024, 2, 29)
    );
    assert_eq!(
      add_months(ymd(2025, 1, 31), 1),
      ymd(2025, 2, 28)
    );
    assert_eq!(
      add_months(ymd(2025, 3, 31), -1),
      ymd(2025, 2, 28)
    );
    assert_eq!(
      add_months(ymd(2025, 11, 15), 3),
      ymd(2026, 2, 15)
    );
  }

  #[test]
  fn same_calendar_day_compares_dates_only()
  {
    let a = ymd(2025, 8, 27)
      .and_hms_opt(1, 0, 0)
      .expect("valid time");
    let b = ymd(2025, 8, 27)
      .and_hms_opt(22, 0, 0)
      .expect("valid time");
    assert!(is_same_calendar_day(a, b));
    assert!(!is_same_calendar_day(
      a,
      ymd(2024, 8, 27)
    ));
  }

  #[test]
  fn formats_short_display_date() {
    assert_eq!(
      format_display_date_in(
        ymd(2025, 8, 27),
        Locale::en_US
      ),
      "Wed, Aug 27"
    );
    assert_eq!(
      format_display_date_in(
        ymd(2025, 9, 3),
        Locale::en_US
      ),
      "Wed, Sep 3"
    );
  }

  #[test]
  fn formats_month_title_and_headers() {
    assert_eq!(
      format_month_title(
        ymd(2025, 8, 13),
        Locale::en_US
      ),
      "August 2025"
    );
    assert_eq!(
      weekday_headers(
        Weekday::Sun,
        Locale::en_US
      ),
      vec![
        "Su", "Mo", "Tu", "We", "Th",
        "Fr", "Sa"
      ]
    );
    assert_eq!(
      weekday_headers(
        Weekday::Mon,
        Locale::en_US
      )[6],
      "Su"
    );
  }

  #[test]
  fn parses_posix_locale_tags() {
    assert_eq!(
      locale_from_tag("en_US.UTF-8"),
      Some(Locale::en_US)
    );
    assert_eq!(
      locale_from_tag("de_DE"),
      Some(Locale::de_DE)
    );
    assert_eq!(
      locale_from_tag("C"),
      Some(Locale::en_US)
    );
    assert_eq!(
      locale_from_tag("klingon"),
      None
    );
  }

  #[test]
  fn formats_full_weekday_names() {
    assert_eq!(
      format_weekday_name(
        Weekday::Wed,
        Locale::en_US
      ),
      "Wednesday"
    );
    assert_eq!(
      format_weekday_name(
        Weekday::Wed,
        Locale::de_DE
      ),
      "Mittwoch"
    );
  }

  fn lookup_in(
    pairs: &'static [(
      &'static str,
      &'static str
    )]
  ) -> impl Fn(&str) -> Option<String> {
    move |var: &str| {
      pairs
        .iter()
        .find(|(k, _)| *k == var)
        .map(|(_, v)| (*v).to_string())
    }
  }

  #[test]
  fn locale_env_order_is_lc_all_lc_time_lang()
  {
    assert_eq!(
      locale_from_env(lookup_in(&[
        ("LANG", "fr_FR.UTF-8"),
        ("LC_TIME", "de_DE.UTF-8"),
        ("LC_ALL", "nl_NL.UTF-8")
      ])),
      Locale::nl_NL
    );
    assert_eq!(
      locale_from_env(lookup_in(&[
        ("LANG", "fr_FR.UTF-8"),
        ("LC_TIME", "de_DE.UTF-8"),
        ("LC_ALL", "  ")
      ])),
      Locale::de_DE
    );
    assert_eq!(
      locale_from_env(lookup_in(&[(
        "LANG",
        "fr_FR.UTF-8"
      )])),
      Locale::fr_FR
    );
    assert_eq!(
      locale_from_env(lookup_in(&[])),
      Locale::en_US
    );
    assert_eq!(
      locale_from_env(lookup_in(&[(
        "LANG",
        "klingon"
      )])),
      Locale::en_US
    );
  }

  #[test]
  fn month_start_is_first_of_month() {
    assert_eq!(
      month_start(ymd(2025, 8, 27)),
      ymd(2025, 8, 1)
    );
  }
}
