use chrono::{
  Datelike,
  NaiveDate,
  Weekday
};
use serde::Serialize;

use crate::calendar::{
  CalendarDay,
  add_days,
  month_start
};

/// Six full weeks.
pub const GRID_CELLS: usize = 42;

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Serialize,
)]
pub struct CalendarCell {
  pub date:     NaiveDate,
  pub in_month: bool
}

/// Month grid with weeks starting on
/// Sunday.
#[must_use]
pub fn build_month_grid(
  anchor: impl CalendarDay
) -> Vec<CalendarCell> {
  build_month_grid_from(
    anchor,
    Weekday::Sun
  )
}

/// 42 cells covering the month of
/// `anchor`: spillover days from the
/// previous month, the month itself, then
/// the following month until six weeks
/// are filled. Only the year and month of
/// `anchor` matter.
///
/// The final representable month has no
/// following month to borrow from, so its
/// grid ends at `NaiveDate::MAX` with
/// fewer than 42 cells.
#[must_use]
pub fn build_month_grid_from(
  anchor: impl CalendarDay,
  week_start: Weekday
) -> Vec<CalendarCell> {
  let first = month_start(anchor);
  let leading = (7
    + first.weekday().num_days_from_monday()
    - week_start.num_days_from_monday())
    % 7;
  let origin =
    add_days(first, -i64::from(leading));

  std::iter::successors(
    Some(origin),
    |date| date.succ_opt()
  )
  .take(GRID_CELLS)
  .map(|date| CalendarCell {
    date,
    in_month: date.year() == first.year()
      && date.month() == first.month()
  })
  .collect()
}
