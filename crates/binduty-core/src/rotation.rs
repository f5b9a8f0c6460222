use std::collections::HashSet;

use anyhow::anyhow;
use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

use crate::calendar::days_between;

/// Days scanned by [`next_occurrences`] when the caller asks for few entries.
pub const DEFAULT_SCAN_DAYS: u32 = 120;

/// Search horizon used when looking up a tenant's next duty day.
pub const DEFAULT_HORIZON_DAYS: u32 = 365;

/// Entries shown on the printable schedule.
pub const PRINT_OCCURRENCES: usize = 12;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Participant {
    pub id: String,
    pub name: String,
}

impl Participant {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// Fixed roster plus the weekday and anchor the rotation is counted from.
///
/// Once built the value is never mutated; every schedule query is computed
/// from it on demand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RotationConfig {
    participants: Vec<Participant>,
    duty_weekday: Weekday,
    anchor: NaiveDate,
}

impl RotationConfig {
    pub fn new(
        participants: Vec<Participant>,
        duty_weekday: Weekday,
        anchor: NaiveDate,
    ) -> anyhow::Result<Self> {
        if participants.is_empty() {
            return Err(anyhow!("rotation needs at least one participant"));
        }

        let mut seen = HashSet::with_capacity(participants.len());
        for participant in &participants {
            if participant.id.trim().is_empty() {
                return Err(anyhow!(
                    "participant {:?} has an empty id",
                    participant.name
                ));
            }
            if !seen.insert(participant.id.as_str()) {
                return Err(anyhow!("duplicate participant id: {}", participant.id));
            }
        }

        Ok(Self {
            participants,
            duty_weekday,
            anchor,
        })
    }

    pub fn participants(&self) -> &[Participant] {
        &self.participants
    }

    pub fn duty_weekday(&self) -> Weekday {
        self.duty_weekday
    }

    pub fn anchor(&self) -> NaiveDate {
        self.anchor
    }

    pub fn participant(&self, id: &str) -> Option<&Participant> {
        self.participants.iter().find(|p| p.id == id)
    }

    pub fn is_duty_day(&self, date: NaiveDate) -> bool {
        date.weekday() == self.duty_weekday
    }

    /// Tenants whose name or id contains `query`, ignoring case, in rotation
    /// order. A blank query matches everyone.
    pub fn search(&self, query: &str) -> Vec<&Participant> {
        let needle = query.trim().to_lowercase();
        self.participants
            .iter()
            .filter(|p| {
                needle.is_empty()
                    || p.name.to_lowercase().contains(&needle)
                    || p.id.to_lowercase().contains(&needle)
            })
            .collect()
    }
}

/// A date and whoever holds duty on it, if anyone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Assignment<'a> {
    pub date: NaiveDate,
    pub participant: Option<&'a Participant>,
}

/// One duty day with its assignee.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Occurrence<'a> {
    pub date: NaiveDate,
    pub participant: &'a Participant,
}

/// Who is on duty on `date`.
///
/// Returns `None` on every weekday other than the duty weekday. Dates before
/// the anchor count as week zero, so they all resolve to the first
/// participant rather than rotating backwards.
pub fn assignee_for_date(config: &RotationConfig, date: NaiveDate) -> Option<&Participant> {
    if !config.is_duty_day(date) {
        return None;
    }

    let diff = days_between(config.anchor, date).max(0);
    let weeks_elapsed = diff / 7;
    let len = config.participants.len() as i64;
    let index = usize::try_from(weeks_elapsed % len).ok()?;
    config.participants.get(index)
}

pub fn assignment_for(config: &RotationConfig, date: NaiveDate) -> Assignment<'_> {
    Assignment {
        date,
        participant: assignee_for_date(config, date),
    }
}

/// Day-by-day scan yielding duty occurrences. Clone it to walk the same
/// window again.
#[derive(Debug, Clone)]
pub struct Occurrences<'a> {
    config: &'a RotationConfig,
    cursor: Option<NaiveDate>,
    scanned: u32,
    scan_days: u32,
    remaining: usize,
}

impl<'a> Iterator for Occurrences<'a> {
    type Item = Occurrence<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        while self.remaining > 0 && self.scanned < self.scan_days {
            // None once the last representable date has been scanned.
            let date = self.cursor?;
            self.cursor = date.succ_opt();
            self.scanned += 1;

            if let Some(participant) = assignee_for_date(self.config, date) {
                self.remaining -= 1;
                return Some(Occurrence { date, participant });
            }
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.remaining))
    }
}

/// The next `count` duty days from `start` inclusive.
///
/// The scan window is widened to `count * 7` days when that exceeds
/// [`DEFAULT_SCAN_DAYS`], so the full count is always produced.
pub fn next_occurrences(
    config: &RotationConfig,
    start: NaiveDate,
    count: usize,
) -> Occurrences<'_> {
    let needed = u32::try_from(count.saturating_mul(7)).unwrap_or(u32::MAX);
    next_occurrences_within(config, start, count, needed.max(DEFAULT_SCAN_DAYS))
}

/// Like [`next_occurrences`] with an explicit scan cap. Stops early, with
/// whatever was found, once `scan_days` calendar days have been looked at.
pub fn next_occurrences_within(
    config: &RotationConfig,
    start: NaiveDate,
    count: usize,
    scan_days: u32,
) -> Occurrences<'_> {
    Occurrences {
        config,
        cursor: Some(start),
        scanned: 0,
        scan_days,
        remaining: count,
    }
}

/// First duty day on or after `start` assigned to `participant_id`, looking
/// at most `horizon_days` days ahead. Unknown ids and misses both give
/// `None`.
pub fn next_for_participant(
    config: &RotationConfig,
    start: NaiveDate,
    participant_id: &str,
    horizon_days: u32,
) -> Option<NaiveDate> {
    config.participant(participant_id)?;

    std::iter::successors(Some(start), |date| date.succ_opt())
        .take(horizon_days as usize)
        .find(|date| {
            assignee_for_date(config, *date).is_some_and(|p| p.id == participant_id)
        })
}
