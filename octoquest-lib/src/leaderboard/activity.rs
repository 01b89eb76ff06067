use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

use crate::github::UserEvent;

/// Commits pushed on one UTC day
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContributionDay {
    #[serde(serialize_with = "serialize_date")]
    pub date: NaiveDate,
    pub count: u64,
}

fn serialize_date<S: serde::Serializer>(date: &NaiveDate, s: S) -> Result<S::Ok, S::Error> {
    s.collect_str(&date.format("%Y-%m-%d"))
}

/// Sum push-event commits per UTC day for events created at or after `since`.
///
/// Days without pushes are left out; the result is sorted by date.
pub fn contribution_days(events: &[UserEvent], since: DateTime<Utc>) -> Vec<ContributionDay> {
    let mut per_day: BTreeMap<NaiveDate, u64> = BTreeMap::new();
    for event in events.iter().filter(|e| e.is_push() && e.created_at >= since) {
        *per_day.entry(event.created_at.date_naive()).or_default() += event.commit_count();
    }

    per_day
        .into_iter()
        .map(|(date, count)| ContributionDay { date, count })
        .collect()
}
