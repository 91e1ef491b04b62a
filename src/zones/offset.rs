use super::types::FeatureCollection;
use chrono::{DateTime, Offset, TimeZone, Utc};
use chrono_tz::Tz;
use globe_geometry::round_to_quarter_hour;
use log::*;
use std::collections::BTreeSet;

/// Just over an eighth of an hour: a quarter-hour bucket matches, its neighbours do not.
pub const OFFSET_TOLERANCE: f64 = 0.126;

const FIXED_OFFSET_NAMESPACE: &str = "etc/";

/// `Etc/...` zones are synthetic fixed offsets, not regions on the map.
pub fn is_fixed_offset_zone(tzid: &str) -> bool {
    tzid.get(..FIXED_OFFSET_NAMESPACE.len())
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case(FIXED_OFFSET_NAMESPACE))
}

/// UTC offset of `tz` at the given instant, in hours (DST included).
pub fn current_offset_hours(tz: Tz, at: DateTime<Utc>) -> f64 {
    let offset = tz.offset_from_utc_datetime(&at.naive_utc()).fix();
    f64::from(offset.local_minus_utc()) / 3600.0
}

/// Offset of a tzid at the given instant, `None` if the calendar database doesn't know it.
pub fn offset_hours_for(tzid: &str, at: DateTime<Utc>) -> Option<f64> {
    tzid.parse::<Tz>()
        .ok()
        .map(|tz| current_offset_hours(tz, at))
}

/// All region tzids whose offset at `at`, rounded to a quarter hour, is within
/// [`OFFSET_TOLERANCE`] of `target_hours`.
pub fn find_timezones_for_offset_at(collection: &FeatureCollection, target_hours: f64,
                                    at: DateTime<Utc>) -> BTreeSet<String>
{
    let mut matches = BTreeSet::new();

    for tzid in collection.tzids() {
        if is_fixed_offset_zone(tzid) || matches.contains(tzid) {
            continue;
        }

        let Some(offset) = offset_hours_for(tzid, at) else {
            debug!("Skipping unknown timezone '{}' in offset lookup", tzid);
            continue;
        };

        if (round_to_quarter_hour(offset) - target_hours).abs() < OFFSET_TOLERANCE {
            matches.insert(tzid.to_string());
        }
    }

    matches
}

/// Same as [`find_timezones_for_offset_at`] for the current instant. The result moves with
/// DST transitions.
pub fn find_timezones_for_offset(collection: &FeatureCollection, target_hours: f64) -> BTreeSet<String> {
    find_timezones_for_offset_at(collection, target_hours, Utc::now())
}
