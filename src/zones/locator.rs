use super::offset::offset_hours_for;
use super::types::{FeatureCollection, Ring, TimeZoneFeature};
use crate::utils::formatting::display_name;
use chrono::{DateTime, FixedOffset, Offset, Utc};
use globe_geometry::{normalize_longitude, point_in_polygon, unwrap_longitudes};
use log::*;
use serde::Serialize;

/// Returned when no polygon contains the point (open ocean, or no data loaded).
pub const OCEAN_TZID: &str = "Etc/UTC";

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct TimezoneInfo {
    pub tzid: String,
    pub offset_hours: f64,
    pub local_time: DateTime<FixedOffset>,
    /// e.g. `Kathmandu (UTC+5:45)`
    pub display: String,
}

/// tzid of the first feature containing the point, or [`OCEAN_TZID`].
///
/// Features are scanned in collection order, so with overlapping polygons the earlier one wins.
pub fn find_timezone_at(collection: &FeatureCollection, lat: f64, lon: f64) -> &str {
    let lon = normalize_longitude(lon);

    collection.features.iter()
        .find(|feature| feature_contains(feature, lat, lon))
        .map(|feature| feature.tzid())
        .unwrap_or(OCEAN_TZID)
}

pub fn feature_contains(feature: &TimeZoneFeature, lat: f64, lon: f64) -> bool {
    feature.ring_sets().iter().any(|rings| polygon_contains(rings, lat, lon))
}

fn polygon_contains(rings: &[Ring], lat: f64, lon: f64) -> bool {
    // unwrapped so that edges crossing the antimeridian stay short
    let unwrapped: Vec<Ring> = rings.iter().map(|ring| unwrap_longitudes(ring)).collect();
    point_in_polygon(lat, lon, &unwrapped)
}

/// Lookup plus the zone's offset and wall-clock time at `at`.
pub fn find_timezone_info_at(collection: &FeatureCollection, lat: f64, lon: f64,
                             at: DateTime<Utc>) -> TimezoneInfo
{
    timezone_info(find_timezone_at(collection, lat, lon), at)
}

pub fn timezone_info(tzid: &str, at: DateTime<Utc>) -> TimezoneInfo {
    let offset_hours = offset_hours_for(tzid, at).unwrap_or_else(|| {
        warn!("Timezone '{}' is unknown to the calendar database, assuming UTC", tzid);
        0.0
    });

    let offset_seconds = (offset_hours * 3600.0).round() as i32;
    let offset = FixedOffset::east_opt(offset_seconds)
        .unwrap_or_else(|| Utc.fix());

    TimezoneInfo {
        tzid: tzid.to_string(),
        offset_hours,
        local_time: at.with_timezone(&offset),
        display: display_name(tzid, offset_hours),
    }
}
