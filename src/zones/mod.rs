pub mod cache;
pub mod clock;
pub mod locator;
pub mod offset;
pub mod types;

pub use cache::{FeatureStore, LoadState, CACHE_KEY};
pub use clock::{Clock, FixedClock, SystemClock};
pub use locator::{find_timezone_at, find_timezone_info_at, timezone_info, TimezoneInfo, OCEAN_TZID};
pub use offset::{find_timezones_for_offset, find_timezones_for_offset_at, OFFSET_TOLERANCE};
pub use types::{FeatureCollection, Ring, TimeZoneFeature, ZoneGeometry, ZoneProperties};
