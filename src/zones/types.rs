use globe_geometry::Position;
use log::*;
use serde::{Deserialize, Serialize};

/// Ordered `[lon, lat]` vertices. The first ring of a polygon is its outline, the rest are holes.
pub type Ring = Vec<Position>;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
enum CollectionKind {
    #[default]
    FeatureCollection,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
enum FeatureKind {
    #[default]
    Feature,
}

/// Timezone polygons as loaded from GeoJSON. Immutable once loaded; the empty collection is
/// the "no data available" value.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct FeatureCollection {
    #[serde(rename = "type")]
    kind: CollectionKind,
    pub features: Vec<TimeZoneFeature>,
}

impl FeatureCollection {
    pub fn new(features: Vec<TimeZoneFeature>) -> Self {
        Self {
            kind: CollectionKind::FeatureCollection,
            features,
        }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    /// Parses a serialized collection. Blank, malformed or empty payloads count as "no data".
    pub fn parse(payload: &str) -> Option<Self> {
        if payload.trim().is_empty() {
            debug!("Ignoring blank timezone payload");
            return None;
        }

        match serde_json::from_str::<FeatureCollection>(payload) {
            Ok(collection) if collection.is_valid() => Some(collection),
            Ok(_) => {
                warn!("Discarding timezone payload without any features");
                None
            }
            Err(e) => {
                warn!("Discarding malformed timezone payload: {}", e);
                None
            }
        }
    }

    pub fn is_valid(&self) -> bool {
        !self.features.is_empty()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    /// First feature carrying the given tzid.
    pub fn feature(&self, tzid: &str) -> Option<&TimeZoneFeature> {
        self.features.iter().find(|f| f.tzid() == tzid)
    }

    pub fn tzids(&self) -> impl Iterator<Item = &str> {
        self.features.iter().map(|f| f.tzid())
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct TimeZoneFeature {
    #[serde(rename = "type", default)]
    kind: FeatureKind,
    pub properties: ZoneProperties,
    pub geometry: ZoneGeometry,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ZoneProperties {
    pub tzid: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "type")]
pub enum ZoneGeometry {
    Polygon { coordinates: Vec<Ring> },
    MultiPolygon { coordinates: Vec<Vec<Ring>> },
}

impl TimeZoneFeature {
    pub fn new(tzid: impl Into<String>, geometry: ZoneGeometry) -> Self {
        Self {
            kind: FeatureKind::Feature,
            properties: ZoneProperties { tzid: tzid.into() },
            geometry,
        }
    }

    pub fn polygon(tzid: impl Into<String>, rings: Vec<Ring>) -> Self {
        Self::new(tzid, ZoneGeometry::Polygon { coordinates: rings })
    }

    pub fn multi_polygon(tzid: impl Into<String>, polygons: Vec<Vec<Ring>>) -> Self {
        Self::new(tzid, ZoneGeometry::MultiPolygon { coordinates: polygons })
    }

    pub fn tzid(&self) -> &str {
        &self.properties.tzid
    }

    /// One ring-set (outline + holes) per polygon: a single entry for `Polygon`,
    /// one per member for `MultiPolygon`.
    pub fn ring_sets(&self) -> &[Vec<Ring>] {
        match &self.geometry {
            ZoneGeometry::Polygon { coordinates } => std::slice::from_ref(coordinates),
            ZoneGeometry::MultiPolygon { coordinates } => coordinates,
        }
    }
}
