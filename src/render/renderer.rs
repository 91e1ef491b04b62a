use super::scene::{overlay_or_attach, GlobeSurface, Primitives, RenderError, BORDER_STYLE, FILL_STYLE, OVERLAY_NAME};
use crate::zones::offset::find_timezones_for_offset_at;
use crate::zones::types::{FeatureCollection, Ring, TimeZoneFeature};
use cached::{Cached, SizedCache};
use chrono::{DateTime, Utc};
use earcutr::earcut;
use globe_geometry::{clean_ring, lat_lon_to_sphere_point, Position, Vec3};
use log::*;
use std::sync::Arc;

/// Overlays sit slightly above the globe surface to avoid z-fighting with it.
pub const RADIUS_FACTOR: f64 = 1.0005;

const PREPARED_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderOptions {
    /// Emit the translucent fill mesh in addition to the border.
    pub fill: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        RenderOptions { fill: true }
    }
}

/// A cleaned polygon in (lon, lat) space, triangulated and ready for projection.
#[derive(Debug, Clone, PartialEq)]
struct PreparedRingSet {
    outline: Vec<Position>,
    /// outline followed by every usable hole
    vertices: Vec<Position>,
    triangles: Vec<u32>,
}

/// Turns timezone features into border loops and fill meshes on the globe's overlay group.
pub struct SphereRenderer<P: Primitives> {
    primitives: P,
    options: RenderOptions,
    prepared: SizedCache<String, Arc<Vec<PreparedRingSet>>>,
    source: Option<Arc<FeatureCollection>>,
}

impl<P: Primitives> SphereRenderer<P> {
    pub fn new(primitives: P) -> Self {
        SphereRenderer {
            primitives,
            options: RenderOptions::default(),
            prepared: SizedCache::with_size(PREPARED_CAPACITY),
            source: None,
        }
    }

    pub fn with_options(mut self, options: RenderOptions) -> Self {
        self.options = options;
        self
    }

    pub fn primitives(&self) -> &P {
        &self.primitives
    }

    /// Renders every polygon of `tzid` and returns how many ring-sets made it onto the globe.
    /// Polygons that are degenerate or rejected by the host are skipped individually.
    pub fn render_feature<G>(&mut self, collection: &Arc<FeatureCollection>, globe: &mut G, tzid: &str) -> usize
    where
        G: GlobeSurface<Handle = P::Handle>,
    {
        let Some(radius) = globe.bounding_radius().filter(|r| r.is_finite() && *r > 0.0) else {
            debug!("Globe is not initialized yet, skipping timezone '{}'", tzid);
            return 0;
        };
        let radius = radius * RADIUS_FACTOR;

        let Some(ring_sets) = self.prepared_ring_sets(collection, tzid) else {
            debug!("No timezone feature named '{}'", tzid);
            return 0;
        };

        let Some(group) = overlay_or_attach(globe, OVERLAY_NAME) else {
            debug!("Globe refused the '{}' overlay group", OVERLAY_NAME);
            return 0;
        };

        let mut rendered = 0;
        for ring_set in ring_sets.iter() {
            match self.build(ring_set, radius) {
                Ok(handles) => {
                    handles.into_iter().for_each(|handle| group.add(handle));
                    rendered += 1;
                }
                Err(e) => debug!("Skipping polygon of '{}': {}", tzid, e),
            }
        }

        rendered
    }

    /// Renders every timezone whose offset at `at` matches `offset_hours`.
    pub fn render_offset_at<G>(&mut self, collection: &Arc<FeatureCollection>, globe: &mut G,
                               offset_hours: f64, at: DateTime<Utc>) -> usize
    where
        G: GlobeSurface<Handle = P::Handle>,
    {
        find_timezones_for_offset_at(collection, offset_hours, at)
            .iter()
            .map(|tzid| self.render_feature(collection, globe, tzid))
            .sum()
    }

    pub fn render_offset<G>(&mut self, collection: &Arc<FeatureCollection>, globe: &mut G, offset_hours: f64) -> usize
    where
        G: GlobeSurface<Handle = P::Handle>,
    {
        self.render_offset_at(collection, globe, offset_hours, Utc::now())
    }

    /// Disposes and detaches everything in the overlay group. The empty group stays attached.
    pub fn clear_all<G>(&mut self, globe: &mut G) -> usize
    where
        G: GlobeSurface<Handle = P::Handle>,
    {
        let Some(group) = globe.overlay_mut(OVERLAY_NAME) else {
            return 0;
        };

        let children = group.take_children();
        let count = children.len();
        for child in children {
            self.primitives.dispose(child);
        }
        count
    }

    /// Border first, then the fill. If the fill fails the border is released again so that a
    /// ring-set is either fully drawn or not at all.
    fn build(&mut self, ring_set: &PreparedRingSet, radius: f64) -> Result<Vec<P::Handle>, RenderError> {
        let outline = project(&ring_set.outline, radius);
        let border = self.primitives.line_loop(&outline, &BORDER_STYLE)?;

        if !self.options.fill || ring_set.triangles.is_empty() {
            return Ok(vec![border]);
        }

        let vertices = project(&ring_set.vertices, radius);
        match self.primitives.mesh(&vertices, &ring_set.triangles, &FILL_STYLE) {
            Ok(fill) => Ok(vec![fill, border]),
            Err(e) => {
                self.primitives.dispose(border);
                Err(e)
            }
        }
    }

    fn prepared_ring_sets(&mut self, collection: &Arc<FeatureCollection>, tzid: &str)
        -> Option<Arc<Vec<PreparedRingSet>>>
    {
        let same_source = self.source.as_ref().is_some_and(|source| Arc::ptr_eq(source, collection));
        if !same_source {
            self.prepared.cache_clear();
            self.source = Some(Arc::clone(collection));
        }

        let key = tzid.to_string();
        if let Some(hit) = self.prepared.cache_get(&key) {
            return Some(Arc::clone(hit));
        }

        let feature = collection.feature(tzid)?;
        let ring_sets = Arc::new(prepare_feature(feature));
        self.prepared.cache_set(key, Arc::clone(&ring_sets));
        Some(ring_sets)
    }
}

fn project(ring: &[Position], radius: f64) -> Vec<Vec3> {
    ring.iter()
        .map(|&[lon, lat]| lat_lon_to_sphere_point(lat, lon, radius))
        .collect()
}

fn prepare_feature(feature: &TimeZoneFeature) -> Vec<PreparedRingSet> {
    feature.ring_sets()
        .iter()
        .filter_map(|rings| {
            let prepared = prepare_ring_set(rings);
            if prepared.is_none() {
                debug!("Skipping degenerate polygon of '{}'", feature.tzid());
            }
            prepared
        })
        .collect()
}

fn prepare_ring_set(rings: &[Ring]) -> Option<PreparedRingSet> {
    let (outer, holes) = rings.split_first()?;

    let outline = clean_ring(outer);
    if outline.len() < 3 {
        return None;
    }

    let mut vertices = outline.clone();
    let mut hole_indices = Vec::new();
    for hole in holes {
        let hole = clean_ring(hole);
        if hole.len() < 3 {
            continue;
        }
        hole_indices.push(vertices.len());
        vertices.extend(align_longitudes(&hole, outline[0][0]));
    }

    // earcut indexes into the original (lon, lat) vertices, so the fill is re-projected exactly
    let flat: Vec<f64> = vertices.iter().flat_map(|&[lon, lat]| [lon, lat]).collect();
    let triangles = match earcut(&flat, &hole_indices, 2) {
        Ok(indices) => indices.into_iter().map(|i| i as u32).collect(),
        Err(e) => {
            debug!("Triangulation failed, rendering border only: {:?}", e);
            Vec::new()
        }
    };

    Some(PreparedRingSet {
        outline,
        vertices,
        triangles,
    })
}

/// Shifts a separately unwrapped hole by whole turns into the same longitude range as its outline.
fn align_longitudes(ring: &[Position], reference_lon: f64) -> Vec<Position> {
    let Some(&[first_lon, _]) = ring.first() else {
        return Vec::new();
    };

    let shift = 360.0 * ((first_lon - reference_lon) / 360.0).round();
    if shift == 0.0 || !shift.is_finite() {
        return ring.to_vec();
    }
    ring.iter().map(|&[lon, lat]| [lon - shift, lat]).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::buffers::{BufferPrimitives, Globe, GeometryKind};
    use crate::render::scene::{FillStyle, LineStyle};
    use pretty_assertions::assert_eq;

    fn assert_close(a: f64, b: f64, eps: f64) {
        let diff = (a - b).abs();
        assert!(diff <= eps, "expected {a} ~= {b} (diff {diff})");
    }

    fn square_rings() -> Vec<Ring> {
        vec![vec![[0.0, 0.0], [0.0, 10.0], [10.0, 10.0], [10.0, 0.0], [0.0, 0.0]]]
    }

    fn collection(features: Vec<TimeZoneFeature>) -> Arc<FeatureCollection> {
        Arc::new(FeatureCollection::new(features))
    }

    #[test]
    fn square_renders_border_and_fill() {
        let zones = collection(vec![TimeZoneFeature::polygon("Test/Zone", square_rings())]);
        let mut renderer = SphereRenderer::new(BufferPrimitives::new());
        let mut globe = Globe::new(2.0);

        assert_eq!(renderer.render_feature(&zones, &mut globe, "Test/Zone"), 1);

        let group = globe.overlay(OVERLAY_NAME).unwrap();
        assert_eq!(group.len(), 2);

        let fill = renderer.primitives().get(group.children()[0]).unwrap();
        let border = renderer.primitives().get(group.children()[1]).unwrap();
        assert_eq!(fill.kind, GeometryKind::Mesh);
        assert_eq!(fill.triangle_count(), 2);
        assert_eq!(border.kind, GeometryKind::LineLoop);
        assert_eq!(border.positions.len(), 4);
        assert!(border.render_order > fill.render_order);

        for p in border.positions.iter().chain(fill.positions.iter()) {
            let length = (p[0] * p[0] + p[1] * p[1] + p[2] * p[2]).sqrt() as f64;
            assert_close(length, 2.0 * RADIUS_FACTOR, 1e-5);
        }
    }

    #[test]
    fn fill_vertices_are_exact_projections() {
        let zones = collection(vec![TimeZoneFeature::polygon("Test/Zone", square_rings())]);
        let mut renderer = SphereRenderer::new(BufferPrimitives::new());
        let mut globe = Globe::new(1.0);
        renderer.render_feature(&zones, &mut globe, "Test/Zone");

        let fill_handle = globe.overlay(OVERLAY_NAME).unwrap().children()[0];
        let fill = renderer.primitives().get(fill_handle).unwrap();
        let expected = lat_lon_to_sphere_point(10.0, 10.0, RADIUS_FACTOR).to_f32();
        assert!(fill.positions.contains(&expected));
    }

    #[test]
    fn holes_are_cut_out_of_the_fill() {
        let mut rings = square_rings();
        rings.push(vec![[2.0, 2.0], [2.0, 8.0], [8.0, 8.0], [8.0, 2.0], [2.0, 2.0]]);
        let zones = collection(vec![TimeZoneFeature::polygon("Test/Donut", rings)]);

        let prepared = prepare_feature(zones.feature("Test/Donut").unwrap());
        assert_eq!(prepared.len(), 1);
        assert_eq!(prepared[0].vertices.len(), 8);
        // a square with a square hole triangulates into 8 triangles
        assert_eq!(prepared[0].triangles.len(), 24);
        assert_eq!(prepared[0].outline.len(), 4);
    }

    #[test]
    fn multipolygon_renders_each_member_and_skips_degenerate_ones() {
        let zones = collection(vec![TimeZoneFeature::multi_polygon("Test/Islands", vec![
            square_rings(),
            vec![vec![[50.0, 50.0], [51.0, 51.0], [50.0, 50.0]]],
            vec![vec![[20.0, 20.0], [20.0, 21.0], [21.0, 21.0], [20.0, 20.0]]],
            vec![],
        ])]);
        let mut renderer = SphereRenderer::new(BufferPrimitives::new());
        let mut globe = Globe::new(1.0);

        assert_eq!(renderer.render_feature(&zones, &mut globe, "Test/Islands"), 2);
        assert_eq!(globe.overlay(OVERLAY_NAME).unwrap().len(), 4);
    }

    #[test]
    fn degenerate_holes_are_ignored() {
        let mut rings = square_rings();
        rings.push(vec![[2.0, 2.0], [3.0, 3.0], [2.0, 2.0]]);

        let prepared = prepare_ring_set(&rings).unwrap();
        assert_eq!(prepared.vertices.len(), 4);
        assert_eq!(prepared.triangles.len(), 6);
    }

    #[test]
    fn full_width_cap_keeps_its_edges() {
        let cap = vec![vec![[-180.0, -90.0], [180.0, -90.0], [180.0, -60.0], [-180.0, -60.0], [-180.0, -90.0]]];

        let prepared = prepare_ring_set(&cap).unwrap();
        assert_eq!(prepared.outline, vec![[-180.0, -90.0], [180.0, -90.0], [180.0, -60.0], [-180.0, -60.0]]);
        assert_eq!(prepared.triangles.len(), 6);
    }

    #[test]
    fn antimeridian_polygon_stays_continuous() {
        let zones = collection(vec![TimeZoneFeature::polygon("Pacific/Dateline", vec![
            vec![[170.0, 0.0], [170.0, 10.0], [-170.0, 10.0], [-170.0, 0.0], [170.0, 0.0]],
            vec![[-178.0, 2.0], [-178.0, 8.0], [178.0, 8.0], [178.0, 2.0], [-178.0, 2.0]],
        ])]);

        let prepared = prepare_feature(zones.feature("Pacific/Dateline").unwrap());
        let outline_lons: Vec<f64> = prepared[0].outline.iter().map(|p| p[0]).collect();
        assert_eq!(outline_lons, vec![170.0, 170.0, 190.0, 190.0]);

        // the hole is moved into the outline's range rather than left near -180
        assert!(prepared[0].vertices[4..].iter().all(|p| (170.0..=190.0).contains(&p[0])));
        assert_eq!(prepared[0].triangles.len(), 24);
    }

    #[test]
    fn fill_can_be_disabled() {
        let zones = collection(vec![TimeZoneFeature::polygon("Test/Zone", square_rings())]);
        let mut renderer = SphereRenderer::new(BufferPrimitives::new())
            .with_options(RenderOptions { fill: false });
        let mut globe = Globe::new(1.0);

        assert_eq!(renderer.render_feature(&zones, &mut globe, "Test/Zone"), 1);
        assert_eq!(globe.overlay(OVERLAY_NAME).unwrap().len(), 1);
    }

    #[test]
    fn uninitialized_globe_or_unknown_zone_is_a_no_op() {
        let zones = collection(vec![TimeZoneFeature::polygon("Test/Zone", square_rings())]);
        let mut renderer = SphereRenderer::new(BufferPrimitives::new());

        let mut pending: Globe = Globe::uninitialized();
        assert_eq!(renderer.render_feature(&zones, &mut pending, "Test/Zone"), 0);
        assert!(pending.overlays().is_empty());

        let mut globe = Globe::new(1.0);
        assert_eq!(renderer.render_feature(&zones, &mut globe, "Missing/Zone"), 0);
        assert_eq!(renderer.primitives().live_count(), 0);
    }

    #[test]
    fn clear_all_disposes_and_keeps_the_group() {
        let zones = collection(vec![
            TimeZoneFeature::polygon("Test/Zone", square_rings()),
            TimeZoneFeature::polygon("Test/Other", vec![vec![[20.0, 20.0], [20.0, 25.0], [25.0, 25.0]]]),
        ]);
        let mut renderer = SphereRenderer::new(BufferPrimitives::new());
        let mut globe = Globe::new(1.0);

        renderer.render_feature(&zones, &mut globe, "Test/Zone");
        renderer.render_feature(&zones, &mut globe, "Test/Other");
        assert_eq!(renderer.primitives().live_count(), 4);

        assert_eq!(renderer.clear_all(&mut globe), 4);
        assert_eq!(renderer.primitives().live_count(), 0);
        assert_eq!(renderer.primitives().disposed_count(), 4);
        assert!(globe.overlay(OVERLAY_NAME).unwrap().is_empty());

        // clearing an already empty group is harmless
        assert_eq!(renderer.clear_all(&mut globe), 0);
    }

    #[test]
    fn prepared_geometry_follows_the_collection() {
        let first = collection(vec![TimeZoneFeature::polygon("Test/Zone", square_rings())]);
        let second = collection(vec![TimeZoneFeature::polygon("Test/Zone", vec![
            vec![[0.0, 0.0], [0.0, 5.0], [5.0, 5.0]],
        ])]);
        let mut renderer = SphereRenderer::new(BufferPrimitives::new());

        let a = renderer.prepared_ring_sets(&first, "Test/Zone").unwrap();
        let again = renderer.prepared_ring_sets(&first, "Test/Zone").unwrap();
        assert!(Arc::ptr_eq(&a, &again));

        let b = renderer.prepared_ring_sets(&second, "Test/Zone").unwrap();
        assert_eq!(b[0].outline.len(), 3);
    }

    /// Rejects every mesh, to check that a half-built ring-set is rolled back.
    #[derive(Default)]
    struct MeshlessHost {
        next: u32,
        live: Vec<u32>,
    }

    impl Primitives for MeshlessHost {
        type Handle = u32;

        fn line_loop(&mut self, _vertices: &[Vec3], _style: &LineStyle) -> Result<u32, RenderError> {
            self.next += 1;
            self.live.push(self.next);
            Ok(self.next)
        }

        fn mesh(&mut self, _vertices: &[Vec3], _indices: &[u32], _style: &FillStyle) -> Result<u32, RenderError> {
            Err(RenderError::Primitive { reason: "no mesh support".to_string() })
        }

        fn dispose(&mut self, handle: u32) {
            self.live.retain(|&h| h != handle);
        }
    }

    #[test]
    fn failed_fill_releases_the_border() {
        let zones = collection(vec![TimeZoneFeature::polygon("Test/Zone", square_rings())]);
        let mut renderer = SphereRenderer::new(MeshlessHost::default());
        let mut globe: Globe<u32> = Globe::new(1.0);

        assert_eq!(renderer.render_feature(&zones, &mut globe, "Test/Zone"), 0);
        assert!(renderer.primitives().live.is_empty());
        assert!(globe.overlay(OVERLAY_NAME).unwrap().is_empty());
    }
}
