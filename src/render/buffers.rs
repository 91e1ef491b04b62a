use super::scene::{FillStyle, GlobeSurface, LineStyle, OverlayGroup, Primitives, RenderError};
use globe_geometry::Vec3;
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BufferHandle(u64);

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum GeometryKind {
    LineLoop,
    Mesh,
}

/// CPU-side vertex/index buffers ready to be uploaded by a GPU host.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct GeometryBuffers {
    pub kind: GeometryKind,
    pub positions: Vec<[f32; 3]>,
    pub indices: Vec<u32>,
    pub color: u32,
    pub opacity: f32,
    pub render_order: i32,
}

impl GeometryBuffers {
    pub fn triangle_count(&self) -> usize {
        match self.kind {
            GeometryKind::Mesh => self.indices.len() / 3,
            GeometryKind::LineLoop => 0,
        }
    }
}

/// [`Primitives`] backed by plain buffers addressed through handles.
#[derive(Debug, Default)]
pub struct BufferPrimitives {
    next_id: u64,
    live: BTreeMap<BufferHandle, GeometryBuffers>,
    disposed: usize,
}

impl BufferPrimitives {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, handle: BufferHandle) -> Option<&GeometryBuffers> {
        self.live.get(&handle)
    }

    pub fn live_count(&self) -> usize {
        self.live.len()
    }

    pub fn disposed_count(&self) -> usize {
        self.disposed
    }

    fn insert(&mut self, buffers: GeometryBuffers) -> BufferHandle {
        let handle = BufferHandle(self.next_id);
        self.next_id += 1;
        self.live.insert(handle, buffers);
        handle
    }
}

impl Primitives for BufferPrimitives {
    type Handle = BufferHandle;

    fn line_loop(&mut self, vertices: &[Vec3], style: &LineStyle) -> Result<BufferHandle, RenderError> {
        if vertices.len() < 2 {
            return Err(RenderError::EmptyBuffer);
        }

        Ok(self.insert(GeometryBuffers {
            kind: GeometryKind::LineLoop,
            positions: vertices.iter().map(|v| v.to_f32()).collect(),
            indices: Vec::new(),
            color: style.color,
            opacity: style.opacity,
            render_order: style.render_order,
        }))
    }

    fn mesh(&mut self, vertices: &[Vec3], indices: &[u32], style: &FillStyle)
        -> Result<BufferHandle, RenderError>
    {
        if vertices.is_empty() || indices.is_empty() {
            return Err(RenderError::EmptyBuffer);
        }
        if indices.len() % 3 != 0 {
            return Err(RenderError::Primitive {
                reason: format!("{} indices do not form whole triangles", indices.len()),
            });
        }
        if let Some(&bad) = indices.iter().find(|&&i| i as usize >= vertices.len()) {
            return Err(RenderError::Primitive {
                reason: format!("index {} out of range for {} vertices", bad, vertices.len()),
            });
        }

        Ok(self.insert(GeometryBuffers {
            kind: GeometryKind::Mesh,
            positions: vertices.iter().map(|v| v.to_f32()).collect(),
            indices: indices.to_vec(),
            color: style.color,
            opacity: style.opacity,
            render_order: style.render_order,
        }))
    }

    fn dispose(&mut self, handle: BufferHandle) {
        if self.live.remove(&handle).is_some() {
            self.disposed += 1;
        }
    }
}

/// Minimal globe: a bounding radius plus named overlay groups.
#[derive(Debug, Clone, PartialEq)]
pub struct Globe<H = BufferHandle> {
    radius: Option<f64>,
    overlays: Vec<OverlayGroup<H>>,
}

impl<H> Globe<H> {
    pub fn new(radius: f64) -> Self {
        Globe {
            radius: Some(radius),
            overlays: Vec::new(),
        }
    }

    /// A globe whose scene hasn't been initialized; rendering onto it does nothing.
    pub fn uninitialized() -> Self {
        Globe {
            radius: None,
            overlays: Vec::new(),
        }
    }

    pub fn set_radius(&mut self, radius: f64) {
        self.radius = Some(radius);
    }

    pub fn overlay(&self, name: &str) -> Option<&OverlayGroup<H>> {
        self.overlays.iter().find(|group| group.name() == name)
    }

    pub fn overlays(&self) -> &[OverlayGroup<H>] {
        &self.overlays
    }
}

impl<H> GlobeSurface for Globe<H> {
    type Handle = H;

    fn bounding_radius(&self) -> Option<f64> {
        self.radius
    }

    fn overlay_mut(&mut self, name: &str) -> Option<&mut OverlayGroup<H>> {
        self.overlays.iter_mut().find(|group| group.name() == name)
    }

    fn attach_overlay(&mut self, group: OverlayGroup<H>) {
        self.overlays.push(group);
    }
}
