use globe_geometry::Vec3;
use serde::Serialize;
use thiserror::Error;

/// Name of the group under the globe that holds every timezone overlay.
pub const OVERLAY_NAME: &str = "timezone-overlay";

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Host rejected geometry: {reason}")]
    Primitive {
        reason: String,
    },

    #[error("Geometry has no drawable vertices")]
    EmptyBuffer,
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq)]
pub struct LineStyle {
    pub color: u32,
    pub opacity: f32,
    pub render_order: i32,
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq)]
pub struct FillStyle {
    pub color: u32,
    pub opacity: f32,
    pub render_order: i32,
    pub double_sided: bool,
    pub depth_write: bool,
}

/// Semi-transparent magenta outline, painted after the fill so it stays visible through it.
pub const BORDER_STYLE: LineStyle = LineStyle {
    color: 0xff00ff,
    opacity: 0.85,
    render_order: 2,
};

pub const FILL_STYLE: FillStyle = FillStyle {
    color: 0xff00ff,
    opacity: 0.18,
    render_order: 1,
    double_sided: true,
    depth_write: false,
};

/// Geometry constructors of the hosting 3D environment.
///
/// Every handle returned here owns GPU-side resources and has to go back through
/// [`Primitives::dispose`]; detaching it from a group does not free anything.
pub trait Primitives {
    type Handle;

    /// A closed polyline through `vertices` (the last vertex connects back to the first).
    fn line_loop(&mut self, vertices: &[Vec3], style: &LineStyle) -> Result<Self::Handle, RenderError>;

    /// An indexed triangle mesh.
    fn mesh(&mut self, vertices: &[Vec3], indices: &[u32], style: &FillStyle)
        -> Result<Self::Handle, RenderError>;

    fn dispose(&mut self, handle: Self::Handle);
}

/// Named child of the globe; children inherit the globe's transform.
#[derive(Debug, Clone, PartialEq)]
pub struct OverlayGroup<H> {
    name: String,
    children: Vec<H>,
}

impl<H> OverlayGroup<H> {
    pub fn new(name: impl Into<String>) -> Self {
        OverlayGroup {
            name: name.into(),
            children: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn children(&self) -> &[H] {
        &self.children
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    pub fn add(&mut self, child: H) {
        self.children.push(child);
    }

    /// Detaches all children. The caller is responsible for disposing them.
    pub fn take_children(&mut self) -> Vec<H> {
        std::mem::take(&mut self.children)
    }
}

/// The globe object the overlays are parented to.
pub trait GlobeSurface {
    type Handle;

    /// Radius of the globe's bounding sphere, `None` while the scene isn't set up yet.
    fn bounding_radius(&self) -> Option<f64>;

    fn overlay_mut(&mut self, name: &str) -> Option<&mut OverlayGroup<Self::Handle>>;

    fn attach_overlay(&mut self, group: OverlayGroup<Self::Handle>);
}

/// Finds the named overlay group, attaching an empty one first if the globe has none.
pub fn overlay_or_attach<'g, G: GlobeSurface>(globe: &'g mut G, name: &str)
    -> Option<&'g mut OverlayGroup<G::Handle>>
{
    if globe.overlay_mut(name).is_none() {
        globe.attach_overlay(OverlayGroup::new(name));
    }
    globe.overlay_mut(name)
}
