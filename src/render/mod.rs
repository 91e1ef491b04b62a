pub mod buffers;
pub mod renderer;
pub mod scene;

pub use buffers::{BufferHandle, BufferPrimitives, GeometryBuffers, GeometryKind, Globe};
pub use renderer::{RenderOptions, SphereRenderer, RADIUS_FACTOR};
pub use scene::{
    FillStyle, GlobeSurface, LineStyle, OverlayGroup, Primitives, RenderError, BORDER_STYLE, FILL_STYLE,
    OVERLAY_NAME,
};
