pub mod context;

// Re-export main types
pub use context::{
    DrawCommand, LineRenderStyle, PointRenderStyle, PolygonRenderStyle, RenderContext,
    StyleConversion,
};
