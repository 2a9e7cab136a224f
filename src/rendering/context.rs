use crate::core::geo::{Coordinate, TileCoord};
use crate::style::{Color, Style};
use crate::{MapError, Result};
use std::sync::Arc;

/// Unified style conversion trait to eliminate duplicate conversion patterns
pub trait StyleConversion<T> {
    fn to_render_style(&self, opacity_multiplier: f32) -> T;
}

/// Styles for different rendering primitives
#[derive(Debug, Clone, PartialEq)]
pub struct PointRenderStyle {
    pub fill_color: Color,
    pub stroke_color: Color,
    pub stroke_width: f32,
    pub radius: f32,
    pub opacity: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LineRenderStyle {
    pub color: Color,
    pub width: f32,
    pub opacity: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PolygonRenderStyle {
    pub fill_color: Color,
    pub stroke_color: Color,
    pub stroke_width: f32,
    pub opacity: f32,
}

impl PolygonRenderStyle {
    /// Whether drawing with this style would put any pixel on screen
    pub fn is_visible(&self) -> bool {
        self.opacity > 0.0
            && (!self.fill_color.is_transparent()
                || (self.stroke_width > 0.0 && !self.stroke_color.is_transparent()))
    }
}

fn stroke_parts(style: &Style) -> (Color, f32) {
    match style.stroke {
        Some(stroke) if stroke.is_visible() => (stroke.color.unwrap_or(Color::TRANSPARENT), stroke.width),
        _ => (Color::TRANSPARENT, 0.0),
    }
}

impl StyleConversion<PointRenderStyle> for Style {
    fn to_render_style(&self, opacity_multiplier: f32) -> PointRenderStyle {
        match self.image {
            Some(circle) => {
                let (stroke_color, stroke_width) = match circle.stroke {
                    Some(stroke) if stroke.is_visible() => {
                        (stroke.color.unwrap_or(Color::TRANSPARENT), stroke.width)
                    }
                    _ => (Color::TRANSPARENT, 0.0),
                };
                PointRenderStyle {
                    fill_color: circle.fill.map(|f| f.color).unwrap_or(Color::TRANSPARENT),
                    stroke_color,
                    stroke_width,
                    radius: circle.radius,
                    opacity: opacity_multiplier,
                }
            }
            None => PointRenderStyle {
                fill_color: Color::TRANSPARENT,
                stroke_color: Color::TRANSPARENT,
                stroke_width: 0.0,
                radius: 0.0,
                opacity: 0.0,
            },
        }
    }
}

impl StyleConversion<LineRenderStyle> for Style {
    fn to_render_style(&self, opacity_multiplier: f32) -> LineRenderStyle {
        let (color, width) = stroke_parts(self);
        LineRenderStyle {
            color,
            width,
            opacity: opacity_multiplier,
        }
    }
}

impl StyleConversion<PolygonRenderStyle> for Style {
    fn to_render_style(&self, opacity_multiplier: f32) -> PolygonRenderStyle {
        let (stroke_color, stroke_width) = stroke_parts(self);
        PolygonRenderStyle {
            fill_color: self.fill_color(),
            stroke_color,
            stroke_width,
            opacity: opacity_multiplier,
        }
    }
}

/// Per-frame display list. Layers push draw commands in screen pixels; the
/// host (egui viewer, tests) decides how to turn them into pixels.
pub struct RenderContext {
    pub width: u32,
    pub height: u32,
    pub drawing_queue: Vec<DrawCommand>,
    /// Viewport clipping bounds (min, max) in screen coordinates
    pub clip_bounds: Option<(Coordinate, Coordinate)>,
    pub clipping_enabled: bool,
}

/// Commands that can be issued to the render context
#[derive(Debug, Clone)]
pub enum DrawCommand {
    Point {
        position: Coordinate,
        style: PointRenderStyle,
    },
    Line {
        points: Vec<Coordinate>,
        style: LineRenderStyle,
    },
    Polygon {
        exterior: Vec<Coordinate>,
        holes: Vec<Vec<Coordinate>>,
        style: PolygonRenderStyle,
    },
    Tile {
        layer_id: Arc<str>,
        coord: TileCoord,
        data: Arc<Vec<u8>>,
        bounds: (Coordinate, Coordinate), // min, max screen coordinates
        opacity: f32,
    },
}

impl RenderContext {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            drawing_queue: Vec::new(),
            clip_bounds: None,
            clipping_enabled: false,
        }
    }

    /// Begin a frame, dropping the previous display list
    pub fn begin_frame(&mut self) {
        self.drawing_queue.clear();
    }

    /// Resizes the target; clipping follows the new size when enabled
    pub fn resize(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
        if self.clipping_enabled {
            self.set_clip_bounds(
                Coordinate::new(0.0, 0.0),
                Coordinate::new(width as f64, height as f64),
            );
        }
    }

    pub fn render_point(&mut self, position: &Coordinate, style: &PointRenderStyle) {
        if self.clipping_enabled && !self.point_visible(position, style.radius as f64) {
            return;
        }
        self.drawing_queue.push(DrawCommand::Point {
            position: *position,
            style: style.clone(),
        });
    }

    pub fn render_line(&mut self, points: &[Coordinate], style: &LineRenderStyle) {
        if points.len() < 2 {
            return;
        }
        self.drawing_queue.push(DrawCommand::Line {
            points: points.to_vec(),
            style: style.clone(),
        });
    }

    pub fn render_polygon(
        &mut self,
        exterior: &[Coordinate],
        holes: &[Vec<Coordinate>],
        style: &PolygonRenderStyle,
    ) {
        if exterior.len() < 3 {
            return;
        }
        self.drawing_queue.push(DrawCommand::Polygon {
            exterior: exterior.to_vec(),
            holes: holes.to_vec(),
            style: style.clone(),
        });
    }

    /// Queue a tile. Tiles completely outside the clip rectangle are dropped.
    pub fn render_tile(
        &mut self,
        layer_id: Arc<str>,
        coord: TileCoord,
        data: Arc<Vec<u8>>,
        bounds: (Coordinate, Coordinate),
        opacity: f32,
    ) -> Result<()> {
        if bounds.0.x >= bounds.1.x || bounds.0.y >= bounds.1.y {
            return Err(MapError::Layer(format!("invalid bounds for tile {}", coord)));
        }
        if !(0.0..=1.0).contains(&opacity) {
            return Err(MapError::Layer("opacity must be between 0.0 and 1.0".to_string()));
        }
        if self.clipping_enabled && !self.bounds_visible(bounds) {
            return Ok(());
        }

        self.drawing_queue.push(DrawCommand::Tile {
            layer_id,
            coord,
            data,
            bounds,
            opacity,
        });
        Ok(())
    }

    pub fn get_drawing_queue(&self) -> &[DrawCommand] {
        &self.drawing_queue
    }

    /// Set viewport clipping bounds
    pub fn set_clip_bounds(&mut self, min: Coordinate, max: Coordinate) {
        self.clip_bounds = Some((min, max));
        self.clipping_enabled = true;
    }

    fn bounds_visible(&self, (min, max): (Coordinate, Coordinate)) -> bool {
        match self.clip_bounds {
            Some((clip_min, clip_max)) => {
                !(max.x < clip_min.x || min.x > clip_max.x || max.y < clip_min.y || min.y > clip_max.y)
            }
            None => true,
        }
    }

    fn point_visible(&self, position: &Coordinate, radius: f64) -> bool {
        self.bounds_visible((
            Coordinate::new(position.x - radius, position.y - radius),
            Coordinate::new(position.x + radius, position.y + radius),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::style::{position_style, Classification, Fill, Stroke};

    #[test]
    fn test_transparent_polygon_style_is_invisible() {
        let water: PolygonRenderStyle = Classification::Water.style().to_render_style(0.5);
        assert!(!water.is_visible());
        let road: PolygonRenderStyle = Classification::RoadNetwork.style().to_render_style(0.5);
        assert!(!road.is_visible());

        let built: PolygonRenderStyle = Classification::Built.style().to_render_style(0.5);
        assert!(built.is_visible());
        assert_eq!(built.opacity, 0.5);
        assert_eq!(built.stroke_width, 1.0);
    }

    #[test]
    fn test_point_style_from_circle() {
        let point: PointRenderStyle = position_style().to_render_style(1.0);
        assert_eq!(point.radius, 6.0);
        assert_eq!(point.fill_color, Color::rgb(0x33, 0x99, 0xcc));
        assert_eq!(point.stroke_color, Color::WHITE);
        assert_eq!(point.stroke_width, 2.0);
    }

    #[test]
    fn test_line_style_without_stroke_has_no_width() {
        let style = Style::new(Some(Fill::new(Color::WHITE)), Some(Stroke::width_only(3.0)));
        let line: LineRenderStyle = style.to_render_style(1.0);
        assert_eq!(line.width, 0.0);
    }

    #[test]
    fn test_tile_clipping() {
        let mut ctx = RenderContext::new(256, 256);
        ctx.set_clip_bounds(Coordinate::new(0.0, 0.0), Coordinate::new(256.0, 256.0));
        let data = Arc::new(vec![0u8; 4]);
        let layer: Arc<str> = Arc::from("osm");

        ctx.render_tile(
            layer.clone(),
            TileCoord::new(0, 0, 1),
            data.clone(),
            (Coordinate::new(300.0, 0.0), Coordinate::new(556.0, 256.0)),
            1.0,
        )
        .unwrap();
        assert!(ctx.get_drawing_queue().is_empty());

        ctx.render_tile(
            layer,
            TileCoord::new(0, 0, 1),
            data,
            (Coordinate::new(-100.0, 0.0), Coordinate::new(156.0, 256.0)),
            1.0,
        )
        .unwrap();
        assert_eq!(ctx.get_drawing_queue().len(), 1);

        ctx.begin_frame();
        assert!(ctx.get_drawing_queue().is_empty());
    }

    #[test]
    fn test_invalid_tile_bounds() {
        let mut ctx = RenderContext::new(10, 10);
        let result = ctx.render_tile(
            Arc::from("osm"),
            TileCoord::new(0, 0, 0),
            Arc::new(Vec::new()),
            (Coordinate::new(5.0, 5.0), Coordinate::new(1.0, 1.0)),
            1.0,
        );
        assert!(matches!(result, Err(MapError::Layer(_))));
    }
}
