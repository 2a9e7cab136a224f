//! egui front end: paints the map display list and forwards pointer input

use crate::{
    core::{
        geo::{Coordinate, TileCoord},
        map::Map,
    },
    input::{events::InputEvent, handler::view_center_pixel},
    prelude::{HashMap, HashSet},
    rendering::context::{
        DrawCommand, LineRenderStyle, PointRenderStyle, PolygonRenderStyle, RenderContext,
    },
    style::Color,
    ui::controls::Attribution,
};
use egui::{Align2, Color32, ColorImage, FontId, Pos2, Rect, Response, Sense, Shape, Stroke, TextureHandle, Ui, Vec2};
use geo::TriangulateEarcut;
use std::sync::Arc;
use std::time::Duration;

/// How often to repaint while tiles or data may still be arriving
const POLL_INTERVAL: Duration = Duration::from_millis(100);

fn color32(color: Color, opacity: f32) -> Color32 {
    let alpha = (color.a as f32 * opacity.clamp(0.0, 1.0)).round() as u8;
    Color32::from_rgba_unmultiplied(color.r, color.g, color.b, alpha)
}

fn to_pos(rect: Rect, pixel: &Coordinate) -> Pos2 {
    Pos2::new(rect.min.x + pixel.x as f32, rect.min.y + pixel.y as f32)
}

/// Decodes PNG/JPEG tile bytes into an egui image
pub fn decode_tile(bytes: &[u8]) -> Option<ColorImage> {
    let image = image::load_from_memory(bytes).ok()?.to_rgba8();
    let size = [image.width() as usize, image.height() as usize];
    Some(ColorImage::from_rgba_unmultiplied(size, image.as_raw()))
}

/// Textures of the tiles drawn in the last frame. Tiles that fail to decode
/// are remembered so they are not decoded again.
#[derive(Default)]
struct TileTextures {
    textures: HashMap<(Arc<str>, TileCoord), Option<TextureHandle>>,
    used: HashSet<(Arc<str>, TileCoord)>,
}

impl TileTextures {
    fn get_or_load(
        &mut self,
        ctx: &egui::Context,
        layer_id: &Arc<str>,
        coord: TileCoord,
        data: &[u8],
    ) -> Option<egui::TextureId> {
        let key = (Arc::clone(layer_id), coord);
        self.used.insert(key.clone());
        self.textures
            .entry(key)
            .or_insert_with(|| {
                let image = decode_tile(data);
                if image.is_none() {
                    log::debug!("tile {} of {} is not a decodable image", coord, layer_id);
                }
                image.map(|image| {
                    ctx.load_texture(
                        format!("{}/{}", layer_id, coord),
                        image,
                        egui::TextureOptions::LINEAR,
                    )
                })
            })
            .as_ref()
            .map(TextureHandle::id)
    }

    /// Drops the textures of tiles that were not drawn since the last call
    fn end_frame(&mut self) {
        let used = std::mem::take(&mut self.used);
        self.textures.retain(|key, _| used.contains(key));
    }
}

/// Widget state kept across frames by the host
pub struct MapWidget {
    context: RenderContext,
    textures: TileTextures,
    attribution: Attribution,
    interactive: bool,
}

impl MapWidget {
    pub fn new(attribution: Attribution) -> Self {
        Self {
            context: RenderContext::new(1, 1),
            textures: TileTextures::default(),
            attribution,
            interactive: true,
        }
    }

    pub fn interactive(mut self, interactive: bool) -> Self {
        self.interactive = interactive;
        self
    }

    pub fn attribution(&self) -> &Attribution {
        &self.attribution
    }

    /// Updates, renders and paints `map` into the remaining space of `ui`
    pub fn show(&mut self, ui: &mut Ui, map: &mut Map) -> Response {
        let (rect, response) = ui.allocate_exact_size(ui.available_size(), Sense::click_and_drag());

        map.handle_input(&InputEvent::Resize {
            width: rect.width() as f64,
            height: rect.height() as f64,
        });
        if self.interactive {
            self.forward_input(ui, &response, rect, map);
        }

        if let Err(e) = map.update() {
            log::warn!("map update failed: {}", e);
        }
        if let Err(e) = map.render(&mut self.context) {
            log::warn!("map render failed: {}", e);
        }

        let painter = ui.painter_at(rect);
        painter.rect_filled(rect, 0.0, Color32::from_gray(240));
        for command in self.context.get_drawing_queue() {
            match command {
                DrawCommand::Tile {
                    layer_id,
                    coord,
                    data,
                    bounds,
                    opacity,
                } => {
                    if let Some(texture) = self.textures.get_or_load(ui.ctx(), layer_id, *coord, data) {
                        let tile_rect = Rect::from_two_pos(to_pos(rect, &bounds.0), to_pos(rect, &bounds.1));
                        painter.image(
                            texture,
                            tile_rect,
                            Rect::from_min_max(Pos2::ZERO, Pos2::new(1.0, 1.0)),
                            Color32::WHITE.gamma_multiply(*opacity),
                        );
                    }
                }
                DrawCommand::Polygon {
                    exterior,
                    holes,
                    style,
                } => paint_polygon(&painter, rect, exterior, holes, style),
                DrawCommand::Line { points, style } => paint_line(&painter, rect, points, style),
                DrawCommand::Point { position, style } => paint_point(&painter, rect, position, style),
            }
        }
        self.textures.end_frame();

        self.paint_attribution(ui, rect, map);
        if map.loading_indicator().is_visible() {
            paint_loading(&painter, rect);
        }

        ui.ctx().request_repaint_after(POLL_INTERVAL);
        response
    }

    fn forward_input(&self, ui: &Ui, response: &Response, rect: Rect, map: &mut Map) {
        if response.dragged() {
            let delta = response.drag_delta();
            map.handle_input(&InputEvent::Drag {
                delta: Coordinate::new(delta.x as f64, delta.y as f64),
            });
        }

        if response.hovered() {
            let scroll = ui.input(|i| i.raw_scroll_delta.y);
            if scroll.abs() > 0.0 {
                let position = response
                    .hover_pos()
                    .map(|pos| Coordinate::new((pos.x - rect.min.x) as f64, (pos.y - rect.min.y) as f64))
                    .unwrap_or_else(|| view_center_pixel(&map.view));
                map.handle_input(&InputEvent::Scroll {
                    delta: scroll as f64,
                    position,
                });
            }
        }
    }

    fn paint_attribution(&mut self, ui: &mut Ui, rect: Rect, map: &Map) {
        let credits = Attribution::collect(map.layers());
        if credits.is_empty() {
            return;
        }

        let margin = 6.0;
        let button_size = Vec2::splat(20.0);
        let button_rect = Rect::from_min_size(rect.right_bottom() - button_size - Vec2::splat(margin), button_size);

        if self.attribution.is_collapsible() {
            let label = if self.attribution.is_collapsed() { "i" } else { "»" };
            if ui.put(button_rect, egui::Button::new(label)).clicked() {
                self.attribution.toggle();
            }
        }
        if self.attribution.is_collapsed() {
            return;
        }

        let painter = ui.painter_at(rect);
        let anchor = if self.attribution.is_collapsible() {
            Pos2::new(button_rect.min.x - margin, button_rect.center().y)
        } else {
            Pos2::new(rect.max.x - margin, button_rect.center().y)
        };
        let galley = painter.layout_no_wrap(credits.join(" | "), FontId::proportional(11.0), Color32::from_gray(40));
        let text_rect = Align2::RIGHT_CENTER.anchor_rect(Rect::from_min_size(anchor, galley.size()));
        painter.rect_filled(text_rect.expand(3.0), 2.0, Color32::from_white_alpha(200));
        painter.galley(text_rect.min, galley, Color32::from_gray(40));
    }
}

impl Default for MapWidget {
    fn default() -> Self {
        Self::new(Attribution::default())
    }
}

fn paint_polygon(
    painter: &egui::Painter,
    rect: Rect,
    exterior: &[Coordinate],
    holes: &[Vec<Coordinate>],
    style: &PolygonRenderStyle,
) {
    let fill = color32(style.fill_color, style.opacity);
    if fill.a() > 0 {
        let ring = |points: &[Coordinate]| {
            geo_types::LineString::from(points.iter().map(|p| (p.x, p.y)).collect::<Vec<_>>())
        };
        let polygon = geo_types::Polygon::new(ring(exterior), holes.iter().map(|h| ring(h)).collect());

        let mut mesh = egui::Mesh::default();
        for triangle in polygon.earcut_triangles_iter() {
            let base = mesh.vertices.len() as u32;
            for corner in [triangle.0, triangle.1, triangle.2] {
                mesh.colored_vertex(to_pos(rect, &Coordinate::from(corner)), fill);
            }
            mesh.add_triangle(base, base + 1, base + 2);
        }
        painter.add(Shape::mesh(mesh));
    }

    let stroke_color = color32(style.stroke_color, style.opacity);
    if style.stroke_width > 0.0 && stroke_color.a() > 0 {
        let stroke = Stroke::new(style.stroke_width, stroke_color);
        for ring in std::iter::once(exterior).chain(holes.iter().map(Vec::as_slice)) {
            let points = ring.iter().map(|p| to_pos(rect, p)).collect();
            painter.add(Shape::closed_line(points, stroke));
        }
    }
}

fn paint_line(painter: &egui::Painter, rect: Rect, points: &[Coordinate], style: &LineRenderStyle) {
    let color = color32(style.color, style.opacity);
    if style.width <= 0.0 || color.a() == 0 {
        return;
    }
    let points = points.iter().map(|p| to_pos(rect, p)).collect();
    painter.add(Shape::line(points, Stroke::new(style.width, color)));
}

fn paint_point(painter: &egui::Painter, rect: Rect, position: &Coordinate, style: &PointRenderStyle) {
    painter.circle(
        to_pos(rect, position),
        style.radius,
        color32(style.fill_color, style.opacity),
        Stroke::new(style.stroke_width, color32(style.stroke_color, style.opacity)),
    );
}

fn paint_loading(painter: &egui::Painter, rect: Rect) {
    painter.rect_filled(rect, 0.0, Color32::from_white_alpha(180));
    painter.text(
        rect.center(),
        Align2::CENTER_CENTER,
        "Loading…",
        FontId::proportional(18.0),
        Color32::from_gray(60),
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(decode_tile(&[0u8; 10]).is_none());
        assert!(decode_tile(&[]).is_none());
    }

    #[test]
    fn test_decode_png() {
        let mut bytes = Vec::new();
        let image = image::RgbaImage::from_pixel(2, 3, image::Rgba([10, 20, 30, 255]));
        image::DynamicImage::ImageRgba8(image)
            .write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageOutputFormat::Png)
            .unwrap();

        let decoded = decode_tile(&bytes).unwrap();
        assert_eq!(decoded.size, [2, 3]);
        assert_eq!(decoded.pixels[0], Color32::from_rgb(10, 20, 30));
    }

    #[test]
    fn test_color_opacity() {
        let color = color32(Color::rgb(0xee, 0xcb, 0xaf), 0.5);
        assert_eq!(color, Color32::from_rgba_unmultiplied(0xee, 0xcb, 0xaf, 128));
        assert_eq!(color32(Color::TRANSPARENT, 1.0).a(), 0);
    }
}
