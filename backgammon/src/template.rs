use nalgebra::Point2;
use serde::{Deserialize, Serialize};

use crate::{Polygon, NUM_POINTS};

/// Id of the bar in a [`Template`]; it always comes after the 24 points.
pub const BAR_ID: usize = NUM_POINTS + 1;

pub const TEMPLATE_WIDTH: f32 = 1200.0;
pub const TEMPLATE_HEIGHT: f32 = 900.0;
/// Width of the wooden frame around the playing area.
pub const TEMPLATE_FRAME: f32 = 40.0;
pub const TEMPLATE_BAR_WIDTH: f32 = 80.0;

/// A point (or the bar) as it appears in the template.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TemplatePoint {
    pub id: usize,
    pub center: Point2<f32>,
    pub polygon: Polygon,
}

/// The calibration template: a flat, head-on view of the board.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Template {
    pub width: f32,
    pub height: f32,
    /// The 24 points followed by the bar.
    pub points: Vec<TemplatePoint>,
}

impl Default for Template {
    fn default() -> Self {
        Self::standard()
    }
}

impl Template {
    /// The layout of the reference board.
    ///
    /// Points 1-6 run from the right edge to the bar along the bottom half,
    /// 7-12 continue to the left edge, 13-18 run from the left edge to the bar
    /// along the top half and 19-24 continue to the right edge.
    pub fn standard() -> Self {
        let (w, h, frame, bar) = (
            TEMPLATE_WIDTH,
            TEMPLATE_HEIGHT,
            TEMPLATE_FRAME,
            TEMPLATE_BAR_WIDTH,
        );
        let half_width = (w - 2.0 * frame - bar) / 2.0;
        let point_width = half_width / 6.0;
        let mid_y = h / 2.0;
        let left_start = frame;
        let right_start = frame + half_width + bar;

        let mut points = Vec::with_capacity(BAR_ID);
        for id in 1..=NUM_POINTS {
            // Column counted from the left edge of the board, 0..12
            let (column, top) = match id {
                1..=12 => (12 - id, false),
                _ => (id - 13, true),
            };
            let x0 = if column < 6 {
                left_start + column as f32 * point_width
            } else {
                right_start + (column - 6) as f32 * point_width
            };
            let (y0, y1) = if top { (frame, mid_y) } else { (mid_y, h - frame) };
            points.push(TemplatePoint::quad(id, x0, y0, x0 + point_width, y1));
        }
        let bar_x0 = frame + half_width;
        points.push(TemplatePoint::quad(BAR_ID, bar_x0, frame, bar_x0 + bar, h - frame));

        Self {
            width: w,
            height: h,
            points,
        }
    }

    /// The template's own corners: top-left, top-right, bottom-right, bottom-left.
    pub fn corners(&self) -> [Point2<f32>; 4] {
        [
            Point2::new(0.0, 0.0),
            Point2::new(self.width, 0.0),
            Point2::new(self.width, self.height),
            Point2::new(0.0, self.height),
        ]
    }
}

impl TemplatePoint {
    fn quad(id: usize, x0: f32, y0: f32, x1: f32, y1: f32) -> Self {
        let polygon = Polygon::from([
            Point2::new(x0, y0),
            Point2::new(x1, y0),
            Point2::new(x1, y1),
            Point2::new(x0, y1),
        ]);
        Self {
            id,
            center: polygon.centroid(),
            polygon,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_layout() {
        let template = Template::standard();
        assert_eq!(template.points.len(), BAR_ID);
        for (idx, point) in template.points.iter().enumerate() {
            assert_eq!(point.id, idx + 1);
        }

        let p1 = &template.points[0];
        let p12 = &template.points[11];
        let p13 = &template.points[12];
        let p24 = &template.points[23];
        // 1 and 24 face each other on the right, 12 and 13 on the left
        assert!(p1.center.x > p12.center.x && p1.center.y > template.height / 2.0);
        assert!(p24.center.x > p13.center.x && p24.center.y < template.height / 2.0);
        assert!((p1.center.x - p24.center.x).abs() < 1e-3);
        assert!((p12.center.x - p13.center.x).abs() < 1e-3);
    }

    #[test]
    fn points_do_not_overlap() {
        let template = Template::standard();
        for a in &template.points {
            for b in &template.points {
                if a.id != b.id {
                    assert!(!b.polygon.contains(a.center), "{} inside {}", a.id, b.id);
                }
            }
        }
    }

    #[test]
    fn bar_separates_halves() {
        let template = Template::standard();
        let bar_x = template.points[BAR_ID - 1].polygon.vertices[0].x;
        assert!(template.points[5].center.x > bar_x); // point 6
        assert!(template.points[6].center.x < bar_x); // point 7
    }
}
