use nalgebra::Point2;
use serde::{Deserialize, Serialize};

/// An axis-aligned box given by its top-left corner and its size, as the
/// detector reports it.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f32; 4]", into = "[f32; 4]")]
pub struct BoxRect {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl BoxRect {
    pub fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self { x, y, w, h }
    }

    pub fn center(&self) -> Point2<f32> {
        Point2::new(self.x + self.w / 2.0, self.y + self.h / 2.0)
    }
}

impl From<[f32; 4]> for BoxRect {
    fn from([x, y, w, h]: [f32; 4]) -> Self {
        Self { x, y, w, h }
    }
}

impl From<BoxRect> for [f32; 4] {
    fn from(b: BoxRect) -> Self {
        [b.x, b.y, b.w, b.h]
    }
}

/// An axis-aligned rectangle given by two opposite corners.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Rectangle {
    pub top_left: Point2<f32>,
    pub bottom_right: Point2<f32>,
}

impl Rectangle {
    /// The four corners in the order top-left, top-right, bottom-right,
    /// bottom-left.
    pub fn corners(&self) -> [Point2<f32>; 4] {
        let (x_min, y_min) = (self.top_left.x, self.top_left.y);
        let (x_max, y_max) = (self.bottom_right.x, self.bottom_right.y);
        [
            Point2::new(x_min, y_min),
            Point2::new(x_max, y_min),
            Point2::new(x_max, y_max),
            Point2::new(x_min, y_max),
        ]
    }
}

/// A simple polygon, given by its vertices in order.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Polygon {
    pub vertices: Vec<Point2<f32>>,
}

impl Polygon {
    pub fn new(vertices: Vec<Point2<f32>>) -> Self {
        Self { vertices }
    }

    /// Even-odd ray casting. Points exactly on an edge may land on either side.
    pub fn contains(&self, p: Point2<f32>) -> bool {
        let n = self.vertices.len();
        if n < 3 {
            return false;
        }
        let mut inside = false;
        let mut j = n - 1;
        for i in 0..n {
            let (a, b) = (self.vertices[i], self.vertices[j]);
            if (a.y > p.y) != (b.y > p.y) {
                let x_cross = a.x + (p.y - a.y) * (b.x - a.x) / (b.y - a.y);
                if p.x < x_cross {
                    inside = !inside;
                }
            }
            j = i;
        }
        inside
    }

    /// The mean of the vertices.
    pub fn centroid(&self) -> Point2<f32> {
        let n = self.vertices.len().max(1) as f32;
        let (sx, sy) = self
            .vertices
            .iter()
            .fold((0.0, 0.0), |(sx, sy), v| (sx + v.x, sy + v.y));
        Point2::new(sx / n, sy / n)
    }

    pub fn map(&self, f: impl Fn(Point2<f32>) -> Point2<f32>) -> Polygon {
        Polygon::new(self.vertices.iter().map(|&v| f(v)).collect())
    }
}

impl From<[Point2<f32>; 4]> for Polygon {
    fn from(quad: [Point2<f32>; 4]) -> Self {
        Polygon::new(quad.to_vec())
    }
}
