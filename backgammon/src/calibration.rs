use nalgebra::{Matrix3, Point2, SMatrix, SVector, Vector2, Vector3};
use tracing::debug;

use crate::{CalibrationError, Polygon, Template, BAR_ID};

/// A perspective transform, mapping `p` to `H * p` in homogeneous coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Homography {
    pub h: Matrix3<f64>,
}

impl Homography {
    pub fn new(h: Matrix3<f64>) -> Self {
        Self { h }
    }

    #[inline]
    pub fn apply(&self, p: Point2<f32>) -> Point2<f32> {
        let v = self.h * Vector3::new(p.x as f64, p.y as f64, 1.0);
        let w = v[2];
        Point2::new((v[0] / w) as f32, (v[1] / w) as f32)
    }

    pub fn inverse(&self) -> Option<Self> {
        self.h.try_inverse().map(Self::new)
    }

    /// Computes H such that `dst ~ H * src` from four correspondences.
    ///
    /// Corner order must be consistent between `src` and `dst`. A mismatch is
    /// not detected and yields a mirrored or rotated mapping.
    pub fn from_4pt(src: &[Point2<f32>; 4], dst: &[Point2<f32>; 4]) -> Option<Self> {
        if has_collinear_triple(src) || has_collinear_triple(dst) {
            return None;
        }
        let (from, to) = (Conditioner::fit(src), Conditioner::fit(dst));

        // Two equations per correspondence in h11..h32, with h33 fixed to 1
        let mut a = SMatrix::<f64, 8, 8>::zeros();
        let mut b = SVector::<f64, 8>::zeros();
        for (k, (s, d)) in src.iter().zip(dst).enumerate() {
            let (x, y) = from.apply(*s);
            let (u, v) = to.apply(*d);
            a.set_row(
                2 * k,
                &SMatrix::<f64, 1, 8>::from_row_slice(&[x, y, 1.0, 0.0, 0.0, 0.0, -u * x, -u * y]),
            );
            a.set_row(
                2 * k + 1,
                &SMatrix::<f64, 1, 8>::from_row_slice(&[0.0, 0.0, 0.0, x, y, 1.0, -v * x, -v * y]),
            );
            b[2 * k] = u;
            b[2 * k + 1] = v;
        }

        let solution = a.lu().solve(&b)?;
        if solution.iter().any(|c| !c.is_finite()) {
            return None;
        }
        let mut entries = [1.0; 9];
        entries[..8].copy_from_slice(solution.as_slice());
        let conditioned = Matrix3::from_row_slice(&entries);

        let h = to.undo() * conditioned * from.matrix();
        let scale = h[(2, 2)];
        if scale.abs() < 1e-12 {
            return None;
        }
        Some(Self::new(h / scale))
    }
}

fn has_collinear_triple(pts: &[Point2<f32>; 4]) -> bool {
    const TRIPLES: [[usize; 3]; 4] = [[0, 1, 2], [0, 1, 3], [0, 2, 3], [1, 2, 3]];
    TRIPLES.iter().any(|&[a, b, c]| {
        let (ab, ac) = (pts[b] - pts[a], pts[c] - pts[a]);
        let cross = ab.x as f64 * ac.y as f64 - ab.y as f64 * ac.x as f64;
        cross.abs() < 1e-9
    })
}

/// Moves four points to their centroid and scales them to a mean distance
/// of sqrt(2), which keeps the 8x8 system well conditioned.
struct Conditioner {
    center: Vector2<f64>,
    scale: f64,
}

impl Conditioner {
    fn fit(pts: &[Point2<f32>; 4]) -> Self {
        let pts = pts.map(|p| Vector2::new(p.x as f64, p.y as f64));
        let center = pts.iter().sum::<Vector2<f64>>() / 4.0;
        let spread = pts.iter().map(|p| (p - center).norm()).sum::<f64>() / 4.0;
        let scale = if spread > 1e-12 {
            std::f64::consts::SQRT_2 / spread
        } else {
            1.0
        };
        Self { center, scale }
    }

    fn apply(&self, p: Point2<f32>) -> (f64, f64) {
        let v = (Vector2::new(p.x as f64, p.y as f64) - self.center) * self.scale;
        (v.x, v.y)
    }

    fn matrix(&self) -> Matrix3<f64> {
        let (s, c) = (self.scale, self.center);
        Matrix3::new(s, 0.0, -s * c.x, 0.0, s, -s * c.y, 0.0, 0.0, 1.0)
    }

    /// The inverse of [`Conditioner::matrix`].
    fn undo(&self) -> Matrix3<f64> {
        let (s, c) = (self.scale, self.center);
        Matrix3::new(1.0 / s, 0.0, c.x, 0.0, 1.0 / s, c.y, 0.0, 0.0, 1.0)
    }
}

/// The template aligned to one photographed board.
///
/// Only valid for the frame it was computed for; if the camera or the board
/// may have moved, calibrate again.
#[derive(Clone, Debug)]
pub struct Calibration {
    /// Maps template coordinates to image coordinates.
    pub homography: Homography,
    /// The warped polygons of points 1-24 followed by the bar.
    pub points: Vec<Polygon>,
    /// The board's outline in the image.
    pub board: Polygon,
}

impl Calibration {
    pub fn bar(&self) -> &Polygon {
        &self.points[BAR_ID - 1]
    }
}

/// Aligns the template to the board whose corners were found at `corners`,
/// given as top-left, top-right, bottom-right, bottom-left.
pub fn calibrate(
    template: &Template,
    corners: [Point2<f32>; 4],
) -> Result<Calibration, CalibrationError> {
    if template.points.len() != BAR_ID {
        return Err(CalibrationError::IncompleteTemplate {
            num_points: template.points.len(),
        });
    }
    let homography = Homography::from_4pt(&template.corners(), &corners)
        .ok_or(CalibrationError::DegenerateCorners)?;
    debug!(h = ?homography.h, "Aligned template to board");

    let points = template
        .points
        .iter()
        .map(|p| p.polygon.map(|v| homography.apply(v)))
        .collect();

    Ok(Calibration {
        homography,
        points,
        board: Polygon::from(corners),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(a: Point2<f32>, b: Point2<f32>, tol: f32) {
        assert!(
            (a.x - b.x).abs() < tol && (a.y - b.y).abs() < tol,
            "expected ({:.4},{:.4}) ~ ({:.4},{:.4}) within {}",
            a.x,
            a.y,
            b.x,
            b.y,
            tol
        );
    }

    #[test]
    fn four_point_maps_corners() {
        let src = [
            Point2::new(0.0, 0.0),
            Point2::new(1200.0, 0.0),
            Point2::new(1200.0, 900.0),
            Point2::new(0.0, 900.0),
        ];
        let dst = [
            Point2::new(103.0, 87.0),
            Point2::new(512.0, 95.0),
            Point2::new(540.0, 410.0),
            Point2::new(80.0, 400.0),
        ];
        let h = Homography::from_4pt(&src, &dst).unwrap();
        for (s, d) in src.iter().zip(&dst) {
            assert_close(h.apply(*s), *d, 1e-2);
        }
        let inv = h.inverse().unwrap();
        assert_close(inv.apply(dst[2]), src[2], 0.1);
    }

    #[test]
    fn conditioner_round_trips() {
        let pts = [
            Point2::new(103.0, 87.0),
            Point2::new(512.0, 95.0),
            Point2::new(540.0, 410.0),
            Point2::new(80.0, 400.0),
        ];
        let conditioner = Conditioner::fit(&pts);
        let product = conditioner.undo() * conditioner.matrix();
        assert!((product - Matrix3::identity()).norm() < 1e-9);
        let mean: f64 = pts
            .iter()
            .map(|&p| {
                let (x, y) = conditioner.apply(p);
                (x * x + y * y).sqrt()
            })
            .sum::<f64>()
            / 4.0;
        assert!((mean - std::f64::consts::SQRT_2).abs() < 1e-9);
    }

    #[test]
    fn collinear_corners_are_rejected() {
        let template = Template::standard();
        let corners = [
            Point2::new(0.0, 0.0),
            Point2::new(1.0, 1.0),
            Point2::new(2.0, 2.0),
            Point2::new(3.0, 3.0),
        ];
        assert_eq!(
            calibrate(&template, corners).unwrap_err(),
            CalibrationError::DegenerateCorners
        );
    }

    #[test]
    fn scaled_board_scales_polygons() {
        let template = Template::standard();
        let corners = [
            Point2::new(0.0, 0.0),
            Point2::new(600.0, 0.0),
            Point2::new(600.0, 450.0),
            Point2::new(0.0, 450.0),
        ];
        let calibration = calibrate(&template, corners).unwrap();
        assert_eq!(calibration.points.len(), BAR_ID);
        for (warped, original) in calibration.points.iter().zip(&template.points) {
            for (w, o) in warped.vertices.iter().zip(&original.polygon.vertices) {
                assert_close(*w, Point2::new(o.x / 2.0, o.y / 2.0), 1e-2);
            }
        }
        assert!(calibration.board.contains(Point2::new(300.0, 200.0)));
    }

    #[test]
    fn incomplete_template() {
        let mut template = Template::standard();
        template.points.pop();
        let corners = Template::standard().corners();
        assert_eq!(
            calibrate(&template, corners).unwrap_err(),
            CalibrationError::IncompleteTemplate { num_points: 24 }
        );
    }
}
