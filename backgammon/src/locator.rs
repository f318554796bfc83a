use nalgebra::{distance, Point2};

use crate::{BoxRect, Rectangle};

/// Finds the board by its corner markers.
///
/// Of all boxes whose class is in `target_classes`, the two with the most
/// distant centers are taken to be opposite corners of the board, and the
/// rectangle enclosing both boxes is returned. On ties the first pair in input
/// order wins. Returns `None` if fewer than two boxes have a target class.
///
/// `boxes` and `classes` are parallel lists.
pub fn locate_rectangle(
    boxes: &[BoxRect],
    classes: &[u32],
    target_classes: &[u32],
) -> Option<Rectangle> {
    let candidates: Vec<&BoxRect> = boxes
        .iter()
        .zip(classes)
        .filter(|(_, class)| target_classes.contains(class))
        .map(|(b, _)| b)
        .collect();

    let centers: Vec<Point2<f32>> = candidates.iter().map(|b| b.center()).collect();
    let mut farthest: Option<(f32, usize, usize)> = None;
    for i in 0..candidates.len() {
        for j in (i + 1)..candidates.len() {
            let d = distance(&centers[i], &centers[j]);
            if farthest.map_or(true, |(best, _, _)| d > best) {
                farthest = Some((d, i, j));
            }
        }
    }

    let (_, i, j) = farthest?;
    let (a, b) = (candidates[i], candidates[j]);
    Some(Rectangle {
        top_left: Point2::new(a.x.min(b.x), a.y.min(b.y)),
        bottom_right: Point2::new((a.x + a.w).max(b.x + b.w), (a.y + a.h).max(b.y + b.h)),
    })
}
