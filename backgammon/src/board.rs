use nalgebra::Point2;
use tracing::trace;

use crate::{
    Calibration, CheckerPositions, ClassMap, Color, DiceEntry, Detection, Polygon, TokenKind,
    BAR_ID,
};

/// A checker found on the board.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Disk {
    pub center: Point2<f32>,
    pub confidence: f32,
    pub color: Color,
}

/// Which side of the bar a die lies on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
}

/// A die found on the board.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Die {
    pub value: u8,
    pub center: Point2<f32>,
    pub confidence: f32,
    pub side: Side,
}

/// One of the 24 points, or the bar, with its outline in the image.
#[derive(Clone, Debug)]
pub struct BoardPoint {
    /// 1-24, or [`BAR_ID`] for the bar.
    pub id: usize,
    pub polygon: Polygon,
    /// The checkers on this point, in detection order.
    pub disks: Vec<Disk>,
}

/// Counts of what happened to the detections of one frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MappingStats {
    pub disks_assigned: usize,
    /// Disks that were not inside any point.
    pub disks_unassigned: usize,
    pub dice_kept: usize,
    /// Dice outside the board, e.g. rolled aside.
    pub dice_discarded: usize,
    /// Markers and classes the [`ClassMap`] doesn't know.
    pub ignored: usize,
}

/// Everything found on the board in one frame.
///
/// A board is built for one detection pass and thrown away afterwards.
#[derive(Clone, Debug)]
pub struct Board {
    /// Points 1-24 followed by the bar.
    pub points: Vec<BoardPoint>,
    /// The board's outline in the image.
    pub bbox: Polygon,
    pub dice: Vec<Die>,
    pub disks: Vec<Disk>,
}

impl Board {
    pub fn new(calibration: &Calibration) -> Self {
        let points = calibration
            .points
            .iter()
            .enumerate()
            .map(|(idx, polygon)| BoardPoint {
                id: idx + 1,
                polygon: polygon.clone(),
                disks: Vec::new(),
            })
            .collect();
        Self {
            points,
            bbox: calibration.board.clone(),
            dice: Vec::new(),
            disks: Vec::new(),
        }
    }

    pub fn bar(&self) -> &BoardPoint {
        &self.points[BAR_ID - 1]
    }

    /// Puts the disk on the first point containing its center.
    ///
    /// Returns the id of that point, or `None` if the disk is on no point.
    pub fn add_disk(&mut self, disk: Disk) -> Option<usize> {
        self.disks.push(disk);
        let point = self
            .points
            .iter_mut()
            .find(|point| point.polygon.contains(disk.center))?;
        point.disks.push(disk);
        Some(point.id)
    }

    /// Which side of the bar a position is on.
    pub fn side_of_bar(&self, p: Point2<f32>) -> Side {
        let bar_x = self.bar().polygon.vertices.first().map_or(0.0, |v| v.x);
        if p.x >= bar_x {
            Side::Right
        } else {
            Side::Left
        }
    }

    /// Keeps the die if it lies on the board. Returns whether it was kept.
    pub fn add_die(&mut self, die: Die) -> bool {
        if self.bbox.contains(die.center) {
            self.dice.push(die);
            true
        } else {
            false
        }
    }

    /// The owners of the checkers on points 1-24, in detection order.
    pub fn checker_positions(&self) -> CheckerPositions {
        let mut positions = CheckerPositions::empty();
        for point in self.points.iter().filter(|p| p.id < BAR_ID) {
            *positions.point_mut(point.id) =
                point.disks.iter().map(|disk| disk.color.player()).collect();
        }
        positions
    }

    pub fn dice_entries(&self) -> Vec<DiceEntry> {
        self.dice
            .iter()
            .map(|die| DiceEntry::Detected {
                value: die.value,
                confidence: die.confidence,
            })
            .collect()
    }
}

/// Places the detections of one frame on a freshly calibrated board.
pub fn map_detections(
    calibration: &Calibration,
    detections: &[Detection],
    classes: &ClassMap,
) -> (Board, MappingStats) {
    let mut board = Board::new(calibration);
    let mut stats = MappingStats::default();

    for det in detections {
        match classes.classify(det.class) {
            TokenKind::Disk(color) => {
                let disk = Disk {
                    center: det.center,
                    confidence: det.confidence,
                    color,
                };
                match board.add_disk(disk) {
                    Some(point) => {
                        trace!(point, ?color, "Disk assigned");
                        stats.disks_assigned += 1;
                    }
                    None => stats.disks_unassigned += 1,
                }
            }
            TokenKind::Die(value) => {
                let die = Die {
                    value,
                    center: det.center,
                    confidence: det.confidence,
                    side: board.side_of_bar(det.center),
                };
                if board.add_die(die) {
                    stats.dice_kept += 1;
                } else {
                    stats.dice_discarded += 1;
                }
            }
            TokenKind::Marker | TokenKind::Unknown => stats.ignored += 1,
        }
    }

    (board, stats)
}
