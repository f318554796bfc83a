use nalgebra::Point2;
use serde::{Deserialize, Serialize};

use crate::{BoxRect, Player};

/// One object found by the detector in a (resized and padded) camera frame.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub class: u32,
    pub confidence: f32,
    pub bbox: BoxRect,
    pub center: Point2<f32>,
}

impl Detection {
    /// A detection whose center is the center of its box.
    pub fn from_box(class: u32, confidence: f32, bbox: BoxRect) -> Self {
        Self {
            class,
            confidence,
            center: bbox.center(),
            bbox,
        }
    }
}

/// The color of a checker.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Color {
    White,
    Black,
}

impl Color {
    pub fn player(self) -> Player {
        match self {
            Color::White => Player::One,
            Color::Black => Player::Two,
        }
    }
}

/// What a detector class stands for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TokenKind {
    /// A die showing this face value.
    Die(u8),
    Disk(Color),
    /// A board-corner marker.
    Marker,
    Unknown,
}

/// Maps the detector's class IDs to token kinds.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassMap {
    /// Class IDs of the die faces 1 to 6, in that order.
    pub dice: [u32; 6],
    pub white_disk: u32,
    pub black_disk: u32,
    pub markers: Vec<u32>,
}

impl Default for ClassMap {
    fn default() -> Self {
        Self {
            dice: [0, 1, 2, 3, 4, 5],
            markers: vec![6, 7],
            white_disk: 8,
            black_disk: 9,
        }
    }
}

impl ClassMap {
    pub fn classify(&self, class: u32) -> TokenKind {
        if let Some(face) = self.dice.iter().position(|&c| c == class) {
            TokenKind::Die(face as u8 + 1)
        } else if class == self.white_disk {
            TokenKind::Disk(Color::White)
        } else if class == self.black_disk {
            TokenKind::Disk(Color::Black)
        } else if self.markers.contains(&class) {
            TokenKind::Marker
        } else {
            TokenKind::Unknown
        }
    }
}
