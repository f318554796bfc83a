use tracing::debug;

use crate::{
    calibrate, locate_rectangle, map_detections, Board, BoardNotFound, BoxRect, Detection,
    GameData, MappingStats, VisionConfig,
};

/// The result of reading one frame.
#[derive(Clone, Debug)]
pub struct BoardReading {
    pub board: Board,
    /// The checker positions and detected dice. There is no current player;
    /// that is for the reconciler to decide.
    pub game: GameData,
    pub stats: MappingStats,
}

/// Reads the board from the detections of one frame: finds the board by its
/// corner markers, aligns the template to it and places checkers and dice.
pub fn read_board(
    detections: &[Detection],
    config: &VisionConfig,
) -> Result<BoardReading, BoardNotFound> {
    let detections: Vec<Detection> = detections
        .iter()
        .filter(|det| det.confidence >= config.min_confidence)
        .cloned()
        .collect();

    let boxes: Vec<BoxRect> = detections.iter().map(|det| det.bbox).collect();
    let classes: Vec<u32> = detections.iter().map(|det| det.class).collect();
    let rectangle = locate_rectangle(&boxes, &classes, &config.classes.markers).ok_or_else(|| {
        BoardNotFound::TooFewMarkers {
            found: classes
                .iter()
                .filter(|c| config.classes.markers.contains(c))
                .count(),
        }
    })?;
    debug!(?rectangle, "Located board");

    let calibration = calibrate(&config.template, rectangle.corners())?;
    let (board, stats) = map_detections(&calibration, &detections, &config.classes);
    debug!(?stats, "Mapped detections");

    let game = GameData {
        checker_positions: board.checker_positions(),
        dices: board.dice_entries(),
        current_player: None,
    };
    Ok(BoardReading { board, game, stats })
}
