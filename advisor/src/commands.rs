use backgammon::{CheckerPositions, DiceEntry, Player};

use crate::AdvisorError;

/// Starts a fresh one-point match, so no state from earlier games leaks in.
pub const NEW_MATCH: &str = "new match 1";
pub const HINT: &str = "hint";

/// The commands that set up the engine for one position.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EngineScript {
    pub set_board: String,
    pub set_dice: String,
    pub set_turn: String,
}

impl EngineScript {
    /// Describes the board from `player`'s point of view: their checkers count
    /// positive, the opponent's negative.
    pub fn build(
        positions: &CheckerPositions,
        dice: &[DiceEntry],
        player: Player,
    ) -> Result<Self, AdvisorError> {
        let [d1, d2] = dice else {
            return Err(AdvisorError::MalformedDice { num_dice: dice.len() });
        };
        if let Some(die) = [d1, d2].into_iter().find(|die| !die.is_valid()) {
            return Err(AdvisorError::DieOutOfRange { value: die.value() });
        }

        let board: Vec<String> = positions
            .iter()
            .map(|(_, tokens)| {
                let count = tokens.len() as i32;
                match tokens.first() {
                    None => 0,
                    Some(&owner) if owner == player => count,
                    Some(_) => -count,
                }
            })
            .map(|count| count.to_string())
            .collect();

        Ok(Self {
            set_board: format!("set board {}", board.join(" ")),
            set_dice: format!("set dice {} {}", d1.value(), d2.value()),
            set_turn: format!("set turn {}", player.seat()),
        })
    }

    /// Everything to send before asking for hints.
    pub fn commands(&self) -> [&str; 4] {
        [NEW_MATCH, &self.set_board, &self.set_dice, &self.set_turn]
    }
}
