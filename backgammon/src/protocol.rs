use std::collections::BTreeMap;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::ProtocolError;

/// Number of playable points on the board.
pub const NUM_POINTS: usize = 24;

/// One of the two sides of the game.
///
/// White checkers belong to `player_1`, black checkers to `player_2`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Player {
    #[serde(rename = "player_1")]
    One,
    #[serde(rename = "player_2")]
    Two,
}

impl Player {
    pub fn opponent(self) -> Player {
        match self {
            Player::One => Player::Two,
            Player::Two => Player::One,
        }
    }

    /// The seat number the analysis engine uses for this player.
    pub fn seat(self) -> u8 {
        match self {
            Player::One => 0,
            Player::Two => 1,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Player::One => "player_1",
            Player::Two => "player_2",
        }
    }
}

impl std::fmt::Display for Player {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Player {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "player_1" => Ok(Player::One),
            "player_2" => Ok(Player::Two),
            _ => Err(ProtocolError::UnknownPlayer(String::from(s))),
        }
    }
}

/// A single die, either read off the board or made up because detection
/// didn't find enough dice.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DiceEntry {
    Detected { value: u8, confidence: f32 },
    Randomized { value: u8, randomized: bool },
}

impl DiceEntry {
    pub fn value(&self) -> u8 {
        match *self {
            DiceEntry::Detected { value, .. } | DiceEntry::Randomized { value, .. } => value,
        }
    }

    /// Whether the value is a face of a die, 1-6.
    pub fn is_valid(&self) -> bool {
        (1..=6).contains(&self.value())
    }

    pub fn is_randomized(&self) -> bool {
        matches!(self, DiceEntry::Randomized { randomized: true, .. })
    }

    /// Detected dice rank by their confidence, guessed ones rank last.
    fn confidence(&self) -> f32 {
        match *self {
            DiceEntry::Detected { confidence, .. } => confidence,
            DiceEntry::Randomized { .. } => f32::NEG_INFINITY,
        }
    }

    pub fn roll(rng: &mut impl Rng) -> Self {
        DiceEntry::Randomized {
            value: rng.gen_range(1..=6),
            randomized: true,
        }
    }
}

/// The two dice of one turn.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct DiceRoll(pub [DiceEntry; 2]);

impl DiceRoll {
    /// Two independent uniform draws, both flagged as randomized.
    pub fn random(rng: &mut impl Rng) -> Self {
        DiceRoll([DiceEntry::roll(rng), DiceEntry::roll(rng)])
    }

    /// Builds a roll from whatever the detector found.
    ///
    /// Values outside 1-6 are dropped first. With fewer than two dice left
    /// the whole roll is replaced by a random one. With more than two, the
    /// two most confident dice are kept, in the order they were detected.
    pub fn from_detected(entries: &[DiceEntry], rng: &mut impl Rng) -> Self {
        let entries: Vec<DiceEntry> = entries.iter().copied().filter(DiceEntry::is_valid).collect();
        if entries.len() < 2 {
            return Self::random(rng);
        }
        let mut ranked: Vec<usize> = (0..entries.len()).collect();
        ranked.sort_by(|&a, &b| entries[b].confidence().total_cmp(&entries[a].confidence()));
        let (first, second) = (ranked[0].min(ranked[1]), ranked[0].max(ranked[1]));
        DiceRoll([entries[first], entries[second]])
    }

    pub fn values(&self) -> [u8; 2] {
        [self.0[0].value(), self.0[1].value()]
    }

    pub fn entries(&self) -> &[DiceEntry] {
        &self.0
    }
}

/// The checkers on each of the 24 playable points, in the order they were
/// detected.
///
/// On the wire this is an object keyed by the point number as a string.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    try_from = "BTreeMap<String, Vec<Player>>",
    into = "BTreeMap<String, Vec<Player>>"
)]
pub struct CheckerPositions([Vec<Player>; NUM_POINTS]);

impl CheckerPositions {
    pub fn empty() -> Self {
        Self::default()
    }

    /// The tokens at a point, `point` counted from 1.
    ///
    /// Panics if `point` is outside 1..=24.
    pub fn point(&self, point: usize) -> &[Player] {
        &self.0[point - 1]
    }

    pub fn point_mut(&mut self, point: usize) -> &mut Vec<Player> {
        &mut self.0[point - 1]
    }

    /// Iterates over `(point, tokens)` with points counted from 1.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &[Player])> {
        self.0.iter().enumerate().map(|(idx, v)| (idx + 1, v.as_slice()))
    }

    pub fn num_checkers(&self) -> usize {
        self.0.iter().map(Vec::len).sum()
    }
}

impl TryFrom<BTreeMap<String, Vec<Player>>> for CheckerPositions {
    type Error = ProtocolError;

    fn try_from(map: BTreeMap<String, Vec<Player>>) -> Result<Self, Self::Error> {
        let mut positions = CheckerPositions::empty();
        for (key, tokens) in map {
            let point = key
                .parse::<usize>()
                .ok()
                .filter(|p| (1..=NUM_POINTS).contains(p))
                .ok_or_else(|| ProtocolError::InvalidPoint(key.clone()))?;
            *positions.point_mut(point) = tokens;
        }
        Ok(positions)
    }
}

impl From<CheckerPositions> for BTreeMap<String, Vec<Player>> {
    fn from(positions: CheckerPositions) -> Self {
        positions
            .0
            .into_iter()
            .enumerate()
            .map(|(idx, tokens)| ((idx + 1).to_string(), tokens))
            .collect()
    }
}

/// The board state as it is exchanged with clients.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameData {
    pub checker_positions: CheckerPositions,
    #[serde(default)]
    pub dices: Vec<DiceEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_player: Option<Player>,
}

/// Request for move suggestions.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdviceRequest {
    #[serde(default)]
    pub checker_positions: Option<CheckerPositions>,
    #[serde(default)]
    pub dices: Vec<DiceEntry>,
}

impl AdviceRequest {
    pub fn checker_positions(&self) -> Result<&CheckerPositions, ProtocolError> {
        self.checker_positions
            .as_ref()
            .ok_or(ProtocolError::MissingCheckerPositions)
    }
}

/// One move suggested by the analysis engine.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MoveHint {
    /// The engine's rank for this move, 1 being the best.
    pub move_number: u32,
    /// The move in the engine's coordinate notation, e.g. `13/7 8/5`.
    pub moves: String,
    pub equity: f64,
}
