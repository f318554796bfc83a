use serde::{Deserialize, Serialize};

use crate::{CheckerPositions, InvalidPositions, Player, NUM_POINTS};

/// Length of a [`PositionArray`]: the 24 points plus a bar slot on each end.
pub const POSITION_ARRAY_LEN: usize = NUM_POINTS + 2;
/// The most checkers one player owns.
pub const MAX_CHECKERS: u32 = 15;

/// Checker counts per point, signed by owner.
///
/// Index 1-24 holds the count on that point, positive for `player_1` and
/// negative for `player_2`. Indices 0 and 25 are reserved for the bar and
/// currently always zero.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<i32>", into = "Vec<i32>")]
pub struct PositionArray([i32; POSITION_ARRAY_LEN]);

impl PositionArray {
    pub fn empty() -> Self {
        Self([0; POSITION_ARRAY_LEN])
    }

    /// Fails unless there are exactly 26 entries, none of them holding more
    /// than [`MAX_CHECKERS`] checkers.
    pub fn from_slice(values: &[i32]) -> Result<Self, InvalidPositions> {
        let array = values
            .try_into()
            .map_err(|_| InvalidPositions::WrongLength { len: values.len() })?;
        Self(array).validate()
    }

    /// Checks the per-point bound, which [`PositionArray::convert`] doesn't.
    pub fn validate(self) -> Result<Self, InvalidPositions> {
        match self
            .0
            .iter()
            .position(|count| count.unsigned_abs() > MAX_CHECKERS)
        {
            Some(point) => Err(InvalidPositions::TooManyCheckers {
                point,
                count: self.0[point],
            }),
            None => Ok(self),
        }
    }

    /// The standard opening position.
    pub fn opening() -> Self {
        let mut array = [0; POSITION_ARRAY_LEN];
        for (point, count) in [(1, 2), (12, 5), (17, 3), (19, 5)] {
            array[point] = count;
        }
        for (point, count) in [(24, 2), (13, 5), (8, 3), (6, 5)] {
            array[point] = -count;
        }
        Self(array)
    }

    /// Signs each point's count by the owner of its first checker.
    ///
    /// Points holding checkers of both players are not expected; the first
    /// checker decides for the whole point.
    pub fn convert(positions: &CheckerPositions) -> Self {
        let mut array = [0; POSITION_ARRAY_LEN];
        for (point, tokens) in positions.iter() {
            let count = tokens.len() as i32;
            array[point] = match tokens.first() {
                None => 0,
                Some(Player::One) => count,
                Some(Player::Two) => -count,
            };
        }
        Self(array)
    }

    /// Expands the counts back into one token per checker.
    pub fn to_checker_positions(&self) -> CheckerPositions {
        let mut positions = CheckerPositions::empty();
        for point in 1..=NUM_POINTS {
            let value = self.0[point];
            let owner = if value > 0 { Player::One } else { Player::Two };
            *positions.point_mut(point) = vec![owner; value.unsigned_abs() as usize];
        }
        positions
    }

    /// The signed count at a point, counted from 1.
    pub fn get(&self, point: usize) -> i32 {
        self.0[point]
    }

    /// The 24 playable entries, without the bar slots.
    pub fn playable(&self) -> &[i32] {
        &self.0[1..=NUM_POINTS]
    }

    pub fn as_slice(&self) -> &[i32] {
        &self.0
    }
}

impl TryFrom<Vec<i32>> for PositionArray {
    type Error = InvalidPositions;

    fn try_from(values: Vec<i32>) -> Result<Self, Self::Error> {
        Self::from_slice(&values)
    }
}

impl From<PositionArray> for Vec<i32> {
    fn from(array: PositionArray) -> Self {
        array.0.to_vec()
    }
}

#[cfg(test)]
mod tests {
    use quickcheck::quickcheck;

    use super::*;

    quickcheck! {
        fn convert_matches_token_lists(positions: CheckerPositions) -> bool {
            let array = PositionArray::convert(&positions);
            array.as_slice().len() == POSITION_ARRAY_LEN
                && array.get(0) == 0
                && array.get(25) == 0
                && positions.iter().all(|(point, tokens)| {
                    let expected = match tokens.first() {
                        None => 0,
                        Some(Player::One) => tokens.len() as i32,
                        Some(Player::Two) => -(tokens.len() as i32),
                    };
                    array.get(point) == expected
                })
        }

        fn expanding_keeps_counts(positions: CheckerPositions) -> bool {
            let array = PositionArray::convert(&positions);
            PositionArray::convert(&array.to_checker_positions()) == array
        }
    }

    #[test]
    fn wrong_length_is_rejected() {
        assert_eq!(
            PositionArray::from_slice(&[0; 24]),
            Err(InvalidPositions::WrongLength { len: 24 })
        );
        assert!(serde_json::from_str::<PositionArray>("[1, 2, 3]").is_err());
        assert!(PositionArray::from_slice(&[0; 26]).is_ok());
    }

    #[test]
    fn oversized_counts_are_rejected() {
        let mut values = [0; POSITION_ARRAY_LEN];
        values[3] = 2_000_000_000;
        assert_eq!(
            PositionArray::from_slice(&values),
            Err(InvalidPositions::TooManyCheckers {
                point: 3,
                count: 2_000_000_000
            })
        );
        values[3] = -16;
        assert!(PositionArray::from_slice(&values).is_err());
        values[3] = -15;
        assert!(PositionArray::from_slice(&values).is_ok());
        assert!(serde_json::from_str::<PositionArray>(
            "[0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,99]"
        )
        .is_err());
    }

    #[test]
    fn opening_position() {
        let opening = PositionArray::opening();
        let player_1: i32 = opening.playable().iter().filter(|&&v| v > 0).sum();
        let player_2: i32 = opening.playable().iter().filter(|&&v| v < 0).sum();
        assert_eq!((player_1, player_2), (15, -15));
        assert_eq!(opening.get(1), 2);
        assert_eq!(opening.get(6), -5);
        assert_eq!(opening.playable().len(), 24);
        let tokens = opening.to_checker_positions();
        assert_eq!(tokens.point(24), &[Player::Two, Player::Two]);
        assert_eq!(tokens.point(19).len(), 5);
    }

    #[test]
    fn mixed_point_takes_first_owner() {
        let mut positions = CheckerPositions::empty();
        positions.point_mut(5).extend([Player::Two, Player::One, Player::One]);
        assert_eq!(PositionArray::convert(&positions).get(5), -3);
    }
}
