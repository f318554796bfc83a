use rand::Rng;
use tracing::{debug, info};

use crate::{
    CheckerPositions, DiceRoll, GameData, Player, PositionArray, Snapshot, SnapshotStore,
    StoreError, NUM_POINTS,
};

/// What the difference between two snapshots says about the last move.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TurnInference {
    /// A checker of `mover` was added at `point`, the lowest point that grew.
    Moved { point: usize, mover: Player },
    /// No point grew. Captures and pure removals end up here too.
    NoMove,
}

/// Decides whose turn it is after the board changed from `prev` to `new`.
///
/// The lowest point with more checkers than before tells who moved: the owner
/// of the checker added last there. It is then the other player's turn. If no
/// point grew, the turn stays with `prev_player`.
pub fn derive_current_player(
    prev: &CheckerPositions,
    prev_player: Player,
    new: &CheckerPositions,
) -> (Player, TurnInference) {
    for point in 1..=NUM_POINTS {
        let (before, after) = (prev.point(point), new.point(point));
        if after.len() > before.len() {
            if let Some(&mover) = after.last() {
                return (mover.opponent(), TurnInference::Moved { point, mover });
            }
        }
    }
    (prev_player, TurnInference::NoMove)
}

/// The current state as read back from the store.
#[derive(Clone, Debug, PartialEq)]
pub struct StoredState {
    /// The counts on points 1-24, without the bar slots.
    pub positions: Vec<i32>,
    pub dice: DiceRoll,
    pub current_player: Player,
}

impl StoredState {
    pub fn to_game_data(&self) -> GameData {
        let mut array = vec![0];
        array.extend_from_slice(&self.positions);
        array.push(0);
        let checker_positions = PositionArray::from_slice(&array)
            .map(|a| a.to_checker_positions())
            .unwrap_or_default();
        GameData {
            checker_positions,
            dices: self.dice.entries().to_vec(),
            current_player: Some(self.current_player),
        }
    }
}

/// Keeps the game history in a [`SnapshotStore`] and works out whose turn it is.
///
/// Nothing here coordinates concurrent writers: two interleaved updates may
/// both diff against the same "latest" snapshot. Serialize access per game,
/// e.g. through a [`SessionRegistry`](crate::SessionRegistry).
pub struct Reconciler<S> {
    store: S,
}

impl<S: SnapshotStore> Reconciler<S> {
    /// Wraps the store, seeding it with the opening position if it is empty.
    pub fn open(mut store: S, rng: &mut impl Rng) -> Result<Self, StoreError> {
        if store.is_empty() {
            info!("Empty store, starting from the opening position");
            store.append(&opening_snapshot(rng))?;
        }
        Ok(Self { store })
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    /// The latest entry of each history.
    pub fn get(&self) -> Result<StoredState, StoreError> {
        let positions = self
            .store
            .latest_positions()
            .ok_or(StoreError::Empty { facet: "positions" })?;
        let dice = self
            .store
            .latest_dice()
            .ok_or(StoreError::Empty { facet: "dice" })?;
        let current_player = self
            .store
            .latest_player()
            .ok_or(StoreError::Empty { facet: "current player" })?;
        Ok(StoredState {
            positions: positions.playable().to_vec(),
            dice: *dice,
            current_player,
        })
    }

    /// Appends a new snapshot.
    ///
    /// `positions` must have exactly 26 entries of at most 15 checkers each;
    /// otherwise nothing is stored.
    /// Without an explicit `current_player`, it is derived from the
    /// difference to the previous snapshot.
    pub fn update(
        &mut self,
        positions: &[i32],
        dice: DiceRoll,
        current_player: Option<Player>,
    ) -> Result<Snapshot, StoreError> {
        let positions = PositionArray::from_slice(positions)?;
        let current_player = match current_player {
            Some(player) => player,
            None => self.infer_turn(&positions.to_checker_positions()),
        };
        self.append(positions, dice, current_player)
    }

    /// Stores a board as read from a frame or sent by a client.
    ///
    /// Missing dice are replaced by a random roll, and unless the game data
    /// names the current player, it is derived from the detected checkers.
    pub fn ingest(&mut self, game: &GameData, rng: &mut impl Rng) -> Result<Snapshot, StoreError> {
        let positions = PositionArray::convert(&game.checker_positions).validate()?;
        let dice = DiceRoll::from_detected(&game.dices, rng);
        let current_player = match game.current_player {
            Some(player) => player,
            None => self.infer_turn(&game.checker_positions),
        };
        self.append(positions, dice, current_player)
    }

    /// Drops the latest snapshot and starts over from the opening position,
    /// with `player_1` to move.
    pub fn delete(&mut self, rng: &mut impl Rng) -> Result<(), StoreError> {
        self.store.remove_latest()?;
        self.store.append(&opening_snapshot(rng))?;
        info!("Game reset to the opening position");
        Ok(())
    }

    fn infer_turn(&self, new: &CheckerPositions) -> Player {
        let prev = self
            .store
            .latest_positions()
            .map(PositionArray::to_checker_positions)
            .unwrap_or_default();
        let prev_player = self.store.latest_player().unwrap_or(Player::One);
        let (player, inference) = derive_current_player(&prev, prev_player, new);
        debug!(?inference, current_player = %player, "Inferred turn");
        player
    }

    fn append(
        &mut self,
        positions: PositionArray,
        dice: DiceRoll,
        current_player: Player,
    ) -> Result<Snapshot, StoreError> {
        let snapshot = Snapshot {
            positions,
            dice,
            current_player,
        };
        self.store.append(&snapshot)?;
        Ok(snapshot)
    }
}

fn opening_snapshot(rng: &mut impl Rng) -> Snapshot {
    Snapshot {
        positions: PositionArray::opening(),
        dice: DiceRoll::random(rng),
        current_player: Player::One,
    }
}

#[cfg(test)]
mod tests {
    use quickcheck::quickcheck;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;
    use crate::{DiceEntry, InvalidPositions, MemoryStore};

    fn reconciler() -> (Reconciler<MemoryStore>, StdRng) {
        let mut rng = StdRng::seed_from_u64(42);
        let reconciler = Reconciler::open(MemoryStore::new(), &mut rng).unwrap();
        (reconciler, rng)
    }

    quickcheck! {
        fn one_added_checker_gives_turn_to_opponent(
            prev: CheckerPositions,
            point: u8,
            mover: Player,
            prev_player: Player
        ) -> bool {
            let point = (point as usize % NUM_POINTS) + 1;
            let mut new = prev.clone();
            new.point_mut(point).push(mover);
            derive_current_player(&prev, prev_player, &new)
                == (mover.opponent(), TurnInference::Moved { point, mover })
        }

        fn unchanged_board_keeps_player(positions: CheckerPositions, prev_player: Player) -> bool {
            derive_current_player(&positions, prev_player, &positions)
                == (prev_player, TurnInference::NoMove)
        }
    }

    #[test]
    fn starts_from_opening() {
        let (reconciler, _) = reconciler();
        let state = reconciler.get().unwrap();
        assert_eq!(state.positions, PositionArray::opening().playable());
        assert_eq!(state.current_player, Player::One);
        assert_eq!(reconciler.get().unwrap(), state);
    }

    #[test]
    fn update_derives_turn() {
        let (mut reconciler, mut rng) = reconciler();
        // player_1 moves a checker from 1 to 3
        let mut positions = PositionArray::opening().as_slice().to_vec();
        positions[1] = 1;
        positions[3] = 1;
        let snapshot = reconciler
            .update(&positions, DiceRoll::random(&mut rng), None)
            .unwrap();
        assert_eq!(snapshot.current_player, Player::Two);
        assert_eq!(reconciler.get().unwrap().positions[2], 1);

        // Nothing grew: player_2 is still to move
        let snapshot = reconciler
            .update(&positions, DiceRoll::random(&mut rng), None)
            .unwrap();
        assert_eq!(snapshot.current_player, Player::Two);
    }

    #[test]
    fn explicit_player_wins() {
        let (mut reconciler, mut rng) = reconciler();
        let snapshot = reconciler
            .update(
                PositionArray::opening().as_slice(),
                DiceRoll::random(&mut rng),
                Some(Player::Two),
            )
            .unwrap();
        assert_eq!(snapshot.current_player, Player::Two);
        assert_eq!(reconciler.get().unwrap().current_player, Player::Two);
    }

    #[test]
    fn invalid_update_leaves_store_alone() {
        let (mut reconciler, mut rng) = reconciler();
        let before = reconciler.get().unwrap();
        let err = reconciler
            .update(&[0; 25], DiceRoll::random(&mut rng), None)
            .unwrap_err();
        assert!(matches!(
            err,
            StoreError::InvalidPositions(InvalidPositions::WrongLength { len: 25 })
        ));
        assert_eq!(reconciler.get().unwrap(), before);
        assert_eq!(reconciler.store().positions.len(), 1);
    }

    #[test]
    fn oversized_counts_leave_store_alone() {
        let (mut reconciler, mut rng) = reconciler();
        let before = reconciler.get().unwrap();
        let mut positions = PositionArray::opening().as_slice().to_vec();
        positions[1] = 2_000_000_000;
        let err = reconciler
            .update(&positions, DiceRoll::random(&mut rng), None)
            .unwrap_err();
        assert!(matches!(
            err,
            StoreError::InvalidPositions(InvalidPositions::TooManyCheckers { point: 1, .. })
        ));

        let mut game = before.to_game_data();
        *game.checker_positions.point_mut(7) = vec![Player::Two; 16];
        assert!(reconciler.ingest(&game, &mut rng).is_err());
        assert_eq!(reconciler.get().unwrap(), before);
        assert_eq!(reconciler.store().positions.len(), 1);
    }

    #[test]
    fn ingest_fills_in_dice_and_turn() {
        let (mut reconciler, mut rng) = reconciler();
        let mut game = reconciler.get().unwrap().to_game_data();
        game.current_player = None;
        game.dices = vec![DiceEntry::Detected { value: 2, confidence: 0.9 }];
        // player_2 moves a checker from 6 to 4
        game.checker_positions.point_mut(6).pop();
        game.checker_positions.point_mut(4).push(Player::Two);

        let snapshot = reconciler.ingest(&game, &mut rng).unwrap();
        assert_eq!(snapshot.current_player, Player::One);
        assert!(snapshot.dice.entries().iter().all(DiceEntry::is_randomized));
        assert_eq!(snapshot.positions.get(4), -1);
        assert_eq!(snapshot.positions.get(6), -4);
    }

    #[test]
    fn delete_resets_to_opening() {
        let (mut reconciler, mut rng) = reconciler();
        let mut positions = vec![0; 26];
        positions[5] = 3;
        reconciler
            .update(&positions, DiceRoll::random(&mut rng), Some(Player::Two))
            .unwrap();
        reconciler.delete(&mut rng).unwrap();
        let state = reconciler.get().unwrap();
        assert_eq!(state.positions, PositionArray::opening().playable());
        assert_eq!(state.current_player, Player::One);
        let game = state.to_game_data();
        assert_eq!(game.checker_positions.point(1), &[Player::One, Player::One]);
        assert_eq!(game.checker_positions.point(13).len(), 5);
    }
}
