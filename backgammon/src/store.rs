mod jsonl;

pub use jsonl::*;

use serde::{Deserialize, Serialize};

use crate::{DiceRoll, Player, PositionArray, StoreError};

/// One recorded game state.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub positions: PositionArray,
    pub dice: DiceRoll,
    pub current_player: Player,
}

/// An entry in one facet's history.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Record<T> {
    pub id: u64,
    pub value: T,
}

/// Append-only game history.
///
/// Positions, dice and the current player are three separate histories, each
/// queried for its own latest entry. They are only tied together by the
/// [`Reconciler`](crate::Reconciler) writing all three for every snapshot.
pub trait SnapshotStore {
    fn append_positions(&mut self, positions: PositionArray) -> Result<u64, StoreError>;
    fn append_dice(&mut self, dice: DiceRoll) -> Result<u64, StoreError>;
    fn append_player(&mut self, player: Player) -> Result<u64, StoreError>;

    fn latest_positions(&self) -> Option<&PositionArray>;
    fn latest_dice(&self) -> Option<&DiceRoll>;
    fn latest_player(&self) -> Option<Player>;

    /// Drops the most recent entry of each history.
    ///
    /// An error part way through may leave the histories out of step, e.g.
    /// with the positions removed but the dice still there.
    fn remove_latest(&mut self) -> Result<(), StoreError>;

    /// Appends to all three histories. The default does no rollback, so
    /// stores whose appends can fail override it.
    fn append(&mut self, snapshot: &Snapshot) -> Result<(), StoreError> {
        self.append_positions(snapshot.positions)?;
        self.append_dice(snapshot.dice)?;
        self.append_player(snapshot.current_player)?;
        Ok(())
    }

    fn is_empty(&self) -> bool {
        self.latest_positions().is_none()
            && self.latest_dice().is_none()
            && self.latest_player().is_none()
    }
}

/// The history of a single facet.
#[derive(Clone, Debug)]
pub struct Facet<T> {
    next_id: u64,
    records: Vec<Record<T>>,
}

impl<T> Default for Facet<T> {
    fn default() -> Self {
        Self {
            next_id: 1,
            records: Vec::new(),
        }
    }
}

impl<T> Facet<T> {
    pub fn from_records(records: Vec<Record<T>>) -> Self {
        let next_id = records.last().map_or(1, |r| r.id + 1);
        Self { next_id, records }
    }

    /// Ids keep increasing, even after the latest record was removed.
    pub fn push(&mut self, value: T) -> &Record<T> {
        let id = self.next_id;
        self.next_id += 1;
        self.records.push(Record { id, value });
        &self.records[self.records.len() - 1]
    }

    pub fn pop(&mut self) -> Option<Record<T>> {
        self.records.pop()
    }

    pub fn latest(&self) -> Option<&T> {
        self.records.last().map(|r| &r.value)
    }

    pub fn records(&self) -> &[Record<T>] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// A store that lives as long as the process.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    pub positions: Facet<PositionArray>,
    pub dice: Facet<DiceRoll>,
    pub players: Facet<Player>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SnapshotStore for MemoryStore {
    fn append_positions(&mut self, positions: PositionArray) -> Result<u64, StoreError> {
        Ok(self.positions.push(positions).id)
    }

    fn append_dice(&mut self, dice: DiceRoll) -> Result<u64, StoreError> {
        Ok(self.dice.push(dice).id)
    }

    fn append_player(&mut self, player: Player) -> Result<u64, StoreError> {
        Ok(self.players.push(player).id)
    }

    fn latest_positions(&self) -> Option<&PositionArray> {
        self.positions.latest()
    }

    fn latest_dice(&self) -> Option<&DiceRoll> {
        self.dice.latest()
    }

    fn latest_player(&self) -> Option<Player> {
        self.players.latest().copied()
    }

    fn remove_latest(&mut self) -> Result<(), StoreError> {
        self.positions.pop();
        self.dice.pop();
        self.players.pop();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;

    #[test]
    fn ids_increase() {
        let mut store = MemoryStore::new();
        assert!(store.is_empty());
        assert_eq!(store.append_player(Player::One).unwrap(), 1);
        assert_eq!(store.append_player(Player::Two).unwrap(), 2);
        store.remove_latest().unwrap();
        assert_eq!(store.latest_player(), Some(Player::One));
        assert_eq!(store.append_player(Player::Two).unwrap(), 3);
    }

    #[test]
    fn facets_are_independent() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut store = MemoryStore::new();
        store.append_positions(PositionArray::opening()).unwrap();
        assert_eq!(store.latest_positions(), Some(&PositionArray::opening()));
        assert_eq!(store.latest_dice(), None);
        store.append_dice(DiceRoll::random(&mut rng)).unwrap();
        assert!(store.latest_dice().is_some());
        assert!(!store.is_empty());
    }
}
