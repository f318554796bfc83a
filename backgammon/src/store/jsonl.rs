use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use super::{Facet, Record, SnapshotStore};
use crate::{DiceRoll, Player, PositionArray, Snapshot, StoreError};

/// A store keeping each history as a JSON-lines file in one directory.
///
/// Every line is a `{"id": .., "value": ..}` record. Appending appends a line,
/// removing the latest record rewrites the file without its last line.
pub struct JsonlStore {
    directory: PathBuf,
    positions: JsonlFacet<PositionArray>,
    dice: JsonlFacet<DiceRoll>,
    players: JsonlFacet<Player>,
}

struct JsonlFacet<T> {
    name: &'static str,
    path: PathBuf,
    facet: Facet<T>,
}

impl JsonlStore {
    /// Opens the store in `directory`, creating the directory if needed.
    pub fn open(directory: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let directory = directory.into();
        std::fs::create_dir_all(&directory)?;
        let store = Self {
            positions: JsonlFacet::open(&directory, "positions")?,
            dice: JsonlFacet::open(&directory, "dice")?,
            players: JsonlFacet::open(&directory, "current_player")?,
            directory,
        };
        debug!(
            directory = %store.directory.display(),
            num_snapshots = store.positions.facet.len(),
            "Opened snapshot store"
        );
        Ok(store)
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }
}

impl<T: Serialize + DeserializeOwned> JsonlFacet<T> {
    fn open(directory: &Path, name: &'static str) -> Result<Self, StoreError> {
        let path = directory.join(format!("{}.jsonl", name));
        let mut records = Vec::new();
        if path.exists() {
            let reader = BufReader::new(File::open(&path)?);
            for (idx, line) in reader.lines().enumerate() {
                let line = line?;
                if line.trim().is_empty() {
                    continue;
                }
                let record: Record<T> =
                    serde_json::from_str(&line).map_err(|err| StoreError::Corrupt {
                        facet: name,
                        line: idx + 1,
                        err,
                    })?;
                records.push(record);
            }
        }
        Ok(Self {
            name,
            path,
            facet: Facet::from_records(records),
        })
    }

    fn push(&mut self, value: T) -> Result<u64, StoreError> {
        let record = self.facet.push(value);
        let id = record.id;
        let written = serde_json::to_string(record)
            .map_err(StoreError::Encode)
            .and_then(|line| append_line(&self.path, &line).map_err(StoreError::from));
        if let Err(err) = written {
            self.facet.pop();
            return Err(err);
        }
        Ok(id)
    }

    fn pop(&mut self) -> Result<(), StoreError> {
        if self.facet.pop().is_none() {
            return Ok(());
        }
        let tmp_path = self.path.with_extension("jsonl.tmp");
        {
            let mut writer = BufWriter::new(File::create(&tmp_path)?);
            for record in self.facet.records() {
                serde_json::to_writer(&mut writer, record).map_err(StoreError::Encode)?;
                writeln!(writer)?;
            }
            writer.flush()?;
        }
        std::fs::rename(&tmp_path, &self.path)?;
        debug!(facet = self.name, remaining = self.facet.len(), "Removed latest record");
        Ok(())
    }

    /// Takes back a record whose siblings in the other facets failed to append.
    fn undo_push(&mut self) {
        if let Err(err) = self.pop() {
            warn!(facet = self.name, %err, "Could not take back a partial snapshot");
        }
    }
}

fn append_line(path: &Path, line: &str) -> std::io::Result<()> {
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    writeln!(file, "{}", line)?;
    file.flush()
}

impl SnapshotStore for JsonlStore {
    fn append_positions(&mut self, positions: PositionArray) -> Result<u64, StoreError> {
        self.positions.push(positions)
    }

    fn append_dice(&mut self, dice: DiceRoll) -> Result<u64, StoreError> {
        self.dice.push(dice)
    }

    fn append_player(&mut self, player: Player) -> Result<u64, StoreError> {
        self.players.push(player)
    }

    fn latest_positions(&self) -> Option<&PositionArray> {
        self.positions.facet.latest()
    }

    fn latest_dice(&self) -> Option<&DiceRoll> {
        self.dice.facet.latest()
    }

    fn latest_player(&self) -> Option<Player> {
        self.players.facet.latest().copied()
    }

    fn append(&mut self, snapshot: &Snapshot) -> Result<(), StoreError> {
        self.positions.push(snapshot.positions)?;
        if let Err(err) = self.dice.push(snapshot.dice) {
            self.positions.undo_push();
            return Err(err);
        }
        if let Err(err) = self.players.push(snapshot.current_player) {
            self.dice.undo_push();
            self.positions.undo_push();
            return Err(err);
        }
        Ok(())
    }

    fn remove_latest(&mut self) -> Result<(), StoreError> {
        self.positions.pop()?;
        self.dice.pop()?;
        self.players.pop()
    }
}
