use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::AdvisorError;

/// Writes each engine exchange into its own numbered JSON file.
pub struct Recorder {
    num: usize,
    directory: PathBuf,
}

impl Recorder {
    pub fn new(directory: PathBuf) -> anyhow::Result<Self> {
        if !directory.is_dir() {
            anyhow::bail!("Directory '{}' does not exist", directory.display());
        }
        // Continue after the transcripts of earlier runs
        let mut num = 1;
        for entry in std::fs::read_dir(&directory)? {
            let name = entry?.file_name();
            let existing = name
                .to_str()
                .and_then(|name| name.strip_prefix("hint_"))
                .and_then(|name| name.strip_suffix(".json"))
                .and_then(|idx| idx.parse::<usize>().ok());
            if let Some(existing) = existing {
                num = num.max(existing + 1);
            }
        }
        Ok(Self { num, directory })
    }

    pub fn write_transcript(&mut self, transcript: &Transcript) -> anyhow::Result<PathBuf> {
        let filepath = self.directory.join(format!("hint_{:0>6}.json", self.num));
        let mut writer = BufWriter::new(File::create(&filepath)?);
        serde_json::to_writer_pretty(&mut writer, transcript)?;
        writeln!(writer)?;
        writer.flush()?;
        debug!(path = %filepath.display(), "Recorded engine transcript");
        self.num += 1;
        Ok(filepath)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TranscriptOutcome {
    Completed,
    /// The hint list had started but the terminating line never came.
    TimedOutWithHints,
    TimedOut,
    Cancelled,
    Failed,
}

impl<T> From<&Result<T, AdvisorError>> for TranscriptOutcome {
    fn from(result: &Result<T, AdvisorError>) -> Self {
        match result {
            Ok(_) => TranscriptOutcome::Completed,
            Err(AdvisorError::Timeout { .. }) => TranscriptOutcome::TimedOut,
            Err(AdvisorError::Cancelled) => TranscriptOutcome::Cancelled,
            Err(_) => TranscriptOutcome::Failed,
        }
    }
}

/// Everything sent to and received from the engine for one request.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Transcript {
    pub engine: String,
    pub commands: Vec<String>,
    pub output: Vec<String>,
    pub outcome: TranscriptOutcome,
}
