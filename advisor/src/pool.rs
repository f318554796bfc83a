use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::commands::HINT;
use crate::{AdvisorError, EngineConfig, EngineProcess, EngineScript, HintCollector, Recorder};
use crate::{Transcript, TranscriptOutcome};

/// Lets another thread abort a running advice request.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Runs hint requests, each on a fresh engine process, with at most
/// `max_concurrent` processes alive at a time.
pub struct EnginePool {
    config: EngineConfig,
    in_use: Mutex<usize>,
    released: Condvar,
    recorder: Option<Mutex<Recorder>>,
}

struct Permit<'a>(&'a EnginePool);

impl Drop for Permit<'_> {
    fn drop(&mut self) {
        let mut in_use = self.0.in_use.lock().unwrap_or_else(PoisonError::into_inner);
        *in_use -= 1;
        self.0.released.notify_one();
    }
}

impl EnginePool {
    pub fn new(config: EngineConfig, recorder: Option<Recorder>) -> Self {
        Self {
            config,
            in_use: Mutex::new(0),
            released: Condvar::new(),
            recorder: recorder.map(Mutex::new),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The number of engine processes currently running.
    pub fn in_use(&self) -> usize {
        *self.in_use.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn acquire(&self, cancel: &CancelToken) -> Result<Permit<'_>, AdvisorError> {
        let limit = self.config.max_concurrent.max(1);
        let mut in_use = self.in_use.lock().unwrap_or_else(PoisonError::into_inner);
        while *in_use >= limit {
            if cancel.is_cancelled() {
                return Err(AdvisorError::Cancelled);
            }
            in_use = self
                .released
                .wait_timeout(in_use, Duration::from_millis(50))
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
        *in_use += 1;
        Ok(Permit(self))
    }

    /// Sets up a fresh engine with `script`, asks for hints and returns the
    /// raw hint lines. The engine is always shut down afterwards.
    pub fn run(
        &self,
        script: &EngineScript,
        cancel: &CancelToken,
    ) -> Result<Vec<String>, AdvisorError> {
        let _permit = self.acquire(cancel)?;
        let timeout = self.config.timeout();
        let deadline = Instant::now() + timeout;

        let mut commands: Vec<String> = script.commands().iter().map(|c| c.to_string()).collect();
        commands.push(String::from(HINT));
        let mut output = Vec::new();

        let mut timed_out = false;

        let result = EngineProcess::spawn(&self.config).and_then(|mut engine| {
            for command in &commands {
                engine.send(command)?;
            }
            let mut collector = HintCollector::new();
            loop {
                let line = match engine.read_line(deadline, timeout, cancel) {
                    Ok(Some(line)) => line,
                    Ok(None) => break,
                    // An engine back at its prompt after the hint list prints nothing more
                    Err(AdvisorError::Timeout { .. }) if !collector.lines().is_empty() => {
                        timed_out = true;
                        break;
                    }
                    Err(err) => return Err(err),
                };
                let done = collector.feed(&line);
                output.push(line);
                if done {
                    break;
                }
            }
            if !collector.is_done() {
                debug!(
                    engine = &self.config.nick,
                    num_hints = collector.lines().len(),
                    timed_out,
                    "Engine output stopped before the end of the hint list"
                );
            }
            engine.shutdown();
            Ok(collector.into_lines())
        });

        let outcome = match &result {
            Ok(_) if timed_out => TranscriptOutcome::TimedOutWithHints,
            result => TranscriptOutcome::from(result),
        };
        self.record(Transcript {
            engine: self.config.nick.clone(),
            commands,
            output,
            outcome,
        });
        result
    }

    fn record(&self, transcript: Transcript) {
        if let Some(recorder) = &self.recorder {
            let mut recorder = recorder.lock().unwrap_or_else(PoisonError::into_inner);
            if let Err(err) = recorder.write_transcript(&transcript) {
                warn!(%err, "Could not record engine transcript");
            }
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use std::sync::atomic::AtomicUsize;
    use std::thread;

    use backgammon::{CheckerPositions, DiceEntry, Player};

    use super::*;

    const FAKE_GNUBG: &str = r#"
while read line; do
  case "$line" in
    "set dice"*) echo "The dice have been set to 3 and 1." ;;
    hint)
      echo "    1. Cubeful 0-ply    8/5 6/5                      Eq.:  +0.156"
      echo "       0.540 0.164 0.007 - 0.460 0.124 0.005"
      echo "    2. Cubeful 0-ply    24/21 6/5                    Eq.:  -0.009 ( -0.165)"
      echo "Rollout not available"
      ;;
  esac
done
"#;

    fn shell_config(script: &str) -> EngineConfig {
        EngineConfig {
            nick: String::from("fake"),
            cmd: String::from("sh"),
            args: vec![String::from("-c"), String::from(script)],
            timeout_ms: 5_000,
            ..EngineConfig::default()
        }
    }

    fn script() -> EngineScript {
        let dice = vec![DiceEntry::Detected { value: 3, confidence: 0.9 }; 2];
        EngineScript::build(&CheckerPositions::empty(), &dice, Player::One).unwrap()
    }

    #[test]
    fn collects_hint_lines() {
        let pool = EnginePool::new(shell_config(FAKE_GNUBG), None);
        let lines = pool.run(&script(), &CancelToken::new()).unwrap();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("1. Cubeful"));
        assert_eq!(pool.in_use(), 0);
    }

    #[test]
    fn timeout_kills_engine() {
        let mut config = shell_config("while read line; do :; done");
        config.timeout_ms = 100;
        let pool = EnginePool::new(config, None);
        let result = pool.run(&script(), &CancelToken::new());
        assert!(matches!(result, Err(AdvisorError::Timeout { .. })));
        assert_eq!(pool.in_use(), 0);
    }

    #[test]
    fn hints_survive_a_missing_terminator() {
        let mut config = shell_config(
            r#"
while read line; do
  case "$line" in
    "set dice"*) echo "The dice have been set to 3 and 1." ;;
    hint)
      echo "    1. Cubeful 0-ply    8/5 6/5                      Eq.:  +0.156"
      echo "    2. Cubeful 0-ply    24/21 6/5                    Eq.:  -0.009 ( -0.165)"
      ;;
  esac
done
"#,
        );
        config.timeout_ms = 500;
        let dir = tempfile::tempdir().unwrap();
        let recorder = Recorder::new(dir.path().to_path_buf()).unwrap();
        let pool = EnginePool::new(config, Some(recorder));

        let lines = pool.run(&script(), &CancelToken::new()).unwrap();
        assert_eq!(lines.len(), 2);
        assert!(lines[1].starts_with("2. Cubeful"));
        assert_eq!(pool.in_use(), 0);

        let contents = std::fs::read_to_string(dir.path().join("hint_000001.json")).unwrap();
        let transcript: serde_json::Value = serde_json::from_str(&contents).unwrap();
        assert_eq!(transcript["outcome"], "timed_out_with_hints");
    }

    #[test]
    fn cancelled_request() {
        let pool = EnginePool::new(shell_config("while read line; do :; done"), None);
        let cancel = CancelToken::new();
        cancel.cancel();
        let result = pool.run(&script(), &cancel);
        assert!(matches!(result, Err(AdvisorError::Cancelled)));
    }

    #[test]
    fn concurrency_is_bounded() {
        let mut config = shell_config(
            "while read line; do case \"$line\" in hint) sleep 0.2; exit ;; esac; done",
        );
        config.max_concurrent = 2;
        let pool = Arc::new(EnginePool::new(config, None));
        let peak = Arc::new(AtomicUsize::new(0));

        let watcher = {
            let pool = Arc::clone(&pool);
            let peak = Arc::clone(&peak);
            thread::spawn(move || {
                for _ in 0..100 {
                    peak.fetch_max(pool.in_use(), Ordering::SeqCst);
                    thread::sleep(Duration::from_millis(10));
                }
            })
        };
        let workers: Vec<_> = (0..5)
            .map(|_| {
                let pool = Arc::clone(&pool);
                thread::spawn(move || pool.run(&script(), &CancelToken::new()).map(|l| l.len()))
            })
            .collect();
        for worker in workers {
            // The fake engine exits without hints
            assert_eq!(worker.join().unwrap().unwrap(), 0);
        }
        watcher.join().unwrap();
        assert!(peak.load(Ordering::SeqCst) <= 2);
        assert_eq!(pool.in_use(), 0);
    }

    #[test]
    fn transcripts_are_recorded() {
        let dir = tempfile::tempdir().unwrap();
        let recorder = Recorder::new(dir.path().to_path_buf()).unwrap();
        let pool = EnginePool::new(shell_config(FAKE_GNUBG), Some(recorder));
        pool.run(&script(), &CancelToken::new()).unwrap();
        let contents = std::fs::read_to_string(dir.path().join("hint_000001.json")).unwrap();
        let transcript: serde_json::Value = serde_json::from_str(&contents).unwrap();
        assert_eq!(transcript["engine"], "fake");
        assert_eq!(transcript["commands"][0], "new match 1");
        assert_eq!(transcript["outcome"], "completed");
    }
}
