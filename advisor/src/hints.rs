//! Everything that depends on the shape of the engine's text output.
//!
//! The engine answers in free-form text. After the dice are set, it confirms
//! with a line containing [`DICE_SET_SENTINEL`]; the answer to `hint` is a
//! list of numbered lines such as
//!
//! ```text
//!     1. Cubeful 2-ply    13/7 13/10 8/5               Eq.: -0.797
//! ```
//!
//! followed by a line mentioning rollouts or pip counts.

use backgammon::MoveHint;

pub const DICE_SET_SENTINEL: &str = "the dice have been set";
const EQUITY_LABEL: &str = "Eq.:";

/// The role of one line of engine output.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LineKind {
    Blank,
    /// Anything else: banners, board drawings, probabilities.
    Banner,
    /// The engine confirmed the dice.
    DiceSet,
    /// A numbered line, `N. <description>`.
    Hint,
    /// Rollout or pip count output, which follows the hint list.
    Terminator,
}

pub fn classify(line: &str) -> LineKind {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        LineKind::Blank
    } else if trimmed.to_lowercase().contains(DICE_SET_SENTINEL) {
        LineKind::DiceSet
    } else if split_move_number(trimmed).is_some() {
        LineKind::Hint
    } else if trimmed.contains("Rollout") || trimmed.contains("pip") {
        LineKind::Terminator
    } else {
        LineKind::Banner
    }
}

/// Splits `N. rest` into `N` and `rest`. There must be whitespace after the dot.
fn split_move_number(line: &str) -> Option<(u32, &str)> {
    let (number, rest) = line.split_once('.')?;
    if number.is_empty() || !number.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    if !rest.starts_with(char::is_whitespace) {
        return None;
    }
    Some((number.parse().ok()?, rest.trim_start()))
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum CollectorState {
    WaitingForDice,
    Collecting,
    Done,
}

/// Picks the hint lines out of the engine's output, one line at a time.
#[derive(Clone, Debug)]
pub struct HintCollector {
    state: CollectorState,
    lines: Vec<String>,
}

impl Default for HintCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl HintCollector {
    pub fn new() -> Self {
        Self {
            state: CollectorState::WaitingForDice,
            lines: Vec::new(),
        }
    }

    /// Feeds the next line. Returns `true` once the hint list is complete.
    pub fn feed(&mut self, line: &str) -> bool {
        match (self.state, classify(line)) {
            (CollectorState::WaitingForDice, LineKind::DiceSet) => {
                self.state = CollectorState::Collecting;
            }
            (CollectorState::Collecting, LineKind::Hint) => {
                self.lines.push(String::from(line.trim()));
            }
            // Board drawings before the hints may contain pip counts, too
            (CollectorState::Collecting, LineKind::Terminator) if !self.lines.is_empty() => {
                self.state = CollectorState::Done;
            }
            _ => {}
        }
        self.is_done()
    }

    pub fn is_done(&self) -> bool {
        self.state == CollectorState::Done
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn into_lines(self) -> Vec<String> {
        self.lines
    }
}

fn is_move_token(token: &str) -> bool {
    let lower = token.to_ascii_lowercase();
    let stripped = lower.replace("bar", "").replace("off", "");
    token.contains('/')
        && stripped
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, '/' | '*' | '(' | ')'))
}

/// Parses one hint line. Returns `None` for anything that doesn't look like
/// `N. <kind> <moves> Eq.: <equity>`.
pub fn parse_hint_line(line: &str) -> Option<MoveHint> {
    let (move_number, rest) = split_move_number(line.trim())?;
    let (description, equity) = rest.split_once(EQUITY_LABEL)?;
    let equity: f64 = equity.split_whitespace().next()?.parse().ok()?;

    let moves: Vec<&str> = description
        .split_whitespace()
        .skip_while(|token| !is_move_token(token))
        .take_while(|token| is_move_token(token))
        .collect();
    if moves.is_empty() {
        return None;
    }

    Some(MoveHint {
        move_number,
        moves: moves.join(" "),
        equity,
    })
}

/// Parses the captured hint lines, silently skipping the ones that don't
/// parse. The engine's order is kept.
pub fn parse<S: AsRef<str>>(lines: &[S]) -> Vec<MoveHint> {
    lines
        .iter()
        .filter_map(|line| parse_hint_line(line.as_ref()))
        .collect()
}
