use backgammon::{AdviceRequest, MoveHint, Player, ProtocolError};
use tracing::{debug, warn};

use crate::{parse, AdvisorError, CancelToken, EnginePool, EngineScript};

/// Answers move-suggestion requests with an analysis engine.
pub struct Advisor {
    pool: EnginePool,
}

impl Advisor {
    pub fn new(pool: EnginePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &EnginePool {
        &self.pool
    }

    /// Suggested moves for `player`, best first.
    ///
    /// Only a request without checker positions is an error. Everything that
    /// goes wrong afterwards, from bad dice to an engine that doesn't answer,
    /// is logged and yields no suggestions.
    pub fn hints(
        &self,
        request: &AdviceRequest,
        player: Player,
        cancel: &CancelToken,
    ) -> Result<Vec<MoveHint>, ProtocolError> {
        request.checker_positions()?;
        match self.try_hints(request, player, cancel) {
            Ok(hints) => Ok(hints),
            Err(AdvisorError::Protocol(err)) => Err(err),
            Err(err) => {
                warn!(%err, %player, "No move suggestions");
                Ok(Vec::new())
            }
        }
    }

    /// Like [`Advisor::hints`], but reports every failure.
    pub fn try_hints(
        &self,
        request: &AdviceRequest,
        player: Player,
        cancel: &CancelToken,
    ) -> Result<Vec<MoveHint>, AdvisorError> {
        let positions = request.checker_positions()?;
        let script = EngineScript::build(positions, &request.dices, player)?;
        let lines = self.pool.run(&script, cancel)?;
        let hints = parse(&lines);
        if hints.is_empty() {
            warn!(num_lines = lines.len(), "Engine gave no usable hints");
        } else {
            debug!(num_hints = hints.len(), best = %hints[0].moves, "Engine hints");
        }
        Ok(hints)
    }
}

#[cfg(all(test, unix))]
mod tests {
    use backgammon::{DiceEntry, PositionArray};

    use super::*;
    use crate::EngineConfig;

    // Echoes the dice and turn it was given, to check the setup commands
    const FAKE_GNUBG: &str = r#"
while read line; do
  case "$line" in
    "set dice"*) echo "The dice have been set to ${line#set dice }." ;;
    "set turn"*) turn="${line#set turn }" ;;
    hint)
      echo "    1. Cubeful 0-ply    8/5 6/5                      Eq.:  +0.156"
      echo "    2. Cubeful 0-ply    24/2$turn 6/5                Eq.:  -0.009 ( -0.165)"
      echo "    3. Cubeful 0-ply    garbage                      Eq.:  -0.100"
      echo "Rollout not available"
      ;;
  esac
done
"#;

    fn fake_advisor(script: &str) -> Advisor {
        let config = EngineConfig {
            nick: String::from("fake"),
            cmd: String::from("sh"),
            args: vec![String::from("-c"), String::from(script)],
            timeout_ms: 5_000,
            ..EngineConfig::default()
        };
        Advisor::new(EnginePool::new(config, None))
    }

    fn request(dice: &[u8]) -> AdviceRequest {
        AdviceRequest {
            checker_positions: Some(PositionArray::opening().to_checker_positions()),
            dices: dice
                .iter()
                .map(|&value| DiceEntry::Detected { value, confidence: 0.9 })
                .collect(),
        }
    }

    #[test]
    fn hints_in_engine_order() {
        let advisor = fake_advisor(FAKE_GNUBG);
        let hints = advisor
            .hints(&request(&[3, 1]), Player::Two, &CancelToken::new())
            .unwrap();
        assert_eq!(hints.len(), 2);
        assert_eq!(hints[0].move_number, 1);
        assert_eq!(hints[0].moves, "8/5 6/5");
        assert_eq!(hints[1].moves, "24/21 6/5");
    }

    #[test]
    fn missing_positions_is_an_error() {
        let advisor = fake_advisor(FAKE_GNUBG);
        let request = AdviceRequest {
            checker_positions: None,
            dices: vec![],
        };
        assert_eq!(
            advisor.hints(&request, Player::One, &CancelToken::new()),
            Err(ProtocolError::MissingCheckerPositions)
        );
    }

    #[test]
    fn failures_degrade_to_no_hints() {
        let advisor = fake_advisor(FAKE_GNUBG);
        let cancel = CancelToken::new();
        assert_eq!(advisor.hints(&request(&[4]), Player::One, &cancel), Ok(vec![]));
        assert!(matches!(
            advisor.try_hints(&request(&[4]), Player::One, &cancel),
            Err(AdvisorError::MalformedDice { num_dice: 1 })
        ));

        let silent = fake_advisor("exit 0");
        assert_eq!(silent.hints(&request(&[6, 6]), Player::One, &cancel), Ok(vec![]));

        let mut config = silent.pool().config().clone();
        config.cmd = String::from("/nonexistent/analysis-engine");
        let broken = Advisor::new(EnginePool::new(config, None));
        assert_eq!(broken.hints(&request(&[6, 6]), Player::One, &cancel), Ok(vec![]));
    }
}
