use std::time::Duration;

use backgammon::ProtocolError;

#[derive(Debug)]
/// Error type for one advice request.
pub enum AdvisorError {
    Protocol(ProtocolError),
    /// The engine needs exactly two dice.
    MalformedDice { num_dice: usize },
    /// A die value outside 1-6.
    DieOutOfRange { value: u8 },
    SpawnFailed { cmd: String, err: std::io::Error },
    EngineIo(std::io::Error),
    /// The engine didn't finish its hint output in time and was killed.
    Timeout { after: Duration },
    Cancelled,
}

impl std::error::Error for AdvisorError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AdvisorError::Protocol(err) => Some(err),
            AdvisorError::SpawnFailed { err, .. } => Some(err),
            AdvisorError::EngineIo(err) => Some(err),
            _ => None,
        }
    }
}

impl std::fmt::Display for AdvisorError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AdvisorError::Protocol(_) => write!(f, "Invalid advice request"),
            AdvisorError::MalformedDice { num_dice } => {
                write!(f, "There should be exactly two dice values, got {}", num_dice)
            }
            AdvisorError::DieOutOfRange { value } => {
                write!(f, "A die shows 1 to 6, got {}", value)
            }
            AdvisorError::SpawnFailed { cmd, .. } => {
                write!(f, "Could not start the analysis engine '{}'", cmd)
            }
            AdvisorError::EngineIo(_) => write!(f, "Lost the connection to the analysis engine"),
            AdvisorError::Timeout { after } => write!(
                f,
                "The analysis engine did not answer within {} ms",
                after.as_millis()
            ),
            AdvisorError::Cancelled => write!(f, "The advice request was cancelled"),
        }
    }
}

impl From<ProtocolError> for AdvisorError {
    fn from(err: ProtocolError) -> Self {
        AdvisorError::Protocol(err)
    }
}

impl From<std::io::Error> for AdvisorError {
    fn from(err: std::io::Error) -> Self {
        AdvisorError::EngineIo(err)
    }
}
