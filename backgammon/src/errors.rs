/// The error type for malformed exchange data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    UnknownPlayer(String),
    InvalidPoint(String),
    MissingCheckerPositions,
}

impl std::error::Error for ProtocolError {}

impl std::fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProtocolError::UnknownPlayer(name) => {
                write!(f, "Invalid player name '{}', expected 'player_1' or 'player_2'", name)
            }
            ProtocolError::InvalidPoint(key) => {
                write!(f, "Checker positions contain '{}', which is not a point between 1 and 24", key)
            }
            ProtocolError::MissingCheckerPositions => write!(f, "Checker positions are missing"),
        }
    }
}

/// The error type for building a [`PositionArray`](crate::PositionArray).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvalidPositions {
    WrongLength { len: usize },
    /// A point holds more checkers than a player has.
    TooManyCheckers { point: usize, count: i32 },
}

impl std::error::Error for InvalidPositions {}

impl std::fmt::Display for InvalidPositions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InvalidPositions::WrongLength { len } => write!(
                f,
                "The checker positions must have exactly 26 integers, got {}",
                len
            ),
            InvalidPositions::TooManyCheckers { point, count } => write!(
                f,
                "Point {} holds {} checkers, at most 15 are possible",
                point,
                count.unsigned_abs()
            ),
        }
    }
}

/// The error type for [`calibrate()`](crate::calibrate).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CalibrationError {
    /// The four corners don't span a proper quadrilateral, e.g. three of them are collinear.
    DegenerateCorners,
    /// The template doesn't contain the 24 points plus the bar.
    IncompleteTemplate { num_points: usize },
}

impl std::error::Error for CalibrationError {}

impl std::fmt::Display for CalibrationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CalibrationError::DegenerateCorners => {
                write!(f, "The board corners do not define a perspective transform")
            }
            CalibrationError::IncompleteTemplate { num_points } => write!(
                f,
                "The template defines {} points, but 25 (24 points and the bar) are needed",
                num_points
            ),
        }
    }
}

/// The error type for [`read_board()`](crate::read_board).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BoardNotFound {
    /// Fewer than two board markers were detected.
    TooFewMarkers { found: usize },
    Calibration(CalibrationError),
}

impl std::error::Error for BoardNotFound {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            BoardNotFound::Calibration(err) => Some(err),
            _ => None,
        }
    }
}

impl std::fmt::Display for BoardNotFound {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BoardNotFound::TooFewMarkers { found } => write!(
                f,
                "Unable to detect the game board ({} board markers found, at least 2 needed)",
                found
            ),
            BoardNotFound::Calibration(_) => write!(f, "Unable to align the board template"),
        }
    }
}

impl From<CalibrationError> for BoardNotFound {
    fn from(err: CalibrationError) -> Self {
        BoardNotFound::Calibration(err)
    }
}

/// The error type for snapshot stores and the reconciler.
#[derive(Debug)]
pub enum StoreError {
    InvalidPositions(InvalidPositions),
    Io(std::io::Error),
    Corrupt { facet: &'static str, line: usize, err: serde_json::Error },
    Encode(serde_json::Error),
    /// A facet has no records, so there is no current state.
    Empty { facet: &'static str },
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StoreError::InvalidPositions(err) => Some(err),
            StoreError::Io(err) => Some(err),
            StoreError::Corrupt { err, .. } => Some(err),
            StoreError::Encode(err) => Some(err),
            StoreError::Empty { .. } => None,
        }
    }
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::InvalidPositions(_) => write!(f, "Refusing to store invalid checker positions"),
            StoreError::Io(_) => write!(f, "Could not access the snapshot store"),
            StoreError::Corrupt { facet, line, .. } => {
                write!(f, "Record {} of the {} history is corrupt", line, facet)
            }
            StoreError::Encode(_) => write!(f, "Could not encode a snapshot record"),
            StoreError::Empty { facet } => write!(f, "The {} history is empty", facet),
        }
    }
}

impl From<InvalidPositions> for StoreError {
    fn from(err: InvalidPositions) -> Self {
        StoreError::InvalidPositions(err)
    }
}

impl From<std::io::Error> for StoreError {
    fn from(err: std::io::Error) -> Self {
        StoreError::Io(err)
    }
}
