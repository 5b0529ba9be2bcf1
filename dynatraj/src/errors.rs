#[non_exhaustive]
#[derive(Debug)]
pub enum Error {
    /// Got an invalid parameter value in a function
    InvalidParameter(String),
    /// The simulation cell is not an integer replication of the reference
    /// cell
    IncompatibleCell(String),
    /// The atoms in the trajectory could not be matched to the atoms in the
    /// reference structure
    Arrangement(String),
    /// Some data required for a computation was not provided
    MissingData(String),
    /// Error while reading or writing a scratch file
    Io(std::io::Error),
    /// Error while serializing/deserializing data
    Json(serde_json::Error),
    /// Error used for failed internal consistency check, i.e. bugs in
    /// dynatraj.
    Internal(String),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::InvalidParameter(e) => write!(f, "invalid parameter: {}", e),
            Error::IncompatibleCell(e) => write!(f, "structure cell and MD cell do not fit: {}", e),
            Error::Arrangement(e) => write!(f, "could not match the order of atoms: {}", e),
            Error::MissingData(e) => write!(f, "missing data: {}", e),
            Error::Io(e) => write!(f, "I/O error: {}", e),
            Error::Json(e) => write!(f, "json error: {}", e),
            Error::Internal(e) => {
                write!(f, "internal dynatraj error")?;
                if e.contains("assertion failed") {
                    write!(f, " (this is likely a bug, please report it)")?;
                }
                write!(f, ": {}", e)
            }
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::InvalidParameter(_) |
            Error::IncompatibleCell(_) |
            Error::Arrangement(_) |
            Error::MissingData(_) |
            Error::Internal(_) => None,
            Error::Io(e) => Some(e),
            Error::Json(e) => Some(e),
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(error: std::io::Error) -> Error {
        Error::Io(error)
    }
}

impl From<serde_json::Error> for Error {
    fn from(error: serde_json::Error) -> Error {
        Error::Json(error)
    }
}

impl From<ndarray::ShapeError> for Error {
    fn from(error: ndarray::ShapeError) -> Error {
        Error::Internal(format!("invalid array shape: {}", error))
    }
}
