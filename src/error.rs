use std::fmt;

#[derive(Debug)]
pub enum RegroupError {
    Io(std::io::Error),
    Csv(csv::Error),
    Json(serde_json::Error),
    Database(String),
    Input(String),
    /// A chunk transaction was rolled back. `first..=last` are record positions in the artifact.
    Chunk {
        first: usize,
        last: usize,
        source: Box<RegroupError>,
    },
    Other(String),
}

impl fmt::Display for RegroupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegroupError::Io(e) => write!(f, "IO error: {}", e),
            RegroupError::Csv(e) => write!(f, "CSV error: {}", e),
            RegroupError::Json(e) => write!(f, "JSON error: {}", e),
            RegroupError::Database(e) => write!(f, "Database error: {}", e),
            RegroupError::Input(e) => write!(f, "Input error: {}", e),
            RegroupError::Chunk { first, last, source } => {
                write!(f, "Chunk {}-{} rolled back: {}", first, last, source)
            }
            RegroupError::Other(e) => write!(f, "Error: {}", e),
        }
    }
}

impl std::error::Error for RegroupError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RegroupError::Io(e) => Some(e),
            RegroupError::Csv(e) => Some(e),
            RegroupError::Json(e) => Some(e),
            RegroupError::Chunk { source, .. } => Some(source.as_ref()),
            _ => None,
        }
    }
}

impl From<std::io::Error> for RegroupError {
    fn from(err: std::io::Error) -> Self {
        RegroupError::Io(err)
    }
}

impl From<csv::Error> for RegroupError {
    fn from(err: csv::Error) -> Self {
        RegroupError::Csv(err)
    }
}

impl From<serde_json::Error> for RegroupError {
    fn from(err: serde_json::Error) -> Self {
        RegroupError::Json(err)
    }
}

#[cfg(feature = "postgres")]
impl From<postgres::Error> for RegroupError {
    fn from(err: postgres::Error) -> Self {
        RegroupError::Database(err.to_string())
    }
}

impl From<String> for RegroupError {
    fn from(err: String) -> Self {
        RegroupError::Other(err)
    }
}

impl From<&str> for RegroupError {
    fn from(err: &str) -> Self {
        RegroupError::Other(err.to_string())
    }
}
