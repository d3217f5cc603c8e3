//! Feed error types.

use std::path::PathBuf;

/// Errors that can occur when reading or storing a feed.
#[derive(Debug, thiserror::Error)]
pub enum FeedError {
    /// A required feed file does not exist
    #[error("missing feed file: {}", path.display())]
    MissingFile { path: PathBuf },

    /// Reading a feed file failed
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A feed file could not be parsed as CSV
    #[error("CSV error in {file}: {source}")]
    Csv {
        file: String,
        #[source]
        source: csv::Error,
    },

    /// A row parsed but failed validation
    #[error("invalid record in {file} at line {line}: {reason}")]
    InvalidRecord {
        file: String,
        line: u64,
        reason: String,
    },

    /// The store holds a value that cannot be turned back into a record
    #[error("corrupt stored {table} row: {reason}")]
    CorruptRow { table: &'static str, reason: String },

    /// Database operation failed
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// The store connection lock was poisoned by a panicking holder
    #[error("feed store lock poisoned")]
    LockPoisoned,

    /// A blocking store task failed to complete
    #[error("feed task failed: {0}")]
    Task(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = FeedError::MissingFile {
            path: PathBuf::from("data/gtfs/routes.txt"),
        };
        assert_eq!(err.to_string(), "missing feed file: data/gtfs/routes.txt");

        let err = FeedError::InvalidRecord {
            file: "stops.txt".into(),
            line: 7,
            reason: "invalid stop id: must not be blank".into(),
        };
        assert_eq!(
            err.to_string(),
            "invalid record in stops.txt at line 7: invalid stop id: must not be blank"
        );

        let err = FeedError::CorruptRow {
            table: "trips",
            reason: "invalid trip id: must not be blank".into(),
        };
        assert_eq!(
            err.to_string(),
            "corrupt stored trips row: invalid trip id: must not be blank"
        );

        assert_eq!(FeedError::LockPoisoned.to_string(), "feed store lock poisoned");
    }
}
