use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("buffer isn't the headline buffer")]
    NotHeadlineView,
    #[error("no headline details on that line")]
    NoHeadlineOnLine,
    #[error("read headline database {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("parse headline database {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("headline database {}: entry {index}: {reason}", .path.display())]
    MalformedRecord {
        path: PathBuf,
        index: usize,
        reason: String,
    },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
