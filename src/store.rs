use std::fs;
use std::path::Path;

use serde_json::Value;

use crate::error::{Error, Result};
use crate::headline::{HeadlineEntry, HeadlineRecord};

/// Result of reading the headline database.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Loaded {
    pub entries: Vec<HeadlineEntry>,
    /// Set when the file was absent; meant to be shown to the user.
    pub notice: Option<String>,
}

/// Reads every `(key, record)` pair from `path` in file order.
///
/// A missing file is not an error: the result is empty and carries a
/// notice instead. Anything else that goes wrong is returned.
pub fn load(path: &Path) -> Result<Loaded> {
    if !path.exists() {
        let notice = format!("No such file `{}`", path.display());
        tracing::warn!(path = %path.display(), "headline database missing");
        return Ok(Loaded {
            entries: Vec::new(),
            notice: Some(notice),
        });
    }

    let data = fs::read_to_string(path).map_err(|source| Error::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let raw: Vec<(Value, Vec<Value>)> =
        serde_json::from_str(&data).map_err(|source| Error::Parse {
            path: path.to_path_buf(),
            source,
        })?;

    let entries = raw
        .into_iter()
        .enumerate()
        .map(|(index, (key, fields))| {
            HeadlineRecord::try_from(fields)
                .map(|record| HeadlineEntry { key, record })
                .map_err(|err| Error::MalformedRecord {
                    path: path.to_path_buf(),
                    index,
                    reason: err.to_string(),
                })
        })
        .collect::<Result<Vec<_>>>()?;

    tracing::debug!(path = %path.display(), count = entries.len(), "loaded headlines");
    Ok(Loaded {
        entries,
        notice: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::headline::sample_fields;
    use serde_json::json;
    use std::io::Write;
    use tempfile::{tempdir, NamedTempFile};

    fn write_db(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn keeps_file_order() {
        let db = json!([
            ["k1", sample_fields("First", "http://example.com/1", json!(10))],
            ["k2", sample_fields("Second", "http://example.com/2", json!(20))],
            [3, sample_fields("Third", "http://example.com/3", json!(30))],
        ]);
        let file = write_db(&db.to_string());

        let loaded = load(file.path()).unwrap();
        assert!(loaded.notice.is_none());
        let titles: Vec<_> = loaded.entries.iter().map(|e| e.record.title()).collect();
        assert_eq!(titles, ["First", "Second", "Third"]);
        assert_eq!(loaded.entries[2].key, json!(3));
    }

    #[test]
    fn missing_file_is_empty_with_notice() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("headlines.json");
        let loaded = load(&path).unwrap();
        assert!(loaded.entries.is_empty());
        assert_eq!(
            loaded.notice,
            Some(format!("No such file `{}`", path.display()))
        );
    }

    #[test]
    fn empty_list_loads() {
        let file = write_db("[]");
        let loaded = load(file.path()).unwrap();
        assert!(loaded.entries.is_empty());
        assert!(loaded.notice.is_none());
    }

    #[test]
    fn invalid_json_is_a_parse_error() {
        let file = write_db("((\"k1\" . [\"lisp\"]))");
        assert!(matches!(load(file.path()), Err(Error::Parse { .. })));
    }

    #[test]
    fn bad_record_reports_its_index() {
        let db = json!([
            ["k1", sample_fields("Fine", "http://example.com/1", json!(10))],
            ["k2", ["only", "two"]],
        ]);
        let file = write_db(&db.to_string());
        match load(file.path()) {
            Err(Error::MalformedRecord { index, .. }) => assert_eq!(index, 1),
            other => panic!("unexpected result: {other:?}"),
        }
    }
}
