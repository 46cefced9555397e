//! Frame query string resolution.

use url::form_urlencoded;

/// Name of the query parameter carrying the example path.
pub const FILE_PARAM: &str = "file";

/// Reasons a frame request does not name exactly one example file.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QueryError {
    #[error("No files specified in query string")]
    NoQuery,

    #[error("No file specified in query string")]
    MissingFile,

    #[error("Multiple files specified in query string ({0} values)")]
    MultipleFiles(usize),
}

/// Extract the single `file` parameter from a raw query string.
///
/// A leading `?` is ignored and blank values are dropped, so `?file=` is
/// treated the same as a missing parameter.
pub fn resolve_target(raw_query: Option<&str>) -> Result<String, QueryError> {
    let query = raw_query
        .map(|q| q.trim_start_matches('?'))
        .filter(|q| !q.is_empty())
        .ok_or(QueryError::NoQuery)?;

    let mut files: Vec<String> = form_urlencoded::parse(query.as_bytes())
        .filter(|(key, value)| key == FILE_PARAM && !value.is_empty())
        .map(|(_, value)| value.into_owned())
        .collect();

    match files.len() {
        0 => Err(QueryError::MissingFile),
        1 => Ok(files.remove(0)),
        n => Err(QueryError::MultipleFiles(n)),
    }
}
