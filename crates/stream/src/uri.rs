use crate::FsError;

/// Turns `scheme://path` into the logical filename `/path`.
///
/// The scheme is discarded. A leading `/` is added when missing, so
/// `gridfs://a.txt` and `gridfs:///a.txt` name the same file.
pub fn logical_filename(uri: &str) -> Result<String, FsError> {
    let (_, path) = uri
        .split_once("://")
        .ok_or_else(|| FsError::InvalidUri(uri.to_string()))?;
    if path.is_empty() || path == "/" {
        return Err(FsError::InvalidUri(uri.to_string()));
    }
    if path.starts_with('/') {
        Ok(path.to_string())
    } else {
        Ok(format!("/{path}"))
    }
}
