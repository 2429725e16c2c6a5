use super::error::StorageError;

const MAX_FOLDER_LEN: usize = 128;

/// Validate a folder hint and return it trimmed.
///
/// Folders become key prefixes on every backend, so they are restricted to
/// `a-zA-Z0-9`, `-`, `_` and `/`-separated segments without traversal.
/// Blank hints mean "no folder".
pub fn normalize(folder: Option<&str>) -> Result<Option<String>, StorageError> {
    let Some(raw) = folder else {
        return Ok(None);
    };
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }

    if trimmed.len() > MAX_FOLDER_LEN {
        return Err(invalid(format!(
            "exceeds maximum length of {MAX_FOLDER_LEN} characters"
        )));
    }
    if trimmed.starts_with('/') || trimmed.ends_with('/') {
        return Err(invalid("must not start or end with '/'"));
    }

    for segment in trimmed.split('/') {
        if segment.is_empty() {
            return Err(invalid("must not contain empty segments"));
        }
        if segment.starts_with('.') {
            return Err(invalid("segments must not start with '.'"));
        }
        if !segment
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_'))
        {
            return Err(invalid(
                "contains invalid characters (allowed: a-zA-Z0-9, /, -, _)",
            ));
        }
    }

    Ok(Some(trimmed.to_string()))
}

fn invalid(msg: impl Into<String>) -> StorageError {
    StorageError::InvalidFolder(msg.into())
}

/// Join an optional folder and a leaf name into an object key.
pub fn object_key(folder: Option<&str>, leaf: &str) -> String {
    match folder {
        Some(folder) => format!("{folder}/{leaf}"),
        None => leaf.to_string(),
    }
}
