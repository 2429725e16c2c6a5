/// Longest original name kept on a record.
const MAX_NAME_LEN: usize = 255;

/// Why a client-supplied file name was dropped.
#[derive(Debug, PartialEq, Eq)]
pub enum FilenameError {
    Empty,
    TooLong,
    NullByte,
    /// CR, LF and friends.
    ControlCharacter,
    /// Starts with a dot.
    Hidden,
}

/// Validate the last path component of a client-supplied file name.
///
/// Some browsers send `C:\fakepath\cat.png`; only `cat.png` is kept.
pub fn validate_display_name(raw: &str) -> Result<&str, FilenameError> {
    let leaf = raw.rsplit(['/', '\\']).next().unwrap_or(raw).trim();

    if leaf.is_empty() {
        return Err(FilenameError::Empty);
    }
    if leaf.len() > MAX_NAME_LEN {
        return Err(FilenameError::TooLong);
    }
    if leaf.contains('\0') {
        return Err(FilenameError::NullByte);
    }
    if leaf.chars().any(|c| c.is_control()) {
        return Err(FilenameError::ControlCharacter);
    }
    if leaf.starts_with('.') {
        return Err(FilenameError::Hidden);
    }

    Ok(leaf)
}

/// Sanitized name to record, or `None` when the client sent nothing usable.
pub fn display_name(raw: &str) -> Option<String> {
    validate_display_name(raw).ok().map(str::to_string)
}
