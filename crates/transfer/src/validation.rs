use std::path::{Component, Path};

use crate::error::SinkError;

/// Validates the file name prefix used by [`FileSink`](crate::FileSink).
///
/// The prefix becomes the leading part of every stored file name, so it
/// must be a single plain path component. Rejects:
/// - Empty prefixes
/// - Path separators and absolute paths
/// - `.` and `..`
/// - Windows prefix components (`C:`)
pub fn validate_file_prefix(prefix: &str) -> Result<(), SinkError> {
    if prefix.is_empty() {
        return Err(SinkError::InvalidPrefix("empty prefix".into()));
    }

    if prefix.contains(['/', '\\']) {
        return Err(SinkError::InvalidPrefix(format!(
            "path separator not allowed: {prefix}"
        )));
    }

    let mut components = Path::new(prefix).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => Ok(()),
        (Some(Component::ParentDir | Component::CurDir), _) => Err(SinkError::InvalidPrefix(
            format!("relative directory not allowed: {prefix}"),
        )),
        _ => Err(SinkError::InvalidPrefix(format!(
            "not a plain file name: {prefix}"
        ))),
    }
}
