//! Branch name validation following git's `check-ref-format` rules.
//!
//! A valid branch name:
//! - is non-empty
//! - contains no whitespace, control characters, `~`, `^`, `:`, `?`, `*`, `[`, `\`
//! - contains neither `..` nor `@{`
//! - does not start or end with `/`, and does not end with `.` or `.lock`
//! - has non-empty `/`-separated components, none starting with `.`

use crate::error::{StoreError, StoreResult};

const FORBIDDEN_CHARS: &[char] = &['~', '^', ':', '?', '*', '[', '\\'];

/// Validate a branch name, returning `Ok(())` if valid.
///
/// ```
/// use gitdav_store::validate_branch_name;
///
/// assert!(validate_branch_name("master").is_ok());
/// assert!(validate_branch_name("release/1.x").is_ok());
/// assert!(validate_branch_name("").is_err());
/// assert!(validate_branch_name("bad..name").is_err());
/// ```
pub fn validate_branch_name(name: &str) -> StoreResult<()> {
    let invalid = |reason: String| StoreError::InvalidBranchName {
        name: name.to_string(),
        reason,
    };

    if name.is_empty() {
        return Err(invalid("must not be empty".into()));
    }
    if let Some(ch) = name
        .chars()
        .find(|c| c.is_whitespace() || c.is_control() || FORBIDDEN_CHARS.contains(c))
    {
        return Err(invalid(format!("contains forbidden character {ch:?}")));
    }
    for sequence in ["..", "@{"] {
        if name.contains(sequence) {
            return Err(invalid(format!("must not contain {sequence:?}")));
        }
    }
    if name.starts_with('/') || name.ends_with('/') {
        return Err(invalid("must not start or end with '/'".into()));
    }
    if name.ends_with('.') || name.ends_with(".lock") {
        return Err(invalid("must not end with '.' or '.lock'".into()));
    }
    for component in name.split('/') {
        if component.is_empty() {
            return Err(invalid("path components must not be empty".into()));
        }
        if component.starts_with('.') {
            return Err(invalid(format!(
                "component must not start with '.': {component:?}"
            )));
        }
    }
    Ok(())
}
