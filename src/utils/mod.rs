//! Utility functions and helpers.

pub mod http;

use std::path::{Path, PathBuf};

/// Expand a leading `~` to the user's home directory.
///
/// Paths without a leading `~` component, or a missing `HOME`, are returned unchanged.
pub fn expand_home(path: &Path) -> PathBuf {
    let Ok(rest) = path.strip_prefix("~") else {
        return path.to_path_buf();
    };
    match std::env::var_os("HOME") {
        Some(home) => PathBuf::from(home).join(rest),
        None => path.to_path_buf(),
    }
}

/// Substitute the `{id}` placeholder of a URL template.
///
/// The id is percent-encoded so it always stays within one path segment.
pub fn fill_id(template: &str, id: &str) -> String {
    let encoded: String = url::form_urlencoded::byte_serialize(id.as_bytes())
        .map(|chunk| if chunk == "+" { "%20" } else { chunk })
        .collect();
    template.replace("{id}", &encoded)
}
