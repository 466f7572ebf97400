use sanitize_filename::sanitize;
use std::path::{Path, PathBuf};

/// Default name of the credentials file, looked up in the working directory
pub const DEFAULT_AUTH_FILE: &str = "AUTH.yaml";

/// Generate the output filename for a user's follower export
/// Format: username_followers.jsonl
pub fn followers_filename(username: &str) -> String {
    format!("{username}_followers.jsonl")
}

/// Sanitize and create full file path
pub fn sanitized_file_path(output_dir: &Path, filename: &str) -> PathBuf {
    let sanitized_filename = sanitize(filename);
    output_dir.join(sanitized_filename)
}

/// Full path of the follower export for `username` inside `data_dir`
pub fn followers_file_path(data_dir: &Path, username: &str) -> PathBuf {
    sanitized_file_path(data_dir, &followers_filename(username))
}
