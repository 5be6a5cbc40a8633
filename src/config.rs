//! Runtime configuration
//!
//! Everything is read from the environment; there is no config file.

use std::path::PathBuf;

/// Overrides the database file location
pub const DATABASE_PATH_ENV: &str = "BAKER_RATIO_DATABASE_PATH";

/// Log filter directive applied on top of `RUST_LOG`
pub const DEFAULT_LOG_DIRECTIVE: &str = "baker_ratio=info";

const DATABASE_FILE: &str = "baker_ratio.db";

/// Database path from the environment, else `<project>/data/baker_ratio.db`
pub fn database_path() -> PathBuf {
    std::env::var(DATABASE_PATH_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|_| default_database_path())
}

/// `data/baker_ratio.db` next to the executable, or at the project root
/// when running from `target/debug` or `target/release`
fn default_database_path() -> PathBuf {
    let exe_dir = std::env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(|p| p.to_path_buf()))
        .unwrap_or_else(|| PathBuf::from("."));

    let mut path = project_root(exe_dir);
    path.push("data");
    path.push(DATABASE_FILE);
    path
}

fn project_root(exe_dir: PathBuf) -> PathBuf {
    if exe_dir.ends_with("release") || exe_dir.ends_with("debug") {
        if let Some(root) = exe_dir.parent().and_then(|target| target.parent()) {
            return root.to_path_buf();
        }
    }
    exe_dir
}
