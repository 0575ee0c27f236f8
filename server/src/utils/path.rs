//! Path helpers

use std::path::PathBuf;

/// Expand `~` and make relative paths absolute against the current directory
pub fn expand_path(path: &str) -> PathBuf {
    let path = path.trim();
    let cwd = || std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));

    if path.is_empty() {
        return cwd();
    }

    let expanded = match path {
        "~" => dirs::home_dir().unwrap_or_else(|| PathBuf::from(path)),
        _ => match path.strip_prefix("~/").zip(dirs::home_dir()) {
            Some((rest, home)) => home.join(rest),
            None => PathBuf::from(path),
        },
    };

    if expanded.is_absolute() {
        expanded
    } else {
        cwd().join(expanded)
    }
}
