use std::path::PathBuf;

/// XDG app name used for config and state directories.
pub const APP_NAME: &str = "lead-enricher";

const CONFIG_FILE_NAME: &str = "config.toml";

fn project_dirs() -> Option<directories::ProjectDirs> {
    directories::ProjectDirs::from("", "", APP_NAME)
}

/// `~/.config/lead-enricher` (platform equivalent elsewhere).
pub fn config_dir() -> Option<PathBuf> {
    project_dirs().map(|dirs| dirs.config_dir().to_path_buf())
}

pub fn config_file() -> Option<PathBuf> {
    config_dir().map(|dir| dir.join(CONFIG_FILE_NAME))
}

/// Directory holding the persisted credential and saved searches.
///
/// Prefers the XDG state dir, then the local data dir (macOS has no state
/// dir), then a directory under the system temp dir.
pub fn state_dir() -> PathBuf {
    if let Some(dirs) = project_dirs() {
        return dirs
            .state_dir()
            .unwrap_or_else(|| dirs.data_local_dir())
            .to_path_buf();
    }
    state_dir_fallback()
}

pub fn state_dir_fallback() -> PathBuf {
    std::env::temp_dir().join(format!("{APP_NAME}-state"))
}
