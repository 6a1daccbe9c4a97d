use std::{env, path::PathBuf};

/// Per-user data directories searched for configuration, most specific first.
#[allow(deprecated)]
pub fn get_paths() -> Vec<PathBuf> {
    #[cfg(all(unix, not(target_os = "macos")))]
    {
        unix_paths(env::var_os("XDG_DATA_HOME").map(PathBuf::from), env::home_dir())
    }
    #[cfg(target_os = "macos")]
    {
        env::home_dir()
            .map(|home| home.join("Library/Application Support"))
            .into_iter()
            .collect()
    }
    #[cfg(target_os = "windows")]
    {
        ["LOCALAPPDATA", "APPDATA"]
            .into_iter()
            .filter_map(env::var_os)
            .map(PathBuf::from)
            .collect()
    }
    #[cfg(not(any(unix, target_os = "windows")))]
    {
        Vec::new()
    }
}

#[cfg(all(unix, not(target_os = "macos")))]
fn unix_paths(data_home: Option<PathBuf>, home: Option<PathBuf>) -> Vec<PathBuf> {
    data_home
        .into_iter()
        .chain(home.map(|home| home.join(".local/share")))
        .collect()
}
