// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Platform-aware configuration file resolution.

use std::path::{Path, PathBuf};

const APP_DIR: &str = "quizlens";
const CONFIG_FILE: &str = "config.json";

/// Return the application config directory. Nothing is created on disk.
pub fn config_dir() -> PathBuf {
    resolve_base(
        std::env::var_os("XDG_CONFIG_HOME").map(PathBuf::from),
        std::env::var_os("HOME").map(PathBuf::from),
    )
    .join(APP_DIR)
}

/// Default location of the scanner config file.
pub fn default_config_path() -> PathBuf {
    config_dir().join(CONFIG_FILE)
}

/// The explicit path when given, otherwise the default location.
pub fn config_path(explicit: Option<&Path>) -> PathBuf {
    match explicit {
        Some(path) => path.to_path_buf(),
        None => default_config_path(),
    }
}

fn resolve_base(xdg: Option<PathBuf>, home: Option<PathBuf>) -> PathBuf {
    // Try XDG config dir, then fall back to home. An empty XDG value is unset.
    if let Some(xdg) = xdg.filter(|p| !p.as_os_str().is_empty()) {
        return xdg;
    }
    if let Some(home) = home {
        return home.join(".config");
    }
    // Last resort
    PathBuf::from(".")
}
