// file: src/utils/system.rs
// version: 2.0.0
// guid: w3x4y5z6-a7b8-9012-3456-789012wxyzab

//! System utility functions

use std::borrow::Cow;
use std::path::{Path, PathBuf};

/// System utility functions
pub struct SystemUtils;

impl SystemUtils {
    /// Check if a command exists in PATH
    pub fn command_exists(command: &str) -> bool {
        which::which(command).is_ok()
    }

    /// Effective user id of this process
    pub fn effective_uid() -> u32 {
        #[cfg(unix)]
        {
            unsafe { libc::geteuid() }
        }
        #[cfg(not(unix))]
        {
            u32::MAX
        }
    }

    /// Name of the invoking user
    pub fn current_user() -> String {
        std::env::var("USER")
            .or_else(|_| std::env::var("LOGNAME"))
            .unwrap_or_else(|_| "unknown".to_string())
    }

    /// Home directory of the invoking user
    pub fn home_dir() -> PathBuf {
        dirs::home_dir().unwrap_or_else(|| PathBuf::from("/root"))
    }

    /// Expand a leading `~` against `home`
    pub fn expand_home(path: &str, home: &Path) -> PathBuf {
        let expanded: Cow<str> =
            shellexpand::tilde_with_context(path, || Some(home.to_string_lossy().into_owned()));
        PathBuf::from(expanded.as_ref())
    }
}
