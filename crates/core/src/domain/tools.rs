// External tool locations (bridge + mirroring viewer)

use std::path::{Path, PathBuf};

use crate::error::{AppError, Result};

#[cfg(windows)]
pub const BRIDGE_EXECUTABLE: &str = "adb.exe";
#[cfg(not(windows))]
pub const BRIDGE_EXECUTABLE: &str = "adb";

#[cfg(windows)]
pub const MIRROR_EXECUTABLE: &str = "scrcpy-noconsole.exe";
#[cfg(not(windows))]
pub const MIRROR_EXECUTABLE: &str = "scrcpy";

/// Paths of the executables shipped in one install directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolPaths {
    pub install_dir: PathBuf,
    pub bridge: PathBuf,
    pub mirror: PathBuf,
}

impl ToolPaths {
    pub fn new(install_dir: impl Into<PathBuf>) -> Self {
        let install_dir = install_dir.into();
        Self {
            bridge: install_dir.join(BRIDGE_EXECUTABLE),
            mirror: install_dir.join(MIRROR_EXECUTABLE),
            install_dir,
        }
    }

    /// Pick the install directory
    ///
    /// A configured directory always wins. Without one, the working directory
    /// is used if it contains the mirroring viewer.
    ///
    /// # Errors
    /// - AppError::Config if neither source yields a directory
    pub fn resolve(configured: Option<&Path>, working_dir: &Path) -> Result<Self> {
        if let Some(dir) = configured.filter(|d| !d.as_os_str().is_empty()) {
            return Ok(Self::new(dir));
        }

        if working_dir.join(MIRROR_EXECUTABLE).is_file() {
            return Ok(Self::new(working_dir));
        }

        Err(AppError::Config(format!(
            "no install directory configured and {} not found in {}",
            MIRROR_EXECUTABLE,
            working_dir.display()
        )))
    }

    pub fn can_mirror(&self) -> bool {
        self.mirror.is_file()
    }
}
