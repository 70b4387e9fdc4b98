use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempPath;
use tracing::{debug, info};

use super::Platform;
use crate::error::{JunkyardError, Result};

/// An encoder executable shipped next to the application.
///
/// Bundles are laid out as `<bundle_dir>/<platform>/<binary>`. The binary is
/// copied to a temporary file before use so it can be given execute
/// permission regardless of how it was installed; the copy is removed when
/// the bundle is dropped.
pub struct BinaryBundle {
    source: PathBuf,
    materialized: TempPath,
}

impl BinaryBundle {
    /// Location of the bundled binary for `platform`, if the layout knows one
    pub fn locate(bundle_dir: &Path, platform: Platform, binary_name: &str) -> Option<PathBuf> {
        let directory = platform.bundle_directory()?;
        let file_name = if platform == Platform::Windows {
            format!("{}.exe", binary_name)
        } else {
            binary_name.to_string()
        };
        let candidate = bundle_dir.join(directory).join(file_name);
        candidate.is_file().then_some(candidate)
    }

    /// Copy `source` to a temporary executable file
    pub fn materialize<P: AsRef<Path>>(source: P) -> Result<Self> {
        let source = source.as_ref();
        if !source.is_file() {
            return Err(JunkyardError::FileNotFound(source.display().to_string()));
        }

        let materialized = tempfile::Builder::new()
            .prefix("junkyard-bundle")
            .tempfile()?
            .into_temp_path();
        fs::copy(source, &materialized)?;
        make_executable(&materialized)?;

        info!("Materialized bundled encoder {} -> {}", source.display(), materialized.display());
        Ok(Self {
            source: source.to_path_buf(),
            materialized,
        })
    }

    /// Path of the executable copy
    pub fn executable(&self) -> &Path {
        &self.materialized
    }

    /// Directory the bundle came from, used for shared libraries
    pub fn source_dir(&self) -> Option<&Path> {
        self.source.parent()
    }
}

#[cfg(unix)]
fn make_executable(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let mut permissions = fs::metadata(path)?.permissions();
    if permissions.mode() & 0o100 == 0 {
        debug!("Setting execute permission on {}", path.display());
        permissions.set_mode(permissions.mode() | 0o700);
        fs::set_permissions(path, permissions)?;
    }
    Ok(())
}

#[cfg(not(unix))]
fn make_executable(_path: &Path) -> Result<()> {
    Ok(())
}
