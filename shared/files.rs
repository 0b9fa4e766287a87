use log::debug;
use std::fs;
use std::io;
use std::path::Path;

/// Deletes a temporary molecule file.
///
/// Returns `Ok(false)` when the file was already gone.
pub fn remove_artifact(path: &Path) -> io::Result<bool> {
    match fs::remove_file(path) {
        Ok(()) => {
            debug!("Removed temporary artifact {}", path.display());
            Ok(true)
        }
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(err) => Err(err),
    }
}
