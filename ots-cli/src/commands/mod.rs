/// Info command implementation
pub mod info;

/// Stamp command implementation
pub mod stamp;

/// Status command implementation
pub mod status;

/// Upgrade command implementation
pub mod upgrade;

/// Verify command implementation
pub mod verify;

use std::path::{Path, PathBuf};

use ots_core::codec::{AttachedTimestampFile, DetachedTimestampFile};

use crate::error::{Error, Result};

/// Parse `raw` as a detached or attached timestamp and resolve the document
/// bytes it should be checked against, shared by `verify` and `status`
fn load_detached_and_document(
    file: &Path,
    target: Option<&Path>,
    raw: &[u8],
) -> Result<(DetachedTimestampFile, Vec<u8>)> {
    match DetachedTimestampFile::from_bytes(raw) {
        Ok(detached) => {
            let target_path = target.map(Path::to_path_buf).unwrap_or_else(|| derive_target(file));
            let document = std::fs::read(&target_path).map_err(|e| {
                Error::Verification(format!("reading target {}: {e}", target_path.display()))
            })?;
            Ok((detached, document))
        }
        Err(_) => {
            let attached = AttachedTimestampFile::from_bytes(raw)?;
            let document = match target {
                Some(path) => std::fs::read(path)?,
                None => attached.document,
            };
            Ok((attached.detached, document))
        }
    }
}

fn derive_target(file: &Path) -> PathBuf {
    file.to_string_lossy()
        .strip_suffix(".ots")
        .map_or_else(|| file.to_path_buf(), PathBuf::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derive_target_strips_ots_suffix() {
        assert_eq!(derive_target(Path::new("document.pdf.ots")), PathBuf::from("document.pdf"));
    }

    #[test]
    fn derive_target_leaves_non_ots_names_alone() {
        assert_eq!(derive_target(Path::new("document.pdf")), PathBuf::from("document.pdf"));
    }
}
