//! Input validation: make sure the ledger path is a readable PDF.
//!
//! pdfium reports a missing file and a truncated one with the same opaque
//! error. Checking existence, permissions and the `%PDF` magic bytes up front
//! gives the caller a precise error before any chunk is dispatched.

use crate::error::LedgerError;
use std::io::Read;
use std::path::Path;
use tracing::debug;

/// Check that `path` exists, is readable, and starts with `%PDF`.
pub fn validate_local(path: &Path) -> Result<(), LedgerError> {
    if !path.exists() {
        return Err(LedgerError::FileNotFound {
            path: path.to_path_buf(),
        });
    }

    match std::fs::File::open(path) {
        Ok(mut f) => {
            let mut magic = [0u8; 4];
            if f.read_exact(&mut magic).is_ok() && &magic != b"%PDF" {
                return Err(LedgerError::NotAPdf {
                    path: path.to_path_buf(),
                    magic,
                });
            }
        }
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(LedgerError::PermissionDenied {
                path: path.to_path_buf(),
            });
        }
        Err(_) => {
            return Err(LedgerError::FileNotFound {
                path: path.to_path_buf(),
            });
        }
    }

    debug!("Validated local PDF: {}", path.display());
    Ok(())
}
