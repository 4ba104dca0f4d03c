// crates/warden-config/src/keys.rs
// ============================================================================
// Module: Key File Management
// Description: Loading and creation of the shared 32-byte key files.
// Purpose: Keep key material in user-only files with strict validation.
// Dependencies: rand
// ============================================================================

//! ## Overview
//! The signing key and the credential sealing key are 32 random bytes each,
//! stored in files readable only by the owning user. Loading validates both
//! the length and the file mode; a group- or world-accessible key file fails
//! closed.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::io::Write;
use std::os::unix::fs::OpenOptionsExt;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;

use rand::RngCore;
use rand::rngs::OsRng;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Length of a key file payload in bytes.
pub const KEY_BYTES: usize = 32;
/// File mode required on key files.
const KEY_FILE_MODE: u32 = 0o600;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Key file errors.
#[derive(Debug, Error)]
pub enum KeyError {
    /// Key file I/O failed.
    #[error("key file io error: {0}")]
    Io(String),
    /// Key file has the wrong length.
    #[error("key file must hold {expected} bytes, found {actual}")]
    Length {
        /// Expected key length in bytes.
        expected: usize,
        /// Actual key length in bytes.
        actual: usize,
    },
    /// Key file is accessible beyond the owning user.
    #[error("key file mode too permissive: {mode:o}")]
    Permissions {
        /// Observed file mode bits.
        mode: u32,
    },
}

// ============================================================================
// SECTION: Operations
// ============================================================================

/// Loads a key file, validating length and mode.
///
/// # Errors
///
/// Returns [`KeyError`] when the file is missing, malformed, or readable
/// beyond the owning user.
pub fn load_key(path: &Path) -> Result<[u8; KEY_BYTES], KeyError> {
    let metadata = fs::metadata(path).map_err(|err| KeyError::Io(err.to_string()))?;
    let mode = metadata.permissions().mode() & 0o777;
    if mode & 0o077 != 0 {
        return Err(KeyError::Permissions { mode });
    }
    let bytes = fs::read(path).map_err(|err| KeyError::Io(err.to_string()))?;
    let key: [u8; KEY_BYTES] = bytes.as_slice().try_into().map_err(|_| KeyError::Length {
        expected: KEY_BYTES,
        actual: bytes.len(),
    })?;
    Ok(key)
}

/// Writes a key file with user-only permissions, replacing any existing file.
///
/// # Errors
///
/// Returns [`KeyError::Io`] when the file cannot be written.
pub fn write_key(path: &Path, key: &[u8; KEY_BYTES]) -> Result<(), KeyError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|err| KeyError::Io(err.to_string()))?;
    }
    let mut file = fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(KEY_FILE_MODE)
        .open(path)
        .map_err(|err| KeyError::Io(err.to_string()))?;
    // An existing file keeps its old mode; pin it down explicitly.
    file.set_permissions(fs::Permissions::from_mode(KEY_FILE_MODE))
        .map_err(|err| KeyError::Io(err.to_string()))?;
    file.write_all(key).map_err(|err| KeyError::Io(err.to_string()))?;
    file.flush().map_err(|err| KeyError::Io(err.to_string()))
}

/// Loads a key file, generating a fresh key when the file is missing.
///
/// # Errors
///
/// Returns [`KeyError`] when an existing file is invalid or a fresh key
/// cannot be written.
pub fn load_or_create_key(path: &Path) -> Result<[u8; KEY_BYTES], KeyError> {
    if path.exists() {
        return load_key(path);
    }
    let mut key = [0u8; KEY_BYTES];
    OsRng.fill_bytes(&mut key);
    write_key(path, &key)?;
    Ok(key)
}

// ============================================================================
// SECTION: Tests
// ============================================================================
