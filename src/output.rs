//! Writing matches to a JSON file.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::worker::MatchResult;

/// A match as written to disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchRecord {
    /// EIP-55 checksummed address with 0x prefix
    pub address: String,
    /// Private key with 0x prefix
    pub private_key: String,
    /// Attempts made by the worker that found it
    pub attempts: u64,
    pub elapsed_ms: u64,
    pub worker_id: usize,
}

impl From<&MatchResult> for MatchRecord {
    fn from(result: &MatchResult) -> Self {
        Self {
            address: result.address.to_checksum(),
            private_key: result.private_key.to_hex_prefixed(),
            attempts: result.attempts,
            elapsed_ms: u64::try_from(result.elapsed.as_millis()).unwrap_or(u64::MAX),
            worker_id: result.worker_id,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum OutputError {
    #[error("Failed to write {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("Failed to serialize matches: {0}")]
    Json(#[from] serde_json::Error),
}

/// Writes `records` to `path` as a pretty-printed JSON array.
///
/// Parent directories are created. The file holds private keys, so on Unix
/// it is left readable by the owner only, even if it already existed.
pub fn write_json(path: &Path, records: &[MatchRecord]) -> Result<(), OutputError> {
    let io_err = |source| OutputError::Io {
        path: path.display().to_string(),
        source,
    };

    let data = serde_json::to_vec_pretty(records)?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(io_err)?;
    }

    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    let mut file = options.open(path).map_err(io_err)?;
    // `mode` only applies on creation; tighten an existing file before writing
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        file.set_permissions(fs::Permissions::from_mode(0o600))
            .map_err(io_err)?;
    }
    file.write_all(&data).map_err(io_err)?;
    file.write_all(b"\n").map_err(io_err)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::{Keypair, PrivateKey};
    use std::time::Duration;

    fn sample_result() -> MatchResult {
        let mut secret = [0u8; 32];
        secret[31] = 1;
        let (private_key, address) = Keypair::from_secret_key(secret).unwrap().into_parts();
        MatchResult {
            private_key,
            address,
            attempts: 42,
            elapsed: Duration::from_millis(1500),
            worker_id: 3,
        }
    }

    #[test]
    fn test_record_from_result() {
        let record = MatchRecord::from(&sample_result());
        assert_eq!(record.address, "0x7E5F4552091A69125d5DfCb7b8C2659029395Bdf");
        assert_eq!(
            record.private_key,
            "0x0000000000000000000000000000000000000000000000000000000000000001"
        );
        assert_eq!(record.attempts, 42);
        assert_eq!(record.elapsed_ms, 1500);
        assert_eq!(record.worker_id, 3);
    }

    #[test]
    fn test_write_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("matches.json");
        let records = vec![
            MatchRecord::from(&sample_result()),
            MatchRecord {
                address: "0x0000000000000000000000000000000000000000".into(),
                private_key: PrivateKey::from_bytes([2u8; 32]).to_hex_prefixed(),
                attempts: 1,
                elapsed_ms: 0,
                worker_id: 0,
            },
        ];

        write_json(&path, &records).unwrap();

        let raw = fs::read_to_string(&path).unwrap();
        let parsed: Vec<MatchRecord> = serde_json::from_str(&raw).unwrap();
        assert_eq!(parsed, records);

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = fs::metadata(&path).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o600);
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_write_json_tightens_existing_file() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("matches.json");
        fs::write(&path, b"stale").unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o644)).unwrap();

        write_json(&path, &[MatchRecord::from(&sample_result())]).unwrap();

        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
        let parsed: Vec<MatchRecord> =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(parsed.len(), 1);
    }
}
