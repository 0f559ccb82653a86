//! Canonical JSON artifacts with BLAKE3 digests
//!
//! Artifacts are written with deterministically sorted object keys and
//! stable formatting so the same fitted state always produces the same
//! bytes. A hex digest is written next to each artifact (`<file>.hash`)
//! and checked on load when present.

use crate::errors::{ChurnError, Result};
use serde::{de::DeserializeOwned, ser::Error as SerdeSerError, Serialize};
use serde_json::{map::Map, ser::PrettyFormatter, Serializer, Value};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Recursively sort JSON object keys to obtain a canonical representation.
fn canonicalize(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map.into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));

            let mut sorted = Map::with_capacity(entries.len());
            for (key, val) in entries {
                sorted.insert(key, canonicalize(val));
            }

            Value::Object(sorted)
        }
        Value::Array(elements) => Value::Array(elements.into_iter().map(canonicalize).collect()),
        other => other,
    }
}

/// Serialize a value into canonical JSON
pub fn canonical_json_string<T>(value: &T) -> std::result::Result<String, serde_json::Error>
where
    T: Serialize,
{
    let canonical_value = canonicalize(serde_json::to_value(value)?);
    let mut buffer = Vec::new();
    let formatter = PrettyFormatter::with_indent(b"  ");
    let mut serializer = Serializer::with_formatter(&mut buffer, formatter);
    canonical_value.serialize(&mut serializer)?;
    String::from_utf8(buffer).map_err(|err| SerdeSerError::custom(err.to_string()))
}

/// Hex BLAKE3 digest of arbitrary bytes
pub fn digest_hex(bytes: &[u8]) -> String {
    hex::encode(blake3::hash(bytes).as_bytes())
}

/// Hex BLAKE3 digest of a file's contents
pub fn file_digest<P: AsRef<Path>>(path: P) -> Result<String> {
    Ok(digest_hex(&std::fs::read(path)?))
}

/// Path of the digest written beside `path`
pub fn hash_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".hash");
    PathBuf::from(name)
}

/// Write `value` as canonical JSON plus its digest; returns the digest
pub fn save_artifact<T, P>(value: &T, path: P) -> Result<String>
where
    T: Serialize,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let json = canonical_json_string(value)?;
    let digest = digest_hex(json.as_bytes());

    // a sidecar exists only beside a complete artifact
    let sidecar = hash_path(path);
    match std::fs::remove_file(&sidecar) {
        Ok(()) => debug!("Removed previous digest {}", sidecar.display()),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
        Err(err) => return Err(err.into()),
    }

    // write-then-rename so readers never see a half-written artifact
    let mut staging = path.as_os_str().to_owned();
    staging.push(".tmp");
    let staging = PathBuf::from(staging);
    std::fs::write(&staging, &json)?;
    std::fs::rename(&staging, path)?;
    std::fs::write(&sidecar, &digest)?;

    info!("Saved artifact {} ({} bytes, blake3 {})", path.display(), json.len(), digest);
    Ok(digest)
}

/// Read an artifact, verifying its digest when a `.hash` file exists
pub fn load_artifact<T, P>(path: P) -> Result<T>
where
    T: DeserializeOwned,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let bytes = std::fs::read(path)?;

    let sidecar = hash_path(path);
    if sidecar.exists() {
        let expected = std::fs::read_to_string(&sidecar)?;
        let actual = digest_hex(&bytes);
        if expected.trim() != actual {
            return Err(ChurnError::ArtifactIntegrity(format!(
                "{}: expected {}, found {}",
                path.display(),
                expected.trim(),
                actual
            )));
        }
        debug!("Verified digest of {}", path.display());
    }

    Ok(serde_json::from_slice(&bytes)?)
}
