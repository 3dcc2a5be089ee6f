use crate::agent::QTable;
use crate::error::PersistError;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Bumped whenever the on-disk layout of a saved table changes.
pub const FORMAT_VERSION: u32 = 1;

fn io_err(path: &Path) -> impl FnOnce(std::io::Error) -> PersistError + '_ {
    move |source| PersistError::Io { path: path.to_path_buf(), source }
}

/// Write through a sibling temp file so an interrupted save never leaves a torn table.
fn write_replacing(path: &Path, bytes: &[u8]) -> Result<(), PersistError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(io_err(parent))?;
    }
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    std::fs::write(&tmp, bytes).map_err(io_err(&tmp))?;
    std::fs::rename(&tmp, path).map_err(io_err(path))
}

/// File layout: bincode `u32` format version, then the bincode-encoded table.
pub fn save_table(table: &QTable, path: &Path) -> Result<(), PersistError> {
    let cfg = bincode::config::standard();
    let mut bytes = bincode::serde::encode_to_vec(FORMAT_VERSION, cfg)?;
    bytes.extend(bincode::serde::encode_to_vec(table, cfg)?);
    write_replacing(path, &bytes)?;
    tracing::debug!(path = %path.display(), states = table.len(), bytes = bytes.len(), "saved q-table");
    Ok(())
}

/// Missing, truncated, trailing-garbage or wrong-version files are all errors.
pub fn load_table(path: &Path) -> Result<QTable, PersistError> {
    let bytes = std::fs::read(path).map_err(io_err(path))?;
    let cfg = bincode::config::standard();
    let decode_err = |source| PersistError::Decode { path: path.to_path_buf(), source };

    let (version, header): (u32, usize) = bincode::serde::decode_from_slice(&bytes, cfg).map_err(decode_err)?;
    if version != FORMAT_VERSION {
        return Err(PersistError::UnsupportedVersion {
            path: path.to_path_buf(),
            found: version,
            expected: FORMAT_VERSION,
        });
    }

    let body = &bytes[header..];
    let (table, used): (QTable, usize) = bincode::serde::decode_from_slice(body, cfg).map_err(decode_err)?;
    if used != body.len() {
        return Err(decode_err(bincode::error::DecodeError::OtherString(format!(
            "{} trailing bytes after table",
            body.len() - used
        ))));
    }
    Ok(table)
}

#[derive(Serialize)]
struct ScoreHistory<'a> {
    episodes: usize,
    max_score: u32,
    scores: &'a [u32],
}

/// Per-episode scores as JSON, for plotting elsewhere.
pub fn save_scores(scores: &[u32], path: &Path) -> Result<(), PersistError> {
    let history = ScoreHistory {
        episodes: scores.len(),
        max_score: scores.iter().copied().max().unwrap_or(0),
        scores,
    };
    let json = serde_json::to_vec_pretty(&history)?;
    write_replacing(path, &json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::Action;
    use crate::state::State;

    fn sample_table() -> QTable {
        let mut t = QTable::new();
        for n in 0..40u16 {
            let s = State::from_features(std::array::from_fn(|i| (n >> (i % 6)) & 1 == 1 || i == 7 + (n as usize % 4)));
            t.set(s, Action::TurnLeft, f32::from_bits(0x3dcc_cccd ^ n as u32));
            t.set(s, Action::Straight, -100.0 / (n as f32 + 3.0));
        }
        t
    }

    #[test]
    fn round_trip_is_bit_exact() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/q_table.bin");
        let table = sample_table();
        save_table(&table, &path).unwrap();
        let loaded = load_table(&path).unwrap();

        assert_eq!(loaded.len(), table.len());
        for (s, qs) in table.iter() {
            assert!(loaded.contains(*s));
            let back = loaded.get(*s);
            for i in 0..3 {
                assert_eq!(back[i].to_bits(), qs[i].to_bits());
            }
        }
    }

    #[test]
    fn missing_file_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_table(&dir.path().join("absent.bin")).unwrap_err();
        assert!(matches!(err, PersistError::Io { .. }));
    }

    #[test]
    fn truncated_file_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("q.bin");
        save_table(&sample_table(), &path).unwrap();
        let bytes = std::fs::read(&path).unwrap();
        std::fs::write(&path, &bytes[..bytes.len() / 2]).unwrap();
        assert!(matches!(load_table(&path), Err(PersistError::Decode { .. })));
    }

    #[test]
    fn trailing_garbage_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("q.bin");
        save_table(&sample_table(), &path).unwrap();
        let mut bytes = std::fs::read(&path).unwrap();
        bytes.extend([0xde, 0xad]);
        std::fs::write(&path, &bytes).unwrap();
        assert!(matches!(load_table(&path), Err(PersistError::Decode { .. })));
    }

    #[test]
    fn foreign_version_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("q.bin");
        let cfg = bincode::config::standard();
        let mut bytes = bincode::serde::encode_to_vec(99u32, cfg).unwrap();
        bytes.extend(bincode::serde::encode_to_vec(&QTable::new(), cfg).unwrap());
        std::fs::write(&path, bytes).unwrap();
        assert!(matches!(
            load_table(&path),
            Err(PersistError::UnsupportedVersion { found: 99, .. })
        ));
    }

    #[test]
    fn scores_written_as_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scores.json");
        save_scores(&[0, 3, 1], &path).unwrap();
        let v: serde_json::Value = serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        assert_eq!(v["max_score"], 3);
        assert_eq!(v["scores"].as_array().map(|a| a.len()), Some(3));
    }
}
