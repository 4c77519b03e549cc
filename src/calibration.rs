// Per-servo calibration offsets, persisted as a JSON file
//
// The store is loaded once at startup and is the only owner of offset data.
// Recalibration rewrites the backing file atomically (temp file + rename) so
// a crash mid-save never leaves a half-written store behind.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::SERVO_COUNT;

/// Trim for one servo: an additive offset plus a mounting inversion flag.
///
/// Inversion is applied first (`angle = 180 - angle`), then the offset is
/// added, on every dispatch path.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServoOffset {
    pub offset_degrees: i32,
    #[serde(default)]
    pub inverted: bool,
}

/// On-disk layout: one entry per servo index, 0-11.
#[derive(Debug, Serialize, Deserialize)]
struct CalibrationFile {
    offsets: Vec<ServoOffset>,
}

#[derive(Debug, thiserror::Error)]
pub enum CalibrationError {
    #[error("calibration store {}: {source}", .path.display())]
    Unavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("calibration store {} is malformed: {source}", .path.display())]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("calibration store {} holds {found} servo entries, expected {expected}", .path.display())]
    WrongCount {
        path: PathBuf,
        found: usize,
        expected: usize,
    },

    #[error("servo index {servo} out of range")]
    ServoOutOfRange { servo: usize },
}

/// Calibration offsets for all twelve servos.
///
/// Immutable for the process lifetime except through [`set_offset`] and
/// [`set_inverted`], which persist the change before returning.
///
/// [`set_offset`]: CalibrationStore::set_offset
/// [`set_inverted`]: CalibrationStore::set_inverted
#[derive(Debug, Clone)]
pub struct CalibrationStore {
    offsets: [ServoOffset; SERVO_COUNT],
    path: Option<PathBuf>,
}

impl CalibrationStore {
    /// Zero-offset store with no backing file.
    pub fn identity() -> Self {
        Self {
            offsets: [ServoOffset::default(); SERVO_COUNT],
            path: None,
        }
    }

    /// Load the store at `path`, failing if it is missing or malformed.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, CalibrationError> {
        let path = path.into();
        let raw = fs::read_to_string(&path).map_err(|source| CalibrationError::Unavailable {
            path: path.clone(),
            source,
        })?;
        let file: CalibrationFile =
            serde_json::from_str(&raw).map_err(|source| CalibrationError::Malformed {
                path: path.clone(),
                source,
            })?;
        if file.offsets.len() != SERVO_COUNT {
            return Err(CalibrationError::WrongCount {
                path,
                found: file.offsets.len(),
                expected: SERVO_COUNT,
            });
        }
        let mut offsets = [ServoOffset::default(); SERVO_COUNT];
        offsets.copy_from_slice(&file.offsets);
        debug!(path = %path.display(), "calibration loaded");
        Ok(Self {
            offsets,
            path: Some(path),
        })
    }

    /// Load the store at `path`, degrading to zero offsets with a surfaced
    /// warning when the store is unavailable. The path is kept so a later
    /// recalibration creates the file.
    pub fn load_or_identity(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        match Self::load(path.clone()) {
            Ok(store) => store,
            Err(err) => {
                warn!(%err, "calibration unavailable, using zero offsets");
                Self {
                    offsets: [ServoOffset::default(); SERVO_COUNT],
                    path: Some(path),
                }
            }
        }
    }

    /// Trim for one servo. Out-of-range indices read as identity.
    pub fn offset_for(&self, servo: usize) -> ServoOffset {
        self.offsets.get(servo).copied().unwrap_or_default()
    }

    /// Set one servo's offset and persist the store.
    pub fn set_offset(&mut self, servo: usize, offset_degrees: i32) -> Result<(), CalibrationError> {
        let slot = self
            .offsets
            .get_mut(servo)
            .ok_or(CalibrationError::ServoOutOfRange { servo })?;
        slot.offset_degrees = offset_degrees;
        info!(servo, offset_degrees, "servo offset updated");
        self.persist()
    }

    /// Set one servo's inversion flag and persist the store.
    pub fn set_inverted(&mut self, servo: usize, inverted: bool) -> Result<(), CalibrationError> {
        let slot = self
            .offsets
            .get_mut(servo)
            .ok_or(CalibrationError::ServoOutOfRange { servo })?;
        slot.inverted = inverted;
        info!(servo, inverted, "servo inversion updated");
        self.persist()
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Atomically rewrite the backing file. A store without one (identity)
    /// keeps its changes in memory only.
    fn persist(&self) -> Result<(), CalibrationError> {
        let Some(path) = &self.path else {
            debug!("calibration store has no backing file, change kept in memory");
            return Ok(());
        };
        let file = CalibrationFile {
            offsets: self.offsets.to_vec(),
        };
        let json =
            serde_json::to_string_pretty(&file).map_err(|source| CalibrationError::Malformed {
                path: path.clone(),
                source,
            })?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, json).map_err(|source| CalibrationError::Unavailable {
            path: tmp.clone(),
            source,
        })?;
        fs::rename(&tmp, path).map_err(|source| CalibrationError::Unavailable {
            path: path.clone(),
            source,
        })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("quadcrawler-{}-{}.json", name, std::process::id()))
    }

    #[test]
    fn missing_store_degrades_to_identity() {
        let store = CalibrationStore::load_or_identity(temp_path("missing"));
        for servo in 0..SERVO_COUNT {
            assert_eq!(store.offset_for(servo), ServoOffset::default());
        }
    }

    #[test]
    fn strict_load_fails_on_missing_store() {
        let err = CalibrationStore::load(temp_path("strict-missing")).unwrap_err();
        assert!(matches!(err, CalibrationError::Unavailable { .. }));
    }

    #[test]
    fn recalibration_round_trips_through_the_file() {
        let path = temp_path("round-trip");
        let mut store = CalibrationStore::load_or_identity(&path);
        store.set_offset(3, -7).unwrap();
        store.set_inverted(3, true).unwrap();

        let reloaded = CalibrationStore::load(&path).unwrap();
        assert_eq!(
            reloaded.offset_for(3),
            ServoOffset {
                offset_degrees: -7,
                inverted: true
            }
        );
        assert_eq!(reloaded.offset_for(4), ServoOffset::default());
        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn persist_leaves_no_temp_file_behind() {
        let path = temp_path("atomic");
        let mut store = CalibrationStore::load_or_identity(&path);
        store.set_offset(0, 5).unwrap();
        assert!(path.exists());
        assert!(!path.with_extension("json.tmp").exists());
        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn wrong_entry_count_is_rejected() {
        let path = temp_path("wrong-count");
        fs::write(&path, r#"{"offsets":[{"offset_degrees":1}]}"#).unwrap();
        let err = CalibrationStore::load(&path).unwrap_err();
        assert!(matches!(err, CalibrationError::WrongCount { found: 1, .. }));
        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn out_of_range_servo_is_rejected() {
        let mut store = CalibrationStore::identity();
        let err = store.set_offset(SERVO_COUNT, 1).unwrap_err();
        assert!(matches!(
            err,
            CalibrationError::ServoOutOfRange { servo } if servo == SERVO_COUNT
        ));
    }
}
