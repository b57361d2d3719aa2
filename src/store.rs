//! Persisted calibration: six coefficients and the time they were solved.
//!
//! A record that is missing a coefficient or holds a non-finite one is
//! rejected as a whole; the caller keeps running uncalibrated.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::affine::AffineParameters;
use crate::matrix::CalibrationMatrix;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CalibrationRecord {
    pub last_updated: DateTime<Utc>,
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
    pub e: f64,
    pub f: f64,
    /// Fit residual at solve time, informational only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub residual: Option<f64>,
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("calibration file I/O: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed calibration record: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to encode calibration record: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("calibration record holds non-finite coefficients")]
    NonFinite,

    #[error("no valid calibration to save")]
    NotCalibrated,
}

impl CalibrationRecord {
    pub fn from_matrix(matrix: &CalibrationMatrix) -> Result<Self, StoreError> {
        let last_updated = match matrix.last_updated() {
            Some(t) if matrix.is_valid() => t,
            _ => return Err(StoreError::NotCalibrated),
        };
        let p = matrix.params();
        Ok(Self {
            last_updated,
            a: p.a,
            b: p.b,
            c: p.c,
            d: p.d,
            e: p.e,
            f: p.f,
            residual: p.residual.is_finite().then_some(p.residual),
        })
    }

    pub fn into_matrix(self) -> Result<CalibrationMatrix, StoreError> {
        let params = AffineParameters {
            a: self.a,
            b: self.b,
            c: self.c,
            d: self.d,
            e: self.e,
            f: self.f,
            residual: self.residual.unwrap_or(f64::NAN),
        };
        let matrix = CalibrationMatrix::new(params, self.last_updated);
        if !matrix.is_valid() {
            return Err(StoreError::NonFinite);
        }
        Ok(matrix)
    }
}

pub fn parse(content: &str) -> Result<CalibrationMatrix, StoreError> {
    let record: CalibrationRecord = toml::from_str(content)?;
    record.into_matrix()
}

pub fn load(path: &Path) -> Result<CalibrationMatrix, StoreError> {
    let content = std::fs::read_to_string(path)?;
    let matrix = parse(&content)?;
    log::debug!("Loaded calibration from {}", path.display());
    Ok(matrix)
}

/// Write the record next to its destination and rename it into place, so a
/// reader never sees a half-written file.
pub fn save(path: &Path, matrix: &CalibrationMatrix) -> Result<(), StoreError> {
    let record = CalibrationRecord::from_matrix(matrix)?;
    let content = toml::to_string(&record)?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let tmp = temp_path(path);
    std::fs::write(&tmp, content)?;
    if let Err(e) = std::fs::rename(&tmp, path) {
        let _ = std::fs::remove_file(&tmp);
        return Err(e.into());
    }

    log::info!("Saved calibration to {}", path.display());
    Ok(())
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(format!(".{}.tmp", std::process::id()));
    path.with_file_name(name)
}
