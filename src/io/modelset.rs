//! Read/write model set JSON files.
//!
//! The file is a small versioned envelope around a [`ModelSet`]: the layers
//! themselves plus, when the set came out of a fit, its fit quality.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::IoError;
use crate::fit::FitOutcome;
use crate::models::ModelSet;

pub const MODEL_FILE_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitQuality {
    pub n: usize,
    pub sse: f64,
    pub rmse: f64,
    pub iterations: usize,
}

impl From<&FitOutcome> for FitQuality {
    fn from(o: &FitOutcome) -> Self {
        Self {
            n: o.n,
            sse: o.sse,
            rmse: o.rmse,
            iterations: o.iterations,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelFile {
    pub version: u32,
    pub tool: String,
    pub models: ModelSet,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fit_quality: Option<FitQuality>,
}

impl ModelFile {
    pub fn new(models: ModelSet) -> Self {
        Self {
            version: MODEL_FILE_VERSION,
            tool: env!("CARGO_PKG_NAME").to_string(),
            models,
            fit_quality: None,
        }
    }

    pub fn from_fit(outcome: &FitOutcome) -> Self {
        Self {
            fit_quality: Some(outcome.into()),
            ..Self::new(outcome.models.clone())
        }
    }
}

/// Write a model file as pretty JSON.
pub fn write_modelset_json(path: &Path, file: &ModelFile) -> Result<(), IoError> {
    let out = File::create(path).map_err(|source| IoError::Create {
        path: path.to_path_buf(),
        source,
    })?;
    let mut writer = BufWriter::new(out);
    serde_json::to_writer_pretty(&mut writer, file).map_err(|source| IoError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    writer.flush().map_err(|source| IoError::Write {
        path: path.to_path_buf(),
        source,
    })
}

/// Read a model file, rejecting unknown versions. Models are not validated
/// here; the engine and fitter do that before use.
pub fn read_modelset_json(path: &Path) -> Result<ModelFile, IoError> {
    let input = File::open(path).map_err(|source| IoError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    let file: ModelFile = serde_json::from_reader(BufReader::new(input)).map_err(|source| IoError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    if file.version != MODEL_FILE_VERSION {
        return Err(IoError::Version {
            found: file.version,
            expected: MODEL_FILE_VERSION,
        });
    }
    Ok(file)
}
