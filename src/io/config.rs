//! Run configuration.
//!
//! Every section and field is optional in the file; missing values take the
//! library defaults.
//!
//! ```json
//! { "engine": { "parallel": false }, "period": "mean", "fit": { "max_iter": 200 } }
//! ```

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::engine::{EngineOptions, PeriodPolicy};
use crate::error::IoError;
use crate::fit::FitOptions;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub engine: EngineOptions,
    pub period: PeriodPolicy,
    pub fit: FitOptions,
}

pub fn read_config(path: &Path) -> Result<RunConfig, IoError> {
    let input = File::open(path).map_err(|source| IoError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_reader(BufReader::new(input)).map_err(|source| IoError::Json {
        path: path.to_path_buf(),
        source,
    })
}
