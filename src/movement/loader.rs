//! Loader for the movement tuning RON file.

use std::fs;
use std::io;
use std::path::Path;

use bevy::prelude::*;
use ron::Options;
use thiserror::Error;

use crate::movement::{MovementTuning, TuningError};

/// Default location of the tuning file, relative to the working directory.
pub const TUNING_PATH: &str = "assets/movement.ron";

#[derive(Debug, Error)]
pub enum TuningLoadError {
    #[error("failed to read {file}: {source}")]
    Io {
        file: String,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse {file}: {source}")]
    Parse {
        file: String,
        #[source]
        source: ron::error::SpannedError,
    },
    #[error("invalid tuning in {file}: {source}")]
    Invalid {
        file: String,
        #[source]
        source: TuningError,
    },
}

/// Create RON options with extensions enabled for more flexible parsing.
fn ron_options() -> Options {
    Options::default().with_default_extension(ron::extensions::Extensions::IMPLICIT_SOME)
}

/// Parse and validate tuning from RON text. `file` only labels errors.
pub fn parse_tuning(contents: &str, file: &str) -> Result<MovementTuning, TuningLoadError> {
    let tuning: MovementTuning = ron_options()
        .from_str(contents)
        .map_err(|source| TuningLoadError::Parse {
            file: file.to_string(),
            source,
        })?;

    tuning.validate().map_err(|source| TuningLoadError::Invalid {
        file: file.to_string(),
        source,
    })?;
    Ok(tuning)
}

/// Load tuning from `path`. A missing file is not an error and yields `None`.
pub fn load_tuning(path: &Path) -> Result<Option<MovementTuning>, TuningLoadError> {
    let file = path.display().to_string();
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(source) => return Err(TuningLoadError::Io { file, source }),
    };

    let tuning = parse_tuning(&contents, &file)?;
    info!(
        "Loaded movement tuning from {}: jump height {:.2}, apex at frame {}",
        file,
        tuning.jump_arc().apex_height(),
        tuning.jump_arc().apex_time_frames()
    );
    Ok(Some(tuning))
}

/// Serialize tuning back to pretty RON, e.g. to seed a new tuning file.
pub fn tuning_to_ron(tuning: &MovementTuning) -> Result<String, ron::Error> {
    ron::ser::to_string_pretty(tuning, ron::ser::PrettyConfig::default())
}
