use thiserror::Error;

use crate::constants::{Auid, BatchId};

#[derive(Error, Debug)]
pub enum DiffPhotError {
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Degenerate transform fit: {0}")]
    DegenerateFit(String),

    #[error("Star {auid} not found in batch {batch_id}")]
    MissingStar { auid: Auid, batch_id: BatchId },

    #[error("No settings for band pair: {0}")]
    MissingBandPair(String),

    #[error("Invalid transform method: {0}")]
    InvalidTransformMethod(String),

    #[error("Cannot combine sessions: {0}")]
    MismatchedSequences(String),

    #[error("Unable to perform file operation: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Settings parsing error: {0}")]
    SettingsParseError(#[from] serde_json::Error),

    #[error("Gaussian noise generation failed: {0:?}")]
    NoiseInjectionError(rand_distr::NormalError),
}

impl From<rand_distr::NormalError> for DiffPhotError {
    fn from(err: rand_distr::NormalError) -> Self {
        DiffPhotError::NoiseInjectionError(err)
    }
}

impl PartialEq for DiffPhotError {
    fn eq(&self, other: &Self) -> bool {
        use DiffPhotError::*;
        match (self, other) {
            (InvalidParameter(a), InvalidParameter(b)) => a == b,
            (DegenerateFit(a), DegenerateFit(b)) => a == b,
            (
                MissingStar {
                    auid: a,
                    batch_id: i,
                },
                MissingStar {
                    auid: b,
                    batch_id: j,
                },
            ) => a == b && i == j,
            (MissingBandPair(a), MissingBandPair(b)) => a == b,
            (InvalidTransformMethod(a), InvalidTransformMethod(b)) => a == b,
            (MismatchedSequences(a), MismatchedSequences(b)) => a == b,

            // Not comparable beyond the variant itself
            (IoError(_), IoError(_)) => true,
            (SettingsParseError(_), SettingsParseError(_)) => true,

            (NoiseInjectionError(a), NoiseInjectionError(b)) => a == b,

            _ => false,
        }
    }
}
