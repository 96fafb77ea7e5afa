//! Error types for `labguard-core`.

use thiserror::Error;

use crate::sample::SampleStatus;

#[derive(Debug, Error)]
pub enum Error {
  #[error("missing {0}")]
  MissingField(&'static str),

  #[error("unknown sample status: {0:?}")]
  UnknownStatus(String),

  #[error("unknown sample type: {0:?}")]
  UnknownSampleType(String),

  #[error("unknown certification status: {0:?}")]
  UnknownCertification(String),

  #[error("cannot {action} a sample in status {status}")]
  IllegalTransition {
    action: &'static str,
    status: SampleStatus,
  },

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
