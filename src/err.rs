//! Error types for per-record failures.

/// Errors raised while turning one input record into a variant or region.
///
/// All of them are recoverable at record granularity: the caller logs the error,
/// skips the record, and continues with the rest of the batch.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum RecordError {
    #[error("unknown contig: {0:?}")]
    UnknownContig(String),
    #[error("unsupported record {id:?}: {reason}")]
    UnsupportedRecord { id: String, reason: String },
    #[error("malformed attribute {key}={value:?}")]
    MalformedAttribute { key: String, value: String },
    #[error("malformed breakend ALT allele: {0:?}")]
    MalformedAltAllele(String),
    #[error("cannot decide strand for REF={reference:?} ALT={alt:?}")]
    StrandAmbiguous { reference: String, alt: String },
    #[error("bracket mismatch in ALT allele: {0:?}")]
    BracketMismatch(String),
    #[error("invalid coordinates: start={start}, end={end}")]
    InvalidCoordinates { start: i32, end: i32 },
}
