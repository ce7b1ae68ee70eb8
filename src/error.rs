/// Errors the analysis engine can surface to its caller.
///
/// A truncated cycle search is deliberately not represented here: hitting
/// the cycle budget degrades coverage and is reported as a summary flag,
/// never as a failure. A run that flags zero accounts is likewise a valid
/// empty result.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("no transactions to analyze")]
    EmptyGraph,
}

/// Errors from CSV intake, surfaced to the upload endpoint as 400s.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("missing mandatory columns: {0}")]
    MissingColumns(String),
    #[error("invalid CSV: {0}")]
    Csv(#[from] csv::Error),
}
