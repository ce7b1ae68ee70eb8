use serde::Serialize;

use crate::model::{AnalysisReport, GraphData};

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub engine: String,
    pub patterns: Vec<&'static str>,
}

/// Analyze response: the full report with the visualization graph attached.
#[derive(Debug, Serialize)]
pub struct AnalyzeResponse {
    #[serde(flatten)]
    pub report: AnalysisReport,
    pub graph_data: GraphData,
}
