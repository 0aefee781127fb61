//! Analysis model catalog
//!
//! Callers request an analysis tier by ID. Each tier is served by a backend
//! chat model; unknown IDs fall back to the default backend model.

use serde::Serialize;

/// An analysis tier offered to callers
#[derive(Debug, Clone, Copy, Serialize)]
pub struct AnalysisModel {
    /// Tier ID as requested by callers
    pub id: &'static str,
    /// Backend chat model serving this tier
    pub backend_model: &'static str,
}

/// Backend model for IDs outside the catalog
pub const DEFAULT_BACKEND_MODEL: &str = "gpt-3.5-turbo";

/// Tier used when the caller does not pick one
pub const DEFAULT_ANALYSIS_MODEL: &str = "gpt-4.1-nano-2025-04-14";

pub const ANALYSIS_MODELS: &[AnalysisModel] = &[
    AnalysisModel {
        id: "gpt-4.1-nano-2025-04-14",
        backend_model: "gpt-4",
    },
    AnalysisModel {
        id: "o4-mini-2025-04-16",
        backend_model: "gpt-4",
    },
    AnalysisModel {
        id: "o3-2025-04-16",
        backend_model: "gpt-4",
    },
    AnalysisModel {
        id: "o3-pro-2025-06-10",
        backend_model: "gpt-4",
    },
    AnalysisModel {
        id: "o3-deep-research-2025-06-26",
        backend_model: "gpt-4",
    },
    AnalysisModel {
        id: "o4-mini-deep-research-2025-06-26",
        backend_model: "gpt-4",
    },
];

/// Look up a tier by ID
pub fn find_model(id: &str) -> Option<&'static AnalysisModel> {
    ANALYSIS_MODELS.iter().find(|m| m.id == id)
}

/// Backend model serving a tier ID
pub fn resolve_backend_model(id: &str) -> &'static str {
    find_model(id)
        .map(|m| m.backend_model)
        .unwrap_or(DEFAULT_BACKEND_MODEL)
}
