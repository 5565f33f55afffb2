use serde::Deserialize;

use astro_core::{CometSubmission, ObservationInput};

// -------------------------
// Request DTOs
// -------------------------

/// Body of `POST /api/cometCalculation`.
#[derive(Debug, Deserialize)]
pub struct CreateCometCalculationRequest {
    pub observations: Vec<ObservationInput>,
    #[serde(default)]
    pub name: Option<String>,
}

impl From<CreateCometCalculationRequest> for CometSubmission {
    fn from(body: CreateCometCalculationRequest) -> Self {
        CometSubmission {
            observations: body.observations,
            name: body.name,
        }
    }
}
