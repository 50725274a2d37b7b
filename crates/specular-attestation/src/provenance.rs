//! SLSA provenance predicate content.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Builder {
    pub id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunDetails {
    pub builder: Builder,
    #[serde(rename = "metadata")]
    pub build_metadata: BuildMetadata,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildMetadata {
    #[serde(rename = "invocationId")]
    pub invocation_id: String,
    #[serde(rename = "startedOn")]
    pub started_on: DateTime<Utc>,
    #[serde(rename = "finishedOn")]
    pub finished_on: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildDefinition {
    #[serde(rename = "buildType")]
    pub build_type: String,
    #[serde(rename = "externalParameters")]
    pub external_parameters: serde_json::Value,
}

/// A minimal SLSA v1 provenance predicate: which build produced the bundle, when.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlsaProvenance {
    #[serde(rename = "buildDefinition")]
    pub build_definition: BuildDefinition,
    #[serde(rename = "runDetails")]
    pub run_details: RunDetails,
}

impl SlsaProvenance {
    pub fn new(builder_id: &str, invocation_id: &str, bundle_id: &str, bundle_version: &str) -> Self {
        let now = Utc::now();
        Self {
            build_definition: BuildDefinition {
                build_type: "https://specular.dev/build/v1".to_string(),
                external_parameters: serde_json::json!({ "id": bundle_id, "version": bundle_version }),
            },
            run_details: RunDetails {
                builder: Builder {
                    id: builder_id.to_string(),
                },
                build_metadata: BuildMetadata {
                    invocation_id: invocation_id.to_string(),
                    started_on: now,
                    finished_on: now,
                },
            },
        }
    }
}
