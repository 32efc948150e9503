use serde::{Deserialize, Serialize};

/// The diagnostic dump from `GET /debug/{userId}`. Only ever displayed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DebugReport(pub sonic_rs::Value);

impl DebugReport {
    pub fn to_pretty_string(&self) -> String {
        sonic_rs::to_string_pretty(&self.0).unwrap_or_else(|_| "{}".to_string())
    }
}
