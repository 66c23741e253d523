use super::error::ToolError;
use super::spec::ToolSpec;
use async_trait::async_trait;
use serde_json::{Map, Value};

/// One external capability the planner can schedule
///
/// `invoke` performs at most one outbound call and returns a normalized JSON
/// payload. Implementations validate their own parameters and credentials.
#[async_trait]
pub trait Tool: Send + Sync {
    fn spec(&self) -> &ToolSpec;

    async fn invoke(&self, params: &Map<String, Value>) -> Result<Value, ToolError>;

    fn name(&self) -> &str {
        &self.spec().name
    }
}
