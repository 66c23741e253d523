pub mod cache;
pub mod error;
pub mod http;
pub mod jokes;
pub mod news;
pub mod registry;
pub mod spec;
pub mod trait_def;
pub mod weather;

pub use cache::ToolCache;
pub use error::{PermanentKind, ToolError, TransientKind};
pub use registry::{RegistryError, ToolRegistry};
pub use spec::{CheckedParams, ParamSpec, ParamType, ParamViolation, ToolSpec};
pub use trait_def::Tool;
