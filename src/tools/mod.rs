//! MCP tool adapters exposing one upstream service over stdio.

pub mod args;
pub mod opencti;
pub mod protocol;
pub mod registry;
pub mod thehive;
pub mod wazuh;

use std::sync::Arc;

use crate::config::ServiceKind;
use crate::services::ServiceClient;

pub use args::Args;
pub use protocol::ToolServer;
pub use registry::{ToolRegistry, ToolSpec};

/// Tool set for `kind`, or `None` when the service has no tool adapter.
pub fn registry_for(kind: ServiceKind, client: Arc<ServiceClient>, max_chars: usize) -> Option<ToolRegistry> {
    let register: fn(&mut ToolRegistry) = match kind {
        ServiceKind::Wazuh => wazuh::register,
        ServiceKind::TheHive => thehive::register,
        ServiceKind::OpenCti => opencti::register,
        ServiceKind::Grafana | ServiceKind::Cortex => return None,
    };
    let mut registry = ToolRegistry::new(client, max_chars);
    register(&mut registry);
    Some(registry)
}
