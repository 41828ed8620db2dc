//! Wazuh SIEM tools. Every call is a read and takes the retrying path.

use std::sync::Arc;

use futures_util::future::BoxFuture;
use serde_json::{json, Value};

use crate::error::IntegrationResult;
use crate::services::ServiceClient;
use crate::tools::args::{Args, MAX_TEXT_LEN};
use crate::tools::registry::{id_schema, limit_schema, object_schema, text_schema, ToolRegistry, ToolSpec};

const AGENT_STATUSES: [&str; 4] = ["active", "disconnected", "pending", "never_connected"];
const SEVERITIES: [&str; 4] = ["Critical", "High", "Medium", "Low"];

pub fn register(registry: &mut ToolRegistry) {
    registry.register(
        ToolSpec {
            name: "list-alerts",
            description: "List recent Wazuh SIEM alerts with optional filtering",
            input_schema: object_schema(
                json!({
                    "limit": limit_schema(20),
                    "level_min": { "type": "integer", "minimum": 1, "maximum": 15 },
                    "agent_id": id_schema("Filter by agent ID"),
                    "rule_id": id_schema("Filter by rule ID"),
                }),
                &[],
            ),
        },
        list_alerts,
    );
    registry.register(
        ToolSpec {
            name: "get-alert",
            description: "Get full details of a specific Wazuh alert",
            input_schema: object_schema(json!({ "alert_id": id_schema("Alert ID to retrieve") }), &["alert_id"]),
        },
        get_alert,
    );
    registry.register(
        ToolSpec {
            name: "search-agents",
            description: "Search registered Wazuh agents by name, IP, status, or OS",
            input_schema: object_schema(
                json!({
                    "name": text_schema("Agent name filter"),
                    "ip": { "type": "string", "maxLength": 45 },
                    "status": { "type": "string", "enum": AGENT_STATUSES },
                    "limit": limit_schema(20),
                }),
                &[],
            ),
        },
        search_agents,
    );
    registry.register(
        ToolSpec {
            name: "get-agent-info",
            description: "Get detailed info about a specific Wazuh agent",
            input_schema: object_schema(json!({ "agent_id": id_schema("Agent ID") }), &["agent_id"]),
        },
        get_agent_info,
    );
    registry.register(
        ToolSpec {
            name: "get-vulnerabilities",
            description: "List vulnerabilities detected on an agent",
            input_schema: object_schema(
                json!({
                    "agent_id": id_schema("Agent ID"),
                    "severity": { "type": "string", "enum": SEVERITIES },
                    "limit": limit_schema(20),
                }),
                &["agent_id"],
            ),
        },
        get_vulnerabilities,
    );
    registry.register(
        ToolSpec {
            name: "get-rules",
            description: "Search active Wazuh detection rules",
            input_schema: object_schema(
                json!({
                    "search": text_schema("Search text in rule descriptions"),
                    "level": { "type": "integer", "minimum": 1, "maximum": 15 },
                    "group": text_schema("Filter by rule group"),
                    "limit": limit_schema(20),
                }),
                &[],
            ),
        },
        get_rules,
    );
    registry.register(
        ToolSpec {
            name: "get-decoders",
            description: "Search active Wazuh log decoders",
            input_schema: object_schema(
                json!({
                    "search": text_schema("Search text in decoder names"),
                    "limit": limit_schema(20),
                }),
                &[],
            ),
        },
        get_decoders,
    );
}

fn limit(args: &Args) -> IntegrationResult<String> {
    Ok(args.int_or("limit", 1, 100, 20)?.to_string())
}

fn list_alerts(client: Arc<ServiceClient>, args: Args) -> BoxFuture<'static, IntegrationResult<Value>> {
    Box::pin(async move {
        let query = [
            ("limit", limit(&args)?),
            ("sort", "-timestamp".to_string()),
            (
                "search",
                args.opt_int("level_min", 1, 15)?
                    .map(|level| format!("rule.level>={level}"))
                    .unwrap_or_default(),
            ),
            ("agent.id", args.opt_safe_id("agent_id")?.unwrap_or_default()),
            ("rule.id", args.opt_safe_id("rule_id")?.unwrap_or_default()),
        ];
        client.get_json("/alerts", &query).await
    })
}

fn get_alert(client: Arc<ServiceClient>, args: Args) -> BoxFuture<'static, IntegrationResult<Value>> {
    Box::pin(async move {
        let id = args.safe_id("alert_id")?;
        client.get_json(&format!("/alerts/{id}"), &[]).await
    })
}

fn search_agents(client: Arc<ServiceClient>, args: Args) -> BoxFuture<'static, IntegrationResult<Value>> {
    Box::pin(async move {
        let query = [
            ("limit", limit(&args)?),
            ("name", args.opt_string("name", MAX_TEXT_LEN)?.unwrap_or_default()),
            ("ip", args.opt_string("ip", 45)?.unwrap_or_default()),
            ("status", args.opt_enum("status", &AGENT_STATUSES)?.unwrap_or_default()),
        ];
        client.get_json("/agents", &query).await
    })
}

fn get_agent_info(client: Arc<ServiceClient>, args: Args) -> BoxFuture<'static, IntegrationResult<Value>> {
    Box::pin(async move {
        let id = args.safe_id("agent_id")?;
        client.get_json(&format!("/agents/{id}"), &[]).await
    })
}

fn get_vulnerabilities(client: Arc<ServiceClient>, args: Args) -> BoxFuture<'static, IntegrationResult<Value>> {
    Box::pin(async move {
        let id = args.safe_id("agent_id")?;
        let query = [
            ("limit", limit(&args)?),
            ("severity", args.opt_enum("severity", &SEVERITIES)?.unwrap_or_default()),
        ];
        client.get_json(&format!("/vulnerability/{id}"), &query).await
    })
}

fn get_rules(client: Arc<ServiceClient>, args: Args) -> BoxFuture<'static, IntegrationResult<Value>> {
    Box::pin(async move {
        let query = [
            ("limit", limit(&args)?),
            ("search", args.opt_string("search", MAX_TEXT_LEN)?.unwrap_or_default()),
            (
                "level",
                args.opt_int("level", 1, 15)?
                    .map(|l| l.to_string())
                    .unwrap_or_default(),
            ),
            ("group", args.opt_string("group", MAX_TEXT_LEN)?.unwrap_or_default()),
        ];
        client.get_json("/rules", &query).await
    })
}

fn get_decoders(client: Arc<ServiceClient>, args: Args) -> BoxFuture<'static, IntegrationResult<Value>> {
    Box::pin(async move {
        let query = [
            ("limit", limit(&args)?),
            ("search", args.opt_string("search", MAX_TEXT_LEN)?.unwrap_or_default()),
        ];
        client.get_json("/decoders", &query).await
    })
}
