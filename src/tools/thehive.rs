//! TheHive incident response tools.
//!
//! `create-case`, `add-observable`, `run-analyzer` and `merge-alerts` change
//! upstream state and go through a single bounded attempt. Queries retry.

use std::sync::Arc;

use futures_util::future::BoxFuture;
use serde_json::{json, Value};

use crate::error::{IntegrationError, IntegrationResult};
use crate::services::{CallMode, ServiceClient};
use crate::tools::args::{Args, MAX_TEXT_LEN};
use crate::tools::registry::{id_schema, object_schema, text_schema, ToolRegistry, ToolSpec};

const CASE_STATUSES: [&str; 3] = ["Open", "Resolved", "Deleted"];
const DATA_TYPES: [&str; 7] = ["ip", "domain", "url", "hash", "filename", "mail", "other"];
const MAX_DESCRIPTION_LEN: usize = 10_000;
const MAX_PAGE: i64 = 100;

/// TLP:AMBER / PAP:AMBER.
const AMBER: u8 = 2;

fn severity_schema() -> Value {
    json!({ "type": "integer", "minimum": 1, "maximum": 4, "description": "1=Low, 2=Medium, 3=High, 4=Critical" })
}

fn page_schema() -> Value {
    json!({ "type": "integer", "minimum": 1, "maximum": MAX_PAGE, "default": 20 })
}

pub fn register(registry: &mut ToolRegistry) {
    registry.register(
        ToolSpec {
            name: "list-cases",
            description: "List TheHive incident response cases",
            input_schema: object_schema(
                json!({
                    "status": { "type": "string", "enum": CASE_STATUSES, "default": "Open" },
                    "severity": severity_schema(),
                    "limit": page_schema(),
                }),
                &[],
            ),
        },
        list_cases,
    );
    registry.register(
        ToolSpec {
            name: "create-case",
            description: "Create a new TheHive incident case",
            input_schema: object_schema(
                json!({
                    "title": text_schema("Case title"),
                    "description": { "type": "string", "maxLength": MAX_DESCRIPTION_LEN },
                    "severity": severity_schema(),
                    "tags": { "type": "array", "items": { "type": "string" } },
                }),
                &["title", "description"],
            ),
        },
        create_case,
    );
    registry.register(
        ToolSpec {
            name: "get-case",
            description: "Get TheHive case details including observables",
            input_schema: object_schema(json!({ "case_id": id_schema("Case ID (e.g. '~123')") }), &["case_id"]),
        },
        get_case,
    );
    registry.register(
        ToolSpec {
            name: "add-observable",
            description: "Add an observable (IOC) to a TheHive case",
            input_schema: object_schema(
                json!({
                    "case_id": id_schema("Case ID"),
                    "data_type": { "type": "string", "enum": DATA_TYPES },
                    "data": text_schema("Observable value (IP address, domain name, ...)"),
                    "tags": { "type": "array", "items": { "type": "string" } },
                    "message": text_schema("Context about this observable"),
                }),
                &["case_id", "data_type", "data"],
            ),
        },
        add_observable,
    );
    registry.register(
        ToolSpec {
            name: "run-analyzer",
            description: "Run a Cortex analyzer on a TheHive observable",
            input_schema: object_schema(
                json!({
                    "observable_id": id_schema("Observable ID"),
                    "analyzer_id": id_schema("Cortex analyzer ID (e.g. 'VirusTotal_GetReport_3_1')"),
                }),
                &["observable_id", "analyzer_id"],
            ),
        },
        run_analyzer,
    );
    registry.register(
        ToolSpec {
            name: "get-analyzer-report",
            description: "Get the results of a Cortex analyzer job",
            input_schema: object_schema(json!({ "job_id": id_schema("Cortex job ID") }), &["job_id"]),
        },
        get_analyzer_report,
    );
    registry.register(
        ToolSpec {
            name: "search-alerts",
            description: "Search TheHive alerts (e.g. from the Wazuh integration)",
            input_schema: object_schema(
                json!({
                    "source": text_schema("Alert source filter (e.g. 'Wazuh')"),
                    "severity": severity_schema(),
                    "limit": page_schema(),
                }),
                &[],
            ),
        },
        search_alerts,
    );
    registry.register(
        ToolSpec {
            name: "merge-alerts",
            description: "Merge related TheHive alerts into a single case",
            input_schema: object_schema(
                json!({
                    "alert_ids": { "type": "array", "items": id_schema("Alert ID") },
                    "case_id": id_schema("Existing case ID to merge into (creates new if omitted)"),
                }),
                &["alert_ids"],
            ),
        },
        merge_alerts,
    );
}

/// Build a `/api/v1/query` body: filters, newest first, first `limit` items.
pub fn filtered_query(entity: &str, filters: &[(&str, Value)], limit: i64) -> Value {
    let mut query = vec![json!({ "_name": entity })];
    query.extend(
        filters
            .iter()
            .map(|(field, value)| json!({ "_name": "filter", "_field": field, "_value": value })),
    );
    query.push(json!({ "_name": "sort", "_fields": [{ "_field": "createdAt", "_order": "desc" }] }));
    query.push(json!({ "_name": "page", "from": 0, "to": limit }));
    json!({ "query": query })
}

fn list_cases(client: Arc<ServiceClient>, args: Args) -> BoxFuture<'static, IntegrationResult<Value>> {
    Box::pin(async move {
        let status = args.enum_or("status", &CASE_STATUSES, "Open")?;
        let mut filters = vec![("status", json!(status))];
        if let Some(severity) = args.opt_int("severity", 1, 4)? {
            filters.push(("severity", json!(severity)));
        }
        let limit = args.int_or("limit", 1, MAX_PAGE, 20)?;
        let body = filtered_query("listCase", &filters, limit);
        client.post_json("/api/v1/query", body, CallMode::Retrying).await
    })
}

fn create_case(client: Arc<ServiceClient>, args: Args) -> BoxFuture<'static, IntegrationResult<Value>> {
    Box::pin(async move {
        let body = json!({
            "title": args.string("title", MAX_TEXT_LEN)?,
            "description": args.string("description", MAX_DESCRIPTION_LEN)?,
            "severity": args.int_or("severity", 1, 4, 2)?,
            "tags": args.strings("tags", MAX_TEXT_LEN)?,
            "flag": false,
            "tlp": AMBER,
            "pap": AMBER,
        });
        client.post_json("/api/v1/case", body, CallMode::Bounded).await
    })
}

fn get_case(client: Arc<ServiceClient>, args: Args) -> BoxFuture<'static, IntegrationResult<Value>> {
    Box::pin(async move {
        let case_id = args.safe_id("case_id")?;
        let case: Value = client.get_json(&format!("/api/v1/case/{case_id}"), &[]).await?;
        let observables: Value = client
            .post_json(
                "/api/v1/query",
                json!({ "query": [
                    { "_name": "getCase", "idOrName": case_id },
                    { "_name": "observables" },
                    { "_name": "sort", "_fields": [{ "_field": "createdAt", "_order": "desc" }] }
                ]}),
                CallMode::Retrying,
            )
            .await?;
        Ok(json!({ "case": case, "observables": observables }))
    })
}

fn add_observable(client: Arc<ServiceClient>, args: Args) -> BoxFuture<'static, IntegrationResult<Value>> {
    Box::pin(async move {
        let case_id = args.safe_id("case_id")?;
        let data_type = args
            .opt_enum("data_type", &DATA_TYPES)?
            .ok_or_else(|| IntegrationError::InvalidArgument("data_type: is required".into()))?;
        let body = json!({
            "dataType": data_type,
            "data": args.string("data", MAX_TEXT_LEN)?,
            "tags": args.strings("tags", MAX_TEXT_LEN)?,
            "message": args.opt_string("message", MAX_TEXT_LEN)?.unwrap_or_default(),
            "tlp": AMBER,
            "pap": AMBER,
            "ioc": true,
        });
        client
            .post_json(&format!("/api/v1/case/{case_id}/observable"), body, CallMode::Bounded)
            .await
    })
}

fn run_analyzer(client: Arc<ServiceClient>, args: Args) -> BoxFuture<'static, IntegrationResult<Value>> {
    Box::pin(async move {
        let body = json!({
            "observableId": args.safe_id("observable_id")?,
            "analyzerId": args.safe_id("analyzer_id")?,
        });
        client
            .post_json("/api/v1/connector/cortex/job", body, CallMode::Bounded)
            .await
    })
}

fn get_analyzer_report(client: Arc<ServiceClient>, args: Args) -> BoxFuture<'static, IntegrationResult<Value>> {
    Box::pin(async move {
        let job_id = args.safe_id("job_id")?;
        client
            .get_json(&format!("/api/v1/connector/cortex/job/{job_id}"), &[])
            .await
    })
}

fn search_alerts(client: Arc<ServiceClient>, args: Args) -> BoxFuture<'static, IntegrationResult<Value>> {
    Box::pin(async move {
        let mut filters = Vec::new();
        if let Some(source) = args.opt_string("source", MAX_TEXT_LEN)? {
            filters.push(("source", json!(source)));
        }
        if let Some(severity) = args.opt_int("severity", 1, 4)? {
            filters.push(("severity", json!(severity)));
        }
        let limit = args.int_or("limit", 1, MAX_PAGE, 20)?;
        let body = filtered_query("listAlert", &filters, limit);
        client.post_json("/api/v1/query", body, CallMode::Retrying).await
    })
}

fn merge_alerts(client: Arc<ServiceClient>, args: Args) -> BoxFuture<'static, IntegrationResult<Value>> {
    Box::pin(async move {
        let body = json!({
            "alertIds": args.safe_ids("alert_ids")?,
            "caseId": args.opt_safe_id("case_id")?,
        });
        client
            .post_json("/api/v1/alert/merge", body, CallMode::Bounded)
            .await
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filtered_query_shape() {
        let body = filtered_query("listCase", &[("status", json!("Open"))], 20);
        let query = body["query"].as_array().unwrap();
        assert_eq!(query.len(), 4);
        assert_eq!(query[0], json!({ "_name": "listCase" }));
        assert_eq!(query[1], json!({ "_name": "filter", "_field": "status", "_value": "Open" }));
        assert_eq!(query[3], json!({ "_name": "page", "from": 0, "to": 20 }));
    }
}
