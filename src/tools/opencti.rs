//! OpenCTI threat intelligence tools over GraphQL.

use std::sync::Arc;

use futures_util::future::BoxFuture;
use serde_json::{json, Value};

use crate::error::IntegrationResult;
use crate::services::opencti::graphql;
use crate::services::{CallMode, ServiceClient};
use crate::tools::args::{Args, MAX_TEXT_LEN};
use crate::tools::registry::{id_schema, limit_schema, object_schema, text_schema, ToolRegistry, ToolSpec};

const MAX_RELATIONSHIP_TYPE_LEN: usize = 100;

const SEARCH_INDICATORS: &str = r#"query SearchIndicators($search: String, $first: Int, $filters: FilterGroup) {
  stixCyberObservables(search: $search, first: $first, filters: $filters) {
    edges {
      node {
        id
        entity_type
        observable_value
        created_at
        updated_at
        objectLabel { value color }
        createdBy { name }
        objectMarking { definition }
      }
    }
    pageInfo { globalCount }
  }
}"#;

const GET_INDICATOR: &str = r#"query GetIndicator($id: String!) {
  stixCyberObservable(id: $id) {
    id
    entity_type
    observable_value
    created_at
    updated_at
    objectLabel { value color }
    createdBy { name }
    objectMarking { definition }
    stixCoreRelationships {
      edges {
        node {
          id
          relationship_type
          from { ... on StixDomainObject { id name entity_type } }
          to { ... on StixDomainObject { id name entity_type } }
        }
      }
    }
    indicators {
      edges { node { id name pattern valid_from valid_until } }
    }
  }
}"#;

const SEARCH_REPORTS: &str = r#"query SearchReports($search: String, $first: Int) {
  reports(search: $search, first: $first, orderBy: created_at, orderMode: desc) {
    edges {
      node {
        id
        name
        description
        published
        created_at
        report_types
        objectLabel { value }
        createdBy { name }
        objectMarking { definition }
      }
    }
    pageInfo { globalCount }
  }
}"#;

const GET_ATTACK_PATTERNS: &str = r#"query GetAttackPatterns($search: String, $first: Int) {
  attackPatterns(search: $search, first: $first, orderBy: name, orderMode: asc) {
    edges {
      node {
        id
        name
        description
        x_mitre_id
        x_mitre_platforms
        killChainPhases { kill_chain_name phase_name }
        subAttackPatterns { edges { node { id name x_mitre_id } } }
      }
    }
    pageInfo { globalCount }
  }
}"#;

const ENRICH_OBSERVABLE: &str = r#"mutation EnrichObservable($id: ID!, $connectorId: ID) {
  stixCyberObservableEdit(id: $id) {
    askEnrichment(connectorId: $connectorId) {
      id
      connector { name }
      status
    }
  }
}"#;

const GET_RELATIONSHIPS: &str = r#"query GetRelationships($id: String!, $relationship_type: [String], $first: Int) {
  stixCoreRelationships(
    fromOrToId: $id,
    relationship_type: $relationship_type,
    first: $first,
    orderBy: created_at,
    orderMode: desc
  ) {
    edges {
      node {
        id
        relationship_type
        description
        confidence
        start_time
        stop_time
        from {
          ... on StixDomainObject { id name entity_type }
          ... on StixCyberObservable { id observable_value entity_type }
        }
        to {
          ... on StixDomainObject { id name entity_type }
          ... on StixCyberObservable { id observable_value entity_type }
        }
      }
    }
    pageInfo { globalCount }
  }
}"#;

pub fn register(registry: &mut ToolRegistry) {
    registry.register(
        ToolSpec {
            name: "search-indicators",
            description: "Search OpenCTI threat indicators (IOCs) by value or type",
            input_schema: object_schema(
                json!({
                    "value": text_schema("Search by indicator value (IP, domain, hash, ...)"),
                    "type": text_schema("Filter by type (IPv4-Addr, Domain-Name, StixFile, Url, ...)"),
                    "limit": limit_schema(20),
                }),
                &[],
            ),
        },
        search_indicators,
    );
    registry.register(
        ToolSpec {
            name: "get-indicator",
            description: "Get full details of an OpenCTI indicator including relationships",
            input_schema: object_schema(json!({ "indicator_id": id_schema("OpenCTI entity ID") }), &["indicator_id"]),
        },
        get_indicator,
    );
    registry.register(
        ToolSpec {
            name: "search-reports",
            description: "Search OpenCTI threat intelligence reports",
            input_schema: object_schema(
                json!({
                    "search": text_schema("Search text in report names and descriptions"),
                    "limit": limit_schema(10),
                }),
                &[],
            ),
        },
        search_reports,
    );
    registry.register(
        ToolSpec {
            name: "get-attack-patterns",
            description: "List MITRE ATT&CK techniques, optionally filtered by tactic",
            input_schema: object_schema(
                json!({
                    "search": text_schema("Search text (e.g. 'phishing')"),
                    "tactic": text_schema("Kill chain phase (e.g. 'initial-access')"),
                    "limit": limit_schema(20),
                }),
                &[],
            ),
        },
        get_attack_patterns,
    );
    registry.register(
        ToolSpec {
            name: "enrich-observable",
            description: "Request enrichment for an observable in OpenCTI",
            input_schema: object_schema(
                json!({
                    "observable_id": id_schema("Observable entity ID to enrich"),
                    "connector_id": id_schema("Specific connector ID to use"),
                }),
                &["observable_id"],
            ),
        },
        enrich_observable,
    );
    registry.register(
        ToolSpec {
            name: "get-relationships",
            description: "Get relationships for an OpenCTI entity",
            input_schema: object_schema(
                json!({
                    "entity_id": id_schema("Entity ID to get relationships for"),
                    "relationship_type": {
                        "type": "string",
                        "maxLength": MAX_RELATIONSHIP_TYPE_LEN,
                        "description": "Filter by type (e.g. 'uses', 'targets', 'indicates')"
                    },
                    "limit": limit_schema(20),
                }),
                &["entity_id"],
            ),
        },
        get_relationships,
    );
}

/// Filter group restricting observables to one entity type, or null.
fn entity_type_filter(kind: Option<String>) -> Value {
    match kind {
        Some(kind) => json!({
            "mode": "and",
            "filters": [{ "key": "entity_type", "values": [kind] }],
            "filterGroups": [],
        }),
        None => Value::Null,
    }
}

fn search_indicators(client: Arc<ServiceClient>, args: Args) -> BoxFuture<'static, IntegrationResult<Value>> {
    Box::pin(async move {
        let variables = json!({
            "search": args.opt_string("value", MAX_TEXT_LEN)?,
            "first": args.int_or("limit", 1, 100, 20)?,
            "filters": entity_type_filter(args.opt_string("type", MAX_TEXT_LEN)?),
        });
        graphql(&client, SEARCH_INDICATORS, variables, CallMode::Retrying).await
    })
}

fn get_indicator(client: Arc<ServiceClient>, args: Args) -> BoxFuture<'static, IntegrationResult<Value>> {
    Box::pin(async move {
        let variables = json!({ "id": args.safe_id("indicator_id")? });
        graphql(&client, GET_INDICATOR, variables, CallMode::Retrying).await
    })
}

fn search_reports(client: Arc<ServiceClient>, args: Args) -> BoxFuture<'static, IntegrationResult<Value>> {
    Box::pin(async move {
        let variables = json!({
            "search": args.opt_string("search", MAX_TEXT_LEN)?,
            "first": args.int_or("limit", 1, 100, 10)?,
        });
        graphql(&client, SEARCH_REPORTS, variables, CallMode::Retrying).await
    })
}

fn get_attack_patterns(client: Arc<ServiceClient>, args: Args) -> BoxFuture<'static, IntegrationResult<Value>> {
    Box::pin(async move {
        // The API has no kill-chain filter; the tactic doubles as search text.
        let search = match args.opt_string("search", MAX_TEXT_LEN)? {
            Some(search) => Some(search),
            None => args.opt_string("tactic", MAX_TEXT_LEN)?,
        };
        let variables = json!({
            "search": search,
            "first": args.int_or("limit", 1, 100, 20)?,
        });
        graphql(&client, GET_ATTACK_PATTERNS, variables, CallMode::Retrying).await
    })
}

fn enrich_observable(client: Arc<ServiceClient>, args: Args) -> BoxFuture<'static, IntegrationResult<Value>> {
    Box::pin(async move {
        let variables = json!({
            "id": args.safe_id("observable_id")?,
            "connectorId": args.opt_safe_id("connector_id")?,
        });
        graphql(&client, ENRICH_OBSERVABLE, variables, CallMode::Bounded).await
    })
}

fn get_relationships(client: Arc<ServiceClient>, args: Args) -> BoxFuture<'static, IntegrationResult<Value>> {
    Box::pin(async move {
        let relationship_type = args
            .opt_string("relationship_type", MAX_RELATIONSHIP_TYPE_LEN)?
            .map(|kind| vec![kind]);
        let variables = json!({
            "id": args.safe_id("entity_id")?,
            "relationship_type": relationship_type,
            "first": args.int_or("limit", 1, 100, 20)?,
        });
        graphql(&client, GET_RELATIONSHIPS, variables, CallMode::Retrying).await
    })
}
