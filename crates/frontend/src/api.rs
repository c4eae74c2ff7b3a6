use std::cell::RefCell;
use std::collections::{HashMap, HashSet};

use overwatch_shared::models::EntityKind;
use serde::{Deserialize, Serialize};

/// GraphQL enum value naming a collection.
pub fn collection_arg(kind: EntityKind) -> &'static str {
    match kind {
        EntityKind::Target => "TARGETS",
        EntityKind::OwnForce => "OWN_FORCES",
        EntityKind::Area => "AREAS",
    }
}

/// Build the variables JSON for a save collection mutation from a stored payload.
pub fn build_save_collection_variables(
    kind: EntityKind,
    payload: &str,
) -> Result<serde_json::Value, serde_json::Error> {
    let entities: serde_json::Value = serde_json::from_str(payload)?;
    Ok(serde_json::json!({
        "kind": collection_arg(kind),
        "entities": entities
    }))
}

#[derive(Debug, Clone, Serialize)]
pub struct GraphQLRequest {
    pub query: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variables: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GraphQLResponse<T> {
    pub data: Option<T>,
    pub errors: Option<Vec<GraphQLError>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GraphQLError {
    pub message: String,
}

fn api_url() -> Result<String, String> {
    let window = web_sys::window().ok_or("no window")?;
    let origin = window
        .location()
        .origin()
        .map_err(|_| "no location origin".to_string())?;
    Ok(format!("{}/graphql", origin))
}

async fn query<T: for<'de> Deserialize<'de>>(
    query_str: &str,
    variables: Option<serde_json::Value>,
) -> Result<T, String> {
    let req = GraphQLRequest {
        query: query_str.to_string(),
        variables,
    };

    let resp = reqwest::Client::new()
        .post(api_url()?)
        .json(&req)
        .send()
        .await
        .map_err(|e| e.to_string())?;

    let gql_resp: GraphQLResponse<T> = resp.json().await.map_err(|e| e.to_string())?;

    if let Some(errors) = gql_resp.errors {
        if let Some(first) = errors.into_iter().next() {
            return Err(first.message);
        }
    }

    gql_resp.data.ok_or_else(|| "No data returned".to_string())
}

// Types mirroring the GraphQL schema

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsData {
    pub targets: u64,
    pub own_forces: u64,
    pub areas: u64,
    pub collections: u64,
    pub db_size_bytes: u64,
}

#[derive(Deserialize)]
pub struct StatsResponse {
    pub stats: StatsData,
}

pub async fn fetch_stats() -> Result<StatsData, String> {
    let resp: StatsResponse = query(
        r#"query { stats { targets ownForces areas collections dbSizeBytes } }"#,
        None,
    )
    .await?;
    Ok(resp.stats)
}

#[derive(Deserialize)]
pub struct SaveCollectionResponse {
    #[serde(rename = "saveCollection")]
    pub save_collection: u64,
}

pub async fn save_collection(kind: EntityKind, payload: &str) -> Result<u64, String> {
    let variables = build_save_collection_variables(kind, payload).map_err(|e| e.to_string())?;
    let resp: SaveCollectionResponse = query(
        r#"mutation SaveCollection($kind: GqlCollection!, $entities: JSON!) {
            saveCollection(kind: $kind, entities: $entities)
        }"#,
        Some(variables),
    )
    .await?;
    Ok(resp.save_collection)
}

/// Orders mirror saves per collection. One request per collection is in
/// flight at a time, and a save made meanwhile replaces the queued payload.
#[derive(Debug, Default)]
pub struct MirrorQueue {
    in_flight: HashSet<EntityKind>,
    queued: HashMap<EntityKind, String>,
}

impl MirrorQueue {
    /// Payload to send now, or `None` if it was queued behind a running save.
    pub fn submit(&mut self, kind: EntityKind, payload: String) -> Option<String> {
        if self.in_flight.contains(&kind) {
            self.queued.insert(kind, payload);
            None
        } else {
            self.in_flight.insert(kind);
            Some(payload)
        }
    }

    /// Called when a save finished. Returns the next payload to send.
    pub fn finish(&mut self, kind: EntityKind) -> Option<String> {
        let next = self.queued.remove(&kind);
        if next.is_none() {
            self.in_flight.remove(&kind);
        }
        next
    }
}

thread_local! {
    static MIRROR: RefCell<MirrorQueue> = RefCell::default();
}

/// Fire-and-forget mirror of a saved collection to the server.
pub fn save_collection_fire(kind: EntityKind, payload: String) {
    let Some(payload) = MIRROR.with_borrow_mut(|q| q.submit(kind, payload)) else {
        tracing::debug!(collection = kind.collection(), "Mirror queued");
        return;
    };
    wasm_bindgen_futures::spawn_local(async move {
        let mut next = Some(payload);
        while let Some(payload) = next {
            match save_collection(kind, &payload).await {
                Ok(count) => {
                    tracing::debug!(collection = kind.collection(), count, "Mirrored collection")
                }
                Err(e) => tracing::warn!(collection = kind.collection(), "Mirror failed: {e}"),
            }
            next = MIRROR.with_borrow_mut(|q| q.finish(kind));
        }
    });
}
