use std::sync::Arc;

use async_graphql::{Context, Enum, InputObject, Json, Object, SimpleObject};
use overwatch_shared::{
    geo, grid,
    models::{Area, EntityKind, LatLon, OwnForce, Target},
    store::{decode_collection, decode_collection_strict, CollectionStorage, Entity},
};
use serde_json::Value;

use crate::storage::RedbStorage;

/// Prefix of the storage keys this server reads and writes.
#[derive(Debug, Clone)]
pub struct StoragePrefix(pub String);

#[derive(Enum, Copy, Clone, Eq, PartialEq)]
pub enum GqlCollection {
    Targets,
    OwnForces,
    Areas,
}

impl From<GqlCollection> for EntityKind {
    fn from(c: GqlCollection) -> Self {
        match c {
            GqlCollection::Targets => EntityKind::Target,
            GqlCollection::OwnForces => EntityKind::OwnForce,
            GqlCollection::Areas => EntityKind::Area,
        }
    }
}

// GraphQL output types

#[derive(SimpleObject, Clone)]
pub struct GqlPosition {
    pub lat: f64,
    pub lon: f64,
    pub mgrs: String,
    pub utm: String,
}

impl From<LatLon> for GqlPosition {
    fn from(p: LatLon) -> Self {
        GqlPosition {
            lat: p.lat,
            lon: p.lon,
            mgrs: grid::to_mgrs(p.lat, p.lon),
            utm: grid::to_utm(p.lat, p.lon),
        }
    }
}

#[derive(SimpleObject)]
pub struct GqlMeasurement {
    pub distance_km: f64,
    pub bearing_deg: f64,
    pub cardinal: String,
    pub distance_label: String,
    pub from: GqlPosition,
    pub to: GqlPosition,
}

#[derive(SimpleObject)]
pub struct GqlStats {
    pub targets: u64,
    pub own_forces: u64,
    pub areas: u64,
    /// Stored collection rows, whatever their prefix.
    pub collections: u64,
    pub db_size_bytes: u64,
}

// Input types

#[derive(InputObject)]
pub struct LatLonInput {
    pub lat: f64,
    pub lon: f64,
}

impl LatLonInput {
    fn to_position(&self) -> async_graphql::Result<LatLon> {
        let position = LatLon::new(self.lat, self.lon);
        position
            .validate()
            .map_err(|e| async_graphql::Error::new(e.to_string()))?;
        Ok(position)
    }
}

/// A collection that cannot be read comes back empty.
fn load_entities<E: Entity>(storage: &dyn CollectionStorage, prefix: &str) -> Vec<E> {
    let key = E::KIND.storage_key(prefix);
    match storage.load(&key) {
        Ok(payload) => decode_collection(payload.as_deref()),
        Err(e) => {
            tracing::warn!(%key, error = %e, "Collection read failed, serving empty");
            Vec::new()
        }
    }
}

fn load_json<E: Entity>(
    storage: &dyn CollectionStorage,
    prefix: &str,
) -> async_graphql::Result<Value> {
    let entities: Vec<E> = load_entities(storage, prefix);
    serde_json::to_value(entities).map_err(|e| async_graphql::Error::new(e.to_string()))
}

fn store_json<E: Entity>(
    storage: &RedbStorage,
    prefix: &str,
    entities: &Value,
) -> async_graphql::Result<u64> {
    let entities: Vec<E> = decode_collection_strict(&entities.to_string())
        .map_err(|e| async_graphql::Error::new(e.to_string()))?;
    let payload =
        serde_json::to_string(&entities).map_err(|e| async_graphql::Error::new(e.to_string()))?;
    storage
        .save(&E::KIND.storage_key(prefix), &payload)
        .map_err(|e| async_graphql::Error::new(e.to_string()))?;
    tracing::info!(collection = E::KIND.collection(), count = entities.len(), "Saved collection");
    Ok(entities.len() as u64)
}

// Query root

pub struct QueryRoot;

#[Object]
impl QueryRoot {
    /// A stored collection as JSON. Unreadable entries are dropped and a
    /// missing or corrupt collection comes back as `[]`.
    async fn collection(
        &self,
        ctx: &Context<'_>,
        kind: GqlCollection,
    ) -> async_graphql::Result<Json<Value>> {
        let storage = ctx.data::<Arc<RedbStorage>>()?;
        let prefix = &ctx.data::<StoragePrefix>()?.0;
        let value = match EntityKind::from(kind) {
            EntityKind::Target => load_json::<Target>(&**storage, prefix)?,
            EntityKind::OwnForce => load_json::<OwnForce>(&**storage, prefix)?,
            EntityKind::Area => load_json::<Area>(&**storage, prefix)?,
        };
        Ok(Json(value))
    }

    async fn measure(
        &self,
        from: LatLonInput,
        to: LatLonInput,
    ) -> async_graphql::Result<GqlMeasurement> {
        let from = from.to_position()?;
        let to = to.to_position()?;
        let m = geo::measure(from, to);

        Ok(GqlMeasurement {
            distance_km: m.distance_km,
            bearing_deg: m.bearing_deg,
            cardinal: geo::cardinal(m.bearing_deg).to_string(),
            distance_label: geo::format_distance(m.distance_km),
            from: from.into(),
            to: to.into(),
        })
    }

    async fn stats(&self, ctx: &Context<'_>) -> async_graphql::Result<GqlStats> {
        let storage = ctx.data::<Arc<RedbStorage>>()?;
        let prefix = &ctx.data::<StoragePrefix>()?.0;
        let db_size_bytes = storage
            .db_size_bytes()
            .map_err(|e| async_graphql::Error::new(e.to_string()))?;
        let collections = storage
            .count_collections()
            .map_err(|e| async_graphql::Error::new(e.to_string()))?;

        Ok(GqlStats {
            targets: load_entities::<Target>(&**storage, prefix).len() as u64,
            own_forces: load_entities::<OwnForce>(&**storage, prefix).len() as u64,
            areas: load_entities::<Area>(&**storage, prefix).len() as u64,
            collections,
            db_size_bytes,
        })
    }
}

// Mutation root

pub struct MutationRoot;

#[Object]
impl MutationRoot {
    /// Replace a whole collection. Any malformed or invalid entity rejects
    /// the save and leaves the stored collection untouched.
    async fn save_collection(
        &self,
        ctx: &Context<'_>,
        kind: GqlCollection,
        entities: Json<Value>,
    ) -> async_graphql::Result<u64> {
        let storage = ctx.data::<Arc<RedbStorage>>()?;
        let prefix = &ctx.data::<StoragePrefix>()?.0;
        match EntityKind::from(kind) {
            EntityKind::Target => store_json::<Target>(storage, prefix, &entities),
            EntityKind::OwnForce => store_json::<OwnForce>(storage, prefix, &entities),
            EntityKind::Area => store_json::<Area>(storage, prefix, &entities),
        }
    }
}

pub type Schema = async_graphql::Schema<QueryRoot, MutationRoot, async_graphql::EmptySubscription>;

pub fn build_schema(storage: Arc<RedbStorage>, prefix: StoragePrefix) -> Schema {
    async_graphql::Schema::build(QueryRoot, MutationRoot, async_graphql::EmptySubscription)
        .data(storage)
        .data(prefix)
        .finish()
}
