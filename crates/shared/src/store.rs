//! The three entity collections and their persistence.
//!
//! Every mutation re-serializes the affected collection and hands it to the
//! [`CollectionStorage`] collaborator. Loading is per collection: a missing,
//! unreadable or corrupt collection comes back empty without touching the
//! other two.

use std::cell::RefCell;
use std::collections::{BTreeMap, HashSet};
use std::rc::Rc;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use uuid::Uuid;

use crate::error::{CollectionError, StorageError, StoreError, ValidationError};
use crate::geo;
use crate::models::{Area, EntityKind, EntityRef, LatLon, OwnForce, Target};

/// Key-value storage holding one serialized collection per key.
pub trait CollectionStorage {
    fn load(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn save(&self, key: &str, payload: &str) -> Result<(), StorageError>;
}

/// In-process storage. Clones share the same entries.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    entries: Rc<RefCell<BTreeMap<String, String>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.entries.borrow().get(key).cloned()
    }

    pub fn insert(&self, key: &str, payload: &str) {
        self.entries
            .borrow_mut()
            .insert(key.to_string(), payload.to_string());
    }
}

impl CollectionStorage for MemoryStorage {
    fn load(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.get(key))
    }

    fn save(&self, key: &str, payload: &str) -> Result<(), StorageError> {
        self.insert(key, payload);
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Collections {
    pub targets: Vec<Target>,
    pub own_forces: Vec<OwnForce>,
    pub areas: Vec<Area>,
}

/// Behavior shared by the three entity types.
pub trait Entity: Clone + Serialize + DeserializeOwned {
    const KIND: EntityKind;

    fn id(&self) -> Uuid;

    fn validate(&self) -> Result<(), ValidationError>;

    /// Validation for an edit of `previous`; areas also refuse a change of shape.
    fn validate_change(&self, _previous: &Self) -> Result<(), ValidationError> {
        Entity::validate(self)
    }

    /// Single coordinate used to label and drag the entity.
    fn anchor(&self) -> LatLon;

    fn translate(&mut self, d_lat: f64, d_lon: f64);

    /// Refresh the modification timestamp.
    fn touch(&mut self, now: DateTime<Utc>);

    /// Stamp a new entity on commit.
    fn stamp_created(&mut self, now: DateTime<Utc>) {
        self.touch(now);
    }

    fn items(collections: &Collections) -> &Vec<Self>;

    fn items_mut(collections: &mut Collections) -> &mut Vec<Self>;

    fn entity_ref(&self) -> EntityRef {
        EntityRef::new(Self::KIND, self.id())
    }
}

impl Entity for Target {
    const KIND: EntityKind = EntityKind::Target;

    fn id(&self) -> Uuid {
        self.id
    }

    fn validate(&self) -> Result<(), ValidationError> {
        Target::validate(self)
    }

    fn anchor(&self) -> LatLon {
        self.position
    }

    fn translate(&mut self, d_lat: f64, d_lon: f64) {
        self.position = self.position.offset(d_lat, d_lon);
    }

    fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now;
    }

    fn stamp_created(&mut self, now: DateTime<Utc>) {
        self.created_at = now;
        self.updated_at = now;
    }

    fn items(collections: &Collections) -> &Vec<Self> {
        &collections.targets
    }

    fn items_mut(collections: &mut Collections) -> &mut Vec<Self> {
        &mut collections.targets
    }
}

impl Entity for OwnForce {
    const KIND: EntityKind = EntityKind::OwnForce;

    fn id(&self) -> Uuid {
        self.id
    }

    fn validate(&self) -> Result<(), ValidationError> {
        OwnForce::validate(self)
    }

    fn anchor(&self) -> LatLon {
        self.position
    }

    fn translate(&mut self, d_lat: f64, d_lon: f64) {
        self.position = self.position.offset(d_lat, d_lon);
    }

    fn touch(&mut self, now: DateTime<Utc>) {
        self.timestamp = now;
    }

    fn items(collections: &Collections) -> &Vec<Self> {
        &collections.own_forces
    }

    fn items_mut(collections: &mut Collections) -> &mut Vec<Self> {
        &mut collections.own_forces
    }
}

impl Entity for Area {
    const KIND: EntityKind = EntityKind::Area;

    fn id(&self) -> Uuid {
        self.id
    }

    fn validate(&self) -> Result<(), ValidationError> {
        Area::validate(self)
    }

    fn validate_change(&self, previous: &Self) -> Result<(), ValidationError> {
        if self.shape() != previous.shape() {
            return Err(ValidationError::ShapeChanged {
                from: previous.shape(),
                to: self.shape(),
            });
        }
        Area::validate(self)
    }

    fn anchor(&self) -> LatLon {
        Area::anchor(self)
    }

    fn translate(&mut self, d_lat: f64, d_lon: f64) {
        self.geometry = geo::translate(&self.geometry, d_lat, d_lon);
    }

    fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now;
    }

    fn stamp_created(&mut self, now: DateTime<Utc>) {
        self.created_at = now;
        self.updated_at = now;
    }

    fn items(collections: &Collections) -> &Vec<Self> {
        &collections.areas
    }

    fn items_mut(collections: &mut Collections) -> &mut Vec<Self> {
        &mut collections.areas
    }
}

/// Lenient decode used on startup: anything unreadable becomes an empty
/// collection, and invalid or duplicate entries are dropped one by one.
pub fn decode_collection<E: Entity>(payload: Option<&str>) -> Vec<E> {
    let Some(payload) = payload else {
        return Vec::new();
    };

    let raw: Vec<serde_json::Value> = match serde_json::from_str(payload) {
        Ok(raw) => raw,
        Err(e) => {
            tracing::warn!(collection = E::KIND.collection(), error = %e, "Discarding corrupt collection");
            return Vec::new();
        }
    };

    let mut seen = HashSet::new();
    let mut entities = Vec::with_capacity(raw.len());
    for (index, value) in raw.into_iter().enumerate() {
        let entity: E = match serde_json::from_value(value) {
            Ok(entity) => entity,
            Err(e) => {
                tracing::warn!(collection = E::KIND.collection(), index, error = %e, "Skipping malformed entity");
                continue;
            }
        };
        if let Err(e) = entity.validate() {
            tracing::warn!(collection = E::KIND.collection(), index, error = %e, "Skipping invalid entity");
            continue;
        }
        if !seen.insert(entity.id()) {
            tracing::warn!(collection = E::KIND.collection(), id = %entity.id(), "Skipping duplicate entity");
            continue;
        }
        entities.push(entity);
    }
    entities
}

/// Strict decode: the whole payload is rejected on the first bad entry.
pub fn decode_collection_strict<E: Entity>(payload: &str) -> Result<Vec<E>, CollectionError> {
    let entities: Vec<E> =
        serde_json::from_str(payload).map_err(|e| CollectionError::Malformed(e.to_string()))?;

    let mut seen = HashSet::new();
    for (index, entity) in entities.iter().enumerate() {
        entity
            .validate()
            .map_err(|source| CollectionError::Invalid { index, source })?;
        if !seen.insert(entity.id()) {
            return Err(CollectionError::DuplicateId(entity.id()));
        }
    }
    Ok(entities)
}

/// Sole owner of the committed entities.
pub struct EntityStore {
    collections: Collections,
    storage: Box<dyn CollectionStorage>,
    prefix: String,
}

impl std::fmt::Debug for EntityStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntityStore")
            .field("prefix", &self.prefix)
            .field("targets", &self.collections.targets.len())
            .field("own_forces", &self.collections.own_forces.len())
            .field("areas", &self.collections.areas.len())
            .finish()
    }
}

impl EntityStore {
    /// Load all three collections from `storage`, each independently.
    pub fn open(storage: Box<dyn CollectionStorage>, prefix: impl Into<String>) -> Self {
        let prefix = prefix.into();
        let collections = Collections {
            targets: load_one(storage.as_ref(), &prefix),
            own_forces: load_one(storage.as_ref(), &prefix),
            areas: load_one(storage.as_ref(), &prefix),
        };
        tracing::info!(
            targets = collections.targets.len(),
            own_forces = collections.own_forces.len(),
            areas = collections.areas.len(),
            "Loaded annotation collections"
        );
        Self {
            collections,
            storage,
            prefix,
        }
    }

    pub fn add<E: Entity>(&mut self, entity: E) -> Result<(), StoreError> {
        entity.validate()?;
        let id = entity.id();
        if E::items(&self.collections).iter().any(|e| e.id() == id) {
            return Err(StoreError::DuplicateId { kind: E::KIND, id });
        }
        E::items_mut(&mut self.collections).push(entity);
        self.persist(E::KIND);
        Ok(())
    }

    /// Apply `mutator` to the entity with `id`.
    ///
    /// Returns `Ok(false)` when the id is not present. A mutation that breaks
    /// an invariant is rejected and the stored entity is left untouched.
    pub fn update<E: Entity>(
        &mut self,
        id: Uuid,
        mutator: impl FnOnce(&mut E),
    ) -> Result<bool, StoreError> {
        let items = E::items_mut(&mut self.collections);
        let Some(slot) = items.iter_mut().find(|e| e.id() == id) else {
            tracing::debug!(kind = %E::KIND, %id, "Update on missing entity ignored");
            return Ok(false);
        };

        let mut candidate = slot.clone();
        mutator(&mut candidate);
        debug_assert_eq!(candidate.id(), id, "mutators must not change ids");
        candidate.validate_change(slot)?;
        *slot = candidate;

        self.persist(E::KIND);
        Ok(true)
    }

    /// Remove the entity with `id`; returns whether anything was removed.
    pub fn remove<E: Entity>(&mut self, id: Uuid) -> bool {
        let items = E::items_mut(&mut self.collections);
        let before = items.len();
        items.retain(|e| e.id() != id);
        let removed = items.len() != before;
        if removed {
            self.persist(E::KIND);
        }
        removed
    }

    pub fn remove_ref(&mut self, entity: EntityRef) -> bool {
        match entity.kind {
            EntityKind::Target => self.remove::<Target>(entity.id),
            EntityKind::OwnForce => self.remove::<OwnForce>(entity.id),
            EntityKind::Area => self.remove::<Area>(entity.id),
        }
    }

    /// Snapshot of a collection.
    pub fn all<E: Entity>(&self) -> Vec<E> {
        E::items(&self.collections).clone()
    }

    pub fn iter<E: Entity>(&self) -> std::slice::Iter<'_, E> {
        E::items(&self.collections).iter()
    }

    pub fn get<E: Entity>(&self, id: Uuid) -> Option<E> {
        self.iter::<E>().find(|e| e.id() == id).cloned()
    }

    pub fn len<E: Entity>(&self) -> usize {
        E::items(&self.collections).len()
    }

    pub fn contains(&self, entity: EntityRef) -> bool {
        self.anchor_of(entity).is_some()
    }

    /// Find which collection holds `id`.
    pub fn locate(&self, id: Uuid) -> Option<EntityRef> {
        EntityKind::ALL
            .into_iter()
            .map(|kind| EntityRef::new(kind, id))
            .find(|r| self.contains(*r))
    }

    pub fn anchor_of(&self, entity: EntityRef) -> Option<LatLon> {
        fn find<E: Entity>(store: &EntityStore, id: Uuid) -> Option<LatLon> {
            store.iter::<E>().find(|e| e.id() == id).map(|e| e.anchor())
        }
        match entity.kind {
            EntityKind::Target => find::<Target>(self, entity.id),
            EntityKind::OwnForce => find::<OwnForce>(self, entity.id),
            EntityKind::Area => find::<Area>(self, entity.id),
        }
    }

    pub fn collections(&self) -> &Collections {
        &self.collections
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Hand the full collection to storage. Failures are logged; the
    /// in-memory state stays authoritative until the next successful save.
    fn persist(&self, kind: EntityKind) {
        let payload = match kind {
            EntityKind::Target => serde_json::to_string(&self.collections.targets),
            EntityKind::OwnForce => serde_json::to_string(&self.collections.own_forces),
            EntityKind::Area => serde_json::to_string(&self.collections.areas),
        };
        let payload = match payload {
            Ok(payload) => payload,
            Err(e) => {
                tracing::error!(collection = kind.collection(), error = %e, "Failed to serialize collection");
                return;
            }
        };
        let key = kind.storage_key(&self.prefix);
        match self.storage.save(&key, &payload) {
            Ok(()) => tracing::debug!(%key, bytes = payload.len(), "Persisted collection"),
            Err(e) => tracing::warn!(%key, error = %e, "Failed to persist collection"),
        }
    }
}

fn load_one<E: Entity>(storage: &dyn CollectionStorage, prefix: &str) -> Vec<E> {
    let key = E::KIND.storage_key(prefix);
    match storage.load(&key) {
        Ok(payload) => decode_collection(payload.as_deref()),
        Err(e) => {
            tracing::warn!(%key, error = %e, "Storage load failed, starting empty");
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AreaGeometry, Classification, ForceStatus};

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-03-01T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    fn open(storage: &MemoryStorage) -> EntityStore {
        EntityStore::open(Box::new(storage.clone()), "tactical")
    }

    /// Storage whose every call fails.
    struct BrokenStorage;

    impl CollectionStorage for BrokenStorage {
        fn load(&self, _key: &str) -> Result<Option<String>, StorageError> {
            Err(StorageError::Unavailable("disk gone".into()))
        }

        fn save(&self, _key: &str, _payload: &str) -> Result<(), StorageError> {
            Err(StorageError::Unavailable("disk gone".into()))
        }
    }

    /// Storage that only fails for one key.
    struct FlakyKey {
        inner: MemoryStorage,
        bad_key: &'static str,
    }

    impl CollectionStorage for FlakyKey {
        fn load(&self, key: &str) -> Result<Option<String>, StorageError> {
            if key == self.bad_key {
                return Err(StorageError::Backend("read error".into()));
            }
            self.inner.load(key)
        }

        fn save(&self, key: &str, payload: &str) -> Result<(), StorageError> {
            self.inner.save(key, payload)
        }
    }

    #[test]
    fn test_add_then_all_returns_entity() {
        let mut store = open(&MemoryStorage::new());
        let t = Target::placed(LatLon::new(59.91, 10.75), now());
        store.add(t.clone()).unwrap();
        assert_eq!(store.all::<Target>(), vec![t]);
    }

    #[test]
    fn test_add_rejects_duplicate_id() {
        let mut store = open(&MemoryStorage::new());
        let t = Target::placed(LatLon::new(1.0, 1.0), now());
        store.add(t.clone()).unwrap();
        let err = store.add(t.clone()).unwrap_err();
        assert_eq!(
            err,
            StoreError::DuplicateId {
                kind: EntityKind::Target,
                id: t.id
            }
        );
        assert_eq!(store.len::<Target>(), 1);
    }

    #[test]
    fn test_add_rejects_invalid_entity() {
        let mut store = open(&MemoryStorage::new());
        let f = OwnForce::placed(LatLon::new(95.0, 0.0), now());
        assert!(matches!(
            store.add(f),
            Err(StoreError::Invalid(ValidationError::InvalidPosition { .. }))
        ));
        assert!(store.all::<OwnForce>().is_empty());
    }

    #[test]
    fn test_remove_is_idempotent() {
        let mut store = open(&MemoryStorage::new());
        let f = OwnForce::placed(LatLon::new(1.0, 1.0), now());
        store.add(f.clone()).unwrap();
        assert!(store.remove::<OwnForce>(f.id));
        assert!(store.all::<OwnForce>().iter().all(|e| e.id != f.id));
        assert!(!store.remove::<OwnForce>(f.id));
    }

    #[test]
    fn test_update_missing_id_is_noop() {
        let mut store = open(&MemoryStorage::new());
        let updated = store
            .update::<Target>(Uuid::new_v4(), |t| t.name = "ghost".into())
            .unwrap();
        assert!(!updated);
        assert!(store.all::<Target>().is_empty());
    }

    #[test]
    fn test_update_applies_mutator() {
        let mut store = open(&MemoryStorage::new());
        let f = OwnForce::placed(LatLon::new(1.0, 1.0), now());
        store.add(f.clone()).unwrap();
        assert!(store
            .update::<OwnForce>(f.id, |e| e.status = ForceStatus::Engaged)
            .unwrap());
        assert_eq!(
            store.get::<OwnForce>(f.id).unwrap().status,
            ForceStatus::Engaged
        );
    }

    #[test]
    fn test_update_rejecting_invariant_leaves_entity() {
        let mut store = open(&MemoryStorage::new());
        let t = Target::placed(LatLon::new(1.0, 1.0), now());
        store.add(t.clone()).unwrap();
        let result = store.update::<Target>(t.id, |e| e.certainty = 150);
        assert!(result.is_err());
        assert_eq!(store.get::<Target>(t.id), Some(t));
    }

    #[test]
    fn test_update_cannot_change_area_shape() {
        let mut store = open(&MemoryStorage::new());
        let area = Area::drawn(
            AreaGeometry::Circle {
                center: LatLon::new(60.0, 10.0),
                radius_m: 500.0,
            },
            now(),
        );
        store.add(area.clone()).unwrap();
        let result = store.update::<Area>(area.id, |a| {
            a.geometry = AreaGeometry::Line {
                vertices: vec![LatLon::new(0.0, 0.0), LatLon::new(1.0, 1.0)],
            }
        });
        assert!(matches!(
            result,
            Err(StoreError::Invalid(ValidationError::ShapeChanged { .. }))
        ));
    }

    #[test]
    fn test_all_is_a_snapshot() {
        let mut store = open(&MemoryStorage::new());
        store
            .add(Target::placed(LatLon::new(1.0, 1.0), now()))
            .unwrap();
        let mut snapshot = store.all::<Target>();
        snapshot[0].name = "changed outside".into();
        snapshot.clear();
        assert_eq!(store.len::<Target>(), 1);
        assert_eq!(store.all::<Target>()[0].name, "");
    }

    #[test]
    fn test_mutations_persist_and_reload() {
        let storage = MemoryStorage::new();
        let mut t = Target::placed(LatLon::new(59.91, 10.75), now());
        t.classification = Classification::Vehicle;
        {
            let mut store = open(&storage);
            store.add(t.clone()).unwrap();
        }
        assert!(storage.get("tactical.targets").is_some());
        let reloaded = open(&storage);
        assert_eq!(reloaded.all::<Target>(), vec![t]);
    }

    #[test]
    fn test_corrupt_collection_falls_back_to_empty_alone() {
        let storage = MemoryStorage::new();
        {
            let mut store = open(&storage);
            store
                .add(OwnForce::placed(LatLon::new(1.0, 1.0), now()))
                .unwrap();
        }
        storage.insert("tactical.targets", "{not json");
        let store = open(&storage);
        assert!(store.all::<Target>().is_empty());
        assert_eq!(store.len::<OwnForce>(), 1);
    }

    #[test]
    fn test_failed_load_of_one_key_keeps_others() {
        let inner = MemoryStorage::new();
        {
            let mut store = open(&inner);
            store
                .add(Target::placed(LatLon::new(1.0, 1.0), now()))
                .unwrap();
            store
                .add(OwnForce::placed(LatLon::new(2.0, 2.0), now()))
                .unwrap();
        }
        let flaky = FlakyKey {
            inner,
            bad_key: "tactical.ownforces",
        };
        let store = EntityStore::open(Box::new(flaky), "tactical");
        assert_eq!(store.len::<Target>(), 1);
        assert_eq!(store.len::<OwnForce>(), 0);
    }

    #[test]
    fn test_save_failure_keeps_memory_state() {
        let mut store = EntityStore::open(Box::new(BrokenStorage), "tactical");
        let t = Target::placed(LatLon::new(1.0, 1.0), now());
        store.add(t.clone()).unwrap();
        assert_eq!(store.all::<Target>(), vec![t]);
    }

    #[test]
    fn test_decode_drops_invalid_and_duplicate_entries() {
        let good = Target::placed(LatLon::new(1.0, 1.0), now());
        let mut bad = Target::placed(LatLon::new(1.0, 1.0), now());
        bad.certainty = 200;
        let payload = serde_json::to_string(&vec![good.clone(), bad, good.clone()]).unwrap();
        let decoded: Vec<Target> = decode_collection(Some(&payload));
        assert_eq!(decoded, vec![good]);
    }

    #[test]
    fn test_decode_strict_rejects_bad_entry() {
        let mut bad = OwnForce::placed(LatLon::new(0.0, 0.0), now());
        bad.position.lon = 200.0;
        let payload = serde_json::to_string(&vec![bad]).unwrap();
        let err = decode_collection_strict::<OwnForce>(&payload).unwrap_err();
        assert!(matches!(err, CollectionError::Invalid { index: 0, .. }));
        assert!(matches!(
            decode_collection_strict::<OwnForce>("[1, 2]"),
            Err(CollectionError::Malformed(_))
        ));
    }

    #[test]
    fn test_locate_finds_collection() {
        let mut store = open(&MemoryStorage::new());
        let f = OwnForce::placed(LatLon::new(1.0, 1.0), now());
        store.add(f.clone()).unwrap();
        assert_eq!(
            store.locate(f.id),
            Some(EntityRef::new(EntityKind::OwnForce, f.id))
        );
        assert_eq!(store.locate(Uuid::new_v4()), None);
    }
}
