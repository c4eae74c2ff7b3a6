//! The single staging slot and the edit forms that resolve it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::drawing::Draft;
use crate::error::{EngineError, StoreError};
use crate::models::{
    Area, AreaType, Classification, Disposition, EntityKind, EntityRef, ForceStatus, ForceType,
    OwnForce, Target,
};
use crate::store::{Entity, EntityStore};

/// What, if anything, is waiting in the edit form.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Staging {
    #[default]
    None,
    NewTarget(Target),
    NewOwnForce(OwnForce),
    NewArea(Area),
    EditingExisting(EntityRef),
}

impl Staging {
    pub fn kind(&self) -> Option<EntityKind> {
        match self {
            Staging::None => None,
            Staging::NewTarget(_) => Some(EntityKind::Target),
            Staging::NewOwnForce(_) => Some(EntityKind::OwnForce),
            Staging::NewArea(_) => Some(EntityKind::Area),
            Staging::EditingExisting(entity) => Some(entity.kind),
        }
    }

    pub fn is_new(&self) -> bool {
        matches!(
            self,
            Staging::NewTarget(_) | Staging::NewOwnForce(_) | Staging::NewArea(_)
        )
    }
}

/// Editable attributes of a target. Position is not part of the form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetForm {
    pub name: String,
    pub description: String,
    pub classification: Classification,
    pub certainty: u8,
    pub disposition: Disposition,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnForceForm {
    pub name: String,
    #[serde(rename = "type")]
    pub force_type: ForceType,
    pub status: ForceStatus,
}

/// Editable attributes of an area. Geometry is not part of the form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AreaForm {
    pub name: String,
    pub description: String,
    #[serde(rename = "type")]
    pub area_type: AreaType,
}

/// Form fields that can be merged over an entity of one kind.
pub trait FormFields {
    type Entity: Entity;

    fn apply_to(&self, entity: &mut Self::Entity);
}

impl From<&Target> for TargetForm {
    fn from(t: &Target) -> Self {
        Self {
            name: t.name.clone(),
            description: t.description.clone(),
            classification: t.classification,
            certainty: t.certainty,
            disposition: t.disposition,
        }
    }
}

impl FormFields for TargetForm {
    type Entity = Target;

    fn apply_to(&self, t: &mut Target) {
        t.name = self.name.trim().to_string();
        t.description = self.description.clone();
        t.classification = self.classification;
        t.certainty = self.certainty;
        t.disposition = self.disposition;
    }
}

impl From<&OwnForce> for OwnForceForm {
    fn from(f: &OwnForce) -> Self {
        Self {
            name: f.name.clone(),
            force_type: f.force_type,
            status: f.status,
        }
    }
}

impl FormFields for OwnForceForm {
    type Entity = OwnForce;

    fn apply_to(&self, f: &mut OwnForce) {
        f.name = self.name.trim().to_string();
        f.force_type = self.force_type;
        f.status = self.status;
    }
}

impl From<&Area> for AreaForm {
    fn from(a: &Area) -> Self {
        Self {
            name: a.name.clone(),
            description: a.description.clone(),
            area_type: a.area_type,
        }
    }
}

impl FormFields for AreaForm {
    type Entity = Area;

    fn apply_to(&self, a: &mut Area) {
        a.name = self.name.trim().to_string();
        a.description = self.description.clone();
        a.area_type = self.area_type;
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum EntityForm {
    Target(TargetForm),
    OwnForce(OwnForceForm),
    Area(AreaForm),
}

impl EntityForm {
    pub fn kind(&self) -> EntityKind {
        match self {
            EntityForm::Target(_) => EntityKind::Target,
            EntityForm::OwnForce(_) => EntityKind::OwnForce,
            EntityForm::Area(_) => EntityKind::Area,
        }
    }
}

/// How a save resolved the staging slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Saved {
    Committed(EntityRef),
    Updated(EntityRef),
    /// The edited entity was removed while its form was open.
    Vanished(EntityRef),
}

#[derive(Debug, Clone, Default)]
pub struct EditWorkflow {
    staging: Staging,
}

impl EditWorkflow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn staging(&self) -> &Staging {
        &self.staging
    }

    pub fn is_staged(&self) -> bool {
        self.staging != Staging::None
    }

    /// The committed entity currently open for editing, if any.
    pub fn editing(&self) -> Option<EntityRef> {
        match self.staging {
            Staging::EditingExisting(entity) => Some(entity),
            _ => None,
        }
    }

    /// Stage a finished drawing as a new entity with default attributes.
    pub fn stage_new(&mut self, draft: Draft, now: DateTime<Utc>) -> Result<EntityKind, EngineError> {
        if self.is_staged() {
            return Err(EngineError::StagingOccupied);
        }
        let (staging, kind) = match draft {
            Draft::Target(position) => (
                Staging::NewTarget(Target::placed(position, now)),
                EntityKind::Target,
            ),
            Draft::OwnForce(position) => (
                Staging::NewOwnForce(OwnForce::placed(position, now)),
                EntityKind::OwnForce,
            ),
            Draft::Area(geometry) => (Staging::NewArea(Area::drawn(geometry, now)), EntityKind::Area),
        };
        self.staging = staging;
        tracing::debug!(%kind, "Staged new entity");
        Ok(kind)
    }

    /// Open a committed entity in the edit form.
    pub fn open_existing(
        &mut self,
        store: &EntityStore,
        entity: EntityRef,
    ) -> Result<EntityForm, EngineError> {
        if self.is_staged() {
            return Err(EngineError::StagingOccupied);
        }
        let form = existing_form(store, entity).ok_or(EngineError::UnknownEntity(entity.id))?;
        self.staging = Staging::EditingExisting(entity);
        tracing::debug!(kind = %entity.kind, id = %entity.id, "Opened entity for editing");
        Ok(form)
    }

    /// Form contents for whatever is staged: stored attributes for an
    /// existing entity, defaults for a pending one.
    pub fn form(&self, store: &EntityStore) -> Option<EntityForm> {
        match &self.staging {
            Staging::None => None,
            Staging::NewTarget(t) => Some(EntityForm::Target(t.into())),
            Staging::NewOwnForce(f) => Some(EntityForm::OwnForce(f.into())),
            Staging::NewArea(a) => Some(EntityForm::Area(a.into())),
            Staging::EditingExisting(entity) => existing_form(store, *entity),
        }
    }

    /// Commit the staged entity with `form` merged over it.
    ///
    /// On any error the slot stays staged so the operator can correct the form.
    pub fn save(
        &mut self,
        store: &mut EntityStore,
        form: &EntityForm,
        now: DateTime<Utc>,
    ) -> Result<Saved, EngineError> {
        let saved = match (&self.staging, form) {
            (Staging::None, _) => return Err(EngineError::NothingStaged),
            (Staging::NewTarget(pending), EntityForm::Target(fields)) => {
                Saved::Committed(commit_new(store, pending, fields, now)?)
            }
            (Staging::NewOwnForce(pending), EntityForm::OwnForce(fields)) => {
                Saved::Committed(commit_new(store, pending, fields, now)?)
            }
            (Staging::NewArea(pending), EntityForm::Area(fields)) => {
                Saved::Committed(commit_new(store, pending, fields, now)?)
            }
            (Staging::EditingExisting(entity), EntityForm::Target(fields))
                if entity.kind == EntityKind::Target =>
            {
                commit_existing(store, *entity, fields, now)?
            }
            (Staging::EditingExisting(entity), EntityForm::OwnForce(fields))
                if entity.kind == EntityKind::OwnForce =>
            {
                commit_existing(store, *entity, fields, now)?
            }
            (Staging::EditingExisting(entity), EntityForm::Area(fields))
                if entity.kind == EntityKind::Area =>
            {
                commit_existing(store, *entity, fields, now)?
            }
            (staged, form) => {
                return Err(EngineError::FormMismatch {
                    expected: staged.kind().unwrap_or(form.kind()),
                    got: form.kind(),
                })
            }
        };

        self.staging = Staging::None;
        Ok(saved)
    }

    /// Drop whatever is staged. Returns whether anything was.
    pub fn cancel(&mut self) -> bool {
        let was_staged = self.is_staged();
        self.staging = Staging::None;
        was_staged
    }

    /// Remove the entity open for editing from the store.
    pub fn delete(&mut self, store: &mut EntityStore) -> Result<EntityRef, EngineError> {
        let entity = match self.staging {
            Staging::None => return Err(EngineError::NothingStaged),
            Staging::EditingExisting(entity) => entity,
            _ => return Err(EngineError::NotCommitted),
        };
        if !store.remove_ref(entity) {
            tracing::debug!(id = %entity.id, "Deleted entity was already gone");
        }
        self.staging = Staging::None;
        tracing::info!(kind = %entity.kind, id = %entity.id, "Deleted entity");
        Ok(entity)
    }
}

fn existing_form(store: &EntityStore, entity: EntityRef) -> Option<EntityForm> {
    match entity.kind {
        EntityKind::Target => store
            .get::<Target>(entity.id)
            .map(|t| EntityForm::Target((&t).into())),
        EntityKind::OwnForce => store
            .get::<OwnForce>(entity.id)
            .map(|f| EntityForm::OwnForce((&f).into())),
        EntityKind::Area => store
            .get::<Area>(entity.id)
            .map(|a| EntityForm::Area((&a).into())),
    }
}

fn commit_new<F: FormFields>(
    store: &mut EntityStore,
    pending: &F::Entity,
    fields: &F,
    now: DateTime<Utc>,
) -> Result<EntityRef, EngineError> {
    let mut entity = pending.clone();
    fields.apply_to(&mut entity);
    entity.stamp_created(now);
    Entity::validate(&entity)?;

    let entity_ref = entity.entity_ref();
    store.add(entity)?;
    tracing::info!(kind = %entity_ref.kind, id = %entity_ref.id, "Committed new entity");
    Ok(entity_ref)
}

fn commit_existing<F: FormFields>(
    store: &mut EntityStore,
    entity: EntityRef,
    fields: &F,
    now: DateTime<Utc>,
) -> Result<Saved, EngineError> {
    let updated = store.update::<F::Entity>(entity.id, |e| {
        fields.apply_to(e);
        e.touch(now);
    });
    match updated {
        Ok(true) => {
            tracing::info!(kind = %entity.kind, id = %entity.id, "Updated entity");
            Ok(Saved::Updated(entity))
        }
        Ok(false) => {
            tracing::debug!(kind = %entity.kind, id = %entity.id, "Edited entity no longer exists");
            Ok(Saved::Vanished(entity))
        }
        Err(StoreError::Invalid(e)) => Err(EngineError::Invalid(e)),
        Err(e) => Err(e.into()),
    }
}
