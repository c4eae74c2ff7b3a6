//! Routes map events and operator intents to the drawing machine, the edit
//! workflow and the entity store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::drawing::{Draft, DrawStep, DrawingMachine, DrawingState, Tool};
use crate::error::{EngineError, StoreError};
use crate::geo::{self, Measurement};
use crate::models::{Area, AreaGeometry, EntityKind, EntityRef, LatLon, OwnForce, Target};
use crate::staging::{EditWorkflow, EntityForm, Saved, Staging};
use crate::store::{CollectionStorage, Entity, EntityStore};

pub const DEFAULT_STORAGE_PREFIX: &str = "tactical";
pub const DEFAULT_HIT_TOLERANCE_M: f64 = 150.0;

pub trait Clock {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EngineConfig {
    /// Prefix of the three storage keys.
    pub storage_prefix: String,
    /// How far from an anchor a click still hits the entity.
    pub hit_tolerance_m: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            storage_prefix: DEFAULT_STORAGE_PREFIX.to_string(),
            hit_tolerance_m: DEFAULT_HIT_TOLERANCE_M,
        }
    }
}

/// Events reported by the map widget.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MapEvent {
    Click { at: LatLon, hit: Option<EntityRef> },
    DragEnd { id: Uuid, to: LatLon },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Outcome {
    Ignored,
    ToolChanged(DrawingState),
    VertexAdded { count: usize },
    CenterSet(LatLon),
    /// A finished drawing now waits in the form.
    Staged(EntityKind),
    Opened(EntityRef),
    Committed(EntityRef),
    Updated(EntityRef),
    /// The entity being edited was gone by the time it was saved.
    Vanished(EntityRef),
    Moved(EntityRef),
    Deleted(EntityRef),
    Cancelled,
}

impl From<Saved> for Outcome {
    fn from(saved: Saved) -> Self {
        match saved {
            Saved::Committed(entity) => Outcome::Committed(entity),
            Saved::Updated(entity) => Outcome::Updated(entity),
            Saved::Vanished(entity) => Outcome::Vanished(entity),
        }
    }
}

pub struct AnnotationEngine {
    config: EngineConfig,
    store: EntityStore,
    drawing: DrawingMachine,
    workflow: EditWorkflow,
    clock: Box<dyn Clock>,
}

impl std::fmt::Debug for AnnotationEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnnotationEngine")
            .field("config", &self.config)
            .field("store", &self.store)
            .field("drawing", &self.drawing)
            .field("workflow", &self.workflow)
            .finish_non_exhaustive()
    }
}

impl AnnotationEngine {
    pub fn new(storage: Box<dyn CollectionStorage>, config: EngineConfig) -> Self {
        Self::with_clock(storage, config, Box::new(SystemClock))
    }

    pub fn with_clock(
        storage: Box<dyn CollectionStorage>,
        config: EngineConfig,
        clock: Box<dyn Clock>,
    ) -> Self {
        let store = EntityStore::open(storage, config.storage_prefix.clone());
        Self {
            config,
            store,
            drawing: DrawingMachine::new(),
            workflow: EditWorkflow::new(),
            clock,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn store(&self) -> &EntityStore {
        &self.store
    }

    pub fn drawing(&self) -> &DrawingMachine {
        &self.drawing
    }

    pub fn staging(&self) -> &Staging {
        self.workflow.staging()
    }

    /// Current form contents for the staged entity.
    pub fn form(&self) -> Option<EntityForm> {
        self.workflow.form(&self.store)
    }

    pub fn can_complete(&self) -> bool {
        self.drawing.can_complete()
    }

    pub fn handle(&mut self, event: MapEvent) -> Result<Outcome, EngineError> {
        match event {
            MapEvent::Click { at, hit } => self.handle_click(at, hit),
            MapEvent::DragEnd { id, to } => self.handle_drag(id, to),
        }
    }

    pub fn handle_click(
        &mut self,
        at: LatLon,
        hit: Option<EntityRef>,
    ) -> Result<Outcome, EngineError> {
        if !self.drawing.state().is_idle() {
            at.validate()?;
            return self.route_to_drawing(at);
        }
        let Some(entity) = hit else {
            return Ok(Outcome::Ignored);
        };
        if self.workflow.is_staged() {
            tracing::debug!(id = %entity.id, "Click on entity ignored while another is staged");
            return Ok(Outcome::Ignored);
        }
        self.workflow.open_existing(&self.store, entity)?;
        Ok(Outcome::Opened(entity))
    }

    fn route_to_drawing(&mut self, at: LatLon) -> Result<Outcome, EngineError> {
        let outcome = match self.drawing.click(at) {
            DrawStep::Ignored => Outcome::Ignored,
            DrawStep::VertexAdded { count } => Outcome::VertexAdded { count },
            DrawStep::CenterSet(center) => Outcome::CenterSet(center),
            DrawStep::Finalized(draft) => return self.stage(draft),
        };
        Ok(outcome)
    }

    fn stage(&mut self, draft: Draft) -> Result<Outcome, EngineError> {
        match self.workflow.stage_new(draft, self.clock.now()) {
            Ok(kind) => Ok(Outcome::Staged(kind)),
            Err(e) => {
                self.drawing.cancel();
                Err(e)
            }
        }
    }

    /// Move an entity so its anchor lands on `to`.
    pub fn handle_drag(&mut self, id: Uuid, to: LatLon) -> Result<Outcome, EngineError> {
        let Some(entity) = self.store.locate(id) else {
            tracing::debug!(%id, "Drag on unknown entity ignored");
            return Ok(Outcome::Ignored);
        };
        if self.workflow.editing() == Some(entity) {
            return Err(EngineError::StagedForEdit(entity));
        }
        to.validate()?;
        let Some(anchor) = self.store.anchor_of(entity) else {
            return Ok(Outcome::Ignored);
        };
        let (d_lat, d_lon) = (to.lat - anchor.lat, to.lon - anchor.lon);
        let now = self.clock.now();

        let moved = match entity.kind {
            EntityKind::Target => self.translate::<Target>(id, d_lat, d_lon, now),
            EntityKind::OwnForce => self.translate::<OwnForce>(id, d_lat, d_lon, now),
            EntityKind::Area => self.translate::<Area>(id, d_lat, d_lon, now),
        }?;
        if !moved {
            return Ok(Outcome::Ignored);
        }
        tracing::debug!(kind = %entity.kind, %id, d_lat, d_lon, "Moved entity");
        Ok(Outcome::Moved(entity))
    }

    fn translate<E: Entity>(
        &mut self,
        id: Uuid,
        d_lat: f64,
        d_lon: f64,
        now: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        self.store.update::<E>(id, |e| {
            e.translate(d_lat, d_lon);
            e.touch(now);
        })
    }

    pub fn select_tool(&mut self, tool: Tool) -> Result<Outcome, EngineError> {
        if self.workflow.is_staged() {
            return Err(EngineError::ToolBusy);
        }
        let state = self.drawing.select_tool(tool)?;
        Ok(Outcome::ToolChanged(state))
    }

    /// Finish the polygon or line being drawn and stage it.
    pub fn complete_shape(&mut self) -> Result<Outcome, EngineError> {
        let draft = self.drawing.complete()?;
        self.stage(draft)
    }

    /// Abandon an in-progress drawing. A staged drawing is left alone.
    pub fn cancel_drawing(&mut self) -> Outcome {
        if !self.drawing.state().is_collecting() {
            return Outcome::Ignored;
        }
        self.drawing.cancel();
        Outcome::Cancelled
    }

    pub fn save(&mut self, form: &EntityForm) -> Result<Outcome, EngineError> {
        let saved = self
            .workflow
            .save(&mut self.store, form, self.clock.now())?;
        self.drawing.finish();
        Ok(saved.into())
    }

    pub fn cancel_edit(&mut self) -> Outcome {
        if !self.workflow.cancel() {
            return Outcome::Ignored;
        }
        self.drawing.finish();
        Outcome::Cancelled
    }

    pub fn delete(&mut self) -> Result<Outcome, EngineError> {
        let entity = self.workflow.delete(&mut self.store)?;
        self.drawing.finish();
        Ok(Outcome::Deleted(entity))
    }

    /// Nearest committed entity within the hit tolerance of `at`.
    ///
    /// Points are hit near their position, areas near their anchor or, for
    /// circles, anywhere inside the radius.
    pub fn hit_test(&self, at: LatLon) -> Option<EntityRef> {
        let tolerance_km = self.config.hit_tolerance_m / 1000.0;
        let collections = self.store.collections();

        let points = collections
            .targets
            .iter()
            .map(|t| (t.entity_ref(), geo::distance_km(at, t.position)))
            .chain(
                collections
                    .own_forces
                    .iter()
                    .map(|f| (f.entity_ref(), geo::distance_km(at, f.position))),
            )
            .filter(|(_, d)| *d <= tolerance_km);

        let areas = collections.areas.iter().filter_map(|a| {
            let d = geo::distance_km(at, a.anchor());
            let reach = match a.geometry {
                AreaGeometry::Circle { radius_m, .. } => tolerance_km.max(radius_m / 1000.0),
                _ => tolerance_km,
            };
            (d <= reach).then_some((a.entity_ref(), d))
        });

        points
            .chain(areas)
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(entity, _)| entity)
    }

    /// Distance and bearing from one entity's anchor to another's.
    pub fn measure_between(&self, from: EntityRef, to: EntityRef) -> Option<Measurement> {
        let a = self.store.anchor_of(from)?;
        let b = self.store.anchor_of(to)?;
        Some(geo::measure(a, b))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    use crate::models::{Classification, Disposition, ForceStatus};
    use crate::staging::{AreaForm, TargetForm};
    use crate::store::MemoryStorage;

    /// Clock that advances one minute per reading.
    struct StepClock {
        minutes: Rc<Cell<i64>>,
    }

    impl Clock for StepClock {
        fn now(&self) -> DateTime<Utc> {
            let m = self.minutes.get();
            self.minutes.set(m + 1);
            DateTime::from_timestamp(1_772_000_000 + m * 60, 0).unwrap()
        }
    }

    fn engine() -> AnnotationEngine {
        engine_on(MemoryStorage::new())
    }

    fn engine_on(storage: MemoryStorage) -> AnnotationEngine {
        let clock = StepClock {
            minutes: Rc::new(Cell::new(0)),
        };
        AnnotationEngine::with_clock(
            Box::new(storage),
            EngineConfig::default(),
            Box::new(clock),
        )
    }

    fn click(engine: &mut AnnotationEngine, lat: f64, lon: f64) -> Outcome {
        engine.handle_click(LatLon::new(lat, lon), None).unwrap()
    }

    fn place_force(engine: &mut AnnotationEngine, lat: f64, lon: f64) -> EntityRef {
        engine.select_tool(Tool::OwnForce).unwrap();
        click(engine, lat, lon);
        let form = engine.form().unwrap();
        match engine.save(&form).unwrap() {
            Outcome::Committed(entity) => entity,
            other => panic!("expected commit, got {other:?}"),
        }
    }

    fn draw_square(engine: &mut AnnotationEngine) -> EntityRef {
        engine.select_tool(Tool::Polygon).unwrap();
        click(engine, 60.0, 10.0);
        click(engine, 60.0, 10.1);
        click(engine, 60.1, 10.1);
        click(engine, 60.1, 10.0);
        assert_eq!(
            engine.complete_shape().unwrap(),
            Outcome::Staged(EntityKind::Area)
        );
        let form = engine.form().unwrap();
        match engine.save(&form).unwrap() {
            Outcome::Committed(entity) => entity,
            other => panic!("expected commit, got {other:?}"),
        }
    }

    #[test]
    fn test_place_and_commit_target() {
        let mut engine = engine();
        engine.select_tool(Tool::Target).unwrap();
        assert_eq!(
            click(&mut engine, 59.91, 10.75),
            Outcome::Staged(EntityKind::Target)
        );

        let form = EntityForm::Target(TargetForm {
            name: "Bridge".into(),
            description: String::new(),
            classification: Classification::Vehicle,
            certainty: 80,
            disposition: Disposition::Hostile,
        });
        let Outcome::Committed(entity) = engine.save(&form).unwrap() else {
            panic!("expected a commit");
        };

        let targets = engine.store().all::<Target>();
        assert_eq!(targets.len(), 1);
        assert_eq!(targets[0].id, entity.id);
        assert_eq!(targets[0].position, LatLon::new(59.91, 10.75));
        assert_eq!(targets[0].classification, Classification::Vehicle);
        assert_eq!(targets[0].certainty, 80);
        assert!(engine.drawing().state().is_idle());
        assert_eq!(engine.staging(), &Staging::None);
    }

    #[test]
    fn test_circle_one_km_east() {
        let mut engine = engine();
        engine.select_tool(Tool::Circle).unwrap();
        let center = LatLon::new(60.0, 10.0);
        assert_eq!(
            engine.handle_click(center, None).unwrap(),
            Outcome::CenterSet(center)
        );
        let edge = geo::destination(center, 90.0, 1.0);
        assert_eq!(
            engine.handle_click(edge, None).unwrap(),
            Outcome::Staged(EntityKind::Area)
        );
        let form = engine.form().unwrap();
        engine.save(&form).unwrap();

        let areas = engine.store().all::<Area>();
        assert_eq!(areas.len(), 1);
        let AreaGeometry::Circle { center: c, radius_m } = areas[0].geometry else {
            panic!("expected a circle");
        };
        assert_eq!(c, center);
        assert!((radius_m - 1000.0).abs() < 0.01, "radius {radius_m}");
    }

    #[test]
    fn test_edit_own_force_status() {
        let mut engine = engine();
        let entity = place_force(&mut engine, 60.0, 10.0);
        let before = engine.store().get::<OwnForce>(entity.id).unwrap();

        let at = before.position;
        assert_eq!(
            engine.handle_click(at, Some(entity)).unwrap(),
            Outcome::Opened(entity)
        );
        let Some(EntityForm::OwnForce(mut form)) = engine.form() else {
            panic!("expected own-force form");
        };
        assert_eq!(form.status, ForceStatus::Active);
        form.status = ForceStatus::Engaged;
        assert_eq!(
            engine.save(&EntityForm::OwnForce(form)).unwrap(),
            Outcome::Updated(entity)
        );

        let after = engine.store().get::<OwnForce>(entity.id).unwrap();
        assert_eq!(after.status, ForceStatus::Engaged);
        assert_eq!(after.position, before.position);
        assert!(after.timestamp > before.timestamp);
    }

    #[test]
    fn test_drag_polygon_shifts_every_vertex() {
        let mut engine = engine();
        let entity = draw_square(&mut engine);
        let before = engine.store().get::<Area>(entity.id).unwrap();
        let anchor = before.anchor();

        let to = LatLon::new(anchor.lat + 0.01, anchor.lon + 0.01);
        assert_eq!(
            engine.handle_drag(entity.id, to).unwrap(),
            Outcome::Moved(entity)
        );

        let after = engine.store().get::<Area>(entity.id).unwrap();
        let (AreaGeometry::Polygon { vertices: old }, AreaGeometry::Polygon { vertices: new }) =
            (&before.geometry, &after.geometry)
        else {
            panic!("expected polygons");
        };
        assert_eq!(old.len(), new.len());
        for (p, q) in old.iter().zip(new) {
            assert!((q.lat - p.lat - 0.01).abs() < 1e-9);
            assert!((q.lon - p.lon - 0.01).abs() < 1e-9);
        }
        assert!(after.updated_at > before.updated_at);
    }

    #[test]
    fn test_drag_unknown_id_is_noop() {
        let mut engine = engine();
        assert_eq!(
            engine
                .handle_drag(Uuid::new_v4(), LatLon::new(1.0, 1.0))
                .unwrap(),
            Outcome::Ignored
        );
    }

    #[test]
    fn test_drag_rejected_while_open_for_edit() {
        let mut engine = engine();
        let entity = place_force(&mut engine, 60.0, 10.0);
        engine
            .handle_click(LatLon::new(60.0, 10.0), Some(entity))
            .unwrap();
        assert_eq!(
            engine.handle_drag(entity.id, LatLon::new(61.0, 10.0)),
            Err(EngineError::StagedForEdit(entity))
        );
        let f = engine.store().get::<OwnForce>(entity.id).unwrap();
        assert_eq!(f.position, LatLon::new(60.0, 10.0));
    }

    #[test]
    fn test_drag_to_invalid_position_rejected() {
        let mut engine = engine();
        let entity = place_force(&mut engine, 60.0, 10.0);
        assert!(matches!(
            engine.handle_drag(entity.id, LatLon::new(95.0, 10.0)),
            Err(EngineError::Invalid(_))
        ));
    }

    #[test]
    fn test_placement_click_outside_wgs84_rejected() {
        let mut engine = engine();
        engine.select_tool(Tool::Target).unwrap();
        assert!(matches!(
            engine.handle_click(LatLon::new(95.0, 0.0), None),
            Err(EngineError::Invalid(_))
        ));
        assert_eq!(engine.staging(), &Staging::None);
        assert_eq!(
            engine.drawing().state(),
            DrawingState::PlacingPoint(Tool::Target)
        );
        assert!(matches!(click(&mut engine, 60.0, 10.0), Outcome::Staged(_)));
    }

    #[test]
    fn test_nan_radius_click_keeps_circle_open() {
        let mut engine = engine();
        engine.select_tool(Tool::Circle).unwrap();
        click(&mut engine, 60.0, 10.0);
        assert!(matches!(
            engine.handle_click(LatLon::new(f64::NAN, 10.0), None),
            Err(EngineError::Invalid(_))
        ));
        assert_eq!(engine.staging(), &Staging::None);
        assert!(matches!(
            engine.drawing().state(),
            DrawingState::CollectingCircleRadius { .. }
        ));
    }

    #[test]
    fn test_click_on_entity_ignored_while_other_staged() {
        let mut engine = engine();
        let committed = place_force(&mut engine, 60.0, 10.0);
        engine.select_tool(Tool::Target).unwrap();
        click(&mut engine, 61.0, 11.0);
        // drawing machine is staged, so the click goes there and is dropped
        assert_eq!(
            engine
                .handle_click(LatLon::new(60.0, 10.0), Some(committed))
                .unwrap(),
            Outcome::Ignored
        );
        assert_eq!(engine.staging().kind(), Some(EntityKind::Target));
    }

    #[test]
    fn test_click_on_other_entity_while_editing_is_ignored() {
        let mut engine = engine();
        let a = place_force(&mut engine, 60.0, 10.0);
        let b = place_force(&mut engine, 61.0, 10.0);
        engine.handle_click(LatLon::new(60.0, 10.0), Some(a)).unwrap();
        assert_eq!(
            engine.handle_click(LatLon::new(61.0, 10.0), Some(b)).unwrap(),
            Outcome::Ignored
        );
        assert_eq!(engine.staging(), &Staging::EditingExisting(a));
    }

    #[test]
    fn test_tool_selection_rejected_while_editing() {
        let mut engine = engine();
        let a = place_force(&mut engine, 60.0, 10.0);
        engine.handle_click(LatLon::new(60.0, 10.0), Some(a)).unwrap();
        assert_eq!(engine.select_tool(Tool::Line), Err(EngineError::ToolBusy));
        assert_eq!(engine.cancel_edit(), Outcome::Cancelled);
        assert!(engine.select_tool(Tool::Line).is_ok());
    }

    #[test]
    fn test_cancel_staged_drawing_returns_to_idle() {
        let mut engine = engine();
        engine.select_tool(Tool::Line).unwrap();
        click(&mut engine, 1.0, 1.0);
        click(&mut engine, 1.0, 2.0);
        engine.complete_shape().unwrap();
        assert_eq!(engine.cancel_drawing(), Outcome::Ignored);
        assert_eq!(engine.cancel_edit(), Outcome::Cancelled);
        assert!(engine.drawing().state().is_idle());
        assert_eq!(engine.store().len::<Area>(), 0);
    }

    #[test]
    fn test_complete_with_too_few_points_keeps_drawing() {
        let mut engine = engine();
        engine.select_tool(Tool::Polygon).unwrap();
        click(&mut engine, 1.0, 1.0);
        click(&mut engine, 1.0, 2.0);
        assert!(!engine.can_complete());
        assert!(matches!(
            engine.complete_shape(),
            Err(EngineError::IncompleteShape { .. })
        ));
        assert_eq!(engine.drawing().points().len(), 2);
        assert_eq!(engine.cancel_drawing(), Outcome::Cancelled);
    }

    #[test]
    fn test_delete_pending_rejected_existing_removed() {
        let mut engine = engine();
        engine.select_tool(Tool::Target).unwrap();
        click(&mut engine, 1.0, 1.0);
        assert_eq!(engine.delete(), Err(EngineError::NotCommitted));
        engine.cancel_edit();

        let entity = place_force(&mut engine, 2.0, 2.0);
        engine.handle_click(LatLon::new(2.0, 2.0), Some(entity)).unwrap();
        assert_eq!(engine.delete().unwrap(), Outcome::Deleted(entity));
        assert!(!engine.store().contains(entity));
    }

    #[test]
    fn test_area_form_save_updates_name_only() {
        let mut engine = engine();
        let entity = draw_square(&mut engine);
        let before = engine.store().get::<Area>(entity.id).unwrap();
        engine
            .handle_click(before.anchor(), Some(entity))
            .unwrap();
        let form = EntityForm::Area(AreaForm {
            name: "OBJ RED".into(),
            description: "hill".into(),
            area_type: crate::models::AreaType::Objective,
        });
        engine.save(&form).unwrap();
        let after = engine.store().get::<Area>(entity.id).unwrap();
        assert_eq!(after.name, "OBJ RED");
        assert_eq!(after.geometry, before.geometry);
    }

    #[test]
    fn test_hit_test_picks_nearest_within_tolerance() {
        let mut engine = engine();
        let near = place_force(&mut engine, 60.0, 10.0);
        let _far = place_force(&mut engine, 60.0, 10.01);
        // roughly 55 m from the first, 500 m from the second
        assert_eq!(engine.hit_test(LatLon::new(60.0, 10.001)), Some(near));
        assert_eq!(engine.hit_test(LatLon::new(61.0, 10.0)), None);
    }

    #[test]
    fn test_hit_test_inside_circle() {
        let mut engine = engine();
        engine.select_tool(Tool::Circle).unwrap();
        let center = LatLon::new(60.0, 10.0);
        engine.handle_click(center, None).unwrap();
        engine
            .handle_click(geo::destination(center, 0.0, 2.0), None)
            .unwrap();
        let form = engine.form().unwrap();
        let Outcome::Committed(entity) = engine.save(&form).unwrap() else {
            panic!("expected a commit");
        };
        let inside = geo::destination(center, 45.0, 1.5);
        assert_eq!(engine.hit_test(inside), Some(entity));
    }

    #[test]
    fn test_measure_between_entities() {
        let mut engine = engine();
        let a = place_force(&mut engine, 0.0, 0.0);
        let b = place_force(&mut engine, 1.0, 0.0);
        let m = engine.measure_between(a, b).unwrap();
        assert!((m.distance_km - 111.195).abs() < 0.01);
        assert!(m.bearing_deg.abs() < 1e-9);
        let ghost = EntityRef::new(EntityKind::Target, Uuid::new_v4());
        assert!(engine.measure_between(a, ghost).is_none());
    }

    #[test]
    fn test_committed_entities_survive_restart() {
        let storage = MemoryStorage::new();
        let entity = {
            let mut engine = engine_on(storage.clone());
            place_force(&mut engine, 45.0, 5.0)
        };
        let engine = engine_on(storage);
        assert!(engine.store().contains(entity));
    }

    #[test]
    fn test_engine_config_defaults_from_partial_json() {
        let config: EngineConfig = serde_json::from_str(r#"{"hitToleranceM": 50}"#).unwrap();
        assert_eq!(config.storage_prefix, "tactical");
        assert_eq!(config.hit_tolerance_m, 50.0);
    }
}
