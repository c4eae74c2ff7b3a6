//! Draw requests handed to the map widget.

use serde::Serialize;

use crate::drawing::{DrawingMachine, DrawingState};
use crate::engine::AnnotationEngine;
use crate::geo;
use crate::grid;
use crate::models::{
    Area, AreaGeometry, AreaType, Disposition, EntityRef, ForceType, LatLon, OwnForce, Target,
};
use crate::staging::Staging;
use crate::store::{Entity, EntityStore};

pub const PREVIEW_COLOR: &str = "#ffffff";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum DrawShape {
    Marker { at: LatLon },
    Polygon { vertices: Vec<LatLon> },
    Polyline { vertices: Vec<LatLon> },
    Circle { center: LatLon, radius_m: f64 },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DrawRequest {
    /// `None` for the pending entity and the drawing preview.
    pub entity: Option<EntityRef>,
    pub shape: DrawShape,
    pub color: &'static str,
    pub label: Option<String>,
    pub staged: bool,
    pub draggable: bool,
}

pub fn disposition_color(disposition: Disposition) -> &'static str {
    match disposition {
        Disposition::Hostile => "#ff4444",
        Disposition::Neutral => "#44cc44",
        Disposition::Unknown => "#ffcc00",
    }
}

pub fn force_color(force_type: ForceType) -> &'static str {
    match force_type {
        ForceType::Infantry => "#3b82f6",
        ForceType::Vehicle => "#06b6d4",
        ForceType::Command => "#8b5cf6",
        ForceType::Support => "#14b8a6",
    }
}

pub fn area_color(area_type: AreaType) -> &'static str {
    match area_type {
        AreaType::Restricted => "#ef4444",
        AreaType::Patrol => "#3b82f6",
        AreaType::Objective => "#22c55e",
        AreaType::Hazard => "#f97316",
    }
}

fn join_label(name: &str, detail: String) -> String {
    if name.is_empty() {
        detail
    } else {
        format!("{name} {detail}")
    }
}

fn name_label(name: &str) -> Option<String> {
    (!name.is_empty()).then(|| name.to_string())
}

fn target_request(t: &Target) -> (DrawShape, &'static str, Option<String>) {
    let mgrs = grid::to_mgrs(t.position.lat, t.position.lon);
    (
        DrawShape::Marker { at: t.position },
        disposition_color(t.disposition),
        Some(join_label(&t.name, mgrs)),
    )
}

fn force_request(f: &OwnForce) -> (DrawShape, &'static str, Option<String>) {
    (
        DrawShape::Marker { at: f.position },
        force_color(f.force_type),
        name_label(&f.name),
    )
}

fn area_request(a: &Area) -> (DrawShape, &'static str, Option<String>) {
    let (shape, label) = match &a.geometry {
        AreaGeometry::Polygon { vertices } => (
            DrawShape::Polygon {
                vertices: vertices.clone(),
            },
            name_label(&a.name),
        ),
        AreaGeometry::Line { vertices } => (
            DrawShape::Polyline {
                vertices: vertices.clone(),
            },
            Some(join_label(
                &a.name,
                geo::format_distance(geo::path_length_km(vertices)),
            )),
        ),
        AreaGeometry::Circle { center, radius_m } => (
            DrawShape::Circle {
                center: *center,
                radius_m: *radius_m,
            },
            Some(join_label(
                &a.name,
                format!("r {}", geo::format_distance(radius_m / 1000.0)),
            )),
        ),
    };
    (shape, area_color(a.area_type), label)
}

fn committed<'a, E: Entity + 'a>(
    store: &'a EntityStore,
    editing: Option<EntityRef>,
    build: fn(&E) -> (DrawShape, &'static str, Option<String>),
) -> impl Iterator<Item = DrawRequest> + 'a {
    store.iter::<E>().map(move |e| {
        let entity = e.entity_ref();
        let staged = editing == Some(entity);
        let (shape, color, label) = build(e);
        DrawRequest {
            entity: Some(entity),
            shape,
            color,
            label,
            staged,
            draggable: !staged,
        }
    })
}

fn pending(staging: &Staging) -> Option<DrawRequest> {
    let (shape, color, label) = match staging {
        Staging::NewTarget(t) => target_request(t),
        Staging::NewOwnForce(f) => force_request(f),
        Staging::NewArea(a) => area_request(a),
        Staging::None | Staging::EditingExisting(_) => return None,
    };
    Some(DrawRequest {
        entity: None,
        shape,
        color,
        label,
        staged: true,
        draggable: false,
    })
}

fn preview(drawing: &DrawingMachine) -> Vec<DrawRequest> {
    let marker = |at: LatLon| DrawRequest {
        entity: None,
        shape: DrawShape::Marker { at },
        color: PREVIEW_COLOR,
        label: None,
        staged: false,
        draggable: false,
    };

    match drawing.state() {
        DrawingState::CollectingPolygon | DrawingState::CollectingLine => {
            let points = drawing.points();
            let mut requests: Vec<DrawRequest> = points.iter().copied().map(marker).collect();
            if points.len() >= 2 {
                requests.push(DrawRequest {
                    entity: None,
                    shape: DrawShape::Polyline {
                        vertices: points.to_vec(),
                    },
                    color: PREVIEW_COLOR,
                    label: None,
                    staged: false,
                    draggable: false,
                });
            }
            requests
        }
        DrawingState::CollectingCircleRadius { center } => vec![marker(center)],
        _ => Vec::new(),
    }
}

/// Everything the map should show, bottom layer first: areas, own forces,
/// targets, the pending entity, then the in-progress drawing.
pub fn draw_requests(
    store: &EntityStore,
    staging: &Staging,
    drawing: &DrawingMachine,
) -> Vec<DrawRequest> {
    let editing = match staging {
        Staging::EditingExisting(entity) => Some(*entity),
        _ => None,
    };

    let mut requests: Vec<DrawRequest> = committed::<Area>(store, editing, area_request)
        .chain(committed::<OwnForce>(store, editing, force_request))
        .chain(committed::<Target>(store, editing, target_request))
        .collect();
    requests.extend(pending(staging));
    requests.extend(preview(drawing));
    requests
}

impl AnnotationEngine {
    pub fn draw_requests(&self) -> Vec<DrawRequest> {
        draw_requests(self.store(), self.staging(), self.drawing())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drawing::Tool;
    use crate::engine::{EngineConfig, Outcome};
    use crate::models::{EntityKind, LatLon};
    use crate::staging::{EntityForm, TargetForm};
    use crate::store::MemoryStorage;

    fn engine() -> AnnotationEngine {
        AnnotationEngine::new(Box::new(MemoryStorage::new()), EngineConfig::default())
    }

    fn commit_current(engine: &mut AnnotationEngine) -> EntityRef {
        let form = engine.form().unwrap();
        let Outcome::Committed(entity) = engine.save(&form).unwrap() else {
            panic!("expected a commit");
        };
        entity
    }

    #[test]
    fn test_empty_engine_draws_nothing() {
        assert!(engine().draw_requests().is_empty());
    }

    #[test]
    fn test_layer_order() {
        let mut engine = engine();
        engine.select_tool(Tool::Target).unwrap();
        engine.handle_click(LatLon::new(0.0, 0.0), None).unwrap();
        commit_current(&mut engine);

        engine.select_tool(Tool::OwnForce).unwrap();
        engine.handle_click(LatLon::new(1.0, 1.0), None).unwrap();
        commit_current(&mut engine);

        engine.select_tool(Tool::Circle).unwrap();
        engine.handle_click(LatLon::new(2.0, 2.0), None).unwrap();
        engine.handle_click(LatLon::new(2.0, 2.01), None).unwrap();
        commit_current(&mut engine);

        engine.select_tool(Tool::Target).unwrap();
        engine.handle_click(LatLon::new(3.0, 3.0), None).unwrap();

        let kinds: Vec<_> = engine
            .draw_requests()
            .iter()
            .map(|r| r.entity.map(|e| e.kind))
            .collect();
        assert_eq!(
            kinds,
            vec![
                Some(EntityKind::Area),
                Some(EntityKind::OwnForce),
                Some(EntityKind::Target),
                None,
            ]
        );
    }

    #[test]
    fn test_target_color_and_label() {
        let mut engine = engine();
        engine.select_tool(Tool::Target).unwrap();
        engine.handle_click(LatLon::new(59.91, 10.75), None).unwrap();
        let form = EntityForm::Target(TargetForm {
            name: "Bridge".into(),
            description: String::new(),
            classification: Default::default(),
            certainty: 70,
            disposition: Disposition::Hostile,
        });
        engine.save(&form).unwrap();

        let requests = engine.draw_requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].color, "#ff4444");
        assert_eq!(requests[0].label.as_deref(), Some("Bridge 32V NM 97670 24488"));
        assert!(requests[0].draggable);
        assert!(!requests[0].staged);
    }

    #[test]
    fn test_pending_entity_is_staged_and_fixed() {
        let mut engine = engine();
        engine.select_tool(Tool::OwnForce).unwrap();
        engine.handle_click(LatLon::new(1.0, 1.0), None).unwrap();
        let requests = engine.draw_requests();
        assert_eq!(requests.len(), 1);
        assert!(requests[0].staged);
        assert!(!requests[0].draggable);
        assert_eq!(requests[0].color, force_color(ForceType::Infantry));
        assert_eq!(requests[0].label, None);
    }

    #[test]
    fn test_entity_open_for_edit_is_not_draggable() {
        let mut engine = engine();
        engine.select_tool(Tool::OwnForce).unwrap();
        engine.handle_click(LatLon::new(1.0, 1.0), None).unwrap();
        let entity = commit_current(&mut engine);
        engine
            .handle_click(LatLon::new(1.0, 1.0), Some(entity))
            .unwrap();
        let requests = engine.draw_requests();
        assert_eq!(requests.len(), 1);
        assert!(requests[0].staged);
        assert!(!requests[0].draggable);
    }

    #[test]
    fn test_polygon_preview_markers_and_outline() {
        let mut engine = engine();
        engine.select_tool(Tool::Polygon).unwrap();
        engine.handle_click(LatLon::new(0.0, 0.0), None).unwrap();
        assert_eq!(engine.draw_requests().len(), 1);
        engine.handle_click(LatLon::new(0.0, 1.0), None).unwrap();

        let requests = engine.draw_requests();
        assert_eq!(requests.len(), 3);
        assert!(requests.iter().all(|r| r.color == PREVIEW_COLOR));
        assert!(matches!(
            requests[2].shape,
            DrawShape::Polyline { ref vertices } if vertices.len() == 2
        ));
    }

    #[test]
    fn test_line_label_has_length() {
        let area = Area::drawn(
            AreaGeometry::Line {
                vertices: vec![LatLon::new(0.0, 0.0), LatLon::new(0.0, 0.005)],
            },
            chrono::Utc::now(),
        );
        let (_, color, label) = area_request(&area);
        assert_eq!(color, area_color(AreaType::Restricted));
        assert_eq!(label.as_deref(), Some("556 m"));
    }

    #[test]
    fn test_circle_label_has_radius() {
        let mut area = Area::drawn(
            AreaGeometry::Circle {
                center: LatLon::new(0.0, 0.0),
                radius_m: 1500.0,
            },
            chrono::Utc::now(),
        );
        area.name = "NFA".into();
        area.area_type = AreaType::Hazard;
        let (shape, color, label) = area_request(&area);
        assert_eq!(color, "#f97316");
        assert_eq!(label.as_deref(), Some("NFA r 1.50 km"));
        assert!(matches!(shape, DrawShape::Circle { radius_m, .. } if radius_m == 1500.0));
    }
}
