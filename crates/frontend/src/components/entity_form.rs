use std::fmt::Display;
use std::str::FromStr;

use dioxus::prelude::*;
use overwatch_shared::geo;
use overwatch_shared::models::{
    AreaType, Classification, Disposition, EntityKind, EntityRef, ForceStatus, ForceType, OwnForce,
    MAX_CERTAINTY,
};
use overwatch_shared::staging::{EntityForm, Staging};
use overwatch_shared::store::Entity;
use overwatch_shared::AnnotationEngine;

use crate::coords;
use crate::pages::tactical::report;

fn kind_title(kind: EntityKind) -> &'static str {
    match kind {
        EntityKind::Target => "Target",
        EntityKind::OwnForce => "Own Force",
        EntityKind::Area => "Area",
    }
}

/// Closest own force to `entity`, as "name: distance cardinal".
pub fn nearest_own_force(engine: &AnnotationEngine, entity: EntityRef) -> Option<String> {
    engine
        .store()
        .iter::<OwnForce>()
        .filter(|f| f.entity_ref() != entity)
        .filter_map(|f| {
            let m = engine.measure_between(entity, f.entity_ref())?;
            Some((f, m))
        })
        .min_by(|a, b| a.1.distance_km.total_cmp(&b.1.distance_km))
        .map(|(f, m)| {
            let name = if f.name.is_empty() { "unnamed" } else { &f.name };
            format!(
                "{name}: {} {}",
                geo::format_distance(m.distance_km),
                geo::cardinal(m.bearing_deg)
            )
        })
}

fn enum_select<T>(
    label: &'static str,
    current: T,
    all: &[T],
    mut on_pick: impl FnMut(T) + 'static,
) -> Element
where
    T: Copy + PartialEq + Display + FromStr + 'static,
{
    let options: Vec<(String, bool)> = all
        .iter()
        .map(|v| (v.to_string(), *v == current))
        .collect();
    rsx! {
        label { class: "field",
            span { "{label}" }
            select {
                onchange: move |evt: Event<FormData>| {
                    if let Ok(value) = evt.value().parse::<T>() {
                        on_pick(value);
                    }
                },
                for (value, selected) in options {
                    option { value: "{value}", selected: selected, "{value}" }
                }
            }
        }
    }
}

/// Edit form for the staged entity. Keyed by the caller so a new staging
/// starts from fresh values.
#[component]
pub fn EntityEditor(
    engine: Signal<AnnotationEngine>,
    notice: Signal<Option<String>>,
    initial: EntityForm,
    is_new: bool,
) -> Element {
    let mut draft = use_signal(|| initial.clone());

    let kind = draft.read().kind();
    let title = if is_new {
        format!("New {}", kind_title(kind))
    } else {
        format!("Edit {}", kind_title(kind))
    };

    let editing = engine.read().staging().clone();
    let details = match editing {
        Staging::EditingExisting(entity) => {
            let eng = engine.read();
            let grid = eng.store().anchor_of(entity).map(coords::format_grid);
            let nearest = match entity.kind {
                EntityKind::OwnForce => None,
                _ => nearest_own_force(&eng, entity),
            };
            Some((grid, nearest))
        }
        _ => None,
    };

    let fields = match draft.read().clone() {
        EntityForm::Target(t) => rsx! {
            label { class: "field",
                span { "Name" }
                input {
                    r#type: "text",
                    value: "{t.name}",
                    oninput: move |evt: Event<FormData>| {
                        if let EntityForm::Target(f) = &mut *draft.write() {
                            f.name = evt.value();
                        }
                    },
                }
            }
            label { class: "field",
                span { "Description" }
                textarea {
                    value: "{t.description}",
                    oninput: move |evt: Event<FormData>| {
                        if let EntityForm::Target(f) = &mut *draft.write() {
                            f.description = evt.value();
                        }
                    },
                }
            }
            {enum_select("Classification", t.classification, &Classification::ALL, move |v| {
                if let EntityForm::Target(f) = &mut *draft.write() {
                    f.classification = v;
                }
            })}
            {enum_select("Disposition", t.disposition, &Disposition::ALL, move |v| {
                if let EntityForm::Target(f) = &mut *draft.write() {
                    f.disposition = v;
                }
            })}
            label { class: "field",
                span { "Certainty ({t.certainty}%)" }
                input {
                    r#type: "range",
                    min: "0",
                    max: "{MAX_CERTAINTY}",
                    value: "{t.certainty}",
                    oninput: move |evt: Event<FormData>| {
                        if let Ok(v) = evt.value().parse::<u8>() {
                            if let EntityForm::Target(f) = &mut *draft.write() {
                                f.certainty = v.min(MAX_CERTAINTY);
                            }
                        }
                    },
                }
            }
        },
        EntityForm::OwnForce(o) => rsx! {
            label { class: "field",
                span { "Name" }
                input {
                    r#type: "text",
                    value: "{o.name}",
                    oninput: move |evt: Event<FormData>| {
                        if let EntityForm::OwnForce(f) = &mut *draft.write() {
                            f.name = evt.value();
                        }
                    },
                }
            }
            {enum_select("Type", o.force_type, &ForceType::ALL, move |v| {
                if let EntityForm::OwnForce(f) = &mut *draft.write() {
                    f.force_type = v;
                }
            })}
            {enum_select("Status", o.status, &ForceStatus::ALL, move |v| {
                if let EntityForm::OwnForce(f) = &mut *draft.write() {
                    f.status = v;
                }
            })}
        },
        EntityForm::Area(a) => rsx! {
            label { class: "field",
                span { "Name" }
                input {
                    r#type: "text",
                    value: "{a.name}",
                    oninput: move |evt: Event<FormData>| {
                        if let EntityForm::Area(f) = &mut *draft.write() {
                            f.name = evt.value();
                        }
                    },
                }
            }
            label { class: "field",
                span { "Description" }
                textarea {
                    value: "{a.description}",
                    oninput: move |evt: Event<FormData>| {
                        if let EntityForm::Area(f) = &mut *draft.write() {
                            f.description = evt.value();
                        }
                    },
                }
            }
            {enum_select("Type", a.area_type, &AreaType::ALL, move |v| {
                if let EntityForm::Area(f) = &mut *draft.write() {
                    f.area_type = v;
                }
            })}
        },
    };

    rsx! {
        div { class: "panel entity-form",
            h3 { "{title}" }
            if let Some((grid, nearest)) = details {
                div { class: "entity-details",
                    if let Some(grid) = grid {
                        div { class: "coord-tag grid-tag", "{grid}" }
                    }
                    if let Some(nearest) = nearest {
                        div { class: "nearest", "Nearest own force {nearest}" }
                    }
                }
            }
            {fields}
            div { class: "form-actions",
                button {
                    onclick: move |_| {
                        let form = draft.read().clone();
                        let result = engine.write().save(&form);
                        report(notice, "save", result);
                    },
                    "Save"
                }
                button {
                    class: "secondary",
                    onclick: move |_| {
                        let outcome = engine.write().cancel_edit();
                        report(notice, "cancel edit", Ok(outcome));
                    },
                    "Cancel"
                }
                if !is_new {
                    button {
                        class: "danger",
                        onclick: move |_| {
                            let result = engine.write().delete();
                            report(notice, "delete", result);
                        },
                        "Delete"
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use overwatch_shared::drawing::Tool;
    use overwatch_shared::models::LatLon;
    use overwatch_shared::staging::OwnForceForm;
    use overwatch_shared::{EngineConfig, MapEvent, MemoryStorage, Outcome};

    fn engine() -> AnnotationEngine {
        AnnotationEngine::new(Box::new(MemoryStorage::new()), EngineConfig::default())
    }

    fn place(engine: &mut AnnotationEngine, tool: Tool, at: LatLon, name: &str) -> EntityRef {
        engine.select_tool(tool).unwrap();
        engine.handle(MapEvent::Click { at, hit: None }).unwrap();
        let mut form = engine.form().unwrap();
        match &mut form {
            EntityForm::Target(t) => t.name = name.to_string(),
            EntityForm::OwnForce(o) => o.name = name.to_string(),
            EntityForm::Area(a) => a.name = name.to_string(),
        }
        match engine.save(&form).unwrap() {
            Outcome::Committed(entity) => entity,
            other => panic!("expected commit, got {other:?}"),
        }
    }

    #[test]
    fn test_nearest_own_force_picks_closest() {
        let mut engine = engine();
        let target = place(&mut engine, Tool::Target, LatLon::new(60.0, 10.0), "T1");
        place(&mut engine, Tool::OwnForce, LatLon::new(60.1, 10.0), "Far");
        place(&mut engine, Tool::OwnForce, LatLon::new(60.01, 10.0), "Near");

        let nearest = nearest_own_force(&engine, target).unwrap();
        assert!(nearest.starts_with("Near: "), "got {nearest}");
        assert!(nearest.ends_with(" N"), "got {nearest}");
    }

    #[test]
    fn test_nearest_own_force_none_without_forces() {
        let mut engine = engine();
        let target = place(&mut engine, Tool::Target, LatLon::new(60.0, 10.0), "T1");
        assert_eq!(nearest_own_force(&engine, target), None);
    }

    #[test]
    fn test_nearest_own_force_skips_itself() {
        let mut engine = engine();
        let only = place(&mut engine, Tool::OwnForce, LatLon::new(60.0, 10.0), "");
        assert_eq!(nearest_own_force(&engine, only), None);
    }

    #[test]
    fn test_kind_titles() {
        assert_eq!(kind_title(EntityKind::OwnForce), "Own Force");
        let form = EntityForm::OwnForce(OwnForceForm {
            name: String::new(),
            force_type: ForceType::Infantry,
            status: ForceStatus::Active,
        });
        assert_eq!(kind_title(form.kind()), "Own Force");
    }
}
