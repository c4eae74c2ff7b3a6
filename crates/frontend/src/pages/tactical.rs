use dioxus::prelude::*;
use overwatch_shared::error::EngineError;
use overwatch_shared::models::{Area, OwnForce, Target};
use overwatch_shared::staging::Staging;
use overwatch_shared::{AnnotationEngine, EngineConfig, Outcome};

use crate::api;
use crate::components::entity_form::EntityEditor;
use crate::components::map_view::MapView;
use crate::components::toolbar::Toolbar;
use crate::coords::Viewport;
use crate::storage::BrowserStorage;

/// Status line text for an applied intent, if it is worth showing.
pub fn outcome_message(outcome: &Outcome) -> Option<String> {
    match outcome {
        Outcome::Committed(e) => Some(format!("Saved new {}", e.kind)),
        Outcome::Updated(e) => Some(format!("Updated {}", e.kind)),
        Outcome::Vanished(e) => Some(format!("The {} was removed before it could be saved", e.kind)),
        Outcome::Moved(e) => Some(format!("Moved {}", e.kind)),
        Outcome::Deleted(e) => Some(format!("Deleted {}", e.kind)),
        _ => None,
    }
}

/// Log the result of an intent and surface it on the status line.
/// Rejected intents leave the engine as it was.
pub fn report(mut notice: Signal<Option<String>>, intent: &str, result: Result<Outcome, EngineError>) {
    match result {
        Ok(Outcome::Ignored) => tracing::debug!(intent, "Intent ignored"),
        Ok(outcome) => {
            tracing::debug!(intent, ?outcome, "Intent applied");
            notice.set(outcome_message(&outcome));
        }
        Err(e) => {
            tracing::warn!(intent, "Intent rejected: {e}");
            notice.set(Some(e.to_string()));
        }
    }
}

/// Component key for the edit form; changes whenever a different entity is staged.
pub fn staging_key(staging: &Staging) -> String {
    match staging {
        Staging::None => "none".to_string(),
        Staging::NewTarget(t) => format!("new-{}", t.id),
        Staging::NewOwnForce(f) => format!("new-{}", f.id),
        Staging::NewArea(a) => format!("new-{}", a.id),
        Staging::EditingExisting(e) => format!("edit-{}", e.id),
    }
}

#[component]
pub fn Tactical() -> Element {
    let engine = use_signal(|| {
        let config = EngineConfig::default();
        let storage = BrowserStorage::new(config.storage_prefix.clone(), true);
        AnnotationEngine::new(Box::new(storage), config)
    });
    let viewport = use_signal(Viewport::default);
    let notice = use_signal(|| None::<String>);
    let server_stats = use_resource(|| api::fetch_stats());

    let (targets, forces, areas) = {
        let eng = engine.read();
        let store = eng.store();
        (store.len::<Target>(), store.len::<OwnForce>(), store.len::<Area>())
    };
    let editor = {
        let eng = engine.read();
        eng.form().map(|form| (staging_key(eng.staging()), form, eng.staging().is_new()))
    };
    let server_line = match &*server_stats.read() {
        Some(Ok(s)) => format!(
            "Server: {} targets, {} own forces, {} areas",
            s.targets, s.own_forces, s.areas
        ),
        Some(Err(_)) => "Server unreachable, working locally".to_string(),
        None => "Contacting server...".to_string(),
    };

    rsx! {
        div { class: "app",
            header { class: "app-header",
                h1 { "Overwatch" }
                span { class: "counts", "{targets} targets · {forces} own forces · {areas} areas" }
            }
            div { class: "layout",
                aside { class: "sidebar",
                    Toolbar { engine, notice }
                    if let Some((key, form, is_new)) = editor {
                        EntityEditor { key: "{key}", engine, notice, initial: form, is_new }
                    }
                    if let Some(message) = notice.read().clone() {
                        div { class: "notice", "{message}" }
                    }
                    div { class: "server-status", "{server_line}" }
                }
                main { class: "map-panel",
                    MapView { engine, viewport, notice }
                }
            }
        }
    }
}
