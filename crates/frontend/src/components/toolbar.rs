use dioxus::prelude::*;
use overwatch_shared::drawing::{DrawingState, Tool};
use overwatch_shared::AnnotationEngine;

use crate::pages::tactical::report;

/// Short instruction for the current drawing state.
pub fn drawing_hint(state: DrawingState, points: usize) -> String {
    match state {
        DrawingState::Idle => "Select a tool, or click an annotation to edit it".to_string(),
        DrawingState::PlacingPoint(tool) => format!("Click the map to place the {}", tool.label()),
        DrawingState::CollectingPolygon => {
            format!("Click to add vertices ({points} so far, 3 needed)")
        }
        DrawingState::CollectingLine => format!("Click to add points ({points} so far, 2 needed)"),
        DrawingState::CollectingCircleCenter => "Click the circle center".to_string(),
        DrawingState::CollectingCircleRadius { .. } => "Click to set the radius".to_string(),
        DrawingState::Staged(_) => "Fill in the details and save".to_string(),
    }
}

#[component]
pub fn Toolbar(engine: Signal<AnnotationEngine>, notice: Signal<Option<String>>) -> Element {
    let state = engine.read().drawing().state();
    let points = engine.read().drawing().points().len();
    let active = state.tool();
    let can_complete = engine.read().can_complete();
    let collecting = state.is_collecting();
    let hint = drawing_hint(state, points);

    rsx! {
        div { class: "panel toolbar",
            h3 { "Tools" }
            div { class: "tool-buttons",
                for tool in Tool::ALL {
                    button {
                        class: if active == Some(tool) { "tool active" } else { "tool" },
                        onclick: move |_| {
                            let result = engine.write().select_tool(tool);
                            report(notice, "select tool", result);
                        },
                        {tool.label()}
                    }
                }
            }
            div { class: "tool-actions",
                button {
                    disabled: !can_complete,
                    onclick: move |_| {
                        let result = engine.write().complete_shape();
                        report(notice, "complete shape", result);
                    },
                    "Complete"
                }
                button {
                    class: "secondary",
                    disabled: !collecting,
                    onclick: move |_| {
                        let outcome = engine.write().cancel_drawing();
                        report(notice, "cancel drawing", Ok(outcome));
                    },
                    "Cancel"
                }
            }
            p { class: "hint", "{hint}" }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use overwatch_shared::models::LatLon;

    #[test]
    fn test_hint_counts_polygon_vertices() {
        let hint = drawing_hint(DrawingState::CollectingPolygon, 2);
        assert!(hint.contains("2 so far"));
    }

    #[test]
    fn test_hint_names_point_tool() {
        let hint = drawing_hint(DrawingState::PlacingPoint(Tool::OwnForce), 0);
        assert!(hint.contains(Tool::OwnForce.label()));
    }

    #[test]
    fn test_hint_for_circle_radius() {
        let state = DrawingState::CollectingCircleRadius {
            center: LatLon::new(60.0, 10.0),
        };
        assert_eq!(drawing_hint(state, 0), "Click to set the radius");
    }
}
