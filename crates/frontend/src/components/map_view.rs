use dioxus::html::geometry::WheelDelta;
use dioxus::html::input_data::MouseButton;
use dioxus::prelude::*;
use overwatch_shared::geo;
use overwatch_shared::models::{EntityRef, LatLon};
use overwatch_shared::render::{DrawRequest, DrawShape};
use overwatch_shared::staging::Staging;
use overwatch_shared::{AnnotationEngine, MapEvent};

use crate::coords::{self, Viewport};
use crate::pages::tactical::report;

const MAP_CONTAINER_ID: &str = "tactical-map-container";

/// Drag threshold in pixels; movement below this is treated as a click.
const DRAG_THRESHOLD: f64 = 3.0;

const ZOOM_STEP: f64 = 1.1;

const MARKER_RADIUS: f64 = 7.0;
const LABEL_OFFSET: f64 = 10.0;
const AREA_FILL_OPACITY: f64 = 0.2;

/// Minimum on-screen spacing between graticule lines.
const GRATICULE_MIN_PX: f64 = 80.0;

const GRATICULE_STEPS_DEG: [f64; 13] = [
    10.0, 5.0, 2.0, 1.0, 0.5, 0.2, 0.1, 0.05, 0.02, 0.01, 0.005, 0.002, 0.001,
];

/// Fallback container size before the element is mounted.
const DEFAULT_SIZE: (f64, f64) = (960.0, 640.0);

// ---------------------------------------------------------------------------
// Pure helpers
// ---------------------------------------------------------------------------

/// Convert a wheel delta (pixels / lines / pages) to a uniform pixel-like value.
fn wheel_delta_y(delta: WheelDelta) -> f64 {
    match delta {
        WheelDelta::Pixels(d) => d.y,
        WheelDelta::Lines(d) => d.y * 40.0,
        WheelDelta::Pages(d) => d.y * 400.0,
    }
}

/// Largest graticule step that still leaves `GRATICULE_MIN_PX` between lines.
fn graticule_step(px_per_deg: f64) -> f64 {
    GRATICULE_STEPS_DEG
        .iter()
        .copied()
        .rev()
        .find(|step| step * px_per_deg >= GRATICULE_MIN_PX)
        .unwrap_or(GRATICULE_STEPS_DEG[0])
}

/// Committed entities can be dragged unless they are open in the form.
fn is_grabbable(staging: &Staging, entity: EntityRef) -> bool {
    !matches!(staging, Staging::EditingExisting(e) if *e == entity)
}

/// New anchor for a drag that grabbed the entity at `start` and let go at `end`.
fn drag_destination(anchor: LatLon, start: LatLon, end: LatLon) -> LatLon {
    anchor.offset(end.lat - start.lat, end.lon - start.lon)
}

fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

/// Where a shape's label sits.
fn label_anchor(shape: &DrawShape) -> Option<LatLon> {
    match shape {
        DrawShape::Marker { at } => Some(*at),
        DrawShape::Polygon { vertices } => geo::centroid(vertices),
        DrawShape::Polyline { vertices } => geo::midpoint(vertices),
        DrawShape::Circle { center, .. } => Some(*center),
    }
}

// ---------------------------------------------------------------------------
// SVG builder
// ---------------------------------------------------------------------------

struct Projector<'a> {
    viewport: &'a Viewport,
    width: f64,
    height: f64,
}

impl Projector<'_> {
    fn px(&self, p: LatLon) -> (f64, f64) {
        self.viewport.project(p, self.width, self.height)
    }

    fn points(&self, vertices: &[LatLon]) -> String {
        vertices
            .iter()
            .map(|v| {
                let (x, y) = self.px(*v);
                format!("{x},{y}")
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Build the full SVG content, in container pixel space.
fn build_svg_content(
    requests: &[DrawRequest],
    viewport: &Viewport,
    width: f64,
    height: f64,
) -> String {
    let mut svg = String::with_capacity(8192);
    let proj = Projector {
        viewport,
        width,
        height,
    };

    build_graticule(&mut svg, &proj);
    for req in requests {
        build_shape(&mut svg, req, &proj);
    }
    for req in requests {
        build_label(&mut svg, req, &proj);
    }
    svg
}

fn build_graticule(svg: &mut String, proj: &Projector) {
    let step = graticule_step(proj.viewport.px_per_deg);
    let nw = proj.viewport.unproject(0.0, 0.0, proj.width, proj.height);
    let se = proj
        .viewport
        .unproject(proj.width, proj.height, proj.width, proj.height);

    let mut lon = (nw.lon / step).ceil() * step;
    while lon <= se.lon {
        let (x, _) = proj.px(LatLon::new(nw.lat, lon));
        svg.push_str(&format!(
            r#"<line x1="{x}" y1="0" x2="{x}" y2="{}" stroke="rgba(255,255,255,0.12)" stroke-width="1"/>"#,
            proj.height
        ));
        lon += step;
    }
    let mut lat = (se.lat / step).ceil() * step;
    while lat <= nw.lat {
        let (_, y) = proj.px(LatLon::new(lat, nw.lon));
        svg.push_str(&format!(
            r#"<line x1="0" y1="{y}" x2="{}" y2="{y}" stroke="rgba(255,255,255,0.12)" stroke-width="1"/>"#,
            proj.width
        ));
        lat += step;
    }
}

fn build_shape(svg: &mut String, req: &DrawRequest, proj: &Projector) {
    let color = req.color;
    let dash = if req.staged {
        r#" stroke-dasharray="6 4""#
    } else {
        ""
    };

    match &req.shape {
        DrawShape::Marker { at } => {
            let (x, y) = proj.px(*at);
            svg.push_str(&format!(
                r##"<circle cx="{x}" cy="{y}" r="{MARKER_RADIUS}" fill="{color}" stroke="#111"{dash} stroke-width="2"/>"##
            ));
        }
        DrawShape::Polygon { vertices } => {
            let points = proj.points(vertices);
            svg.push_str(&format!(
                r#"<polygon points="{points}" fill="{color}" fill-opacity="{AREA_FILL_OPACITY}" stroke="{color}"{dash} stroke-width="2"/>"#
            ));
        }
        DrawShape::Polyline { vertices } => {
            let points = proj.points(vertices);
            svg.push_str(&format!(
                r#"<polyline points="{points}" fill="none" stroke="{color}"{dash} stroke-width="3"/>"#
            ));
        }
        DrawShape::Circle { center, radius_m } => {
            let (x, y) = proj.px(*center);
            let r = proj.viewport.meters_to_px(*radius_m);
            svg.push_str(&format!(
                r#"<circle cx="{x}" cy="{y}" r="{r}" fill="{color}" fill-opacity="{AREA_FILL_OPACITY}" stroke="{color}"{dash} stroke-width="2"/>"#
            ));
        }
    }
}

fn build_label(svg: &mut String, req: &DrawRequest, proj: &Projector) {
    let Some(label) = req.label.as_deref() else {
        return;
    };
    let Some(at) = label_anchor(&req.shape) else {
        return;
    };
    let (x, y) = proj.px(at);
    let (tx, ty) = (x + LABEL_OFFSET, y - LABEL_OFFSET);
    let text = escape_xml(label);
    svg.push_str(&format!(
        r##"<text x="{tx}" y="{ty}" fill="{}" stroke="#111" stroke-width="3" paint-order="stroke" font-size="12" font-family="monospace">{text}</text>"##,
        req.color
    ));
}

// ---------------------------------------------------------------------------
// DOM helpers
// ---------------------------------------------------------------------------

fn container_size() -> (f64, f64) {
    coords::container_size(MAP_CONTAINER_ID).unwrap_or(DEFAULT_SIZE)
}

fn container_origin() -> Option<(f64, f64)> {
    let document = web_sys::window()?.document()?;
    let rect = document
        .get_element_by_id(MAP_CONTAINER_ID)?
        .get_bounding_client_rect();
    Some((rect.left(), rect.top()))
}

// ---------------------------------------------------------------------------
// Component
// ---------------------------------------------------------------------------

/// An entity grabbed on mouse down, with the position it was grabbed at.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Grab {
    entity: EntityRef,
    start: LatLon,
}

#[component]
pub fn MapView(
    engine: Signal<AnnotationEngine>,
    viewport: Signal<Viewport>,
    notice: Signal<Option<String>>,
) -> Element {
    let mut is_dragging = use_signal(|| false);
    let mut did_drag = use_signal(|| false);
    let mut drag_start = use_signal(|| (0.0_f64, 0.0_f64));
    let mut drag_start_viewport = use_signal(Viewport::default);
    let mut grab = use_signal(|| None::<Grab>);
    let mut cursor = use_signal(|| None::<LatLon>);

    let svg_html = use_memo(move || {
        let requests = engine.read().draw_requests();
        let vp = *viewport.read();
        let (w, h) = container_size();
        let content = build_svg_content(&requests, &vp, w, h);
        format!(
            r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 {w} {h}" style="position:absolute;top:0;left:0;width:100%;height:100%;pointer-events:none;">{content}</svg>"#
        )
    });

    let collecting = engine.read().drawing().state().is_collecting();
    let container_class = if *is_dragging.read() && *did_drag.read() {
        "map-container dragging"
    } else if collecting {
        "map-container drawing"
    } else {
        "map-container"
    };
    let cursor_readout = (*cursor.read()).map(|p| {
        (
            format!("{:.5}, {:.5}", p.lat, p.lon),
            coords::format_grid(p),
        )
    });

    rsx! {
        div {
            id: MAP_CONTAINER_ID,
            class: "{container_class}",

            onwheel: move |evt: Event<WheelData>| {
                evt.prevent_default();
                let Some((left, top)) = container_origin() else { return };
                let delta_y = wheel_delta_y(evt.data().delta());
                let factor = if delta_y < 0.0 { ZOOM_STEP } else { 1.0 / ZOOM_STEP };
                let client = evt.data().client_coordinates();
                let (cx, cy) = coords::client_to_container(client.x, client.y, left, top);
                let (w, h) = container_size();
                let zoomed = viewport.read().zoomed_at(factor, cx, cy, w, h);
                viewport.set(zoomed);
            },

            onmousedown: move |evt: Event<MouseData>| {
                if evt.trigger_button() != Some(MouseButton::Primary) {
                    return;
                }
                let client = evt.client_coordinates();
                is_dragging.set(true);
                did_drag.set(false);
                drag_start.set((client.x, client.y));
                drag_start_viewport.set(*viewport.read());

                let vp = *viewport.read();
                let grabbed = coords::click_to_latlon(client.x, client.y, MAP_CONTAINER_ID, &vp)
                    .and_then(|at| {
                        let eng = engine.read();
                        if !eng.drawing().state().is_idle() {
                            return None;
                        }
                        eng.hit_test(at)
                            .filter(|hit| is_grabbable(eng.staging(), *hit))
                            .map(|entity| Grab { entity, start: at })
                    });
                grab.set(grabbed);
            },

            onmousemove: move |evt: Event<MouseData>| {
                let client = evt.client_coordinates();
                let vp = *viewport.read();
                cursor.set(coords::click_to_latlon(client.x, client.y, MAP_CONTAINER_ID, &vp));

                if !*is_dragging.read() {
                    return;
                }
                let (sx, sy) = *drag_start.read();
                let (dx, dy) = (client.x - sx, client.y - sy);
                if !*did_drag.read() && (dx.abs() > DRAG_THRESHOLD || dy.abs() > DRAG_THRESHOLD) {
                    did_drag.set(true);
                }
                // Grabbed entities move on release; only the map pans live
                if *did_drag.read() && grab.read().is_none() {
                    let panned = drag_start_viewport.read().panned(dx, dy);
                    viewport.set(panned);
                }
            },

            onmouseup: move |evt: Event<MouseData>| {
                let was_dragging = *is_dragging.read();
                let was_drag = *did_drag.read();
                let grabbed = *grab.read();
                is_dragging.set(false);
                grab.set(None);
                if !was_dragging {
                    return;
                }

                let client = evt.client_coordinates();
                let vp = *viewport.read();
                let Some(at) = coords::click_to_latlon(client.x, client.y, MAP_CONTAINER_ID, &vp) else {
                    return;
                };

                if !was_drag {
                    let hit = engine.read().hit_test(at);
                    let result = engine.write().handle(MapEvent::Click { at, hit });
                    report(notice, "click", result);
                } else if let Some(Grab { entity, start }) = grabbed {
                    let anchor = engine.read().store().anchor_of(entity);
                    if let Some(anchor) = anchor {
                        let to = drag_destination(anchor, start, at);
                        let result = engine.write().handle(MapEvent::DragEnd { id: entity.id, to });
                        report(notice, "drag", result);
                    }
                }
            },

            onmouseleave: move |_| {
                is_dragging.set(false);
                grab.set(None);
                cursor.set(None);
            },

            ondoubleclick: move |evt: Event<MouseData>| {
                evt.prevent_default();
                viewport.set(Viewport::default());
            },

            div {
                dangerous_inner_html: "{svg_html}",
                style: "position:absolute;top:0;left:0;width:100%;height:100%;pointer-events:none;",
            }

            div { class: "coord-readout",
                if let Some((latlon, mgrs)) = cursor_readout {
                    span { class: "coord-tag", "{latlon}" }
                    span { class: "coord-tag grid-tag", "{mgrs}" }
                }
            }
        }
    }
}
