//! Multi-click drawing of point entities and area shapes.
//!
//! The machine owns the only point buffer. The buffer is cleared whenever the
//! tool changes, a drawing is cancelled, or a shape is finalized, so points can
//! never leak from one tool into another.

use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::geo;
use crate::models::{AreaGeometry, LatLon, ShapeKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tool {
    Target,
    OwnForce,
    Polygon,
    Line,
    Circle,
}

impl Tool {
    pub const ALL: [Self; 5] = [
        Self::Target,
        Self::OwnForce,
        Self::Polygon,
        Self::Line,
        Self::Circle,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Tool::Target => "Target",
            Tool::OwnForce => "Own Force",
            Tool::Polygon => "Polygon",
            Tool::Line => "Line",
            Tool::Circle => "Circle",
        }
    }

    /// Shape drawn by this tool, `None` for point tools.
    pub fn shape(&self) -> Option<ShapeKind> {
        match self {
            Tool::Target | Tool::OwnForce => None,
            Tool::Polygon => Some(ShapeKind::Polygon),
            Tool::Line => Some(ShapeKind::Line),
            Tool::Circle => Some(ShapeKind::Circle),
        }
    }

    fn initial_state(self) -> DrawingState {
        match self {
            Tool::Target | Tool::OwnForce => DrawingState::PlacingPoint(self),
            Tool::Polygon => DrawingState::CollectingPolygon,
            Tool::Line => DrawingState::CollectingLine,
            Tool::Circle => DrawingState::CollectingCircleCenter,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum DrawingState {
    #[default]
    Idle,
    /// Target or own-force tool armed; the next click places the point.
    PlacingPoint(Tool),
    CollectingPolygon,
    CollectingLine,
    CollectingCircleCenter,
    CollectingCircleRadius {
        center: LatLon,
    },
    /// A finished drawing sits in the edit form until it is saved or cancelled.
    Staged(Tool),
}

impl DrawingState {
    pub fn tool(&self) -> Option<Tool> {
        match self {
            DrawingState::Idle => None,
            DrawingState::PlacingPoint(tool) | DrawingState::Staged(tool) => Some(*tool),
            DrawingState::CollectingPolygon => Some(Tool::Polygon),
            DrawingState::CollectingLine => Some(Tool::Line),
            DrawingState::CollectingCircleCenter | DrawingState::CollectingCircleRadius { .. } => {
                Some(Tool::Circle)
            }
        }
    }

    pub fn is_idle(&self) -> bool {
        matches!(self, DrawingState::Idle)
    }

    /// Collecting or placing, i.e. a click would be consumed by the machine.
    pub fn is_collecting(&self) -> bool {
        !matches!(self, DrawingState::Idle | DrawingState::Staged(_))
    }
}

/// Geometry produced by a finished drawing, before it becomes an entity.
#[derive(Debug, Clone, PartialEq)]
pub enum Draft {
    Target(LatLon),
    OwnForce(LatLon),
    Area(AreaGeometry),
}

/// Result of feeding one click to the machine.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawStep {
    /// The click did not apply in the current state.
    Ignored,
    /// A vertex was appended; `count` is the new buffer length.
    VertexAdded { count: usize },
    CenterSet(LatLon),
    Finalized(Draft),
}

#[derive(Debug, Clone, Default)]
pub struct DrawingMachine {
    state: DrawingState,
    points: Vec<LatLon>,
}

impl DrawingMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> DrawingState {
        self.state
    }

    pub fn active_tool(&self) -> Option<Tool> {
        self.state.tool()
    }

    /// Vertices collected so far for a polygon or line.
    pub fn points(&self) -> &[LatLon] {
        &self.points
    }

    /// Arm `tool`, or disarm it when it is already active.
    ///
    /// Any in-progress points are discarded either way. Rejected while a
    /// finished drawing is staged.
    pub fn select_tool(&mut self, tool: Tool) -> Result<DrawingState, EngineError> {
        if let DrawingState::Staged(_) = self.state {
            return Err(EngineError::ToolBusy);
        }
        self.points.clear();
        self.state = if self.state.tool() == Some(tool) {
            DrawingState::Idle
        } else {
            tool.initial_state()
        };
        tracing::debug!(?tool, state = ?self.state, "Tool selection");
        Ok(self.state)
    }

    pub fn click(&mut self, at: LatLon) -> DrawStep {
        match self.state {
            DrawingState::Idle | DrawingState::Staged(_) => DrawStep::Ignored,
            DrawingState::PlacingPoint(tool) => {
                self.state = DrawingState::Staged(tool);
                let draft = if tool == Tool::OwnForce {
                    Draft::OwnForce(at)
                } else {
                    Draft::Target(at)
                };
                DrawStep::Finalized(draft)
            }
            DrawingState::CollectingPolygon | DrawingState::CollectingLine => {
                self.points.push(at);
                DrawStep::VertexAdded {
                    count: self.points.len(),
                }
            }
            DrawingState::CollectingCircleCenter => {
                self.state = DrawingState::CollectingCircleRadius { center: at };
                DrawStep::CenterSet(at)
            }
            DrawingState::CollectingCircleRadius { center } => {
                let radius_m = geo::distance_km(center, at) * 1000.0;
                if radius_m.is_nan() || radius_m <= 0.0 {
                    return DrawStep::Ignored;
                }
                self.state = DrawingState::Staged(Tool::Circle);
                DrawStep::Finalized(Draft::Area(AreaGeometry::Circle { center, radius_m }))
            }
        }
    }

    /// Whether `complete` would succeed right now.
    pub fn can_complete(&self) -> bool {
        match self.state {
            DrawingState::CollectingPolygon => {
                self.points.len() >= ShapeKind::Polygon.min_vertices()
            }
            DrawingState::CollectingLine => self.points.len() >= ShapeKind::Line.min_vertices(),
            _ => false,
        }
    }

    /// Finish a polygon or line from the collected vertices.
    pub fn complete(&mut self) -> Result<Draft, EngineError> {
        let (shape, tool) = match self.state {
            DrawingState::CollectingPolygon => (ShapeKind::Polygon, Tool::Polygon),
            DrawingState::CollectingLine => (ShapeKind::Line, Tool::Line),
            _ => return Err(EngineError::NotDrawing),
        };
        if !self.can_complete() {
            return Err(EngineError::IncompleteShape {
                shape,
                required: shape.min_vertices(),
                actual: self.points.len(),
            });
        }

        let vertices = std::mem::take(&mut self.points);
        self.state = DrawingState::Staged(tool);
        let geometry = match shape {
            ShapeKind::Line => AreaGeometry::Line { vertices },
            _ => AreaGeometry::Polygon { vertices },
        };
        Ok(Draft::Area(geometry))
    }

    /// Abandon whatever is being drawn.
    pub fn cancel(&mut self) {
        self.points.clear();
        self.state = DrawingState::Idle;
    }

    /// Return to idle after the staged drawing was saved or discarded.
    pub fn finish(&mut self) {
        self.cancel();
    }
}
