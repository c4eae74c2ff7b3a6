use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ValidationError;
use crate::geo;

/// Certainty given to a freshly placed target.
pub const DEFAULT_CERTAINTY: u8 = 50;

pub const MAX_CERTAINTY: u8 = 100;

/// WGS84 position in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLon {
    pub lat: f64,
    pub lon: f64,
}

impl LatLon {
    pub const fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Latitude within [-90, 90] and longitude within [-180, 180].
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lon.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lon)
    }

    pub fn offset(self, d_lat: f64, d_lon: f64) -> Self {
        Self {
            lat: self.lat + d_lat,
            lon: self.lon + d_lon,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.is_valid() {
            Ok(())
        } else {
            Err(ValidationError::InvalidPosition {
                lat: self.lat,
                lon: self.lon,
            })
        }
    }
}

impl std::fmt::Display for LatLon {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.5}, {:.5}", self.lat, self.lon)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Classification {
    Personnel,
    Vehicle,
    Building,
    Equipment,
    #[default]
    Unknown,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Disposition {
    Hostile,
    #[default]
    Unknown,
    Neutral,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ForceType {
    #[default]
    Infantry,
    Vehicle,
    Command,
    Support,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ForceStatus {
    #[default]
    Active,
    Standby,
    Moving,
    Engaged,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AreaType {
    #[default]
    Restricted,
    Patrol,
    Objective,
    Hazard,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShapeKind {
    Polygon,
    Circle,
    Line,
}

impl ShapeKind {
    /// Fewest vertices a finished shape of this kind may hold.
    pub const fn min_vertices(self) -> usize {
        match self {
            ShapeKind::Polygon => 3,
            ShapeKind::Line => 2,
            ShapeKind::Circle => 1,
        }
    }
}

macro_rules! display_lowercase {
    ($($ty:ty { $($variant:ident => $label:literal),+ $(,)? })+) => {
        $(
            impl std::fmt::Display for $ty {
                fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                    let label = match self {
                        $(Self::$variant => $label,)+
                    };
                    f.write_str(label)
                }
            }

            impl std::str::FromStr for $ty {
                type Err = String;

                fn from_str(s: &str) -> Result<Self, Self::Err> {
                    match s {
                        $($label => Ok(Self::$variant),)+
                        other => Err(format!("unknown {}: {other}", stringify!($ty))),
                    }
                }
            }
        )+
    };
}

display_lowercase! {
    Classification { Personnel => "personnel", Vehicle => "vehicle", Building => "building", Equipment => "equipment", Unknown => "unknown" }
    Disposition { Hostile => "hostile", Unknown => "unknown", Neutral => "neutral" }
    ForceType { Infantry => "infantry", Vehicle => "vehicle", Command => "command", Support => "support" }
    ForceStatus { Active => "active", Standby => "standby", Moving => "moving", Engaged => "engaged" }
    AreaType { Restricted => "restricted", Patrol => "patrol", Objective => "objective", Hazard => "hazard" }
    ShapeKind { Polygon => "polygon", Circle => "circle", Line => "line" }
}

impl Classification {
    pub const ALL: [Self; 5] = [
        Self::Personnel,
        Self::Vehicle,
        Self::Building,
        Self::Equipment,
        Self::Unknown,
    ];
}

impl Disposition {
    pub const ALL: [Self; 3] = [Self::Hostile, Self::Unknown, Self::Neutral];
}

impl ForceType {
    pub const ALL: [Self; 4] = [Self::Infantry, Self::Vehicle, Self::Command, Self::Support];
}

impl ForceStatus {
    pub const ALL: [Self; 4] = [Self::Active, Self::Standby, Self::Moving, Self::Engaged];
}

impl AreaType {
    pub const ALL: [Self; 4] = [Self::Restricted, Self::Patrol, Self::Objective, Self::Hazard];
}

/// Shape-specific geometry of an area. The variant is fixed at creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "shape", rename_all = "lowercase")]
pub enum AreaGeometry {
    Polygon {
        vertices: Vec<LatLon>,
    },
    Line {
        vertices: Vec<LatLon>,
    },
    Circle {
        center: LatLon,
        #[serde(rename = "radiusM")]
        radius_m: f64,
    },
}

impl AreaGeometry {
    pub fn kind(&self) -> ShapeKind {
        match self {
            AreaGeometry::Polygon { .. } => ShapeKind::Polygon,
            AreaGeometry::Line { .. } => ShapeKind::Line,
            AreaGeometry::Circle { .. } => ShapeKind::Circle,
        }
    }

    /// Drag anchor: centroid for polygons, midpoint for lines, center for circles.
    pub fn anchor(&self) -> LatLon {
        let anchor = match self {
            AreaGeometry::Polygon { vertices } => geo::centroid(vertices),
            AreaGeometry::Line { vertices } => geo::midpoint(vertices),
            AreaGeometry::Circle { center, .. } => Some(*center),
        };
        // Validated geometry is never empty; an unvalidated one anchors at the origin.
        anchor.unwrap_or(LatLon::new(0.0, 0.0))
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        match self {
            AreaGeometry::Polygon { vertices } | AreaGeometry::Line { vertices } => {
                let required = self.kind().min_vertices();
                if vertices.len() < required {
                    return Err(ValidationError::TooFewVertices {
                        shape: self.kind(),
                        required,
                        actual: vertices.len(),
                    });
                }
                vertices.iter().try_for_each(LatLon::validate)
            }
            AreaGeometry::Circle { center, radius_m } => {
                center.validate()?;
                if radius_m.is_finite() && *radius_m > 0.0 {
                    Ok(())
                } else {
                    Err(ValidationError::NonPositiveRadius(*radius_m))
                }
            }
        }
    }
}

/// A tracked object of interest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Target {
    pub id: Uuid,
    pub name: String,
    pub position: LatLon,
    pub description: String,
    pub classification: Classification,
    pub certainty: u8,
    pub disposition: Disposition,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Target {
    /// A target at `position` with default attributes and a fresh id.
    pub fn placed(position: LatLon, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: String::new(),
            position,
            description: String::new(),
            classification: Classification::default(),
            certainty: DEFAULT_CERTAINTY,
            disposition: Disposition::default(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        self.position.validate()?;
        if self.certainty > MAX_CERTAINTY {
            return Err(ValidationError::CertaintyOutOfRange(self.certainty));
        }
        Ok(())
    }
}

/// A friendly asset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnForce {
    pub id: Uuid,
    pub name: String,
    pub position: LatLon,
    #[serde(rename = "type")]
    pub force_type: ForceType,
    pub status: ForceStatus,
    pub timestamp: DateTime<Utc>,
}

impl OwnForce {
    pub fn placed(position: LatLon, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: String::new(),
            position,
            force_type: ForceType::default(),
            status: ForceStatus::default(),
            timestamp: now,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        self.position.validate()
    }
}

/// A region of interest drawn as a polygon, circle or line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Area {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    #[serde(rename = "type")]
    pub area_type: AreaType,
    pub geometry: AreaGeometry,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Area {
    pub fn drawn(geometry: AreaGeometry, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: String::new(),
            description: String::new(),
            area_type: AreaType::default(),
            geometry,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn shape(&self) -> ShapeKind {
        self.geometry.kind()
    }

    pub fn anchor(&self) -> LatLon {
        self.geometry.anchor()
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        self.geometry.validate()
    }
}

/// Which of the three collections an entity lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Target,
    OwnForce,
    Area,
}

impl EntityKind {
    pub const ALL: [Self; 3] = [Self::Target, Self::OwnForce, Self::Area];

    /// Collection name, also the suffix of the storage key.
    pub const fn collection(self) -> &'static str {
        match self {
            EntityKind::Target => "targets",
            EntityKind::OwnForce => "ownforces",
            EntityKind::Area => "areas",
        }
    }

    pub fn storage_key(self, prefix: &str) -> String {
        format!("{prefix}.{}", self.collection())
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntityKind::Target => write!(f, "target"),
            EntityKind::OwnForce => write!(f, "own force"),
            EntityKind::Area => write!(f, "area"),
        }
    }
}

/// Reference to a committed entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityRef {
    pub kind: EntityKind,
    pub id: Uuid,
}

impl EntityRef {
    pub const fn new(kind: EntityKind, id: Uuid) -> Self {
        Self { kind, id }
    }
}
