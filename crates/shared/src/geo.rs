use serde::{Deserialize, Serialize};

use crate::models::{AreaGeometry, LatLon};

/// Mean Earth radius used by every distance in the engine.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

const COMPASS_POINTS: [&str; 16] = [
    "N", "NNE", "NE", "ENE", "E", "ESE", "SE", "SSE", "S", "SSW", "SW", "WSW", "W", "WNW", "NW",
    "NNW",
];

/// Distance and initial bearing between two positions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Measurement {
    pub distance_km: f64,
    pub bearing_deg: f64,
}

/// Great-circle distance in kilometres (haversine).
///
/// Deltas are taken as absolute values so the result is bit-for-bit
/// symmetric in its arguments.
pub fn distance_km(a: LatLon, b: LatLon) -> f64 {
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let d_lat = (b.lat - a.lat).abs().to_radians();
    let d_lon = (b.lon - a.lon).abs().to_radians();

    let h = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);
    let h = h.clamp(0.0, 1.0);
    2.0 * EARTH_RADIUS_KM * h.sqrt().atan2((1.0 - h).sqrt())
}

/// Initial bearing from `a` to `b` in degrees [0, 360), clockwise from north.
pub fn bearing_deg(a: LatLon, b: LatLon) -> f64 {
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let d_lon = (b.lon - a.lon).to_radians();

    let y = d_lon.sin() * lat2.cos();
    let x = lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * d_lon.cos();
    let deg = y.atan2(x).to_degrees().rem_euclid(360.0);
    if deg >= 360.0 {
        0.0
    } else {
        deg
    }
}

pub fn measure(a: LatLon, b: LatLon) -> Measurement {
    Measurement {
        distance_km: distance_km(a, b),
        bearing_deg: bearing_deg(a, b),
    }
}

/// Point reached by travelling `km` from `start` along `bearing`.
pub fn destination(start: LatLon, bearing: f64, km: f64) -> LatLon {
    let angular = km / EARTH_RADIUS_KM;
    let theta = bearing.to_radians();
    let lat1 = start.lat.to_radians();
    let lon1 = start.lon.to_radians();

    let lat2 = (lat1.sin() * angular.cos() + lat1.cos() * angular.sin() * theta.cos()).asin();
    let lon2 = lon1
        + (theta.sin() * angular.sin() * lat1.cos()).atan2(angular.cos() - lat1.sin() * lat2.sin());

    LatLon::new(lat2.to_degrees(), lon2.to_degrees())
}

/// Arithmetic mean of the points, `None` when there are none.
pub fn centroid(points: &[LatLon]) -> Option<LatLon> {
    if points.is_empty() {
        return None;
    }
    let n = points.len() as f64;
    let (lat, lon) = points
        .iter()
        .fold((0.0, 0.0), |(lat, lon), p| (lat + p.lat, lon + p.lon));
    Some(LatLon::new(lat / n, lon / n))
}

/// Anchor of a line: the mean of its vertices.
pub fn midpoint(points: &[LatLon]) -> Option<LatLon> {
    centroid(points)
}

/// Rigidly shift a shape. Circles keep their radius.
pub fn translate(geometry: &AreaGeometry, d_lat: f64, d_lon: f64) -> AreaGeometry {
    let shift = |vertices: &[LatLon]| -> Vec<LatLon> {
        vertices.iter().map(|p| p.offset(d_lat, d_lon)).collect()
    };
    match geometry {
        AreaGeometry::Polygon { vertices } => AreaGeometry::Polygon {
            vertices: shift(vertices),
        },
        AreaGeometry::Line { vertices } => AreaGeometry::Line {
            vertices: shift(vertices),
        },
        AreaGeometry::Circle { center, radius_m } => AreaGeometry::Circle {
            center: center.offset(d_lat, d_lon),
            radius_m: *radius_m,
        },
    }
}

/// Summed length of a polyline in kilometres.
pub fn path_length_km(points: &[LatLon]) -> f64 {
    points.windows(2).map(|w| distance_km(w[0], w[1])).sum()
}

/// 16-point compass label for a bearing.
pub fn cardinal(bearing: f64) -> &'static str {
    let idx = (bearing.rem_euclid(360.0) / 22.5 + 0.5).floor() as usize % COMPASS_POINTS.len();
    COMPASS_POINTS[idx]
}

/// "850 m" below one kilometre, "1.23 km" above.
pub fn format_distance(km: f64) -> String {
    if km < 1.0 {
        format!("{:.0} m", km * 1000.0)
    } else {
        format!("{km:.2} km")
    }
}
