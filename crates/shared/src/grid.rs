//! Simplified UTM / MGRS display strings.
//!
//! These are NOT geodetic conversions. Easting and northing come from a flat
//! degrees-to-metres scaling around the zone's central meridian, and the
//! 100 km square letters are picked with plain modular arithmetic. The output
//! has the familiar shape of a grid reference and is stable for a given
//! position, which is all the map labels need. Do not feed these strings to
//! anything that expects real MGRS.

// Latitude band letters, 8 degrees each starting at 80S.
const BAND_LETTERS: &[u8; 20] = b"CDEFGHJKLMNPQRSTUVWX";

// 100 km column letter sets, selected by zone mod 3.
const COLUMN_SETS: [&[u8; 8]; 3] = [b"STUVWXYZ", b"ABCDEFGH", b"JKLMNPQR"];

// 100 km row letters.
const ROW_LETTERS: &[u8; 20] = b"ABCDEFGHJKLMNPQRSTUV";

pub const ZONE_WIDTH_DEG: f64 = 6.0;
pub const FALSE_EASTING_M: f64 = 500_000.0;
pub const FALSE_NORTHING_M: i64 = 10_000_000;

// Flat scaling factors, metres per degree.
pub const METERS_PER_DEG_LON: f64 = 111_320.0;
pub const METERS_PER_DEG_LAT: f64 = 110_574.0;

const SQUARE_M: i64 = 100_000;

/// UTM zone number 1..=60 for a longitude.
pub fn utm_zone(lon: f64) -> u8 {
    let zone = ((lon + 180.0) / ZONE_WIDTH_DEG).floor() as i64 + 1;
    zone.clamp(1, 60) as u8
}

/// Latitude band letter; saturates to C / X outside 80S..84N.
pub fn band_letter(lat: f64) -> char {
    let idx = ((lat + 80.0) / 8.0).floor() as i64;
    BAND_LETTERS[idx.clamp(0, 19) as usize] as char
}

/// Longitude of a zone's central meridian.
pub fn central_meridian(zone: u8) -> f64 {
    (zone as f64 - 1.0) * ZONE_WIDTH_DEG - 180.0 + 3.0
}

/// Approximate easting and northing in metres.
pub fn easting_northing(lat: f64, lon: f64) -> (i64, i64) {
    let zone = utm_zone(lon);
    let dx = (lon - central_meridian(zone)) * METERS_PER_DEG_LON * lat.to_radians().cos();
    let easting = (FALSE_EASTING_M + dx).round() as i64;
    let mut northing = (lat * METERS_PER_DEG_LAT).round() as i64;
    if lat < 0.0 {
        northing += FALSE_NORTHING_M;
    }
    (easting, northing)
}

/// Format a position as a simplified UTM string (e.g. "32V 597670E 6624488N").
pub fn to_utm(lat: f64, lon: f64) -> String {
    let zone = utm_zone(lon);
    let (easting, northing) = easting_northing(lat, lon);
    format!("{zone}{} {easting}E {northing}N", band_letter(lat))
}

/// The two 100 km square letters for a zone / easting / northing.
pub fn square_letters(zone: u8, easting: i64, northing: i64) -> (char, char) {
    let set = COLUMN_SETS[(zone % 3) as usize];
    let col = (easting / SQUARE_M - 1).rem_euclid(8) as usize;

    let row_shift = if zone % 2 == 0 { 5 } else { 0 };
    let row = (northing / SQUARE_M + row_shift).rem_euclid(20) as usize;

    (set[col] as char, ROW_LETTERS[row] as char)
}

/// Format a position as a simplified MGRS string (e.g. "32V NM 97670 24488").
pub fn to_mgrs(lat: f64, lon: f64) -> String {
    let zone = utm_zone(lon);
    let (easting, northing) = easting_northing(lat, lon);
    let (col, row) = square_letters(zone, easting, northing);
    format!(
        "{zone}{} {col}{row} {:05} {:05}",
        band_letter(lat),
        easting.rem_euclid(SQUARE_M),
        northing.rem_euclid(SQUARE_M)
    )
}
