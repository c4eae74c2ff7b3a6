use overwatch_shared::grid;
use overwatch_shared::models::LatLon;

/// Reference position the map opens on.
pub const HOME: LatLon = LatLon::new(59.91, 10.75);

/// Pixels per degree of latitude at the default zoom (about 18 px per km).
pub const DEFAULT_PX_PER_DEG: f64 = 2_000.0;

pub const ZOOM_MIN_PX_PER_DEG: f64 = 20.0;
pub const ZOOM_MAX_PX_PER_DEG: f64 = 2_000_000.0;

/// Keeps the longitude scale finite near the poles.
const MIN_COS_LAT: f64 = 0.01;

/// Convert client (viewport) coordinates to container-relative pixel coordinates.
pub fn client_to_container(
    client_x: f64,
    client_y: f64,
    rect_left: f64,
    rect_top: f64,
) -> (f64, f64) {
    (client_x - rect_left, client_y - rect_top)
}

fn clamp_position(lat: f64, lon: f64) -> LatLon {
    LatLon::new(lat.clamp(-90.0, 90.0), lon.clamp(-180.0, 180.0))
}

/// Equirectangular projection centered on `center`. Container pixels grow
/// right and down; `(width / 2, height / 2)` is the center.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub center: LatLon,
    pub px_per_deg: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            center: HOME,
            px_per_deg: DEFAULT_PX_PER_DEG,
        }
    }
}

impl Viewport {
    fn lon_scale(&self) -> f64 {
        self.px_per_deg * self.center.lat.to_radians().cos().max(MIN_COS_LAT)
    }

    pub fn project(&self, p: LatLon, width: f64, height: f64) -> (f64, f64) {
        (
            width / 2.0 + (p.lon - self.center.lon) * self.lon_scale(),
            height / 2.0 - (p.lat - self.center.lat) * self.px_per_deg,
        )
    }

    /// Inverse of [`Viewport::project`], clamped to valid coordinates.
    pub fn unproject(&self, x: f64, y: f64, width: f64, height: f64) -> LatLon {
        clamp_position(
            self.center.lat + (height / 2.0 - y) / self.px_per_deg,
            self.center.lon + (x - width / 2.0) / self.lon_scale(),
        )
    }

    /// Viewport after dragging the map contents by `(dx, dy)` pixels.
    pub fn panned(&self, dx: f64, dy: f64) -> Self {
        Self {
            center: clamp_position(
                self.center.lat + dy / self.px_per_deg,
                self.center.lon - dx / self.lon_scale(),
            ),
            px_per_deg: self.px_per_deg,
        }
    }

    /// Zoom by `factor` keeping the point under `(x, y)` fixed on screen.
    pub fn zoomed_at(&self, factor: f64, x: f64, y: f64, width: f64, height: f64) -> Self {
        let px_per_deg =
            (self.px_per_deg * factor).clamp(ZOOM_MIN_PX_PER_DEG, ZOOM_MAX_PX_PER_DEG);
        let anchor = self.unproject(x, y, width, height);

        let lat = anchor.lat - (height / 2.0 - y) / px_per_deg;
        let cos = lat.clamp(-90.0, 90.0).to_radians().cos().max(MIN_COS_LAT);
        let lon = anchor.lon - (x - width / 2.0) / (px_per_deg * cos);

        Self {
            center: clamp_position(lat, lon),
            px_per_deg,
        }
    }

    pub fn meters_to_px(&self, meters: f64) -> f64 {
        meters / grid::METERS_PER_DEG_LAT * self.px_per_deg
    }
}

/// Container size of the element with `container_id`.
pub fn container_size(container_id: &str) -> Option<(f64, f64)> {
    let document = web_sys::window()?.document()?;
    let rect = document
        .get_element_by_id(container_id)?
        .get_bounding_client_rect();
    Some((rect.width(), rect.height()))
}

/// Get container-relative click coordinates using web_sys and unproject them.
pub fn click_to_latlon(
    client_x: f64,
    client_y: f64,
    container_id: &str,
    viewport: &Viewport,
) -> Option<LatLon> {
    let document = web_sys::window()?.document()?;
    let element = document.get_element_by_id(container_id)?;
    let rect = element.get_bounding_client_rect();
    if rect.width() <= 0.0 || rect.height() <= 0.0 {
        return None;
    }

    let (x, y) = client_to_container(client_x, client_y, rect.left(), rect.top());
    Some(viewport.unproject(x, y, rect.width(), rect.height()))
}

/// MGRS readout for a position.
pub fn format_grid(p: LatLon) -> String {
    grid::to_mgrs(p.lat, p.lon)
}
