//! Geometric primitives shared by every stage of the pipeline.
//!
//! All distances are meters. Bounding boxes are always ordered
//! `[north, south, east, west]` at the public boundary.

use geo::{ConvexHull, Coord, LineString, MultiPoint, Point, Polygon};

use crate::Error;

/// Mean earth radius in meters, as used by the great-circle formulas.
pub const EARTH_RADIUS_M: f64 = 6_371_009.0;

/// Great-circle distance between two lat/lon points, in meters.
///
/// Haversine formula with the intermediate term clamped to `<= 1` so that
/// antipodal rounding noise cannot produce a NaN.
pub fn great_circle(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let d_phi = phi2 - phi1;
    let d_lambda = (lon2 - lon1).to_radians();

    let h = (d_phi / 2.0).sin().powi(2)
        + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    let h = h.min(1.0);

    2.0 * EARTH_RADIUS_M * h.sqrt().asin()
}

/// Planar Euclidean distance between two points in projected coordinates.
pub fn euclidean(x1: f64, y1: f64, x2: f64, y2: f64) -> f64 {
    (x1 - x2).hypot(y1 - y2)
}

/// Initial compass bearing from the first point to the second, in `[0, 360)`
/// degrees clockwise from north.
pub fn bearing(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let d_lambda = (lon2 - lon1).to_radians();

    let y = d_lambda.sin() * phi2.cos();
    let x = phi1.cos() * phi2.sin() - phi1.sin() * phi2.cos() * d_lambda.cos();

    y.atan2(x).to_degrees().rem_euclid(360.0)
}

/// Destination point reached by travelling `dist` meters from `(lat, lon)`
/// along the given initial bearing (degrees clockwise from north).
pub fn destination(lat: f64, lon: f64, bearing_deg: f64, dist: f64) -> (f64, f64) {
    let delta = dist / EARTH_RADIUS_M;
    let theta = bearing_deg.to_radians();
    let phi1 = lat.to_radians();
    let lambda1 = lon.to_radians();

    let phi2 = (phi1.sin() * delta.cos() + phi1.cos() * delta.sin() * theta.cos()).asin();
    let lambda2 = lambda1
        + (theta.sin() * delta.sin() * phi1.cos())
            .atan2(delta.cos() - phi1.sin() * phi2.sin());

    (phi2.to_degrees(), lambda2.to_degrees())
}

/// Coordinate reference system of a graph: either geographic lat/lon degrees
/// or a planar projection in meters. Distance semantics dispatch on this tag
/// rather than on string inspection of the CRS code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Crs {
    /// Latitude/longitude degrees (`x` = lon, `y` = lat).
    Geographic { code: String },
    /// Planar coordinates in meters.
    Projected { code: String },
}

impl Crs {
    /// The default geographic CRS used for freshly built graphs.
    pub fn wgs84() -> Self {
        Crs::Geographic {
            code: "epsg:4326".to_string(),
        }
    }

    /// Classifies a CRS code string. Only the well-known lat/lon codes map to
    /// [`Crs::Geographic`]; everything else is treated as projected meters.
    pub fn from_code(code: &str) -> Self {
        let lower = code.to_ascii_lowercase();
        match lower.as_str() {
            "epsg:4326" | "wgs84" | "wgs 84" | "ogc:crs84" | "crs84" => Crs::Geographic {
                code: lower,
            },
            _ => Crs::Projected { code: lower },
        }
    }

    pub fn code(&self) -> &str {
        match self {
            Crs::Geographic { code } | Crs::Projected { code } => code,
        }
    }

    pub fn is_projected(&self) -> bool {
        matches!(self, Crs::Projected { .. })
    }

    /// Distance in meters between two points, great-circle for geographic
    /// coordinates and Euclidean for projected ones.
    pub fn distance(&self, a: Point<f64>, b: Point<f64>) -> f64 {
        match self {
            Crs::Geographic { .. } => great_circle(a.y(), a.x(), b.y(), b.x()),
            Crs::Projected { .. } => euclidean(a.x(), a.y(), b.x(), b.y()),
        }
    }
}

/// EPSG code of the UTM zone containing the given point:
/// `32600 + zone` in the northern hemisphere, `32700 + zone` in the southern.
pub fn utm_crs_code(lat: f64, lon: f64) -> u32 {
    let zone = ((lon + 180.0) / 6.0).floor() as u32 + 1;
    if lat >= 0.0 { 32600 + zone } else { 32700 + zone }
}

/// Bounding box in the fixed `[north, south, east, west]` order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bbox {
    pub north: f64,
    pub south: f64,
    pub east: f64,
    pub west: f64,
}

impl Bbox {
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] when `north < south` or `east < west`,
    /// which usually means the caller swapped the argument order.
    pub fn new(north: f64, south: f64, east: f64, west: f64) -> Result<Self, Error> {
        if north < south || east < west {
            return Err(Error::InvalidInput(format!(
                "malformed bbox [{north}, {south}, {east}, {west}]: expected [north, south, east, west]"
            )));
        }
        Ok(Self {
            north,
            south,
            east,
            west,
        })
    }

    /// Bbox centered on a lat/lon point, extending `dist` meters in each
    /// cardinal direction.
    pub fn from_point(lat: f64, lon: f64, dist: f64) -> Self {
        let (north, _) = destination(lat, lon, 0.0, dist);
        let (_, east) = destination(lat, lon, 90.0, dist);
        let (south, _) = destination(lat, lon, 180.0, dist);
        let (_, west) = destination(lat, lon, 270.0, dist);
        Self {
            north,
            south,
            east,
            west,
        }
    }

    pub fn contains(&self, x: f64, y: f64) -> bool {
        y <= self.north && y >= self.south && x <= self.east && x >= self.west
    }

    pub fn to_polygon(&self) -> Polygon<f64> {
        Polygon::new(
            LineString::from(vec![
                (self.west, self.south),
                (self.east, self.south),
                (self.east, self.north),
                (self.west, self.north),
                (self.west, self.south),
            ]),
            vec![],
        )
    }
}

/// Arc length of a linestring under the given CRS, in meters.
pub fn line_length(line: &LineString<f64>, crs: &Crs) -> f64 {
    line.0
        .windows(2)
        .map(|w| crs.distance(Point::from(w[0]), Point::from(w[1])))
        .sum()
}

/// Point at the given fraction of a linestring's arc length, linearly
/// interpolated within the containing segment. The fraction is clamped
/// to `[0, 1]`.
pub fn interpolate(line: &LineString<f64>, fraction: f64, crs: &Crs) -> Option<Point<f64>> {
    let coords = &line.0;
    if coords.is_empty() {
        return None;
    }
    if coords.len() == 1 {
        return Some(Point::from(coords[0]));
    }

    let fraction = fraction.clamp(0.0, 1.0);
    let total = line_length(line, crs);
    if total == 0.0 {
        return Some(Point::from(coords[0]));
    }

    let target = fraction * total;
    let mut travelled = 0.0;
    for w in coords.windows(2) {
        let seg = crs.distance(Point::from(w[0]), Point::from(w[1]));
        if travelled + seg >= target && seg > 0.0 {
            let t = (target - travelled) / seg;
            return Some(Point::new(
                w[0].x + (w[1].x - w[0].x) * t,
                w[0].y + (w[1].y - w[0].y) * t,
            ));
        }
        travelled += seg;
    }
    Some(Point::from(coords[coords.len() - 1]))
}

const BUFFER_CIRCLE_POINTS: usize = 24;

/// Buffers a polygon outward by `dist` meters and returns the convex hull of
/// the swept vertices. The hull overshoots concave boundaries, which is the
/// right bias for query-area expansion.
pub fn buffer_polygon(polygon: &Polygon<f64>, dist: f64, crs: &Crs) -> Polygon<f64> {
    let mut points: Vec<Point<f64>> = Vec::new();

    let rings = std::iter::once(polygon.exterior()).chain(polygon.interiors().iter());
    for ring in rings {
        for coord in &ring.0 {
            points.push(Point::from(*coord));
            for i in 0..BUFFER_CIRCLE_POINTS {
                let angle = 360.0 * i as f64 / BUFFER_CIRCLE_POINTS as f64;
                let (x, y) = match crs {
                    Crs::Geographic { .. } => {
                        let (lat, lon) = destination(coord.y, coord.x, angle, dist);
                        (lon, lat)
                    }
                    Crs::Projected { .. } => {
                        let rad = angle.to_radians();
                        (coord.x + dist * rad.sin(), coord.y + dist * rad.cos())
                    }
                };
                points.push(Point::new(x, y));
            }
        }
    }

    MultiPoint::new(points).convex_hull()
}

/// Straight two-point linestring between node coordinates, used wherever an
/// edge carries no stored geometry.
pub fn straight_line(ux: f64, uy: f64, vx: f64, vy: f64) -> LineString<f64> {
    LineString::from(vec![Coord { x: ux, y: uy }, Coord { x: vx, y: vy }])
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn great_circle_one_degree_at_equator() {
        let d = great_circle(0.0, 0.0, 0.0, 1.0);
        let expected = EARTH_RADIUS_M * 1.0_f64.to_radians();
        assert_relative_eq!(d, expected, max_relative = 1e-9);
    }

    #[test]
    fn great_circle_antipodal_is_finite() {
        let d = great_circle(0.0, 0.0, 0.0, 180.0);
        assert!(d.is_finite());
        assert_relative_eq!(d, EARTH_RADIUS_M * std::f64::consts::PI, max_relative = 1e-9);
    }

    #[test]
    fn bearing_cardinal_directions() {
        assert_relative_eq!(bearing(0.0, 0.0, 1.0, 0.0), 0.0, epsilon = 1e-9);
        assert_relative_eq!(bearing(0.0, 0.0, 0.0, 1.0), 90.0, epsilon = 1e-9);
        assert_relative_eq!(bearing(1.0, 0.0, 0.0, 0.0), 180.0, epsilon = 1e-9);
        assert_relative_eq!(bearing(0.0, 1.0, 0.0, 0.0), 270.0, epsilon = 1e-9);
    }

    #[test]
    fn bbox_from_point_is_symmetric_and_ordered() {
        let bbox = Bbox::from_point(45.0, 9.0, 1000.0);
        assert!(bbox.north > 45.0 && bbox.south < 45.0);
        assert!(bbox.east > 9.0 && bbox.west < 9.0);
        assert_relative_eq!(bbox.north - 45.0, 45.0 - bbox.south, epsilon = 1e-5);
        assert!(bbox.contains(9.0, 45.0));

        let d = great_circle(45.0, 9.0, bbox.north, 9.0);
        assert_relative_eq!(d, 1000.0, max_relative = 1e-6);
    }

    #[test]
    fn bbox_rejects_swapped_order() {
        assert!(Bbox::new(0.0, 1.0, 1.0, 0.0).is_err());
        assert!(Bbox::new(1.0, 0.0, 0.0, 1.0).is_err());
    }

    #[test]
    fn interpolate_midpoint_of_straight_segment() {
        let crs = Crs::Projected {
            code: "epsg:32632".to_string(),
        };
        let line = LineString::from(vec![(0.0, 0.0), (10.0, 0.0)]);
        let p = interpolate(&line, 0.5, &crs).unwrap();
        assert_relative_eq!(p.x(), 5.0, epsilon = 1e-12);
        assert_relative_eq!(p.y(), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn line_length_sums_segments() {
        let crs = Crs::Projected {
            code: "epsg:32632".to_string(),
        };
        let line = LineString::from(vec![(0.0, 0.0), (3.0, 0.0), (3.0, 4.0)]);
        assert_relative_eq!(line_length(&line, &crs), 7.0, epsilon = 1e-12);
    }

    #[test]
    fn buffer_contains_original_polygon() {
        use geo::Contains;
        let crs = Crs::wgs84();
        let poly = Bbox::new(1.0, 0.0, 1.0, 0.0).unwrap().to_polygon();
        let buffered = buffer_polygon(&poly, 500.0, &crs);
        for coord in &poly.exterior().0 {
            assert!(buffered.contains(&Point::from(*coord)));
        }
    }

    #[test]
    fn utm_zone_codes() {
        // Milan: zone 32 north
        assert_eq!(utm_crs_code(45.46, 9.19), 32632);
        // Sydney: zone 56 south
        assert_eq!(utm_crs_code(-33.87, 151.21), 32756);
    }

    #[test]
    fn crs_code_classification() {
        assert!(!Crs::from_code("EPSG:4326").is_projected());
        assert!(Crs::from_code("epsg:32632").is_projected());
    }
}
