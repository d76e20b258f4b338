//! Quadrat-accelerated polygon intersection.
//!
//! A large polygon is cut into grid-aligned sub-polygons so that membership
//! tests run a cheap bounding-box cull before any precise predicate.

use geo::{BooleanOps, BoundingRect, Geometry, Intersects, MultiPolygon, Point, Polygon, Rect};
use hashbrown::HashSet;
use log::{info, warn};

use crate::Error;
use crate::geometry::Bbox;

/// Upper bound on grid cells, guarding against absurd width choices.
const MAX_CELLS: usize = 250_000;

/// Cuts `polygon` into the pieces intersecting a uniform square grid of the
/// given width (in CRS units) covering the polygon's bounding box.
///
/// # Errors
///
/// [`Error::InvalidInput`] for a non-positive width, an empty polygon, or a
/// width so small that the grid would exceed the cell bound.
pub fn partition_polygon(
    polygon: &Polygon<f64>,
    quadrat_width: f64,
) -> Result<MultiPolygon<f64>, Error> {
    if !quadrat_width.is_finite() || quadrat_width <= 0.0 {
        return Err(Error::InvalidInput(format!(
            "quadrat width must be positive, got {quadrat_width}"
        )));
    }
    let rect = polygon.bounding_rect().ok_or_else(|| {
        Error::InvalidInput("cannot partition an empty polygon".to_string())
    })?;

    let cols = ((rect.width() / quadrat_width).ceil() as usize).max(1);
    let rows = ((rect.height() / quadrat_width).ceil() as usize).max(1);
    if cols.saturating_mul(rows) > MAX_CELLS {
        return Err(Error::InvalidInput(format!(
            "quadrat width {quadrat_width} yields {cols}x{rows} cells"
        )));
    }

    let mut pieces: Vec<Polygon<f64>> = Vec::new();
    for row in 0..rows {
        for col in 0..cols {
            let min_x = rect.min().x + col as f64 * quadrat_width;
            let min_y = rect.min().y + row as f64 * quadrat_width;
            let cell = Rect::new(
                (min_x, min_y),
                (
                    (min_x + quadrat_width).min(rect.max().x),
                    (min_y + quadrat_width).min(rect.max().y),
                ),
            )
            .to_polygon();
            pieces.extend(polygon.intersection(&cell).0);
        }
    }

    info!(
        "partitioned polygon into {} pieces over a {cols}x{rows} quadrat grid",
        pieces.len()
    );
    Ok(MultiPolygon::new(pieces))
}

/// Indices of the points intersecting `polygon`, tested piece-by-piece with
/// a bounding-box cull first. Points with non-finite coordinates are skipped
/// and counted.
pub fn points_within(
    polygon: &Polygon<f64>,
    points: &[Point<f64>],
    quadrat_width: f64,
) -> Result<HashSet<usize>, Error> {
    let pieces = partition_polygon(polygon, quadrat_width)?;
    let mut inside: HashSet<usize> = HashSet::new();

    let skipped = points
        .iter()
        .filter(|p| !(p.x().is_finite() && p.y().is_finite()))
        .count();
    if skipped > 0 {
        warn!("skipped {skipped} points with non-finite coordinates");
    }

    for piece in &pieces {
        let Some(rect) = piece.bounding_rect() else {
            continue;
        };
        let bbox = rect_to_bbox(&rect);
        for (i, point) in points.iter().enumerate() {
            if !(point.x().is_finite() && point.y().is_finite()) {
                continue;
            }
            if inside.contains(&i) || !bbox.contains(point.x(), point.y()) {
                continue;
            }
            if piece.intersects(point) {
                inside.insert(i);
            }
        }
    }

    info!("{} of {} points intersect the polygon", inside.len(), points.len());
    Ok(inside)
}

/// Indices of the features intersecting `polygon`. Features without a
/// bounding box (empty geometries) are skipped and counted at WARNING.
pub fn intersecting_features(
    polygon: &Polygon<f64>,
    features: &[Geometry<f64>],
    quadrat_width: f64,
) -> Result<HashSet<usize>, Error> {
    let pieces = partition_polygon(polygon, quadrat_width)?;
    let mut hits: HashSet<usize> = HashSet::new();
    let mut skipped: HashSet<usize> = HashSet::new();

    for piece in &pieces {
        let Some(piece_rect) = piece.bounding_rect() else {
            continue;
        };
        for (i, feature) in features.iter().enumerate() {
            if hits.contains(&i) || skipped.contains(&i) {
                continue;
            }
            let Some(feature_rect) = feature.bounding_rect() else {
                skipped.insert(i);
                continue;
            };
            if piece_rect.intersects(&feature_rect) && piece.intersects(feature) {
                hits.insert(i);
            }
        }
    }

    if !skipped.is_empty() {
        warn!("skipped {} features without usable geometry", skipped.len());
    }
    info!(
        "{} of {} features intersect the polygon",
        hits.len(),
        features.len()
    );
    Ok(hits)
}

fn rect_to_bbox(rect: &Rect<f64>) -> Bbox {
    Bbox {
        north: rect.max().y,
        south: rect.min().y,
        east: rect.max().x,
        west: rect.min().x,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_square() -> Polygon<f64> {
        Bbox::new(1.0, 0.0, 1.0, 0.0).unwrap().to_polygon()
    }

    #[test]
    fn partition_covers_the_polygon() {
        let pieces = partition_polygon(&unit_square(), 0.3).unwrap();
        assert!(!pieces.0.is_empty());
        use geo::Area;
        let total: f64 = pieces.0.iter().map(|p| p.unsigned_area()).sum();
        assert!((total - 1.0).abs() < 1e-9);
    }

    #[test]
    fn points_within_square() {
        let points = vec![
            Point::new(0.5, 0.5),
            Point::new(2.0, 2.0),
            Point::new(0.99, 0.99),
            Point::new(-0.1, 0.5),
        ];
        let inside = points_within(&unit_square(), &points, 0.25).unwrap();
        assert!(inside.contains(&0));
        assert!(inside.contains(&2));
        assert!(!inside.contains(&1));
        assert!(!inside.contains(&3));
    }

    #[test]
    fn boundary_points_count_as_intersecting() {
        let points = vec![Point::new(0.0, 0.5), Point::new(0.5, 1.0)];
        let inside = points_within(&unit_square(), &points, 0.5).unwrap();
        assert_eq!(inside.len(), 2);
    }

    #[test]
    fn features_intersection_with_cull() {
        use geo::line_string;
        let features = vec![
            Geometry::LineString(line_string![(x: -0.5, y: 0.5), (x: 0.5, y: 0.5)]),
            Geometry::LineString(line_string![(x: 5.0, y: 5.0), (x: 6.0, y: 5.0)]),
        ];
        let hits = intersecting_features(&unit_square(), &features, 0.5).unwrap();
        assert!(hits.contains(&0));
        assert!(!hits.contains(&1));
    }

    #[test]
    fn rejects_nonpositive_width() {
        assert!(partition_polygon(&unit_square(), 0.0).is_err());
        assert!(partition_polygon(&unit_square(), -1.0).is_err());
    }
}
