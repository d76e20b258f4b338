//! Edge speed, travel time, and grade augmentors.

use hashbrown::HashMap;
use log::warn;

use crate::model::{AttrValue, StreetGraph};

const MPH_TO_KPH: f64 = 1.60934;

/// Speeds implied by region-coded `maxspeed` values, in km/h.
const IMPLICIT_MAXSPEEDS: &[(&str, f64)] = &[
    ("AT:urban", 50.0),
    ("AT:rural", 100.0),
    ("BE:urban", 50.0),
    ("BE:rural", 70.0),
    ("CH:urban", 50.0),
    ("CH:rural", 80.0),
    ("CZ:urban", 50.0),
    ("CZ:rural", 90.0),
    ("DE:living_street", 7.0),
    ("DE:urban", 50.0),
    ("DE:rural", 100.0),
    ("DK:urban", 50.0),
    ("DK:rural", 80.0),
    ("ES:urban", 50.0),
    ("ES:rural", 90.0),
    ("FR:urban", 50.0),
    ("FR:rural", 80.0),
    ("GB:nsl_single", 96.54),
    ("GB:nsl_dual", 112.65),
    ("GB:motorway", 112.65),
    ("IT:urban", 50.0),
    ("IT:rural", 90.0),
    ("NL:urban", 50.0),
    ("NL:rural", 80.0),
    ("PL:urban", 50.0),
    ("PL:rural", 90.0),
    ("RU:urban", 60.0),
    ("RU:rural", 90.0),
    ("SE:urban", 50.0),
    ("SE:rural", 70.0),
    ("walk", 5.0),
];

/// Parses one `maxspeed` value into km/h: a plain number, a number with an
/// `mph` unit, or an implicit region key.
fn parse_single_maxspeed(value: &str) -> Option<f64> {
    let value = value.trim();
    if let Some(&(_, implied)) = IMPLICIT_MAXSPEEDS.iter().find(|(k, _)| *k == value) {
        return Some(implied);
    }

    let numeric: String = value
        .chars()
        .take_while(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    let parsed: f64 = numeric.parse().ok()?;
    if value.contains("mph") {
        Some(parsed * MPH_TO_KPH)
    } else {
        Some(parsed)
    }
}

/// Parses a `maxspeed` tag, averaging `|`-separated multi-values.
fn parse_maxspeed(value: &str) -> Option<f64> {
    let parsed: Vec<f64> = value.split('|').filter_map(parse_single_maxspeed).collect();
    if parsed.is_empty() {
        None
    } else {
        Some(parsed.iter().sum::<f64>() / parsed.len() as f64)
    }
}

fn highway_class(tags: &HashMap<String, AttrValue>) -> Option<String> {
    match tags.get("highway") {
        Some(AttrValue::Str(s)) => Some(s.clone()),
        Some(AttrValue::StrList(list)) => list.first().cloned(),
        _ => None,
    }
}

fn maxspeed_value(tags: &HashMap<String, AttrValue>) -> Option<f64> {
    match tags.get("maxspeed") {
        Some(AttrValue::Str(s)) => parse_maxspeed(s),
        Some(AttrValue::StrList(list)) => {
            let parsed: Vec<f64> = list.iter().filter_map(|s| parse_maxspeed(s)).collect();
            if parsed.is_empty() {
                None
            } else {
                Some(parsed.iter().sum::<f64>() / parsed.len() as f64)
            }
        }
        _ => None,
    }
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Stamps `speed_kph` on every edge.
///
/// Edges with a parsable `maxspeed` use it directly. The rest fall back, in
/// order, to the caller's per-highway-class override, the mean observed
/// speed of their class, the caller's flat fallback, and finally the global
/// mean across classes. Edges that resist all of that stay unset and are
/// counted at WARNING.
pub fn add_edge_speeds(
    graph: &mut StreetGraph,
    hwy_speeds: Option<&HashMap<String, f64>>,
    fallback: Option<f64>,
) {
    let edge_indices: Vec<_> = graph.graph.edge_indices().collect();

    // pass 1: parse observed speeds and aggregate them per highway class
    let mut parsed: HashMap<petgraph::graph::EdgeIndex, f64> = HashMap::new();
    let mut class_sums: HashMap<String, (f64, usize)> = HashMap::new();
    for &idx in &edge_indices {
        let edge = graph.edge(idx);
        if let Some(speed) = maxspeed_value(&edge.tags) {
            parsed.insert(idx, speed);
            if let Some(class) = highway_class(&edge.tags) {
                let entry = class_sums.entry(class).or_insert((0.0, 0));
                entry.0 += speed;
                entry.1 += 1;
            }
        }
    }

    let mut class_means: HashMap<String, f64> = class_sums
        .into_iter()
        .map(|(class, (sum, count))| (class, sum / count as f64))
        .collect();
    if let Some(overrides) = hwy_speeds {
        for (class, &speed) in overrides {
            class_means.insert(class.clone(), speed);
        }
    }
    let global_mean = if class_means.is_empty() {
        None
    } else {
        Some(class_means.values().sum::<f64>() / class_means.len() as f64)
    };

    // pass 2: fill every edge
    let mut unset = 0usize;
    for &idx in &edge_indices {
        let speed = parsed.get(&idx).copied().or_else(|| {
            let class = highway_class(&graph.edge(idx).tags);
            class
                .and_then(|c| class_means.get(&c).copied())
                .or(fallback)
                .or(global_mean)
        });
        match speed {
            Some(speed) => graph.edge_mut(idx).speed_kph = Some(round1(speed)),
            None => unset += 1,
        }
    }
    if unset > 0 {
        warn!("{unset} edges have no derivable speed");
    }
}

/// Stamps `travel_time` (seconds) from `length` and `speed_kph`. Edges with
/// a missing, non-finite, or non-positive speed are skipped and counted.
pub fn add_edge_travel_times(graph: &mut StreetGraph) {
    let edge_indices: Vec<_> = graph.graph.edge_indices().collect();
    let mut skipped = 0usize;

    for idx in edge_indices {
        let edge = graph.edge(idx);
        let speed = edge.speed_kph.filter(|s| s.is_finite() && *s > 0.0);
        match (edge.length.is_finite(), speed) {
            (true, Some(speed)) => {
                let seconds = (edge.length / 1000.0) / (speed / 3600.0);
                graph.edge_mut(idx).travel_time = Some(round1(seconds));
            }
            _ => skipped += 1,
        }
    }
    if skipped > 0 {
        warn!("{skipped} edges lack a finite length or positive speed for travel time");
    }
}

/// Stamps `grade` (elevation rise over run) on every edge whose endpoints
/// both carry an elevation and whose length is positive.
pub fn add_edge_grades(graph: &mut StreetGraph) {
    let edge_indices: Vec<_> = graph.graph.edge_indices().collect();
    for idx in edge_indices {
        let Some((u, v)) = graph.edge_endpoints(idx) else {
            continue;
        };
        let rise = match (graph.node(u).elevation, graph.node(v).elevation) {
            (Some(from), Some(to)) => to - from,
            _ => continue,
        };
        let length = graph.edge(idx).length;
        if length.is_finite() && length > 0.0 {
            graph.edge_mut(idx).grade = Some(rise / length);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Crs;
    use crate::model::{StreetEdge, StreetNode};
    use approx::assert_relative_eq;

    fn edge_with(tags: &[(&str, &str)]) -> StreetEdge {
        let mut e = StreetEdge::new(1, true);
        e.length = 1000.0;
        for (k, v) in tags {
            e.tags.insert(k.to_string(), AttrValue::Str(v.to_string()));
        }
        e
    }

    fn graph_of(edges: Vec<StreetEdge>) -> StreetGraph {
        let mut g = StreetGraph::new(Crs::wgs84());
        let mut prev = g.add_node(StreetNode::new(0, 0.0, 0.0));
        for (i, e) in edges.into_iter().enumerate() {
            let next = g.add_node(StreetNode::new(i as i64 + 1, 0.0, 0.0));
            g.add_edge(prev, next, e);
            prev = next;
        }
        g
    }

    #[test]
    fn parses_numeric_mph_and_lists() {
        assert_relative_eq!(parse_maxspeed("50").unwrap(), 50.0);
        assert_relative_eq!(parse_maxspeed("30 mph").unwrap(), 30.0 * MPH_TO_KPH);
        assert_relative_eq!(parse_maxspeed("30|50").unwrap(), 40.0);
        assert_relative_eq!(parse_maxspeed("DE:urban").unwrap(), 50.0);
        assert!(parse_maxspeed("signals").is_none());
    }

    #[test]
    fn class_mean_fills_unparsable_edges() {
        let mut g = graph_of(vec![
            edge_with(&[("highway", "residential"), ("maxspeed", "30")]),
            edge_with(&[("highway", "residential"), ("maxspeed", "50")]),
            edge_with(&[("highway", "residential")]),
        ]);
        add_edge_speeds(&mut g, None, None);
        let speeds: Vec<f64> = g
            .graph
            .edge_indices()
            .map(|i| g.edge(i).speed_kph.unwrap())
            .collect();
        assert!(speeds.contains(&40.0));
    }

    #[test]
    fn caller_overrides_beat_observed_means() {
        let mut g = graph_of(vec![
            edge_with(&[("highway", "residential"), ("maxspeed", "30")]),
            edge_with(&[("highway", "residential")]),
        ]);
        let overrides: HashMap<String, f64> =
            [("residential".to_string(), 25.0)].into_iter().collect();
        add_edge_speeds(&mut g, Some(&overrides), None);

        let filled: Vec<f64> = g
            .graph
            .edge_indices()
            .filter(|&i| g.edge(i).tags.get("maxspeed").is_none())
            .map(|i| g.edge(i).speed_kph.unwrap())
            .collect();
        assert_eq!(filled, vec![25.0]);
    }

    #[test]
    fn travel_time_formula() {
        let mut g = graph_of(vec![edge_with(&[("highway", "residential"), ("maxspeed", "36")])]);
        add_edge_speeds(&mut g, None, None);
        add_edge_travel_times(&mut g);
        let idx = g.graph.edge_indices().next().unwrap();
        // 1000 m at 36 km/h (10 m/s) is 100 s
        assert_relative_eq!(g.edge(idx).travel_time.unwrap(), 100.0);
    }

    #[test]
    fn travel_time_skips_zero_speed() {
        let mut g = graph_of(vec![edge_with(&[])]);
        let idx = g.graph.edge_indices().next().unwrap();
        g.edge_mut(idx).speed_kph = Some(0.0);
        add_edge_travel_times(&mut g);
        assert!(g.edge(idx).travel_time.is_none());
    }

    #[test]
    fn grades_from_elevations() {
        let mut g = graph_of(vec![edge_with(&[])]);
        let u = g.node_index(0).unwrap();
        let v = g.node_index(1).unwrap();
        g.node_mut(u).elevation = Some(100.0);
        g.node_mut(v).elevation = Some(150.0);
        add_edge_grades(&mut g);
        let idx = g.graph.edge_indices().next().unwrap();
        assert_relative_eq!(g.edge(idx).grade.unwrap(), 0.05);
    }
}
