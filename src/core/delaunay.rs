//! Delaunay triangulation of a planar point set (Bowyer-Watson).
//!
//! Only the edge list is exposed: the pair selection treats every edge
//! between two scenes as a candidate interferogram.

use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};

pub type Point = (f64, f64);

/// Half-size of the enclosing triangle, relative to the unit square the
/// input is scaled into
const SUPER_TRIANGLE_SCALE: f64 = 1.0e3;

/// Tolerance on the orientation test when deciding if the input is collinear
const COLLINEAR_EPSILON: f64 = 1.0e-12;

/// Edges of the Delaunay triangulation of `points`, as `(i, j)` index pairs
/// with `i < j`, sorted ascending.
///
/// Fewer than two distinct points yield no edges. Repeated points are
/// triangulated once, under the first index they appear at. Collinear
/// input has no triangles; its edges then join consecutive points along
/// the line.
pub fn delaunay_edges(points: &[Point]) -> Vec<(usize, usize)> {
    let (normalized, original_index) = unique_normalized(points);

    if normalized.len() < 2 {
        return Vec::new();
    }

    let mut edges = BTreeSet::new();
    let canonical = |a: usize, b: usize| {
        let (i, j) = (original_index[a], original_index[b]);
        if i < j {
            (i, j)
        } else {
            (j, i)
        }
    };

    if let Some(order) = collinear_order(&normalized) {
        for w in order.windows(2) {
            edges.insert(canonical(w[0], w[1]));
        }
        return edges.into_iter().collect();
    }

    let mut triangulation = Triangulation::new(normalized.clone());
    for v in 0..normalized.len() {
        triangulation.insert(v);
    }
    for (a, b) in triangulation.real_edges() {
        edges.insert(canonical(a, b));
    }

    // Hull edges can be lost to the enclosing triangle when hull points are
    // nearly collinear
    for (a, b) in convex_hull_edges(&normalized) {
        edges.insert(canonical(a, b));
    }

    edges.into_iter().collect()
}

/// Drop repeated points and scale the rest uniformly into the unit square.
/// Returns the scaled points and, for each, its index in the input.
fn unique_normalized(points: &[Point]) -> (Vec<Point>, Vec<usize>) {
    let mut seen = HashSet::new();
    let mut kept = Vec::new();
    let mut original_index = Vec::new();
    for (i, &(x, y)) in points.iter().enumerate() {
        if !x.is_finite() || !y.is_finite() {
            log::warn!("Skipping non-finite point {} ({}, {})", i, x, y);
            continue;
        }
        if seen.insert((x.to_bits(), y.to_bits())) {
            kept.push((x, y));
            original_index.push(i);
        } else {
            log::debug!("Skipping repeated point {} ({}, {})", i, x, y);
        }
    }

    if kept.is_empty() {
        return (kept, original_index);
    }

    let min_x = kept.iter().map(|p| p.0).fold(f64::INFINITY, f64::min);
    let max_x = kept.iter().map(|p| p.0).fold(f64::NEG_INFINITY, f64::max);
    let min_y = kept.iter().map(|p| p.1).fold(f64::INFINITY, f64::min);
    let max_y = kept.iter().map(|p| p.1).fold(f64::NEG_INFINITY, f64::max);
    let span = (max_x - min_x).max(max_y - min_y);
    let span = if span > 0.0 { span } else { 1.0 };

    let normalized = kept
        .iter()
        .map(|&(x, y)| ((x - min_x) / span, (y - min_y) / span))
        .collect();
    (normalized, original_index)
}

/// If all points lie on one line, their indices ordered along it
fn collinear_order(points: &[Point]) -> Option<Vec<usize>> {
    let origin = points[0];
    let far = points
        .iter()
        .copied()
        .max_by(|a, b| distance_sq(origin, *a).total_cmp(&distance_sq(origin, *b)))?;
    let length = distance_sq(origin, far).sqrt();

    let collinear = points
        .iter()
        .all(|&p| (orient(origin, far, p) / length).abs() <= COLLINEAR_EPSILON);
    if !collinear {
        return None;
    }

    let direction = ((far.0 - origin.0) / length, (far.1 - origin.1) / length);
    let along = |p: Point| (p.0 - origin.0) * direction.0 + (p.1 - origin.1) * direction.1;
    let mut order: Vec<usize> = (0..points.len()).collect();
    order.sort_by(|&a, &b| along(points[a]).total_cmp(&along(points[b])));
    Some(order)
}

fn distance_sq(a: Point, b: Point) -> f64 {
    (a.0 - b.0).powi(2) + (a.1 - b.1).powi(2)
}

/// Twice the signed area of `abc`; positive when counter-clockwise
fn orient(a: Point, b: Point, c: Point) -> f64 {
    (b.0 - a.0) * (c.1 - a.1) - (b.1 - a.1) * (c.0 - a.0)
}

/// Positive when `p` lies inside the circumcircle of the counter-clockwise triangle `abc`
fn in_circle(a: Point, b: Point, c: Point, p: Point) -> f64 {
    let (adx, ady) = (a.0 - p.0, a.1 - p.1);
    let (bdx, bdy) = (b.0 - p.0, b.1 - p.1);
    let (cdx, cdy) = (c.0 - p.0, c.1 - p.1);
    let alift = adx * adx + ady * ady;
    let blift = bdx * bdx + bdy * bdy;
    let clift = cdx * cdx + cdy * cdy;

    adx * (bdy * clift - cdy * blift) - ady * (bdx * clift - cdx * blift)
        + alift * (bdx * cdy - cdx * bdy)
}

/// Convex hull edges (monotone chain), keeping points that lie on the hull
/// between two corners
fn convex_hull_edges(points: &[Point]) -> Vec<(usize, usize)> {
    let mut order: Vec<usize> = (0..points.len()).collect();
    order.sort_by(|&a, &b| {
        points[a]
            .0
            .total_cmp(&points[b].0)
            .then(points[a].1.total_cmp(&points[b].1))
    });

    let chain = |indices: &mut dyn Iterator<Item = usize>| {
        let mut hull: Vec<usize> = Vec::new();
        for i in indices {
            while hull.len() >= 2
                && orient(points[hull[hull.len() - 2]], points[hull[hull.len() - 1]], points[i]) < 0.0
            {
                hull.pop();
            }
            hull.push(i);
        }
        hull
    };

    let lower = chain(&mut order.iter().copied());
    let upper = chain(&mut order.iter().rev().copied());

    lower
        .windows(2)
        .chain(upper.windows(2))
        .map(|w| (w[0], w[1]))
        .collect()
}

/// Triangles stored counter-clockwise. Every directed edge maps to the
/// triangle it belongs to, so the neighbour across `(a, b)` owns `(b, a)`.
struct Triangulation {
    vertices: Vec<Point>,
    /// Number of input points; the three enclosing vertices follow them
    num_real: usize,
    triangles: Vec<Option<[usize; 3]>>,
    edge_owner: HashMap<(usize, usize), usize>,
}

impl Triangulation {
    fn new(mut vertices: Vec<Point>) -> Self {
        let num_real = vertices.len();
        let r = SUPER_TRIANGLE_SCALE;
        vertices.push((0.5 - 2.0 * r, 0.5 - r));
        vertices.push((0.5 + 2.0 * r, 0.5 - r));
        vertices.push((0.5, 0.5 + 2.0 * r));

        let mut triangulation = Self {
            vertices,
            num_real,
            triangles: Vec::new(),
            edge_owner: HashMap::new(),
        };
        triangulation.add_triangle([num_real, num_real + 1, num_real + 2]);
        triangulation
    }

    fn triangle_edges(t: [usize; 3]) -> [(usize, usize); 3] {
        [(t[0], t[1]), (t[1], t[2]), (t[2], t[0])]
    }

    fn add_triangle(&mut self, t: [usize; 3]) {
        let index = self.triangles.len();
        self.triangles.push(Some(t));
        for edge in Self::triangle_edges(t) {
            self.edge_owner.insert(edge, index);
        }
    }

    fn remove_triangle(&mut self, index: usize) {
        if let Some(t) = self.triangles[index].take() {
            for edge in Self::triangle_edges(t) {
                self.edge_owner.remove(&edge);
            }
        }
    }

    fn point_in_circle(&self, t: [usize; 3], p: Point) -> f64 {
        in_circle(self.vertices[t[0]], self.vertices[t[1]], self.vertices[t[2]], p)
    }

    /// Triangle containing `p`, or the one whose circumcircle contains it most
    fn locate(&self, p: Point) -> Option<usize> {
        let alive = || {
            self.triangles
                .iter()
                .enumerate()
                .filter_map(|(i, t)| t.map(|t| (i, t)))
        };

        alive()
            .find(|&(_, t)| {
                Self::triangle_edges(t)
                    .iter()
                    .all(|&(a, b)| orient(self.vertices[a], self.vertices[b], p) >= 0.0)
            })
            .or_else(|| {
                alive().max_by(|&(_, a), &(_, b)| {
                    self.point_in_circle(a, p).total_cmp(&self.point_in_circle(b, p))
                })
            })
            .map(|(i, _)| i)
    }

    fn insert(&mut self, v: usize) {
        let p = self.vertices[v];
        let Some(start) = self.locate(p) else {
            return;
        };

        // Cavity: triangles reachable from `start` whose circumcircle holds `p`
        let mut cavity = HashSet::from([start]);
        let mut queue = VecDeque::from([start]);
        while let Some(index) = queue.pop_front() {
            let Some(t) = self.triangles[index] else {
                continue;
            };
            for (a, b) in Self::triangle_edges(t) {
                let Some(&neighbour) = self.edge_owner.get(&(b, a)) else {
                    continue;
                };
                if cavity.contains(&neighbour) {
                    continue;
                }
                if let Some(nt) = self.triangles[neighbour] {
                    if self.point_in_circle(nt, p) > 0.0 {
                        cavity.insert(neighbour);
                        queue.push_back(neighbour);
                    }
                }
            }
        }

        let mut boundary = Vec::new();
        for &index in &cavity {
            if let Some(t) = self.triangles[index] {
                for (a, b) in Self::triangle_edges(t) {
                    let shared = self
                        .edge_owner
                        .get(&(b, a))
                        .map_or(false, |n| cavity.contains(n));
                    if !shared {
                        boundary.push((a, b));
                    }
                }
            }
        }

        for &index in &cavity {
            self.remove_triangle(index);
        }
        for (a, b) in boundary {
            self.add_triangle([a, b, v]);
        }
    }

    /// Edges between input points, each once. The enclosing triangle is
    /// fully triangulated, so every such edge is stored in both directions.
    fn real_edges(&self) -> Vec<(usize, usize)> {
        self.edge_owner
            .keys()
            .filter(|&&(a, b)| a < b && b < self.num_real)
            .copied()
            .collect()
    }
}
