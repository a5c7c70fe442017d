//! 2D depiction of a molecular graph. Rings are drawn as regular polygons and
//! chains as zig-zags, with every bond as close to [BOND_LENGTH] as the
//! topology allows. Disconnected fragments are laid out left to right.

use std::{
    collections::VecDeque,
    f64::consts::PI,
    ops::{Add, Mul, Sub},
};

use super::ring;

pub const BOND_LENGTH: f64 = 1.0;

/// horizontal space between disconnected fragments
const FRAGMENT_GAP: f64 = 1.5;

/// unbonded atoms closer than this push each other apart while relaxing a
/// bridged ring system
const REPEL_RANGE: f64 = 1.2;

const RELAX_STEPS: usize = 200;

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn polar(r: f64, angle: f64) -> Self {
        Self::new(r * angle.cos(), r * angle.sin())
    }

    pub fn norm(self) -> f64 {
        self.x.hypot(self.y)
    }

    pub fn distance(self, other: Self) -> f64 {
        (self - other).norm()
    }

    pub fn angle(self) -> f64 {
        self.y.atan2(self.x)
    }

    pub fn dot(self, other: Self) -> f64 {
        self.x * other.x + self.y * other.y
    }

    /// rotated 90 degrees counterclockwise
    pub fn perp(self) -> Self {
        Self::new(-self.y, self.x)
    }

    /// scaled to unit length, or None for a zero vector
    pub fn unit(self) -> Option<Self> {
        let n = self.norm();
        (n > 1e-9).then(|| self * (1.0 / n))
    }

    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl Add for Point {
    type Output = Point;

    fn add(self, rhs: Self) -> Self::Output {
        Point::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Point {
    type Output = Point;

    fn sub(self, rhs: Self) -> Self::Output {
        Point::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f64> for Point {
    type Output = Point;

    fn mul(self, rhs: f64) -> Self::Output {
        Point::new(self.x * rhs, self.y * rhs)
    }
}

/// wrap an angle into [0, 2π)
fn wrap(angle: f64) -> f64 {
    angle.rem_euclid(2.0 * PI)
}

/// wrap an angle into [-π, π)
fn wrap_signed(angle: f64) -> f64 {
    wrap(angle + PI) - PI
}

/// compute coordinates for `natoms` atoms connected by `edges`
pub fn compute(natoms: usize, edges: &[(usize, usize)]) -> Vec<Point> {
    let mut layout = Layout {
        adj: ring::adjacency(natoms, edges)
            .into_iter()
            .map(|v| v.into_iter().map(|(b, _)| b).collect())
            .collect(),
        rings: ring::find_sssr(natoms, edges),
        pos: vec![None; natoms],
        flip: vec![false; natoms],
        bridged: false,
    };

    let mut ret = vec![Point::default(); natoms];
    let mut local = vec![usize::MAX; natoms];
    let mut cursor = 0.0;
    for comp in ring::components(natoms, edges) {
        layout.bridged = false;
        layout.place_fragment(comp[0]);
        let mut pts: Vec<Point> = comp
            .iter()
            .map(|&a| layout.pos[a].unwrap_or_default())
            .collect();
        if layout.bridged {
            for (i, &a) in comp.iter().enumerate() {
                local[a] = i;
            }
            let frag_edges: Vec<(usize, usize)> = edges
                .iter()
                .filter(|&&(a, _)| local[a] != usize::MAX)
                .map(|&(a, b)| (local[a], local[b]))
                .collect();
            relax(&mut pts, &frag_edges);
            for &a in &comp {
                local[a] = usize::MAX;
            }
        }
        let (min, max) = bounds(&pts);
        let shift = Point::new(cursor - min.x, -(min.y + max.y) / 2.0);
        for (&a, &p) in comp.iter().zip(&pts) {
            ret[a] = p + shift;
        }
        cursor += max.x - min.x + FRAGMENT_GAP;
    }
    ret
}

/// the smallest distance between any two of `pts`
pub fn min_separation(pts: &[Point]) -> f64 {
    let mut ret = f64::INFINITY;
    for i in 0..pts.len() {
        for j in 0..i {
            ret = ret.min(pts[i].distance(pts[j]));
        }
    }
    ret
}

/// Spread out a fragment drawn with bridged rings, which the ring placement
/// alone can leave with atoms nearly on top of each other. Bonds are pulled
/// toward [BOND_LENGTH] and unbonded atoms within [REPEL_RANGE] pushed apart.
/// `pts` is only replaced if the atoms end up further apart than before.
fn relax(pts: &mut [Point], edges: &[(usize, usize)]) {
    let n = pts.len();
    let mut bonded = vec![vec![false; n]; n];
    for &(a, b) in edges {
        bonded[a][b] = true;
        bonded[b][a] = true;
    }

    let mut cur = pts.to_vec();
    for _ in 0..RELAX_STEPS {
        let mut force = vec![Point::default(); n];
        for &(a, b) in edges {
            let d = cur[b] - cur[a];
            let len = d.norm().max(1e-9);
            let f = d * ((len - BOND_LENGTH) / len);
            force[a] = force[a] + f;
            force[b] = force[b] - f;
        }
        for i in 0..n {
            for j in 0..i {
                if bonded[i][j] {
                    continue;
                }
                let d = cur[i] - cur[j];
                let len = d.norm().max(1e-9);
                if len < REPEL_RANGE {
                    let f = d * ((REPEL_RANGE - len) / len * 0.5);
                    force[i] = force[i] + f;
                    force[j] = force[j] - f;
                }
            }
        }
        for (p, &f) in cur.iter_mut().zip(&force) {
            *p = *p + f * 0.1;
        }
    }

    if cur.iter().all(|p| p.is_finite())
        && min_separation(&cur) > min_separation(pts)
    {
        pts.copy_from_slice(&cur);
    }
}

/// the lower-left and upper-right corners of the box around `pts`
pub fn bounds(pts: &[Point]) -> (Point, Point) {
    if pts.is_empty() {
        return (Point::default(), Point::default());
    }
    let mut min = Point::new(f64::INFINITY, f64::INFINITY);
    let mut max = Point::new(f64::NEG_INFINITY, f64::NEG_INFINITY);
    for p in pts {
        min.x = min.x.min(p.x);
        min.y = min.y.min(p.y);
        max.x = max.x.max(p.x);
        max.y = max.y.max(p.y);
    }
    (min, max)
}

struct Layout {
    adj: Vec<Vec<usize>>,
    rings: Vec<Vec<usize>>,
    pos: Vec<Option<Point>>,

    /// which way the next zig-zag turn goes from each atom
    flip: Vec<bool>,

    /// whether the current fragment has a ring bridged across another
    bridged: bool,
}

impl Layout {
    fn place_fragment(&mut self, start: usize) {
        self.pos[start] = Some(Point::default());
        let mut queue = VecDeque::from([start]);
        while let Some(a) = queue.pop_front() {
            for r in 0..self.rings.len() {
                if self.rings[r].contains(&a) {
                    queue.extend(self.place_ring(r));
                }
            }

            let new: Vec<usize> = self.adj[a]
                .iter()
                .copied()
                .filter(|&b| self.pos[b].is_none())
                .collect();
            if new.is_empty() {
                continue;
            }
            let here = self.at(a);
            let angles = self.free_angles(a, new.len());
            for (b, angle) in new.into_iter().zip(angles) {
                self.pos[b] = Some(here + Point::polar(BOND_LENGTH, angle));
                self.flip[b] = !self.flip[a];
                queue.push_back(b);
            }
        }
    }

    fn at(&self, a: usize) -> Point {
        self.pos[a].unwrap_or_default()
    }

    /// the directions from `a` to its already placed neighbors
    fn taken_angles(&self, a: usize) -> Vec<f64> {
        let here = self.at(a);
        self.adj[a]
            .iter()
            .filter_map(|&b| self.pos[b])
            .map(|p| wrap((p - here).angle()))
            .collect()
    }

    /// choose directions for `k` new bonds out of `a`
    fn free_angles(&self, a: usize, k: usize) -> Vec<f64> {
        let mut taken = self.taken_angles(a);
        match taken.len() {
            0 => (0..k)
                .map(|i| -PI / 6.0 + 2.0 * PI * i as f64 / k as f64)
                .collect(),
            1 if k == 1 => {
                let turn = 2.0 * PI / 3.0;
                let t = taken[0];
                vec![if self.flip[a] { t - turn } else { t + turn }]
            }
            _ => {
                taken.sort_by(f64::total_cmp);
                let (mut start, mut gap) = (0.0, 0.0);
                for (i, &t) in taken.iter().enumerate() {
                    let next = taken
                        .get(i + 1)
                        .copied()
                        .unwrap_or(taken[0] + 2.0 * PI);
                    if next - t > gap {
                        (start, gap) = (t, next - t);
                    }
                }
                (1..=k)
                    .map(|i| start + gap * i as f64 / (k + 1) as f64)
                    .collect()
            }
        }
    }

    /// the centroid of the placed neighbors of `atoms`, excluding `atoms`
    /// themselves
    fn crowd(&self, atoms: &[usize]) -> Option<Point> {
        let pts: Vec<Point> = atoms
            .iter()
            .flat_map(|&a| self.adj[a].iter())
            .filter(|b| !atoms.contains(b))
            .filter_map(|&b| self.pos[b])
            .collect();
        if pts.is_empty() {
            return None;
        }
        let sum = pts.iter().fold(Point::default(), |acc, &p| acc + p);
        Some(sum * (1.0 / pts.len() as f64))
    }

    /// place the unplaced atoms of ring `r`, returning them
    fn place_ring(&mut self, r: usize) -> Vec<usize> {
        let ring = self.rings[r].clone();
        let n = ring.len();
        let placed: Vec<usize> =
            (0..n).filter(|&i| self.pos[ring[i]].is_some()).collect();
        if placed.len() == n {
            return Vec::new();
        }

        let radius = BOND_LENGTH / (2.0 * (PI / n as f64).sin());
        let step = 2.0 * PI / n as f64;

        if placed.len() <= 1 {
            let i = placed.first().copied().unwrap_or(0);
            let a = ring[i];
            let here = self.at(a);
            let away = self
                .crowd(&[a])
                .and_then(|c| (here - c).unit())
                .unwrap_or(Point::new(1.0, 0.0));
            let center = here + away * radius;
            let base = (here - center).angle();
            self.pos[a] = Some(here);
            let mut ret = Vec::new();
            for j in 1..n {
                let b = ring[(i + j) % n];
                self.pos[b] = Some(
                    center + Point::polar(radius, base + step * j as f64),
                );
                ret.push(b);
            }
            return ret;
        }

        let mut ret = Vec::new();
        for (s, arc, e) in unplaced_arcs(&ring, &placed) {
            let (ps, pe) = (self.at(s), self.at(e));
            let chord = pe - ps;
            let mid = ps + chord * 0.5;
            let mut normal =
                chord.perp().unit().unwrap_or(Point::new(0.0, 1.0));
            if let Some(c) = self.crowd(&[s, e]) {
                if normal.dot(mid - c) < 0.0 {
                    normal = normal * -1.0;
                }
            }

            if placed.len() == 2 && arc.len() == n - 2 {
                // fused: a regular polygon on the far side of the shared bond
                let apothem = BOND_LENGTH / (2.0 * (PI / n as f64).tan());
                let center = mid + normal * apothem;
                let ts = (ps - center).angle();
                let te = (pe - center).angle();
                let dir = wrap_signed(ts - te).signum();
                for (j, &b) in arc.iter().enumerate() {
                    let angle = ts + dir * step * (j + 1) as f64;
                    self.pos[b] = Some(center + Point::polar(radius, angle));
                    ret.push(b);
                }
            } else {
                // bridged: bow the arc outward between its endpoints
                self.bridged = true;
                let k = arc.len();
                let bulge = BOND_LENGTH * (k + 1) as f64 / 2.0;
                for (j, &b) in arc.iter().enumerate() {
                    let t = (j + 1) as f64 / (k + 1) as f64;
                    let p = ps + chord * t + normal * (bulge * (PI * t).sin());
                    self.pos[b] = Some(p);
                    ret.push(b);
                }
            }
        }
        ret
    }
}

/// split `ring` into runs of unplaced atoms, each returned with the placed
/// atoms on either side, in ring order. `placed` holds the indices into `ring`
/// of the placed atoms and must not be empty
fn unplaced_arcs(
    ring: &[usize],
    placed: &[usize],
) -> Vec<(usize, Vec<usize>, usize)> {
    let n = ring.len();
    let is_placed = |i: usize| placed.contains(&(i % n));
    let mut ret = Vec::new();
    for &p in placed {
        let mut arc = Vec::new();
        let mut i = p + 1;
        while !is_placed(i) {
            arc.push(ring[i % n]);
            i += 1;
        }
        if !arc.is_empty() {
            ret.push((ring[p], arc, ring[i % n]));
        }
    }
    ret
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;

    fn cycle(n: usize) -> Vec<(usize, usize)> {
        (0..n).map(|i| (i, (i + 1) % n)).collect()
    }

    fn check_bonds(pts: &[Point], edges: &[(usize, usize)]) {
        for &(a, b) in edges {
            assert_abs_diff_eq!(
                pts[a].distance(pts[b]),
                BOND_LENGTH,
                epsilon = 1e-6
            );
        }
    }

    #[test]
    fn single_atom() {
        let pts = compute(1, &[]);
        assert_eq!(pts, vec![Point::default()]);
    }

    #[test]
    fn zigzag_chain() {
        let edges = [(0, 1), (1, 2), (2, 3), (3, 4)];
        let pts = compute(5, &edges);
        check_bonds(&pts, &edges);
        // every other atom lines up horizontally
        assert_abs_diff_eq!(pts[0].y, pts[2].y, epsilon = 1e-9);
        assert_abs_diff_eq!(pts[1].y, pts[3].y, epsilon = 1e-9);
        assert!(pts[4].x > pts[2].x && pts[2].x > pts[0].x);
    }

    #[test]
    fn benzene_is_regular() {
        let edges = cycle(6);
        let pts = compute(6, &edges);
        check_bonds(&pts, &edges);
        let (min, max) = bounds(&pts);
        let center = Point::new((min.x + max.x) / 2.0, (min.y + max.y) / 2.0);
        for p in &pts {
            assert_abs_diff_eq!(p.distance(center), 1.0, epsilon = 1e-6);
        }
    }

    #[test]
    fn fused_rings() {
        // naphthalene
        let mut edges = cycle(6);
        edges.extend([(5, 6), (6, 7), (7, 8), (8, 9), (9, 0)]);
        let pts = compute(10, &edges);
        check_bonds(&pts, &edges);
        assert!(min_separation(&pts) > 0.9);
    }

    #[test]
    fn spiro_and_substituents() {
        // spiro[2.3]hexane with a methyl and a cyclopropyl-ethyl tail
        let edges = [
            (0, 1),
            (1, 2),
            (2, 0),
            (0, 3),
            (3, 4),
            (4, 5),
            (5, 0),
            (4, 6),
            (6, 7),
            (7, 8),
            (8, 9),
            (9, 7),
        ];
        let pts = compute(10, &edges);
        check_bonds(&pts, &edges);
        assert!(min_separation(&pts) > 0.5);
    }

    #[test]
    fn branches_spread_out() {
        // neopentane
        let edges = [(0, 1), (1, 2), (1, 3), (1, 4)];
        let pts = compute(5, &edges);
        check_bonds(&pts, &edges);
        assert!(min_separation(&pts) > 0.99);
    }

    /// every bond within `tol` of [BOND_LENGTH]
    fn bonds_near(pts: &[Point], edges: &[(usize, usize)], tol: f64) -> bool {
        edges
            .iter()
            .all(|&(a, b)| (pts[a].distance(pts[b]) - BOND_LENGTH).abs() < tol)
    }

    #[test]
    fn norbornane() {
        let edges = [
            (0, 1),
            (1, 2),
            (2, 3),
            (3, 4),
            (4, 5),
            (5, 0),
            (0, 6),
            (6, 3),
        ];
        let pts = compute(7, &edges);
        assert!(pts.iter().all(|p| p.is_finite()));
        assert!(min_separation(&pts) > 0.9);
        assert!(bonds_near(&pts, &edges, 0.3));
    }

    #[test]
    fn bridged_cages_spread_out() {
        // C1C2CC3CC1CC(C2)C3
        let adamantane = [
            (0, 1),
            (1, 2),
            (2, 3),
            (3, 4),
            (4, 5),
            (0, 5),
            (5, 6),
            (6, 7),
            (7, 8),
            (1, 8),
            (7, 9),
            (3, 9),
        ];
        let pts = compute(10, &adamantane);
        assert!(min_separation(&pts) > 0.6);
        assert!(bonds_near(&pts, &adamantane, 0.3));

        // C1CC2CCC1CC2
        let octane = [
            (0, 1),
            (1, 2),
            (2, 3),
            (3, 4),
            (4, 5),
            (0, 5),
            (5, 6),
            (6, 7),
            (2, 7),
        ];
        let pts = compute(8, &octane);
        assert!(min_separation(&pts) > 0.7);
        assert!(bonds_near(&pts, &octane, 0.3));
    }

    #[test]
    fn relaxing_keeps_the_better_drawing() {
        // a square of bonds is already at rest
        let square = vec![
            Point::new(0.0, 0.0),
            Point::new(1.0, 0.0),
            Point::new(1.0, 1.0),
            Point::new(0.0, 1.0),
        ];
        let mut pts = square.clone();
        relax(&mut pts, &[(0, 1), (1, 2), (2, 3), (3, 0)]);
        assert!(min_separation(&pts) >= min_separation(&square));

        let mut pts = vec![Point::new(0.0, 0.0), Point::new(0.1, 0.0)];
        relax(&mut pts, &[]);
        assert!(min_separation(&pts) > 1.0);
    }

    #[test]
    fn fragments_do_not_overlap() {
        let edges = [(0, 1), (2, 3), (3, 4)];
        let pts = compute(6, &edges);
        assert!(pts[1].x < pts[2].x);
        assert!(pts[4].x < pts[5].x);
        assert!(min_separation(&pts) > 0.9);
    }

    #[test]
    fn unplaced_arcs_wrap() {
        let ring = [10, 11, 12, 13, 14, 15];
        let arcs = unplaced_arcs(&ring, &[1, 4]);
        assert_eq!(
            arcs,
            vec![(11, vec![12, 13], 14), (14, vec![15, 10], 11)]
        );
    }
}
