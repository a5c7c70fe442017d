//! ring perception on a bare graph, given as a number of atoms and a list of
//! bonds between them

use std::collections::VecDeque;

/// adjacency lists of (neighbor, bond index) pairs
pub(crate) fn adjacency(
    natoms: usize,
    edges: &[(usize, usize)],
) -> Vec<Vec<(usize, usize)>> {
    let mut adj = vec![Vec::new(); natoms];
    for (i, &(a, b)) in edges.iter().enumerate() {
        adj[a].push((b, i));
        adj[b].push((a, i));
    }
    adj
}

/// connected components, each sorted by atom index, in the order of their
/// lowest atom
pub fn components(natoms: usize, edges: &[(usize, usize)]) -> Vec<Vec<usize>> {
    let adj = adjacency(natoms, edges);
    let mut seen = vec![false; natoms];
    let mut ret = Vec::new();
    for start in 0..natoms {
        if seen[start] {
            continue;
        }
        seen[start] = true;
        let mut comp = vec![start];
        let mut stack = vec![start];
        while let Some(a) = stack.pop() {
            for &(b, _) in &adj[a] {
                if !seen[b] {
                    seen[b] = true;
                    comp.push(b);
                    stack.push(b);
                }
            }
        }
        comp.sort_unstable();
        ret.push(comp);
    }
    ret
}

/// find the smallest set of smallest rings. each ring is returned as a
/// sequence of atom indices in cyclic order, starting from its lowest index.
/// rings are sorted by size
pub fn find_sssr(natoms: usize, edges: &[(usize, usize)]) -> Vec<Vec<usize>> {
    let expected = edges.len() as isize - natoms as isize
        + components(natoms, edges).len() as isize;
    if expected <= 0 {
        return Vec::new();
    }

    let adj = adjacency(natoms, edges);
    let in_ring = ring_atoms(natoms, &adj);

    let mut rings: Vec<Vec<usize>> = Vec::new();
    for (i, &(a, b)) in edges.iter().enumerate() {
        if !in_ring[a] || !in_ring[b] {
            continue;
        }
        if let Some(mut ring) = shortest_path(&adj, a, b, i, &in_ring) {
            normalize(&mut ring);
            if !rings.contains(&ring) {
                rings.push(ring);
            }
        }
    }

    rings.sort_by_key(|r| r.len());
    rings.truncate(expected as usize);
    rings
}

/// mark atoms that survive repeatedly pruning atoms with fewer than two
/// neighbors
fn ring_atoms(natoms: usize, adj: &[Vec<(usize, usize)>]) -> Vec<bool> {
    let mut degree: Vec<usize> = adj.iter().map(Vec::len).collect();
    let mut alive = vec![true; natoms];
    let mut queue: VecDeque<usize> =
        (0..natoms).filter(|&i| degree[i] < 2).collect();
    while let Some(a) = queue.pop_front() {
        if !alive[a] {
            continue;
        }
        alive[a] = false;
        for &(b, _) in &adj[a] {
            if alive[b] {
                degree[b] -= 1;
                if degree[b] < 2 {
                    queue.push_back(b);
                }
            }
        }
    }
    alive
}

/// BFS from `from` to `to` over ring atoms without crossing bond `skip`
fn shortest_path(
    adj: &[Vec<(usize, usize)>],
    from: usize,
    to: usize,
    skip: usize,
    in_ring: &[bool],
) -> Option<Vec<usize>> {
    let mut prev = vec![usize::MAX; adj.len()];
    prev[from] = from;
    let mut queue = VecDeque::from([from]);
    while let Some(a) = queue.pop_front() {
        if a == to {
            let mut path = vec![to];
            let mut cur = to;
            while cur != from {
                cur = prev[cur];
                path.push(cur);
            }
            path.reverse();
            return Some(path);
        }
        for &(b, bond) in &adj[a] {
            if bond == skip || !in_ring[b] || prev[b] != usize::MAX {
                continue;
            }
            prev[b] = a;
            queue.push_back(b);
        }
    }
    None
}

/// rotate `ring` to start at its lowest atom and walk toward the lower of
/// that atom's two ring neighbors
fn normalize(ring: &mut Vec<usize>) {
    let Some(start) = ring
        .iter()
        .enumerate()
        .min_by_key(|&(_, &a)| a)
        .map(|(i, _)| i)
    else {
        return;
    };
    ring.rotate_left(start);
    if ring.len() > 2 && ring[ring.len() - 1] < ring[1] {
        ring[1..].reverse();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// a simple cycle over `n` atoms
    fn cycle(n: usize) -> Vec<(usize, usize)> {
        (0..n).map(|i| (i, (i + 1) % n)).collect()
    }

    #[test]
    fn benzene() {
        let rings = find_sssr(6, &cycle(6));
        assert_eq!(rings, vec![vec![0, 1, 2, 3, 4, 5]]);
    }

    #[test]
    fn chain_has_no_rings() {
        assert!(find_sssr(4, &[(0, 1), (1, 2), (2, 3)]).is_empty());
    }

    #[test]
    fn naphthalene() {
        let mut edges = cycle(6);
        edges.extend([(5, 6), (6, 7), (7, 8), (8, 9), (9, 0)]);
        let rings = find_sssr(10, &edges);
        assert_eq!(rings.len(), 2);
        assert!(rings.iter().all(|r| r.len() == 6));
        assert!(rings.contains(&vec![0, 1, 2, 3, 4, 5]));
        assert!(rings.contains(&vec![0, 5, 6, 7, 8, 9]));
    }

    #[test]
    fn spiro_and_pendant() {
        // cyclopropane sharing atom 0 with cyclobutane, plus a methyl on 4
        let edges = [
            (0, 1),
            (1, 2),
            (2, 0),
            (0, 3),
            (3, 4),
            (4, 5),
            (5, 0),
            (4, 6),
        ];
        let rings = find_sssr(7, &edges);
        assert_eq!(rings, vec![vec![0, 1, 2], vec![0, 3, 4, 5]]);
    }

    #[test]
    fn separate_components() {
        let comps = components(5, &[(0, 2), (3, 4)]);
        assert_eq!(comps, vec![vec![0, 2], vec![1], vec![3, 4]]);
    }
}
