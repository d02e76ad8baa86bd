//! Randomized 3-coloring heuristic.
//!
//! One round: color every vertex with one of three colors at random, then
//! collect the edges whose endpoints collide. Removing those edges makes the
//! graph 3-colorable, so the collected set is a candidate solution; an empty
//! set proves the graph 3-colorable as-is.

use crate::graph::{Edge, Graph};
use rand::Rng;

/// Starting bound for the search: rounds removing this many edges or more
/// are discarded as poor. Also keeps the cost within the single digit the
/// wire format allows.
pub const MAX_REMOVED_EDGES: usize = 8;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Color {
    Red,
    Green,
    Blue,
}

/// Assigns every vertex a uniformly random color, indexed like the graph's
/// vertex list.
pub fn random_coloring<R: Rng>(graph: &Graph, rng: &mut R) -> Vec<Color> {
    (0..graph.vertex_count())
        .map(|_| match rng.random_range(0..3u8) {
            0 => Color::Red,
            1 => Color::Green,
            _ => Color::Blue,
        })
        .collect()
}

/// Collects the edges violating the coloring, giving up once there are
/// `bound` or more of them (such a round cannot improve on the caller's best
/// solution).
pub fn violations(graph: &Graph, coloring: &[Color], bound: usize) -> Option<Vec<Edge>> {
    let mut removed = Vec::new();
    for &(ia, ib) in graph.edge_indices() {
        if coloring[ia] == coloring[ib] {
            if removed.len() + 1 >= bound {
                return None;
            }
            removed.push(Edge {
                a: graph.vertex_id(ia),
                b: graph.vertex_id(ib),
            });
        }
    }
    Some(removed)
}

/// One full heuristic round: random coloring, then violation collection
/// bounded by the best cost published so far.
pub fn random_candidate<R: Rng>(graph: &Graph, rng: &mut R, bound: usize) -> Option<Vec<Edge>> {
    let coloring = random_coloring(graph, rng);
    violations(graph, &coloring, bound)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn collects_monochrome_edges() {
        // Triangle 0-1-2 colored Red, Red, Green: only 0-1 collides.
        let graph = Graph::parse(["0-1", "0-2", "1-2"]).unwrap();
        let coloring = [Color::Red, Color::Red, Color::Green];
        let removed = violations(&graph, &coloring, MAX_REMOVED_EDGES).unwrap();
        assert_eq!(removed, vec![Edge { a: 0, b: 1 }]);
    }

    #[test]
    fn proper_coloring_yields_empty_solution() {
        let graph = Graph::parse(["0-1", "0-2", "1-2"]).unwrap();
        let coloring = [Color::Red, Color::Green, Color::Blue];
        let removed = violations(&graph, &coloring, MAX_REMOVED_EDGES).unwrap();
        assert!(removed.is_empty());
    }

    #[test]
    fn bound_discards_non_improving_rounds() {
        let graph = Graph::parse(["0-1", "0-2", "1-2"]).unwrap();
        let coloring = [Color::Red, Color::Red, Color::Red];
        // All three edges collide; a bound of 3 means "must remove fewer
        // than 3 edges", so the round is discarded.
        assert_eq!(violations(&graph, &coloring, 3), None);
        assert_eq!(
            violations(&graph, &coloring, MAX_REMOVED_EDGES)
                .unwrap()
                .len(),
            3
        );
    }

    #[test]
    fn self_loop_always_violates() {
        let graph = Graph::parse(["7-7"]).unwrap();
        for seed in 0..4 {
            let mut rng = StdRng::seed_from_u64(seed);
            let coloring = random_coloring(&graph, &mut rng);
            let removed = violations(&graph, &coloring, MAX_REMOVED_EDGES).unwrap();
            assert_eq!(removed, vec![Edge { a: 7, b: 7 }]);
        }
    }

    #[test]
    fn candidate_respects_vertex_count() {
        let graph = Graph::parse(["0-1", "2-3", "4-5"]).unwrap();
        let mut rng = StdRng::seed_from_u64(42);
        let coloring = random_coloring(&graph, &mut rng);
        assert_eq!(coloring.len(), graph.vertex_count());
    }
}
