//! Undirected graph built from `A-B` edge tokens.

use std::collections::HashMap;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum GraphError {
    #[error("no edges given")]
    NoEdges,

    #[error("invalid edge `{token}`, expected two numeric vertices as `A-B`")]
    BadEdge { token: String },
}

/// One undirected edge, identified by its endpoint vertex ids.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct Edge {
    pub a: u32,
    pub b: u32,
}

impl std::fmt::Display for Edge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.a, self.b)
    }
}

/// An undirected graph with integer-named vertices.
///
/// Vertices keep their insertion order; edges are deduplicated with both
/// orientations considered equal, so `1-2` given twice (or once as `2-1`)
/// yields a single edge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Graph {
    vertices: Vec<u32>,
    edges: Vec<(usize, usize)>,
}

impl Graph {
    /// Parses an edge list, one `A-B` token per element.
    pub fn parse<I, S>(tokens: I) -> Result<Self, GraphError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut index: HashMap<u32, usize> = HashMap::new();
        let mut vertices: Vec<u32> = Vec::new();
        let mut edges: Vec<(usize, usize)> = Vec::new();

        let mut intern = |id: u32, vertices: &mut Vec<u32>| -> usize {
            *index.entry(id).or_insert_with(|| {
                vertices.push(id);
                vertices.len() - 1
            })
        };

        for token in tokens {
            let token = token.as_ref();
            let bad = || GraphError::BadEdge {
                token: token.to_string(),
            };

            let (a, b) = token.split_once('-').ok_or_else(bad)?;
            let a: u32 = a.parse().map_err(|_| bad())?;
            let b: u32 = b.parse().map_err(|_| bad())?;

            let ia = intern(a, &mut vertices);
            let ib = intern(b, &mut vertices);
            let duplicate = edges
                .iter()
                .any(|&(x, y)| (x, y) == (ia, ib) || (x, y) == (ib, ia));
            if !duplicate {
                edges.push((ia, ib));
            }
        }

        if edges.is_empty() {
            return Err(GraphError::NoEdges);
        }

        Ok(Self { vertices, edges })
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Edge endpoints as indices into the vertex list.
    pub(crate) fn edge_indices(&self) -> &[(usize, usize)] {
        &self.edges
    }

    /// The vertex id stored at a given index.
    pub(crate) fn vertex_id(&self, index: usize) -> u32 {
        self.vertices[index]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_and_dedups() {
        let graph = Graph::parse(["0-1", "0-2", "1-2", "2-1", "0-1"]).unwrap();
        assert_eq!(graph.vertex_count(), 3);
        // 2-1 and the repeated 0-1 collapse onto existing edges.
        assert_eq!(graph.edge_count(), 3);
    }

    #[test]
    fn keeps_self_loops() {
        let graph = Graph::parse(["3-3"]).unwrap();
        assert_eq!(graph.vertex_count(), 1);
        assert_eq!(graph.edge_count(), 1);
    }

    #[test]
    fn rejects_malformed_tokens() {
        for bad in ["01", "a-b", "1-", "-2", "1-2-3", "1_2"] {
            assert_eq!(
                Graph::parse([bad]),
                Err(GraphError::BadEdge {
                    token: bad.to_string()
                }),
                "accepted {bad:?}"
            );
        }
    }

    #[test]
    fn rejects_empty_input() {
        assert_eq!(Graph::parse(Vec::<String>::new()), Err(GraphError::NoEdges));
    }
}
