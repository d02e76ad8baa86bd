mod coloring;
mod graph;
mod wire;

pub use coloring::{Color, MAX_REMOVED_EDGES, random_candidate, random_coloring, violations};
pub use graph::{Edge, Graph, GraphError};
pub use wire::{Solution, WireError};
