//! Wire codec for candidate solutions.
//!
//! A solution travels as text: one ASCII digit for the number of removed
//! edges, a space, then the space-separated edges themselves. The optimal
//! solution encodes as `"0 "`. The encoding never contains a NUL byte, so it
//! composes with the channel's NUL-terminated framing.
//!
//! ```text
//! "3 0-1 0-2 1-2"
//!  │ └────┬────┘
//!  │   removed edges
//!  └ cost digit
//! ```

use crate::graph::Edge;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum WireError {
    #[error("empty message")]
    Empty,

    #[error("message is not valid text")]
    NotText,

    #[error("leading cost is not a single digit")]
    BadCost,

    #[error("missing separator after the cost digit")]
    MissingSeparator,

    #[error("invalid edge item `{token}`")]
    BadEdge { token: String },

    #[error("cost digit says {declared} edges, message carries {found}")]
    CountMismatch { declared: usize, found: usize },

    #[error("cost {0} does not fit a single digit")]
    CostTooLarge(usize),
}

/// A candidate solution: the set of edges whose removal makes the graph
/// 3-colorable. Empty means the graph is 3-colorable as-is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Solution {
    pub removed: Vec<Edge>,
}

impl Solution {
    /// Number of removed edges; the value the supervisor minimizes.
    pub fn cost(&self) -> usize {
        self.removed.len()
    }

    /// A zero-cost solution proves 3-colorability and ends the search.
    pub fn is_optimal(&self) -> bool {
        self.removed.is_empty()
    }

    /// Serializes for the channel. Fails only if the cost exceeds one digit,
    /// which the heuristic's edge bound already rules out.
    pub fn encode(&self) -> Result<Vec<u8>, WireError> {
        if self.cost() > 9 {
            return Err(WireError::CostTooLarge(self.cost()));
        }

        let items = self
            .removed
            .iter()
            .map(Edge::to_string)
            .collect::<Vec<_>>()
            .join(" ");
        Ok(format!("{} {}", self.cost(), items).into_bytes())
    }

    /// Parses a message read from the channel (terminator already stripped).
    pub fn decode(bytes: &[u8]) -> Result<Self, WireError> {
        if bytes.is_empty() {
            return Err(WireError::Empty);
        }

        let cost = match bytes[0] {
            digit @ b'0'..=b'9' => (digit - b'0') as usize,
            _ => return Err(WireError::BadCost),
        };
        if bytes.get(1).copied() != Some(b' ') {
            return Err(WireError::MissingSeparator);
        }

        let items = std::str::from_utf8(&bytes[2..]).map_err(|_| WireError::NotText)?;
        let mut removed = Vec::with_capacity(cost);
        for token in items.split_ascii_whitespace() {
            let bad = || WireError::BadEdge {
                token: token.to_string(),
            };
            let (a, b) = token.split_once('-').ok_or_else(bad)?;
            removed.push(Edge {
                a: a.parse().map_err(|_| bad())?,
                b: b.parse().map_err(|_| bad())?,
            });
        }

        if removed.len() != cost {
            return Err(WireError::CountMismatch {
                declared: cost,
                found: removed.len(),
            });
        }

        Ok(Self { removed })
    }
}

impl std::fmt::Display for Solution {
    /// The human-readable edge list, without the cost prefix.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut first = true;
        for edge in &self.removed {
            if !first {
                write!(f, " ")?;
            }
            write!(f, "{edge}")?;
            first = false;
        }
        Ok(())
    }
}
