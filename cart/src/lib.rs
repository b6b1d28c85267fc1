//! A concurrent, copy-on-write Adaptive Radix Tree.
//!
//! [`AdaptiveRadixTree`] is an ordered map from byte strings to values that many threads can
//! read and write at once through a shared reference. Inner nodes adapt their fan-out between
//! four capacity classes, paths are prefix-compressed, and every node carries its own lock.
//! Iterators and clones work on point-in-time snapshots: writers copy the nodes a snapshot can
//! still reach instead of changing them.
//!
//! ```rust
//! use std::sync::Arc;
//! use std::thread;
//!
//! use cart::AdaptiveRadixTree;
//!
//! let tree = Arc::new(AdaptiveRadixTree::new());
//! let handles: Vec<_> = (0..4u32)
//!     .map(|t| {
//!         let tree = tree.clone();
//!         thread::spawn(move || {
//!             for i in 0..100u32 {
//!                 tree.insert(format!("t{t}/{i:03}"), i);
//!             }
//!         })
//!     })
//!     .collect();
//! for h in handles {
//!     h.join().unwrap();
//! }
//!
//! assert_eq!(tree.len(), 400);
//! assert_eq!(tree.prefix_iter("t2/").count(), 100);
//! assert_eq!(tree.longest_prefix("t3/050/extra").map(|(_, v)| v), Some(50));
//! ```

pub mod invariants;
pub mod iter;
pub mod mapping;
mod node;
pub mod partials;
pub mod path_iter;
pub mod stats;
pub mod tree;
pub mod utils;

#[cfg(test)]
mod proptests;

pub use invariants::InvariantViolation;
pub use iter::Iter;
pub use node::NodeKind;
pub use path_iter::{PathIter, PrefixIter};
pub use stats::{NodeStats, TreeStats, TreeStatsTrait};
pub use tree::AdaptiveRadixTree;
