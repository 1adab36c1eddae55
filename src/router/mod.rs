//! # Router Module
//!
//! Path matching and route resolution.
//!
//! Patterns are slash-delimited; a segment starting with `:` captures a
//! named path parameter. Registered patterns are stored in a trie, so a
//! lookup costs one node walk per path segment regardless of how many
//! routes exist. Literal segments always win over parameter captures at
//! the same position, and the matched pattern's normalised form
//! (`/users/:id`) keys the route table.

mod core;
mod trie;

pub use self::core::{Route, Router};
pub use trie::PathTrie;
