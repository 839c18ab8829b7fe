//! Conversations as reply graphs.
//!
//! This module holds the container layer of the crate. Posts from any
//! platform are collected into a [`Conversation`], which maintains the
//! reply edges between them and answers structural questions about the
//! whole thread. Capabilities are split across submodules:
//!
//! - **conversation**: the container itself, plus aggregate statistics
//!   (sizes, users, tokens, time bounds) and JSON/byte serialization
//! - **navigation**: anchored selections such as a post's ancestors,
//!   descendants, siblings, or the temporal before/after slices
//! - **segment**: splitting a post dump into its connected threads
//! - **redact**: conversation-wide anonymization with a shared name map
//!
//! ## Tolerance
//!
//! Conversations are built from scraped, incomplete data. A reply
//! target that never arrived is kept as a dangling reference: it shows
//! up in `connections_unrestricted` but is otherwise excluded from
//! every structural statistic, and the post pointing at it counts as a
//! source. Adding the same uid twice merges the two sightings instead
//! of overwriting.

mod conversation;
mod navigation;
mod redact;
mod segment;

pub use conversation::{Conversation, ConvoFilter};
