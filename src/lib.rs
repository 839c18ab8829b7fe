//! # convograph - Conversation Graph Engine
//!
//! A graph-first model of social-media conversations in Rust. Posts from
//! heterogeneous platforms become nodes in a reply DAG, and the library
//! measures that DAG at every scale: single posts, posts in context,
//! whole conversations, and the users behind them.
//!
//! ## Features
//!
//! - **Unified message model**: Twitter, Reddit, Facebook, and 4chan
//!   posts behind one enum with platform-aware raw parsing
//! - **Conversation containers**: merge duplicate sightings, segment
//!   disjoint threads, filter, and redact, with reply edges derived
//!   from the posts themselves
//! - **Three-tier feature extraction**: token, graph, temporal, and
//!   vocabulary mixing-law measures at post, conversation, and user
//!   scale
//! - **Vectorization**: fit/transform matrices over any tier with
//!   min-max, mean, or standard normalization
//!
//! ## Building a conversation
//!
//! ```rust
//! use convograph::convo::Conversation;
//! use convograph::message::{MessageFields, Tweet, Uid};
//!
//! let mut convo = Conversation::new();
//! for ix in 0..3i64 {
//!     let mut fields = MessageFields::new(ix).with_text(format!("Post {ix}"));
//!     fields.author = Some(format!("USER{}", ix % 2));
//!     fields.created_at = Some(ix as f64);
//!     if ix > 0 {
//!         fields.reply_to.insert(Uid::Num(ix - 1));
//!     }
//!     convo.add_post(Tweet::new(fields).into());
//! }
//!
//! assert_eq!(convo.messages(), 3);
//! assert_eq!(convo.connections(), 2);
//! ```
//!
//! ## Extracting features
//!
//! ```rust
//! # use convograph::convo::Conversation;
//! # use convograph::message::{MessageFields, Tweet, Uid};
//! use convograph::feature::vectorize::{Normalization, PostVectorizer, VectorInput};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! # let mut convo = Conversation::new();
//! # for ix in 0..3i64 {
//! #     let mut fields = MessageFields::new(ix).with_text(format!("Post {ix}"));
//! #     fields.author = Some(format!("USER{}", ix % 2));
//! #     fields.created_at = Some(ix as f64);
//! #     if ix > 0 {
//! #         fields.reply_to.insert(Uid::Num(ix - 1));
//! #     }
//! #     convo.add_post(Tweet::new(fields).into());
//! # }
//! let mut vectorizer = PostVectorizer::new(Normalization::MinMax);
//! let matrix = vectorizer.fit_transform(VectorInput::Convo(&convo))?;
//! assert_eq!(matrix.len(), 3);
//! # Ok(())
//! # }
//! ```

pub mod convo;
pub mod error;
pub mod feature;
pub mod graph;
pub mod lang;
pub mod message;
pub mod reader;
pub mod tokenize;

pub use error::{ConvoError, Result};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
