//! # Tarjoman Core - Document IR and Text Machinery
//!
//! Core types and pure transformations for the tarjoman translation
//! pipeline:
//!
//! - [`document`] - the layout-aware IR v2 model (Document → Section →
//!   Block → Span, with anchors and recurring headers/footers)
//! - [`legacy`] - the flat block IR used by the HTML/URL path
//! - [`tagged`] - bracket-tag codec between formatted spans and plain
//!   text that a text-only translator can pass through
//! - [`chunk`] - sentence-aligned splitting under a token budget
//! - [`classify`] - heading/list/paragraph heuristics and section grouping
//! - [`lang`] - character-set language routing and RTL detection
//! - [`error`] - error types shared across the workspace
//!
//! Everything in this crate is synchronous and side-effect free; parsing
//! backends, translation dispatch and rendering live in sibling crates.
//!
//! ## Quick Start
//!
//! ```rust
//! use tarjoman_core::document::{Block, Heading, Span};
//! use tarjoman_core::classify::group_into_sections;
//!
//! let blocks = vec![Block::Heading(Heading::new(1, vec![Span::plain("Intro")]))];
//! let sections = group_into_sections(blocks);
//! assert_eq!(sections.len(), 1);
//! ```

pub mod chunk;
pub mod classify;
pub mod document;
pub mod error;
pub mod lang;
pub mod legacy;
pub mod tagged;

pub use document::*;
pub use error::*;
