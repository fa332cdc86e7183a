//! Bitmap Module
//!
//! The compressed bitmap every store persists.
//!
//! ## Responsibilities
//! - Point mutation (add/remove) reporting whether anything changed
//! - Range counting and ascending range iteration
//! - Owned copies for results that must outlive the store's storage
//! - Portable binary (de)serialization
//!
//! ## Container Choice
//! `roaring::RoaringTreemap` (64-bit roaring). This crate never defines
//! the encoding; it only reads and writes the treemap's portable format.

mod container;

pub use container::Bitmap;
