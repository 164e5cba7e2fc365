//! This crate provides miscellaneous utilities shared by the rest of the
//! pgcache workspace: identifier casing conversions (spec.md §6) and the
//! typed key-path walk used by the introspection registry (spec.md §4.6).
#![deny(missing_docs)]

pub mod columns;
pub mod keypath;
