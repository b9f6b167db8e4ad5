//! JSON scene description.
//!
//! Attribute values stay in their SVG text form and are parsed while the
//! document is built, so errors point at the JSON entry that caused them.

pub(crate) mod scene;
