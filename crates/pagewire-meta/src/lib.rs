//! Page metadata for pagewire.
//!
//! This crate reads the comment annotations at the top of HTML page files
//! (`<!-- @pageTitle Home -->`) and turns each page into a [`PageRecord`]
//! carrying its logical entry name.

pub mod annotation;
pub mod record;

pub use annotation::{extract_annotations, Annotations, ANNOTATION_LINES};
pub use record::{derive_name, normalize_path, PageRecord, PAGE_EXTENSION};
