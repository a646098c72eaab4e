//! Multi-page static HTML builder for pagewire.
//!
//! Discovers page files, wires them as build entries, expands shared partials
//! with page metadata, emits referenced assets and strips module-loading hints
//! from the final HTML.

pub mod assets;
pub mod builder;
pub mod bundle;
pub mod context;
pub mod discover;
pub mod entries;
pub mod env;
pub mod sanitize;
pub mod templates;

pub use builder::{BuildConfig, BuildError, BuildResult, StaticBuilder};
pub use context::{ContextProvider, RenderContext};
pub use entries::EntryMap;
pub use env::{EnvError, EnvLoader};
pub use sanitize::sanitize_html;
