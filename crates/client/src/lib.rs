//! REST client and async aggregates for the flexistat reporting backend.
//!
//! Provides typed endpoint wrappers over [`reqwest`], the async halves of
//! the flexible report/export models (config loading with a concurrent
//! report-type join, save, rename, export), the id-to-label translation
//! cache, and background task polling. Pure domain logic lives in
//! `flexistat-core`.

pub mod api;
pub mod export;
pub mod id_translation;
pub mod report;
pub mod task;
