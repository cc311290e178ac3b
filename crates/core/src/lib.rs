//! Domain logic for the flexistat reporting client.
//!
//! Pure, I/O-free building blocks: the URL-safe JSON token codec, the
//! dimension model and resolver, the flexible-report query model with its
//! query-parameter encoding, harvest attempt/intention state classifiers,
//! and the export status model. Network access lives in the companion
//! `flexistat-client` crate.

pub mod attempt;
pub mod dimension;
pub mod error;
pub mod export;
pub mod intention;
pub mod report;
pub mod report_type;
pub mod serialization;
pub mod types;
