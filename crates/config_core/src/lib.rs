//! Core of the configuration server
//!
//! This crate resolves per-application, per-profile configuration bundles
//! from a backing store. It has no knowledge of HTTP.
//!
//! # Architecture
//!
//! Request flow, leaves first:
//! - [`SourceBackend`] implementations read raw documents and report a
//!   version token (local directory or git repository)
//! - [`resolver`] picks and orders the documents that apply to a request
//! - [`MergeEngine`] parses, flattens and placeholder-substitutes them into a
//!   [`ResolvedBundle`]
//! - [`BundleCache`] keeps bundles keyed by request and backend version and
//!   collapses concurrent misses into one computation
//! - [`ConfigService`] wires the above into a single `resolve` call

// Request and document model
pub mod bundle;
pub mod document;
pub mod errors;
pub mod request;

// Storage
pub mod backend;

// Resolution and merging
pub mod merger;
pub mod parsers;
pub mod placeholders;
pub mod resolver;

// Caching and orchestration
pub mod cache;
pub mod service;

pub use backend::{FilesystemBackend, GitBackend, GitBackendConfig, SourceBackend};
pub use bundle::{PropertySource, ResolvedBundle};
pub use cache::{BundleCache, CacheEntry};
pub use document::{BackendVersion, DocumentFormat, FetchedDocuments, SourceDocument};
pub use errors::{ConfigError, ConfigResult, ErrorKind};
pub use merger::MergeEngine;
pub use placeholders::{ProcessEnvironment, VariableSource};
pub use request::{CacheKey, ConfigRequest, DEFAULT_LABEL, DEFAULT_PROFILE};
pub use service::{ConfigService, ServiceOptions};
