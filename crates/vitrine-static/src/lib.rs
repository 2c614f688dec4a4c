//! # Vitrine Static
//!
//! Serves files from an asset directory byte-for-byte.
//!
//! - Paths are confined to the asset root; escapes answer 404
//! - `Content-Type` from the file extension
//! - `ETag` and `Last-Modified` validators, `If-None-Match` answers 304
//! - `Cache-Control: public, max-age=<seconds>` on every served file
//!
//! ## Module Structure
//!
//! - [`metadata`] - Per-file size, timestamps, validators and MIME type
//! - [`server`] - The [`AssetServer`] handler

#![warn(rustdoc::broken_intra_doc_links)]

pub mod metadata;
pub mod server;

pub use metadata::AssetMetadata;
pub use server::AssetServer;
