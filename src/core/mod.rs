//! # Core Module
//!
//! Concurrency primitives shared by the rest of the pipeline.
//!
//! ## Key Components
//! - `MtResource`: Thread-safe reference-counted resource with read-write locking.
//!   Every chunk published by a worker thread lives inside one of these.

pub mod mt_resource;

pub use mt_resource::MtResource;
