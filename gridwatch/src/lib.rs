//! GridWatch - scheduling and zonal statistics for geospatial monitoring jobs
//!
//! This library provides the core machinery of a geo-monitoring platform:
//! a process-scheduling engine shared by collector, analysis and view
//! services, and the geometry-raster intersection engine analyses use to
//! compute zonal statistics over monitored regions.
//!
//! # High-Level API
//!
//! A service wires its catalog, job body and run log into a [`scheduler::ServiceCore`]:
//!
//! ```ignore
//! use gridwatch::scheduler::{ServiceCore, ServiceConfig, InstanceId, JobId, TracingProcessLog};
//! use gridwatch::analysis::AnalysisExecutor;
//! use std::sync::Arc;
//!
//! let config = ServiceConfig::new(InstanceId(1));
//! let body = Arc::new(AnalysisExecutor::new(registry.clone(), catalog, sink));
//! let service = ServiceCore::new(config, registry, body, Arc::new(TracingProcessLog::new()));
//!
//! service.start();
//! service.add_to_queue(JobId(42), trigger_time);
//! ```
//!
//! The zonal path is usable on its own: [`intersection::BitsetIntersection`]
//! masks the raster cells inside a geometry, and [`zonal::accumulate`] folds
//! slice values into per-cell accumulators.

pub mod analysis;
pub mod catalog;
pub mod collector;
pub mod geom;
pub mod intersection;
pub mod raster;
pub mod scheduler;
pub mod time;
pub mod zonal;

/// Version of the GridWatch library.
///
/// Synchronized across the workspace; defined in `Cargo.toml` and injected
/// at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
