#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Web metric provider for progressive-delivery analysis
//!
//! Given a declarative metric definition, the provider issues an HTTP request,
//! extracts a value from the response with a path expression, and classifies
//! the measurement as successful, failed, or in error so that a rollout
//! controller can decide whether to proceed.
//!
//! # Module Organization
//!
//! - [`metric`]: Metric definitions and measurement records
//! - [`provider`]: The request, extract, classify pipeline
//! - [`expr`]: Condition evaluation for extracted values

pub type Result<T, E = ohno::AppError> = core::result::Result<T, E>;

pub mod expr;
pub mod metric;
pub mod provider;

pub use crate::provider::{Provider, WebMetricProvider};
