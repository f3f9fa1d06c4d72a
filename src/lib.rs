//! Sewing Costing Library
//!
//! Cost and price recalculation for sewing production: unit prices of
//! product variants, variant cloning, fill-from copying of accessories and
//! operations, and order quantity/amount aggregation.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod migrator;
pub mod models;
pub mod services;

pub use errors::{AppError, ErrorKind, ServiceError};
