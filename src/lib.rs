//! Rentroute - car-rental affiliate deep-link router
//!
//! This library builds partner deep links (Kayak, Skyscanner, AutoRentals),
//! tracks landings and clicks, and runs the resilient search pipeline that
//! opens one partner in a new tab and redirects the current page to another.
//!
//! # Features
//! - **server**: HTTP server mode (default)
//! - **cli**: Command-line interface
//!
//! # Architecture
//! - `partners`: Partner adapters (URL building, click records)
//! - `services`: Registry, landing tracker, orchestrator, search passthrough
//! - `reporting`: Error classification and batched error logs
//! - `storage`: Tracking store backends (SeaORM, in-memory)
//! - `api`: HTTP services and middleware
//! - `interfaces`: User interfaces (CLI)
//! - `config`: Configuration management
//! - `runtime`: Application lifecycle and execution modes
//! - `system`: Logging

pub mod api;
pub mod cli;
pub mod config;
pub mod errors;
pub mod interfaces;
pub mod models;
pub mod partners;
pub mod reporting;
pub mod runtime;
pub mod services;
pub mod storage;
pub mod system;
pub mod utils;
