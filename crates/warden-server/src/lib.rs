//! HTTP access-control surface over the warden decision engine: the
//! route-gating middleware, the decision REST API, and the ambient
//! server plumbing (config, CLI, audit, metrics, telemetry).

pub mod adapter;
pub mod audit;
pub mod cli;
pub mod config;
pub mod error;
pub mod metrics;
pub mod middleware;
pub mod rest;
pub mod service;
pub mod telemetry;
