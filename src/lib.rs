//! Lead Scoring API Library
//!
//! This library provides the lead-management service: a CRUD API over lead
//! records that asks an external scoring provider for a priority score on
//! creation, plus the view models that keep list and analytics views in sync
//! with the table.
//!
//! # Modules
//!
//! - `analytics`: Aggregates for list/analytics views.
//! - `api_client`: Typed client for the Lead Record API.
//! - `app`: Router and state construction.
//! - `bulk`: Clear-all and reset-to-demo-data operations.
//! - `config`: Configuration management.
//! - `db`: Database connection and migrations.
//! - `errors`: Error handling types.
//! - `form`: New-lead form validation and submission.
//! - `handlers`: HTTP request handlers.
//! - `leads`: Lead lifecycle (create/read/update/delete).
//! - `models`: Core data models.
//! - `services`: Scoring provider client and engagement weights.
//! - `store`: Persistence provider contract and implementations.
//! - `views`: Live view models driven by the change feed.

pub mod analytics;
pub mod api_client;
pub mod app;
pub mod bulk;
pub mod config;
pub mod db;
pub mod errors;
pub mod form;
pub mod handlers;
pub mod leads;
pub mod models;
pub mod services;
pub mod store;
pub mod views;
