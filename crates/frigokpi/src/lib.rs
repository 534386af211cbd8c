//! Frigo KPI backend library.
//!
//! Identity directory, credential verification, server-side sessions and
//! role-based authorization for the ALS Groupe Frigo KPI CRM.

pub mod api;
pub mod auth;
pub mod db;
pub mod session;
pub mod user;
