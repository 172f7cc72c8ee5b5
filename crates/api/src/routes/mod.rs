//! Handlers grouped by resource.

pub mod activities;
pub mod assessments;
pub mod auth;
pub mod badges;
pub mod modules;
pub mod progress;
pub mod stats;
