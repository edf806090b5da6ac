// API routes and handlers

pub mod health;
pub mod routes;
pub mod auth;
pub mod profile;
pub mod catalog;
pub mod plans;
pub mod sessions;
pub mod analytics;
