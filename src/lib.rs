pub mod app;
pub mod auth;
pub mod bookings;
pub mod config;
pub mod domain;
pub mod error;
pub mod matches;
pub mod payments;
pub mod policy;
pub mod reviews;
pub mod state;
pub mod users;
pub mod validate;
pub mod venues;
