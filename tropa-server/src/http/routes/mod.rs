//! REST route modules

pub mod activities;
pub mod auth;
pub mod health;
pub mod messages;
pub mod pages;
pub mod sections;
pub mod uploads;
pub mod users;
