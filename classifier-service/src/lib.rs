//! classifier-service: HTTP front end for a pretrained image classifier.
pub mod config;
pub mod dtos;
pub mod handlers;
pub mod models;
pub mod services;
pub mod startup;
