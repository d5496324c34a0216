pub mod classify;
pub mod health;

pub use classify::classify_image;
pub use health::{health_check, readiness_check};
