pub mod classification;

pub use classification::ClassificationResponse;
