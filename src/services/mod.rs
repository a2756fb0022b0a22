//! # Business Logic Services
//!
//! Annotation lifecycle orchestration and the prediction collaborator it drives.
//! Authentication services live in [`crate::auth`].

pub mod annotation_service;
pub mod predictor;

pub use annotation_service::AnnotationService;
pub use predictor::{HttpPredictor, Predictor, SharedPredictor, StaticPredictor};
