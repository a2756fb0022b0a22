//! HTTP request handlers organized by resource type

pub mod annotations;
pub mod auth;
pub mod health;

pub use annotations::{
    annotate_handler, get_annotation_handler, list_annotations_handler, save_annotation_handler,
};
pub use auth::{current_user_handler, register_handler, token_handler};
pub use health::health_handler;
