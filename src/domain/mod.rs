//! Domain layer
//!
//! Plain entities shared by the storage, service and API layers.
//!
//! - `id`: type-safe identifiers with the NewType pattern
//! - `annotation`: entity spans, drafts and stored annotation records

pub mod annotation;
pub mod id;

pub use annotation::{
    validate_entities, validate_model_entities, AnnotationDraft, AnnotationRecord, AnnotationState,
    Entity, NewAnnotation,
};
pub use id::{AnnotationId, UserId};
