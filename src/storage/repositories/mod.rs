//! Repository modules for data access
//!
//! Each repository is an `async_trait` seam with a `Sqlx*` implementation over the pool.

pub mod annotation;
pub mod user;

pub use annotation::{AnnotationRepository, SqlxAnnotationRepository};
pub use user::{SqlxUserRepository, UserRepository};
