//! Annotation repository.
//!
//! Entity lists are stored as JSON text and decoded on every read. A record whose
//! payload no longer parses fails on its own with [`Error::CorruptAnnotationData`];
//! the rest of a listing is unaffected.

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use sqlx::FromRow;
use tracing::instrument;

use crate::domain::{
    validate_entities, validate_model_entities, AnnotationId, AnnotationRecord, Entity,
    NewAnnotation, UserId,
};
use crate::errors::{Error, Result};
use crate::storage::DbPool;
use crate::utils::clock::{Clock, SharedClock};

#[derive(Debug, Clone, FromRow)]
struct AnnotationRow {
    pub id: String,
    pub original_text: String,
    pub model_annotations: String,
    pub curated_annotations: Option<String>,
    pub created_at: DateTime<Utc>,
    pub owner_id: String,
}

impl AnnotationRow {
    fn into_record(self) -> Result<AnnotationRecord> {
        let id = AnnotationId::from_string(self.id);

        let model_annotations = decode_entities(&id, &self.model_annotations)?;
        let curated_annotations = self
            .curated_annotations
            .as_deref()
            .map(|raw| decode_entities(&id, raw))
            .transpose()?;

        Ok(AnnotationRecord {
            id,
            original_text: self.original_text,
            model_annotations,
            curated_annotations,
            created_at: self.created_at,
            owner_id: UserId::from_string(self.owner_id),
        })
    }
}

fn decode_entities(id: &AnnotationId, raw: &str) -> Result<Vec<Entity>> {
    serde_json::from_str(raw)
        .map_err(|source| Error::CorruptAnnotationData { id: id.clone(), source })
}

fn encode_entities(entities: &[Entity], field: &str) -> Result<String> {
    serde_json::to_string(entities)
        .map_err(|e| Error::internal(format!("Failed to serialize {}: {}", field, e)))
}

const SELECT_COLUMNS: &str =
    "SELECT id, original_text, model_annotations, curated_annotations, created_at, owner_id FROM annotations";

#[async_trait]
pub trait AnnotationRepository: Send + Sync {
    /// Persist a new record, stamping `created_at` with the current time
    async fn save(&self, annotation: NewAnnotation) -> Result<AnnotationRecord>;

    /// Every record, newest first. Each entry decodes independently.
    async fn list_all(&self) -> Result<Vec<Result<AnnotationRecord>>>;

    async fn find_by_id(&self, id: &AnnotationId) -> Result<Option<AnnotationRecord>>;
}

#[derive(Debug, Clone)]
pub struct SqlxAnnotationRepository {
    pool: DbPool,
    clock: SharedClock,
}

impl SqlxAnnotationRepository {
    pub fn new(pool: DbPool, clock: SharedClock) -> Self {
        Self { pool, clock }
    }
}

#[async_trait]
impl AnnotationRepository for SqlxAnnotationRepository {
    #[instrument(skip(self, annotation), fields(owner_id = %annotation.owner_id), name = "db_save_annotation")]
    async fn save(&self, annotation: NewAnnotation) -> Result<AnnotationRecord> {
        if annotation.original_text.trim().is_empty() {
            return Err(Error::EmptyText);
        }

        validate_model_entities(&annotation.model_annotations, "model_annotations")?;
        if let Some(curated) = &annotation.curated_annotations {
            validate_entities(curated, "curated_annotations")?;
        }

        let model_json = encode_entities(&annotation.model_annotations, "model_annotations")?;
        let curated_json = annotation
            .curated_annotations
            .as_deref()
            .map(|entities| encode_entities(entities, "curated_annotations"))
            .transpose()?;

        let id = AnnotationId::new();
        // Stored at microsecond precision so the returned record equals what is read back.
        let created_at = self.clock.now().trunc_subsecs(6);

        sqlx::query(
            r#"
            INSERT INTO annotations (id, original_text, model_annotations, curated_annotations, created_at, owner_id)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(id.as_str())
        .bind(&annotation.original_text)
        .bind(&model_json)
        .bind(&curated_json)
        .bind(created_at.to_rfc3339_opts(SecondsFormat::Micros, true))
        .bind(annotation.owner_id.as_str())
        .execute(&self.pool)
        .await
        .map_err(|err| match err {
            sqlx::Error::Database(ref db_err) if db_err.is_foreign_key_violation() => {
                Error::validation_field("Annotation owner does not exist", "owner_id")
            }
            err => Error::database(err, "Failed to save annotation"),
        })?;

        Ok(AnnotationRecord {
            id,
            original_text: annotation.original_text,
            model_annotations: annotation.model_annotations,
            curated_annotations: annotation.curated_annotations,
            created_at,
            owner_id: annotation.owner_id,
        })
    }

    #[instrument(skip(self), name = "db_list_annotations")]
    async fn list_all(&self) -> Result<Vec<Result<AnnotationRecord>>> {
        let rows = sqlx::query_as::<_, AnnotationRow>(&format!(
            "{} ORDER BY created_at DESC, rowid DESC",
            SELECT_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|err| Error::database(err, "Failed to list annotations"))?;

        Ok(rows.into_iter().map(AnnotationRow::into_record).collect())
    }

    #[instrument(skip(self), fields(annotation_id = %id), name = "db_find_annotation")]
    async fn find_by_id(&self, id: &AnnotationId) -> Result<Option<AnnotationRecord>> {
        let row = sqlx::query_as::<_, AnnotationRow>(&format!("{} WHERE id = ?", SELECT_COLUMNS))
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|err| Error::database(err, "Failed to fetch annotation"))?;

        row.map(AnnotationRow::into_record).transpose()
    }
}
