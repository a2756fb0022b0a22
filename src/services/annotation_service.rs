//! Annotation lifecycle service
//!
//! Runs the prediction collaborator for drafts and persists reviewed annotations.
//! Separated from HTTP concerns; callers hand in an already resolved identity.

use std::sync::Arc;

use tracing::{info, instrument, warn};

use crate::auth::AuthContext;
use crate::config::PredictorConfig;
use crate::domain::{AnnotationDraft, AnnotationId, AnnotationRecord, Entity, NewAnnotation};
use crate::errors::{Error, Result};
use crate::observability::metrics;
use crate::services::predictor::SharedPredictor;
use crate::storage::AnnotationRepository;

/// Service for the predict, curate and persist flow
#[derive(Clone)]
pub struct AnnotationService {
    repository: Arc<dyn AnnotationRepository>,
    predictor: SharedPredictor,
    labels: Arc<[String]>,
    threshold: f64,
}

impl AnnotationService {
    /// Create a service with the label set and threshold taken from configuration
    pub fn new(
        repository: Arc<dyn AnnotationRepository>,
        predictor: SharedPredictor,
        config: &PredictorConfig,
    ) -> Self {
        Self {
            repository,
            predictor,
            labels: config.labels.iter().cloned().collect(),
            threshold: config.threshold,
        }
    }

    /// Run the prediction collaborator on `text`. Nothing is stored.
    #[instrument(skip(self, text, caller), fields(username = %caller.username, text_len = text.len()))]
    pub async fn annotate(&self, text: &str, caller: &AuthContext) -> Result<AnnotationDraft> {
        if text.trim().is_empty() {
            metrics::record_prediction("empty_text").await;
            return Err(Error::EmptyText);
        }

        match self.predictor.predict(text, &self.labels, self.threshold).await {
            Ok(entities) => {
                metrics::record_prediction("success").await;
                info!(entities = entities.len(), "text annotated");
                Ok(AnnotationDraft { text: text.to_string(), entities })
            }
            Err(err) => {
                metrics::record_prediction("error").await;
                warn!(error = %err, "prediction failed");
                Err(err)
            }
        }
    }

    /// Persist an annotation owned by the caller. `curated_annotations` present (even
    /// empty) marks the record as curated.
    #[instrument(skip_all, fields(username = %caller.username, curated = curated_annotations.is_some()))]
    pub async fn save(
        &self,
        caller: &AuthContext,
        original_text: String,
        model_annotations: Vec<Entity>,
        curated_annotations: Option<Vec<Entity>>,
    ) -> Result<AnnotationRecord> {
        let record = self
            .repository
            .save(NewAnnotation {
                owner_id: caller.user_id.clone(),
                original_text,
                model_annotations,
                curated_annotations,
            })
            .await?;

        metrics::record_annotation_saved(record.is_curated()).await;
        info!(annotation_id = %record.id, "annotation saved");
        Ok(record)
    }

    /// All stored records, newest first. Records whose payload cannot be decoded are
    /// left out and logged.
    #[instrument(skip(self))]
    pub async fn list(&self) -> Result<Vec<AnnotationRecord>> {
        let entries = self.repository.list_all().await?;
        let mut records = Vec::with_capacity(entries.len());

        for entry in entries {
            match entry {
                Ok(record) => records.push(record),
                Err(Error::CorruptAnnotationData { id, source }) => {
                    metrics::record_corrupt_read().await;
                    warn!(annotation_id = %id, error = %source, "skipping corrupt annotation record");
                }
                Err(err) => return Err(err),
            }
        }

        Ok(records)
    }

    /// A single record by id
    #[instrument(skip(self), fields(annotation_id = %id))]
    pub async fn get(&self, id: &AnnotationId) -> Result<AnnotationRecord> {
        match self.repository.find_by_id(id).await {
            Ok(Some(record)) => Ok(record),
            Ok(None) => Err(Error::not_found("Annotation", id.as_str())),
            Err(err @ Error::CorruptAnnotationData { .. }) => {
                metrics::record_corrupt_read().await;
                warn!(error = %err, "requested annotation record is corrupt");
                Err(err)
            }
            Err(err) => Err(err),
        }
    }
}
