//! Annotation domain types.
//!
//! An annotation moves through three states: a [`AnnotationDraft`] holds fresh model
//! output that has not been stored, and a persisted [`AnnotationRecord`] is either
//! uncurated or curated depending on whether a reviewed entity list was attached when
//! it was saved. Records are write-once.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::id::{AnnotationId, UserId};
use crate::errors::{Error, Result};

/// A single named entity span.
///
/// Offsets are whatever the prediction service reports (character offsets for the
/// bundled model). Fields the model adds beyond the ones named here are kept in
/// `extra` so stored payloads round-trip unchanged. That includes `score` or `text`
/// keys whose value is `null` or of an unexpected JSON type: they stay in `extra`
/// verbatim instead of being folded into the typed fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawEntity")]
pub struct Entity {
    pub label: String,
    pub start: usize,
    pub end: usize,
    /// Model confidence; absent for entities added by hand during curation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Deserialize)]
struct RawEntity {
    label: String,
    start: usize,
    end: usize,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

impl From<RawEntity> for Entity {
    fn from(raw: RawEntity) -> Self {
        let mut extra = raw.extra;
        // Integer scores stay in `extra`: re-encoding them as f64 would change the JSON.
        let score = take_typed(&mut extra, "score", |v| v.as_f64().filter(|_| v.is_f64()));
        let text = take_typed(&mut extra, "text", |v| v.as_str().map(str::to_owned));

        Self { label: raw.label, start: raw.start, end: raw.end, score, text, extra }
    }
}

fn take_typed<T>(
    extra: &mut Map<String, Value>,
    key: &str,
    read: impl Fn(&Value) -> Option<T>,
) -> Option<T> {
    let value = extra.get(key).and_then(read)?;
    extra.remove(key);
    Some(value)
}

impl Entity {
    pub fn new(label: impl Into<String>, start: usize, end: usize, score: f64) -> Self {
        Self {
            label: label.into(),
            start,
            end,
            score: Some(score),
            text: None,
            extra: Map::new(),
        }
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// Whether the entity carries a numeric confidence, typed or kept verbatim.
    pub fn has_score(&self) -> bool {
        self.score.is_some() || self.extra.get("score").is_some_and(Value::is_number)
    }

    fn check(&self, field: &str) -> Result<()> {
        if self.label.trim().is_empty() {
            return Err(Error::validation_field("entity label cannot be empty", field));
        }
        if self.start > self.end {
            return Err(Error::validation_field(
                format!("entity span {}..{} has start after end", self.start, self.end),
                field,
            ));
        }
        Ok(())
    }
}

/// Validate every entity of a list, naming the payload field on failure.
pub fn validate_entities(entities: &[Entity], field: &str) -> Result<()> {
    entities.iter().try_for_each(|entity| entity.check(field))
}

/// Validate model output: every entity must also carry a confidence score.
pub fn validate_model_entities(entities: &[Entity], field: &str) -> Result<()> {
    entities.iter().try_for_each(|entity| {
        entity.check(field)?;
        if !entity.has_score() {
            return Err(Error::validation_field(
                format!("model entity '{}' at {}..{} has no score", entity.label, entity.start, entity.end),
                field,
            ));
        }
        Ok(())
    })
}

/// Lifecycle position of an annotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AnnotationState {
    Drafted,
    SavedUncurated,
    SavedCurated,
}

/// Model output for a piece of text that has not been persisted yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotationDraft {
    pub text: String,
    pub entities: Vec<Entity>,
}

impl AnnotationDraft {
    pub fn state(&self) -> AnnotationState {
        AnnotationState::Drafted
    }
}

/// Payload for persisting an annotation.
#[derive(Debug, Clone, PartialEq)]
pub struct NewAnnotation {
    pub owner_id: UserId,
    pub original_text: String,
    pub model_annotations: Vec<Entity>,
    pub curated_annotations: Option<Vec<Entity>>,
}

/// Stored annotation record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotationRecord {
    pub id: AnnotationId,
    pub original_text: String,
    pub model_annotations: Vec<Entity>,
    pub curated_annotations: Option<Vec<Entity>>,
    pub created_at: DateTime<Utc>,
    pub owner_id: UserId,
}

impl AnnotationRecord {
    pub fn state(&self) -> AnnotationState {
        if self.curated_annotations.is_some() {
            AnnotationState::SavedCurated
        } else {
            AnnotationState::SavedUncurated
        }
    }

    pub fn is_curated(&self) -> bool {
        self.curated_annotations.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn entity_keeps_unknown_model_fields() {
        let raw = json!({
            "label": "Ort",
            "start": 0,
            "end": 5,
            "score": 0.93,
            "text": "Paris",
            "class_probability": [0.1, 0.9]
        });

        let entity: Entity = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(entity.label, "Ort");
        assert_eq!(entity.text.as_deref(), Some("Paris"));
        assert!(entity.extra.contains_key("class_probability"));
        assert_eq!(serde_json::to_value(&entity).unwrap(), raw);
    }

    #[test]
    fn hand_added_entity_has_no_score() {
        let entity: Entity =
            serde_json::from_value(json!({"label": "Datum", "start": 7, "end": 11})).unwrap();
        assert_eq!(entity.score, None);
        assert_eq!(
            serde_json::to_value(&entity).unwrap(),
            json!({"label": "Datum", "start": 7, "end": 11})
        );
    }

    #[test]
    fn explicit_nulls_and_integer_scores_are_preserved() {
        let raw = json!({
            "label": "Ort",
            "start": 0,
            "end": 5,
            "score": null,
            "text": null
        });
        let entity: Entity = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(entity.score, None);
        assert_eq!(entity.text, None);
        assert_eq!(serde_json::to_value(&entity).unwrap(), raw);

        let raw = json!({"label": "Ort", "start": 0, "end": 5, "score": 1});
        let entity: Entity = serde_json::from_value(raw.clone()).unwrap();
        assert!(entity.has_score());
        assert_eq!(serde_json::to_value(&entity).unwrap(), raw);
    }

    #[test]
    fn float_scores_survive_text_encoding() {
        for score in [0.9856906946328695, 0.1 + 0.2, 1e-300, 0.7071067811865476] {
            let encoded = serde_json::to_string(&Entity::new("Ort", 0, 5, score)).unwrap();
            let decoded: Entity = serde_json::from_str(&encoded).unwrap();
            assert_eq!(decoded.score.map(f64::to_bits), Some(score.to_bits()));
        }
    }

    #[test]
    fn model_entities_need_a_score() {
        let scored = vec![Entity::new("Ort", 0, 5, 0.9)];
        assert!(validate_model_entities(&scored, "model_annotations").is_ok());

        let hand_added: Entity =
            serde_json::from_value(json!({"label": "Datum", "start": 7, "end": 11})).unwrap();
        assert!(validate_entities(std::slice::from_ref(&hand_added), "curated_annotations").is_ok());
        let err = validate_model_entities(&[hand_added], "model_annotations").unwrap_err();
        assert!(matches!(err, Error::Validation { field: Some(ref f), .. } if f == "model_annotations"));
    }

    #[test]
    fn entity_without_label_is_rejected_by_serde() {
        let result = serde_json::from_value::<Entity>(json!({"start": 0, "end": 1}));
        assert!(result.is_err());
    }

    #[test]
    fn validate_entities_rejects_inverted_span() {
        let entities = vec![Entity::new("Ort", 0, 5, 0.9), Entity::new("Datum", 9, 7, 0.8)];
        let err = validate_entities(&entities, "model_annotations").unwrap_err();
        assert!(matches!(err, Error::Validation { field: Some(ref f), .. } if f == "model_annotations"));
    }

    #[test]
    fn record_state_follows_curated_presence() {
        let mut record = AnnotationRecord {
            id: AnnotationId::new(),
            original_text: "Paris, 2024".into(),
            model_annotations: vec![Entity::new("Ort", 0, 5, 0.9)],
            curated_annotations: None,
            created_at: Utc::now(),
            owner_id: UserId::new(),
        };
        assert_eq!(record.state(), AnnotationState::SavedUncurated);

        record.curated_annotations = Some(Vec::new());
        assert_eq!(record.state(), AnnotationState::SavedCurated);
        assert!(record.is_curated());
    }

    #[test]
    fn draft_is_drafted() {
        let draft = AnnotationDraft { text: "Paris".into(), entities: vec![] };
        assert_eq!(draft.state(), AnnotationState::Drafted);
    }
}
