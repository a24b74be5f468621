//! The persisted classifier artifact.
//!
//! A [`ModelBundle`] keeps the fitted forest together with the label
//! encoder that gives its output indices meaning and the feature schema that
//! gives its input columns meaning. The three are saved and loaded as one
//! JSON document and are never available separately.

use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::features::{FeatureFrame, FeatureSchema, SCHEMA_VERSION};
use crate::forest::{argmax, ForestParams, RandomForest};
use crate::model::{AnnotatedSpan, Label};
use crate::render::write_atomic;
use crate::trainer::BodyPolicy;

/// Current bundle format version.
pub const FORMAT_VERSION: u32 = 1;

/// Bidirectional mapping between labels and class indices.
///
/// Classes are kept sorted, so the same label set always encodes the same
/// way.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LabelEncoder {
    classes: Vec<Label>,
}

impl LabelEncoder {
    /// Collect the distinct labels of a sequence.
    pub fn fit<I: IntoIterator<Item = Label>>(labels: I) -> Self {
        let mut classes: Vec<Label> = labels.into_iter().collect();
        classes.sort_unstable();
        classes.dedup();
        Self { classes }
    }

    /// Class index of a label.
    pub fn encode(&self, label: Label) -> Option<usize> {
        self.classes.binary_search(&label).ok()
    }

    /// Label of a class index.
    pub fn decode(&self, index: usize) -> Option<Label> {
        self.classes.get(index).copied()
    }

    /// Labels in class-index order.
    pub fn classes(&self) -> &[Label] {
        &self.classes
    }

    /// Number of classes.
    pub fn len(&self) -> usize {
        self.classes.len()
    }

    /// Check if there are no classes.
    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}

/// A predicted label and the share of tree votes behind it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Prediction {
    pub label: Label,
    pub confidence: f64,
}

/// Assigns labels to the annotated spans of one document.
///
/// [`ModelBundle`] is the production implementation; the pipeline only
/// depends on this trait.
pub trait SpanClassifier: Send + Sync {
    /// One prediction per span, in span order.
    fn classify(&self, spans: &[AnnotatedSpan]) -> Result<Vec<Prediction>>;

    /// Whether `body` is one of the predicted classes.
    fn predicts_body(&self) -> bool;
}

/// Fitted forest, label encoder and feature schema as one artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelBundle {
    pub format_version: u32,
    pub trained_at: DateTime<Utc>,
    pub schema: FeatureSchema,
    pub labels: LabelEncoder,
    pub forest: RandomForest,
    pub params: ForestParams,
    pub body_policy: BodyPolicy,
}

impl ModelBundle {
    /// Bundle a freshly fitted forest.
    pub fn new(
        schema: FeatureSchema,
        labels: LabelEncoder,
        forest: RandomForest,
        body_policy: BodyPolicy,
    ) -> Result<Self> {
        let bundle = Self {
            format_version: FORMAT_VERSION,
            trained_at: Utc::now(),
            params: *forest.params(),
            schema,
            labels,
            forest,
            body_policy,
        };
        bundle.validate()?;
        Ok(bundle)
    }

    /// Check that the parts belong together.
    pub fn validate(&self) -> Result<()> {
        if self.format_version != FORMAT_VERSION {
            return Err(Error::InvalidModel(format!(
                "unsupported format version {}",
                self.format_version
            )));
        }
        if self.schema.version != SCHEMA_VERSION {
            return Err(Error::InvalidModel(format!(
                "unsupported feature schema version {}",
                self.schema.version
            )));
        }
        if self.labels.len() != self.forest.n_classes() {
            return Err(Error::InvalidModel(format!(
                "{} labels for a {}-class forest",
                self.labels.len(),
                self.forest.n_classes()
            )));
        }
        if self.schema.len() != self.forest.n_features() {
            return Err(Error::InvalidModel(format!(
                "{} schema columns for a {}-feature forest",
                self.schema.len(),
                self.forest.n_features()
            )));
        }
        self.forest.validate().map_err(Error::InvalidModel)
    }

    /// Write the bundle as JSON, replacing any existing file atomically.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json = serde_json::to_vec(self)?;
        write_atomic(path.as_ref(), &json)?;
        log::info!(
            "Saved model ({} trees, {} classes) to {}",
            self.forest.tree_count(),
            self.labels.len(),
            path.as_ref().display()
        );
        Ok(())
    }

    /// Read and validate a bundle.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let data = fs::read(path.as_ref())?;
        Self::from_slice(&data)
    }

    /// Parse and validate a bundle from JSON bytes.
    pub fn from_slice(data: &[u8]) -> Result<Self> {
        let bundle: Self =
            serde_json::from_slice(data).map_err(|e| Error::InvalidModel(e.to_string()))?;
        bundle.validate()?;
        Ok(bundle)
    }

    /// Classify every row of a frame after conforming it to the schema.
    pub fn predict(&self, frame: &FeatureFrame) -> Result<Vec<Prediction>> {
        let rows = frame.conform(&self.schema)?;
        rows.iter()
            .map(|row| {
                let (index, confidence) = argmax(&self.forest.predict_proba(row));
                let label = self.labels.decode(index).ok_or_else(|| {
                    Error::InvalidModel(format!("class index {} has no label", index))
                })?;
                Ok(Prediction { label, confidence })
            })
            .collect()
    }
}

impl SpanClassifier for ModelBundle {
    fn classify(&self, spans: &[AnnotatedSpan]) -> Result<Vec<Prediction>> {
        self.predict(&FeatureFrame::from_spans(spans))
    }

    fn predicts_body(&self) -> bool {
        self.labels.encode(Label::Body).is_some()
    }
}
