//! Statistical NER engine.
//!
//! The model itself lives behind the [`NerModel`] trait; this module owns
//! everything around it: the gate that decides whether NER runs at all, the
//! keyed model cache, the invocation timeout, and the conversion of every
//! possible failure into a [`SkipReason`]. [`NerEngine::extract`] never
//! returns an error; a fault means the pipeline continues without NER.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::config::PipelineConfig;
use crate::types::{Entity, EntityType, Source, Span};

/// One labeled span returned by a NER backend.
#[derive(Debug, Clone, PartialEq)]
pub struct NerPrediction {
    /// Matched text.
    pub text: String,
    /// Backend label (e.g. `AZIENDA`, `ORG`); mapped through
    /// [`EntityType::from_tag`].
    pub label: String,
    /// Byte offsets into the text handed to the backend.
    pub start: usize,
    pub end: usize,
    /// Raw model score in `[0, 1]`.
    pub score: f64,
}

/// Failure surfaced by a NER backend. `class` names the backend's failure
/// type and becomes the `ner_error:<class>` fallback label.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{class}: {message}")]
pub struct NerError {
    pub class: String,
    pub message: String,
}

impl NerError {
    pub fn new(class: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            class: class.into(),
            message: message.into(),
        }
    }
}

/// Call contract of a loaded statistical tagger. Implementations must be safe
/// for concurrent inference; an adapter wrapping a single-threaded backend has
/// to serialize its own calls.
#[async_trait]
pub trait NerModel: Send + Sync + std::fmt::Debug {
    async fn predict(&self, text: &str) -> Result<Vec<NerPrediction>, NerError>;
}

/// Constructs models from their configured name. Invoked at most once per
/// name thanks to [`ModelCache`].
#[async_trait]
pub trait NerModelLoader: Send + Sync + std::fmt::Debug {
    async fn load(&self, model_name: &str) -> Result<Arc<dyn NerModel>, NerError>;
}

/// Loader used when no NER backend has been wired into the pipeline; every
/// load fails, so runs record `model_load_failed` and continue.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnconfiguredModelLoader;

#[async_trait]
impl NerModelLoader for UnconfiguredModelLoader {
    async fn load(&self, model_name: &str) -> Result<Arc<dyn NerModel>, NerError> {
        Err(NerError::new(
            "Unconfigured",
            format!("no NER backend available for model '{model_name}'"),
        ))
    }
}

/// Keyed model cache. The mutex is held across lookup *and* load, so
/// concurrent misses for the same key resolve to a single load.
#[derive(Debug, Default)]
pub struct ModelCache {
    models: Mutex<HashMap<String, Arc<dyn NerModel>>>,
}

impl ModelCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached model for `model_name`, loading it through `loader`
    /// on a miss.
    pub async fn get_or_load(
        &self,
        model_name: &str,
        loader: &dyn NerModelLoader,
    ) -> Result<Arc<dyn NerModel>, NerError> {
        let mut models = self.models.lock().await;
        if let Some(model) = models.get(model_name) {
            return Ok(Arc::clone(model));
        }
        let model = loader.load(model_name).await?;
        models.insert(model_name.to_string(), Arc::clone(&model));
        Ok(model)
    }

    /// Drop every cached model. Test isolation hook.
    pub async fn clear_cache(&self) {
        self.models.lock().await.clear();
    }

    pub async fn len(&self) -> usize {
        self.models.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.models.lock().await.is_empty()
    }
}

/// Why a run skipped NER. Rendered into `meta.fallbacks`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    Disabled,
    LanguageUnknown,
    LanguageUnsupported,
    TextTooShort,
    ModelLoadFailed,
    Timeout,
    /// Inference failed; carries the backend's error class.
    Inference(String),
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::Disabled => write!(f, "ner_disabled"),
            SkipReason::LanguageUnknown => write!(f, "language_unknown"),
            SkipReason::LanguageUnsupported => write!(f, "language_unsupported"),
            SkipReason::TextTooShort => write!(f, "text_too_short"),
            SkipReason::ModelLoadFailed => write!(f, "model_load_failed"),
            SkipReason::Timeout => write!(f, "ner_timeout"),
            SkipReason::Inference(class) => write!(f, "ner_error:{class}"),
        }
    }
}

/// The NER extraction engine: gate, cache, timeout, entity conversion.
#[derive(Debug)]
pub struct NerEngine {
    cache: Arc<ModelCache>,
    loader: Arc<dyn NerModelLoader>,
}

impl NerEngine {
    /// Engine with a private cache.
    pub fn new(loader: Arc<dyn NerModelLoader>) -> Self {
        Self {
            cache: Arc::new(ModelCache::new()),
            loader,
        }
    }

    /// Engine sharing an externally owned cache.
    pub fn with_cache(loader: Arc<dyn NerModelLoader>, cache: Arc<ModelCache>) -> Self {
        Self { cache, loader }
    }

    pub fn cache(&self) -> &Arc<ModelCache> {
        &self.cache
    }

    /// Run NER over the normalized text, or explain why it was skipped.
    ///
    /// The gate checks run in a fixed order and the first failing one wins;
    /// backend faults after the gate become skip reasons too, so the caller
    /// never sees an error.
    pub async fn extract(
        &self,
        text: &str,
        lingua: Option<&str>,
        config: &PipelineConfig,
    ) -> (Vec<Entity>, Vec<SkipReason>) {
        if !config.engine_ner_enabled {
            return (Vec::new(), vec![SkipReason::Disabled]);
        }
        let Some(lingua) = lingua else {
            return (Vec::new(), vec![SkipReason::LanguageUnknown]);
        };
        if !config.supported_ner_languages.contains(&lingua.to_lowercase()) {
            return (Vec::new(), vec![SkipReason::LanguageUnsupported]);
        }
        if text.chars().count() < config.min_text_length_for_ner {
            return (Vec::new(), vec![SkipReason::TextTooShort]);
        }

        let model = match self
            .cache
            .get_or_load(&config.ner_model_name, self.loader.as_ref())
            .await
        {
            Ok(model) => model,
            Err(error) => {
                tracing::warn!(
                    model = %config.ner_model_name,
                    error = %error,
                    "NER model load failed"
                );
                return (Vec::new(), vec![SkipReason::ModelLoadFailed]);
            }
        };

        let budget = Duration::try_from_secs_f64(config.ner_timeout_seconds)
            .unwrap_or(Duration::from_secs(2));
        let predictions = match tokio::time::timeout(budget, model.predict(text)).await {
            Err(_) => {
                tracing::warn!(
                    model = %config.ner_model_name,
                    timeout_seconds = config.ner_timeout_seconds,
                    "NER invocation timed out"
                );
                return (Vec::new(), vec![SkipReason::Timeout]);
            }
            Ok(Err(error)) => {
                tracing::warn!(model = %config.ner_model_name, error = %error, "NER inference failed");
                return (Vec::new(), vec![SkipReason::Inference(error.class)]);
            }
            Ok(Ok(predictions)) => predictions,
        };

        let entities = predictions
            .into_iter()
            .filter(|p| !p.text.trim().is_empty())
            .map(|p| {
                Entity::new(
                    EntityType::from_tag(&p.label),
                    p.text,
                    Span::new(p.start, p.end),
                    p.score.clamp(config.ner_confidence, 1.0),
                    Source::Ner,
                    config.ner_model_name.clone(),
                )
            })
            .collect();

        (entities, Vec::new())
    }
}
