//! Orchestrator: seven timed steps under a single fault barrier.
//!
//! A [`Pipeline`] owns the engines, the model cache and the metrics sink for
//! its lifetime; [`Pipeline::run`] drives one message through validation,
//! normalization, the three engines, the resolver and the post-filters. The
//! body after validation runs under `catch_unwind`, so whatever goes wrong
//! the caller receives a well-formed envelope, never a panic and never an
//! error type.

use std::collections::BTreeMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use serde_json::Value;

use crate::config::PipelineConfig;
use crate::engines::{
    Lexicon, LexiconEngine, ModelCache, NerEngine, NerModelLoader, RegexEngine,
    UnconfiguredModelLoader,
};
use crate::envelope::{ExtractionOutput, PipelineMeta, PipelineStatus, RecordedError};
use crate::filters;
use crate::input::{ExtractionInput, validate_input};
use crate::metrics::{
    ENTITIES_PER_MAIL, ERRORS_TOTAL, MetricsSink, NER_SKIP_TOTAL, NoopMetrics, PIPELINE_RUNS, Timer,
};
use crate::normalizer::normalize;
use crate::resolver::resolve;
use crate::types::Entity;

/// A configured extraction pipeline.
#[derive(Debug)]
pub struct Pipeline {
    config: PipelineConfig,
    regex_engine: RegexEngine,
    ner_engine: NerEngine,
    lexicon_engine: LexiconEngine,
    metrics: Arc<dyn MetricsSink>,
}

impl Pipeline {
    /// Start building a pipeline.
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::new()
    }

    /// Pipeline with the given configuration and no NER backend or metrics.
    pub fn with_config(config: PipelineConfig) -> Self {
        Self::builder().config(config).build()
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run one message through the pipeline.
    pub async fn run(&self, raw: &Value) -> ExtractionOutput {
        // Step 1: validation sits outside the barrier. A rejection is an
        // ordinary failed envelope, not an internal fault.
        let (input, warnings) = match validate_input(raw, self.config.max_text_length) {
            Ok(validated) => validated,
            Err(rejection) => {
                self.metrics.counter(
                    ERRORS_TOTAL,
                    &[("kind", "hard"), ("component", "validate")],
                    1,
                );
                self.metrics
                    .counter(PIPELINE_RUNS, &[("outcome", "failed")], 1);
                tracing::warn!(
                    event = "input_rejected",
                    errors = rejection.errors.len(),
                    "input failed validation"
                );
                return ExtractionOutput::failed(rejection.errors, self.config.feature_flags());
            }
        };

        tracing::debug!(
            id_conversazione = %input.id_conversazione,
            id_messaggio = %input.id_messaggio,
            event = "pipeline_run_started",
            lingua = input.lingua.as_deref().unwrap_or("-"),
        );

        for warning in &warnings {
            self.metrics.counter(
                ERRORS_TOTAL,
                &[("kind", "soft"), ("component", "validate")],
                1,
            );
            tracing::info!(
                id_conversazione = %input.id_conversazione,
                id_messaggio = %input.id_messaggio,
                event = "input_warning",
                warning = %warning,
            );
        }
        let warnings: Vec<RecordedError> = warnings
            .iter()
            .map(|w| RecordedError::warning("lingua", w.clone()))
            .collect();

        // Steps 2-7 under the barrier: a panic anywhere below still yields a
        // valid envelope.
        match AssertUnwindSafe(self.run_inner(&input, warnings))
            .catch_unwind()
            .await
        {
            Ok(output) => {
                self.metrics
                    .counter(PIPELINE_RUNS, &[("outcome", "ok")], 1);
                output
            }
            Err(panic) => {
                let message = panic_message(panic);
                self.metrics.counter(
                    ERRORS_TOTAL,
                    &[("kind", "internal"), ("component", "pipeline")],
                    1,
                );
                self.metrics
                    .counter(PIPELINE_RUNS, &[("outcome", "failed")], 1);
                tracing::error!(
                    id_conversazione = %input.id_conversazione,
                    id_messaggio = %input.id_messaggio,
                    event = "pipeline_failed",
                    error = %message,
                );
                ExtractionOutput::failed(
                    vec![RecordedError::internal("pipeline", message)],
                    self.config.feature_flags(),
                )
            }
        }
    }

    async fn run_inner(
        &self,
        input: &ExtractionInput,
        warnings: Vec<RecordedError>,
    ) -> ExtractionOutput {
        let mut timings: BTreeMap<String, f64> = BTreeMap::new();
        let mut fallbacks: Vec<String> = Vec::new();

        // Step 2: normalize.
        let timer = Timer::start(self.metrics.as_ref(), "normalize");
        let (text, normalization_log) = normalize(&input.testo_normalizzato);
        timings.insert("normalize".to_string(), timer.stop());
        tracing::debug!(
            id_conversazione = %input.id_conversazione,
            id_messaggio = %input.id_messaggio,
            event = "text_normalized",
            steps = ?normalization_log.steps,
        );

        // Step 3: regex engine.
        let timer = Timer::start(self.metrics.as_ref(), "regex");
        let mut candidates = if self.config.engine_regex_enabled {
            self.regex_engine.extract(&text, &self.config)
        } else {
            Vec::new()
        };
        timings.insert("regex".to_string(), timer.stop());

        // Step 4: NER engine; gate decisions surface as fallbacks.
        let timer = Timer::start(self.metrics.as_ref(), "ner");
        let (ner_entities, skips) = self
            .ner_engine
            .extract(&text, input.lingua.as_deref(), &self.config)
            .await;
        for skip in &skips {
            let reason = skip.to_string();
            self.metrics
                .counter(NER_SKIP_TOTAL, &[("reason", reason.as_str())], 1);
            tracing::info!(
                id_conversazione = %input.id_conversazione,
                id_messaggio = %input.id_messaggio,
                event = "ner_skipped",
                reason = %reason,
            );
            fallbacks.push(reason);
        }
        candidates.extend(ner_entities);
        timings.insert("ner".to_string(), timer.stop());

        // Step 5: lexicon engine.
        let timer = Timer::start(self.metrics.as_ref(), "lexicon");
        if self.config.engine_lexicon_enabled {
            candidates.extend(self.lexicon_engine.extract(&text, &self.config));
        }
        timings.insert("lexicon".to_string(), timer.stop());

        // Step 6: resolver.
        let timer = Timer::start(self.metrics.as_ref(), "merge");
        let resolved = resolve(&candidates, text.len(), &self.config);
        timings.insert("merge".to_string(), timer.stop());

        // Step 7: post-filters.
        let timer = Timer::start(self.metrics.as_ref(), "filter");
        let entities = filters::apply_all(resolved, text.len(), &self.config);
        timings.insert("filter".to_string(), timer.stop());

        self.report_entity_summary(input, &entities);

        let mut meta = PipelineMeta::new(PipelineStatus::Ok, self.config.feature_flags());
        meta.component_timings_ms = timings;
        meta.fallbacks = fallbacks;

        ExtractionOutput {
            entities,
            meta,
            errors: warnings,
        }
    }

    fn report_entity_summary(&self, input: &ExtractionInput, entities: &[Entity]) {
        let mut per_type: BTreeMap<&str, usize> = BTreeMap::new();
        let mut per_type_source: BTreeMap<String, usize> = BTreeMap::new();
        for entity in entities {
            *per_type.entry(entity.entity_type.as_str()).or_default() += 1;
            *per_type_source
                .entry(format!("{}/{}", entity.entity_type.as_str(), entity.source))
                .or_default() += 1;
        }
        for (entity_type, count) in per_type {
            self.metrics
                .histogram(ENTITIES_PER_MAIL, &[("type", entity_type)], count as f64);
        }
        tracing::info!(
            id_conversazione = %input.id_conversazione,
            id_messaggio = %input.id_messaggio,
            event = "entities_extracted",
            total = entities.len(),
            summary = ?per_type_source,
        );
    }
}

/// Builder for [`Pipeline`]. Everything is optional: the default pipeline
/// has no NER backend (every load records `model_load_failed`), an empty
/// lexicon unless the configuration ships one, and no metrics.
pub struct PipelineBuilder {
    config: Option<PipelineConfig>,
    ner_loader: Option<Arc<dyn NerModelLoader>>,
    model_cache: Option<Arc<ModelCache>>,
    lexicon: Option<Lexicon>,
    metrics: Option<Arc<dyn MetricsSink>>,
}

impl PipelineBuilder {
    pub fn new() -> Self {
        Self {
            config: None,
            ner_loader: None,
            model_cache: None,
            lexicon: None,
            metrics: None,
        }
    }

    pub fn config(mut self, config: PipelineConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Wire in a NER backend.
    pub fn ner_loader(mut self, loader: Arc<dyn NerModelLoader>) -> Self {
        self.ner_loader = Some(loader);
        self
    }

    /// Share an externally owned model cache across pipelines.
    pub fn model_cache(mut self, cache: Arc<ModelCache>) -> Self {
        self.model_cache = Some(cache);
        self
    }

    /// Lexicon to match against; overrides the one from the configuration.
    pub fn lexicon(mut self, lexicon: Lexicon) -> Self {
        self.lexicon = Some(lexicon);
        self
    }

    pub fn metrics(mut self, metrics: Arc<dyn MetricsSink>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn build(self) -> Pipeline {
        let config = self.config.unwrap_or_default();
        let lexicon = self.lexicon.unwrap_or_else(|| {
            Lexicon::from_pairs(config.lexicon.iter().map(|(k, v)| (k.clone(), v.clone())))
        });
        let loader = self
            .ner_loader
            .unwrap_or_else(|| Arc::new(UnconfiguredModelLoader));
        let ner_engine = match self.model_cache {
            Some(cache) => NerEngine::with_cache(loader, cache),
            None => NerEngine::new(loader),
        };

        Pipeline {
            regex_engine: RegexEngine::new(),
            ner_engine,
            lexicon_engine: LexiconEngine::new(&lexicon),
            metrics: self.metrics.unwrap_or_else(|| Arc::new(NoopMetrics)),
            config,
        }
    }
}

impl Default for PipelineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn panic_message(panic: Box<dyn std::any::Any + Send>) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unexpected internal fault".to_string()
    }
}

/// Run one message through a pipeline built on the spot.
///
/// Callers that hold a NER backend, a shared model cache or a metrics sink
/// should build a [`Pipeline`] once and reuse it; this helper suits one-off
/// calls and tests.
pub async fn run_pipeline(raw: &Value, config: Option<PipelineConfig>) -> ExtractionOutput {
    let pipeline = Pipeline::builder()
        .config(config.unwrap_or_default())
        .build();
    pipeline.run(raw).await
}

/// Backward-compatible helper: wrap a bare string into a minimal message and
/// return only the entity list.
pub async fn extract_all_entities(text: &str, config: Option<PipelineConfig>) -> Vec<Entity> {
    let raw = serde_json::json!({
        "id_conversazione": "adhoc",
        "id_messaggio": "adhoc",
        "testo_normalizzato": text,
        "lingua": Value::Null,
        "timestamp": "",
        "mittente": "",
        "destinatario": "",
    });
    run_pipeline(&raw, config).await.entities
}
