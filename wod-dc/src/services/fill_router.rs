//! Fill Router
//!
//! Routes each field still flagged in `needsEnrichment` through a fixed
//! chain of fillers, cheapest and most trustworthy first:
//!
//!   1. dataset patterns learned from the rest of the catalog
//!   2. the curated benchmark table
//!   3. archetype flavor templates (Flavor_Text only)
//!   4. the AI assistant, cache-first and budget-limited
//!   5. web search, used only to attach citations to unverified AI fills
//!
//! The router is conservative: it never overwrites a value that is
//! already real (non-blank, non-placeholder), and an exhausted budget or
//! a failed call leaves the field flagged for the next run.

use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

use wod_common::config::{KnowledgeConfig, RunLimits};
use wod_common::record::{value_is_blank, Provenance, Workout};

use crate::clients::{cache::query_key, Cache, FillRequest, MetadataLookup, TextSearch};
use crate::services::classifier::QualityClassifier;

/// Marker appended to AI values that arrived without a citation
pub const UNVERIFIED_SUFFIX: &str = " (AI-SUGGESTED-UNVERIFIED)";

/// Context fields sent with every AI request, in this order
const CONTEXT_FIELDS: &[&str] = &[
    "Category",
    "FormatDuration",
    "ScoreType",
    "Instructions",
    "EquipmentNeeded",
];

/// Fields eligible for dataset-pattern fills (low-cardinality, category-shaped)
const PATTERN_FIELDS: &[&str] = &["ScoreType", "DifficultyTier", "MovementTypes"];

/// Minimum occurrences before a modal value counts as a pattern
const PATTERN_MIN_SUPPORT: usize = 3;

/// Counters for one routing run
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RouterStats {
    pub dataset_fills: usize,
    pub template_fills: usize,
    pub ai_fills: usize,
    pub web_citations: usize,
    pub unverified_fills: usize,
    pub ai_calls: usize,
    pub web_calls: usize,
    pub cache_hits: usize,
    pub budget_exhausted_fields: usize,
    pub failed_calls: usize,
}

/// Field-value patterns learned from the catalog itself: for each
/// (Category, field) pair, the modal value among real values, kept only
/// above a support threshold. Numeric fields use the median instead.
/// Low-quality values (placeholders, UNKNOWN markers, legacy defaults)
/// never count toward a pattern.
pub struct DatasetPatterns {
    modal: BTreeMap<(String, String), String>,
    median: BTreeMap<(String, String), f64>,
}

impl DatasetPatterns {
    pub fn learn(workouts: &[Workout], classifier: &QualityClassifier) -> Self {
        let mut text_counts: BTreeMap<(String, String), BTreeMap<String, usize>> = BTreeMap::new();
        let mut numbers: BTreeMap<(String, String), Vec<f64>> = BTreeMap::new();

        for w in workouts {
            let Some(category) = w.text("Category") else {
                continue;
            };
            for field in PATTERN_FIELDS {
                match w.field(field) {
                    Some(Value::String(s)) => {
                        let s = s.trim();
                        if s.is_empty() || classifier.is_low_quality(field, s) {
                            continue;
                        }
                        *text_counts
                            .entry((category.to_string(), field.to_string()))
                            .or_default()
                            .entry(s.to_string())
                            .or_default() += 1;
                    }
                    Some(Value::Number(n)) => {
                        if let Some(f) = n.as_f64() {
                            numbers
                                .entry((category.to_string(), field.to_string()))
                                .or_default()
                                .push(f);
                        }
                    }
                    _ => {}
                }
            }
        }

        let modal = text_counts
            .into_iter()
            .filter_map(|(key, counts)| {
                counts
                    .into_iter()
                    .max_by_key(|(_, n)| *n)
                    .filter(|(_, n)| *n >= PATTERN_MIN_SUPPORT)
                    .map(|(value, _)| (key, value))
            })
            .collect();

        let median = numbers
            .into_iter()
            .filter(|(_, vs)| vs.len() >= PATTERN_MIN_SUPPORT)
            .map(|(key, mut vs)| {
                vs.sort_by(|a, b| a.total_cmp(b));
                let mid = vs.len() / 2;
                let m = if vs.len() % 2 == 0 {
                    (vs[mid - 1] + vs[mid]) / 2.0
                } else {
                    vs[mid]
                };
                (key, m)
            })
            .collect();

        Self { modal, median }
    }

    fn lookup(&self, category: &str, field: &str) -> Option<Value> {
        let key = (category.to_string(), field.to_string());
        if let Some(v) = self.modal.get(&key) {
            return Some(Value::String(v.clone()));
        }
        self.median
            .get(&key)
            .and_then(|m| serde_json::Number::from_f64(*m).map(Value::Number))
    }
}

pub struct FillRouter {
    config: KnowledgeConfig,
    limits: RunLimits,
    classifier: QualityClassifier,
    ai: Option<Arc<dyn MetadataLookup>>,
    web: Option<Arc<dyn TextSearch>>,
    cache: Arc<dyn Cache>,
    stats: RouterStats,
    /// (record id, field) -> citation backing the filled value
    citations: BTreeMap<(String, String), String>,
}

impl FillRouter {
    pub fn new(
        config: &KnowledgeConfig,
        limits: &RunLimits,
        ai: Option<Arc<dyn MetadataLookup>>,
        web: Option<Arc<dyn TextSearch>>,
        cache: Arc<dyn Cache>,
    ) -> Self {
        Self {
            config: config.clone(),
            limits: limits.clone(),
            classifier: QualityClassifier::new(config),
            ai,
            web,
            cache,
            stats: RouterStats::default(),
            citations: BTreeMap::new(),
        }
    }

    pub fn stats(&self) -> &RouterStats {
        &self.stats
    }

    pub fn citations(&self) -> &BTreeMap<(String, String), String> {
        &self.citations
    }

    /// A field may be written only while its current value carries no
    /// information: blank, absent, or text the classifier would flag
    /// (placeholder, UNKNOWN marker, legacy default). Everything in
    /// `needsEnrichment` must pass this, or the flag can never clear.
    fn fillable(&self, workout: &Workout, field: &str) -> bool {
        match workout.text(field) {
            Some(text) => self.classifier.is_low_quality(field, text),
            None => workout
                .field(field)
                .map(value_is_blank)
                .unwrap_or(field != "Name"),
        }
    }

    fn write_fill(workout: &mut Workout, field: &str, value: Value, source: Provenance) {
        let old = workout.field_or_null(field);
        workout.set_field(field, value.clone());
        workout.record_change(field, old, value);
        workout.mark_filled(field, source);
    }

    /// Run the filler chain over one record. `patterns` is learned once
    /// per run from the whole catalog.
    pub async fn fill_record(&mut self, workout: &mut Workout, patterns: &DatasetPatterns) {
        if workout.needs_enrichment.is_empty() {
            return;
        }

        self.fill_from_patterns(workout, patterns);
        self.fill_from_benchmarks(workout);
        self.fill_flavor_template(workout);

        let remaining: Vec<String> = workout.needs_enrichment.iter().cloned().collect();
        if !remaining.is_empty() {
            self.fill_from_ai(workout, remaining).await;
        }
    }

    fn fill_from_patterns(&mut self, workout: &mut Workout, patterns: &DatasetPatterns) {
        let Some(category) = workout.text("Category").map(str::to_string) else {
            return;
        };
        let needed: Vec<String> = workout.needs_enrichment.iter().cloned().collect();
        for field in needed {
            if !PATTERN_FIELDS.contains(&field.as_str()) || !self.fillable(workout, &field) {
                continue;
            }
            if let Some(value) = patterns.lookup(&category, &field) {
                tracing::debug!(id = %workout.id, field = %field, "Filled from dataset pattern");
                Self::write_fill(workout, &field, value, Provenance::Dataset);
                self.stats.dataset_fills += 1;
            }
        }
    }

    fn fill_from_benchmarks(&mut self, workout: &mut Workout) {
        let Some(name) = workout.name.clone() else {
            return;
        };
        let entry = self
            .config
            .benchmarks
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name.trim()))
            .map(|(_, v)| v.clone());
        let Some(table) = entry else {
            return;
        };

        for (field, value) in &table {
            if !self.fillable(workout, field) {
                continue;
            }
            tracing::debug!(id = %workout.id, field = %field, "Filled from benchmark table");
            Self::write_fill(
                workout,
                field,
                Value::String(value.clone()),
                Provenance::Dataset,
            );
            self.stats.dataset_fills += 1;
        }
    }

    /// Archetype for flavor text, first match wins
    fn archetype(&self, workout: &Workout) -> Option<&str> {
        if let Some(name) = workout.name.as_deref() {
            if self
                .config
                .benchmark_names
                .iter()
                .any(|b| b == &name.trim().to_lowercase())
            {
                return Some("benchmark");
            }
        }
        let format = workout.text("FormatDuration")?.to_lowercase();
        if format.contains("amrap") {
            Some("amrap")
        } else if format.contains("emom") {
            Some("emom")
        } else if workout
            .text("Category")
            .map(|c| c.to_lowercase().contains("strength"))
            .unwrap_or(false)
        {
            Some("strength")
        } else {
            None
        }
    }

    fn fill_flavor_template(&mut self, workout: &mut Workout) {
        if !workout.needs_enrichment.contains("Flavor_Text")
            || !self.fillable(workout, "Flavor_Text")
        {
            return;
        }
        let Some(template) = self
            .archetype(workout)
            .and_then(|a| self.config.flavor_templates.get(a))
            .cloned()
        else {
            return;
        };
        tracing::debug!(id = %workout.id, "Filled Flavor_Text from archetype template");
        Self::write_fill(
            workout,
            "Flavor_Text",
            Value::String(template),
            Provenance::Template,
        );
        self.stats.template_fills += 1;
    }

    fn build_request(&self, workout: &Workout, fields: Vec<String>) -> FillRequest {
        let mut context = BTreeMap::new();
        for field in CONTEXT_FIELDS {
            if let Some(text) = workout.text(field) {
                context.insert(field.to_string(), text.to_string());
            }
        }
        FillRequest {
            id: workout.id.clone(),
            name: workout.name.clone(),
            context,
            fields,
        }
    }

    async fn ai_response(
        &mut self,
        request: &FillRequest,
    ) -> Option<crate::clients::FillResponse> {
        let key = query_key(&serde_json::to_string(request).ok()?);

        if let Some(cached) = self.cache.get(&key).await {
            if let Ok(response) = serde_json::from_str(&cached) {
                self.stats.cache_hits += 1;
                return Some(response);
            }
        }

        let ai = self.ai.clone()?;
        if self.stats.ai_calls >= self.limits.max_ai_calls {
            self.stats.budget_exhausted_fields += request.fields.len();
            tracing::warn!(id = %request.id, "AI call budget exhausted, fields stay flagged");
            return None;
        }
        self.stats.ai_calls += 1;

        match ai.fill_fields(request).await {
            Ok(response) => {
                if let Ok(raw) = serde_json::to_string(&response) {
                    self.cache.set(&key, &raw).await;
                }
                Some(response)
            }
            Err(e) => {
                self.stats.failed_calls += 1;
                tracing::warn!(id = %request.id, "AI fill failed: {e}");
                None
            }
        }
    }

    async fn fill_from_ai(&mut self, workout: &mut Workout, fields: Vec<String>) {
        let request = self.build_request(workout, fields);
        let Some(response) = self.ai_response(&request).await else {
            return;
        };

        for (field, filled) in response.values {
            if !self.fillable(workout, &field) {
                continue;
            }
            match filled.citation {
                Some(citation) => {
                    Self::write_fill(workout, &field, Value::String(filled.value), Provenance::Ai);
                    self.citations
                        .insert((workout.id.clone(), field.clone()), citation);
                    self.stats.ai_fills += 1;
                }
                None => {
                    let citation = self.web_citation(&workout.name, &field).await;
                    if let Some(citation) = citation {
                        Self::write_fill(
                            workout,
                            &field,
                            Value::String(filled.value),
                            Provenance::Web,
                        );
                        self.citations
                            .insert((workout.id.clone(), field.clone()), citation);
                        self.stats.web_citations += 1;
                    } else {
                        let tagged = format!("{}{UNVERIFIED_SUFFIX}", filled.value);
                        Self::write_fill(workout, &field, Value::String(tagged), Provenance::Ai);
                        workout.needs_revalidation = true;
                        self.stats.ai_fills += 1;
                        self.stats.unverified_fills += 1;
                    }
                }
            }
        }
    }

    /// Last-resort citation lookup: a non-empty snippet for the workout
    /// counts as corroboration. Snippets are never used as field content.
    async fn web_citation(&mut self, name: &Option<String>, field: &str) -> Option<String> {
        let web = self.web.clone()?;
        let name = name.as_deref()?;
        if self.stats.web_calls >= self.limits.max_web_calls {
            return None;
        }
        self.stats.web_calls += 1;

        let query = format!("{name} crossfit workout {field}");
        match web.search(&query).await {
            Ok(snippets) => snippets.into_iter().next(),
            Err(e) => {
                self.stats.failed_calls += 1;
                tracing::warn!(query = %query, "Web search failed: {e}");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::{ClientError, FillResponse, FilledValue, NullCache};
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FakeAi {
        response: FillResponse,
        calls: AtomicUsize,
    }

    impl FakeAi {
        fn returning(values: &[(&str, &str, Option<&str>)]) -> Arc<Self> {
            Arc::new(Self {
                response: FillResponse {
                    values: values
                        .iter()
                        .map(|(f, v, c)| {
                            (
                                f.to_string(),
                                FilledValue {
                                    value: v.to_string(),
                                    citation: c.map(str::to_string),
                                },
                            )
                        })
                        .collect(),
                },
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl MetadataLookup for FakeAi {
        async fn fill_fields(&self, _request: &FillRequest) -> Result<FillResponse, ClientError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.response.clone())
        }
    }

    struct FakeWeb(Vec<String>);

    #[async_trait]
    impl TextSearch for FakeWeb {
        async fn search(&self, _query: &str) -> Result<Vec<String>, ClientError> {
            Ok(self.0.clone())
        }
    }

    struct MemCache(tokio::sync::Mutex<BTreeMap<String, String>>);

    #[async_trait]
    impl Cache for MemCache {
        async fn get(&self, key: &str) -> Option<String> {
            self.0.lock().await.get(key).cloned()
        }
        async fn set(&self, key: &str, value: &str) {
            self.0.lock().await.insert(key.into(), value.into());
        }
    }

    fn router(
        ai: Option<Arc<dyn MetadataLookup>>,
        web: Option<Arc<dyn TextSearch>>,
        cache: Arc<dyn Cache>,
    ) -> FillRouter {
        FillRouter::new(
            &KnowledgeConfig::default(),
            &RunLimits::default(),
            ai,
            web,
            cache,
        )
    }

    fn flagged(name: &str, fields: &[&str]) -> Workout {
        let mut w = Workout::new("t1");
        w.name = Some(name.into());
        for f in fields {
            w.flag_for_enrichment(f);
        }
        w
    }

    fn empty_patterns() -> DatasetPatterns {
        DatasetPatterns::learn(&[], &QualityClassifier::new(&KnowledgeConfig::default()))
    }

    #[tokio::test]
    async fn test_benchmark_table_fills_before_ai() {
        let ai = FakeAi::returning(&[("FormatDuration", "should not be used", None)]);
        let mut r = router(Some(ai.clone()), None, Arc::new(NullCache));
        let mut w = flagged("Fran", &["FormatDuration", "ScoreType"]);

        r.fill_record(&mut w, &empty_patterns()).await;

        assert_eq!(w.text("FormatDuration"), Some("For Time"));
        assert_eq!(w.text("ScoreType"), Some("Time"));
        assert_eq!(w.source, Some(Provenance::Dataset));
        assert!(w.needs_enrichment.is_empty());
        assert_eq!(ai.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_flavor_template_by_archetype() {
        let mut r = router(None, None, Arc::new(NullCache));
        let mut w = flagged("Random WOD", &["Flavor_Text"]);
        w.set_field("FormatDuration", json!("AMRAP 12"));

        r.fill_record(&mut w, &empty_patterns()).await;

        assert!(w.text("Flavor_Text").unwrap().contains("maximum rounds"));
        assert_eq!(w.source, Some(Provenance::Template));
        assert_eq!(r.stats().template_fills, 1);
    }

    #[tokio::test]
    async fn test_dataset_pattern_modal_fill() {
        let classifier = QualityClassifier::new(&KnowledgeConfig::default());
        let mut corpus = Vec::new();
        for i in 0..4 {
            let mut w = Workout::new(format!("c{i}"));
            w.set_field("Category", json!("Hero"));
            w.set_field("ScoreType", json!("Time"));
            corpus.push(w);
        }
        let patterns = DatasetPatterns::learn(&corpus, &classifier);

        let mut r = router(None, None, Arc::new(NullCache));
        let mut w = flagged("Unknown Hero", &["ScoreType"]);
        w.set_field("Category", json!("Hero"));

        r.fill_record(&mut w, &patterns).await;
        assert_eq!(w.text("ScoreType"), Some("Time"));
        assert_eq!(w.source, Some(Provenance::Dataset));
    }

    #[tokio::test]
    async fn test_pattern_requires_min_support() {
        let classifier = QualityClassifier::new(&KnowledgeConfig::default());
        let mut w1 = Workout::new("c1");
        w1.set_field("Category", json!("Hero"));
        w1.set_field("ScoreType", json!("Time"));
        let patterns = DatasetPatterns::learn(&[w1], &classifier);

        let mut r = router(None, None, Arc::new(NullCache));
        let mut w = flagged("X", &["ScoreType"]);
        w.set_field("Category", json!("Hero"));
        r.fill_record(&mut w, &patterns).await;

        assert!(w.needs_enrichment.contains("ScoreType"));
    }

    #[tokio::test]
    async fn test_uncited_ai_value_tagged_unverified() {
        let ai = FakeAi::returning(&[("Description", "Thrusters and pull-ups.", None)]);
        let mut r = router(Some(ai), None, Arc::new(NullCache));
        let mut w = flagged("Nameless", &["Description"]);

        r.fill_record(&mut w, &empty_patterns()).await;

        assert_eq!(
            w.text("Description"),
            Some("Thrusters and pull-ups. (AI-SUGGESTED-UNVERIFIED)")
        );
        assert!(w.needs_revalidation);
        assert_eq!(r.stats().unverified_fills, 1);
    }

    #[tokio::test]
    async fn test_cited_ai_value_kept_verbatim() {
        let ai = FakeAi::returning(&[("Description", "30 snatches for time.", Some("archive"))]);
        let mut r = router(Some(ai), None, Arc::new(NullCache));
        let mut w = flagged("Nameless", &["Description"]);

        r.fill_record(&mut w, &empty_patterns()).await;

        assert_eq!(w.text("Description"), Some("30 snatches for time."));
        assert!(!w.needs_revalidation);
        assert_eq!(w.source, Some(Provenance::Ai));
    }

    #[tokio::test]
    async fn test_web_snippet_corroborates_uncited_fill() {
        let ai = FakeAi::returning(&[("Description", "21-15-9 reps.", None)]);
        let web: Arc<dyn TextSearch> = Arc::new(FakeWeb(vec!["Fran is 21-15-9".into()]));
        let mut r = router(Some(ai), Some(web), Arc::new(NullCache));
        let mut w = flagged("Fran-ish", &["Description"]);

        r.fill_record(&mut w, &empty_patterns()).await;

        assert_eq!(w.text("Description"), Some("21-15-9 reps."));
        assert!(!w.needs_revalidation);
        assert_eq!(w.source, Some(Provenance::Web));
        assert_eq!(r.stats().web_citations, 1);
    }

    #[tokio::test]
    async fn test_cache_hit_skips_ai_call() {
        let ai = FakeAi::returning(&[("Description", "Run 5k.", Some("src"))]);
        let cache = Arc::new(MemCache(tokio::sync::Mutex::new(BTreeMap::new())));

        let mut r = router(Some(ai.clone()), None, cache.clone());
        let mut w1 = flagged("Solo", &["Description"]);
        r.fill_record(&mut w1, &empty_patterns()).await;
        assert_eq!(ai.calls.load(Ordering::SeqCst), 1);

        // Identical request on a second run hits the cache
        let mut r2 = router(Some(ai.clone()), None, cache);
        let mut w2 = flagged("Solo", &["Description"]);
        r2.fill_record(&mut w2, &empty_patterns()).await;
        assert_eq!(ai.calls.load(Ordering::SeqCst), 1);
        assert_eq!(r2.stats().cache_hits, 1);
        assert_eq!(w2.text("Description"), Some("Run 5k."));
    }

    #[tokio::test]
    async fn test_exhausted_budget_leaves_field_flagged() {
        let ai = FakeAi::returning(&[("Description", "anything", Some("src"))]);
        let limits = RunLimits {
            max_ai_calls: 0,
            ..RunLimits::default()
        };
        let mut r = FillRouter::new(
            &KnowledgeConfig::default(),
            &limits,
            Some(ai.clone()),
            None,
            Arc::new(NullCache),
        );
        let mut w = flagged("Nameless", &["Description"]);

        r.fill_record(&mut w, &empty_patterns()).await;

        assert!(w.needs_enrichment.contains("Description"));
        assert_eq!(ai.calls.load(Ordering::SeqCst), 0);
        assert_eq!(r.stats().budget_exhausted_fields, 1);
    }

    #[tokio::test]
    async fn test_never_overwrites_real_values() {
        let ai = FakeAi::returning(&[("Description", "replacement", Some("src"))]);
        let mut r = router(Some(ai), None, Arc::new(NullCache));
        let mut w = flagged("Nameless", &["Description"]);
        // Another stage wrote a real value after classification
        w.set_field("Description", json!("Handwritten by a coach."));

        r.fill_record(&mut w, &empty_patterns()).await;
        assert_eq!(w.text("Description"), Some("Handwritten by a coach."));
    }

    #[tokio::test]
    async fn test_failed_ai_call_is_isolated() {
        struct FailingAi;
        #[async_trait]
        impl MetadataLookup for FailingAi {
            async fn fill_fields(
                &self,
                _request: &FillRequest,
            ) -> Result<FillResponse, ClientError> {
                Err(ClientError::Network("connection refused".into()))
            }
        }

        let mut r = router(Some(Arc::new(FailingAi)), None, Arc::new(NullCache));
        let mut w = flagged("Nameless", &["Description"]);
        r.fill_record(&mut w, &empty_patterns()).await;

        assert!(w.needs_enrichment.contains("Description"));
        assert_eq!(r.stats().failed_calls, 1);
    }

    #[test]
    fn test_fillable_respects_placeholders() {
        let r = router(None, None, Arc::new(NullCache));
        let mut w = Workout::new("t");
        w.set_field("Description", json!("[AI generated Description]"));
        assert!(r.fillable(&w, "Description"));
        w.set_field("Description", json!("Real text"));
        assert!(!r.fillable(&w, "Description"));
    }

    #[tokio::test]
    async fn test_unknown_marker_values_are_refillable() {
        let mut r = router(None, None, Arc::new(NullCache));
        let mut w = flagged("Fran", &["FormatDuration"]);
        w.set_field("FormatDuration", json!("Unknown"));

        r.fill_record(&mut w, &empty_patterns()).await;

        assert_eq!(w.text("FormatDuration"), Some("For Time"));
        assert!(!w.needs_enrichment.contains("FormatDuration"));
    }

    #[tokio::test]
    async fn test_legacy_default_values_are_refillable() {
        let mut r = router(None, None, Arc::new(NullCache));
        let mut w = flagged("Grace", &["ScoreType"]);
        w.set_field("ScoreType", json!("Unspecified"));

        r.fill_record(&mut w, &empty_patterns()).await;
        assert_eq!(w.text("ScoreType"), Some("Time"));
    }

    #[tokio::test]
    async fn test_patterns_never_learn_low_quality_values() {
        let classifier = QualityClassifier::new(&KnowledgeConfig::default());
        let mut corpus = Vec::new();
        for i in 0..4 {
            let mut w = Workout::new(format!("c{i}"));
            w.set_field("Category", json!("Hero"));
            w.set_field("ScoreType", json!("Unspecified"));
            corpus.push(w);
        }
        let patterns = DatasetPatterns::learn(&corpus, &classifier);

        let mut r = router(None, None, Arc::new(NullCache));
        let mut w = flagged("X", &["ScoreType"]);
        w.set_field("Category", json!("Hero"));
        r.fill_record(&mut w, &patterns).await;

        // The modal "Unspecified" must not propagate
        assert!(w.needs_enrichment.contains("ScoreType"));
    }
}
