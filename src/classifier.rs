//! Intent Classifier
//!
//! Ranks the closed intent set against a question with a zero-shot backend
//! and keeps the top label:
//! - Hosted: Hugging Face NLI model (when an API token is configured)
//! - Local: keyword scoring, deterministic and dependency-free

use crate::config::ClassifierConfig;
use crate::huggingface::HuggingFaceRanker;
use crate::models::Intent;
use crate::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// One ranked candidate label.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LabelScore {
    pub label: String,
    pub score: f32,
}

/// Opaque zero-shot capability: text + candidate labels -> ranking, best first.
#[async_trait]
pub trait ZeroShotRanker: Send + Sync {
    fn name(&self) -> &'static str;
    async fn rank(&self, text: &str, labels: &[&str]) -> Result<Vec<LabelScore>>;
}

/// Static keyword lists, zero allocation.
/// A hit scores the number of words in the keyword, so phrases beat single words.
const INTENT_KEYWORDS: &[(Intent, &[&str])] = &[
    (Intent::AverageSp500, &["average", "mean", "avg"]),
    (Intent::CompareAverages, &["compare", "averages", "versus", " vs", "difference"]),
    (Intent::CompareYearsAvg, &["compare years", "between years", "year over year"]),
    (
        Intent::MostProfit,
        &["profit", "gain", "best day", "biggest", "highest", "jump", "rise"],
    ),
    (
        Intent::WorstDay,
        &["worst", "drop", "crash", "loss", "lowest", "fell", "decline"],
    ),
    (
        Intent::RecommendStock,
        &["recommend", "invest", "buy", "should i", "suggest", "which index"],
    ),
    (
        Intent::MostVolatileYear,
        &["volatile", "volatility", "swing", "turbulent", "std dev"],
    ),
    (
        Intent::YearsAboveAvg,
        &["above", "exceed", "above average", "higher than"],
    ),
    (Intent::BestYearGain, &["best year", "which year", "year with the best"]),
];

/// Deterministic keyword ranker
pub struct KeywordRanker;

impl KeywordRanker {
    fn score(intent: Intent, text: &str) -> usize {
        INTENT_KEYWORDS
            .iter()
            .find(|(i, _)| *i == intent)
            .map(|(_, keywords)| {
                keywords
                    .iter()
                    .filter(|kw| text.contains(**kw))
                    .map(|kw| kw.split_whitespace().count())
                    .sum()
            })
            .unwrap_or(0)
    }
}

#[async_trait]
impl ZeroShotRanker for KeywordRanker {
    fn name(&self) -> &'static str {
        "keyword"
    }

    async fn rank(&self, text: &str, labels: &[&str]) -> Result<Vec<LabelScore>> {
        let text = text.to_lowercase();

        let raw: Vec<(String, usize)> = labels
            .iter()
            .map(|label| {
                let score = Intent::from_label(label)
                    .map(|intent| Self::score(intent, &text))
                    .unwrap_or(0);
                (label.to_string(), score)
            })
            .collect();

        let total: usize = raw.iter().map(|(_, s)| s).sum();

        let mut ranking: Vec<LabelScore> = raw
            .into_iter()
            .map(|(label, score)| {
                let score = if total == 0 {
                    // nothing matched: only `unknown` carries weight
                    if label == Intent::Unknown.label() { 1.0 } else { 0.0 }
                } else {
                    score as f32 / total as f32
                };
                LabelScore { label, score }
            })
            .collect();

        // stable sort keeps candidate order for ties
        ranking.sort_by(|a, b| b.score.total_cmp(&a.score));
        Ok(ranking)
    }
}

/// Classifies questions into the closed intent set.
pub struct IntentClassifier {
    ranker: Arc<dyn ZeroShotRanker>,
    cache: Option<RwLock<HashMap<String, Intent>>>,
}

impl IntentClassifier {
    pub fn new(ranker: Arc<dyn ZeroShotRanker>) -> Self {
        Self {
            ranker,
            cache: Some(RwLock::new(HashMap::new())),
        }
    }

    /// Classifier that always consults the backend.
    pub fn without_cache(ranker: Arc<dyn ZeroShotRanker>) -> Self {
        Self {
            ranker,
            cache: None,
        }
    }

    pub fn from_config(config: &ClassifierConfig) -> Result<Self> {
        let ranker = create_ranker(config)?;
        Ok(if config.cache {
            Self::new(ranker)
        } else {
            Self::without_cache(ranker)
        })
    }

    pub fn backend(&self) -> &'static str {
        self.ranker.name()
    }

    /// Top-ranked intent for `text`. Backend failures propagate.
    pub async fn classify(&self, text: &str) -> Result<Intent> {
        if let Some(cache) = &self.cache {
            if let Some(intent) = cache.read().await.get(text) {
                debug!(%intent, "Intent served from cache");
                return Ok(*intent);
            }
        }

        let labels = Intent::labels();
        let ranking = self.ranker.rank(text, &labels).await?;

        let intent = match ranking.first() {
            Some(top) => Intent::from_label(&top.label).unwrap_or_else(|| {
                warn!(label = %top.label, "Ranker returned a label outside the intent set");
                Intent::Unknown
            }),
            None => Intent::Unknown,
        };

        debug!(
            backend = self.ranker.name(),
            %intent,
            score = ranking.first().map(|s| s.score).unwrap_or_default(),
            "Question classified"
        );

        if let Some(cache) = &self.cache {
            cache.write().await.insert(text.to_string(), intent);
        }

        Ok(intent)
    }
}

/// Pick the hosted backend when a token is configured, the keyword ranker otherwise.
pub fn create_ranker(config: &ClassifierConfig) -> Result<Arc<dyn ZeroShotRanker>> {
    match &config.api_token {
        Some(token) => {
            info!(model = %config.model, "Intent classifier backend: huggingface");
            let ranker = HuggingFaceRanker::new(token.clone(), &config.model)?;
            Ok(Arc::new(match &config.endpoint {
                Some(endpoint) => ranker.with_endpoint(endpoint.clone()),
                None => ranker,
            }))
        }
        None => {
            info!("Intent classifier backend: keyword");
            Ok(Arc::new(KeywordRanker))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AgentError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Ranker returning a fixed label and counting calls.
    struct FixedRanker {
        label: &'static str,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl ZeroShotRanker for FixedRanker {
        fn name(&self) -> &'static str {
            "fixed"
        }

        async fn rank(&self, _text: &str, _labels: &[&str]) -> Result<Vec<LabelScore>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(vec![LabelScore {
                label: self.label.to_string(),
                score: 0.9,
            }])
        }
    }

    struct FailingRanker;

    #[async_trait]
    impl ZeroShotRanker for FailingRanker {
        fn name(&self) -> &'static str {
            "failing"
        }

        async fn rank(&self, _text: &str, _labels: &[&str]) -> Result<Vec<LabelScore>> {
            Err(AgentError::Classification("backend unavailable".to_string()))
        }
    }

    async fn keyword_intent(text: &str) -> Intent {
        IntentClassifier::without_cache(Arc::new(KeywordRanker))
            .classify(text)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_keyword_ranking_covers_every_label_once() {
        let labels = Intent::labels();
        let ranking = KeywordRanker.rank("average in 2019", &labels).await.unwrap();

        assert_eq!(ranking.len(), labels.len());
        for label in &labels {
            assert_eq!(ranking.iter().filter(|s| s.label == *label).count(), 1);
        }
    }

    #[tokio::test]
    async fn test_keyword_intents() {
        assert_eq!(
            keyword_intent("What was the average S&P 500 in 2019?").await,
            Intent::AverageSp500
        );
        assert_eq!(
            keyword_intent("Which day had the worst drop in 2020?").await,
            Intent::WorstDay
        );
        assert_eq!(
            keyword_intent("Which index should I invest in for 2021?").await,
            Intent::RecommendStock
        );
        assert_eq!(
            keyword_intent("Compare 2015 and 2020 averages").await,
            Intent::CompareAverages
        );
        assert_eq!(
            keyword_intent("Which year had the best single-day result?").await,
            Intent::BestYearGain
        );
        assert_eq!(
            keyword_intent("List the above average years").await,
            Intent::YearsAboveAvg
        );
        assert_eq!(keyword_intent("Most volatile year?").await, Intent::MostVolatileYear);
    }

    #[tokio::test]
    async fn test_no_keywords_is_unknown() {
        assert_eq!(keyword_intent("hello there").await, Intent::Unknown);
    }

    #[tokio::test]
    async fn test_out_of_set_label_maps_to_unknown() {
        let ranker = Arc::new(FixedRanker {
            label: "weather_forecast",
            calls: AtomicUsize::new(0),
        });
        let classifier = IntentClassifier::new(ranker);
        assert_eq!(classifier.classify("rain?").await.unwrap(), Intent::Unknown);
    }

    #[tokio::test]
    async fn test_cache_skips_backend_on_exact_repeat() {
        let ranker = Arc::new(FixedRanker {
            label: "most_profit",
            calls: AtomicUsize::new(0),
        });
        let classifier = IntentClassifier::new(ranker.clone());

        for _ in 0..3 {
            assert_eq!(
                classifier.classify("best gain in 2020").await.unwrap(),
                Intent::MostProfit
            );
        }
        classifier.classify("best gain in 2021").await.unwrap();

        assert_eq!(ranker.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_backend_failure_propagates() {
        let classifier = IntentClassifier::new(Arc::new(FailingRanker));
        let err = classifier.classify("anything").await.unwrap_err();
        assert!(matches!(err, AgentError::Classification(_)));
    }

    #[test]
    fn test_create_ranker_without_token_is_keyword() {
        let ranker = create_ranker(&ClassifierConfig::default()).unwrap();
        assert_eq!(ranker.name(), "keyword");
    }

    #[tokio::test]
    async fn test_configured_endpoint_is_used_by_hosted_backend() {
        let config = ClassifierConfig {
            api_token: Some("hf_test".to_string()),
            endpoint: Some("http://127.0.0.1:1/classify".to_string()),
            ..ClassifierConfig::default()
        };

        let classifier = IntentClassifier::from_config(&config).unwrap();
        assert_eq!(classifier.backend(), "huggingface");

        let err = classifier.classify("best day in 2020?").await.unwrap_err();
        assert!(matches!(err, AgentError::Classification(_)));
    }
}
