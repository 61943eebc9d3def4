//! Chat session
//!
//! One turn: CLASSIFY → ANSWER → LOG. The dataset is loaded once per
//! session and never reloaded.

use crate::audit::InteractionLog;
use crate::classifier::IntentClassifier;
use crate::config::Config;
use crate::dataset::Dataset;
use crate::error::AgentError;
use crate::models::InteractionRecord;
use crate::query;
use crate::Result;
use tracing::{info, warn};

const EXIT_WORDS: [&str; 3] = ["exit", "quit", "bye"];

pub const GOODBYE: &str = "👋 Goodbye!";

/// True for `exit`, `quit` or `bye`, ignoring case and surrounding whitespace.
pub fn is_exit(input: &str) -> bool {
    let input = input.trim();
    EXIT_WORDS.iter().any(|w| input.eq_ignore_ascii_case(w))
}

/// Outcome of one line of user input.
#[derive(Debug, Clone, PartialEq)]
pub enum Turn {
    Exit,
    Reply(String),
}

pub struct ChatSession {
    classifier: IntentClassifier,
    dataset: Dataset,
    log: InteractionLog,
}

impl ChatSession {
    pub fn new(classifier: IntentClassifier, dataset: Dataset, log: InteractionLog) -> Self {
        Self {
            classifier,
            dataset,
            log,
        }
    }

    /// Load the dataset and build the classifier. Fails if the dataset
    /// cannot be loaded.
    pub async fn from_config(config: &Config) -> Result<Self> {
        let path = config.data_path.clone();
        let dataset = tokio::task::spawn_blocking(move || Dataset::load(path))
            .await
            .map_err(|e| AgentError::DataLoad(e.to_string()))??;

        let classifier = IntentClassifier::from_config(&config.classifier)?;

        info!(
            rows = dataset.len(),
            backend = classifier.backend(),
            "Chat session ready"
        );

        Ok(Self::new(
            classifier,
            dataset,
            InteractionLog::new(config.log_path.clone()),
        ))
    }

    pub fn log(&self) -> &InteractionLog {
        &self.log
    }

    /// Handle one raw input line. Anything but an exit word, blank lines
    /// included, is answered and logged as typed.
    pub async fn turn(&self, line: &str) -> Result<Turn> {
        if is_exit(line) {
            return Ok(Turn::Exit);
        }
        self.respond(line).await.map(Turn::Reply)
    }

    /// Answer one question and record it. A failed log write is reported
    /// but does not withhold the answer.
    pub async fn respond(&self, input: &str) -> Result<String> {
        let intent = self.classifier.classify(input).await?;
        let response = query::answer(intent, input, &self.dataset);

        info!(%intent, "Question answered");

        if let Err(e) = self
            .log
            .append(InteractionRecord::new(input, intent, response.clone()))
            .await
        {
            warn!(error = %e, "Failed to record interaction");
        }

        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::{KeywordRanker, LabelScore, ZeroShotRanker};
    use crate::dataset::tests::{csv_row, dataset_from_rows};
    use crate::models::Intent;
    use async_trait::async_trait;
    use std::sync::Arc;
    use tempfile::TempDir;

    struct DownRanker;

    #[async_trait]
    impl ZeroShotRanker for DownRanker {
        fn name(&self) -> &'static str {
            "down"
        }

        async fn rank(&self, _text: &str, _labels: &[&str]) -> Result<Vec<LabelScore>> {
            Err(AgentError::Classification("service unavailable".to_string()))
        }
    }

    fn dataset() -> Dataset {
        dataset_from_rows(&[
            csv_row("2020-03-13", 2711.0, 2480.0, 23185.0, 24032.0),
            csv_row("2020-03-16", 2386.0, 2711.0, 20188.0, 23063.0),
        ])
    }

    fn session(dir: &TempDir, ranker: Arc<dyn ZeroShotRanker>) -> ChatSession {
        ChatSession::new(
            IntentClassifier::new(ranker),
            dataset(),
            InteractionLog::new(dir.path().join("question_log.json")),
        )
    }

    #[test]
    fn test_exit_words() {
        assert!(is_exit("exit"));
        assert!(is_exit("  QUIT \n"));
        assert!(is_exit("Bye"));
        assert!(!is_exit("goodbye"));
        assert!(!is_exit("exit now"));
        assert!(!is_exit(""));
    }

    #[tokio::test]
    async fn test_respond_answers_and_logs() {
        let dir = TempDir::new().unwrap();
        let chat = session(&dir, Arc::new(KeywordRanker));

        let reply = chat.respond("What was the worst drop in 2020?").await.unwrap();
        assert_eq!(reply, "📉 Worst drop in 2020: -325.00 on 2020-03-16.");

        let logged = chat.log().read_all().await.unwrap();
        assert_eq!(logged.len(), 1);
        assert_eq!(logged[0].user_input, "What was the worst drop in 2020?");
        assert_eq!(logged[0].intent, Intent::WorstDay);
        assert_eq!(logged[0].response, reply);
    }

    #[tokio::test]
    async fn test_unrecognised_question_is_still_logged() {
        let dir = TempDir::new().unwrap();
        let chat = session(&dir, Arc::new(KeywordRanker));

        let reply = chat.respond("tell me a joke").await.unwrap();
        assert_eq!(reply, query::NOT_UNDERSTOOD);

        let logged = chat.log().read_all().await.unwrap();
        assert_eq!(logged[0].intent, Intent::Unknown);
    }

    #[tokio::test]
    async fn test_every_non_exit_line_is_answered_and_logged_verbatim() {
        let dir = TempDir::new().unwrap();
        let chat = session(&dir, Arc::new(KeywordRanker));

        assert_eq!(
            chat.turn("").await.unwrap(),
            Turn::Reply(query::NOT_UNDERSTOOD.to_string())
        );
        assert!(matches!(
            chat.turn("  worst drop in 2020 ").await.unwrap(),
            Turn::Reply(_)
        ));
        assert_eq!(chat.turn(" Bye ").await.unwrap(), Turn::Exit);

        let logged = chat.log().read_all().await.unwrap();
        assert_eq!(logged.len(), 2);
        assert_eq!(logged[0].user_input, "");
        assert_eq!(logged[0].intent, Intent::Unknown);
        assert_eq!(logged[1].user_input, "  worst drop in 2020 ");
        assert_eq!(logged[1].intent, Intent::WorstDay);
    }

    #[tokio::test]
    async fn test_classifier_failure_propagates_without_logging() {
        let dir = TempDir::new().unwrap();
        let chat = session(&dir, Arc::new(DownRanker));

        let err = chat.respond("average in 2020").await.unwrap_err();
        assert!(matches!(err, AgentError::Classification(_)));
        assert_eq!(chat.log().size().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_log_failure_does_not_withhold_answer() {
        let dir = TempDir::new().unwrap();
        // a directory where the log file should be makes every write fail
        let blocked = dir.path().join("question_log.json");
        tokio::fs::create_dir_all(blocked.join("nested")).await.unwrap();

        let chat = ChatSession::new(
            IntentClassifier::new(Arc::new(KeywordRanker)),
            dataset(),
            InteractionLog::new(blocked),
        );

        let reply = chat.respond("average in 2020").await.unwrap();
        assert_eq!(reply, "📊 Average S&P 500 in 2020 was 2548.50.");
    }

    #[tokio::test]
    async fn test_from_config_fails_without_dataset() {
        let dir = TempDir::new().unwrap();
        let config = Config {
            data_path: dir.path().join("absent.csv"),
            ..Config::default()
        };

        let result = ChatSession::from_config(&config).await;
        assert!(matches!(result, Err(AgentError::DataLoad(_))));
    }
}
