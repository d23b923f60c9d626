use crate::engine::CompletionEngine;
use crate::types::{Classification, ClassificationResult};

/// Phrase in the prompt whose answer decides category relatedness.
pub const RELATEDNESS_MARKER: &str = "is this comment related to the category?";

pub fn build_prompt(comment: &str, category: &str) -> String {
    format!(
        "As a TikTok comment classifier, classify the comment as 'good' or 'bad' \
         specifically in relation to '{category}'. \
         Comment: '{comment}'\n\n\
         Classification and Reason:\n\
         Is this comment related to the category? (Yes/No):"
    )
}

/// Derives both booleans from a model reply.
///
/// `is_bad` matches "bad" anywhere, so negated phrasing such as "not bad"
/// still counts as bad. Relatedness looks for "yes" anywhere after the first
/// marker, or anywhere in the reply when the marker is missing.
pub fn derive_verdict(raw_text: &str) -> ClassificationResult {
    let lowered = raw_text.to_lowercase();
    let is_bad = lowered.contains("bad");

    let answer = match lowered.split_once(RELATEDNESS_MARKER) {
        Some((_, after)) => after,
        None => lowered.as_str(),
    };
    let related_to_category = answer.trim().contains("yes");

    ClassificationResult {
        raw_text: raw_text.to_string(),
        is_bad,
        related_to_category,
    }
}

/// Classifies one comment against a category.
///
/// Makes exactly one completion call when an engine is present and none
/// otherwise. Service failures come back as [`Classification::Failed`].
#[tracing::instrument(skip(comment, engine), fields(comment_len = comment.len()))]
pub async fn classify(
    comment: &str,
    category: &str,
    engine: Option<&dyn CompletionEngine>,
) -> Classification {
    metrics::counter!("classification_requests_total").increment(1);

    let Some(engine) = engine else {
        tracing::debug!("No completion client configured, skipping classification");
        return record(Classification::NoClient);
    };

    let prompt = build_prompt(comment, category);
    let outcome = match engine.complete(&prompt).await {
        Ok(reply) => {
            let verdict = derive_verdict(reply.trim());
            tracing::debug!(
                is_bad = verdict.is_bad,
                related = verdict.related_to_category,
                "Comment classified"
            );
            Classification::Classified(verdict)
        }
        Err(e) => {
            tracing::error!(error = %e, "Classification failed");
            Classification::Failed {
                reason: e.to_string(),
            }
        }
    };

    record(outcome)
}

fn record(outcome: Classification) -> Classification {
    metrics::counter!("classification_outcomes_total", "outcome" => outcome.label()).increment(1);
    outcome
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::error::CompletionError;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Engine that replays canned replies and records every prompt it saw.
    pub(crate) struct ScriptedEngine {
        replies: Mutex<VecDeque<Result<String, CompletionError>>>,
        pub(crate) prompts: Mutex<Vec<String>>,
    }

    impl ScriptedEngine {
        pub(crate) fn new(replies: Vec<Result<String, CompletionError>>) -> Self {
            Self {
                replies: Mutex::new(replies.into()),
                prompts: Mutex::new(Vec::new()),
            }
        }

        pub(crate) fn replying(replies: &[&str]) -> Self {
            Self::new(replies.iter().map(|r| Ok(r.to_string())).collect())
        }

        pub(crate) fn calls(&self) -> usize {
            self.prompts.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl CompletionEngine for ScriptedEngine {
        fn model(&self) -> &str {
            "scripted"
        }

        async fn complete(&self, prompt: &str) -> Result<String, CompletionError> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| {
                    Err(CompletionError::MalformedResponse("script exhausted".into()))
                })
        }
    }

    #[test]
    fn prompt_embeds_category_and_comment_verbatim() {
        let prompt = build_prompt("Your makeup looks terrible.", "general");

        assert_eq!(
            prompt,
            "As a TikTok comment classifier, classify the comment as 'good' or 'bad' \
             specifically in relation to 'general'. Comment: 'Your makeup looks terrible.'\n\n\
             Classification and Reason:\nIs this comment related to the category? (Yes/No):"
        );
        assert!(prompt.to_lowercase().contains(RELATEDNESS_MARKER));
    }

    #[test]
    fn bad_reply_related_to_category() {
        let verdict = derive_verdict(
            "This comment is bad. Is this comment related to the category? Yes, it is.",
        );

        assert!(verdict.is_bad);
        assert!(verdict.related_to_category);
    }

    #[test]
    fn negated_bad_is_still_flagged() {
        let verdict = derive_verdict(
            "This seems fine, not bad at all. Is this comment related to the category? No.",
        );

        assert!(verdict.is_bad);
        assert!(!verdict.related_to_category);
    }

    #[test]
    fn bad_match_ignores_case() {
        assert!(derive_verdict("Classification: BAD").is_bad);
        assert!(!derive_verdict("Classification: Good").is_bad);
    }

    #[test]
    fn yes_before_the_marker_does_not_count() {
        let verdict =
            derive_verdict("Yes, this is good. Is this comment related to the category? No");
        assert!(!verdict.related_to_category);
    }

    #[test]
    fn repeated_marker_splits_at_first_occurrence() {
        let verdict = derive_verdict(
            "Good. Is this comment related to the category? Yes. \
             Is this comment related to the category? No",
        );
        assert!(verdict.related_to_category);

        let verdict = derive_verdict(
            "Good. Is this comment related to the category? No. \
             Is this comment related to the category? Yes",
        );
        // Everything after the first marker counts, including later answers.
        assert!(verdict.related_to_category);
    }

    #[test]
    fn missing_marker_falls_back_to_whole_reply() {
        assert!(derive_verdict("Good. Related: yes.").related_to_category);
        assert!(!derive_verdict("Good. Related: no.").related_to_category);
    }

    #[test]
    fn raw_text_is_kept_verbatim() {
        let reply = "Good. IS THIS COMMENT RELATED TO THE CATEGORY? YES";
        let verdict = derive_verdict(reply);

        assert_eq!(verdict.raw_text, reply);
        assert!(verdict.related_to_category);
    }

    #[tokio::test]
    async fn no_engine_returns_sentinel() {
        let outcome = classify("Great post!", "general", None).await;
        assert_eq!(outcome, Classification::NoClient);
    }

    #[tokio::test]
    async fn classify_trims_reply_and_calls_once() {
        let engine = ScriptedEngine::replying(&[
            "\n  This comment is bad. Is this comment related to the category? Yes, it is.  \n",
        ]);

        let outcome =
            classify("Your makeup looks terrible.", "general", Some(&engine)).await;

        assert_eq!(
            outcome,
            Classification::Classified(ClassificationResult {
                raw_text: "This comment is bad. Is this comment related to the category? Yes, it is."
                    .to_string(),
                is_bad: true,
                related_to_category: true,
            })
        );
        assert_eq!(engine.calls(), 1);
        assert_eq!(
            engine.prompts.lock().unwrap()[0],
            build_prompt("Your makeup looks terrible.", "general")
        );
    }

    #[tokio::test]
    async fn service_errors_become_failed_outcomes() {
        let engine = ScriptedEngine::new(vec![Err(CompletionError::Api {
            status: 401,
            body: "invalid api key".into(),
        })]);

        let outcome = classify("Great post!", "general", Some(&engine)).await;

        match outcome {
            Classification::Failed { reason } => assert!(reason.contains("401")),
            other => panic!("expected failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn repeated_calls_are_not_cached() {
        let engine = ScriptedEngine::replying(&[
            "Good. Is this comment related to the category? Yes",
            "Bad. Is this comment related to the category? No",
        ]);

        let first = classify("Amazing style!", "fashion", Some(&engine)).await;
        let second = classify("Amazing style!", "fashion", Some(&engine)).await;

        assert_eq!(engine.calls(), 2);
        for outcome in [first, second] {
            let Classification::Classified(result) = outcome else {
                panic!("expected classification");
            };
            assert_eq!(result, derive_verdict(&result.raw_text));
        }
    }
}
