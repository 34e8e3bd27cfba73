//! Judge adapter: turns a round's responses into a validated ranking

use indexmap::IndexMap;
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::error::{JudgeViolation, Result};
use crate::llm::TextGenerator;

/// Read one `results` entry as a competitor number. Entries are
/// string-encoded per the prompt; bare integers are accepted too.
fn entry_index(entry: &Value) -> std::result::Result<usize, JudgeViolation> {
    let raw = match entry {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        other => other.to_string(),
    };
    raw.parse::<usize>()
        .map_err(|_| JudgeViolation::NotAnIndex(raw))
}

/// Build the judge prompt. Responses are labeled by 1-based position in
/// the order given.
pub fn build_judge_prompt(responses: &[&str], question: &str) -> String {
    let mut together = String::new();
    for (idx, resp) in responses.iter().enumerate() {
        together.push_str(&format!(
            "# Review from competitor {}\n\n{}\n\n",
            idx + 1,
            resp
        ));
    }

    format!(
        r#"
You are judging a competition between {count} competitors.
Each model has been given this question:

{question}

Your job is to evaluate each response on their plusvalue to improve the original answer, and rank them in order of best to worst.
Respond with JSON, and only JSON, with the following format:
{{"results": ["best competitor number", "second best competitor number", ...]}}

Here are the responses from each competitor:

{together}

Now respond with the JSON with the ranked order of the competitors, nothing else. Do not include markdown formatting or code blocks.
"#,
        count = responses.len(),
        question = question,
        together = together
    )
}

/// Strip a surrounding markdown code fence, if any
fn strip_code_fence(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let Some(body) = rest.strip_suffix("```") else {
        return trimmed;
    };
    // Drop the info string ("json") on the opening line
    match body.find('\n') {
        Some(newline) => body[newline + 1..].trim(),
        None => body.trim(),
    }
}

/// Parse judge output into competitor positions (1-based), best first.
///
/// The result is always a permutation of `1..=count`; anything else is a
/// violation.
pub fn parse_judge_output(
    content: &str,
    count: usize,
) -> std::result::Result<Vec<usize>, JudgeViolation> {
    let body = strip_code_fence(content);
    let verdict: Value =
        serde_json::from_str(body).map_err(|e| JudgeViolation::NotJson(e.to_string()))?;
    let entries = verdict
        .get("results")
        .and_then(Value::as_array)
        .ok_or(JudgeViolation::MissingResults)?;

    if entries.len() != count {
        return Err(JudgeViolation::WrongLength {
            expected: count,
            got: entries.len(),
        });
    }

    let order = entries
        .iter()
        .map(entry_index)
        .collect::<std::result::Result<Vec<_>, _>>()?;
    check_order(&order, count)?;
    Ok(order)
}

/// Check that `order` is a permutation of `1..=count`
pub fn check_order(order: &[usize], count: usize) -> std::result::Result<(), JudgeViolation> {
    if order.len() != count {
        return Err(JudgeViolation::WrongLength {
            expected: count,
            got: order.len(),
        });
    }

    let mut seen = HashSet::with_capacity(count);
    for &index in order {
        if index == 0 || index > count {
            return Err(JudgeViolation::OutOfRange { index, count });
        }
        if !seen.insert(index) {
            return Err(JudgeViolation::Duplicate(index));
        }
    }
    Ok(())
}

/// Map a judge order onto competitor names: name -> rank (1 = best).
///
/// Entries are inserted in rank order. `order` must already have passed
/// [`check_order`] against `names.len()`.
pub(crate) fn ranks_from_order(order: &[usize], names: &[String]) -> IndexMap<String, usize> {
    order
        .iter()
        .enumerate()
        .map(|(pos, &index)| (names[index - 1].clone(), pos + 1))
        .collect()
}

/// Judge endpoint plus the task question it grades against
pub struct Judge {
    generator: Arc<dyn TextGenerator>,
    question: String,
}

impl Judge {
    pub fn new(generator: Arc<dyn TextGenerator>, question: impl Into<String>) -> Self {
        Self {
            generator,
            question: question.into(),
        }
    }

    pub fn name(&self) -> &str {
        self.generator.name()
    }

    pub fn question(&self) -> &str {
        &self.question
    }

    /// Rank responses; returns 1-based positions into `responses`, best first
    pub async fn rank(&self, responses: &[&str]) -> Result<Vec<usize>> {
        let prompt = build_judge_prompt(responses, &self.question);
        let content = self.generator.generate(&prompt).await?;
        debug!("Judge {} replied: {}", self.name(), content);

        parse_judge_output(&content, responses.len()).map_err(|violation| {
            warn!("Judge {} output rejected: {}", self.name(), violation);
            violation.into()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CompetitionError;
    use async_trait::async_trait;

    struct CannedJudge(String);

    #[async_trait]
    impl TextGenerator for CannedJudge {
        fn name(&self) -> &str {
            "judge"
        }

        async fn generate(&self, _prompt: &str) -> Result<String> {
            Ok(self.0.clone())
        }
    }

    fn names(n: usize) -> Vec<String> {
        (1..=n).map(|i| format!("llm-{}", i)).collect()
    }

    #[test]
    fn test_order_to_ranks() {
        let order = parse_judge_output(r#"{"results": ["2","1","3"]}"#, 3).unwrap();
        assert_eq!(order, vec![2, 1, 3]);

        let ranks = ranks_from_order(&order, &names(3));
        assert_eq!(ranks["llm-2"], 1);
        assert_eq!(ranks["llm-1"], 2);
        assert_eq!(ranks["llm-3"], 3);
        assert_eq!(ranks.get_index(0).unwrap().0, "llm-2");
    }

    #[test]
    fn test_integer_entries_and_fences() {
        let fenced = "```json\n{\"results\": [3, 1, 2]}\n```";
        assert_eq!(parse_judge_output(fenced, 3).unwrap(), vec![3, 1, 2]);
    }

    #[test]
    fn test_violations() {
        assert!(matches!(
            parse_judge_output("I think competitor 2 wins", 2),
            Err(JudgeViolation::NotJson(_))
        ));
        assert_eq!(
            parse_judge_output(r#"{"ranking": ["1", "2"]}"#, 2),
            Err(JudgeViolation::MissingResults)
        );
        assert_eq!(
            parse_judge_output(r#"{"results": "1,2"}"#, 2),
            Err(JudgeViolation::MissingResults)
        );
        assert_eq!(
            parse_judge_output(r#"{"results": ["1"]}"#, 2),
            Err(JudgeViolation::WrongLength { expected: 2, got: 1 })
        );
        assert_eq!(
            parse_judge_output(r#"{"results": ["1", "two"]}"#, 2),
            Err(JudgeViolation::NotAnIndex("two".to_string()))
        );
        assert_eq!(
            parse_judge_output(r#"{"results": ["1", "3"]}"#, 2),
            Err(JudgeViolation::OutOfRange { index: 3, count: 2 })
        );
        assert_eq!(
            parse_judge_output(r#"{"results": ["0", "1"]}"#, 2),
            Err(JudgeViolation::OutOfRange { index: 0, count: 2 })
        );
        assert_eq!(
            parse_judge_output(r#"{"results": ["1", "1"]}"#, 2),
            Err(JudgeViolation::Duplicate(1))
        );
    }

    #[test]
    fn test_check_order() {
        assert!(check_order(&[2, 3, 1], 3).is_ok());
        assert_eq!(
            check_order(&[], 2),
            Err(JudgeViolation::WrongLength { expected: 2, got: 0 })
        );
        assert_eq!(
            check_order(&[1, 4], 2),
            Err(JudgeViolation::OutOfRange { index: 4, count: 2 })
        );
        assert_eq!(check_order(&[2, 2], 2), Err(JudgeViolation::Duplicate(2)));
    }

    #[test]
    fn test_prompt_labels_responses() {
        let prompt = build_judge_prompt(&["first answer", "second answer"], "Why?");
        assert!(prompt.contains("between 2 competitors"));
        assert!(prompt.contains("# Review from competitor 1\n\nfirst answer"));
        assert!(prompt.contains("# Review from competitor 2\n\nsecond answer"));
        assert!(prompt.contains("Why?"));
        assert!(prompt.contains(r#"{"results": ["best competitor number""#));
    }

    #[tokio::test]
    async fn test_judge_surfaces_violation() {
        let judge = Judge::new(
            Arc::new(CannedJudge(r#"{"results": ["1","1"]}"#.to_string())),
            "Why?",
        );
        let err = judge.rank(&["a", "b"]).await.unwrap_err();
        assert!(matches!(
            err,
            CompetitionError::JudgeProtocolViolation(JudgeViolation::Duplicate(1))
        ));
    }
}
