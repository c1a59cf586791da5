//! Model-ranked selection of relevant catalog examples.
//!
//! Selection fails closed: a transport error, an unparseable answer, or an answer with no usable
//! entries all produce an empty list, and the caller falls back to predefined templates.  The
//! model is asked once and never retried.

use crate::{t64, PolicyCatalog, Prompt, TextModel, Usage};

/// How many examples are selected unless the caller says otherwise.
pub const DEFAULT_MAX_EXAMPLES: usize = 3;

/// The temperature used for ranking.
pub const SELECTION_TEMPERATURE: f32 = 0.3;

const SELECT_EXAMPLES_PROMPT: &str = include_str!("../prompts/select-examples.md");

////////////////////////////////////////// ExampleCandidate ////////////////////////////////////////

/// A catalog entry the model judged relevant to a request.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize)]
pub struct ExampleCandidate {
    /// The entry's category, possibly `parent/child`.
    pub category: String,
    /// The template name without extension.
    pub template_name: String,
    /// Relevance in `[0, 100]`.
    pub relevance_score: t64,
    /// Why the model picked it; empty when the model gave no reason.
    pub reason: String,
}

impl ExampleCandidate {
    /// Build a candidate from one element of the model's answer.
    ///
    /// Returns `None` unless the element carries a string `category`, a string `template_name`
    /// (`file_name` is accepted as an alias) and a numeric `relevance_score`.
    fn from_json(value: &serde_json::Value) -> Option<Self> {
        let category = value.get("category")?.as_str()?;
        let template_name = value
            .get("template_name")
            .or_else(|| value.get("file_name"))?
            .as_str()?;
        let relevance_score = value.get("relevance_score")?.as_f64()?;
        let reason = value
            .get("reason")
            .and_then(|r| r.as_str())
            .unwrap_or_default();
        Some(Self {
            category: category.to_string(),
            template_name: template_name.to_string(),
            relevance_score: t64(relevance_score.clamp(0.0, 100.0)),
            reason: reason.to_string(),
        })
    }
}

///////////////////////////////////////// RelevanceSelector ////////////////////////////////////////

/// Asks a model to rank every catalog entry against a request.
pub struct RelevanceSelector<'a, M: ?Sized> {
    model: &'a M,
    catalog: &'a PolicyCatalog,
    temperature: f32,
}

impl<'a, M: TextModel + ?Sized> RelevanceSelector<'a, M> {
    /// A selector ranking `catalog` with `model`.
    pub fn new(model: &'a M, catalog: &'a PolicyCatalog) -> Self {
        Self {
            model,
            catalog,
            temperature: SELECTION_TEMPERATURE,
        }
    }

    /// Override the ranking temperature.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// The prompt sent to the model.
    pub fn prompt(&self, request: &str, max_examples: usize) -> Prompt {
        let available = self
            .catalog
            .entries()
            .iter()
            .map(|e| format!("- {}/{}", e.category, e.template_name))
            .collect::<Vec<_>>()
            .join("\n");
        Prompt::new(
            format!(
                "<request>{request}</request>\n\n\
                 <available-examples>\n{available}\n</available-examples>\n\n\
                 Identify the {max_examples} most relevant example files for this request."
            ),
            self.temperature,
        )
        .with_system(SELECT_EXAMPLES_PROMPT)
    }

    /// Select at most `max_examples` candidates, best first.
    ///
    /// Never fails; see the module documentation.
    pub async fn select(
        &self,
        request: &str,
        max_examples: usize,
        usage: &mut Usage,
    ) -> Vec<ExampleCandidate> {
        if max_examples == 0 {
            return vec![];
        }
        let prompt = self.prompt(request, max_examples);
        let completion = match self.model.complete(&prompt).await {
            Ok(completion) => completion,
            Err(err) => {
                tracing::warn!(error = %err, "example selection failed");
                return vec![];
            }
        };
        usage.record_call(completion.usage);
        tracing::debug!(response = %completion.text, "example selection response");
        match parse_candidates(&completion.text, max_examples) {
            Some(candidates) => {
                tracing::info!(
                    count = candidates.len(),
                    "identified relevant examples: {}",
                    candidates
                        .iter()
                        .map(|c| format!(
                            "{}/{} ({})",
                            c.category, c.template_name, c.relevance_score.0
                        ))
                        .collect::<Vec<_>>()
                        .join(", ")
                );
                candidates
            }
            None => {
                tracing::warn!(response = %completion.text, "could not parse example selection");
                vec![]
            }
        }
    }
}

/// Parse a ranking answer into at most `max_examples` candidates sorted by descending score.
///
/// Returns `None` when the answer holds no JSON array at all.  Elements missing a required
/// field are dropped.  Equal scores keep the model's order.
pub fn parse_candidates(text: &str, max_examples: usize) -> Option<Vec<ExampleCandidate>> {
    let values: Vec<serde_json::Value> = serde_json::from_str(extract_json_array(text)).ok()?;
    let mut candidates = values
        .iter()
        .filter_map(ExampleCandidate::from_json)
        .collect::<Vec<_>>();
    candidates.sort_by(|a, b| b.relevance_score.cmp(&a.relevance_score));
    candidates.truncate(max_examples);
    Some(candidates)
}

fn extract_json_array(text: &str) -> &str {
    if let Some(start) = text.find("```json") {
        if let Some(end) = text[start + 7..].find("```") {
            return text[start + 7..start + 7 + end].trim();
        }
    }
    match (text.find('['), text.rfind(']')) {
        (Some(start), Some(end)) if start < end => &text[start..=end],
        _ => text.trim(),
    }
}

/////////////////////////////////////////////// tests //////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::testing::ScriptedModel;

    fn names(candidates: &[ExampleCandidate]) -> Vec<String> {
        candidates
            .iter()
            .map(|c| format!("{}/{}", c.category, c.template_name))
            .collect()
    }

    #[test]
    fn missing_score_is_dropped() {
        let text = r#"[
            {"category": "authn", "template_name": "authn-jwt-github",
             "relevance_score": 90, "reason": "jwt"},
            {"category": "ci/github", "template_name": "actions", "reason": "no score"},
            {"category": "cloud/aws", "template_name": "aws", "relevance_score": 40}
        ]"#;
        let candidates = parse_candidates(text, 3).unwrap();
        assert_eq!(vec!["authn/authn-jwt-github", "cloud/aws/aws"], names(&candidates));
        assert_eq!("", candidates[1].reason);
    }

    #[test]
    fn top_k_with_stable_ties() {
        let text = r#"[
            {"category": "a", "template_name": "one", "relevance_score": 50},
            {"category": "b", "template_name": "two", "relevance_score": 80},
            {"category": "c", "template_name": "three", "relevance_score": 80},
            {"category": "d", "template_name": "four", "relevance_score": 10},
            {"category": "e", "template_name": "five", "relevance_score": 70}
        ]"#;
        let candidates = parse_candidates(text, 2).unwrap();
        assert_eq!(vec!["b/two", "c/three"], names(&candidates));
    }

    #[test]
    fn fenced_answer_and_aliases() {
        let text = r#"Here you go:
```json
[{"category": "web", "file_name": "conjur-oidc-demo", "relevance_score": 120}]
```"#;
        let candidates = parse_candidates(text, 3).unwrap();
        assert_eq!(vec!["web/conjur-oidc-demo"], names(&candidates));
        assert_eq!(t64(100.0), candidates[0].relevance_score);
    }

    #[test]
    fn prose_is_not_parsed() {
        assert_eq!(None, parse_candidates("I think authn is best.", 3));
        assert_eq!(None, parse_candidates("{\"category\": \"authn\"}", 3));
    }

    #[test]
    fn string_score_is_invalid() {
        let text = r#"[{"category": "a", "template_name": "b", "relevance_score": "95"}]"#;
        assert_eq!(Some(vec![]), parse_candidates(text, 3));
    }

    #[test]
    fn prompt_enumerates_catalog() {
        let catalog = PolicyCatalog::builtin();
        let model = ScriptedModel::new();
        let selector = RelevanceSelector::new(&model, &catalog);
        let prompt = selector.prompt("GitHub Actions", 3);
        assert!(prompt.user.contains("- authn/authn-jwt-github"));
        assert!(prompt.user.contains("- ci/github/actions"));
        assert!(prompt.user.contains("- cloud/aws/aws"));
        assert!(prompt.user.contains("- web/conjur-oidc-demo"));
        assert!(prompt.user.contains("<request>GitHub Actions</request>"));
        assert_eq!(0.3, prompt.temperature);
        assert!(prompt.system.unwrap().contains("Return ONLY the JSON array"));
    }

    #[tokio::test]
    async fn transport_failure_is_empty() {
        let catalog = PolicyCatalog::builtin();
        let model = ScriptedModel::new().fail("503");
        let mut usage = Usage::new();
        let candidates = RelevanceSelector::new(&model, &catalog)
            .select("anything", 3, &mut usage)
            .await;
        assert!(candidates.is_empty());
        assert_eq!(0, usage.model_calls);
    }

    #[tokio::test]
    async fn select_counts_the_call() {
        let catalog = PolicyCatalog::builtin();
        let model = ScriptedModel::new().answer(
            r#"[{"category": "ci/github", "template_name": "actions",
                 "relevance_score": 88, "reason": "actions"}]"#,
        );
        let mut usage = Usage::new();
        let candidates = RelevanceSelector::new(&model, &catalog)
            .select("GitHub Actions", 3, &mut usage)
            .await;
        assert_eq!(vec!["ci/github/actions"], names(&candidates));
        assert_eq!(1, usage.model_calls);
    }

    #[tokio::test]
    async fn zero_examples_skips_the_model() {
        let catalog = PolicyCatalog::builtin();
        let model = ScriptedModel::new();
        let mut usage = Usage::new();
        let candidates = RelevanceSelector::new(&model, &catalog)
            .select("anything", 0, &mut usage)
            .await;
        assert!(candidates.is_empty());
        assert!(model.prompts().is_empty());
    }
}
