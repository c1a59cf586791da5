//! The policy generation pipeline.
//!
//! A request flows through these stages, each running to completion before the next:
//!
//! 1. [`KeywordClassifier`] refines the policy type from the request's words.
//! 2. [`RelevanceSelector`] asks the model for the most relevant catalog examples, and each one
//!    is read through the [`TemplateFetcher`].
//! 3. When nothing usable came back, [`fallback_examples`] picks predefined templates instead.
//! 4. The instructions, request and examples are sent to the model once.
//! 5. The answer is normalized into a [`PolicyDocument`] and checked structurally.  The check is
//!    logged and never blocks the response.
//!
//! Only a failure of the model call in step 4 is an error.

use std::time::Instant;

use crate::{
    explain_policy, fallback_examples, suggest_path, t64, Classification, GenerationError,
    KeywordClassifier, PolicyDocument, PolicyReport, PredefinedTemplate, Prompt,
    RelevanceSelector, TemplateFetcher, TemplateSource, TextModel, Usage, DEFAULT_MAX_EXAMPLES,
    EXPLANATION_TEMPERATURE, GENERAL_POLICY_TYPE, PREDEFINED_TEMPLATES, SELECTION_TEMPERATURE,
};

const GENERATE_POLICY_PROMPT: &str = include_str!("../prompts/generate-policy.md");

const GENERATION_INSTRUCTIONS: &str = "Generate a complete, valid Conjur policy tailored to the \
    user's request.  Reflect any mentioned resources, credentials, permissions, environments, or \
    applications.  Do not ask for clarification.  Output only the YAML, with no explanations or \
    formatting.";

////////////////////////////////////////// GeneratorOptions ////////////////////////////////////////

/// Tunables for [`PolicyGenerator`].
#[derive(Clone, Debug, PartialEq)]
pub struct GeneratorOptions {
    /// How many relevant examples to ask for.
    pub max_examples: usize,
    /// Temperature for ranking examples.
    pub selection_temperature: f32,
    /// Temperature for writing the policy.
    pub generation_temperature: f32,
    /// Temperature for writing the explanation.
    pub explanation_temperature: f32,
}

impl GeneratorOptions {
    /// The temperature used to write policies.
    pub const GENERATION_TEMPERATURE: f32 = 0.7;
}

impl Default for GeneratorOptions {
    fn default() -> Self {
        Self {
            max_examples: DEFAULT_MAX_EXAMPLES,
            selection_temperature: SELECTION_TEMPERATURE,
            generation_temperature: Self::GENERATION_TEMPERATURE,
            explanation_temperature: EXPLANATION_TEMPERATURE,
        }
    }
}

////////////////////////////////////////// FetchedExample //////////////////////////////////////////

/// A relevant example whose text was fetched.
#[derive(Clone, Debug, Eq, PartialEq, serde::Serialize)]
pub struct FetchedExample {
    /// `category/template`, the example's name in the catalog.
    pub path: String,
    /// The raw template text.  Never parsed here.
    pub content: String,
    /// Relevance in `[0, 100]`.
    pub relevance_score: t64,
    /// Why the example was selected.
    pub reason: String,
}

///////////////////////////////////////////// ExampleSet ///////////////////////////////////////////

/// The examples placed in the generation context.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ExampleSet {
    /// Examples ranked relevant by the model, best first.
    Relevant(Vec<FetchedExample>),
    /// Predefined templates used because no relevant example was available.
    Fallback(Vec<PredefinedTemplate>),
}

impl ExampleSet {
    /// The names of the examples, in context order.
    pub fn sources(&self) -> Vec<String> {
        match self {
            ExampleSet::Relevant(examples) => examples.iter().map(|e| e.path.clone()).collect(),
            ExampleSet::Fallback(templates) => {
                templates.iter().map(|t| t.key.to_string()).collect()
            }
        }
    }

    /// True for [`ExampleSet::Fallback`].
    pub fn is_fallback(&self) -> bool {
        matches!(self, ExampleSet::Fallback(_))
    }

    /// Render the examples block of the generation context.
    pub fn render(&self) -> String {
        let mut text = String::new();
        match self {
            ExampleSet::Relevant(examples) => {
                for example in examples {
                    text += &format!(
                        "\nExample {} policy (relevance: {}%):\n",
                        example.path, example.relevance_score.0
                    );
                    if !example.reason.is_empty() {
                        text += &format!("Reason for selection: {}\n", example.reason);
                    }
                    text += &format!("```yaml\n{}\n```\n", example.content);
                }
            }
            ExampleSet::Fallback(templates) => {
                for template in templates {
                    text += &format!(
                        "\nExample {} policy:\n```yaml\n{}\n```\n",
                        template.key, template.content
                    );
                }
            }
        }
        text
    }
}

///////////////////////////////////////// GenerationRequest ////////////////////////////////////////

/// A request after classification and example selection.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct GenerationRequest {
    /// The user's words.
    pub user_prompt: String,
    /// The refined policy type.
    pub policy_type: String,
    /// Relevant examples that were fetched, best first.  Possibly empty.
    pub selected_examples: Vec<FetchedExample>,
}

//////////////////////////////////////////// Generation ////////////////////////////////////////////

/// A generated policy along with how it was produced.
#[derive(Clone, Debug)]
pub struct Generation {
    /// The normalized policy.
    pub policy: PolicyDocument,
    /// The classification of the request.
    pub classification: Classification,
    /// The examples the model saw.
    pub examples: ExampleSet,
    /// Whether the policy passed the structural check.
    pub well_formed: bool,
    /// Model usage while generating.
    pub usage: Usage,
}

/////////////////////////////////////////// PolicyRequest //////////////////////////////////////////

/// What a caller asks for.
#[derive(Clone, Debug, Default, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct PolicyRequest {
    /// The natural-language request.
    pub prompt: String,
    /// A policy type hint; "general" when the caller has none.
    #[serde(default = "general_policy_type")]
    pub policy_type: String,
    /// Where the caller wants the policy stored; empty to have one suggested.
    #[serde(default)]
    pub target_path: String,
}

impl PolicyRequest {
    /// A request with no type hint and no target path.
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            policy_type: general_policy_type(),
            target_path: String::new(),
        }
    }
}

fn general_policy_type() -> String {
    GENERAL_POLICY_TYPE.to_string()
}

////////////////////////////////////////// PolicyGenerator /////////////////////////////////////////

/// Turns natural-language requests into policies.
pub struct PolicyGenerator<M, S> {
    model: M,
    fetcher: TemplateFetcher<S>,
    classifier: KeywordClassifier,
    templates: Vec<PredefinedTemplate>,
    options: GeneratorOptions,
}

impl<M: TextModel, S: TemplateSource> PolicyGenerator<M, S> {
    /// A generator using the default keyword table and predefined templates.
    pub fn new(model: M, fetcher: TemplateFetcher<S>) -> Self {
        Self {
            model,
            fetcher,
            classifier: KeywordClassifier::default(),
            templates: PREDEFINED_TEMPLATES.to_vec(),
            options: GeneratorOptions::default(),
        }
    }

    /// Replace the options.
    pub fn with_options(mut self, options: GeneratorOptions) -> Self {
        self.options = options;
        self
    }

    /// Replace the predefined templates used as fallback examples.
    pub fn with_templates(mut self, templates: Vec<PredefinedTemplate>) -> Self {
        self.templates = templates;
        self
    }

    /// The options in effect.
    pub fn options(&self) -> &GeneratorOptions {
        &self.options
    }

    /// Classify a request.
    pub fn classify(&self, user_prompt: &str, policy_type: &str) -> Classification {
        self.classifier.classify(user_prompt, policy_type)
    }

    /// Select relevant examples and fetch each one, dropping those that cannot be fetched.
    pub async fn relevant_examples(
        &self,
        user_prompt: &str,
        usage: &mut Usage,
    ) -> Vec<FetchedExample> {
        let candidates = RelevanceSelector::new(&self.model, self.fetcher.catalog())
            .with_temperature(self.options.selection_temperature)
            .select(user_prompt, self.options.max_examples, usage)
            .await;
        let mut examples = vec![];
        for candidate in candidates {
            let path = format!("{}/{}", candidate.category, candidate.template_name);
            match self
                .fetcher
                .fetch(&candidate.category, &candidate.template_name)
                .await
            {
                Some(content) => {
                    tracing::info!(
                        example = %path,
                        score = candidate.relevance_score.0,
                        "fetched example"
                    );
                    examples.push(FetchedExample {
                        path,
                        content,
                        relevance_score: candidate.relevance_score,
                        reason: candidate.reason,
                    });
                }
                None => {
                    tracing::warn!(example = %path, "failed to fetch example");
                }
            }
        }
        examples
    }

    /// Decide which examples go into the context.
    pub fn examples_for(&self, request: &GenerationRequest) -> ExampleSet {
        if !request.selected_examples.is_empty() {
            return ExampleSet::Relevant(request.selected_examples.clone());
        }
        tracing::warn!("no relevant examples found; falling back to predefined templates");
        ExampleSet::Fallback(
            fallback_examples(&self.templates, &request.policy_type)
                .into_iter()
                .copied()
                .collect(),
        )
    }

    /// The prompt that asks the model to write the policy.
    pub fn generation_prompt(&self, request: &GenerationRequest, examples: &ExampleSet) -> Prompt {
        Prompt::new(
            format!(
                "The user has requested a policy for: {}\n{}\n{GENERATION_INSTRUCTIONS}",
                request.user_prompt,
                examples.render(),
            ),
            self.options.generation_temperature,
        )
        .with_system(GENERATE_POLICY_PROMPT)
    }

    /// Generate a policy for `user_prompt`.
    pub async fn generate(
        &self,
        user_prompt: &str,
        policy_type: &str,
    ) -> Result<Generation, GenerationError> {
        let start_time = Instant::now();
        let mut usage = Usage::new();
        tracing::info!(prompt = %user_prompt, policy_type = %policy_type, "generating policy");
        let classification = self.classify(user_prompt, policy_type);
        tracing::info!(policy_type = %classification.policy_type, "refined policy type");
        let selected_examples = self.relevant_examples(user_prompt, &mut usage).await;
        let request = GenerationRequest {
            user_prompt: user_prompt.to_string(),
            policy_type: classification.policy_type.clone(),
            selected_examples,
        };
        let examples = self.examples_for(&request);
        let prompt = self.generation_prompt(&request, &examples);
        tracing::debug!(prompt = %prompt.user, "generation prompt");
        let completion = match self.model.complete(&prompt).await {
            Ok(completion) => completion,
            Err(err) => {
                tracing::error!(error = %err, "error generating policy");
                return Err(GenerationError::from(err));
            }
        };
        usage.record_call(completion.usage);
        let policy = PolicyDocument::from_model_output(&completion.text);
        let well_formed = match policy.validate() {
            Ok(summary) => {
                tracing::info!(top_level = summary.top_level, "generated policy is valid YAML");
                true
            }
            Err(err) => {
                tracing::warn!(error = %err, "generated policy is not valid YAML");
                false
            }
        };
        usage.set_wall_clock_time(start_time.elapsed());
        Ok(Generation {
            policy,
            classification,
            examples,
            well_formed,
            usage,
        })
    }

    /// Explain a policy.  Never fails.
    pub async fn explain(
        &self,
        policy: &PolicyDocument,
        user_prompt: &str,
        usage: &mut Usage,
    ) -> String {
        explain_policy(
            &self.model,
            policy,
            user_prompt,
            self.options.explanation_temperature,
            usage,
        )
        .await
    }

    /// Serve a request end to end: policy, explanation, resource counts and a suggested path.
    pub async fn respond(&self, request: &PolicyRequest) -> Result<PolicyReport, GenerationError> {
        let start_time = Instant::now();
        let generation = self.generate(&request.prompt, &request.policy_type).await?;
        let mut usage = generation.usage.clone();
        let explanation = self
            .explain(&generation.policy, &request.prompt, &mut usage)
            .await;
        let resources = generation.policy.resources();
        usage.set_wall_clock_time(start_time.elapsed());
        Ok(PolicyReport {
            suggested_path: suggest_path(&request.prompt, &request.target_path),
            policy_type: generation.classification.policy_type,
            template_hint: generation.classification.template,
            examples: generation.examples.sources(),
            used_fallback: generation.examples.is_fallback(),
            well_formed: generation.well_formed,
            policy: generation.policy,
            explanation,
            resources,
            usage,
        })
    }
}

/////////////////////////////////////////////// tests //////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::fetcher::testing::MapSource;
    use crate::model::testing::ScriptedModel;
    use crate::{PolicyCatalog, ResourceKind, TemplateCache, FALLBACK_EXPLANATION};

    const ACTIONS: &str = "- !host\n  id: repo-my-org-my-repo";
    const JWT: &str = "- !policy\n  id: conjur/authn-jwt/github";

    fn create_test_generator(model: ScriptedModel) -> PolicyGenerator<ScriptedModel, MapSource> {
        let source = MapSource::new(&[
            ("ci/github/actions.yml", ACTIONS),
            ("authn/authn-jwt-github.yml", JWT),
        ]);
        let fetcher = TemplateFetcher::new(
            Arc::new(PolicyCatalog::bundled()),
            source,
            Arc::new(TemplateCache::new()),
        );
        PolicyGenerator::new(model, fetcher)
    }

    fn generation_prompt(generator: &PolicyGenerator<ScriptedModel, MapSource>) -> Prompt {
        let prompts = generator.model.prompts();
        prompts[1].clone()
    }

    #[tokio::test]
    async fn relevant_examples_reach_the_context() {
        let ranking = r#"[
            {"category": "ci/github", "template_name": "actions",
             "relevance_score": 85, "reason": "GitHub Actions hosts"},
            {"category": "authn", "template_name": "authn-jwt-github",
             "relevance_score": 95, "reason": "JWT authenticator"},
            {"category": "cloud/aws", "template_name": "lambda",
             "relevance_score": 20, "reason": "not fetched"}
        ]"#;
        let model = ScriptedModel::new()
            .answer(ranking)
            .answer("```yaml\n- !policy\n  id: github\n```");
        let generator = create_test_generator(model);
        let generation = generator
            .generate("Set up GitHub Actions with JWT authentication", GENERAL_POLICY_TYPE)
            .await
            .unwrap();
        assert_eq!("- !policy\n  id: github", generation.policy.as_str());
        assert!(generation.well_formed);
        assert_eq!("ci/github", generation.classification.policy_type);
        assert_eq!(
            vec!["authn/authn-jwt-github", "ci/github/actions"],
            generation.examples.sources()
        );
        assert_eq!(2, generation.usage.model_calls);

        let prompt = generation_prompt(&generator);
        assert_eq!(0.7, prompt.temperature);
        assert!(prompt.user.starts_with(
            "The user has requested a policy for: Set up GitHub Actions with JWT authentication"
        ));
        assert!(prompt.user.contains(
            "Example authn/authn-jwt-github policy (relevance: 95%):\n\
             Reason for selection: JWT authenticator\n\
             ```yaml\n- !policy"
        ));
        assert!(prompt
            .user
            .contains("Example ci/github/actions policy (relevance: 85%)"));
        assert!(!prompt.user.contains("lambda"));
        assert!(prompt.system.unwrap().contains("conjur/authn-<type>/<service-id>"));
    }

    #[tokio::test]
    async fn selection_failure_uses_prefixed_fallback() {
        let model = ScriptedModel::new().answer("I could not decide.").answer("- !host ci");
        let generator = create_test_generator(model);
        let generation = generator
            .generate("a pipeline for github", GENERAL_POLICY_TYPE)
            .await
            .unwrap();
        assert_eq!("ci/github", generation.classification.policy_type);
        assert_eq!(
            ExampleSet::Fallback(vec![PREDEFINED_TEMPLATES[3]]),
            generation.examples
        );
        let prompt = generation_prompt(&generator);
        assert!(prompt
            .user
            .contains("Example ci/github/actions policy:\n```yaml\n- !policy"));
        assert!(!prompt.user.contains("relevance:"));
    }

    #[tokio::test]
    async fn unfetchable_examples_fall_back_to_generic() {
        let ranking =
            r#"[{"category": "web", "template_name": "conjur-oidc-demo", "relevance_score": 70}]"#;
        let model = ScriptedModel::new().answer(ranking).answer("- !user alice");
        let generator = create_test_generator(model);
        let generation = generator
            .generate("a user called alice", "database")
            .await
            .unwrap();
        assert_eq!("database", generation.classification.policy_type);
        assert_eq!(
            vec!["authn/authn-jwt-github", "authn/oidc/azure"],
            generation.examples.sources()
        );
    }

    #[tokio::test]
    async fn malformed_policy_is_still_returned() {
        let model = ScriptedModel::new()
            .fail("selector down")
            .answer("Here is your policy:\n- !user: [");
        let generator = create_test_generator(model);
        let generation = generator.generate("a user", GENERAL_POLICY_TYPE).await.unwrap();
        assert!(!generation.well_formed);
        assert_eq!("Here is your policy:\n- !user: [", generation.policy.as_str());
    }

    #[tokio::test]
    async fn generation_failure_is_an_error() {
        let model = ScriptedModel::new().answer("[]").fail("401 unauthorized");
        let generator = create_test_generator(model);
        let err = generator.generate("anything", GENERAL_POLICY_TYPE).await.unwrap_err();
        assert!(matches!(err, GenerationError::Model(_)));
        assert!(err.to_string().starts_with("Failed to generate policy"));
    }

    #[tokio::test]
    async fn respond_end_to_end() {
        let ranking = r#"[{"category": "ci/github", "template_name": "actions",
                           "relevance_score": 90, "reason": "actions"}]"#;
        let policy = "```yaml
- !policy
  id: github-actions
  body:
    - !group
    - !host repo
    - !grant
      role: !group
      member: !host repo
```";
        let model = ScriptedModel::new()
            .answer(ranking)
            .answer(policy)
            .fail("explanation model down");
        let generator = create_test_generator(model);
        let report = generator
            .respond(&PolicyRequest::new("Set up GitHub Actions with JWT authentication"))
            .await
            .unwrap();
        assert_eq!("ci/github", report.policy_type);
        assert_eq!(Some("actions".to_string()), report.template_hint);
        assert_eq!(FALLBACK_EXPLANATION, report.explanation);
        assert_eq!("policies/ci/github-actions.yml", report.suggested_path);
        assert_eq!(1, report.resources.get(ResourceKind::Policy));
        assert_eq!(2, report.resources.get(ResourceKind::Group));
        assert_eq!(2, report.resources.get(ResourceKind::Host));
        assert_eq!(1, report.resources.get(ResourceKind::Grant));
        assert!(!report.used_fallback);
        assert!(report.well_formed);
        assert_eq!(2, report.usage.model_calls);
    }

    #[test]
    fn render_omits_empty_reason() {
        let examples = ExampleSet::Relevant(vec![FetchedExample {
            path: "authn/authn-k8s".to_string(),
            content: "- !webservice".to_string(),
            relevance_score: t64(72.5),
            reason: String::new(),
        }]);
        assert_eq!(
            "\nExample authn/authn-k8s policy (relevance: 72.5%):\n```yaml\n- !webservice\n```\n",
            examples.render()
        );
    }
}
