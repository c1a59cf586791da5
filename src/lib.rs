#![warn(missing_docs)]

//! Policywright: turns natural-language requests into Conjur access-control policies.
//!
//! A request is classified by keyword, matched against a catalog of real-world policy examples
//! ranked by a generative model, and answered by the same model with the best examples in its
//! context.  The resulting policy is explained, its resources counted, and a repository path
//! suggested.
//!
//! # Core Concepts
//!
//! - **KeywordClassifier**: Refines a policy type from the words of a request
//! - **PolicyCatalog**: The hierarchy of example templates available for reference
//! - **RelevanceSelector**: Asks the model which catalog examples fit a request
//! - **TemplateFetcher**: Reads example templates through a shared cache
//! - **PolicyGenerator**: Runs the whole pipeline with a fallback chain of examples
//! - **PolicyReport**: The policy, its explanation, resource counts and suggested path
//!
//! # Example
//!
//! ```
//! use policywright::{suggest_path, KeywordClassifier, GENERAL_POLICY_TYPE};
//!
//! let request = "Set up GitHub Actions with JWT authentication";
//! let classification = KeywordClassifier::default().classify(request, GENERAL_POLICY_TYPE);
//! assert_eq!("ci/github", classification.policy_type);
//! assert_eq!(Some("actions".to_string()), classification.template);
//! assert_eq!("policies/ci/github-actions.yml", suggest_path(request, ""));
//! ```

use std::cmp::Ordering;

mod cache;
mod catalog;
mod classifier;
mod document;
mod errors;
mod explanation;
mod fetcher;
mod generator;
mod model;
mod pull_request;
mod report;
mod resources;
mod selector;
mod suggest;
mod templates;
mod usage;
mod validation;

pub use cache::TemplateCache;
pub use catalog::{CatalogEntry, CatalogNode, PolicyCatalog};
pub use classifier::{Classification, KeywordClassifier, GENERAL_POLICY_TYPE};
pub use document::PolicyDocument;
pub use errors::{CatalogError, GenerationError, PullRequestError, ValidationError};
pub use explanation::{
    explain_policy, explanation_prompt, format_explanation, EXPLANATION_TEMPERATURE,
    FALLBACK_EXPLANATION,
};
pub use fetcher::{
    HttpTemplateSource, TemplateFetcher, TemplateSource, DEFAULT_TEMPLATE_BASE_URL,
    TEMPLATE_FETCH_TIMEOUT,
};
pub use generator::{
    ExampleSet, FetchedExample, Generation, GenerationRequest, GeneratorOptions, PolicyGenerator,
    PolicyRequest,
};
pub use model::{AnthropicModel, Completion, ModelConfig, Prompt, TextModel};
pub use pull_request::{PullRequestPlan, PullRequestRequest, Repository};
pub use report::PolicyReport;
pub use resources::{analyze_resources, ResourceCounts, ResourceKind};
pub use selector::{
    parse_candidates, ExampleCandidate, RelevanceSelector, DEFAULT_MAX_EXAMPLES,
    SELECTION_TEMPERATURE,
};
pub use suggest::{suggest_path, GENERAL_POLICY_PATH};
pub use templates::{fallback_examples, PredefinedTemplate, PREDEFINED_TEMPLATES};
pub use usage::Usage;
pub use validation::{validate_policy, PolicySummary};

//////////////////////////////////////////////// t64 ///////////////////////////////////////////////

/// A totally-ordered 64-bit floating point number.
///
/// This type implements `Ord` and `Eq` for f64 values by using total ordering,
/// which means NaN values are considered equal to themselves and greater than
/// all other values, including positive infinity.
#[derive(Clone, Copy, Debug, Default, serde::Deserialize, serde::Serialize)]
#[allow(non_camel_case_types)]
#[repr(transparent)]
pub struct t64(pub f64);

impl Eq for t64 {}

impl PartialEq for t64 {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other).is_eq()
    }
}

impl Ord for t64 {
    fn cmp(&self, other: &Self) -> Ordering {
        f64::total_cmp(&self.0, &other.0)
    }
}

impl PartialOrd for t64 {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/////////////////////////////////////////////// tests //////////////////////////////////////////////
