//! Short markdown explanations of generated policies.
//!
//! Section detection is a keyword heuristic over blank-line-separated paragraphs.  It mislabels
//! paragraphs that happen to use another section's vocabulary, and that is accepted.

use crate::{PolicyDocument, Prompt, TextModel, Usage};

/// Returned whenever an explanation cannot be produced.
pub const FALLBACK_EXPLANATION: &str = "Unable to generate a detailed explanation for this \
    policy. Please review the policy content directly.";

/// The temperature used for explanations.
pub const EXPLANATION_TEMPERATURE: f32 = 0.5;

const EXPLAIN_POLICY_PROMPT: &str = include_str!("../prompts/explain-policy.md");

/// Headers synthesized for unheaded paragraphs, in priority order, with their trigger words.
const SECTION_KEYWORDS: &[(&str, &[&str])] = &[
    ("Key Resources", &["resource", "contain"]),
    ("Access Rules", &["access", "permission", "grant"]),
    ("Usage Notes", &["note", "implementation", "usage"]),
];

/// The prompt that asks for an explanation of `policy`.
pub fn explanation_prompt(policy: &PolicyDocument, user_prompt: &str, temperature: f32) -> Prompt {
    Prompt::new(
        format!(
            "```yaml\n{policy}\n```\n\n\
             The user requested: \"{user_prompt}\"\n\n\
             Explain this policy."
        ),
        temperature,
    )
    .with_system(EXPLAIN_POLICY_PROMPT)
}

/// Explain `policy` in at most a couple hundred words of markdown.
///
/// This never fails: a model error or an empty answer yields [`FALLBACK_EXPLANATION`].
pub async fn explain_policy<M: TextModel + ?Sized>(
    model: &M,
    policy: &PolicyDocument,
    user_prompt: &str,
    temperature: f32,
    usage: &mut Usage,
) -> String {
    tracing::info!("requesting policy explanation");
    let prompt = explanation_prompt(policy, user_prompt, temperature);
    let completion = match model.complete(&prompt).await {
        Ok(completion) => completion,
        Err(err) => {
            tracing::error!(error = %err, "explanation generation failed");
            return FALLBACK_EXPLANATION.to_string();
        }
    };
    usage.record_call(completion.usage);
    if unfence(&completion.text).trim().is_empty() {
        tracing::warn!("model returned an empty explanation");
        return FALLBACK_EXPLANATION.to_string();
    }
    format_explanation(&completion.text)
}

/// Unwrap a fenced answer and add section headers if it has none.
pub fn format_explanation(raw: &str) -> String {
    let explanation = unfence(raw);
    if explanation.lines().any(|line| line.trim().starts_with('#')) {
        return explanation;
    }
    let mut sections = explanation
        .split("\n\n")
        .map(str::to_string)
        .collect::<Vec<_>>();
    if let Some(first) = sections.first_mut() {
        if !first.trim().starts_with('#') {
            *first = format!("## Summary\n\n{first}");
        }
    }
    for section in sections.iter_mut().skip(1) {
        let trimmed = section.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let lower = trimmed.to_lowercase();
        let header = SECTION_KEYWORDS
            .iter()
            .find(|(_, words)| words.iter().any(|w| lower.contains(w)))
            .map(|(header, _)| *header);
        if let Some(header) = header {
            *section = format!("## {header}\n\n{trimmed}");
        }
    }
    sections.join("\n\n")
}

fn unfence(raw: &str) -> String {
    let trimmed = raw.trim();
    for label in ["```markdown", "```md"] {
        if let Some(rest) = trimmed.strip_prefix(label) {
            if let Some(end) = rest.find("```") {
                return rest[..end].trim().to_string();
            }
            return raw.to_string();
        }
    }
    if trimmed.len() >= 6 && trimmed.starts_with("```") && trimmed.ends_with("```") {
        let body = trimmed.split_once('\n').map(|(_, body)| body).unwrap_or("");
        return body.trim_end_matches("```").trim().to_string();
    }
    raw.to_string()
}

/////////////////////////////////////////////// tests //////////////////////////////////////////////
