use crate::{analyze_resources, validate_policy, PolicySummary, ResourceCounts, ValidationError};

/// A generated policy: the model's answer with code fences and surrounding whitespace removed.
///
/// The text is not guaranteed to be well-formed; see [`PolicyDocument::validate`].
#[derive(Clone, Debug, Default, Eq, PartialEq, serde::Serialize)]
#[serde(transparent)]
pub struct PolicyDocument(String);

impl PolicyDocument {
    /// Normalize raw model output into a policy document.
    ///
    /// Surrounding whitespace is trimmed.  A leading code fence, with or without a language tag,
    /// and a trailing code fence are each removed when present, and the result is trimmed again.
    pub fn from_model_output(raw: &str) -> Self {
        let mut text = raw.trim();
        if let Some(rest) = text.strip_prefix("```") {
            let (first, remainder) = rest.split_once('\n').unwrap_or((rest, ""));
            let is_tag = first
                .trim()
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '+');
            text = if is_tag { remainder } else { rest };
        }
        if let Some(rest) = text.strip_suffix("```") {
            text = rest;
        }
        Self(text.trim().to_string())
    }

    /// The policy text.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume the document, returning its text.
    pub fn into_string(self) -> String {
        self.0
    }

    /// Run the permissive structural check.
    pub fn validate(&self) -> Result<PolicySummary, ValidationError> {
        validate_policy(&self.0)
    }

    /// Count resource tags line by line.
    pub fn resources(&self) -> ResourceCounts {
        analyze_resources(&self.0)
    }
}

impl From<String> for PolicyDocument {
    fn from(text: String) -> Self {
        Self(text)
    }
}

impl AsRef<str> for PolicyDocument {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for PolicyDocument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_yaml_fence() {
        let doc = PolicyDocument::from_model_output("```yaml\n- !policy\n  id: x\n```");
        assert_eq!("- !policy\n  id: x", doc.as_str());
    }

    #[test]
    fn strips_bare_fence_and_whitespace() {
        let doc = PolicyDocument::from_model_output("\n\n```\n\n- !user alice\n\n```\n  ");
        assert_eq!("- !user alice", doc.as_str());
    }

    #[test]
    fn strips_other_language_tags() {
        let doc = PolicyDocument::from_model_output("```yml\n- !host app\n```");
        assert_eq!("- !host app", doc.as_str());
    }

    #[test]
    fn tag_with_trailing_space() {
        let doc = PolicyDocument::from_model_output("```yaml \n- !policy\n  id: x\n```");
        assert_eq!("- !policy\n  id: x", doc.as_str());
    }

    #[test]
    fn crlf_line_endings() {
        let doc = PolicyDocument::from_model_output("```yaml\r\n- !policy\r\n  id: x\r\n```");
        assert_eq!("- !policy\r\n  id: x", doc.as_str());
    }

    #[test]
    fn trailing_fence_only() {
        let doc = PolicyDocument::from_model_output("- !group admins\n```");
        assert_eq!("- !group admins", doc.as_str());
    }

    #[test]
    fn leading_fence_only() {
        let doc = PolicyDocument::from_model_output("```yaml\n- !group admins");
        assert_eq!("- !group admins", doc.as_str());
    }

    #[test]
    fn fence_on_the_same_line() {
        let doc = PolicyDocument::from_model_output("```- !variable db/password```");
        assert_eq!("- !variable db/password", doc.as_str());
    }

    #[test]
    fn untouched_when_unfenced() {
        let doc = PolicyDocument::from_model_output("- !policy\n  id: app\n");
        assert_eq!("- !policy\n  id: app", doc.as_str());
        assert!(doc.validate().is_ok());
        assert_eq!(1, doc.resources().total());
    }
}
