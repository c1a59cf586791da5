use crate::{PolicyDocument, ResourceCounts, Usage};

/// The result of serving one policy request.
///
/// A report always carries a policy.  `well_formed` records whether that policy passed the
/// structural check, and `used_fallback` whether the model saw predefined templates instead of
/// catalog examples it ranked itself.
#[derive(Clone, Debug, serde::Serialize)]
pub struct PolicyReport {
    /// The generated policy.
    pub policy: PolicyDocument,
    /// A short markdown explanation of the policy.
    pub explanation: String,
    /// Resource counts for every kind, zeroes included.
    pub resources: ResourceCounts,
    /// Where the policy should be stored.
    pub suggested_path: String,
    /// The refined policy type.
    pub policy_type: String,
    /// The template implied by the request's wording, if any.
    pub template_hint: Option<String>,
    /// The examples placed in the generation context.
    pub examples: Vec<String>,
    /// Whether the examples were predefined templates.
    pub used_fallback: bool,
    /// Whether the policy passed the structural check.
    pub well_formed: bool,
    /// Model usage for the whole request.
    pub usage: Usage,
}

impl std::fmt::Display for PolicyReport {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        writeln!(f, "# {}", self.suggested_path)?;
        writeln!(f, "# policy type: {}", self.policy_type)?;
        if !self.examples.is_empty() {
            let kind = if self.used_fallback {
                "predefined"
            } else {
                "relevant"
            };
            writeln!(f, "# {kind} examples: {}", self.examples.join(", "))?;
        }
        if !self.well_formed {
            writeln!(f, "# warning: the policy did not pass the structural check")?;
        }
        writeln!(f, "{}", self.policy)?;
        writeln!(f)?;
        writeln!(f, "{}", self.explanation)?;
        writeln!(f)?;
        let counts = self
            .resources
            .iter()
            .filter(|(_, count)| *count > 0)
            .map(|(kind, count)| format!("{kind}: {count}"))
            .collect::<Vec<_>>();
        if counts.is_empty() {
            writeln!(f, "resources: none")
        } else {
            writeln!(f, "resources: {}", counts.join(", "))
        }
    }
}
