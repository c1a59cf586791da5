/// Rules consulted in order; the first whose words appear in the request decides the path.
const PATH_RULES: &[(&[&str], &str)] = &[
    (&["github", "actions"], "policies/ci/github-actions.yml"),
    (&["aws"], "policies/cloud/aws.yml"),
    (&["azure"], "policies/cloud/azure.yml"),
    (&["authn", "authentication"], "policies/authn/authn.yml"),
    (&["jwt"], "policies/authn/authn-jwt.yml"),
];

/// Where policies land when no rule applies.
pub const GENERAL_POLICY_PATH: &str = "policies/general/policy.yml";

/// Suggest a repository path for the policy generated from `user_prompt`.
///
/// A non-empty `target_path` is returned unchanged.
pub fn suggest_path(user_prompt: &str, target_path: &str) -> String {
    if !target_path.is_empty() {
        return target_path.to_string();
    }
    let prompt = user_prompt.to_lowercase();
    PATH_RULES
        .iter()
        .find(|(words, _)| words.iter().any(|w| prompt.contains(w)))
        .map(|(_, path)| *path)
        .unwrap_or(GENERAL_POLICY_PATH)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn target_path_wins() {
        assert_eq!("conjur/app.yml", suggest_path("GitHub Actions", "conjur/app.yml"));
    }

    #[test]
    fn first_rule_wins() {
        assert_eq!(
            "policies/ci/github-actions.yml",
            suggest_path("GitHub Actions with JWT on AWS", "")
        );
        assert_eq!("policies/cloud/aws.yml", suggest_path("AWS authentication", ""));
        assert_eq!("policies/cloud/azure.yml", suggest_path("Azure DevOps", ""));
        assert_eq!("policies/authn/authn.yml", suggest_path("an authn-jwt service", ""));
        assert_eq!("policies/authn/authn-jwt.yml", suggest_path("a JWT issuer", ""));
    }

    #[test]
    fn general_otherwise() {
        assert_eq!(GENERAL_POLICY_PATH, suggest_path("a database password", ""));
    }
}
