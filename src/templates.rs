//! Predefined example policies used when no relevant example could be fetched.

/// A built-in example policy keyed by `category/template`.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct PredefinedTemplate {
    /// The key, e.g. "ci/github/actions".
    pub key: &'static str,
    /// The policy text.
    pub content: &'static str,
}

/// The predefined templates in table order.
pub const PREDEFINED_TEMPLATES: &[PredefinedTemplate] = &[
    PredefinedTemplate {
        key: "authn/authn-jwt-github",
        content: r#"- !policy
  id: conjur/authn-jwt/github
  body:
    - !webservice

    - !variable
      id: jwks-uri

    - !variable
      id: token-app-property

    - !variable
      id: identity-path

    - !variable
      id: issuer

    - !group hosts

    - !permit
      role: !group hosts
      privilege: [ read, authenticate ]
      resource: !webservice"#,
    },
    PredefinedTemplate {
        key: "authn/oidc/azure",
        content: r#"- !policy
  id: conjur/authn-oidc/azure
  body:
    - !webservice

    - !variable
      id: provider-uri

    - !variable
      id: client-id

    - !variable
      id: client-secret

    - !group hosts

    - !permit
      role: !group hosts
      privilege: [ read, authenticate ]
      resource: !webservice"#,
    },
    PredefinedTemplate {
        key: "cloud/aws/aws",
        content: r#"- !policy
  id: aws
  body:
    - !group admins

    - !variable
      id: access_key_id
      annotations:
        description: AWS Access Key ID

    - !variable
      id: secret_access_key
      annotations:
        description: AWS Secret Access Key

    - !variable
      id: region
      annotations:
        description: AWS Region"#,
    },
    PredefinedTemplate {
        key: "ci/github/actions",
        content: r#"- !policy
  id: github-actions
  owner: !group admins
  annotations:
    description: GitHub Actions resources and secret variables
  body:
    # Group of hosts that can authenticate using this JWT Authenticator
    - !group
      annotations:
        description: Group of GitHub Actions hosts that can authenticate

    # Collection of hosts that can authenticate
    - &hosts
      - !host
        id: repo-my-org-my-repo
        annotations:
          description: GitHub Actions for my-org/my-repo
          authn-jwt/github/repository: my-org/my-repo
          authn-jwt/github/workflow_ref: refs/heads/main
          authn-jwt/github/repository_owner: org-name

    # Grant all hosts in collection above to be members of github-actions group
    - !grant
      role: !group
      members: *hosts"#,
    },
];

/// The number of templates used when nothing more specific applies.
const GENERIC_FALLBACK_COUNT: usize = 2;

/// Pick fallback examples for `policy_type` from `templates`.
///
/// Exactly one tier fires, the first that yields anything:
/// 1. the template keyed exactly by `policy_type`;
/// 2. the first template keyed `policy_type/...`;
/// 3. the first two templates in table order.
pub fn fallback_examples<'a>(
    templates: &'a [PredefinedTemplate],
    policy_type: &str,
) -> Vec<&'a PredefinedTemplate> {
    if let Some(exact) = templates.iter().find(|t| t.key == policy_type) {
        tracing::info!(key = exact.key, "using predefined template");
        return vec![exact];
    }
    let prefix = format!("{policy_type}/");
    if let Some(nested) = templates.iter().find(|t| t.key.starts_with(&prefix)) {
        tracing::info!(key = nested.key, policy_type = %policy_type, "using predefined template");
        return vec![nested];
    }
    tracing::warn!(policy_type = %policy_type, "no predefined template; using general examples");
    templates.iter().take(GENERIC_FALLBACK_COUNT).collect()
}

/////////////////////////////////////////////// tests //////////////////////////////////////////////
