//! A permissive structural check for generated policies.
//!
//! The check parses the text as YAML, accepting any tag.  Tags naming a [`ResourceKind`] are
//! tallied; any other tag is carried as opaque scalar, sequence or mapping data.  This is not a
//! grammar for policies and it never gates a response: callers log the outcome and move on.

use serde_yaml::Value;

use crate::{ResourceCounts, ResourceKind, ValidationError};

/// What the structural check saw in a well-formed policy.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct PolicySummary {
    /// Top-level entries in the policy.
    pub top_level: usize,
    /// Tagged nodes per recognized resource kind, at any depth.
    pub resources: ResourceCounts,
    /// Tags outside the recognized set, e.g. "delete", in order of first appearance.
    pub opaque_tags: Vec<String>,
}

/// Parse `policy` as YAML and summarize its tags.
///
/// An empty document is accepted with an empty summary.  A document whose top level is a
/// scalar or mapping is rejected, since a policy is a sequence of resources.
pub fn validate_policy(policy: &str) -> Result<PolicySummary, ValidationError> {
    let value: Value = serde_yaml::from_str(policy)?;
    let mut summary = PolicySummary::default();
    let top = match &value {
        Value::Null => return Ok(summary),
        Value::Sequence(items) => items,
        Value::Mapping(_) => return Err(ValidationError::NotASequence { found: "mapping" }),
        Value::Tagged(_) => {
            return Err(ValidationError::NotASequence {
                found: "tagged node",
            })
        }
        _ => return Err(ValidationError::NotASequence { found: "scalar" }),
    };
    summary.top_level = top.len();
    visit(&value, &mut summary);
    Ok(summary)
}

fn visit(value: &Value, summary: &mut PolicySummary) {
    match value {
        Value::Sequence(items) => {
            for item in items {
                visit(item, summary);
            }
        }
        Value::Mapping(mapping) => {
            for (key, value) in mapping {
                visit(key, summary);
                visit(value, summary);
            }
        }
        Value::Tagged(tagged) => {
            let tag = tagged.tag.to_string();
            let name = tag.trim_start_matches('!');
            match ResourceKind::from_name(name) {
                Some(kind) => summary.resources.record(kind),
                None => {
                    if !summary.opaque_tags.iter().any(|t| t == name) {
                        summary.opaque_tags.push(name.to_string());
                    }
                }
            }
            visit(&tagged.value, summary);
        }
        Value::Null | Value::Bool(_) | Value::Number(_) | Value::String(_) => {}
    }
}

/////////////////////////////////////////////// tests //////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flat_policy() {
        let summary = validate_policy(
            r#"- !user alice
- !group admins
- !grant
  role: !group admins
  member: !user alice
"#,
        )
        .unwrap();
        assert_eq!(3, summary.top_level);
        assert_eq!(2, summary.resources.get(ResourceKind::User));
        assert_eq!(2, summary.resources.get(ResourceKind::Group));
        assert_eq!(1, summary.resources.get(ResourceKind::Grant));
        assert!(summary.opaque_tags.is_empty());
    }

    #[test]
    fn nested_body_and_unknown_tags() {
        let summary = validate_policy(
            r#"- !policy
  id: conjur/authn-jwt/github
  body:
    - !webservice
    - !variable
      id: issuer
- !delete
  record: !variable old
"#,
        )
        .unwrap();
        assert_eq!(2, summary.top_level);
        assert_eq!(1, summary.resources.get(ResourceKind::Policy));
        assert_eq!(1, summary.resources.get(ResourceKind::Webservice));
        assert_eq!(2, summary.resources.get(ResourceKind::Variable));
        assert_eq!(vec!["delete".to_string()], summary.opaque_tags);
    }

    #[test]
    fn anchors_and_aliases() {
        let summary = validate_policy(
            r#"- &apps
  - !host app-1
  - !host app-2
- !layer
- !grant
  role: !layer
  members: *apps
"#,
        );
        assert!(summary.is_ok(), "{summary:?}");
    }

    #[test]
    fn empty_is_ok() {
        assert_eq!(PolicySummary::default(), validate_policy("").unwrap());
    }

    #[test]
    fn malformed_yaml() {
        assert!(matches!(
            validate_policy("- !policy\n  id: [unterminated"),
            Err(ValidationError::Yaml(_))
        ));
    }

    #[test]
    fn mapping_at_top_level() {
        assert!(matches!(
            validate_policy("id: something"),
            Err(ValidationError::NotASequence { found: "mapping" })
        ));
    }

    #[test]
    fn prose_is_not_a_policy() {
        assert!(matches!(
            validate_policy("Here is your policy"),
            Err(ValidationError::NotASequence { found: "scalar" })
        ));
    }
}
