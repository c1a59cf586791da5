//! Inputs and derived defaults for proposing a policy as a pull request.
//!
//! Nothing here talks to a forge.  A [`PullRequestPlan`] is everything needed to open the pull
//! request: where the file goes, on which branch, and with what messages.

use chrono::{Local, NaiveDateTime};

use crate::PullRequestError;

/// A caller's request to propose a policy.  Empty optional fields take derived defaults.
#[derive(Clone, Debug, Default, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct PullRequestRequest {
    /// `owner/repo` or `https://github.com/owner/repo`.
    pub repository: String,
    /// Destination of the policy inside the repository.
    pub file_path: String,
    /// The policy text.
    pub content: String,
    /// Branch to push to.
    #[serde(default)]
    pub branch: String,
    /// Commit message.
    #[serde(default)]
    pub commit_message: String,
    /// Pull request title.
    #[serde(default)]
    pub title: String,
    /// Pull request body.
    #[serde(default)]
    pub description: String,
}

/// A repository on GitHub.
#[derive(Clone, Debug, Eq, PartialEq, serde::Serialize)]
pub struct Repository {
    /// The owning user or organization.
    pub owner: String,
    /// The repository name.
    pub name: String,
}

impl Repository {
    /// Parse `owner/repo` or a `github.com` URL.
    pub fn parse(repository: &str) -> Result<Self, PullRequestError> {
        let invalid = || PullRequestError::InvalidRepository {
            repository: repository.to_string(),
        };
        if !repository.contains('/') {
            return Err(invalid());
        }
        let (owner, name) = if repository.contains("github.com") {
            let mut parts = repository.trim_end_matches('/').rsplit('/');
            let name = parts.next().ok_or_else(invalid)?;
            let owner = parts.next().ok_or_else(invalid)?;
            (owner, name)
        } else {
            let mut parts = repository.split('/');
            let owner = parts.next().ok_or_else(invalid)?;
            let name = parts.next().ok_or_else(invalid)?;
            (owner, name)
        };
        let name = name.strip_suffix(".git").unwrap_or(name);
        if owner.is_empty() || name.is_empty() || owner.ends_with("github.com") {
            return Err(invalid());
        }
        Ok(Self {
            owner: owner.to_string(),
            name: name.to_string(),
        })
    }
}

impl std::fmt::Display for Repository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

/// A fully-resolved pull request proposal.
#[derive(Clone, Debug, Eq, PartialEq, serde::Serialize)]
pub struct PullRequestPlan {
    /// Where the pull request goes.
    pub repository: Repository,
    /// Destination of the policy inside the repository.
    pub file_path: String,
    /// The policy text.
    pub content: String,
    /// Branch to push to.
    pub branch: String,
    /// Commit message.
    pub commit_message: String,
    /// Pull request title.
    pub title: String,
    /// Pull request body.
    pub description: String,
}

impl PullRequestPlan {
    /// Validate `request` and fill in defaults as of now.
    pub fn new(request: &PullRequestRequest) -> Result<Self, PullRequestError> {
        Self::at(request, Local::now().naive_local())
    }

    /// Validate `request` and fill in defaults as of `now`.
    pub fn at(request: &PullRequestRequest, now: NaiveDateTime) -> Result<Self, PullRequestError> {
        let mut missing = vec![];
        if request.repository.trim().is_empty() {
            missing.push("repository");
        }
        if request.file_path.trim().is_empty() {
            missing.push("file_path");
        }
        if request.content.trim().is_empty() {
            missing.push("content");
        }
        if !missing.is_empty() {
            return Err(PullRequestError::MissingParameters { missing });
        }
        let repository = Repository::parse(request.repository.trim())?;
        let file_path = request.file_path.trim();
        let stem = file_stem(file_path);
        let branch = non_empty_or(&request.branch, || {
            format!("policy-update-{stem}-{}", now.format("%Y%m%d%H%M%S"))
        });
        let commit_message = non_empty_or(&request.commit_message, || {
            format!("Add/Update Conjur policy: {file_path}")
        });
        let title = non_empty_or(&request.title, || {
            format!("Add/Update Conjur policy: {stem}")
        });
        let description = non_empty_or(&request.description, || {
            format!(
                "This PR adds or updates the Conjur policy file at `{file_path}`.\n\n\
                 Generated by policywright at {}",
                now.format("%Y-%m-%dT%H:%M:%S")
            )
        });
        tracing::info!(repository = %repository, branch = %branch, "planned pull request");
        Ok(Self {
            repository,
            file_path: file_path.to_string(),
            content: request.content.clone(),
            branch,
            commit_message,
            title,
            description,
        })
    }
}

/// The file name of `path` up to its first dot.
fn file_stem(path: &str) -> &str {
    let base = path.rsplit('/').next().unwrap_or(path);
    base.split('.').next().unwrap_or(base)
}

fn non_empty_or(value: &str, default: impl FnOnce() -> String) -> String {
    if value.trim().is_empty() {
        default()
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    fn noon() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 9)
            .unwrap()
            .and_hms_opt(12, 5, 7)
            .unwrap()
    }

    fn request() -> PullRequestRequest {
        PullRequestRequest {
            repository: "my-org/policies".to_string(),
            file_path: "policies/ci/github-actions.yml".to_string(),
            content: "- !policy\n  id: github".to_string(),
            ..PullRequestRequest::default()
        }
    }

    #[test]
    fn derives_defaults() {
        let plan = PullRequestPlan::at(&request(), noon()).unwrap();
        assert_eq!("my-org/policies", plan.repository.to_string());
        assert_eq!("policy-update-github-actions-20240309120507", plan.branch);
        assert_eq!(
            "Add/Update Conjur policy: policies/ci/github-actions.yml",
            plan.commit_message
        );
        assert_eq!("Add/Update Conjur policy: github-actions", plan.title);
        assert!(plan.description.starts_with(
            "This PR adds or updates the Conjur policy file at `policies/ci/github-actions.yml`."
        ));
        assert!(plan.description.ends_with("2024-03-09T12:05:07"));
    }

    #[test]
    fn caller_values_win() {
        let request = PullRequestRequest {
            branch: "my-branch".to_string(),
            commit_message: "custom".to_string(),
            ..request()
        };
        let plan = PullRequestPlan::at(&request, noon()).unwrap();
        assert_eq!("my-branch", plan.branch);
        assert_eq!("custom", plan.commit_message);
    }

    #[test]
    fn missing_parameters_are_all_named() {
        let request = PullRequestRequest {
            repository: "owner/repo".to_string(),
            ..PullRequestRequest::default()
        };
        assert_eq!(
            Err(PullRequestError::MissingParameters {
                missing: vec!["file_path", "content"]
            }),
            PullRequestPlan::at(&request, noon())
        );
    }

    #[test]
    fn repository_forms() {
        let expected = Repository {
            owner: "cyberark".to_string(),
            name: "conjur".to_string(),
        };
        assert_eq!(Ok(expected.clone()), Repository::parse("cyberark/conjur"));
        assert_eq!(
            Ok(expected.clone()),
            Repository::parse("https://github.com/cyberark/conjur/")
        );
        assert_eq!(
            Ok(expected),
            Repository::parse("https://github.com/cyberark/conjur.git")
        );
        assert!(Repository::parse("conjur").is_err());
        assert!(Repository::parse("/conjur").is_err());
        assert!(Repository::parse("https://github.com/").is_err());
    }
}
