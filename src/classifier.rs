//! Cheap, local refinement of the policy type from the words of a request.
//!
//! Matching is plain substring containment on the lower-cased request.  The longest matching
//! phrase wins; among phrases of equal length the one declared first in the table wins.  There is
//! no word-boundary check, so "iam" matches inside "william".

/// The policy type used when the caller has no better idea.
pub const GENERAL_POLICY_TYPE: &str = "general";

/// Phrase → (category, template file) in declaration order.
const KEYWORDS: &[(&str, &str, &str)] = &[
    // authenticators
    ("oidc", "authn", "authn-oidc-webapp.yml"),
    ("openid", "authn", "authn-oidc-webapp.yml"),
    ("azure ad", "authn", "authn-azure.yml"),
    ("azure authentication", "authn", "authn-azure.yml"),
    ("gcp authentication", "authn", "authn-gcp.yml"),
    ("iam", "authn", "authn-iam-prod.yml"),
    ("k8s authentication", "authn", "authn-k8s.yml"),
    // JWT authenticators
    ("github jwt", "authn", "authn-jwt-github.yml"),
    ("github authentication", "authn", "authn-jwt-github.yml"),
    ("gitlab jwt", "authn", "authn-jwt-gitlab.yml"),
    ("jenkins jwt", "authn", "authn-jwt-jenkins.yml"),
    // CI
    ("github actions", "ci/github", "actions.yml"),
    ("github", "ci/github", "github.yml"),
    ("gitlab", "ci/gitlab", "gitlab.yml"),
    ("jenkins", "ci/jenkins", "jenkins.yml"),
    // cloud
    ("aws", "cloud/aws", "aws.yml"),
    ("ec2", "cloud/aws", "ec2.yml"),
    ("ecs", "cloud/aws", "ecs.yml"),
    ("lambda", "cloud/aws", "lambda.yml"),
    ("azure", "cloud/azure", "azure.yml"),
    ("azure devops", "cloud/azure", "devops.yml"),
    ("azure function", "cloud/azure", "function.yml"),
    ("gcp", "cloud/gcp", "gcp.yml"),
    ("google compute", "cloud/gcp", "compute.yml"),
    ("google function", "cloud/gcp", "function.yml"),
    // CD
    ("ansible", "cd/ansible", "ansible.yml"),
    ("kubernetes", "cd/kubernetes", "kubernetes.yml"),
    ("k8s", "cd/kubernetes", "kubernetes.yml"),
    ("terraform", "cd/terraform", "terraform.yml"),
    // web applications
    ("web application", "web", "conjur-oidc-demo.yml"),
    ("web app", "web", "conjur-oidc-demo.yml"),
];

/// Broad vocabulary consulted only when no phrase matched, in priority order.
const DOMAINS: &[(&[&str], &str)] = &[
    (&["authentication", "auth"], "authn"),
    (&["ci", "continuous integration"], "ci"),
    (&["cd", "continuous delivery", "deployment"], "cd"),
    (&["cloud"], "cloud"),
];

/////////////////////////////////////////// Classification /////////////////////////////////////////

/// The outcome of classifying a request.
#[derive(Clone, Debug, Eq, PartialEq, serde::Serialize)]
pub struct Classification {
    /// The refined policy type, e.g. "ci/github".
    pub policy_type: String,
    /// The template implied by the matching phrase, without extension.
    pub template: Option<String>,
    /// The phrase that decided the classification.
    pub matched: Option<String>,
}

///////////////////////////////////////// KeywordClassifier ////////////////////////////////////////

/// Maps request text to a (category, template) pair using a fixed, ordered phrase table.
#[derive(Clone, Debug)]
pub struct KeywordClassifier {
    keywords: Vec<(String, String, String)>,
    domains: Vec<(Vec<String>, String)>,
}

impl KeywordClassifier {
    /// A classifier over the given tables.
    ///
    /// `keywords` holds `(phrase, category, template file)`; `domains` holds the broad words
    /// that select only a category.  Phrases are expected to be lower case.
    pub fn new(
        keywords: Vec<(String, String, String)>,
        domains: Vec<(Vec<String>, String)>,
    ) -> Self {
        Self { keywords, domains }
    }

    /// Classify `request`, starting from `default_policy_type`.
    ///
    /// The broad secondary pass only runs when the default is [`GENERAL_POLICY_TYPE`]; a caller
    /// that already supplied a specific type keeps it unless a phrase matches.
    pub fn classify(&self, request: &str, default_policy_type: &str) -> Classification {
        let request = request.to_lowercase();
        let mut best: Option<&(String, String, String)> = None;
        for entry in self.keywords.iter() {
            let phrase = &entry.0;
            if request.contains(phrase.as_str())
                && best.map_or(true, |(b, _, _)| phrase.len() > b.len())
            {
                tracing::debug!(phrase = %phrase, category = %entry.1, "keyword match");
                best = Some(entry);
            }
        }
        if let Some((phrase, category, template)) = best {
            let template = template
                .strip_suffix(".yml")
                .unwrap_or(template)
                .to_string();
            tracing::info!(policy_type = %category, template = %template, "detected policy type");
            return Classification {
                policy_type: category.clone(),
                template: Some(template),
                matched: Some(phrase.clone()),
            };
        }
        if default_policy_type == GENERAL_POLICY_TYPE {
            for (words, category) in self.domains.iter() {
                if let Some(word) = words.iter().find(|w| request.contains(w.as_str())) {
                    tracing::info!(
                        policy_type = %category,
                        word = %word,
                        "detected general request"
                    );
                    return Classification {
                        policy_type: category.clone(),
                        template: None,
                        matched: Some(word.clone()),
                    };
                }
            }
        }
        Classification {
            policy_type: default_policy_type.to_string(),
            template: None,
            matched: None,
        }
    }
}

impl Default for KeywordClassifier {
    fn default() -> Self {
        Self::new(
            KEYWORDS
                .iter()
                .map(|(p, c, t)| (p.to_string(), c.to_string(), t.to_string()))
                .collect(),
            DOMAINS
                .iter()
                .map(|(words, c)| (words.iter().map(|w| w.to_string()).collect(), c.to_string()))
                .collect(),
        )
    }
}

/////////////////////////////////////////////// tests //////////////////////////////////////////////
