//! Session tag assembly
//!
//! Tags are attached to the issued session so that the role's permission
//! policies (and CloudTrail) can see which repository, workflow and run the
//! credential belongs to.

use serde::Serialize;

use crate::error::{BrokerError, Result};
use crate::sanitize::sanitize_tag_value;
use crate::types::VerifiedIdentity;

pub const TAG_AUDIENCE: &str = "Audience";
pub const TAG_SUBJECT: &str = "Subject";
pub const TAG_GITHUB: &str = "GitHub";
pub const TAG_REPOSITORY: &str = "Repository";
pub const TAG_WORKFLOW: &str = "Workflow";
pub const TAG_RUN_ID: &str = "RunId";
pub const TAG_ACTOR: &str = "Actor";
pub const TAG_COMMIT: &str = "Commit";
pub const TAG_BRANCH: &str = "Branch";
pub const TAG_ENVIRONMENT: &str = "Environment";

/// Fixed marker value of the `GitHub` tag
pub const GITHUB_MARKER: &str = "Actions";

/// A single session tag; the value is always sanitized
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionTag {
    pub key: &'static str,
    pub value: String,
}

/// Ordered set of session tags
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SessionTagSet {
    tags: Vec<SessionTag>,
}

impl SessionTagSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a tag, sanitizing its value
    pub fn push(&mut self, key: &'static str, value: &str) {
        self.tags.push(SessionTag {
            key,
            value: sanitize_tag_value(value),
        });
    }

    fn push_if_present(&mut self, key: &'static str, value: &str) {
        if !value.is_empty() {
            self.push(key, value);
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.tags
            .iter()
            .find(|tag| tag.key == key)
            .map(|tag| tag.value.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &SessionTag> {
        self.tags.iter()
    }

    pub fn keys(&self) -> Vec<&'static str> {
        self.tags.iter().map(|tag| tag.key).collect()
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }
}

/// Repository and actor as they should appear to the role
///
/// Opaque node ids in node-id mode, verified names otherwise.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedNames {
    pub repository: String,
    pub actor: String,
    pub node_id_mode: bool,
}

/// Build the tag set for a verified identity
///
/// Signed claims contribute `Audience`, `Subject` and `Environment`, which
/// the self-declared path never produces.
pub fn build_session_tags(
    identity: &VerifiedIdentity,
    resolved: &ResolvedNames,
) -> Result<SessionTagSet> {
    let mut tags = SessionTagSet::new();

    match identity {
        VerifiedIdentity::IdToken(claims) => {
            let subject = if resolved.node_id_mode {
                replace_subject_repository(&claims.subject, &resolved.repository)?
            } else {
                claims.subject.clone()
            };

            tags.push(TAG_AUDIENCE, &claims.audience_value());
            tags.push(TAG_SUBJECT, &subject);
            tags.push(TAG_GITHUB, GITHUB_MARKER);
            tags.push(TAG_REPOSITORY, &resolved.repository);
            tags.push(TAG_WORKFLOW, &claims.workflow);
            tags.push(TAG_RUN_ID, &claims.run_id);
            tags.push(TAG_ACTOR, &resolved.actor);
            tags.push(TAG_COMMIT, &claims.sha);
            tags.push_if_present(TAG_BRANCH, &claims.git_ref);
            tags.push_if_present(TAG_ENVIRONMENT, &claims.environment);
        }
        VerifiedIdentity::AutomationToken(declared) => {
            tags.push(TAG_GITHUB, GITHUB_MARKER);
            tags.push(TAG_REPOSITORY, &resolved.repository);
            tags.push(TAG_WORKFLOW, &declared.workflow);
            tags.push(TAG_RUN_ID, &declared.run_id);
            tags.push(TAG_ACTOR, &resolved.actor);
            tags.push(TAG_COMMIT, &declared.sha);
            tags.push_if_present(TAG_BRANCH, &declared.branch);
        }
    }

    Ok(tags)
}

/// Swap the repository segment of `kind:repository:ref-descriptor`
fn replace_subject_repository(subject: &str, repository: &str) -> Result<String> {
    let segments: Vec<&str> = subject.splitn(3, ':').collect();
    if segments.len() != 3 {
        return Err(BrokerError::caller(format!(
            "invalid subject format: {:?}",
            subject
        )));
    }
    Ok(format!("{}:{}:{}", segments[0], repository, segments[2]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{DeclaredIdentity, IdTokenClaims};

    fn claims() -> IdTokenClaims {
        IdTokenClaims {
            issuer: "https://token.actions.githubusercontent.com".into(),
            subject: "repo:fuller-inc/actions-aws-assume-role:ref:refs/heads/main".into(),
            audience: vec!["https://github.com/fuller-inc/actions-aws-assume-role".into()],
            repository: "fuller-inc/actions-aws-assume-role".into(),
            actor: "fuller-inc".into(),
            workflow: "test".into(),
            run_id: "1234567890".into(),
            sha: "e3a45c6c16c1464826b36a598ff39e6cc98c4da4".into(),
            git_ref: "refs/heads/main".into(),
            ..Default::default()
        }
    }

    #[test]
    fn test_id_token_tags() {
        let identity = VerifiedIdentity::IdToken(claims());
        let resolved = ResolvedNames {
            repository: "fuller-inc/actions-aws-assume-role".into(),
            actor: "fuller-inc".into(),
            node_id_mode: false,
        };

        let tags = build_session_tags(&identity, &resolved).unwrap();
        assert_eq!(
            tags.keys(),
            vec![
                TAG_AUDIENCE,
                TAG_SUBJECT,
                TAG_GITHUB,
                TAG_REPOSITORY,
                TAG_WORKFLOW,
                TAG_RUN_ID,
                TAG_ACTOR,
                TAG_COMMIT,
                TAG_BRANCH
            ]
        );
        assert_eq!(tags.get(TAG_GITHUB), Some("Actions"));
        assert_eq!(
            tags.get(TAG_SUBJECT),
            Some("repo:fuller-inc/actions-aws-assume-role:ref:refs/heads/main")
        );
        assert_eq!(tags.get(TAG_ENVIRONMENT), None);
    }

    #[test]
    fn test_node_id_mode_rewrites_subject() {
        let mut claims = claims();
        claims.environment = "production".into();
        let identity = VerifiedIdentity::IdToken(claims);
        let resolved = ResolvedNames {
            repository: "R_kgDOFMsDjw".into(),
            actor: "U_kgDOABGo4A".into(),
            node_id_mode: true,
        };

        let tags = build_session_tags(&identity, &resolved).unwrap();
        assert_eq!(tags.get(TAG_SUBJECT), Some("repo:R_kgDOFMsDjw:ref:refs/heads/main"));
        assert_eq!(tags.get(TAG_REPOSITORY), Some("R_kgDOFMsDjw"));
        assert_eq!(tags.get(TAG_ACTOR), Some("U_kgDOABGo4A"));
        assert_eq!(tags.get(TAG_ENVIRONMENT), Some("production"));
    }

    #[test]
    fn test_malformed_subject_rejected_in_node_id_mode() {
        let mut claims = claims();
        claims.subject = "repo-only".into();
        let identity = VerifiedIdentity::IdToken(claims);
        let resolved = ResolvedNames {
            repository: "R_kgDOFMsDjw".into(),
            actor: "U_kgDOABGo4A".into(),
            node_id_mode: true,
        };

        let err = build_session_tags(&identity, &resolved).unwrap_err();
        assert!(err.is_caller_caused());
        assert!(err.message().starts_with("invalid subject format"));
    }

    #[test]
    fn test_declared_identity_tags() {
        let identity = VerifiedIdentity::AutomationToken(DeclaredIdentity {
            repository: "octo/hello".into(),
            actor: "octocat".into(),
            workflow: "CI / build (push)".into(),
            run_id: "42".into(),
            sha: "deadbeef".into(),
            branch: String::new(),
        });
        let resolved = ResolvedNames {
            repository: "octo/hello".into(),
            actor: "octocat".into(),
            node_id_mode: false,
        };

        let tags = build_session_tags(&identity, &resolved).unwrap();
        assert_eq!(
            tags.keys(),
            vec![TAG_GITHUB, TAG_REPOSITORY, TAG_WORKFLOW, TAG_RUN_ID, TAG_ACTOR, TAG_COMMIT]
        );
        assert_eq!(tags.get(TAG_WORKFLOW), Some("CI / build _push_"));
        assert_eq!(tags.get(TAG_AUDIENCE), None);
    }

    #[test]
    fn test_non_latin_workflow_keeps_letters_only() {
        let mut claims = claims();
        claims.workflow = "परीक्षण\tci".into();
        claims.git_ref = "refs/heads/सुधार".into();
        let identity = VerifiedIdentity::IdToken(claims);
        let resolved = ResolvedNames {
            repository: "fuller-inc/actions-aws-assume-role".into(),
            actor: "fuller-inc".into(),
            node_id_mode: false,
        };

        let tags = build_session_tags(&identity, &resolved).unwrap();
        // vowel signs and virama are marks, not letters
        assert_eq!(tags.get(TAG_WORKFLOW), Some("पर_क_षण_ci"));
        assert_eq!(tags.get(TAG_BRANCH), Some("refs/heads/स_ध_र"));
    }
}
