//! External id derivation
//!
//! The external id is what the target role's trust policy must match via
//! `sts:ExternalId`. It binds the role to one repository, so a caller that
//! merely knows the role ARN cannot use the broker to assume it (confused
//! deputy).

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;

use crate::error::{BrokerError, Result};

/// Prefix marking a hashed repository name
pub const SHA256_PREFIX: &str = "sha256:";

/// Repository full name split into owner and name
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RepositoryName {
    pub owner: String,
    pub name: String,
}

impl RepositoryName {
    /// Split "owner/repo" at the first slash
    pub fn parse(full_name: &str) -> Result<Self> {
        let (owner, name) = full_name.split_once('/').ok_or_else(|| {
            BrokerError::caller(format!("invalid repository name: {}", full_name))
        })?;

        Ok(Self {
            owner: owner.to_string(),
            name: name.to_string(),
        })
    }

    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }
}

impl fmt::Display for RepositoryName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

/// How the repository name is presented as an external id
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObfuscationMode {
    /// Raw "owner/repo"
    #[default]
    Plain,
    /// "sha256:" followed by the hex digest of "owner/repo"
    Sha256,
}

impl FromStr for ObfuscationMode {
    type Err = BrokerError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "" => Ok(ObfuscationMode::Plain),
            "sha256" => Ok(ObfuscationMode::Sha256),
            other => Err(BrokerError::caller(format!(
                "invalid obfuscate repository type: {}",
                other
            ))),
        }
    }
}

/// The string sent as the role-assumption external id
///
/// Never empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ExternalIdentity(String);

impl ExternalIdentity {
    /// Derive the external id
    ///
    /// Priority: a resolved repository node id (opaque-identifier mode), then
    /// the obfuscation mode applied to `repository`.
    ///
    /// # Arguments
    /// * `repository` - verified "owner/repo"
    /// * `repository_node_id` - set only in opaque-identifier mode
    /// * `obfuscation` - the raw request value ("" or "sha256")
    pub fn derive(
        repository: &str,
        repository_node_id: Option<&str>,
        obfuscation: &str,
    ) -> Result<Self> {
        let value = match repository_node_id {
            Some(node_id) => node_id.to_string(),
            None => match obfuscation.parse::<ObfuscationMode>()? {
                ObfuscationMode::Plain => repository.to_string(),
                ObfuscationMode::Sha256 => sha256_external_id(repository),
            },
        };

        if value.is_empty() {
            return Err(BrokerError::internal("derived an empty external id"));
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ExternalIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// "sha256:" + lowercase hex SHA-256 of the UTF-8 bytes of `repository`
pub fn sha256_external_id(repository: &str) -> String {
    let digest = Sha256::digest(repository.as_bytes());
    format!("{}{}", SHA256_PREFIX, hex::encode(digest))
}

#[cfg(test)]
mod tests {
    use super::*;

    const REPO: &str = "fuller-inc/actions-aws-assume-role";

    #[test]
    fn test_plain_external_id() {
        let id = ExternalIdentity::derive(REPO, None, "").unwrap();
        assert_eq!(id.as_str(), REPO);
    }

    #[test]
    fn test_sha256_external_id() {
        let id = ExternalIdentity::derive(REPO, None, "sha256").unwrap();
        assert_eq!(
            id.as_str(),
            "sha256:339c2238399e1150eb8d76a7a74cfd92448d347dc4212bad33a4978edfc455e0"
        );
        assert_eq!(id.as_str().len(), SHA256_PREFIX.len() + 64);
    }

    #[test]
    fn test_node_id_takes_priority() {
        // the obfuscation value is not even looked at
        let id = ExternalIdentity::derive(REPO, Some("R_kgDOFMsDjw"), "bogus").unwrap();
        assert_eq!(id.as_str(), "R_kgDOFMsDjw");
    }

    #[test]
    fn test_unknown_obfuscation_rejected() {
        let err = ExternalIdentity::derive(REPO, None, "md5").unwrap_err();
        assert_eq!(err, BrokerError::caller("invalid obfuscate repository type: md5"));
    }

    #[test]
    fn test_empty_node_id_is_internal() {
        let err = ExternalIdentity::derive(REPO, Some(""), "").unwrap_err();
        assert!(!err.is_caller_caused());
    }

    #[test]
    fn test_repository_name_parse() {
        let name = RepositoryName::parse(REPO).unwrap();
        assert_eq!(name.owner, "fuller-inc");
        assert_eq!(name.name, "actions-aws-assume-role");
        assert_eq!(name.full_name(), REPO);

        let err = RepositoryName::parse("no-slash").unwrap_err();
        assert_eq!(err.message(), "invalid repository name: no-slash");
    }
}
