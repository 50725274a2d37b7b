//! Registry reference grammar: `[registry/]repository[:tag][@digest]`.

use specular_core::{ErrorKind, Result, SpecularError};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    pub registry: String,
    pub repository: String,
    pub tag: Option<String>,
    pub digest: Option<String>,
}

impl Reference {
    pub fn parse(raw: &str) -> Result<Self> {
        if raw.trim().is_empty() {
            return Err(SpecularError::new(ErrorKind::InvalidReference, "reference is empty"));
        }

        let (without_digest, digest) = match raw.split_once('@') {
            Some((head, digest)) => {
                if !digest.starts_with("sha256:") || digest.len() != "sha256:".len() + 64 {
                    return Err(SpecularError::new(
                        ErrorKind::InvalidReference,
                        format!("reference '{raw}' has a malformed digest"),
                    ));
                }
                (head, Some(digest.to_string()))
            }
            None => (raw, None),
        };

        let first_slash = without_digest.find('/');
        let looks_like_registry = first_slash
            .map(|i| without_digest[..i].contains('.') || without_digest[..i].contains(':') || without_digest[..i] == "localhost")
            .unwrap_or(false);

        let (registry, rest) = if looks_like_registry {
            let i = first_slash.unwrap();
            (without_digest[..i].to_string(), &without_digest[i + 1..])
        } else {
            ("docker.io".to_string(), without_digest)
        };

        let (repository, tag) = match rest.rsplit_once(':') {
            Some((repo, tag)) if !repo.is_empty() && !tag.contains('/') => (repo.to_string(), Some(tag.to_string())),
            _ => (rest.to_string(), None),
        };

        if repository.is_empty() {
            return Err(SpecularError::new(
                ErrorKind::InvalidReference,
                format!("reference '{raw}' has no repository component"),
            ));
        }

        Ok(Self {
            registry,
            repository,
            tag,
            digest,
        })
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.registry, self.repository)?;
        if let Some(tag) = &self.tag {
            write!(f, ":{tag}")?;
        }
        if let Some(digest) = &self.digest {
            write!(f, "@{digest}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_registry_repo_and_tag() {
        let r = Reference::parse("ghcr.io/acme/demo:1.0.0").unwrap();
        assert_eq!(r.registry, "ghcr.io");
        assert_eq!(r.repository, "acme/demo");
        assert_eq!(r.tag.as_deref(), Some("1.0.0"));
    }

    #[test]
    fn defaults_to_docker_io_without_a_registry_component() {
        let r = Reference::parse("acme/demo:latest").unwrap();
        assert_eq!(r.registry, "docker.io");
        assert_eq!(r.repository, "acme/demo");
    }

    #[test]
    fn parses_digest_reference() {
        let digest = format!("sha256:{}", "a".repeat(64));
        let r = Reference::parse(&format!("ghcr.io/acme/demo@{digest}")).unwrap();
        assert_eq!(r.digest.as_deref(), Some(digest.as_str()));
        assert!(r.tag.is_none());
    }

    #[test]
    fn rejects_empty_reference() {
        assert!(Reference::parse("").is_err());
    }

    #[test]
    fn rejects_malformed_digest() {
        assert!(Reference::parse("acme/demo@sha256:not-hex").is_err());
    }
}
