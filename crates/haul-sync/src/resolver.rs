//! Version resolution: a consumer reference becomes a concrete archive URL.

use std::sync::Arc;

use crate::error::{Result, SyncError};
use crate::http::Fetcher;
use crate::manifest::{TargetReference, VersionManifest};

/// Resolves a [`TargetReference`] against the target's published version
/// manifest.
pub struct Resolver {
    fetcher: Arc<dyn Fetcher>,
}

impl Resolver {
    pub fn new(fetcher: Arc<dyn Fetcher>) -> Self {
        Self { fetcher }
    }

    /// Fetch the target's version manifest and look up the requested
    /// version.
    ///
    /// The manifest is consulted over the network on every call. A stale
    /// local copy could point at an archive URL the publisher has already
    /// replaced, so nothing is cached.
    pub async fn resolve(&self, target: &TargetReference) -> Result<String> {
        log::debug!(
            "resolving {} {} via {}",
            target.name,
            target.version,
            target.url
        );

        let bytes = self.fetcher.fetch(&target.url).await.map_err(|e| {
            SyncError::TargetUnreachable {
                url: target.url.clone(),
                source: e,
            }
        })?;

        let manifest = VersionManifest::from_slice(&target.name, &bytes)?;
        match manifest.archive_url(&target.version) {
            Some(archive_url) => Ok(archive_url.to_string()),
            None => Err(SyncError::VersionNotFound {
                target: target.name.clone(),
                requested: target.version.clone(),
                available: manifest.versions(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::HashMap;

    use async_trait::async_trait;

    use crate::http::FetchError;

    struct StaticFetcher {
        responses: HashMap<String, Vec<u8>>,
    }

    impl StaticFetcher {
        fn new(responses: &[(&str, &str)]) -> Self {
            Self {
                responses: responses
                    .iter()
                    .map(|(url, body)| (url.to_string(), body.as_bytes().to_vec()))
                    .collect(),
            }
        }
    }

    #[async_trait]
    impl Fetcher for StaticFetcher {
        async fn fetch(&self, url: &str) -> std::result::Result<Vec<u8>, FetchError> {
            self.responses
                .get(url)
                .cloned()
                .ok_or_else(|| FetchError::NotFound {
                    url: url.to_string(),
                })
        }
    }

    fn reference(url: &str, version: &str) -> TargetReference {
        TargetReference::new(url, version).unwrap()
    }

    #[tokio::test]
    async fn test_resolve_known_version() {
        let fetcher = StaticFetcher::new(&[(
            "https://r.example.com/tool.json",
            r#"{"1.0.0": "https://cdn.example.com/tool-1.0.0.zip",
                "2.0.0": "https://cdn.example.com/tool-2.0.0.zip"}"#,
        )]);
        let resolver = Resolver::new(Arc::new(fetcher));

        let url = resolver
            .resolve(&reference("https://r.example.com/tool.json", "2.0.0"))
            .await
            .unwrap();

        assert_eq!(url, "https://cdn.example.com/tool-2.0.0.zip");
    }

    #[tokio::test]
    async fn test_resolve_unknown_version_lists_available() {
        let fetcher = StaticFetcher::new(&[(
            "https://r.example.com/tool.json",
            r#"{"2.0.0": "https://c/2.zip", "1.0.0": "https://c/1.zip"}"#,
        )]);
        let resolver = Resolver::new(Arc::new(fetcher));

        let err = resolver
            .resolve(&reference("https://r.example.com/tool.json", "9.9.9"))
            .await
            .unwrap_err();

        match err {
            SyncError::VersionNotFound {
                target,
                requested,
                available,
            } => {
                assert_eq!(target, "tool");
                assert_eq!(requested, "9.9.9");
                assert_eq!(available, vec!["1.0.0", "2.0.0"]);
            }
            other => panic!("expected VersionNotFound, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_resolve_unreachable_manifest() {
        let fetcher = StaticFetcher::new(&[]);
        let resolver = Resolver::new(Arc::new(fetcher));

        let err = resolver
            .resolve(&reference("https://r.example.com/tool.json", "1.0.0"))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            SyncError::TargetUnreachable {
                source: FetchError::NotFound { .. },
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_resolve_malformed_manifest() {
        let fetcher = StaticFetcher::new(&[("https://r.example.com/tool.json", "[1, 2, 3]")]);
        let resolver = Resolver::new(Arc::new(fetcher));

        let err = resolver
            .resolve(&reference("https://r.example.com/tool.json", "1.0.0"))
            .await
            .unwrap_err();

        assert!(matches!(err, SyncError::MalformedManifest(_)));
    }
}
