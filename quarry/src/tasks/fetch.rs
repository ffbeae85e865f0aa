use crate::catalog::Catalog;
use crate::error::{CatalogError, Result};
use crate::models::ModVersion;
use futures::StreamExt;
use quarry_lib::hash::{calculate_sha1, hashes_match};
use quarry_lib::net::{ByteFetcher, UrlNormalizer};
use quarry_lib::sanitize::sanitize_segment;
use quarry_lib::Identifier;
use sha1::{Digest, Sha1};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// The cached file was valid; nothing was downloaded.
    AlreadyPresent { hash: Option<String> },
    /// A fresh copy was downloaded. `recorded` is set when its hash became
    /// the version's declared hash.
    Downloaded { hash: String, recorded: bool },
}

/// Downloads version artifacts into the archive cache and verifies them.
pub struct ArtifactPipeline {
    fetcher: Arc<dyn ByteFetcher>,
    normalizer: Arc<dyn UrlNormalizer>,
    archives_root: PathBuf,
}

impl ArtifactPipeline {
    pub fn new(
        fetcher: Arc<dyn ByteFetcher>,
        normalizer: Arc<dyn UrlNormalizer>,
        archives_root: impl Into<PathBuf>,
    ) -> Self {
        Self {
            fetcher,
            normalizer,
            archives_root: archives_root.into(),
        }
    }

    pub fn normalizer(&self) -> &dyn UrlNormalizer {
        self.normalizer.as_ref()
    }

    pub fn fetcher(&self) -> &dyn ByteFetcher {
        self.fetcher.as_ref()
    }

    /// `<archives>/<root>/<value>/<version>`, each segment sanitized.
    pub fn cache_path(&self, version: &ModVersion) -> PathBuf {
        self.archives_root
            .join(sanitize_segment(&version.parent_id.root))
            .join(sanitize_segment(&version.parent_id.value))
            .join(sanitize_segment(&version.version))
    }

    pub fn artifact_path(&self, version: &ModVersion) -> PathBuf {
        self.cache_path(version).join(&version.file_name)
    }

    pub fn is_downloaded(&self, version: &ModVersion) -> bool {
        self.cache_path(version).is_dir() && self.artifact_path(version).is_file()
    }

    /// Lowercase hex SHA-1 of the cached artifact.
    pub fn file_hash(&self, version: &ModVersion) -> Result<String> {
        if !self.is_downloaded(version) {
            return Err(CatalogError::NotDownloaded(version.id()));
        }
        let path = self.artifact_path(version);
        calculate_sha1(&path).map_err(CatalogError::io(path))
    }

    /// Make sure the artifact of `id` (latest version when unversioned) is
    /// cached and matches its declared hash.
    pub async fn fetch(&self, catalog: &mut Catalog, id: &Identifier) -> Result<FetchOutcome> {
        let version = catalog.require_version(id)?.clone();
        let version_id = version.id();
        let target = self.artifact_path(&version);

        if self.is_downloaded(&version) {
            let Some(expected) = version.declared_hash.as_deref() else {
                log::debug!("{} is cached and has no declared hash, skipping", version_id);
                return Ok(FetchOutcome::AlreadyPresent { hash: None });
            };

            let actual = self.file_hash(&version)?;
            if hashes_match(expected, &actual) {
                log::debug!("{} is cached and hash matches, skipping: {:?}", version_id, target);
                return Ok(FetchOutcome::AlreadyPresent { hash: Some(actual) });
            }

            log::info!(
                "Cached {} hash mismatches ({} != {}), re-downloading: {:?}",
                version_id,
                actual,
                expected,
                target
            );
            tokio::fs::remove_file(&target)
                .await
                .map_err(CatalogError::io(&target))?;
        }

        let url = self.normalizer.resolve(&version.artifact_url).await?;

        let dir = self.cache_path(&version);
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(CatalogError::io(&dir))?;

        let hash = self.download(&url, &target).await?;

        match version.declared_hash.as_deref() {
            None => {
                log::info!("Recording first-download hash {} for {}", hash, version_id);
                catalog.record_hash(&version_id, &hash)?;
                Ok(FetchOutcome::Downloaded {
                    hash,
                    recorded: true,
                })
            }
            Some(expected) if hashes_match(expected, &hash) => Ok(FetchOutcome::Downloaded {
                hash,
                recorded: false,
            }),
            Some(expected) => {
                if let Err(e) = tokio::fs::remove_file(&target).await {
                    log::warn!("Failed to remove mismatched download {:?}: {}", target, e);
                }
                Err(CatalogError::HashMismatch {
                    id: version_id,
                    expected: expected.to_string(),
                    actual: hash,
                })
            }
        }
    }

    /// Stream `url` into `<path>.part`, then move it into place.
    async fn download(&self, url: &str, path: &Path) -> Result<String> {
        log::debug!("Downloading: {} -> {:?}", url, path);
        let start = Instant::now();

        let tmp_name = format!(
            "{}.part",
            path.file_name()
                .and_then(|n| n.to_str())
                .unwrap_or("download")
        );
        let tmp_path = path.with_file_name(tmp_name);

        let result = self.stream_to(url, &tmp_path).await;
        let (size, hash) = match result {
            Ok(done) => done,
            Err(e) => {
                if let Err(cleanup) = tokio::fs::remove_file(&tmp_path).await {
                    if cleanup.kind() != std::io::ErrorKind::NotFound {
                        log::warn!("Failed to remove partial download {:?}: {}", tmp_path, cleanup);
                    }
                }
                return Err(e);
            }
        };

        tokio::fs::rename(&tmp_path, path)
            .await
            .map_err(CatalogError::io(path))?;

        log::info!(
            "Download stats: url={}, size={} bytes, time={:.2}s",
            url,
            size,
            start.elapsed().as_secs_f64()
        );
        Ok(hash)
    }

    async fn stream_to(&self, url: &str, tmp_path: &Path) -> Result<(u64, String)> {
        let mut stream = self.fetcher.fetch(url).await?;
        let mut file = File::create(tmp_path)
            .await
            .map_err(CatalogError::io(tmp_path))?;
        let mut hasher = Sha1::new();
        let mut size: u64 = 0;

        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            file.write_all(&chunk)
                .await
                .map_err(CatalogError::io(tmp_path))?;
            hasher.update(&chunk);
            size += chunk.len() as u64;
        }
        file.flush().await.map_err(CatalogError::io(tmp_path))?;
        file.sync_all().await.map_err(CatalogError::io(tmp_path))?;

        Ok((size, format!("{:x}", hasher.finalize())))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::catalog::tests::{empty_catalog, manifest};
    use futures::future::BoxFuture;
    use quarry_lib::net::{ByteStream, Passthrough, RuleNormalizer, TransportError, UrlRule};
    use std::sync::Mutex;

    /// Serves a fixed body in small chunks, optionally failing after the first.
    pub(crate) struct StubFetcher {
        pub body: Vec<u8>,
        pub fail_midway: bool,
        pub requested: Mutex<Vec<String>>,
    }

    impl StubFetcher {
        pub(crate) fn serving(body: &[u8]) -> Arc<Self> {
            Arc::new(Self {
                body: body.to_vec(),
                fail_midway: false,
                requested: Mutex::new(Vec::new()),
            })
        }

        pub(crate) fn failing_midway(body: &[u8]) -> Arc<Self> {
            Arc::new(Self {
                body: body.to_vec(),
                fail_midway: true,
                requested: Mutex::new(Vec::new()),
            })
        }

        pub(crate) fn calls(&self) -> usize {
            self.requested().len()
        }

        pub(crate) fn requested(&self) -> Vec<String> {
            self.requested.lock().unwrap().clone()
        }
    }

    impl ByteFetcher for StubFetcher {
        fn fetch<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<ByteStream, TransportError>> {
            self.requested.lock().unwrap().push(url.to_string());
            let mut chunks: Vec<Result<Vec<u8>, TransportError>> =
                self.body.chunks(4).map(|c| Ok(c.to_vec())).collect();
            if self.fail_midway {
                chunks.truncate(1);
                chunks.push(Err(TransportError::Io(std::io::Error::other("connection reset"))));
            }
            Box::pin(async move { Ok(futures::stream::iter(chunks).boxed()) })
        }
    }

    /// Points every artifact at a mirror host.
    struct Mirror;

    impl UrlNormalizer for Mirror {
        fn resolve<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<String, TransportError>> {
            Box::pin(async move { Ok(url.replace("files.example", "mirror.example")) })
        }
    }

    /// Matches everything and fails as an unreachable host would.
    struct UnreachableRule;

    impl UrlRule for UnreachableRule {
        fn name(&self) -> &str {
            "unreachable"
        }

        fn matches(&self, _url: &str) -> bool {
            true
        }

        fn apply<'a>(&'a self, _url: &'a str) -> BoxFuture<'a, Result<String, TransportError>> {
            Box::pin(async move { Err(TransportError::Io(std::io::Error::other("network down"))) })
        }
    }

    fn sha1_hex(body: &[u8]) -> String {
        format!("{:x}", Sha1::digest(body))
    }

    async fn setup(
        fetcher: Arc<StubFetcher>,
    ) -> (tempfile::TempDir, Catalog, ArtifactPipeline) {
        setup_with(fetcher, Arc::new(Passthrough)).await
    }

    async fn setup_with(
        fetcher: Arc<StubFetcher>,
        normalizer: Arc<dyn UrlNormalizer>,
    ) -> (tempfile::TempDir, Catalog, ArtifactPipeline) {
        let (dir, mut catalog) = empty_catalog();
        catalog
            .import_manifest(&manifest("x:a", &[("1.0", "raw", &[])]), &Passthrough)
            .await
            .unwrap();
        let pipeline = ArtifactPipeline::new(fetcher, normalizer, dir.path().join("archives"));
        (dir, catalog, pipeline)
    }

    fn id() -> Identifier {
        Identifier::parse("x:a#1.0").unwrap()
    }

    #[tokio::test]
    async fn cache_path_is_sanitized() {
        let (dir, catalog, pipeline) = setup(StubFetcher::serving(b"")).await;
        let version = catalog.require_version(&id()).unwrap();
        assert_eq!(
            pipeline.cache_path(version),
            dir.path().join("archives").join("x").join("a").join("1_0")
        );
        assert!(!pipeline.is_downloaded(version));
        assert!(matches!(
            pipeline.file_hash(version),
            Err(CatalogError::NotDownloaded(_))
        ));
    }

    #[tokio::test]
    async fn first_download_records_hash() {
        let fetcher = StubFetcher::serving(b"artifact contents");
        let (_dir, mut catalog, pipeline) = setup(fetcher.clone()).await;

        let outcome = pipeline.fetch(&mut catalog, &id()).await.unwrap();
        let expected = sha1_hex(b"artifact contents");
        assert_eq!(
            outcome,
            FetchOutcome::Downloaded {
                hash: expected.clone(),
                recorded: true
            }
        );

        let version = catalog.require_version(&id()).unwrap();
        assert_eq!(version.declared_hash.as_deref(), Some(expected.as_str()));
        assert!(pipeline.is_downloaded(version));
        assert_eq!(pipeline.file_hash(version).unwrap(), expected);
        assert!(!pipeline.cache_path(version).join("artifact-1.0.zip.part").exists());
    }

    #[tokio::test]
    async fn matching_cache_skips_network() {
        let fetcher = StubFetcher::serving(b"artifact contents");
        let (_dir, mut catalog, pipeline) = setup(fetcher.clone()).await;

        pipeline.fetch(&mut catalog, &id()).await.unwrap();
        let outcome = pipeline.fetch(&mut catalog, &id()).await.unwrap();
        assert!(matches!(outcome, FetchOutcome::AlreadyPresent { hash: Some(_) }));
        assert_eq!(fetcher.calls(), 1);
    }

    #[tokio::test]
    async fn mismatched_cache_is_replaced() {
        let body = b"good artifact";
        let fetcher = StubFetcher::serving(body);
        let (_dir, mut catalog, pipeline) = setup(fetcher.clone()).await;
        catalog.record_hash(&id(), &sha1_hex(body).to_uppercase()).unwrap();

        let version = catalog.require_version(&id()).unwrap().clone();
        std::fs::create_dir_all(pipeline.cache_path(&version)).unwrap();
        std::fs::write(pipeline.artifact_path(&version), b"tampered").unwrap();

        let outcome = pipeline.fetch(&mut catalog, &id()).await.unwrap();
        assert_eq!(
            outcome,
            FetchOutcome::Downloaded {
                hash: sha1_hex(body),
                recorded: false
            }
        );
        assert_eq!(fetcher.calls(), 1);
        assert_eq!(std::fs::read(pipeline.artifact_path(&version)).unwrap(), body);
    }

    #[tokio::test]
    async fn download_not_matching_declared_hash_is_rejected() {
        let fetcher = StubFetcher::serving(b"something else");
        let (_dir, mut catalog, pipeline) = setup(fetcher).await;
        catalog.record_hash(&id(), &sha1_hex(b"expected")).unwrap();

        let err = pipeline.fetch(&mut catalog, &id()).await.unwrap_err();
        assert!(matches!(err, CatalogError::HashMismatch { .. }));
        let version = catalog.require_version(&id()).unwrap();
        assert!(!pipeline.is_downloaded(version));
    }

    #[tokio::test]
    async fn transport_failure_leaves_no_partial_file() {
        let fetcher = StubFetcher::failing_midway(b"0123456789");
        let (_dir, mut catalog, pipeline) = setup(fetcher).await;

        let err = pipeline.fetch(&mut catalog, &id()).await.unwrap_err();
        assert!(matches!(err, CatalogError::Transport(_)));

        let version = catalog.require_version(&id()).unwrap();
        assert!(!pipeline.is_downloaded(version));
        let leftovers = std::fs::read_dir(pipeline.cache_path(version)).unwrap().count();
        assert_eq!(leftovers, 0);
        assert_eq!(version.declared_hash, None);
    }

    #[tokio::test]
    async fn downloads_from_resolved_url() {
        let fetcher = StubFetcher::serving(b"artifact contents");
        let (_dir, mut catalog, pipeline) = setup_with(fetcher.clone(), Arc::new(Mirror)).await;

        pipeline.fetch(&mut catalog, &id()).await.unwrap();
        assert_eq!(
            fetcher.requested(),
            vec!["http://mirror.example/x:a/1.0/artifact-1.0.zip".to_string()]
        );
    }

    #[tokio::test]
    async fn resolution_failure_records_nothing() {
        let fetcher = StubFetcher::serving(b"<html>interstitial ad page</html>");
        let normalizer = RuleNormalizer::new(vec![Box::new(UnreachableRule)]);
        let (_dir, mut catalog, pipeline) = setup_with(fetcher.clone(), Arc::new(normalizer)).await;

        let err = pipeline.fetch(&mut catalog, &id()).await.unwrap_err();
        assert!(matches!(err, CatalogError::Transport(_)));
        assert_eq!(fetcher.calls(), 0);

        let version = catalog.require_version(&id()).unwrap();
        assert_eq!(version.declared_hash, None);
        assert!(!pipeline.is_downloaded(version));
    }

    #[tokio::test]
    async fn unknown_mod_is_reported() {
        let (_dir, mut catalog, pipeline) = setup(StubFetcher::serving(b"")).await;
        let err = pipeline
            .fetch(&mut catalog, &Identifier::parse("x:missing").unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, CatalogError::UnknownMod(_)));
    }
}
