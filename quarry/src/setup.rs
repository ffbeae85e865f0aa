use crate::catalog::{Catalog, CatalogStore};
use crate::error::{CatalogError, Result};
use crate::tasks::ArtifactPipeline;
use crate::utils::config::AppConfig;
use quarry_lib::manifest::read_source;
use quarry_lib::net::{HttpFetcher, RuleNormalizer};
use quarry_lib::Identifier;
use std::sync::Arc;

/// Everything a command needs, wired from one configuration.
pub struct App {
    pub config: AppConfig,
    pub catalog: Catalog,
    pub pipeline: ArtifactPipeline,
}

pub fn ensure_dirs(config: &AppConfig) -> Result<()> {
    for dir in [config.data_dir.clone(), config.archives_dir()] {
        std::fs::create_dir_all(&dir)
            .map_err(|source| CatalogError::StoreUnavailable { path: dir, source })?;
    }
    Ok(())
}

pub fn build_pipeline(config: &AppConfig) -> Result<ArtifactPipeline> {
    let fetcher = HttpFetcher::with_timeout(config.http_timeout(), &config.user_agent)?;
    let normalizer = RuleNormalizer::with_default_rules(fetcher.client().clone())?;
    Ok(ArtifactPipeline::new(
        Arc::new(fetcher),
        Arc::new(normalizer),
        config.archives_dir(),
    ))
}

/// Import and fetch the base manifest when the catalog has no base mod yet.
///
/// Returns the fetched base version, if any.
pub async fn bootstrap_base(
    catalog: &mut Catalog,
    pipeline: &ArtifactPipeline,
    source: Option<&str>,
) -> Result<Option<Identifier>> {
    if catalog.base_mods().next().is_some() {
        return Ok(None);
    }
    let Some(source) = source else {
        log::debug!("No base mod in the catalog and no base manifest configured");
        return Ok(None);
    };

    log::info!("Importing base manifest from {}", source);
    let document = read_source(source, pipeline.fetcher()).await?;
    let first = catalog
        .import_manifest(&document, pipeline.normalizer())
        .await?
        .versions
        .first()
        .map(|v| v.id());

    if let Some(id) = &first {
        pipeline.fetch(catalog, id).await?;
    }
    Ok(first)
}

pub async fn init(config: AppConfig) -> Result<App> {
    ensure_dirs(&config)?;
    let store = CatalogStore::open(&config.store_path())?;
    let mut catalog = Catalog::load(store)?;
    let pipeline = build_pipeline(&config)?;

    bootstrap_base(&mut catalog, &pipeline, config.base_manifest.as_deref()).await?;

    Ok(App {
        config,
        catalog,
        pipeline,
    })
}
