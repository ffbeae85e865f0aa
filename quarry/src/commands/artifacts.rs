use crate::setup::App;
use crate::tasks::FetchOutcome;
use anyhow::{Context, Result};
use quarry_lib::archive::ZipArchiveReader;
use quarry_lib::Identifier;

pub async fn execute_fetch(app: &mut App, id: &Identifier) -> Result<()> {
    let outcome = app
        .pipeline
        .fetch(&mut app.catalog, id)
        .await
        .with_context(|| format!("Failed to fetch {}", id))?;
    let version = app.catalog.require_version(id)?;
    let path = app.pipeline.artifact_path(version);

    match outcome {
        FetchOutcome::AlreadyPresent { .. } => {
            println!("{} already cached at {}", version.id(), path.display())
        }
        FetchOutcome::Downloaded { hash, recorded } => {
            println!("Downloaded {} to {}", version.id(), path.display());
            if recorded {
                println!("Recorded hash {}", hash);
            }
        }
    }
    Ok(())
}

pub fn execute_hash(app: &App, id: &Identifier) -> Result<()> {
    let version = app.catalog.require_version(id)?;
    let hash = app.pipeline.file_hash(version)?;
    println!("{}  {}", hash, app.pipeline.artifact_path(version).display());
    Ok(())
}

pub fn execute_analyze(app: &mut App, id: &Identifier) -> Result<()> {
    let version = app.catalog.require_version(id)?.id();
    app.pipeline
        .analyze(&mut app.catalog, &version, &ZipArchiveReader)
        .with_context(|| format!("Failed to analyze {}", version))?;

    let stored = app.catalog.store_mut().entry_hashes(&version)?;
    for (name, hash) in &stored {
        println!("{}  {}", hash, name);
    }
    println!("{} compiled entries recorded for {}", stored.len(), version);
    Ok(())
}
