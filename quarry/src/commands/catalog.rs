use crate::setup::App;
use anyhow::{Context, Result};
use quarry_lib::manifest::read_source;

pub fn execute_init(app: &mut App) -> Result<()> {
    let version = app
        .catalog
        .store_mut()
        .schema_version()
        .context("Failed to read schema version")?;
    println!(
        "Catalog ready at {} (schema v{}, {} mod(s))",
        app.config.store_path().display(),
        version,
        app.catalog.mods().len()
    );
    Ok(())
}

pub fn execute_list(app: &App, json: bool) -> Result<()> {
    let mods = app.catalog.mods();
    if json {
        println!("{}", serde_json::to_string_pretty(mods)?);
        return Ok(());
    }

    if mods.is_empty() {
        println!("The catalog is empty. Import a manifest with `quarry import <source>`.");
        return Ok(());
    }

    for m in mods {
        println!("{}", m);
        for v in &m.versions {
            let cached = if app.pipeline.is_downloaded(v) { "cached" } else { "" };
            println!(
                "  {:<12} {:<10} {:<42} {}",
                v.version,
                v.packing.as_str(),
                v.declared_hash.as_deref().unwrap_or("-"),
                cached
            );
            for dep in &v.dependencies {
                println!("    requires {}", dep);
            }
        }
    }
    Ok(())
}

pub async fn execute_import(app: &mut App, source: &str) -> Result<()> {
    let document = read_source(source, app.pipeline.fetcher())
        .await
        .with_context(|| format!("Failed to load manifest {}", source))?;
    let imported = app
        .catalog
        .import_manifest(&document, app.pipeline.normalizer())
        .await
        .with_context(|| format!("Failed to import manifest {}", source))?;
    println!("Imported {} ({} version(s))", imported, imported.versions.len());
    Ok(())
}
