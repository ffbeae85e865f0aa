use crate::catalog::Catalog;
use crate::error::{CatalogError, Result};
use crate::tasks::fetch::ArtifactPipeline;
use quarry_lib::archive::{is_compiled_code, ArchiveReader};
use quarry_lib::hash::sha1_reader;
use quarry_lib::Identifier;

impl ArtifactPipeline {
    /// Hash every compiled-code entry of the cached archive of `id` and store
    /// the result, replacing whatever was recorded before. Returns the
    /// `(entry, hash)` pairs in archive order.
    pub fn analyze(
        &self,
        catalog: &mut Catalog,
        id: &Identifier,
        reader: &dyn ArchiveReader,
    ) -> Result<Vec<(String, String)>> {
        let version = catalog.require_version(id)?.clone();
        if !self.is_downloaded(&version) {
            return Err(CatalogError::NotDownloaded(version.id()));
        }

        let path = self.artifact_path(&version);
        let mut entries = Vec::new();
        reader.for_each_entry(&path, &mut |name, content| {
            if is_compiled_code(name) {
                entries.push((name.to_string(), sha1_reader(content)?));
            }
            Ok(())
        })?;

        log::info!(
            "Hashed {} compiled entries of {}",
            entries.len(),
            version.id()
        );
        catalog
            .store_mut()
            .replace_entry_hashes(&version.id(), &entries)?;
        Ok(entries)
    }
}
