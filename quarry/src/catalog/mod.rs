//! In-memory view of the catalog, kept in step with the store.

pub mod store;

pub use store::CatalogStore;

use crate::error::{CatalogError, Result};
use crate::models::{Mod, ModVersion};
use quarry_lib::net::{file_name_from_url, UrlNormalizer};
use quarry_lib::{Identifier, Manifest, XmlNode};

pub struct Catalog {
    store: CatalogStore,
    mods: Vec<Mod>,
}

impl Catalog {
    /// Load every mod, with versions and dependency lists, from `store`.
    pub fn load(mut store: CatalogStore) -> Result<Self> {
        let mods = store.load_mods()?;
        log::info!("Loaded {} mod(s) from the catalog", mods.len());
        Ok(Self { store, mods })
    }

    pub fn mods(&self) -> &[Mod] {
        &self.mods
    }

    /// Look a mod up by `root:value`; any version in `id` is ignored.
    pub fn get(&self, id: &Identifier) -> Option<&Mod> {
        self.mods.iter().find(|m| m.id.same_mod(id))
    }

    /// The version `id` names, or the latest one when it names none.
    pub fn find_version(&self, id: &Identifier) -> Option<&ModVersion> {
        let m = self.get(id)?;
        match &id.version {
            Some(version) => m.version(version),
            None => m.latest_version(),
        }
    }

    pub fn require_version(&self, id: &Identifier) -> Result<&ModVersion> {
        self.find_version(id)
            .ok_or_else(|| CatalogError::UnknownMod(id.clone()))
    }

    pub fn base_mods(&self) -> impl Iterator<Item = &Mod> {
        self.mods.iter().filter(|m| m.is_base())
    }

    pub fn store_mut(&mut self) -> &mut CatalogStore {
        &mut self.store
    }

    /// Decode a manifest tree and persist the mod it describes.
    ///
    /// Artifact URLs are stored as resolved by `normalizer`, and each
    /// version's file name is taken from its resolved URL.
    pub async fn import_manifest(
        &mut self,
        document: &XmlNode,
        normalizer: &dyn UrlNormalizer,
    ) -> Result<&Mod> {
        let manifest = Manifest::from_document(document)?;
        log::info!(
            "Importing {} ({}) with {} version(s)",
            manifest.name,
            manifest.id,
            manifest.versions.len()
        );

        let mut versions = Vec::with_capacity(manifest.versions.len());
        for declared in manifest.versions {
            let artifact_url = normalizer.resolve(&declared.url).await?;
            if artifact_url != declared.url {
                log::debug!("Resolved {} to {}", declared.url, artifact_url);
            }

            let mut dependencies: Vec<Identifier> = Vec::with_capacity(declared.depends.len());
            for dep in declared.depends {
                // one edge per dependency mod; a later declaration replaces an earlier one
                dependencies.retain(|d| !d.same_mod(&dep));
                dependencies.push(dep);
            }

            versions.push(ModVersion {
                parent_id: manifest.id.clone(),
                version: declared.ver,
                file_name: file_name_from_url(&artifact_url),
                artifact_url,
                packing: declared.packing,
                declared_hash: declared.hash,
                dependencies,
            });
        }

        self.save(Mod {
            id: manifest.id,
            name: manifest.name,
            source_url: manifest.url,
            versions,
        })
    }

    /// Persist `m` and refresh the in-memory entry from what was stored.
    pub fn save(&mut self, m: Mod) -> Result<&Mod> {
        self.store.save_mod(&m)?;
        let versions = self.store.load_versions(&m.id.key())?;
        let saved = Mod { versions, ..m };

        let index = match self.mods.iter().position(|existing| existing.id == saved.id) {
            Some(index) => {
                self.mods[index] = saved;
                index
            }
            None => {
                self.mods.push(saved);
                self.mods.len() - 1
            }
        };
        Ok(&self.mods[index])
    }

    /// Record `hash` as the declared hash of the version `id` names.
    pub fn record_hash(&mut self, id: &Identifier, hash: &str) -> Result<()> {
        let hash = hash.to_lowercase();
        self.store.set_version_hash(id, Some(&hash))?;

        let version = id.version.as_deref().unwrap_or_default();
        if let Some(v) = self
            .mods
            .iter_mut()
            .find(|m| m.id.same_mod(id))
            .and_then(|m| m.version_mut(version))
        {
            v.declared_hash = Some(hash);
        }
        Ok(())
    }
}
