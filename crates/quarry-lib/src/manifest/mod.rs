//! Mod manifest documents.
//!
//! A manifest is an XML document in the [`MANIFEST_NAMESPACE`] namespace:
//!
//! ```xml
//! <manifest xmlns="http://mike-caron.com/McModManager/manifest">
//!   <name>Iron Chests</name>
//!   <id>forge:ironchest</id>
//!   <url>https://example.com/ironchest</url>
//!   <versions>
//!     <version>
//!       <url>https://example.com/ironchest-1.2.zip</url>
//!       <ver>1.2</ver>
//!       <packing>modloader</packing>
//!       <hash>0a1b...</hash>
//!       <depends><depend>base:minecraft#1.6.4</depend></depends>
//!     </version>
//!   </versions>
//! </manifest>
//! ```

mod parser;

pub use parser::{parse_document, parse_reader, XmlNode};

use crate::hash::is_sha1_hex;
use crate::id::{Identifier, ParseIdError};
use crate::net::{ByteFetcher, TransportError};
use futures::StreamExt;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

pub const MANIFEST_NAMESPACE: &str = "http://mike-caron.com/McModManager/manifest";

#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    #[error("malformed manifest document: {0}")]
    Malformed(#[from] xml::reader::Error),
    #[error("invalid manifest: {0}")]
    Invalid(String),
    #[error("invalid identifier in manifest: {0}")]
    Identifier(#[from] ParseIdError),
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("failed to read manifest {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// How a version's artifact is meant to be installed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Packing {
    #[default]
    Unknown,
    Loader,
    Raw,
    /// The platform itself; always selected.
    Base,
}

impl Packing {
    pub fn as_str(&self) -> &'static str {
        match self {
            Packing::Unknown => "unknown",
            Packing::Loader => "modloader",
            Packing::Raw => "raw",
            Packing::Base => "base",
        }
    }
}

impl fmt::Display for Packing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Packing {
    type Err = ManifestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "unknown" => Ok(Packing::Unknown),
            "modloader" => Ok(Packing::Loader),
            "raw" => Ok(Packing::Raw),
            "base" => Ok(Packing::Base),
            other => Err(ManifestError::Invalid(format!("unknown packing type {other:?}"))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestVersion {
    pub url: String,
    pub ver: String,
    pub packing: Packing,
    /// Lowercased when present.
    pub hash: Option<String>,
    pub depends: Vec<Identifier>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Manifest {
    pub name: String,
    pub id: Identifier,
    pub url: Option<String>,
    pub versions: Vec<ManifestVersion>,
}

fn required<'a>(node: &'a XmlNode, name: &str) -> Result<&'a str, ManifestError> {
    node.child_text(name)
        .ok_or_else(|| ManifestError::Invalid(format!("<{}> is missing <{}>", node.name, name)))
}

impl Manifest {
    pub fn from_document(root: &XmlNode) -> Result<Self, ManifestError> {
        if root.name != "manifest" || root.namespace.as_deref() != Some(MANIFEST_NAMESPACE) {
            return Err(ManifestError::Invalid(format!(
                "root element {{{}}}{} is not a manifest",
                root.namespace.as_deref().unwrap_or(""),
                root.name
            )));
        }

        let name = required(root, "name")?.to_string();
        let id_node = root
            .child("id")
            .ok_or_else(|| ManifestError::Invalid("<manifest> is missing <id>".into()))?;
        let id = Identifier::from_node(id_node)?;
        if id.version.is_some() {
            return Err(ManifestError::Invalid(format!(
                "manifest id {id} must not include a version"
            )));
        }

        let url = root
            .child_text("url")
            .filter(|u| !u.is_empty())
            .map(str::to_string);

        let versions = match root.child("versions") {
            Some(versions) => versions
                .children_named("version")
                .map(ManifestVersion::from_node)
                .collect::<Result<Vec<_>, _>>()?,
            None => Vec::new(),
        };

        Ok(Self {
            name,
            id,
            url,
            versions,
        })
    }

    pub fn parse(source: &str) -> Result<Self, ManifestError> {
        Self::from_document(&parse_document(source)?)
    }
}

impl ManifestVersion {
    fn from_node(node: &XmlNode) -> Result<Self, ManifestError> {
        let url = required(node, "url")?.to_string();
        let ver = required(node, "ver")?.to_string();
        let packing: Packing = required(node, "packing")?.parse()?;
        if packing == Packing::Unknown {
            return Err(ManifestError::Invalid(format!(
                "version {ver} does not declare how it is packed"
            )));
        }

        let hash = node
            .child_text("hash")
            .filter(|h| !h.is_empty())
            .map(str::to_lowercase);
        if let Some(h) = hash.as_deref().filter(|h| !is_sha1_hex(h)) {
            return Err(ManifestError::Invalid(format!(
                "hash {h} of version {ver} is not a SHA-1 digest"
            )));
        }

        let mut depends = Vec::new();
        if let Some(list) = node.child("depends") {
            for dep in list.children_named("depend") {
                let id = Identifier::from_node(dep)?;
                if id.version.is_none() {
                    return Err(ManifestError::Invalid(format!(
                        "dependency {id} of version {ver} must name a version"
                    )));
                }
                depends.push(id);
            }
        }

        Ok(Self {
            url,
            ver,
            packing,
            hash,
            depends,
        })
    }
}

fn is_remote(source: &str) -> bool {
    source.starts_with("http://") || source.starts_with("https://")
}

/// Load a manifest tree from an `http(s)` URL or a local file path.
pub async fn read_source(source: &str, fetcher: &dyn ByteFetcher) -> Result<XmlNode, ManifestError> {
    if is_remote(source) {
        log::debug!("Fetching manifest from {}", source);
        let mut stream = fetcher.fetch(source).await?;
        let mut body = Vec::new();
        while let Some(chunk) = stream.next().await {
            body.extend_from_slice(&chunk?);
        }
        parse_reader(body.as_slice())
    } else {
        let path = PathBuf::from(source);
        log::debug!("Reading manifest from {:?}", path);
        let text = tokio::fs::read_to_string(&path)
            .await
            .map_err(|source| ManifestError::Io { path, source })?;
        parse_document(&text)
    }
}
