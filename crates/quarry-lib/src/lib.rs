//! Building blocks for the Quarry mod catalog.
//!
//! Everything here is free of persistence: identifiers, manifest decoding,
//! network collaborators (byte fetching and URL normalization), archive
//! access and the hashing and path helpers the artifact cache relies on.

pub mod archive;
pub mod hash;
pub mod id;
pub mod manifest;
pub mod net;
pub mod sanitize;

pub use id::{Identifier, ParseIdError};
pub use manifest::{Manifest, ManifestError, ManifestVersion, Packing, XmlNode};
