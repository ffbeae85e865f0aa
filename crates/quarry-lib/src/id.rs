use crate::manifest::XmlNode;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseIdError {
    #[error("identifier string is empty")]
    Empty,
}

/// Namespaced mod identity: `root:value` with an optional `#version`.
///
/// Fields are compared case-sensitively. The canonical string form is what
/// gets persisted; nothing converts to or from strings implicitly.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Identifier {
    pub root: String,
    pub value: String,
    pub version: Option<String>,
}

impl Identifier {
    pub fn new(
        root: impl Into<String>,
        value: impl Into<String>,
        version: Option<impl Into<String>>,
    ) -> Self {
        Self {
            root: root.into(),
            value: value.into(),
            version: version.map(Into::into),
        }
    }

    /// Parse the compact `root:value[#version]` form.
    ///
    /// Only the first `:` and the first `#` after it are significant. A string
    /// without `:` becomes a value with an empty root.
    pub fn parse(s: &str) -> Result<Self, ParseIdError> {
        if s.is_empty() {
            return Err(ParseIdError::Empty);
        }

        let Some((root, rest)) = s.split_once(':') else {
            return Ok(Self {
                root: String::new(),
                value: s.to_string(),
                version: None,
            });
        };

        let (value, version) = match rest.split_once('#') {
            Some((value, version)) => (value, Some(version.to_string())),
            None => (rest, None),
        };

        Ok(Self {
            root: root.to_string(),
            value: value.to_string(),
            version,
        })
    }

    /// Read an identifier from a manifest element.
    ///
    /// Accepts either explicit `<root>`, `<value>` and optional `<version>`
    /// children, or the compact form as the element's text.
    pub fn from_node(node: &XmlNode) -> Result<Self, ParseIdError> {
        match (node.child("root"), node.child("value")) {
            (Some(root), Some(value)) => {
                let version = node
                    .child("version")
                    .map(|v| v.text.trim().to_string())
                    .filter(|v| !v.is_empty());
                Ok(Self {
                    root: root.text.trim().to_string(),
                    value: value.text.trim().to_string(),
                    version,
                })
            }
            _ => Self::parse(node.text.trim()),
        }
    }

    /// Build an identifier from a root that may itself be in compact form.
    ///
    /// When `root` contains `:` it is parsed first and only its root is taken
    /// as the root. Explicit `value` and `version` always win; without a
    /// version override the version parsed out of `root` is kept.
    pub fn make_from(
        root: &str,
        value: Option<&str>,
        version: Option<&str>,
    ) -> Result<Self, ParseIdError> {
        let mut id = if root.contains(':') {
            Self::parse(root)?
        } else {
            Self {
                root: root.to_string(),
                value: String::new(),
                version: None,
            }
        };

        if let Some(value) = value {
            id.value = value.to_string();
        }
        if let Some(version) = version {
            id.version = Some(version.to_string());
        }

        Ok(id)
    }

    /// The `root:value` key a mod is stored under.
    pub fn key(&self) -> String {
        format!("{}:{}", self.root, self.value)
    }

    pub fn without_version(&self) -> Self {
        Self {
            version: None,
            ..self.clone()
        }
    }

    pub fn with_version(&self, version: impl Into<String>) -> Self {
        Self {
            version: Some(version.into()),
            ..self.clone()
        }
    }

    /// Same mod, regardless of version.
    pub fn same_mod(&self, other: &Identifier) -> bool {
        self.root == other.root && self.value == other.value
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.root, self.value)?;
        if let Some(version) = &self.version {
            write!(f, "#{}", version)?;
        }
        Ok(())
    }
}

impl FromStr for Identifier {
    type Err = ParseIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for Identifier {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Identifier {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}
