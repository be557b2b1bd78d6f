use serde::{Deserialize, Serialize};
use std::fmt;

/// A published artifact, identified by its release version and build number.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct BuildDescriptor {
    pub version: String,
    pub build: String,
}

impl BuildDescriptor {
    pub fn new(version: impl Into<String>, build: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            build: build.into(),
        }
    }
}

/// Canonical `<version>/<build>` form, as used in download urls.
impl fmt::Display for BuildDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.version, self.build)
    }
}
