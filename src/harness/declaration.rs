//! Unit declarations
//!
//! A unit can be declared from a name, a configuration, a body, or any combination of them. Every shape is
//! normalized into one [`Declaration`] before a node is built from it.

use std::fmt;

use serde::Deserialize;

use super::Harness;

/// Code run when a unit receives control.
pub type Body = Box<dyn FnOnce(&Harness)>;

/// Declaration-time configuration of a unit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct UnitConfig {
    /// Never run the unit; record an automatic failure for it instead.
    #[serde(default)]
    pub skip: bool,
    /// Fallback name, used when the declaration itself carries none.
    #[serde(default)]
    pub name: Option<String>,
}

impl UnitConfig {
    pub fn skipped() -> Self {
        Self {
            skip: true,
            ..Self::default()
        }
    }
}

/// The normalized `{name, configuration, body}` record.
#[derive(Default)]
pub struct Declaration {
    pub name: String,
    pub config: UnitConfig,
    pub(crate) body: Option<Body>,
}

impl fmt::Debug for Declaration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Declaration")
            .field("name", &self.name)
            .field("config", &self.config)
            .field("body", &self.body.is_some())
            .finish()
    }
}

impl Declaration {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn named(name: impl Into<String>) -> Self {
        Self::new().name(name)
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn config(mut self, config: UnitConfig) -> Self {
        self.config = config;
        self
    }

    pub fn skip(mut self, skip: bool) -> Self {
        self.config.skip = skip;
        self
    }

    pub fn body(mut self, body: impl FnOnce(&Harness) + 'static) -> Self {
        self.body = Some(Box::new(body));
        self
    }

    pub fn has_body(&self) -> bool {
        self.body.is_some()
    }

    /// Resolve the unit name: the declared name, else the configured one, else empty.
    pub(crate) fn resolved_name(&self) -> String {
        if !self.name.is_empty() {
            return self.name.clone();
        }
        self.config.name.clone().unwrap_or_default()
    }
}

impl From<()> for Declaration {
    fn from(_: ()) -> Self {
        Self::new()
    }
}

impl From<&str> for Declaration {
    fn from(name: &str) -> Self {
        Self::named(name)
    }
}

impl From<String> for Declaration {
    fn from(name: String) -> Self {
        Self::named(name)
    }
}

impl From<UnitConfig> for Declaration {
    fn from(config: UnitConfig) -> Self {
        Self::new().config(config)
    }
}

impl From<(&str, UnitConfig)> for Declaration {
    fn from((name, config): (&str, UnitConfig)) -> Self {
        Self::named(name).config(config)
    }
}

impl From<(String, UnitConfig)> for Declaration {
    fn from((name, config): (String, UnitConfig)) -> Self {
        Self::named(name).config(config)
    }
}
