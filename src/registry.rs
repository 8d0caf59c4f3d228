//! Table of every collector the binary knows about.
//!
//! The registry is filled once at startup and only read afterwards. It does not
//! decide which collectors run; see [`crate::bootstrap::init_collectors`].

use crate::domain::Collector;
use anyhow::bail;
use tracing::Span;

pub type Factory =
    Box<dyn Fn(&CollectorContext) -> anyhow::Result<Box<dyn Collector>> + Send + Sync>;

/// Everything a factory gets to build its collector with.
#[derive(Debug, Clone)]
pub struct CollectorContext {
    name: String,
    namespace: String,
    span: Span,
}

impl CollectorContext {
    pub fn new(name: impl Into<String>, namespace: impl Into<String>) -> Self {
        let name = name.into();
        let span = tracing::info_span!("collector", collector = %name);

        Self {
            name,
            namespace: namespace.into(),
            span,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Logging handle the collector should emit its events under.
    pub fn span(&self) -> &Span {
        &self.span
    }
}

pub struct Registration {
    name: String,
    default_enabled: bool,
    factory: Factory,
}

impl Registration {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn default_enabled(&self) -> bool {
        self.default_enabled
    }

    pub fn build(&self, namespace: &str) -> anyhow::Result<Box<dyn Collector>> {
        let ctx = CollectorContext::new(self.name.as_str(), namespace);
        (self.factory)(&ctx)
    }
}

impl std::fmt::Debug for Registration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registration")
            .field("name", &self.name)
            .field("default_enabled", &self.default_enabled)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Default)]
pub struct CollectorRegistry {
    registrations: Vec<Registration>,
}

impl CollectorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a collector. Names must be unique; a clash is a programming error and
    /// is expected to abort startup.
    pub fn register<F>(
        &mut self,
        name: impl Into<String>,
        default_enabled: bool,
        factory: F,
    ) -> anyhow::Result<()>
    where
        F: Fn(&CollectorContext) -> anyhow::Result<Box<dyn Collector>> + Send + Sync + 'static,
    {
        let name = name.into();
        if self.get(&name).is_some() {
            bail!("A collector named [{}] is already registered", name);
        }

        tracing::debug!(collector = %name, default_enabled, "Registered collector");
        self.registrations.push(Registration {
            name,
            default_enabled,
            factory: Box::new(factory),
        });

        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Registration> {
        self.registrations.iter().find(|r| r.name == name)
    }

    /// All registrations, in the order they were registered.
    pub fn registrations(&self) -> impl Iterator<Item = &Registration> {
        self.registrations.iter()
    }

    pub fn len(&self) -> usize {
        self.registrations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registrations.is_empty()
    }
}
