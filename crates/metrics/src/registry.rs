use std::sync::{Arc, OnceLock, RwLock};

pub use prometheus_client::registry::Registry;

/// A registry that can be shared between the engine and the metrics endpoint.
#[derive(Clone)]
pub struct SharedRegistry(Arc<RwLock<Registry>>);

impl SharedRegistry {
    pub fn new(registry: Registry) -> Self {
        Self(Arc::new(RwLock::new(registry)))
    }

    /// The process-wide registry served by the metrics endpoint.
    pub fn global() -> &'static Self {
        global_registry()
    }

    pub fn read<A>(&self, f: impl FnOnce(&Registry) -> A) -> A {
        f(&self.0.read().expect("poisoned lock"))
    }

    pub fn write<A>(&self, f: impl FnOnce(&mut Registry) -> A) -> A {
        f(&mut self.0.write().expect("poisoned lock"))
    }

    pub fn with_prefix<A>(&self, prefix: impl AsRef<str>, f: impl FnOnce(&mut Registry) -> A) -> A {
        self.write(|reg| f(reg.sub_registry_with_prefix(prefix)))
    }

    /// Encode the registry in the Prometheus text format.
    pub fn encode<W: core::fmt::Write>(&self, writer: &mut W) -> core::fmt::Result {
        use prometheus_client::encoding::text::encode;

        self.read(|registry| encode(writer, registry))
    }
}

impl Default for SharedRegistry {
    fn default() -> Self {
        Self::new(Registry::default())
    }
}

fn global_registry() -> &'static SharedRegistry {
    static REGISTRY: OnceLock<SharedRegistry> = OnceLock::new();
    REGISTRY.get_or_init(SharedRegistry::default)
}

/// Encode the global registry in the Prometheus text format.
pub fn export<W: core::fmt::Write>(writer: &mut W) -> core::fmt::Result {
    SharedRegistry::global().encode(writer)
}

#[cfg(test)]
mod tests {
    use prometheus_client::metrics::counter::Counter;

    use super::*;

    #[test]
    fn prefixed_metrics_are_exported() {
        let registry = SharedRegistry::default();
        let counter: Counter = Counter::default();

        registry.with_prefix("primus", |reg| {
            reg.register("role_transitions", "Role transitions", counter.clone())
        });

        counter.inc();
        counter.inc();

        let mut out = String::new();
        registry.encode(&mut out).unwrap();

        assert!(out.contains("primus_role_transitions_total 2"), "{out}");
    }
}
