//! Functionality related to storing bean definitions. Registries own their definitions for the
//! whole container lifetime and keep registration order, which the configuration discovery loop
//! relies on.

use crate::definition::BeanDefinition;
use crate::error::RegistryError;
use crate::instance::InstancePostProcessorPtr;
use fxhash::FxHashMap;
use std::any::Any;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Container-internal artifacts published alongside definitions, e.g. the import registry.
pub type SingletonPtr = Arc<dyn Any + Send + Sync>;

/// Opaque identity of a registry, assigned monotonically at creation. Used by one-shot processing
/// guards instead of object identity.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub struct RegistryId(u64);

impl RegistryId {
    /// Allocates the next registry identity. Custom registry implementations should call this
    /// once at construction and keep the result.
    pub fn next() -> Self {
        static NEXT_ID: AtomicU64 = AtomicU64::new(0);
        Self(NEXT_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// A mutable store of named [BeanDefinition]s with a separate singleton namespace and an
/// extension chain for instance post-processors.
pub trait BeanDefinitionRegistry {
    /// Stable identity of this registry.
    fn id(&self) -> RegistryId;

    /// Registers a definition under the given name. Handling of duplicate names depends on the
    /// registry's override policy.
    fn register_definition(
        &mut self,
        name: &str,
        definition: BeanDefinition,
    ) -> Result<(), RegistryError>;

    /// Returns the definition registered under the given name.
    fn definition(&self, name: &str) -> Result<&BeanDefinition, RegistryError>;

    /// Returns the definition registered under the given name for in-place mutation.
    fn definition_mut(&mut self, name: &str) -> Result<&mut BeanDefinition, RegistryError>;

    /// Checks if there's a definition with the given name.
    fn contains_definition(&self, name: &str) -> bool;

    /// Returns all registered names in registration order.
    fn definition_names(&self) -> Vec<String>;

    /// Returns the number of registered definitions.
    fn definition_count(&self) -> usize;

    /// Checks if a singleton is published under the given name.
    fn contains_singleton(&self, name: &str) -> bool;

    /// Publishes a container-internal singleton under the given name.
    fn register_singleton(&mut self, name: &str, value: SingletonPtr);

    /// Returns the singleton published under the given name.
    fn singleton(&self, name: &str) -> Option<SingletonPtr>;

    /// Appends an instance post-processor to the extension chain.
    fn add_instance_post_processor(&mut self, post_processor: InstancePostProcessorPtr);

    /// Returns the extension chain in registration order.
    fn instance_post_processors(&self) -> &[InstancePostProcessorPtr];
}

/// Default [BeanDefinitionRegistry] keeping definitions in registration order.
pub struct DefaultBeanDefinitionRegistry {
    id: RegistryId,
    definitions: FxHashMap<String, BeanDefinition>,
    names: Vec<String>,
    singletons: FxHashMap<String, SingletonPtr>,
    post_processors: Vec<InstancePostProcessorPtr>,
    allow_definition_overriding: bool,
}

impl DefaultBeanDefinitionRegistry {
    pub fn new(allow_definition_overriding: bool) -> Self {
        Self {
            id: RegistryId::next(),
            definitions: Default::default(),
            names: Default::default(),
            singletons: Default::default(),
            post_processors: Default::default(),
            allow_definition_overriding,
        }
    }
}

impl Default for DefaultBeanDefinitionRegistry {
    fn default() -> Self {
        Self::new(false)
    }
}

impl BeanDefinitionRegistry for DefaultBeanDefinitionRegistry {
    #[inline]
    fn id(&self) -> RegistryId {
        self.id
    }

    fn register_definition(
        &mut self,
        name: &str,
        definition: BeanDefinition,
    ) -> Result<(), RegistryError> {
        if let Some(existing) = self.definitions.get_mut(name) {
            if !self.allow_definition_overriding {
                return Err(RegistryError::DuplicateDefinition(name.to_string()));
            }

            // the original registration position is kept when overriding
            *existing = definition;
            return Ok(());
        }

        self.definitions.insert(name.to_string(), definition);
        self.names.push(name.to_string());
        Ok(())
    }

    fn definition(&self, name: &str) -> Result<&BeanDefinition, RegistryError> {
        self.definitions
            .get(name)
            .ok_or_else(|| RegistryError::DefinitionNotFound(name.to_string()))
    }

    fn definition_mut(&mut self, name: &str) -> Result<&mut BeanDefinition, RegistryError> {
        self.definitions
            .get_mut(name)
            .ok_or_else(|| RegistryError::DefinitionNotFound(name.to_string()))
    }

    #[inline]
    fn contains_definition(&self, name: &str) -> bool {
        self.definitions.contains_key(name)
    }

    #[inline]
    fn definition_names(&self) -> Vec<String> {
        self.names.clone()
    }

    #[inline]
    fn definition_count(&self) -> usize {
        self.names.len()
    }

    #[inline]
    fn contains_singleton(&self, name: &str) -> bool {
        self.singletons.contains_key(name)
    }

    fn register_singleton(&mut self, name: &str, value: SingletonPtr) {
        self.singletons.insert(name.to_string(), value);
    }

    fn singleton(&self, name: &str) -> Option<SingletonPtr> {
        self.singletons.get(name).cloned()
    }

    fn add_instance_post_processor(&mut self, post_processor: InstancePostProcessorPtr) {
        self.post_processors.push(post_processor);
    }

    #[inline]
    fn instance_post_processors(&self) -> &[InstancePostProcessorPtr] {
        &self.post_processors
    }
}
