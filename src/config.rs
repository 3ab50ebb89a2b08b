//! Discovery of declarative configuration classes and their conversion into bean definitions.
//! Parsing expands seed candidates and their imports to a fixed point; reading turns the parsed
//! model into concrete definitions.

pub mod parser;
pub mod reader;

use crate::definition::{AttributeValue, BeanDefinition, ORDER_ATTRIBUTE};
use crate::metadata::{
    ClassId, ClassMetadata, FactoryMethodMetadata, MarkerValue, MetadataLoader,
    CONFIGURATION_MARKER, ORDER_MARKER,
};
use fxhash::FxHashMap;
#[cfg(test)]
use mockall::automock;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Name under which the [ImportRegistry] is published as a container-internal singleton after
/// definition registration completes.
pub const IMPORT_REGISTRY_BEAN_NAME: &str = "beanwire.import_registry";

/// Classification of a configuration candidate.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum ConfigurationMark {
    /// Fully processed configuration class; factory methods are routed through the container and
    /// the class is substituted with an enhanced variant.
    Full,
    /// Lightweight configuration class with no inter-method dependencies; never enhanced.
    Lite,
}

impl ConfigurationMark {
    pub fn attribute_value(self) -> AttributeValue {
        AttributeValue::Text(
            match self {
                ConfigurationMark::Full => crate::definition::CONFIGURATION_CLASS_FULL,
                ConfigurationMark::Lite => crate::definition::CONFIGURATION_CLASS_LITE,
            }
            .to_string(),
        )
    }
}

/// Classifies the given metadata as a configuration source, if it is one.
pub fn configuration_mark_of(metadata: &ClassMetadata) -> Option<ConfigurationMark> {
    if metadata
        .marker_value(CONFIGURATION_MARKER)
        .map(MarkerValue::truthy)
        .unwrap_or(false)
    {
        Some(ConfigurationMark::Full)
    } else if !metadata.factory_methods.is_empty() || !metadata.imports.is_empty() {
        Some(ConfigurationMark::Lite)
    } else {
        None
    }
}

/// Collaborator deciding whether a definition should enter configuration parsing and what its
/// declared processing order is.
#[cfg_attr(test, automock)]
pub trait ConfigurationCandidateClassifier {
    /// Classifies the definition, or returns `None` when it is not a configuration candidate.
    fn configuration_mark(&self, definition: &BeanDefinition) -> Option<ConfigurationMark>;

    /// Explicit ordering value of the candidate; lower values are processed first. Candidates
    /// without an order sort last.
    fn declared_order(&self, definition: &BeanDefinition) -> i64;

    fn is_configuration_candidate(&self, definition: &BeanDefinition) -> bool {
        self.configuration_mark(definition).is_some()
    }
}

/// Default [ConfigurationCandidateClassifier] classifying from metadata markers.
pub struct MarkerClassifier {
    metadata_loader: Arc<dyn MetadataLoader>,
}

impl MarkerClassifier {
    pub fn new(metadata_loader: Arc<dyn MetadataLoader>) -> Self {
        Self { metadata_loader }
    }
}

impl ConfigurationCandidateClassifier for MarkerClassifier {
    fn configuration_mark(&self, definition: &BeanDefinition) -> Option<ConfigurationMark> {
        // classes without loadable metadata cannot be configuration sources
        let metadata = self.metadata_loader.load(&definition.class).ok()?;
        configuration_mark_of(&metadata)
    }

    fn declared_order(&self, definition: &BeanDefinition) -> i64 {
        if let Some(AttributeValue::Int(order)) = definition.attribute(ORDER_ATTRIBUTE) {
            return *order;
        }

        self.metadata_loader
            .load(&definition.class)
            .ok()
            .and_then(|metadata| match metadata.marker_value(ORDER_MARKER) {
                Some(MarkerValue::Int(order)) => Some(*order),
                _ => None,
            })
            .unwrap_or(i64::MAX)
    }
}

/// One discovered configuration source: its metadata, the name of the definition it was
/// discovered from (absent for import-discovered sources), and the class which imported it.
/// Identity, equality and hashing are keyed solely by the class id.
#[derive(Clone, Debug)]
pub struct ConfigurationClass {
    metadata: ClassMetadata,
    bean_name: Option<String>,
    imported_by: Option<ClassId>,
}

impl ConfigurationClass {
    /// Creates a model for a source discovered from an existing registry definition.
    pub fn from_candidate(metadata: ClassMetadata, bean_name: String) -> Self {
        Self {
            metadata,
            bean_name: Some(bean_name),
            imported_by: None,
        }
    }

    /// Creates a model for a source discovered through an import declaration.
    pub fn imported(metadata: ClassMetadata, imported_by: ClassId) -> Self {
        Self {
            metadata,
            bean_name: None,
            imported_by: Some(imported_by),
        }
    }

    #[inline]
    pub fn class(&self) -> &ClassId {
        &self.metadata.class
    }

    #[inline]
    pub fn metadata(&self) -> &ClassMetadata {
        &self.metadata
    }

    #[inline]
    pub fn bean_name(&self) -> Option<&str> {
        self.bean_name.as_deref()
    }

    #[inline]
    pub fn imported_by(&self) -> Option<&ClassId> {
        self.imported_by.as_ref()
    }

    #[inline]
    pub fn factory_methods(&self) -> &[FactoryMethodMetadata] {
        &self.metadata.factory_methods
    }

    /// Whether this source must be substituted with an enhanced variant because its factory
    /// methods are routed through the container.
    pub fn requires_enhancement(&self) -> bool {
        matches!(configuration_mark_of(&self.metadata), Some(ConfigurationMark::Full))
    }
}

impl PartialEq for ConfigurationClass {
    fn eq(&self, other: &Self) -> bool {
        self.class() == other.class()
    }
}

impl Eq for ConfigurationClass {}

impl Hash for ConfigurationClass {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.class().hash(state);
    }
}

/// Append-only mapping from imported class to the metadata of its importing class, consulted
/// after registration completes to serve import-aware callbacks.
#[derive(Clone, Debug, Default)]
pub struct ImportRegistry {
    imports: FxHashMap<ClassId, ClassMetadata>,
}

impl ImportRegistry {
    /// Records an import. The first importer of a class wins; later re-imports are no-ops.
    pub fn register_import(&mut self, imported: ClassId, importer: ClassMetadata) {
        self.imports.entry(imported).or_insert(importer);
    }

    /// Returns the metadata of the class which imported the given class.
    pub fn importing_class_for(&self, imported: &ClassId) -> Option<&ClassMetadata> {
        self.imports.get(imported)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.imports.is_empty()
    }
}
