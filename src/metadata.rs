//! Class metadata support. Instead of inspecting types reflectively, the container consumes
//! [ClassMetadata] records populated ahead of time by a [MetadataLoader], which decouples the
//! discovery core from any particular source of declarative configuration.

use crate::error::ConfigurationError;
use fxhash::FxHashMap;
#[cfg(test)]
use mockall::automock;
use std::fmt::{Display, Formatter};
use std::sync::{Mutex, PoisonError};

/// Marker carried by classes which declare object construction recipes and should have their
/// factory methods routed through the container.
pub const CONFIGURATION_MARKER: &str = "configuration";

/// Marker holding the explicit ordering value of a configuration class.
pub const ORDER_MARKER: &str = "order";

/// Marker requesting deferred resolution of an injection point.
pub const LAZY_MARKER: &str = "lazy";

/// Marker narrowing candidate selection beyond the declared type.
pub const QUALIFIER_MARKER: &str = "qualifier";

/// Marker suggesting a literal default value for an injection point.
pub const VALUE_MARKER: &str = "value";

/// Opaque identity of a class or configuration source. All processing bookkeeping is keyed by
/// these ids, never by object identity.
#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct ClassId(String);

impl ClassId {
    pub fn new<T: Into<String>>(id: T) -> Self {
        Self(id.into())
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for ClassId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Value attached to a metadata marker.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum MarkerValue {
    Flag(bool),
    Int(i64),
    Text(String),
}

impl MarkerValue {
    /// Whether the value should be treated as enabling its marker.
    pub fn truthy(&self) -> bool {
        match self {
            MarkerValue::Flag(flag) => *flag,
            MarkerValue::Int(value) => *value != 0,
            MarkerValue::Text(text) => !text.is_empty(),
        }
    }
}

/// Metadata of a factory method declared by a configuration class, kept in declaration order
/// within [ClassMetadata].
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FactoryMethodMetadata {
    pub name: String,
    pub return_type: Option<ClassId>,
    pub markers: FxHashMap<String, MarkerValue>,
}

impl FactoryMethodMetadata {
    pub fn new<T: Into<String>>(name: T) -> Self {
        Self {
            name: name.into(),
            return_type: None,
            markers: Default::default(),
        }
    }

    pub fn with_return_type(mut self, return_type: ClassId) -> Self {
        self.return_type = Some(return_type);
        self
    }

    pub fn with_marker<T: Into<String>>(mut self, kind: T, value: MarkerValue) -> Self {
        self.markers.insert(kind.into(), value);
        self
    }

    #[inline]
    pub fn has_marker(&self, kind: &str) -> bool {
        self.markers.contains_key(kind)
    }

    #[inline]
    pub fn marker_value(&self, kind: &str) -> Option<&MarkerValue> {
        self.markers.get(kind)
    }
}

/// Pre-populated metadata of a single class: its markers, declared imports, and factory methods.
/// `sealed` classes are structurally immutable and cannot be substituted with an enhanced variant.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ClassMetadata {
    pub class: ClassId,
    pub markers: FxHashMap<String, MarkerValue>,
    pub imports: Vec<ClassId>,
    pub factory_methods: Vec<FactoryMethodMetadata>,
    pub sealed: bool,
}

impl ClassMetadata {
    pub fn new(class: ClassId) -> Self {
        Self {
            class,
            markers: Default::default(),
            imports: Default::default(),
            factory_methods: Default::default(),
            sealed: false,
        }
    }

    pub fn with_marker<T: Into<String>>(mut self, kind: T, value: MarkerValue) -> Self {
        self.markers.insert(kind.into(), value);
        self
    }

    pub fn with_import(mut self, import: ClassId) -> Self {
        self.imports.push(import);
        self
    }

    pub fn with_factory_method(mut self, method: FactoryMethodMetadata) -> Self {
        self.factory_methods.push(method);
        self
    }

    pub fn sealed(mut self) -> Self {
        self.sealed = true;
        self
    }

    #[inline]
    pub fn has_marker(&self, kind: &str) -> bool {
        self.markers.contains_key(kind)
    }

    #[inline]
    pub fn marker_value(&self, kind: &str) -> Option<&MarkerValue> {
        self.markers.get(kind)
    }
}

/// Collaborator supplying [ClassMetadata] on demand. Implementations may cache results for the
/// duration of one discovery pass; the cache is explicitly cleared when the pass completes.
#[cfg_attr(test, automock)]
pub trait MetadataLoader {
    /// Loads metadata for the given class.
    fn load(&self, class: &ClassId) -> Result<ClassMetadata, ConfigurationError>;

    /// Discards any cached metadata.
    fn clear_cache(&self);
}

/// [MetadataLoader] serving metadata registered up front. Primarily useful when all metadata is
/// generated ahead of time or in tests.
#[derive(Clone, Debug, Default)]
pub struct StaticMetadataLoader {
    classes: FxHashMap<ClassId, ClassMetadata>,
}

impl StaticMetadataLoader {
    pub fn with_class(mut self, metadata: ClassMetadata) -> Self {
        self.classes.insert(metadata.class.clone(), metadata);
        self
    }
}

impl MetadataLoader for StaticMetadataLoader {
    fn load(&self, class: &ClassId) -> Result<ClassMetadata, ConfigurationError> {
        self.classes
            .get(class)
            .cloned()
            .ok_or_else(|| ConfigurationError::MetadataUnavailable(class.clone()))
    }

    fn clear_cache(&self) {}
}

/// Caching decorator for another [MetadataLoader]. The cache lives for one discovery pass and is
/// dropped via [MetadataLoader::clear_cache].
pub struct CachingMetadataLoader {
    delegate: Box<dyn MetadataLoader>,
    cache: Mutex<FxHashMap<ClassId, ClassMetadata>>,
}

impl CachingMetadataLoader {
    pub fn new(delegate: Box<dyn MetadataLoader>) -> Self {
        Self {
            delegate,
            cache: Default::default(),
        }
    }
}

impl MetadataLoader for CachingMetadataLoader {
    fn load(&self, class: &ClassId) -> Result<ClassMetadata, ConfigurationError> {
        let mut cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(metadata) = cache.get(class) {
            return Ok(metadata.clone());
        }

        let metadata = self.delegate.load(class)?;
        cache.insert(class.clone(), metadata.clone());
        Ok(metadata)
    }

    fn clear_cache(&self) {
        self.cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        self.delegate.clear_cache();
    }
}

#[cfg(test)]
mod tests {
    use crate::error::ConfigurationError;
    use crate::metadata::{
        CachingMetadataLoader, ClassId, ClassMetadata, MarkerValue, MetadataLoader,
        MockMetadataLoader, StaticMetadataLoader, CONFIGURATION_MARKER,
    };
    use mockall::predicate::*;

    #[test]
    fn should_evaluate_marker_truthiness() {
        assert!(MarkerValue::Flag(true).truthy());
        assert!(!MarkerValue::Flag(false).truthy());
        assert!(MarkerValue::Int(1).truthy());
        assert!(!MarkerValue::Int(0).truthy());
        assert!(MarkerValue::Text("qualifier".to_string()).truthy());
        assert!(!MarkerValue::Text("".to_string()).truthy());
    }

    #[test]
    fn should_serve_registered_metadata() {
        let class = ClassId::new("test::Config");
        let loader = StaticMetadataLoader::default().with_class(
            ClassMetadata::new(class.clone())
                .with_marker(CONFIGURATION_MARKER, MarkerValue::Flag(true)),
        );

        let metadata = loader.load(&class).unwrap();
        assert!(metadata.has_marker(CONFIGURATION_MARKER));
    }

    #[test]
    fn should_report_missing_metadata() {
        let class = ClassId::new("test::Missing");
        let loader = StaticMetadataLoader::default();

        assert_eq!(
            loader.load(&class).unwrap_err(),
            ConfigurationError::MetadataUnavailable(class)
        );
    }

    #[test]
    fn should_cache_until_cleared() {
        let class = ClassId::new("test::Config");
        let metadata = ClassMetadata::new(class.clone());

        let mut delegate = MockMetadataLoader::new();
        delegate
            .expect_load()
            .with(eq(class.clone()))
            .times(2)
            .returning(move |_| Ok(metadata.clone()));
        delegate.expect_clear_cache().times(1).return_const(());

        let loader = CachingMetadataLoader::new(Box::new(delegate));
        loader.load(&class).unwrap();
        loader.load(&class).unwrap();

        loader.clear_cache();
        loader.load(&class).unwrap();
    }
}
