//! Bean definitions are declarative records describing how to construct a managed object,
//! without yet constructing it. They are owned by a
//! [registry](crate::registry::BeanDefinitionRegistry) for their whole lifetime and mutated in
//! place by the configuration reader and enhancer.

use crate::metadata::ClassId;
use derive_more::Constructor;
use fxhash::FxHashMap;

/// Name of the scope holding one shared instance per container.
pub const SINGLETON: &str = "SINGLETON";

/// Name of the scope creating a new instance on each request.
pub const PROTOTYPE: &str = "PROTOTYPE";

/// Attribute recording how a definition was classified during configuration discovery. Holds
/// [CONFIGURATION_CLASS_FULL] or [CONFIGURATION_CLASS_LITE].
pub const CONFIGURATION_CLASS_ATTRIBUTE: &str = "beanwire.configuration_class";

/// A fully processed configuration class whose factory methods are routed through the container
/// and which therefore requires enhancement.
pub const CONFIGURATION_CLASS_FULL: &str = "full";

/// A lightweight configuration class with no inter-method dependencies; never enhanced.
pub const CONFIGURATION_CLASS_LITE: &str = "lite";

/// Attribute carrying the declared ordering value of a configuration candidate.
pub const ORDER_ATTRIBUTE: &str = "beanwire.order";

/// Attribute telling downstream instantiation to keep using the original class for capability
/// checks after the construction class has been substituted with an enhanced variant.
pub const PRESERVE_TARGET_CLASS_ATTRIBUTE: &str = "beanwire.preserve_target_class";

/// Attribute narrowing a definition to qualified injection points.
pub const QUALIFIER_ATTRIBUTE: &str = "beanwire.qualifier";

/// Value of a named configuration attribute on a [BeanDefinition].
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum AttributeValue {
    Flag(bool),
    Int(i64),
    Text(String),
}

/// Definition of a bean registered in a definition registry.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct BeanDefinition {
    /// Construction class, substituted with an enhanced variant for full configuration classes.
    pub class: ClassId,

    /// Scope tag deciding instance reuse; [SINGLETON] by default.
    pub scope: String,

    /// Whether this definition may be picked when autowiring dependencies of matching type.
    pub autowire_candidate: bool,

    /// Name of the configuration bean declaring the factory method this definition derives from.
    pub factory_bean: Option<String>,

    /// Name of the factory method this definition derives from.
    pub factory_method: Option<String>,

    attributes: FxHashMap<String, AttributeValue>,
}

impl BeanDefinition {
    pub fn new(class: ClassId) -> Self {
        Self {
            class,
            scope: SINGLETON.to_string(),
            autowire_candidate: true,
            factory_bean: None,
            factory_method: None,
            attributes: Default::default(),
        }
    }

    pub fn with_attribute<T: Into<String>>(mut self, name: T, value: AttributeValue) -> Self {
        self.set_attribute(name, value);
        self
    }

    pub fn set_attribute<T: Into<String>>(&mut self, name: T, value: AttributeValue) {
        self.attributes.insert(name.into(), value);
    }

    #[inline]
    pub fn attribute(&self, name: &str) -> Option<&AttributeValue> {
        self.attributes.get(name)
    }

    #[inline]
    pub fn has_attribute(&self, name: &str) -> bool {
        self.attributes.contains_key(name)
    }

    /// Checks whether this definition was classified as a fully processed configuration class.
    pub fn is_full_configuration(&self) -> bool {
        matches!(
            self.attribute(CONFIGURATION_CLASS_ATTRIBUTE),
            Some(AttributeValue::Text(mark)) if mark == CONFIGURATION_CLASS_FULL
        )
    }
}

/// A [BeanDefinition] together with the name it is registered under.
#[derive(Clone, Debug, Eq, PartialEq, Constructor)]
pub struct BeanDefinitionHolder {
    pub name: String,
    pub definition: BeanDefinition,
}
