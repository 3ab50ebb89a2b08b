//! Substitution of fully-processed configuration classes with enhanced variants which route
//! their factory methods through the container.

use crate::error::ConfigurationError;
use crate::lazy::OnDemandResolverPtr;
use crate::metadata::{ClassId, ClassMetadata};
use fxhash::FxHashMap;
use tracing::debug;

/// Suffix distinguishing an enhanced class identity from its original.
pub const ENHANCED_CLASS_SUFFIX: &str = "$enhanced";

/// Description of an enhanced configuration class: a distinct class identity plus an
/// interception table mapping each factory method to the bean it must be routed through when
/// invoked on the enhanced instance.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct EnhancedClass {
    original: ClassId,
    class: ClassId,
    interceptors: FxHashMap<String, String>,
}

impl EnhancedClass {
    /// Identity of the class the variant was derived from.
    pub fn original(&self) -> &ClassId {
        &self.original
    }

    /// Identity of the enhanced variant.
    pub fn class(&self) -> &ClassId {
        &self.class
    }

    /// Returns the bean name a call to the given factory method resolves to, or `None` for
    /// methods which are not intercepted.
    pub fn intercepted_bean(&self, method: &str) -> Option<&str> {
        self.interceptors.get(method).map(String::as_str)
    }

    pub fn interceptor_count(&self) -> usize {
        self.interceptors.len()
    }
}

/// Instance-side capability of enhanced configuration classes: the container hands itself over
/// right after instantiation so that intercepted factory methods can delegate to it.
pub trait EnhancedConfiguration {
    fn set_bean_factory(&mut self, factory: OnDemandResolverPtr);
}

/// Produces [EnhancedClass] variants for configuration classes, one per original class.
/// Enhancement is idempotent: enhancing an already enhanced identity returns the existing
/// variant instead of stacking suffixes.
#[derive(Debug, Default)]
pub struct ConfigurationClassEnhancer {
    enhanced: FxHashMap<ClassId, EnhancedClass>,
}

impl ConfigurationClassEnhancer {
    /// Returns the enhanced variant for the given class metadata, creating it on first use.
    /// Sealed classes cannot be enhanced.
    pub fn enhance(&mut self, metadata: &ClassMetadata) -> Result<&EnhancedClass, ConfigurationError> {
        if metadata.sealed {
            return Err(ConfigurationError::IllegalConfiguration {
                class: metadata.class.clone(),
                message: "sealed classes cannot be enhanced".to_string(),
            });
        }

        let original = Self::original_of(&metadata.class);
        Ok(self.enhanced.entry(original.clone()).or_insert_with(|| {
            let class = ClassId::new(format!("{original}{ENHANCED_CLASS_SUFFIX}"));
            debug!("Enhancing configuration class '{original}' as '{class}'");

            EnhancedClass {
                original,
                class,
                interceptors: metadata
                    .factory_methods
                    .iter()
                    .map(|method| (method.name.clone(), method.name.clone()))
                    .collect(),
            }
        }))
    }

    /// Returns the variant previously created for the given identity, enhanced or original.
    pub fn enhanced_class(&self, class: &ClassId) -> Option<&EnhancedClass> {
        self.enhanced.get(&Self::original_of(class))
    }

    fn original_of(class: &ClassId) -> ClassId {
        match class.as_str().strip_suffix(ENHANCED_CLASS_SUFFIX) {
            Some(original) => ClassId::new(original),
            None => class.clone(),
        }
    }
}
