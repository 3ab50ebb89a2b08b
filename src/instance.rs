//! Capability surfaces of constructed bean instances. The instantiation machinery itself lives
//! outside this crate; these traits define the contract through which post-construction hooks
//! interact with instances without reflective type checks.

use crate::enhancer::EnhancedConfiguration;
use crate::metadata::{ClassId, ClassMetadata};
use std::any::Any;
use std::sync::Arc;

/// A constructed bean instance as seen by [InstancePostProcessor]s. Capability accessors replace
/// reflective downcasts; implementations override the ones they support.
pub trait BeanInstance: Any {
    /// Original (non-enhanced) construction class of this instance.
    fn original_class(&self) -> &ClassId;

    fn as_enhanced_configuration(&mut self) -> Option<&mut dyn EnhancedConfiguration> {
        None
    }

    fn as_import_aware(&mut self) -> Option<&mut dyn ImportAware> {
        None
    }
}

/// Implemented by configuration instances interested in the metadata of the class which imported
/// them.
pub trait ImportAware {
    fn set_import_metadata(&mut self, importer: &ClassMetadata);
}

/// Extension hook invoked by the instantiation machinery around instance creation. Hooks are
/// appended to a registry's extension chain and called in registration order.
pub trait InstancePostProcessor {
    /// Called before property population of the given instance.
    fn post_process_properties(&self, bean: &mut dyn BeanInstance, name: &str);

    /// Called after property population, before initialization callbacks.
    fn post_process_before_initialization(&self, bean: &mut dyn BeanInstance, name: &str);
}

pub type InstancePostProcessorPtr = Arc<dyn InstancePostProcessor + Send + Sync>;
