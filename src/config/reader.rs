//! Conversion of parsed configuration classes into concrete bean definitions.

use crate::config::{configuration_mark_of, ConfigurationClass};
use crate::definition::{AttributeValue, BeanDefinition, ORDER_ATTRIBUTE};
use crate::error::RegistryError;
use crate::metadata::{ClassId, FactoryMethodMetadata, MarkerValue, ORDER_MARKER};
use crate::naming::BeanNameGenerator;
use crate::registry::BeanDefinitionRegistry;
use fxhash::{FxHashMap, FxHashSet};
use tracing::{debug, trace};

/// Reader registering definitions for parsed configuration classes. Registration order per
/// source: its own self-definition when import-discovered, then its imported sources depth-first
/// in import order, then its factory-method definitions in declaration order.
///
/// One reader instance is reused across all passes of a discovery loop; deduplication of whole
/// sources across passes is driven by the orchestrator's bookkeeping, the internal set only
/// prevents revisiting a source within the pass it was handed over in.
pub struct ConfigurationBeanDefinitionReader<'a> {
    import_name_generator: &'a dyn BeanNameGenerator,
    loaded: FxHashSet<ClassId>,
}

impl<'a> ConfigurationBeanDefinitionReader<'a> {
    pub fn new(import_name_generator: &'a dyn BeanNameGenerator) -> Self {
        Self {
            import_name_generator,
            loaded: Default::default(),
        }
    }

    /// Registers definitions for all given configuration classes.
    pub fn load_bean_definitions(
        &mut self,
        configuration_classes: &[ConfigurationClass],
        registry: &mut dyn BeanDefinitionRegistry,
    ) -> Result<(), RegistryError> {
        let by_class: FxHashMap<&ClassId, &ConfigurationClass> = configuration_classes
            .iter()
            .map(|class| (class.class(), class))
            .collect();

        for configuration_class in configuration_classes {
            self.load_class(configuration_class, &by_class, registry)?;
        }

        Ok(())
    }

    fn load_class(
        &mut self,
        configuration_class: &ConfigurationClass,
        by_class: &FxHashMap<&ClassId, &ConfigurationClass>,
        registry: &mut dyn BeanDefinitionRegistry,
    ) -> Result<(), RegistryError> {
        if !self.loaded.insert(configuration_class.class().clone()) {
            return Ok(());
        }

        let bean_name = match configuration_class.bean_name() {
            Some(name) => name.to_string(),
            None => self.register_configuration_class(configuration_class, registry)?,
        };

        for import in &configuration_class.metadata().imports {
            if let Some(imported) = by_class.get(import) {
                self.load_class(imported, by_class, registry)?;
            }
        }

        for method in configuration_class.factory_methods() {
            Self::register_factory_method(&bean_name, configuration_class, method, registry)?;
        }

        Ok(())
    }

    /// Registers the self-definition of an import-discovered configuration class and returns its
    /// name.
    fn register_configuration_class(
        &self,
        configuration_class: &ConfigurationClass,
        registry: &mut dyn BeanDefinitionRegistry,
    ) -> Result<String, RegistryError> {
        let metadata = configuration_class.metadata();
        let mut definition = BeanDefinition::new(metadata.class.clone());

        if let Some(mark) = configuration_mark_of(metadata) {
            definition.set_attribute(
                crate::definition::CONFIGURATION_CLASS_ATTRIBUTE,
                mark.attribute_value(),
            );
        }
        if let Some(MarkerValue::Int(order)) = metadata.marker_value(ORDER_MARKER) {
            definition.set_attribute(ORDER_ATTRIBUTE, AttributeValue::Int(*order));
        }

        let bean_name = self.import_name_generator.generate_name(&definition);

        if registry.contains_definition(&bean_name) {
            if registry.definition(&bean_name)?.class == metadata.class {
                trace!("Imported configuration class already registered: {bean_name}");
                return Ok(bean_name);
            }

            // an unrelated source derived the same name
            return Err(RegistryError::DuplicateDefinition(bean_name));
        }

        debug!(
            "Registering imported configuration class '{}' as '{bean_name}'",
            metadata.class
        );
        registry.register_definition(&bean_name, definition)?;
        Ok(bean_name)
    }

    fn register_factory_method(
        factory_bean: &str,
        configuration_class: &ConfigurationClass,
        method: &FactoryMethodMetadata,
        registry: &mut dyn BeanDefinitionRegistry,
    ) -> Result<(), RegistryError> {
        let class = method
            .return_type
            .clone()
            .unwrap_or_else(|| configuration_class.class().clone());

        let mut definition = BeanDefinition::new(class);
        definition.factory_bean = Some(factory_bean.to_string());
        definition.factory_method = Some(method.name.clone());

        trace!(
            "Registering factory method '{}' of '{}'",
            method.name,
            configuration_class.class()
        );
        registry.register_definition(&method.name, definition)
    }
}
