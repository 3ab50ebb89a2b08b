//! Configuration-class processing for dependency injection containers.
//!
//! Containers start from a seed set of registered bean definitions. Some of those definitions
//! point at *configuration classes*: classes which declare further beans through factory methods
//! and pull in other configuration classes through imports. This crate discovers such classes,
//! expands them and their imports to a fixed point, registers every definition they declare, and
//! substitutes fully-processed classes with enhanced variants whose factory methods are routed
//! through the container.
//!
//! Class structure is consumed as explicit [metadata](metadata::ClassMetadata) records supplied
//! by a [MetadataLoader](metadata::MetadataLoader), so the discovery core stays independent of
//! how configuration is actually declared.
//!
//! ```rust
//! use beanwire::definition::BeanDefinition;
//! use beanwire::metadata::{
//!     ClassId, ClassMetadata, FactoryMethodMetadata, MarkerValue, StaticMetadataLoader,
//!     CONFIGURATION_MARKER,
//! };
//! use beanwire::processor::ConfigurationPostProcessorBuilder;
//! use beanwire::registry::{BeanDefinitionRegistry, DefaultBeanDefinitionRegistry};
//! use std::sync::Arc;
//!
//! let metadata_loader = StaticMetadataLoader::default().with_class(
//!     ClassMetadata::new(ClassId::new("app::Config"))
//!         .with_marker(CONFIGURATION_MARKER, MarkerValue::Flag(true))
//!         .with_factory_method(FactoryMethodMetadata::new("database")),
//! );
//!
//! let mut registry = DefaultBeanDefinitionRegistry::default();
//! registry.register_definition("config", BeanDefinition::new(ClassId::new("app::Config")))?;
//!
//! let mut processor = ConfigurationPostProcessorBuilder::new(Arc::new(metadata_loader)).build();
//! processor.post_process_registry(&mut registry)?;
//! processor.post_process_factory(&mut registry)?;
//!
//! assert!(registry.contains_definition("database"));
//! # Ok::<(), beanwire::error::ProcessorError>(())
//! ```

pub mod config;
pub mod definition;
pub mod enhancer;
pub mod error;
pub mod instance;
pub mod lazy;
pub mod metadata;
pub mod naming;
pub mod problem;
pub mod processor;
pub mod registry;
pub mod resolver;
