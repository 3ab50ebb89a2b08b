use crate::metadata::ClassId;
use crate::problem::Problem;
use crate::registry::RegistryId;
use thiserror::Error;

/// Errors related to bean definition registries.
#[derive(Error, Clone, Eq, PartialEq, Debug)]
pub enum RegistryError {
    #[error("Attempted to register a duplicate bean definition with name: {0}")]
    DuplicateDefinition(String),
    #[error("Cannot find bean definition with name: {0}")]
    DefinitionNotFound(String),
}

/// Errors related to dependency resolution and lazy resolution proxies.
#[derive(Error, Clone, Eq, PartialEq, Debug)]
pub enum ResolutionError {
    #[error("No candidate available for lazily resolved dependency of type: {0}")]
    NoCandidate(ClassId),
    #[error("Lazy resolution requires binding to a registry capable of on-demand resolution")]
    UnsupportedRegistry,
}

/// Errors related to configuration class discovery and validation.
#[derive(Error, Clone, Eq, PartialEq, Debug)]
pub enum ConfigurationError {
    #[error("Cannot load metadata for configuration class: {0}")]
    MetadataUnavailable(ClassId),
    #[error("Illegal configuration class {class}: {message}")]
    IllegalConfiguration { class: ClassId, message: String },
    #[error("Found {} problem(s) while validating configuration classes", .0.len())]
    Problems(Vec<Problem>),
}

/// Errors surfaced by the configuration post-processor entry points.
#[derive(Error, Clone, Eq, PartialEq, Debug)]
pub enum ProcessorError {
    #[error("Bean definition discovery was already performed against registry {0:?}")]
    RegistryAlreadyProcessed(RegistryId),
    #[error("Configuration class enhancement was already performed against factory {0:?}")]
    FactoryAlreadyProcessed(RegistryId),
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
}
