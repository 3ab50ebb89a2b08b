//! Expansion of seed configuration candidates into a complete, deduplicated model of
//! configuration classes.

use crate::config::{ConfigurationClass, ImportRegistry};
use crate::definition::BeanDefinitionHolder;
use crate::error::ConfigurationError;
use crate::metadata::{ClassId, MetadataLoader};
use crate::problem::{Problem, ProblemReporter};
use fxhash::FxHashSet;
use tracing::{debug, trace};

/// Parser expanding candidate sources and their imports recursively. The "already parsed" set is
/// keyed by class identity, which both deduplicates re-imports and breaks import cycles: an
/// import of a source that is already parsed or currently being parsed is a no-op re-reference.
/// An explicit candidate for an already imported class upgrades the stored model with its
/// declared bean name instead.
pub struct ConfigurationClassParser<'a> {
    metadata_loader: &'a dyn MetadataLoader,
    problem_reporter: &'a dyn ProblemReporter,
    configuration_classes: Vec<ConfigurationClass>,
    parsed: FxHashSet<ClassId>,
    import_registry: ImportRegistry,
}

impl<'a> ConfigurationClassParser<'a> {
    pub fn new(
        metadata_loader: &'a dyn MetadataLoader,
        problem_reporter: &'a dyn ProblemReporter,
    ) -> Self {
        Self {
            metadata_loader,
            problem_reporter,
            configuration_classes: Default::default(),
            parsed: Default::default(),
            import_registry: Default::default(),
        }
    }

    /// Parses the given candidates and everything they import, merging the result into the model
    /// accumulated over previous calls.
    pub fn parse(&mut self, candidates: &[BeanDefinitionHolder]) -> Result<(), ConfigurationError> {
        for holder in candidates {
            let metadata = self.metadata_loader.load(&holder.definition.class)?;
            self.process_configuration_class(ConfigurationClass::from_candidate(
                metadata,
                holder.name.clone(),
            ))?;
        }

        Ok(())
    }

    fn process_configuration_class(
        &mut self,
        configuration_class: ConfigurationClass,
    ) -> Result<(), ConfigurationError> {
        if !self.parsed.insert(configuration_class.class().clone()) {
            if configuration_class.bean_name().is_none() {
                trace!(
                    "Ignoring re-reference to already parsed configuration class: {}",
                    configuration_class.class()
                );
                return Ok(());
            }

            // an explicit candidate replaces a previously imported model of the same class; the
            // reader must see the declared bean name instead of synthesizing a self-definition
            if let Some(existing) = self
                .configuration_classes
                .iter_mut()
                .find(|existing| existing.class() == configuration_class.class())
            {
                if existing.bean_name().is_none() {
                    debug!(
                        "Replacing imported configuration class with explicit candidate: {}",
                        configuration_class.class()
                    );
                    *existing = configuration_class;
                }
            }
            return Ok(());
        }

        debug!("Parsing configuration class: {}", configuration_class.class());

        let importer_metadata = configuration_class.metadata().clone();
        self.configuration_classes.push(configuration_class);

        for import in &importer_metadata.imports {
            self.import_registry
                .register_import(import.clone(), importer_metadata.clone());

            if self.parsed.contains(import) {
                continue;
            }

            let metadata = self.metadata_loader.load(import)?;
            self.process_configuration_class(ConfigurationClass::imported(
                metadata,
                importer_metadata.class.clone(),
            ))?;
        }

        Ok(())
    }

    /// Validates the accumulated model: sources requiring enhancement must not be structurally
    /// immutable. Problems go through the configured reporter, which decides whether to fail
    /// immediately or accumulate.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        for configuration_class in &self.configuration_classes {
            if configuration_class.requires_enhancement() && configuration_class.metadata().sealed {
                self.problem_reporter.report(Problem::new(
                    "sealed configuration class cannot be substituted with an enhanced variant"
                        .to_string(),
                    configuration_class.class().clone(),
                ))?;
            }
        }

        self.problem_reporter.finish()
    }

    /// All configuration classes parsed so far, in discovery order.
    #[inline]
    pub fn configuration_classes(&self) -> &[ConfigurationClass] {
        &self.configuration_classes
    }

    #[inline]
    pub fn import_registry(&self) -> &ImportRegistry {
        &self.import_registry
    }
}
