//! Orchestration of configuration discovery: candidate selection, fixed-point parsing and
//! registration, enhanced-class substitution, and installation of the import-aware instance
//! hook.

use crate::config::parser::ConfigurationClassParser;
use crate::config::reader::ConfigurationBeanDefinitionReader;
use crate::config::{
    ConfigurationCandidateClassifier, ImportRegistry, MarkerClassifier,
    IMPORT_REGISTRY_BEAN_NAME,
};
use crate::definition::{
    BeanDefinitionHolder, AttributeValue, CONFIGURATION_CLASS_ATTRIBUTE,
    PRESERVE_TARGET_CLASS_ATTRIBUTE,
};
use crate::enhancer::ConfigurationClassEnhancer;
use crate::error::ProcessorError;
use crate::instance::{BeanInstance, InstancePostProcessor};
use crate::lazy::OnDemandResolverPtr;
use crate::metadata::MetadataLoader;
use crate::naming::{BeanNameGenerator, QualifiedNameGenerator};
use crate::problem::{FailFastProblemReporter, ProblemReporter};
use crate::registry::{BeanDefinitionRegistry, RegistryId};
use derivative::Derivative;
use fxhash::FxHashSet;
use itertools::Itertools;
use std::sync::Arc;
use tracing::{debug, info, trace};

/// Builder for [ConfigurationPostProcessor] with sensible defaults: candidates are classified
/// from metadata markers, problems fail fast, and import-discovered classes are named by their
/// qualified class id.
#[derive(Derivative)]
#[derivative(Debug)]
pub struct ConfigurationPostProcessorBuilder {
    #[derivative(Debug = "ignore")]
    metadata_loader: Arc<dyn MetadataLoader>,
    #[derivative(Debug = "ignore")]
    problem_reporter: Box<dyn ProblemReporter>,
    #[derivative(Debug = "ignore")]
    classifier: Option<Box<dyn ConfigurationCandidateClassifier>>,
    #[derivative(Debug = "ignore")]
    import_name_generator: Box<dyn BeanNameGenerator>,
    #[derivative(Debug = "ignore")]
    on_demand_resolver: Option<OnDemandResolverPtr>,
}

impl ConfigurationPostProcessorBuilder {
    pub fn new(metadata_loader: Arc<dyn MetadataLoader>) -> Self {
        Self {
            metadata_loader,
            problem_reporter: Box::new(FailFastProblemReporter),
            classifier: None,
            import_name_generator: Box::new(QualifiedNameGenerator),
            on_demand_resolver: None,
        }
    }

    pub fn with_problem_reporter(mut self, problem_reporter: Box<dyn ProblemReporter>) -> Self {
        self.problem_reporter = problem_reporter;
        self
    }

    pub fn with_classifier(mut self, classifier: Box<dyn ConfigurationCandidateClassifier>) -> Self {
        self.classifier = Some(classifier);
        self
    }

    pub fn with_import_name_generator(mut self, generator: Box<dyn BeanNameGenerator>) -> Self {
        self.import_name_generator = generator;
        self
    }

    /// Container back-reference handed to enhanced configuration instances after construction.
    pub fn with_on_demand_resolver(mut self, resolver: OnDemandResolverPtr) -> Self {
        self.on_demand_resolver = Some(resolver);
        self
    }

    pub fn build(self) -> ConfigurationPostProcessor {
        let classifier = self
            .classifier
            .unwrap_or_else(|| Box::new(MarkerClassifier::new(self.metadata_loader.clone())));

        ConfigurationPostProcessor {
            metadata_loader: self.metadata_loader,
            problem_reporter: self.problem_reporter,
            classifier,
            import_name_generator: self.import_name_generator,
            on_demand_resolver: self.on_demand_resolver,
            enhancer: ConfigurationClassEnhancer::default(),
            registries_processed: Default::default(),
            factories_processed: Default::default(),
        }
    }
}

/// Registry post-processor discovering configuration classes among registered definitions,
/// registering the definitions they declare, and substituting fully-processed classes with
/// enhanced variants.
///
/// Each registry passes through here at most once per phase; repeated invocations on the same
/// registry are errors rather than silent no-ops.
#[derive(Derivative)]
#[derivative(Debug)]
pub struct ConfigurationPostProcessor {
    #[derivative(Debug = "ignore")]
    metadata_loader: Arc<dyn MetadataLoader>,
    #[derivative(Debug = "ignore")]
    problem_reporter: Box<dyn ProblemReporter>,
    #[derivative(Debug = "ignore")]
    classifier: Box<dyn ConfigurationCandidateClassifier>,
    #[derivative(Debug = "ignore")]
    import_name_generator: Box<dyn BeanNameGenerator>,
    #[derivative(Debug = "ignore")]
    on_demand_resolver: Option<OnDemandResolverPtr>,
    enhancer: ConfigurationClassEnhancer,
    registries_processed: FxHashSet<RegistryId>,
    factories_processed: FxHashSet<RegistryId>,
}

impl ConfigurationPostProcessor {
    /// Definition-registration phase: discovers configuration classes in the registry and
    /// registers every definition they declare.
    pub fn post_process_registry(
        &mut self,
        registry: &mut dyn BeanDefinitionRegistry,
    ) -> Result<(), ProcessorError> {
        let id = registry.id();
        if self.registries_processed.contains(&id) {
            return Err(ProcessorError::RegistryAlreadyProcessed(id));
        }
        if self.factories_processed.contains(&id) {
            return Err(ProcessorError::FactoryAlreadyProcessed(id));
        }
        self.registries_processed.insert(id);

        self.process_config_definitions(registry)
    }

    /// Finalization phase: substitutes fully-processed configuration classes with enhanced
    /// variants and installs the import-aware instance hook. Runs the registration phase first
    /// if the registry skipped it.
    pub fn post_process_factory(
        &mut self,
        registry: &mut dyn BeanDefinitionRegistry,
    ) -> Result<(), ProcessorError> {
        let id = registry.id();
        if !self.factories_processed.insert(id) {
            return Err(ProcessorError::FactoryAlreadyProcessed(id));
        }

        if !self.registries_processed.contains(&id) {
            self.process_config_definitions(registry)?;
        }

        self.enhance_configuration_classes(registry)?;

        let import_registry = registry
            .singleton(IMPORT_REGISTRY_BEAN_NAME)
            .and_then(|singleton| singleton.downcast::<ImportRegistry>().ok())
            .unwrap_or_default();
        registry.add_instance_post_processor(Arc::new(ImportAwareInstancePostProcessor::new(
            import_registry,
            self.on_demand_resolver.clone(),
        )));

        Ok(())
    }

    /// Discovers, parses and registers configuration definitions to a fixed point: definitions
    /// registered by one pass may themselves be configuration candidates and are fed into the
    /// next pass until no new candidates appear.
    fn process_config_definitions(
        &self,
        registry: &mut dyn BeanDefinitionRegistry,
    ) -> Result<(), ProcessorError> {
        let names = registry.definition_names();
        let mut seen: FxHashSet<String> = names.iter().cloned().collect();
        let mut candidates = self.select_candidates(registry, names)?;
        if candidates.is_empty() {
            trace!("No configuration candidates found in registry {:?}", registry.id());
            return Ok(());
        }

        let mut parser =
            ConfigurationClassParser::new(&*self.metadata_loader, &*self.problem_reporter);
        let mut reader = ConfigurationBeanDefinitionReader::new(&*self.import_name_generator);
        let mut read_count = 0;

        while !candidates.is_empty() {
            debug!("Processing {} configuration candidate(s)", candidates.len());

            parser.parse(&candidates)?;
            parser.validate()?;

            let configuration_classes = parser.configuration_classes();
            reader.load_bean_definitions(&configuration_classes[read_count..], registry)?;
            read_count = configuration_classes.len();

            // definitions registered by this pass may be candidates themselves
            let new_names: Vec<_> = registry
                .definition_names()
                .into_iter()
                .filter(|name| seen.insert(name.clone()))
                .collect();
            candidates = self.select_candidates(registry, new_names)?;
        }

        info!(
            "Processed {read_count} configuration class(es) for registry {:?}",
            registry.id()
        );

        if !registry.contains_singleton(IMPORT_REGISTRY_BEAN_NAME) {
            registry
                .register_singleton(IMPORT_REGISTRY_BEAN_NAME, Arc::new(parser.import_registry().clone()));
        }

        self.metadata_loader.clear_cache();
        Ok(())
    }

    /// Selects configuration candidates among the given definitions, tags them with their
    /// classification, and returns them sorted by declared order. Tagged definitions are skipped,
    /// a prior run already routed them through parsing.
    fn select_candidates(
        &self,
        registry: &mut dyn BeanDefinitionRegistry,
        names: Vec<String>,
    ) -> Result<Vec<BeanDefinitionHolder>, ProcessorError> {
        let mut candidates = vec![];
        for name in names {
            let definition = registry.definition(&name)?;
            if definition.has_attribute(CONFIGURATION_CLASS_ATTRIBUTE) {
                debug!("Definition '{name}' is already processed as a configuration class");
                continue;
            }
            // factory-method definitions carry their declaring class but are plain beans
            if definition.factory_method.is_some() {
                continue;
            }

            if let Some(mark) = self.classifier.configuration_mark(definition) {
                let order = self.classifier.declared_order(definition);
                let definition = registry.definition_mut(&name)?;
                definition.set_attribute(CONFIGURATION_CLASS_ATTRIBUTE, mark.attribute_value());
                candidates.push((order, BeanDefinitionHolder::new(name, definition.clone())));
            }
        }

        Ok(candidates
            .into_iter()
            .sorted_by_key(|(order, _)| *order)
            .map(|(_, holder)| holder)
            .collect())
    }

    /// Substitutes every fully-processed configuration definition with its enhanced variant.
    fn enhance_configuration_classes(
        &mut self,
        registry: &mut dyn BeanDefinitionRegistry,
    ) -> Result<(), ProcessorError> {
        for name in registry.definition_names() {
            if !registry.definition(&name)?.is_full_configuration() {
                continue;
            }

            let class = registry.definition(&name)?.class.clone();
            let metadata = self.metadata_loader.load(&class)?;
            let enhanced_class = self.enhancer.enhance(&metadata)?.class().clone();

            let definition = registry.definition_mut(&name)?;
            definition.set_attribute(PRESERVE_TARGET_CLASS_ATTRIBUTE, AttributeValue::Flag(true));
            if definition.class != enhanced_class {
                debug!(
                    "Replacing configuration class '{}' with enhanced variant '{enhanced_class}'",
                    definition.class
                );
                definition.class = enhanced_class;
            }
        }

        Ok(())
    }

    /// Enhanced variants created so far, for inspection by instantiation machinery.
    #[inline]
    pub fn enhancer(&self) -> &ConfigurationClassEnhancer {
        &self.enhancer
    }
}

/// Instance hook wiring constructed beans into the configuration machinery: enhanced
/// configuration instances receive the container back-reference, import-aware instances receive
/// the metadata of their importer.
#[derive(Derivative)]
#[derivative(Debug)]
pub struct ImportAwareInstancePostProcessor {
    import_registry: Arc<ImportRegistry>,
    #[derivative(Debug = "ignore")]
    factory: Option<OnDemandResolverPtr>,
}

impl ImportAwareInstancePostProcessor {
    pub fn new(import_registry: Arc<ImportRegistry>, factory: Option<OnDemandResolverPtr>) -> Self {
        Self {
            import_registry,
            factory,
        }
    }
}

impl InstancePostProcessor for ImportAwareInstancePostProcessor {
    fn post_process_properties(&self, bean: &mut dyn BeanInstance, _name: &str) {
        if let Some(factory) = &self.factory {
            if let Some(enhanced) = bean.as_enhanced_configuration() {
                enhanced.set_bean_factory(factory.clone());
            }
        }
    }

    fn post_process_before_initialization(&self, bean: &mut dyn BeanInstance, name: &str) {
        let class = bean.original_class().clone();
        if let Some(importer) = self.import_registry.importing_class_for(&class) {
            if let Some(import_aware) = bean.as_import_aware() {
                trace!("Supplying import metadata of '{}' to '{name}'", importer.class);
                import_aware.set_import_metadata(importer);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::config::{ImportRegistry, MockConfigurationCandidateClassifier};
    use crate::definition::{
        BeanDefinition, CONFIGURATION_CLASS_ATTRIBUTE, PRESERVE_TARGET_CLASS_ATTRIBUTE,
    };
    use crate::enhancer::{EnhancedConfiguration, ENHANCED_CLASS_SUFFIX};
    use crate::error::ProcessorError;
    use crate::instance::{BeanInstance, ImportAware, InstancePostProcessor};
    use crate::lazy::{MockOnDemandDependencyResolver, OnDemandResolverPtr};
    use crate::metadata::{
        ClassId, ClassMetadata, FactoryMethodMetadata, MarkerValue, StaticMetadataLoader,
        CONFIGURATION_MARKER,
    };
    use crate::processor::{ConfigurationPostProcessorBuilder, ImportAwareInstancePostProcessor};
    use crate::registry::{BeanDefinitionRegistry, DefaultBeanDefinitionRegistry};
    use std::sync::Arc;

    fn full_metadata(class: &str) -> ClassMetadata {
        ClassMetadata::new(ClassId::new(class))
            .with_marker(CONFIGURATION_MARKER, MarkerValue::Flag(true))
    }

    fn processor_for(loader: StaticMetadataLoader) -> super::ConfigurationPostProcessor {
        ConfigurationPostProcessorBuilder::new(Arc::new(loader)).build()
    }

    #[test]
    fn should_register_declared_definitions() {
        let loader = StaticMetadataLoader::default().with_class(
            full_metadata("test::App").with_factory_method(FactoryMethodMetadata::new("db")),
        );

        let mut registry = DefaultBeanDefinitionRegistry::default();
        registry
            .register_definition("app", BeanDefinition::new(ClassId::new("test::App")))
            .unwrap();

        let mut processor = processor_for(loader);
        processor.post_process_registry(&mut registry).unwrap();

        assert_eq!(registry.definition_names(), ["app", "db"]);
        assert!(registry
            .definition("app")
            .unwrap()
            .has_attribute(CONFIGURATION_CLASS_ATTRIBUTE));
    }

    #[test]
    fn should_reject_reprocessing_the_same_registry() {
        let mut registry = DefaultBeanDefinitionRegistry::default();
        let mut processor = processor_for(StaticMetadataLoader::default());

        processor.post_process_registry(&mut registry).unwrap();

        assert_eq!(
            processor.post_process_registry(&mut registry).unwrap_err(),
            ProcessorError::RegistryAlreadyProcessed(registry.id())
        );

        processor.post_process_factory(&mut registry).unwrap();

        assert_eq!(
            processor.post_process_factory(&mut registry).unwrap_err(),
            ProcessorError::FactoryAlreadyProcessed(registry.id())
        );
    }

    #[test]
    fn should_process_distinct_registries_independently() {
        let mut first = DefaultBeanDefinitionRegistry::default();
        let mut second = DefaultBeanDefinitionRegistry::default();
        let mut processor = processor_for(StaticMetadataLoader::default());

        processor.post_process_registry(&mut first).unwrap();
        processor.post_process_registry(&mut second).unwrap();
    }

    #[test]
    fn should_substitute_full_configuration_with_enhanced_variant() {
        let loader = StaticMetadataLoader::default().with_class(
            full_metadata("test::App").with_factory_method(FactoryMethodMetadata::new("db")),
        );

        let mut registry = DefaultBeanDefinitionRegistry::default();
        registry
            .register_definition("app", BeanDefinition::new(ClassId::new("test::App")))
            .unwrap();

        let mut processor = processor_for(loader);
        processor.post_process_registry(&mut registry).unwrap();
        processor.post_process_factory(&mut registry).unwrap();

        let definition = registry.definition("app").unwrap();
        assert_eq!(
            definition.class,
            ClassId::new(format!("test::App{ENHANCED_CLASS_SUFFIX}"))
        );
        assert!(definition.has_attribute(PRESERVE_TARGET_CLASS_ATTRIBUTE));

        // the factory-method bean itself is not a configuration class
        assert_eq!(
            registry.definition("db").unwrap().class,
            ClassId::new("test::App")
        );
    }

    #[test]
    fn should_tag_candidates_via_custom_classifier() {
        let mut classifier = MockConfigurationCandidateClassifier::new();
        classifier.expect_configuration_mark().returning(|_| None);

        let mut registry = DefaultBeanDefinitionRegistry::default();
        registry
            .register_definition("app", BeanDefinition::new(ClassId::new("test::App")))
            .unwrap();

        let mut processor =
            ConfigurationPostProcessorBuilder::new(Arc::new(StaticMetadataLoader::default()))
                .with_classifier(Box::new(classifier))
                .build();
        processor.post_process_registry(&mut registry).unwrap();

        assert!(!registry
            .definition("app")
            .unwrap()
            .has_attribute(CONFIGURATION_CLASS_ATTRIBUTE));
    }

    struct ConfigInstance {
        class: ClassId,
        factory_received: bool,
        importer: Option<ClassId>,
    }

    impl BeanInstance for ConfigInstance {
        fn original_class(&self) -> &ClassId {
            &self.class
        }

        fn as_enhanced_configuration(&mut self) -> Option<&mut dyn EnhancedConfiguration> {
            Some(self)
        }

        fn as_import_aware(&mut self) -> Option<&mut dyn ImportAware> {
            Some(self)
        }
    }

    impl EnhancedConfiguration for ConfigInstance {
        fn set_bean_factory(&mut self, _factory: OnDemandResolverPtr) {
            self.factory_received = true;
        }
    }

    impl ImportAware for ConfigInstance {
        fn set_import_metadata(&mut self, importer: &ClassMetadata) {
            self.importer = Some(importer.class.clone());
        }
    }

    #[test]
    fn should_wire_enhanced_and_import_aware_instances() {
        let mut import_registry = ImportRegistry::default();
        import_registry.register_import(ClassId::new("test::Db"), full_metadata("test::App"));

        let post_processor = ImportAwareInstancePostProcessor::new(
            Arc::new(import_registry),
            Some(Arc::new(MockOnDemandDependencyResolver::new())),
        );

        let mut instance = ConfigInstance {
            class: ClassId::new("test::Db"),
            factory_received: false,
            importer: None,
        };

        post_processor.post_process_properties(&mut instance, "db");
        post_processor.post_process_before_initialization(&mut instance, "db");

        assert!(instance.factory_received);
        assert_eq!(instance.importer, Some(ClassId::new("test::App")));
    }

    #[test]
    fn should_not_supply_import_metadata_to_non_imported_instances() {
        let post_processor =
            ImportAwareInstancePostProcessor::new(Arc::new(ImportRegistry::default()), None);

        let mut instance = ConfigInstance {
            class: ClassId::new("test::Db"),
            factory_received: false,
            importer: None,
        };

        post_processor.post_process_properties(&mut instance, "db");
        post_processor.post_process_before_initialization(&mut instance, "db");

        assert!(!instance.factory_received);
        assert!(instance.importer.is_none());
    }
}
