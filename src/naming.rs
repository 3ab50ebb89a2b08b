//! Naming strategies for definitions derived during configuration discovery.

use crate::definition::BeanDefinition;
#[cfg(test)]
use mockall::automock;

/// Strategy generating registry names for definitions which were not declared with one.
#[cfg_attr(test, automock)]
pub trait BeanNameGenerator {
    fn generate_name(&self, definition: &BeanDefinition) -> String;
}

/// Generates short names from the last segment of the class id, converted to snake case.
/// Selectable through the processor builder when qualified names are too unwieldy; derived
/// names from unrelated modules may collide, which registration reports as a duplicate.
#[derive(Default, Copy, Clone, Eq, PartialEq, Debug)]
pub struct ShortNameGenerator;

impl BeanNameGenerator for ShortNameGenerator {
    fn generate_name(&self, definition: &BeanDefinition) -> String {
        let id = definition.class.as_str();
        let short_name = id
            .rsplit("::")
            .next()
            .and_then(|segment| segment.rsplit('.').next())
            .unwrap_or(id);
        to_snake_case(short_name)
    }
}

/// Generates unique fully qualified names from the whole class id. Used for import-discovered
/// configuration classes, where short names from unrelated modules could collide.
#[derive(Default, Copy, Clone, Eq, PartialEq, Debug)]
pub struct QualifiedNameGenerator;

impl BeanNameGenerator for QualifiedNameGenerator {
    fn generate_name(&self, definition: &BeanDefinition) -> String {
        definition.class.as_str().to_string()
    }
}

fn to_snake_case(name: &str) -> String {
    let mut result = String::with_capacity(name.len());
    for (index, character) in name.chars().enumerate() {
        if character.is_uppercase() {
            if index > 0 {
                result.push('_');
            }
            result.extend(character.to_lowercase());
        } else {
            result.push(character);
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use crate::definition::BeanDefinition;
    use crate::metadata::ClassId;
    use crate::naming::{BeanNameGenerator, QualifiedNameGenerator, ShortNameGenerator};

    #[test]
    fn should_generate_short_snake_case_name() {
        let definition = BeanDefinition::new(ClassId::new("demo::config::AppConfig"));
        assert_eq!(
            ShortNameGenerator.generate_name(&definition),
            "app_config".to_string()
        );
    }

    #[test]
    fn should_generate_short_name_from_dotted_id() {
        let definition = BeanDefinition::new(ClassId::new("demo.config.AppConfig"));
        assert_eq!(
            ShortNameGenerator.generate_name(&definition),
            "app_config".to_string()
        );
    }

    #[test]
    fn should_generate_qualified_name() {
        let definition = BeanDefinition::new(ClassId::new("demo::config::AppConfig"));
        assert_eq!(
            QualifiedNameGenerator.generate_name(&definition),
            "demo::config::AppConfig".to_string()
        );
    }
}
