//! Proxies for deferred dependency resolution. A lazy resolution proxy stands in for a dependency
//! at injection time and performs a fresh resolution against the container on every use, which
//! lets it observe definitions registered after the injection point was populated.

use crate::error::ResolutionError;
use crate::metadata::{ClassId, MarkerValue, LAZY_MARKER};
use crate::resolver::{DependencyDescriptor, DependencyType};
use derivative::Derivative;
#[cfg(test)]
use mockall::automock;
use std::any::Any;
use std::sync::Arc;

/// Type-erased pointer to a resolved bean instance.
pub type BeanHandle = Arc<dyn Any + Send + Sync>;

/// Result of resolving a dependency descriptor against the container.
#[derive(Clone, Derivative)]
#[derivative(Debug)]
pub enum ResolvedValue {
    Instance(#[derivative(Debug = "ignore")] BeanHandle),
    Mapping(#[derivative(Debug = "ignore")] Vec<(String, BeanHandle)>),
    Sequence(#[derivative(Debug = "ignore")] Vec<BeanHandle>),
    Set(#[derivative(Debug = "ignore")] Vec<BeanHandle>),
}

impl ResolvedValue {
    /// Whether this value is an empty collection fallback.
    pub fn is_empty_collection(&self) -> bool {
        match self {
            ResolvedValue::Instance(_) => false,
            ResolvedValue::Mapping(entries) => entries.is_empty(),
            ResolvedValue::Sequence(values) | ResolvedValue::Set(values) => values.is_empty(),
        }
    }
}

/// The container's dependency resolution path, invoked by lazy proxies on every use. Returning
/// `Ok(None)` means no candidate matched, which proxies turn into an empty collection or an
/// error depending on the declared type.
#[cfg_attr(test, automock)]
pub trait OnDemandDependencyResolver {
    fn resolve_dependency<'a>(
        &self,
        descriptor: &DependencyDescriptor,
        requesting_name: Option<&'a str>,
    ) -> Result<Option<ResolvedValue>, ResolutionError>;
}

pub type OnDemandResolverPtr = Arc<dyn OnDemandDependencyResolver + Send + Sync>;

/// Checks whether the given injection point demands deferred resolution.
///
/// The point-level lazy marker takes precedence; the enclosing member's marker is consulted only
/// when the member has no return type.
pub fn is_lazy(descriptor: &DependencyDescriptor) -> bool {
    if let Some(value) = descriptor.marker_value(LAZY_MARKER) {
        if value.truthy() {
            return true;
        }
    }

    if let Some(member) = descriptor.member() {
        if member.return_type.is_none() {
            return member
                .marker_value(LAZY_MARKER)
                .map(MarkerValue::truthy)
                .unwrap_or(false);
        }
    }

    false
}

/// Stand-in for a dependency which defers actual lookup to every use. The proxy exposes the
/// descriptor's dependency type as a capability, plus the explicitly added interface capability
/// when the declared type is capability-only, so downstream capability checks succeed.
#[derive(Clone, Derivative)]
#[derivative(Debug)]
pub struct LazyResolutionProxy {
    descriptor: DependencyDescriptor,
    requesting_name: Option<String>,
    #[derivative(Debug = "ignore")]
    resolver: OnDemandResolverPtr,
    interfaces: Vec<ClassId>,
}

impl LazyResolutionProxy {
    pub fn new(
        descriptor: DependencyDescriptor,
        requesting_name: Option<String>,
        resolver: OnDemandResolverPtr,
    ) -> Self {
        let mut interfaces = Vec::new();
        if descriptor.is_interface() {
            interfaces.push(descriptor.dependency_type().class().clone());
        }

        Self {
            descriptor,
            requesting_name,
            resolver,
            interfaces,
        }
    }

    /// Resolves the dependency against the current container state. Results are never cached;
    /// each invocation may observe newly registered definitions.
    pub fn resolve(&self) -> Result<ResolvedValue, ResolutionError> {
        if let Some(value) = self
            .resolver
            .resolve_dependency(&self.descriptor, self.requesting_name.as_deref())?
        {
            return Ok(value);
        }

        match self.descriptor.dependency_type() {
            DependencyType::Mapping(_) => Ok(ResolvedValue::Mapping(Vec::new())),
            DependencyType::Sequence(_) => Ok(ResolvedValue::Sequence(Vec::new())),
            DependencyType::Set(_) => Ok(ResolvedValue::Set(Vec::new())),
            DependencyType::Single(class) => Err(ResolutionError::NoCandidate(class.clone())),
        }
    }

    /// Checks whether the proxy satisfies the given declared capability.
    pub fn supports(&self, capability: &ClassId) -> bool {
        self.descriptor.dependency_type().class() == capability
            || self.interfaces.contains(capability)
    }

    /// Capabilities exposed beyond the declared dependency type.
    #[inline]
    pub fn interfaces(&self) -> &[ClassId] {
        &self.interfaces
    }

    #[inline]
    pub fn descriptor(&self) -> &DependencyDescriptor {
        &self.descriptor
    }

    #[inline]
    pub fn requesting_name(&self) -> Option<&str> {
        self.requesting_name.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use crate::error::ResolutionError;
    use crate::lazy::{
        is_lazy, BeanHandle, LazyResolutionProxy, MockOnDemandDependencyResolver, ResolvedValue,
    };
    use crate::metadata::{ClassId, MarkerValue, LAZY_MARKER};
    use crate::resolver::{DependencyDescriptor, DependencyType, MemberSignature};
    use std::sync::Arc;

    fn create_descriptor(dependency_type: DependencyType) -> DependencyDescriptor {
        DependencyDescriptor::new(dependency_type)
            .with_marker(LAZY_MARKER, MarkerValue::Flag(true))
    }

    fn create_proxy(
        descriptor: DependencyDescriptor,
        resolver: MockOnDemandDependencyResolver,
    ) -> LazyResolutionProxy {
        LazyResolutionProxy::new(descriptor, Some("requesting".to_string()), Arc::new(resolver))
    }

    #[test]
    fn should_prefer_point_level_marker() {
        let descriptor =
            DependencyDescriptor::new(DependencyType::Single(ClassId::new("test::Bean")))
                .with_marker(LAZY_MARKER, MarkerValue::Flag(true))
                .with_member(
                    MemberSignature::new("setter")
                        .with_marker(LAZY_MARKER, MarkerValue::Flag(false)),
                );

        assert!(is_lazy(&descriptor));
    }

    #[test]
    fn should_check_member_marker_without_return_type() {
        let descriptor =
            DependencyDescriptor::new(DependencyType::Single(ClassId::new("test::Bean")))
                .with_member(
                    MemberSignature::new("setter")
                        .with_marker(LAZY_MARKER, MarkerValue::Flag(true)),
                );

        assert!(is_lazy(&descriptor));
    }

    #[test]
    fn should_ignore_member_marker_with_return_type() {
        let descriptor =
            DependencyDescriptor::new(DependencyType::Single(ClassId::new("test::Bean")))
                .with_member(
                    MemberSignature::new("factory")
                        .with_return_type(ClassId::new("test::Bean"))
                        .with_marker(LAZY_MARKER, MarkerValue::Flag(true)),
                );

        assert!(!is_lazy(&descriptor));
    }

    #[test]
    fn should_not_be_lazy_without_markers() {
        let descriptor =
            DependencyDescriptor::new(DependencyType::Single(ClassId::new("test::Bean")));
        assert!(!is_lazy(&descriptor));
    }

    #[test]
    fn should_resolve_fresh_on_each_call() {
        let mut resolver = MockOnDemandDependencyResolver::new();
        resolver
            .expect_resolve_dependency()
            .times(2)
            .returning(|_, _| {
                Ok(Some(ResolvedValue::Instance(
                    Arc::new(0_i8) as BeanHandle
                )))
            });

        let proxy = create_proxy(
            create_descriptor(DependencyType::Single(ClassId::new("test::Bean"))),
            resolver,
        );

        assert!(matches!(proxy.resolve().unwrap(), ResolvedValue::Instance(_)));
        assert!(matches!(proxy.resolve().unwrap(), ResolvedValue::Instance(_)));
    }

    #[test]
    fn should_pass_requesting_bean_name_to_resolver() {
        let mut resolver = MockOnDemandDependencyResolver::new();
        resolver
            .expect_resolve_dependency()
            .withf(|_, requesting_name| *requesting_name == Some("requesting"))
            .times(1)
            .returning(|_, _| Ok(None));

        let proxy = create_proxy(
            create_descriptor(DependencyType::Sequence(ClassId::new("test::Bean"))),
            resolver,
        );

        assert!(proxy.resolve().unwrap().is_empty_collection());
    }

    #[test]
    fn should_fall_back_to_empty_collections() {
        for (dependency_type, expected_mapping, expected_sequence, expected_set) in [
            (DependencyType::Mapping(ClassId::new("test::Bean")), true, false, false),
            (DependencyType::Sequence(ClassId::new("test::Bean")), false, true, false),
            (DependencyType::Set(ClassId::new("test::Bean")), false, false, true),
        ] {
            let mut resolver = MockOnDemandDependencyResolver::new();
            resolver
                .expect_resolve_dependency()
                .times(1)
                .returning(|_, _| Ok(None));

            let proxy = create_proxy(create_descriptor(dependency_type), resolver);
            let value = proxy.resolve().unwrap();

            assert!(value.is_empty_collection());
            assert_eq!(matches!(&value, ResolvedValue::Mapping(_)), expected_mapping);
            assert_eq!(matches!(&value, ResolvedValue::Sequence(_)), expected_sequence);
            assert_eq!(matches!(&value, ResolvedValue::Set(_)), expected_set);
        }
    }

    #[test]
    fn should_fail_on_missing_single_candidate() {
        let mut resolver = MockOnDemandDependencyResolver::new();
        resolver
            .expect_resolve_dependency()
            .times(1)
            .returning(|_, _| Ok(None));

        let proxy = create_proxy(
            create_descriptor(DependencyType::Single(ClassId::new("test::Bean"))),
            resolver,
        );

        assert_eq!(
            proxy.resolve().unwrap_err(),
            ResolutionError::NoCandidate(ClassId::new("test::Bean"))
        );
    }

    #[test]
    fn should_expose_interface_capability() {
        let class = ClassId::new("test::Trait");
        let descriptor =
            DependencyDescriptor::new(DependencyType::Single(class.clone())).interface();

        let proxy = create_proxy(descriptor, MockOnDemandDependencyResolver::new());
        assert!(proxy.supports(&class));
        assert_eq!(proxy.interfaces(), [class]);
        assert!(!proxy.supports(&ClassId::new("test::Other")));
    }
}
