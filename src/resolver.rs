//! Strategies deciding whether a bean definition qualifies as an autowire candidate for a
//! specific dependency, and whether the dependency should be resolved lazily through a proxy.

use crate::definition::{AttributeValue, BeanDefinitionHolder, QUALIFIER_ATTRIBUTE};
use crate::error::ResolutionError;
use crate::lazy::{is_lazy, LazyResolutionProxy, OnDemandResolverPtr};
use crate::metadata::{ClassId, MarkerValue, QUALIFIER_MARKER, VALUE_MARKER};
use fxhash::FxHashMap;

/// Static type declared at an injection point.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum DependencyType {
    Single(ClassId),
    Mapping(ClassId),
    Sequence(ClassId),
    Set(ClassId),
}

impl DependencyType {
    /// The element class of the declared type.
    pub fn class(&self) -> &ClassId {
        match self {
            DependencyType::Single(class)
            | DependencyType::Mapping(class)
            | DependencyType::Sequence(class)
            | DependencyType::Set(class) => class,
        }
    }
}

/// Signature of the member enclosing an injection point, e.g. the method declaring an injected
/// parameter. Members without a return type correspond to plain setters or fields.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct MemberSignature {
    pub name: String,
    pub return_type: Option<ClassId>,
    markers: FxHashMap<String, MarkerValue>,
}

impl MemberSignature {
    pub fn new<T: Into<String>>(name: T) -> Self {
        Self {
            name: name.into(),
            return_type: None,
            markers: Default::default(),
        }
    }

    pub fn with_return_type(mut self, return_type: ClassId) -> Self {
        self.return_type = Some(return_type);
        self
    }

    pub fn with_marker<T: Into<String>>(mut self, kind: T, value: MarkerValue) -> Self {
        self.markers.insert(kind.into(), value);
        self
    }

    #[inline]
    pub fn marker_value(&self, kind: &str) -> Option<&MarkerValue> {
        self.markers.get(kind)
    }
}

/// Immutable description of a single injection point.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DependencyDescriptor {
    dependency_type: DependencyType,
    required: bool,
    interface: bool,
    markers: FxHashMap<String, MarkerValue>,
    member: Option<MemberSignature>,
}

impl DependencyDescriptor {
    pub fn new(dependency_type: DependencyType) -> Self {
        Self {
            dependency_type,
            required: true,
            interface: false,
            markers: Default::default(),
            member: None,
        }
    }

    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    /// Marks the declared type as capability-only, e.g. a trait object type.
    pub fn interface(mut self) -> Self {
        self.interface = true;
        self
    }

    pub fn with_marker<T: Into<String>>(mut self, kind: T, value: MarkerValue) -> Self {
        self.markers.insert(kind.into(), value);
        self
    }

    pub fn with_member(mut self, member: MemberSignature) -> Self {
        self.member = Some(member);
        self
    }

    #[inline]
    pub fn dependency_type(&self) -> &DependencyType {
        &self.dependency_type
    }

    #[inline]
    pub fn required(&self) -> bool {
        self.required
    }

    #[inline]
    pub fn is_interface(&self) -> bool {
        self.interface
    }

    #[inline]
    pub fn marker_value(&self, kind: &str) -> Option<&MarkerValue> {
        self.markers.get(kind)
    }

    #[inline]
    pub fn member(&self) -> Option<&MemberSignature> {
        self.member.as_ref()
    }
}

/// Strategy deciding whether a definition qualifies for a given dependency. All operations are
/// pure with respect to the registry snapshot the holders were taken from.
pub trait AutowireCandidateResolver {
    /// Whether the given definition qualifies as a candidate for the given dependency. The
    /// default policy checks the definition's autowire-candidate flag.
    fn is_autowire_candidate(
        &self,
        holder: &BeanDefinitionHolder,
        _descriptor: &DependencyDescriptor,
    ) -> bool {
        holder.definition.autowire_candidate
    }

    /// Whether the given dependency is effectively required. The default mirrors the
    /// descriptor's own flag.
    fn is_required(&self, descriptor: &DependencyDescriptor) -> bool {
        descriptor.required()
    }

    /// Whether the descriptor declares a qualifier narrowing candidates beyond the type.
    fn has_qualifier(&self, _descriptor: &DependencyDescriptor) -> bool {
        false
    }

    /// A literal default value suggested for the dependency, when no matching bean is needed.
    fn suggested_value(&self, _descriptor: &DependencyDescriptor) -> Option<MarkerValue> {
        None
    }

    /// A proxy deferring resolution of the dependency to call time, when the injection point
    /// demands it. Returning a proxy short-circuits normal resolution - the caller must install
    /// the returned object directly.
    fn lazy_resolution_proxy(
        &self,
        _descriptor: &DependencyDescriptor,
        _requesting_name: Option<&str>,
    ) -> Result<Option<LazyResolutionProxy>, ResolutionError> {
        Ok(None)
    }
}

/// [AutowireCandidateResolver] applying only the default policies.
#[derive(Default, Copy, Clone, Eq, PartialEq, Debug)]
pub struct SimpleAutowireCandidateResolver;

impl AutowireCandidateResolver for SimpleAutowireCandidateResolver {}

/// Complete [AutowireCandidateResolver] supporting qualifier narrowing, suggested literal values,
/// and lazy resolution proxies built against a bound on-demand resolver.
#[derive(Default)]
pub struct ContextAutowireCandidateResolver {
    resolver: Option<OnDemandResolverPtr>,
}

impl ContextAutowireCandidateResolver {
    /// Creates a resolver bound to the given on-demand resolution path.
    pub fn new(resolver: OnDemandResolverPtr) -> Self {
        Self {
            resolver: Some(resolver),
        }
    }

    /// Creates a resolver without lazy proxy support; building a proxy will fail with
    /// [ResolutionError::UnsupportedRegistry].
    pub fn unbound() -> Self {
        Self { resolver: None }
    }
}

impl AutowireCandidateResolver for ContextAutowireCandidateResolver {
    fn is_autowire_candidate(
        &self,
        holder: &BeanDefinitionHolder,
        descriptor: &DependencyDescriptor,
    ) -> bool {
        if !holder.definition.autowire_candidate {
            return false;
        }

        match descriptor.marker_value(QUALIFIER_MARKER) {
            Some(MarkerValue::Text(qualifier)) => {
                holder.name == *qualifier
                    || matches!(
                        holder.definition.attribute(QUALIFIER_ATTRIBUTE),
                        Some(AttributeValue::Text(value)) if value == qualifier
                    )
            }
            _ => true,
        }
    }

    fn has_qualifier(&self, descriptor: &DependencyDescriptor) -> bool {
        descriptor.marker_value(QUALIFIER_MARKER).is_some()
    }

    fn suggested_value(&self, descriptor: &DependencyDescriptor) -> Option<MarkerValue> {
        descriptor.marker_value(VALUE_MARKER).cloned()
    }

    fn lazy_resolution_proxy(
        &self,
        descriptor: &DependencyDescriptor,
        requesting_name: Option<&str>,
    ) -> Result<Option<LazyResolutionProxy>, ResolutionError> {
        if !is_lazy(descriptor) {
            return Ok(None);
        }

        let resolver = self
            .resolver
            .clone()
            .ok_or(ResolutionError::UnsupportedRegistry)?;

        Ok(Some(LazyResolutionProxy::new(
            descriptor.clone(),
            requesting_name.map(str::to_string),
            resolver,
        )))
    }
}
