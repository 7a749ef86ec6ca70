//! Runtime metadata for native classes and interfaces.
//!
//! A [`NativeClass`] lists the members a native type declares, the
//! annotation (if any) attached to each one, and the bodies that invoke them.
//! Classes are assembled once with a [`ClassBuilder`] and shared as
//! [`TypeHandle`]s.

use std::any::{Any, TypeId};
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use anyhow::anyhow;

use super::callable::{CallableShape, NativeCallable, Param};
use super::object::{NativeObject, ObjectRef, receiver};
use super::value::{NativeType, NativeValue};

/// Shared handle to a class description. Equality is type identity.
pub type TypeHandle = Arc<NativeClass>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassKind {
    Class,
    Interface,
}

/// The three member categories a class can expose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemberCategory {
    Method,
    Property,
    Event,
}

impl fmt::Display for MemberCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MemberCategory::Method => write!(f, "method"),
            MemberCategory::Property => write!(f, "property"),
            MemberCategory::Event => write!(f, "event"),
        }
    }
}

/// Visibility annotation marking a member as visible to scripts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expose {
    Function {
        name: Option<String>,
    },
    Property {
        name: Option<String>,
        read_only: bool,
    },
    Event {
        name: Option<String>,
        add_prefix: Option<String>,
        remove_prefix: Option<String>,
    },
}

impl Expose {
    pub fn function() -> Self {
        Expose::Function { name: None }
    }

    pub fn function_as(name: impl Into<String>) -> Self {
        Expose::Function {
            name: Some(name.into()),
        }
    }

    pub fn property() -> Self {
        Expose::Property {
            name: None,
            read_only: false,
        }
    }

    pub fn property_as(name: impl Into<String>) -> Self {
        Expose::Property {
            name: Some(name.into()),
            read_only: false,
        }
    }

    pub fn event() -> Self {
        Expose::Event {
            name: None,
            add_prefix: None,
            remove_prefix: None,
        }
    }

    pub fn event_as(name: impl Into<String>) -> Self {
        Expose::Event {
            name: Some(name.into()),
            add_prefix: None,
            remove_prefix: None,
        }
    }

    /// Hide the setter of an exposed property.
    pub fn read_only(self) -> Self {
        match self {
            Expose::Property { name, .. } => Expose::Property {
                name,
                read_only: true,
            },
            other => other,
        }
    }

    /// Override the subscribe/unsubscribe prefixes of an exposed event.
    pub fn prefixes(self, add: impl Into<String>, remove: impl Into<String>) -> Self {
        match self {
            Expose::Event { name, .. } => Expose::Event {
                name,
                add_prefix: Some(add.into()),
                remove_prefix: Some(remove.into()),
            },
            other => other,
        }
    }

    /// Name override, if any.
    pub fn name(&self) -> Option<&str> {
        match self {
            Expose::Function { name } | Expose::Property { name, .. } | Expose::Event { name, .. } => {
                name.as_deref()
            }
        }
    }

    pub fn category(&self) -> MemberCategory {
        match self {
            Expose::Function { .. } => MemberCategory::Method,
            Expose::Property { .. } => MemberCategory::Property,
            Expose::Event { .. } => MemberCategory::Event,
        }
    }
}

pub(crate) type MethodBody =
    Arc<dyn Fn(&dyn NativeObject, &[NativeValue]) -> anyhow::Result<NativeValue> + Send + Sync>;
pub(crate) type GetterBody = Arc<dyn Fn(&dyn NativeObject) -> anyhow::Result<NativeValue> + Send + Sync>;
pub(crate) type SetterBody =
    Arc<dyn Fn(&dyn NativeObject, NativeValue) -> anyhow::Result<()> + Send + Sync>;
pub(crate) type EventBody =
    Arc<dyn Fn(&dyn NativeObject, Option<NativeCallable>) -> anyhow::Result<()> + Send + Sync>;
pub(crate) type ConstructorBody = Arc<dyn Fn(&[NativeValue]) -> anyhow::Result<ObjectRef> + Send + Sync>;

/// A declared method.
#[derive(Clone)]
pub struct MethodDef {
    pub name: String,
    pub params: Vec<Param>,
    pub ret: NativeType,
    pub expose: Option<Expose>,
    pub(crate) body: Option<MethodBody>,
}

impl MethodDef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            params: Vec::new(),
            ret: NativeType::Void,
            expose: None,
            body: None,
        }
    }

    pub fn param(mut self, name: impl Into<String>, ty: NativeType) -> Self {
        self.params.push(Param::new(name, ty));
        self
    }

    pub fn rest(mut self, name: impl Into<String>) -> Self {
        self.params.push(Param::rest(name));
        self
    }

    pub fn returns(mut self, ret: NativeType) -> Self {
        self.ret = ret;
        self
    }

    pub fn expose(mut self, expose: Expose) -> Self {
        self.expose = Some(expose);
        self
    }

    pub fn has_body(&self) -> bool {
        self.body.is_some()
    }
}

/// A declared property.
#[derive(Clone)]
pub struct PropertyDef {
    pub name: String,
    pub ty: NativeType,
    pub expose: Option<Expose>,
    /// Value assigned when a script object omits this property during
    /// construction.
    pub default: Option<NativeValue>,
    pub readable: bool,
    pub writable: bool,
    pub(crate) getter: Option<GetterBody>,
    pub(crate) setter: Option<SetterBody>,
}

impl PropertyDef {
    pub fn new(name: impl Into<String>, ty: NativeType) -> Self {
        Self {
            name: name.into(),
            ty,
            expose: None,
            default: None,
            readable: true,
            writable: false,
            getter: None,
            setter: None,
        }
    }

    pub fn expose(mut self, expose: Expose) -> Self {
        self.expose = Some(expose);
        self
    }

    pub fn default_value(mut self, value: impl Into<NativeValue>) -> Self {
        self.default = Some(value.into());
        self
    }
}

/// A declared event.
#[derive(Clone)]
pub struct EventDef {
    pub name: String,
    pub handler: Arc<CallableShape>,
    pub expose: Option<Expose>,
    pub(crate) add: Option<EventBody>,
    pub(crate) remove: Option<EventBody>,
}

impl EventDef {
    pub fn new(name: impl Into<String>, handler: CallableShape) -> Self {
        Self {
            name: name.into(),
            handler: Arc::new(handler),
            expose: None,
            add: None,
            remove: None,
        }
    }

    pub fn expose(mut self, expose: Expose) -> Self {
        self.expose = Some(expose);
        self
    }
}

/// A constructor overload.
#[derive(Clone)]
pub struct ConstructorDef {
    pub params: Vec<Param>,
    pub(crate) body: ConstructorBody,
}

/// Description of a native class or interface.
pub struct NativeClass {
    type_id: TypeId,
    name: String,
    kind: ClassKind,
    base: Option<TypeHandle>,
    interfaces: Vec<TypeHandle>,
    methods: Vec<MethodDef>,
    properties: Vec<PropertyDef>,
    events: Vec<EventDef>,
    constructors: Vec<ConstructorDef>,
}

impl NativeClass {
    /// Describe the concrete type `T`.
    pub fn class<T: Any>(name: impl Into<String>) -> ClassBuilder<T> {
        ClassBuilder::new(name.into(), ClassKind::Class)
    }

    /// Describe an interface. `T` is usually the trait object type
    /// (`dyn ILog`) and only serves as the identity.
    pub fn interface<T: ?Sized + 'static>(name: impl Into<String>) -> ClassBuilder<T> {
        ClassBuilder::new(name.into(), ClassKind::Interface)
    }

    /// Identity of the described type.
    pub fn id(&self) -> TypeId {
        self.type_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> ClassKind {
        self.kind
    }

    pub fn is_interface(&self) -> bool {
        self.kind == ClassKind::Interface
    }

    pub fn base(&self) -> Option<&TypeHandle> {
        self.base.as_ref()
    }

    /// Interfaces declared directly on this type.
    pub fn interfaces(&self) -> &[TypeHandle] {
        &self.interfaces
    }

    pub fn methods(&self) -> &[MethodDef] {
        &self.methods
    }

    pub fn properties(&self) -> &[PropertyDef] {
        &self.properties
    }

    pub fn events(&self) -> &[EventDef] {
        &self.events
    }

    pub fn constructors(&self) -> &[ConstructorDef] {
        &self.constructors
    }

    /// This type followed by its base chain, most derived first.
    pub fn ancestors(&self) -> Ancestors<'_> {
        Ancestors { next: Some(self) }
    }

    /// Every interface implemented by this type or its bases, including
    /// inherited interfaces, in declaration order without duplicates.
    pub fn all_interfaces(&self) -> Vec<TypeHandle> {
        let mut out: Vec<TypeHandle> = Vec::new();
        let mut pending: Vec<TypeHandle> = Vec::new();
        for ty in self.ancestors() {
            pending.extend(ty.interfaces.iter().cloned());
        }
        pending.reverse();
        while let Some(iface) = pending.pop() {
            if out.iter().any(|seen| seen.type_id == iface.type_id) {
                continue;
            }
            pending.extend(iface.interfaces.iter().rev().cloned());
            out.push(iface);
        }
        out
    }

    /// Whether an instance of this type can be used where `target` is
    /// expected.
    pub fn is_assignable_to(&self, target: &NativeClass) -> bool {
        self.ancestors().any(|ty| ty.type_id == target.type_id)
            || self
                .all_interfaces()
                .iter()
                .any(|iface| iface.type_id == target.type_id)
    }

    /// Whether a member called `name` of the given category is declared on
    /// this type or inherited from it.
    pub fn has_member(&self, name: &str, category: MemberCategory) -> bool {
        let declared = |ty: &NativeClass| match category {
            MemberCategory::Method => ty.methods.iter().any(|m| m.name == name),
            MemberCategory::Property => ty.properties.iter().any(|p| p.name == name),
            MemberCategory::Event => ty.events.iter().any(|e| e.name == name),
        };
        self.ancestors().any(declared) || self.all_interfaces().iter().any(|i| declared(i))
    }

    /// True when neither this type, its bases nor its interfaces declare a
    /// single member.
    pub fn declares_no_members(&self) -> bool {
        let empty = |ty: &NativeClass| {
            ty.methods.is_empty() && ty.properties.is_empty() && ty.events.is_empty()
        };
        self.ancestors().all(empty) && self.all_interfaces().iter().all(|i| empty(i))
    }

    /// Declaration of method `name` in the base chain.
    pub(crate) fn method_decl(&self, name: &str) -> Option<&MethodDef> {
        self.ancestors()
            .find_map(|ty| ty.methods.iter().find(|m| m.name == name))
    }

    /// Most derived implementation of method `name`.
    pub(crate) fn method_impl(&self, name: &str) -> Option<&MethodDef> {
        self.ancestors()
            .find_map(|ty| ty.methods.iter().find(|m| m.name == name && m.body.is_some()))
    }

    pub(crate) fn property_decl(&self, name: &str) -> Option<&PropertyDef> {
        self.ancestors()
            .find_map(|ty| ty.properties.iter().find(|p| p.name == name))
    }

    /// Most derived property `name` carrying a getter (or setter, when
    /// `setter` is true).
    pub(crate) fn property_impl(&self, name: &str, setter: bool) -> Option<&PropertyDef> {
        self.ancestors().find_map(|ty| {
            ty.properties.iter().find(|p| {
                p.name == name && if setter { p.setter.is_some() } else { p.getter.is_some() }
            })
        })
    }

    pub(crate) fn event_impl(&self, name: &str) -> Option<&EventDef> {
        self.ancestors()
            .find_map(|ty| ty.events.iter().find(|e| e.name == name && e.add.is_some()))
    }

    /// Signature of method `name` as seen from this type: base chain first,
    /// then interfaces.
    pub(crate) fn method_signature(&self, name: &str) -> Option<MethodDef> {
        self.method_decl(name).cloned().or_else(|| {
            self.all_interfaces()
                .iter()
                .find_map(|iface| iface.method_decl(name).cloned())
        })
    }

    pub(crate) fn property_signature(&self, name: &str) -> Option<PropertyDef> {
        self.property_decl(name).cloned().or_else(|| {
            self.all_interfaces()
                .iter()
                .find_map(|iface| iface.property_decl(name).cloned())
        })
    }

    pub(crate) fn event_signature(&self, name: &str) -> Option<EventDef> {
        let find = |ty: &NativeClass| ty.events.iter().find(|e| e.name == name).cloned();
        self.ancestors()
            .find_map(find)
            .or_else(|| self.all_interfaces().iter().find_map(|iface| find(iface)))
    }

    /// Constructor taking exactly `arity` arguments.
    pub(crate) fn constructor_for(&self, arity: usize) -> Option<&ConstructorDef> {
        self.constructors
            .iter()
            .find(|c| c.params.len() == arity && !c.params.iter().any(|p| p.variadic))
            .or_else(|| {
                self.constructors.iter().find(|c| {
                    c.params.last().is_some_and(|p| p.variadic) && arity + 1 >= c.params.len()
                })
            })
    }
}

impl PartialEq for NativeClass {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id
    }
}

impl fmt::Debug for NativeClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeClass")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("base", &self.base.as_ref().map(|b| b.name()))
            .field("methods", &self.methods.len())
            .field("properties", &self.properties.len())
            .field("events", &self.events.len())
            .finish_non_exhaustive()
    }
}

/// Iterator returned by [`NativeClass::ancestors`].
pub struct Ancestors<'a> {
    next: Option<&'a NativeClass>,
}

impl<'a> Iterator for Ancestors<'a> {
    type Item = &'a NativeClass;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = current.base.as_deref();
        Some(current)
    }
}

fn receiver_mismatch(class: &str) -> anyhow::Error {
    anyhow!("receiver is not an instance of {class}")
}

/// Fluent builder for [`NativeClass`].
///
/// # Example
///
/// ```ignore
/// let class = NativeClass::class::<Calculator>("Calculator")
///     .method(
///         MethodDef::new("Multiply")
///             .param("a", NativeType::I32)
///             .param("b", NativeType::I32)
///             .returns(NativeType::I32)
///             .expose(Expose::function_as("mul")),
///         |calc, args| Ok(NativeValue::I32(calc.multiply(arg(args, 0)?, arg(args, 1)?))),
///     )
///     .build();
/// ```
pub struct ClassBuilder<T: ?Sized> {
    class: NativeClass,
    _marker: PhantomData<fn(&T)>,
}

impl<T: ?Sized + 'static> ClassBuilder<T> {
    fn new(name: String, kind: ClassKind) -> Self {
        Self {
            class: NativeClass {
                type_id: TypeId::of::<T>(),
                name,
                kind,
                base: None,
                interfaces: Vec::new(),
                methods: Vec::new(),
                properties: Vec::new(),
                events: Vec::new(),
                constructors: Vec::new(),
            },
            _marker: PhantomData,
        }
    }

    /// Set the base class.
    pub fn extends(mut self, base: &TypeHandle) -> Self {
        self.class.base = Some(base.clone());
        self
    }

    pub fn implements(mut self, iface: &TypeHandle) -> Self {
        self.class.interfaces.push(iface.clone());
        self
    }

    /// Declare a method without a body (interface or abstract member).
    pub fn abstract_method(mut self, def: MethodDef) -> Self {
        self.class.methods.push(MethodDef { body: None, ..def });
        self
    }

    /// Declare a property without accessor bodies.
    pub fn abstract_property(mut self, def: PropertyDef, writable: bool) -> Self {
        self.class.properties.push(PropertyDef {
            readable: true,
            writable,
            getter: None,
            setter: None,
            ..def
        });
        self
    }

    pub fn abstract_event(mut self, def: EventDef) -> Self {
        self.class.events.push(EventDef {
            add: None,
            remove: None,
            ..def
        });
        self
    }

    pub fn build(self) -> TypeHandle {
        Arc::new(self.class)
    }
}

impl<T: Any> ClassBuilder<T> {
    pub fn method<F>(mut self, def: MethodDef, body: F) -> Self
    where
        F: Fn(&T, &[NativeValue]) -> anyhow::Result<NativeValue> + Send + Sync + 'static,
    {
        let class = self.class.name.clone();
        let body: MethodBody = Arc::new(move |object, args| {
            let this = receiver::<T>(object).ok_or_else(|| receiver_mismatch(&class))?;
            body(this, args)
        });
        self.class.methods.push(MethodDef {
            body: Some(body),
            ..def
        });
        self
    }

    pub fn property<G, S>(mut self, def: PropertyDef, get: G, set: S) -> Self
    where
        G: Fn(&T) -> anyhow::Result<NativeValue> + Send + Sync + 'static,
        S: Fn(&T, NativeValue) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let get_class = self.class.name.clone();
        let set_class = self.class.name.clone();
        let getter: GetterBody = Arc::new(move |object| {
            let this = receiver::<T>(object).ok_or_else(|| receiver_mismatch(&get_class))?;
            get(this)
        });
        let setter: SetterBody = Arc::new(move |object, value| {
            let this = receiver::<T>(object).ok_or_else(|| receiver_mismatch(&set_class))?;
            set(this, value)
        });
        self.class.properties.push(PropertyDef {
            readable: true,
            writable: true,
            getter: Some(getter),
            setter: Some(setter),
            ..def
        });
        self
    }

    pub fn readonly_property<G>(mut self, def: PropertyDef, get: G) -> Self
    where
        G: Fn(&T) -> anyhow::Result<NativeValue> + Send + Sync + 'static,
    {
        let class = self.class.name.clone();
        let getter: GetterBody = Arc::new(move |object| {
            let this = receiver::<T>(object).ok_or_else(|| receiver_mismatch(&class))?;
            get(this)
        });
        self.class.properties.push(PropertyDef {
            readable: true,
            writable: false,
            getter: Some(getter),
            setter: None,
            ..def
        });
        self
    }

    /// Declare an event with its subscribe and unsubscribe bodies. The
    /// handler is `None` when the script passes `null`.
    pub fn event<A, R>(mut self, def: EventDef, add: A, remove: R) -> Self
    where
        A: Fn(&T, Option<NativeCallable>) -> anyhow::Result<()> + Send + Sync + 'static,
        R: Fn(&T, Option<NativeCallable>) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let add_class = self.class.name.clone();
        let remove_class = self.class.name.clone();
        let add: EventBody = Arc::new(move |object, handler| {
            let this = receiver::<T>(object).ok_or_else(|| receiver_mismatch(&add_class))?;
            add(this, handler)
        });
        let remove: EventBody = Arc::new(move |object, handler| {
            let this = receiver::<T>(object).ok_or_else(|| receiver_mismatch(&remove_class))?;
            remove(this, handler)
        });
        self.class.events.push(EventDef {
            add: Some(add),
            remove: Some(remove),
            ..def
        });
        self
    }
}

impl<T: NativeObject> ClassBuilder<T> {
    pub fn constructor<F>(mut self, params: Vec<Param>, body: F) -> Self
    where
        F: Fn(&[NativeValue]) -> anyhow::Result<T> + Send + Sync + 'static,
    {
        let body: ConstructorBody = Arc::new(move |args| {
            let object: ObjectRef = Arc::new(body(args)?);
            Ok(object)
        });
        self.class.constructors.push(ConstructorDef { params, body });
        self
    }

    /// Zero-argument constructor, used when a plain script object is
    /// converted to this class.
    pub fn default_constructor<F>(self, body: F) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        self.constructor(Vec::new(), move |_| Ok(body()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    trait Named {}

    struct Base;
    struct Derived {
        base: Base,
    }

    fn named() -> TypeHandle {
        NativeClass::interface::<dyn Named>("Named")
            .abstract_property(PropertyDef::new("Name", NativeType::String), false)
            .build()
    }

    fn base() -> TypeHandle {
        NativeClass::class::<Base>("Base")
            .implements(&named())
            .method(
                MethodDef::new("Describe").returns(NativeType::String),
                |_, _| Ok(NativeValue::from("base")),
            )
            .build()
    }

    #[test]
    fn test_ancestors_most_derived_first() {
        let base = base();
        let derived = NativeClass::class::<Derived>("Derived").extends(&base).build();
        let names: Vec<&str> = derived.ancestors().map(|c| c.name()).collect();
        assert_eq!(names, vec!["Derived", "Base"]);
        assert_eq!(derived.all_interfaces().len(), 1);
    }

    #[test]
    fn test_assignability() {
        let base = base();
        let derived = NativeClass::class::<Derived>("Derived").extends(&base).build();
        assert!(derived.is_assignable_to(&base));
        assert!(derived.is_assignable_to(&named()));
        assert!(!base.is_assignable_to(&derived));
    }

    #[test]
    fn test_method_impl_walks_chain() {
        let base = base();
        let derived = NativeClass::class::<Derived>("Derived")
            .extends(&base)
            .abstract_method(MethodDef::new("Describe").returns(NativeType::String))
            .build();
        assert!(derived.method_decl("Describe").is_some_and(|m| !m.has_body()));
        assert!(derived.method_impl("Describe").is_some_and(MethodDef::has_body));
        assert!(derived.has_member("Name", MemberCategory::Property));
        assert!(!derived.has_member("Name", MemberCategory::Method));
    }

    #[test]
    fn test_declares_no_members() {
        struct Empty;
        let empty = NativeClass::class::<Empty>("Empty").build();
        assert!(empty.declares_no_members());
        assert!(!base().declares_no_members());
    }

    #[test]
    fn test_expose_modifiers() {
        let expose = Expose::property_as("title").read_only();
        assert_eq!(
            expose,
            Expose::Property {
                name: Some("title".to_string()),
                read_only: true
            }
        );
        assert_eq!(Expose::function().read_only(), Expose::function());
        assert_eq!(expose.category(), MemberCategory::Property);
        let _ = Derived { base: Base };
    }
}
