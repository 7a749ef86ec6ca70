//! The exposer: public entry point tying resolution, proxy synthesis,
//! marshalling and callbacks together.

use std::fmt;
use std::sync::{Arc, Weak};

use crate::callback::CallbackBridge;
use crate::config::ExposerConfig;
use crate::error::{Error, Result};
use crate::logging::info;
use crate::native::{NativeCallable, NativeClass, NativeType, NativeValue, ObjectRef, TypeHandle};
use crate::policy::{ConversionError, script_kind_for};
use crate::proxy::{ProxyCache, ProxyDefinition, instantiate};
use crate::resolve::{Descriptor, DescriptorRegistry, MemberDescriptor, ResolutionError, Resolver};
use crate::script::{ScriptEngine, ScriptFunction, ScriptObject, ScriptValue};

pub(crate) struct Shared {
    pub(crate) config: ExposerConfig,
    pub(crate) descriptors: DescriptorRegistry,
    pub(crate) proxies: ProxyCache,
    pub(crate) callbacks: CallbackBridge,
}

/// Exposes native objects, types, interfaces and functions to a script
/// engine.
///
/// Cloning is cheap; clones share the descriptor registry, the proxy cache
/// and the callback bridge. Script functions created by the exposer only
/// hold it weakly and fail with [`Error::Disposed`] once every clone has
/// been dropped.
///
/// # Example
///
/// ```ignore
/// use native_exposer::prelude::*;
///
/// let exposer = Exposer::default();
/// let realm = Realm::new();
/// exposer.expose_instance(&realm, "calc", Arc::new(Calculator::default()))?;
/// let calc = realm.global_value("calc").unwrap();
/// let sum = calc.as_object().unwrap().call_method("mul", &[2.into(), 3.into()])?;
/// ```
#[derive(Clone)]
pub struct Exposer {
    shared: Arc<Shared>,
}

/// Non-owning handle captured by generated script functions.
#[derive(Clone)]
pub(crate) struct WeakExposer(Weak<Shared>);

impl WeakExposer {
    pub(crate) fn upgrade(&self) -> Result<Exposer> {
        self.0
            .upgrade()
            .map(|shared| Exposer { shared })
            .ok_or(Error::Disposed)
    }
}

impl Default for Exposer {
    fn default() -> Self {
        Self::new(ExposerConfig::default())
    }
}

impl fmt::Debug for Exposer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Exposer")
            .field("config", &self.shared.config)
            .field("descriptors", &self.shared.descriptors.len())
            .field("proxies", &self.shared.proxies.len())
            .field("callbacks", &self.shared.callbacks.len())
            .finish()
    }
}

impl Exposer {
    pub fn new(config: ExposerConfig) -> Self {
        Self {
            shared: Arc::new(Shared {
                config,
                descriptors: DescriptorRegistry::new(),
                proxies: ProxyCache::new(),
                callbacks: CallbackBridge::new(),
            }),
        }
    }

    pub fn config(&self) -> &ExposerConfig {
        &self.shared.config
    }

    pub(crate) fn shared(&self) -> &Shared {
        &self.shared
    }

    pub(crate) fn downgrade(&self) -> WeakExposer {
        WeakExposer(Arc::downgrade(&self.shared))
    }

    /// Annotate members of `class` from outside its declaration.
    ///
    /// Only the first registration for a type counts; returns `false` when
    /// the type was already registered. Registrations made after the type's
    /// proxy was built have no effect on that proxy.
    pub fn register_descriptors(
        &self,
        class: &TypeHandle,
        descriptors: impl IntoIterator<Item = Descriptor>,
    ) -> bool {
        self.shared
            .descriptors
            .register(class, descriptors.into_iter().collect())
    }

    /// The ordered, de-duplicated member set scripts see for `class`.
    pub fn resolve_members(&self, class: &TypeHandle) -> Result<Vec<MemberDescriptor>> {
        let resolver = Resolver::new(&self.shared.descriptors, &self.shared.config.events);
        Ok(resolver.resolve(class)?)
    }

    /// Bind `target` to an already built definition.
    pub fn instantiate(&self, definition: &Arc<ProxyDefinition>, target: ObjectRef) -> ScriptObject {
        instantiate(definition, target)
    }

    /// Proxy object for `target`, typed by its runtime class.
    pub fn create_instance_object(&self, target: ObjectRef) -> Result<ScriptValue> {
        self.wrap_object(&target)
    }

    /// Publish a proxy for `target` as global `name`.
    pub fn expose_instance(
        &self,
        engine: &dyn ScriptEngine,
        name: &str,
        target: ObjectRef,
    ) -> Result<()> {
        let value = self.create_instance_object(target)?;
        engine.set_global_value(name, value);
        info!(name, "exposed instance");
        Ok(())
    }

    /// Publish a constructor for `class` as global `name`.
    ///
    /// Calling it picks the constructor overload matching the argument
    /// count and returns a proxy for the new instance.
    pub fn expose_type(&self, engine: &dyn ScriptEngine, name: &str, class: &TypeHandle) -> Result<()> {
        if class.is_interface() {
            return Err(ResolutionError::NotAClass {
                type_name: class.name().to_string(),
            }
            .into());
        }
        let definition = self.get_or_build(class)?;
        let exposer = self.downgrade();
        let constructor = ScriptFunction::new(class.name(), move |_this, args| {
            let exposer = exposer.upgrade()?;
            definition.construct(&exposer, args)
        });
        engine.set_global_value(name, ScriptValue::Function(constructor));
        info!(name, class = class.name(), "exposed type");
        Ok(())
    }

    /// Factory wrapping instances through the members of `interface` only.
    pub fn expose_interface(&self, interface: &TypeHandle) -> Result<InterfaceFactory> {
        if !interface.is_interface() {
            return Err(ResolutionError::NotAnInterface {
                type_name: interface.name().to_string(),
            }
            .into());
        }
        let definition = self.get_or_build(interface)?;
        info!(interface = interface.name(), "exposed interface");
        Ok(InterfaceFactory {
            interface: interface.clone(),
            definition,
            exposer: self.downgrade(),
        })
    }

    /// Publish `callable` as global function `name`.
    pub fn expose_function(
        &self,
        engine: &dyn ScriptEngine,
        name: &str,
        callable: NativeCallable,
    ) -> Result<()> {
        script_kind_for(&NativeType::Callable(callable.shape().clone()))?;
        engine.set_global_value(name, ScriptValue::Function(self.wrap_callable(&callable)));
        info!(name, "exposed function");
        Ok(())
    }

    /// Convert `value` for the script side as a value of `ty`.
    ///
    /// Fails when `ty` has no script representation or `value` does not
    /// fit it.
    pub fn wrap(&self, ty: &NativeType, value: &NativeValue) -> Result<ScriptValue> {
        script_kind_for(ty)?;
        self.to_script_as(value, ty)
    }

    /// Convert a script value to `ty`.
    pub fn unwrap(&self, ty: &NativeType, value: &ScriptValue) -> Result<NativeValue> {
        self.to_native(value, ty)
    }

    /// Cached proxy definitions.
    pub fn definition_count(&self) -> usize {
        self.shared.proxies.len()
    }

    /// Proxy definitions built so far.
    pub fn build_count(&self) -> usize {
        self.shared.proxies.build_count()
    }

    /// Cached definition for `class`, if one was built.
    pub fn cached_definition(&self, class: &NativeClass) -> Option<Arc<ProxyDefinition>> {
        self.shared.proxies.get(class.id())
    }
}

/// Wraps instances through the member set of one interface.
///
/// Produced by [`Exposer::expose_interface`]. Every wrapped object shares
/// the interface's definition; members dispatch to the implementation of
/// each instance's runtime class.
pub struct InterfaceFactory {
    interface: TypeHandle,
    definition: Arc<ProxyDefinition>,
    exposer: WeakExposer,
}

impl InterfaceFactory {
    pub fn interface(&self) -> &TypeHandle {
        &self.interface
    }

    pub fn definition(&self) -> &Arc<ProxyDefinition> {
        &self.definition
    }

    /// Interface proxy for `target`, which must implement the interface.
    pub fn create(&self, target: ObjectRef) -> Result<ScriptValue> {
        self.exposer.upgrade()?;
        let class = target.native_class();
        if !class.is_assignable_to(&self.interface) {
            return Err(ConversionError::mismatch(self.interface.name(), class.name()).into());
        }
        Ok(ScriptValue::Object(instantiate(&self.definition, target)))
    }
}

impl fmt::Debug for InterfaceFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InterfaceFactory")
            .field("interface", &self.interface.name())
            .field("definition", &self.definition.name())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::native::{CallableShape, MethodDef, NativeObject};
    use crate::script::Realm;
    use std::any::Any;
    use std::sync::LazyLock;

    struct Greeter;

    static GREETER: LazyLock<TypeHandle> = LazyLock::new(|| {
        NativeClass::class::<Greeter>("Greeter")
            .default_constructor(|| Greeter)
            .method(
                MethodDef::new("greet")
                    .param("name", NativeType::String)
                    .returns(NativeType::String)
                    .expose(crate::native::Expose::function()),
                |_, args| {
                    let name: String = crate::native::arg(args, 0)?;
                    Ok(NativeValue::String(format!("hello {name}")))
                },
            )
            .build()
    });

    impl NativeObject for Greeter {
        fn native_class(&self) -> TypeHandle {
            GREETER.clone()
        }

        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    #[test]
    fn test_expose_instance_publishes_global() {
        let exposer = Exposer::default();
        let realm = Realm::new();
        exposer.expose_instance(&realm, "greeter", Arc::new(Greeter)).unwrap();
        let greeter = realm.global_value("greeter").unwrap();
        let out = greeter
            .as_object()
            .unwrap()
            .call_method("greet", &[ScriptValue::string("bob")])
            .unwrap();
        assert_eq!(out, ScriptValue::string("hello bob"));
    }

    #[test]
    fn test_expose_type_constructs() {
        let exposer = Exposer::default();
        let realm = Realm::new();
        exposer.expose_type(&realm, "Greeter", &GREETER).unwrap();
        let ctor = realm.global_value("Greeter").unwrap();
        let made = ctor
            .as_function()
            .unwrap()
            .call(&ScriptValue::Undefined, &[])
            .unwrap();
        assert_eq!(made.as_object().unwrap().class_name(), "InstanceProxyGreeter");
        assert_eq!(exposer.build_count(), 1);
    }

    #[test]
    fn test_expose_interface_rejects_class() {
        let exposer = Exposer::default();
        let err = exposer.expose_interface(&GREETER).unwrap_err();
        assert!(err.is_resolution());
        assert_eq!(err.to_string(), "Type Greeter should be an interface");
    }

    #[test]
    fn test_expose_function() {
        let exposer = Exposer::default();
        let realm = Realm::new();
        let shape = CallableShape::new("double")
            .param("x", NativeType::I32)
            .returns(NativeType::I32);
        let double = NativeCallable::new(shape, |args| {
            let x: i32 = crate::native::arg(args, 0)?;
            Ok(NativeValue::I32(x * 2))
        });
        exposer.expose_function(&realm, "double", double).unwrap();
        let f = realm.global_value("double").unwrap();
        let out = f
            .as_function()
            .unwrap()
            .call(&ScriptValue::Undefined, &[ScriptValue::Int(21)])
            .unwrap();
        assert_eq!(out, ScriptValue::Int(42));
    }

    #[test]
    fn test_functions_outliving_exposer_report_disposed() {
        let exposer = Exposer::default();
        let realm = Realm::new();
        exposer.expose_instance(&realm, "greeter", Arc::new(Greeter)).unwrap();
        drop(exposer);
        let greeter = realm.global_value("greeter").unwrap();
        let err = greeter
            .as_object()
            .unwrap()
            .call_method("greet", &[ScriptValue::string("x")])
            .unwrap_err();
        assert!(err.is_disposed());
    }
}
