//! Common test utilities and fixtures.
//!
//! This module provides native classes shared across the integration tests:
//! a calculator exposed through an interface, a JSON-shaped data object,
//! a class hierarchy, an event source, enumerations and a type with
//! several constructors.

#![allow(dead_code)]

use std::any::{Any, TypeId};
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::{Arc, LazyLock, Mutex};

use native_exposer::prelude::*;

// =============================================================================
// Helpers
// =============================================================================

/// Exposer plus an empty realm.
pub fn setup() -> (Exposer, Realm) {
    (Exposer::default(), Realm::new())
}

/// Read global `name` as an object.
pub fn global_object(realm: &Realm, name: &str) -> anyhow::Result<ScriptObject> {
    realm
        .global_value(name)
        .and_then(|value| value.as_object().cloned())
        .ok_or_else(|| anyhow::anyhow!("global {name} is not an object"))
}

/// Call global function `name` with no receiver.
pub fn call_global(realm: &Realm, name: &str, args: &[ScriptValue]) -> anyhow::Result<ScriptValue> {
    let function = realm
        .global_value(name)
        .and_then(|value| value.as_function().cloned())
        .ok_or_else(|| anyhow::anyhow!("global {name} is not a function"))?;
    Ok(function.call(&ScriptValue::Undefined, args)?)
}

/// Script function that stores every call's arguments.
pub fn recorder() -> (ScriptFunction, Arc<Mutex<Vec<Vec<ScriptValue>>>>) {
    let calls = Arc::new(Mutex::new(Vec::new()));
    let seen = calls.clone();
    let function = ScriptFunction::new("record", move |_, args| {
        seen.lock().unwrap().push(args.to_vec());
        Ok(ScriptValue::Undefined)
    });
    (function, calls)
}

// =============================================================================
// Enumerations
// =============================================================================

pub static COLOR: LazyLock<EnumDef> = LazyLock::new(|| {
    EnumDef::new("Color", EnumRepr::I32)
        .variant("Red", 1)
        .variant("Green", 2)
        .variant("Blue", 3)
        .build()
});

pub static ACCESS: LazyLock<EnumDef> = LazyLock::new(|| {
    EnumDef::flags("Access", EnumRepr::U8)
        .variant("Read", 1)
        .variant("Write", 2)
        .variant("Execute", 4)
        .build()
});

// =============================================================================
// JSON-shaped data object
// =============================================================================

/// Two string fields, default constructible, so plain script objects can
/// be converted into it.
#[derive(Default)]
pub struct MyJsonObject {
    pub field1: Mutex<String>,
    pub field2: Mutex<String>,
}

impl MyJsonObject {
    pub fn new(field1: &str, field2: &str) -> Self {
        Self {
            field1: Mutex::new(field1.to_string()),
            field2: Mutex::new(field2.to_string()),
        }
    }

    pub fn fields(&self) -> (String, String) {
        (
            self.field1.lock().unwrap().clone(),
            self.field2.lock().unwrap().clone(),
        )
    }
}

fn string_setter(slot: &Mutex<String>, value: NativeValue) -> anyhow::Result<()> {
    *slot.lock().unwrap() = match value {
        NativeValue::Null => String::new(),
        other => String::try_from(&other)?,
    };
    Ok(())
}

pub static MY_JSON_OBJECT: LazyLock<TypeHandle> = LazyLock::new(|| {
    NativeClass::class::<MyJsonObject>("MyJsonObject")
        .default_constructor(MyJsonObject::default)
        .property(
            PropertyDef::new("field1", NativeType::String).expose(Expose::property()),
            |o| Ok(o.field1.lock().unwrap().clone().into()),
            |o, v| string_setter(&o.field1, v),
        )
        .property(
            PropertyDef::new("Field2", NativeType::String)
                .expose(Expose::property_as("field2"))
                .default_value("unset"),
            |o| Ok(o.field2.lock().unwrap().clone().into()),
            |o, v| string_setter(&o.field2, v),
        )
        .build()
});

impl NativeObject for MyJsonObject {
    fn native_class(&self) -> TypeHandle {
        MY_JSON_OBJECT.clone()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

// =============================================================================
// Calculator behind an interface
// =============================================================================

pub trait Calculate {}

pub fn listener_shape() -> CallableShape {
    CallableShape::new("Listener").param("value", NativeType::I32)
}

pub fn transform_shape() -> CallableShape {
    CallableShape::new("Transform")
        .param("value", NativeType::I32)
        .returns(NativeType::I32)
}

pub static CALCULATE: LazyLock<TypeHandle> = LazyLock::new(|| {
    NativeClass::interface::<dyn Calculate>("ICalculate")
        .abstract_method(
            MethodDef::new("Mul")
                .param("a", NativeType::I32)
                .param("b", NativeType::I32)
                .returns(NativeType::I32)
                .expose(Expose::function_as("mul")),
        )
        .build()
});

#[derive(Default)]
pub struct Calculator {
    pub calls: AtomicI32,
    pub precision: AtomicI32,
}

impl Calculate for Calculator {}

impl Calculator {
    fn count(&self) {
        self.calls.fetch_add(1, Ordering::Relaxed);
    }
}

pub static CALCULATOR: LazyLock<TypeHandle> = LazyLock::new(|| {
    NativeClass::class::<Calculator>("Calculator")
        .implements(&CALCULATE)
        .default_constructor(Calculator::default)
        .method(
            MethodDef::new("sum")
                .param("a", NativeType::I32)
                .param("b", NativeType::I32)
                .param("c", NativeType::I32)
                .returns(NativeType::I32)
                .expose(Expose::function()),
            |calc, args| {
                calc.count();
                let (a, b, c): (i32, i32, i32) = (arg(args, 0)?, arg(args, 1)?, arg(args, 2)?);
                Ok(NativeValue::I32(a + b + c))
            },
        )
        .method(
            MethodDef::new("Mul")
                .param("a", NativeType::I32)
                .param("b", NativeType::I32)
                .returns(NativeType::I32),
            |calc, args| {
                calc.count();
                let (a, b): (i32, i32) = (arg(args, 0)?, arg(args, 1)?);
                Ok(NativeValue::I32(a * b))
            },
        )
        .method(
            MethodDef::new("total")
                .param("first", NativeType::F64)
                .rest("rest")
                .returns(NativeType::F64)
                .expose(Expose::function()),
            |_, args| {
                let first: f64 = arg(args, 0)?;
                let rest: f64 = match args.get(1) {
                    Some(NativeValue::Array(items)) => items
                        .iter()
                        .filter_map(|item| match item {
                            NativeValue::Script(value) => value.as_number(),
                            _ => None,
                        })
                        .sum(),
                    _ => 0.0,
                };
                Ok(NativeValue::F64(first + rest))
            },
        )
        .method(
            MethodDef::new("echo")
                .param("obj", NativeType::object(&MY_JSON_OBJECT))
                .returns(NativeType::object(&MY_JSON_OBJECT))
                .expose(Expose::function()),
            |_, args| {
                let input = args
                    .first()
                    .and_then(|v| v.downcast_ref::<MyJsonObject>())
                    .ok_or_else(|| anyhow::anyhow!("echo expects a MyJsonObject"))?;
                let (field1, _) = input.fields();
                let copy: ObjectRef = Arc::new(MyJsonObject::new(&field1, &field1));
                Ok(copy.into())
            },
        )
        .method(
            MethodDef::new("notify")
                .param("listener", NativeType::callable(listener_shape()))
                .expose(Expose::function()),
            |_, args| {
                if let Some(listener) = args.first().and_then(NativeValue::as_callable) {
                    listener.call(&[NativeValue::I32(42)])?;
                }
                Ok(NativeValue::Null)
            },
        )
        .method(
            MethodDef::new("apply")
                .param("transform", NativeType::callable(transform_shape()))
                .param("value", NativeType::I32)
                .returns(NativeType::I32)
                .expose(Expose::function()),
            |_, args| {
                let transform = args
                    .first()
                    .and_then(NativeValue::as_callable)
                    .ok_or_else(|| anyhow::anyhow!("missing transform"))?;
                let value: i32 = arg(args, 1)?;
                transform.call(&[NativeValue::I32(value)])
            },
        )
        .method(
            MethodDef::new("describe")
                .returns(NativeType::Json)
                .expose(Expose::function()),
            |_, _| Ok(NativeValue::Json(r#"{"name":"calc","ops":["sum","mul"]}"#.to_string())),
        )
        .method(
            MethodDef::new("stats")
                .returns(NativeType::dictionary(NativeType::I32))
                .expose(Expose::function()),
            |calc, _| {
                Ok(NativeValue::Dictionary(vec![(
                    "calls".to_string(),
                    NativeValue::I32(calc.calls.load(Ordering::Relaxed)),
                )]))
            },
        )
        .method(
            MethodDef::new("fail")
                .expose(Expose::function()),
            |_, _| Err(anyhow::anyhow!("calculator is on fire")),
        )
        .property(
            PropertyDef::new("Precision", NativeType::I32).expose(Expose::property_as("precision")),
            |calc| Ok(NativeValue::I32(calc.precision.load(Ordering::Relaxed))),
            |calc, v| {
                calc.precision.store(i32::try_from(&v)?, Ordering::Relaxed);
                Ok(())
            },
        )
        .readonly_property(
            PropertyDef::new("calls", NativeType::I32).expose(Expose::property()),
            |calc| Ok(NativeValue::I32(calc.calls.load(Ordering::Relaxed))),
        )
        .build()
});

impl NativeObject for Calculator {
    fn native_class(&self) -> TypeHandle {
        CALCULATOR.clone()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

// =============================================================================
// Logger interface with a concrete implementation
// =============================================================================

pub trait Log {}

pub static LOG: LazyLock<TypeHandle> = LazyLock::new(|| {
    NativeClass::interface::<dyn Log>("ILog")
        .abstract_method(
            MethodDef::new("log")
                .param("message", NativeType::String)
                .expose(Expose::function()),
        )
        .build()
});

#[derive(Default)]
pub struct ConsoleLog {
    pub lines: Mutex<Vec<String>>,
}

impl Log for ConsoleLog {}

pub static CONSOLE_LOG: LazyLock<TypeHandle> = LazyLock::new(|| {
    NativeClass::class::<ConsoleLog>("ConsoleLog")
        .implements(&LOG)
        .default_constructor(ConsoleLog::default)
        .method(MethodDef::new("log").param("message", NativeType::String), |log, args| {
            let message: String = arg(args, 0)?;
            log.lines.lock().unwrap().push(message);
            Ok(NativeValue::Null)
        })
        .method(MethodDef::new("clear").expose(Expose::function()), |log, _| {
            log.lines.lock().unwrap().clear();
            Ok(NativeValue::Null)
        })
        .build()
});

impl NativeObject for ConsoleLog {
    fn native_class(&self) -> TypeHandle {
        CONSOLE_LOG.clone()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Implements the logger interface but is unrelated to [`ConsoleLog`].
#[derive(Default)]
pub struct UpperLog {
    pub lines: Mutex<Vec<String>>,
}

impl Log for UpperLog {}

pub static UPPER_LOG: LazyLock<TypeHandle> = LazyLock::new(|| {
    NativeClass::class::<UpperLog>("UpperLog")
        .implements(&LOG)
        .method(MethodDef::new("log").param("message", NativeType::String), |log, args| {
            let message: String = arg(args, 0)?;
            log.lines.lock().unwrap().push(message.to_uppercase());
            Ok(NativeValue::Null)
        })
        .build()
});

impl NativeObject for UpperLog {
    fn native_class(&self) -> TypeHandle {
        UPPER_LOG.clone()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

// =============================================================================
// Class hierarchy
// =============================================================================

pub struct Animal {
    pub name: String,
}

pub static ANIMAL: LazyLock<TypeHandle> = LazyLock::new(|| {
    NativeClass::class::<Animal>("Animal")
        .method(
            MethodDef::new("Name")
                .returns(NativeType::String)
                .expose(Expose::function_as("name")),
            |animal, _| Ok(animal.name.as_str().into()),
        )
        .method(
            MethodDef::new("Speak")
                .returns(NativeType::String)
                .expose(Expose::function_as("speak")),
            |_, _| Ok("...".into()),
        )
        .build()
});

impl NativeObject for Animal {
    fn native_class(&self) -> TypeHandle {
        ANIMAL.clone()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

pub struct Dog {
    pub animal: Animal,
}

impl Dog {
    pub fn new(name: &str) -> Self {
        Self {
            animal: Animal {
                name: name.to_string(),
            },
        }
    }
}

pub static DOG: LazyLock<TypeHandle> = LazyLock::new(|| {
    NativeClass::class::<Dog>("Dog")
        .extends(&ANIMAL)
        .method(
            MethodDef::new("Speak")
                .returns(NativeType::String)
                .expose(Expose::function_as("bark")),
            |_, _| Ok("woof".into()),
        )
        .build()
});

impl NativeObject for Dog {
    fn native_class(&self) -> TypeHandle {
        DOG.clone()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn upcast(&self, type_id: TypeId) -> Option<&dyn Any> {
        (type_id == TypeId::of::<Animal>()).then_some(&self.animal as &dyn Any)
    }
}

/// Holds a pet, so its signature references another class.
pub struct Kennel {
    pub pet: ObjectRef,
}

pub static KENNEL: LazyLock<TypeHandle> = LazyLock::new(|| {
    NativeClass::class::<Kennel>("Kennel")
        .readonly_property(
            PropertyDef::new("pet", NativeType::object(&ANIMAL)).expose(Expose::property()),
            |kennel| Ok(kennel.pet.clone().into()),
        )
        .method(
            MethodDef::new("adopt")
                .param("animal", NativeType::object(&ANIMAL))
                .returns(NativeType::String)
                .expose(Expose::function()),
            |_, args| {
                let name = match args.first() {
                    Some(NativeValue::Object(object)) => object.native_class().name().to_string(),
                    _ => "nobody".to_string(),
                };
                Ok(name.into())
            },
        )
        .build()
});

impl NativeObject for Kennel {
    fn native_class(&self) -> TypeHandle {
        KENNEL.clone()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

// =============================================================================
// Event source
// =============================================================================

#[derive(Default)]
pub struct Button {
    pub handlers: Mutex<Vec<NativeCallable>>,
}

impl Button {
    /// Fire the click event; returns the number of handlers called.
    pub fn click(&self, x: i32) -> anyhow::Result<usize> {
        let handlers = self.handlers.lock().unwrap().clone();
        for handler in &handlers {
            handler.call(&[NativeValue::I32(x)])?;
        }
        Ok(handlers.len())
    }
}

pub fn clicked_shape() -> CallableShape {
    CallableShape::new("ClickHandler").param("x", NativeType::I32)
}

pub static BUTTON: LazyLock<TypeHandle> = LazyLock::new(|| {
    NativeClass::class::<Button>("Button")
        .default_constructor(Button::default)
        .event(
            EventDef::new("Clicked", clicked_shape()).expose(Expose::event()),
            |button, handler| {
                if let Some(handler) = handler {
                    button.handlers.lock().unwrap().push(handler);
                }
                Ok(())
            },
            |button, handler| {
                if let Some(handler) = handler {
                    button.handlers.lock().unwrap().retain(|h| !h.ptr_eq(&handler));
                }
                Ok(())
            },
        )
        .method(
            MethodDef::new("click")
                .param("x", NativeType::I32)
                .returns(NativeType::I32)
                .expose(Expose::function()),
            |button, args| {
                let fired = button.click(arg(args, 0)?)?;
                Ok(NativeValue::I32(i32::try_from(fired)?))
            },
        )
        .build()
});

impl NativeObject for Button {
    fn native_class(&self) -> TypeHandle {
        BUTTON.clone()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

// =============================================================================
// Enumerations and dates on an object
// =============================================================================

pub struct Painter {
    pub color: Mutex<i64>,
    pub access: Mutex<i64>,
    pub created: Mutex<NativeDate>,
}

impl Default for Painter {
    fn default() -> Self {
        Self {
            color: Mutex::new(1),
            access: Mutex::new(1),
            created: Mutex::new(NativeDate::MIN_UTC),
        }
    }
}

fn enum_raw(value: &NativeValue) -> anyhow::Result<i64> {
    match value {
        NativeValue::Enum(_, raw) => Ok(*raw),
        other => Err(anyhow::anyhow!("expected an enum, got {}", other.kind_name())),
    }
}

pub static PAINTER: LazyLock<TypeHandle> = LazyLock::new(|| {
    NativeClass::class::<Painter>("Painter")
        .default_constructor(Painter::default)
        .property(
            PropertyDef::new("color", NativeType::Enum(COLOR.clone())).expose(Expose::property()),
            |p| Ok(NativeValue::Enum(COLOR.clone(), *p.color.lock().unwrap())),
            |p, v| {
                *p.color.lock().unwrap() = enum_raw(&v)?;
                Ok(())
            },
        )
        .property(
            PropertyDef::new("access", NativeType::Enum(ACCESS.clone())).expose(Expose::property()),
            |p| Ok(NativeValue::Enum(ACCESS.clone(), *p.access.lock().unwrap())),
            |p, v| {
                *p.access.lock().unwrap() = enum_raw(&v)?;
                Ok(())
            },
        )
        .property(
            PropertyDef::new("created", NativeType::DateTime).expose(Expose::property()),
            |p| Ok(NativeValue::DateTime(*p.created.lock().unwrap())),
            |p, v| {
                *p.created.lock().unwrap() = NativeDate::try_from(&v)?;
                Ok(())
            },
        )
        .build()
});

impl NativeObject for Painter {
    fn native_class(&self) -> TypeHandle {
        PAINTER.clone()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

// =============================================================================
// Constructors
// =============================================================================

pub struct Counter {
    pub value: AtomicI32,
    pub step: i32,
}

pub static COUNTER: LazyLock<TypeHandle> = LazyLock::new(|| {
    NativeClass::class::<Counter>("Counter")
        .constructor(Vec::new(), |_| {
            Ok(Counter {
                value: AtomicI32::new(0),
                step: 1,
            })
        })
        .constructor(vec![Param::new("start", NativeType::I32)], |args| {
            Ok(Counter {
                value: AtomicI32::new(arg(args, 0)?),
                step: 1,
            })
        })
        .constructor(
            vec![
                Param::new("start", NativeType::I32),
                Param::new("step", NativeType::I32),
            ],
            |args| {
                let step: i32 = arg(args, 1)?;
                if step == 0 {
                    anyhow::bail!("step must not be zero");
                }
                Ok(Counter {
                    value: AtomicI32::new(arg(args, 0)?),
                    step,
                })
            },
        )
        .method(
            MethodDef::new("increment")
                .returns(NativeType::I32)
                .expose(Expose::function()),
            |counter, _| {
                let next = counter.value.fetch_add(counter.step, Ordering::Relaxed) + counter.step;
                Ok(NativeValue::I32(next))
            },
        )
        .readonly_property(
            PropertyDef::new("value", NativeType::I32).expose(Expose::property()),
            |counter| Ok(NativeValue::I32(counter.value.load(Ordering::Relaxed))),
        )
        .build()
});

impl NativeObject for Counter {
    fn native_class(&self) -> TypeHandle {
        COUNTER.clone()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
