use std::fmt;
use std::sync::{Arc, Weak};

use super::value::ScriptValue;
use crate::error::Result;
use crate::native::NativeCallable;

type FunctionBody = dyn Fn(&ScriptValue, &[ScriptValue]) -> Result<ScriptValue> + Send + Sync;

struct FunctionData {
    name: String,
    body: Box<FunctionBody>,
    /// Set when this function is the script face of a native callable.
    native: Option<NativeCallable>,
}

/// A callable script value. Identity is pointer identity.
#[derive(Clone)]
pub struct ScriptFunction(Arc<FunctionData>);

impl ScriptFunction {
    /// Create a function from a body receiving `this` and the arguments.
    pub fn new<F>(name: impl Into<String>, body: F) -> Self
    where
        F: Fn(&ScriptValue, &[ScriptValue]) -> Result<ScriptValue> + Send + Sync + 'static,
    {
        Self(Arc::new(FunctionData {
            name: name.into(),
            body: Box::new(body),
            native: None,
        }))
    }

    pub(crate) fn wrapping_native<F>(callable: NativeCallable, body: F) -> Self
    where
        F: Fn(&ScriptValue, &[ScriptValue]) -> Result<ScriptValue> + Send + Sync + 'static,
    {
        Self(Arc::new(FunctionData {
            name: callable.shape().name.clone(),
            body: Box::new(body),
            native: Some(callable),
        }))
    }

    pub fn name(&self) -> &str {
        &self.0.name
    }

    pub fn call(&self, this: &ScriptValue, args: &[ScriptValue]) -> Result<ScriptValue> {
        (self.0.body)(this, args)
    }

    /// The native callable this function stands for, if any.
    pub fn native_callable(&self) -> Option<&NativeCallable> {
        self.0.native.as_ref()
    }

    pub fn downgrade(&self) -> WeakScriptFunction {
        WeakScriptFunction(Arc::downgrade(&self.0))
    }

    pub fn ptr_eq(&self, other: &ScriptFunction) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for ScriptFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScriptFunction")
            .field("name", &self.0.name)
            .field("native", &self.0.native.is_some())
            .finish()
    }
}

/// Non-owning handle to a [`ScriptFunction`].
#[derive(Clone)]
pub struct WeakScriptFunction(Weak<FunctionData>);

impl WeakScriptFunction {
    pub fn upgrade(&self) -> Option<ScriptFunction> {
        self.0.upgrade().map(ScriptFunction)
    }

    pub fn is_alive(&self) -> bool {
        self.0.strong_count() > 0
    }

    /// Whether this handle refers to `function`.
    pub fn points_to(&self, function: &ScriptFunction) -> bool {
        std::ptr::addr_eq(self.0.as_ptr(), Arc::as_ptr(&function.0))
    }
}

impl fmt::Debug for WeakScriptFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeakScriptFunction")
            .field("alive", &self.is_alive())
            .finish()
    }
}
