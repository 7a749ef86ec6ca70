//! Callback bridge: script functions passed where native code expects a
//! callable.
//!
//! Each (callable shape, script function) pair gets one native wrapper. The
//! binding table only holds the script function weakly; the function itself
//! is kept in the [`DelegateRegistry`] under a counter id that the wrapper
//! carries.

mod registry;

use std::sync::Arc;

use parking_lot::Mutex;

pub use registry::DelegateRegistry;

use crate::error::{Error, Result};
use crate::exposer::{Exposer, WeakExposer};
use crate::logging::{debug, error};
use crate::native::{CallableShape, NativeCallable, NativeValue};
use crate::policy::ConversionError;
use crate::script::{ScriptFunction, ScriptValue, WeakScriptFunction};

struct CallbackBinding {
    shape: Arc<CallableShape>,
    function: WeakScriptFunction,
    wrapper: NativeCallable,
}

/// Binding table plus the registry that backs it.
#[derive(Default)]
pub struct CallbackBridge {
    bindings: Mutex<Vec<CallbackBinding>>,
    registry: DelegateRegistry,
}

impl CallbackBridge {
    pub fn new() -> Self {
        Self::default()
    }

    /// Live bindings.
    pub fn len(&self) -> usize {
        self.bindings.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.lock().is_empty()
    }

    pub fn registry(&self) -> &DelegateRegistry {
        &self.registry
    }

    /// The existing wrapper for (`shape`, `function`), or a new one.
    pub(crate) fn wrap(
        &self,
        exposer: WeakExposer,
        function: &ScriptFunction,
        shape: &Arc<CallableShape>,
    ) -> NativeCallable {
        let mut bindings = self.bindings.lock();

        let before = bindings.len();
        bindings.retain(|binding| binding.function.is_alive());
        if bindings.len() != before {
            debug!(pruned = before - bindings.len(), "pruned stale callback bindings");
        }

        if let Some(binding) = bindings
            .iter()
            .find(|binding| *binding.shape == **shape && binding.function.points_to(function))
        {
            return binding.wrapper.clone();
        }

        let id = self.registry.add(function.clone());
        let wrapper = delegate_wrapper(exposer, id, shape.clone());
        debug!(id, shape = %shape.name, function = function.name(), "created callback wrapper");
        bindings.push(CallbackBinding {
            shape: shape.clone(),
            function: function.downgrade(),
            wrapper: wrapper.clone(),
        });
        wrapper
    }
}

fn delegate_wrapper(exposer: WeakExposer, id: u64, shape: Arc<CallableShape>) -> NativeCallable {
    let call_shape = shape.clone();
    NativeCallable::new(shape, move |args| {
        let exposer = exposer.upgrade()?;
        exposer.invoke_delegate(id, &call_shape, args).map_err(|err| {
            error!(id, shape = %call_shape.name, error = %err, "script callback failed");
            anyhow::Error::from(err)
        })
    })
}

impl Exposer {
    /// Native callable of the given shape that calls `function`.
    ///
    /// Repeated calls with the same function and shape return the same
    /// wrapper.
    pub fn wrap_script_callable(
        &self,
        function: &ScriptFunction,
        shape: &Arc<CallableShape>,
    ) -> NativeCallable {
        self.shared()
            .callbacks
            .wrap(self.downgrade(), function, shape)
    }

    /// Call registered delegate `id` with native arguments.
    pub(crate) fn invoke_delegate(
        &self,
        id: u64,
        shape: &CallableShape,
        args: &[NativeValue],
    ) -> Result<NativeValue> {
        let function = self
            .shared()
            .callbacks
            .registry()
            .get(id)
            .ok_or_else(|| Error::script(format!("delegate {id} is not registered")))?;

        let script_args = self.callback_arguments(shape, args)?;
        let result = function.call(&ScriptValue::Undefined, &script_args)?;
        if shape.is_void() {
            Ok(NativeValue::Null)
        } else {
            self.to_native(&result, &shape.ret)
        }
    }

    /// Convert native callback arguments to script values. A variadic tail
    /// must hold script values and is spread as-is.
    fn callback_arguments(&self, shape: &CallableShape, args: &[NativeValue]) -> Result<Vec<ScriptValue>> {
        let mut out = Vec::with_capacity(args.len());
        for (index, param) in shape.params.iter().enumerate() {
            let arg = args.get(index);
            if !param.variadic {
                out.push(match arg {
                    Some(value) => self.to_script(value)?,
                    None => ScriptValue::Undefined,
                });
                continue;
            }
            match arg {
                None | Some(NativeValue::Null) => {}
                Some(NativeValue::Array(items)) => {
                    for item in items {
                        match item {
                            NativeValue::Script(value) => out.push(value.clone()),
                            other => {
                                return Err(ConversionError::mismatch(
                                    "script value",
                                    other.kind_name(),
                                )
                                .into());
                            }
                        }
                    }
                }
                Some(other) => {
                    return Err(ConversionError::mismatch("array", other.kind_name()).into());
                }
            }
        }
        Ok(out)
    }

    /// Live callback bindings.
    pub fn callback_count(&self) -> usize {
        self.shared().callbacks.len()
    }

    /// Script functions retained by the delegate registry.
    pub fn delegate_count(&self) -> usize {
        self.shared().callbacks.registry().len()
    }
}
