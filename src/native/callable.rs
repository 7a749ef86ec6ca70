use std::fmt;
use std::sync::Arc;

use super::value::{NativeType, NativeValue};

/// A single parameter of a native member or callable.
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub name: String,
    pub ty: NativeType,
    /// Collects every remaining argument. Only valid as the last parameter.
    pub variadic: bool,
}

impl Param {
    pub fn new(name: impl Into<String>, ty: NativeType) -> Self {
        Self {
            name: name.into(),
            ty,
            variadic: false,
        }
    }

    /// A trailing parameter that receives the remaining arguments as
    /// unconverted script values.
    pub fn rest(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ty: NativeType::array(NativeType::Any),
            variadic: true,
        }
    }
}

/// Parameter list and return type of a native callable.
#[derive(Debug, Clone, PartialEq)]
pub struct CallableShape {
    pub name: String,
    pub params: Vec<Param>,
    pub ret: NativeType,
}

impl CallableShape {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            params: Vec::new(),
            ret: NativeType::Void,
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

    /// `(...args) -> any`, the shape used when a script function is
    /// converted without a declared target shape.
    pub fn any() -> Self {
        Self::new("Function").rest("args").returns(NativeType::Any)
    }

    pub fn is_void(&self) -> bool {
        self.ret.is_void()
    }
}

pub(crate) type CallableBody = dyn Fn(&[NativeValue]) -> anyhow::Result<NativeValue> + Send + Sync;

/// A native function value (delegate).
///
/// Cloning is cheap and preserves identity: two clones are
/// [`ptr_eq`](NativeCallable::ptr_eq).
#[derive(Clone)]
pub struct NativeCallable {
    shape: Arc<CallableShape>,
    body: Arc<CallableBody>,
}

impl NativeCallable {
    pub fn new<F>(shape: impl Into<Arc<CallableShape>>, body: F) -> Self
    where
        F: Fn(&[NativeValue]) -> anyhow::Result<NativeValue> + Send + Sync + 'static,
    {
        Self {
            shape: shape.into(),
            body: Arc::new(body),
        }
    }

    pub fn shape(&self) -> &Arc<CallableShape> {
        &self.shape
    }

    pub fn call(&self, args: &[NativeValue]) -> anyhow::Result<NativeValue> {
        (self.body)(args)
    }

    pub fn ptr_eq(&self, other: &NativeCallable) -> bool {
        Arc::ptr_eq(&self.body, &other.body)
    }
}

impl fmt::Debug for NativeCallable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeCallable")
            .field("shape", &self.shape)
            .finish_non_exhaustive()
    }
}
