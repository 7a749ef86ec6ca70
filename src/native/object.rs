use std::any::{Any, TypeId};
use std::sync::Arc;

use super::class::TypeHandle;

/// A native instance that can be handed to the script runtime.
///
/// ```ignore
/// impl NativeObject for Calculator {
///     fn native_class(&self) -> TypeHandle {
///         calculator_class()
///     }
///
///     fn as_any(&self) -> &dyn Any {
///         self
///     }
/// }
/// ```
pub trait NativeObject: Any + Send + Sync {
    /// Runtime class of this instance. Proxies are built per runtime class,
    /// never per declared type.
    fn native_class(&self) -> TypeHandle;

    fn as_any(&self) -> &dyn Any;

    /// Borrow the embedded part of this instance that plays the role of the
    /// ancestor class identified by `type_id`.
    ///
    /// Member bodies registered on a base class receive this projection when
    /// they are invoked on a derived instance.
    fn upcast(&self, type_id: TypeId) -> Option<&dyn Any> {
        let _ = type_id;
        None
    }
}

/// Shared handle to a native instance.
pub type ObjectRef = Arc<dyn NativeObject>;

/// Borrow `object` as `T`, directly or through [`NativeObject::upcast`].
pub(crate) fn receiver<T: Any>(object: &dyn NativeObject) -> Option<&T> {
    object.as_any().downcast_ref::<T>().or_else(|| {
        object
            .upcast(TypeId::of::<T>())
            .and_then(|part| part.downcast_ref::<T>())
    })
}
