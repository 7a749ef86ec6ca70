//! Proxy definitions: per-type operation plans plus the prototype object
//! scripts see.

use std::fmt;
use std::sync::Arc;

use super::instance::ProxyInstance;
use super::interp;
use crate::error::{Error, Result};
use crate::exposer::Exposer;
use crate::logging::warn;
use crate::native::{
    ConstructorBody, EventBody, GetterBody, MemberCategory, MethodBody, NativeCallable,
    NativeObject, NativeType, NativeValue, Param, SetterBody, TypeHandle,
};
use crate::policy::ConversionError;
use crate::resolve::{MemberKind, ResolutionError};
use crate::script::{ScriptObject, ScriptValue};

/// Whether a definition wraps a concrete class or an interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProxyMode {
    /// Members are bound to the class's own implementations.
    Instance,
    /// Members are looked up by name on each wrapped instance's runtime
    /// class.
    Interface,
}

/// One step of a member's adapter.
#[derive(Debug, Clone, PartialEq)]
pub enum Op {
    /// Convert script argument `index` to the native parameter type.
    /// Missing arguments convert as `undefined`.
    Unmarshal { index: usize, ty: NativeType },
    /// Pass every argument from `index` on to the native side unconverted.
    CollectRest { index: usize },
    /// Call the native member with the arguments gathered so far.
    Invoke,
    /// Check the native result against `ret` and convert it to a script
    /// value.
    Marshal { ret: NativeType },
    /// Drop the native result and produce `undefined`.
    Discard,
}

/// Operations converting script arguments for `params`, invoking, and
/// handling a result of type `ret`.
pub(crate) fn signature_ops(params: &[Param], ret: &NativeType) -> Vec<Op> {
    let mut ops: Vec<Op> = params
        .iter()
        .enumerate()
        .map(|(index, param)| {
            if param.variadic {
                Op::CollectRest { index }
            } else {
                Op::Unmarshal {
                    index,
                    ty: param.ty.clone(),
                }
            }
        })
        .collect();
    ops.push(Op::Invoke);
    ops.push(if ret.is_void() {
        Op::Discard
    } else {
        Op::Marshal { ret: ret.clone() }
    });
    ops
}

/// Native entry point of a member. `None` bodies are looked up by name on
/// the wrapped instance's runtime class at call time.
#[derive(Clone)]
pub(crate) enum Target {
    Method(Option<MethodBody>),
    Get(Option<GetterBody>),
    Set(Option<SetterBody>),
    Subscribe(Option<EventBody>),
    Unsubscribe(Option<EventBody>),
}

/// The adapter behind one exposed script member.
pub struct MemberPlan {
    pub(crate) exposed_name: String,
    pub(crate) member_name: String,
    pub(crate) kind: MemberKind,
    pub(crate) ops: Vec<Op>,
    pub(crate) target: Target,
}

impl MemberPlan {
    pub fn exposed_name(&self) -> &str {
        &self.exposed_name
    }

    pub fn member_name(&self) -> &str {
        &self.member_name
    }

    pub fn kind(&self) -> MemberKind {
        self.kind
    }

    pub fn ops(&self) -> &[Op] {
        &self.ops
    }

    /// Run this member against `instance` with script arguments.
    pub(crate) fn call(
        &self,
        exposer: &Exposer,
        instance: &ProxyInstance,
        args: &[ScriptValue],
    ) -> Result<ScriptValue> {
        interp::run(exposer, &self.ops, args, |natives| {
            self.invoke(instance.target().as_ref(), natives)
        })
    }

    fn invoke(&self, object: &dyn NativeObject, natives: Vec<NativeValue>) -> Result<NativeValue> {
        let member = self.member_name.as_str();
        let failed = |err: anyhow::Error| Error::from_native(member, err);
        let missing = |category: MemberCategory| -> Error {
            ResolutionError::UnknownMember {
                type_name: object.native_class().name().to_string(),
                member: member.to_string(),
                category,
            }
            .into()
        };

        match &self.target {
            Target::Method(body) => {
                let body = match body {
                    Some(body) => body.clone(),
                    None => object
                        .native_class()
                        .method_impl(member)
                        .and_then(|m| m.body.clone())
                        .ok_or_else(|| missing(MemberCategory::Method))?,
                };
                body(object, &natives).map_err(failed)
            }
            Target::Get(body) => {
                let body = match body {
                    Some(body) => body.clone(),
                    None => object
                        .native_class()
                        .property_impl(member, false)
                        .and_then(|p| p.getter.clone())
                        .ok_or_else(|| missing(MemberCategory::Property))?,
                };
                body(object).map_err(failed)
            }
            Target::Set(body) => {
                let body = match body {
                    Some(body) => body.clone(),
                    None => object
                        .native_class()
                        .property_impl(member, true)
                        .and_then(|p| p.setter.clone())
                        .ok_or_else(|| missing(MemberCategory::Property))?,
                };
                let value = natives.into_iter().next().unwrap_or(NativeValue::Null);
                body(object, value).map_err(failed)?;
                Ok(NativeValue::Null)
            }
            Target::Subscribe(body) | Target::Unsubscribe(body) => {
                let subscribe = matches!(self.target, Target::Subscribe(_));
                let body = match body {
                    Some(body) => body.clone(),
                    None => object
                        .native_class()
                        .event_impl(member)
                        .and_then(|e| if subscribe { e.add.clone() } else { e.remove.clone() })
                        .ok_or_else(|| missing(MemberCategory::Event))?,
                };
                let handler = handler_argument(natives.into_iter().next())?;
                body(object, handler).map_err(failed)?;
                Ok(NativeValue::Null)
            }
        }
    }
}

fn handler_argument(value: Option<NativeValue>) -> Result<Option<NativeCallable>> {
    match value {
        None | Some(NativeValue::Null) => Ok(None),
        Some(NativeValue::Callable(callable)) => Ok(Some(callable)),
        Some(other) => Err(ConversionError::mismatch("callable", other.kind_name()).into()),
    }
}

impl fmt::Debug for MemberPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemberPlan")
            .field("exposed_name", &self.exposed_name)
            .field("member_name", &self.member_name)
            .field("kind", &self.kind)
            .field("ops", &self.ops)
            .finish()
    }
}

/// A constructor overload reachable from script.
pub struct ConstructorPlan {
    pub(crate) params: Vec<Param>,
    pub(crate) ops: Vec<Op>,
    pub(crate) body: ConstructorBody,
}

impl ConstructorPlan {
    pub fn params(&self) -> &[Param] {
        &self.params
    }

    pub fn ops(&self) -> &[Op] {
        &self.ops
    }

    fn accepts(&self, arity: usize) -> bool {
        match self.params.last() {
            Some(last) if last.variadic => arity + 1 >= self.params.len(),
            _ => arity == self.params.len(),
        }
    }
}

/// Everything needed to wrap instances of one native type.
///
/// Built at most once per type by the exposer and shared by every proxy
/// instance of that type.
pub struct ProxyDefinition {
    pub(crate) class: TypeHandle,
    pub(crate) mode: ProxyMode,
    pub(crate) name: String,
    pub(crate) members: Vec<Arc<MemberPlan>>,
    pub(crate) constructors: Vec<ConstructorPlan>,
    pub(crate) prototype: ScriptObject,
}

impl ProxyDefinition {
    pub fn class(&self) -> &TypeHandle {
        &self.class
    }

    pub fn mode(&self) -> ProxyMode {
        self.mode
    }

    /// Class name reported by proxy objects.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn members(&self) -> &[Arc<MemberPlan>] {
        &self.members
    }

    /// First plan exposed under `exposed_name`.
    pub fn member(&self, exposed_name: &str) -> Option<&Arc<MemberPlan>> {
        self.members.iter().find(|m| m.exposed_name == exposed_name)
    }

    pub fn constructors(&self) -> &[ConstructorPlan] {
        &self.constructors
    }

    /// Shared prototype holding the member functions and accessors.
    pub fn prototype(&self) -> &ScriptObject {
        &self.prototype
    }

    /// Run the constructor overload matching the argument count and wrap
    /// the new instance.
    pub(crate) fn construct(&self, exposer: &Exposer, args: &[ScriptValue]) -> Result<ScriptValue> {
        let type_name = self.class.name();
        let plan = self
            .constructors
            .iter()
            .find(|plan| plan.accepts(args.len()))
            .ok_or_else(|| super::ConstructionError::NoMatchingConstructor {
                type_name: type_name.to_string(),
                arity: args.len(),
            })?;

        let result = interp::run(exposer, &plan.ops, args, |natives| {
            (plan.body)(&natives)
                .map(NativeValue::Object)
                .map_err(|source| {
                    super::ConstructionError::Failed {
                        type_name: type_name.to_string(),
                        source,
                    }
                    .into()
                })
        });

        result.map_err(|err| {
            warn!(class = type_name, error = %err, "construction failed");
            match err {
                Error::Conversion(source) => super::ConstructionError::Argument {
                    type_name: type_name.to_string(),
                    source,
                }
                .into(),
                other => other,
            }
        })
    }
}

impl fmt::Debug for ProxyDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProxyDefinition")
            .field("class", &self.class.name())
            .field("mode", &self.mode)
            .field("name", &self.name)
            .field("members", &self.members)
            .field("constructors", &self.constructors.len())
            .finish()
    }
}
