//! Proxy synthesis: turns resolved members into a [`ProxyDefinition`].

use std::any::TypeId;
use std::collections::HashSet;
use std::sync::Arc;

use super::definition::{
    ConstructorPlan, MemberPlan, Op, ProxyDefinition, ProxyMode, Target, signature_ops,
};
use super::instance::ProxyInstance;
use crate::error::{Error, Result};
use crate::exposer::{Exposer, WeakExposer};
use crate::logging::{debug, trace};
use crate::native::{MemberCategory, NativeClass, NativeType, TypeHandle};
use crate::policy::script_kind_for;
use crate::resolve::{MemberDescriptor, MemberKind, ResolutionError};
use crate::script::{Property, ScriptFunction, ScriptObject, ScriptValue};

impl Exposer {
    /// Cached definition for `class`, building it on first use.
    ///
    /// Interfaces get a [`ProxyMode::Interface`] definition, every other
    /// class a [`ProxyMode::Instance`] one.
    pub fn get_or_build(&self, class: &TypeHandle) -> Result<Arc<ProxyDefinition>> {
        let mut in_progress = HashSet::new();
        self.get_or_build_nested(class, &mut in_progress)
    }

    fn get_or_build_nested(
        &self,
        class: &TypeHandle,
        in_progress: &mut HashSet<TypeId>,
    ) -> Result<Arc<ProxyDefinition>> {
        if let Some(definition) = self.shared().proxies.get(class.id()) {
            trace!(class = class.name(), "proxy cache hit");
            return Ok(definition);
        }

        in_progress.insert(class.id());
        let built = self.synthesize(class, in_progress);
        in_progress.remove(&class.id());

        Ok(self.shared().proxies.insert(built?))
    }

    fn synthesize(
        &self,
        class: &TypeHandle,
        in_progress: &mut HashSet<TypeId>,
    ) -> Result<ProxyDefinition> {
        let mode = if class.is_interface() {
            ProxyMode::Interface
        } else {
            ProxyMode::Instance
        };

        let descriptors = self.resolve_members(class)?;
        let mut members = Vec::with_capacity(descriptors.len());
        let mut nested: Vec<TypeHandle> = Vec::new();
        for descriptor in &descriptors {
            let (plan, referenced) = plan_member(class, mode, descriptor)?;
            nested.extend(referenced);
            members.push(Arc::new(plan));
        }

        let constructors = match mode {
            ProxyMode::Instance => class
                .constructors()
                .iter()
                .map(|ctor| -> Result<ConstructorPlan> {
                    for param in &ctor.params {
                        script_kind_for(&param.ty)?;
                    }
                    Ok(ConstructorPlan {
                        params: ctor.params.clone(),
                        ops: signature_ops(&ctor.params, &NativeType::object(class)),
                        body: ctor.body.clone(),
                    })
                })
                .collect::<Result<Vec<_>>>()?,
            ProxyMode::Interface => Vec::new(),
        };

        if self.config().proxy.prebuild_nested {
            for other in nested {
                if other.is_interface()
                    || in_progress.contains(&other.id())
                    || self.shared().proxies.get(other.id()).is_some()
                {
                    continue;
                }
                trace!(class = class.name(), nested = other.name(), "prebuilding nested proxy");
                self.get_or_build_nested(&other, in_progress)?;
            }
        }

        let prototype = build_prototype(&self.downgrade(), &members);
        let name = format!("{}{}", self.config().proxy.name_prefix, class.name());
        debug!(
            class = class.name(),
            mode = ?mode,
            members = members.len(),
            constructors = constructors.len(),
            "built proxy definition"
        );

        Ok(ProxyDefinition {
            class: class.clone(),
            mode,
            name,
            members,
            constructors,
            prototype,
        })
    }
}

/// Build the plan for one resolved member, returning the class types its
/// signature references.
fn plan_member(
    class: &NativeClass,
    mode: ProxyMode,
    descriptor: &MemberDescriptor,
) -> Result<(MemberPlan, Vec<TypeHandle>)> {
    let member = descriptor.member_name.as_str();
    let declaring = &descriptor.declaring_type;
    let unknown = |category: MemberCategory| -> Error {
        ResolutionError::UnknownMember {
            type_name: declaring.name().to_string(),
            member: member.to_string(),
            category,
        }
        .into()
    };
    let bound = mode == ProxyMode::Instance;

    let (ops, target, signature_types) = match descriptor.kind {
        MemberKind::Method => {
            let method = declaring
                .method_signature(member)
                .ok_or_else(|| unknown(MemberCategory::Method))?;
            let body = if bound {
                class.method_impl(member).and_then(|m| m.body.clone())
            } else {
                None
            };
            let mut types: Vec<NativeType> = method.params.iter().map(|p| p.ty.clone()).collect();
            types.push(method.ret.clone());
            (
                signature_ops(&method.params, &method.ret),
                Target::Method(body),
                types,
            )
        }
        MemberKind::PropertyGet | MemberKind::PropertySet => {
            let property = declaring
                .property_signature(member)
                .ok_or_else(|| unknown(MemberCategory::Property))?;
            if descriptor.kind == MemberKind::PropertyGet {
                let body = if bound {
                    class.property_impl(member, false).and_then(|p| p.getter.clone())
                } else {
                    None
                };
                (
                    vec![
                        Op::Invoke,
                        Op::Marshal {
                            ret: property.ty.clone(),
                        },
                    ],
                    Target::Get(body),
                    vec![property.ty.clone()],
                )
            } else {
                let body = if bound {
                    class.property_impl(member, true).and_then(|p| p.setter.clone())
                } else {
                    None
                };
                (
                    vec![
                        Op::Unmarshal {
                            index: 0,
                            ty: property.ty.clone(),
                        },
                        Op::Invoke,
                        Op::Discard,
                    ],
                    Target::Set(body),
                    vec![property.ty.clone()],
                )
            }
        }
        MemberKind::EventAdd | MemberKind::EventRemove => {
            let event = declaring
                .event_signature(member)
                .ok_or_else(|| unknown(MemberCategory::Event))?;
            let handler = NativeType::Callable(event.handler.clone());
            let implementation = if bound { class.event_impl(member) } else { None };
            let target = if descriptor.kind == MemberKind::EventAdd {
                Target::Subscribe(implementation.and_then(|e| e.add.clone()))
            } else {
                Target::Unsubscribe(implementation.and_then(|e| e.remove.clone()))
            };
            (
                vec![
                    Op::Unmarshal {
                        index: 0,
                        ty: handler.clone(),
                    },
                    Op::Invoke,
                    Op::Discard,
                ],
                target,
                vec![handler],
            )
        }
    };

    let mut referenced = Vec::new();
    for ty in &signature_types {
        script_kind_for(ty)?;
        if let Some(nested) = ty.referenced_class() {
            if nested.id() != class.id() {
                referenced.push(nested.clone());
            }
        }
    }

    let plan = MemberPlan {
        exposed_name: descriptor.exposed_name.clone(),
        member_name: member.to_string(),
        kind: descriptor.kind,
        ops,
        target,
    };
    Ok((plan, referenced))
}

/// Prototype object holding one function per method and event member and
/// one accessor per property.
fn build_prototype(exposer: &WeakExposer, members: &[Arc<MemberPlan>]) -> ScriptObject {
    let prototype = ScriptObject::new();
    for plan in members {
        let function = member_function(exposer.clone(), plan.clone());
        match plan.kind {
            MemberKind::Method | MemberKind::EventAdd | MemberKind::EventRemove => {
                prototype.insert(plan.exposed_name.clone(), function);
            }
            MemberKind::PropertyGet | MemberKind::PropertySet => {
                let (mut get, mut set) = match prototype.own_property(&plan.exposed_name) {
                    Some(Property::Accessor { get, set }) => (get, set),
                    _ => (None, None),
                };
                if plan.kind == MemberKind::PropertyGet {
                    get = Some(function);
                } else {
                    set = Some(function);
                }
                prototype.define(plan.exposed_name.clone(), Property::Accessor { get, set });
            }
        }
    }
    prototype
}

fn member_function(exposer: WeakExposer, plan: Arc<MemberPlan>) -> ScriptFunction {
    ScriptFunction::new(plan.exposed_name.clone(), move |this, args| {
        let exposer = exposer.upgrade()?;
        let instance = proxy_receiver(this, &plan)?;
        plan.call(&exposer, &instance, args)
    })
}

fn proxy_receiver(this: &ScriptValue, plan: &MemberPlan) -> Result<Arc<ProxyInstance>> {
    this.as_object()
        .and_then(|object| object.host().cloned())
        .ok_or_else(|| {
            Error::script(format!(
                "{} called on an incompatible receiver ({})",
                plan.exposed_name,
                this.type_name()
            ))
        })
}
