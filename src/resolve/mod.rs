//! Metadata resolver.
//!
//! Computes the ordered list of members a type exposes to scripts. Sources
//! are visited in a fixed order and the first claim on a member (or on an
//! exposed name) wins:
//!
//! 1. the type itself, then each base type, most derived first; for each
//!    type its own annotations in declaration order, then the descriptors
//!    registered for exactly that type;
//! 2. every implemented interface, in declaration order.
//!
//! Members without an annotation or a registered descriptor are never
//! exposed.

mod error;

use std::any::TypeId;
use std::collections::HashMap;
use std::collections::HashSet;
use std::collections::hash_map::Entry;
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;

pub use error::ResolutionError;

use crate::config::EventConfig;
use crate::logging::{trace, warn};
use crate::native::{Expose, MemberCategory, NativeClass, TypeHandle};

/// The role a generated script member plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemberKind {
    Method,
    PropertyGet,
    PropertySet,
    EventAdd,
    EventRemove,
}

impl MemberKind {
    pub fn category(self) -> MemberCategory {
        match self {
            MemberKind::Method => MemberCategory::Method,
            MemberKind::PropertyGet | MemberKind::PropertySet => MemberCategory::Property,
            MemberKind::EventAdd | MemberKind::EventRemove => MemberCategory::Event,
        }
    }
}

impl fmt::Display for MemberKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MemberKind::Method => write!(f, "method"),
            MemberKind::PropertyGet => write!(f, "getter"),
            MemberKind::PropertySet => write!(f, "setter"),
            MemberKind::EventAdd => write!(f, "event subscribe"),
            MemberKind::EventRemove => write!(f, "event unsubscribe"),
        }
    }
}

/// One member as scripts will see it.
#[derive(Debug, Clone)]
pub struct MemberDescriptor {
    /// Native member name.
    pub member_name: String,
    /// Name visible to scripts.
    pub exposed_name: String,
    pub kind: MemberKind,
    /// Type whose annotation (or registration) claimed the member.
    pub declaring_type: TypeHandle,
}

/// An annotation registered from outside a type's own declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Descriptor {
    pub member: String,
    pub expose: Expose,
}

impl Descriptor {
    pub fn new(member: impl Into<String>, expose: Expose) -> Self {
        Self {
            member: member.into(),
            expose,
        }
    }
}

/// Descriptors registered per type. The first registration for a type is
/// kept; later ones are ignored.
#[derive(Default)]
pub struct DescriptorRegistry {
    table: RwLock<HashMap<TypeId, Arc<[Descriptor]>>>,
}

impl DescriptorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `descriptors` for `class`. Returns `false` when the type
    /// already had a registration.
    pub fn register(&self, class: &NativeClass, descriptors: Vec<Descriptor>) -> bool {
        match self.table.write().entry(class.id()) {
            Entry::Occupied(_) => {
                warn!(class = class.name(), "descriptors already registered, ignoring");
                false
            }
            Entry::Vacant(slot) => {
                trace!(class = class.name(), count = descriptors.len(), "registered descriptors");
                slot.insert(descriptors.into());
                true
            }
        }
    }

    pub fn get(&self, type_id: TypeId) -> Option<Arc<[Descriptor]>> {
        self.table.read().get(&type_id).cloned()
    }

    pub fn len(&self) -> usize {
        self.table.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.read().is_empty()
    }
}

/// Resolves exposed members against a descriptor registry.
pub struct Resolver<'a> {
    registry: &'a DescriptorRegistry,
    events: &'a EventConfig,
}

impl<'a> Resolver<'a> {
    pub fn new(registry: &'a DescriptorRegistry, events: &'a EventConfig) -> Self {
        Self { registry, events }
    }

    /// Ordered exposed members of `class`.
    pub fn resolve(&self, class: &TypeHandle) -> Result<Vec<MemberDescriptor>, ResolutionError> {
        let mut collector = Collector {
            events: self.events,
            seen_members: HashSet::new(),
            seen_exposed: HashSet::new(),
            out: Vec::new(),
        };

        let mut current = Some(class);
        while let Some(ty) = current {
            collector.collect_annotated(ty);
            if let Some(registered) = self.registry.get(ty.id()) {
                for descriptor in registered.iter() {
                    if !ty.has_member(&descriptor.member, descriptor.expose.category()) {
                        return Err(ResolutionError::UnknownMember {
                            type_name: ty.name().to_string(),
                            member: descriptor.member.clone(),
                            category: descriptor.expose.category(),
                        });
                    }
                    collector.offer(ty, &descriptor.member, &descriptor.expose);
                }
            }
            current = ty.base();
        }

        for iface in class.all_interfaces() {
            collector.collect_annotated(&iface);
            if let Some(registered) = self.registry.get(iface.id()) {
                for descriptor in registered.iter() {
                    if iface.has_member(&descriptor.member, descriptor.expose.category()) {
                        collector.offer(&iface, &descriptor.member, &descriptor.expose);
                    }
                }
            }
        }

        trace!(class = class.name(), members = collector.out.len(), "resolved members");
        Ok(collector.out)
    }
}

struct Collector<'a> {
    events: &'a EventConfig,
    seen_members: HashSet<String>,
    seen_exposed: HashSet<String>,
    out: Vec<MemberDescriptor>,
}

impl Collector<'_> {
    fn collect_annotated(&mut self, ty: &TypeHandle) {
        for method in ty.methods() {
            if let Some(expose) = &method.expose {
                self.offer(ty, &method.name, expose);
            }
        }
        for property in ty.properties() {
            if let Some(expose) = &property.expose {
                self.offer(ty, &property.name, expose);
            }
        }
        for event in ty.events() {
            if let Some(expose) = &event.expose {
                self.offer(ty, &event.name, expose);
            }
        }
    }

    fn offer(&mut self, declaring: &TypeHandle, member: &str, expose: &Expose) {
        if self.seen_members.contains(member) {
            trace!(class = declaring.name(), member, "member already claimed");
            return;
        }

        let candidates = self.expand(declaring, member, expose);
        if candidates
            .iter()
            .any(|(_, exposed)| self.seen_exposed.contains(exposed))
        {
            trace!(class = declaring.name(), member, "exposed name already taken");
            return;
        }

        self.seen_members.insert(member.to_string());
        let mut names: Vec<String> = Vec::new();
        for (kind, exposed_name) in candidates {
            if !names.contains(&exposed_name) {
                names.push(exposed_name.clone());
            }
            self.out.push(MemberDescriptor {
                member_name: member.to_string(),
                exposed_name,
                kind,
                declaring_type: declaring.clone(),
            });
        }
        self.seen_exposed.extend(names);
    }

    fn expand(&self, declaring: &NativeClass, member: &str, expose: &Expose) -> Vec<(MemberKind, String)> {
        let base_name = expose.name().unwrap_or(member).to_string();
        match expose {
            Expose::Function { .. } => vec![(MemberKind::Method, base_name)],
            Expose::Property { read_only, .. } => {
                let (readable, writable) = property_access(declaring, member);
                let mut out = Vec::new();
                if readable {
                    out.push((MemberKind::PropertyGet, base_name.clone()));
                }
                if writable && !read_only {
                    out.push((MemberKind::PropertySet, base_name));
                }
                out
            }
            Expose::Event {
                add_prefix,
                remove_prefix,
                ..
            } => {
                let add = add_prefix.as_deref().unwrap_or(&self.events.add_prefix);
                let remove = remove_prefix.as_deref().unwrap_or(&self.events.remove_prefix);
                vec![
                    (MemberKind::EventAdd, format!("{add}{base_name}")),
                    (MemberKind::EventRemove, format!("{remove}{base_name}")),
                ]
            }
        }
    }
}

/// Readability and writability of property `name` as seen from `ty`.
fn property_access(ty: &NativeClass, name: &str) -> (bool, bool) {
    ty.property_signature(name)
        .map_or((true, false), |p| (p.readable, p.writable))
}
