use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;

use super::function::ScriptFunction;
use super::value::ScriptValue;
use crate::error::{Error, Result};
use crate::proxy::ProxyInstance;

/// An own property of a script object.
#[derive(Clone, Debug)]
pub enum Property {
    Data(ScriptValue),
    Accessor {
        get: Option<ScriptFunction>,
        set: Option<ScriptFunction>,
    },
}

struct ObjectData {
    class_name: String,
    prototype: Option<ScriptObject>,
    /// Native instance behind a proxy object.
    host: Option<Arc<ProxyInstance>>,
    properties: RwLock<Vec<(String, Property)>>,
}

/// A script object: ordered own properties plus an optional prototype.
///
/// Clones share the same object.
#[derive(Clone)]
pub struct ScriptObject(Arc<ObjectData>);

impl Default for ScriptObject {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptObject {
    /// A plain object with no prototype.
    pub fn new() -> Self {
        Self::build("Object", None, None)
    }

    pub fn with_prototype(prototype: ScriptObject, class_name: impl Into<String>) -> Self {
        Self::build(class_name, Some(prototype), None)
    }

    pub(crate) fn with_host(
        prototype: ScriptObject,
        class_name: impl Into<String>,
        host: Arc<ProxyInstance>,
    ) -> Self {
        Self::build(class_name, Some(prototype), Some(host))
    }

    fn build(
        class_name: impl Into<String>,
        prototype: Option<ScriptObject>,
        host: Option<Arc<ProxyInstance>>,
    ) -> Self {
        Self(Arc::new(ObjectData {
            class_name: class_name.into(),
            prototype,
            host,
            properties: RwLock::new(Vec::new()),
        }))
    }

    pub fn class_name(&self) -> &str {
        &self.0.class_name
    }

    pub fn prototype(&self) -> Option<&ScriptObject> {
        self.0.prototype.as_ref()
    }

    /// The native instance this object is a proxy for.
    pub fn host(&self) -> Option<&Arc<ProxyInstance>> {
        self.0.host.as_ref()
    }

    /// True for objects created by script code rather than by a proxy.
    pub fn is_plain(&self) -> bool {
        self.0.host.is_none()
    }

    /// Define or replace an own property.
    pub fn define(&self, name: impl Into<String>, property: Property) {
        let name = name.into();
        let mut properties = self.0.properties.write();
        match properties.iter_mut().find(|(key, _)| *key == name) {
            Some((_, slot)) => *slot = property,
            None => properties.push((name, property)),
        }
    }

    /// Define or replace an own data property.
    pub fn insert(&self, name: impl Into<String>, value: impl Into<ScriptValue>) {
        self.define(name, Property::Data(value.into()));
    }

    pub fn own_property(&self, name: &str) -> Option<Property> {
        self.0
            .properties
            .read()
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, property)| property.clone())
    }

    pub fn own_keys(&self) -> Vec<String> {
        self.0
            .properties
            .read()
            .iter()
            .map(|(key, _)| key.clone())
            .collect()
    }

    /// Find `name` on this object or along its prototype chain.
    pub fn lookup(&self, name: &str) -> Option<Property> {
        let mut current = Some(self);
        while let Some(object) = current {
            if let Some(property) = object.own_property(name) {
                return Some(property);
            }
            current = object.prototype();
        }
        None
    }

    pub fn has(&self, name: &str) -> bool {
        self.lookup(name).is_some()
    }

    /// Read a property, running its getter when it is an accessor.
    pub fn get(&self, name: &str) -> Result<ScriptValue> {
        match self.lookup(name) {
            Some(Property::Data(value)) => Ok(value),
            Some(Property::Accessor { get: Some(getter), .. }) => {
                getter.call(&ScriptValue::Object(self.clone()), &[])
            }
            Some(Property::Accessor { get: None, .. }) | None => Ok(ScriptValue::Undefined),
        }
    }

    /// Write a property, running its setter when it is an accessor.
    pub fn set(&self, name: &str, value: ScriptValue) -> Result<()> {
        match self.lookup(name) {
            Some(Property::Accessor { set: Some(setter), .. }) => {
                setter.call(&ScriptValue::Object(self.clone()), &[value])?;
                Ok(())
            }
            Some(Property::Accessor { set: None, .. }) => Err(Error::script(format!(
                "property '{name}' of {} is read-only",
                self.class_name()
            ))),
            Some(Property::Data(_)) | None => {
                self.insert(name, value);
                Ok(())
            }
        }
    }

    /// Own properties in definition order, accessors evaluated.
    pub fn entries(&self) -> Result<Vec<(String, ScriptValue)>> {
        self.own_keys()
            .into_iter()
            .map(|key| {
                let value = self.get(&key)?;
                Ok((key, value))
            })
            .collect()
    }

    /// Call the function stored under `name` with this object as `this`.
    pub fn call_method(&self, name: &str, args: &[ScriptValue]) -> Result<ScriptValue> {
        match self.get(name)? {
            ScriptValue::Function(function) => {
                function.call(&ScriptValue::Object(self.clone()), args)
            }
            other => Err(Error::script(format!(
                "{}.{name} is not a function (got {})",
                self.class_name(),
                other.type_name()
            ))),
        }
    }

    pub fn ptr_eq(&self, other: &ScriptObject) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for ScriptObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScriptObject")
            .field("class", &self.0.class_name)
            .field("keys", &self.own_keys())
            .field("proxy", &self.0.host.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_replaces_in_place() {
        let object = ScriptObject::new();
        object.insert("a", 1);
        object.insert("b", 2);
        object.insert("a", 3);
        assert_eq!(object.own_keys(), vec!["a", "b"]);
        assert_eq!(object.get("a").unwrap(), ScriptValue::Int(3));
    }

    #[test]
    fn test_prototype_lookup_and_accessors() {
        let proto = ScriptObject::new();
        proto.define(
            "answer",
            Property::Accessor {
                get: Some(ScriptFunction::new("get answer", |_, _| Ok(ScriptValue::Int(42)))),
                set: None,
            },
        );
        let object = ScriptObject::with_prototype(proto, "Thing");
        assert_eq!(object.get("answer").unwrap(), ScriptValue::Int(42));
        assert!(object.set("answer", ScriptValue::Int(1)).is_err());
        assert_eq!(object.get("missing").unwrap(), ScriptValue::Undefined);
        assert!(object.own_keys().is_empty());
    }

    #[test]
    fn test_call_method_binds_this() {
        let object = ScriptObject::new();
        object.insert("name", "box");
        object.insert(
            "describe",
            ScriptFunction::new("describe", |this, _| match this {
                ScriptValue::Object(o) => o.get("name"),
                _ => Ok(ScriptValue::Undefined),
            }),
        );
        assert_eq!(
            object.call_method("describe", &[]).unwrap(),
            ScriptValue::string("box")
        );
        assert!(object.call_method("name", &[]).is_err());
    }
}
