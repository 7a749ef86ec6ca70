use super::object::ScriptObject;
use super::value::ScriptValue;

/// The part of a script engine the exposer needs: a global scope to publish
/// values into.
pub trait ScriptEngine {
    fn set_global_value(&self, name: &str, value: ScriptValue);

    fn global_value(&self, name: &str) -> Option<ScriptValue>;
}

/// Minimal in-process engine: a global object and nothing else.
#[derive(Debug, Default)]
pub struct Realm {
    global: ScriptObject,
}

impl Realm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn global(&self) -> &ScriptObject {
        &self.global
    }
}

impl ScriptEngine for Realm {
    fn set_global_value(&self, name: &str, value: ScriptValue) {
        self.global.insert(name, value);
    }

    fn global_value(&self, name: &str) -> Option<ScriptValue> {
        self.global.own_property(name).and_then(|_| self.global.get(name).ok())
    }
}
