use std::fmt;
use std::sync::Arc;

use super::definition::ProxyDefinition;
use crate::native::ObjectRef;
use crate::script::ScriptObject;

/// The native half of a proxy object: the shared definition plus the
/// wrapped instance, held strongly for as long as the proxy lives.
pub struct ProxyInstance {
    definition: Arc<ProxyDefinition>,
    target: ObjectRef,
}

impl ProxyInstance {
    pub fn definition(&self) -> &Arc<ProxyDefinition> {
        &self.definition
    }

    /// The wrapped native instance.
    pub fn target(&self) -> &ObjectRef {
        &self.target
    }
}

impl fmt::Debug for ProxyInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProxyInstance")
            .field("definition", &self.definition.name())
            .field("target", &self.target.native_class().name())
            .finish()
    }
}

/// Bind `target` to an existing definition. No resolution or synthesis
/// happens here.
pub(crate) fn instantiate(definition: &Arc<ProxyDefinition>, target: ObjectRef) -> ScriptObject {
    let instance = Arc::new(ProxyInstance {
        definition: definition.clone(),
        target,
    });
    ScriptObject::with_host(
        definition.prototype().clone(),
        definition.name().to_string(),
        instance,
    )
}
