//! Executes a member's operation sequence.

use super::definition::Op;
use crate::error::{Error, Result};
use crate::exposer::Exposer;
use crate::native::NativeValue;
use crate::script::ScriptValue;

/// Run `ops` over script `args`. `invoke` receives the converted native
/// arguments when the sequence reaches [`Op::Invoke`].
pub(crate) fn run<F>(exposer: &Exposer, ops: &[Op], args: &[ScriptValue], invoke: F) -> Result<ScriptValue>
where
    F: FnOnce(Vec<NativeValue>) -> Result<NativeValue>,
{
    let mut invoke = Some(invoke);
    let mut natives: Vec<NativeValue> = Vec::with_capacity(args.len());
    let mut result = NativeValue::Null;
    let mut out = ScriptValue::Undefined;

    for op in ops {
        match op {
            Op::Unmarshal { index, ty } => {
                let value = match args.get(*index) {
                    Some(arg) => exposer.to_native(arg, ty)?,
                    None => exposer.to_native(&ScriptValue::Undefined, ty)?,
                };
                natives.push(value);
            }
            Op::CollectRest { index } => {
                let rest = args
                    .iter()
                    .skip(*index)
                    .cloned()
                    .map(NativeValue::Script)
                    .collect();
                natives.push(NativeValue::Array(rest));
            }
            Op::Invoke => {
                let call = invoke
                    .take()
                    .ok_or_else(|| Error::script("member adapter invokes more than once"))?;
                result = call(std::mem::take(&mut natives))?;
            }
            Op::Marshal { ret } => out = exposer.to_script_as(&result, ret)?,
            Op::Discard => out = ScriptValue::Undefined,
        }
    }

    Ok(out)
}
