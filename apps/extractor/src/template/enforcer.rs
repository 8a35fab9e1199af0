//! Schema Enforcer: reconciles an arbitrary patch against a template node.
//!
//! The result always has exactly the template's keys at every `Object` node:
//! patch keys the template does not define are dropped, missing keys take the
//! template default. Total over all inputs and idempotent.

use serde_json::{Map, Value};

use super::TemplateNode;

/// Reconciles `patch` against `base`. A `Null` patch means "absent".
///
/// - `Object`: exactly `base`'s fields, each enforced against the patch's
///   value for that key (a non-object patch contributes nothing).
/// - `ArrayOfObject`: one entry per patch item, each enforced against the
///   element; a non-array patch yields an empty list.
/// - `Scalar`: the patch when present, else the template default.
pub fn enforce(base: &TemplateNode, patch: &Value) -> Value {
    match base {
        TemplateNode::Object(fields) => {
            let patch_fields = patch.as_object();
            let enforced: Map<String, Value> = fields
                .iter()
                .map(|(key, node)| {
                    let child = patch_fields
                        .and_then(|m| m.get(key))
                        .unwrap_or(&Value::Null);
                    (key.clone(), enforce(node, child))
                })
                .collect();
            Value::Object(enforced)
        }
        TemplateNode::ArrayOfObject(element) => match patch {
            Value::Array(items) => {
                Value::Array(items.iter().map(|item| enforce(element, item)).collect())
            }
            _ => Value::Array(Vec::new()),
        },
        TemplateNode::Scalar(default) => {
            if patch.is_null() {
                default.clone()
            } else {
                patch.clone()
            }
        }
    }
}
