//! AMD wrapping of compiled units for the module loader

use crate::engine::Unit;

/// Wrap a compiled unit as a named AMD module.
///
/// Scripts become `define` calls with the CommonJS triple in scope. Any
/// other file becomes a `text!` module returning its contents.
pub fn wrap(unit: &Unit) -> String {
    let id = unit.module_id.as_deref().unwrap_or(&unit.path);

    if unit.path.ends_with(".js") {
        format!(
            "define({}, [\"require\",\"exports\",\"module\"], function (require, exports, module) {{\n{}\n}});",
            quote(id),
            unit.contents
        )
    } else {
        format!(
            "define({}, function () {{ return {}; }});",
            quote(&format!("text!{}", id)),
            quote(&unit.contents)
        )
    }
}

fn quote(s: &str) -> String {
    serde_json::Value::String(s.to_string()).to_string()
}
