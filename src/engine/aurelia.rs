//! Aurelia 1 implicit dependency discovery
//!
//! Aurelia 1 apps load modules by name at runtime, so a bundler cannot see
//! them through `import`. Two conventions name them explicitly:
//! `PLATFORM.moduleName('x')` in scripts and `<require from="x">` in views.

use crate::transpiler::au2::tag_attribute_values;

const MODULE_NAME_CALL: &str = "PLATFORM.moduleName(";

/// Bare module names referenced by a compiled unit.
///
/// Relative names (`./x`, `../x`) and absolute paths are left to the
/// module loader and not reported. Order of first appearance, no repeats.
pub fn find_deps(path: &str, contents: &str) -> Vec<String> {
    let mut found = if path.ends_with(".html") {
        tag_attribute_values(contents, "require", "from")
    } else {
        module_name_calls(contents)
    };

    found.retain(|name| is_bare(name));
    let mut seen = std::collections::HashSet::new();
    found.retain(|name| seen.insert(name.clone()));
    found
}

fn module_name_calls(contents: &str) -> Vec<String> {
    let mut names = vec![];
    let mut rest = contents;

    while let Some(start) = rest.find(MODULE_NAME_CALL) {
        let args = rest[start + MODULE_NAME_CALL.len()..].trim_start();
        rest = args;

        let Some(quote) = args.chars().next().filter(|c| matches!(*c, '\'' | '"' | '`')) else {
            continue;
        };
        if let Some(end) = args[1..].find(quote) {
            names.push(args[1..1 + end].to_string());
        }
    }

    names
}

fn is_bare(name: &str) -> bool {
    !name.is_empty() && !name.starts_with('.') && !name.starts_with('/')
}
