//! Aurelia 2 view stage
//!
//! `src/x.html` next to `src/x.js` (or `.ts`) is a component view. It is
//! turned into an intermediate script module `src/x.html.js` exporting the
//! template, its name and its dependencies. A same-named style file is
//! imported by convention.

use crate::error::GistResult;
use crate::gist::SourceFile;
use crate::transpiler::TranspileResult;
use serde_json::Value;

const SCRIPT_EXTS: &[&str] = &["js", "ts"];
const STYLE_EXTS: &[&str] = &["css", "scss", "sass", "less"];

pub struct Au2ViewTranspiler;

impl Au2ViewTranspiler {
    pub fn matches(&self, file: &SourceFile, files: &[SourceFile]) -> bool {
        let Some(stem) = file.filename.strip_suffix(".html") else {
            return false;
        };
        SCRIPT_EXTS
            .iter()
            .any(|ext| has_file(files, &format!("{}.{}", stem, ext)))
    }

    pub fn transpile(
        &self,
        file: &SourceFile,
        files: &[SourceFile],
    ) -> GistResult<Option<TranspileResult>> {
        let Some(stem) = file.filename.strip_suffix(".html") else {
            return Ok(None);
        };
        let base = stem.rsplit('/').next().unwrap_or(stem);

        let mut deps = tag_attribute_values(&file.content, "import", "from");
        deps.extend(tag_attribute_values(&file.content, "require", "from"));

        // Convention: my-app.html pulls in my-app.{css,scss,sass,less}
        for ext in STYLE_EXTS {
            if has_file(files, &format!("{}.{}", stem, ext)) {
                deps.push(format!("./{}.css", base));
                break;
            }
        }

        let mut code = String::new();
        for (i, dep) in deps.iter().enumerate() {
            code.push_str(&format!("import * as d{} from {};\n", i, js_string(dep)));
        }
        code.push_str(&format!("export const name = {};\n", js_string(base)));
        code.push_str(&format!(
            "export const template = {};\n",
            js_string(&file.content)
        ));
        code.push_str("export default template;\n");
        let refs: Vec<String> = (0..deps.len()).map(|i| format!("d{}", i)).collect();
        code.push_str(&format!("export const dependencies = [{}];\n", refs.join(", ")));

        let result = TranspileResult::intermediate(format!("{}.html.js", stem), code).with_extra(
            "dependencies",
            Value::Array(deps.into_iter().map(Value::String).collect()),
        );
        Ok(Some(result))
    }
}

fn has_file(files: &[SourceFile], filename: &str) -> bool {
    files.iter().any(|f| f.filename == filename)
}

fn js_string(s: &str) -> String {
    Value::String(s.to_string()).to_string()
}

/// Values of `attr` on every `<tag ...>` in an HTML fragment.
///
/// Handles single, double and unquoted attribute values.
pub(crate) fn tag_attribute_values(html: &str, tag: &str, attr: &str) -> Vec<String> {
    let open = format!("<{}", tag);
    let mut values = vec![];
    let mut rest = html;

    while let Some(start) = rest.find(&open) {
        let after = &rest[start + open.len()..];
        // `<imports>` or `<required-x>` are other tags
        if !after.starts_with(|c: char| c.is_whitespace() || c == '/' || c == '>') {
            rest = after;
            continue;
        }

        let end = after.find('>').unwrap_or(after.len());
        if let Some(value) = attribute_value(&after[..end], attr) {
            values.push(value);
        }
        rest = &after[end..];
    }

    values
}

fn attribute_value(tag_body: &str, attr: &str) -> Option<String> {
    let mut rest = tag_body;
    while let Some(pos) = rest.find(attr) {
        let before_ok = rest[..pos]
            .chars()
            .last()
            .map_or(true, |c| c.is_whitespace());
        let after = rest[pos + attr.len()..].trim_start();

        if before_ok {
            if let Some(value) = after.strip_prefix('=') {
                let value = value.trim_start();
                return match value.chars().next() {
                    Some(q @ ('"' | '\'')) => value[1..].find(q).map(|e| value[1..1 + e].to_string()),
                    Some(_) => Some(
                        value
                            .split(|c: char| c.is_whitespace() || c == '/')
                            .next()
                            .unwrap_or_default()
                            .to_string(),
                    ),
                    None => None,
                };
            }
        }
        rest = &rest[pos + attr.len()..];
    }
    None
}
