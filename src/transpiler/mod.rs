//! Per-file transpiler chain
//!
//! Stages are tried in a fixed priority order and the first match wins:
//!
//! 1. `au2-view` - HTML views paired with a same-named script
//! 2. `script` - JS/TS sources
//! 3. `sass`, `less` - style languages
//! 4. `text` - catch-all
//!
//! A stage may return an intermediate result, which is fed back into the
//! chain against the same file set until a final result comes out.

pub mod au2;
pub mod script;
pub mod style;
pub mod text;

pub use au2::Au2ViewTranspiler;
pub use script::{ScriptCompiler, ScriptTranspiler, VerbatimScript};
pub use style::{StyleCompiler, StyleLang, StyleTranspiler, VerbatimStyle};
pub use text::TextTranspiler;

use crate::error::{GistError, GistResult};
use crate::gist::SourceFile;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::borrow::Cow;
use std::sync::Arc;
use tracing::debug;

/// Upper bound on intermediate hops for a single file
pub const MAX_HOPS: usize = 8;

/// Root that module ids are relative to
pub const SOURCE_ROOT: &str = "src";

/// Output of one stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranspileResult {
    pub filename: String,
    pub content: String,
    /// Set on the final result only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub module_id: Option<String>,
    /// Must go through the chain again
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub intermediate: bool,
    /// Stage-specific data, merged across hops
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub extra: Map<String, Value>,
}

impl TranspileResult {
    /// A final result
    pub fn new(filename: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            content: content.into(),
            module_id: None,
            intermediate: false,
            extra: Map::new(),
        }
    }

    /// A result that must be transpiled again
    pub fn intermediate(filename: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            intermediate: true,
            ..Self::new(filename, content)
        }
    }

    pub fn with_extra(mut self, key: &str, value: Value) -> Self {
        self.extra.insert(key.to_string(), value);
        self
    }
}

/// One transform in the chain
pub enum Stage {
    Au2View(Au2ViewTranspiler),
    Script(ScriptTranspiler),
    Style(StyleTranspiler),
    Text(TextTranspiler),
}

impl Stage {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Au2View(_) => "au2-view",
            Self::Script(_) => "script",
            Self::Style(t) => t.lang().name(),
            Self::Text(_) => "text",
        }
    }

    /// Whether this stage handles `file`, given its siblings
    pub fn matches(&self, file: &SourceFile, files: &[SourceFile]) -> bool {
        match self {
            Self::Au2View(t) => t.matches(file, files),
            Self::Script(t) => t.matches(file),
            Self::Style(t) => t.matches(file),
            Self::Text(_) => true,
        }
    }

    /// Run the stage; `None` means pass the file through untouched
    pub fn transpile(
        &self,
        file: &SourceFile,
        files: &[SourceFile],
    ) -> GistResult<Option<TranspileResult>> {
        match self {
            Self::Au2View(t) => t.transpile(file, files),
            Self::Script(t) => t.transpile(file),
            Self::Style(t) => t.transpile(file),
            Self::Text(t) => Ok(t.transpile(file)),
        }
    }
}

/// The ordered set of stages
pub struct TranspilerChain {
    stages: Vec<Stage>,
}

impl TranspilerChain {
    /// Default stages with verbatim compilers
    pub fn new() -> Self {
        Self::with_compilers(Arc::new(VerbatimScript), Arc::new(VerbatimStyle))
    }

    /// Default stages with the given language compilers
    pub fn with_compilers(script: Arc<dyn ScriptCompiler>, style: Arc<dyn StyleCompiler>) -> Self {
        Self {
            stages: vec![
                Stage::Au2View(Au2ViewTranspiler),
                Stage::Script(ScriptTranspiler::new(script)),
                Stage::Style(StyleTranspiler::new(StyleLang::Sass, style.clone())),
                Stage::Style(StyleTranspiler::new(StyleLang::Less, style)),
                Stage::Text(TextTranspiler),
            ],
        }
    }

    /// Chain with an explicit stage list
    pub fn from_stages(stages: Vec<Stage>) -> Self {
        Self { stages }
    }

    /// First stage that matches `file`
    pub fn find_transpiler(&self, file: &SourceFile, files: &[SourceFile]) -> Option<&Stage> {
        self.stages.iter().find(|s| s.matches(file, files))
    }

    /// Transpile a file to its final form.
    ///
    /// Returns `None` when the file should pass through unregistered.
    /// Stage errors propagate unchanged.
    pub fn transpile(
        &self,
        file: &SourceFile,
        files: &[SourceFile],
    ) -> GistResult<Option<TranspileResult>> {
        let mut current = Cow::Borrowed(file);
        let mut extra = Map::new();
        let mut hops = 0;

        loop {
            let Some(stage) = self.find_transpiler(&current, files) else {
                return Ok(None);
            };
            let Some(mut result) = stage.transpile(&current, files)? else {
                return Ok(None);
            };

            extra.append(&mut result.extra);

            if !result.intermediate {
                result.module_id = Some(module_id(&result.filename));
                result.extra = extra;
                return Ok(Some(result));
            }

            hops += 1;
            if hops > MAX_HOPS {
                return Err(GistError::transpile(
                    &file.filename,
                    stage.name(),
                    format!("more than {} intermediate results", MAX_HOPS),
                ));
            }

            debug!(
                "{}: {} produced intermediate {}",
                file.filename,
                stage.name(),
                result.filename
            );
            current = Cow::Owned(SourceFile::new(result.filename, result.content));
        }
    }
}

impl Default for TranspilerChain {
    fn default() -> Self {
        Self::new()
    }
}

/// Module id of a final file: its path relative to `src`, minus `.js`
pub fn module_id(filename: &str) -> String {
    let filename = filename.trim_start_matches("./");
    let relative = match filename.strip_prefix(SOURCE_ROOT) {
        Some(rest) if rest.starts_with('/') => rest[1..].to_string(),
        Some("") => String::new(),
        _ => format!("../{}", filename),
    };

    match relative.strip_suffix(".js") {
        Some(stem) => stem.to_string(),
        None => relative,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn file(name: &str, content: &str) -> SourceFile {
        SourceFile::new(name, content)
    }

    #[test]
    fn module_id_strips_js_only() {
        assert_eq!(module_id("src/app.js"), "app");
        assert_eq!(module_id("src/nested/app.js"), "nested/app");
        assert_eq!(module_id("src/foo.css"), "foo.css");
        assert_eq!(module_id("src/data.json"), "data.json");
        assert_eq!(module_id("src/my-app.html.js"), "my-app.html");
        assert_eq!(module_id("package.json"), "../package.json");
        assert_eq!(module_id("srcfoo/a.js"), "../srcfoo/a");
    }

    #[test]
    fn finds_stages_in_priority_order() {
        let chain = TranspilerChain::new();
        let files = vec![
            file("src/app.html", "<template></template>"),
            file("src/app.js", "export class App {}"),
            file("src/theme.scss", "a { color: red; }"),
            file("src/reset.less", "b {}"),
            file("src/logo.svg", "<svg/>"),
            file("src/about.html", "<p>about</p>"),
        ];

        let name = |i: usize| chain.find_transpiler(&files[i], &files).unwrap().name();
        assert_eq!(name(0), "au2-view");
        assert_eq!(name(1), "script");
        assert_eq!(name(2), "sass");
        assert_eq!(name(3), "less");
        assert_eq!(name(4), "text");
        // No paired script: plain text
        assert_eq!(name(5), "text");
    }

    #[test]
    fn script_gets_module_id() {
        let chain = TranspilerChain::new();
        let files = vec![file("src/main.js", "main")];

        let result = chain.transpile(&files[0], &files).unwrap().unwrap();
        assert_eq!(result.filename, "src/main.js");
        assert_eq!(result.content, "main");
        assert_eq!(result.module_id.as_deref(), Some("main"));
        assert!(!result.intermediate);
    }

    #[test]
    fn view_recurses_through_script_stage() {
        let chain = TranspilerChain::new();
        let files = vec![
            file("src/my-app.html", "<h1>${message}</h1>"),
            file("src/my-app.ts", "export class MyApp {}"),
        ];

        let result = chain.transpile(&files[0], &files).unwrap().unwrap();
        assert_eq!(result.filename, "src/my-app.html.js");
        assert_eq!(result.module_id.as_deref(), Some("my-app.html"));
        assert!(result.content.contains("export const template"));
        assert!(result.extra.contains_key("dependencies"));
    }

    #[test]
    fn files_outside_src_pass_through() {
        let chain = TranspilerChain::new();
        let files = vec![file("package.json", "{}")];
        assert!(chain.transpile(&files[0], &files).unwrap().is_none());
    }

    #[test]
    fn css_keeps_extension_in_module_id() {
        let chain = TranspilerChain::new();
        let files = vec![file("src/foo.scss", "a { b: c; }")];

        let result = chain.transpile(&files[0], &files).unwrap().unwrap();
        assert_eq!(result.filename, "src/foo.css");
        assert_eq!(result.module_id.as_deref(), Some("foo.css"));
    }

    #[test]
    fn stage_errors_propagate() {
        let chain = TranspilerChain::new();
        let files = vec![file("src/foo.sass", "a\n  b: c")];

        let err = chain.transpile(&files[0], &files).unwrap_err();
        match err {
            GistError::Transpile {
                filename, stage, ..
            } => {
                assert_eq!(filename, "src/foo.sass");
                assert_eq!(stage, "sass");
            }
            other => panic!("expected transpile error, got {other:?}"),
        }
    }

    /// Always yields another intermediate result
    struct Looping;

    impl ScriptCompiler for Looping {
        fn compile(&self, file: &SourceFile) -> Result<String, String> {
            Ok(file.content.clone())
        }

        fn is_intermediate(&self, _file: &SourceFile) -> bool {
            true
        }
    }

    #[test]
    fn runaway_intermediate_results_are_bounded() {
        let chain = TranspilerChain::from_stages(vec![Stage::Script(ScriptTranspiler::new(
            Arc::new(Looping),
        ))]);
        let files = vec![file("src/a.js", "a")];

        let err = chain.transpile(&files[0], &files).unwrap_err();
        assert!(err.to_string().contains("intermediate"));
    }

    /// Yields `n` intermediate results, then a final one
    struct Countdown(AtomicUsize);

    impl ScriptCompiler for Countdown {
        fn compile(&self, file: &SourceFile) -> Result<String, String> {
            Ok(file.content.clone())
        }

        fn is_intermediate(&self, _file: &SourceFile) -> bool {
            self.0
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok()
        }
    }

    fn countdown_chain(n: usize) -> TranspilerChain {
        TranspilerChain::from_stages(vec![Stage::Script(ScriptTranspiler::new(Arc::new(
            Countdown(AtomicUsize::new(n)),
        )))])
    }

    #[test]
    fn max_hops_intermediate_results_are_allowed() {
        let files = vec![file("src/a.js", "a")];

        let result = countdown_chain(MAX_HOPS)
            .transpile(&files[0], &files)
            .unwrap()
            .unwrap();
        assert_eq!(result.module_id.as_deref(), Some("a"));

        let err = countdown_chain(MAX_HOPS + 1)
            .transpile(&files[0], &files)
            .unwrap_err();
        assert!(err.to_string().contains("more than 8 intermediate results"));
    }
}
