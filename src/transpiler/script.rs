//! Script stage: JS and TS sources

use crate::error::{GistError, GistResult};
use crate::gist::SourceFile;
use crate::transpiler::TranspileResult;
use std::sync::Arc;

const EXTENSIONS: &[&str] = &["js", "mjs", "cjs", "jsx", "ts", "tsx"];

/// Compiles one script file to JavaScript
pub trait ScriptCompiler: Send + Sync {
    fn compile(&self, file: &SourceFile) -> Result<String, String>;

    /// Whether the compiled output needs another pass through the chain
    fn is_intermediate(&self, _file: &SourceFile) -> bool {
        false
    }
}

/// Emits script source unchanged
pub struct VerbatimScript;

impl ScriptCompiler for VerbatimScript {
    fn compile(&self, file: &SourceFile) -> Result<String, String> {
        Ok(file.content.clone())
    }
}

pub struct ScriptTranspiler {
    compiler: Arc<dyn ScriptCompiler>,
}

impl ScriptTranspiler {
    pub fn new(compiler: Arc<dyn ScriptCompiler>) -> Self {
        Self { compiler }
    }

    pub fn matches(&self, file: &SourceFile) -> bool {
        file.extension().is_some_and(|ext| EXTENSIONS.contains(&ext))
    }

    /// Compile to a `.js` file of the same stem
    pub fn transpile(&self, file: &SourceFile) -> GistResult<Option<TranspileResult>> {
        let Some(ext) = file.extension() else {
            return Ok(None);
        };
        let stem = &file.filename[..file.filename.len() - ext.len() - 1];
        let filename = format!("{}.js", stem);

        let code = self
            .compiler
            .compile(file)
            .map_err(|reason| GistError::transpile(&file.filename, "script", reason))?;

        if self.compiler.is_intermediate(file) {
            Ok(Some(TranspileResult::intermediate(filename, code)))
        } else {
            Ok(Some(TranspileResult::new(filename, code)))
        }
    }
}
