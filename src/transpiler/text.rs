//! Catch-all stage: files under `src/` are registered as-is

use crate::gist::SourceFile;
use crate::transpiler::{TranspileResult, SOURCE_ROOT};

pub struct TextTranspiler;

impl TextTranspiler {
    /// `None` for files outside `src/`
    pub fn transpile(&self, file: &SourceFile) -> Option<TranspileResult> {
        let rest = file.filename.strip_prefix(SOURCE_ROOT)?;
        if !rest.starts_with('/') {
            return None;
        }
        Some(TranspileResult::new(&file.filename, &file.content))
    }
}
