//! Style stages: Sass and Less
//!
//! Plain `.css` is not handled here and falls through to the text stage.

use crate::error::{GistError, GistResult};
use crate::gist::SourceFile;
use crate::transpiler::TranspileResult;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StyleLang {
    /// `.scss` and indented `.sass`
    Sass,
    Less,
}

impl StyleLang {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Sass => "sass",
            Self::Less => "less",
        }
    }

    fn extensions(&self) -> &'static [&'static str] {
        match self {
            Self::Sass => &["scss", "sass"],
            Self::Less => &["less"],
        }
    }
}

/// Compiles one style file to CSS
pub trait StyleCompiler: Send + Sync {
    fn compile(&self, lang: StyleLang, file: &SourceFile) -> Result<String, String>;
}

/// Passes SCSS and Less through unchanged.
///
/// Both are CSS supersets, so plain stylesheets survive. The indented
/// `.sass` syntax is not CSS and is rejected.
pub struct VerbatimStyle;

impl StyleCompiler for VerbatimStyle {
    fn compile(&self, _lang: StyleLang, file: &SourceFile) -> Result<String, String> {
        if file.extension() == Some("sass") {
            return Err("indented sass syntax needs a sass compiler".to_string());
        }
        Ok(file.content.clone())
    }
}

pub struct StyleTranspiler {
    lang: StyleLang,
    compiler: Arc<dyn StyleCompiler>,
}

impl StyleTranspiler {
    pub fn new(lang: StyleLang, compiler: Arc<dyn StyleCompiler>) -> Self {
        Self { lang, compiler }
    }

    pub fn lang(&self) -> StyleLang {
        self.lang
    }

    pub fn matches(&self, file: &SourceFile) -> bool {
        file.extension()
            .is_some_and(|ext| self.lang.extensions().contains(&ext))
    }

    /// Compile to `.css`. Partials (`_name.scss`) produce nothing.
    pub fn transpile(&self, file: &SourceFile) -> GistResult<Option<TranspileResult>> {
        let Some(ext) = file.extension() else {
            return Ok(None);
        };
        let base = file.filename.rsplit('/').next().unwrap_or(&file.filename);
        if base.starts_with('_') {
            return Ok(None);
        }

        let css = self
            .compiler
            .compile(self.lang, file)
            .map_err(|reason| GistError::transpile(&file.filename, self.lang.name(), reason))?;

        let stem = &file.filename[..file.filename.len() - ext.len() - 1];
        Ok(Some(TranspileResult::new(format!("{}.css", stem), css)))
    }
}
