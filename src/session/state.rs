//! Session state types

use crate::engine::BundlerEngine;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Preview document published until the gist provides its own `index.html`
pub const DEFAULT_INDEX_HTML: &str = r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<base href="/">
</head>
<body>
<script src="/dist/entry-bundle.js"></script>
<script>requirejs(['main']);</script>
</body>
</html>
"#;

/// Placeholder bundle published on init, replaced by the first build
pub const DEFAULT_BUNDLE_JS: &str = "/* not built yet */\nvar requirejs = function () {};\n";

/// What an engine instance is configured from. Compared by value: any
/// difference means a new engine.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionConfig {
    #[serde(default)]
    pub is_aurelia1: bool,

    /// Package name to version range
    #[serde(default)]
    pub deps: BTreeMap<String, String>,
}

/// Result of `init`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitOutcome {
    /// A fresh engine was created
    pub is_new: bool,
}

/// An initialised session
pub(crate) struct ActiveSession {
    pub config: SessionConfig,
    pub instance: Box<dyn BundlerEngine>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_equality_is_deep() {
        let a = SessionConfig {
            is_aurelia1: false,
            deps: BTreeMap::from([("vue".to_string(), "^2.6.0".to_string())]),
        };
        let mut b = a.clone();
        assert_eq!(a, b);

        b.deps.insert("vue".to_string(), "^3.0.0".to_string());
        assert_ne!(a, b);
    }

    #[test]
    fn config_wire_format() {
        let config: SessionConfig =
            serde_json::from_str(r#"{"isAurelia1": true, "deps": {"aurelia-bootstrapper": "^2.3.3"}}"#)
                .unwrap();
        assert!(config.is_aurelia1);
        assert_eq!(config.deps["aurelia-bootstrapper"], "^2.3.3");

        let empty: SessionConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(empty, SessionConfig::default());
    }

    #[test]
    fn default_index_loads_bundle() {
        assert!(DEFAULT_INDEX_HTML.contains("/dist/entry-bundle.js"));
    }
}
