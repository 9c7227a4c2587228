//! Session config derivation from a file set

use crate::gist::SourceFile;
use crate::session::SessionConfig;
use serde::Deserialize;
use std::collections::BTreeMap;
use tracing::{debug, warn};

const PACKAGE_JSON: &str = "package.json";
const AURELIA1_BOOTSTRAPPER: &str = "aurelia-bootstrapper";
const ENTRY_POINTS: &[&str] = &["src/main.js", "src/main.ts"];
const CONFIGURE_EXPORTS: &[&str] = &["export function configure(", "export async function configure("];

#[derive(Debug, Default, Deserialize)]
struct PackageJson {
    #[serde(default)]
    dependencies: BTreeMap<String, String>,
}

/// Derive the engine config for a set of files.
///
/// `deps` come from `package.json`; an unreadable `package.json` means no
/// dependencies. Aurelia 1 is recognised by its bootstrapper package or by
/// the `configure` entry point convention.
pub fn session_config(files: &[SourceFile]) -> SessionConfig {
    let deps = files
        .iter()
        .find(|f| f.filename == PACKAGE_JSON)
        .map(|f| dependencies(&f.content))
        .unwrap_or_default();

    let is_aurelia1 = deps.contains_key(AURELIA1_BOOTSTRAPPER)
        || files
            .iter()
            .filter(|f| ENTRY_POINTS.contains(&f.filename.as_str()))
            .any(|f| CONFIGURE_EXPORTS.iter().any(|e| f.content.contains(e)));

    SessionConfig { is_aurelia1, deps }
}

fn dependencies(package_json: &str) -> BTreeMap<String, String> {
    let package: PackageJson = match serde_json::from_str(package_json) {
        Ok(package) => package,
        Err(e) => {
            debug!("Ignoring unreadable package.json: {}", e);
            return BTreeMap::new();
        }
    };

    for (name, range) in &package.dependencies {
        if let Err(e) = semver::VersionReq::parse(range) {
            warn!("{}: version range {:?} is not semver ({})", name, range, e);
        }
    }

    package.dependencies
}
