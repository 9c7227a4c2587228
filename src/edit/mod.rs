//! Edit session: the working copy of a gist and its change tracking
//!
//! Edits advance a mutation counter but do not rehash the file set.
//! Callers rehash at a checkpoint with `mutation_changed()`, which keeps
//! keystroke-level edits cheap. `render()` snapshots the files, runs them
//! through the build worker and records the snapshot hash as rendered.

pub mod detect;

pub use detect::session_config;

use crate::cache::files_hash;
use crate::error::{GistError, GistResult};
use crate::gist::{Gist, SourceFile};
use crate::worker::WorkerHandle;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Mutation values at or above this wrap back to 1
pub const MUTATION_MAX: i32 = 9999;

/// Never equal to a real hash
const NOT_RENDERED: &str = "";

/// A file in the working copy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditFile {
    pub filename: String,
    pub content: String,
    /// Differs from the loaded gist
    #[serde(default)]
    pub is_changed: bool,
}

/// Externally restored editor state
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportData {
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub files: Option<Vec<EditFile>>,
    #[serde(default)]
    pub gist: Option<Gist>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rename {
    pub old_filename: String,
    pub new_filename: String,
}

/// A dispatched render: the snapshot it builds and its generation
#[derive(Debug, Clone)]
pub struct RenderTicket {
    generation: u64,
    hash: String,
    files: Vec<SourceFile>,
    started: Instant,
}

impl RenderTicket {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Hash of the snapshot
    pub fn hash(&self) -> &str {
        &self.hash
    }

    pub fn files(&self) -> &[SourceFile] {
        &self.files
    }
}

/// Result of a completed render
#[derive(Debug, Clone)]
pub struct RenderOutcome {
    pub hash: String,
    /// False when a newer render was dispatched before this one finished
    pub applied: bool,
    pub elapsed: Duration,
}

#[derive(Debug, Clone)]
pub struct EditSession {
    gist: Gist,
    files: Vec<EditFile>,
    description: String,
    mutation: i32,
    original_hash: String,
    hash: String,
    rendered_hash: String,
    dispatched: u64,
}

impl Default for EditSession {
    fn default() -> Self {
        Self::new()
    }
}

impl EditSession {
    pub fn new() -> Self {
        let empty = files_hash(std::iter::empty());
        Self {
            gist: Gist::default(),
            files: vec![],
            description: String::new(),
            mutation: -1,
            original_hash: empty.clone(),
            hash: empty,
            rendered_hash: NOT_RENDERED.to_string(),
            dispatched: 0,
        }
    }

    pub fn gist(&self) -> &Gist {
        &self.gist
    }

    pub fn files(&self) -> &[EditFile] {
        &self.files
    }

    pub fn file(&self, filename: &str) -> Option<&EditFile> {
        self.files.iter().find(|f| f.filename == filename)
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn set_description(&mut self, description: impl Into<String>) {
        self.description = description.into();
    }

    pub fn mutation(&self) -> i32 {
        self.mutation
    }

    /// Current file-set hash, as of the last checkpoint
    pub fn hash(&self) -> &str {
        &self.hash
    }

    pub fn is_changed(&self) -> bool {
        self.hash != self.original_hash || self.description != self.gist.description
    }

    pub fn is_rendered(&self) -> bool {
        self.hash == self.rendered_hash
    }

    /// Replace the loaded gist and the baseline hash
    fn set_gist(&mut self, gist: Gist) {
        self.original_hash = hash_source(&gist.files);
        self.gist = gist;
    }

    /// Advance the counter. 0 and -1 belong to fresh loads.
    fn mutate(&mut self) {
        if self.mutation >= MUTATION_MAX || self.mutation < 0 {
            self.mutation = 1;
        } else {
            self.mutation += 1;
        }
    }

    /// Checkpoint: rehash the working files
    pub fn mutation_changed(&mut self) {
        self.hash = hash_edit(&self.files);
    }

    /// Start over from `gist`
    pub fn load_gist(&mut self, gist: Gist) {
        self.set_gist(gist);
        self.files = self
            .gist
            .files
            .iter()
            .map(|f| EditFile {
                filename: f.filename.clone(),
                content: f.content.clone(),
                is_changed: false,
            })
            .collect();
        self.description = self.gist.description.clone();
        self.hash = self.original_hash.clone();

        // Always a visible change for observers
        self.mutation = if self.mutation == 0 { -1 } else { 0 };
        debug!("Loaded gist with {} files", self.files.len());
    }

    pub fn import_data(&mut self, data: ImportData) {
        if let Some(description) = data.description.filter(|d| !d.is_empty()) {
            self.description = description;
        }
        if let Some(files) = data.files {
            self.files = files;
        }
        if let Some(gist) = data.gist {
            self.set_gist(gist);
        }
        self.mutate();
    }

    pub fn update_file(&mut self, filename: &str, content: &str) -> GistResult<()> {
        let original = self.gist.file(filename).map(|f| f.content.as_str());
        let file = self
            .files
            .iter_mut()
            .find(|f| f.filename == filename)
            .ok_or_else(|| {
                GistError::Edit(format!("Cannot update {} because it does not exist.", filename))
            })?;

        if file.content == content {
            return Ok(());
        }

        file.content = content.to_string();
        file.is_changed = original != Some(content);
        self.mutate();
        Ok(())
    }

    /// Rename a file, or every file under a folder.
    ///
    /// Renames onto an existing file are skipped with a warning.
    pub fn update_path(&mut self, from: &str, to: &str) -> GistResult<Vec<Rename>> {
        if from == to {
            return Ok(vec![]);
        }

        let folder = format!("{}/", from);
        let mut renames = vec![];

        for i in 0..self.files.len() {
            let old_filename = self.files[i].filename.clone();
            let new_filename = if old_filename == from {
                to.to_string()
            } else if let Some(rest) = old_filename.strip_prefix(&folder) {
                format!("{}/{}", to, rest)
            } else {
                continue;
            };

            if self.files.iter().any(|f| f.filename == new_filename) {
                warn!(
                    "Cannot rename {} to {} because there is an existing file.",
                    old_filename, new_filename
                );
                continue;
            }

            let original = self.gist.file(&new_filename).map(|f| f.content.clone());
            let file = &mut self.files[i];
            file.is_changed = original.as_deref() != Some(file.content.as_str());
            file.filename = new_filename.clone();

            renames.push(Rename {
                old_filename,
                new_filename,
            });
        }

        if !renames.is_empty() {
            self.mutate();
        }
        Ok(renames)
    }

    pub fn create_file(&mut self, filename: &str, content: &str) -> GistResult<()> {
        if self.file(filename).is_some() {
            return Err(GistError::Edit(format!(
                "Cannot create {} because there is an existing file.",
                filename
            )));
        }

        let folder = format!("{}/", filename);
        if self.files.iter().any(|f| f.filename.starts_with(&folder)) {
            return Err(GistError::Edit(format!(
                "Cannot create {} because there is an existing folder.",
                filename
            )));
        }

        self.files.push(EditFile {
            filename: filename.to_string(),
            content: content.to_string(),
            is_changed: true,
        });
        self.mutate();
        Ok(())
    }

    pub fn delete_file(&mut self, filename: &str) -> GistResult<()> {
        let idx = self
            .files
            .iter()
            .position(|f| f.filename == filename)
            .ok_or_else(|| {
                GistError::Edit(format!(
                    "Cannot delete {} because the file does not exist.",
                    filename
                ))
            })?;

        self.files.remove(idx);
        self.mutate();
        Ok(())
    }

    pub fn delete_folder(&mut self, path: &str) -> GistResult<()> {
        let folder = format!("{}/", path);
        let before = self.files.len();
        self.files.retain(|f| !f.filename.starts_with(&folder));

        if self.files.len() == before {
            return Err(GistError::Edit(format!(
                "Cannot delete folder {} because it does not exist.",
                path
            )));
        }

        self.mutate();
        Ok(())
    }

    /// Snapshot the working files for a render.
    ///
    /// Later edits do not affect the snapshot.
    pub fn begin_render(&mut self) -> RenderTicket {
        let files: Vec<SourceFile> = self
            .files
            .iter()
            .map(|f| SourceFile::new(&f.filename, &f.content))
            .collect();

        self.dispatched += 1;
        RenderTicket {
            generation: self.dispatched,
            hash: hash_source(&files),
            files,
            started: Instant::now(),
        }
    }

    /// Record a render's result.
    ///
    /// Only the latest dispatched render may change `rendered_hash`. A
    /// failure of the latest render clears it so the next attempt is not
    /// skipped; the error is returned either way.
    pub fn finish_render(
        &mut self,
        ticket: RenderTicket,
        result: GistResult<()>,
    ) -> GistResult<RenderOutcome> {
        let latest = ticket.generation == self.dispatched;

        match result {
            Ok(()) => {
                if latest {
                    self.rendered_hash = ticket.hash.clone();
                } else {
                    debug!(
                        "Render {} finished after render {} was dispatched, ignoring",
                        ticket.generation, self.dispatched
                    );
                }

                let elapsed = ticket.started.elapsed();
                info!("Built dist/entry-bundle.js in {:.1} secs.", elapsed.as_secs_f64());
                Ok(RenderOutcome {
                    hash: ticket.hash,
                    applied: latest,
                    elapsed,
                })
            }
            Err(e) => {
                if latest {
                    self.rendered_hash = NOT_RENDERED.to_string();
                }
                Err(e)
            }
        }
    }

    /// Render the current files through `worker`
    pub async fn render(&mut self, worker: &WorkerHandle) -> GistResult<RenderOutcome> {
        let ticket = self.begin_render();
        let result = run_render(&ticket, worker).await;
        self.finish_render(ticket, result)
    }
}

/// Drive one snapshot through the worker as a single render request.
///
/// Renders of other tickets cannot interleave with it, and the worker
/// skips it if a newer ticket was already published.
pub async fn run_render(ticket: &RenderTicket, worker: &WorkerHandle) -> GistResult<()> {
    let config = session_config(&ticket.files);
    let published = worker
        .render(ticket.generation, config, ticket.files.clone())
        .await?;
    if !published {
        debug!("Render {} superseded before it ran", ticket.generation);
    }
    Ok(())
}

fn hash_source(files: &[SourceFile]) -> String {
    files_hash(files.iter().map(|f| (f.filename.as_str(), f.content.as_str())))
}

fn hash_edit(files: &[EditFile]) -> String {
    files_hash(files.iter().map(|f| (f.filename.as_str(), f.content.as_str())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{ContentCache, MemoryLocalStore};
    use crate::config::schema::BundlerConfig;
    use crate::credentials::AccessToken;
    use crate::engine::LocalEngineFactory;
    use crate::session::{MemoryPublishTarget, SessionManager};
    use crate::transpiler::TranspilerChain;
    use crate::worker::BuildWorker;
    use std::sync::Arc;

    fn gist() -> Gist {
        Gist::new(
            "desc",
            vec![
                SourceFile::new("index.html", "index-html"),
                SourceFile::new("src/main.js", "main"),
                SourceFile::new("src/app.js", "app"),
                SourceFile::new("src/app.html", "app-html"),
            ],
        )
    }

    fn loaded() -> EditSession {
        let mut session = EditSession::new();
        session.load_gist(gist());
        session
    }

    fn names(session: &EditSession) -> Vec<&str> {
        session.files().iter().map(|f| f.filename.as_str()).collect()
    }

    fn worker() -> (WorkerHandle, Arc<MemoryPublishTarget>) {
        let bundler = BundlerConfig::default();
        let factory = Arc::new(LocalEngineFactory::new(
            Arc::new(TranspilerChain::new()),
            &bundler,
        ));
        let publish = Arc::new(MemoryPublishTarget::new());
        let manager = SessionManager::new(factory, publish.clone(), bundler);
        let cache = Arc::new(ContentCache::new(
            Arc::new(MemoryLocalStore::new()),
            None,
            AccessToken::none(),
        ));
        (BuildWorker::spawn(manager, cache), publish)
    }

    #[test]
    fn load_gist_is_unchanged() {
        let session = loaded();
        assert_eq!(session.mutation(), 0);
        assert_eq!(session.description(), "desc");
        assert!(!session.is_changed());
        assert!(!session.is_rendered());
        assert!(session.files().iter().all(|f| !f.is_changed));
    }

    #[test]
    fn load_gist_toggles_mutation() {
        let mut session = loaded();
        assert_eq!(session.mutation(), 0);
        session.load_gist(gist());
        assert_eq!(session.mutation(), -1);
        session.load_gist(gist());
        assert_eq!(session.mutation(), 0);
    }

    #[test]
    fn mutation_counter_wraps_without_reserved_values() {
        let mut session = EditSession::new();
        assert_eq!(session.mutation(), -1);

        session.mutate();
        assert_eq!(session.mutation(), 1);

        session.mutation = MUTATION_MAX - 1;
        session.mutate();
        assert_eq!(session.mutation(), MUTATION_MAX);
        session.mutate();
        assert_eq!(session.mutation(), 1);
    }

    #[test]
    fn edits_do_not_rehash_until_checkpoint() {
        let mut session = loaded();
        session.update_file("src/main.js", "main2").unwrap();

        assert_eq!(session.mutation(), 1);
        assert!(!session.is_changed());

        session.mutation_changed();
        assert!(session.is_changed());
        assert!(session.file("src/main.js").unwrap().is_changed);
    }

    #[test]
    fn update_back_to_original_clears_flag() {
        let mut session = loaded();
        session.update_file("src/main.js", "main2").unwrap();
        session.update_file("src/main.js", "main").unwrap();
        session.mutation_changed();

        assert!(!session.file("src/main.js").unwrap().is_changed);
        assert!(!session.is_changed());
        assert_eq!(session.mutation(), 2);
    }

    #[test]
    fn update_same_content_is_noop() {
        let mut session = loaded();
        session.update_file("src/main.js", "main").unwrap();
        assert_eq!(session.mutation(), 0);
    }

    #[test]
    fn update_missing_file() {
        let mut session = loaded();
        let err = session.update_file("src/nope.js", "x").unwrap_err();
        assert_eq!(err.to_string(), "Cannot update src/nope.js because it does not exist.");
        assert_eq!(session.mutation(), 0);
    }

    #[test]
    fn description_change_is_a_change_but_not_a_render() {
        let mut session = loaded();
        session.rendered_hash = session.hash.clone();

        session.set_description("desc2");
        session.mutation_changed();
        assert!(session.is_changed());
        assert!(session.is_rendered());
    }

    #[test]
    fn rename_file() {
        let mut session = loaded();
        let renames = session.update_path("src/main.js", "src/index.js").unwrap();

        assert_eq!(
            renames,
            vec![Rename {
                old_filename: "src/main.js".to_string(),
                new_filename: "src/index.js".to_string(),
            }]
        );
        assert!(session.file("src/index.js").unwrap().is_changed);
        assert_eq!(session.mutation(), 1);
    }

    #[test]
    fn rename_folder() {
        let mut session = loaded();
        let renames = session.update_path("src", "lib").unwrap();

        assert_eq!(renames.len(), 3);
        assert_eq!(
            names(&session),
            vec!["index.html", "lib/main.js", "lib/app.js", "lib/app.html"]
        );
        assert_eq!(session.mutation(), 1);
    }

    #[test]
    fn rename_onto_existing_file_is_skipped() {
        let mut session = loaded();
        let renames = session.update_path("src/main.js", "src/app.js").unwrap();

        assert!(renames.is_empty());
        assert_eq!(session.file("src/app.js").unwrap().content, "app");
        assert_eq!(session.mutation(), 0);
    }

    #[test]
    fn rename_back_restores_flag() {
        let mut session = loaded();
        session.update_path("src/main.js", "src/index.js").unwrap();
        session.update_path("src/index.js", "src/main.js").unwrap();
        assert!(!session.file("src/main.js").unwrap().is_changed);
    }

    #[test]
    fn create_file() {
        let mut session = loaded();
        session.create_file("src/new.js", "n").unwrap();

        let file = session.file("src/new.js").unwrap();
        assert!(file.is_changed);
        assert_eq!(session.mutation(), 1);
    }

    #[test]
    fn create_file_conflicts() {
        let mut session = loaded();
        let err = session.create_file("src/main.js", "").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Cannot create src/main.js because there is an existing file."
        );

        let err = session.create_file("src", "").unwrap_err();
        assert_eq!(err.to_string(), "Cannot create src because there is an existing folder.");
        assert_eq!(session.mutation(), 0);
    }

    #[test]
    fn delete_file_and_folder() {
        let mut session = loaded();
        session.delete_file("index.html").unwrap();
        assert_eq!(session.mutation(), 1);

        session.delete_folder("src").unwrap();
        assert!(session.files().is_empty());
        assert_eq!(session.mutation(), 2);

        let err = session.delete_file("index.html").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Cannot delete index.html because the file does not exist."
        );
        let err = session.delete_folder("src").unwrap_err();
        assert_eq!(err.to_string(), "Cannot delete folder src because it does not exist.");
        assert_eq!(session.mutation(), 2);
    }

    #[test]
    fn import_data_replaces_parts() {
        let mut session = loaded();
        session.import_data(ImportData {
            description: Some("restored".to_string()),
            files: Some(vec![EditFile {
                filename: "src/main.js".to_string(),
                content: "edited".to_string(),
                is_changed: true,
            }]),
            gist: None,
        });
        session.mutation_changed();

        assert_eq!(session.description(), "restored");
        assert_eq!(names(&session), vec!["src/main.js"]);
        assert_eq!(session.gist().description, "desc");
        assert!(session.is_changed());
        assert_eq!(session.mutation(), 1);
    }

    #[test]
    fn import_data_gist_moves_baseline() {
        let mut session = EditSession::new();
        session.import_data(ImportData {
            gist: Some(gist()),
            files: Some(
                gist()
                    .files
                    .iter()
                    .map(|f| EditFile {
                        filename: f.filename.clone(),
                        content: f.content.clone(),
                        is_changed: false,
                    })
                    .collect(),
            ),
            description: Some("desc".to_string()),
        });
        session.mutation_changed();
        assert!(!session.is_changed());
    }

    #[test]
    fn stale_render_does_not_mark_rendered() {
        let mut session = loaded();
        let first = session.begin_render();

        session.update_file("src/main.js", "main2").unwrap();
        session.mutation_changed();
        let second = session.begin_render();

        let outcome = session.finish_render(second, Ok(())).unwrap();
        assert!(outcome.applied);
        assert!(session.is_rendered());

        // The older render lands last
        let outcome = session.finish_render(first, Ok(())).unwrap();
        assert!(!outcome.applied);
        assert!(session.is_rendered());
    }

    #[test]
    fn failed_render_resets_rendered_hash() {
        let mut session = loaded();
        let ticket = session.begin_render();
        session.finish_render(ticket, Ok(())).unwrap();
        assert!(session.is_rendered());

        let ticket = session.begin_render();
        let err = session
            .finish_render(ticket, Err(GistError::Bundle("boom".to_string())))
            .unwrap_err();
        assert!(matches!(err, GistError::Bundle(_)));
        assert!(!session.is_rendered());
    }

    #[test]
    fn snapshot_is_isolated_from_later_edits() {
        let mut session = loaded();
        let ticket = session.begin_render();
        session.update_file("src/main.js", "changed").unwrap();

        let main = ticket.files().iter().find(|f| f.filename == "src/main.js").unwrap();
        assert_eq!(main.content, "main");
        assert_eq!(ticket.hash(), hash_source(&gist().files));
    }

    #[tokio::test]
    async fn render_through_worker() {
        let (worker, publish) = worker();
        let mut session = loaded();

        let outcome = session.render(&worker).await.unwrap();
        assert!(outcome.applied);
        assert!(session.is_rendered());
        assert_eq!(publish.get("/").unwrap().0, "index-html");
        assert!(publish
            .get("/dist/entry-bundle.js")
            .unwrap()
            .0
            .contains("define(\"main\""));
    }

    #[tokio::test]
    async fn render_failure_through_worker() {
        let (worker, _) = worker();
        let mut session = loaded();
        session.create_file("src/broken.sass", "a\n  b: c").unwrap();
        session.mutation_changed();

        let err = session.render(&worker).await.unwrap_err();
        assert!(matches!(err, GistError::Transpile { .. }));
        assert!(!session.is_rendered());
    }

    #[tokio::test]
    async fn rerender_drops_deleted_and_renamed_files() {
        let (worker, publish) = worker();
        let mut session = EditSession::new();
        session.load_gist(Gist::new(
            "",
            vec![
                SourceFile::new("index.html", "index-html"),
                SourceFile::new("src/main.js", "main"),
                SourceFile::new("src/old.js", "OLD_MODULE"),
            ],
        ));
        session.render(&worker).await.unwrap();

        session.delete_file("src/old.js").unwrap();
        session.update_path("src/main.js", "src/renamed.js").unwrap();
        session.mutation_changed();
        session.render(&worker).await.unwrap();
        assert!(session.is_rendered());

        let (bundle, _) = publish.get("/dist/entry-bundle.js").unwrap();
        assert!(bundle.contains("define(\"renamed\""));
        assert!(!bundle.contains("define(\"main\""));
        assert!(!bundle.contains("OLD_MODULE"));
    }

    #[tokio::test]
    async fn overlapping_renders_publish_the_latest_snapshot() {
        let (worker, publish) = worker();
        let mut session = loaded();

        session.update_file("src/main.js", "A_CONTENT").unwrap();
        let a = session.begin_render();
        session.update_file("src/main.js", "B_CONTENT").unwrap();
        session.mutation_changed();
        let b = session.begin_render();

        // The newer ticket reaches the worker first
        let (rb, ra) = tokio::join!(run_render(&b, &worker), run_render(&a, &worker));
        assert!(session.finish_render(b, rb).unwrap().applied);
        assert!(!session.finish_render(a, ra).unwrap().applied);
        assert!(session.is_rendered());

        let (bundle, _) = publish.get("/dist/entry-bundle.js").unwrap();
        assert!(bundle.contains("B_CONTENT"));
        assert!(!bundle.contains("A_CONTENT"));
    }
}
