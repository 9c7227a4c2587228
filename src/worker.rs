//! Build worker
//!
//! The session manager lives on its own task and is reached only through
//! messages, so requests from any number of callers are applied one at a
//! time in arrival order.

use crate::cache::CacheProvider;
use crate::error::{GistError, GistResult};
use crate::gist::SourceFile;
use crate::session::{InitOutcome, SessionConfig, SessionManager};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::debug;

/// Pending requests before senders wait
const QUEUE_DEPTH: usize = 32;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Request {
    Init { config: SessionConfig },
    Update { files: Vec<SourceFile> },
    Build,
    /// A whole render: init, update and build with nothing in between.
    ///
    /// `generation` increases with each render of one edit session; a render
    /// older than one already published is skipped.
    Render {
        generation: u64,
        config: SessionConfig,
        files: Vec<SourceFile>,
    },
}

impl Request {
    fn kind(&self) -> &'static str {
        match self {
            Self::Init { .. } => "init",
            Self::Update { .. } => "update",
            Self::Build => "build",
            Self::Render { .. } => "render",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Response {
    Init(InitOutcome),
    Update { files: Vec<SourceFile> },
    Build,
    Render { published: bool },
}

type Envelope = (Request, oneshot::Sender<GistResult<Response>>);

pub struct BuildWorker {
    session: SessionManager,
    cache: Arc<dyn CacheProvider>,
    requests: mpsc::Receiver<Envelope>,
    /// Generation of the last published render
    published: u64,
}

impl BuildWorker {
    /// Move the session onto a new task and return a handle to it.
    ///
    /// The task ends once every handle is dropped.
    pub fn spawn(session: SessionManager, cache: Arc<dyn CacheProvider>) -> WorkerHandle {
        let (tx, rx) = mpsc::channel(QUEUE_DEPTH);
        let worker = Self {
            session,
            cache,
            requests: rx,
            published: 0,
        };
        let task = tokio::spawn(worker.run());

        WorkerHandle {
            tx,
            task: Arc::new(task),
        }
    }

    async fn run(mut self) {
        while let Some((request, reply)) = self.requests.recv().await {
            let kind = request.kind();
            let result = self.handle(request).await;
            debug!("Worker finished {} (ok: {})", kind, result.is_ok());
            // Caller may have given up waiting
            let _ = reply.send(result);
        }
        debug!("Build worker stopped");
    }

    async fn handle(&mut self, request: Request) -> GistResult<Response> {
        match request {
            Request::Init { config } => {
                let outcome = self.session.init(config, self.cache.clone()).await?;
                Ok(Response::Init(outcome))
            }
            Request::Update { files } => {
                let files = self.session.update(files).await?;
                Ok(Response::Update { files })
            }
            Request::Build => {
                self.session.build().await?;
                Ok(Response::Build)
            }
            Request::Render {
                generation,
                config,
                files,
            } => {
                if generation < self.published {
                    debug!(
                        "Skipping render {}, render {} already published",
                        generation, self.published
                    );
                    return Ok(Response::Render { published: false });
                }
                self.session.init(config, self.cache.clone()).await?;
                self.session.update(files).await?;
                self.session.build().await?;
                self.published = generation;
                Ok(Response::Render { published: true })
            }
        }
    }
}

/// Cloneable sender side of a `BuildWorker`
#[derive(Clone)]
pub struct WorkerHandle {
    tx: mpsc::Sender<Envelope>,
    task: Arc<JoinHandle<()>>,
}

impl WorkerHandle {
    /// Send a request and wait for its result
    pub async fn perform(&self, request: Request) -> GistResult<Response> {
        let (reply, response) = oneshot::channel();
        self.tx
            .send((request, reply))
            .await
            .map_err(|_| GistError::WorkerGone)?;
        response.await.map_err(|_| GistError::WorkerGone)?
    }

    pub async fn init(&self, config: SessionConfig) -> GistResult<InitOutcome> {
        match self.perform(Request::Init { config }).await? {
            Response::Init(outcome) => Ok(outcome),
            other => Err(unexpected("init", &other)),
        }
    }

    pub async fn update(&self, files: Vec<SourceFile>) -> GistResult<Vec<SourceFile>> {
        match self.perform(Request::Update { files }).await? {
            Response::Update { files } => Ok(files),
            other => Err(unexpected("update", &other)),
        }
    }

    pub async fn build(&self) -> GistResult<()> {
        match self.perform(Request::Build).await? {
            Response::Build => Ok(()),
            other => Err(unexpected("build", &other)),
        }
    }

    /// Run one render; `false` when a newer render was already published
    pub async fn render(
        &self,
        generation: u64,
        config: SessionConfig,
        files: Vec<SourceFile>,
    ) -> GistResult<bool> {
        let request = Request::Render {
            generation,
            config,
            files,
        };
        match self.perform(request).await? {
            Response::Render { published } => Ok(published),
            other => Err(unexpected("render", &other)),
        }
    }

    /// Whether the worker task has exited
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

fn unexpected(request: &str, response: &Response) -> GistError {
    GistError::Internal(format!("{} answered with {:?}", request, response))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{ContentCache, MemoryLocalStore};
    use crate::config::schema::BundlerConfig;
    use crate::credentials::AccessToken;
    use crate::engine::LocalEngineFactory;
    use crate::session::MemoryPublishTarget;
    use crate::transpiler::TranspilerChain;

    fn spawn() -> (WorkerHandle, Arc<MemoryPublishTarget>) {
        let bundler = BundlerConfig::default();
        let factory = Arc::new(LocalEngineFactory::new(
            Arc::new(TranspilerChain::new()),
            &bundler,
        ));
        let publish = Arc::new(MemoryPublishTarget::new());
        let session = SessionManager::new(factory, publish.clone(), bundler);
        let cache = Arc::new(ContentCache::new(
            Arc::new(MemoryLocalStore::new()),
            None,
            AccessToken::none(),
        ));
        (BuildWorker::spawn(session, cache), publish)
    }

    #[tokio::test]
    async fn init_update_build() {
        let (worker, publish) = spawn();

        let outcome = worker.init(SessionConfig::default()).await.unwrap();
        assert!(outcome.is_new);

        let files = worker
            .update(vec![
                SourceFile::new("index.html", "<html></html>"),
                SourceFile::new("src/main.js", "export const a = 1;"),
            ])
            .await
            .unwrap();
        assert_eq!(files, vec![SourceFile::new("src/main.js", "export const a = 1;")]);

        worker.build().await.unwrap();
        let (bundle, _) = publish.get("/dist/entry-bundle.js").unwrap();
        assert!(bundle.contains("define(\"main\""));
        assert!(bundle.contains("requirejs.config("));
        assert_eq!(publish.get("/").unwrap().0, "<html></html>");
    }

    #[tokio::test]
    async fn errors_come_back_to_the_caller() {
        let (worker, _) = spawn();
        let err = worker.build().await.unwrap_err();
        assert!(matches!(err, GistError::Uninitialized));

        // Worker keeps serving after a failed request
        assert!(worker.init(SessionConfig::default()).await.is_ok());
    }

    #[tokio::test]
    async fn concurrent_requests_are_serialized() {
        let (worker, _) = spawn();
        worker.init(SessionConfig::default()).await.unwrap();

        let a = worker.clone();
        let b = worker.clone();
        let (ra, rb) = tokio::join!(
            a.update(vec![SourceFile::new("src/a.js", "a")]),
            b.update(vec![SourceFile::new("src/b.js", "b")]),
        );
        ra.unwrap();
        rb.unwrap();
        worker.build().await.unwrap();
    }

    #[tokio::test]
    async fn render_runs_as_one_request() {
        let (worker, publish) = spawn();
        let files = vec![
            SourceFile::new("index.html", "<html></html>"),
            SourceFile::new("src/main.js", "RENDER_ONE"),
        ];
        let published = worker.render(1, SessionConfig::default(), files).await.unwrap();
        assert!(published);

        let (bundle, _) = publish.get("/dist/entry-bundle.js").unwrap();
        assert!(bundle.contains("RENDER_ONE"));
    }

    #[tokio::test]
    async fn older_render_does_not_overwrite_newer() {
        let (worker, publish) = spawn();
        let newer = vec![SourceFile::new("src/main.js", "B_CONTENT")];
        let older = vec![SourceFile::new("src/main.js", "A_CONTENT")];

        assert!(worker.render(2, SessionConfig::default(), newer).await.unwrap());
        assert!(!worker.render(1, SessionConfig::default(), older).await.unwrap());

        let (bundle, _) = publish.get("/dist/entry-bundle.js").unwrap();
        assert!(bundle.contains("B_CONTENT"));
        assert!(!bundle.contains("A_CONTENT"));
    }

    #[test]
    fn request_wire_format() {
        let json = serde_json::to_value(Request::Init {
            config: SessionConfig::default(),
        })
        .unwrap();
        assert_eq!(json["type"], "init");
        assert_eq!(json["config"]["isAurelia1"], false);

        let build: Request = serde_json::from_str(r#"{"type": "build"}"#).unwrap();
        assert_eq!(build, Request::Build);
    }
}
