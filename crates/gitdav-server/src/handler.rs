use std::io;
use std::sync::Arc;

use axum::body::Body;
use axum::extract::State;
use axum::http::header::{ALLOW, CONTENT_LENGTH, CONTENT_TYPE, ETAG, LAST_MODIFIED};
use axum::http::{HeaderMap, HeaderName, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Json, Response};
use futures_util::stream::{self, Stream};
use serde_json::json;
use tokio::sync::mpsc;

use gitdav_gate::Requester;
use gitdav_vfs::{
    DavFile, DavFileSystem, OpenOptions, PathDefect, ReadOnlyFile, VfsError, VirtualFileSystem,
};

use crate::auth::{CredentialResolver, Credentials};
use crate::error::{ServerError, ServerResult};
use crate::multistatus::{etag, href, http_date, MultiStatus};

const ALLOWED_METHODS: &str = "OPTIONS, GET, HEAD, PROPFIND";
/// Chunking bounds what is queued for the client, not what is resident:
/// the git backend holds a whole blob in memory for the life of a GET.
const STREAM_CHUNK_SIZE: usize = 64 * 1024;
const STREAM_CHANNEL_DEPTH: usize = 4;

/// Shared state behind every route.
#[derive(Clone)]
pub struct AppState {
    pub vfs: Arc<VirtualFileSystem>,
    pub auth: Arc<dyn CredentialResolver>,
}

impl AppState {
    pub fn new(vfs: Arc<VirtualFileSystem>, auth: Arc<dyn CredentialResolver>) -> Self {
        Self { vfs, auth }
    }
}

/// Health check handler.
pub async fn health_handler() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

/// Info handler.
pub async fn info_handler(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({
        "name": "gitdav-server",
        "version": env!("CARGO_PKG_VERSION"),
        "branch": state.vfs.branch(),
        "browse_marker": state.vfs.grammar().browse_marker(),
    }))
}

/// Every path outside `/v1` is a DAV request.
pub async fn dav_handler(
    State(state): State<AppState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
) -> ServerResult<Response> {
    let credentials = Credentials::from_headers(&headers)?;
    let requester = state.auth.authenticate(&credentials).await?;
    let path = decode_path(uri.path())?;

    match method.as_str() {
        "OPTIONS" => Ok(options()),
        "GET" => get(&state, requester, path, true).await,
        "HEAD" => get(&state, requester, path, false).await,
        "PROPFIND" => propfind(&state, requester, path, depth(&headers)).await,
        "PUT" | "DELETE" | "MKCOL" | "MOVE" | "COPY" | "PROPPATCH" | "LOCK" | "UNLOCK" => {
            mutate(&state, requester, &method, &path, &headers)
        }
        _ => Ok((StatusCode::METHOD_NOT_ALLOWED, [(ALLOW, ALLOWED_METHODS)]).into_response()),
    }
}

fn decode_path(raw: &str) -> ServerResult<String> {
    urlencoding::decode(raw)
        .map(|path| path.into_owned())
        .map_err(|_| {
            ServerError::Vfs(VfsError::MalformedPath {
                path: raw.to_string(),
                defect: PathDefect::InvalidSegment,
            })
        })
}

/// `Depth: 0` stats the entry alone; anything else, `infinity` included,
/// adds the immediate children.
fn depth(headers: &HeaderMap) -> u8 {
    match headers.get("depth").and_then(|v| v.to_str().ok()) {
        Some("0") => 0,
        _ => 1,
    }
}

fn options() -> Response {
    (
        StatusCode::OK,
        [
            (HeaderName::from_static("dav"), "1"),
            (ALLOW, ALLOWED_METHODS),
        ],
    )
        .into_response()
}

async fn blocking<T, F>(f: F) -> ServerResult<T>
where
    F: FnOnce() -> ServerResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| ServerError::Internal(e.to_string()))?
}

async fn open(state: &AppState, requester: Requester, path: String) -> ServerResult<ReadOnlyFile> {
    let vfs = Arc::clone(&state.vfs);
    blocking(move || {
        let file = vfs
            .read_only(requester)
            .open_file(&path, OpenOptions::read_only())?;
        Ok(file)
    })
    .await
}

async fn get(
    state: &AppState,
    requester: Requester,
    path: String,
    with_body: bool,
) -> ServerResult<Response> {
    let mut file = open(state, requester, path).await?;
    let metadata = file.stat()?;

    let validators = [
        (LAST_MODIFIED, http_date(&metadata.mod_time)),
        (ETAG, etag(&metadata)),
    ];

    if metadata.is_directory {
        let content_type = [(CONTENT_TYPE, "application/json")];
        if !with_body {
            return Ok((content_type, validators, Body::empty()).into_response());
        }
        return Ok((content_type, validators, Json(file.list(0)?)).into_response());
    }

    let headers = [
        (CONTENT_TYPE, "application/octet-stream".to_string()),
        (CONTENT_LENGTH, metadata.size.to_string()),
    ];
    if !with_body {
        return Ok((headers, validators, Body::empty()).into_response());
    }
    Ok((headers, validators, Body::from_stream(stream_content(file))).into_response())
}

/// Stream a file's content from a blocking task over a bounded channel.
///
/// When the client disconnects the receiver is dropped, the next send fails,
/// and the task ends, dropping the file and its repository handle.
fn stream_content(mut file: ReadOnlyFile) -> impl Stream<Item = io::Result<Vec<u8>>> {
    let (tx, rx) = mpsc::channel::<io::Result<Vec<u8>>>(STREAM_CHANNEL_DEPTH);
    tokio::task::spawn_blocking(move || {
        let mut buf = vec![0u8; STREAM_CHUNK_SIZE];
        loop {
            let chunk = match file.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => Ok(buf[..n].to_vec()),
                Err(err) => Err(io::Error::other(err)),
            };
            let failed = chunk.is_err();
            if tx.blocking_send(chunk).is_err() {
                tracing::debug!("client disconnected, releasing blob");
                break;
            }
            if failed {
                break;
            }
        }
    });
    stream::unfold(rx, |mut rx| async move { rx.recv().await.map(|chunk| (chunk, rx)) })
}

async fn propfind(
    state: &AppState,
    requester: Requester,
    path: String,
    depth: u8,
) -> ServerResult<Response> {
    let vfs = Arc::clone(&state.vfs);
    let xml = blocking(move || {
        let request = vfs.resolve(&path)?;
        let mut file = vfs
            .read_only(requester)
            .open_file(&path, OpenOptions::read_only())?;
        let metadata = file.stat()?;
        let grammar = vfs.grammar();

        let mut body = MultiStatus::new();
        body.push(
            &href(grammar, &request.locator, &request.internal, metadata.is_directory),
            &metadata,
        );
        if metadata.is_directory && depth > 0 {
            for child in file.list(0)? {
                let internal = request.internal.join(&child.name);
                body.push(
                    &href(grammar, &request.locator, &internal, child.is_directory),
                    &child,
                );
            }
        }
        Ok(body.finish())
    })
    .await?;

    Ok((
        StatusCode::MULTI_STATUS,
        [(CONTENT_TYPE, "application/xml; charset=utf-8")],
        xml,
    )
        .into_response())
}

fn mutate(
    state: &AppState,
    requester: Requester,
    method: &Method,
    path: &str,
    headers: &HeaderMap,
) -> ServerResult<Response> {
    let fs = state.vfs.read_only(requester);
    let destination = headers
        .get("destination")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    match method.as_str() {
        "PUT" => {
            let options = OpenOptions {
                write: true,
                create: true,
                truncate: true,
                ..OpenOptions::default()
            };
            fs.open_file(path, options).map(drop)
        }
        "DELETE" => fs.remove(path),
        "MKCOL" => fs.mkdir(path),
        "MOVE" => fs.rename(path, destination),
        "COPY" => fs.copy(path, destination),
        "PROPPATCH" => fs.set_properties(path),
        _ => fs.lock(path),
    }?;
    Ok(StatusCode::NO_CONTENT.into_response())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use axum::http::header::AUTHORIZATION;
    use axum::http::Request;
    use chrono::{TimeZone, Utc};
    use gitdav_gate::{
        DirectoryConfig, GateConfig, PermissionGate, RepositoryConfig, StaticDirectory, UserConfig,
    };
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use futures_util::StreamExt;
    use gitdav_store::{
        BlobReader, CommitInfo, InMemoryRepositoryStorage, RepositoryStorage, StoreResult,
        StoredRepository, Tree, TreeEntry,
    };
    use gitdav_types::{ObjectId, RepositoryLocator};
    use gitdav_vfs::VfsConfig;
    use tower::util::ServiceExt;

    use crate::auth::TokenAuth;
    use crate::router::build_router;

    /// Storage wrapper tracking how many repository handles are alive.
    struct TrackedStorage {
        inner: InMemoryRepositoryStorage,
        live: Arc<AtomicUsize>,
    }

    impl RepositoryStorage for TrackedStorage {
        fn open(&self, locator: &RepositoryLocator) -> StoreResult<Option<Box<dyn StoredRepository>>> {
            Ok(self.inner.open(locator)?.map(|inner| {
                self.live.fetch_add(1, Ordering::SeqCst);
                Box::new(TrackedRepository {
                    inner,
                    live: Arc::clone(&self.live),
                }) as Box<dyn StoredRepository>
            }))
        }
    }

    struct TrackedRepository {
        inner: Box<dyn StoredRepository>,
        live: Arc<AtomicUsize>,
    }

    impl Drop for TrackedRepository {
        fn drop(&mut self) {
            self.live.fetch_sub(1, Ordering::SeqCst);
        }
    }

    impl StoredRepository for TrackedRepository {
        fn branch_head(&self, branch: &str) -> StoreResult<Option<CommitInfo>> {
            self.inner.branch_head(branch)
        }

        fn tree_entry_by_path(&self, tree: &ObjectId, path: &str) -> StoreResult<Option<TreeEntry>> {
            self.inner.tree_entry_by_path(tree, path)
        }

        fn read_tree(&self, tree: &ObjectId) -> StoreResult<Option<Tree>> {
            self.inner.read_tree(tree)
        }

        fn open_blob(&self, blob: &ObjectId) -> StoreResult<Option<BlobReader>> {
            self.inner.open_blob(blob)
        }
    }

    fn state() -> AppState {
        let storage = InMemoryRepositoryStorage::new();
        for name in ["repo", "secret"] {
            storage
                .create(&RepositoryLocator::new("org", name))
                .commit_files(
                    "master",
                    &[("a.txt", "hello"), ("sub/b.txt", "bee"), ("sub/my file.txt", "x")],
                    Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
                    "initial",
                )
                .unwrap();
        }
        let directory = Arc::new(
            StaticDirectory::from_config(&DirectoryConfig {
                users: vec![UserConfig {
                    name: "alice".into(),
                    token: "t-alice".into(),
                    admin: false,
                }],
                repositories: vec![
                    RepositoryConfig::public("org", "repo"),
                    RepositoryConfig {
                        collaborators: vec!["alice".into()],
                        ..RepositoryConfig::private("org", "secret")
                    },
                ],
            })
            .unwrap(),
        );
        let gate = PermissionGate::new(directory.clone(), GateConfig::default());
        let vfs = VirtualFileSystem::new(&VfsConfig::default(), gate, Arc::new(storage)).unwrap();
        AppState::new(Arc::new(vfs), Arc::new(TokenAuth::new(directory)))
    }

    async fn send(method: &str, uri: &str, auth: Option<&str>) -> Response {
        let mut request = Request::builder().method(method).uri(uri);
        if let Some(auth) = auth {
            request = request.header(AUTHORIZATION, auth);
        }
        build_router(state())
            .oneshot(request.body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    async fn body_text(response: Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    // =========================================================================
    // GET / HEAD
    // =========================================================================

    #[tokio::test]
    async fn get_file_streams_content() {
        let response = send("GET", "/org/repo/_dav/a.txt", None).await;
        assert_eq!(response.status(), 200);
        let headers = response.headers();
        assert_eq!(headers[CONTENT_LENGTH], "5");
        assert_eq!(headers[LAST_MODIFIED], "Tue, 14 Nov 2023 22:13:20 GMT");
        assert_eq!(
            headers[ETAG],
            "\"b6fc4c620b67d95f953a5c1c1230aaab5db5a1b0\""
        );
        assert_eq!(body_text(response).await, "hello");
    }

    #[tokio::test]
    async fn dropped_client_releases_repository_handle() {
        let storage = InMemoryRepositoryStorage::new();
        let large = vec![b'x'; STREAM_CHUNK_SIZE * STREAM_CHANNEL_DEPTH * 4];
        storage
            .create(&RepositoryLocator::new("org", "repo"))
            .commit_files(
                "master",
                &[("large.bin", large.as_slice())],
                Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
                "large blob",
            )
            .unwrap();
        let live = Arc::new(AtomicUsize::new(0));
        let storage = TrackedStorage {
            inner: storage,
            live: Arc::clone(&live),
        };
        let directory = Arc::new(
            StaticDirectory::from_config(&DirectoryConfig {
                users: vec![],
                repositories: vec![RepositoryConfig::public("org", "repo")],
            })
            .unwrap(),
        );
        let gate = PermissionGate::new(directory.clone(), GateConfig::default());
        let vfs = VirtualFileSystem::new(&VfsConfig::default(), gate, Arc::new(storage)).unwrap();
        let state = AppState::new(Arc::new(vfs), Arc::new(TokenAuth::new(directory)));

        let response = build_router(state)
            .oneshot(
                Request::builder()
                    .uri("/org/repo/_dav/large.bin")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), 200);

        let mut frames = response.into_body().into_data_stream();
        let first = frames.next().await.unwrap().unwrap();
        assert!(!first.is_empty());
        assert!(live.load(Ordering::SeqCst) > 0);
        drop(frames);

        tokio::time::timeout(Duration::from_secs(5), async {
            while live.load(Ordering::SeqCst) != 0 {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("repository handle still open after the client went away");
    }

    #[tokio::test]
    async fn head_directory_carries_validators() {
        let response = send("HEAD", "/org/repo/_dav/sub/", None).await;
        assert_eq!(response.status(), 200);
        let headers = response.headers();
        assert_eq!(headers[CONTENT_TYPE], "application/json");
        assert_eq!(headers[LAST_MODIFIED], "Tue, 14 Nov 2023 22:13:20 GMT");
        assert!(headers[ETAG].to_str().unwrap().starts_with('"'));
        let get = send("GET", "/org/repo/_dav/sub/", None).await;
        assert_eq!(get.headers()[ETAG], response.headers()[ETAG]);
        assert!(body_text(response).await.is_empty());
    }

    #[tokio::test]
    async fn head_file_has_headers_only() {
        let response = send("HEAD", "/org/repo/_dav/a.txt", None).await;
        assert_eq!(response.status(), 200);
        assert_eq!(response.headers()[CONTENT_LENGTH], "5");
        assert!(body_text(response).await.is_empty());
    }

    #[tokio::test]
    async fn get_directory_lists_json() {
        let response = send("GET", "/org/repo/_dav/sub/", None).await;
        assert_eq!(response.status(), 200);
        let listing: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
        let names: Vec<_> = listing
            .as_array()
            .unwrap()
            .iter()
            .map(|e| e["name"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(names, ["b.txt", "my file.txt"]);
    }

    #[tokio::test]
    async fn percent_encoded_paths_are_decoded() {
        let response = send("GET", "/org/repo/_dav/sub/my%20file.txt", None).await;
        assert_eq!(response.status(), 200);
        assert_eq!(body_text(response).await, "x");
    }

    // =========================================================================
    // Access control
    // =========================================================================

    #[tokio::test]
    async fn private_repository_needs_credentials() {
        let response = send("GET", "/org/secret/_dav/a.txt", None).await;
        assert_eq!(response.status(), 401);
        assert!(body_text(response).await.is_empty());

        let response = send("GET", "/org/secret/_dav/a.txt", Some("Bearer t-alice")).await;
        assert_eq!(response.status(), 200);
    }

    #[tokio::test]
    async fn unknown_repository_looks_unauthorized() {
        let unknown = send("GET", "/org/nope/_dav/a.txt", None).await;
        let private = send("GET", "/org/secret/_dav/a.txt", None).await;
        assert_eq!(unknown.status(), 401);
        assert_eq!(unknown.status(), private.status());
    }

    #[tokio::test]
    async fn unknown_token_is_rejected() {
        let response = send("GET", "/org/repo/_dav/a.txt", Some("Bearer forged")).await;
        assert_eq!(response.status(), 401);
    }

    #[tokio::test]
    async fn missing_entries_are_404_without_body() {
        for uri in ["/org/repo/_dav/missing.txt", "/org/repo/a.txt", "/org/repo/_dav/../x"] {
            let response = send("GET", uri, None).await;
            assert_eq!(response.status(), 404, "{uri}");
            assert!(body_text(response).await.is_empty());
        }
    }

    // =========================================================================
    // DAV methods
    // =========================================================================

    #[tokio::test]
    async fn options_advertises_read_only_dav() {
        let response = send("OPTIONS", "/org/repo/_dav/", None).await;
        assert_eq!(response.status(), 200);
        assert_eq!(response.headers()["dav"], "1");
        assert_eq!(response.headers()[ALLOW], ALLOWED_METHODS);
    }

    #[tokio::test]
    async fn propfind_depth_one_lists_children() {
        let response = build_router(state())
            .oneshot(
                Request::builder()
                    .method("PROPFIND")
                    .uri("/org/repo/_dav/sub")
                    .header("Depth", "1")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::MULTI_STATUS);
        let xml = body_text(response).await;
        assert_eq!(xml.matches("<D:response>").count(), 3);
        assert!(xml.contains("<D:href>/org/repo/_dav/sub/</D:href>"));
        assert!(xml.contains("<D:href>/org/repo/_dav/sub/my%20file.txt</D:href>"));
        assert!(xml.contains("<D:collection/>"));
    }

    #[tokio::test]
    async fn propfind_depth_zero_is_entry_only() {
        let response = build_router(state())
            .oneshot(
                Request::builder()
                    .method("PROPFIND")
                    .uri("/org/repo/_dav/")
                    .header("Depth", "0")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::MULTI_STATUS);
        let xml = body_text(response).await;
        assert_eq!(xml.matches("<D:response>").count(), 1);
        assert!(xml.contains("<D:displayname>repo</D:displayname>"));
    }

    #[tokio::test]
    async fn mutations_are_forbidden() {
        for method in ["PUT", "DELETE", "MKCOL", "MOVE", "COPY", "PROPPATCH", "LOCK", "UNLOCK"] {
            let response = send(method, "/org/repo/_dav/a.txt", None).await;
            assert_eq!(response.status(), 403, "{method}");
        }
    }

    #[tokio::test]
    async fn unknown_method_is_not_allowed() {
        let response = send("PATCH", "/org/repo/_dav/a.txt", None).await;
        assert_eq!(response.status(), 405);
    }
}
