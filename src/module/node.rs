//! Server bundles hosted in a `node` child process.
//!
//! Protocol: one JSON object per line on stdin/stdout. The host first
//! announces `{ready, buildId, loaders}`, then answers each
//! `{id, kind, ...}` request with `{id, ok, value | error}`. Page output on
//! `console.log` goes to stderr so it cannot corrupt the channel.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use anyhow::{Context, anyhow, bail};
use async_trait::async_trait;
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use serde::Deserialize;
use serde_json::json;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::sync::oneshot;

use crate::compile::Bundle;
use crate::core::BuildId;
use crate::debug;
use crate::embed::NoVars;
use crate::embed::host::HOST_CJS;
use crate::payload::{Value, from_tagged, to_tagged};
use crate::route::{Params, RouteTable};
use crate::server::RequestContext;

use super::{ModuleLoader, ServerModule};

/// How long the host may take to evaluate the bundle.
const READY_TIMEOUT: Duration = Duration::from_secs(30);

const HOST_FILE: &str = "host.cjs";

/// Starts one host process per generation.
#[derive(Debug, Clone)]
pub struct NodeLoader {
    node: String,
    root: PathBuf,
}

impl NodeLoader {
    pub fn new(node: impl Into<String>, root: impl Into<PathBuf>) -> Self {
        Self {
            node: node.into(),
            root: root.into(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct Ready {
    ready: bool,
    #[serde(rename = "buildId")]
    build_id: String,
    loaders: Vec<bool>,
}

#[derive(Debug, Deserialize)]
struct Reply {
    id: u64,
    ok: bool,
    #[serde(default)]
    value: serde_json::Value,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Rendered {
    html: String,
    status_code: u16,
    #[serde(default)]
    head: RenderedHead,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RenderedHead {
    #[serde(default)]
    markup: String,
    #[serde(default)]
    html_attributes: BTreeMap<String, String>,
    #[serde(default)]
    body_attributes: BTreeMap<String, String>,
}

type Pending = Arc<Mutex<FxHashMap<u64, oneshot::Sender<Reply>>>>;

#[async_trait]
impl ModuleLoader for NodeLoader {
    async fn load(
        &self,
        bundle: &Bundle,
        table: &RouteTable,
    ) -> anyhow::Result<Arc<dyn ServerModule>> {
        Ok(Arc::new(self.start(bundle, table).await?))
    }
}

impl NodeLoader {
    /// Start the host and wait for its `ready` line.
    async fn start(&self, bundle: &Bundle, table: &RouteTable) -> anyhow::Result<NodeModule> {
        let host = bundle.dir.join(HOST_FILE);
        std::fs::write(&host, HOST_CJS.render(&NoVars))
            .with_context(|| format!("failed to write {}", host.display()))?;

        let mut child = Command::new(&self.node)
            .arg(&host)
            .arg(&bundle.server.entry)
            .current_dir(&self.root)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("failed to start `{}`", self.node))?;

        let stdin = child.stdin.take().context("module host has no stdin")?;
        let stdout = child.stdout.take().context("module host has no stdout")?;
        let mut lines = BufReader::new(stdout).lines();

        let first = tokio::time::timeout(READY_TIMEOUT, lines.next_line())
            .await
            .map_err(|_| anyhow!("module host did not start within {:?}", READY_TIMEOUT))??
            .ok_or_else(|| anyhow!("module host exited while loading {}", bundle.server.entry.display()))?;
        let ready: Ready = serde_json::from_str(&first)
            .with_context(|| format!("unexpected module host output: {first}"))?;

        if !ready.ready || ready.build_id != bundle.build_id.to_string() {
            bail!(
                "module host reported build {} (expected {})",
                ready.build_id,
                bundle.build_id
            );
        }
        if ready.loaders.len() != table.len() {
            bail!(
                "server bundle has {} routes, route table has {}",
                ready.loaders.len(),
                table.len()
            );
        }

        let pending: Pending = Arc::default();
        tokio::spawn(read_replies(lines, pending.clone()));
        debug!("module"; "host for build {} ready (pid {:?})", bundle.build_id, child.id());

        Ok(NodeModule {
            build_id: bundle.build_id,
            loaders: ready.loaders,
            stdin: tokio::sync::Mutex::new(stdin),
            pending,
            next_id: AtomicU64::new(1),
            _child: child,
        })
    }
}

/// Route replies to their waiting requests until the host exits.
async fn read_replies(mut lines: Lines<BufReader<ChildStdout>>, pending: Pending) {
    while let Ok(Some(line)) = lines.next_line().await {
        match serde_json::from_str::<Reply>(&line) {
            Ok(reply) => {
                if let Some(tx) = pending.lock().remove(&reply.id) {
                    let _ = tx.send(reply);
                }
            }
            Err(e) => debug!("module"; "ignoring host output `{}`: {}", line, e),
        }
    }
    // Dropping the senders fails every outstanding request
    pending.lock().clear();
}

/// Frees a request's reply slot however the request ends, including
/// when the caller stops polling (a loader timeout aborts its task).
struct PendingSlot<'a> {
    pending: &'a Pending,
    id: u64,
}

impl Drop for PendingSlot<'_> {
    fn drop(&mut self) {
        self.pending.lock().remove(&self.id);
    }
}

struct NodeModule {
    build_id: BuildId,
    loaders: Vec<bool>,
    stdin: tokio::sync::Mutex<ChildStdin>,
    pending: Pending,
    next_id: AtomicU64,
    /// Killed when the generation is dropped.
    _child: Child,
}

impl NodeModule {
    async fn request(&self, mut message: serde_json::Value) -> anyhow::Result<serde_json::Value> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        message["id"] = json!(id);
        let mut line = serde_json::to_string(&message)?;
        line.push('\n');

        let (tx, rx) = oneshot::channel();
        self.pending.lock().insert(id, tx);
        let _slot = PendingSlot {
            pending: &self.pending,
            id,
        };

        let written = {
            let mut stdin = self.stdin.lock().await;
            match stdin.write_all(line.as_bytes()).await {
                Ok(()) => stdin.flush().await,
                Err(e) => Err(e),
            }
        };
        if let Err(e) = written {
            return Err(anyhow!("module host is not accepting requests: {e}"));
        }

        let reply = rx.await.map_err(|_| anyhow!("module host exited"))?;
        if reply.ok {
            Ok(reply.value)
        } else {
            Err(anyhow!(
                "{}",
                reply.error.unwrap_or_else(|| "unknown module host error".to_string())
            ))
        }
    }
}

#[async_trait]
impl ServerModule for NodeModule {
    fn build_id(&self) -> BuildId {
        self.build_id
    }

    fn has_loader(&self, index: usize) -> bool {
        self.loaders.get(index).copied().unwrap_or(false)
    }

    async fn load(&self, index: usize, params: &Params) -> anyhow::Result<Value> {
        let value = self
            .request(json!({ "kind": "load", "index": index, "params": params }))
            .await?;
        Ok(from_tagged(value)?)
    }

    async fn render(&self, ctx: &mut RequestContext) -> anyhow::Result<String> {
        let route_data: serde_json::Map<String, serde_json::Value> = ctx
            .route_data
            .iter()
            .map(|(k, v)| (k.clone(), to_tagged(v)))
            .collect();
        let value = self
            .request(json!({
                "kind": "render",
                "url": ctx.url.target(),
                "statusCode": ctx.status_code,
                "routeData": route_data,
            }))
            .await?;

        let rendered: Rendered =
            serde_json::from_value(value).context("malformed render result")?;
        ctx.status_code = rendered.status_code;
        ctx.head.markup.push_str(&rendered.head.markup);
        ctx.head.html_attributes.extend(rendered.head.html_attributes);
        ctx.head.body_attributes.extend(rendered.head.body_attributes);
        Ok(rendered.html)
    }
}
