//! Newline-delimited JSON bridge to the UI shell.
//!
//! Every inbound line is one message tagged by `type`. Messages carrying an
//! `id` get exactly one `reply` line with the same id. Sync events for a
//! window and menu rebuilds are pushed as `sync` and `menu` lines. Binary
//! payloads travel as base64 strings.
//!
//! Messages are submitted to the host in line order; their replies may come
//! back in any order.

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;

use backplane_client::{CacheRequest, ImageCacheHandler, Redirector, ResourceType};
use backplane_core::{Collection, Error, PlayerCache, StoreDb, SyncEvent, WindowHandle};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;

use crate::host::{HostHandle, ShellEvent};
use crate::menu::NavEntry;
use crate::screenshot;
use crate::session::{AuthorizationChange, TrustedOrigin};
use crate::windows::WindowEvent;

#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    #[error("BRIDGE_IO: {0}")]
    Io(#[from] std::io::Error),

    #[error("BRIDGE_ENCODE: {0}")]
    Encode(#[from] serde_json::Error),
}

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    id: Option<u64>,
    #[serde(flatten)]
    message: Inbound,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum Inbound {
    WindowCreated {
        window: WindowHandle,
    },
    WindowDestroyed {
        window: WindowHandle,
    },
    Db {
        window: WindowHandle,
        collection: Collection,
        action: String,
        #[serde(default)]
        data: Value,
    },
    SetAuthorization {
        window: WindowHandle,
        origin: String,
        #[serde(default)]
        url: Option<String>,
        #[serde(default)]
        authorization: Option<String>,
    },
    RequestHeaders {
        #[serde(default)]
        window: Option<WindowHandle>,
        url: String,
        resource_type: ResourceType,
    },
    InterceptImage {
        #[serde(default)]
        window: Option<WindowHandle>,
        url: String,
        resource_type: ResourceType,
    },
    CacheRequest(CacheRequest),
    PlayerCacheGet {
        key: String,
    },
    PlayerCacheSet {
        key: String,
        data: String,
    },
    WriteScreenshot {
        origin: String,
        filename: String,
        data: String,
    },
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum Outbound {
    Reply {
        id: u64,
        ok: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        data: Option<Value>,
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
    Sync {
        window: WindowHandle,
        channel: &'static str,
        event: SyncEvent,
    },
    Menu {
        entries: Vec<NavEntry>,
    },
}

type Outbox = mpsc::UnboundedSender<Outbound>;

fn respond(out: &Outbox, id: Option<u64>, result: Result<Value, Error>) {
    let reply = match (id, result) {
        (Some(id), Ok(data)) => Outbound::Reply { id, ok: true, data: Some(data), error: None },
        (Some(id), Err(e)) => Outbound::Reply { id, ok: false, data: None, error: Some(e.to_string()) },
        (None, Ok(_)) => return,
        (None, Err(e)) => {
            tracing::warn!(error = %e, "request without id failed");
            return;
        }
    };
    let _ = out.send(reply);
}

fn decode(data: &str) -> Result<Vec<u8>, Error> {
    STANDARD
        .decode(data)
        .map_err(|e| Error::InvalidDocument(format!("invalid base64 payload: {e}")))
}

/// Everything the bridge serves besides the host itself.
pub struct Services {
    pub store: StoreDb,
    pub trusted: TrustedOrigin,
    pub screenshot_dir: PathBuf,
    pub redirector: Redirector,
    pub images: Arc<ImageCacheHandler>,
    pub player_cache: Arc<PlayerCache>,
}

pub struct Bridge {
    host: HostHandle,
    services: Arc<Services>,
    out: Outbox,
}

impl Bridge {
    /// Serve one shell connection until `reader` reaches end of input, then
    /// stop the host and flush every outstanding line to `writer`.
    pub async fn serve<R, W>(
        host: HostHandle, services: Services, shell: mpsc::UnboundedReceiver<ShellEvent>, reader: R, writer: W,
    ) -> Result<(), BridgeError>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let (out, outbox) = mpsc::unbounded_channel();
        let writer_task = tokio::spawn(write_lines(outbox, writer));
        tokio::spawn(forward_shell(shell, out.clone()));

        let bridge = Bridge { host, services: Arc::new(services), out };
        let mut lines = reader.lines();
        while let Some(line) = lines.next_line().await? {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<Envelope>(&line) {
                Ok(envelope) => bridge.handle(envelope),
                Err(e) => bridge.reject(&line, e),
            }
        }

        tracing::info!("shell closed input, shutting down");
        bridge.host.shutdown();
        drop(bridge);

        match writer_task.await {
            Ok(result) => result,
            Err(e) => Err(BridgeError::Io(std::io::Error::other(e))),
        }
    }

    /// Reply to an undecodable line when it at least carries an id.
    fn reject(&self, line: &str, err: serde_json::Error) {
        let id = serde_json::from_str::<Value>(line)
            .ok()
            .and_then(|v| v.get("id").and_then(Value::as_u64));
        tracing::warn!(error = %err, "malformed bridge message");
        if id.is_some() {
            respond(&self.out, id, Err(Error::InvalidDocument(err.to_string())));
        }
    }

    fn spawn_reply<F>(&self, id: Option<u64>, work: F)
    where
        F: Future<Output = Result<Value, Error>> + Send + 'static,
    {
        let out = self.out.clone();
        tokio::spawn(async move { respond(&out, id, work.await) });
    }

    fn handle(&self, Envelope { id, message }: Envelope) {
        match message {
            Inbound::WindowCreated { window } => {
                let (inbox, events) = mpsc::unbounded_channel();
                tokio::spawn(forward_window(window, events, self.out.clone()));
                let pending = self.host.window_created(window, inbox);
                self.spawn_reply(id, async move { pending.wait().await.map(|()| Value::Null) });
            }
            Inbound::WindowDestroyed { window } => {
                let pending = self.host.window_destroyed(window);
                self.spawn_reply(id, async move { pending.wait().await.map(|()| Value::Null) });
            }
            Inbound::Db { window, collection, action, data } => {
                let pending = self.host.db(window, collection, action, data);
                self.spawn_reply(id, pending.wait());
            }
            Inbound::SetAuthorization { window, origin, url, authorization } => {
                let attribute = match AuthorizationChange::from_message(url, authorization) {
                    AuthorizationChange::Set(attribute) => Some(attribute),
                    AuthorizationChange::Clear => None,
                    AuthorizationChange::Ignore => {
                        tracing::debug!(window = %window, "ignoring credential without scope url");
                        respond(&self.out, id, Ok(Value::Bool(false)));
                        return;
                    }
                };
                let pending = self.host.set_authorization(window, origin, attribute);
                self.spawn_reply(id, async move { pending.wait().await.map(Value::Bool) });
            }
            Inbound::RequestHeaders { window, url, resource_type } => {
                let pending = match (window, resource_type) {
                    (Some(window), ResourceType::Xhr | ResourceType::Media | ResourceType::Image) => {
                        Some(self.host.credential(window, url))
                    }
                    _ => None,
                };
                self.spawn_reply(id, async move {
                    let authorization = match pending {
                        Some(pending) => pending.wait().await?,
                        None => None,
                    };
                    Ok(json!({ "authorization": authorization }))
                });
            }
            Inbound::InterceptImage { window, url, resource_type } => {
                let redirect = self.services.redirector.redirect(&url, resource_type, window);
                respond(&self.out, id, Ok(json!({ "redirect": redirect })));
            }
            Inbound::CacheRequest(request) => {
                let services = Arc::clone(&self.services);
                self.spawn_reply(id, async move {
                    let served = services.images.handle(request).await?;
                    Ok(json!({
                        "mime_type": served.mime_type,
                        "body": STANDARD.encode(&served.bytes),
                        "from_cache": served.from_cache,
                    }))
                });
            }
            Inbound::PlayerCacheGet { key } => {
                let services = Arc::clone(&self.services);
                self.spawn_reply(id, async move {
                    let data = services.player_cache.get(&key).await?;
                    Ok(json!({ "data": data.map(|bytes| STANDARD.encode(&bytes)) }))
                });
            }
            Inbound::PlayerCacheSet { key, data } => {
                let services = Arc::clone(&self.services);
                self.spawn_reply(id, async move {
                    services.player_cache.set(&key, &decode(&data)?).await?;
                    Ok(Value::Null)
                });
            }
            Inbound::WriteScreenshot { origin, filename, data } => {
                let services = Arc::clone(&self.services);
                self.spawn_reply(id, async move {
                    let bytes = decode(&data)?;
                    let path = screenshot::write_screenshot(
                        &services.store,
                        services.trusted,
                        &services.screenshot_dir,
                        &origin,
                        &filename,
                        &bytes,
                    )
                    .await?;
                    Ok(json!({ "path": path.map(|p| p.to_string_lossy().into_owned()) }))
                });
            }
        }
    }
}

async fn forward_window(window: WindowHandle, mut events: mpsc::UnboundedReceiver<WindowEvent>, out: Outbox) {
    while let Some(WindowEvent::Sync { channel, event }) = events.recv().await {
        if out.send(Outbound::Sync { window, channel, event }).is_err() {
            break;
        }
    }
}

async fn forward_shell(mut shell: mpsc::UnboundedReceiver<ShellEvent>, out: Outbox) {
    while let Some(ShellEvent::Menu(entries)) = shell.recv().await {
        if out.send(Outbound::Menu { entries }).is_err() {
            break;
        }
    }
}

/// Drain the outbox to `writer`, one JSON object per line.
async fn write_lines<W>(mut outbox: mpsc::UnboundedReceiver<Outbound>, mut writer: W) -> Result<(), BridgeError>
where
    W: AsyncWrite + Unpin,
{
    while let Some(message) = outbox.recv().await {
        let mut line = serde_json::to_vec(&message)?;
        line.push(b'\n');
        writer.write_all(&line).await?;
        writer.flush().await?;
    }
    Ok(())
}
