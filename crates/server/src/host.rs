//! The control thread.
//!
//! A single actor task owns the window registry, the session attributes and
//! the routing of collection actions. Everything else talks to it through a
//! [`HostHandle`]. Commands are enqueued synchronously, so the order in which
//! a caller submits them is the order the actor sees them.
//!
//! Store operations run as futures in an ordered queue. The actor keeps
//! serving commands while they are in flight, and completes them (sync
//! broadcast, reply, menu publish) strictly in submission order.

use async_trait::async_trait;
use backplane_client::CredentialSource;
use backplane_core::{Collection, Error, StoreDb, WindowHandle};
use futures_util::StreamExt;
use futures_util::future::BoxFuture;
use futures_util::stream::FuturesOrdered;
use serde_json::Value;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::bus;
use crate::menu::{self, NavEntry};
use crate::router::{self, Applied};
use crate::session::{SessionAttribute, SessionAttributes, TrustedOrigin};
use crate::windows::{Inbox, WindowRegistry};

/// Events for the UI shell rather than for a single window.
#[derive(Debug, Clone, PartialEq)]
pub enum ShellEvent {
    Menu(Vec<NavEntry>),
}

type Reply<T> = oneshot::Sender<Result<T, Error>>;

enum Command {
    WindowCreated {
        window: WindowHandle,
        inbox: Inbox,
        reply: Reply<()>,
    },
    WindowDestroyed {
        window: WindowHandle,
        reply: Reply<()>,
    },
    Db {
        window: WindowHandle,
        collection: Collection,
        action: String,
        data: Value,
        reply: Reply<Value>,
    },
    SetAuthorization {
        window: WindowHandle,
        origin: String,
        attribute: Option<SessionAttribute>,
        reply: Reply<bool>,
    },
    Credential {
        window: WindowHandle,
        url: String,
        reply: Reply<Option<String>>,
    },
    Shutdown,
}

/// Answer to a submitted command.
#[derive(Debug)]
pub struct Pending<T> {
    rx: oneshot::Receiver<Result<T, Error>>,
}

impl<T> Pending<T> {
    /// Wait for the actor to answer. Fails with `HostUnavailable` if the
    /// actor stopped before answering.
    pub async fn wait(self) -> Result<T, Error> {
        self.rx.await.map_err(|_| Error::HostUnavailable)?
    }
}

/// Cloneable sender side of the control thread.
#[derive(Debug, Clone)]
pub struct HostHandle {
    tx: mpsc::UnboundedSender<Command>,
}

impl HostHandle {
    fn submit<T>(&self, command: impl FnOnce(Reply<T>) -> Command) -> Pending<T> {
        let (reply, rx) = oneshot::channel();
        // A closed actor drops the command and with it the reply sender.
        let _ = self.tx.send(command(reply));
        Pending { rx }
    }

    pub fn window_created(&self, window: WindowHandle, inbox: Inbox) -> Pending<()> {
        self.submit(|reply| Command::WindowCreated { window, inbox, reply })
    }

    pub fn window_destroyed(&self, window: WindowHandle) -> Pending<()> {
        self.submit(|reply| Command::WindowDestroyed { window, reply })
    }

    /// Run a collection action on behalf of `window`.
    pub fn db(&self, window: WindowHandle, collection: Collection, action: impl Into<String>, data: Value) -> Pending<Value> {
        let action = action.into();
        self.submit(|reply| Command::Db { window, collection, action, data, reply })
    }

    /// Set or clear the session attribute of `window`. Resolves to whether
    /// the origin was trusted and the change applied.
    pub fn set_authorization(
        &self, window: WindowHandle, origin: impl Into<String>, attribute: Option<SessionAttribute>,
    ) -> Pending<bool> {
        let origin = origin.into();
        self.submit(|reply| Command::SetAuthorization { window, origin, attribute, reply })
    }

    pub fn credential(&self, window: WindowHandle, url: impl Into<String>) -> Pending<Option<String>> {
        let url = url.into();
        self.submit(|reply| Command::Credential { window, url, reply })
    }

    /// Ask the actor to finish in-flight work and stop.
    pub fn shutdown(&self) {
        let _ = self.tx.send(Command::Shutdown);
    }
}

#[async_trait]
impl CredentialSource for HostHandle {
    async fn credential_for(&self, window: WindowHandle, url: &str) -> Option<String> {
        self.credential(window, url).wait().await.ok().flatten()
    }
}

struct Completed {
    window: WindowHandle,
    collection: Collection,
    result: Result<Applied, Error>,
    menu: Option<Vec<NavEntry>>,
    reply: Reply<Value>,
}

struct Host {
    store: StoreDb,
    registry: WindowRegistry,
    sessions: SessionAttributes,
    shell: mpsc::UnboundedSender<ShellEvent>,
    pending: FuturesOrdered<BoxFuture<'static, Completed>>,
}

/// Start the control thread.
pub fn spawn(
    store: StoreDb, trusted: TrustedOrigin, shell: mpsc::UnboundedSender<ShellEvent>,
) -> (HostHandle, JoinHandle<()>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let host = Host {
        store,
        registry: WindowRegistry::new(),
        sessions: SessionAttributes::new(trusted),
        shell,
        pending: FuturesOrdered::new(),
    };
    (HostHandle { tx }, tokio::spawn(host.run(rx)))
}

impl Host {
    async fn run(mut self, mut rx: mpsc::UnboundedReceiver<Command>) {
        tracing::info!("host started");
        loop {
            tokio::select! {
                command = rx.recv() => match command {
                    Some(Command::Shutdown) | None => break,
                    Some(command) => self.handle(command),
                },
                Some(done) = self.pending.next(), if !self.pending.is_empty() => self.complete(done),
            }
        }

        while let Some(done) = self.pending.next().await {
            self.complete(done);
        }
        tracing::info!(windows = self.registry.len(), "host stopped");
    }

    fn handle(&mut self, command: Command) {
        match command {
            Command::WindowCreated { window, inbox, reply } => {
                let result = self.registry.register(window, inbox);
                if result.is_ok() {
                    tracing::info!(window = %window, windows = self.registry.len(), "window created");
                }
                let _ = reply.send(result);
            }
            Command::WindowDestroyed { window, reply } => {
                self.registry.unregister(window);
                self.sessions.remove(window);
                tracing::info!(window = %window, windows = self.registry.len(), "window destroyed");
                let _ = reply.send(Ok(()));
            }
            Command::Db { window, collection, action, data, reply } => {
                if self.registry.is_retired(window) {
                    let _ = reply.send(Err(Error::WindowRetired(window)));
                    return;
                }
                let store = self.store.clone();
                self.pending.push_back(Box::pin(async move {
                    let result = router::dispatch(&store, collection, &action, data).await;
                    let menu = match &result {
                        Ok(applied) if applied.rebuild_menu => match menu::load_menu(&store).await {
                            Ok(menu) => Some(menu),
                            Err(e) => {
                                tracing::warn!(error = %e, "menu rebuild failed");
                                None
                            }
                        },
                        _ => None,
                    };
                    Completed { window, collection, result, menu, reply }
                }));
            }
            Command::SetAuthorization { window, origin, attribute, reply } => {
                let applied = self.sessions.set(window, &origin, attribute);
                let _ = reply.send(Ok(applied));
            }
            Command::Credential { window, url, reply } => {
                let _ = reply.send(Ok(self.sessions.credential_for(window, &url)));
            }
            Command::Shutdown => {}
        }
    }

    fn complete(&mut self, done: Completed) {
        let Completed { window, collection, result, menu, reply } = done;
        match result {
            Ok(applied) => {
                if let Some(event) = &applied.sync {
                    bus::publish(&self.registry, collection, window, event);
                }
                let _ = reply.send(Ok(applied.reply));
                if let Some(menu) = menu
                    && self.shell.send(ShellEvent::Menu(menu)).is_err()
                {
                    tracing::warn!("shell closed, menu not published");
                }
            }
            Err(e) => {
                tracing::warn!(window = %window, collection = %collection, error = %e, "db action failed");
                let _ = reply.send(Err(e));
            }
        }
    }
}
