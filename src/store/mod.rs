//! Single-writer owner of the document and the auxiliary records.
//!
//! One task owns the backend and serves requests from a channel strictly in
//! arrival order. [`DocumentStore`] is the cheap, cloneable handle handlers
//! use to talk to it; there is no other lock anywhere above this layer.
//!
//! Mutations should go through [`DocumentStore::update`], which runs the
//! whole read → patch → normalize → write cycle inside the task so two
//! concurrent edits cannot interleave.

use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, instrument};

use crate::model::{normalize, Document};

mod backend;
mod error;

pub use backend::{Backend, MemoryBackend, SqliteBackend};
pub use error::StoreError;

/// Key of the single document record.
pub const DATA_KEY: &str = "cloudnav:data";

const CHANNEL_CAPACITY: usize = 64;

type Reply<T> = oneshot::Sender<Result<T, StoreError>>;

/// A patch run inside the store task; returns whether to persist.
type Mutation = Box<dyn FnOnce(&mut Document) -> bool + Send>;

/// Maps the current auxiliary value to its replacement; `None` removes it.
type AuxMutation = Box<dyn FnOnce(Option<Value>) -> Option<Value> + Send>;

enum Command {
    Load {
        reply: Reply<Document>,
    },
    Save {
        doc: Box<Document>,
        reply: Reply<()>,
    },
    Update {
        mutation: Mutation,
        reply: Reply<()>,
    },
    GetAux {
        key: String,
        reply: Reply<Option<Value>>,
    },
    PutAux {
        key: String,
        value: Value,
        reply: Reply<()>,
    },
    DeleteAux {
        key: String,
        reply: Reply<()>,
    },
    UpdateAux {
        key: String,
        mutation: AuxMutation,
        reply: Reply<Option<Value>>,
    },
    Ping {
        reply: Reply<()>,
    },
}

impl Command {
    const fn name(&self) -> &'static str {
        match self {
            Self::Load { .. } => "load",
            Self::Save { .. } => "save",
            Self::Update { .. } => "update",
            Self::GetAux { .. } => "get_aux",
            Self::PutAux { .. } => "put_aux",
            Self::DeleteAux { .. } => "delete_aux",
            Self::UpdateAux { .. } => "update_aux",
            Self::Ping { .. } => "ping",
        }
    }
}

#[derive(Clone, Debug)]
pub struct DocumentStore {
    tx: mpsc::Sender<Command>,
}

impl DocumentStore {
    /// Start the owning task on the current runtime.
    #[must_use]
    pub fn spawn<B: Backend>(backend: B) -> Self {
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        tokio::spawn(Owner { backend }.run(rx));
        Self { tx }
    }

    /// Stored document, or the seed document on first run.
    ///
    /// The result is decoded leniently but not normalized.
    ///
    /// # Errors
    /// Returns an error if the store is unreachable or the record cannot be decoded.
    pub async fn load(&self) -> Result<Document, StoreError> {
        self.call(|reply| Command::Load { reply }).await
    }

    /// Persist a document. Callers normalize first; the store normalizes again.
    ///
    /// # Errors
    /// Returns an error if the store is unreachable or the write fails.
    pub async fn save(&self, doc: Document) -> Result<(), StoreError> {
        let doc = Box::new(doc);
        self.call(|reply| Command::Save { doc, reply }).await
    }

    /// Read-modify-write as one step of the store task.
    ///
    /// `patch` runs against the current document; on `Ok` the document is
    /// normalized and written, on `Err` nothing is written. The outer result
    /// carries store faults, the inner one is whatever `patch` returned.
    ///
    /// # Errors
    /// Returns an error if the store is unreachable or the write fails.
    pub async fn update<T, E, F>(&self, patch: F) -> Result<Result<T, E>, StoreError>
    where
        F: FnOnce(&mut Document) -> Result<T, E> + Send + 'static,
        T: Send + 'static,
        E: Send + 'static,
    {
        let (outcome_tx, outcome_rx) = oneshot::channel();
        let mutation: Mutation = Box::new(move |doc: &mut Document| {
            let outcome = patch(doc);
            let commit = outcome.is_ok();
            let _ = outcome_tx.send(outcome);
            commit
        });

        self.call(|reply| Command::Update { mutation, reply })
            .await?;
        outcome_rx.await.map_err(|_| StoreError::Unavailable)
    }

    /// # Errors
    /// Returns an error if the store is unreachable or the value cannot be decoded as `T`.
    pub async fn get_aux<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StoreError> {
        let key = key.to_string();
        let value = self.call(|reply| Command::GetAux { key, reply }).await?;
        Ok(value.map(serde_json::from_value).transpose()?)
    }

    /// # Errors
    /// Returns an error if the store is unreachable or the write fails.
    pub async fn put_aux<T: Serialize>(&self, key: &str, value: &T) -> Result<(), StoreError> {
        let key = key.to_string();
        let value = serde_json::to_value(value)?;
        self.call(|reply| Command::PutAux { key, value, reply })
            .await
    }

    /// # Errors
    /// Returns an error if the store is unreachable or the delete fails.
    pub async fn delete_aux(&self, key: &str) -> Result<(), StoreError> {
        let key = key.to_string();
        self.call(|reply| Command::DeleteAux { key, reply }).await
    }

    /// Read-modify-write of one auxiliary record inside the store task.
    ///
    /// `mutation` sees the current value (`None` when absent or not JSON) and
    /// returns the replacement; `None` deletes the record. Nothing is written
    /// when the value is unchanged. Returns the value now stored.
    ///
    /// # Errors
    /// Returns an error if the store is unreachable or the write fails.
    pub async fn update_aux<F>(&self, key: &str, mutation: F) -> Result<Option<Value>, StoreError>
    where
        F: FnOnce(Option<Value>) -> Option<Value> + Send + 'static,
    {
        let key = key.to_string();
        let mutation: AuxMutation = Box::new(mutation);
        self.call(|reply| Command::UpdateAux {
            key,
            mutation,
            reply,
        })
        .await
    }

    /// Round-trip through the store task without touching the backend.
    ///
    /// # Errors
    /// Returns an error if the store is unreachable.
    pub async fn ping(&self) -> Result<(), StoreError> {
        self.call(|reply| Command::Ping { reply }).await
    }

    async fn call<T>(&self, command: impl FnOnce(Reply<T>) -> Command) -> Result<T, StoreError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(command(reply))
            .await
            .map_err(|_| StoreError::Unavailable)?;
        rx.await.map_err(|_| StoreError::Unavailable)?
    }
}

struct Owner<B> {
    backend: B,
}

impl<B: Backend> Owner<B> {
    async fn run(mut self, mut rx: mpsc::Receiver<Command>) {
        while let Some(command) = rx.recv().await {
            self.handle(command).await;
        }
        if let Err(err) = self.backend.close().await {
            error!("Failed to close document store backend: {err}");
        }
        debug!("document store stopped");
    }

    #[instrument(skip_all, fields(store.op = command.name()))]
    async fn handle(&mut self, command: Command) {
        match command {
            Command::Load { reply } => {
                let _ = reply.send(self.load().await);
            }
            Command::Save { doc, reply } => {
                let _ = reply.send(self.save(*doc).await);
            }
            Command::Update { mutation, reply } => {
                let result = match self.load().await {
                    Ok(mut doc) => {
                        if mutation(&mut doc) {
                            self.save(doc).await
                        } else {
                            Ok(())
                        }
                    }
                    Err(err) => Err(err),
                };
                let _ = reply.send(result);
            }
            Command::GetAux { key, reply } => {
                let result = match self.backend.get(&key).await {
                    Ok(Some(raw)) => serde_json::from_str(&raw)
                        .map(Some)
                        .map_err(StoreError::from),
                    Ok(None) => Ok(None),
                    Err(err) => Err(err),
                };
                let _ = reply.send(result);
            }
            Command::PutAux { key, value, reply } => {
                let result = match serde_json::to_string(&value) {
                    Ok(raw) => self.backend.put(&key, raw).await,
                    Err(err) => Err(StoreError::from(err)),
                };
                let _ = reply.send(result);
            }
            Command::DeleteAux { key, reply } => {
                let _ = reply.send(self.backend.delete(&key).await);
            }
            Command::UpdateAux {
                key,
                mutation,
                reply,
            } => {
                let _ = reply.send(self.update_aux(&key, mutation).await);
            }
            Command::Ping { reply } => {
                let _ = reply.send(Ok(()));
            }
        }
    }

    async fn load(&mut self) -> Result<Document, StoreError> {
        match self.backend.get(DATA_KEY).await? {
            Some(raw) => serde_json::from_str(&raw).map_err(|err| {
                error!("Stored document is not decodable: {err}");
                StoreError::from(err)
            }),
            None => {
                debug!("no stored document, using seed");
                Ok(Document::seed())
            }
        }
    }

    async fn save(&mut self, doc: Document) -> Result<(), StoreError> {
        let doc = normalize(doc);
        let raw = serde_json::to_string(&doc)?;
        self.backend.put(DATA_KEY, raw).await
    }

    async fn update_aux(
        &mut self,
        key: &str,
        mutation: AuxMutation,
    ) -> Result<Option<Value>, StoreError> {
        let raw = self.backend.get(key).await?;
        let stored = raw.is_some();
        let current = match raw.map(|raw| serde_json::from_str::<Value>(&raw)) {
            Some(Ok(value)) => Some(value),
            Some(Err(err)) => {
                debug!(key, "aux record is not JSON: {err}");
                None
            }
            None => None,
        };
        let readable = current.is_some();

        let next = mutation(current.clone());
        if next == current && stored == readable {
            return Ok(next);
        }
        match &next {
            Some(value) => {
                let raw = serde_json::to_string(value)?;
                self.backend.put(key, raw).await?;
            }
            None => self.backend.delete(key).await?,
        }
        Ok(next)
    }
}
