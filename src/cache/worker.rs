//! The cache manager's own task and the handles used to reach it.
//!
//! The manager runs in a dedicated task and is only reachable by posting
//! [`WorkerEvent`]s; anything expecting an answer carries a reply channel.

use color_eyre::{eyre::eyre, Result};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tracing::debug;

use super::clients::{ClientId, ClientRegistry};
use super::manager::{ActivationReport, CacheManager, FetchOutcome};
use super::messages::WorkerMessage;
use super::network::Network;
use super::storage::CacheStorage;
use super::types::Request;

/// One-shot reply channel handed over with a message.
#[derive(Debug)]
pub struct ReplyPort(oneshot::Sender<Value>);

impl ReplyPort {
  pub fn channel() -> (Self, oneshot::Receiver<Value>) {
    let (tx, rx) = oneshot::channel();
    (Self(tx), rx)
  }

  /// Post a reply. The requester may have gone away; that is not an error.
  pub fn post(self, value: Value) {
    let _ = self.0.send(value);
  }
}

/// Events delivered to the cache worker.
#[derive(Debug)]
pub enum WorkerEvent {
  Install {
    done: oneshot::Sender<Result<usize>>,
  },
  Activate {
    done: oneshot::Sender<Result<ActivationReport>>,
  },
  SkipWaiting,
  Fetch {
    request: Request,
    respond_with: oneshot::Sender<Result<FetchOutcome>>,
  },
  Message {
    data: Value,
    port: Option<ReplyPort>,
  },
  Sync {
    tag: String,
    done: oneshot::Sender<Result<bool>>,
  },
}

impl<C, N> CacheManager<C, N>
where
  C: CacheStorage + 'static,
  N: Network + 'static,
{
  /// Route one event to its handler.
  ///
  /// Install and activate are awaited in place so lifecycle events stay in
  /// order. Fetch, message and sync events run in their own tasks and may
  /// interleave freely.
  pub async fn dispatch(self: &Arc<Self>, event: WorkerEvent) {
    match event {
      WorkerEvent::Install { done } => {
        let _ = done.send(self.on_install().await);
      }
      WorkerEvent::Activate { done } => {
        let _ = done.send(self.on_activate().await);
      }
      WorkerEvent::SkipWaiting => {
        if let Err(e) = self.skip_waiting() {
          debug!(error = %e, "skip_waiting failed");
        }
      }
      WorkerEvent::Fetch {
        request,
        respond_with,
      } => {
        let manager = Arc::clone(self);
        tokio::spawn(async move {
          let outcome = manager.on_fetch(&request).await;
          let _ = respond_with.send(outcome);
        });
      }
      WorkerEvent::Message { data, port } => {
        let manager = Arc::clone(self);
        tokio::spawn(async move {
          if let Some(reply) = manager.on_message(&data).await {
            if let Some(port) = port {
              port.post(reply.into_value());
            }
          }
        });
      }
      WorkerEvent::Sync { tag, done } => {
        let manager = Arc::clone(self);
        tokio::spawn(async move {
          let _ = done.send(manager.on_sync(&tag).await);
        });
      }
    }
  }
}

/// Start the worker task for `manager`.
pub fn spawn<C, N>(manager: Arc<CacheManager<C, N>>) -> WorkerHandle
where
  C: CacheStorage + 'static,
  N: Network + 'static,
{
  let (tx, mut rx) = mpsc::unbounded_channel();

  tokio::spawn(async move {
    while let Some(event) = rx.recv().await {
      manager.dispatch(event).await;
    }
    debug!("Cache worker stopped");
  });

  WorkerHandle { tx }
}

/// Cheap, cloneable sender side of a running worker.
#[derive(Debug, Clone)]
pub struct WorkerHandle {
  tx: mpsc::UnboundedSender<WorkerEvent>,
}

impl WorkerHandle {
  fn send(&self, event: WorkerEvent) -> Result<()> {
    self
      .tx
      .send(event)
      .map_err(|_| eyre!("Cache worker has stopped"))
  }

  async fn ask<T>(&self, make: impl FnOnce(oneshot::Sender<T>) -> WorkerEvent) -> Result<T> {
    let (tx, rx) = oneshot::channel();
    self.send(make(tx))?;
    rx.await.map_err(|_| eyre!("Cache worker dropped the request"))
  }

  pub async fn install(&self) -> Result<usize> {
    self.ask(|done| WorkerEvent::Install { done }).await?
  }

  pub async fn activate(&self) -> Result<ActivationReport> {
    self.ask(|done| WorkerEvent::Activate { done }).await?
  }

  pub fn skip_waiting(&self) -> Result<()> {
    self.send(WorkerEvent::SkipWaiting)
  }

  pub async fn fetch(&self, request: Request) -> Result<FetchOutcome> {
    self
      .ask(|respond_with| WorkerEvent::Fetch {
        request,
        respond_with,
      })
      .await?
  }

  /// Post a message without waiting for an answer.
  pub fn post_message(&self, data: Value) -> Result<()> {
    self.send(WorkerEvent::Message { data, port: None })
  }

  /// Post a message and wait for the reply posted to its port.
  pub async fn request(&self, data: Value) -> Result<Value> {
    let (port, reply) = ReplyPort::channel();
    self.send(WorkerEvent::Message {
      data,
      port: Some(port),
    })?;
    reply
      .await
      .map_err(|_| eyre!("Cache worker sent no reply"))
  }

  pub async fn sync(&self, tag: impl Into<String>) -> Result<bool> {
    let tag = tag.into();
    self.ask(|done| WorkerEvent::Sync { tag, done }).await?
  }
}

/// Application-context side of the offline data channel.
///
/// Both operations go through the worker's message protocol. A context that
/// is not controlled by the worker has no channel: saving is skipped and
/// reading yields nothing.
pub struct OfflineDataClient {
  id: ClientId,
  clients: Arc<ClientRegistry>,
  worker: WorkerHandle,
}

impl OfflineDataClient {
  pub fn new(id: ClientId, clients: Arc<ClientRegistry>, worker: WorkerHandle) -> Self {
    Self {
      id,
      clients,
      worker,
    }
  }

  pub fn id(&self) -> ClientId {
    self.id
  }

  pub fn is_controlled(&self) -> Result<bool> {
    Ok(self.clients.controller(self.id)?.is_some())
  }

  /// Save `data` under `key`. Returns whether the worker acknowledged it.
  pub async fn save_for_offline(&self, key: &str, data: Value) -> Result<bool> {
    if !self.is_controlled()? {
      debug!(key = %key, "No controlling worker, offline save skipped");
      return Ok(false);
    }

    let message = serde_json::to_value(WorkerMessage::SaveData {
      key: key.to_string(),
      data,
    })?;
    let ack = self.worker.request(message).await?;

    Ok(ack.get("success").and_then(Value::as_bool).unwrap_or(false))
  }

  /// Read the data saved under `key`, if any.
  pub async fn get_offline_data(&self, key: &str) -> Result<Option<Value>> {
    if !self.is_controlled()? {
      return Ok(None);
    }

    let message = serde_json::to_value(WorkerMessage::GetData {
      key: key.to_string(),
    })?;
    let reply = self.worker.request(message).await?;

    Ok(match reply {
      Value::Null => None,
      value => Some(value),
    })
  }
}

impl Drop for OfflineDataClient {
  fn drop(&mut self) {
    let _ = self.clients.unregister(self.id);
  }
}
