//! Channel-backed generation streams
//!
//! A [`GenerationStream`] is fed by one spawned producer task. Dropping the
//! stream aborts the producer, which drops the upstream token stream and any
//! limiter permit it holds.

use crate::error::Result;
use futures::Stream;
use genforge_types::StreamItem;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

const CHANNEL_CAPACITY: usize = 64;

/// Producer side handed to the task feeding a [`GenerationStream`]
#[derive(Debug, Clone)]
pub struct Emitter {
    tx: mpsc::Sender<StreamItem>,
}

impl Emitter {
    /// Send an item; `false` once the consumer is gone
    pub async fn send(&self, item: impl Into<StreamItem>) -> bool {
        self.tx.send(item.into()).await.is_ok()
    }

    pub async fn content(&self, chunk: impl Into<String>) -> bool {
        self.send(StreamItem::Content(chunk.into())).await
    }
}

/// Lazy, finite, non-restartable sequence of stream items
#[derive(Debug)]
pub struct GenerationStream {
    rx: mpsc::Receiver<StreamItem>,
    task: JoinHandle<()>,
}

impl GenerationStream {
    /// Run `producer` on the runtime; an `Err` becomes the terminal error item
    pub fn spawn<F, Fut>(producer: F) -> Self
    where
        F: FnOnce(Emitter) -> Fut,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        let emitter = Emitter { tx };
        let fut = producer(emitter.clone());

        let task = tokio::spawn(async move {
            if let Err(e) = fut.await {
                warn!("Generation failed: {}", e);
                if !emitter.send(e.to_event()).await {
                    debug!("Consumer gone before error delivery");
                }
            }
        });

        Self { rx, task }
    }

    /// Stream that yields exactly the given items
    pub fn from_items(items: Vec<StreamItem>) -> Self {
        Self::spawn(move |emitter| async move {
            for item in items {
                if !emitter.send(item).await {
                    break;
                }
            }
            Ok(())
        })
    }

    /// Drain the stream
    pub async fn collect_items(mut self) -> Vec<StreamItem> {
        let mut items = Vec::new();
        while let Some(item) = self.rx.recv().await {
            items.push(item);
        }
        items
    }
}

impl Stream for GenerationStream {
    type Item = StreamItem;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

impl Drop for GenerationStream {
    fn drop(&mut self) {
        self.task.abort();
    }
}
