//! Latest-value worker: one task consumes values in submission order, but a
//! value still queued when a newer one arrives is replaced, never sent.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::watch;

type Slot<T> = Option<(u64, Arc<T>)>;

pub(crate) struct Latest<T> {
    tx: watch::Sender<Slot<T>>,
    done: watch::Receiver<u64>,
}

impl<T: Send + Sync + 'static> Latest<T> {
    /// Spawn the consuming task. It stops once the `Latest` is dropped.
    pub(crate) fn spawn<F, Fut>(mut run: F) -> Self
    where
        F: FnMut(Arc<T>) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let (tx, mut rx) = watch::channel::<Slot<T>>(None);
        let (done_tx, done) = watch::channel(0u64);
        tokio::spawn(async move {
            while rx.changed().await.is_ok() {
                let latest = rx.borrow_and_update().clone();
                let Some((seq, value)) = latest else {
                    continue;
                };
                run(value).await;
                done_tx.send_replace(seq);
            }
        });
        Self { tx, done }
    }

    pub(crate) fn submit(&self, value: T) {
        let value = Arc::new(value);
        self.tx.send_modify(|slot| {
            let seq = slot.as_ref().map_or(1, |(s, _)| s + 1);
            *slot = Some((seq, value));
        });
    }

    /// Resolves once everything submitted so far has been consumed, or the
    /// task is gone.
    pub(crate) async fn settled(&self) {
        let target = self.tx.borrow().as_ref().map_or(0, |(s, _)| *s);
        let mut done = self.done.clone();
        let _ = done.wait_for(|d| *d >= target).await;
    }
}
