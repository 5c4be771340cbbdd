use std::future::Future;
use tokio_util::sync::CancellationToken;

/// Cooperative stop signal shared between the session tasks.
///
/// Clones observe the same underlying token, so cancelling any handle
/// cancels them all.
#[derive(Debug, Clone, Default)]
pub struct SignalOfStop {
    token: CancellationToken,
}

impl SignalOfStop {
    pub fn new() -> SignalOfStop {
        SignalOfStop {
            token: CancellationToken::new(),
        }
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Wait until the signal is cancelled.
    pub async fn wait(&self) {
        self.token.cancelled().await;
    }

    /// Run `fut` to completion unless the signal fires first.
    ///
    /// Returns `None` when cancelled before the future resolves.
    pub async fn select<F, T>(&self, fut: F) -> Option<T>
    where
        F: Future<Output = T>,
    {
        tokio::select! {
            _ = self.token.cancelled() => None,
            out = fut => Some(out),
        }
    }

    /// Spawn a task that is dropped as soon as the signal fires.
    pub fn spawn<F>(&self, fut: F) -> tokio::task::JoinHandle<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let token = self.token.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {}
                _ = fut => {}
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_cancel_is_shared_between_clones() {
        let sos = SignalOfStop::new();
        let clone = sos.clone();

        assert!(!clone.cancelled());
        sos.cancel();
        assert!(clone.cancelled());
    }

    #[tokio::test]
    async fn test_select_returns_none_when_cancelled() {
        let sos = SignalOfStop::new();
        sos.cancel();

        let out = sos
            .select(async { tokio::time::sleep(std::time::Duration::from_secs(5)).await })
            .await;
        assert!(out.is_none());
    }

    #[tokio::test]
    async fn test_select_passes_value_through() {
        let sos = SignalOfStop::new();
        assert_eq!(sos.select(async { 7u32 }).await, Some(7));
    }
}
