use crate::error::{Error, Result};
use std::future::Future;
use std::sync::LazyLock;
use tokio::runtime::{Builder, Handle, Runtime, RuntimeFlavor};
use tokio::task;

static RUNTIME: LazyLock<std::io::Result<Runtime>> = LazyLock::new(|| {
    Builder::new_multi_thread()
        .worker_threads(2)
        .thread_name("token-resolver-blocking")
        .enable_all()
        .build()
});

/// Drive an accessor future to completion from synchronous code.
///
/// All blocking accessors share one background runtime, so connections and
/// in-flight resolutions started here outlive the call.
///
/// Inside a multi-thread tokio runtime the calling worker hands its core off
/// with `block_in_place` for the duration, and `spawn_blocking` threads run
/// the future directly. A current-thread runtime cannot do either without
/// stalling its only worker, so any call made while one is current (its
/// `spawn_blocking` threads included) fails with `BlockingInAsyncContext`.
pub fn block_on<T, F>(future: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    let runtime = match &*RUNTIME {
        Ok(runtime) => runtime,
        Err(e) => return Err(Error::Runtime(e.to_string())),
    };
    match Handle::try_current() {
        Err(_) => runtime.block_on(future),
        Ok(handle) if handle.runtime_flavor() == RuntimeFlavor::MultiThread => {
            task::block_in_place(|| runtime.block_on(future))
        }
        Ok(_) => Err(Error::BlockingInAsyncContext),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_on_outside_runtime() {
        let value = block_on(async { Ok(42u8) }).unwrap();
        assert_eq!(value, 42);
    }

    #[tokio::test]
    async fn test_block_on_inside_current_thread_runtime_is_rejected() {
        let err = block_on(async { Ok(1u8) }).unwrap_err();
        assert!(matches!(err, Error::BlockingInAsyncContext));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_block_on_from_multi_thread_worker() {
        let value = block_on(async {
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
            Ok(7u8)
        })
        .unwrap();
        assert_eq!(value, 7);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_block_on_from_spawn_blocking_thread() {
        let value = tokio::task::spawn_blocking(|| block_on(async { Ok(9u8) }))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(value, 9);
    }
}
