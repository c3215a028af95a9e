//! Fan-out/barrier helper shared by the pipeline stages.

use crate::error::PipelineError;
use std::future::Future;
use tokio::task::JoinSet;

/// Run one task per item concurrently and wait for all of them.
///
/// The first task that fails wins: the remaining tasks are aborted and the
/// error is returned. Results come back in completion order.
pub async fn fan_out<I, F, Fut, T>(items: I, mut task: F) -> Result<Vec<T>, PipelineError>
where
    I: IntoIterator,
    F: FnMut(I::Item) -> Fut,
    Fut: Future<Output = Result<T, PipelineError>> + Send + 'static,
    T: Send + 'static,
{
    let mut set = JoinSet::new();
    for item in items {
        set.spawn(task(item));
    }

    let mut results = Vec::with_capacity(set.len());
    while let Some(joined) = set.join_next().await {
        match joined {
            Ok(Ok(value)) => results.push(value),
            Ok(Err(err)) => {
                set.abort_all();
                return Err(err);
            }
            Err(join_err) if join_err.is_panic() => {
                std::panic::resume_unwind(join_err.into_panic())
            }
            Err(join_err) => {
                set.abort_all();
                return Err(PipelineError::Task(join_err));
            }
        }
    }
    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn collects_every_result() {
        let mut got = fan_out(0..5, |i| async move { Ok(i * 2) }).await.unwrap();
        got.sort();
        assert_eq!(got, vec![0, 2, 4, 6, 8]);
    }

    #[tokio::test]
    async fn empty_input_succeeds() {
        let got: Vec<()> = fan_out(Vec::<u8>::new(), |_| async { Ok(()) }).await.unwrap();
        assert!(got.is_empty());
    }

    #[tokio::test]
    async fn first_error_aborts_the_rest() {
        let finished = Arc::new(AtomicUsize::new(0));
        let result = fan_out(0..4, |i| {
            let finished = Arc::clone(&finished);
            async move {
                if i == 0 {
                    return Err(PipelineError::Compile {
                        file: PathBuf::from("example0.js"),
                        code: Some(1),
                    });
                }
                tokio::time::sleep(Duration::from_secs(30)).await;
                finished.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        })
        .await;

        match result {
            Err(PipelineError::Compile { file, code }) => {
                assert_eq!(file, PathBuf::from("example0.js"));
                assert_eq!(code, Some(1));
            }
            other => panic!("expected compile error, got {other:?}"),
        }
        assert_eq!(finished.load(Ordering::SeqCst), 0);
    }
}
