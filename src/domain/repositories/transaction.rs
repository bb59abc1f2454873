use crate::domain::repositories::{Document, DocumentStore, RepositoryError, TxWrite};

/// Attempts before a contended transaction gives up
pub const MAX_TRANSACTION_ATTEMPTS: usize = 5;

/// Atomic read-modify-write on a single document.
///
/// `decide` receives the current document (if any) and the store time, and
/// returns the write to apply plus the value to hand back. The write is
/// committed only if the document did not change since it was read; on a
/// conflicting commit the whole body runs again against fresh state. An
/// error from `decide` aborts without writing.
pub async fn run_transaction<S, T, E, F>(
    store: &S,
    collection: &str,
    id: &str,
    mut decide: F,
) -> Result<T, E>
where
    S: DocumentStore + ?Sized,
    E: From<RepositoryError>,
    F: FnMut(Option<&Document>, i64) -> Result<(TxWrite, T), E>,
{
    for attempt in 1..=MAX_TRANSACTION_ATTEMPTS {
        let current = store.get_versioned(collection, id).await?;
        let now = store.now();
        let (write, value) = decide(current.as_ref().map(|v| &v.document), now)?;

        if write == TxWrite::None {
            return Ok(value);
        }

        let Some(current) = current else {
            return Err(RepositoryError::NotFound(format!("{}/{}", collection, id)).into());
        };

        match store
            .commit_if_unchanged(collection, id, current.version, write)
            .await
        {
            Ok(()) => return Ok(value),
            Err(RepositoryError::Conflict(reason)) => {
                tracing::debug!(
                    "Transaction on {}/{} conflicted (attempt {}/{}): {}",
                    collection,
                    id,
                    attempt,
                    MAX_TRANSACTION_ATTEMPTS,
                    reason
                );
            }
            Err(e) => return Err(e.into()),
        }
    }

    tracing::warn!(
        "Transaction on {}/{} gave up after {} attempts",
        collection,
        id,
        MAX_TRANSACTION_ATTEMPTS
    );
    Err(RepositoryError::Conflict(format!(
        "{}/{} kept changing during {} attempts",
        collection, id, MAX_TRANSACTION_ATTEMPTS
    ))
    .into())
}
