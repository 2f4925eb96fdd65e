//! Ownership of a unit of work.
//!
//! Every public ledger operation either runs inside a transaction the caller
//! already opened, or opens one of its own. `Transaction` makes that choice a
//! type-level property: an owned transaction is always committed or aborted by
//! `close`, a borrowed one is never touched.

use crate::error::LedgerError;
use database::LedgerStore;

pub enum Transaction<'a, T> {
    /// Opened by the operation itself; finished by `close`.
    Owned(T),
    /// Opened by the caller, who remains responsible for commit or abort.
    Borrowed(&'a mut T),
}

impl<'a, T: Send> Transaction<'a, T> {
    /// Borrows `existing` when given, otherwise begins a transaction named `name`.
    pub async fn open<S>(
        store: &S,
        existing: Option<&'a mut T>,
        name: &'static str,
    ) -> Result<Self, LedgerError>
    where
        S: LedgerStore<Txn = T>,
    {
        match existing {
            Some(txn) => Ok(Transaction::Borrowed(txn)),
            None => Ok(Transaction::Owned(store.begin(name).await?)),
        }
    }

    pub fn handle(&mut self) -> &mut T {
        match self {
            Transaction::Owned(txn) => txn,
            Transaction::Borrowed(txn) => &mut **txn,
        }
    }

    pub fn is_owned(&self) -> bool {
        matches!(self, Transaction::Owned(_))
    }

    /// Finishes the unit of work with the outcome of the operation.
    ///
    /// An owned transaction is committed on `Ok` and aborted on `Err`; the
    /// original error is returned even if the abort itself fails. A borrowed
    /// transaction passes `result` through unchanged.
    pub async fn close<S, R>(
        self,
        store: &S,
        result: Result<R, LedgerError>,
    ) -> Result<R, LedgerError>
    where
        S: LedgerStore<Txn = T>,
    {
        let txn = match self {
            Transaction::Borrowed(_) => return result,
            Transaction::Owned(txn) => txn,
        };

        match result {
            Ok(value) => {
                store.commit(txn).await?;
                Ok(value)
            }
            Err(error) => {
                tracing::warn!(%error, "aborting transaction");
                if let Err(abort_error) = store.abort(txn).await {
                    tracing::error!(%abort_error, "transaction abort failed");
                }
                Err(error)
            }
        }
    }
}
