//! Transaction scoping
//!
//! A store has at most one open transaction. [`Store::transaction`] begins one
//! when none is open and otherwise hands out a nested guard that reuses it;
//! only the outermost guard commits. A guard dropped without being finished
//! rolls back, so every exit path releases the transaction.

use anyhow::{anyhow, Result};
use tracing::{debug, warn};

use super::store::Store;

/// Guard over the store's open transaction
#[must_use = "a transaction guard rolls back when dropped without commit"]
pub struct Transaction<'a> {
    store: &'a Store,
    outermost: bool,
    finished: bool,
}

impl Transaction<'_> {
    /// Whether this guard began the transaction and will finalize it
    pub fn is_outermost(&self) -> bool {
        self.outermost
    }

    /// Commit the transaction if this guard is the outermost one
    ///
    /// Fails when an inner failure already rolled the transaction back.
    pub fn commit(mut self) -> Result<()> {
        self.finished = true;
        if !self.outermost {
            return Ok(());
        }
        let db = self.store.db()?;
        if !db.in_transaction() {
            return Err(anyhow!(
                "Cannot commit: the transaction was already rolled back"
            ));
        }
        debug!("COMMIT");
        if let Err(e) = db.conn.execute_batch("COMMIT") {
            // a failed COMMIT (e.g. SQLITE_BUSY) leaves the transaction open
            if let Err(rollback_err) = self.store.rollback() {
                warn!("Failed to roll back after failed commit: {}", rollback_err);
            }
            return Err(e.into());
        }
        Ok(())
    }

    /// Roll back the whole transaction, whichever guard asks
    pub fn rollback(mut self) -> Result<()> {
        self.finished = true;
        self.store.rollback()
    }
}

impl Drop for Transaction<'_> {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        if let Err(e) = self.store.rollback() {
            warn!("Failed to roll back transaction: {}", e);
        }
    }
}

impl Store {
    /// Begin a transaction, or join the one already open
    pub fn transaction(&self) -> Result<Transaction<'_>> {
        let db = self.db()?;
        let outermost = !db.in_transaction();
        if outermost {
            debug!("BEGIN");
            db.conn.execute_batch("BEGIN")?;
        }
        Ok(Transaction {
            store: self,
            outermost,
            finished: false,
        })
    }

    /// Run `f` inside a transaction
    ///
    /// Commits when `f` succeeds; rolls back and returns `f`'s error otherwise.
    pub fn with_transaction<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Store) -> Result<T>,
    {
        let tx = self.transaction()?;
        match f(self) {
            Ok(value) => {
                tx.commit()?;
                Ok(value)
            }
            Err(e) => {
                if let Err(rollback_err) = tx.rollback() {
                    warn!("Failed to roll back transaction: {}", rollback_err);
                }
                Err(e)
            }
        }
    }

    /// Whether a transaction is currently open on this store
    pub fn in_transaction(&self) -> bool {
        self.open_db().is_some_and(|db| db.in_transaction())
    }

    /// Roll back the open transaction; a no-op when none is open
    ///
    /// Indexes created inside the transaction are undone with it, so the
    /// remembered index set is dropped as well.
    pub fn rollback(&self) -> Result<()> {
        self.forget_all_indexes();
        if !self.in_transaction() {
            return Ok(());
        }
        debug!("ROLLBACK");
        self.db()?.conn.execute_batch("ROLLBACK")?;
        Ok(())
    }

    /// Retained for compatibility; saves commit on their own
    #[deprecated(note = "saves commit on their own; use `Store::transaction` for explicit scopes")]
    pub fn commit(&self) {
        warn!("commit() is a no-op: saves are committed automatically, use transaction() to group writes");
    }
}
