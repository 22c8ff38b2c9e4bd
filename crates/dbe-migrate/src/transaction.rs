//! Per-script transaction scope.

use dbe_db::{DbResult, Session};

/// Transaction around one script.
///
/// Rolls back on drop unless [`commit`](Self::commit) succeeded, so every
/// early return out of the apply path releases the transaction. A scope
/// opened for a no-transaction script is inert.
pub(crate) struct ScriptTransaction<'a> {
    session: &'a dyn Session,
    active: bool,
}

impl<'a> ScriptTransaction<'a> {
    /// Open the scope; `BEGIN` is only issued when `transactional`.
    pub(crate) fn begin(session: &'a dyn Session, transactional: bool) -> DbResult<Self> {
        if transactional {
            session.begin()?;
        }
        Ok(Self {
            session,
            active: transactional,
        })
    }

    /// Commit the transaction, if one is open.
    ///
    /// A failed `COMMIT` leaves the scope active, so dropping it rolls back.
    pub(crate) fn commit(mut self) -> DbResult<()> {
        if self.active {
            self.session.commit()?;
            self.active = false;
        }
        Ok(())
    }
}

impl Drop for ScriptTransaction<'_> {
    fn drop(&mut self) {
        if self.active {
            if let Err(e) = self.session.rollback() {
                log::warn!("Rollback failed: {e}");
            }
        }
    }
}
