//! The running session, as seen from a callback.
//!
//! Filter callbacks receive no context argument. While a run is in
//! progress its session sits in a thread-local slot; every trampoline goes
//! through [`with_session`] to reach it.

use std::cell::RefCell;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::rc::Rc;

use super::{OsErr, SpErr};
use crate::engine::session::HostSession;
use crate::suites::{SuiteResult, SuiteStatus};

/// Session shared between the engine and the trampolines.
pub(crate) type SharedSession = Rc<RefCell<HostSession>>;

thread_local! {
    static ACTIVE: RefCell<Option<SharedSession>> = const { RefCell::new(None) };
}

/// Keeps a session installed; the previous one comes back on drop.
#[must_use = "the session is uninstalled when the guard is dropped"]
pub(crate) struct ActiveSession {
    previous: Option<SharedSession>,
}

/// Make `session` the target of callbacks on this thread.
pub(crate) fn install(session: SharedSession) -> ActiveSession {
    let previous = ACTIVE.with(|slot| slot.replace(Some(session)));
    ActiveSession { previous }
}

impl Drop for ActiveSession {
    fn drop(&mut self) {
        let previous = self.previous.take();
        ACTIVE.with(|slot| {
            slot.replace(previous);
        });
    }
}

/// Run `f` against the installed session.
///
/// Returns `None` when no session is installed, when the session is
/// already borrowed (a callback re-entered the host), or when `f` panicked.
pub(crate) fn with_session<R>(f: impl FnOnce(&mut HostSession) -> R) -> Option<R> {
    let Some(session) = ACTIVE.with(|slot| slot.borrow().clone()) else {
        tracing::warn!("callback invoked outside a filter run");
        return None;
    };
    let Ok(mut guard) = session.try_borrow_mut() else {
        tracing::warn!("re-entrant callback rejected");
        return None;
    };
    match catch_unwind(AssertUnwindSafe(|| f(&mut guard))) {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::error!("callback panicked; reporting a logic error to the filter");
            None
        }
    }
}

/// Run a suite operation and collapse it to a 16-bit status.
pub(crate) fn os_err(f: impl FnOnce(&mut HostSession) -> SuiteResult<()>) -> OsErr {
    match with_session(f) {
        Some(result) => SuiteStatus::of(&result),
        None => SuiteStatus::LogicError.os_err(),
    }
}

/// Run a suite operation and collapse it to a 32-bit status.
pub(crate) fn sp_err(f: impl FnOnce(&mut HostSession) -> SuiteResult<()>) -> SpErr {
    match with_session(f) {
        Some(Ok(())) => 0,
        Some(Err(status)) => status.code(),
        None => SuiteStatus::LogicError.code(),
    }
}

/// Whether a session is installed on this thread.
#[cfg(test)]
pub(crate) fn is_installed() -> bool {
    ACTIVE.with(|slot| slot.borrow().is_some())
}
