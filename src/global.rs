//! Process-wide dispatcher.
//!
//! Nothing is created implicitly. The application builds a dispatcher and
//! installs it once with [`init`], normally during startup before any
//! component registers handlers. Later calls to [`init`] fail; lookups
//! before installation return `None` or [`Error::GlobalNotInitialized`].

use crate::{Error, EventDispatcher, Result};
use once_cell::sync::OnceCell;
use tracing::info;

static GLOBAL: OnceCell<EventDispatcher> = OnceCell::new();

/// Install `dispatcher` as the process-wide instance
pub fn init(dispatcher: EventDispatcher) -> Result<&'static EventDispatcher> {
    let installed = GLOBAL
        .try_insert(dispatcher)
        .map_err(|_| Error::GlobalAlreadyInitialized)?;

    info!("Global event dispatcher installed");
    Ok(installed)
}

/// The process-wide instance, if installed
pub fn get() -> Option<&'static EventDispatcher> {
    GLOBAL.get()
}

/// The process-wide instance, or an error if [`init`] has not run
pub fn dispatcher() -> Result<&'static EventDispatcher> {
    get().ok_or(Error::GlobalNotInitialized)
}
