//! Isolation boundaries
//!
//! Items cross between isolation contexts by value only. The near side sends a
//! [`HostRequest`] and receives a [`HostResponse`] holding
//! [`ItemSnapshot`]s; nothing else is shared.
//!
//! Two contexts are provided:
//!
//! - [`ThreadBoundary`]: a worker thread that sees only encoded bytes
//! - [`ProcessBoundary`]: a child `taskitem host` process speaking JSON lines
//!
//! Both are torn down deterministically: [`with_boundary`] scopes a context to
//! a closure, and [`BoundaryGuard`] releases it on every exit path.

mod process;
mod protocol;
mod thread;

use tracing::{debug, warn};

pub use self::{
    process::ProcessBoundary,
    protocol::{read_message, serve, serve_request, write_message, HostRequest, HostResponse},
    thread::ThreadBoundary,
};
use crate::{
    codec::{self, ItemSnapshot},
    item::BuildItem,
    metadata::MetadataValue,
    Error, Result,
};

/// An isolation context items can be requested from.
pub trait IsolationBoundary {
    /// Send one request and wait for its answer.
    ///
    /// # Errors
    ///
    /// Returns a boundary error if the far side is gone or does not answer in
    /// time, and a codec error for an unreadable answer.
    fn exchange(&mut self, request: &HostRequest) -> Result<HostResponse>;

    /// Release the context. Calling this more than once is harmless.
    ///
    /// # Errors
    ///
    /// Returns a boundary error if the far side could not be shut down cleanly.
    fn teardown(&mut self) -> Result<()>;
}

/// Owns a boundary and tears it down when dropped.
pub struct BoundaryGuard<B: IsolationBoundary> {
    boundary: Option<B>,
}

impl<B: IsolationBoundary> BoundaryGuard<B> {
    pub const fn new(boundary: B) -> Self {
        Self {
            boundary: Some(boundary),
        }
    }

    /// The guarded boundary.
    ///
    /// # Errors
    ///
    /// Returns a boundary error after [`BoundaryGuard::close`].
    pub fn get_mut(&mut self) -> Result<&mut B> {
        self.boundary
            .as_mut()
            .ok_or_else(|| Error::boundary("isolation context already torn down"))
    }

    /// Tear down now and report the outcome instead of logging it.
    ///
    /// # Errors
    ///
    /// Propagates the boundary's teardown failure.
    pub fn close(&mut self) -> Result<()> {
        match self.boundary.take() {
            Some(mut boundary) => boundary.teardown(),
            None => Ok(()),
        }
    }
}

impl<B: IsolationBoundary> Drop for BoundaryGuard<B> {
    fn drop(&mut self) {
        if let Some(mut boundary) = self.boundary.take() {
            match boundary.teardown() {
                Ok(()) => debug!("isolation context released on drop"),
                Err(e) => warn!("Failed to tear down isolation context: {e}"),
            }
        }
    }
}

/// Open a boundary, run `f` against it, and tear it down afterwards.
///
/// Teardown happens whether `f` succeeds, fails, or panics. When `f` fails
/// its error wins over a teardown failure.
///
/// # Errors
///
/// Returns a boundary error if the context cannot be started, otherwise the
/// first error from `f` or teardown.
pub fn with_boundary<B, O, F, T>(open: O, f: F) -> Result<T>
where
    B: IsolationBoundary,
    O: FnOnce() -> Result<B>,
    F: FnOnce(&mut B) -> Result<T>,
{
    let boundary = open().map_err(|e| match e {
        Error::Boundary(_) => e,
        other => Error::boundary(format!("failed to start isolation context: {other}")),
    })?;

    let mut guard = BoundaryGuard::new(boundary);
    let result = guard.get_mut().and_then(f);
    let closed = guard.close();

    match (result, closed) {
        (Ok(value), Ok(())) => Ok(value),
        (Ok(_), Err(e)) => Err(e),
        (Err(e), Ok(())) => Err(e),
        (Err(e), Err(teardown)) => {
            warn!("Teardown also failed after an isolation error: {teardown}");
            Err(e)
        }
    }
}

/// Builds items on the far side of a boundary and hands back snapshots.
pub struct RemoteItemFactory<'a, B: IsolationBoundary + ?Sized> {
    boundary: &'a mut B,
}

impl<'a, B: IsolationBoundary + ?Sized> RemoteItemFactory<'a, B> {
    pub fn new(boundary: &'a mut B) -> Self {
        Self { boundary }
    }

    /// One remote item per include, each seeded with `metadata`.
    ///
    /// # Errors
    ///
    /// Returns a boundary error if the far side refuses or fails the request.
    pub fn create_items<I, K, V>(&mut self, includes: &[String], metadata: I) -> Result<Vec<ItemSnapshot>>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<MetadataValue>,
    {
        let request = HostRequest::CreateItems {
            includes: includes.to_vec(),
            metadata: metadata
                .into_iter()
                .map(|(name, value)| (name.into(), value.into()))
                .collect(),
        };

        match self.boundary.exchange(&request)? {
            HostResponse::Items { items } => {
                debug!(count = items.len(), "received remote items");
                Ok(items)
            }
            HostResponse::Failed { message } => Err(Error::boundary(message)),
            HostResponse::Closed => Err(Error::boundary("item host closed the session")),
        }
    }

    /// [`RemoteItemFactory::create_items`] followed by a local import of each.
    ///
    /// # Errors
    ///
    /// Same as [`RemoteItemFactory::create_items`], plus import failures.
    pub fn import_items<I, K, V>(&mut self, includes: &[String], metadata: I) -> Result<Vec<BuildItem>>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<MetadataValue>,
    {
        self.create_items(includes, metadata)?
            .into_iter()
            .map(codec::import)
            .collect()
    }
}
