//! Collaborator seams: the remote invoker and the deadline provider.

use crate::error::InvokeError;
use crate::strategy::BoxFuture;
use crate::types::{InvokeRequest, InvokeResponse};

/// A pending invocation result, resolved by the result collector.
pub type InvocationHandle = BoxFuture<'static, Result<InvokeResponse, InvokeError>>;

/// Transport client that performs remote function invocations.
pub trait Invoker: Send + Sync {
    /// Issue an invocation without waiting for it to complete.
    ///
    /// An `Err` means the invocation was never issued; the returned handle
    /// resolves to the invocation's response.
    fn invoke_async(&self, request: InvokeRequest) -> Result<InvocationHandle, InvokeError>;

    /// Issue an invocation and wait for its response.
    fn invoke(&self, request: InvokeRequest) -> BoxFuture<'_, Result<InvokeResponse, InvokeError>> {
        match self.invoke_async(request) {
            Ok(handle) => handle,
            Err(e) => Box::pin(std::future::ready(Err(e))),
        }
    }
}

/// Reports how much wall-clock time the current run has left.
pub trait DeadlineProvider: Send + Sync {
    fn remaining_time_millis(&self) -> u64;
}
