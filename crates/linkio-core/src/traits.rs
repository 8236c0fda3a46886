//! Link endpoint traits
//!
//! These traits define the seams between a link endpoint, the stack that
//! consumes its packets, and whoever owns the endpoint's lifetime.

use std::sync::Arc;

use crate::error::{LinkError, LinkResult};
use crate::id::LinkEndpointId;
use crate::protocol::{LinkAddress, NetworkProtocol};
use crate::view::VectorisedView;

/// Upward delivery of inbound packets
///
/// **Contract:**
/// - Called synchronously from the endpoint's dispatch thread.
/// - `vv` is borrowed for the duration of the call only. The endpoint
///   reclaims the backing buffers as soon as the call returns, so a
///   dispatcher that keeps packet data must copy it (`to_vec`, `clone`).
/// - Infallible from the endpoint's point of view.
pub trait NetworkDispatcher: Send + Sync {
    fn deliver_network_packet(
        &self,
        endpoint: LinkEndpointId,
        remote: &LinkAddress,
        protocol: NetworkProtocol,
        vv: &VectorisedView,
    );
}

/// Notification that an endpoint's read loop has terminated
///
/// Invoked exactly once per attached endpoint. `None` means a clean stop
/// (peer closed, zero-byte read, descriptor closed locally).
pub trait CloseNotify: Send + Sync {
    fn closed(&self, err: Option<LinkError>);
}

/// Adapter turning a closure into a `CloseNotify`
pub struct FnClose<F>(pub F);

impl<F> CloseNotify for FnClose<F>
where
    F: Fn(Option<LinkError>) + Send + Sync,
{
    fn closed(&self, err: Option<LinkError>) {
        (self.0)(err)
    }
}

/// A data-link endpoint as seen by the stack
pub trait LinkEndpoint: Send + Sync {
    /// Maximum transmission unit
    fn mtu(&self) -> u32;

    /// Bytes of link header this endpoint prepends on write
    fn max_header_length(&self) -> u16;

    /// This endpoint's own link address
    fn link_address(&self) -> LinkAddress;

    /// Hand the endpoint its dispatcher. May start background reading.
    fn attach(&self, dispatcher: Arc<dyn NetworkDispatcher>) -> LinkResult<()>;

    fn is_attached(&self) -> bool;

    /// Write one outbound frame made of `hdr` followed by `payload`
    ///
    /// Best-effort: a frame that cannot be written right now is dropped
    /// and `Ok(())` is returned.
    fn write_packet(
        &self,
        hdr: &[u8],
        payload: Option<&[u8]>,
        protocol: NetworkProtocol,
    ) -> LinkResult<()>;
}
