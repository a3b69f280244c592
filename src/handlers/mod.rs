//! STOMP frame handlers.
//!
//! This module contains the Handler trait and the command registry that
//! dispatches inbound client frames to the appropriate handler. Handlers
//! mutate the broker and push replies onto the context; the connection
//! writes those replies once the handler returns.

mod connect;
mod core;
mod disconnect;
mod send;
mod subscription;

pub use self::core::{Context, Handler, Registry};
pub use connect::ConnectHandler;
pub use disconnect::DisconnectHandler;
pub use send::SendHandler;
pub use subscription::{SubscribeHandler, UnsubscribeHandler};

use crate::error::HandlerError;
use stomp_proto::Frame;

/// Value of a header the command cannot do without.
pub(crate) fn required_header<'f>(
    frame: &'f Frame,
    name: &'static str,
) -> Result<&'f str, HandlerError> {
    frame.header(name).ok_or(HandlerError::MissingHeader(name))
}
