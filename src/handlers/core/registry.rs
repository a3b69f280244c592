//! Command handler registry and dispatch.
//!
//! The `Registry` enforces the session phase rules, runs the handler for the
//! frame's command, and appends the RECEIPT when the client asked for one.

use super::context::{Context, Handler};
use crate::error::{HandlerError, HandlerResult};
use crate::handlers::{
    ConnectHandler, DisconnectHandler, SendHandler, SubscribeHandler, UnsubscribeHandler,
};
use crate::state::Phase;
use crate::telemetry::CommandTimer;
use std::collections::HashMap;
use stomp_proto::{Command, Frame, RejectedFrame};
use tracing::{Instrument, Level, debug, span};

/// Registry of command handlers.
pub struct Registry {
    handlers: HashMap<Command, Box<dyn Handler>>,
}

impl Registry {
    /// Create a new registry with all client command handlers registered.
    pub fn new() -> Self {
        let mut handlers: HashMap<Command, Box<dyn Handler>> = HashMap::new();

        handlers.insert(Command::Connect, Box::new(ConnectHandler));
        handlers.insert(Command::Subscribe, Box::new(SubscribeHandler));
        handlers.insert(Command::Unsubscribe, Box::new(UnsubscribeHandler));
        handlers.insert(Command::Send, Box::new(SendHandler));
        handlers.insert(Command::Disconnect, Box::new(DisconnectHandler));

        Self { handlers }
    }

    /// Dispatch one frame.
    ///
    /// On success, a RECEIPT for the frame's `receipt` header is appended to
    /// the context replies after the handler's own effect.
    pub async fn dispatch(&self, ctx: &mut Context<'_>, frame: &Frame) -> HandlerResult {
        let command = frame.command;
        let result = self.check_phase(ctx, command);
        let result = match result {
            Ok(handler) => {
                let frame_span = span!(
                    Level::DEBUG,
                    "stomp.frame",
                    command = %command,
                    session = %ctx.session_id(),
                    receipt = frame.receipt_request(),
                );
                let _timer = CommandTimer::new(command.as_str());
                handler.handle(ctx, frame).instrument(frame_span).await
            }
            Err(e) => Err(e),
        };

        match &result {
            Ok(()) => {
                if command != Command::Connect
                    && let Some(receipt) = frame.receipt_request()
                {
                    ctx.reply(Frame::receipt(receipt));
                }
            }
            Err(e) => {
                crate::metrics::record_command_error(command.as_str(), e.error_code());
                debug!(%command, error = %e, "Frame error");
            }
        }
        result
    }

    /// Handle a frame whose command is not modelled.
    ///
    /// Before CONNECT this is a handshake failure; afterwards it is reported
    /// and the session continues.
    pub fn reject(&self, ctx: &Context<'_>, rejected: &RejectedFrame) -> HandlerError {
        let err = if ctx.state.phase == Phase::Unconnected {
            HandlerError::NotConnected
        } else {
            HandlerError::UnknownCommand(rejected.command.clone())
        };
        crate::metrics::record_command_error("UNKNOWN", err.error_code());
        debug!(command = %rejected.command, error = %err, "Unknown command");
        err
    }

    fn check_phase(
        &self,
        ctx: &Context<'_>,
        command: Command,
    ) -> Result<&dyn Handler, HandlerError> {
        match (ctx.state.phase, command) {
            (Phase::Unconnected, Command::Connect) => {}
            (Phase::Unconnected, _) => return Err(HandlerError::NotConnected),
            (_, Command::Connect) => return Err(HandlerError::AlreadyConnected),
            (_, cmd) if cmd.is_server_command() => {
                return Err(HandlerError::UnexpectedCommand(cmd));
            }
            _ => {}
        }
        self.handlers
            .get(&command)
            .map(|h| h.as_ref())
            .ok_or(HandlerError::UnexpectedCommand(command))
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}
