//! CONNECT handler: the STOMP handshake.

use super::{Context, Handler, required_header};
use crate::error::{HandlerError, HandlerResult};
use crate::state::Phase;
use async_trait::async_trait;
use stomp_proto::{Command, Frame, STOMP_VERSION, header};
use tracing::info;

/// Handler for CONNECT.
///
/// Accepts the session when the client offers version 1.2 and names a host,
/// plus login and passcode when credentials are required. Credential values
/// are recorded but not verified.
pub struct ConnectHandler;

#[async_trait]
impl Handler for ConnectHandler {
    async fn handle(&self, ctx: &mut Context<'_>, frame: &Frame) -> HandlerResult {
        // A CONNECT without accept-version is a STOMP 1.0 client.
        let offered = frame.header(header::ACCEPT_VERSION).unwrap_or("1.0");
        if !offered.split(',').any(|v| v.trim() == STOMP_VERSION) {
            return Err(HandlerError::UnsupportedVersion {
                supported: STOMP_VERSION,
                offered: offered.to_string(),
            });
        }

        required_header(frame, header::HOST)?;

        let login = frame.header(header::LOGIN);
        if ctx.broker.settings.require_credentials {
            required_header(frame, header::LOGIN)?;
            required_header(frame, header::PASSCODE)?;
        }

        ctx.state.phase = Phase::Connected;
        ctx.state.login = login.map(str::to_string);

        let connected = Frame::new(Command::Connected)
            .with_header(header::VERSION, STOMP_VERSION)
            .with_header(header::SERVER, ctx.broker.server_info.banner())
            .with_header(header::SESSION, ctx.session_id())
            .with_header(header::HEART_BEAT, "0,0");
        ctx.reply(connected);

        info!(
            session = %ctx.session_id(),
            addr = %ctx.remote_addr,
            login = login.unwrap_or("-"),
            "Session connected"
        );
        Ok(())
    }
}
