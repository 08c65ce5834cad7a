//! # Preview frame connections
//!
//! Each WebSocket connection is one preview frame (or editor) attached to the
//! session of a single bio.
use crate::channel::{Broadcast, InitReply, Request, RequestKind};
use crate::command::{Command, ParseCommandError};
use crate::lobby::{JoinError, LobbyClient, UserID};
use crate::render::{render_content, ContentInput};
use crate::routes::Route;
use crate::stream::ClientStream;
use color_eyre::eyre::WrapErr;
use color_eyre::Report;
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use log::*;
use std::net::SocketAddr;
use std::time::{Duration, Instant};
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio_tungstenite::accept_hdr_async;
use tokio_tungstenite::WebSocketStream;
use tungstenite::http::{
    header::SEC_WEBSOCKET_PROTOCOL, response::Response as HttpResponse, status::StatusCode,
    uri::Uri,
};
use tungstenite::{handshake::server, Message, Result as TResult};

/// The value of `Sec-WebSocket-Protocol` clients have to ask for
pub const PROTOCOL: &str = "storefront-preview";

type WsSender = SplitSink<WebSocketStream<ClientStream>, Message>;

fn reject(status: StatusCode, msg: String) -> server::ErrorResponse {
    error!("{}", msg);
    let mut rep = HttpResponse::new(Some(msg));
    *rep.status_mut() = status;
    rep
}

fn make_callback(tx: oneshot::Sender<Uri>) -> impl server::Callback {
    move |http_req: &server::Request, mut http_rep: server::Response| {
        let headers = http_req.headers();
        match headers.get(SEC_WEBSOCKET_PROTOCOL) {
            Some(value) if value == PROTOCOL => {
                http_rep
                    .headers_mut()
                    .append(SEC_WEBSOCKET_PROTOCOL, value.clone());
                match tx.send(http_req.uri().clone()) {
                    Ok(()) => Ok(http_rep),
                    Err(uri) => Err(reject(
                        StatusCode::INTERNAL_SERVER_ERROR,
                        format!("Connection to {} dropped during handshake", uri),
                    )),
                }
            }
            Some(value) => Err(reject(
                StatusCode::NOT_ACCEPTABLE,
                format!("Invalid protocol {:?}", value),
            )),
            None => Err(reject(
                StatusCode::NOT_ACCEPTABLE,
                String::from("Missing Sec-WebSocket-Protocol header"),
            )),
        }
    }
}

/// The bio a connection wants to preview
pub fn bio_username(path: &str) -> Result<String, String> {
    match Route::parse(path) {
        Ok(Route::Bio { username }) => Ok(username),
        Ok(other) => Err(format!("{} is not a bio", other)),
        Err(err) => Err(err.to_string()),
    }
}

/// Reply to a `render` command
pub fn render_reply(content: &str) -> String {
    format!("html|{}", render_content(ContentInput::Encoded(content)))
}

pub fn broadcast_message(msg: &Broadcast) -> String {
    match msg {
        Broadcast::Joined(id) => format!("joined|{}", id.int_val()),
        Broadcast::Left(id) => format!("left|{}", id.int_val()),
        Broadcast::Preview(address) => format!("preview|{}", address),
    }
}

enum CommandRes {
    Break,
    Continue,
}

async fn send_request(
    msg_tx: &mut mpsc::Sender<Request>,
    source: UserID,
    kind: RequestKind,
) -> CommandRes {
    match msg_tx.send(Request { source, kind }).await {
        Ok(()) => CommandRes::Continue,
        Err(e) => {
            error!("Session of {} is gone: {:?}", source, e.0.kind);
            CommandRes::Break
        }
    }
}

async fn handle_command(
    id: UserID,
    msg_tx: &mut mpsc::Sender<Request>,
    ws_sender: &mut WsSender,
    cmd_res: Result<Command, ParseCommandError>,
) -> TResult<CommandRes> {
    match cmd_res {
        Ok(Command::Init) => {
            let (tx, rx) = oneshot::channel::<InitReply>();
            if let CommandRes::Break =
                send_request(msg_tx, id, RequestKind::Init { response: tx }).await
            {
                return Ok(CommandRes::Break);
            }
            match rx.await {
                Ok(state) => {
                    let address = state.address.unwrap_or_default();
                    let msg = format!("init|{}|{}", id.int_val(), address);
                    ws_sender.send(Message::text(msg)).await?;
                }
                Err(err) => {
                    error!("{}", err);
                }
            }
        }
        Ok(Command::Edit(edit)) => {
            return Ok(send_request(msg_tx, id, RequestKind::Edit(edit)).await);
        }
        Ok(Command::Render(content)) => {
            ws_sender.send(Message::text(render_reply(&content))).await?;
        }
        Ok(Command::Close) => {
            send_request(msg_tx, id, RequestKind::Close).await;
            return Ok(CommandRes::Break);
        }
        Err(err) => {
            ws_sender
                .send(Message::text(format!("error|{}", err)))
                .await?;
        }
    }
    Ok(CommandRes::Continue)
}

async fn submit_close(id: UserID, msg_tx: &mut mpsc::Sender<Request>) {
    if let CommandRes::Continue = send_request(msg_tx, id, RequestKind::Close).await {
        debug!("Sent close for {}", id);
    }
}

async fn handle_message(
    id: UserID,
    msg: Message,
    msg_tx: &mut mpsc::Sender<Request>,
    ws_sender: &mut WsSender,
) -> Result<CommandRes, Report> {
    match msg {
        Message::Text(t) => {
            let cmd_res = t.parse();
            return Ok(handle_command(id, msg_tx, ws_sender, cmd_res).await?);
        }
        Message::Binary(_) => {
            ws_sender
                .send(Message::text("error|Binary messages are not supported"))
                .await?;
        }
        Message::Close(c) => {
            debug!("WebSocket closed ({:?})", c);
            submit_close(id, msg_tx).await;
            return Ok(CommandRes::Break);
        }
        Message::Ping(p) => {
            if let Err(err) = ws_sender.send(Message::Pong(p)).await {
                error!("Failed to send pong: {}", err);
                submit_close(id, msg_tx).await;
                return Ok(CommandRes::Break);
            }
        }
        _ => {}
    }
    Ok(CommandRes::Continue)
}

pub async fn handle_connection(
    mut lc: LobbyClient,
    peer: SocketAddr,
    stream: ClientStream,
) -> Result<(), Report> {
    let (tx, rx) = oneshot::channel::<Uri>();
    let ws_stream: WebSocketStream<ClientStream> =
        accept_hdr_async(stream, make_callback(tx)).await?;
    let uri: Uri = rx.await.wrap_err("Callback dropped")?;
    let start_time = Instant::now();

    info!("New WebSocket connection: {} to {}", peer, uri);
    let (mut ws_sender, mut ws_receiver) = ws_stream.split();

    let username = match bio_username(uri.path()) {
        Ok(username) => username,
        Err(msg) => {
            ws_sender.send(Message::text(format!("error|{}", msg))).await?;
            ws_sender.send(Message::Close(None)).await?;
            return Ok(());
        }
    };
    let join_response = match lc.join_channel(username).await {
        Ok(jr) => jr,
        Err(err @ JoinError::InvalidUsername(_)) => {
            ws_sender.send(Message::text(format!("error|{}", err))).await?;
            ws_sender.send(Message::Close(None)).await?;
            return Ok(());
        }
        Err(err) => return Err(err).wrap_err("Could not join preview session"),
    };
    debug!("{} previews the bio of {}", peer, join_response.username);
    let mut msg_tx = join_response.msg_tx;
    let mut bct_rx = join_response.bct_rx;
    let id: UserID = join_response.id;

    let mut interval = tokio::time::interval(Duration::from_millis(1000));

    loop {
        trace!("Loop iteration");
        tokio::select! {
            msg = ws_receiver.next() => {
                let msg = match msg {
                    Some(Ok(msg)) => msg,
                    Some(Err(e)) => {
                        error!("Error on input stream: {}", e);
                        submit_close(id, &mut msg_tx).await;
                        break;
                    }
                    None => {
                        debug!("WebSocket stream was terminated unexpectedly");
                        submit_close(id, &mut msg_tx).await;
                        break;
                    }
                };
                match handle_message(id, msg, &mut msg_tx, &mut ws_sender).await {
                    Ok(CommandRes::Break) => break,
                    Ok(CommandRes::Continue) => {}
                    Err(err) => {
                        error!("Could not handle message: {}", err);
                        submit_close(id, &mut msg_tx).await;
                        break;
                    }
                }
            }
            instant = interval.tick() => {
                trace!("Send ping to {}", id);
                let dur = instant.into_std().duration_since(start_time);
                let bytes: [u8; 16] = dur.as_micros().to_le_bytes();
                if let Err(err) = ws_sender.send(Message::Ping(Vec::from(&bytes[..]))).await {
                    error!("Could not send ping: {}", err);
                    submit_close(id, &mut msg_tx).await;
                    break;
                }
            }
            bct = bct_rx.recv() => match bct {
                Ok(msg) => {
                    if let Err(err) = ws_sender.send(Message::text(broadcast_message(&msg))).await {
                        error!("Could not send broadcast: {}", err);
                    }
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!("Client {} missed {} broadcasts", id, n);
                }
                Err(broadcast::error::RecvError::Closed) => {
                    info!("Session of {} ended", id);
                    break;
                }
            },
        }
    }

    trace!("Leaving handle_connection");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_bio_username() {
        assert_eq!(bio_username("/bio/alice"), Ok(String::from("alice")));
        assert_eq!(bio_username("/bio/al%20ice/"), Ok(String::from("al ice")));
        assert!(bio_username("/alice").is_err());
        assert!(bio_username("/bio").is_err());
    }

    #[test]
    fn test_render_reply() {
        assert_eq!(
            render_reply(r#"{"type":"doc","content":[{"type":"paragraph","content":[{"type":"text","text":"Hi"}]}]}"#),
            "html|<div class=\"rich-content\"><p>Hi</p></div>"
        );
        assert_eq!(
            render_reply("not json"),
            "html|<div class=\"content-error\">This content failed to load.</div>"
        );
    }

    #[test]
    fn test_broadcast_message() {
        assert_eq!(broadcast_message(&Broadcast::Joined(UserID::from(4))), "joined|4");
        assert_eq!(broadcast_message(&Broadcast::Left(UserID::from(4))), "left|4");
        assert_eq!(
            broadcast_message(&Broadcast::Preview(String::from("https://x/bio/a/preview?device=mobile"))),
            "preview|https://x/bio/a/preview?device=mobile"
        );
    }
}
