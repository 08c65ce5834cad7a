//! # Preview lobby
//!
//! Frames connect with the username of the bio they show. The lobby finds the
//! session editing that bio, opening one on first use, and hands the frame the
//! ends of that session's request and broadcast channels.
//!
//! Sessions are keyed case-insensitively, the username itself is passed on
//! unchanged so the backend and the preview page see the real handle.
mod server;

pub use server::{ChannelID, HubOptions, LobbyServer, UserID};

use crate::channel::{Broadcast, Request};
use displaydoc::Display;
use thiserror::Error;
use tokio::sync::{broadcast, mpsc, oneshot};

/// A frame admitted into a preview session
#[derive(Debug)]
pub struct JoinResponse {
    pub id: UserID,
    /// The bio as the session knows it, in the spelling it was opened with
    pub username: String,
    pub msg_tx: mpsc::Sender<Request>,
    pub bct_rx: broadcast::Receiver<Broadcast>,
}

/// Ask to preview the bio of `username`
#[derive(Debug)]
pub struct JoinRequest {
    /// Exactly as decoded from the connection path
    pub username: String,
    pub response: oneshot::Sender<Result<JoinResponse, JoinError>>,
}

/// Error when joining a preview session
#[derive(Debug, Error, Display)]
pub enum JoinError {
    /// The lobby is no longer running
    LobbyClosed,
    /// The lobby dropped the request without answering
    NoAnswer(#[from] oneshot::error::RecvError),
    /// {0:?} is not a bio username
    InvalidUsername(String),
}

/// Cheap handle for sending join requests to the lobby task
#[derive(Debug, Clone)]
pub struct LobbyClient(mpsc::Sender<JoinRequest>);

impl From<mpsc::Sender<JoinRequest>> for LobbyClient {
    fn from(inner: mpsc::Sender<JoinRequest>) -> Self {
        Self(inner)
    }
}

impl LobbyClient {
    pub async fn join_channel<S: Into<String>>(
        &mut self,
        username: S,
    ) -> Result<JoinResponse, JoinError> {
        let (response, rx) = oneshot::channel();
        let request = JoinRequest {
            username: username.into(),
            response,
        };
        if self.0.send(request).await.is_err() {
            return Err(JoinError::LobbyClosed);
        }
        rx.await?
    }
}
