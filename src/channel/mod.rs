//! # Preview sessions
//!
//! One channel runs per bio being edited. It owns the [`PreviewSession`] and
//! tells every connected frame when the preview address moves.
use crate::api::ApiClient;
use crate::lobby::{ChannelID, UserID};
use crate::preview::{BioDraft, BioEdit, PreviewSession};
use log::*;
use tokio::sync::{broadcast, mpsc, oneshot};

/// What a client learns when it joins
#[derive(Debug, Clone)]
pub struct InitReply {
    /// The address the preview currently shows
    pub address: Option<String>,
}

#[derive(Debug)]
pub enum RequestKind {
    Init { response: oneshot::Sender<InitReply> },
    Edit(BioEdit),
    Close,
}

#[derive(Debug)]
pub struct Request {
    pub source: UserID,
    pub kind: RequestKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Broadcast {
    Joined(UserID),
    Left(UserID),
    /// The preview moved to a new address
    Preview(String),
}

#[derive(Debug)]
pub struct ChannelComms {
    pub id: ChannelID,
    pub username: String,
    pub bct_tx: broadcast::Sender<Broadcast>,
    pub end_tx: mpsc::Sender<ChannelID>,
}

pub struct Channel {
    pub msg_rx: mpsc::Receiver<Request>,
    pub ter_rx: oneshot::Receiver<()>,
    pub session: PreviewSession,
    /// Where block order changes are persisted
    pub api: Option<ApiClient>,
    pub comms: ChannelComms,
}

/// The draft a new session starts from
pub async fn load_draft(api: Option<&ApiClient>, username: &str) -> BioDraft {
    match api {
        Some(api) => match api.bio(username).await {
            Ok(stored) => BioDraft::from_stored(username, stored),
            Err(err) => {
                warn!("Could not load bio of {}, starting empty: {}", username, err);
                BioDraft::new(username)
            }
        },
        None => BioDraft::new(username),
    }
}

impl ChannelComms {
    fn broadcast(&self, msg: Broadcast) {
        if let Err(err) = self.bct_tx.send(msg) {
            debug!("No client listening on {}: {:?}", self.id, err.0);
        }
    }
}

impl Channel {
    fn persist_order(&self, ids: Vec<String>) {
        if let Some(api) = self.api.clone() {
            let username = self.comms.username.clone();
            tokio::spawn(async move {
                if let Err(err) = api.reorder_blocks(&username, &ids).await {
                    error!("Could not save block order of {}: {}", username, err);
                }
            });
        }
    }

    async fn handle_request(&mut self, request: Request) {
        let id = request.source;
        match request.kind {
            RequestKind::Init { response } => {
                info!(
                    "New client {} in {} ({} blocks)",
                    id,
                    self.comms.id,
                    self.session.draft().blocks.len()
                );
                let address = match self.session.current_address() {
                    Some(address) => Some(address.to_owned()),
                    None => self.session.prime(),
                };
                if response.send(InitReply { address }).is_err() {
                    error!("Client {} dropped while initializing", id);
                }
                self.comms.broadcast(Broadcast::Joined(id));
            }
            RequestKind::Edit(edit) => {
                trace!("Edit from {}: {:?}", id, edit);
                if let BioEdit::Reorder(ids) = &edit {
                    self.persist_order(ids.clone());
                }
                self.session.apply(edit);
            }
            RequestKind::Close => {
                info!("Client {} left {}", id, self.comms.id);
                self.comms.broadcast(Broadcast::Left(id));
                if let Err(err) = self.comms.end_tx.send(self.comms.id).await {
                    error!("Could not send quit message: {}", err);
                }
            }
        }
    }

    pub async fn handle_messages(mut self) {
        loop {
            tokio::select! {
                ter = &mut self.ter_rx => {
                    match ter {
                        Ok(()) => info!("No clients left in {}, terminating", self.comms.id),
                        Err(_) => info!("Server shutdown, terminating {}", self.comms.id),
                    }
                    break;
                }
                req = self.msg_rx.recv() => match req {
                    Some(request) => self.handle_request(request).await,
                    None => {
                        info!("All request senders of {} dropped", self.comms.id);
                        break;
                    }
                },
                address = self.session.settled() => {
                    if let Some(address) = address {
                        self.comms.broadcast(Broadcast::Preview(address));
                    }
                }
            }
        }
        trace!("Leaving {}", self.comms.id);
    }
}
