use super::{JoinError, JoinRequest, JoinResponse};
use crate::api::ApiClient;
use crate::channel::{load_draft, Broadcast, Channel, ChannelComms, Request};
use crate::preview::PreviewSession;
use crate::util::{Counter, LoopState};
use derive_new::new;
use log::*;
use std::cmp::Ordering;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fmt;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, oneshot};

macro_rules! make_id {
    (#[$doc:meta] $name:ident, $key:literal) => {
        #[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
        #[$doc]
        pub struct $name(u64);

        impl $name {
            /// Integer value
            pub fn int_val(&self) -> u64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, $key, self.0)
            }
        }

        impl From<$name> for u64 {
            fn from(id: $name) -> u64 {
                id.0
            }
        }

        impl From<u64> for $name {
            fn from(id: u64) -> $name {
                $name(id)
            }
        }
    };
}

make_id!(
    /// ID for a connected preview frame
    UserID,
    "user#{0}"
);

make_id!(
    /// ID for a preview session
    ChannelID,
    "channel#{0}"
);

/// What every new preview session is set up with
#[derive(Debug, Clone)]
pub struct HubOptions {
    /// Where the public bio pages are served
    pub preview_base: String,
    pub debounce: Duration,
    /// Seeds drafts and persists block order
    pub api: Option<ApiClient>,
}

#[derive(Debug, new)]
pub struct LobbyChannel {
    next_id: Counter<UserID>,
    count: u64,
    /// Entry in `channel_names`
    key: String,
    /// The bio being previewed
    username: String,
    bct_tx: broadcast::Sender<Broadcast>,
    req_tx: mpsc::Sender<Request>,
    terminate: oneshot::Sender<()>,
}

#[derive(Debug, Default)]
pub struct LobbyState {
    next_id: Counter<ChannelID>,
    channels: HashMap<ChannelID, LobbyChannel>,
    channel_names: HashMap<String, ChannelID>,
}

/// Key of the session for `username`
///
/// Handles are matched case-insensitively. `None` for names that cannot be a
/// single path segment.
pub fn session_key(username: &str) -> Option<String> {
    let username = username.trim();
    if username.is_empty() || username.contains('/') {
        None
    } else {
        Some(username.to_lowercase())
    }
}

impl LobbyState {
    fn handle_end(&mut self, sig: ChannelID) -> LoopState<()> {
        match self.channels.entry(sig) {
            Entry::Vacant(_v) => {
                error!("Channel entry vanished");
                LoopState::Break(())
            }
            Entry::Occupied(mut o) => {
                let channel = o.get_mut();
                match channel.count.cmp(&1) {
                    Ordering::Less => {
                        error!("Channel {} not cleaned up correctly", sig);
                        LoopState::Break(())
                    }
                    Ordering::Equal => {
                        let channel = o.remove();
                        self.channel_names.remove(&channel.key);
                        if let Err(()) = channel.terminate.send(()) {
                            error!("Error terminating channel {}", sig);
                        }
                        info!("Closed preview of {}", channel.username);
                        LoopState::Continue
                    }
                    Ordering::Greater => {
                        channel.count -= 1;
                        LoopState::Continue
                    }
                }
            }
        }
    }

    pub fn handle_join_request(
        &mut self,
        msg: JoinRequest,
        end_tx: &mpsc::Sender<ChannelID>,
        opts: &HubOptions,
    ) {
        let response = msg.response;
        let log_join_response = |res: Result<(), Result<JoinResponse, JoinError>>| match res {
            Ok(()) => {}
            Err(_) => error!("Client connection dropped while joining"),
        };

        let key = match session_key(&msg.username) {
            Some(key) => key,
            None => {
                log_join_response(response.send(Err(JoinError::InvalidUsername(msg.username))));
                return;
            }
        };
        let username = msg.username.trim().to_owned();

        match self.channel_names.entry(key.clone()) {
            Entry::Vacant(v) => {
                let (req_tx, req_rx) = mpsc::channel(100);
                let (bct_tx, bct_rx) = broadcast::channel(100);
                let (ter_tx, ter_rx) = oneshot::channel::<()>();
                let channel_id = self.next_id.next();

                tokio::spawn({
                    let end_tx = end_tx.clone();
                    let bct_tx = bct_tx.clone();
                    let opts = opts.clone();
                    let username = username.clone();
                    async move {
                        let draft = load_draft(opts.api.as_ref(), &username).await;
                        let session = PreviewSession::new(draft, opts.preview_base, opts.debounce);
                        Channel {
                            msg_rx: req_rx,
                            ter_rx,
                            session,
                            api: opts.api,
                            comms: ChannelComms {
                                id: channel_id,
                                username,
                                bct_tx,
                                end_tx,
                            },
                        }
                        .handle_messages()
                        .await;
                    }
                });

                let mut next_id = Counter::default();
                let id = next_id.next();

                log_join_response(response.send(Ok(JoinResponse {
                    id,
                    username: username.clone(),
                    msg_tx: req_tx.clone(),
                    bct_rx,
                })));
                info!("Opened preview of {} as {}", username, channel_id);

                self.channels.insert(
                    channel_id,
                    LobbyChannel::new(next_id, 1, key, username, bct_tx, req_tx, ter_tx),
                );
                v.insert(channel_id);
            }
            Entry::Occupied(o_id) => {
                let channel_id = *o_id.get();
                let channel = match self.channels.get_mut(&channel_id) {
                    Some(channel) => channel,
                    None => {
                        error!("Channel {} is named but missing", channel_id);
                        o_id.remove();
                        return;
                    }
                };
                channel.count += 1;

                let id = channel.next_id.next();
                let res = response.send(Ok(JoinResponse {
                    id,
                    username: channel.username.clone(),
                    msg_tx: channel.req_tx.clone(),
                    bct_rx: channel.bct_tx.subscribe(),
                }));
                match res {
                    Ok(()) => {
                        info!("Accepted client {} into channel {}", id, channel_id);
                    }
                    Err(_) => {
                        error!("Client connection {} dropped while joining", id);
                    }
                }
            }
        }
    }
}

/// The task for the lobby
#[derive(Debug, new)]
pub struct LobbyServer {
    inner: mpsc::Receiver<JoinRequest>,
    #[new(default)]
    state: LobbyState,
    opts: HubOptions,
}

impl LobbyServer {
    /// The main loop of the server
    pub async fn run(mut self) {
        let (end_tx, mut end_rx) = mpsc::channel::<ChannelID>(5);

        loop {
            tokio::select! {
                Some(sig) = end_rx.recv() => {
                    if let LoopState::Break(()) = self.state.handle_end(sig) {
                        break;
                    }
                }
                msg = self.inner.recv() => match msg {
                    Some(msg) => self.state.handle_join_request(msg, &end_tx, &self.opts),
                    None => {
                        trace!("JoinRequest stream broke!");
                        break;
                    }
                },
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::RequestKind;
    use crate::lobby::LobbyClient;

    fn lobby() -> LobbyClient {
        let (tx, rx) = mpsc::channel(10);
        let opts = HubOptions {
            preview_base: String::from("https://app.example"),
            debounce: Duration::from_millis(500),
            api: None,
        };
        tokio::spawn(LobbyServer::new(rx, opts).run());
        LobbyClient::from(tx)
    }

    async fn init_address(join: &JoinResponse) -> String {
        let (response, rx) = oneshot::channel();
        join.msg_tx
            .send(Request {
                source: join.id,
                kind: RequestKind::Init { response },
            })
            .await
            .unwrap();
        rx.await.unwrap().address.unwrap()
    }

    #[test]
    fn test_session_key() {
        assert_eq!(session_key("Chinmay_4o").as_deref(), Some("chinmay_4o"));
        assert_eq!(session_key(" jürgen.k ").as_deref(), Some("jürgen.k"));
        assert_ne!(session_key("chinmay_4o"), session_key("chinmay-4o"));
        assert_eq!(session_key("  "), None);
        assert_eq!(session_key("a/b"), None);
    }

    #[tokio::test]
    async fn test_username_is_kept_verbatim() {
        let mut lc = lobby();
        let join = lc.join_channel("chinmay_4o").await.unwrap();
        assert_eq!(join.username, "chinmay_4o");
        let address = init_address(&join).await;
        assert!(
            address.starts_with("https://app.example/bio/chinmay_4o/preview?"),
            "{}",
            address
        );

        let other = lc.join_channel("chinmay-4o").await.unwrap();
        assert_eq!(other.id, UserID::from(0));
        assert!(init_address(&other)
            .await
            .starts_with("https://app.example/bio/chinmay-4o/preview?"));
    }

    #[tokio::test]
    async fn test_same_bio_shares_session() {
        let mut lc = lobby();
        let a = lc.join_channel("Alice").await.unwrap();
        let mut b = lc.join_channel("alice").await.unwrap();
        assert_eq!(a.id, UserID::from(0));
        assert_eq!(b.id, UserID::from(1));
        assert_eq!(b.username, "Alice");

        assert!(init_address(&a).await.contains("/bio/Alice/preview?"));
        assert_eq!(b.bct_rx.recv().await.unwrap(), Broadcast::Joined(a.id));

        let other = lc.join_channel("bob").await.unwrap();
        assert_eq!(other.id, UserID::from(0));
    }

    #[tokio::test]
    async fn test_invalid_username() {
        let mut lc = lobby();
        assert!(matches!(
            lc.join_channel(" ").await,
            Err(JoinError::InvalidUsername(_))
        ));
    }
}
