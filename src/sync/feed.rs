// Draft feed transport: polled pick snapshots over HTTP and the push
// channel over WebSocket. The feed is injected as a trait so the sync
// layer is testable with a mock; frame processing is a pure function
// over any message stream so it needs no I/O in tests.

use async_trait::async_trait;
use futures_util::{SinkExt, Stream, StreamExt};
use serde::Deserialize;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

use super::DraftId;
use crate::board::player::PlayerId;

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("pick snapshot fetch failed: {0}")]
    Fetch(#[from] reqwest::Error),

    #[error("feed connection failed: {0}")]
    Connect(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("feed protocol error: {0}")]
    Protocol(String),
}

/// Event emitted by a feed task to the application layer. Each event
/// carries the generation of the connection that produced it; events
/// from superseded connections are discarded upstream.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedEvent {
    pub generation: u64,
    pub kind: FeedEventKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FeedEventKind {
    /// Result of a polled snapshot fetch (initial, periodic, or on resume).
    SnapshotPicks(Vec<PlayerId>),
    /// First message received on the live channel; confirms the connection.
    ChannelConfirmed,
    /// A single pick frame from the push channel.
    Pick(PlayerId),
    /// The transport closed without an explicit stop.
    Closed,
    /// The transport failed. Human-readable message for the UI.
    Failed(String),
}

/// A single pick record in the polled snapshot payload.
#[derive(Debug, Deserialize)]
struct PickRecord {
    player_id: String,
}

/// Typed frames on the push channel. Only `pick` frames reach the board;
/// every other frame type is ignored.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum FeedFrame {
    Pick { player_id: String },
    Heartbeat,
    #[serde(other)]
    Other,
}

/// External draft-pick source. Injected into the sync manager so tests
/// can substitute a scripted feed.
#[async_trait]
pub trait DraftFeed: Send + Sync {
    /// Fetch the current set of drafted player ids. A draft that has not
    /// started yet is a normal empty result, not an error.
    async fn fetch_picks(&self, draft: DraftId) -> Result<Vec<PlayerId>, FeedError>;

    /// Open the push channel, subscribe to the draft, and forward events
    /// through `tx` until the channel closes. Returns `Ok(())` on a clean
    /// close and an error on transport failure.
    async fn run_push_channel(
        &self,
        draft: DraftId,
        generation: u64,
        tx: mpsc::Sender<FeedEvent>,
    ) -> Result<(), FeedError>;
}

/// Production feed: HTTP snapshot + WebSocket push against the draft room.
pub struct HttpDraftFeed {
    http: reqwest::Client,
    api_url: String,
    ws_url: String,
}

impl HttpDraftFeed {
    pub fn new(http: reqwest::Client, api_url: impl Into<String>, ws_url: impl Into<String>) -> Self {
        HttpDraftFeed {
            http,
            api_url: api_url.into(),
            ws_url: ws_url.into(),
        }
    }
}

#[async_trait]
impl DraftFeed for HttpDraftFeed {
    async fn fetch_picks(&self, draft: DraftId) -> Result<Vec<PlayerId>, FeedError> {
        let url = format!("{}/draft/{}/picks", self.api_url, draft);
        let response = self.http.get(&url).send().await?;

        // The draft resource does not exist until the room opens; treat
        // that as an empty snapshot rather than a failure.
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            debug!("pick snapshot for draft {draft}: not started yet");
            return Ok(Vec::new());
        }

        let records: Vec<PickRecord> = response.error_for_status()?.json().await?;
        Ok(records
            .into_iter()
            .map(|r| PlayerId::new(r.player_id))
            .collect())
    }

    async fn run_push_channel(
        &self,
        draft: DraftId,
        generation: u64,
        tx: mpsc::Sender<FeedEvent>,
    ) -> Result<(), FeedError> {
        let (ws_stream, _response) = tokio_tungstenite::connect_async(&self.ws_url).await?;
        info!("Push channel open to {} for draft {draft}", self.ws_url);

        let (mut write, read) = ws_stream.split();
        let subscribe = serde_json::json!({ "type": "subscribe", "draft_id": draft.0 });
        write.send(Message::Text(subscribe.to_string().into())).await?;

        process_frame_stream(read, generation, &tx).await
    }
}

/// Process raw WebSocket messages from any [`Stream`], forwarding typed
/// feed events through `tx`. The first text frame of any kind confirms
/// the channel; unparseable frames are logged and skipped.
///
/// Returns `Ok(())` on a clean close (close frame, stream end, or
/// receiver dropped during shutdown) and `Err` on a transport error.
pub async fn process_frame_stream<St>(
    mut stream: St,
    generation: u64,
    tx: &mpsc::Sender<FeedEvent>,
) -> Result<(), FeedError>
where
    St: Stream<Item = Result<Message, tokio_tungstenite::tungstenite::Error>> + Unpin,
{
    let mut confirmed = false;

    while let Some(msg_result) = stream.next().await {
        match msg_result {
            Ok(Message::Text(text)) => {
                if !confirmed {
                    confirmed = true;
                    if send_event(tx, generation, FeedEventKind::ChannelConfirmed)
                        .await
                        .is_err()
                    {
                        return Ok(());
                    }
                }

                let frame: FeedFrame = match serde_json::from_str(text.as_ref()) {
                    Ok(f) => f,
                    Err(e) => {
                        warn!("Skipping unparseable feed frame: {e}");
                        continue;
                    }
                };

                match frame {
                    FeedFrame::Pick { player_id } => {
                        let kind = FeedEventKind::Pick(PlayerId::new(player_id));
                        if send_event(tx, generation, kind).await.is_err() {
                            return Ok(());
                        }
                    }
                    FeedFrame::Heartbeat | FeedFrame::Other => {
                        // Confirmation already handled above; nothing to apply.
                    }
                }
            }
            Ok(Message::Close(_)) => {
                info!("Feed sent close frame");
                break;
            }
            Err(e) => {
                return Err(FeedError::Protocol(e.to_string()));
            }
            _ => {
                // Ignore Binary, Ping, Pong, Frame variants.
            }
        }
    }
    Ok(())
}

async fn send_event(
    tx: &mpsc::Sender<FeedEvent>,
    generation: u64,
    kind: FeedEventKind,
) -> Result<(), ()> {
    tx.send(FeedEvent { generation, kind }).await.map_err(|_| ())
}
