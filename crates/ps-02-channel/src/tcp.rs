//! Stream-backed channel adapter and outbound client.
//!
//! Generic over the byte stream so unit tests run against in-memory
//! duplex pipes; production wiring hands in `tokio::net::TcpStream`.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{debug, warn};

use ps_01_codec as codec;
use shared_types::security::NonceCache;
use shared_types::{AuthenticatedEnvelope, ChannelId, ChannelKey, MessageError, TransactionMessage};

use crate::adapter::{ChannelAdapter, ChannelKeyring, DeliveryOutcome};
use crate::errors::ChannelError;
use crate::framing::Framing;

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// Server-side adapter for one peer connection.
///
/// The peer's identity is pinned by its first verified envelope; later
/// frames claiming a different channel are rejected without reaching the
/// broker.
pub struct TcpChannelAdapter<S> {
    stream: S,
    framing: Framing,
    keyring: ChannelKeyring,
    nonces: NonceCache,
    /// Pinned after the first verified frame.
    peer: Option<ChannelId>,
}

impl<S> TcpChannelAdapter<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    /// Wraps an accepted connection.
    #[must_use]
    pub fn new(stream: S, framing: Framing, keyring: ChannelKeyring) -> Self {
        Self {
            stream,
            framing,
            keyring,
            nonces: NonceCache::new(),
            peer: None,
        }
    }

    fn verify_frame(&mut self, frame: &[u8]) -> Result<TransactionMessage, ChannelError> {
        let envelope: AuthenticatedEnvelope<Vec<u8>> = serde_json::from_slice(frame)
            .map_err(|e| ChannelError::MalformedEnvelope(e.to_string()))?;

        if let Some(pinned) = &self.peer {
            if *pinned != envelope.channel {
                return Err(ChannelError::Verification(MessageError::UnknownChannel(
                    envelope.channel.to_string(),
                )));
            }
        }
        let key = self
            .keyring
            .key_for(&envelope.channel)
            .ok_or_else(|| MessageError::UnknownChannel(envelope.channel.to_string()))?;
        envelope.verify(key, &self.nonces, unix_now())?;

        if self.peer.is_none() {
            debug!(channel = %envelope.channel, "Channel peer authenticated");
            self.peer = Some(envelope.channel.clone());
        }
        Ok(codec::decode(&envelope.payload)?)
    }
}

#[async_trait]
impl<S> ChannelAdapter for TcpChannelAdapter<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    fn channel(&self) -> &ChannelId {
        static UNAUTHENTICATED: ChannelId = ChannelId(String::new());
        self.peer.as_ref().unwrap_or(&UNAUTHENTICATED)
    }

    async fn receive(&mut self) -> Result<Option<TransactionMessage>, ChannelError> {
        let Some(frame) = self.framing.read_frame(&mut self.stream).await? else {
            return Ok(None);
        };
        self.verify_frame(&frame).map(Some)
    }

    async fn respond(&mut self, message: &TransactionMessage) -> DeliveryOutcome {
        let Some(peer) = self.peer.clone() else {
            warn!("Response requested before peer authentication");
            return DeliveryOutcome::Failed;
        };
        let Some(key) = self.keyring.key_for(&peer) else {
            return DeliveryOutcome::Failed;
        };
        let payload = match codec::encode(message) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(error = %e, "Response failed to encode");
                return DeliveryOutcome::Failed;
            }
        };
        let envelope = AuthenticatedEnvelope::seal(peer, key, unix_now(), payload);
        let frame = match serde_json::to_vec(&envelope) {
            Ok(frame) => frame,
            Err(_) => return DeliveryOutcome::Failed,
        };
        // Once bytes start flowing the peer may have seen the response even
        // if the write errors out, so failures here are indeterminate.
        match self.framing.write_frame(&mut self.stream, &frame).await {
            Ok(()) => DeliveryOutcome::Delivered,
            Err(e) => {
                warn!(error = %e, "Response write failed mid-frame");
                DeliveryOutcome::Indeterminate
            }
        }
    }
}

/// Outbound client used to call a remote peer (a downstream endpoint or a
/// test harness playing one).
pub struct ChannelClient<S> {
    stream: S,
    framing: Framing,
    channel: ChannelId,
    key: ChannelKey,
    nonces: NonceCache,
}

impl<S> ChannelClient<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    #[must_use]
    pub fn new(stream: S, framing: Framing, channel: ChannelId, key: ChannelKey) -> Self {
        Self {
            stream,
            framing,
            channel,
            key,
            nonces: NonceCache::new(),
        }
    }

    /// Sends `message` and waits up to `deadline` for the response.
    ///
    /// # Errors
    ///
    /// - Failure before the frame was written surfaces the underlying error.
    /// - Failure or timeout *after* the frame was written surfaces
    ///   [`ChannelError::Indeterminate`]: the request may have been acted
    ///   on, and the caller owns the reversal decision.
    pub async fn call(
        &mut self,
        message: &TransactionMessage,
        deadline: Duration,
    ) -> Result<TransactionMessage, ChannelError> {
        let payload = codec::encode(message)?;
        let envelope =
            AuthenticatedEnvelope::seal(self.channel.clone(), &self.key, unix_now(), payload);
        let frame =
            serde_json::to_vec(&envelope).map_err(|e| ChannelError::MalformedEnvelope(e.to_string()))?;

        self.framing.write_frame(&mut self.stream, &frame).await?;

        let read = tokio::time::timeout(deadline, self.framing.read_frame(&mut self.stream)).await;
        let frame = match read {
            Err(_) | Ok(Err(_)) | Ok(Ok(None)) => return Err(ChannelError::Indeterminate),
            Ok(Ok(Some(frame))) => frame,
        };
        let envelope: AuthenticatedEnvelope<Vec<u8>> = serde_json::from_slice(&frame)
            .map_err(|e| ChannelError::MalformedEnvelope(e.to_string()))?;
        envelope.verify(&self.key, &self.nonces, unix_now())?;
        Ok(codec::decode(&envelope.payload)?)
    }
}
