//! Full ingress flows over real TCP: authenticated framing in, pipeline,
//! authenticated response out.

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use tokio::net::TcpStream;
    use tokio::sync::watch;

    use ps_02_channel::{ChannelClient, ChannelError, Framing};
    use ps_07_null_router::DiscardReason;
    use shared_types::{ChannelId, ChannelKey, ResponseCode};
    use switch_runtime::server::IngressServer;

    use crate::fixtures::{
        financial, response_code, switch, switch_config, CHANNEL, KEY, OPENING_BALANCE, PAN,
    };

    /// Starts a switch on `port` and returns a connected stream plus the
    /// shutdown handle.
    async fn start_switch(
        port: u16,
    ) -> (
        Arc<switch_runtime::container::SwitchContainer>,
        TcpStream,
        watch::Sender<bool>,
    ) {
        let mut config = switch_config();
        config.network.listen_addr = format!("127.0.0.1:{port}");
        let (pipeline, container) = switch(config);
        let server = IngressServer::new(Arc::clone(&container), Arc::new(pipeline));
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        tokio::spawn(async move {
            server.run(shutdown_rx).await.expect("ingress server");
        });

        // The listener binds asynchronously; retry until it answers.
        let addr = format!("127.0.0.1:{port}");
        for _ in 0..50 {
            if let Ok(stream) = TcpStream::connect(&addr).await {
                return (container, stream, shutdown_tx);
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        panic!("ingress listener never came up on {addr}");
    }

    fn client(stream: TcpStream, key: &[u8]) -> ChannelClient<TcpStream> {
        ChannelClient::new(
            stream,
            Framing::LengthPrefixed,
            ChannelId::new(CHANNEL),
            ChannelKey::new(key.to_vec()),
        )
    }

    #[tokio::test]
    async fn financial_request_round_trips_over_tcp() {
        let (container, stream, shutdown) = start_switch(18583).await;
        let mut client = client(stream, KEY);

        let response = client
            .call(&financial(1), Duration::from_secs(2))
            .await
            .expect("call");
        assert_eq!(response_code(&response), Some(ResponseCode::Approved));
        assert_eq!(container.ledger.balance(PAN), OPENING_BALANCE - 2_500);

        // The same connection carries further traffic.
        let response = client
            .call(&financial(2), Duration::from_secs(2))
            .await
            .expect("second call");
        assert_eq!(response_code(&response), Some(ResponseCode::Approved));
        assert_eq!(container.ledger.balance(PAN), OPENING_BALANCE - 5_000);

        let _ = shutdown.send(true);
    }

    #[tokio::test]
    async fn tampered_frame_is_audited_and_never_answered() {
        let (container, stream, shutdown) = start_switch(18584).await;
        let mut client = client(stream, b"not-the-key");

        let result = client.call(&financial(1), Duration::from_millis(300)).await;
        assert!(matches!(result, Err(ChannelError::Indeterminate)));

        // The frame never reached the broker, but it left an audit trail.
        tokio::time::sleep(Duration::from_millis(50)).await;
        let discards = container.null_router.recent();
        assert!(discards
            .iter()
            .any(|d| matches!(d.reason, DiscardReason::Unverified(_))));
        assert_eq!(container.ledger.balance(PAN), OPENING_BALANCE);

        let _ = shutdown.send(true);
    }

    #[tokio::test]
    async fn duplicate_over_the_wire_replays_the_original_approval() {
        let (container, stream, shutdown) = start_switch(18585).await;
        let mut client = client(stream, KEY);

        let first = client
            .call(&financial(3), Duration::from_secs(2))
            .await
            .expect("first call");
        assert_eq!(response_code(&first), Some(ResponseCode::Approved));

        // A retransmitted request gets the stored approval back; the
        // balance shows the posting happened once.
        let replay = client
            .call(&financial(3), Duration::from_secs(2))
            .await
            .expect("replayed call");
        assert_eq!(response_code(&replay), Some(ResponseCode::Approved));
        assert_eq!(container.ledger.balance(PAN), OPENING_BALANCE - 2_500);

        let _ = shutdown.send(true);
    }

    #[tokio::test]
    async fn shutdown_stops_accepting_connections() {
        let (_container, stream, shutdown) = start_switch(18586).await;
        drop(stream);
        let _ = shutdown.send(true);
        tokio::time::sleep(Duration::from_millis(50)).await;

        let refused = TcpStream::connect("127.0.0.1:18586").await;
        assert!(refused.is_err(), "listener should be gone after shutdown");
    }
}
