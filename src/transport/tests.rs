//! Transport Module Tests
//!
//! ## Test Scopes
//! - **Emulated Network**: FIFO delivery, routing failures, size and buffer limits,
//!   message loss and traffic counters.
//! - **UDP**: A datagram sent through `UdpTransport` arrives at the peer socket.

#[cfg(test)]
mod tests {
    use crate::membership::codec;
    use crate::membership::error::TransportError;
    use crate::membership::types::{Message, NodeIdentity};
    use crate::transport::{EmulatedNetwork, NetworkConfig, Transport, UdpTransport};

    fn node(i: u32) -> NodeIdentity {
        NodeIdentity::new(i, 0)
    }

    // ============================================================
    // EMULATED NETWORK TESTS
    // ============================================================

    #[test]
    fn test_delivery_is_fifo() {
        let net = EmulatedNetwork::new(NetworkConfig::default());
        net.attach(node(1));
        net.attach(node(2));

        net.send(node(1), node(2), b"first").unwrap();
        net.send(node(1), node(2), b"second").unwrap();
        assert_eq!(net.pending(&node(2)), 2);

        let received = net.receive(node(2));
        assert_eq!(received.len(), 2);
        assert_eq!(&received[0][..], b"first");
        assert_eq!(&received[1][..], b"second");

        // Inbox is empty after a receive
        assert!(net.receive(node(2)).is_empty());
    }

    #[test]
    fn test_send_to_detached_node_fails() {
        let net = EmulatedNetwork::new(NetworkConfig::default());
        net.attach(node(1));

        let err = net.send(node(1), node(9), b"hello").unwrap_err();
        assert!(matches!(err, TransportError::Unreachable(to) if to == node(9)));
    }

    #[test]
    fn test_detach_discards_pending_messages() {
        let net = EmulatedNetwork::new(NetworkConfig::default());
        net.attach(node(2));
        net.send(node(1), node(2), b"lost").unwrap();

        net.detach(node(2));
        assert!(!net.is_attached(&node(2)));
        assert!(net.receive(node(2)).is_empty());

        net.attach(node(2));
        assert_eq!(net.pending(&node(2)), 0);
    }

    #[test]
    fn test_oversized_payload_is_refused() {
        let net = EmulatedNetwork::new(NetworkConfig {
            max_payload: 8,
            ..NetworkConfig::default()
        });
        net.attach(node(2));

        let err = net.send(node(1), node(2), &[0u8; 9]).unwrap_err();
        assert!(matches!(err, TransportError::PayloadTooLarge { len: 9, max: 8 }));
        assert_eq!(net.pending(&node(2)), 0);
    }

    #[test]
    fn test_full_inbox_rejects_sends() {
        let net = EmulatedNetwork::new(NetworkConfig {
            inbox_capacity: 2,
            ..NetworkConfig::default()
        });
        net.attach(node(2));

        net.send(node(1), node(2), b"a").unwrap();
        net.send(node(1), node(2), b"b").unwrap();
        let err = net.send(node(1), node(2), b"c").unwrap_err();

        assert!(matches!(err, TransportError::InboxFull(_)));
        assert_eq!(net.pending(&node(2)), 2);
    }

    #[test]
    fn test_total_loss_drops_everything_silently() {
        let net = EmulatedNetwork::new(NetworkConfig {
            drop_probability: 1.0,
            ..NetworkConfig::default()
        });
        net.attach(node(1));
        net.attach(node(2));

        for _ in 0..10 {
            net.send(node(1), node(2), b"gone").expect("loss is not a send failure");
        }

        assert_eq!(net.pending(&node(2)), 0);
        let stats = net.stats(&node(1));
        assert_eq!(stats.sent, 10);
        assert_eq!(stats.dropped, 10);
    }

    #[test]
    fn test_partial_loss_is_reproducible() {
        let config = NetworkConfig {
            drop_probability: 0.5,
            seed: 42,
            ..NetworkConfig::default()
        };

        let run = |config: NetworkConfig| {
            let net = EmulatedNetwork::new(config);
            net.attach(node(2));
            for _ in 0..200 {
                net.send(node(1), node(2), b"x").unwrap();
            }
            net.pending(&node(2))
        };

        let first = run(config.clone());
        let second = run(config);
        assert_eq!(first, second);
        assert!(first > 0 && first < 200);
    }

    #[test]
    fn test_traffic_counters() {
        let net = EmulatedNetwork::new(NetworkConfig::default());
        net.attach(node(1));
        net.attach(node(2));

        net.send(node(1), node(2), b"a").unwrap();
        net.send(node(1), node(2), b"b").unwrap();
        net.send(node(2), node(1), b"c").unwrap();
        net.receive(node(2));

        assert_eq!(net.stats(&node(1)).sent, 2);
        assert_eq!(net.stats(&node(2)).sent, 1);
        assert_eq!(net.stats(&node(2)).received, 2);
        assert_eq!(net.stats(&node(1)).received, 0);
        assert_eq!(net.stats(&node(7)), Default::default());
    }

    #[test]
    fn test_send_message_encodes() {
        let net = EmulatedNetwork::new(NetworkConfig::default());
        net.attach(node(1));
        let msg = Message::JoinRequest {
            sender: node(2),
            heartbeat: 0,
        };

        net.send_message(node(2), node(1), &msg).unwrap();

        let received = net.receive(node(1));
        assert_eq!(codec::decode(&received[0], 0).unwrap(), msg);
    }

    // ============================================================
    // UDP TESTS
    // ============================================================

    #[tokio::test]
    async fn test_udp_datagram_reaches_peer() {
        let sender = UdpTransport::bind("127.0.0.1:0".parse().unwrap()).await.unwrap();
        let receiver = UdpTransport::bind("127.0.0.1:0".parse().unwrap()).await.unwrap();

        let from = NodeIdentity::try_from(sender.local_addr().unwrap()).unwrap();
        let to = NodeIdentity::try_from(receiver.local_addr().unwrap()).unwrap();
        let msg = Message::JoinRequest {
            sender: from,
            heartbeat: 3,
        };

        sender.send_message(from, to, &msg).expect("send should succeed");

        let mut buf = vec![0u8; 1024];
        let (len, src) = tokio::time::timeout(
            std::time::Duration::from_secs(2),
            receiver.socket().recv_from(&mut buf),
        )
        .await
        .expect("datagram should arrive")
        .unwrap();

        assert_eq!(src, sender.local_addr().unwrap());
        assert_eq!(codec::decode(&buf[..len], 0).unwrap(), msg);
    }
}
