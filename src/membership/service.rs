use super::clock::MonotonicClock;
use super::config::MembershipConfig;
use super::runtime::NodeRuntime;
use super::types::{MembershipEntry, NodeIdentity, NodeStatus};
use crate::transport::UdpTransport;
use crate::transport::udp::MAX_DATAGRAM;

use anyhow::{Result, bail};
use bytes::Bytes;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tracing::info;

/// A membership node running over real UDP.
///
/// Datagrams are queued by a receive task; a tick task drains the queue and
/// runs the gossip loop every `tick_period`.
pub struct MembershipService {
    pub identity: NodeIdentity,
    config: MembershipConfig,
    runtime: Arc<Mutex<NodeRuntime<UdpTransport>>>,
    transport: UdpTransport,
    shutdown_tx: watch::Sender<bool>,
    handles: Mutex<Vec<JoinHandle<()>>>,
}

impl MembershipService {
    pub async fn new(bind_addr: SocketAddr, config: MembershipConfig) -> Result<Arc<Self>> {
        config.validate()?;
        if bind_addr.ip().is_unspecified() {
            bail!("bind address {} must name a concrete IPv4 interface", bind_addr);
        }

        let transport = UdpTransport::bind(bind_addr).await?;
        let identity = NodeIdentity::try_from(transport.local_addr()?)?;

        let runtime = NodeRuntime::new(
            identity,
            &config,
            Arc::new(transport.clone()),
            Arc::new(MonotonicClock::new()),
        );
        let (shutdown_tx, _) = watch::channel(false);

        Ok(Arc::new(Self {
            identity,
            config,
            runtime: Arc::new(Mutex::new(runtime)),
            transport,
            shutdown_tx,
            handles: Mutex::new(Vec::new()),
        }))
    }

    /// Joins the group and spawns the receive and tick tasks.
    pub async fn start(self: Arc<Self>) -> Result<()> {
        info!("Starting membership service on {}...", self.identity);
        self.runtime.lock().await.start()?;

        let receive_handle = {
            let service = self.clone();
            tokio::spawn(async move {
                service.receive_loop().await;
            })
        };

        let tick_handle = {
            let service = self.clone();
            tokio::spawn(async move {
                service.tick_loop().await;
            })
        };

        self.handles.lock().await.extend([receive_handle, tick_handle]);
        info!("All background tasks started");
        Ok(())
    }

    pub async fn members(&self) -> Vec<MembershipEntry> {
        self.runtime.lock().await.members()
    }

    pub async fn status(&self) -> NodeStatus {
        self.runtime.lock().await.status()
    }

    pub async fn heartbeat(&self) -> u64 {
        self.runtime.lock().await.heartbeat()
    }

    /// Stops both tasks and tears the runtime down.
    pub async fn shutdown(&self) {
        let _ = self.shutdown_tx.send(true);

        let handles: Vec<JoinHandle<()>> = self.handles.lock().await.drain(..).collect();
        for handle in handles {
            if let Err(e) = handle.await {
                tracing::warn!("Background task ended abnormally: {}", e);
            }
        }

        self.runtime.lock().await.shutdown();
        info!("Membership service on {} stopped", self.identity);
    }

    async fn receive_loop(self: Arc<Self>) {
        let socket = self.transport.socket();
        let mut shutdown_rx = self.shutdown_tx.subscribe();
        let mut buf = vec![0u8; MAX_DATAGRAM];

        loop {
            tokio::select! {
                _ = shutdown_rx.changed() => break,
                received = socket.recv_from(&mut buf) => match received {
                    Ok((len, src)) => {
                        tracing::debug!("Received {} bytes from {}", len, src);
                        let payload = Bytes::copy_from_slice(&buf[..len]);
                        self.runtime.lock().await.enqueue(payload);
                    }
                    Err(e) => {
                        tracing::error!("Failed to receive UDP packet: {}", e);
                        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
                    }
                },
            }
        }
    }

    async fn tick_loop(self: Arc<Self>) {
        let mut interval = tokio::time::interval(self.config.tick_period());
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        loop {
            tokio::select! {
                _ = shutdown_rx.changed() => break,
                _ = interval.tick() => {
                    let mut runtime = self.runtime.lock().await;
                    if runtime.status().is_terminal() {
                        break;
                    }
                    if let Some(report) = runtime.run_cycle()
                        && report.send_failures > 0
                    {
                        tracing::debug!(
                            "Tick {}: {} gossip sent, {} failed",
                            report.heartbeat,
                            report.gossip_sent,
                            report.send_failures
                        );
                    }
                }
            }
        }
    }
}
