//! UDP ingestion listener
//!
//! One socket, one receive loop, one spawned decode task per datagram. Each task
//! gets its own copy of the payload; the scratch buffer is reused across receives.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use contracts::MAX_DATAGRAM_SIZE;
use tokio::net::UdpSocket;
use tokio::sync::Semaphore;
use tokio::task::{JoinError, JoinSet};
use tracing::{debug, info, warn};

use crate::config::{IngestionMetrics, ListenerConfig, MetricsSnapshot};
use crate::decoder::{run_decode_task, FlowDecoder};
use crate::error::{IngestionError, Result};
use crate::fanout::FlowFanout;

/// 绑定好的 UDP 监听器
pub struct FlowListener {
    socket: UdpSocket,
    decoder: Arc<FlowDecoder>,
    fanout: FlowFanout,
    metrics: Arc<IngestionMetrics>,
    limiter: Option<Arc<Semaphore>>,
}

impl FlowListener {
    /// 绑定监听地址
    ///
    /// # Errors
    /// 地址无法绑定时返回 `IngestionError::Bind`，调用方应视为致命错误。
    pub async fn bind(config: ListenerConfig, fanout: FlowFanout) -> Result<Self> {
        let socket = UdpSocket::bind(&config.bind_address)
            .await
            .map_err(|source| IngestionError::Bind {
                address: config.bind_address.clone(),
                source,
            })?;

        Ok(Self {
            socket,
            decoder: Arc::new(FlowDecoder::new(
                config.header_fields,
                config.record_fields,
            )),
            fanout,
            metrics: Arc::new(IngestionMetrics::new()),
            limiter: config
                .max_in_flight_decodes
                .map(|limit| Arc::new(Semaphore::new(limit))),
        })
    }

    /// 实际绑定的地址（端口为 0 时由系统分配）
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    /// 共享的 metrics 句柄
    pub fn metrics(&self) -> Arc<IngestionMetrics> {
        self.metrics.clone()
    }

    /// 接收循环，直到 `shutdown` 完成
    ///
    /// 停止后等待已派发的解码任务全部结束，再返回统计快照。
    pub async fn run_until<F>(self, shutdown: F) -> MetricsSnapshot
    where
        F: Future<Output = ()>,
    {
        let Self {
            socket,
            decoder,
            fanout,
            metrics,
            limiter,
        } = self;

        let local = socket
            .local_addr()
            .map(|addr| addr.to_string())
            .unwrap_or_else(|_| "unknown".to_string());
        info!(address = %local, "listening for netflow v5 datagrams");

        let mut buf = vec![0u8; MAX_DATAGRAM_SIZE];
        let mut tasks = JoinSet::new();
        let mut next_task_id: u64 = 0;

        tokio::pin!(shutdown);

        loop {
            let received = tokio::select! {
                biased;
                _ = &mut shutdown => break,
                received = socket.recv_from(&mut buf) => received,
            };

            let (len, peer) = match received {
                Ok(received) => received,
                Err(e) => {
                    metrics.record_receive_error();
                    observability::metrics::record_receive_error();
                    warn!(error = %e, "udp receive failed");
                    continue;
                }
            };

            metrics.record_received();
            observability::metrics::record_datagram_received();

            // 每个任务持有独立副本，scratch buffer 可立即复用
            let datagram = Bytes::copy_from_slice(&buf[..len]);

            let permit = match &limiter {
                Some(limiter) => match limiter.clone().acquire_owned().await {
                    Ok(permit) => Some(permit),
                    Err(_) => break,
                },
                None => None,
            };

            next_task_id = next_task_id.wrapping_add(1);
            let task_id = next_task_id;
            let decoder = decoder.clone();
            let fanout = fanout.clone();
            let task_metrics = metrics.clone();

            metrics.task_started();
            tasks.spawn(async move {
                run_decode_task(task_id, datagram, decoder, fanout, task_metrics.clone()).await;
                task_metrics.task_finished();
                drop(permit);
            });

            debug!(task_id, len, %peer, "datagram dispatched");

            while let Some(joined) = tasks.try_join_next() {
                log_join_error(joined);
            }
        }

        let pending = tasks.len();
        if pending > 0 {
            debug!(pending, "waiting for in-flight decode tasks");
        }
        while let Some(joined) = tasks.join_next().await {
            log_join_error(joined);
        }

        let snapshot = metrics.snapshot();
        info!(
            received = snapshot.datagrams_received,
            decoded = snapshot.flows_decoded,
            dropped = snapshot.datagrams_dropped,
            "listener stopped"
        );
        snapshot
    }
}

/// Panics are already caught inside the task; this only sees cancellation
fn log_join_error(joined: std::result::Result<(), JoinError>) {
    if let Err(e) = joined {
        warn!(error = %e, "decode task did not complete");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fanout::Overflow;
    use crate::mock::{DatagramBuilder, MockExporter};
    use std::time::Duration;
    use tokio::sync::oneshot;

    fn loopback_config() -> ListenerConfig {
        ListenerConfig {
            bind_address: "127.0.0.1:0".to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_bind_failure_is_reported() {
        let taken = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let config = ListenerConfig {
            bind_address: taken.local_addr().unwrap().to_string(),
            ..Default::default()
        };

        let result = FlowListener::bind(config, FlowFanout::default()).await;
        assert!(matches!(result, Err(IngestionError::Bind { .. })));
    }

    #[tokio::test]
    async fn test_malformed_datagram_is_dropped_among_valid_ones() {
        let mut builder = FlowFanout::builder();
        let rx = builder.subscribe("accumulator", 64, Overflow::Wait);
        let fanout = builder.build();

        let listener = FlowListener::bind(loopback_config(), fanout).await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (stop_tx, stop_rx) = oneshot::channel::<()>();
        let handle = tokio::spawn(listener.run_until(async move {
            let _ = stop_rx.await;
        }));

        let exporter = MockExporter::connect(addr).await.unwrap();
        for i in 0..5u32 {
            let datagram = DatagramBuilder::new()
                .flow_sequence(i)
                .with_records(2)
                .build();
            exporter.send(&datagram).await.unwrap();
            if i == 2 {
                exporter.send(&[0u8; 12]).await.unwrap();
            }
        }

        let mut flows = Vec::new();
        for _ in 0..5 {
            let flow = tokio::time::timeout(Duration::from_secs(5), rx.recv())
                .await
                .unwrap()
                .unwrap();
            flows.push(flow);
        }

        stop_tx.send(()).unwrap();
        let snapshot = handle.await.unwrap();

        assert_eq!(flows.len(), 5);
        assert!(rx.try_recv().is_err());
        assert_eq!(snapshot.datagrams_received, 6);
        assert_eq!(snapshot.flows_decoded, 5);
        assert_eq!(snapshot.datagrams_dropped, 1);
        assert_eq!(snapshot.in_flight, 0);
    }

    #[tokio::test]
    async fn test_bounded_decode_concurrency() {
        let mut builder = FlowFanout::builder();
        let rx = builder.subscribe("accumulator", 64, Overflow::Wait);
        let fanout = builder.build();

        let config = ListenerConfig {
            max_in_flight_decodes: Some(1),
            ..loopback_config()
        };
        let listener = FlowListener::bind(config, fanout).await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (stop_tx, stop_rx) = oneshot::channel::<()>();
        let handle = tokio::spawn(listener.run_until(async move {
            let _ = stop_rx.await;
        }));

        let exporter = MockExporter::connect(addr).await.unwrap();
        for _ in 0..4 {
            exporter
                .send(&DatagramBuilder::new().with_records(1).build())
                .await
                .unwrap();
        }

        for _ in 0..4 {
            tokio::time::timeout(Duration::from_secs(5), rx.recv())
                .await
                .unwrap()
                .unwrap();
        }

        stop_tx.send(()).unwrap();
        let snapshot = handle.await.unwrap();
        assert_eq!(snapshot.flows_decoded, 4);
    }
}
