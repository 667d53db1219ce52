//! Mock 导出器
//!
//! 构造 NetFlow v5 报文并通过 UDP 发送，用于无真实路由器环境的测试。

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use contracts::{HEADER_LENGTH, NETFLOW_V5_VERSION, RECORD_LENGTH};
use tokio::net::UdpSocket;
use tracing::{debug, trace, warn};

/// NetFlow v5 报文构造器
///
/// 默认生成 version = 5、无记录的头部；Count 默认等于实际追加的记录数。
#[derive(Debug, Clone)]
pub struct DatagramBuilder {
    version: u16,
    declared_count: Option<u16>,
    sys_uptime: u32,
    unix_secs: u32,
    unix_nsecs: u32,
    flow_sequence: u32,
    engine_type: u8,
    engine_id: u8,
    sampling_interval: u16,
    records: Vec<[u8; RECORD_LENGTH]>,
}

impl Default for DatagramBuilder {
    fn default() -> Self {
        Self {
            version: NETFLOW_V5_VERSION,
            declared_count: None,
            sys_uptime: 360_000,
            unix_secs: 1_700_000_000,
            unix_nsecs: 0,
            flow_sequence: 0,
            engine_type: 0,
            engine_id: 0,
            sampling_interval: 0,
            records: Vec::new(),
        }
    }
}

impl DatagramBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn version(mut self, version: u16) -> Self {
        self.version = version;
        self
    }

    /// 覆盖头部 Count，用于构造声明数与实际不符的报文
    pub fn declared_count(mut self, count: u16) -> Self {
        self.declared_count = Some(count);
        self
    }

    pub fn sys_uptime(mut self, millis: u32) -> Self {
        self.sys_uptime = millis;
        self
    }

    pub fn unix_time(mut self, secs: u32, nsecs: u32) -> Self {
        self.unix_secs = secs;
        self.unix_nsecs = nsecs;
        self
    }

    pub fn flow_sequence(mut self, sequence: u32) -> Self {
        self.flow_sequence = sequence;
        self
    }

    pub fn engine(mut self, engine_type: u8, engine_id: u8) -> Self {
        self.engine_type = engine_type;
        self.engine_id = engine_id;
        self
    }

    pub fn sampling(mut self, mode: u8, rate: u16) -> Self {
        self.sampling_interval = (u16::from(mode & 0x03) << 14) | (rate & 0x3FFF);
        self
    }

    /// 追加 `n` 条样例记录（地址随序号变化）
    pub fn with_records(mut self, n: usize) -> Self {
        for _ in 0..n {
            let index = self.records.len();
            self.records.push(sample_record(index));
        }
        self
    }

    /// 追加一条记录，由闭包填充 48 字节槽
    pub fn record(mut self, fill: impl FnOnce(&mut [u8; RECORD_LENGTH])) -> Self {
        let mut slot = [0u8; RECORD_LENGTH];
        fill(&mut slot);
        self.records.push(slot);
        self
    }

    /// 追加 `n` 条记录，每条由闭包填充
    pub fn records(mut self, n: usize, mut fill: impl FnMut(&mut [u8; RECORD_LENGTH])) -> Self {
        for _ in 0..n {
            let mut slot = [0u8; RECORD_LENGTH];
            fill(&mut slot);
            self.records.push(slot);
        }
        self
    }

    /// 生成报文字节
    pub fn build(&self) -> Vec<u8> {
        let count = self
            .declared_count
            .unwrap_or_else(|| u16::try_from(self.records.len()).unwrap_or(u16::MAX));

        let mut buf = Vec::with_capacity(HEADER_LENGTH + self.records.len() * RECORD_LENGTH);
        buf.extend_from_slice(&self.version.to_be_bytes());
        buf.extend_from_slice(&count.to_be_bytes());
        buf.extend_from_slice(&self.sys_uptime.to_be_bytes());
        buf.extend_from_slice(&self.unix_secs.to_be_bytes());
        buf.extend_from_slice(&self.unix_nsecs.to_be_bytes());
        buf.extend_from_slice(&self.flow_sequence.to_be_bytes());
        buf.push(self.engine_type);
        buf.push(self.engine_id);
        buf.extend_from_slice(&self.sampling_interval.to_be_bytes());

        for slot in &self.records {
            buf.extend_from_slice(slot);
        }
        buf
    }
}

fn sample_record(index: usize) -> [u8; RECORD_LENGTH] {
    let low = (index % 256) as u8;
    let mut slot = [0u8; RECORD_LENGTH];
    slot[0..4].copy_from_slice(&[10, 0, 0, low]);
    slot[4..8].copy_from_slice(&[192, 168, 0, low]);
    slot[8..12].copy_from_slice(&[10, 0, 0, 254]);
    slot[12..14].copy_from_slice(&1u16.to_be_bytes());
    slot[14..16].copy_from_slice(&2u16.to_be_bytes());
    slot[16..20].copy_from_slice(&(index as u32 + 1).to_be_bytes());
    slot[20..24].copy_from_slice(&((index as u32 + 1) * 64).to_be_bytes());
    slot[24..28].copy_from_slice(&1_000u32.to_be_bytes());
    slot[28..32].copy_from_slice(&2_000u32.to_be_bytes());
    slot[32..34].copy_from_slice(&(1024 + index as u16).to_be_bytes());
    slot[34..36].copy_from_slice(&443u16.to_be_bytes());
    slot[37] = 0x18;
    slot[38] = 6;
    slot[40..42].copy_from_slice(&64512u16.to_be_bytes());
    slot[42..44].copy_from_slice(&64513u16.to_be_bytes());
    slot[44] = 24;
    slot[45] = 24;
    slot
}

/// Mock 导出器配置
#[derive(Debug, Clone)]
pub struct MockExporterConfig {
    /// 发送频率 (datagram/s)
    pub rate_hz: f64,

    /// 每个报文的记录数
    pub records_per_datagram: usize,

    /// 发送总数上限，None = 直到 stop
    pub max_datagrams: Option<u64>,
}

impl Default for MockExporterConfig {
    fn default() -> Self {
        Self {
            rate_hz: 100.0,
            records_per_datagram: 5,
            max_datagrams: None,
        }
    }
}

/// Mock 导出器
///
/// 模拟路由器向采集器发送 v5 报文，FlowSequence 按已发送记录数递增。
pub struct MockExporter {
    socket: Arc<UdpSocket>,
    target: SocketAddr,
    running: Arc<AtomicBool>,
    sent: Arc<AtomicU64>,
}

impl MockExporter {
    /// 绑定本地临时端口，目标为 `target`
    pub async fn connect(target: SocketAddr) -> std::io::Result<Self> {
        let local: SocketAddr = if target.is_ipv4() {
            ([127, 0, 0, 1], 0).into()
        } else {
            (std::net::Ipv6Addr::LOCALHOST, 0).into()
        };
        let socket = UdpSocket::bind(local).await?;
        Ok(Self {
            socket: Arc::new(socket),
            target,
            running: Arc::new(AtomicBool::new(false)),
            sent: Arc::new(AtomicU64::new(0)),
        })
    }

    /// 发送单个报文
    pub async fn send(&self, datagram: &[u8]) -> std::io::Result<usize> {
        let written = self.socket.send_to(datagram, self.target).await?;
        self.sent.fetch_add(1, Ordering::Relaxed);
        Ok(written)
    }

    /// 已发送报文数
    pub fn sent(&self) -> u64 {
        self.sent.load(Ordering::Relaxed)
    }

    /// 是否在周期发送中
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// 按配置的频率周期发送，直到 `stop` 或达到上限
    pub fn start(&self, config: MockExporterConfig) -> tokio::task::JoinHandle<()> {
        let socket = self.socket.clone();
        let target = self.target;
        let running = self.running.clone();
        let sent = self.sent.clone();

        running.store(true, Ordering::SeqCst);

        tokio::spawn(async move {
            let interval = Duration::from_secs_f64(1.0 / config.rate_hz.max(f64::MIN_POSITIVE));
            let mut ticker = tokio::time::interval(interval);
            let mut flow_sequence: u32 = 0;
            let mut count: u64 = 0;

            debug!(%target, rate_hz = config.rate_hz, "mock exporter started");

            while running.load(Ordering::SeqCst) {
                if config.max_datagrams.is_some_and(|max| count >= max) {
                    break;
                }
                ticker.tick().await;

                let datagram = DatagramBuilder::new()
                    .flow_sequence(flow_sequence)
                    .with_records(config.records_per_datagram)
                    .build();

                match socket.send_to(&datagram, target).await {
                    Ok(_) => {
                        sent.fetch_add(1, Ordering::Relaxed);
                        trace!(%target, flow_sequence, "mock datagram sent");
                    }
                    Err(e) => warn!(%target, error = %e, "mock datagram send failed"),
                }

                flow_sequence =
                    flow_sequence.wrapping_add(config.records_per_datagram as u32);
                count += 1;
            }

            running.store(false, Ordering::SeqCst);
            debug!(%target, count, "mock exporter stopped");
        })
    }

    /// 停止周期发送
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_layout() {
        let datagram = DatagramBuilder::new()
            .flow_sequence(77)
            .engine(2, 9)
            .sampling(1, 100)
            .with_records(3)
            .build();

        assert_eq!(datagram.len(), HEADER_LENGTH + 3 * RECORD_LENGTH);
        assert_eq!(&datagram[0..2], &[0, 5]);
        assert_eq!(&datagram[2..4], &[0, 3]);
        assert_eq!(&datagram[16..20], &77u32.to_be_bytes());
        assert_eq!(datagram[20], 2);
        assert_eq!(datagram[21], 9);
        assert_eq!(&datagram[22..24], &0x4064u16.to_be_bytes());
        // 第二条记录的源地址
        assert_eq!(&datagram[HEADER_LENGTH + RECORD_LENGTH..][..4], &[10, 0, 0, 1]);
    }

    #[test]
    fn test_declared_count_override() {
        let datagram = DatagramBuilder::new().with_records(1).declared_count(30).build();
        assert_eq!(&datagram[2..4], &30u16.to_be_bytes());
        assert_eq!(datagram.len(), HEADER_LENGTH + RECORD_LENGTH);
    }

    #[tokio::test]
    async fn test_exporter_sends_datagrams() {
        let receiver = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let exporter = MockExporter::connect(receiver.local_addr().unwrap())
            .await
            .unwrap();

        let datagram = DatagramBuilder::new().with_records(2).build();
        exporter.send(&datagram).await.unwrap();

        let mut buf = [0u8; 4096];
        let (n, _) = receiver.recv_from(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], &datagram[..]);
        assert_eq!(exporter.sent(), 1);
    }

    #[tokio::test]
    async fn test_exporter_periodic_with_limit() {
        let receiver = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let exporter = MockExporter::connect(receiver.local_addr().unwrap())
            .await
            .unwrap();

        let handle = exporter.start(MockExporterConfig {
            rate_hz: 1000.0,
            records_per_datagram: 1,
            max_datagrams: Some(3),
        });
        handle.await.unwrap();

        assert_eq!(exporter.sent(), 3);
        assert!(!exporter.is_running());

        let mut buf = [0u8; 4096];
        for _ in 0..3 {
            let (n, _) = receiver.recv_from(&mut buf).await.unwrap();
            assert_eq!(n, HEADER_LENGTH + RECORD_LENGTH);
        }
    }
}
