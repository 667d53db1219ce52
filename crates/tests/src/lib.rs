//! # Integration Tests
//!
//! 集成测试与端到端测试。
//!
//! 负责：
//! - 配置 → 组件装配
//! - 模拟 e2e 测试：MockExporter → UDP → 解码 → 分批 → 文件 sink
//! - 文件与消息总线同时接收全部 flow

#[cfg(test)]
mod config_tests {
    use config_loader::{ConfigFormat, ConfigLoader};
    use ingestion::ListenerConfig;

    #[test]
    fn test_config_drives_listener() {
        let config = ConfigLoader::load_from_str(
            r#"{
                "ListenParams": ":9995",
                "MaxInFlightDecodes": 8,
                "Output": { "ChunkSize": 10, "LocalFS": { "Enabled": true, "Path": "/tmp/flows" } },
                "ConfigV5Header": { "EngineID": false }
            }"#,
            ConfigFormat::Json,
        )
        .unwrap();

        let listener = ListenerConfig::from_collector(&config);
        assert_eq!(listener.bind_address, "0.0.0.0:9995");
        assert_eq!(listener.max_in_flight_decodes, Some(8));
        assert!(!listener.header_fields.engine_id);
        assert!(listener.record_fields.src_addr);
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::net::SocketAddr;
    use std::path::{Path, PathBuf};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use accumulator::{run_accumulator, AccumulatorStats};
    use async_channel::Receiver;
    use contracts::{
        ContractError, Delivery, DfsConfig, EncodedFlow, FlowPublisher, KafkaConfig,
        LocalFsConfig, OutputConfig, RecordFields,
    };
    use dispatcher::{create_dispatcher, run_bus_sink, BusMetrics, BusSnapshot};
    use ingestion::{
        DatagramBuilder, FlowFanout, FlowListener, ListenerConfig, MetricsSnapshot,
        MockExporter, MockExporterConfig, Overflow,
    };
    use serde_json::Value;
    use tokio::sync::{mpsc, oneshot};
    use tokio::task::JoinHandle;

    /// 记录所有发布内容的 publisher
    struct RecordingPublisher {
        sent: Arc<Mutex<Vec<String>>>,
    }

    impl FlowPublisher for RecordingPublisher {
        fn name(&self) -> &str {
            "kafka"
        }

        async fn publish(&mut self, flow: &EncodedFlow) -> Result<Delivery, ContractError> {
            let mut sent = self.sent.lock().unwrap();
            sent.push(flow.as_str().to_string());
            Ok(Delivery {
                partition: 0,
                offset: sent.len() as i64 - 1,
            })
        }

        async fn close(&mut self) -> Result<(), ContractError> {
            Ok(())
        }
    }

    struct Outcome {
        ingestion: MetricsSnapshot,
        accumulator: AccumulatorStats,
        bus: Option<BusSnapshot>,
    }

    /// listener → fan-out → accumulator → dispatcher(file sink) [+ bus]
    struct Harness {
        addr: SocketAddr,
        dir: PathBuf,
        stop_tx: oneshot::Sender<()>,
        listener: JoinHandle<MetricsSnapshot>,
        fanout: FlowFanout,
        accumulator: JoinHandle<AccumulatorStats>,
        dispatcher: JoinHandle<Vec<(String, dispatcher::MetricsSnapshot)>>,
        bus: Option<JoinHandle<BusSnapshot>>,
    }

    impl Harness {
        async fn start(
            dir: &Path,
            chunk_size: usize,
            record_fields: RecordFields,
            bus: Option<Arc<Mutex<Vec<String>>>>,
        ) -> Self {
            let mut builder = FlowFanout::builder();
            let flows = builder.subscribe("accumulator", 256, Overflow::Wait);
            let bus = bus.map(|sent| {
                let rx: Receiver<EncodedFlow> = builder.subscribe("kafka", 256, Overflow::Wait);
                tokio::spawn(run_bus_sink(
                    RecordingPublisher { sent },
                    rx,
                    Arc::new(BusMetrics::new()),
                ))
            });
            let fanout = builder.build();

            let output = OutputConfig {
                chunk_size,
                sink_queue_capacity: 16,
                local_fs: LocalFsConfig {
                    enabled: true,
                    path: dir.display().to_string(),
                },
                dfs: DfsConfig::default(),
                kafka: KafkaConfig::default(),
            };
            let (batch_tx, batch_rx) = mpsc::channel(16);
            let dispatcher = create_dispatcher(&output, batch_rx).await.unwrap().spawn();
            let accumulator = tokio::spawn(run_accumulator(flows, chunk_size, batch_tx));

            let listener = FlowListener::bind(
                ListenerConfig {
                    bind_address: "127.0.0.1:0".into(),
                    record_fields,
                    ..Default::default()
                },
                fanout.clone(),
            )
            .await
            .unwrap();
            let addr = listener.local_addr().unwrap();

            let (stop_tx, stop_rx) = oneshot::channel::<()>();
            let listener = tokio::spawn(listener.run_until(async move {
                let _ = stop_rx.await;
            }));

            Self {
                addr,
                dir: dir.to_path_buf(),
                stop_tx,
                listener,
                fanout,
                accumulator,
                dispatcher,
                bus,
            }
        }

        /// 等待第 `count` 个批次文件出现
        async fn wait_for_batches(&self, count: usize) {
            let last = self.dir.join(format!("{count}flow.json"));
            for _ in 0..250 {
                if last.exists() {
                    return;
                }
                tokio::time::sleep(Duration::from_millis(20)).await;
            }
            panic!("batch file {} never appeared", last.display());
        }

        async fn stop(self) -> Outcome {
            self.stop_tx.send(()).unwrap();
            let ingestion = self.listener.await.unwrap();
            self.fanout.close();
            drop(self.fanout);

            let accumulator = self.accumulator.await.unwrap();
            self.dispatcher.await.unwrap();
            let bus = match self.bus {
                Some(handle) => Some(handle.await.unwrap()),
                None => None,
            };

            Outcome {
                ingestion,
                accumulator,
                bus,
            }
        }
    }

    fn read_batch(dir: &Path, sequence: usize) -> Vec<Value> {
        let content = std::fs::read_to_string(dir.join(format!("{sequence}flow.json"))).unwrap();
        serde_json::from_str(&content).unwrap()
    }

    async fn send_all(addr: SocketAddr, datagrams: &[Vec<u8>]) {
        let exporter = MockExporter::connect(addr).await.unwrap();
        for datagram in datagrams {
            exporter.send(datagram).await.unwrap();
            // loopback 上逐个发送，避免接收缓冲区溢出
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
    }

    #[tokio::test]
    async fn test_e2e_batches_are_valid_json() {
        let temp = tempfile::tempdir().unwrap();
        let harness = Harness::start(temp.path(), 3, RecordFields::all(), None).await;

        let datagrams: Vec<Vec<u8>> = (0..6u32)
            .map(|n| {
                DatagramBuilder::new()
                    .flow_sequence(n * 4)
                    .records(4, |slot| {
                        slot[0..4].copy_from_slice(&[10, 0, 0, 1]);
                        slot[38] = 6;
                    })
                    .build()
            })
            .collect();
        send_all(harness.addr, &datagrams).await;
        harness.wait_for_batches(2).await;
        let outcome = harness.stop().await;

        assert_eq!(outcome.ingestion.flows_decoded, 6);
        assert_eq!(outcome.accumulator.batches_emitted, 2);
        assert_eq!(outcome.accumulator.flows_pending, 0);

        for sequence in 1..=2 {
            let flows = read_batch(temp.path(), sequence);
            assert_eq!(flows.len(), 3);
            for flow in &flows {
                assert_eq!(flow["Header"]["Version"], 5);
                assert_eq!(flow["Header"]["Count"], 4);
                let records = flow["Records"].as_array().unwrap();
                assert_eq!(records.len(), 4);
                assert_eq!(records[0]["SrcAddr"], "10.0.0.1");
                assert_eq!(records[0]["Prot"], 6);
            }
        }
        assert!(!temp.path().join("3flow.json").exists());
    }

    #[tokio::test]
    async fn test_e2e_periodic_exporter_stream() {
        let temp = tempfile::tempdir().unwrap();
        let harness = Harness::start(temp.path(), 3, RecordFields::all(), None).await;

        let exporter = MockExporter::connect(harness.addr).await.unwrap();
        exporter
            .start(MockExporterConfig {
                rate_hz: 200.0,
                records_per_datagram: 2,
                max_datagrams: Some(6),
            })
            .await
            .unwrap();
        assert_eq!(exporter.sent(), 6);

        harness.wait_for_batches(2).await;
        let outcome = harness.stop().await;
        assert_eq!(outcome.ingestion.flows_decoded, 6);
        assert_eq!(outcome.accumulator.batches_emitted, 2);

        // FlowSequence 按已发送记录数递增
        let mut sequences: Vec<u64> = (1..=2)
            .flat_map(|sequence| read_batch(temp.path(), sequence))
            .map(|flow| flow["Header"]["FlowSequence"].as_u64().unwrap())
            .collect();
        sequences.sort_unstable();
        assert_eq!(sequences, vec![0, 2, 4, 6, 8, 10]);
    }

    #[tokio::test]
    async fn test_e2e_malformed_datagrams_are_dropped() {
        let temp = tempfile::tempdir().unwrap();
        let harness = Harness::start(temp.path(), 2, RecordFields::all(), None).await;

        let datagrams = vec![
            DatagramBuilder::new().with_records(1).build(),
            vec![0u8; 10],
            DatagramBuilder::new().version(9).with_records(1).build(),
            DatagramBuilder::new().with_records(2).build(),
        ];
        send_all(harness.addr, &datagrams).await;
        harness.wait_for_batches(1).await;
        let outcome = harness.stop().await;

        assert_eq!(outcome.ingestion.datagrams_received, 4);
        assert_eq!(outcome.ingestion.datagrams_dropped, 2);
        assert_eq!(outcome.ingestion.flows_decoded, 2);
        assert_eq!(read_batch(temp.path(), 1).len(), 2);
    }

    #[tokio::test]
    async fn test_e2e_partial_batch_not_written() {
        let temp = tempfile::tempdir().unwrap();
        let harness = Harness::start(temp.path(), 4, RecordFields::all(), None).await;
        let datagrams: Vec<Vec<u8>> = (0..7)
            .map(|_| DatagramBuilder::new().with_records(1).build())
            .collect();
        send_all(harness.addr, &datagrams).await;
        harness.wait_for_batches(1).await;
        // 剩余 3 个 flow 留在缓冲区
        tokio::time::sleep(Duration::from_millis(200)).await;
        let outcome = harness.stop().await;

        assert_eq!(outcome.accumulator.flows_received, 7);
        assert_eq!(outcome.accumulator.batches_emitted, 1);
        assert_eq!(outcome.accumulator.flows_pending, 3);
        assert_eq!(read_batch(temp.path(), 1).len(), 4);
        assert!(!temp.path().join("2flow.json").exists());
    }

    #[tokio::test]
    async fn test_e2e_truncated_and_toggled_fields() {
        let temp = tempfile::tempdir().unwrap();
        let record_fields = RecordFields {
            tos: false,
            src_port: false,
            ..RecordFields::all()
        };
        let harness = Harness::start(temp.path(), 1, record_fields, None).await;

        let datagram = DatagramBuilder::new()
            .declared_count(30)
            .records(2, |slot| {
                slot[32..34].copy_from_slice(&443u16.to_be_bytes());
                slot[34..36].copy_from_slice(&8080u16.to_be_bytes());
                slot[39] = 0x10;
            })
            .build();
        send_all(harness.addr, &[datagram]).await;
        harness.wait_for_batches(1).await;
        let outcome = harness.stop().await;

        assert_eq!(outcome.ingestion.truncated, 1);
        let flows = read_batch(temp.path(), 1);
        assert_eq!(flows[0]["Header"]["Count"], 30);
        let records = flows[0]["Records"].as_array().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0]["DstPort"], 8080);
        assert_eq!(records[0]["SrcPort"], 0);
        assert_eq!(records[0]["Tos"], 0);
    }

    #[tokio::test]
    async fn test_e2e_file_and_bus_receive_every_flow() {
        let temp = tempfile::tempdir().unwrap();
        let sent = Arc::new(Mutex::new(Vec::new()));
        let harness =
            Harness::start(temp.path(), 2, RecordFields::all(), Some(sent.clone())).await;

        let datagrams: Vec<Vec<u8>> = (0..4u32)
            .map(|n| DatagramBuilder::new().flow_sequence(n).with_records(1).build())
            .collect();
        send_all(harness.addr, &datagrams).await;
        harness.wait_for_batches(2).await;
        let outcome = harness.stop().await;

        let bus = outcome.bus.unwrap();
        assert_eq!(bus.published, 4);
        assert_eq!(bus.failed, 0);

        let mut bus_sequences: Vec<u64> = sent
            .lock()
            .unwrap()
            .iter()
            .map(|json| {
                let flow: Value = serde_json::from_str(json).unwrap();
                flow["Header"]["FlowSequence"].as_u64().unwrap()
            })
            .collect();
        bus_sequences.sort_unstable();
        assert_eq!(bus_sequences, vec![0, 1, 2, 3]);

        let mut file_sequences: Vec<u64> = (1..=2)
            .flat_map(|sequence| read_batch(temp.path(), sequence))
            .map(|flow| flow["Header"]["FlowSequence"].as_u64().unwrap())
            .collect();
        file_sequences.sort_unstable();
        assert_eq!(file_sequences, bus_sequences);
    }
}
