//! Datagrams over loopback UDP into the router.

use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;
use std::time::Duration;

use lapsync_service::{ServiceConfig, UdpReceiver};
use lapsync_telemetry_packets::{
    LapDataEntry, LapDataPacket, Packet, PacketHeader, ProtocolEpoch, SessionPacket, SessionType,
};
use lapsync_telemetry_session::{GameVersionRouter, LapHeuristics};
use lapsync_telemetry_sync::RecordingGateway;
use tokio::net::UdpSocket;
use tokio::sync::broadcast;

type TestResult = Result<(), Box<dyn std::error::Error>>;

fn loopback_config() -> ServiceConfig {
    ServiceConfig {
        bind_addr: IpAddr::V4(Ipv4Addr::LOCALHOST),
        udp_port: 0,
        recv_timeout_ms: 20,
        ..ServiceConfig::default()
    }
}

fn datagram(epoch: ProtocolEpoch, uid: u64, frame: u32, packet: &Packet) -> Option<Vec<u8>> {
    let header = PacketHeader::new(epoch.packet_format(), packet.kind().id(), uid, frame);
    epoch.encode(&header, packet)
}

#[tokio::test]
async fn loopback_datagrams_build_a_session() -> TestResult {
    let epoch = ProtocolEpoch::F2021;
    let session = Packet::Session(SessionPacket {
        session_type_code: 10,
        session_type: Some(SessionType::Race),
        track_id: 3,
        ..SessionPacket::default()
    });
    let lap = Packet::LapData(LapDataPacket {
        entries: vec![LapDataEntry {
            current_lap_num: 1,
            lap_distance: 25.0,
            current_lap_time_ms: 400,
            car_position: 1,
            ..LapDataEntry::default()
        }],
        ..LapDataPacket::default()
    });
    let mut garbage = 1999u16.to_le_bytes().to_vec();
    garbage.resize(40, 0);
    let datagrams = vec![
        datagram(epoch, 0xBEEF, 1, &session).ok_or("session datagram")?,
        datagram(epoch, 0xBEEF, 2, &lap).ok_or("lap datagram")?,
        garbage,
    ];

    let mut receiver = UdpReceiver::bind(&loopback_config()).await?;
    let target = receiver.local_addr()?;
    let gateway = Arc::new(RecordingGateway::new());
    let mut router = GameVersionRouter::new(gateway.clone(), LapHeuristics::default());
    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);

    let sender = tokio::spawn(async move {
        let socket = UdpSocket::bind((Ipv4Addr::LOCALHOST, 0)).await?;
        for raw in &datagrams {
            socket.send_to(raw, target).await?;
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        tokio::time::sleep(Duration::from_millis(200)).await;
        shutdown_tx
            .send(())
            .map_err(|e| std::io::Error::other(e.to_string()))?;
        Ok::<_, std::io::Error>(())
    });

    let report = receiver.run(&mut router, shutdown_rx).await;
    sender.await??;

    assert_eq!(report.datagrams, 3);
    assert_eq!(report.metrics.datagrams_received, 3);
    assert_eq!(report.metrics.packets_applied, 2);
    assert_eq!(report.metrics.unknown_formats, 1);
    assert_eq!(router.active_epoch(), Some(ProtocolEpoch::F2021));

    let session = router.session().ok_or("session")?;
    assert_eq!(session.uid, 0xBEEF);
    assert_eq!(session.laps.current_lap_number(), Some(1));
    assert!(gateway.laps().is_empty());
    Ok(())
}

#[tokio::test]
async fn oversized_config_buffer_is_honoured() -> TestResult {
    let config = ServiceConfig {
        max_datagram_size: 4096,
        ..loopback_config()
    };
    config.validate()?;
    let mut receiver = UdpReceiver::bind(&config).await?;
    let mut router = GameVersionRouter::new(
        Arc::new(RecordingGateway::new()),
        LapHeuristics::default(),
    );
    let target = receiver.local_addr()?;

    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    let sender = tokio::spawn(async move {
        let socket = UdpSocket::bind((Ipv4Addr::LOCALHOST, 0)).await?;
        socket.send_to(&[0u8; 3000], target).await?;
        tokio::time::sleep(Duration::from_millis(150)).await;
        shutdown_tx
            .send(())
            .map_err(|e| std::io::Error::other(e.to_string()))?;
        Ok::<_, std::io::Error>(())
    });

    let report = receiver.run(&mut router, shutdown_rx).await;
    sender.await??;
    assert_eq!(report.datagrams, 1);
    assert_eq!(report.bytes, 3000);
    assert_eq!(report.metrics.dropped(), 1);
    Ok(())
}
