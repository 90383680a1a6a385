//! Socket-level integration tests: real listeners, real client bytes.

use std::sync::Arc;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use authority::{Authority, MemoryPolicy, Rule};
use memcore::{Area, AreaLayout, Memory, MemoryId, MemoryLayouts, StateSealingDef, Store};
use memsrv::config::{ListenerConfig, ListenerProtocols};
use memsrv::ingress::run_gate;
use memsrv::transport::rawingest::{IngestHeader, STATUS_OK, STATUS_REJECTED};

struct Fixture {
    port: u16,
    memory: Arc<Memory>,
    auth: Arc<Authority>,
}

/// Bind an ephemeral listener, build a store keyed by its actual port, and
/// spawn the gate's accept loop.
async fn start_gate(protocols: ListenerProtocols, with_sealing: bool) -> Fixture {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    let mut memory = Memory::new(MemoryLayouts {
        coils: Some(AreaLayout::new(0, 64)),
        discrete_inputs: Some(AreaLayout::new(0, 32)),
        holding_registers: Some(AreaLayout::new(0, 64)),
        input_registers: Some(AreaLayout::new(0, 16)),
    })
    .unwrap();

    if with_sealing {
        memory.set_state_sealing(StateSealingDef {
            area: Area::Coils,
            address: 0,
        });
    }

    let memory = Arc::new(memory);
    let store = Arc::new(Store::new());
    store
        .add(MemoryId::new(port, 1), Arc::clone(&memory))
        .unwrap();

    let auth = Arc::new(Authority::new());
    auth.set_policy(
        MemoryId::new(port, 1),
        MemoryPolicy::new(vec![Rule::new(
            "test-any",
            &["0.0.0.0/0".to_string()],
            &[1, 2, 3, 4, 5, 6, 15, 16, 43],
        )
        .unwrap()]),
    );

    let gate = ListenerConfig {
        id: "test".into(),
        listen: String::new(),
        protocols,
        memory: Vec::new(),
    };

    let fixture = Fixture {
        port,
        memory,
        auth: Arc::clone(&auth),
    };

    tokio::spawn(run_gate(listener, gate, store, auth));

    fixture
}

fn modbus_gate() -> ListenerProtocols {
    ListenerProtocols {
        modbus: true,
        raw_ingest: false,
    }
}

fn raw_gate() -> ListenerProtocols {
    ListenerProtocols {
        modbus: false,
        raw_ingest: true,
    }
}

/// Send one Modbus request frame and read back the full response frame.
async fn roundtrip(stream: &mut TcpStream, unit: u8, fc: u8, payload: &[u8]) -> Vec<u8> {
    let mut frame = Vec::new();
    frame.extend_from_slice(&0x0042u16.to_be_bytes()); // transaction id
    frame.extend_from_slice(&0u16.to_be_bytes()); // protocol id
    frame.extend_from_slice(&((payload.len() as u16) + 2).to_be_bytes());
    frame.push(unit);
    frame.push(fc);
    frame.extend_from_slice(payload);

    stream.write_all(&frame).await.unwrap();

    let mut header = [0u8; 7];
    stream.read_exact(&mut header).await.unwrap();
    assert_eq!(&header[0..2], &[0x00, 0x42]);

    let length = u16::from_be_bytes([header[4], header[5]]) as usize;
    let mut pdu = vec![0u8; length - 1];
    stream.read_exact(&mut pdu).await.unwrap();
    pdu
}

#[tokio::test]
async fn modbus_write_then_read_registers() {
    let fixture = start_gate(modbus_gate(), false).await;
    let mut stream = TcpStream::connect(("127.0.0.1", fixture.port)).await.unwrap();

    let pdu = roundtrip(
        &mut stream,
        1,
        0x10,
        &[0x00, 0x05, 0x00, 0x02, 0x04, 0x12, 0x34, 0xAB, 0xCD],
    )
    .await;
    assert_eq!(pdu, vec![0x10, 0x00, 0x05, 0x00, 0x02]);

    let pdu = roundtrip(&mut stream, 1, 0x03, &[0x00, 0x05, 0x00, 0x02]).await;
    assert_eq!(pdu, vec![0x03, 0x04, 0x12, 0x34, 0xAB, 0xCD]);
}

#[tokio::test]
async fn modbus_coil_write_and_read() {
    let fixture = start_gate(modbus_gate(), false).await;
    let mut stream = TcpStream::connect(("127.0.0.1", fixture.port)).await.unwrap();

    let pdu = roundtrip(&mut stream, 1, 0x05, &[0x00, 0x07, 0xFF, 0x00]).await;
    assert_eq!(pdu, vec![0x05, 0x00, 0x07, 0xFF, 0x00]);

    let pdu = roundtrip(&mut stream, 1, 0x01, &[0x00, 0x07, 0x00, 0x01]).await;
    assert_eq!(pdu, vec![0x01, 0x01, 0x01]);
}

#[tokio::test]
async fn modbus_unknown_unit_denials() {
    let fixture = start_gate(modbus_gate(), false).await;
    let mut stream = TcpStream::connect(("127.0.0.1", fixture.port)).await.unwrap();

    // Unit 9 has no store entry and no policy: the authority denies first
    // with illegal function.
    let pdu = roundtrip(&mut stream, 9, 0x03, &[0x00, 0x00, 0x00, 0x01]).await;
    assert_eq!(pdu, vec![0x83, 0x01]);

    // With a policy in place but still no memory, dispatch resolution fails
    // with illegal data address.
    fixture.auth.set_policy(
        MemoryId::new(fixture.port, 9),
        MemoryPolicy::new(vec![Rule::new(
            "unit9",
            &["0.0.0.0/0".to_string()],
            &[3],
        )
        .unwrap()]),
    );

    let pdu = roundtrip(&mut stream, 9, 0x03, &[0x00, 0x00, 0x00, 0x01]).await;
    assert_eq!(pdu, vec![0x83, 0x02]);
}

#[tokio::test]
async fn modbus_policy_denial_maps_to_exception() {
    let fixture = start_gate(modbus_gate(), false).await;

    // Replace the policy with one that only allows reads.
    fixture.auth.set_policy(
        MemoryId::new(fixture.port, 1),
        MemoryPolicy::new(vec![Rule::new(
            "readonly",
            &["0.0.0.0/0".to_string()],
            &[3],
        )
        .unwrap()]),
    );

    let mut stream = TcpStream::connect(("127.0.0.1", fixture.port)).await.unwrap();

    let pdu = roundtrip(&mut stream, 1, 0x03, &[0x00, 0x00, 0x00, 0x01]).await;
    assert_eq!(pdu[0], 0x03);

    let pdu = roundtrip(&mut stream, 1, 0x06, &[0x00, 0x00, 0x00, 0x2A]).await;
    assert_eq!(pdu, vec![0x86, 0x01]);

    // The connection survives a denial.
    let pdu = roundtrip(&mut stream, 1, 0x03, &[0x00, 0x00, 0x00, 0x01]).await;
    assert_eq!(pdu[0], 0x03);
}

#[tokio::test]
async fn modbus_sealing_bit_gates_every_request() {
    let fixture = start_gate(modbus_gate(), true).await;
    let mut stream = TcpStream::connect(("127.0.0.1", fixture.port)).await.unwrap();

    // Fresh memory: flag bit is 0 -> sealed -> Device Busy, even though the
    // policy allows everything.
    let pdu = roundtrip(&mut stream, 1, 0x03, &[0x00, 0x01, 0x00, 0x01]).await;
    assert_eq!(pdu, vec![0x83, 0x06]);

    // Unseal through the administrative side (direct bit write).
    fixture
        .memory
        .write_bits(Area::Coils, 0, 1, &[1])
        .unwrap();

    let pdu = roundtrip(&mut stream, 1, 0x03, &[0x00, 0x01, 0x00, 0x01]).await;
    assert_eq!(pdu, vec![0x03, 0x02, 0x00, 0x00]);
}

#[tokio::test]
async fn modbus_authority_sealing_flag_overrides_rules() {
    let fixture = start_gate(modbus_gate(), false).await;
    let id = MemoryId::new(fixture.port, 1);
    let mut stream = TcpStream::connect(("127.0.0.1", fixture.port)).await.unwrap();

    fixture.auth.sealing().seal(id);
    let pdu = roundtrip(&mut stream, 1, 0x03, &[0x00, 0x00, 0x00, 0x01]).await;
    assert_eq!(pdu, vec![0x83, 0x06]);

    fixture.auth.sealing().unseal(id);
    let pdu = roundtrip(&mut stream, 1, 0x03, &[0x00, 0x00, 0x00, 0x01]).await;
    assert_eq!(pdu[0], 0x03);
}

#[tokio::test]
async fn raw_ingest_write_lands_in_memory() {
    let fixture = start_gate(raw_gate(), false).await;
    let mut stream = TcpStream::connect(("127.0.0.1", fixture.port)).await.unwrap();

    let header = IngestHeader {
        flags: 0,
        area: Area::HoldingRegisters,
        unit_id: 1,
        port: fixture.port,
        address: 10,
        count: 2,
    };

    stream.write_all(&header.to_bytes()).await.unwrap();
    stream.write_all(&[0x12, 0x34, 0xAB, 0xCD]).await.unwrap();

    let mut status = [0u8; 1];
    stream.read_exact(&mut status).await.unwrap();
    assert_eq!(status[0], STATUS_OK);

    let mut out = [0u8; 4];
    fixture
        .memory
        .read_registers(Area::HoldingRegisters, 10, 2, &mut out)
        .unwrap();
    assert_eq!(out, [0x12, 0x34, 0xAB, 0xCD]);

    // The loop continues across successful frames.
    stream.write_all(&header.to_bytes()).await.unwrap();
    stream.write_all(&[0x00, 0x01, 0x00, 0x02]).await.unwrap();
    stream.read_exact(&mut status).await.unwrap();
    assert_eq!(status[0], STATUS_OK);
}

#[tokio::test]
async fn raw_ingest_bad_magic_rejects_and_terminates() {
    let fixture = start_gate(raw_gate(), false).await;
    let mut stream = TcpStream::connect(("127.0.0.1", fixture.port)).await.unwrap();

    let mut bytes = IngestHeader {
        flags: 0,
        area: Area::HoldingRegisters,
        unit_id: 1,
        port: fixture.port,
        address: 0,
        count: 1,
    }
    .to_bytes();
    bytes[0] = 0xDE;
    bytes[1] = 0xAD;

    stream.write_all(&bytes).await.unwrap();

    let mut status = [0u8; 1];
    stream.read_exact(&mut status).await.unwrap();
    assert_eq!(status[0], STATUS_REJECTED);

    // Server tore the connection down without waiting for payload bytes.
    let n = stream.read(&mut [0u8; 8]).await.unwrap();
    assert_eq!(n, 0);
}

#[tokio::test]
async fn raw_ingest_unknown_identity_rejects_and_terminates() {
    let fixture = start_gate(raw_gate(), false).await;
    let mut stream = TcpStream::connect(("127.0.0.1", fixture.port)).await.unwrap();

    let header = IngestHeader {
        flags: 0,
        area: Area::HoldingRegisters,
        unit_id: 99,
        port: fixture.port,
        address: 0,
        count: 1,
    };

    stream.write_all(&header.to_bytes()).await.unwrap();
    stream.write_all(&[0x00, 0x01]).await.unwrap();

    let mut status = [0u8; 1];
    stream.read_exact(&mut status).await.unwrap();
    assert_eq!(status[0], STATUS_REJECTED);

    let n = stream.read(&mut [0u8; 8]).await.unwrap();
    assert_eq!(n, 0);
}

#[tokio::test]
async fn requests_are_processed_in_arrival_order() {
    let fixture = start_gate(modbus_gate(), false).await;
    let mut stream = TcpStream::connect(("127.0.0.1", fixture.port)).await.unwrap();

    // Pipeline several writes to the same register; the final read must see
    // the last value, proving in-order processing on one connection.
    for value in [1u16, 2, 3, 4, 5] {
        let mut payload = vec![0x00, 0x00];
        payload.extend_from_slice(&value.to_be_bytes());
        let pdu = roundtrip(&mut stream, 1, 0x06, &payload).await;
        assert_eq!(pdu[0], 0x06);
    }

    let pdu = roundtrip(&mut stream, 1, 0x03, &[0x00, 0x00, 0x00, 0x01]).await;
    assert_eq!(pdu, vec![0x03, 0x02, 0x00, 0x05]);
}
