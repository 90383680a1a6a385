//! rawsend: build one raw-ingest v1 frame and send it over TCP.
//!
//! Register areas take 16-bit values; bit areas take 0/1 values which are
//! packed LSB-first before sending.

use std::io::{Read, Write};
use std::net::TcpStream;

use anyhow::{bail, Context};
use clap::{Parser, ValueEnum};

use memcore::Area;
use memsrv::transport::rawingest::{IngestHeader, STATUS_OK};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum AreaArg {
    Coils,
    DiscreteInputs,
    HoldingRegisters,
    InputRegisters,
}

impl From<AreaArg> for Area {
    fn from(arg: AreaArg) -> Self {
        match arg {
            AreaArg::Coils => Area::Coils,
            AreaArg::DiscreteInputs => Area::DiscreteInputs,
            AreaArg::HoldingRegisters => Area::HoldingRegisters,
            AreaArg::InputRegisters => Area::InputRegisters,
        }
    }
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Send a raw-ingest write frame to memsrv")]
struct Args {
    /// Target host:port of the raw-ingest gate
    #[arg(long, default_value = "127.0.0.1:4667")]
    target: String,

    /// Memory identity: listening port of the target memory
    #[arg(long)]
    port: u16,

    /// Memory identity: unit id of the target memory
    #[arg(long)]
    unit: u16,

    /// Target area
    #[arg(long, value_enum)]
    area: AreaArg,

    /// Start address of the write window
    #[arg(long)]
    address: u16,

    /// Values to write: 16-bit words for register areas, 0/1 for bit areas
    #[arg(required = true)]
    values: Vec<u16>,
}

fn pack_bits(values: &[u16]) -> anyhow::Result<Vec<u8>> {
    let mut payload = vec![0u8; (values.len() + 7) / 8];
    for (i, &v) in values.iter().enumerate() {
        match v {
            0 => {}
            1 => payload[i / 8] |= 1 << (i % 8),
            _ => bail!("bit areas accept only 0 or 1, got {v}"),
        }
    }
    Ok(payload)
}

fn pack_words(values: &[u16]) -> Vec<u8> {
    let mut payload = Vec::with_capacity(values.len() * 2);
    for &v in values {
        payload.extend_from_slice(&v.to_be_bytes());
    }
    payload
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let area = Area::from(args.area);

    let count = args.values.len() as u16;
    let payload = if area.is_bit_area() {
        pack_bits(&args.values)?
    } else {
        pack_words(&args.values)
    };

    let header = IngestHeader {
        flags: 0,
        area,
        unit_id: args.unit,
        port: args.port,
        address: args.address,
        count,
    };

    let mut stream =
        TcpStream::connect(&args.target).with_context(|| format!("connect {}", args.target))?;

    stream.write_all(&header.to_bytes())?;
    stream.write_all(&payload)?;

    let mut status = [0u8; 1];
    stream.read_exact(&mut status)?;

    if status[0] == STATUS_OK {
        println!("ok: wrote {count} value(s) to {area} @ {}", args.address);
        Ok(())
    } else {
        bail!("rejected (status 0x{:02X})", status[0]);
    }
}
