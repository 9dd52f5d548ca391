use criterion::{Criterion, black_box, criterion_group, criterion_main};
use tuyalan_core::{Command, Frame, FrameCodec, ProtocolVersion};

const KEY: &[u8; 16] = b"f33444a6362a9664";

fn bench_encode(c: &mut Criterion) {
    let payload = br#"{"devId":"13684365e0980607986f","dps":{"1":true,"2":0,"3":"white"}}"#;

    for version in [ProtocolVersion::V33, ProtocolVersion::V34] {
        let codec = FrameCodec::new(KEY, version).unwrap();
        let frame = Frame::new(Command::Control, 1, payload.to_vec());

        c.bench_function(&format!("encode_v{}", version), |b| {
            b.iter(|| codec.encode(black_box(&frame), true).unwrap())
        });
    }
}

fn bench_parse(c: &mut Criterion) {
    let payload = br#"{"devId":"13684365e0980607986f","dps":{"1":true,"2":0,"3":"white"}}"#;

    for version in [ProtocolVersion::V33, ProtocolVersion::V34] {
        let codec = FrameCodec::new(KEY, version).unwrap();
        let wire = codec
            .encode(&Frame::new(Command::Control, 1, payload.to_vec()), true)
            .unwrap();

        c.bench_function(&format!("parse_v{}", version), |b| {
            b.iter(|| codec.parse(black_box(&wire)).unwrap())
        });
    }
}

fn bench_split(c: &mut Criterion) {
    let codec = FrameCodec::new(KEY, ProtocolVersion::V33).unwrap();
    let mut chunk = Vec::new();
    for seq in 1..=16 {
        chunk.extend_from_slice(&codec.encode(&Frame::new(Command::Status, seq, "{}"), true).unwrap());
    }

    c.bench_function("split_16_packets", |b| {
        b.iter(|| codec.split_packets(black_box(&chunk)).len())
    });
}

criterion_group!(benches, bench_encode, bench_parse, bench_split);
criterion_main!(benches);
