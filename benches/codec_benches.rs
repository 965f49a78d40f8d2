use criterion::{black_box, criterion_group, criterion_main, Criterion};
use wago_io::{
    decode_inputs, encode_outputs, scan_position, ModbusResponse, ReadWordsRequest, RegisterSpace,
    WriteWordsRequest,
};

fn bench_image_codec(c: &mut Criterion) {
    let inputs = [0u16, 8191, 16383, 32767, 2000, 2250, 1000, 3000, 0x00A5];
    let flags = [true, false, true, false, false, true, false, true];

    c.bench_function("decode_inputs", |b| {
        b.iter(|| decode_inputs(black_box(&inputs)))
    });
    c.bench_function("encode_outputs", |b| {
        b.iter(|| encode_outputs(black_box(&[16383, 24575]), black_box(&flags)))
    });
    c.bench_function("scan_position", |b| {
        b.iter(|| scan_position(black_box(1_000_003), black_box(8)))
    });
}

fn bench_frames(c: &mut Criterion) {
    c.bench_function("read_inputs_request", |b| {
        b.iter(|| {
            ReadWordsRequest::new(black_box(1), 1, RegisterSpace::InputRegister, 0, 9)
                .map(|req| req.to_bytes())
        })
    });
    c.bench_function("write_outputs_request", |b| {
        b.iter(|| {
            WriteWordsRequest::new(black_box(2), 1, 0, &[16383, 24575, 0x0005])
                .map(|req| req.to_bytes())
        })
    });

    let mut reply = vec![0x00, 0x01, 0x00, 0x00, 0x00, 0x15, 0x01, 0x04, 0x12];
    for word in [0u16, 8191, 16383, 32767, 2000, 2250, 1000, 3000, 0x00A5] {
        reply.extend_from_slice(&word.to_be_bytes());
    }
    c.bench_function("parse_read_inputs_response", |b| {
        b.iter(|| {
            ModbusResponse::from_bytes(black_box(&reply)).and_then(|response| {
                response.check(1, 0x04)?;
                response.to_words(9)
            })
        })
    });
}

criterion_group!(benches, bench_image_codec, bench_frames);
criterion_main!(benches);
