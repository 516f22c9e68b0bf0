use std::io::BufWriter;
use std::net::{TcpListener, TcpStream};
use std::thread;
use std::time::SystemTime;

use mavkit::codegen::{Generator, Target};
use mavkit::io::{FrameReader, FrameWriter};
use mavkit::protocol::{Encoder, MavLinkVersion, ParserEvent, StreamParser};
use mavkit::schema::{DialectLoader, MemoryResolver};

use crate::{common_table, sample_messages};

fn encode_stream(n_frames: usize) -> Vec<u8> {
    let table = common_table();
    let messages = sample_messages();
    let mut encoder = Encoder::new(MavLinkVersion::V2, 1, 1);

    let mut stream = Vec::new();
    for i in 0..n_frames {
        let frame = encoder
            .encode_value(&messages[i % messages.len()], &table)
            .unwrap();
        stream.extend(frame.to_bytes());
        // Line noise between frames
        if i % 7 == 0 {
            stream.extend([0x00, 0x55, 0xAA]);
        }
    }
    stream
}

pub fn benchmark_stream_parser(n_frames: usize, chunk_size: usize) {
    let stream = encode_stream(n_frames);
    let mut parser = StreamParser::new(common_table());

    let start = SystemTime::now();
    let mut n_received = 0;
    for chunk in stream.chunks(chunk_size) {
        n_received += parser
            .feed(chunk)
            .filter(|e| matches!(e, ParserEvent::Frame(_)))
            .count();
    }
    let duration = SystemTime::now().duration_since(start).unwrap();

    assert_eq!(n_received, n_frames);
    log::info!(
        "[benchmark_stream_parser] {n_frames} frames ({} bytes) in chunks of {chunk_size}: {}s, ({}us per frame)",
        stream.len(),
        duration.as_secs_f32(),
        (duration.as_secs_f64() / n_frames as f64 * 1_000_000.0) as f32
    );
    log::debug!("[benchmark_stream_parser] {:?}", parser.stats());
}

pub fn benchmark_tcp_stream(n_clients: u8, n_iter: usize) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();

    let mut clients = Vec::new();
    for i in 0..n_clients {
        clients.push(thread::spawn(move || {
            let stream = TcpStream::connect(addr).unwrap();
            let table = common_table();
            let messages = sample_messages();
            let mut writer = FrameWriter::new(
                BufWriter::new(stream),
                Encoder::new(MavLinkVersion::V2, i.wrapping_add(1), 1),
            );

            for j in 0..n_iter {
                if let Err(err) = writer.send_value(&messages[j % messages.len()], &table) {
                    log::debug!("[client #{i}] send error: {err:?}");
                    return;
                }
            }
            writer.flush().unwrap();
        }));
    }

    let start = SystemTime::now();
    let mut readers = Vec::new();
    for _ in 0..n_clients {
        let (stream, _) = listener.accept().unwrap();
        readers.push(thread::spawn(move || {
            FrameReader::new(stream, common_table())
                .map_while(|event| event.ok())
                .filter(|event| matches!(event, ParserEvent::Frame(_)))
                .count()
        }));
    }

    for client in clients {
        client.join().unwrap();
    }
    let n_received: usize = readers.into_iter().map(|r| r.join().unwrap()).sum();
    let duration = SystemTime::now().duration_since(start).unwrap();

    log::info!(
        "[benchmark_tcp_stream] {n_received} frames from {n_clients} clients: {}s, ({}us per frame)",
        duration.as_secs_f32(),
        (duration.as_secs_f64() / n_received.max(1) as f64 * 1_000_000.0) as f32
    );
}

pub fn benchmark_codegen(n_iter: usize) {
    let resolver = MemoryResolver::new()
        .with("minimal.xml", crate::MINIMAL_XML)
        .with("common.xml", crate::COMMON_XML);
    let loader = DialectLoader::new(resolver);
    let generator = Generator::builder()
        .target(Target::Rust)
        .target(Target::Python)
        .build();

    let start = SystemTime::now();
    let mut n_bytes = 0;
    for _ in 0..n_iter {
        let dialect = loader.load("common").unwrap();
        n_bytes += generator
            .render(&dialect)
            .unwrap()
            .iter()
            .map(|s| s.text().len())
            .sum::<usize>();
    }
    let duration = SystemTime::now().duration_since(start).unwrap();

    log::info!(
        "[benchmark_codegen] {n_iter} iterations, {n_bytes} bytes rendered: {}s, ({}ms per iteration)",
        duration.as_secs_f32(),
        (duration.as_secs_f64() / n_iter as f64 * 1_000.0) as f32
    );
}
