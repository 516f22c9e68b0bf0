use std::sync::Arc;
use std::time::SystemTime;

use tokio::sync::Barrier;
use tokio_stream::StreamExt;

use mavkit::io::{AsyncFrameReader, AsyncFrameWriter};
use mavkit::protocol::{Encoder, MavLinkVersion, ParserEvent};

use crate::{common_table, sample_messages};

const DUPLEX_BUFFER_SIZE: usize = 4096;

pub async fn benchmark_async_duplex(n_clients: u8, n_iter: usize) {
    let n_interaction = n_clients as usize * n_iter;
    let barrier = Arc::new(Barrier::new(n_clients as usize + 1));

    let mut readers = Vec::new();
    for i in 0..n_clients {
        let (client, server) = tokio::io::duplex(DUPLEX_BUFFER_SIZE);
        let barrier = barrier.clone();

        tokio::spawn(async move {
            let table = common_table();
            let messages = sample_messages();
            let mut writer = AsyncFrameWriter::new(
                client,
                Encoder::new(MavLinkVersion::V2, i.wrapping_add(1), 1),
            );
            barrier.wait().await;

            for j in 0..n_iter {
                if let Err(err) = writer
                    .send_value(&messages[j % messages.len()], &table)
                    .await
                {
                    log::error!("[client #{i}] send error: {err:?}");
                    break;
                }
            }
        });

        readers.push(tokio::spawn(async move {
            AsyncFrameReader::new(server, common_table())
                .into_stream()
                .filter(|event| matches!(event, Ok(ParserEvent::Frame(_))))
                .fold(0usize, |n, _| n + 1)
                .await
        }));
    }

    barrier.wait().await;
    log::info!("[benchmark_async_duplex] started");

    let start = SystemTime::now();
    let mut n_received_frames = 0;
    for reader in readers {
        match reader.await {
            Ok(n) => n_received_frames += n,
            Err(err) => log::error!("[server] error: {err:?}"),
        }
    }
    let duration = SystemTime::now().duration_since(start).unwrap();

    log::info!(
        "[benchmark_async_duplex] {n_received_frames}/{n_interaction} frames from {n_clients} clients: {}s, ({}us per frame)",
        duration.as_secs_f32(),
        (duration.as_secs_f64() / n_interaction.max(1) as f64 * 1_000_000.0) as f32
    );
}
