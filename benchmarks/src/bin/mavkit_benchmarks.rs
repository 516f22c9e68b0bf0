use std::alloc::System;
use std::thread;
use std::time::Duration;

#[cfg(feature = "async")]
use mavkit_benchmarks::asnc::benchmark_async_duplex;
#[cfg(feature = "sync")]
use mavkit_benchmarks::sync::{benchmark_codegen, benchmark_stream_parser, benchmark_tcp_stream};

#[global_allocator]
static GLOBAL: mavkit_benchmarks::trallocator::Trallocator<System> =
    mavkit_benchmarks::trallocator::Trallocator::new(System);

#[allow(dead_code)]
fn debug_memory(name: &str, before: u64) {
    let immediate = GLOBAL.get().saturating_sub(before);

    thread::sleep(Duration::from_millis(100));
    let soon = GLOBAL.get().saturating_sub(before);

    log::info!("[{name}] memory used: {immediate} bytes, after 100ms: {soon} bytes",);
}

#[tokio::main]
async fn main() {
    GLOBAL.reset();

    // Setup logger
    env_logger::builder()
        .filter_level(log::LevelFilter::Info) // Suppress everything below `info` for third-party modules.
        .filter_module(env!("CARGO_PKG_NAME"), log::LevelFilter::Trace) // Allow everything from current package
        .init();

    #[cfg(feature = "sync")]
    {
        {
            log::info!("[benchmark_stream_parser]");
            let base_mem = GLOBAL.get();
            benchmark_stream_parser(100_000, 64);
            debug_memory("benchmark_stream_parser", base_mem);
        }

        {
            log::info!("[benchmark_tcp_stream]");
            let base_mem = GLOBAL.get();
            benchmark_tcp_stream(10, 10_000);
            debug_memory("benchmark_tcp_stream", base_mem);
        }

        {
            log::info!("[benchmark_codegen]");
            let base_mem = GLOBAL.get();
            benchmark_codegen(100);
            debug_memory("benchmark_codegen", base_mem);
        }
    }

    #[cfg(feature = "async")]
    {
        log::info!("[benchmark_async_duplex]");
        let base_mem = GLOBAL.get();
        benchmark_async_duplex(10, 10_000).await;
        debug_memory("benchmark_async_duplex", base_mem);
    }
}

#[cfg(test)]
mod benchmark_tests {
    #[test]
    #[cfg(feature = "sync")]
    fn run_benchmark_stream_parser() {
        super::benchmark_stream_parser(1_000, 7);
    }

    #[test]
    #[cfg(feature = "sync")]
    fn run_benchmark_tcp_stream() {
        super::benchmark_tcp_stream(2, 100);
    }

    #[test]
    #[cfg(feature = "sync")]
    fn run_benchmark_codegen() {
        super::benchmark_codegen(2);
    }

    #[tokio::test]
    #[cfg(feature = "async")]
    async fn run_benchmark_async_duplex() {
        super::benchmark_async_duplex(2, 100).await;
    }
}
