//! Demonstrates scope lifecycle logging with tracing.
//!
//! Run with: cargo run --example tracing_demo

use std::time::Duration;

use sluice::prelude::*;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    tracing::info!("Opening pool and cache in parallel");

    let result = pool()
        .par_zip(cache())
        .flat_map(|(pool, cache)| session(pool, cache))
        .use_(&(), |session| pure(session.len()))
        .await;

    match result {
        Ok(n) => tracing::info!("Session used, {} bytes of id", n),
        Err(e) => tracing::error!("Session failed: {}", e),
    }

    tracing::info!("Leaking an allocated resource");
    if let Ok((_, release)) = cache().allocated(&()).await {
        drop(release);
    }
}

fn pool() -> Resource<&'static str, String> {
    Resource::make(
        from_async(|_: &()| async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            Ok::<_, String>("pool")
        })
        .instrument(tracing::info_span!("acquire", resource = "pool")),
        |_| async {
            tracing::info!("pool drained");
            Ok(())
        },
    )
}

fn cache() -> Resource<&'static str, String> {
    Resource::make(pure("cache"), |_| async {
        tracing::info!("cache flushed");
        Ok(())
    })
    .instrument(tracing::info_span!("acquire", resource = "cache"))
}

fn session(pool: &'static str, cache: &'static str) -> Resource<String, String> {
    Resource::make_case(
        pure(format!("session({}, {})", pool, cache)),
        |id, case| async move {
            tracing::info!(%case, "closing {}", id);
            Ok(())
        },
    )
}
