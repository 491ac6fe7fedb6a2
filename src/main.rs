//! Arena Turn Server
//!
//! Runs the WebSocket turn server, or with `--demo` plays one perfect turn
//! of every game through the session layer and audits the records.

use std::sync::Arc;

use anyhow::Context;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use arena_turns::{
    VERSION,
    audit::verify_record,
    config::EngineConfig,
    game::{autoplay, GameType},
    network::{ManualClock, ServerClock, ServerConfig, TurnManager, TurnServer},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("Arena turn engine v{}", VERSION);

    let engine = EngineConfig::from_env().context("loading engine config")?;

    if std::env::args().any(|a| a == "--demo") {
        return demo(&engine).await;
    }

    let config = ServerConfig::from_env().context("reading server config")?;
    let server = TurnServer::new(config, engine);
    server.run().await?;
    Ok(())
}

/// Play every game once with its perfect script.
async fn demo(engine: &EngineConfig) -> anyhow::Result<()> {
    info!("=== Demo: one perfect turn per game ===");

    let clock = Arc::new(ManualClock::new(1_700_000_000_000));
    let turns = TurnManager::with_clock(clock.clone());
    let mut gaps = [610u64, 840, 530, 720, 660, 950, 580].into_iter().cycle();

    for game in GameType::ALL {
        let created = turns.create(game, engine.game(game), "demo-player").await;
        let token = created.turn_token;

        let spec = {
            let turn = turns.get(&token).await?;
            let session = turn.lock().await;
            session.spec().clone()
        };

        let start_ts = clock.now_ms();
        let events = autoplay::play(&spec, start_ts, || gaps.next().unwrap_or(700));
        for event in events {
            clock.set(event.server_ts_ms);
            turns.event(&token, &event.kind, event.payload, None).await?;
        }

        let result = turns.complete(&token).await?;
        let record = turns.record(&token).await?;
        let report = verify_record(&record).with_context(|| format!("auditing {game}"))?;

        if result.valid {
            info!(
                "{:<16} score {:>5}  elapsed {:>6} ms  events {:>3}  spec {}",
                game.as_str(),
                result.score.unwrap_or(0),
                result.elapsed_ms.unwrap_or(0),
                record.events.len(),
                &report.spec_digest[..12],
            );
        } else {
            warn!("{:<16} rejected: {:?}", game.as_str(), result.reason);
        }

        turns.remove(&token).await;
        clock.advance(60_000);
    }

    info!("=== Demo complete ===");
    Ok(())
}
