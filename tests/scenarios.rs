//! End-to-end turn scenarios.
//!
//! Drives turns through the public API the way a server would: generate,
//! record events with a controlled clock, complete, audit.

use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::json;

use arena_turns::audit::verify_record;
use arena_turns::config::EngineConfig;
use arena_turns::game::rotation::RotationSpec;
use arena_turns::game::{self, autoplay, Event, FailureReason, GameType, TurnSpec};
use arena_turns::network::{ManualClock, ServerClock, SessionLimits, TurnError, TurnManager};
use arena_turns::GameConfig;

const ROTATION_TILES: [u64; 7] = [0, 2, 2, 4, 7, 7, 7];

/// 3x3 board needing seven clicks: tile 0 once, tile 2 twice, tile 4 once,
/// tile 7 three times.
fn rotation_turn(config: &GameConfig) -> TurnSpec {
    TurnSpec::wrap(config, RotationSpec::new(3, 0, vec![90, 0, 180, 0, 90, 0, 0, 270, 0]))
}

fn rotation_events(gaps: &[i64]) -> Vec<Event> {
    let mut ts = 50_000;
    let mut events = vec![Event::new("start", json!({}), ts)];
    for (tile, gap) in ROTATION_TILES.iter().zip(gaps) {
        ts += gap;
        events.push(Event::new("rotate", json!({ "tile": tile }), ts));
    }
    events.push(Event::new("finish", json!({}), ts + 300));
    events
}

// =============================================================================
// TIMING BOUNDARY
// =============================================================================

#[test]
fn test_human_pace_accepted_bot_pace_rejected() {
    let spec = rotation_turn(&GameConfig::for_game(GameType::ImageRotation));
    let mut rng = StdRng::seed_from_u64(42);

    for _ in 0..20 {
        let gaps: Vec<i64> = (0..ROTATION_TILES.len()).map(|_| rng.gen_range(450..=750)).collect();
        let result = game::validate(&spec, &rotation_events(&gaps));
        assert!(result.valid, "gaps {gaps:?}: {result:?}");
        assert!(!result.flag);
        assert_eq!(result.metrics.mistakes, 0);
    }

    let result = game::validate(&spec, &rotation_events(&[10; 7]));
    assert_eq!(result.reason, Some(FailureReason::ImpossibleSpeed));
    assert!(result.flag);
    assert_eq!(result.score, None);
}

#[test]
fn test_tightened_thresholds_from_engine_config() {
    let engine = EngineConfig::from_json(
        r#"{"games":{"image_rotation":{"timing":{"gap_floor_ms":1000}}}}"#,
    )
    .unwrap();
    let spec = rotation_turn(&engine.game(GameType::ImageRotation));

    let result = game::validate(&spec, &rotation_events(&[800; 7]));
    assert_eq!(result.reason, Some(FailureReason::ImpossibleSpeed));

    // Same input under the stock thresholds is fine
    let stock = rotation_turn(&GameConfig::for_game(GameType::ImageRotation));
    let gaps = [800, 650, 900, 700, 850, 600, 750];
    assert!(game::validate(&stock, &rotation_events(&gaps)).valid);
}

#[test]
fn test_faster_turn_scores_higher() {
    let spec = rotation_turn(&GameConfig::for_game(GameType::ImageRotation));
    let quick = game::validate(&spec, &rotation_events(&[600, 700, 650, 800, 620, 710, 680]));
    let slow = game::validate(&spec, &rotation_events(&[2_600, 2_700, 2_650, 2_800, 2_620, 2_710, 2_680]));
    assert!(quick.valid && slow.valid);
    assert!(quick.score > slow.score);
}

#[test]
fn test_every_game_accepts_jittered_perfect_play() {
    let mut rng = StdRng::seed_from_u64(7);
    for game_type in GameType::ALL {
        for n in 11..14u64 {
            let mut bytes = [0u8; 32];
            bytes[..8].copy_from_slice(&n.to_le_bytes());
            let seed = arena_turns::Seed(bytes);
            let spec = game::generate(game_type, &seed, &GameConfig::for_game(game_type));
            let events = autoplay::play(&spec, 1_000_000, || rng.gen_range(450..=750));
            let result = game::validate(&spec, &events);
            assert!(result.valid, "{game_type} #{n}: {result:?}");
            assert!(result.score.is_some_and(|s| s > 0), "{game_type}");
        }
    }
}

// =============================================================================
// SESSION FLOW
// =============================================================================

#[tokio::test]
async fn test_turn_through_manager_is_auditable() {
    let clock = Arc::new(ManualClock::new(1_700_000_000_000));
    let turns = TurnManager::with_clock(clock.clone());
    let mut rng = StdRng::seed_from_u64(99);

    for game_type in GameType::ALL {
        let created = turns.create(game_type, GameConfig::for_game(game_type), "player-1").await;
        let token = created.turn_token;

        let spec = {
            let turn = turns.get(&token).await.unwrap();
            let session = turn.lock().await;
            session.spec().clone()
        };
        assert_eq!(game::project(&spec), created.client_spec);

        for event in autoplay::play(&spec, clock.now_ms(), || rng.gen_range(450..=750)) {
            clock.set(event.server_ts_ms);
            turns.event(&token, &event.kind, event.payload, None).await.unwrap();
        }

        let result = turns.complete(&token).await.unwrap();
        assert!(result.valid, "{game_type}: {result:?}");

        let record = turns.record(&token).await.unwrap();
        let report = verify_record(&record).unwrap();
        assert_eq!(report.result, result);
        assert_eq!(report.game_type, game_type);

        turns.remove(&token).await;
    }
    assert_eq!(turns.turn_count().await, 0);
}

#[tokio::test]
async fn test_completion_is_idempotent_and_final() {
    let clock = Arc::new(ManualClock::new(5_000));
    let turns = TurnManager::with_clock(clock.clone());
    let token = turns
        .create(GameType::MemoryMatch, GameConfig::for_game(GameType::MemoryMatch), "player-2")
        .await
        .turn_token;

    turns.start(&token).await.unwrap();
    clock.advance(700);
    let ack = turns.event(&token, "flip", json!({"card": 0}), None).await.unwrap();
    assert!(ack.reveal.is_some_and(|r| r["card"] == 0));

    let first = turns.complete(&token).await.unwrap();
    assert_eq!(first.reason, Some(FailureReason::Incomplete));

    clock.advance(60_000);
    let second = turns.complete(&token).await.unwrap();
    assert_eq!(first, second);

    let late = turns.event(&token, "flip", json!({"card": 1}), None).await;
    assert!(matches!(late, Err(TurnError::AlreadyCompleted)));
}

#[tokio::test]
async fn test_late_input_after_solve_keeps_result() {
    let clock = Arc::new(ManualClock::new(0));
    let turns = TurnManager::with_clock(clock.clone());
    let mut config = GameConfig::for_game(GameType::Maze);
    config.time_limit_ms = 600_000;
    let token = turns.create(GameType::Maze, config, "player-4").await.turn_token;
    let spec = {
        let turn = turns.get(&token).await.unwrap();
        let session = turn.lock().await;
        session.spec().clone()
    };

    let mut events = autoplay::play(&spec, 0, || 900);
    let finish = events.pop().unwrap();
    for event in events {
        clock.set(event.server_ts_ms);
        turns.event(&token, &event.kind, event.payload, None).await.unwrap();
    }
    let solved_at = clock.now_ms();

    // Wandering off long after the last checkpoint
    clock.set(solved_at + 100_000);
    turns.event(&token, "move", json!({"dir": "up"}), None).await.unwrap();
    clock.advance(finish.server_ts_ms - solved_at);
    turns.event(&token, &finish.kind, finish.payload, None).await.unwrap();

    let result = turns.complete(&token).await.unwrap();
    assert!(result.valid, "{result:?}");
    assert_eq!(result.elapsed_ms, Some(solved_at as u64));
}

#[tokio::test]
async fn test_finished_turns_do_not_accumulate() {
    let clock = Arc::new(ManualClock::new(1_000));
    let turns = TurnManager::with_clock(clock.clone());

    for i in 0..200 {
        let token = turns
            .create(GameType::SequenceRecall, GameConfig::for_game(GameType::SequenceRecall), &format!("p-{i}"))
            .await
            .turn_token;
        turns.start(&token).await.unwrap();
        clock.advance(50);
        turns.complete(&token).await.unwrap();
    }
    assert_eq!(turns.turn_count().await, 200);

    clock.advance(SessionLimits::default().completed_retention_ms);
    assert_eq!(turns.cleanup().await, 200);
    assert_eq!(turns.turn_count().await, 0);
}

#[tokio::test]
async fn test_slow_turn_times_out() {
    let clock = Arc::new(ManualClock::new(0));
    let turns = TurnManager::with_clock(clock.clone());
    let mut config = GameConfig::for_game(GameType::ImageRotation);
    config.time_limit_ms = 10_000;

    let token = turns.create(GameType::ImageRotation, config, "player-3").await.turn_token;
    let spec = {
        let turn = turns.get(&token).await.unwrap();
        let session = turn.lock().await;
        session.spec().clone()
    };

    // Perfect play, but far past the limit and its grace window
    for event in autoplay::play(&spec, 0, || 16_000) {
        clock.set(event.server_ts_ms);
        turns.event(&token, &event.kind, event.payload, None).await.unwrap();
    }

    let result = turns.complete(&token).await.unwrap();
    assert_eq!(result.reason, Some(FailureReason::Timeout));
    assert!(!result.flag);
    assert!(result.player_view().message.is_some());
}

#[test]
fn test_bot_rejection_hidden_from_player() {
    let spec = rotation_turn(&GameConfig::for_game(GameType::ImageRotation));
    let result = game::validate(&spec, &rotation_events(&[15; 7]));
    assert!(result.flag);

    let view = result.player_view();
    assert!(!view.valid);
    assert_eq!(view.reason, None);
    let json = serde_json::to_string(&view).unwrap();
    assert!(!json.contains("impossible_speed"));
}
