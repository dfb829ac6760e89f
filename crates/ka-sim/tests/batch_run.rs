//! End-to-end batch runs: reproducibility, CSV logs, table cache and reports

use std::fs;

use ka_engine::{BonusKind, CashoutStrategy, GameConfig, GameContext, PlayMode};
use ka_sim::{
    BONUS_CSV_FILE, BatchRunner, ROUNDS_CSV_FILE, SimConfig, SimulationReport, TableCache,
    open_csv_sinks,
};

fn context(config: GameConfig) -> GameContext {
    GameContext::new(config).unwrap()
}

// ═══════════════════════════════════════════════════════════════════════════════
// REPRODUCIBILITY
// ═══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_seeded_batches_repeat_exactly() {
    let ctx = context(GameConfig::ascent_100());
    let config = SimConfig::quick()
        .with_rounds(5_000)
        .with_mode(PlayMode::BaseWithFreeBonuses)
        .with_seed(2718);

    let a = BatchRunner::new(&ctx, config.clone()).unwrap().run(&mut []).unwrap();
    let b = BatchRunner::new(&ctx, config.with_parallel(true).with_chunk_size(333))
        .unwrap()
        .run(&mut [])
        .unwrap();

    assert_eq!(a.stats, b.stats);
    assert_eq!(a.stats.total_rounds, 5_000);
    assert_eq!(
        a.stats.crashes + a.stats.cash_outs + a.stats.reached_top,
        a.stats.total_rounds
    );
}

#[test]
fn test_different_seeds_differ() {
    let ctx = context(GameConfig::ascent_50());
    let run = |seed| {
        BatchRunner::new(&ctx, SimConfig::quick().with_rounds(2_000).with_seed(seed))
            .unwrap()
            .run(&mut [])
            .unwrap()
            .stats
    };
    assert_ne!(run(1), run(2));
}

// ═══════════════════════════════════════════════════════════════════════════════
// CSV OUTPUT
// ═══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_csv_logs_are_written() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = context(GameConfig::ascent_50());
    let config = SimConfig::quick()
        .with_rounds(400)
        .with_mode(PlayMode::BonusBuy(BonusKind::Dragon))
        .with_cashout(CashoutStrategy::Fixed(30))
        .with_output_dir(dir.path().display().to_string());

    let runner = BatchRunner::new(&ctx, config.clone()).unwrap();
    let mut sinks = open_csv_sinks(&config, &ctx, dir.path()).unwrap();
    let outcome = runner.run(&mut sinks).unwrap();
    drop(sinks);

    let rounds = fs::read_to_string(dir.path().join(ROUNDS_CSV_FILE)).unwrap();
    let mut lines = rounds.lines();
    assert_eq!(
        lines.next().unwrap(),
        "Game Number,Final Step,Multiplier,Outcome,Winnings,Cost,Crash Point,Cashout Point,Used Bonus"
    );
    let rows: Vec<_> = lines.collect();
    assert_eq!(rows.len(), 400);
    assert!(rows[0].starts_with("1,"));
    assert!(rows[399].starts_with("400,"));
    assert!(rows.iter().all(|r| r.split(',').nth(7) == Some("30")));

    let bonus = fs::read_to_string(dir.path().join(BONUS_CSV_FILE)).unwrap();
    let bonus_rows = bonus.lines().count() - 1;
    assert_eq!(bonus_rows as u64, outcome.stats.bonus_activations);
    assert!(bonus.starts_with(
        "Game Number,Current Step,Result Step,Cost,RTP,Game Crash Point,Redistributed Crash Point\n"
    ));
}

#[test]
fn test_disabled_logs_are_not_created() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = context(GameConfig::ascent_50());
    let mut config = SimConfig::quick().with_rounds(10);
    config.write_rounds_csv = false;

    let sinks = open_csv_sinks(&config, &ctx, dir.path()).unwrap();
    assert_eq!(sinks.len(), 1);
    assert!(!dir.path().join(ROUNDS_CSV_FILE).exists());
    assert!(dir.path().join(BONUS_CSV_FILE).exists());
}

// ═══════════════════════════════════════════════════════════════════════════════
// TABLE CACHE + REPORT
// ═══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_cached_table_drives_identical_runs() {
    let dir = tempfile::tempdir().unwrap();
    let game = GameConfig::ascent_50();
    let cache = TableCache::new(dir.path().join(TableCache::default_file_name(&game)));

    let table = cache.load_or_generate(&game).unwrap();
    let cached = GameContext::with_table(game.clone(), cache.load().unwrap()).unwrap();
    let fresh = context(game);
    assert_eq!(cached.table(), &table);
    assert_eq!(cached.crash(), fresh.crash());

    let config = SimConfig::quick().with_rounds(1_000);
    let a = BatchRunner::new(&cached, config.clone()).unwrap().run(&mut []).unwrap();
    let b = BatchRunner::new(&fresh, config).unwrap().run(&mut []).unwrap();
    assert_eq!(a.stats, b.stats);
}

#[test]
fn test_report_reflects_the_batch() {
    let ctx = context(GameConfig::ascent_100());
    let config = SimConfig::quick()
        .with_rounds(2_000)
        .with_mode(PlayMode::BonusBuy(BonusKind::Mystic));
    let outcome = BatchRunner::new(&ctx, config.clone()).unwrap().run(&mut []).unwrap();
    let report = SimulationReport::new(&ctx, &config, &outcome);

    let text = report.to_text();
    assert!(text.contains("Mystic bonus buy RTP:"));
    assert!(text.contains("Total Rounds: 2000"));
    assert!(text.contains(" 101 |"));

    let json: serde_json::Value = serde_json::from_str(&report.to_json()).unwrap();
    assert_eq!(json["stats"]["speed_names"][2], "Swift");
    assert_eq!(json["tables"]["crash_table"].as_array().unwrap().len(), 100);
}
