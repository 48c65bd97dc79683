use anyhow::{Context, Result};
use log::{debug, info};
use num_traits::cast::cast;
use podcrawl_game::{EngineConfig, GamePhase, GameSession};
use serde::Serialize;

use super::policy::{DrawDecision, PlayerPolicy, ShopDecision, Strategy};

/// Upper bound on draw-phase decisions per encounter.
const MAX_DRAW_DECISIONS: usize = 4;

/// Outcome of one automated run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunRecord {
    pub seed: u64,
    pub strategy: String,
    pub depth_reached: u32,
    pub game_over: bool,
    pub final_health: u32,
    pub final_currency: u32,
    pub treasure_earned: u32,
    pub currency_spent: u32,
    pub purchases: u32,
    pub full_redraws: u32,
    pub selective_redraws: u32,
    pub checks_cleared: u32,
    pub rng_draws: u64,
}

impl RunRecord {
    fn new(seed: u64, strategy: Strategy) -> Self {
        Self {
            seed,
            strategy: strategy.label().to_string(),
            depth_reached: 0,
            game_over: false,
            final_health: 0,
            final_currency: 0,
            treasure_earned: 0,
            currency_spent: 0,
            purchases: 0,
            full_redraws: 0,
            selective_redraws: 0,
            checks_cleared: 0,
            rng_draws: 0,
        }
    }
}

/// Play one seeded run until game over or `max_depth` encounters are resolved.
///
/// # Errors
///
/// Returns an error if the session cannot be built from `config`.
pub fn play_run(
    config: &EngineConfig,
    seed: u64,
    strategy: Strategy,
    max_depth: u32,
) -> Result<RunRecord> {
    let mut session = GameSession::from_seed(config.clone(), seed)
        .with_context(|| format!("building session for seed {seed}"))?;
    let mut policy = strategy.create_policy(seed);
    let mut record = RunRecord::new(seed, strategy);
    info!("seed {seed}: starting {} run", policy.name());

    let _ = session.start_new_game();
    while session.phase() == GamePhase::Draw {
        play_draw(&mut session, policy.as_mut(), &mut record);
        let _ = session.confirm_draw();
        if let Some(result) = session.last_result() {
            record.treasure_earned = record.treasure_earned.saturating_add(result.currency_gained);
            record.checks_cleared += u32::from(result.thresholds_cleared);
        }
        if session.phase() == GamePhase::GameOver || session.depth() >= max_depth {
            break;
        }
        if policy.visits_shop() {
            play_shop(&mut session, policy.as_mut(), &mut record);
        }
        let _ = session.skip_shop();
    }

    record.depth_reached = session.depth();
    record.game_over = session.phase() == GamePhase::GameOver;
    record.final_health = session.player().health;
    record.final_currency = session.player().currency;
    record.rng_draws = session.rng().draws();
    info!(
        "seed {seed}: {} run ended at depth {} (game over: {})",
        policy.name(),
        record.depth_reached,
        record.game_over
    );
    Ok(record)
}

fn play_draw(session: &mut GameSession, policy: &mut dyn PlayerPolicy, record: &mut RunRecord) {
    for _ in 0..MAX_DRAW_DECISIONS {
        let applied = match policy.plan_draw(session) {
            DrawDecision::Keep => break,
            DrawDecision::RedrawAll => {
                let applied = session.redraw_all().is_applied();
                record.full_redraws += u32::from(applied);
                applied
            }
            DrawDecision::RedrawSelected(ids) => {
                for id in ids {
                    let _ = session.toggle_token_selection(id);
                }
                let applied = session.redraw_selected().is_applied();
                record.selective_redraws += u32::from(applied);
                applied
            }
        };
        if !applied {
            break;
        }
    }
}

fn play_shop(session: &mut GameSession, policy: &mut dyn PlayerPolicy, record: &mut RunRecord) {
    if !session.proceed_to_shop().is_applied() {
        return;
    }
    let ShopDecision::Buy { offer, replace } = policy.plan_shop(session) else {
        return;
    };
    let Some(cost) = session.shop_offer().get(offer).map(|template| template.cost) else {
        return;
    };
    let _ = session.select_pod_to_replace(replace);
    let outcome = session.purchase_offer(offer);
    if outcome.is_applied() {
        record.purchases += 1;
        record.currency_spent = record.currency_spent.saturating_add(cost);
    } else if let Some(rejection) = outcome.rejection() {
        debug!("seed {}: purchase refused: {rejection}", record.seed);
    }
}

/// Play every seed × strategy combination, `iterations` runs each with
/// consecutive seeds.
///
/// # Errors
///
/// Returns the first session construction failure.
pub fn run_matrix(
    config: &EngineConfig,
    seeds: &[u64],
    strategies: &[Strategy],
    iterations: usize,
    max_depth: u32,
) -> Result<Vec<RunRecord>> {
    let mut records = Vec::with_capacity(seeds.len() * strategies.len() * iterations);
    for &strategy in strategies {
        for &seed in seeds {
            for offset in 0..u64::try_from(iterations).unwrap_or(u64::MAX) {
                let run_seed = seed.wrapping_add(offset);
                records.push(play_run(config, run_seed, strategy, max_depth)?);
            }
        }
    }
    Ok(records)
}

/// Aggregated statistics for one strategy.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StrategySummary {
    pub strategy: String,
    pub runs: usize,
    pub game_overs: usize,
    pub mean_depth: f64,
    pub best_depth: u32,
    pub mean_treasure: f64,
    pub purchases: u32,
}

#[must_use]
pub fn summarize(records: &[RunRecord]) -> Vec<StrategySummary> {
    let mut labels: Vec<&str> = Vec::new();
    for record in records {
        if !labels.contains(&record.strategy.as_str()) {
            labels.push(&record.strategy);
        }
    }

    labels
        .into_iter()
        .map(|label| {
            let runs: Vec<&RunRecord> = records.iter().filter(|r| r.strategy == label).collect();
            let depth_sum: u64 = runs.iter().map(|r| u64::from(r.depth_reached)).sum();
            let treasure_sum: u64 = runs.iter().map(|r| u64::from(r.treasure_earned)).sum();
            StrategySummary {
                strategy: label.to_string(),
                runs: runs.len(),
                game_overs: runs.iter().filter(|r| r.game_over).count(),
                mean_depth: mean(depth_sum, runs.len()),
                best_depth: runs.iter().map(|r| r.depth_reached).max().unwrap_or(0),
                mean_treasure: mean(treasure_sum, runs.len()),
                purchases: runs.iter().map(|r| r.purchases).sum(),
            }
        })
        .collect()
}

fn mean(sum: u64, count: usize) -> f64 {
    match (cast::<u64, f64>(sum), cast::<usize, f64>(count)) {
        (Some(sum), Some(count)) if count > 0.0 => sum / count,
        _ => 0.0,
    }
}
