use anyhow::Result;
use colored::Colorize;
use podcrawl_game::{ScalingRow, ShopTier};
use serde::Serialize;
use std::io::Write;
use std::time::Duration;

use super::simulation::{RunRecord, StrategySummary};

#[derive(Serialize)]
struct JsonReport<'a> {
    summaries: &'a [StrategySummary],
    runs: &'a [RunRecord],
}

pub fn generate_console_report<W: Write + ?Sized>(
    writer: &mut W,
    records: &[RunRecord],
    summaries: &[StrategySummary],
    total_duration: Duration,
) -> Result<()> {
    writeln!(writer)?;
    writeln!(writer, "{}", "📊 Auto-play Results Summary".bright_cyan().bold())?;
    writeln!(writer, "{}", "============================".cyan())?;
    writeln!(writer, "Total runs: {}", records.len())?;
    writeln!(writer, "Total time: {total_duration:?}")?;
    writeln!(writer)?;

    for summary in summaries {
        writeln!(writer, "{}", summary.strategy.bold())?;
        writeln!(
            writer,
            "   Runs: {} ({} ended in game over)",
            summary.runs,
            summary.game_overs.to_string().red()
        )?;
        writeln!(
            writer,
            "   Depth: mean {:.1}, best {}",
            summary.mean_depth,
            summary.best_depth.to_string().green()
        )?;
        writeln!(writer, "   Mean treasure: {:.1}", summary.mean_treasure)?;
        writeln!(writer, "   Purchases: {}", summary.purchases)?;
        writeln!(writer)?;
    }

    if let Some(deepest) = records.iter().max_by_key(|r| r.depth_reached) {
        writeln!(writer, "{}", "⚡ Deepest Run".bright_yellow().bold())?;
        writeln!(writer, "{}", "=============".yellow())?;
        writeln!(
            writer,
            "{} seed {}: depth {}, {} purchases, {} redraws",
            deepest.strategy.green(),
            deepest.seed,
            deepest.depth_reached,
            deepest.purchases,
            deepest.full_redraws + deepest.selective_redraws
        )?;
    }
    Ok(())
}

pub fn generate_json_report<W: Write + ?Sized>(
    writer: &mut W,
    records: &[RunRecord],
    summaries: &[StrategySummary],
) -> Result<()> {
    let report = JsonReport {
        summaries,
        runs: records,
    };
    let json_output = serde_json::to_string_pretty(&report)?;
    writeln!(writer, "{json_output}")?;
    Ok(())
}

pub fn generate_markdown_report<W: Write + ?Sized>(
    writer: &mut W,
    records: &[RunRecord],
    summaries: &[StrategySummary],
) -> Result<()> {
    writeln!(writer, "# Podcrawl Auto-play Results\n")?;
    writeln!(writer, "## Summary\n")?;
    writeln!(
        writer,
        "| Strategy | Runs | Game overs | Mean depth | Best depth | Mean treasure | Purchases |"
    )?;
    writeln!(writer, "|---|---|---|---|---|---|---|")?;
    for s in summaries {
        writeln!(
            writer,
            "| {} | {} | {} | {:.1} | {} | {:.1} | {} |",
            s.strategy,
            s.runs,
            s.game_overs,
            s.mean_depth,
            s.best_depth,
            s.mean_treasure,
            s.purchases
        )?;
    }

    writeln!(writer, "\n## Runs\n")?;
    for r in records {
        let status = if r.game_over { "💀" } else { "✅" };
        writeln!(
            writer,
            "- {status} **{}** seed {}: depth {}, health {}, treasure {}, spent {}",
            r.strategy, r.seed, r.depth_reached, r.final_health, r.treasure_earned, r.currency_spent
        )?;
    }
    Ok(())
}

/// Threshold and reward table for balance inspection.
pub fn generate_scaling_preview<W, I>(writer: &mut W, rows: I) -> Result<()>
where
    W: Write + ?Sized,
    I: IntoIterator<Item = ScalingRow>,
{
    writeln!(writer, "Depth  Tier  Primary  Secondary  Reward")?;
    for row in rows {
        writeln!(
            writer,
            "{:>5}  {:>4}  {:>7}  {:>9}  {:>6}",
            row.depth,
            ShopTier::for_depth(row.depth).number(),
            row.primary_threshold,
            row.secondary_threshold,
            row.reward
        )?;
    }
    Ok(())
}
