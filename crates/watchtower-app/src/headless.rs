//! Headless simulation runs and their JSON reports.

use anyhow::Result;
use serde::Serialize;
use tracing::info;
use watchtower_core::{TickSummary, World, WorldConfig};

/// Everything recorded during a headless run.
#[derive(Debug, Clone, Serialize)]
pub struct HeadlessReport {
    pub config: WorldConfig,
    pub frames: Vec<TickSummary>,
    pub summary: ReportSummary,
}

/// Totals across every simulated tick.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReportSummary {
    pub ticks_simulated: u64,
    pub final_agent_count: usize,
    pub total_enters: u64,
    pub total_leaves: u64,
    pub mean_visible_pairs: f64,
    pub peak_visible_pairs: usize,
}

impl ReportSummary {
    fn from_frames(frames: &[TickSummary]) -> Self {
        let Some(last) = frames.last() else {
            return Self::default();
        };
        let visible_sum: usize = frames.iter().map(|frame| frame.visible_pairs).sum();
        Self {
            ticks_simulated: frames.len() as u64,
            final_agent_count: last.agents,
            total_enters: frames.iter().map(|frame| frame.enters).sum(),
            total_leaves: frames.iter().map(|frame| frame.leaves).sum(),
            mean_visible_pairs: visible_sum as f64 / frames.len() as f64,
            peak_visible_pairs: frames
                .iter()
                .map(|frame| frame.visible_pairs)
                .max()
                .unwrap_or(0),
        }
    }
}

/// Upper bound on frames reserved ahead of a run; longer runs grow on demand.
const MAX_RESERVED_FRAMES: usize = 4096;

fn frame_capacity(ticks: u64) -> usize {
    usize::try_from(ticks)
        .unwrap_or(usize::MAX)
        .min(MAX_RESERVED_FRAMES)
}

/// Populate a world from `config` and step it `ticks` times.
pub fn run_headless(config: WorldConfig, ticks: u64) -> Result<HeadlessReport> {
    let mut world = World::new(config.clone())?;
    world.populate()?;
    info!(
        agents = world.agent_count(),
        ticks, "starting headless run"
    );

    let mut frames = Vec::with_capacity(frame_capacity(ticks));
    for _ in 0..ticks {
        frames.push(world.step()?);
    }
    world.grid().check_consistency()?;

    let summary = ReportSummary::from_frames(&frames);
    info!(
        ticks_simulated = summary.ticks_simulated,
        final_agents = summary.final_agent_count,
        total_enters = summary.total_enters,
        total_leaves = summary.total_leaves,
        mean_visible_pairs = summary.mean_visible_pairs,
        peak_visible_pairs = summary.peak_visible_pairs,
        "headless run completed"
    );
    Ok(HeadlessReport {
        config,
        frames,
        summary,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use watchtower_core::Tick;

    fn frame(tick: u64, enters: u64, leaves: u64, visible_pairs: usize) -> TickSummary {
        TickSummary {
            tick: Tick(tick),
            agents: 10,
            enters,
            leaves,
            visible_pairs,
        }
    }

    #[test]
    fn frame_reservation_is_capped() {
        assert_eq!(frame_capacity(0), 0);
        assert_eq!(frame_capacity(25), 25);
        assert_eq!(frame_capacity(u64::MAX), MAX_RESERVED_FRAMES);
        let frames: Vec<TickSummary> = Vec::with_capacity(frame_capacity(u64::MAX));
        assert!(frames.capacity() >= MAX_RESERVED_FRAMES);
    }

    #[test]
    fn summary_of_no_frames_is_empty() {
        assert_eq!(ReportSummary::from_frames(&[]), ReportSummary::default());
    }

    #[test]
    fn summary_totals_frames() {
        let frames = [frame(1, 4, 0, 8), frame(2, 2, 3, 6), frame(3, 0, 1, 4)];
        let summary = ReportSummary::from_frames(&frames);
        assert_eq!(summary.ticks_simulated, 3);
        assert_eq!(summary.final_agent_count, 10);
        assert_eq!(summary.total_enters, 6);
        assert_eq!(summary.total_leaves, 4);
        assert_eq!(summary.peak_visible_pairs, 8);
        assert!((summary.mean_visible_pairs - 6.0).abs() < f64::EPSILON);
    }
}
