use crate::model::tour::{Tour, TourList};
use crate::solver::rules::{MIN_PAUSE, MIN_REST, RuleSet};
use log::info;

/// Lower bounds on the weekly driver count, combined as their maximum.
#[derive(Debug, Clone, Copy)]
pub struct LowerBounds {
    /// ceil(total tour hours / weekly hard cap).
    pub hours_lb: usize,
    /// Peak concurrent tours over the week.
    pub fleet_lb: usize,
    /// Minimum path cover of the tour DAG under legal chaining.
    pub graph_lb: usize,
    pub final_lb: usize,
}

pub fn compute_lower_bounds(tours: &TourList, rules: &RuleSet) -> LowerBounds {
    let total_minutes = tours.total_work_minutes();
    let cap = rules.weekly_cap_min as u64;
    let hours_lb = (total_minutes.div_ceil(cap.max(1))) as usize;
    let fleet_lb = fleet_peak(tours.iter()).0;
    let graph_lb = min_path_cover(tours);
    let final_lb = hours_lb.max(fleet_lb).max(graph_lb);
    info!(
        "[LB] hours={}, fleet={}, graph={}, final={}",
        hours_lb, fleet_lb, graph_lb, final_lb
    );
    LowerBounds { hours_lb, fleet_lb, graph_lb, final_lb }
}

/// Sweep line over the week: peak concurrent tours and the per-day peaks.
/// End events sort before start events at the same minute, so back-to-back
/// tours do not count as concurrent.
pub fn fleet_peak<'a>(tours: impl Iterator<Item = &'a Tour>) -> (usize, [usize; 7]) {
    let mut events: Vec<(u32, i32, u8)> = Vec::new();
    for tour in tours {
        events.push((tour.week_start_minute(), 1, tour.day));
        events.push((tour.week_end_minute(), -1, tour.day));
    }
    events.sort_by_key(|&(minute, delta, _)| (minute, delta));
    let mut concurrent: i32 = 0;
    let mut peak = 0usize;
    let mut by_day = [0usize; 7];
    let mut concurrent_of_day = [0i32; 7];
    for (_, delta, day) in events {
        concurrent += delta;
        peak = peak.max(concurrent as usize);
        // Midnight-crossing tours count against their start day.
        concurrent_of_day[day as usize] += delta;
        by_day[day as usize] = by_day[day as usize].max(concurrent_of_day[day as usize] as usize);
    }
    (peak, by_day)
}

/// Minimum path cover of the tour compatibility DAG:
/// `|tours| - max bipartite matching`, edges `i -> j` when j can follow i on
/// the same driver (same-day gap >= MIN_PAUSE, or cross-day rest >= MIN_REST).
fn min_path_cover(tours: &TourList) -> usize {
    let n = tours.len();
    let mut adjacency: Vec<Vec<usize>> = vec![Vec::new(); n];
    for i in 0..n {
        let a = tours.get(i as u32);
        for j in (i + 1)..n {
            let b = tours.get(j as u32);
            if compatible(a, b) {
                adjacency[i].push(j);
            }
        }
    }
    let mut match_right: Vec<Option<usize>> = vec![None; n];
    let mut matching = 0usize;
    for u in 0..n {
        let mut visited = vec![false; n];
        if augment(u, &adjacency, &mut match_right, &mut visited) {
            matching += 1;
        }
    }
    n - matching
}

fn compatible(a: &Tour, b: &Tour) -> bool {
    if a.day == b.day {
        b.start_minute as i64 - a.end_minute as i64 >= MIN_PAUSE as i64
    } else if a.day < b.day {
        b.week_start_minute() as i64 - a.week_end_minute() as i64 >= MIN_REST as i64
    } else {
        false
    }
}

fn augment(
    u: usize,
    adjacency: &[Vec<usize>],
    match_right: &mut Vec<Option<usize>>,
    visited: &mut Vec<bool>,
) -> bool {
    for &v in &adjacency[u] {
        if visited[v] {
            continue;
        }
        visited[v] = true;
        let free = match match_right[v] {
            None => true,
            Some(owner) => augment(owner, adjacency, match_right, visited),
        };
        if free {
            match_right[v] = Some(u);
            return true;
        }
    }
    false
}
