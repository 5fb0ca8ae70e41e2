use crate::model::block::BlockIdx;
use crate::model::column::{Column, ColumnOrigin};
use crate::solver::pricing::PoolView;
use crate::solver::rules::MAX_DAILY_TOURS;
use log::{debug, info};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

/// Randomised daily partitions generated on top of the deterministic one, to
/// diversify the seed pool.
const RANDOM_PARTITIONS: usize = 4;
/// Most days a seed chain may span.
const MAX_CHAIN_DAYS: usize = 6;

/// One-shot seed generation: greedy daily partitions (3er first, then 2er,
/// then 1er), multi-day chains walked over the day graph, and high-utilisation
/// singleton columns. The guaranteed per-tour fallback singletons come from
/// [`fallback_singletons`].
pub fn seed_columns(view: &PoolView, rng: &mut StdRng) -> Vec<Column> {
    let mut out = Vec::new();
    let deterministic = partition_week(view, None);
    chain_partition(view, &deterministic, &mut out);
    for _ in 0..RANDOM_PARTITIONS {
        let randomized = partition_week(view, Some(&mut *rng));
        chain_partition(view, &randomized, &mut out);
    }
    info!("Seed generation produced {} candidate columns", out.len());
    out
}

/// The per-tour last-resort singleton columns. Returns only the legal ones;
/// a missing entry means the tour cannot be worked inside the weekly caps at
/// all and the caller reports it.
pub fn fallback_singletons(view: &PoolView) -> Vec<Column> {
    let mut out = Vec::new();
    for &fallback in &view.blocks.protected {
        if view.rules.column_is_legal(&view.blocks.blocks, &[fallback]).is_ok() {
            out.push(Column::from_blocks(
                view.tours,
                &view.blocks.blocks,
                vec![fallback],
                ColumnOrigin::Fallback,
            ));
        }
    }
    out
}

/// Greedy block partition of the whole week: per day, select 3er blocks first
/// (largest coverage per duty), then 2er, then the 1er fallbacks for whatever
/// remains. With an RNG the candidate order inside each size class is
/// shuffled, yielding alternative partitions of the same day.
fn partition_week(view: &PoolView, mut rng: Option<&mut StdRng>) -> [Vec<BlockIdx>; 7] {
    let mut selected: [Vec<BlockIdx>; 7] = Default::default();
    for day in 0..7u8 {
        let mut used = vec![false; view.tours.len()];
        for size in (1..=MAX_DAILY_TOURS).rev() {
            let mut candidates: Vec<BlockIdx> = view
                .blocks
                .blocks_of_day(day)
                .filter(|(_, b)| b.tours_count() == size)
                .map(|(i, _)| i)
                .collect();
            candidates.sort_by(|&a, &b| {
                let (ba, bb) = (view.blocks.block(a), view.blocks.block(b));
                bb.score.cmp(&ba.score).then_with(|| ba.id.cmp(&bb.id))
            });
            if size > 1 {
                if let Some(r) = rng.as_mut() {
                    candidates.shuffle(&mut **r);
                }
            }
            for idx in candidates {
                let block = view.blocks.block(idx);
                if block.tour_idxs.iter().any(|&t| used[t as usize]) {
                    continue;
                }
                for &t in block.tour_idxs.iter() {
                    used[t as usize] = true;
                }
                selected[day as usize].push(idx);
            }
        }
    }
    selected
}

/// Chains the partition's blocks into weekly columns. Walks the day graph
/// greedily, always taking the best-scored legal successor, which yields a
/// mix of long chains and leftovers; leftovers with 2+ tours become singleton
/// columns.
fn chain_partition(view: &PoolView, selected: &[Vec<BlockIdx>; 7], out: &mut Vec<Column>) {
    let mut used: Vec<BlockIdx> = Vec::new();
    let mut multi_day = 0usize;
    for start_day in 0..7usize {
        // Stable iteration: blocks of the partition day in selection order.
        for &start in &selected[start_day] {
            if used.contains(&start) || view.blocks.block(start).tours_count() < 2 {
                continue;
            }
            let chain = walk_chain(view, selected, &used, start);
            if chain.len() > 1 {
                if view.rules.column_is_legal(&view.blocks.blocks, &chain).is_ok() {
                    used.extend(chain.iter().copied());
                    multi_day += 1;
                    out.push(Column::from_blocks(
                        view.tours,
                        &view.blocks.blocks,
                        chain,
                        ColumnOrigin::Seed,
                    ));
                }
            }
        }
    }
    // High-utilisation leftovers still make useful single-day columns.
    let mut singles = 0usize;
    for day in 0..7usize {
        for &idx in &selected[day] {
            if used.contains(&idx) || view.blocks.block(idx).tours_count() < 2 {
                continue;
            }
            if view.rules.column_is_legal(&view.blocks.blocks, &[idx]).is_ok() {
                singles += 1;
                out.push(Column::from_blocks(
                    view.tours,
                    &view.blocks.blocks,
                    vec![idx],
                    ColumnOrigin::Seed,
                ));
            }
        }
    }
    debug!("Partition chained into {} multi-day and {} singleton columns", multi_day, singles);
}

/// Extends a chain day by day. On each later day the best-scored unused block
/// of the partition that chains legally and keeps the weekly cap is taken.
fn walk_chain(
    view: &PoolView,
    selected: &[Vec<BlockIdx>; 7],
    used: &[BlockIdx],
    start: BlockIdx,
) -> Vec<BlockIdx> {
    let mut chain = vec![start];
    let mut work_min = view.blocks.block(start).work_min;
    let mut last = start;
    let mut day = view.blocks.block(start).day + 1;
    while (day as usize) < 7 && chain.len() < MAX_CHAIN_DAYS {
        let mut best: Option<BlockIdx> = None;
        for &candidate in &selected[day as usize] {
            if used.contains(&candidate) || chain.contains(&candidate) {
                continue;
            }
            let block = view.blocks.block(candidate);
            if block.tours_count() < 2 {
                continue;
            }
            if work_min + block.work_min > view.rules.weekly_cap_min {
                continue;
            }
            if !view.rules.can_chain_days(view.blocks.block(last), block) {
                continue;
            }
            let better = match best {
                None => true,
                Some(current) => {
                    let cur = view.blocks.block(current);
                    block.score > cur.score || (block.score == cur.score && block.id < cur.id)
                }
            };
            if better {
                best = Some(candidate);
            }
        }
        if let Some(next) = best {
            work_min += view.blocks.block(next).work_min;
            chain.push(next);
            last = next;
        }
        day += 1;
    }
    chain
}
