use crate::model::block::{Block, BlockIdx, PauseZone};
use crate::model::configuration::SolverConfig;
use crate::model::tour::{TourIdx, TourList};
use crate::solver::rules::RuleSet;
use log::{debug, info};
use std::collections::BTreeMap;

/// Utility weight on worked minutes.
const W_WORK: i64 = 3;
/// Utility weight on unproductive span minutes.
const W_IDLE: i64 = 2;
/// Tours with fewer total blocks than this keep twice the per-tour cap.
const SCARCITY_THRESHOLD: usize = 6;

/// The scored, pruned daily block pool. Every tour is contained in at least
/// one surviving block (its protected 1-tour fallback), so the pool can never
/// make the cover model infeasible.
#[derive(Debug)]
pub struct BlockPool {
    /// Blocks in canonical order: (day, first_start, id).
    pub blocks: Vec<Block>,
    /// Per tour index, the blocks containing that tour.
    pub by_tour: Vec<Vec<BlockIdx>>,
    /// Per tour index, its last-resort 1-tour block.
    pub protected: Vec<BlockIdx>,
    pub stats: BlockPoolStats,
}

#[derive(Debug, Default, Clone)]
pub struct BlockPoolStats {
    pub total: usize,
    pub ones: usize,
    pub twos: usize,
    pub threes: usize,
    pub pruned_dominated: usize,
    pub pruned_capped: usize,
}

impl BlockPool {
    pub fn block(&self, idx: BlockIdx) -> &Block {
        &self.blocks[idx as usize]
    }
    pub fn blocks_of_day(&self, day: u8) -> impl Iterator<Item = (BlockIdx, &Block)> {
        self.blocks
            .iter()
            .enumerate()
            .filter(move |(_, b)| b.day == day)
            .map(|(i, b)| (i as BlockIdx, b))
    }
}

/// Enumerates, scores and prunes all legal 1er/2er/3er blocks. The builder
/// cannot fail: it always terminates with a pool covering every tour.
pub fn build_block_pool(tours: &TourList, rules: &RuleSet, cfg: &SolverConfig) -> BlockPool {
    let mut stats = BlockPoolStats::default();
    let by_day = tours.idxs_by_day();
    let mut candidates: BTreeMap<Vec<TourIdx>, Block> = BTreeMap::new();
    let mut emit = |block: Block, stats: &mut BlockPoolStats| {
        let key: Vec<TourIdx> = {
            let mut k = block.tour_idxs.to_vec();
            k.sort_unstable();
            k
        };
        match candidates.get_mut(&key) {
            // Dominance pruning: identical covered-tour-set keeps the best
            // scored block, ties broken by lexicographic id.
            Some(existing) => {
                stats.pruned_dominated += 1;
                let better = block.score > existing.score
                    || (block.score == existing.score && block.id < existing.id);
                if better {
                    *existing = block;
                }
            }
            None => {
                candidates.insert(key, block);
            }
        }
    };

    for day_tours in by_day.iter() {
        // 1er blocks: the guaranteed fallback for every tour.
        for &t in day_tours {
            emit(scored(Block::assemble(tours, vec![t], PauseZone::Regular)), &mut stats);
        }
        // 2er sweep over start-ordered pairs.
        for (i, &t1) in day_tours.iter().enumerate() {
            for (j, &t2) in day_tours.iter().enumerate().skip(i + 1) {
                let Some(zone) = rules.can_extend_block(tours, &[t1], None, t2) else {
                    continue;
                };
                emit(scored(Block::assemble(tours, vec![t1, t2], zone)), &mut stats);
                // 3er blocks extend a legal 2er by a third tour in the same zone.
                for &t3 in &day_tours[j + 1..] {
                    if let Some(zone3) = rules.can_extend_block(tours, &[t1, t2], Some(zone), t3) {
                        emit(scored(Block::assemble(tours, vec![t1, t2, t3], zone3)), &mut stats);
                    }
                }
            }
        }
    }

    let mut blocks: Vec<Block> = candidates.into_values().collect();
    blocks.sort_by(|a, b| (a.day, a.first_start, a.id.as_ref()).cmp(&(b.day, b.first_start, b.id.as_ref())));

    let kept = apply_caps(tours, &mut blocks, cfg, &mut stats);
    finish_pool(tours, kept, stats)
}

fn scored(mut block: Block) -> Block {
    block.score = W_WORK * block.work_min as i64 - W_IDLE * block.idle_min() as i64;
    block
}

/// Applies the dynamic per-tour cap and the global pool cap. Protected 1er
/// blocks are exempt, so pruning can never drop a tour's only block.
fn apply_caps(
    tours: &TourList,
    blocks: &mut Vec<Block>,
    cfg: &SolverConfig,
    stats: &mut BlockPoolStats,
) -> Vec<Block> {
    let mut per_tour: Vec<Vec<usize>> = vec![Vec::new(); tours.len()];
    for (i, block) in blocks.iter().enumerate() {
        for &t in block.tour_idxs.iter() {
            per_tour[t as usize].push(i);
        }
    }

    let mut keep = vec![false; blocks.len()];
    for (t, owned) in per_tour.iter().enumerate() {
        let cap = if owned.len() < SCARCITY_THRESHOLD {
            2 * cfg.k_per_tour
        } else {
            cfg.k_per_tour
        };
        let mut ranked = owned.clone();
        ranked.sort_by(|&a, &b| {
            blocks[b].score.cmp(&blocks[a].score).then_with(|| blocks[a].id.cmp(&blocks[b].id))
        });
        for &i in ranked.iter().take(cap) {
            keep[i] = true;
        }
        // The last-resort 1er of this tour is always kept.
        if let Some(&fallback) = owned
            .iter()
            .find(|&&i| blocks[i].tours_count() == 1 && blocks[i].tour_idxs[0] as usize == t)
        {
            keep[fallback] = true;
        }
    }
    stats.pruned_capped += keep.iter().filter(|&&k| !k).count();

    let mut kept: Vec<Block> = blocks
        .drain(..)
        .zip(keep)
        .filter_map(|(b, k)| if k { Some(b) } else { None })
        .collect();

    // Global cap: strip lowest-utility blocks outside the protected set.
    if kept.len() > cfg.n_pool_cap {
        let mut order: Vec<usize> = (0..kept.len()).collect();
        order.sort_by(|&a, &b| {
            kept[a].score.cmp(&kept[b].score).then_with(|| kept[b].id.cmp(&kept[a].id))
        });
        let mut drop = vec![false; kept.len()];
        let mut excess = kept.len() - cfg.n_pool_cap;
        for &i in &order {
            if excess == 0 {
                break;
            }
            if kept[i].tours_count() == 1 {
                continue;
            }
            drop[i] = true;
            excess -= 1;
        }
        stats.pruned_capped += drop.iter().filter(|&&d| d).count();
        kept = kept
            .into_iter()
            .zip(drop)
            .filter_map(|(b, d)| if d { None } else { Some(b) })
            .collect();
    }
    kept
}

fn finish_pool(tours: &TourList, blocks: Vec<Block>, mut stats: BlockPoolStats) -> BlockPool {
    let mut by_tour: Vec<Vec<BlockIdx>> = vec![Vec::new(); tours.len()];
    let mut protected: Vec<Option<BlockIdx>> = vec![None; tours.len()];
    for (i, block) in blocks.iter().enumerate() {
        match block.tours_count() {
            1 => stats.ones += 1,
            2 => stats.twos += 1,
            _ => stats.threes += 1,
        }
        for &t in block.tour_idxs.iter() {
            by_tour[t as usize].push(i as BlockIdx);
        }
        if block.tours_count() == 1 {
            protected[block.tour_idxs[0] as usize] = Some(i as BlockIdx);
        }
    }
    stats.total = blocks.len();
    let protected: Vec<BlockIdx> = protected
        .into_iter()
        .enumerate()
        .map(|(t, p)| p.unwrap_or_else(|| panic!("tour index {t} lost its fallback block")))
        .collect();

    info!(
        "Block pool: {} blocks ({} 1er, {} 2er, {} 3er), {} dominated, {} capped",
        stats.total, stats.ones, stats.twos, stats.threes, stats.pruned_dominated, stats.pruned_capped
    );
    debug!(
        "Block pool coverage: {} tours, {} protected fallbacks",
        tours.len(),
        protected.len()
    );
    BlockPool { blocks, by_tour, protected, stats }
}
