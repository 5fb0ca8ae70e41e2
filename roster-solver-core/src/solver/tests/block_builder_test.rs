use crate::model::configuration::SolverConfig;
use crate::solver::block_builder::build_block_pool;
use crate::solver::rules::RuleSet;
use crate::solver::tests::support::{blocks_for, normalized, tour, two_glueable_tours};

#[test]
fn two_glueable_tours_yield_three_blocks() {
    let tours = normalized(two_glueable_tours());
    let pool = blocks_for(&tours);
    assert_eq!(pool.stats.total, 3);
    assert_eq!(pool.stats.ones, 2);
    assert_eq!(pool.stats.twos, 1);
    let pair = pool.blocks.iter().find(|b| b.tours_count() == 2).unwrap();
    assert_eq!(pair.id.as_ref(), "B2R-A-B");
    assert_eq!(pair.work_min, 480);
    assert_eq!(pair.span_min, 510);
}

#[test]
fn illegal_gap_leaves_only_singletons() {
    let tours = normalized(vec![tour("A", 0, 360, 600), tour("B", 0, 720, 960)]);
    let pool = blocks_for(&tours);
    assert_eq!(pool.stats.total, 2);
    assert_eq!(pool.stats.ones, 2);
}

#[test]
fn split_blocks_obey_the_toggle_and_span() {
    // 06:00-10:00 then a 6h split pause, 16:00-20:00: split span is 840.
    let tours = vec![tour("A", 0, 360, 600), tour("B", 0, 960, 1200)];
    let pool = blocks_for(&normalized(tours.clone()));
    assert_eq!(pool.stats.twos, 1);
    assert!(pool.blocks.iter().any(|b| b.id.as_ref() == "B2S-A-B"));

    let mut cfg = SolverConfig::default();
    cfg.enable_split_blocks = false;
    let rules = RuleSet::from_config(&cfg);
    let pool = build_block_pool(&normalized(tours), &rules, &cfg);
    assert_eq!(pool.stats.twos, 0);
}

#[test]
fn three_tour_blocks_chain_two_legal_gaps() {
    let tours = normalized(vec![
        tour("A", 0, 360, 600),
        tour("B", 0, 630, 870),
        tour("C", 0, 900, 1140),
    ]);
    let pool = blocks_for(&tours);
    assert_eq!(pool.stats.threes, 1);
    let triple = pool.blocks.iter().find(|b| b.tours_count() == 3).unwrap();
    assert_eq!(triple.id.as_ref(), "B3-A-B-C");
    assert_eq!(triple.span_min, 780);
}

#[test]
fn every_tour_keeps_its_protected_fallback() {
    let mut tours = Vec::new();
    for day in 0..5u8 {
        for i in 0..6u32 {
            let start = 300 + i * 90;
            tours.push(tour(&format!("T{day}{i}"), day, start, start + 240));
        }
    }
    let tours = normalized(tours);
    let pool = blocks_for(&tours);
    assert_eq!(pool.protected.len(), tours.len());
    for (t, &fallback) in pool.protected.iter().enumerate() {
        let block = pool.block(fallback);
        assert_eq!(block.tours_count(), 1);
        assert_eq!(block.tour_idxs[0] as usize, t);
    }
    for owned in &pool.by_tour {
        assert!(!owned.is_empty());
    }
}

#[test]
fn per_tour_cap_prunes_but_never_uncovers() {
    let mut cfg = SolverConfig::default();
    cfg.k_per_tour = 1;
    let rules = RuleSet::from_config(&cfg);
    // A dense day: every adjacent pair has a legal 30-minute gap.
    let mut tours = Vec::new();
    for i in 0..10u32 {
        let start = 300 + i * 270;
        tours.push(tour(&format!("D{i:02}"), (i / 2) as u8, start % 1200, start % 1200 + 240));
    }
    let tours = normalized(tours);
    let capped = build_block_pool(&tours, &rules, &cfg);
    let mut cfg_wide = SolverConfig::default();
    cfg_wide.k_per_tour = 100;
    let wide = build_block_pool(&tours, &rules, &cfg_wide);
    assert!(capped.stats.total <= wide.stats.total);
    for owned in &capped.by_tour {
        assert!(!owned.is_empty());
    }
}

#[test]
fn midnight_crossing_tours_stay_on_their_weekday() {
    let tours = normalized(vec![tour("NIGHT", 0, 1320, 1560), tour("DAY", 1, 600, 840)]);
    let pool = blocks_for(&tours);
    assert_eq!(pool.stats.total, 2);
    let night = pool.blocks.iter().find(|b| b.id.as_ref() == "B1-NIGHT").unwrap();
    assert_eq!(night.day, 0);
    assert_eq!(night.last_end, 1560);
    assert_eq!(night.week_end_minute(), 1560);
}

#[test]
fn dominance_keeps_the_better_scored_block() {
    // Identical covered sets cannot arise from distinct glue paths, so the
    // builder's dominance step only collapses duplicates; the pool must stay
    // free of repeated covered-tour sets either way.
    let tours = normalized(vec![
        tour("A", 0, 360, 600),
        tour("B", 0, 630, 870),
        tour("C", 0, 900, 1140),
        tour("D", 0, 1170, 1380),
    ]);
    let pool = blocks_for(&tours);
    let mut seen = std::collections::HashSet::new();
    for block in &pool.blocks {
        let mut key: Vec<u32> = block.tour_idxs.to_vec();
        key.sort_unstable();
        assert!(seen.insert(key), "duplicate covered set in pool");
    }
}
