use crate::model::block::{Block, PauseZone};
use crate::model::column::DriverType;
use crate::model::configuration::SolverConfig;
use crate::solver::rules::{RuleSet, RuleViolation};
use crate::solver::tests::support::{normalized, rules, tour};

#[test]
fn pause_zones_follow_the_policy() {
    let rules = rules();
    assert_eq!(rules.pause_zone(29), None);
    assert_eq!(rules.pause_zone(30), Some(PauseZone::Regular));
    assert_eq!(rules.pause_zone(60), Some(PauseZone::Regular));
    assert_eq!(rules.pause_zone(61), None);
    assert_eq!(rules.pause_zone(359), None);
    assert_eq!(rules.pause_zone(360), Some(PauseZone::Split));
    assert_eq!(rules.pause_zone(361), None);
    assert_eq!(rules.pause_zone(-10), None);
}

#[test]
fn split_zone_honours_the_toggle() {
    let mut cfg = SolverConfig::default();
    cfg.enable_split_blocks = false;
    let rules = RuleSet::from_config(&cfg);
    assert_eq!(rules.pause_zone(360), None);
    assert_eq!(rules.pause_zone(45), Some(PauseZone::Regular));
}

#[test]
fn extension_rejects_overlap_mixed_zones_and_span() {
    let rules = rules();
    let tours = normalized(vec![
        tour("T1", 0, 360, 600),
        tour("T2", 0, 630, 870),
        tour("T3", 0, 900, 1140),
        tour("T4", 0, 1230, 1500),
        tour("OVERLAP", 0, 500, 700),
        tour("ZLATE", 0, 630, 1290),
    ]);
    // Arena order: T1(0), OVERLAP(1), T2(2), ZLATE(3), T3(4), T4(5).
    assert_eq!(rules.can_extend_block(&tours, &[0], None, 2), Some(PauseZone::Regular));
    assert_eq!(rules.can_extend_block(&tours, &[0], None, 1), None);
    // T2 -> T4 gap is 360: a split gap cannot extend a regular block.
    assert_eq!(rules.can_extend_block(&tours, &[0, 2], Some(PauseZone::Regular), 5), None);
    // Regular span cap at 14h: T1..LATE spans 930 minutes.
    assert_eq!(rules.can_extend_block(&tours, &[0], None, 3), None);
    // A third tour beyond the daily limit.
    assert_eq!(rules.can_extend_block(&tours, &[0, 2, 4], Some(PauseZone::Regular), 5), None);
}

fn block_of(tour_specs: &[(&str, u8, u32, u32)]) -> Block {
    let tours = normalized(
        tour_specs
            .iter()
            .map(|&(id, day, start, end)| tour(id, day, start, end))
            .collect(),
    );
    let idxs = (0..tours.len() as u32).collect();
    Block::assemble(&tours, idxs, PauseZone::Regular)
}

#[test]
fn chain_needs_eleven_hours_of_rest() {
    let rules = rules();
    // Ends Monday 22:00; Tuesday 06:00 start leaves 8h of rest.
    let late = block_of(&[("A", 0, 960, 1320)]);
    let early = block_of(&[("B", 1, 360, 600)]);
    assert_eq!(rules.chain_violation(&late, &early), Some(RuleViolation::Rest11h));
    // Tuesday 09:00 leaves exactly 11h.
    let legal = block_of(&[("C", 1, 540, 780)]);
    assert_eq!(rules.chain_violation(&late, &legal), None);
}

#[test]
fn three_tour_day_requires_recovery() {
    let rules = rules();
    let triple = block_of(&[("A", 0, 360, 600), ("B", 0, 630, 870), ("C", 0, 900, 1140)]);
    assert_eq!(triple.tours_count(), 3);
    // 13h of rest is enough for the 11h rule but not after a 3-tour day.
    let next_13h = block_of(&[("D", 1, 480, 720)]);
    assert_eq!(rules.chain_violation(&triple, &next_13h), Some(RuleViolation::Rest14hAfter3Tour));
    // 14h of rest, but three tours the following day.
    let next_triple =
        block_of(&[("E", 1, 540, 700), ("F", 1, 730, 890), ("G", 1, 920, 1080)]);
    assert_eq!(
        rules.chain_violation(&triple, &next_triple),
        Some(RuleViolation::Rest14hAfter3Tour)
    );
    // 14h of rest and two tours is legal.
    let next_pair = block_of(&[("H", 1, 540, 700), ("I", 1, 730, 890)]);
    assert_eq!(rules.chain_violation(&triple, &next_pair), None);
}

#[test]
fn driver_can_take_reports_the_first_violation() {
    let rules = rules();
    let tours = normalized(vec![
        tour("A", 0, 360, 600),
        tour("B", 0, 900, 1140),
        tour("C", 1, 360, 600),
    ]);
    let blocks = vec![
        Block::assemble(&tours, vec![0], PauseZone::Regular),
        Block::assemble(&tours, vec![1], PauseZone::Regular),
        Block::assemble(&tours, vec![2], PauseZone::Regular),
    ];
    // Same day twice is an overlap, another day is fine.
    assert_eq!(
        rules.driver_can_take(&blocks, &tours, &[0], 1, None),
        Err(RuleViolation::Overlap)
    );
    assert_eq!(rules.driver_can_take(&blocks, &tours, &[0], 2, None), Ok(()));
}

#[test]
fn weekly_cap_binds_driver_can_take() {
    let mut cfg = SolverConfig::default();
    cfg.weekly_hard_cap = 7.0;
    let rules = RuleSet::from_config(&cfg);
    let tours = normalized(vec![tour("A", 0, 360, 600), tour("B", 1, 360, 600)]);
    let blocks = vec![
        Block::assemble(&tours, vec![0], PauseZone::Regular),
        Block::assemble(&tours, vec![1], PauseZone::Regular),
    ];
    // Two 4h tours exceed a 7h weekly cap.
    assert_eq!(
        rules.driver_can_take(&blocks, &tours, &[0], 1, None),
        Err(RuleViolation::WeeklyCap)
    );
}

#[test]
fn qualification_is_checked_against_the_driver() {
    let rules = rules();
    let tours = normalized(vec![
        crate::model::tour::TourBuilder::new("A")
            .day(0)
            .minutes(360, 600)
            .qualification("C1")
            .build(),
    ]);
    let blocks = vec![Block::assemble(&tours, vec![0], PauseZone::Regular)];
    let unqualified = std::collections::HashSet::new();
    let mut qualified = std::collections::HashSet::new();
    qualified.insert("C1");
    assert_eq!(
        rules.driver_can_take(&blocks, &tours, &[], 0, Some(&unqualified)),
        Err(RuleViolation::Qual)
    );
    assert_eq!(rules.driver_can_take(&blocks, &tours, &[], 0, Some(&qualified)), Ok(()));
}

#[test]
fn fte_hours_ceiling_binds_column_legality() {
    let rules = rules();
    let idxs: Vec<u32> = (0..6).collect();
    // Six 9h days: 54h sits inside the 55h weekly cap but above the 53h
    // FTE target ceiling.
    let tours = normalized((0..6u8).map(|d| tour(&format!("T{d}"), d, 360, 900)).collect());
    let blocks: Vec<Block> =
        (0..6u32).map(|i| Block::assemble(&tours, vec![i], PauseZone::Regular)).collect();
    assert_eq!(rules.column_is_legal(&blocks, &idxs), Err(RuleViolation::WeeklyCap));
    // Six 8h40 days land on 52h, inside the window.
    let tours = normalized((0..6u8).map(|d| tour(&format!("T{d}"), d, 360, 880)).collect());
    let blocks: Vec<Block> =
        (0..6u32).map(|i| Block::assemble(&tours, vec![i], PauseZone::Regular)).collect();
    assert_eq!(rules.column_is_legal(&blocks, &idxs), Ok(()));
}

#[test]
fn driver_type_threshold_is_the_fte_floor() {
    let rules = rules();
    assert_eq!(rules.driver_type(42 * 60), DriverType::Fte);
    assert_eq!(rules.driver_type(42 * 60 - 1), DriverType::Pt);
}
