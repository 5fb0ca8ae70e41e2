use crate::model::column::DriverType;
use crate::model::configuration::SolverConfig;
use crate::model::plan::Assignment;
use crate::solver::signing::{config_hash, input_hash, output_hash, sha256_hex};
use crate::solver::tests::support::{normalized, tour};

#[test]
fn sha256_matches_the_known_empty_digest() {
    assert_eq!(
        sha256_hex(b""),
        "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
    );
}

#[test]
fn input_hash_is_order_independent_and_content_sensitive() {
    let a = input_hash(&normalized(vec![tour("A", 0, 360, 600), tour("B", 1, 420, 660)]));
    let b = input_hash(&normalized(vec![tour("B", 1, 420, 660), tour("A", 0, 360, 600)]));
    assert_eq!(a, b);

    let c = input_hash(&normalized(vec![
        crate::model::tour::TourBuilder::new("A").day(0).minutes(360, 600).depot("north").build(),
        tour("B", 1, 420, 660),
    ]));
    assert_ne!(a, c);
}

#[test]
fn config_hash_tracks_every_tunable() {
    let base = SolverConfig::default();
    let mut reseeded = SolverConfig::default();
    reseeded.seed = base.seed + 1;
    assert_ne!(config_hash(&base), config_hash(&reseeded));

    let mut retimed = SolverConfig::default();
    retimed.mip_time_limit_final += 1.0;
    assert_ne!(config_hash(&base), config_hash(&retimed));
}

fn assignment(driver: &str, day: u8, block: &str, tours: &[&str]) -> Assignment {
    Assignment {
        driver_id: driver.into(),
        driver_type: DriverType::Pt,
        day,
        block_id: block.into(),
        tour_ids: tours.iter().map(|&t| Box::from(t)).collect(),
        work_minutes: 480,
    }
}

#[test]
fn output_hash_sorts_assignments_canonically() {
    let a = assignment("FTE-01", 0, "B1-A", &["A"]);
    let b = assignment("PT-01", 2, "B1-B", &["B"]);
    let forward = output_hash(&[a.clone(), b.clone()]);
    let backward = output_hash(&[b, a]);
    assert_eq!(forward, backward);
}

#[test]
fn output_hash_sees_the_assignment_content() {
    let base = output_hash(&[assignment("FTE-01", 0, "B1-A", &["A"])]);
    let other_day = output_hash(&[assignment("FTE-01", 1, "B1-A", &["A"])]);
    let other_driver = output_hash(&[assignment("FTE-02", 0, "B1-A", &["A"])]);
    assert_ne!(base, other_day);
    assert_ne!(base, other_driver);
}
