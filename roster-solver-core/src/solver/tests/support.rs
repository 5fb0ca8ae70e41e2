use crate::model::configuration::SolverConfig;
use crate::model::driver::DriverSpec;
use crate::model::plan::Plan;
use crate::model::tour::{Tour, TourBuilder, TourList};
use crate::solver::block_builder::{BlockPool, build_block_pool};
use crate::solver::events::CancellationToken;
use crate::solver::rules::RuleSet;
use crate::solver::run::{SolveRequest, solve};
use log::LevelFilter;

pub fn init_logging() {
    env_logger::Builder::new()
        .is_test(true)
        .filter(None, LevelFilter::Info)
        .try_init()
        .ok();
}

pub fn tour(id: &str, day: u8, start: u32, end: u32) -> Tour {
    TourBuilder::new(id).day(day).minutes(start, end).build()
}

pub fn config() -> SolverConfig {
    SolverConfig::default()
}

pub fn rules() -> RuleSet {
    RuleSet::from_config(&config())
}

pub fn normalized(tours: Vec<Tour>) -> TourList {
    TourList::normalize(tours).expect("test tours must normalise")
}

pub fn blocks_for(tours: &TourList) -> BlockPool {
    build_block_pool(tours, &rules(), &config())
}

pub fn run(tours: Vec<Tour>) -> Plan {
    run_with(tours, config())
}

pub fn run_with(tours: Vec<Tour>, config: SolverConfig) -> Plan {
    init_logging();
    solve(SolveRequest::new(tours, config), None, CancellationToken::new())
        .expect("kernel run must produce a plan")
}

pub fn run_with_drivers(tours: Vec<Tour>, drivers: Vec<DriverSpec>, config: SolverConfig) -> Plan {
    init_logging();
    let mut request = SolveRequest::new(tours, config);
    request.drivers = Some(drivers);
    solve(request, None, CancellationToken::new()).expect("kernel run must produce a plan")
}

/// The two-tour Monday instance used across the scenario tests:
/// 06:00-10:00 and 10:30-14:30 with a legal 30-minute gap.
pub fn two_glueable_tours() -> Vec<Tour> {
    vec![tour("A", 0, 360, 600), tour("B", 0, 630, 870)]
}
