use crate::model::column::DriverType;
use prettytable::{Cell, Row, Table, format, row};
use serde::Serialize;

/// Terminal status of a kernel run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PlanStatus {
    Optimal,
    Feasible,
    Infeasible,
    ZeroSupport,
    Partial,
    MemoryExceeded,
    Timeout,
}

impl PlanStatus {
    /// The output hash is only set on accepted plans.
    pub fn is_accepted(&self) -> bool {
        matches!(self, PlanStatus::Optimal | PlanStatus::Feasible)
    }
}

/// Closed set of machine-readable reason codes attached to run outcomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReasonCode {
    ConfigClamped,
    ZeroSupport,
    BudgetOverrun,
    MemoryExceeded,
    InfeasibleUnderCap,
    HardViolation,
    Cancelled,
    Timeout,
}

/// A reason code plus its human-readable summary.
#[derive(Debug, Clone, Serialize)]
pub struct Reason {
    pub code: ReasonCode,
    pub detail: String,
}

impl Reason {
    pub fn new(code: ReasonCode, detail: String) -> Reason {
        Reason { code, detail }
    }
}

/// One block of one driver's week, as exposed to collaborators.
#[derive(Debug, Clone, Serialize)]
pub struct Assignment {
    pub driver_id: Box<str>,
    pub driver_type: DriverType,
    pub day: u8,
    pub block_id: Box<str>,
    pub tour_ids: Vec<Box<str>>,
    pub work_minutes: u32,
}

/// KPIs recomputed on the selected solution.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Kpis {
    pub tours_total: usize,
    pub tours_assigned: usize,
    pub drivers_total: usize,
    pub fte_count: usize,
    pub pt_count: usize,
    pub total_hours: f64,
    pub pt_hours_total: f64,
    pub pt_share_hours_pct: f64,
    /// Driver-hours histogram over 5h buckets: [0,5), [5,10), ... [55,inf).
    pub hours_histogram: Vec<usize>,
    pub blocks_1er: usize,
    pub blocks_2er: usize,
    pub blocks_3er: usize,
    pub fleet_peak: usize,
    pub fleet_peak_by_day: Vec<usize>,
    pub gini_hours: f64,
    /// Estimated peak working-set of the column pool, bytes.
    pub peak_memory_bytes: u64,
}

/// The selected, validated and signed weekly roster.
#[derive(Debug, Clone, Serialize)]
pub struct Plan {
    pub status: PlanStatus,
    /// Sorted by (driver_id, day); one entry per block.
    pub assignments: Vec<Assignment>,
    pub kpis: Kpis,
    pub reasons: Vec<Reason>,
    pub input_hash: String,
    pub config_hash: String,
    /// Only set on OPTIMAL/FEASIBLE.
    pub output_hash: Option<String>,
}

const DAY_NAMES: [&str; 7] = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];

impl Plan {
    /// Builds a driver x weekday matrix for displaying the roster in a
    /// human-readable format, one row per driver with weekly hours and type.
    pub fn to_table(&self) -> Table {
        let mut table = Table::new();
        table.set_format(*format::consts::FORMAT_CLEAN);
        table.add_row(row![
            buFc->"Driver",
            buFc->"Type",
            buFc->"Mon",
            buFc->"Tue",
            buFc->"Wed",
            buFc->"Thu",
            buFc->"Fri",
            buFc->"Sat",
            buFc->"Sun",
            buFc->"Hours"
        ]);
        let mut drivers: Vec<&str> = self.assignments.iter().map(|a| a.driver_id.as_ref()).collect();
        drivers.dedup();
        for driver in drivers {
            let rows: Vec<&Assignment> = self
                .assignments
                .iter()
                .filter(|a| a.driver_id.as_ref() == driver)
                .collect();
            let mut cells = vec![driver.to_string()];
            cells.push(match rows[0].driver_type {
                DriverType::Fte => "FTE".to_string(),
                DriverType::Pt => "PT".to_string(),
            });
            for day in 0..7u8 {
                let cell = rows
                    .iter()
                    .find(|a| a.day == day)
                    .map(|a| a.tour_ids.join("+"))
                    .unwrap_or_default();
                cells.push(cell);
            }
            let minutes: u32 = rows.iter().map(|a| a.work_minutes).sum();
            cells.push(format!("{:.1}", minutes as f64 / 60.0));
            table.add_row(Row::new(cells.iter().map(|c| Cell::new(c)).collect()));
        }
        table
    }

    pub fn day_name(day: u8) -> &'static str {
        DAY_NAMES[day as usize]
    }
}
