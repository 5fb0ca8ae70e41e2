use log::warn;

const EPS: f64 = 1e-9;

/// One decision variable of the set-partition LP: its cost and the tour rows
/// it covers (coefficient 1). Every variable additionally carries coefficient
/// 1 in the driver-cap row.
#[derive(Debug, Clone)]
pub struct LpColumn {
    pub cost: f64,
    pub rows: Vec<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LpStatus {
    Optimal,
    Infeasible,
}

#[derive(Debug, Clone)]
pub struct LpSolution {
    pub status: LpStatus,
    pub objective: f64,
    /// Primal value per input column.
    pub values: Vec<f64>,
    /// Dual value per tour row.
    pub duals: Vec<f64>,
    /// Dual value of the driver-cap row.
    pub cap_dual: f64,
}

impl LpSolution {
    fn infeasible(n: usize, n_rows: usize) -> LpSolution {
        LpSolution {
            status: LpStatus::Infeasible,
            objective: f64::INFINITY,
            values: vec![0.0; n],
            duals: vec![0.0; n_rows],
            cap_dual: 0.0,
        }
    }
}

/// Solves `min c.y` subject to `sum_{j covers i} y_j = 1` for every tour row,
/// `sum_j y_j <= cap` and `y >= 0` with a dense two-phase tableau simplex.
/// The upper bounds `y <= 1` are implied by the cover rows and are not
/// modelled. Bland's rule keeps the pivoting cycle-free and deterministic;
/// duals are read from the reduced costs of the initial identity columns.
pub fn solve_set_partition_lp(cols: &[LpColumn], n_rows: usize, cap: f64) -> LpSolution {
    let n = cols.len();
    let m = n_rows + 1;
    let slack = n;
    let art0 = n + 1;
    let width = n + 1 + n_rows;

    // Dense tableau rows: tour rows first, the cap row last.
    let mut a = vec![vec![0.0f64; width]; m];
    let mut b = vec![1.0f64; m];
    b[n_rows] = cap;
    for (j, col) in cols.iter().enumerate() {
        for &r in &col.rows {
            a[r as usize][j] = 1.0;
        }
        a[n_rows][j] = 1.0;
    }
    a[n_rows][slack] = 1.0;
    for i in 0..n_rows {
        a[i][art0 + i] = 1.0;
    }
    let mut basis: Vec<usize> = (0..n_rows).map(|i| art0 + i).collect();
    basis.push(slack);

    // Phase 1: minimise the artificial sum.
    let phase1_cost = |j: usize| if j >= art0 { 1.0 } else { 0.0 };
    let mut reduced = init_reduced(&a, &basis, width, phase1_cost);
    let mut objective: f64 = b[..n_rows].iter().sum();
    if !pivot_until_optimal(&mut a, &mut b, &mut basis, &mut reduced, &mut objective, width, |_| true) {
        return LpSolution::infeasible(n, n_rows);
    }
    if objective > 1e-7 {
        return LpSolution::infeasible(n, n_rows);
    }
    drive_out_artificials(&mut a, &mut b, &mut basis, &mut reduced, art0);

    // Phase 2: minimise the real costs; artificial columns may not re-enter.
    let phase2_cost = |j: usize| if j < n { cols[j].cost } else { 0.0 };
    reduced = init_reduced(&a, &basis, width, phase2_cost);
    objective = basis
        .iter()
        .enumerate()
        .map(|(i, &j)| phase2_cost(j) * b[i])
        .sum();
    pivot_until_optimal(&mut a, &mut b, &mut basis, &mut reduced, &mut objective, width, |j| {
        j < art0
    });

    let mut values = vec![0.0f64; n];
    for (i, &j) in basis.iter().enumerate() {
        if j < n {
            values[j] = b[i];
        }
    }
    let duals: Vec<f64> = (0..n_rows).map(|i| -reduced[art0 + i]).collect();
    let cap_dual = -reduced[slack];
    LpSolution { status: LpStatus::Optimal, objective, values, duals, cap_dual }
}

fn init_reduced<F: Fn(usize) -> f64>(
    a: &[Vec<f64>],
    basis: &[usize],
    width: usize,
    cost: F,
) -> Vec<f64> {
    let basic_costs: Vec<f64> = basis.iter().map(|&j| cost(j)).collect();
    (0..width)
        .map(|j| {
            let carried: f64 = a.iter().zip(&basic_costs).map(|(row, cb)| cb * row[j]).sum();
            cost(j) - carried
        })
        .collect()
}

/// Runs Bland pivots until no entering column remains. Returns false only on
/// an unbounded ray, which the set-partition structure cannot produce and is
/// treated as a failed solve.
fn pivot_until_optimal<F: Fn(usize) -> bool>(
    a: &mut [Vec<f64>],
    b: &mut [f64],
    basis: &mut [usize],
    reduced: &mut [f64],
    objective: &mut f64,
    width: usize,
    may_enter: F,
) -> bool {
    let m = a.len();
    let max_iterations = 200 * (m + width) + 1_000;
    for _ in 0..max_iterations {
        // Bland: smallest-index column with negative reduced cost.
        let Some(entering) = (0..width).find(|&j| may_enter(j) && reduced[j] < -EPS) else {
            return true;
        };
        let mut leaving: Option<usize> = None;
        let mut best_ratio = f64::INFINITY;
        for i in 0..m {
            if a[i][entering] > EPS {
                let ratio = b[i] / a[i][entering];
                let replace = match leaving {
                    None => true,
                    Some(current) => {
                        ratio < best_ratio - EPS
                            || (ratio < best_ratio + EPS && basis[i] < basis[current])
                    }
                };
                if replace {
                    leaving = Some(i);
                    best_ratio = ratio;
                }
            }
        }
        let Some(leaving) = leaving else {
            warn!("Simplex detected an unbounded direction; aborting solve");
            return false;
        };
        pivot(a, b, basis, reduced, objective, leaving, entering);
    }
    warn!("Simplex hit the iteration guard; returning the current basis");
    true
}

fn pivot(
    a: &mut [Vec<f64>],
    b: &mut [f64],
    basis: &mut [usize],
    reduced: &mut [f64],
    objective: &mut f64,
    row: usize,
    col: usize,
) {
    let m = a.len();
    let width = a[row].len();
    let pivot_value = a[row][col];
    for j in 0..width {
        a[row][j] /= pivot_value;
    }
    b[row] /= pivot_value;
    for i in 0..m {
        if i != row && a[i][col].abs() > EPS {
            let factor = a[i][col];
            for j in 0..width {
                a[i][j] -= factor * a[row][j];
            }
            b[i] -= factor * b[row];
            if b[i].abs() < EPS {
                b[i] = 0.0;
            }
        }
    }
    let factor = reduced[col];
    if factor.abs() > EPS {
        for j in 0..width {
            reduced[j] -= factor * a[row][j];
        }
        *objective += factor * b[row];
    }
    basis[row] = col;
}

/// Pivots basic artificials (necessarily at value zero after phase 1) onto
/// any structural column of their row, so phase 2 starts from a clean basis.
/// A row without a structural pivot is redundant and keeps its artificial.
fn drive_out_artificials(
    a: &mut [Vec<f64>],
    b: &mut [f64],
    basis: &mut [usize],
    reduced: &mut [f64],
    art0: usize,
) {
    let m = a.len();
    for i in 0..m {
        if basis[i] >= art0 {
            let Some(col) = (0..art0).find(|&j| a[i][j].abs() > 1e-7) else {
                continue;
            };
            let mut discard = 0.0;
            pivot(a, b, basis, reduced, &mut discard, i, col);
        }
    }
}
