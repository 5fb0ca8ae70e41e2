use crate::model::column::{Column, ColumnIdx};
use crate::model::tour::TourIdx;
use indexmap::IndexMap;
use log::debug;

/// The weekly column pool. Columns are only ever added; deduplication is by
/// 128-bit signature. Iteration order where externally observable is the
/// canonical signature order, never insertion order.
#[derive(Debug)]
pub struct ColumnPool {
    columns: Vec<Column>,
    by_signature: IndexMap<u128, ColumnIdx>,
    by_tour: Vec<Vec<ColumnIdx>>,
    /// Insertion round per column, feeding the "freshest" MIP slice.
    round_of: Vec<u32>,
    round: u32,
}

impl ColumnPool {
    pub fn new(n_tours: usize) -> ColumnPool {
        ColumnPool {
            columns: Vec::new(),
            by_signature: IndexMap::new(),
            by_tour: vec![Vec::new(); n_tours],
            round_of: Vec::new(),
            round: 0,
        }
    }

    /// Inserts a column unless an equivalent one (same covered-tour-set hash)
    /// already exists. Returns the index of the inserted column.
    pub fn insert(&mut self, column: Column) -> Option<ColumnIdx> {
        if self.by_signature.contains_key(&column.signature) {
            return None;
        }
        let idx = self.columns.len() as ColumnIdx;
        self.by_signature.insert(column.signature, idx);
        for &t in column.tour_idxs.iter() {
            self.by_tour[t as usize].push(idx);
        }
        self.columns.push(column);
        self.round_of.push(self.round);
        Some(idx)
    }

    /// Starts a new generation round (one per pricing batch).
    pub fn next_round(&mut self) {
        self.round += 1;
    }
    pub fn round(&self) -> u32 {
        self.round
    }
    pub fn round_of(&self, idx: ColumnIdx) -> u32 {
        self.round_of[idx as usize]
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
    pub fn column(&self, idx: ColumnIdx) -> &Column {
        &self.columns[idx as usize]
    }
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }
    pub fn covering(&self, tour: TourIdx) -> &[ColumnIdx] {
        &self.by_tour[tour as usize]
    }
    pub fn n_tours(&self) -> usize {
        self.by_tour.len()
    }
    pub fn contains_signature(&self, signature: u128) -> bool {
        self.by_signature.contains_key(&signature)
    }

    /// All column indices sorted by signature. This is the only order in
    /// which columns may be handed to the LP/MIP core or to signing.
    pub fn canonical_order(&self) -> Vec<ColumnIdx> {
        let mut order: Vec<ColumnIdx> = (0..self.columns.len() as ColumnIdx).collect();
        order.sort_by_key(|&c| self.columns[c as usize].signature);
        order
    }

    /// Tours without any covering column, in arena order.
    pub fn uncovered_tours(&self) -> Vec<TourIdx> {
        self.by_tour
            .iter()
            .enumerate()
            .filter(|(_, cols)| cols.is_empty())
            .map(|(t, _)| t as TourIdx)
            .collect()
    }

    /// Rough working-set estimate used by the memory gauge.
    pub fn approx_bytes(&self) -> u64 {
        let per_column: u64 = self
            .columns
            .iter()
            .map(|c| 96 + 4 * (c.block_idxs.len() + c.tour_idxs.len()) as u64 + 32)
            .sum();
        let index: u64 = 24 * self.by_signature.len() as u64
            + self.by_tour.iter().map(|v| 8 + 4 * v.len() as u64).sum::<u64>();
        per_column + index
    }

    pub fn log_stats(&self, label: &str) {
        let seeds = self.columns.iter().filter(|c| c.days_worked > 1).count();
        debug!(
            "Column pool [{}]: {} columns ({} multi-day), round {}",
            label,
            self.columns.len(),
            seeds,
            self.round
        );
    }
}
