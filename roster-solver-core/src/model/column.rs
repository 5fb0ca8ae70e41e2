use crate::model::block::{Block, BlockIdx};
use crate::model::tour::{TourIdx, TourList};
use range_set_blaze::RangeSetBlaze;
use serde::Serialize;
use sha2::{Digest, Sha256};

/// Index of a column inside the column pool arena.
pub type ColumnIdx = u32;

/// Set of covered tour indices, supporting cheap disjointness and union tests.
pub type TourSet = RangeSetBlaze<u32>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DriverType {
    Fte,
    Pt,
}

/// Provenance of a column, kept for diagnostics and the "freshest" MIP slice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnOrigin {
    Seed,
    Priced,
    Fallback,
}

/// One driver's weekly plan: an ordered sequence of blocks across distinct
/// days. Columns are immutable once built and are deduplicated by signature.
#[derive(Debug, Clone)]
pub struct Column {
    /// Block indices ordered by day.
    pub block_idxs: Box<[BlockIdx]>,
    /// Covered tour indices, sorted.
    pub tour_idxs: Box<[TourIdx]>,
    pub tour_set: TourSet,
    pub work_min: u32,
    pub days_worked: u8,
    pub origin: ColumnOrigin,
    /// 128-bit hash of the sorted covered tour ids.
    pub signature: u128,
}

impl Column {
    /// Builds a column from day-ordered block indices, deriving the covered
    /// tour set, work minutes and signature. The blocks are assumed to lie on
    /// pairwise distinct days (callers enforce chain legality separately).
    pub fn from_blocks(
        tours: &TourList,
        blocks: &[Block],
        block_idxs: Vec<BlockIdx>,
        origin: ColumnOrigin,
    ) -> Column {
        let mut tour_idxs: Vec<TourIdx> = block_idxs
            .iter()
            .flat_map(|&b| blocks[b as usize].tour_idxs.iter().copied())
            .collect();
        tour_idxs.sort_unstable();
        let tour_set = TourSet::from_iter(tour_idxs.iter().copied());
        let work_min = block_idxs.iter().map(|&b| blocks[b as usize].work_min).sum();
        let days_worked = block_idxs.len() as u8;
        let signature = signature_of(tours, &tour_idxs);
        Column {
            block_idxs: block_idxs.into_boxed_slice(),
            tour_idxs: tour_idxs.into_boxed_slice(),
            tour_set,
            work_min,
            days_worked,
            origin,
            signature,
        }
    }

    pub fn hours(&self) -> f64 {
        self.work_min as f64 / 60.0
    }
    pub fn covers(&self, tour: TourIdx) -> bool {
        self.tour_set.contains(tour)
    }
    pub fn is_disjoint(&self, other: &Column) -> bool {
        (&self.tour_set & &other.tour_set).is_empty()
    }
}

/// 128-bit column signature: the first 16 bytes of the SHA-256 digest over the
/// lexicographically sorted covered tour ids joined by `|`.
pub fn signature_of(tours: &TourList, tour_idxs: &[TourIdx]) -> u128 {
    let mut ids: Vec<&str> = tour_idxs.iter().map(|&t| tours.get(t).id.as_ref()).collect();
    ids.sort_unstable();
    let mut hasher = Sha256::new();
    hasher.update(ids.join("|").as_bytes());
    let digest = hasher.finalize();
    let mut first = [0u8; 16];
    first.copy_from_slice(&digest[..16]);
    u128::from_be_bytes(first)
}
