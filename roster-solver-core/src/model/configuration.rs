/*
 * Copyright (c) 2025 Clément GRENNERAT
 *
 * This program is free software: you can redistribute it and/or modify it under the terms of the
 * GNU General Public License as published by the Free Software Foundation, version 3.
 * This program is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without
 * even the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.
 * See the GNU General Public License for more details.
 * You should have received a copy of the GNU General Public License along with this program.
 * If not, see https://www.gnu.org/licenses/.
 *
 */

use crate::error::KernelError;
use crate::model::plan::{Reason, ReasonCode};
use log::warn;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The solver configuration bundle. The field set enumerates exactly the
/// recognised external keys; unknown keys are rejected at the boundary and
/// out-of-range numerics are clamped and reported.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SolverConfig {
    /// PRNG seed; part of the config hash.
    pub seed: u64,
    /// Total wall-clock budget in seconds.
    pub time_budget_seconds: f64,
    /// Profiling / construction / search / polish fractions, summing to <= 1.0.
    /// The remainder is buffer.
    pub phase_slices: [f64; 4],
    pub fte_target_min: f64,
    pub fte_target_max: f64,
    pub weekly_hard_cap: f64,
    pub pt_max: f64,
    pub enable_split_blocks: bool,
    pub max_pause_regular: u32,
    pub split_pause: u32,
    /// Block-pool cap per tour (the dynamic cap doubles it for scarce tours).
    pub k_per_tour: usize,
    /// Global block-pool cap.
    pub n_pool_cap: usize,
    /// Restricted MIP subset cap.
    pub n_subset_cap: usize,
    pub mip_time_limit_restricted: f64,
    pub mip_time_limit_final: f64,
    /// Locked to 1 in the public contract; overrides are rejected.
    pub num_search_workers: u32,
}

impl Default for SolverConfig {
    fn default() -> Self {
        SolverConfig {
            seed: 0,
            time_budget_seconds: 30.0,
            phase_slices: [0.02, 0.50, 0.15, 0.28],
            fte_target_min: 42.0,
            fte_target_max: 53.0,
            weekly_hard_cap: 55.0,
            pt_max: 42.0,
            enable_split_blocks: true,
            max_pause_regular: 60,
            split_pause: 360,
            k_per_tour: 16,
            n_pool_cap: 20_000,
            n_subset_cap: 1_500,
            mip_time_limit_restricted: 20.0,
            mip_time_limit_final: 30.0,
            num_search_workers: 1,
        }
    }
}

impl SolverConfig {
    /// Builds a configuration from a `key=value` bundle, starting from the
    /// defaults. Unknown keys are rejected, `num_search_workers` must stay at
    /// 1, and every out-of-range numeric is clamped with a reported reason.
    pub fn from_entries(
        entries: &BTreeMap<String, String>,
    ) -> Result<(SolverConfig, Vec<Reason>), KernelError> {
        let mut cfg = SolverConfig::default();
        let mut reasons = Vec::new();
        for (key, value) in entries {
            match key.as_str() {
                "seed" => cfg.seed = parse_num(key, value)?,
                "time_budget_seconds" => cfg.time_budget_seconds = parse_num(key, value)?,
                "phase_slices" => cfg.phase_slices = parse_slices(key, value)?,
                "fte_target_min" => cfg.fte_target_min = parse_num(key, value)?,
                "fte_target_max" => cfg.fte_target_max = parse_num(key, value)?,
                "weekly_hard_cap" => cfg.weekly_hard_cap = parse_num(key, value)?,
                "pt_max" => cfg.pt_max = parse_num(key, value)?,
                "enable_split_blocks" => cfg.enable_split_blocks = parse_bool(key, value)?,
                "max_pause_regular" => cfg.max_pause_regular = parse_num(key, value)?,
                "split_pause" => cfg.split_pause = parse_num(key, value)?,
                "k_per_tour" => cfg.k_per_tour = parse_num(key, value)?,
                "n_pool_cap" => cfg.n_pool_cap = parse_num(key, value)?,
                "n_subset_cap" => cfg.n_subset_cap = parse_num(key, value)?,
                "mip_time_limit_restricted" => cfg.mip_time_limit_restricted = parse_num(key, value)?,
                "mip_time_limit_final" => cfg.mip_time_limit_final = parse_num(key, value)?,
                "num_search_workers" => {
                    let workers: u32 = parse_num(key, value)?;
                    if workers != 1 {
                        return Err(KernelError::ConfigLockedKey {
                            key: key.as_str().into(),
                            locked_value: "1".to_string(),
                        });
                    }
                }
                _ => return Err(KernelError::ConfigUnknownKey(key.as_str().into())),
            }
        }
        cfg.clamp(&mut reasons);
        Ok((cfg, reasons))
    }

    /// Clamps every numeric to its legal range, reporting each adjustment.
    pub fn clamp(&mut self, reasons: &mut Vec<Reason>) {
        clamp_f64(&mut self.time_budget_seconds, 0.1, 3600.0, "time_budget_seconds", reasons);
        for slice in self.phase_slices.iter_mut() {
            *slice = slice.clamp(0.0, 1.0);
        }
        let sum: f64 = self.phase_slices.iter().sum();
        if sum > 1.0 {
            for slice in self.phase_slices.iter_mut() {
                *slice /= sum;
            }
            push_clamped("phase_slices", &format!("sum {sum} > 1.0, rescaled"), reasons);
        }
        clamp_f64(&mut self.fte_target_min, 1.0, 80.0, "fte_target_min", reasons);
        clamp_f64(&mut self.fte_target_max, 1.0, 80.0, "fte_target_max", reasons);
        clamp_f64(&mut self.weekly_hard_cap, 1.0, 80.0, "weekly_hard_cap", reasons);
        clamp_f64(&mut self.pt_max, 1.0, 80.0, "pt_max", reasons);
        clamp_u32(&mut self.max_pause_regular, 0, 720, "max_pause_regular", reasons);
        clamp_u32(&mut self.split_pause, 0, 720, "split_pause", reasons);
        clamp_usize(&mut self.k_per_tour, 1, 1_000, "k_per_tour", reasons);
        clamp_usize(&mut self.n_pool_cap, 16, 1_000_000, "n_pool_cap", reasons);
        clamp_usize(&mut self.n_subset_cap, 16, 100_000, "n_subset_cap", reasons);
        clamp_f64(&mut self.mip_time_limit_restricted, 0.1, 3600.0, "mip_time_limit_restricted", reasons);
        clamp_f64(&mut self.mip_time_limit_final, 0.1, 3600.0, "mip_time_limit_final", reasons);
    }

    /// The sorted `key=value` list over all tunable parameters, feeding the
    /// config hash.
    pub fn canonical_entries(&self) -> Vec<(String, String)> {
        let slices = self
            .phase_slices
            .iter()
            .map(|s| s.to_string())
            .collect::<Vec<_>>()
            .join(",");
        let mut entries = vec![
            ("enable_split_blocks".to_string(), self.enable_split_blocks.to_string()),
            ("fte_target_max".to_string(), self.fte_target_max.to_string()),
            ("fte_target_min".to_string(), self.fte_target_min.to_string()),
            ("k_per_tour".to_string(), self.k_per_tour.to_string()),
            ("max_pause_regular".to_string(), self.max_pause_regular.to_string()),
            ("mip_time_limit_final".to_string(), self.mip_time_limit_final.to_string()),
            ("mip_time_limit_restricted".to_string(), self.mip_time_limit_restricted.to_string()),
            ("n_pool_cap".to_string(), self.n_pool_cap.to_string()),
            ("n_subset_cap".to_string(), self.n_subset_cap.to_string()),
            ("num_search_workers".to_string(), self.num_search_workers.to_string()),
            ("phase_slices".to_string(), slices),
            ("pt_max".to_string(), self.pt_max.to_string()),
            ("seed".to_string(), self.seed.to_string()),
            ("split_pause".to_string(), self.split_pause.to_string()),
            ("time_budget_seconds".to_string(), self.time_budget_seconds.to_string()),
            ("weekly_hard_cap".to_string(), self.weekly_hard_cap.to_string()),
        ];
        entries.sort();
        entries
    }
}

fn parse_num<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, KernelError> {
    value.trim().parse::<T>().map_err(|_| KernelError::ConfigInvalidValue {
        key: key.into(),
        value: value.to_string(),
        expected: "number",
    })
}

fn parse_bool(key: &str, value: &str) -> Result<bool, KernelError> {
    match value.trim() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        _ => Err(KernelError::ConfigInvalidValue {
            key: key.into(),
            value: value.to_string(),
            expected: "boolean",
        }),
    }
}

fn parse_slices(key: &str, value: &str) -> Result<[f64; 4], KernelError> {
    let parts: Vec<f64> = value
        .split(',')
        .map(|p| parse_num::<f64>(key, p))
        .collect::<Result<_, _>>()?;
    if parts.len() != 4 {
        return Err(KernelError::ConfigInvalidValue {
            key: key.into(),
            value: value.to_string(),
            expected: "list of 4 comma-separated floats",
        });
    }
    Ok([parts[0], parts[1], parts[2], parts[3]])
}

fn push_clamped(key: &str, detail: &str, reasons: &mut Vec<Reason>) {
    warn!("Configuration key {} clamped: {}", key, detail);
    reasons.push(Reason::new(ReasonCode::ConfigClamped, format!("{key}: {detail}")));
}

fn clamp_f64(value: &mut f64, min: f64, max: f64, key: &str, reasons: &mut Vec<Reason>) {
    if !value.is_finite() || *value < min || *value > max {
        let clamped = if value.is_finite() { value.clamp(min, max) } else { min };
        push_clamped(key, &format!("{value} -> {clamped}"), reasons);
        *value = clamped;
    }
}

fn clamp_u32(value: &mut u32, min: u32, max: u32, key: &str, reasons: &mut Vec<Reason>) {
    if *value < min || *value > max {
        let clamped = (*value).clamp(min, max);
        push_clamped(key, &format!("{value} -> {clamped}"), reasons);
        *value = clamped;
    }
}

fn clamp_usize(value: &mut usize, min: usize, max: usize, key: &str, reasons: &mut Vec<Reason>) {
    if *value < min || *value > max {
        let clamped = (*value).clamp(min, max);
        push_clamped(key, &format!("{value} -> {clamped}"), reasons);
        *value = clamped;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_key_is_rejected() {
        let mut entries = BTreeMap::new();
        entries.insert("max_pasue_regular".to_string(), "45".to_string());
        let err = SolverConfig::from_entries(&entries).unwrap_err();
        assert!(matches!(err, KernelError::ConfigUnknownKey(_)));
    }

    #[test]
    fn locked_key_rejects_override() {
        let mut entries = BTreeMap::new();
        entries.insert("num_search_workers".to_string(), "4".to_string());
        let err = SolverConfig::from_entries(&entries).unwrap_err();
        assert!(matches!(err, KernelError::ConfigLockedKey { .. }));

        let mut entries = BTreeMap::new();
        entries.insert("num_search_workers".to_string(), "1".to_string());
        assert!(SolverConfig::from_entries(&entries).is_ok());
    }

    #[test]
    fn out_of_range_values_are_clamped_and_reported() {
        let mut entries = BTreeMap::new();
        entries.insert("weekly_hard_cap".to_string(), "400".to_string());
        entries.insert("k_per_tour".to_string(), "0".to_string());
        let (cfg, reasons) = SolverConfig::from_entries(&entries).unwrap();
        assert_eq!(cfg.weekly_hard_cap, 80.0);
        assert_eq!(cfg.k_per_tour, 1);
        assert_eq!(reasons.len(), 2);
        assert!(reasons.iter().all(|r| r.code == ReasonCode::ConfigClamped));
    }

    #[test]
    fn canonical_entries_are_sorted_and_complete() {
        let cfg = SolverConfig::default();
        let entries = cfg.canonical_entries();
        assert_eq!(entries.len(), 16);
        let mut sorted = entries.clone();
        sorted.sort();
        assert_eq!(entries, sorted);
    }
}
