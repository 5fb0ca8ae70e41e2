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

use crate::model::configuration::SolverConfig;
use crate::model::plan::Assignment;
use crate::model::tour::TourList;
use serde_json::{Map, Value, json};
use sha2::{Digest, Sha256};

/// SHA-256 over the canonical line form of the sorted tour list. Two
/// forecasts that normalise to the same tour list share this hash.
pub fn input_hash(tours: &TourList) -> String {
    let lines: Vec<String> = tours.iter().map(|t| t.canonical_line()).collect();
    sha256_hex(lines.join("\n").as_bytes())
}

/// SHA-256 over the sorted `key=value` list of all tunable parameters.
pub fn config_hash(cfg: &SolverConfig) -> String {
    let lines: Vec<String> = cfg
        .canonical_entries()
        .into_iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect();
    sha256_hex(lines.join("\n").as_bytes())
}

/// SHA-256 over the assignments serialised as canonical JSON: sorted by
/// `(driver_id, day, first tour id)`, object keys in sorted order, no
/// whitespace. Never depends on map iteration order.
pub fn output_hash(assignments: &[Assignment]) -> String {
    let mut ordered: Vec<&Assignment> = assignments.iter().collect();
    ordered.sort_by(|a, b| {
        (a.driver_id.as_ref(), a.day, a.tour_ids.first())
            .cmp(&(b.driver_id.as_ref(), b.day, b.tour_ids.first()))
    });
    let rows: Vec<Value> = ordered
        .iter()
        .map(|a| {
            // Keys inserted in sorted order; serde_json keeps insertion order.
            let mut object = Map::new();
            object.insert("block_id".to_string(), json!(a.block_id.as_ref()));
            object.insert("day".to_string(), json!(a.day));
            object.insert("driver_id".to_string(), json!(a.driver_id.as_ref()));
            object.insert("driver_type".to_string(), json!(a.driver_type));
            object.insert(
                "tour_ids".to_string(),
                json!(a.tour_ids.iter().map(|t| t.as_ref()).collect::<Vec<_>>()),
            );
            Value::Object(object)
        })
        .collect();
    let canonical = Value::Array(rows).to_string();
    sha256_hex(canonical.as_bytes())
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hasher
        .finalize()
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}
