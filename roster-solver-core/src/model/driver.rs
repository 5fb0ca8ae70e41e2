use crate::error::KernelError;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// External description of one driver of the site pool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriverSpec {
    pub id: Box<str>,
    #[serde(default)]
    pub qualifications: Vec<Box<str>>,
}

/// The driver pool the plan draws its driver ids from. When no pool is
/// provided the kernel mints virtual drivers sized by the D-search result.
#[derive(Debug, Clone)]
pub struct DriverPool {
    drivers: Vec<DriverSpec>,
    virtual_pool: bool,
}

impl DriverPool {
    /// Validates an external pool: duplicate ids are rejected, drivers are
    /// ordered by id so that column-to-driver matching is deterministic.
    pub fn from_specs(mut drivers: Vec<DriverSpec>) -> Result<DriverPool, KernelError> {
        let mut seen: HashSet<Box<str>> = HashSet::with_capacity(drivers.len());
        for driver in &drivers {
            if !seen.insert(driver.id.clone()) {
                return Err(KernelError::InputDuplicateDriverId(driver.id.clone()));
            }
        }
        drivers.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(DriverPool { drivers, virtual_pool: false })
    }

    /// A virtual pool without qualification restrictions; ids are minted
    /// later, once the selected columns and their driver types are known.
    pub fn virtual_pool() -> DriverPool {
        DriverPool { drivers: Vec::new(), virtual_pool: true }
    }

    pub fn is_virtual(&self) -> bool {
        self.virtual_pool
    }
    pub fn len(&self) -> usize {
        self.drivers.len()
    }
    pub fn is_empty(&self) -> bool {
        self.drivers.is_empty()
    }
    pub fn drivers(&self) -> &[DriverSpec] {
        &self.drivers
    }

    /// Upper driver-count cap implied by the pool, if any.
    pub fn cap(&self) -> Option<usize> {
        if self.virtual_pool { None } else { Some(self.drivers.len()) }
    }

    pub fn is_qualified(&self, driver: &DriverSpec, required: &HashSet<&str>) -> bool {
        required
            .iter()
            .all(|q| driver.qualifications.iter().any(|have| have.as_ref() == *q))
    }
}
