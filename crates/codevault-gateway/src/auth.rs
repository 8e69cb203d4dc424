//! Admin identification and team PIN checks

use codevault_core::{AdminConfig, Error, Result};

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}

/// The configured admin id, normalised for comparison.
#[derive(Clone, Debug)]
pub struct AdminAuth {
    id: String,
}

impl AdminAuth {
    pub fn from_config(config: &AdminConfig) -> Self {
        Self {
            id: config.id.trim().to_lowercase(),
        }
    }

    /// Check a candidate taken from the `x-admin-id` header or the `adminId` body field.
    pub fn verify(&self, candidate: Option<&str>) -> Result<()> {
        if self.id.is_empty() {
            return Err(Error::auth_failed("admin access disabled"));
        }
        let candidate = candidate
            .map(|c| c.trim().to_lowercase())
            .filter(|c| !c.is_empty())
            .ok_or_else(|| Error::auth_failed("admin id required"))?;
        if !constant_time_eq(self.id.as_bytes(), candidate.as_bytes()) {
            return Err(Error::auth_failed("invalid admin id"));
        }
        Ok(())
    }
}

/// A team without a stored PIN logs in with its id alone.
pub fn verify_pin(expected: Option<&str>, provided: Option<&str>) -> Result<()> {
    let Some(expected) = expected else {
        return Ok(());
    };
    let provided = provided.ok_or_else(|| Error::auth_failed("pin required"))?;
    if !constant_time_eq(expected.as_bytes(), provided.trim().as_bytes()) {
        return Err(Error::auth_failed("invalid pin"));
    }
    Ok(())
}
