use anyhow::{anyhow, Result};

use crate::pipeline::tally::{Metrics, Tally};

pub const DEFAULT_MODERATE_INCIDENCE: f64 = 0.20;
pub const DEFAULT_UNHEALTHY_INCIDENCE: f64 = 0.40;

/// Qualitative health of a scored image, ordered from healthiest.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum HealthStatus {
    Healthy,
    Moderate,
    Unhealthy,
}

impl HealthStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            HealthStatus::Healthy => "Healthy",
            HealthStatus::Moderate => "Moderate",
            HealthStatus::Unhealthy => "Unhealthy",
        }
    }
}

/// Disease-incidence breakpoints `moderate < unhealthy`.
///
/// `incidence <= moderate` is Healthy, `incidence <= unhealthy` is Moderate,
/// anything above is Unhealthy. A value sitting exactly on a breakpoint
/// belongs to the healthier band.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct IncidenceThresholds {
    moderate: f64,
    unhealthy: f64,
}

impl IncidenceThresholds {
    pub fn new(moderate: f64, unhealthy: f64) -> Result<Self> {
        if !moderate.is_finite() || !unhealthy.is_finite() {
            return Err(anyhow!("incidence thresholds must be finite"));
        }
        if !(0.0..=1.0).contains(&moderate) || !(0.0..=1.0).contains(&unhealthy) {
            return Err(anyhow!(
                "incidence thresholds must lie in [0, 1] (got {}, {})",
                moderate,
                unhealthy
            ));
        }
        if moderate >= unhealthy {
            return Err(anyhow!(
                "moderate threshold {} must be below unhealthy threshold {}",
                moderate,
                unhealthy
            ));
        }
        Ok(Self {
            moderate,
            unhealthy,
        })
    }

    pub fn moderate(&self) -> f64 {
        self.moderate
    }

    pub fn unhealthy(&self) -> f64 {
        self.unhealthy
    }

    /// Map a disease incidence to its band.
    pub fn status_for(&self, incidence: f64) -> HealthStatus {
        if incidence <= self.moderate {
            HealthStatus::Healthy
        } else if incidence <= self.unhealthy {
            HealthStatus::Moderate
        } else {
            HealthStatus::Unhealthy
        }
    }
}

impl Default for IncidenceThresholds {
    fn default() -> Self {
        Self {
            moderate: DEFAULT_MODERATE_INCIDENCE,
            unhealthy: DEFAULT_UNHEALTHY_INCIDENCE,
        }
    }
}

/// Result of applying the policy to a tally.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Verdict {
    /// Every surviving detection was uncertain; incidence is undefined.
    Unknown,
    Scored {
        status: HealthStatus,
        metrics: Metrics,
    },
}

impl Verdict {
    pub fn status_str(&self) -> &'static str {
        match self {
            Verdict::Unknown => "Unknown",
            Verdict::Scored { status, .. } => status.as_str(),
        }
    }

    pub fn metrics(&self) -> Option<Metrics> {
        match self {
            Verdict::Unknown => None,
            Verdict::Scored { metrics, .. } => Some(*metrics),
        }
    }
}

/// Score a tally. Never divides by zero: no counted leaves means `Unknown`.
pub fn score(tally: &Tally, thresholds: &IncidenceThresholds) -> Verdict {
    match tally.metrics() {
        None => Verdict::Unknown,
        Some(metrics) => Verdict::Scored {
            status: thresholds.status_for(metrics.disease_incidence),
            metrics,
        },
    }
}
