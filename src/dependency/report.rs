use super::Dependency;
use crate::error::{Error, Result};

/// Result of evaluating one dependency's probes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DependencyStatus {
    /// Present and healthy; carries the probe's version banner if any.
    Present { version: Option<String> },
    /// Installed, but its health probe failed (e.g. daemon not reachable).
    Unhealthy { reason: String },
    Missing,
}

/// Which remediation a gap calls for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Remedy {
    Install,
    StartService,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckedDependency {
    pub dependency: Dependency,
    pub status: DependencyStatus,
}

impl CheckedDependency {
    pub fn name(&self) -> &str {
        &self.dependency.name
    }
}

/// Outcome of a full check cycle. Recomputed on every invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconciliationReport {
    pub present: Vec<CheckedDependency>,
    pub unhealthy: Vec<CheckedDependency>,
    pub missing_required: Vec<Dependency>,
    pub missing_optional: Vec<Dependency>,
}

impl ReconciliationReport {
    pub(super) fn record(&mut self, checked: CheckedDependency) {
        match checked.status {
            DependencyStatus::Present { .. } => self.present.push(checked),
            DependencyStatus::Unhealthy { .. } => self.unhealthy.push(checked),
            DependencyStatus::Missing if checked.dependency.required => {
                self.missing_required.push(checked.dependency)
            }
            DependencyStatus::Missing => self.missing_optional.push(checked.dependency),
        }
    }

    /// Every required dependency is present and healthy.
    pub fn is_satisfied(&self) -> bool {
        self.missing_required.is_empty()
            && self.unhealthy.iter().all(|c| !c.dependency.required)
    }

    pub fn is_present(&self, name: &str) -> bool {
        self.present.iter().any(|c| c.name() == name)
    }

    /// Required gaps in registry order: missing ones first, then unhealthy.
    pub fn required_gaps(&self) -> Vec<String> {
        self.missing_required
            .iter()
            .map(|d| d.name.clone())
            .chain(
                self.unhealthy
                    .iter()
                    .filter(|c| c.dependency.required)
                    .map(|c| format!("{} (unhealthy)", c.name())),
            )
            .collect()
    }

    /// Aggregate failure listing every required gap.
    pub fn ensure_required(&self) -> Result<()> {
        if self.is_satisfied() {
            Ok(())
        } else {
            Err(Error::MissingRequiredDependency(self.required_gaps()))
        }
    }

    /// Warning-level report for absent optional tools.
    pub fn optional_warning(&self) -> Option<Error> {
        if self.missing_optional.is_empty() {
            None
        } else {
            Some(Error::MissingOptionalDependency(
                self.missing_optional.iter().map(|d| d.name.clone()).collect(),
            ))
        }
    }

    /// Required dependencies needing remediation, with the action each
    /// calls for: absent ones get installed, unhealthy ones started.
    pub fn required_remedies(&self) -> Vec<(Dependency, Remedy)> {
        self.missing_required
            .iter()
            .map(|d| (d.clone(), Remedy::Install))
            .chain(
                self.unhealthy
                    .iter()
                    .filter(|c| c.dependency.required)
                    .map(|c| (c.dependency.clone(), Remedy::StartService)),
            )
            .collect()
    }
}
