//! Target/base branch selection for branching-capable servers

use log::{debug, info};

use crate::client::models::Branch;
use crate::error::{ConfigError, Result};

/// Branch names sent with a submission
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BranchSelection {
    pub target: Option<String>,
    pub base: Option<String>,
    /// The target does not exist yet and is created from `base` on submit
    pub creates_target: bool,
}

impl BranchSelection {
    pub fn new(target: Option<&str>, base: Option<&str>) -> Self {
        Self {
            target: target.map(str::to_string),
            base: base.map(str::to_string),
            creates_target: false,
        }
    }

    /// Check the selection against the project's existing branches.
    ///
    /// A base branch is only sent when the target is new. Without a target,
    /// the project's single default branch is used.
    pub fn resolve(self, branches: &[Branch]) -> Result<Self> {
        let Some(target) = self.target else {
            let mut defaults = branches.iter().filter(|b| b.is_default);
            return match (defaults.next(), defaults.next()) {
                (Some(default), None) => {
                    info!("No target branch given, using default branch '{}'", default.name);
                    Ok(Self {
                        target: Some(default.name.clone()),
                        base: None,
                        creates_target: false,
                    })
                }
                (None, _) => Err(ConfigError::DefaultBranch(
                    "the project has no default branch; set 'target-branch-name'".to_string(),
                )
                .into()),
                (Some(_), Some(_)) => Err(ConfigError::DefaultBranch(
                    "the project reports more than one default branch; set 'target-branch-name'"
                        .to_string(),
                )
                .into()),
            };
        };

        if Branch::is_present(branches, &target) {
            debug!("Target branch '{}' exists", target);
            return Ok(Self {
                target: Some(target),
                base: None,
                creates_target: false,
            });
        }

        match self.base {
            None => Err(ConfigError::MissingBaseBranch(target).into()),
            Some(base) if !Branch::is_present(branches, &base) => {
                Err(ConfigError::BaseBranchNotFound(base).into())
            }
            Some(base) => {
                info!("Branch '{}' will be created from '{}'", target, base);
                Ok(Self {
                    target: Some(target),
                    base: Some(base),
                    creates_target: true,
                })
            }
        }
    }
}
