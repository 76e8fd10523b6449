//! Rater roster

use crate::models::Rater;
use crate::{Error, Result};

/// Fixed set of rater identifiers an operator can pick from
#[derive(Debug, Clone)]
pub struct RaterRoster {
    raters: Vec<Rater>,
}

impl RaterRoster {
    /// Build a roster, dropping blanks and duplicates while keeping order
    pub fn new<I, S>(names: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut raters: Vec<Rater> = Vec::new();
        for name in names {
            let name = name.as_ref().trim();
            if name.is_empty() || raters.iter().any(|r| r.as_str() == name) {
                continue;
            }
            raters.push(Rater::new(name));
        }

        if raters.is_empty() {
            return Err(Error::Config("Rater roster is empty".to_string()));
        }
        Ok(Self { raters })
    }

    pub fn raters(&self) -> &[Rater] {
        &self.raters
    }

    /// First rater, preselected in the UI
    pub fn default_rater(&self) -> &Rater {
        &self.raters[0]
    }

    /// Resolve a submitted rater name against the roster
    pub fn resolve(&self, name: &str) -> Result<Rater> {
        self.raters
            .iter()
            .find(|r| r.as_str() == name.trim())
            .cloned()
            .ok_or_else(|| Error::InvalidInput(format!("Unknown rater: {}", name)))
    }
}

impl Default for RaterRoster {
    fn default() -> Self {
        Self {
            raters: crate::config::default_raters()
                .into_iter()
                .map(Rater::new)
                .collect(),
        }
    }
}
