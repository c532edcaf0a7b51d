use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

/// Outcome of one upload-and-replace pipeline run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadResult {
    pub success: bool,
    /// Flattened name of the last document written, `None` when nothing was written.
    pub last_written: Option<String>,
    /// Number of documents written, including ones later overwritten by a same-named entry.
    pub count: usize,
}

impl UploadResult {
    /// Build a successful result from the ordered list of written names.
    pub fn from_written(written: &[String]) -> Self {
        Self {
            success: true,
            last_written: written.last().cloned(),
            count: written.len(),
        }
    }
}

/// How an upload replaces the current document set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReplaceStrategy {
    /// Extract into a shadow directory and swap it into place once complete.
    /// A failed upload leaves the previous documents untouched.
    #[default]
    Swap,
    /// Purge the live directory first, then extract into it.
    /// A failed upload leaves the store empty.
    Purge,
}

impl FromStr for ReplaceStrategy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "swap" => Ok(ReplaceStrategy::Swap),
            "purge" => Ok(ReplaceStrategy::Purge),
            _ => Err(anyhow::anyhow!("Invalid replace strategy: {}", s)),
        }
    }
}

impl Display for ReplaceStrategy {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            ReplaceStrategy::Swap => write!(f, "swap"),
            ReplaceStrategy::Purge => write!(f, "purge"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upload_result_from_written() {
        let written = vec!["report.pdf".to_string(), "notes.pdf".to_string()];
        let result = UploadResult::from_written(&written);
        assert!(result.success);
        assert_eq!(result.last_written.as_deref(), Some("notes.pdf"));
        assert_eq!(result.count, 2);
    }

    #[test]
    fn test_upload_result_empty() {
        let result = UploadResult::from_written(&[]);
        assert!(result.success);
        assert_eq!(result.last_written, None);
        assert_eq!(result.count, 0);
    }

    #[test]
    fn test_replace_strategy_from_str() {
        assert_eq!("swap".parse::<ReplaceStrategy>().unwrap(), ReplaceStrategy::Swap);
        assert_eq!("PURGE".parse::<ReplaceStrategy>().unwrap(), ReplaceStrategy::Purge);
        assert!("merge".parse::<ReplaceStrategy>().is_err());
        assert_eq!(ReplaceStrategy::default(), ReplaceStrategy::Swap);
        assert_eq!(ReplaceStrategy::Purge.to_string(), "purge");
    }
}
