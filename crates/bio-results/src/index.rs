//! Directory indexing by file name only; no file contents are read here.

use std::collections::BTreeSet;
use std::path::Path;

use regex::Regex;

use crate::{ResultsError, ResultsResult};

/// Names of the regular files directly inside `dir`, sorted.
pub fn list_file_names(dir: &Path) -> ResultsResult<Vec<String>> {
    if !dir.is_dir() {
        return Err(ResultsError::DatasetNotFound {
            dir: dir.display().to_string(),
            what: "directory".to_string(),
        });
    }
    let mut names = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_type()?.is_file() {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
    }
    names.sort();
    Ok(names)
}

/// Distinct integers captured by the first group of `pattern`, sorted ascending.
///
/// Zero matching files is a [`ResultsError::DatasetNotFound`], distinct from a directory
/// that merely holds few files of the requested kind.
pub fn unique_captures(names: &[String], pattern: &str, dir: &Path, what: &str) -> ResultsResult<Vec<u32>> {
    let values = captures(names, pattern)?;
    if values.is_empty() {
        tracing::debug!(dir = %dir.display(), what, "no matching files");
        return Err(ResultsError::DatasetNotFound {
            dir: dir.display().to_string(),
            what: what.to_string(),
        });
    }
    Ok(values.into_iter().collect())
}

/// Like [`unique_captures`] but an empty result is not an error.
pub fn captures(names: &[String], pattern: &str) -> ResultsResult<BTreeSet<u32>> {
    let re = Regex::new(pattern)?;
    Ok(names
        .iter()
        .filter_map(|name| re.captures(name))
        .filter_map(|caps| caps.get(1).and_then(|m| m.as_str().parse::<u32>().ok()))
        .collect())
}

/// Scans `dir` and returns the distinct captures of `pattern`.
pub fn scan(dir: &Path, pattern: &str, what: &str) -> ResultsResult<Vec<u32>> {
    let names = list_file_names(dir)?;
    unique_captures(&names, pattern, dir, what)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn distinct_sorted_captures() {
        let files = names(&[
            "Run01_uVel_t000300.out",
            "Run01_vVel_t000300.out",
            "Run01_uVel_t000100.out",
            "Run02_uVel_t000200.out",
            "Run01_budget0_term01_t000100_n000010.s3D",
        ]);
        let got = unique_captures(&files, r"^Run01.*_t(\d+).*\.out$", Path::new("."), "fields").unwrap();
        assert_eq!(got, vec![100, 300]);
    }

    #[test]
    fn zero_matches_is_not_found() {
        let files = names(&["notes.txt"]);
        let err = unique_captures(&files, r"^Run01.*_n(\d+).*", Path::new("."), "budgets").unwrap_err();
        assert!(matches!(err, ResultsError::DatasetNotFound { .. }));
        assert!(captures(&files, r"^Run01.*_n(\d+).*").unwrap().is_empty());
    }

    #[test]
    fn missing_directory_is_not_found() {
        let err = list_file_names(Path::new("/definitely/not/here")).unwrap_err();
        assert!(matches!(err, ResultsError::DatasetNotFound { .. }));
    }
}
