//! ISO alpha-2 code to country display name lookup.
//!
//! Border features are keyed by display name (`CNTRY_NAME`), while mesh
//! definitions list ISO codes, so codes are resolved through this table.

use std::path::Path;

use serde::Deserialize;

use crate::MeshError;

#[derive(Debug, Clone, Deserialize)]
struct CountryRow {
    #[serde(rename = "alpha-2")]
    alpha_2: String,
    name: String,
}

/// Code-to-name table loaded from a JSON list of `{alpha-2, name}` records.
#[derive(Debug, Clone, Default)]
pub struct CountryCodeTable {
    rows: Vec<CountryRow>,
}

impl CountryCodeTable {
    /// Builds a table from `(code, name)` pairs.
    #[must_use]
    pub fn from_pairs<I, C, N>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (C, N)>,
        C: Into<String>,
        N: Into<String>,
    {
        Self {
            rows: pairs
                .into_iter()
                .map(|(code, name)| CountryRow {
                    alpha_2: code.into(),
                    name: name.into(),
                })
                .collect(),
        }
    }

    /// Loads the table from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not a list of
    /// `{alpha-2, name}` records.
    pub fn load(path: &Path) -> Result<Self, MeshError> {
        let raw = std::fs::read_to_string(path).map_err(|e| MeshError::Io {
            path: path.display().to_string(),
            source: e,
        })?;
        let rows: Vec<CountryRow> =
            serde_json::from_str(&raw).map_err(|e| MeshError::MalformedInputFile {
                path: path.display().to_string(),
                message: e.to_string(),
            })?;

        log::debug!("Loaded {} country codes from {}", rows.len(), path.display());
        Ok(Self { rows })
    }

    /// Resolves an ISO alpha-2 code to its display name. Case-insensitive.
    ///
    /// # Errors
    ///
    /// Returns [`MeshError::UnknownCountryCode`] if the code is not in the
    /// table.
    pub fn name_for(&self, code: &str) -> Result<&str, MeshError> {
        let code = code.trim();
        self.rows
            .iter()
            .find(|row| row.alpha_2.eq_ignore_ascii_case(code))
            .map(|row| row.name.as_str())
            .ok_or_else(|| MeshError::UnknownCountryCode(code.to_string()))
    }

    /// Resolves every code in `codes`, failing on the first unknown one.
    ///
    /// # Errors
    ///
    /// Returns [`MeshError::UnknownCountryCode`] for the first unknown code.
    pub fn names_for(&self, codes: &[String]) -> Result<Vec<String>, MeshError> {
        codes
            .iter()
            .map(|code| self.name_for(code).map(ToString::to_string))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_alpha_2_records() {
        let rows: Vec<CountryRow> = serde_json::from_str(
            r#"[{"name": "Spain", "alpha-2": "ES", "alpha-3": "ESP"}, {"name": "Portugal", "alpha-2": "PT"}]"#,
        )
        .unwrap();
        let table = CountryCodeTable { rows };

        assert_eq!(table.name_for("ES").unwrap(), "Spain");
        assert_eq!(table.name_for("pt").unwrap(), "Portugal");
    }

    #[test]
    fn unknown_code_is_an_error() {
        let table = CountryCodeTable::from_pairs([("ES", "Spain")]);
        let err = table
            .names_for(&["ES".to_string(), "ZZ".to_string()])
            .unwrap_err();
        assert!(matches!(err, MeshError::UnknownCountryCode(code) if code == "ZZ"));
    }
}
