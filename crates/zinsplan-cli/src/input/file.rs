use serde::de::DeserializeOwned;
use std::fs;
use std::path::{Path, PathBuf};

/// Input document formats accepted on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Json,
    Yaml,
}

impl DocumentFormat {
    /// `.yaml` / `.yml` are YAML, everything else is read as JSON.
    pub fn from_path(path: &Path) -> Self {
        match path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase())
            .as_deref()
        {
            Some("yaml") | Some("yml") => DocumentFormat::Yaml,
            _ => DocumentFormat::Json,
        }
    }
}

/// Read a JSON or YAML file and deserialise into a typed struct.
pub fn read_document<T: DeserializeOwned>(path: &str) -> Result<T, Box<dyn std::error::Error>> {
    let canonical = resolve_path(path)?;
    let contents = fs::read_to_string(&canonical)
        .map_err(|e| format!("Failed to read '{}': {}", canonical.display(), e))?;
    parse_document(&contents, DocumentFormat::from_path(&canonical))
        .map_err(|e| format!("Failed to parse '{}': {}", canonical.display(), e).into())
}

pub fn parse_document<T: DeserializeOwned>(
    contents: &str,
    format: DocumentFormat,
) -> Result<T, Box<dyn std::error::Error>> {
    let value = match format {
        DocumentFormat::Json => serde_json::from_str(contents)?,
        DocumentFormat::Yaml => serde_yaml::from_str(contents)?,
    };
    Ok(value)
}

/// Resolve the path against the working directory and check it is a file.
fn resolve_path(path: &str) -> Result<PathBuf, Box<dyn std::error::Error>> {
    let p = Path::new(path);
    let canonical = if p.is_absolute() {
        p.to_path_buf()
    } else {
        std::env::current_dir()?.join(p)
    };

    if !canonical.exists() {
        return Err(format!("File not found: {}", canonical.display()).into());
    }

    if !canonical.is_file() {
        return Err(format!("Not a file: {}", canonical.display()).into());
    }

    Ok(canonical)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use zinsplan_core::mezzanine::ZinsplanInput;

    #[test]
    fn test_format_from_extension() {
        assert_eq!(DocumentFormat::from_path(Path::new("deal.yaml")), DocumentFormat::Yaml);
        assert_eq!(DocumentFormat::from_path(Path::new("deal.YML")), DocumentFormat::Yaml);
        assert_eq!(DocumentFormat::from_path(Path::new("deal.json")), DocumentFormat::Json);
        assert_eq!(DocumentFormat::from_path(Path::new("deal")), DocumentFormat::Json);
    }

    #[test]
    fn test_parse_yaml_input() {
        let yaml = "
global:
  brokerage_fee_rate: 1.5
  structuring_due_at_maturity: true
tranches:
  - term_months: 36
    crowd_rate: 2.5
  - term_months: 12
";
        let input: ZinsplanInput = parse_document(yaml, DocumentFormat::Yaml).unwrap();

        assert_eq!(input.global.brokerage_fee_rate, dec!(1.5));
        assert!(input.global.structuring_due_at_maturity);
        assert_eq!(input.tranches.len(), 2);
        assert_eq!(input.tranches[0].crowd_rate, Some(dec!(2.5)));
        assert_eq!(input.tranches[1].principal, None);
    }

    #[test]
    fn test_missing_file() {
        let err = read_document::<ZinsplanInput>("definitely/not/here.json").unwrap_err();
        assert!(err.to_string().starts_with("File not found"));
    }
}
