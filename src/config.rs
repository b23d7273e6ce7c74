/// Column names an export must carry before a CSV delimiter is accepted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RequiredHeaders {
    pub surname: String,
    pub first_name: String,
    pub start_date: String,
}

impl Default for RequiredHeaders {
    fn default() -> Self {
        Self {
            surname: "Langname".to_string(),
            first_name: "Vorname".to_string(),
            start_date: "Beginndatum".to_string(),
        }
    }
}

impl RequiredHeaders {
    pub fn names(&self) -> [&str; 3] {
        [
            self.surname.as_str(),
            self.first_name.as_str(),
            self.start_date.as_str(),
        ]
    }
}

/// Ingestion settings, loaded from the environment (and `.env`).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IngestConfig {
    pub required_headers: RequiredHeaders,
    /// Accepted spellings of the class column, matched case-insensitively.
    pub class_headers: Vec<String>,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            required_headers: RequiredHeaders::default(),
            class_headers: default_class_headers(),
        }
    }
}

impl IngestConfig {
    pub fn from_env() -> Self {
        let defaults = RequiredHeaders::default();
        Self {
            required_headers: RequiredHeaders {
                surname: env_or("ATTENDANCE_SURNAME_HEADER", defaults.surname),
                first_name: env_or("ATTENDANCE_FIRST_NAME_HEADER", defaults.first_name),
                start_date: env_or("ATTENDANCE_START_DATE_HEADER", defaults.start_date),
            },
            class_headers: std::env::var("ATTENDANCE_CLASS_HEADERS")
                .ok()
                .map(|v| parse_header_list(&v))
                .filter(|list| !list.is_empty())
                .unwrap_or_else(default_class_headers),
        }
    }
}

fn env_or(key: &str, default: String) -> String {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or(default)
}

fn default_class_headers() -> Vec<String> {
    vec!["klasse".to_string(), "klassen".to_string(), "class".to_string()]
}

pub fn parse_header_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_untis_exports() {
        let config = IngestConfig::default();
        assert_eq!(
            config.required_headers.names(),
            ["Langname", "Vorname", "Beginndatum"]
        );
        assert!(config.class_headers.contains(&"klasse".to_string()));
    }

    #[test]
    fn header_list_skips_blanks() {
        assert_eq!(
            parse_header_list(" Klasse, class ,, "),
            vec!["Klasse".to_string(), "class".to_string()]
        );
        assert!(parse_header_list(" , ").is_empty());
    }
}
