//! Raw system query options, split out of a query string but not yet parsed.

use crate::error::{ODataError, Result};
use indexmap::IndexMap;
use std::fmt;

/// The system query options this crate understands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SystemQueryOption {
    Count,
    Expand,
    Filter,
    Format,
    OrderBy,
    Search,
    Select,
    Skip,
    Top,
}

impl SystemQueryOption {
    pub const ALL: [SystemQueryOption; 9] = [
        SystemQueryOption::Count,
        SystemQueryOption::Expand,
        SystemQueryOption::Filter,
        SystemQueryOption::Format,
        SystemQueryOption::OrderBy,
        SystemQueryOption::Search,
        SystemQueryOption::Select,
        SystemQueryOption::Skip,
        SystemQueryOption::Top,
    ];

    /// Look up an option by its name including the `$`, e.g. `$filter`
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|option| option.name() == name)
    }

    pub fn name(&self) -> &'static str {
        match self {
            SystemQueryOption::Count => "$count",
            SystemQueryOption::Expand => "$expand",
            SystemQueryOption::Filter => "$filter",
            SystemQueryOption::Format => "$format",
            SystemQueryOption::OrderBy => "$orderby",
            SystemQueryOption::Search => "$search",
            SystemQueryOption::Select => "$select",
            SystemQueryOption::Skip => "$skip",
            SystemQueryOption::Top => "$top",
        }
    }
}

impl fmt::Display for SystemQueryOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Each supplied system option's decoded clause, e.g. `$filter=Name eq 'X'`,
/// in the order the options appeared.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawQueryOptions {
    clauses: IndexMap<SystemQueryOption, String>,
}

impl RawQueryOptions {
    /// Split a query string into its system option clauses.
    ///
    /// A leading `?` is ignored. Each `&` separated clause has `+` replaced by a space
    /// and is then percent-decoded, so an encoded `%2B` survives as a literal `+`.
    /// Options not starting with `$` are custom options and are skipped.
    pub fn parse(query: &str) -> Result<Self> {
        let query = query.strip_prefix('?').unwrap_or(query);
        let mut clauses = IndexMap::new();

        for part in query.split('&').filter(|part| !part.is_empty()) {
            let spaced = part.replace('+', " ");
            let clause = urlencoding::decode(&spaced)
                .map_err(|e| {
                    ODataError::usage(
                        format!("The query option '{}' is not valid percent-encoded UTF-8: {}", part, e),
                        None,
                    )
                })?
                .into_owned();

            if !clause.starts_with('$') {
                log::trace!("ignoring custom query option '{}'", clause);
                continue;
            }

            let (name, value) = clause.split_once('=').unwrap_or((clause.as_str(), ""));
            let option = SystemQueryOption::from_name(name).ok_or_else(|| {
                ODataError::usage(format!("Unknown system query option '{}'", name), Some(name))
            })?;
            if value.trim().is_empty() {
                return Err(ODataError::usage(
                    format!("The query option '{}' requires a value", option),
                    Some(option.name()),
                ));
            }
            if clauses.contains_key(&option) {
                return Err(ODataError::usage(
                    format!("The query option '{}' is specified more than once", option),
                    Some(option.name()),
                ));
            }
            clauses.insert(option, clause);
        }

        Ok(RawQueryOptions { clauses })
    }

    /// The clause for an option, as supplied
    pub fn clause(&self, option: SystemQueryOption) -> Option<&str> {
        self.clauses.get(&option).map(String::as_str)
    }

    /// The text after `=` in an option's clause
    pub fn value(&self, option: SystemQueryOption) -> Option<&str> {
        self.clause(option)
            .and_then(|clause| clause.split_once('='))
            .map(|(_, value)| value)
    }

    /// Options present, in the order supplied
    pub fn options(&self) -> impl Iterator<Item = SystemQueryOption> + '_ {
        self.clauses.keys().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    pub fn count(&self) -> Option<&str> {
        self.clause(SystemQueryOption::Count)
    }

    pub fn expand(&self) -> Option<&str> {
        self.clause(SystemQueryOption::Expand)
    }

    pub fn filter(&self) -> Option<&str> {
        self.clause(SystemQueryOption::Filter)
    }

    pub fn format(&self) -> Option<&str> {
        self.clause(SystemQueryOption::Format)
    }

    pub fn order_by(&self) -> Option<&str> {
        self.clause(SystemQueryOption::OrderBy)
    }

    pub fn search(&self) -> Option<&str> {
        self.clause(SystemQueryOption::Search)
    }

    pub fn select(&self) -> Option<&str> {
        self.clause(SystemQueryOption::Select)
    }

    pub fn skip(&self) -> Option<&str> {
        self.clause(SystemQueryOption::Skip)
    }

    pub fn top(&self) -> Option<&str> {
        self.clause(SystemQueryOption::Top)
    }

    /// Link to the page starting at `skip`: every option kept, `$skip` replaced or added.
    ///
    /// Values are percent-encoded again so the link can be followed as is.
    pub fn next_link(&self, resource_path: &str, skip: usize) -> String {
        let mut parts: Vec<String> = Vec::with_capacity(self.clauses.len() + 1);
        let mut skip_written = false;

        for (option, clause) in &self.clauses {
            if *option == SystemQueryOption::Skip {
                parts.push(format!("{}={}", option, skip));
                skip_written = true;
                continue;
            }
            let value = clause.split_once('=').map_or("", |(_, value)| value);
            parts.push(format!("{}={}", option, urlencoding::encode(value)));
        }
        if !skip_written {
            parts.push(format!("{}={}", SystemQueryOption::Skip, skip));
        }

        format!("{}?{}", resource_path, parts.join("&"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_clauses_are_decoded_verbatim() -> Result<()> {
        let raw = RawQueryOptions::parse(
            "?$filter=Name+eq+%27iPhone%27&$top=2&$orderby=Price%20desc&custom=1",
        )?;
        assert_eq!(raw.filter(), Some("$filter=Name eq 'iPhone'"));
        assert_eq!(raw.top(), Some("$top=2"));
        assert_eq!(raw.order_by(), Some("$orderby=Price desc"));
        assert_eq!(raw.value(SystemQueryOption::Filter), Some("Name eq 'iPhone'"));
        assert_eq!(raw.skip(), None);
        assert_eq!(
            raw.options().collect::<Vec<_>>(),
            vec![
                SystemQueryOption::Filter,
                SystemQueryOption::Top,
                SystemQueryOption::OrderBy
            ]
        );
        Ok(())
    }

    #[test]
    fn test_encoded_plus_survives() -> Result<()> {
        let raw = RawQueryOptions::parse("$filter=Placed+lt+2024-03-02T00:00:00%2B01:00")?;
        assert_eq!(raw.filter(), Some("$filter=Placed lt 2024-03-02T00:00:00+01:00"));
        Ok(())
    }

    #[test]
    fn test_rejected_options() {
        let err = RawQueryOptions::parse("$filtr=Id eq 1").unwrap_err();
        assert!(matches!(err, ODataError::Usage { .. }));
        assert_eq!(err.target(), Some("$filtr"));

        let err = RawQueryOptions::parse("$top=1&$top=2").unwrap_err();
        assert!(err.to_string().contains("more than once"));

        let err = RawQueryOptions::parse("$filter=").unwrap_err();
        assert!(err.to_string().contains("requires a value"));

        let err = RawQueryOptions::parse("$select").unwrap_err();
        assert_eq!(err.target(), Some("$select"));
    }

    #[test]
    fn test_next_link_replaces_skip_only() -> Result<()> {
        let raw = RawQueryOptions::parse("$filter=Name eq 'x'&$skip=2&$top=2")?;
        assert_eq!(
            raw.next_link("/Products", 4),
            "/Products?$filter=Name%20eq%20%27x%27&$skip=4&$top=2"
        );

        let raw = RawQueryOptions::parse("$top=2")?;
        assert_eq!(raw.next_link("/Products", 2), "/Products?$top=2&$skip=2");
        Ok(())
    }
}
