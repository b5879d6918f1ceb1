use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

/// Which source lists take part in a run.
///
/// Written as `"all"` or as an array of list ids in the config file, and
/// as `all` or a comma-separated id list in the environment and on the
/// command line. An empty selection means `all`, never "no lists": an
/// empty mirror would delete every list on the target.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "SelectionRepr", into = "SelectionRepr")]
pub enum ListSelection {
    #[default]
    All,
    Ids(Vec<String>),
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum SelectionRepr {
    Keyword(String),
    Ids(Vec<String>),
}

impl ListSelection {
    pub fn from_ids<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut unique: Vec<String> = Vec::new();
        for id in ids {
            let id = id.as_ref().trim();
            if id.is_empty() || unique.iter().any(|seen| seen == id) {
                continue;
            }
            unique.push(id.to_string());
        }
        if unique.is_empty() {
            ListSelection::All
        } else {
            ListSelection::Ids(unique)
        }
    }

    pub fn is_all(&self) -> bool {
        matches!(self, ListSelection::All)
    }
}

impl FromStr for ListSelection {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("all") {
            return Ok(ListSelection::All);
        }
        Ok(ListSelection::from_ids(s.split(',')))
    }
}

impl From<SelectionRepr> for ListSelection {
    fn from(repr: SelectionRepr) -> Self {
        match repr {
            SelectionRepr::Keyword(keyword) => keyword.parse().unwrap_or_default(),
            SelectionRepr::Ids(ids) => ListSelection::from_ids(ids),
        }
    }
}

impl From<ListSelection> for SelectionRepr {
    fn from(selection: ListSelection) -> Self {
        match selection {
            ListSelection::All => SelectionRepr::Keyword("all".to_string()),
            ListSelection::Ids(ids) => SelectionRepr::Ids(ids),
        }
    }
}

impl fmt::Display for ListSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ListSelection::All => f.write_str("all"),
            ListSelection::Ids(ids) => f.write_str(&ids.join(",")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_keyword_and_ids() {
        assert_eq!("all".parse::<ListSelection>().unwrap(), ListSelection::All);
        assert_eq!("ALL".parse::<ListSelection>().unwrap(), ListSelection::All);
        assert_eq!("".parse::<ListSelection>().unwrap(), ListSelection::All);
        assert_eq!(
            "ls001, ls002,,ls001".parse::<ListSelection>().unwrap(),
            ListSelection::Ids(vec!["ls001".to_string(), "ls002".to_string()])
        );
    }

    #[derive(Debug, Deserialize, Serialize)]
    struct Wrapper {
        lists: ListSelection,
    }

    #[test]
    fn test_toml_forms() {
        let all: Wrapper = toml::from_str(r#"lists = "all""#).unwrap();
        assert!(all.lists.is_all());

        let ids: Wrapper = toml::from_str(r#"lists = ["ls001", "ls002"]"#).unwrap();
        assert_eq!(ids.lists, ListSelection::Ids(vec!["ls001".to_string(), "ls002".to_string()]));

        let empty: Wrapper = toml::from_str(r#"lists = []"#).unwrap();
        assert!(empty.lists.is_all());

        let written = toml::to_string(&ids).unwrap();
        assert!(written.contains("ls002"));
    }
}
