//! Static bilingual alias table (English <-> Korean titles).

use std::{
    collections::{BTreeMap, HashMap},
    path::Path,
};

use log::debug;
use serde::Deserialize;

use crate::quiz::{error::QuizError, normalize::normalize};

const BUILTIN_ALIASES: &str = include_str!("../../data/aliases.toml");

#[derive(Debug, Deserialize)]
struct AliasFile {
    #[serde(default)]
    aliases: BTreeMap<String, String>,
}

/// Maps normalized English keys to normalized Korean keys and back.
///
/// Loaded once and never mutated afterwards.
#[derive(Debug, Default, Clone)]
pub struct AliasTable {
    forward: HashMap<String, String>,
    reverse: HashMap<String, String>,
}

impl AliasTable {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Builds the table from raw pairs. Pairs whose key or value normalizes
    /// to nothing are skipped; on reverse collisions the first pair wins.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut table = Self::default();
        for (key, value) in pairs {
            let key = normalize(key.as_ref());
            let value = normalize(value.as_ref());
            if key.is_empty() || value.is_empty() {
                debug!("skipping empty alias entry");
                continue;
            }
            if table.reverse.contains_key(&value) {
                debug!("alias {value} already mapped, keeping first entry");
            } else {
                table.reverse.insert(value.clone(), key.clone());
            }
            table.forward.insert(key, value);
        }
        table
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, QuizError> {
        let file: AliasFile = toml::from_str(contents)?;
        Ok(Self::from_pairs(file.aliases))
    }

    pub fn load(path: &Path) -> Result<Self, QuizError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// The table shipped with the binary.
    pub fn builtin() -> Result<Self, QuizError> {
        Self::from_toml_str(BUILTIN_ALIASES)
    }

    /// Counterpart-language form of a normalized key, or the key itself.
    pub fn translate<'a>(&'a self, key: &'a str) -> &'a str {
        self.forward.get(key).map(String::as_str).unwrap_or(key)
    }

    /// Reverse lookup (Korean -> English), identity on a miss.
    pub fn reverse<'a>(&'a self, key: &'a str) -> &'a str {
        self.reverse.get(key).map(String::as_str).unwrap_or(key)
    }

    pub fn len(&self) -> usize {
        self.forward.len()
    }

    pub fn is_empty(&self) -> bool {
        self.forward.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_pairs_are_normalized() {
        let table = AliasTable::from_pairs([("Spring Day", "봄 날")]);

        assert_eq!(table.translate("springday"), "봄날");
        assert_eq!(table.reverse("봄날"), "springday");
    }

    #[test]
    fn test_lookup_miss_is_identity() {
        let table = AliasTable::from_pairs([("sign", "사인")]);

        assert_eq!(table.translate("butter"), "butter");
        assert_eq!(table.reverse("버터"), "버터");
    }

    #[test]
    fn test_empty_entries_are_skipped() {
        let table = AliasTable::from_pairs([("(intro)", "인트로"), ("sign", "!!")]);

        assert!(table.is_empty());
    }

    #[test]
    fn test_reverse_collision_keeps_first() {
        let table = AliasTable::from_pairs([("fire", "불타오르네"), ("burning up", "불타오르네")]);

        assert_eq!(table.len(), 2);
        assert_eq!(table.reverse("불타오르네"), "fire");
    }

    #[test]
    fn test_parse_alias_toml() -> anyhow::Result<()> {
        let toml_str = r#"
[aliases]
"sign" = "사인"
"love scenario" = "사랑을 했다"
"#;

        let table = AliasTable::from_toml_str(toml_str)?;

        assert_eq!(table.len(), 2);
        assert_eq!(table.translate("lovescenario"), "사랑을했다");

        Ok(())
    }

    #[test]
    fn test_missing_aliases_section_gives_empty_table() -> anyhow::Result<()> {
        let table = AliasTable::from_toml_str("")?;

        assert!(table.is_empty());

        Ok(())
    }

    #[test]
    fn test_invalid_toml_is_rejected() {
        let err = AliasTable::from_toml_str("[aliases]\nsign = 3").unwrap_err();

        assert!(matches!(err, QuizError::AliasTable(_)));
    }

    #[test]
    fn test_load_from_file() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("aliases.toml");
        fs::write(&path, "[aliases]\npalette = \"팔레트\"\n")?;

        let table = AliasTable::load(&path)?;

        assert_eq!(table.translate("palette"), "팔레트");

        Ok(())
    }

    #[test]
    fn test_builtin_table_parses() -> anyhow::Result<()> {
        let table = AliasTable::builtin()?;

        assert!(!table.is_empty());
        assert_eq!(table.translate("sign"), "사인");

        Ok(())
    }
}
