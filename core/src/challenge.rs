use std::path::Path;

use toml::{Table, Value};

/// A named test case: source snippet fed to the target program plus the
/// output it is expected to print.
///
/// `expected == None` means the record had no `result` key at all, which is
/// distinct from an empty expected output (`Some("")`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Challenge {
    pub name: String,
    pub source: String,
    pub expected: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error(transparent)]
    Read(#[from] fsutil::Error),

    #[error("Invalid challenge TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Challenge record '{0}' is not a table")]
    NotATable(String),
}

/// Read-only collection of challenges, iterated in document order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChallengeStore {
    challenges: Vec<Challenge>,
}

impl ChallengeStore {
    pub const FILENAME: &str = "challenges.toml";

    pub fn load(filepath: impl AsRef<Path>) -> Result<Self, LoadError> {
        let toml = fsutil::read_to_string(filepath)?;
        Self::from_toml(&toml)
    }

    pub fn from_toml(s: &str) -> Result<Self, LoadError> {
        let table: Table = toml::from_str(s)?;
        let mut challenges = Vec::with_capacity(table.len());

        for (name, value) in table {
            let Value::Table(record) = value else {
                return Err(LoadError::NotATable(name));
            };
            if name.is_empty() {
                log::warn!("Skipping challenge record with empty name");
                continue;
            }
            let source = match record.get("challenge") {
                Some(Value::String(s)) => s.clone(),
                Some(_) => {
                    log::warn!("Skipping challenge '{}': `challenge` is not a string", name);
                    continue;
                }
                None => {
                    log::warn!("Skipping challenge '{}': missing `challenge` field", name);
                    continue;
                }
            };
            let expected = match record.get("result") {
                Some(Value::String(s)) => Some(s.clone()),
                Some(_) => {
                    log::warn!("Challenge '{}': `result` is not a string, ignored", name);
                    None
                }
                None => {
                    log::warn!("Challenge '{}' has no expected result configured", name);
                    None
                }
            };
            challenges.push(Challenge {
                name,
                source,
                expected,
            });
        }

        Ok(Self { challenges })
    }

    pub fn get(&self, name: &str) -> Option<&Challenge> {
        self.challenges.iter().find(|c| c.name == name)
    }

    /// Document order.
    pub fn iter(&self) -> impl Iterator<Item = &Challenge> {
        self.challenges.iter()
    }

    pub fn len(&self) -> usize {
        self.challenges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.challenges.is_empty()
    }
}
