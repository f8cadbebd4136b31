use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};

/// Stored key for functions created without a runtime (container images, failed calls).
pub const UNSPECIFIED_RUNTIME: &str = "(unspecified)";
/// Named runtimes starting with this get it doubled, so none can land on `UNSPECIFIED_RUNTIME`.
const RESERVED_LEAD: char = '(';

/// The category a CreateFunction call is counted under.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RuntimeKey {
    Named(String),
    Unspecified,
}

impl RuntimeKey {
    /// Partition key value used in the report table. Distinct keys always map to
    /// distinct values.
    pub fn storage_key(&self) -> Cow<'_, str> {
        match self {
            RuntimeKey::Named(name) if name.starts_with(RESERVED_LEAD) => {
                Cow::Owned(format!("{}{}", RESERVED_LEAD, name))
            }
            RuntimeKey::Named(name) => Cow::Borrowed(name),
            RuntimeKey::Unspecified => Cow::Borrowed(UNSPECIFIED_RUNTIME),
        }
    }
}

impl Display for RuntimeKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.storage_key())
    }
}

impl From<&str> for RuntimeKey {
    fn from(name: &str) -> Self {
        RuntimeKey::Named(name.to_string())
    }
}

/// Occurrences per runtime for one run. Entries only exist once observed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuntimeTally {
    counts: BTreeMap<RuntimeKey, u64>,
}

impl RuntimeTally {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, runtime: RuntimeKey) {
        *self.counts.entry(runtime).or_insert(0) += 1;
    }

    pub fn get(&self, runtime: &RuntimeKey) -> Option<u64> {
        self.counts.get(runtime).copied()
    }

    pub fn total(&self) -> u64 {
        self.counts.values().sum()
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&RuntimeKey, u64)> {
        self.counts.iter().map(|(k, v)| (k, *v))
    }
}

impl FromIterator<RuntimeKey> for RuntimeTally {
    fn from_iter<T: IntoIterator<Item = RuntimeKey>>(iter: T) -> Self {
        let mut tally = RuntimeTally::new();
        iter.into_iter().for_each(|k| tally.record(k));
        tally
    }
}
