use std::fmt;

/// Worker lifecycle notifications published by a pool
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PoolEvent {
    /// Worker created and its execution context opened
    Started(String),
    /// Worker handed to a caller
    Reserved(String),
    /// Worker finished a task and is eligible again
    Listening(String),
    /// Worker stopped; identity and context released
    Died(String),
}

impl PoolEvent {
    pub fn worker_id(&self) -> &str {
        match self {
            Self::Started(id) | Self::Reserved(id) | Self::Listening(id) | Self::Died(id) => id,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Started(_) => "started",
            Self::Reserved(_) => "reserved",
            Self::Listening(_) => "listening",
            Self::Died(_) => "died",
        }
    }
}

impl fmt::Display for PoolEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name(), self.worker_id())
    }
}
