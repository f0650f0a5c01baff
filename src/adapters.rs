use time::OffsetDateTime;

use crate::ports;

mod memory;

pub use memory::MemoryStore;

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemTimeProvider;

impl ports::TimeProvider for SystemTimeProvider {
    fn now(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc()
    }
}

#[cfg(test)]
#[derive(Debug, Clone, Copy)]
pub(crate) struct FixedTimeProvider(pub(crate) OffsetDateTime);

#[cfg(test)]
impl FixedTimeProvider {
    pub(crate) fn at_rfc3339(raw: &str) -> Self {
        use time::format_description::well_known::Rfc3339;
        Self(OffsetDateTime::parse(raw, &Rfc3339).expect("parse fixed time"))
    }
}

#[cfg(test)]
impl ports::TimeProvider for FixedTimeProvider {
    fn now(&self) -> OffsetDateTime {
        self.0
    }
}
