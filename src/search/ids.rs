// SPDX-FileCopyrightText: (C) 2024 Graylog SDK Contributors
// SPDX-License-Identifier: MIT

use std::sync::atomic::{AtomicU64, Ordering};

/// Source of the ids given to search specs, queries and search types.
///
/// Results come back keyed by these ids, so every node of a request
/// must get a distinct one.
pub trait IdGenerator: Send + Sync {
    /// Id for queries and search types.
    fn generate(&self) -> String;

    /// Id for a search spec. Graylog requires a 24 hex digit object id.
    fn object_id(&self) -> String;
}

/// Random ids, the default.
#[derive(Debug, Default, Clone, Copy)]
pub struct UuidGenerator;

impl IdGenerator for UuidGenerator {
    fn generate(&self) -> String {
        uuid::Uuid::new_v4().to_string()
    }

    fn object_id(&self) -> String {
        let mut id = uuid::Uuid::new_v4().simple().to_string();
        id.truncate(24);
        id
    }
}

/// Predictable ids: `<prefix>-1`, `<prefix>-2`, ...; object ids are the
/// counter as 24 hex digits.
#[derive(Debug)]
pub struct SequentialIdGenerator {
    prefix: String,
    next: AtomicU64,
}

impl SequentialIdGenerator {
    pub fn new(prefix: &str) -> Self {
        Self {
            prefix: prefix.to_string(),
            next: AtomicU64::new(1),
        }
    }

    fn next(&self) -> u64 {
        self.next.fetch_add(1, Ordering::Relaxed)
    }
}

impl IdGenerator for SequentialIdGenerator {
    fn generate(&self) -> String {
        format!("{}-{}", self.prefix, self.next())
    }

    fn object_id(&self) -> String {
        format!("{:024x}", self.next())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_uuid_generator() {
        let ids = UuidGenerator;
        let a = ids.generate();
        let b = ids.generate();
        assert_ne!(a, b);
        let object_id = ids.object_id();
        assert_eq!(object_id.len(), 24);
        assert!(object_id.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_sequential_generator() {
        let ids = SequentialIdGenerator::new("st");
        assert_eq!(ids.generate(), "st-1");
        assert_eq!(ids.generate(), "st-2");
        assert_eq!(ids.object_id(), "000000000000000000000003");
    }
}
