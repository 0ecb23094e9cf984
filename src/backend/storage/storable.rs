// src/backend/storage/storable.rs
use ic_stable_structures::{storable::Bound, Storable};
use serde::{de::DeserializeOwned, Serialize};
use std::borrow::Cow;

/// Wraps any serde type to make it Storable using CBOR encoding.
#[derive(Clone, Debug, Ord, PartialOrd, Eq, PartialEq)]
pub struct Cbor<T>(pub T)
where
    T: Serialize + DeserializeOwned;

impl<T> Storable for Cbor<T>
where
    T: Serialize + DeserializeOwned,
{
    fn to_bytes(&self) -> Cow<[u8]> {
        let mut writer = vec![];
        ciborium::ser::into_writer(&self.0, &mut writer)
            .expect("Failed to serialize value to CBOR for stable storage");
        Cow::Owned(writer)
    }

    fn from_bytes(bytes: Cow<[u8]>) -> Self {
        let value: T = ciborium::de::from_reader(bytes.as_ref())
            .expect("Failed to deserialize value from CBOR from stable storage");
        Cbor(value)
    }

    const BOUND: Bound = Bound::Unbounded;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::audit_log::{AuditLogEntry, LogAction};

    #[test]
    fn cbor_wrapper_survives_storage_bytes() {
        let entry = AuditLogEntry {
            timestamp: 42,
            action: LogAction::ContentDeleted,
            details: Some("abc123".to_string()),
        };
        let bytes = Cbor(entry.clone()).to_bytes().into_owned();
        assert_eq!(Cbor::<AuditLogEntry>::from_bytes(Cow::Owned(bytes)).0, entry);
    }
}
