//! Identifier generation for content records.

use rand::Rng;

use super::{ContentError, ContentStore};

/// Alphabet for public reference ids. URL-safe so ids can sit in a path.
const REF_ID_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789-_";

pub const REF_ID_LENGTH: usize = 6;
const REF_ID_ATTEMPTS: usize = 10;

/// New record id.
pub fn new_content_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

/// Random reference id. Uniqueness is not checked.
pub fn generate_ref_id() -> String {
    let mut rng = rand::rng();
    (0..REF_ID_LENGTH)
        .map(|_| REF_ID_ALPHABET[rng.random_range(0..REF_ID_ALPHABET.len())] as char)
        .collect()
}

/// Reference id no stored record uses yet.
pub async fn unique_ref_id(store: &dyn ContentStore) -> Result<String, ContentError> {
    for _ in 0..REF_ID_ATTEMPTS {
        let candidate = generate_ref_id();
        if !store.ref_id_exists(&candidate).await? {
            return Ok(candidate);
        }
        tracing::debug!(ref_id = %candidate, "Reference id collision, retrying");
    }
    Err(ContentError::Database(format!(
        "no unique reference id after {} attempts",
        REF_ID_ATTEMPTS
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::{ContentRecord, SqliteContentStore};

    #[test]
    fn test_ref_id_shape() {
        for _ in 0..100 {
            let id = generate_ref_id();
            assert_eq!(id.len(), REF_ID_LENGTH);
            assert!(id.bytes().all(|b| REF_ID_ALPHABET.contains(&b)));
        }
    }

    #[test]
    fn test_content_ids_differ() {
        assert_ne!(new_content_id(), new_content_id());
    }

    #[tokio::test]
    async fn test_unique_ref_id_avoids_existing() {
        let store = SqliteContentStore::in_memory().unwrap();
        let mut record = ContentRecord::new("c1", "org", "user");
        record.ref_id = generate_ref_id();
        store.insert(&record).await.unwrap();

        let fresh = unique_ref_id(&store).await.unwrap();
        assert_ne!(fresh, record.ref_id);
        assert_eq!(fresh.len(), REF_ID_LENGTH);
    }
}
