use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use zeroize::ZeroizeOnDrop;

/// One stored credential. `secret` is the base64 AES ciphertext of the
/// password — plaintext never crosses the write boundary.
#[derive(Debug, Clone, Serialize, Deserialize, ZeroizeOnDrop)]
pub struct EntryRecord {
    pub id: u64,
    pub name: String,
    pub url: String,
    pub login: String,
    pub secret: String,
}

impl EntryRecord {
    /// Listing order: by name, ties broken by url, ascending.
    pub fn listing_order(&self, other: &Self) -> Ordering {
        self.name
            .cmp(&other.name)
            .then_with(|| self.url.cmp(&other.url))
    }

    /// Substring match used by the list endpoint's `q` filter.
    pub fn matches_query(&self, query: &str) -> bool {
        self.name.contains(query)
    }
}

/// The mutable fields of a record; the store assigns the id.
#[derive(Debug, Clone)]
pub struct EntryFields {
    pub name: String,
    pub url: String,
    pub login: String,
    pub secret: String,
}

impl EntryFields {
    pub fn into_record(self, id: u64) -> EntryRecord {
        EntryRecord {
            id,
            name: self.name,
            url: self.url,
            login: self.login,
            secret: self.secret,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(name: &str, url: &str) -> EntryRecord {
        EntryRecord {
            id: 1,
            name: name.into(),
            url: url.into(),
            login: "user".into(),
            secret: String::new(),
        }
    }

    #[test]
    fn orders_by_name_first() {
        let a = record("amazon", "https://z.example");
        let b = record("facebook", "https://a.example");
        assert_eq!(a.listing_order(&b), Ordering::Less);
    }

    #[test]
    fn ties_on_name_break_by_url() {
        let a = record("mail", "https://a.example");
        let b = record("mail", "https://b.example");
        assert_eq!(a.listing_order(&b), Ordering::Less);
        assert_eq!(b.listing_order(&a), Ordering::Greater);
    }

    #[test]
    fn query_matches_name_substring_only() {
        let r = record("facebook", "https://facebook.com");
        assert!(r.matches_query("face"));
        assert!(r.matches_query("facebook"));
        assert!(!r.matches_query("facebook.com/extra"));
        assert!(!r.matches_query("user"));
    }
}
