use lasso::{Spur, ThreadedRodeo};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::sync::LazyLock;

/// Every card id ever seen in this process, loaded or minted.
static INTERNER: LazyLock<ThreadedRodeo> = LazyLock::new(ThreadedRodeo::default);

/// Identity of a card on the board. Opaque to everything but serialization;
/// equality and hashing compare the interned key only.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct CardId(Spur);

impl CardId {
    pub fn intern(s: &str) -> Self {
        CardId(INTERNER.get_or_intern(s))
    }

    pub fn as_str(&self) -> &str {
        INTERNER.resolve(&self.0)
    }

    /// Next id of the form `card_N`. N only ever grows within a process.
    pub fn mint() -> Self {
        use std::sync::atomic::{AtomicU64, Ordering};
        static NEXT: AtomicU64 = AtomicU64::new(0);
        let n = NEXT.fetch_add(1, Ordering::Relaxed);
        Self::intern(&format!("card_{n}"))
    }

    /// Mint until `taken` rejects nothing. Boards loaded from disk may already
    /// hold ids of the `card_N` shape.
    pub fn mint_unused(taken: impl Fn(CardId) -> bool) -> Self {
        loop {
            let id = Self::mint();
            if !taken(id) {
                return id;
            }
        }
    }
}

impl fmt::Debug for CardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.as_str())
    }
}

impl fmt::Display for CardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for CardId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for CardId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(CardId::intern(&s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interning_roundtrip() {
        let a = CardId::intern("hero_shot");
        let b = CardId::intern("hero_shot");
        assert_eq!(a, b);
        assert_eq!(a.as_str(), "hero_shot");
    }

    #[test]
    fn minted_ids_are_unique() {
        let a = CardId::mint();
        let b = CardId::mint();
        assert_ne!(a, b);
        assert!(a.as_str().starts_with("card_"));
    }

    #[test]
    fn mint_unused_skips_taken_ids() {
        let next = CardId::mint();
        let n: u64 = next.as_str().trim_start_matches("card_").parse().unwrap();
        let taken: Vec<CardId> = (n + 1..n + 20)
            .map(|k| CardId::intern(&format!("card_{k}")))
            .collect();
        let id = CardId::mint_unused(|id| taken.contains(&id));
        assert!(!taken.contains(&id));
    }

    #[test]
    fn display_is_plain_debug_is_marked() {
        let id = CardId::intern("moodboard_cover");
        assert_eq!(id.to_string(), "moodboard_cover");
        assert_eq!(format!("{id:?}"), "#moodboard_cover");
    }

    #[test]
    fn serializes_as_plain_string() {
        let id = CardId::intern("moss");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"moss\"");
        let back: CardId = serde_json::from_str("\"moss\"").unwrap();
        assert_eq!(back, id);
    }
}
