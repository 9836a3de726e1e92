//! Binary codec shared by every table, for keys and values alike.
//!
//! Encoding is big-endian with fixed-width integers so that encoded keys
//! compare in the same order as their native values: identifiers sort by raw
//! byte value and composite ranking keys group by keyword/engine pair, then
//! by timestamp.

use bincode::Options;
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

/// Failure to encode or decode a stored record.
#[derive(Debug, Error)]
#[error("codec failure: {0}")]
pub struct CodecError(#[from] bincode::Error);

fn options() -> impl Options {
    bincode::options()
        .with_big_endian()
        .with_fixint_encoding()
        .reject_trailing_bytes()
}

pub fn encode<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>, CodecError> {
    Ok(options().serialize(value)?)
}

pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, CodecError> {
    Ok(options().deserialize(bytes)?)
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Utc};
    use uuid::Uuid;

    use super::*;
    use crate::models::{Category, Domain, EntityId, KeywordEngine, Ranking, RankingKey};

    fn ts(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(secs, 0).expect("timestamp in range")
    }

    #[test]
    fn test_category_round_trips() {
        let category = Category::restore(EntityId::new(), "commerce");
        let bytes = encode(&category).expect("encode");
        let back: Category = decode(&bytes).expect("decode");
        assert_eq!(back, category);
        assert_eq!(back.name(), "commerce");
    }

    #[test]
    fn test_domain_round_trips_with_engine_set() {
        let mut domain = Domain::new("https://example.com");
        domain.add_engine(EntityId::new());
        domain.add_engine(EntityId::new());
        let bytes = encode(&domain).expect("encode");
        let back: Domain = decode(&bytes).expect("decode");
        assert_eq!(back, domain);
        assert_eq!(back.engines(), domain.engines());
        assert_eq!(back.created_at(), domain.created_at());
    }

    #[test]
    fn test_ranking_round_trips() {
        let ranking = Ranking {
            timestamp: ts(1_700_000_000),
            rank: 42,
            page_url: "https://www.google.com/search?q=x&start=30".to_string(),
        };
        let bytes = encode(&ranking).expect("encode");
        let back: Ranking = decode(&bytes).expect("decode");
        assert_eq!(back, ranking);
    }

    #[test]
    fn test_encoded_ids_sort_by_raw_bytes() {
        let nil = encode(&EntityId::nil()).expect("encode");
        let max = encode(&EntityId::from_uuid(Uuid::from_u128(u128::MAX))).expect("encode");
        let mid = encode(&EntityId::from_uuid(Uuid::from_u128(1 << 64))).expect("encode");
        assert!(nil < mid);
        assert!(mid < max);
    }

    #[test]
    fn test_ranking_keys_group_by_pair_then_time() {
        let pair = KeywordEngine {
            keyword: EntityId::from_uuid(Uuid::from_u128(7)),
            engine: EntityId::from_uuid(Uuid::from_u128(9)),
        };
        let earlier = encode(&RankingKey::new(pair, ts(1_600_000_000))).expect("encode");
        let later = encode(&RankingKey::new(pair, ts(1_700_000_000))).expect("encode");
        assert!(earlier < later);

        // Same prefix for the pair, so every key of one stream is contiguous.
        assert_eq!(earlier[..earlier.len() - 8], later[..later.len() - 8]);
    }

    #[test]
    fn test_trailing_bytes_are_rejected() {
        let mut bytes = encode(&EntityId::nil()).expect("encode");
        bytes.push(0);
        assert!(decode::<EntityId>(&bytes).is_err());
    }
}
