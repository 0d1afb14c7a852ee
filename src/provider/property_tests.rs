//! Property-Based Tests for the Provider Module
//!
//! Uses proptest to check round-tripping and batch ordering through the full
//! provider stack over the in-process store.

use proptest::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};

use crate::codec::{EnvelopeSerializer, JsonSerializer};
use crate::config::ProviderConfig;
use crate::encoding::TextEncoding;
use crate::provider::{CacheOperations, CacheProvider, Ttl};
use crate::store::MemoryStore;

// == Test Types ==
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Profile {
    name: String,
    score: i64,
    verified: Option<bool>,
    tags: Vec<String>,
    limits: BTreeMap<String, u32>,
}

// == Strategies ==
/// Generates cache keys
fn key_strategy() -> impl Strategy<Value = String> {
    "[a-z0-9:_]{1,24}"
}

fn profile_strategy() -> impl Strategy<Value = Profile> {
    (
        any::<String>(),
        any::<i64>(),
        any::<Option<bool>>(),
        prop::collection::vec("[a-z]{0,8}", 0..6),
        prop::collection::btree_map("[a-z]{1,6}", any::<u32>(), 0..6),
    )
        .prop_map(|(name, score, verified, tags, limits)| Profile {
            name,
            score,
            verified,
            tags,
            limits,
        })
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

fn provider_with(encoding: TextEncoding) -> CacheProvider<MemoryStore> {
    CacheProvider::new(
        MemoryStore::new(),
        EnvelopeSerializer::new(),
        ProviderConfig::default().with_text_encoding(encoding),
    )
}

fn encoding_strategy() -> impl Strategy<Value = TextEncoding> {
    prop_oneof![Just(TextEncoding::Latin1), Just(TextEncoding::Base64)]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    // *For any* record value, writing it and reading it back under a
    // byte-preserving encoding SHALL return a structurally equal value.
    #[test]
    fn prop_record_roundtrip(
        key in key_strategy(),
        profile in profile_strategy(),
        encoding in encoding_strategy()
    ) {
        let provider = provider_with(encoding);
        let read = runtime().block_on(async {
            provider.set(&key, &profile, Ttl::Persistent).await.unwrap();
            provider.get::<Profile>(&key).await.unwrap()
        });
        prop_assert_eq!(read, Some(profile));
    }

    // *For any* primitive or collection, the same round trip SHALL hold
    // without the caller wrapping the value.
    #[test]
    fn prop_primitive_and_collection_roundtrip(
        number in any::<f64>().prop_filter("NaN never compares equal", |n| !n.is_nan()),
        flag in any::<bool>(),
        text in any::<String>(),
        list in prop::collection::vec(any::<u64>(), 0..32),
        map in prop::collection::hash_map("[a-z]{1,8}", any::<i16>(), 0..16),
        chars in prop::collection::hash_set(any::<char>(), 0..16)
    ) {
        let provider = provider_with(TextEncoding::Latin1);
        runtime().block_on(async {
            provider.set("number", &number, Ttl::Persistent).await.unwrap();
            provider.set("flag", &flag, Ttl::Persistent).await.unwrap();
            provider.set("text", &text, Ttl::Persistent).await.unwrap();
            provider.set("list", &list, Ttl::Persistent).await.unwrap();
            provider.set("map", &map, Ttl::Persistent).await.unwrap();
            provider.set("chars", &chars, Ttl::Persistent).await.unwrap();

            assert_eq!(provider.get::<f64>("number").await.unwrap(), Some(number));
            assert_eq!(provider.get::<bool>("flag").await.unwrap(), Some(flag));
            assert_eq!(provider.get::<String>("text").await.unwrap(), Some(text));
            assert_eq!(provider.get::<Vec<u64>>("list").await.unwrap(), Some(list));
            assert_eq!(provider.get::<HashMap<String, i16>>("map").await.unwrap(), Some(map));
            assert_eq!(provider.get::<HashSet<char>>("chars").await.unwrap(), Some(chars));
        });
    }

    // *For any* byte sequence, Latin-1 text encoding SHALL return the exact
    // bytes it was given.
    #[test]
    fn prop_latin1_preserves_bytes(bytes in prop::collection::vec(any::<u8>(), 0..512)) {
        let text = TextEncoding::Latin1.encode(&bytes).unwrap();
        prop_assert_eq!(TextEncoding::Latin1.decode(&text).unwrap(), bytes);
    }

    // *For any* key sequence, a batch read SHALL return one result per key,
    // in key order, with misses where nothing was stored.
    #[test]
    fn prop_batch_order_preservation(
        stored in prop::collection::hash_map(key_strategy(), any::<i32>(), 0..20),
        lookups in prop::collection::vec(key_strategy(), 1..30)
    ) {
        let provider = provider_with(TextEncoding::Latin1);
        let mut keys: Vec<String> = stored.keys().cloned().collect();
        keys.extend(lookups);

        let values = runtime().block_on(async {
            provider.set_batch(&stored, Ttl::Seconds(300)).await.unwrap();
            provider.get_batch::<i32, _>(&keys).await.unwrap()
        });

        prop_assert_eq!(values.len(), keys.len());
        for (key, value) in keys.iter().zip(values) {
            prop_assert_eq!(value, stored.get(key).copied());
        }
    }

    // *For any* record, the JSON serializer SHALL round trip just like the
    // envelope serializer.
    #[test]
    fn prop_json_serializer_roundtrip(key in key_strategy(), profile in profile_strategy()) {
        let provider = CacheProvider::new(
            MemoryStore::new(),
            JsonSerializer,
            ProviderConfig::default().with_text_encoding(TextEncoding::Utf8),
        );
        let read = runtime().block_on(async {
            provider.set(&key, &profile, Ttl::Persistent).await.unwrap();
            provider.get::<Profile>(&key).await.unwrap()
        });
        prop_assert_eq!(read, Some(profile));
    }
}
