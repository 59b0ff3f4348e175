//! Proptest generators for property-based testing.

use proptest::prelude::*;

use tollgate_core::{Event, EventBuilder, Identity, Keypair, Kind, MAX_CONTENT_BYTES};

/// Generate a random keypair.
pub fn keypair() -> impl Strategy<Value = Keypair> {
    any::<[u8; 32]>().prop_map(|seed| Keypair::from_seed(&seed))
}

/// Generate an arbitrary 32-byte identity (not necessarily a curve point).
pub fn identity() -> impl Strategy<Value = Identity> {
    any::<[u8; 32]>().prop_map(Identity::from_bytes)
}

/// Generate a reasonable timestamp (Unix seconds).
pub fn timestamp() -> impl Strategy<Value = i64> {
    0i64..=4_102_444_800
}

/// Generate a kind, weighted toward the ones with replacement rules.
pub fn kind() -> impl Strategy<Value = Kind> {
    prop_oneof![
        Just(Kind::SET_METADATA),
        Just(Kind::TEXT_NOTE),
        Just(Kind::RECOMMEND_SERVER),
        Just(Kind::CONTACT_LIST),
        (4u32..=40_000).prop_map(Kind),
    ]
}

/// Generate content of at most `max_len` characters.
pub fn content(max_len: usize) -> impl Strategy<Value = String> {
    proptest::string::string_regex(&format!("[ -~]{{0,{max_len}}}"))
        .unwrap_or_else(|e| panic!("bad content regex: {e:?}"))
}

/// Generate a tag list.
pub fn tags() -> impl Strategy<Value = Vec<Vec<String>>> {
    prop::collection::vec(
        prop::collection::vec("[a-z0-9]{0,16}".prop_map(String::from), 1..4),
        0..4,
    )
}

/// Generate an amount query that never equals `price_msat`.
pub fn wrong_amount(price_msat: u64) -> impl Strategy<Value = String> {
    prop_oneof![
        any::<u64>()
            .prop_filter("must differ from the price", move |a| *a != price_msat)
            .prop_map(|a| a.to_string()),
        "[a-z.-]{1,8}".prop_map(String::from),
    ]
}

/// Parameters for generating an event.
#[derive(Debug, Clone)]
pub struct EventParams {
    pub keypair: Keypair,
    pub kind: Kind,
    pub created_at: i64,
    pub tags: Vec<Vec<String>>,
    pub content: String,
}

impl Arbitrary for EventParams {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_: Self::Parameters) -> Self::Strategy {
        (keypair(), kind(), timestamp(), tags(), content(256))
            .prop_map(|(keypair, kind, created_at, tags, content)| EventParams {
                keypair,
                kind,
                created_at,
                tags,
                content,
            })
            .boxed()
    }
}

/// Build and sign an event from parameters.
pub fn event_from_params(params: &EventParams) -> Event {
    let mut builder = EventBuilder::new(params.kind)
        .created_at(params.created_at)
        .content(params.content.clone());
    for tag in &params.tags {
        builder = builder.tag(tag.iter().cloned());
    }
    builder.sign(&params.keypair)
}

/// Pad `content` with spaces to exactly `len` bytes.
pub fn content_of_len(len: usize) -> String {
    " ".repeat(len)
}

/// The largest admissible content.
pub fn max_content() -> String {
    content_of_len(MAX_CONTENT_BYTES)
}
