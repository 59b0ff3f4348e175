//! Property tests over the full registration and admission path.

use proptest::prelude::*;
use tokio::runtime::Runtime;

use tollgate::{AdmissionError, Kind, LnurlResponse, RegistrarError};
use tollgate_core::MAX_CONTENT_BYTES;
use tollgate_store::Store;
use tollgate_testkit::generators::{content, content_of_len, identity, timestamp, wrong_amount};
use tollgate_testkit::TestFixture;

fn runtime() -> Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn params_are_fixed_for_every_identity(identity in identity()) {
        let fixture = TestFixture::with_seed([0; 32]);
        let hex = identity.to_hex();

        let response = runtime()
            .block_on(fixture.relay.registrar().request_invoice(&hex, None))
            .unwrap();
        let LnurlResponse::Params(params) = response else {
            panic!("expected pay params");
        };

        prop_assert_eq!(params.min_sendable, 500_000);
        prop_assert_eq!(params.max_sendable, 500_000);
        prop_assert!(params.callback.contains(&hex));
    }

    #[test]
    fn wrong_amounts_always_fail(amount in wrong_amount(500_000), paid in any::<bool>()) {
        let fixture = TestFixture::with_seed([1; 32]);
        let rt = runtime();

        if paid {
            rt.block_on(fixture.register(5));
        }
        let result = rt.block_on(
            fixture
                .relay
                .registrar()
                .request_invoice(&fixture.identity_hex(), Some(&amount)),
        );
        prop_assert!(matches!(result, Err(RegistrarError::InvalidAmount(_))));
    }

    #[test]
    fn metadata_keeps_only_latest(times in prop::collection::vec(timestamp(), 1..8)) {
        let fixture = TestFixture::with_seed([2; 32]);
        let rt = runtime();
        rt.block_on(fixture.register(5));
        let gate = fixture.relay.gate();

        let mut last = None;
        for (i, at) in times.iter().enumerate() {
            let event = fixture.make_metadata(*at, &format!("v{i}"));
            rt.block_on(gate.save_event(&event)).unwrap();
            last = Some(event);
        }

        let rows = rt
            .block_on(fixture.store.events_by_author(&fixture.identity(), Some(Kind::SET_METADATA)))
            .unwrap();
        prop_assert_eq!(rows, vec![last.unwrap()]);
    }

    #[test]
    fn recommend_server_dedupes_by_content(
        urls in prop::collection::vec(prop_oneof![Just("wss://a"), Just("wss://b"), Just("wss://c")], 1..10),
    ) {
        let fixture = TestFixture::with_seed([3; 32]);
        let rt = runtime();
        rt.block_on(fixture.register(5));
        let gate = fixture.relay.gate();

        for (i, url) in urls.iter().enumerate() {
            let event = fixture.make_event(Kind::RECOMMEND_SERVER, i as i64, url);
            rt.block_on(gate.save_event(&event)).unwrap();
        }

        let mut distinct = urls.clone();
        distinct.sort();
        distinct.dedup();

        let rows = rt
            .block_on(fixture.store.events_by_author(&fixture.identity(), Some(Kind::RECOMMEND_SERVER)))
            .unwrap();
        prop_assert_eq!(rows.len(), distinct.len());
    }

    #[test]
    fn regular_notes_accumulate(contents in prop::collection::vec(content(32), 1..8)) {
        let fixture = TestFixture::with_seed([4; 32]);
        let rt = runtime();
        rt.block_on(fixture.register(5));
        let gate = fixture.relay.gate();

        let mut ids = std::collections::HashSet::new();
        for (i, c) in contents.iter().enumerate() {
            let event = fixture.make_event(Kind::TEXT_NOTE, i as i64, c);
            ids.insert(event.id);
            rt.block_on(gate.save_event(&event)).unwrap();
        }

        prop_assert_eq!(rt.block_on(fixture.store.count_events()).unwrap(), ids.len());
    }

    #[test]
    fn unregistered_authors_never_store(c in content(64)) {
        let fixture = TestFixture::with_seed([5; 32]);
        let rt = runtime();

        let result = rt.block_on(fixture.relay.gate().save_event(&fixture.make_note(&c)));
        prop_assert!(matches!(result, Err(AdmissionError::NotRegistered(_))));
        prop_assert_eq!(rt.block_on(fixture.store.count_events()).unwrap(), 0);
    }
}

#[test]
fn content_bound_is_inclusive() {
    let fixture = TestFixture::with_seed([6; 32]);
    let rt = runtime();
    rt.block_on(fixture.register(5));
    let gate = fixture.relay.gate();

    let at_limit = fixture.make_note(&content_of_len(MAX_CONTENT_BYTES));
    assert!(rt.block_on(gate.save_event(&at_limit)).is_ok());

    let over = fixture.make_note(&content_of_len(MAX_CONTENT_BYTES + 1));
    assert!(matches!(
        rt.block_on(gate.save_event(&over)),
        Err(AdmissionError::ContentTooLarge { .. })
    ));
}

#[test]
fn duplicate_submission_is_accepted_once() {
    let fixture = TestFixture::with_seed([7; 32]);
    let rt = runtime();
    rt.block_on(fixture.register(5));
    let gate = fixture.relay.gate();
    let note = fixture.make_note("twice");

    for _ in 0..3 {
        assert!(rt.block_on(gate.save_event(&note)).is_ok());
    }
    assert_eq!(rt.block_on(fixture.store.count_events()).unwrap(), 1);
}
