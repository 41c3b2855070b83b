use fragdns_domain::ProxyError;
use fragdns_proxy::fragment::{fragment_reply, FRAGMENT_SIZE_LIMIT};
use fragdns_proxy::signal;
use hickory_proto::rr::RecordType;

mod helpers;

#[test]
fn test_every_fragment_fits_the_size_limit() {
    let query = helpers::query(0x1234, "big.example.com.", RecordType::AAAA);
    let reply = helpers::reply_with_aaaa(&query, 40);
    assert!(helpers::encode(&reply).len() > FRAGMENT_SIZE_LIMIT);

    let fragments = fragment_reply(&reply).unwrap();

    assert!(fragments.len() > 1);
    for fragment in &fragments {
        assert!(helpers::encode(fragment).len() <= FRAGMENT_SIZE_LIMIT);
    }
}

#[test]
fn test_fragment_numbering_is_dense() {
    let query = helpers::query(0x1234, "big.example.com.", RecordType::AAAA);
    let reply = helpers::reply_with_aaaa(&query, 40);

    let fragments = fragment_reply(&reply).unwrap();
    let total = fragments.len() as u8;

    for (expected_seq, fragment) in fragments.iter().enumerate() {
        let descriptor = signal::fragment_descriptor(fragment).unwrap();
        assert_eq!(descriptor.total, total);
        assert_eq!(descriptor.seq, expected_seq as u8);
    }
}

#[test]
fn test_fragments_repeat_header_and_question() {
    let query = helpers::query(0xbeef, "big.example.com.", RecordType::AAAA);
    let reply = helpers::reply_with_aaaa(&query, 40);

    let fragments = fragment_reply(&reply).unwrap();

    for fragment in &fragments {
        assert_eq!(fragment.id(), reply.id());
        assert_eq!(fragment.response_code(), reply.response_code());
        assert_eq!(fragment.queries(), reply.queries());
    }
}

#[test]
fn test_fragments_carry_a_copy_of_the_backend_opt() {
    let query = helpers::query(1, "big.example.com.", RecordType::AAAA);
    let reply = helpers::reply_with_aaaa(&query, 40);

    let fragments = fragment_reply(&reply).unwrap();

    for fragment in &fragments {
        let edns = fragment.extensions().as_ref().unwrap();
        assert_eq!(edns.max_payload(), 4096);
    }
}

#[test]
fn test_answer_order_is_preserved_across_fragments() {
    let query = helpers::query(2, "big.example.com.", RecordType::AAAA);
    let reply = helpers::reply_with_aaaa(&query, 40);

    let fragments = fragment_reply(&reply).unwrap();

    let stitched: Vec<_> = fragments
        .iter()
        .flat_map(|fragment| fragment.answers().iter().cloned())
        .collect();
    assert_eq!(stitched, reply.answers());
}

#[test]
fn test_all_sections_are_preserved_in_order() {
    let query = helpers::query(3, "big.example.com.", RecordType::AAAA);
    let mut reply = helpers::reply_with_aaaa(&query, 40);
    for index in 0..3 {
        reply.add_name_server(helpers::ns_record(
            "example.com.",
            &format!("ns{}.example.net.", index),
        ));
        reply.add_additional(helpers::a_record(&format!("ns{}.example.net.", index), index));
    }

    let fragments = fragment_reply(&reply).unwrap();
    assert!(fragments.len() > 1);

    let answers: Vec<_> = fragments
        .iter()
        .flat_map(|f| f.answers().iter().cloned())
        .collect();
    let authorities: Vec<_> = fragments
        .iter()
        .flat_map(|f| f.name_servers().iter().cloned())
        .collect();
    let additionals: Vec<_> = fragments
        .iter()
        .flat_map(|f| f.additionals().iter().cloned())
        .collect();

    assert_eq!(answers, reply.answers());
    assert_eq!(authorities, reply.name_servers());
    assert_eq!(additionals, reply.additionals());
}

#[test]
fn test_small_reply_becomes_a_single_fragment() {
    let query = helpers::query(4, "a.example.com.", RecordType::AAAA);
    let reply = helpers::reply_with_aaaa(&query, 1);

    let fragments = fragment_reply(&reply).unwrap();

    assert_eq!(fragments.len(), 1);
    let descriptor = signal::fragment_descriptor(&fragments[0]).unwrap();
    assert_eq!((descriptor.total, descriptor.seq), (1, 0));
    assert_eq!(fragments[0].answers(), reply.answers());
}

#[test]
fn test_reply_without_records_becomes_a_single_fragment() {
    let query = helpers::query(5, "empty.example.com.", RecordType::AAAA);
    let reply = helpers::reply_with_edns(&query, 4096);

    let fragments = fragment_reply(&reply).unwrap();

    assert_eq!(fragments.len(), 1);
    let descriptor = signal::fragment_descriptor(&fragments[0]).unwrap();
    assert_eq!((descriptor.total, descriptor.seq), (1, 0));
    assert!(fragments[0].answers().is_empty());
}

#[test]
fn test_single_oversize_record_yields_truncated_reply() {
    let query = helpers::query(6, "huge.example.com.", RecordType::TXT);
    let mut reply = helpers::reply_with_edns(&query, 4096);
    reply.add_answer(helpers::txt_record("huge.example.com.", 700));

    let fragments = fragment_reply(&reply).unwrap();

    assert_eq!(fragments.len(), 1);
    let truncated = &fragments[0];
    assert!(truncated.truncated());
    assert_eq!(truncated.id(), reply.id());
    assert_eq!(truncated.queries(), reply.queries());
    assert!(truncated.answers().is_empty());
    assert!(truncated.name_servers().is_empty());
    assert!(truncated.additionals().is_empty());
    assert!(truncated.extensions().is_none());
    assert_eq!(signal::fragment_descriptor(truncated), None);
}

#[test]
fn test_oversize_record_behind_small_ones_also_truncates() {
    let query = helpers::query(7, "mixed.example.com.", RecordType::TXT);
    let mut reply = helpers::reply_with_aaaa(&query, 2);
    reply.add_answer(helpers::txt_record("mixed.example.com.", 700));

    let fragments = fragment_reply(&reply).unwrap();

    assert_eq!(fragments.len(), 1);
    assert!(fragments[0].truncated());
    assert!(fragments[0].answers().is_empty());
}

#[test]
fn test_more_than_255_fragments_yields_truncated_reply() {
    let query = helpers::query(8, "bulk.example.com.", RecordType::TXT);
    let mut reply = helpers::reply_with_edns(&query, 4096);
    // each record nearly fills a fragment on its own, one record per
    // fragment, 256 fragments needed
    for _ in 0..256 {
        reply.add_answer(helpers::txt_record("bulk.example.com.", 300));
    }

    let fragments = fragment_reply(&reply).unwrap();

    assert_eq!(fragments.len(), 1);
    assert!(fragments[0].truncated());
    assert!(fragments[0].answers().is_empty());
}

#[test]
fn test_reply_without_opt_is_refused() {
    let query = helpers::query(9, "noopt.example.com.", RecordType::A);
    let mut reply = helpers::reply_for(&query);
    reply.add_answer(helpers::a_record("noopt.example.com.", 1));

    match fragment_reply(&reply) {
        Err(ProxyError::MissingOpt) => {}
        other => panic!("expected MissingOpt, got {:?}", other),
    }
}
