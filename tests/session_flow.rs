use pretty_assertions::assert_eq;
use study_buddy::{Assistant, BuiltinCatalog, ReplyKind, Session, SessionStore, Turn};

#[test]
fn test_learned_notes_survive_a_new_session() {
    let dir = tempfile::tempdir().unwrap();
    let store = SessionStore::new(dir.path());
    let assistant = Assistant::new(BuiltinCatalog::Cs.catalog());

    let mut first = Session::open(store.clone(), "student-7").unwrap();
    let reply = assistant.respond(
        &mut first,
        &Turn::with_attachment(
            "summarize these notes",
            "unit4.md",
            b"# Unit 4\nRound robin scheduling and the Banker's algorithm.\nAlso: Peterson's solution."
                .to_vec(),
        ),
    );
    assert_eq!(reply.kind, ReplyKind::Checklist);
    assert_eq!(
        reply.text,
        "Topics covered in \"unit4.md\":\n- [x] Process Scheduling\n- [x] Deadlock"
    );

    // A later run starts from what was written back after the append.
    let mut second = Session::open(store, "student-7").unwrap();
    assert_eq!(second.fragments().len(), 1);
    let reply = assistant.respond(&mut second, &Turn::text("what is peterson's solution"));
    assert_eq!(reply.kind, ReplyKind::FragmentHit);
    assert!(reply.text.contains("Peterson's solution"));
}

#[test]
fn test_every_turn_gets_exactly_one_reply() {
    let assistant = Assistant::new(BuiltinCatalog::Lite.catalog());
    let mut session = Session::ephemeral("anon");
    let turns = [
        Turn::text(""),
        Turn::text("hello"),
        Turn::text("what is big o"),
        Turn::text("zzzz"),
        Turn::with_attachment("summarize", "empty.txt", Vec::new()),
        Turn::with_attachment("summarize", "blob.bin", vec![0, 159, 146, 150]),
    ];
    for turn in &turns {
        let reply = assistant.respond(&mut session, turn);
        assert!(!reply.text.is_empty(), "empty reply for {:?}", turn.query);
    }
    assert!(session.fragments().is_empty());
}
