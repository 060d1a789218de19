//! Integration tests for the lexer/parser/lowering pipeline.

use indexmap::IndexMap;
use lingua_syntax::{
    build_messages, collect_terms, Lexer, Message, Parser, SyntaxError, Term,
};
use proptest::prelude::*;

fn parse(source: &str) -> Result<(IndexMap<String, Term>, IndexMap<String, Message>), SyntaxError> {
    let tokens = Lexer::new(source).tokenize();
    let entries = Parser::new(&tokens).parse()?;
    let terms = collect_terms(&entries)?;
    let messages = build_messages(&entries, &terms, true)?;
    Ok((terms, messages))
}

#[test]
fn test_empty_file_has_no_entries() {
    let (terms, messages) = parse("").unwrap();
    assert!(terms.is_empty());
    assert!(messages.is_empty());
}

#[test]
fn test_basic_messages_with_a_term() {
    let source = "-my-term = TESTING\nmessage-number-one = HELLO\nmessage-number-two = HELLOU\n";
    let (terms, messages) = parse(source).unwrap();
    assert_eq!(terms.len(), 1);
    assert_eq!(messages.len(), 2);
    let names: Vec<_> = messages.keys().cloned().collect();
    assert_eq!(names, vec!["message-number-one", "message-number-two"]);
}

#[test]
fn test_comments_are_skipped() {
    let source = "# resource comment\n## group comment\nmsg = x\n### standalone\n";
    let (_, messages) = parse(source).unwrap();
    assert_eq!(messages.len(), 1);
}

#[test]
fn test_select_inside_message_with_block_continuations() {
    let source = concat!(
        "msg = It's a { $test ->\n",
        "    [fox] 🦊\n",
        "    {\"\\n\\u0020\"}fops\n",
        "    [wolf] 🐺\n",
        "    {\"\\n\\u0020\"}wolp\n",
        "    *[turtle] 🐢\n",
        "    {\"\\n\\u0020\"}turt\n",
        "}!\n",
    );
    let (_, messages) = parse(source).unwrap();
    assert!(messages.contains_key("msg"));
}

#[test]
fn test_entry_without_value_keeps_later_entries_intact() {
    let (_, messages) = parse("declared\nafter = works\n").unwrap();
    assert_eq!(messages.len(), 2);
    assert!(messages["declared"].elements.is_empty());
}

#[test]
fn test_parser_error_carries_a_resolvable_range() {
    let source = "msg = {$}\n";
    let tokens = Lexer::new(source).tokenize();
    let err = Parser::new(&tokens).parse().unwrap_err();
    match err {
        SyntaxError::Parser { range, .. } => {
            let resolved = range.resolve(&tokens).expect("range must resolve");
            assert_eq!(resolved.start.line, 1);
        }
        other => panic!("expected a parser error, got {other}"),
    }
}

proptest! {
    // Re-parsing the same source yields a structurally equal AST.
    #[test]
    fn parse_is_deterministic(
        entries in prop::collection::btree_map(
            "[a-z][a-z0-9-]{0,8}",
            "[A-Za-z0-9 .,!?]{1,24}",
            1..6,
        )
    ) {
        let mut source = String::new();
        for (name, value) in &entries {
            source.push_str(&format!("{name} = {value}\n"));
        }
        let first = parse(&source).unwrap();
        let second = parse(&source).unwrap();
        prop_assert_eq!(first.1, second.1);
    }

    // Every identifier the grammar admits round-trips through an entry name.
    #[test]
    fn identifiers_round_trip(name in "[A-Za-z][A-Za-z0-9_-]{0,16}") {
        let source = format!("{name} = value\n");
        let (_, messages) = parse(&source).unwrap();
        prop_assert!(messages.contains_key(name.as_str()));
    }
}
