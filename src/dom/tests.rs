use crate::dom::{xml, AttrKey, Document, Node, NodeClass};
use crate::logger::ensure_logger;

use rand::Rng;

use crate::dom::ElementKind as K;

#[test]
fn empty_document() {
    ensure_logger();
    let doc = Document::default();
    assert_eq!(None, doc.root_element_ref(), "no root element");
    assert_eq!(1, doc.nodes().count(), "one document node");
}

#[test]
fn one_element() {
    ensure_logger();
    let mut doc = Document::new();
    let id = doc.append_child(
        Document::DOCUMENT_NODE_ID, Node::new_elem(K::RefEntry));

    assert!(doc.root_element_ref().is_some(), "pushed root element");
    assert_eq!(id, doc.root_element_ref().unwrap().id());
    assert_eq!(2, doc.nodes().count(), "document node + 1 element");
}

#[test]
fn link_editing() {
    ensure_logger();
    let mut doc = Document::new();
    let root = doc.append_child(
        Document::DOCUMENT_NODE_ID, Node::new_elem(K::RefEntry));
    let a = doc.append_child(root, Node::new_text("a"));
    let c = doc.append_child(root, Node::new_text("c"));
    let b = doc.insert_before_sibling(c, Node::new_text("b"));

    let texts: Vec<_> = doc.children(root)
        .map(|id| doc[id].text_str().unwrap().to_string())
        .collect();
    assert_eq!(texts, ["a", "b", "c"]);

    doc.detach(b);
    let texts: Vec<_> = doc.children(root)
        .map(|id| doc[id].text_str().unwrap().to_string())
        .collect();
    assert_eq!(texts, ["a", "c"]);

    doc.prepend(root, b);
    let texts: Vec<_> = doc.children(root)
        .map(|id| doc[id].text_str().unwrap().to_string())
        .collect();
    assert_eq!(texts, ["b", "a", "c"]);

    assert_eq!(doc.text(root).unwrap().as_ref(), "bac");
    assert_eq!(doc[a].parent, Some(root));
}

#[test]
fn find_and_take() {
    ensure_logger();
    let mut doc = xml::parse_utf8(
        b"<refentry><refmeta><refentrytitle>foo</refentrytitle>\
          <manvolnum>1</manvolnum></refmeta></refentry>",
        false);
    let root = doc.root_element().unwrap();
    let title = doc.find_first(root, K::RefEntryTitle).unwrap();
    assert_eq!(doc.text(title).unwrap().as_ref(), "foo");

    let taken = doc.take_first(root, K::RefEntryTitle).unwrap();
    assert_eq!(taken, title);
    assert!(doc[taken].parent.is_none());
    assert!(doc.find_first(root, K::RefEntryTitle).is_none());
}

#[test]
fn parse_minimal_shape() {
    ensure_logger();
    let doc = xml::parse_utf8(
        b"<refentry><refnamediv><refname>foo</refname>\
          <refpurpose>bar</refpurpose></refnamediv></refentry>",
        false);
    assert!(!doc.has_errors());
    assert!(!doc.has_warnings());
    assert!(doc.is_closed());

    let root = doc.root_element_ref().unwrap();
    assert!(root.is_kind(K::RefEntry));
    let div = root.find_child(|n| n.is_kind(K::RefNameDiv)).unwrap();
    let name = div.find_child(|n| n.is_kind(K::RefName)).unwrap();
    assert_eq!(name.text().unwrap().as_ref(), "foo");
    let purpose = name.next_sibling().unwrap();
    assert!(purpose.is_kind(K::RefPurpose));
    assert_eq!(purpose.text().unwrap().as_ref(), "bar");
}

#[test]
fn alias_resolution() {
    ensure_logger();
    let doc = xml::parse_utf8(
        b"<refentry><refsect1><simpara>x</simpara></refsect1>\
          <ulink url=\"http://example.com\">y</ulink></refentry>",
        false);
    let root = doc.root_element_ref().unwrap();
    let sect = root.find_child(|n| n.is_kind(K::Section)).unwrap();
    assert!(sect.find_child(|n| n.is_kind(K::Para)).is_some());
    let link = root.find_child(|n| n.is_kind(K::Link)).unwrap();
    assert_eq!(link.attr_str(AttrKey::Url), Some("http://example.com"));
}

#[test]
fn entity_escapes() {
    ensure_logger();
    let doc = xml::parse_utf8(
        b"<para>A &mdash; B &#65; &#x42;</para>", false);
    assert!(!doc.has_errors());
    let root = doc.root_element_ref().unwrap();
    let escapes: Vec<_> = root.children()
        .filter(|n| !n.is_text())
        .map(|n| n.text_str().unwrap().to_string())
        .collect();
    assert_eq!(escapes, ["\\(em", "\\[u0041]", "\\[u0042]"]);
}

#[test]
fn entity_unknown() {
    ensure_logger();
    let doc = xml::parse_utf8(b"<para>&bogus;</para>", false);
    assert!(doc.has_errors());
}

#[test]
fn entity_from_doctype_definition() {
    ensure_logger();
    let doc = xml::parse_utf8(
        b"<!DOCTYPE refentry [ <!ENTITY foo \"bar baz\"> ]>\
          <para>&foo;</para>",
        false);
    assert!(!doc.has_errors(), "declared entity expands");
    let root = doc.root_element_ref().unwrap();
    assert!(root.is_kind(K::Para));
    assert_eq!(root.text().unwrap().as_ref(), "bar baz");
}

#[test]
fn unknown_element_keeps_content() {
    ensure_logger();
    let doc = xml::parse_utf8(
        b"<refentry><bogus><para>x</para></bogus></refentry>", false);
    assert!(doc.has_errors(), "unknown element is an error");
    let root = doc.root_element_ref().unwrap();
    // The unknown element opens no node, its children survive.
    let para = root.find_child(|n| n.is_kind(K::Para)).unwrap();
    assert_eq!(para.text().unwrap().as_ref(), "x");
}

#[test]
fn deleted_subtree_is_skipped() {
    ensure_logger();
    let doc = xml::parse_utf8(
        b"<para>a<indexterm><primary>x</primary></indexterm>b</para>",
        false);
    assert!(!doc.has_errors());
    let root = doc.root_element_ref().unwrap();
    // The open text node spans the deleted subtree.
    let texts: Vec<_> = root.children()
        .map(|n| n.text_str().unwrap().to_string())
        .collect();
    assert_eq!(texts, ["ab"]);
}

#[test]
fn mismatched_closer_does_not_pop() {
    ensure_logger();
    let doc = xml::parse_utf8(
        b"<refentry><para>x</section>y</para></refentry>", true);
    assert!(doc.has_warnings(), "stray closer warns");
    let root = doc.root_element_ref().unwrap();
    let para = root.find_child(|n| n.is_kind(K::Para)).unwrap();
    assert_eq!(para.text().unwrap().as_ref(), "xy");
}

#[test]
fn warnings_gated_by_flag() {
    ensure_logger();
    let doc = xml::parse_utf8(b"<refentry><para>x", false);
    assert!(!doc.has_warnings(), "warnings disabled by default");
    assert!(!doc.is_closed());

    let doc = xml::parse_utf8(b"<refentry><para>x", true);
    assert!(doc.has_warnings(), "document not closed");
    assert!(!doc.has_errors());
}

#[test]
fn text_before_document() {
    ensure_logger();
    let doc = xml::parse_utf8(b"stray<para>x</para>", false);
    assert!(doc.has_errors());
    let root = doc.root_element_ref().unwrap();
    assert_eq!(root.text().unwrap().as_ref(), "x");
}

#[test]
fn content_after_close_is_kept() {
    ensure_logger();
    let doc = xml::parse_utf8(
        b"<refentry><para>x</para></refentry><para>y</para>", true);
    assert!(doc.is_closed());
    assert!(doc.has_warnings());
    let root = doc.root_element_ref().unwrap();
    let texts: Vec<_> = root.children()
        .filter(|n| n.is_kind(K::Para))
        .map(|n| n.text().unwrap().to_string())
        .collect();
    assert_eq!(texts, ["x", "y"]);
}

#[test]
fn last_word_splits_before_inline() {
    ensure_logger();
    let doc = xml::parse_utf8(
        b"<para>a prefix<command>x</command></para>", false);
    let root = doc.root_element_ref().unwrap();
    let texts: Vec<_> = root.children()
        .filter(|n| n.is_text())
        .map(|n| (n.text_str().unwrap().to_string(), n.spc()))
        .collect();
    assert_eq!(texts,
        [("a".to_string(), false), ("prefix".to_string(), true)]);
}

#[test]
fn nofill_preserves_leading_whitespace() {
    ensure_logger();
    let doc = xml::parse_utf8(b"<screen>line one\n  indented</screen>",
        false);
    let root = doc.root_element_ref().unwrap();
    let texts: Vec<_> = root.children()
        .map(|n| n.text_str().unwrap().to_string())
        .collect();
    assert_eq!(texts, ["line one", "  indented"]);
}

#[test]
fn self_closing_elements() {
    ensure_logger();
    let doc = xml::parse_utf8(
        b"<para>a<sbr/>b<sbr>c</para>", false);
    assert!(!doc.has_errors());
    let root = doc.root_element_ref().unwrap();
    assert_eq!(root.children().filter(|n| n.is_kind(K::Sbr)).count(), 2);
}

#[test]
fn comments_are_skipped() {
    ensure_logger();
    let doc = xml::parse_utf8(
        b"<para>a<!-- ignore <b> and &c; -->b</para>", false);
    assert!(!doc.has_errors());
    let root = doc.root_element_ref().unwrap();
    assert_eq!(root.text().unwrap().as_ref(), "ab");
}

#[test]
fn attribute_keywords_and_raw_values() {
    ensure_logger();
    let doc = xml::parse_utf8(
        b"<cmdsynopsis><arg choice='opt' rep='repeat'>x</arg>\
          <arg choice='whatever'>y</arg></cmdsynopsis>",
        false);
    let root = doc.root_element_ref().unwrap();
    let args: Vec<_> = root.children().collect();
    assert_eq!(args[0].attr_str(AttrKey::Choice), Some("opt"));
    assert_eq!(args[0].attr_str(AttrKey::Rep), Some("repeat"));
    // Unrecognized value survives as a free-form string.
    assert_eq!(args[1].attr_str(AttrKey::Choice), Some("whatever"));
}

#[test]
fn unknown_attributes_are_dropped() {
    ensure_logger();
    let doc = xml::parse_utf8(
        b"<para role=\"bold\" id=\"here\">x</para>", false);
    let root = doc.root_element_ref().unwrap();
    assert_eq!(root.attr_str(AttrKey::Id), Some("here"));
    assert_eq!(root.as_element().unwrap().attrs.len(), 1);
}

#[test]
fn tree_dump_format() {
    ensure_logger();
    let doc = xml::parse_utf8(
        b"<para id='p'>x\n<emphasis>y</emphasis></para>", false);
    let mut out = Vec::new();
    doc.write_tree(&mut out).unwrap();
    let dump = String::from_utf8(out).unwrap();
    let lines: Vec<_> = dump.lines().collect();
    assert_eq!(lines[0], " para id='p'");
    assert_eq!(lines[1], "  -(t) x");
    assert_eq!(lines[2], "  *emphasis");
    assert_eq!(lines[3], "     (t) y");
}

#[test]
fn tree_dump_deterministic() {
    ensure_logger();
    let src = b"<refentry><refnamediv><refname>a</refname>\
        <refpurpose>b</refpurpose></refnamediv>\
        <refsect1><title>T</title><para>x &amp; y</para></refsect1>\
        </refentry>";
    let mut first = Vec::new();
    xml::parse_utf8(src, false).write_tree(&mut first).unwrap();
    let mut second = Vec::new();
    xml::parse_utf8(src, false).write_tree(&mut second).unwrap();
    assert_eq!(first, second);
}

#[test]
fn buffer_boundary_straddling() {
    ensure_logger();
    // Force tokens across the 4096 byte refill boundary.
    let mut src = String::from("<refentry><para>");
    while src.len() < crate::PARSE_BUFFER_SIZE - 8 {
        src.push_str("word ");
    }
    src.push_str("<emphasis>tail</emphasis></para></refentry>");
    let doc = xml::parse_utf8(src.as_bytes(), false);
    assert!(!doc.has_errors());
    let root = doc.root_element_ref().unwrap();
    let em = root.find(|n| n.is_kind(K::Emphasis)).unwrap();
    assert_eq!(em.text().unwrap().as_ref(), "tail");
}

#[test]
fn truncation_fuzz() {
    ensure_logger();
    let src: &[u8] =
        b"<!DOCTYPE refentry [ <!ENTITY v \"1.0\"> ]>\n\
          <refentry id='r'>\n<refnamediv><refname>foo</refname>\n\
          <refpurpose>do &v; things &amp; more</refpurpose></refnamediv>\n\
          <!-- a comment -->\n\
          <refsect1><title>DESCRIPTION</title>\n\
          <caution><para>careful</para></caution>\n\
          <screen>  raw text</screen>\n\
          <cmdsynopsis><command>foo</command> \
          <arg choice=\"opt\"><option>-v</option></arg></cmdsynopsis>\n\
          </refsect1></refentry>\n";

    for cut in 0..src.len() {
        let mut doc = xml::parse_utf8(&src[..cut], false);
        crate::reorganize(&mut doc, None);
        let mut out = Vec::new();
        crate::mdoc::write_mdoc(&mut doc, &mut out).unwrap();
    }

    let mut rng = rand::thread_rng();
    for _ in 0..500 {
        let mut mangled = src.to_vec();
        for _ in 0..rng.gen_range(1, 4) {
            let i = rng.gen_range(0, mangled.len());
            mangled[i] = b"<>&;\"' abc["[rng.gen_range(0, 11)];
        }
        let mut doc = xml::parse_utf8(&mangled, false);
        crate::reorganize(&mut doc, None);
        let mut out = Vec::new();
        crate::mdoc::write_mdoc(&mut doc, &mut out).unwrap();
    }
}

#[test]
fn class_ordering() {
    ensure_logger();
    assert!(NodeClass::Text < NodeClass::Line);
    assert!(NodeClass::Trans < NodeClass::Line);
    assert!(NodeClass::Line < NodeClass::Encl);
    assert_eq!(K::Screen.class(), NodeClass::NoFill);
    assert_eq!(K::RefEntry.class(), NodeClass::Trans);
}
