use crate::dom::xml;
use crate::logger::ensure_logger;
use crate::mdoc::write_mdoc;
use crate::reorganize;

fn convert(input: &str, sec: Option<&str>) -> String {
    let mut doc = xml::parse_utf8(input.as_bytes(), true);
    reorganize(&mut doc, sec);
    let mut out = Vec::new();
    write_mdoc(&mut doc, &mut out).unwrap();
    String::from_utf8(out).unwrap()
}

/// Structural soundness of generated mdoc: every display and list is
/// balanced, no paragraph break follows a break, and nothing but
/// literal displays contains lines starting with whitespace.
fn check_invariants(output: &str) {
    let mut bd = 0i32;
    let mut bl = 0i32;
    let mut fo = 0i32;
    let mut literal = 0i32;
    let mut prev = "";
    for line in output.lines() {
        if line.starts_with(".Bd") {
            bd += 1;
            if line.contains("-literal") {
                literal += 1;
            }
        } else if line == ".Ed" {
            if literal > 0 {
                literal -= 1;
            }
            bd -= 1;
        } else if line.starts_with(".Bl") {
            bl += 1;
        } else if line == ".El" {
            bl -= 1;
        } else if line.starts_with(".Fo") {
            fo += 1;
        } else if line == ".Fc" {
            fo -= 1;
        }
        assert!(bd >= 0 && bl >= 0 && fo >= 0, "unbalanced: {:?}", line);

        if line == ".Pp" {
            for breaker in &[".Sh", ".Ss", ".Bd", ".Bl", ".Pp"] {
                assert!(!prev.starts_with(breaker),
                    ".Pp after {:?}", prev);
            }
        }
        if literal == 0 {
            assert!(!line.starts_with(' '),
                "leading space outside display: {:?}", line);
        }
        prev = line;
    }
    assert_eq!(bd, 0, "unclosed .Bd");
    assert_eq!(bl, 0, "unclosed .Bl");
    assert_eq!(fo, 0, "unclosed .Fo");
}

#[test]
fn minimal_manpage() {
    ensure_logger();
    let out = convert(
        "<refentry><refmeta><refentrytitle>foo</refentrytitle>\
         <manvolnum>1</manvolnum></refmeta>\
         <refnamediv><refname>foo</refname>\
         <refpurpose>bar</refpurpose></refnamediv></refentry>",
        None);
    assert_eq!(out,
        ".Dd $Mdocdate$\n\
         .Dt FOO 1\n\
         .Os\n\
         .Sh NAME\n\
         .Nm foo\n\
         .Nd bar\n");
    check_invariants(&out);
}

#[test]
fn section_override() {
    ensure_logger();
    let out = convert(
        "<refentry><refmeta><refentrytitle>foo</refentrytitle>\
         <manvolnum>1</manvolnum></refmeta>\
         <refnamediv><refname>foo</refname>\
         <refpurpose>bar</refpurpose></refnamediv></refentry>",
        Some("3"));
    assert!(out.contains(".Dt FOO 3\n"), "section override:\n{}", out);
}

#[test]
fn entity_in_paragraph() {
    ensure_logger();
    let out = convert(
        "<refentry><refnamediv><refname>f</refname>\
         <refpurpose>p</refpurpose></refnamediv>\
         <refsect1><title>DESCRIPTION</title>\
         <para>x</para><para>A &mdash; B</para></refsect1></refentry>",
        None);
    assert!(out.contains("\n.Sh DESCRIPTION\nx\n.Pp\nA \\(em B\n"),
        "paragraph break and entity:\n{}", out);
    check_invariants(&out);
}

#[test]
fn option_stripping() {
    ensure_logger();
    let out = convert(
        "<refentry><cmdsynopsis><command>x</command> \
         <arg choice=\"opt\"><option>-v</option></arg>\
         </cmdsynopsis></refentry>",
        None);
    assert_eq!(out,
        ".Dd $Mdocdate$\n\
         .Dt UNKNOWN 1\n\
         .Os\n\
         .Nm x\n\
         .Op Fl v\n");
    check_invariants(&out);
}

#[test]
fn arg_repeat_and_group() {
    ensure_logger();
    let out = convert(
        "<refentry><cmdsynopsis><command>x</command> \
         <arg choice=\"plain\" rep=\"repeat\">file</arg> \
         <group><arg choice=\"plain\">a</arg> \
         <arg choice=\"plain\">b</arg></group>\
         </cmdsynopsis></refentry>",
        None);
    assert!(out.contains(".Ar file ...\n"), "repeat ellipsis:\n{}", out);
    assert!(out.contains(".Op Ar a | Ar b\n"), "group bar:\n{}", out);
    check_invariants(&out);
}

#[test]
fn funcprototype_void() {
    ensure_logger();
    let out = convert(
        "<refentry><funcsynopsis><funcprototype>\
         <funcdef>int <function>f</function></funcdef>\
         <void/></funcprototype></funcsynopsis></refentry>",
        None);
    assert_eq!(out,
        ".Dd $Mdocdate$\n\
         .Dt UNKNOWN 1\n\
         .Os\n\
         .Ft int\n\
         .Fn f void\n");
    check_invariants(&out);
}

#[test]
fn funcprototype_parameters() {
    ensure_logger();
    let out = convert(
        "<refentry><funcsynopsis><funcprototype>\
         <funcdef>int <function>f</function></funcdef>\
         <paramdef>int <parameter>a</parameter></paramdef>\
         <paramdef>char *<parameter>b</parameter></paramdef>\
         </funcprototype></funcsynopsis></refentry>",
        None);
    assert!(out.contains(".Ft int\n.Fo f\n.Fa \"int a\"\n\
        .Fa \"char * b\"\n.Fc\n"),
        "parameter list:\n{}", out);
    check_invariants(&out);
}

#[test]
fn missing_closer_still_renders() {
    ensure_logger();
    let input = "<refentry><para>x";
    let mut doc = xml::parse_utf8(input.as_bytes(), true);
    assert!(doc.has_warnings(), "document not closed");
    assert!(!doc.has_errors());
    reorganize(&mut doc, None);
    let mut out = Vec::new();
    write_mdoc(&mut doc, &mut out).unwrap();
    let out = String::from_utf8(out).unwrap();
    assert_eq!(out,
        ".Dd $Mdocdate$\n\
         .Dt UNKNOWN 1\n\
         .Os\n\
         x\n");
}

#[test]
fn itemized_list() {
    ensure_logger();
    let out = convert(
        "<refentry><refsect1><title>D</title><itemizedlist>\
         <listitem><para>a</para></listitem>\
         <listitem><para>b</para></listitem>\
         </itemizedlist></refsect1></refentry>",
        None);
    assert!(out.contains("\n.Sh D\n.Bl -bullet\n.It\na\n.It\nb\n.El\n"),
        "bullet list:\n{}", out);
    check_invariants(&out);
}

#[test]
fn variable_list() {
    ensure_logger();
    let out = convert(
        "<refentry><refsect1><title>D</title><variablelist>\
         <varlistentry><term>x</term>\
         <listitem><para>y</para></listitem></varlistentry>\
         </variablelist></refsect1></refentry>",
        None);
    assert!(out.contains("\n.Bl -tag -width Ds\n.It x\ny\n.El\n"),
        "tag list:\n{}", out);
    check_invariants(&out);
}

#[test]
fn literal_display() {
    ensure_logger();
    let out = convert(
        "<refentry><refsect1><title>D</title>\
         <screen>line one\n  indented</screen></refsect1></refentry>",
        None);
    assert!(out.contains("\n.Bd -literal\nline one\n  indented\n.Ed\n"),
        "no-fill display:\n{}", out);
    check_invariants(&out);
}

#[test]
fn admonition_collapse() {
    ensure_logger();
    let out = convert(
        "<refentry><refsect1><title>D</title><para>x</para>\
         <caution><para>careful</para></caution>\
         </refsect1></refentry>",
        None);
    // Caution becomes a note section with its default title.
    assert!(out.contains(".Sy Caution\n"), "default title:\n{}", out);
    assert!(out.contains("careful"), "content kept:\n{}", out);
    check_invariants(&out);
}

#[test]
fn authors_synthesis() {
    ensure_logger();
    let out = convert(
        "<refentry><refnamediv><refname>f</refname>\
         <refpurpose>p</refpurpose></refnamediv>\
         <refentryinfo><author><personname>Jane Doe</personname> \
         <email>j@e.x</email></author></refentryinfo></refentry>",
        None);
    assert!(out.contains("\n.Sh AUTHORS\n.An -nosplit\n"),
        "synthesized section:\n{}", out);
    assert!(out.contains(".An Jane Doe Aq Mt j@e.x"),
        "author line:\n{}", out);
    check_invariants(&out);
}

#[test]
fn citerefentry_cross_reference() {
    ensure_logger();
    let out = convert(
        "<refentry><refsect1><title>SEE ALSO</title><para>\
         <citerefentry><refentrytitle>ls</refentrytitle>\
         <manvolnum>1</manvolnum></citerefentry></para>\
         </refsect1></refentry>",
        None);
    assert!(out.contains("\n.Xr ls 1\n"), "cross reference:\n{}", out);
    check_invariants(&out);
}

#[test]
fn xref_and_link() {
    ensure_logger();
    let out = convert(
        "<refentry><refsect1><title>D</title><para>\
         see <xref linkend=\"files\"/> and \
         <ulink url=\"https://example.com\">the site</ulink></para>\
         </refsect1></refentry>",
        None);
    assert!(out.contains(".Sx files"), "xref:\n{}", out);
    assert!(out.contains(".Lk https://example.com"), "link:\n{}", out);
    check_invariants(&out);
}

#[test]
fn whitespace_amount_insensitive() {
    ensure_logger();
    let narrow = convert(
        "<refentry><cmdsynopsis><command>x</command> \
         <arg choice=\"opt\"><option>-v</option></arg>\
         </cmdsynopsis></refentry>",
        None);
    let wide = convert(
        "<refentry><cmdsynopsis><command>x</command>   \
         <arg  choice=\"opt\"><option>-v</option></arg>\
         </cmdsynopsis></refentry>",
        None);
    assert_eq!(narrow, wide);
}

#[test]
fn sentence_break_inserted() {
    ensure_logger();
    let out = convert(
        "<refentry><refsect1><title>D</title>\
         <para>First point. Second point.</para></refsect1></refentry>",
        None);
    assert!(out.contains("First point.\nSecond point.\n"),
        "sentence break:\n{}", out);
    check_invariants(&out);
}

#[test]
fn quoted_and_literal_phrases() {
    ensure_logger();
    let out = convert(
        "<refentry><refsect1><title>D</title>\
         <para>a <quote>word</quote> and <literal>lit</literal>\
         </para></refsect1></refentry>",
        None);
    assert!(out.contains(".Dq word"), "quote:\n{}", out);
    assert!(out.contains(".Ql lit"), "literal:\n{}", out);
    check_invariants(&out);
}

#[test]
fn subscript_superscript() {
    ensure_logger();
    let out = convert(
        "<refentry><refsect1><title>D</title>\
         <para>x<subscript>1</subscript> y<superscript>2</superscript>\
         </para></refsect1></refentry>",
        None);
    assert!(out.contains("x_1"), "subscript:\n{}", out);
    assert!(out.contains("y\\(ha2"), "superscript:\n{}", out);
    check_invariants(&out);
}

#[test]
fn tgroup_two_columns() {
    ensure_logger();
    let out = convert(
        "<refentry><refsect1><title>D</title><table><tgroup cols=\"2\">\
         <tbody><row><entry>k</entry><entry>v</entry></row></tbody>\
         </tgroup></table></refsect1></refentry>",
        None);
    assert!(out.contains(".Bl -tag -width Ds"), "tag table:\n{}", out);
    assert!(out.contains(".It k") || out.contains(".It\nk"),
        "first entry as header:\n{}", out);
    check_invariants(&out);
}

#[test]
fn generated_output_never_panics_on_samples() {
    ensure_logger();
    // A grab bag of constructs in one document.
    let out = convert(
        "<refentry id=\"grab\"><refnamediv><refname>g</refname>\
         <refpurpose>grab bag</refpurpose></refnamediv>\
         <refsynopsisdiv><title>ignored</title>\
         <cmdsynopsis><command>g</command> \
         <arg choice=\"opt\"><option>-a</option></arg> \
         <group choice=\"opt\"><arg choice=\"plain\">x</arg> \
         <arg choice=\"plain\">y</arg></group></cmdsynopsis>\
         </refsynopsisdiv>\
         <refsect1><title>DESCRIPTION</title>\
         <para>Uses <filename>/etc/f</filename> and \
         <envar>HOME</envar>. See <citerefentry>\
         <refentrytitle>cat</refentrytitle><manvolnum>1</manvolnum>\
         </citerefentry>.</para>\
         <blockquote><para>quoted</para></blockquote>\
         <note><para>a note</para></note>\
         </refsect1></refentry>",
        None);
    assert!(out.contains(".Sh SYNOPSIS"), "synopsis:\n{}", out);
    assert!(out.contains(".Pa /etc/f"), "filename:\n{}", out);
    assert!(out.contains(".Ev HOME"), "envar:\n{}", out);
    assert!(out.contains(".Bd -ragged -offset indent"),
        "blockquote:\n{}", out);
    assert!(out.contains(".Sy Note"), "note title:\n{}", out);
    check_invariants(&out);
}
