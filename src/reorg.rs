//! The tree reorganizer.
//!
//! A small set of structural rewrites that a literal translation of
//! DocBook could not express cleanly in mdoc(7): prologue synthesis at
//! the root, placement of leftover meta information in an AUTHORS
//! section, admonition collapse with default titles, and function name
//! cleanup.

use crate::dom::{AttrKey, Document, ElementKind, Node, NodeId};

use crate::dom::ElementKind as K;

/// Sections that conventionally precede AUTHORS in a manual page.
const STANDARD_SECTIONS: &[&str] = &[
    "NAME",
    "SYNOPSIS",
    "DESCRIPTION",
    "RETURN VALUES",
    "ENVIRONMENT",
    "FILES",
    "EXIT STATUS",
    "EXAMPLES",
    "DIAGNOSTICS",
    "ERRORS",
    "SEE ALSO",
    "STANDARDS",
    "HISTORY",
];

/// Normalize the parsed tree into a mdoc-shaped skeleton.
///
/// `sec` overrides the manual volume number.
pub fn reorganize(doc: &mut Document, sec: Option<&str>) {
    if let Some(root) = doc.root_element() {
        reorg_root(doc, root, sec);
        reorg_recurse(doc, root);
    }
}

/// Make sure the first three children of the root are date, title, and
/// volume, synthesizing them as needed.
fn reorg_root(doc: &mut Document, root: NodeId, sec: Option<&str>) {
    // Collect prologue information.

    let date = doc.take_first(root, K::PubDate)
        .or_else(|| doc.take_first(root, K::Date))
        .unwrap_or_else(|| {
            let d = doc.push_node(Node::new_elem(K::Date));
            doc.append_child(d, Node::new_text("$Mdocdate$"));
            d
        });
    if let Some(e) = doc[date].as_element_mut() {
        e.kind = K::Date;
    }

    let mut name = None;
    let mut vol = None;
    if let Some(meta) = doc.find_first(root, K::RefMeta) {
        name = doc.take_first(meta, K::RefEntryTitle);
        vol = doc.take_first(meta, K::ManVolNum);
    }
    let name = name.unwrap_or_else(|| {
        let title = doc[root].attr_str(AttrKey::Id)
            .unwrap_or("UNKNOWN").to_string();
        let n = doc.push_node(Node::new_elem(K::RefEntryTitle));
        doc.append_child(n, Node::new_text(title.as_str()));
        n
    });
    let vol = match (vol, sec) {
        (Some(vol), None) => vol,
        (old, sec) => {
            if let Some(old) = old {
                doc.detach(old);
            }
            let v = doc.push_node(Node::new_elem(K::ManVolNum));
            doc.append_child(v, Node::new_text(sec.unwrap_or("1")));
            v
        }
    };

    // Insert prologue information at the beginning.

    if doc.find_first(root, K::RefNameDiv).is_none() {
        let info = doc.find_first(root, K::BookInfo)
            .or_else(|| doc.find_first(root, K::RefEntryInfo));
        if let Some(info) = info {
            if let Some(nc) = doc.take_first(info, K::Abstract) {
                doc.prepend(root, nc);
            }
            if let Some(nc) = doc.take_first(info, K::Title) {
                doc.prepend(root, nc);
            }
        }
    }
    doc.prepend(root, vol);
    doc.prepend(root, name);
    doc.prepend(root, date);
}

/// Attach leftover info and meta blocks to the AUTHORS section,
/// synthesizing one in the conventional place if the document has
/// none.
fn reorg_refentry(doc: &mut Document, n: NodeId) {
    // Collect nodes that remained behind from the prologue.

    let mut meta = None;
    let mut info = doc.take_first(n, K::BookInfo)
        .filter(|&i| doc[i].first_child.is_some());
    if info.is_none() {
        info = doc.take_first(n, K::RefEntryInfo)
            .filter(|&i| doc[i].first_child.is_some());
        if info.is_none() {
            info = doc.take_first(n, K::Info);
        }
        meta = doc.take_first(n, K::RefMeta)
            .filter(|&m| doc[m].first_child.is_some());
    }
    if info.is_none() && meta.is_none() {
        return;
    }

    /*
     * Find the best place to put this information. Use the last
     * existing AUTHORS section, if any. Otherwise, put it behind all
     * standard sections that conventionally precede AUTHORS, and also
     * behind any non-standard sections that follow the last of these,
     * but before the next APPENDIX, INDEX, CAVEATS, or BUGS section.
     */

    let mut found = None;
    let mut later = None;
    for nc in doc.children(n) {
        match doc[nc].kind() {
            Some(K::RefEntry) | Some(K::RefNameDiv)
            | Some(K::RefSynopsisDiv) => {
                later = None;
                continue;
            }
            Some(K::Appendix) | Some(K::Index) => {
                if later.is_none() {
                    later = Some(nc);
                }
                continue;
            }
            _ => {}
        }
        let title = match doc.find_first(nc, K::Title)
            .and_then(|t| doc[t].first_child)
            .filter(|&c| doc[c].is_text())
            .and_then(|c| doc[c].text_str().cloned())
        {
            Some(t) => t,
            None => continue,
        };
        let title: &str = &title;
        if title.eq_ignore_ascii_case("AUTHORS")
            || title.eq_ignore_ascii_case("AUTHOR")
        {
            found = Some(nc);
        } else if STANDARD_SECTIONS.iter()
            .any(|s| title.eq_ignore_ascii_case(s))
        {
            later = None;
        } else if (title.eq_ignore_ascii_case("CAVEATS")
            || title.eq_ignore_ascii_case("BUGS"))
            && later.is_none()
        {
            later = Some(nc);
        }
    }

    /*
     * If no AUTHORS section was found, create one from scratch, and
     * insert that at the place selected earlier.
     */

    let found = found.unwrap_or_else(|| {
        let section = doc.push_node(Node::new_elem(K::Section));
        doc[section].spc = true;
        let title = doc.append_child(section, Node::new_elem(K::Title));
        doc[title].spc = true;
        let text = doc.append_child(title, Node::new_text("AUTHORS"));
        doc[text].spc = true;
        match later {
            None => doc.append(n, section),
            Some(later) => doc.insert_before(later, section),
        }
        section
    });

    // Dump the stuff excised at the beginning into this section.

    if let Some(info) = info {
        doc.append(found, info);
    }
    if let Some(meta) = meta {
        doc.append(found, meta);
    }
}

/// Give the node a title child if it has none yet.
fn default_title(doc: &mut Document, n: NodeId, title: &str) {
    if doc.is_root(n) {
        return;
    }
    for nc in doc.children(n) {
        if doc[nc].is_kind(K::Title) {
            return;
        }
    }
    let t = doc.push_node(Node::new_elem(K::Title));
    doc.prepend(n, t);
    doc.append_child(t, Node::new_text(title));
}

/// Strip a trailing `()` from a function name given as its only text
/// child.
fn reorg_function(doc: &mut Document, n: NodeId) {
    let nc = match doc[n].first_child {
        Some(nc) => nc,
        None => return,
    };
    if doc[nc].next_sibling.is_some() || !doc[nc].is_text() {
        return;
    }
    let s = match doc[nc].text_str() {
        Some(t) => t.to_string(),
        None => return,
    };
    if s.len() > 2 && s.ends_with("()") {
        if let Some(t) = doc[nc].as_text_mut() {
            *t = s[..s.len() - 2].into();
        }
    }
}

fn set_kind(doc: &mut Document, n: NodeId, kind: ElementKind) {
    if let Some(e) = doc[n].as_element_mut() {
        e.kind = kind;
    }
}

fn reorg_recurse(doc: &mut Document, n: NodeId) {
    match doc[n].kind() {
        Some(K::Abstract) => {
            default_title(doc, n, "Abstract");
            set_kind(doc, n, K::Section);
        }
        Some(K::Appendix) => {
            if doc.is_root(n) {
                reorg_refentry(doc, n);
            }
            default_title(doc, n, "Appendix");
        }
        Some(K::Caution) => {
            default_title(doc, n, "Caution");
            set_kind(doc, n, K::Note);
        }
        Some(K::Function) => {
            reorg_function(doc, n);
        }
        Some(K::LegalNotice) => {
            default_title(doc, n, "Legal Notice");
            set_kind(doc, n, K::SimpleSect);
        }
        Some(K::Note) => {
            default_title(doc, n, "Note");
        }
        Some(K::Preface) => {
            if doc.is_root(n) {
                reorg_refentry(doc, n);
            }
            default_title(doc, n, "Preface");
            set_kind(doc, n, K::Section);
        }
        Some(K::RefEntry) => {
            reorg_refentry(doc, n);
        }
        Some(K::Section) => {
            if doc.is_root(n) {
                reorg_refentry(doc, n);
            }
            default_title(doc, n, "Untitled");
        }
        Some(K::SimpleSect) => {
            default_title(doc, n, "Untitled");
        }
        Some(K::Tip) => {
            default_title(doc, n, "Tip");
            set_kind(doc, n, K::Note);
        }
        Some(K::Warning) => {
            default_title(doc, n, "Warning");
            set_kind(doc, n, K::Note);
        }
        _ => {}
    }

    let children: Vec<NodeId> = doc.children(n).collect();
    for nc in children {
        reorg_recurse(doc, nc);
    }
}
