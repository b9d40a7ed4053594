//! The lenient streaming DocBook XML reader.
//!
//! A single-pass byte reader over a fixed-size buffer. All parse
//! problems are non-fatal: they are reported on the diagnostic channel
//! with file, line, and column, recorded as sticky flags on the
//! [`Document`], and parsing continues with whatever structure can be
//! recovered.

use std::fs::File;
use std::io::{self, Read};
use std::mem;
use std::path::{Path, PathBuf};

use log::{error, warn};

use crate::dom::meta::{self, resolve_element};
use crate::dom::{
    Attr, AttrData, AttrKey, Document, ElementKind, Node, NodeClass,
    NodeId, Resolved,
};
use crate::PARSE_BUFFER_SIZE;

/// Token scanner states.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
enum PState {
    /// Between tags, in character data.
    Elem,
    /// Read `<name`, expecting an attribute name or `>`.
    Tag,
    /// Read `=`, expecting an attribute value.
    Arg,
    /// Inside a single-quoted value.
    Sq,
    /// Inside a double-quoted value.
    Dq,
}

/// Global parse state. Keep this as simple and small as possible.
pub struct Parser {
    doc: Document,
    /// Print warning messages.
    warn: bool,
    /// Name of the input file.
    fname: String,
    /// Directory of the initial input file, for resolving includes.
    base_dir: Option<PathBuf>,
    /// File inclusion nesting; zero only outside any input.
    depth: u32,
    doctype: Option<NodeId>,
    /// Current node in the tree.
    cur: Option<NodeId>,
    /// Resolution of the most recently started element.
    ncur: Resolved,
    /// Line and column number in the input file.
    line: u32,
    col: u32,
    /// Line and column number of the next token.
    nline: u32,
    ncol: u32,
    /// Levels of nested nodes being deleted.
    del: u32,
    /// Levels of open no-fill displays.
    nofill: u32,
    /// New line before the next element.
    flag_line: bool,
    /// Whitespace before the next element.
    flag_spc: bool,
    /// The most recent attribute is valid.
    flag_attr: bool,
    /// This element is self-closing.
    flag_eend: bool,
}

/// Open and parse the named file, returning the document tree.
///
/// Relative `xi:include` and entity `SYSTEM` paths are resolved against
/// the directory of this initial file.
pub fn parse_file(path: &Path, warn: bool) -> Document {
    let mut p = Parser::new(warn);
    p.base_dir = path.parent()
        .filter(|d| !d.as_os_str().is_empty())
        .map(Path::to_path_buf);
    p.fname = path.to_string_lossy().into_owned();
    p.line = 0;
    p.col = 0;
    match File::open(path) {
        Err(e) => {
            // No finalization: there was no document at all.
            p.error_msg(&format!("open: {}", e));
        }
        Ok(mut f) => {
            p.parse_top(&mut f);
        }
    }
    p.doc
}

/// Parse a document from standard input.
pub fn parse_stdin(warn: bool) -> Document {
    let mut p = Parser::new(warn);
    p.fname = "<stdin>".into();
    let stdin = io::stdin();
    p.parse_top(&mut stdin.lock());
    p.doc
}

/// Parse a complete document held in memory.
pub fn parse_utf8(bytes: &[u8], warn: bool) -> Document {
    let mut p = Parser::new(warn);
    p.fname = "<memory>".into();
    let mut input = bytes;
    p.parse_top(&mut input);
    p.doc
}

impl Parser {
    fn new(warn: bool) -> Parser {
        Parser {
            doc: Document::new(),
            warn,
            fname: String::new(),
            base_dir: None,
            depth: 0,
            doctype: None,
            cur: None,
            ncur: Resolved::Unknown,
            line: 0,
            col: 0,
            nline: 0,
            ncol: 0,
            del: 0,
            nofill: 0,
            flag_line: false,
            flag_spc: false,
            flag_attr: false,
            flag_eend: false,
        }
    }

    fn error_msg(&mut self, msg: &str) {
        error!("{}:{}:{}: ERROR: {}", self.fname, self.line, self.col, msg);
        self.doc.set_error();
    }

    fn warn_msg(&mut self, msg: &str) {
        if !self.warn {
            return;
        }
        warn!("{}:{}:{}: WARNING: {}", self.fname, self.line, self.col, msg);
        self.doc.set_warning();
    }

    /// Parse the outermost input and finalize the tree.
    fn parse_top(&mut self, input: &mut dyn Read) {
        self.line = 0;
        self.col = 0;
        self.nline = 1;
        self.ncol = 1;
        self.depth = 1;
        self.parse_stream(input);
        self.depth = 0;
        self.close_text(false);
        if self.doc.root_element().is_none() {
            self.error_msg("empty document");
        } else if !self.doc.is_closed() {
            self.warn_msg("document not closed");
        }
        if let Some(dt) = self.doctype.take() {
            self.doc.detach(dt);
        }
    }

    /// Open and parse an included file at the current tree position.
    fn parse_path(&mut self, fname: &str) {
        let save_fname = mem::replace(&mut self.fname, fname.to_string());
        let save_line = self.nline;
        let save_col = self.ncol;
        self.line = 0;
        self.col = 0;

        let resolved = self.resolve_path(fname);
        match File::open(&resolved) {
            Err(e) => {
                self.error_msg(&format!("open: {}", e));
                self.fname = save_fname;
                return;
            }
            Ok(mut f) => {
                self.depth += 1;
                self.nline = 1;
                self.ncol = 1;
                self.parse_stream(&mut f);
                self.depth -= 1;
            }
        }
        self.fname = save_fname;
        self.nline = save_line;
        self.ncol = save_col;
    }

    /// Resolve a possibly relative include path against the directory
    /// of the initial input file. The working directory is never
    /// changed.
    fn resolve_path(&self, fname: &str) -> PathBuf {
        let path = Path::new(fname);
        if path.is_relative() {
            if let Some(base) = &self.base_dir {
                return base.join(path);
            }
        }
        path.to_path_buf()
    }

    /// The read loop.
    ///
    /// If the previous token was incomplete and asked for more input,
    /// the loop runs once more even at end of file. Once a read returns
    /// zero bytes, incomplete tokens no longer ask for more input but
    /// use whatever there is. The minus one on the buffer size keeps
    /// token sizes identical to the original implementation.
    fn parse_stream(&mut self, input: &mut dyn Read) {
        let mut b = [0u8; PARSE_BUFFER_SIZE];
        let mut rlen = 0usize;
        let mut pstate = PState::Elem;
        loop {
            let rsz = match input.read(&mut b[rlen..PARSE_BUFFER_SIZE - 1]) {
                Ok(n) => n,
                Err(e) => {
                    self.error_msg(&format!("read: {}", e));
                    break;
                }
            };
            rlen += rsz;
            if rlen == 0 {
                break;
            }
            let poff = self.parse_buf(&b, rlen, &mut pstate, rsz > 0);
            // Buffer exhausted; shift left and re-fill. A token larger
            // than the whole buffer makes no progress here and gets
            // truncated by the final no-refill pass.
            b.copy_within(poff..rlen, 0);
            rlen -= poff;
        }
    }

    /// Re-enter the scanner on an in-memory entity definition, without
    /// position tracking.
    fn parse_norefill(&mut self, bytes: &[u8]) {
        let mut pstate = PState::Elem;
        self.parse_buf(bytes, bytes.len(), &mut pstate, false);
    }

    fn increment(&mut self, b: &[u8], pend: &mut usize, refill: bool) {
        if refill {
            if b[*pend] == b'\n' {
                self.nline += 1;
                self.ncol = 1;
            } else {
                self.ncol += 1;
            }
        }
        *pend += 1;
    }

    /// Advance `pend` to the next byte in the charset.
    ///
    /// If the charset starts with a space, it stands for any
    /// whitespace. Updates the next-token position used for messages.
    /// When reaching the end of the buffer while more input may still
    /// arrive, return true so the token can be retried after a refill.
    fn advance(&mut self, b: &[u8], rlen: usize, pend: &mut usize,
        charset: &[u8], refill: bool) -> bool
    {
        let (space, set) = match charset.split_first() {
            Some((&b' ', rest)) => (true, rest),
            _ => (false, charset),
        };

        if refill {
            self.nline = self.line;
            self.ncol = self.col;
        }
        while *pend < rlen {
            let c = b[*pend];
            if space && c.is_ascii_whitespace() {
                break;
            }
            if set.contains(&c) {
                break;
            }
            self.increment(b, pend, refill);
        }
        *pend == rlen && refill
    }

    /// The token loop: consume as much of the buffer as possible and
    /// return the offset of the first unconsumed byte.
    fn parse_buf(&mut self, b: &[u8], rlen: usize, pstate: &mut PState,
        refill: bool) -> usize
    {
        let mut pws = 0usize; // Parse offset including whitespace.
        let mut pend = 0usize; // Offset of the end of the current word.
        let mut poff; // Parse offset in b[].

        loop {
            // Proceed to the next token, skipping whitespace.

            if refill {
                self.line = self.nline;
                self.col = self.ncol;
            }
            poff = pend;
            if poff == rlen {
                break;
            }
            if b[pend].is_ascii_whitespace() {
                self.flag_spc = true;
                if b[pend] == b'\n' {
                    self.flag_line = true;
                    pws = pend + 1;
                }
                self.increment(b, &mut pend, refill);
                continue;
            }

            /*
             * The following cases (Arg, Tag, and starting an entity or
             * a tag) all parse a word or quoted string. If that extends
             * beyond the read buffer and the last read still got data,
             * they break out of the token loop to request more input
             * from the read loop. Self-closing tags, ending with "/>",
             * are detected here and close the element after the
             * attribute value, attribute name, or tag name was handled.
             */

            if *pstate >= PState::Arg {
                // Parse an attribute value.

                if *pstate == PState::Arg
                    && (b[pend] == b'\'' || b[pend] == b'"')
                {
                    *pstate = if b[pend] == b'"' {
                        PState::Dq
                    } else {
                        PState::Sq
                    };
                    self.increment(b, &mut pend, refill);
                    continue;
                }
                let charset: &[u8] = match *pstate {
                    PState::Dq => b"\"",
                    PState::Sq => b"'",
                    _ => b" >",
                };
                if self.advance(b, rlen, &mut pend, charset, refill) {
                    break;
                }
                *pstate = PState::Tag;
                let mut elem_end = false;
                let mut tok_end = pend;
                let delim = if pend < rlen { b[pend] } else { 0 };
                if delim == b'>' {
                    *pstate = PState::Elem;
                    if pend > 0 && b[pend - 1] == b'/' {
                        tok_end = pend - 1;
                        elem_end = true;
                    }
                    if self.flag_eend {
                        elem_end = true;
                    }
                }
                if pend < rlen {
                    self.increment(b, &mut pend, refill);
                }
                let val = String::from_utf8_lossy(&b[poff..tok_end])
                    .into_owned();
                self.xml_attrval(&val);
                if elem_end {
                    self.xml_elem_end(None);
                }
            } else if *pstate == PState::Tag {
                // Look for an attribute name.

                match self.ncur {
                    Resolved::Elem(ElementKind::Doctype) => {
                        if b[pend] == b'[' {
                            *pstate = PState::Elem;
                            self.increment(b, &mut pend, refill);
                            continue;
                        }
                        if b[pend] == b'"' || b[pend] == b'\'' {
                            *pstate = PState::Arg;
                            continue;
                        }
                    }
                    Resolved::Elem(ElementKind::Entity) => {
                        if b[pend] == b'"' || b[pend] == b'\'' {
                            *pstate = PState::Arg;
                            continue;
                        }
                    }
                    _ => {}
                }
                if self.advance(b, rlen, &mut pend, b" =>", refill) {
                    break;
                }
                let mut elem_end = false;
                let mut tok_end = pend;
                let delim = if pend < rlen { b[pend] } else { 0 };
                match delim {
                    b'>' => {
                        *pstate = PState::Elem;
                        if pend > 0 && b[pend - 1] == b'/' {
                            tok_end = pend - 1;
                            elem_end = true;
                        }
                        if self.flag_eend {
                            elem_end = true;
                        }
                    }
                    b'=' => {
                        *pstate = PState::Arg;
                    }
                    _ => {}
                }
                if pend < rlen {
                    self.increment(b, &mut pend, refill);
                }
                let name = String::from_utf8_lossy(&b[poff..tok_end])
                    .into_owned();
                self.xml_attrkey(&name);
                if elem_end {
                    self.xml_elem_end(None);
                }
            } else if b[poff] == b'<' {
                // Begin an opening or closing tag.

                if self.advance(b, rlen, &mut pend, b" >", refill) {
                    break;
                }
                if pend > poff + 3 && &b[poff..poff + 4] == b"<!--" {
                    // Skip a comment.

                    let start = pend - 2;
                    let cp = match find_subslice(&b[start..rlen], b"-->") {
                        Some(i) => start + i + 3,
                        None => {
                            if refill {
                                break;
                            }
                            rlen
                        }
                    };
                    while pend < cp {
                        self.increment(b, &mut pend, refill);
                    }
                    continue;
                }
                let mut elem_end = false;
                let mut tok_end = pend;
                let delim = if pend < rlen { b[pend] } else { 0 };
                if delim != b'>' {
                    *pstate = PState::Tag;
                } else if pend > 0 && b[pend - 1] == b'/' {
                    tok_end = pend - 1;
                    elem_end = true;
                }
                if pend < rlen {
                    self.increment(b, &mut pend, refill);
                }
                let mut noff = poff + 1;
                if noff < tok_end && b[noff] == b'/' {
                    noff += 1;
                    let name = String::from_utf8_lossy(&b[noff..tok_end])
                        .into_owned();
                    self.xml_elem_end(Some(&name));
                } else {
                    let name = String::from_utf8_lossy(&b[noff..tok_end])
                        .into_owned();
                    self.xml_elem_start(&name);
                    if *pstate == PState::Elem && self.flag_eend {
                        elem_end = true;
                    }
                    if elem_end {
                        self.xml_elem_end(Some(&name));
                    }
                }
            } else if matches!(self.ncur, Resolved::Elem(ElementKind::Doctype))
                && b[poff] == b']'
            {
                // Close a doctype internal subset.

                *pstate = PState::Tag;
                self.increment(b, &mut pend, refill);
            } else if b[poff] == b'&' {
                // Process an entity.

                if self.advance(b, rlen, &mut pend, b";", refill) {
                    break;
                }
                let tok_end = pend;
                if pend < rlen {
                    self.increment(b, &mut pend, refill);
                }
                let name = String::from_utf8_lossy(&b[poff + 1..tok_end])
                    .into_owned();
                self.xml_entity(&name);
            } else {
                // Process text up to the next tag, entity, or EOL.

                let charset: &[u8] = if matches!(self.ncur,
                    Resolved::Elem(ElementKind::Doctype))
                {
                    b"<&]\n"
                } else {
                    b"<&\n"
                };
                self.advance(b, rlen, &mut pend, charset, refill);
                let start = if self.nofill > 0 { pws } else { poff };
                let word = b[start..pend].to_vec();
                self.xml_text(&word);
                if pend < rlen && b[pend] == b'\n' {
                    self.close_text(false);
                }
            }
            pws = pend;
        }
        poff
    }

    /// Process a string of characters.
    ///
    /// If a text node is already open, append to it. Otherwise, create
    /// a new one as a child of the current node.
    fn xml_text(&mut self, word: &[u8]) {
        if word.is_empty() || self.del > 0 {
            return;
        }
        let word = String::from_utf8_lossy(word).into_owned();

        let cur = match self.cur {
            Some(id) => id,
            None => {
                self.error_msg(&format!(
                    "discarding text before document: {}", word));
                return;
            }
        };

        // Append to the current text node, if one is open.

        if self.doc[cur].is_text() {
            let spc = self.flag_spc;
            if let Some(t) = self.doc[cur].as_text_mut() {
                if t.len32() > 0 && spc {
                    t.push_char(' ');
                }
                t.push_slice(&word);
            }
            self.flag_line = false;
            self.flag_spc = false;
            return;
        }

        if self.doc.is_closed() && Some(cur) == self.doc.root_element() {
            self.warn_msg(&format!("text after end of document: {}", word));
        }

        // Create a new text node.

        let id = self.doc.append_child(cur, Node::new_text(""));
        if self.flag_line && self.doc[id].prev_sibling.is_some() {
            self.doc[id].line = true;
        }
        if self.flag_spc {
            self.doc[id].spc = true;
        }
        self.flag_line = false;
        self.flag_spc = false;

        /*
         * If this node follows an in-line macro without intervening
         * whitespace, keep the text in it as short as possible, and do
         * not keep it open.
         */

        let mut np = if self.doc[id].spc {
            None
        } else {
            self.doc[id].prev_sibling
        };
        while let Some(prev) = np {
            match self.doc[prev].class() {
                NodeClass::Void | NodeClass::Text | NodeClass::Block
                | NodeClass::NoFill => {
                    np = None;
                    break;
                }
                NodeClass::Trans => {
                    np = self.doc[prev].last_child;
                    continue;
                }
                NodeClass::Line | NodeClass::Encl => break,
            }
        }
        if np.is_some() {
            let i = word.find(|c: char| c.is_ascii_whitespace())
                .unwrap_or_else(|| word.len());
            if let Some(t) = self.doc[id].as_text_mut() {
                *t = word[..i].into();
            }
            if i == word.len() {
                return;
            }
            let rest = word[i..].trim_start_matches(
                |c: char| c.is_ascii_whitespace());
            if rest.is_empty() {
                self.flag_spc = true;
                return;
            }

            // Put any remaining text into a second node.

            let id = self.doc.append_child(cur, Node::new_text(rest));
            self.doc[id].spc = true;
            self.cur = Some(id);
        } else {
            if let Some(t) = self.doc[id].as_text_mut() {
                *t = word.as_str().into();
            }
            // The new node remains open for later close_text().
            self.cur = Some(id);
        }
    }

    /// Close out the text node and strip trailing whitespace, if one is
    /// open.
    fn close_text(&mut self, check_last_word: bool) {
        let n = match self.cur {
            Some(n) if self.doc[n].is_text() => n,
            _ => return,
        };
        self.cur = self.doc[n].parent;

        let mut s = match self.doc[n].text_str() {
            Some(t) => t.to_string(),
            None => return,
        };
        let stripped = s.trim_end_matches(
            |c: char| c.is_ascii_whitespace()).len();
        if stripped < s.len() {
            self.flag_spc = true;
            s.truncate(stripped);
        }

        if self.flag_spc || !check_last_word {
            self.write_text(n, &s);
            return;
        }

        /*
         * Find the beginning of the last word and delete whitespace
         * before it. The last word moves into its own node, for use
         * with .Pf.
         */

        let last_start = s.rfind(|c: char| c.is_ascii_whitespace())
            .map(|i| i + 1)
            .unwrap_or(0);
        if last_start == 0 {
            self.write_text(n, &s);
            return;
        }
        let last_word = s[last_start..].to_string();
        let head = s[..last_start].trim_end_matches(
            |c: char| c.is_ascii_whitespace());
        if head.is_empty() {
            self.write_text(n, &s);
            return;
        }
        let head = head.to_string();
        self.write_text(n, &head);
        if let Some(parent) = self.cur {
            let id = self.doc.append_child(
                parent, Node::new_text(last_word.as_str()));
            self.doc[id].spc = true;
        }
    }

    fn write_text(&mut self, n: NodeId, s: &str) {
        if let Some(t) = self.doc[n].as_text_mut() {
            *t = s.into();
        }
    }

    fn xml_entity(&mut self, name: &str) {
        if self.del > 0 {
            return;
        }
        if self.cur.is_none() {
            self.error_msg(&format!(
                "discarding entity before document: &{};", name));
            return;
        }
        self.close_text(false);
        let cur = match self.cur {
            Some(c) => c,
            None => return,
        };

        if self.doc.is_closed() && Some(cur) == self.doc.root_element() {
            self.warn_msg(&format!(
                "entity after end of document: &{};", name));
        }

        if let Some(roff) = meta::entity_escape(name) {
            // Create, append, and close out an entity node.
            let id = self.doc.append_child(cur, Node::new_escape(roff));
            self.entity_flags(id);
            return;
        }

        // Search the doctype subtree for a declaration of this entity.

        if let Some(dt) = self.doctype {
            let mut child = self.doc[dt].first_child;
            while let Some(nc) = child {
                child = self.doc[nc].next_sibling;
                if self.doc[nc].attr_str(AttrKey::Name) != Some(name) {
                    continue;
                }
                if let Some(path) = self.doc[nc].attr_str(AttrKey::System) {
                    let path = path.to_string();
                    self.parse_path(&path);
                    self.flag_line = false;
                    self.flag_spc = false;
                    return;
                }
                let def = match self.doc[nc].attr_str(AttrKey::Definition) {
                    Some(d) => d.to_string(),
                    None => continue,
                };
                self.parse_norefill(def.as_bytes());
                self.flag_line = false;
                self.flag_spc = false;
                return;
            }
        }

        if let Some(num) = name.strip_prefix('#') {
            let parsed = match num.strip_prefix('x')
                .or_else(|| num.strip_prefix('X'))
            {
                Some(hex) => u32::from_str_radix(hex, 16),
                None => num.parse::<u32>(),
            };
            if let Ok(cp) = parsed {
                if cp <= 0x10FFFF {
                    let roff = format!("\\[u{:04X}]", cp);
                    let id = self.doc.append_child(
                        cur, Node::new_escape(roff.as_str()));
                    self.entity_flags(id);
                    return;
                }
            }
        }
        self.error_msg(&format!("unknown entity &{};", name));
    }

    fn entity_flags(&mut self, id: NodeId) {
        if self.flag_line && self.doc[id].prev_sibling.is_some() {
            self.doc[id].line = true;
        }
        if self.flag_spc {
            self.doc[id].spc = true;
        }
        self.flag_line = false;
        self.flag_spc = false;
    }

    /// Begin an element.
    fn xml_elem_start(&mut self, name: &str) {
        /*
         * An ancestor is excluded from the tree; keep track of the
         * number of levels excluded.
         */
        if self.del > 0 {
            if !name.starts_with('!') && !name.starts_with('?') {
                self.del += 1;
            }
            return;
        }

        self.ncur = resolve_element(name);
        let kind = match self.ncur {
            Resolved::DeleteWarn => {
                self.warn_msg(&format!("skipping element <{}>", name));
                self.del = 1;
                return;
            }
            Resolved::Delete => {
                self.del = 1;
                return;
            }
            Resolved::Ignore => return,
            Resolved::Unknown => {
                if !name.starts_with('!') && !name.starts_with('?') {
                    self.error_msg(&format!("unknown element <{}>", name));
                }
                return;
            }
            Resolved::Elem(k) => k,
        };

        if self.doc.is_closed()
            && self.cur.map_or(false, |c| self.doc.is_root(c))
        {
            self.warn_msg(&format!(
                "element after end of document: <{}>", name));
        }

        match kind.class() {
            NodeClass::Line | NodeClass::Encl => self.close_text(true),
            _ => self.close_text(false),
        }

        let parent = self.cur;
        let id = if let Some(p0) = parent {
            self.doc.append_child(p0, Node::new_elem(kind))
        } else if kind == ElementKind::Doctype {
            // The doctype lives outside the element tree.
            self.doc.push_node(Node::new_elem(kind))
        } else {
            self.doc.append_child(
                Document::DOCUMENT_NODE_ID, Node::new_elem(kind))
        };
        if self.flag_line && parent.is_some()
            && self.doc[id].prev_sibling.is_some()
        {
            self.doc[id].line = true;
        }
        self.flag_line = false;

        /*
         * Some elements are self-closing. Nodes that begin a new macro
         * or request line or start by printing text always want
         * whitespace before themselves.
         */

        match kind {
            ElementKind::Doctype | ElementKind::Entity | ElementKind::Sbr
            | ElementKind::Void => {
                self.flag_eend = true;
            }
            _ => {}
        }
        match kind.class() {
            NodeClass::Line | NodeClass::Encl => {
                if self.flag_spc {
                    self.doc[id].spc = true;
                }
            }
            class => {
                if class == NodeClass::NoFill {
                    self.nofill += 1;
                }
                self.doc[id].spc = true;
            }
        }
        self.cur = Some(id);
        if kind == ElementKind::Doctype {
            if self.doctype.is_none() {
                self.doctype = Some(id);
            } else {
                self.error_msg("duplicate doctype");
            }
        }
    }

    fn xml_attrkey(&mut self, name: &str) {
        let kind = match self.ncur {
            Resolved::Elem(k) => k,
            _ => return,
        };
        if self.del > 0 || name.is_empty() {
            return;
        }
        let cur = match self.cur {
            Some(c) => c,
            None => return,
        };

        /*
         * Accept a bare identifier after the doctype or entity tag
         * name, stored under the synthetic NAME key.
         */

        let first = self.doc[cur].as_element()
            .map_or(false, |e| e.attrs.is_empty());
        let (key_name, value) = if first
            && (kind == ElementKind::Doctype || kind == ElementKind::Entity)
        {
            ("NAME", Some(name))
        } else {
            (name, None)
        };

        let key = match AttrKey::parse(key_name) {
            Some(k) => k,
            None => {
                self.flag_attr = false;
                return;
            }
        };
        let data = match value {
            Some(v) => AttrData::Raw(v.into()),
            None => AttrData::Unset,
        };
        self.flag_attr = value.is_none();
        if let Some(e) = self.doc[cur].as_element_mut() {
            e.attrs.push(Attr { key, value: data });
        }
        if kind == ElementKind::Entity && key == AttrKey::Name {
            self.xml_attrkey("DEFINITION");
        }
    }

    fn xml_attrval(&mut self, value: &str) {
        match self.ncur {
            Resolved::Elem(_) => {}
            _ => return,
        }
        if self.del > 0 || !self.flag_attr {
            return;
        }
        let cur = match self.cur {
            Some(c) => c,
            None => return,
        };
        if let Some(e) = self.doc[cur].as_element_mut() {
            if let Some(a) = e.attrs.last_mut() {
                a.value = AttrData::parse(value);
            }
        }
        self.flag_attr = false;
    }

    /// Roll up the parse tree.
    ///
    /// If we're at a text node, roll that one up first.
    fn xml_elem_end(&mut self, name: Option<&str>) {
        /*
         * An ancestor is excluded from the tree; keep track of the
         * number of levels excluded.
         */
        if self.del > 1 {
            self.del -= 1;
            return;
        }

        if self.del == 0 {
            self.close_text(false);
        }

        let n = self.cur;
        let res = match name {
            Some(nm) => resolve_element(nm),
            None => self.ncur,
        };

        match res {
            Resolved::DeleteWarn | Resolved::Delete => {
                if self.del > 0 {
                    self.del -= 1;
                }
            }
            Resolved::Ignore | Resolved::Unknown => {}
            Resolved::Elem(ElementKind::Include) => {
                if let Some(n) = n {
                    self.cur = self.doc[n].parent
                        .filter(|&p| p != Document::DOCUMENT_NODE_ID);
                    match self.doc[n].attr_str(AttrKey::Href) {
                        None => self.error_msg(
                            "<xi:include> element without href attribute"),
                        Some(href) => {
                            let href = href.to_string();
                            self.parse_path(&href);
                        }
                    }
                    self.doc.detach(n);
                    self.flag_line = false;
                    self.flag_spc = false;
                }
            }
            Resolved::Elem(kind) => {
                match kind {
                    ElementKind::Doctype | ElementKind::Sbr
                    | ElementKind::Void => {
                        self.flag_eend = false;
                    }
                    _ => {}
                }
                let open = match n {
                    Some(n) if self.doc[n].is_kind(kind) => n,
                    _ => {
                        self.warn_msg(&format!("element not open: </{}>",
                            name.unwrap_or_else(|| kind.name())));
                        return;
                    }
                };
                if kind.class() == NodeClass::NoFill {
                    self.nofill = self.nofill.saturating_sub(1);
                }

                /*
                 * Refrain from actually closing the document element.
                 * If no more content follows, no harm is done, but if
                 * some content still follows, simply processing it is
                 * obviously better than discarding it.
                 */

                let parent = self.doc[open].parent;
                if parent == Some(Document::DOCUMENT_NODE_ID)
                    && kind != ElementKind::Doctype
                {
                    self.doc.set_closed();
                } else {
                    self.cur = parent
                        .filter(|&p| p != Document::DOCUMENT_NODE_ID);
                    if let Some(c) = self.cur {
                        if let Some(k) = self.doc[c].kind() {
                            self.ncur = Resolved::Elem(k);
                        }
                    }
                }
                self.flag_line = false;
                self.flag_spc = false;

                // Include a file containing entity declarations.

                if kind == ElementKind::Entity
                    && self.doc[open].attr_str(AttrKey::Name) == Some("%")
                {
                    if let Some(path) =
                        self.doc[open].attr_str(AttrKey::System)
                    {
                        let path = path.to_string();
                        self.parse_path(&path);
                    }
                }
            }
        }
        debug_assert!(self.del == 0);
    }
}

fn find_subslice(hay: &[u8], needle: &[u8]) -> Option<usize> {
    hay.windows(needle.len()).position(|w| w == needle)
}
