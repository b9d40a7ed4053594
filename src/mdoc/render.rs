//! Per-kind dispatch of the mdoc(7) formatter.
//!
//! Each recognized element kind has a handler invoked in pre-order;
//! after descending into the children, a post-order tail closes
//! implicit blocks, displays, and section scopes. Handlers may consume
//! parts of the tree (titles, prologue material, synopsis pieces) by
//! unlinking them so the generic child walk does not see them again.

use std::io;
use std::io::Write;

use crate::dom::{
    AttrData, AttrKey, AttrVal, Document, NodeClass, NodeData, NodeId,
};

use super::{
    Formatter, LineState, ParaState,
    ARG_QUOTED, ARG_SINGLE, ARG_SPACE, ARG_UPPER,
};

use crate::dom::ElementKind as K;

/// Write the reorganized document tree as mdoc(7) source.
pub fn write_mdoc<W: Write>(doc: &mut Document, out: &mut W)
    -> io::Result<()>
{
    let root = match doc.root_element() {
        Some(r) => r,
        None => return Ok(()),
    };
    let mut f = Formatter::new(out);
    f.prologue(doc, root)?;
    f.node(doc, root)?;
    if f.linestate != LineState::New {
        f.write(b"\n")?;
    }
    Ok(())
}

impl<'a, W: Write> Formatter<'a, W> {
    /// Emit `.Dd`, `.Dt`, and `.Os` from the first three children the
    /// reorganizer placed at the root, and the classic NAME section if
    /// a title remains.
    fn prologue(&mut self, doc: &mut Document, root: NodeId)
        -> io::Result<()>
    {
        let date = doc[root].first_child;
        debug_assert!(date.map_or(false, |c| doc[c].is_kind(K::Date)));
        if let Some(date) = date {
            self.macro_nodeline(doc, "Dd", date, 0)?;
            doc.detach(date);
        }

        self.macro_open("Dt")?;
        let name = doc[root].first_child;
        debug_assert!(name.map_or(false, |c| doc[c].is_kind(K::RefEntryTitle)));
        if let Some(name) = name {
            self.macro_addnode(doc, name,
                ARG_SPACE | ARG_SINGLE | ARG_UPPER)?;
            doc.detach(name);
        }
        let vol = doc[root].first_child;
        debug_assert!(vol.map_or(false, |c| doc[c].is_kind(K::ManVolNum)));
        if let Some(vol) = vol {
            self.macro_addnode(doc, vol, ARG_SPACE | ARG_SINGLE)?;
            doc.detach(vol);
        }

        self.macro_line("Os")?;

        let title = doc[root].first_child
            .filter(|&t| doc[t].is_kind(K::Title));
        if let Some(title) = title {
            self.macro_line("Sh NAME")?;
            if let Some(name) = name {
                self.macro_nodeline(doc, "Nm", name, ARG_SINGLE)?;
            }
            self.macro_nodeline(doc, "Nd", title, 0)?;
            doc.detach(title);
        }
        self.parastate = ParaState::Have;
        Ok(())
    }

    /// Print a parsed node and all its descendants.
    pub(super) fn node(&mut self, doc: &mut Document, id: NodeId)
        -> io::Result<()>
    {
        if doc[id].line()
            && (self.nofill > 0 || (!self.arg && !self.impl_open))
        {
            self.macro_close()?;
        }

        let was_impl = self.impl_open;
        self.nospc = !doc[id].spc();

        let kind = match &doc[id].data {
            NodeData::Document => return Ok(()),
            NodeData::Text(_) | NodeData::Escape(_) => None,
            NodeData::Elem(e) => Some(e.kind),
        };

        match kind {
            None => self.node_text(doc, id)?,
            Some(k) => match k {
                K::Arg => self.arg_elem(doc, id)?,
                K::Author => self.author(doc, id)?,
                K::AuthorGroup => self.macro_line("An -split")?,
                K::BlockQuote => {
                    self.parastate = ParaState::Have;
                    self.macro_line("Bd -ragged -offset indent")?;
                    self.parastate = ParaState::Have;
                }
                K::CiteRefEntry => self.citerefentry(doc, id)?,
                K::CiteTitle => self.macro_open("%T")?,
                K::Command => self.macro_open("Nm")?,
                K::Constant => self.macro_open("Dv")?,
                K::Copyright => {
                    self.print_text("Copyright", ARG_SPACE)?;
                    self.write(b" \\(co")?;
                }
                K::Editor => {
                    self.print_text("editor:", ARG_SPACE)?;
                    self.author(doc, id)?;
                }
                K::Email => {
                    if was_impl {
                        self.macro_open("Ao Mt")?;
                    } else {
                        self.macro_open("Aq Mt")?;
                        self.impl_open = true;
                    }
                }
                K::Emphasis | K::FirstTerm | K::GlossTerm => {
                    if let Some(nc) = doc[id].first_child {
                        if doc[nc].class() < NodeClass::Line {
                            self.macro_open("Em")?;
                        }
                    }
                    if k == K::GlossTerm {
                        self.parastate = ParaState::Have;
                    }
                }
                K::Envar => self.macro_open("Ev")?,
                K::ErrorName => self.macro_open("Er")?,
                K::Filename => self.macro_open("Pa")?,
                K::Footnote => {
                    self.macro_line("Bo")?;
                    self.parastate = ParaState::Have;
                }
                K::Function => self.macro_open("Fn")?,
                K::FuncPrototype => self.funcprototype(doc, id)?,
                K::FuncSynopsisInfo => self.macro_open("Fd")?,
                K::ImageData => self.imagedata(doc, id)?,
                K::InformalEquation => {
                    self.parastate = ParaState::Have;
                    self.macro_line("Bd -ragged -offset indent")?;
                    self.parastate = ParaState::Have;
                    self.macro_line("EQ")?;
                }
                K::InlineEquation => self.macro_line("EQ")?,
                K::ItemizedList | K::OrderedList => self.list(doc, id)?,
                K::Group => self.group(doc, id)?,
                K::KeySym | K::ProductName => self.macro_open("Sy")?,
                K::Link => self.link(doc, id)?,
                K::Literal => {
                    if doc[id].parent
                        .map_or(false, |p| doc[p].is_kind(K::Quote))
                    {
                        self.macro_open("Li")?;
                    } else if was_impl {
                        self.macro_open("So Li")?;
                    } else {
                        self.macro_open("Ql")?;
                        self.impl_open = true;
                    }
                }
                K::LiteralLayout => {
                    self.macro_close()?;
                    self.parastate = ParaState::Have;
                    let style = if doc[id].attr_val(AttrKey::Class)
                        == Some(AttrVal::Monospaced)
                    {
                        "-literal"
                    } else {
                        "-unfilled"
                    };
                    self.macro_argline("Bd", style)?;
                    self.parastate = ParaState::Have;
                }
                K::Markup => self.macro_open("Ic")?,
                K::MmlMfenced => self.math_fenced(doc, id)?,
                K::MmlMrow | K::MmlMi | K::MmlMn | K::MmlMo => {
                    if doc[id].first_child.is_some() {
                        self.write(b" { ")?;
                    }
                }
                K::MmlMfrac | K::MmlMsub | K::MmlMsup =>
                    self.math_infix(doc, id)?,
                K::Olink => self.olink(doc, id)?,
                K::Option => {
                    if let Some(nc) = doc[id].first_child {
                        if doc[nc].class() < NodeClass::Line {
                            self.macro_open("Fl")?;
                        }
                    }
                }
                K::Para => {
                    if self.parastate == ParaState::Mid {
                        self.parastate = ParaState::Want;
                    }
                }
                K::ParamDef | K::Parameter => {
                    // More often, these appear inside a funcprototype.
                    self.macro_open("Fa")?;
                    self.macro_addnode(doc, id, ARG_SPACE | ARG_SINGLE)?;
                    doc.remove_children(id);
                }
                K::Quote => {
                    if self.sole_filename_child(doc, id) {
                        if doc[id].spc() {
                            if let Some(nc) = doc[id].first_child {
                                doc[nc].spc = true;
                            }
                        }
                    } else if was_impl {
                        self.macro_open("Do")?;
                    } else {
                        self.macro_open("Dq")?;
                        self.impl_open = true;
                    }
                }
                K::ProgramListing | K::Screen | K::Synopsis => {
                    self.parastate = ParaState::Have;
                    self.macro_line("Bd -literal")?;
                    self.parastate = ParaState::Have;
                }
                K::SystemItem => self.systemitem(doc, id)?,
                K::RefName => {
                    // More often, these appear inside a refnamediv.
                    self.macro_open("Nm")?;
                }
                K::RefNameDiv => self.refnamediv(doc, id)?,
                K::RefPurpose => self.macro_open("Nd")?,
                K::RefSynopsisDiv => self.refsynopsisdiv(doc, id)?,
                K::Section | K::SimpleSect | K::Appendix | K::Note =>
                    self.section(doc, id)?,
                K::Replaceable => self.macro_open("Ar")?,
                K::Sbr => {
                    if self.parastate == ParaState::Mid {
                        self.macro_line("br")?;
                    }
                }
                K::Subscript => {
                    if self.linestate == LineState::Macro {
                        self.macro_addarg("_", 0)?;
                    } else {
                        self.print_text("_", 0)?;
                    }
                    if let Some(nc) = doc[id].first_child {
                        doc[nc].line = false;
                        doc[nc].spc = false;
                    }
                }
                K::Superscript => {
                    self.write(b"\\(ha")?;
                    if let Some(nc) = doc[id].first_child {
                        doc[nc].line = false;
                        doc[nc].spc = false;
                    }
                }
                K::Tgroup => self.tgroup(doc, id)?,
                K::Title | K::Subtitle => {
                    if self.parastate == ParaState::Mid {
                        self.parastate = ParaState::Want;
                    }
                    self.macro_nodeline(doc, "Sy", id, 0)?;
                    doc.remove_children(id);
                }
                K::Type => self.macro_open("Vt")?,
                K::VariableList => self.variablelist(doc, id)?,
                K::VarName => self.macro_open("Va")?,
                K::Void => self.print_text("void", ARG_SPACE)?,
                K::Xref => self.xref(doc, id)?,
                K::Caution | K::LegalNotice | K::Preface | K::Tip
                | K::Warning => {
                    unreachable!("admonition left behind by the reorganizer")
                }
                _ => {}
            }
        }

        if doc[id].class() == NodeClass::NoFill {
            self.nofill += 1;
        }

        let mut next = doc[id].first_child;
        while let Some(nc) = next {
            self.node(doc, nc)?;
            next = doc[nc].next_sibling;
        }

        match kind {
            Some(K::Email) => {
                if was_impl {
                    self.nospc = false;
                    self.macro_open("Ac")?;
                } else {
                    self.impl_open = false;
                }
            }
            None | Some(K::Term) => {
                // Accept more arguments to the previous macro.
                return Ok(());
            }
            Some(K::Footnote) => {
                self.parastate = ParaState::Have;
                self.macro_line("Bc")?;
            }
            Some(K::GlossTerm) => {
                self.parastate = ParaState::Have;
            }
            Some(K::InformalEquation) => {
                self.macro_line("EN")?;
                self.macro_line("Ed")?;
            }
            Some(K::InlineEquation) => {
                self.macro_line("EN")?;
            }
            Some(K::Literal) => {
                if doc[id].parent
                    .map_or(false, |p| doc[p].is_kind(K::Quote))
                {
                    // nothing
                } else if was_impl {
                    self.nospc = false;
                    self.macro_open("Sc")?;
                } else {
                    self.impl_open = false;
                }
            }
            Some(K::Member) => {
                let nn = doc[id].next_sibling
                    .filter(|&nn| doc[nn].is_kind(K::Member));
                match self.linestate {
                    LineState::Text => {
                        if nn.is_some() {
                            self.print_text(",", 0)?;
                        }
                    }
                    LineState::Macro => {
                        if nn.is_some() {
                            self.macro_addarg(",", ARG_SPACE)?;
                        }
                        self.macro_close()?;
                    }
                    LineState::New => {}
                }
            }
            Some(K::MmlMrow) | Some(K::MmlMi) | Some(K::MmlMn)
            | Some(K::MmlMo) => {
                if doc[id].first_child.is_some() {
                    self.write(b" } ")?;
                }
            }
            Some(K::Para) => {
                if self.parastate == ParaState::Mid {
                    self.parastate = ParaState::Want;
                }
            }
            Some(K::Quote) => {
                if self.sole_filename_child(doc, id) {
                    // nothing
                } else if was_impl {
                    self.nospc = false;
                    self.macro_open("Dc")?;
                } else {
                    self.impl_open = false;
                }
            }
            Some(K::Section) | Some(K::SimpleSect) | Some(K::Appendix)
            | Some(K::Note) => {
                if !doc.is_root(id) {
                    self.level -= 1;
                }
            }
            Some(K::BlockQuote) | Some(K::LiteralLayout)
            | Some(K::ProgramListing) | Some(K::Screen)
            | Some(K::Synopsis) => {
                self.parastate = ParaState::Have;
                self.macro_line("Ed")?;
                self.parastate = ParaState::Want;
            }
            Some(K::Title) | Some(K::Subtitle) => {
                self.parastate = ParaState::Want;
            }
            Some(K::Year) => {
                if let Some(nn) = doc[id].next_sibling {
                    if doc[nn].is_kind(K::Year)
                        && self.linestate == LineState::Text
                    {
                        self.print_text(",", 0)?;
                        doc[nn].spc = true;
                        if let Some(nc) = doc[nn].first_child {
                            doc[nc].spc = true;
                        }
                    }
                }
            }
            _ => {}
        }
        self.arg = false;
        if doc[id].class() == NodeClass::NoFill {
            self.nofill -= 1;
        }
        Ok(())
    }

    fn sole_filename_child(&self, doc: &Document, id: NodeId) -> bool {
        match doc[id].first_child {
            Some(nc) => doc[nc].is_kind(K::Filename)
                && doc[nc].next_sibling.is_none(),
            None => false,
        }
    }

    /// The text emission contract: fit character data into whatever
    /// line state the surrounding macros left behind.
    fn node_text(&mut self, doc: &mut Document, id: NodeId)
        -> io::Result<()>
    {
        self.para_check()?;
        let text = match doc[id].text_str() {
            Some(t) => t.to_string(),
            None => return Ok(()),
        };
        let bytes = text.as_bytes();
        let mut cp = 0usize;
        let mut accept_arg = self.arg;

        /*
         * A macro line that accepts no further arguments can still
         * swallow closing punctuation; anything beyond that needs an
         * .Ns to attach without intervening space.
         */

        if self.linestate == LineState::Macro && !accept_arg
            && !doc[id].spc()
        {
            loop {
                if cp == bytes.len() {
                    return Ok(());
                }
                if !b"!),.:;?]".contains(&bytes[cp]) {
                    break;
                }
                self.write(&[b' ', bytes[cp]])?;
                cp += 1;
            }
            if bytes[cp].is_ascii_whitespace() {
                while cp < bytes.len() && bytes[cp].is_ascii_whitespace() {
                    cp += 1;
                }
                doc[id].spc = true;
            } else {
                self.nospc = false;
                self.child = true;
                self.macro_open("Ns")?;
                self.arg = false;
                self.child = true;
                accept_arg = true;
            }
        }
        if self.linestate == LineState::Macro && self.nofill == 0
            && !accept_arg && !self.impl_open
        {
            self.macro_close()?;
        }

        /*
         * Text preceding a macro without intervening whitespace
         * requires a .Pf macro. Set the spacing flag to avoid a
         * redundant .Ns macro.
         */

        if self.nofill > 0 || self.linestate != LineState::Macro {
            if let Some(nn) = doc[id].next_sibling {
                if !doc[nn].spc() {
                    match doc[nn].class() {
                        NodeClass::Line | NodeClass::Encl => {
                            self.macro_open("Pf")?;
                            accept_arg = true;
                            self.child = true;
                            doc[nn].spc = true;
                        }
                        _ => {}
                    }
                }
            }
        }

        match self.linestate {
            LineState::New => {}
            LineState::Text => {
                if doc[id].spc() {
                    if doc[id].line()
                        && doc[id].class() == NodeClass::Text
                    {
                        self.macro_close()?;
                    } else {
                        self.write(b" ")?;
                    }
                }
            }
            LineState::Macro => {
                if !accept_arg {
                    if self.nofill > 0 {
                        self.nospc = false;
                        self.child = true;
                        self.macro_open("No ")?;
                        self.arg = false;
                        self.child = true;
                    } else {
                        self.macro_close()?;
                    }
                } else if doc[id].spc() || !self.arg
                    || doc[id].prev_sibling.map_or(true,
                        |p| doc[p].class() != NodeClass::Text)
                {
                    self.write(b" ")?;
                }
            }
        }

        if let NodeData::Escape(_) = doc[id].data {
            self.write(text.as_bytes())?;
            if self.linestate == LineState::New {
                self.linestate = LineState::Text;
            }
            return Ok(());
        }

        /*
         * Remove the prefix '-' from <option> elements because the
         * arguments of .Fl macros do not need it.
         */

        if doc[id].parent.map_or(false, |p| doc[p].is_kind(K::Option))
            && bytes.get(cp) == Some(&b'-')
        {
            cp += 1;
        }

        let rest = &text[cp..];
        if self.linestate == LineState::Macro {
            self.macro_addarg(rest, 0)?;
        } else {
            self.print_text(rest, 0)?;
        }
        Ok(())
    }

    fn imagedata(&mut self, doc: &mut Document, id: NodeId)
        -> io::Result<()>
    {
        let fileref = doc[id].attr_str(AttrKey::FileRef)
            .or_else(|| doc[id].attr_str(AttrKey::EntityRef))
            .map(str::to_string);
        if let Some(cp) = fileref {
            self.print_text("[image:", ARG_SPACE)?;
            self.print_text(&cp, ARG_SPACE)?;
            self.print_text("]", 0)?;
        } else {
            self.print_text("[image]", ARG_SPACE)?;
        }
        Ok(())
    }

    fn refnamediv(&mut self, doc: &mut Document, id: NodeId)
        -> io::Result<()>
    {
        self.parastate = ParaState::Have;
        self.macro_line("Sh NAME")?;
        self.parastate = ParaState::Have;
        let mut comma = false;
        let mut next = doc[id].first_child;
        while let Some(nc) = next {
            next = doc[nc].next_sibling;
            if !doc[nc].is_kind(K::RefName) {
                continue;
            }
            if comma {
                self.macro_addarg(",", ARG_SPACE)?;
            }
            self.macro_open("Nm")?;
            self.macro_addnode(doc, nc, ARG_SPACE)?;
            doc.detach(nc);
            comma = true;
        }
        self.macro_close()
    }

    /// If the SYNOPSIS division has a superfluous title, kill it.
    fn refsynopsisdiv(&mut self, doc: &mut Document, id: NodeId)
        -> io::Result<()>
    {
        let mut next = doc[id].first_child;
        while let Some(nc) = next {
            next = doc[nc].next_sibling;
            if doc[nc].is_kind(K::Title) {
                doc.detach(nc);
            }
        }
        self.parastate = ParaState::Have;
        self.macro_line("Sh SYNOPSIS")?;
        self.parastate = ParaState::Have;
        Ok(())
    }

    /// Start a hopefully-named section heading, `.Sh`, `.Ss`, or `.Sy`
    /// by nesting level.
    fn section(&mut self, doc: &mut Document, id: NodeId)
        -> io::Result<()>
    {
        if doc.is_root(id) {
            return Ok(());
        }

        self.level += 1;
        let mut level = self.level;
        let mut flags = ARG_SPACE;
        match doc[id].kind() {
            Some(K::Section) | Some(K::Appendix) => {
                if level == 1 {
                    flags |= ARG_UPPER;
                }
            }
            Some(K::SimpleSect) => {
                if level < 2 {
                    level = 2;
                }
            }
            Some(K::Note) => {
                if level < 3 {
                    level = 3;
                }
            }
            _ => unreachable!("section dispatch on non-section"),
        }

        let title = {
            let mut found = None;
            for nc in doc.children(id) {
                if doc[nc].is_kind(K::Title) {
                    found = Some(nc);
                    break;
                }
            }
            found
        };

        match level {
            1 => {
                self.macro_close()?;
                self.parastate = ParaState::Have;
                self.macro_open("Sh")?;
            }
            2 => {
                self.macro_close()?;
                self.parastate = ParaState::Have;
                self.macro_open("Ss")?;
            }
            _ => {
                if self.parastate == ParaState::Mid {
                    self.parastate = ParaState::Want;
                }
                self.macro_open("Sy")?;
            }
        }
        if let Some(title) = title {
            self.macro_addnode(doc, title, flags)?;
        }
        self.macro_close()?;

        /*
         * DocBook has no equivalent for -split mode, so just switch
         * the default in the AUTHORS section.
         */

        if let Some(title) = title {
            if level == 1 {
                let is_authors = doc[title].first_child.map_or(false, |ncc| {
                    doc[ncc].is_text() && doc[ncc].text_str().map_or(false,
                        |t| {
                            let t: &str = t;
                            t.eq_ignore_ascii_case("AUTHORS")
                        })
                });
                if is_authors {
                    self.macro_line("An -nosplit")?;
                }
            }
            doc.detach(title);
        }
        self.parastate = if level > 2 {
            ParaState::Want
        } else {
            ParaState::Have
        };
        Ok(())
    }

    /// Start a reference, extracting the title and volume.
    fn citerefentry(&mut self, doc: &mut Document, id: NodeId)
        -> io::Result<()>
    {
        let mut title = None;
        let mut manvol = None;
        for nc in doc.children(id) {
            if doc[nc].is_kind(K::ManVolNum) {
                manvol = Some(nc);
            } else if doc[nc].is_kind(K::RefEntryTitle) {
                title = Some(nc);
            }
        }
        self.macro_open("Xr")?;
        match title {
            None => self.macro_addarg("unknown", ARG_SPACE)?,
            Some(t) => self.macro_addnode(doc, t,
                ARG_SPACE | ARG_SINGLE)?,
        }
        match manvol {
            None => self.macro_addarg("1", ARG_SPACE)?,
            Some(m) => self.macro_addnode(doc, m,
                ARG_SPACE | ARG_SINGLE)?,
        }
        doc.remove_children(id);
        Ok(())
    }

    /// An mfenced node can have arbitrary open and closing tokens,
    /// which default to parentheses, and >1 arguments are separated by
    /// commas.
    fn math_fenced(&mut self, doc: &mut Document, id: NodeId)
        -> io::Result<()>
    {
        let open = doc[id].attr_str(AttrKey::Open)
            .unwrap_or("(").to_string();
        let close = doc[id].attr_str(AttrKey::Close)
            .unwrap_or(")").to_string();

        write!(self.out, "left {} ", open)?;
        let mut nc = doc[id].first_child;
        if let Some(c) = nc {
            self.node(doc, c)?;
            nc = doc[c].next_sibling;
        }
        while let Some(c) = nc {
            self.write(b",")?;
            self.node(doc, c)?;
            nc = doc[c].next_sibling;
        }
        write!(self.out, "right {} ", close)?;
        doc.remove_children(id);
        Ok(())
    }

    /// Fraction, subscript, and superscript have infix eqn(7) syntax,
    /// so break up the first and second child with the eqn word.
    fn math_infix(&mut self, doc: &mut Document, id: NodeId)
        -> io::Result<()>
    {
        let first = doc[id].first_child;
        if let Some(c) = first {
            self.node(doc, c)?;
        }
        match doc[id].kind() {
            Some(K::MmlMsup) => self.write(b" sup ")?,
            Some(K::MmlMfrac) => self.write(b" over ")?,
            Some(K::MmlMsub) => self.write(b" sub ")?,
            _ => {}
        }
        if let Some(second) = first.and_then(|c| doc[c].next_sibling) {
            self.node(doc, second)?;
        }
        doc.remove_children(id);
        Ok(())
    }

    fn funcprototype(&mut self, doc: &mut Document, id: NodeId)
        -> io::Result<()>
    {
        /*
         * Extract the funcdef child and ignore any void child. Leave
         * other children in place, to be treated as parameters.
         */

        let mut fdef = None;
        let mut next = doc[id].first_child;
        while let Some(nc) = next {
            next = doc[nc].next_sibling;
            match doc[nc].kind() {
                Some(K::FuncDef) => {
                    if fdef.is_none() {
                        doc.detach(nc);
                        fdef = Some(nc);
                    }
                }
                Some(K::Void) => doc.detach(nc),
                _ => {}
            }
        }

        /*
         * If no children are left, the function takes no arguments;
         * use .Fn. Otherwise, use .Fo.
         */

        let nc = doc[id].first_child;
        if let Some(fdef) = fdef {
            let ftype = doc[fdef].first_child
                .filter(|&t| doc[t].is_text());
            if let Some(ftype) = ftype {
                let s = match doc[ftype].text_str() {
                    Some(t) => t.to_string(),
                    None => String::new(),
                };
                self.macro_argline("Ft", &s)?;
                doc.detach(ftype);
            }
            if nc.is_none() {
                self.macro_open("Fn")?;
                self.macro_addnode(doc, fdef, ARG_SPACE | ARG_SINGLE)?;
                self.macro_addarg("void", ARG_SPACE)?;
                self.macro_close()?;
            } else {
                self.macro_nodeline(doc, "Fo", fdef, ARG_SINGLE)?;
            }
        } else if nc.is_none() {
            self.macro_line("Fn UNKNOWN void")?;
        } else {
            self.macro_line("Fo UNKNOWN")?;
        }

        if nc.is_none() {
            return Ok(());
        }

        let mut nc = nc;
        while let Some(param) = nc {
            if let Some(fps) = doc.take_first(param, K::FuncParams) {
                self.macro_open("Fa \"")?;
                self.macro_addnode(doc, param, ARG_QUOTED)?;
                self.macro_addarg("(", ARG_QUOTED)?;
                self.macro_addnode(doc, fps, ARG_QUOTED)?;
                self.macro_addarg(")", ARG_QUOTED)?;
                self.write(b"\"")?;
                self.macro_close()?;
            } else {
                self.macro_nodeline(doc, "Fa", param, ARG_SINGLE)?;
            }
            doc.detach(param);
            nc = doc[id].first_child;
        }
        self.macro_line("Fc")
    }

    /// Text children become `.Ar` arguments; non-text children are
    /// re-sent into the printer. Handles optionality and repetition.
    fn arg_elem(&mut self, doc: &mut Document, id: NodeId)
        -> io::Result<()>
    {
        let (isop, isrep) = arg_attrs(doc, id);
        let mut was_impl = false;
        if isop {
            if self.impl_open {
                was_impl = true;
                self.macro_open("Oo")?;
            } else {
                self.macro_open("Op")?;
                self.impl_open = true;
            }
        }
        let mut nc = doc[id].first_child;
        while let Some(c) = nc {
            if doc[c].is_text() {
                self.macro_open("Ar")?;
            }
            self.node(doc, c)?;
            nc = doc[c].next_sibling;
        }
        if isrep && self.linestate == LineState::Macro {
            self.macro_addarg("...", ARG_SPACE)?;
        }
        if isop {
            if was_impl {
                self.macro_open("Oc")?;
            } else {
                self.impl_open = false;
            }
        }
        doc.remove_children(id);
        Ok(())
    }

    /// Like `arg_elem`, but children are separated by `|` and
    /// repetition uses curly braces.
    fn group(&mut self, doc: &mut Document, id: NodeId) -> io::Result<()> {
        let (isop, isrep) = arg_attrs(doc, id);
        let mut was_impl = false;
        if isop {
            if self.impl_open {
                was_impl = true;
                self.macro_open("Oo")?;
            } else {
                self.macro_open("Op")?;
                self.impl_open = true;
            }
        } else if isrep {
            if self.impl_open {
                was_impl = true;
                self.macro_open("Bro")?;
            } else {
                self.macro_open("Brq")?;
                self.impl_open = true;
            }
        }
        let mut bar = false;
        let mut nc = doc[id].first_child;
        while let Some(c) = nc {
            if bar && self.linestate == LineState::Macro {
                self.macro_addarg("|", ARG_SPACE)?;
            }
            self.node(doc, c)?;
            bar = true;
            nc = doc[c].next_sibling;
        }
        if isop {
            if was_impl {
                self.macro_open("Oc")?;
            } else {
                self.impl_open = false;
            }
        } else if isrep {
            if was_impl {
                self.macro_open("Brc")?;
            } else {
                self.impl_open = false;
            }
        }
        if isrep && self.linestate == LineState::Macro {
            self.macro_addarg("...", ARG_SPACE)?;
        }
        doc.remove_children(id);
        Ok(())
    }

    fn systemitem(&mut self, doc: &mut Document, id: NodeId)
        -> io::Result<()>
    {
        match doc[id].attr_val(AttrKey::Class) {
            Some(AttrVal::IpAddress) => {}
            Some(AttrVal::SystemName) => self.macro_open("Pa")?,
            _ => self.macro_open("Sy")?,
        }
        Ok(())
    }

    fn author(&mut self, doc: &mut Document, id: NodeId) -> io::Result<()> {
        /*
         * Print contrib children up front, before the .An scope, and
         * figure out whether we have the name of a person.
         */

        let mut have_contrib = false;
        let mut have_name = false;
        let mut next = doc[id].first_child;
        while let Some(nc) = next {
            next = doc[nc].next_sibling;
            match doc[nc].kind() {
                Some(K::Contrib) => {
                    if have_contrib {
                        self.print_text(",", 0)?;
                    }
                    self.print_textnode(doc, nc)?;
                    doc.detach(nc);
                    have_contrib = true;
                }
                Some(K::PersonName) => {
                    have_name = true;
                }
                _ => {}
            }
        }
        if doc[id].first_child.is_none() {
            return Ok(());
        }

        if have_contrib {
            self.print_text(":", 0)?;
        }

        /*
         * If we have a name, print it in the .An scope and leave all
         * other content for child handlers, to print after the scope.
         * Otherwise, print everything in the scope.
         */

        self.macro_open("An")?;
        let mut next = doc[id].first_child;
        while let Some(nc) = next {
            next = doc[nc].next_sibling;
            if doc[nc].is_kind(K::PersonName) || !have_name {
                self.macro_addnode(doc, nc, ARG_SPACE)?;
                doc.detach(nc);
            }
        }

        // If there is an email address, print it on the same line.

        if let Some(email) = doc.find_first(id, K::Email) {
            self.child = true;
            self.macro_open("Aq Mt")?;
            self.macro_addnode(doc, email, ARG_SPACE)?;
            doc.detach(email);
        }

        /*
         * If there are still unprinted children, end the scope with a
         * comma. Otherwise, leave the scope open in case a text node
         * follows that starts with closing punctuation.
         */

        if doc[id].first_child.is_some() {
            self.macro_addarg(",", ARG_SPACE)?;
            self.macro_close()?;
        }
        Ok(())
    }

    fn xref(&mut self, doc: &mut Document, id: NodeId) -> io::Result<()> {
        let linkend = doc[id].attr_str(AttrKey::LinkEnd)
            .map(str::to_string);
        if let Some(linkend) = linkend {
            self.macro_open("Sx")?;
            self.macro_addarg(&linkend, ARG_SPACE)?;
        }
        Ok(())
    }

    fn link(&mut self, doc: &mut Document, id: NodeId) -> io::Result<()> {
        let linkend = doc[id].attr_str(AttrKey::LinkEnd)
            .map(str::to_string);
        if let Some(uri) = linkend {
            let mut text: Option<String> = None;
            if doc[id].first_child.is_some() {
                let mut nc = doc[id].first_child;
                while let Some(c) = nc {
                    self.node(doc, c)?;
                    nc = doc[c].next_sibling;
                }
                text = Some(String::new());
            } else if let Some(endterm) = doc[id]
                .attr_str(AttrKey::EndTerm).map(str::to_string)
            {
                if self.linestate == LineState::Macro && self.arg {
                    self.macro_addarg(&endterm, ARG_SPACE)?;
                } else {
                    self.print_text(&endterm, ARG_SPACE)?;
                }
                text = Some(endterm);
            }
            if text.is_some() {
                if self.impl_open {
                    self.macro_open("Po")?;
                } else {
                    self.macro_open("Pq")?;
                    self.child = true;
                }
            }
            self.macro_open("Sx")?;
            self.macro_addarg(&uri, ARG_SPACE)?;
            if text.is_some() && self.impl_open {
                self.macro_open("Pc")?;
            }
            doc.remove_children(id);
            return Ok(());
        }
        let uri = doc[id].attr_str(AttrKey::XlinkHref)
            .or_else(|| doc[id].attr_str(AttrKey::Url))
            .map(str::to_string);
        if let Some(uri) = uri {
            self.macro_open("Lk")?;
            self.macro_addarg(&uri, ARG_SPACE | ARG_SINGLE)?;
            if doc[id].first_child.is_some() {
                self.macro_addnode(doc, id, ARG_SPACE | ARG_SINGLE)?;
            }
            doc.remove_children(id);
        }
        Ok(())
    }

    fn olink(&mut self, doc: &mut Document, id: NodeId) -> io::Result<()> {
        let mut uri = doc[id].attr_str(AttrKey::TargetDoc)
            .map(str::to_string);
        let mut ptr = doc[id].attr_str(AttrKey::TargetPtr)
            .map(str::to_string);
        let mut local = doc[id].attr_str(AttrKey::LocalInfo)
            .map(str::to_string);
        if uri.is_none() {
            uri = ptr.take();
        }
        if uri.is_none() {
            uri = local.take();
        }
        let uri = match uri {
            Some(u) => u,
            None => return Ok(()),
        };

        self.macro_open("Lk")?;
        self.macro_addarg(&uri, ARG_SPACE | ARG_SINGLE)?;
        self.macro_addnode(doc, id, ARG_SPACE | ARG_SINGLE)?;
        if ptr.is_some() || local.is_some() {
            self.macro_close()?;
            self.macro_open("Pq")?;
            if let Some(ptr) = &ptr {
                self.macro_addarg(ptr, ARG_SPACE)?;
            }
            if let Some(local) = &local {
                self.macro_addarg(local, ARG_SPACE)?;
            }
        }
        doc.remove_children(id);
        Ok(())
    }

    /// Multiple term children within one entry are comma-separated as
    /// list headers on the `.It` line.
    fn varlistentry(&mut self, doc: &mut Document, id: NodeId)
        -> io::Result<()>
    {
        self.macro_open("It")?;
        self.parastate = ParaState::Have;
        self.impl_open = true;
        let mut comma: Option<u32> = None;
        let mut next = doc[id].first_child;
        while let Some(nc) = next {
            next = doc[nc].next_sibling;
            if !doc[nc].is_kind(K::Term) && !doc[nc].is_kind(K::GlossTerm) {
                continue;
            }
            if let Some(flags) = comma {
                match self.linestate {
                    LineState::New => {}
                    LineState::Text => self.print_text(",", 0)?,
                    LineState::Macro => self.macro_addarg(",", flags)?,
                }
            }
            self.parastate = ParaState::Have;
            comma = Some(match doc[nc].first_child {
                None => 0,
                Some(ncc) if doc[ncc].class() == NodeClass::Text => 0,
                Some(_) => ARG_SPACE,
            });
            self.node(doc, nc)?;
            doc.detach(nc);
        }
        self.macro_close()?;
        self.parastate = ParaState::Have;
        while let Some(nc) = doc[id].first_child {
            self.node(doc, nc)?;
            doc.detach(nc);
        }
        self.macro_close()?;
        self.parastate = ParaState::Have;
        Ok(())
    }

    /// Emit list titles as `.Sy` lines before the list itself.
    fn list_title(&mut self, doc: &mut Document, id: NodeId)
        -> io::Result<()>
    {
        let mut next = doc[id].first_child;
        while let Some(nc) = next {
            next = doc[nc].next_sibling;
            if doc[nc].is_kind(K::Title) {
                if self.parastate == ParaState::Mid {
                    self.parastate = ParaState::Want;
                }
                self.macro_nodeline(doc, "Sy", nc, 0)?;
                doc.detach(nc);
            }
        }
        Ok(())
    }

    fn row(&mut self, doc: &mut Document, id: NodeId) -> io::Result<()> {
        self.macro_line("Bl -dash -compact")?;
        let mut next = doc[id].first_child;
        while let Some(nc) = next {
            self.macro_line("It")?;
            self.node(doc, nc)?;
            next = doc[nc].next_sibling;
        }
        self.macro_line("El")?;
        doc.detach(id);
        Ok(())
    }

    fn tgroup1(&mut self, doc: &mut Document, id: NodeId)
        -> io::Result<()>
    {
        self.macro_line("Bl -bullet -compact")?;
        while let Some(nc) = doc.find_first(id, K::Entry) {
            self.macro_line("It")?;
            self.parastate = ParaState::Have;
            self.node(doc, nc)?;
            self.parastate = ParaState::Have;
            doc.detach(nc);
        }
        self.macro_line("El")?;
        doc.remove_children(id);
        Ok(())
    }

    fn tgroup2(&mut self, doc: &mut Document, id: NodeId)
        -> io::Result<()>
    {
        self.parastate = ParaState::Have;
        self.macro_line("Bl -tag -width Ds")?;
        while let Some(nr) = doc.find_first(id, K::Row) {
            let ne = match doc.find_first(id, K::Entry) {
                Some(ne) => ne,
                None => break,
            };
            self.macro_open("It")?;
            self.impl_open = true;
            self.parastate = ParaState::Have;
            self.node(doc, ne)?;
            self.macro_close()?;
            doc.detach(ne);
            self.parastate = ParaState::Have;
            self.node(doc, nr)?;
            self.parastate = ParaState::Have;
            doc.detach(nr);
        }
        self.macro_line("El")?;
        self.parastate = ParaState::Want;
        doc.remove_children(id);
        Ok(())
    }

    /// One column makes a bullet list, two a tag list, anything else
    /// nested lists of rows.
    fn tgroup(&mut self, doc: &mut Document, id: NodeId) -> io::Result<()> {
        let cols = doc[id].attr_str(AttrKey::Cols)
            .and_then(|s| s.trim().parse::<u32>().ok())
            .unwrap_or(0);
        match cols {
            1 => return self.tgroup1(doc, id),
            2 => return self.tgroup2(doc, id),
            _ => {}
        }

        self.parastate = ParaState::Have;
        self.macro_line("Bl -ohang")?;
        while let Some(nc) = doc.find_first(id, K::Row) {
            self.macro_line("It Table Row")?;
            self.row(doc, nc)?;
        }
        self.macro_line("El")?;
        self.parastate = ParaState::Want;
        doc.remove_children(id);
        Ok(())
    }

    fn list(&mut self, doc: &mut Document, id: NodeId) -> io::Result<()> {
        self.list_title(doc, id)?;
        self.parastate = ParaState::Have;
        let style = if doc[id].is_kind(K::OrderedList) {
            "-enum"
        } else {
            "-bullet"
        };
        self.macro_argline("Bl", style)?;
        let mut next = doc[id].first_child;
        while let Some(nc) = next {
            self.macro_line("It")?;
            self.parastate = ParaState::Have;
            self.node(doc, nc)?;
            self.parastate = ParaState::Have;
            next = doc[nc].next_sibling;
        }
        self.macro_line("El")?;
        self.parastate = ParaState::Want;
        doc.remove_children(id);
        Ok(())
    }

    fn variablelist(&mut self, doc: &mut Document, id: NodeId)
        -> io::Result<()>
    {
        self.list_title(doc, id)?;
        self.parastate = ParaState::Have;
        self.macro_line("Bl -tag -width Ds")?;
        let mut next = doc[id].first_child;
        while let Some(nc) = next {
            if doc[nc].is_kind(K::VarListEntry) {
                self.varlistentry(doc, nc)?;
            } else {
                self.macro_nodeline(doc, "It", nc, 0)?;
            }
            next = doc[nc].next_sibling;
        }
        self.macro_line("El")?;
        self.parastate = ParaState::Want;
        doc.remove_children(id);
        Ok(())
    }
}

fn arg_attrs(doc: &Document, id: NodeId) -> (bool, bool) {
    let mut isop = true;
    let mut isrep = false;
    if let Some(e) = doc[id].as_element() {
        for a in &e.attrs {
            if a.key == AttrKey::Choice
                && matches!(a.value,
                    AttrData::Val(AttrVal::Plain) | AttrData::Val(AttrVal::Req))
            {
                isop = false;
            } else if a.key == AttrKey::Rep
                && matches!(a.value, AttrData::Val(AttrVal::Repeat))
            {
                isrep = true;
            }
        }
    }
    (isop, isrep)
}
