//! The mdoc(7) formatter.
//!
//! mdoc source is line oriented: any line beginning with `.` is a
//! macro or request line. This module holds the small explicit state
//! threaded through the tree walk and the primitives that build macro
//! and text lines; the per-kind dispatch lives in [`render`].

use std::io;
use std::io::Write;

use crate::dom::{Document, NodeClass, NodeId};

mod render;

#[cfg(test)]
mod tests;

pub use render::write_mdoc;

/// Insert whitespace before this argument.
pub(crate) const ARG_SPACE: u32 = 1;
/// Quote argument if it contains whitespace.
pub(crate) const ARG_SINGLE: u32 = 2;
/// We are already in a quoted argument.
pub(crate) const ARG_QUOTED: u32 = 4;
/// Convert argument to upper case.
pub(crate) const ARG_UPPER: u32 = 8;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum LineState {
    /// At the beginning of a new line.
    New,
    /// In the middle of a text line.
    Text,
    /// In the middle of a macro line.
    Macro,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum ParaState {
    /// Just printed .Pp or equivalent.
    Have,
    /// In the middle of a paragraph.
    Mid,
    /// Need .Pp before printing anything else.
    Want,
}

pub(crate) struct Formatter<'a, W: Write> {
    out: &'a mut W,
    /// Header level, starting at 1.
    level: u32,
    /// Level of no-fill block nesting.
    nofill: u32,
    linestate: LineState,
    parastate: ParaState,
    /// Suppress space before the next node.
    nospc: bool,
    /// May add argument to the current macro.
    arg: bool,
    /// Expect a single child macro.
    child: bool,
    /// Partial implicit block is open.
    impl_open: bool,
}

impl<'a, W: Write> Formatter<'a, W> {
    pub(crate) fn new(out: &'a mut W) -> Formatter<'a, W> {
        Formatter {
            out,
            level: 0,
            nofill: 0,
            linestate: LineState::New,
            parastate: ParaState::Have,
            nospc: false,
            arg: false,
            child: false,
            impl_open: false,
        }
    }

    fn write(&mut self, b: &[u8]) -> io::Result<()> {
        self.out.write_all(b)
    }

    fn clear_flags(&mut self) {
        self.nospc = false;
        self.arg = false;
        self.child = false;
        self.impl_open = false;
    }

    pub(crate) fn para_check(&mut self) -> io::Result<()> {
        if self.parastate != ParaState::Want {
            return Ok(());
        }
        if self.linestate != LineState::New {
            self.write(b"\n")?;
            self.linestate = LineState::New;
        }
        self.write(b".Pp\n")?;
        self.parastate = ParaState::Have;
        Ok(())
    }

    pub(crate) fn macro_open(&mut self, name: &str) -> io::Result<()> {
        self.para_check()?;
        match self.linestate {
            LineState::Macro if self.nospc => {
                self.write(b" Ns ")?;
            }
            LineState::Macro
                if self.nofill > 0 || self.child || self.impl_open =>
            {
                self.write(b" ")?;
            }
            state => {
                if state == LineState::Text && self.nofill > 0 {
                    self.write(b" \\c")?;
                }
                if state != LineState::New {
                    self.write(b"\n")?;
                }
                self.write(b".")?;
                self.linestate = LineState::Macro;
                self.clear_flags();
            }
        }
        self.write(name.as_bytes())?;
        let impl_open = self.impl_open;
        self.clear_flags();
        self.impl_open = impl_open;
        self.arg = true;
        self.parastate = ParaState::Mid;
        Ok(())
    }

    pub(crate) fn macro_close(&mut self) -> io::Result<()> {
        if self.linestate != LineState::New {
            self.write(b"\n")?;
        }
        self.linestate = LineState::New;
        self.clear_flags();
        Ok(())
    }

    pub(crate) fn macro_line(&mut self, name: &str) -> io::Result<()> {
        self.macro_close()?;
        self.macro_open(name)?;
        self.macro_close()
    }

    /// Print an argument string on a macro line, collapsing whitespace.
    pub(crate) fn macro_addarg(&mut self, arg: &str, flags: u32)
        -> io::Result<()>
    {
        debug_assert_eq!(self.linestate, LineState::Macro);
        let mut flags = flags;
        let bytes = arg.as_bytes();

        // Quote if requested and necessary.

        let mut quote_now = false;
        if flags & (ARG_SINGLE | ARG_QUOTED) == ARG_SINGLE
            && bytes.iter().any(u8::is_ascii_whitespace)
        {
            if flags & ARG_SPACE != 0 {
                self.write(b" ")?;
                flags &= !ARG_SPACE;
            }
            self.write(b"\"")?;
            flags = ARG_QUOTED;
            quote_now = true;
        }

        let mut i = 0;
        while i < bytes.len() {
            let c = bytes[i];

            // Collapse whitespace.

            if c.is_ascii_whitespace() {
                flags |= ARG_SPACE;
                i += 1;
                continue;
            } else if flags & ARG_SPACE != 0 {
                self.write(b" ")?;
                flags &= !ARG_SPACE;
            }

            // Escape us if we look like a macro.

            if flags & (ARG_QUOTED | ARG_UPPER) == 0
                && (i == 0 || bytes[i - 1].is_ascii_whitespace())
                && c.is_ascii_uppercase()
                && i + 1 < bytes.len()
                && bytes[i + 1].is_ascii_lowercase()
                && (i + 2 == bytes.len() || bytes[i + 2] == b' '
                    || ((i + 3 == bytes.len() || bytes[i + 3] == b' ')
                        && matches!(&bytes[i..i + 3],
                            b"Brq" | b"Bro" | b"Brc" | b"Bsx")))
            {
                self.write(b"\\&")?;
            }

            if c == b'"' {
                self.write(b"\\(dq")?;
            } else if flags & ARG_UPPER != 0 {
                self.write(&[c.to_ascii_uppercase()])?;
            } else {
                self.write(&[c])?;
            }
            if c == b'\\' {
                self.write(b"e")?;
            }
            i += 1;
        }
        if quote_now {
            self.write(b"\"")?;
        }
        self.parastate = ParaState::Mid;
        Ok(())
    }

    pub(crate) fn macro_argline(&mut self, name: &str, arg: &str)
        -> io::Result<()>
    {
        self.macro_open(name)?;
        self.macro_addarg(arg, ARG_SPACE)?;
        self.macro_close()
    }

    /// Recursively append text from the children of a node to a macro
    /// line.
    pub(crate) fn macro_addnode(&mut self, doc: &Document, id: NodeId,
        flags: u32) -> io::Result<()>
    {
        debug_assert_eq!(self.linestate, LineState::Macro);
        let mut flags = flags;

        /*
         * If this node or its only child is a text node, just add that
         * text, letting macro_addarg() decide about quoting.
         */

        let mut id = id;
        while let Some(nc) = doc[id].first_child {
            if doc[nc].next_sibling.is_some() {
                break;
            }
            id = nc;
        }

        if let Some(t) = doc[id].text_str() {
            let t = t.to_string();
            self.macro_addarg(&t, flags)?;
            self.parastate = ParaState::Mid;
            return Ok(());
        }

        /*
         * If we want the argument quoted and are not already in a
         * quoted context, quote now.
         */

        let mut quote_now = false;
        if flags & ARG_SINGLE != 0 {
            if flags & ARG_QUOTED == 0 {
                if flags & ARG_SPACE != 0 {
                    self.write(b" ")?;
                    flags &= !ARG_SPACE;
                }
                self.write(b"\"")?;
                flags |= ARG_QUOTED;
                quote_now = true;
            }
            flags &= !ARG_SINGLE;
        }

        /*
         * Iterate to child and sibling nodes, inserting whitespace
         * between nodes.
         */

        let mut nc = doc[id].first_child;
        while let Some(c) = nc {
            self.macro_addnode(doc, c, flags)?;
            let is_text = doc[c].class() == NodeClass::Text;
            nc = doc[c].next_sibling;
            match nc {
                Some(nx) if is_text
                    && doc[nx].class() == NodeClass::Text
                    && !doc[nx].spc() =>
                {
                    flags &= !ARG_SPACE;
                }
                _ => {
                    flags |= ARG_SPACE;
                }
            }
        }
        if quote_now {
            self.write(b"\"")?;
        }
        self.parastate = ParaState::Mid;
        Ok(())
    }

    pub(crate) fn macro_nodeline(&mut self, doc: &Document, name: &str,
        id: NodeId, flags: u32) -> io::Result<()>
    {
        self.macro_open(name)?;
        self.macro_addnode(doc, id, ARG_SPACE | flags)?;
        self.macro_close()
    }

    /// Print a word on the current text line if one is open, or on a
    /// new text line otherwise. The flag `ARG_SPACE` inserts spaces
    /// between words.
    pub(crate) fn print_text(&mut self, word: &str, flags: u32)
        -> io::Result<()>
    {
        self.para_check()?;
        match self.linestate {
            LineState::New => {}
            LineState::Text => {
                if flags & ARG_SPACE != 0 {
                    self.write(b" ")?;
                }
            }
            LineState::Macro => {
                self.macro_close()?;
            }
        }
        let bytes = word.as_bytes();
        if self.linestate == LineState::New
            && (bytes.first() == Some(&b'.') || bytes.first() == Some(&b'\''))
        {
            self.write(b"\\&")?;
        }
        let mut ateos = false;
        let mut inword = 0u32;
        let mut i = 0;
        while i < bytes.len() {
            let c = bytes[i];
            if self.nofill == 0 {
                match c {
                    b' ' if !ateos => {
                        inword = 0;
                    }
                    b' ' => {
                        ateos = false;
                        inword = 0;

                        // Handle the end of a sentence.

                        while i < bytes.len() && bytes[i] == b' ' {
                            i += 1;
                        }
                        match bytes.get(i) {
                            None => {}
                            Some(b'\'') | Some(b'.') => {
                                self.write(b"\n\\&")?;
                            }
                            Some(_) => {
                                self.write(b"\n")?;
                            }
                        }
                        continue;
                    }
                    // Detect the end of a sentence.
                    b'!' | b'.' | b'?' => {
                        if inword > 1
                            && !(bytes[i - 2] == b'n' && bytes[i - 1] == b'c')
                            && !(bytes[i - 2] == b'v' && bytes[i - 1] == b's')
                        {
                            ateos = true;
                        }
                        inword = 0;
                    }
                    b'"' | b'\'' | b')' | b']' => {
                        inword = 0;
                    }
                    _ => {
                        if c.is_ascii_alphanumeric() {
                            inword += 1;
                        }
                        ateos = false;
                    }
                }
            }
            self.write(&[c])?;
            if c == b'\\' {
                self.write(b"e")?;
            }
            i += 1;
        }
        self.linestate = LineState::Text;
        self.parastate = ParaState::Mid;
        self.clear_flags();
        Ok(())
    }

    /// Recursively print the content of a node on a text line.
    pub(crate) fn print_textnode(&mut self, doc: &Document, id: NodeId)
        -> io::Result<()>
    {
        if let Some(t) = doc[id].text_str() {
            let t = t.to_string();
            self.print_text(&t, ARG_SPACE)?;
        } else {
            let mut nc = doc[id].first_child;
            while let Some(c) = nc {
                self.print_textnode(doc, c)?;
                nc = doc[c].next_sibling;
            }
        }
        Ok(())
    }
}
