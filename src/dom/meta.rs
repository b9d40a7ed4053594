//! Static metadata for the recognized DocBook elements, attributes,
//! and character entities.

use std::collections::HashMap;

use lazy_static::lazy_static;
use tendril::StrTendril;

lazy_static! {
    /// Primary element name lookup.
    static ref ELEMENT_NAMES: HashMap<&'static str, ElementKind> =
        init_element_names();

    /// DocBook variants remapped to canonical kinds or sentinels.
    static ref ALIASES: HashMap<&'static str, Resolved> = init_aliases();

    /// XML character entity references found in the wild, mapped to
    /// troff escapes. Those without an exact mandoc_char(7)
    /// representation are approximated; encoding them as \[u...] would
    /// leave -Tascii out in the cold.
    static ref ENTITIES: HashMap<&'static str, &'static str> =
        init_entities();
}

/// How the output from each element kind behaves with respect to
/// mdoc(7) structure.
///
/// The order is significant: classes up to `Trans` are plainer than
/// any in-line macro, which some handlers rely on.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum NodeClass {
    /// No output at all, children are skipped.
    Void,
    /// Node prints only text, no macros.
    Text,
    /// Transparent: only the children are shown.
    Trans,
    /// Generates only simple in-line macros.
    Line,
    /// Explicit or implicit partial blocks.
    Encl,
    /// Output linebreak before and after.
    Block,
    /// Block preserving leading whitespace.
    NoFill,
}

/// All element kinds used for formatting purposes.
///
/// More DocBook XML elements are recognized, but remapped or discarded
/// through the alias table.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ElementKind {
    Abstract,
    Appendix,
    Arg,
    Author,
    AuthorGroup,
    BlockQuote,
    BookInfo,
    Caution,
    CiteRefEntry,
    CiteTitle,
    CmdSynopsis,
    ColSpec,
    Command,
    Constant,
    Contrib,
    Copyright,
    Date,
    Doctype,
    Editor,
    Email,
    Emphasis,
    Entity,
    Entry,
    Envar,
    ErrorName,
    FieldSynopsis,
    Filename,
    FirstTerm,
    Footnote,
    FuncDef,
    FuncParams,
    FuncPrototype,
    FuncSynopsis,
    FuncSynopsisInfo,
    Function,
    GlossTerm,
    Group,
    ImageData,
    Include,
    Index,
    Info,
    InformalEquation,
    InlineEquation,
    ItemizedList,
    KeySym,
    LegalNotice,
    Link,
    ListItem,
    Literal,
    LiteralLayout,
    ManVolNum,
    Markup,
    Member,
    MmlMath,
    MmlMfenced,
    MmlMfrac,
    MmlMi,
    MmlMn,
    MmlMo,
    MmlMrow,
    MmlMsub,
    MmlMsup,
    Modifier,
    Note,
    Olink,
    Option,
    OrderedList,
    Para,
    ParamDef,
    Parameter,
    PersonName,
    Preface,
    ProductName,
    ProgramListing,
    Prompt,
    PubDate,
    Quote,
    RefClass,
    RefDescriptor,
    RefEntry,
    RefEntryInfo,
    RefEntryTitle,
    RefMeta,
    RefMetaInfo,
    RefMiscInfo,
    RefName,
    RefNameDiv,
    RefPurpose,
    RefSynopsisDiv,
    Replaceable,
    Row,
    Sbr,
    Screen,
    Section,
    SimpleList,
    SimpleSect,
    SpanSpec,
    Subscript,
    Subtitle,
    Superscript,
    Synopsis,
    SystemItem,
    Table,
    Tbody,
    Term,
    Tfoot,
    Tgroup,
    Thead,
    Tip,
    Title,
    Type,
    VariableList,
    VarListEntry,
    VarName,
    Void,
    Warning,
    WordAsWord,
    Xref,
    Year,
}

/// The outcome of resolving an element name.
///
/// The sentinel variants direct the parser and never appear in the
/// finished tree.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Resolved {
    Elem(ElementKind),
    /// Skip the element itself but keep its content.
    Ignore,
    /// Drop the element with its whole subtree.
    Delete,
    /// Like `Delete`, but worth a warning.
    DeleteWarn,
    /// Not recognized at all.
    Unknown,
}

impl ElementKind {
    const ALL: &'static [ElementKind] = &[
        ElementKind::Abstract,
        ElementKind::Appendix,
        ElementKind::Arg,
        ElementKind::Author,
        ElementKind::AuthorGroup,
        ElementKind::BlockQuote,
        ElementKind::BookInfo,
        ElementKind::Caution,
        ElementKind::CiteRefEntry,
        ElementKind::CiteTitle,
        ElementKind::CmdSynopsis,
        ElementKind::ColSpec,
        ElementKind::Command,
        ElementKind::Constant,
        ElementKind::Contrib,
        ElementKind::Copyright,
        ElementKind::Date,
        ElementKind::Doctype,
        ElementKind::Editor,
        ElementKind::Email,
        ElementKind::Emphasis,
        ElementKind::Entity,
        ElementKind::Entry,
        ElementKind::Envar,
        ElementKind::ErrorName,
        ElementKind::FieldSynopsis,
        ElementKind::Filename,
        ElementKind::FirstTerm,
        ElementKind::Footnote,
        ElementKind::FuncDef,
        ElementKind::FuncParams,
        ElementKind::FuncPrototype,
        ElementKind::FuncSynopsis,
        ElementKind::FuncSynopsisInfo,
        ElementKind::Function,
        ElementKind::GlossTerm,
        ElementKind::Group,
        ElementKind::ImageData,
        ElementKind::Include,
        ElementKind::Index,
        ElementKind::Info,
        ElementKind::InformalEquation,
        ElementKind::InlineEquation,
        ElementKind::ItemizedList,
        ElementKind::KeySym,
        ElementKind::LegalNotice,
        ElementKind::Link,
        ElementKind::ListItem,
        ElementKind::Literal,
        ElementKind::LiteralLayout,
        ElementKind::ManVolNum,
        ElementKind::Markup,
        ElementKind::Member,
        ElementKind::MmlMath,
        ElementKind::MmlMfenced,
        ElementKind::MmlMfrac,
        ElementKind::MmlMi,
        ElementKind::MmlMn,
        ElementKind::MmlMo,
        ElementKind::MmlMrow,
        ElementKind::MmlMsub,
        ElementKind::MmlMsup,
        ElementKind::Modifier,
        ElementKind::Note,
        ElementKind::Olink,
        ElementKind::Option,
        ElementKind::OrderedList,
        ElementKind::Para,
        ElementKind::ParamDef,
        ElementKind::Parameter,
        ElementKind::PersonName,
        ElementKind::Preface,
        ElementKind::ProductName,
        ElementKind::ProgramListing,
        ElementKind::Prompt,
        ElementKind::PubDate,
        ElementKind::Quote,
        ElementKind::RefClass,
        ElementKind::RefDescriptor,
        ElementKind::RefEntry,
        ElementKind::RefEntryInfo,
        ElementKind::RefEntryTitle,
        ElementKind::RefMeta,
        ElementKind::RefMetaInfo,
        ElementKind::RefMiscInfo,
        ElementKind::RefName,
        ElementKind::RefNameDiv,
        ElementKind::RefPurpose,
        ElementKind::RefSynopsisDiv,
        ElementKind::Replaceable,
        ElementKind::Row,
        ElementKind::Sbr,
        ElementKind::Screen,
        ElementKind::Section,
        ElementKind::SimpleList,
        ElementKind::SimpleSect,
        ElementKind::SpanSpec,
        ElementKind::Subscript,
        ElementKind::Subtitle,
        ElementKind::Superscript,
        ElementKind::Synopsis,
        ElementKind::SystemItem,
        ElementKind::Table,
        ElementKind::Tbody,
        ElementKind::Term,
        ElementKind::Tfoot,
        ElementKind::Tgroup,
        ElementKind::Thead,
        ElementKind::Tip,
        ElementKind::Title,
        ElementKind::Type,
        ElementKind::VariableList,
        ElementKind::VarListEntry,
        ElementKind::VarName,
        ElementKind::Void,
        ElementKind::Warning,
        ElementKind::WordAsWord,
        ElementKind::Xref,
        ElementKind::Year,
    ];

    /// The DocBook element name, as written in the input.
    pub fn name(self) -> &'static str {
        use ElementKind::*;
        match self {
            Abstract => "abstract",
            Appendix => "appendix",
            Arg => "arg",
            Author => "author",
            AuthorGroup => "authorgroup",
            BlockQuote => "blockquote",
            BookInfo => "bookinfo",
            Caution => "caution",
            CiteRefEntry => "citerefentry",
            CiteTitle => "citetitle",
            CmdSynopsis => "cmdsynopsis",
            ColSpec => "colspec",
            Command => "command",
            Constant => "constant",
            Contrib => "contrib",
            Copyright => "copyright",
            Date => "date",
            Doctype => "!DOCTYPE",
            Editor => "editor",
            Email => "email",
            Emphasis => "emphasis",
            Entity => "!ENTITY",
            Entry => "entry",
            Envar => "envar",
            ErrorName => "errorname",
            FieldSynopsis => "fieldsynopsis",
            Filename => "filename",
            FirstTerm => "firstterm",
            Footnote => "footnote",
            FuncDef => "funcdef",
            FuncParams => "funcparams",
            FuncPrototype => "funcprototype",
            FuncSynopsis => "funcsynopsis",
            FuncSynopsisInfo => "funcsynopsisinfo",
            Function => "function",
            GlossTerm => "glossterm",
            Group => "group",
            ImageData => "imagedata",
            Include => "xi:include",
            Index => "index",
            Info => "info",
            InformalEquation => "informalequation",
            InlineEquation => "inlineequation",
            ItemizedList => "itemizedlist",
            KeySym => "keysym",
            LegalNotice => "legalnotice",
            Link => "link",
            ListItem => "listitem",
            Literal => "literal",
            LiteralLayout => "literallayout",
            ManVolNum => "manvolnum",
            Markup => "markup",
            Member => "member",
            MmlMath => "mml:math",
            MmlMfenced => "mml:mfenced",
            MmlMfrac => "mml:mfrac",
            MmlMi => "mml:mi",
            MmlMn => "mml:mn",
            MmlMo => "mml:mo",
            MmlMrow => "mml:mrow",
            MmlMsub => "mml:msub",
            MmlMsup => "mml:msup",
            Modifier => "modifier",
            Note => "note",
            Olink => "olink",
            Option => "option",
            OrderedList => "orderedlist",
            Para => "para",
            ParamDef => "paramdef",
            Parameter => "parameter",
            PersonName => "personname",
            Preface => "preface",
            ProductName => "productname",
            ProgramListing => "programlisting",
            Prompt => "prompt",
            PubDate => "pubdate",
            Quote => "quote",
            RefClass => "refclass",
            RefDescriptor => "refdescriptor",
            RefEntry => "refentry",
            RefEntryInfo => "refentryinfo",
            RefEntryTitle => "refentrytitle",
            RefMeta => "refmeta",
            RefMetaInfo => "refmetainfo",
            RefMiscInfo => "refmiscinfo",
            RefName => "refname",
            RefNameDiv => "refnamediv",
            RefPurpose => "refpurpose",
            RefSynopsisDiv => "refsynopsisdiv",
            Replaceable => "replaceable",
            Row => "row",
            Sbr => "sbr",
            Screen => "screen",
            Section => "section",
            SimpleList => "simplelist",
            SimpleSect => "simplesect",
            SpanSpec => "spanspec",
            Subscript => "subscript",
            Subtitle => "subtitle",
            Superscript => "superscript",
            Synopsis => "synopsis",
            SystemItem => "systemitem",
            Table => "table",
            Tbody => "tbody",
            Term => "term",
            Tfoot => "tfoot",
            Tgroup => "tgroup",
            Thead => "thead",
            Tip => "tip",
            Title => "title",
            Type => "type",
            VariableList => "variablelist",
            VarListEntry => "varlistentry",
            VarName => "varname",
            Void => "void",
            Warning => "warning",
            WordAsWord => "wordasword",
            Xref => "xref",
            Year => "year",
        }
    }

    /// The formatting class of this kind.
    pub fn class(self) -> NodeClass {
        use ElementKind::*;
        match self {
            Abstract | Appendix | AuthorGroup | BlockQuote | BookInfo
            | Caution | Footnote | FuncDef | FuncPrototype
            | InformalEquation | InlineEquation | ItemizedList
            | LegalNotice | Note | OrderedList | Para | Preface
            | RefNameDiv | RefSynopsisDiv | Row | Sbr | Section
            | SimpleSect | Subtitle | Tgroup | Tip | Title
            | VariableList | VarListEntry | Warning
                => NodeClass::Block,

            Arg | Email | Entry | Group | Link | Literal | Olink | Quote
                => NodeClass::Encl,

            Author | CiteRefEntry | CiteTitle | Command | Constant
            | Copyright | Editor | Emphasis | Envar | ErrorName
            | Filename | FirstTerm | FuncParams | FuncSynopsisInfo
            | Function | GlossTerm | KeySym | Markup | Member | MmlMath
            | MmlMfenced | MmlMfrac | MmlMi | MmlMn | MmlMo | MmlMrow
            | MmlMsub | MmlMsup | Modifier | Option | ParamDef
            | Parameter | ProductName | RefName | RefPurpose
            | Replaceable | SystemItem | Term | Type | VarName | Xref
                => NodeClass::Line,

            ColSpec | Doctype | Entity | Include | RefEntryInfo
                => NodeClass::Void,

            CmdSynopsis | Contrib | Date | FieldSynopsis | FuncSynopsis
            | Index | Info | ListItem | ManVolNum | PersonName | Prompt
            | PubDate | RefClass | RefDescriptor | RefEntry
            | RefEntryTitle | RefMeta | RefMetaInfo | RefMiscInfo
            | SimpleList | SpanSpec | Table | Tbody | Tfoot | Thead
            | WordAsWord | Year
                => NodeClass::Trans,

            LiteralLayout | ProgramListing | Screen | Synopsis
                => NodeClass::NoFill,

            ImageData | Subscript | Superscript | Void
                => NodeClass::Text,
        }
    }
}

/// Resolve an element name to a kind, a sentinel, or `Unknown`.
pub(crate) fn resolve_element(name: &str) -> Resolved {
    if let Some(&kind) = ELEMENT_NAMES.get(name) {
        return Resolved::Elem(kind);
    }
    if let Some(&res) = ALIASES.get(name) {
        return res;
    }
    Resolved::Unknown
}

fn init_element_names() -> HashMap<&'static str, ElementKind> {
    let mut m = HashMap::with_capacity(ElementKind::ALL.len());
    for &kind in ElementKind::ALL {
        m.insert(kind.name(), kind);
    }
    m
}

fn init_aliases() -> HashMap<&'static str, Resolved> {
    use ElementKind::*;
    let mut m = HashMap::with_capacity(64);
    let table: &[(&str, Resolved)] = &[
        ("acronym",         Resolved::Ignore),
        ("affiliation",     Resolved::Ignore),
        ("anchor",          Resolved::Delete),
        ("application",     Resolved::Elem(Command)),
        ("article",         Resolved::Elem(Section)),
        ("articleinfo",     Resolved::Elem(BookInfo)),
        ("book",            Resolved::Elem(Section)),
        ("chapter",         Resolved::Elem(Section)),
        ("caption",         Resolved::Ignore),
        ("code",            Resolved::Elem(Literal)),
        ("computeroutput",  Resolved::Elem(Literal)),
        ("!doctype",        Resolved::Elem(Doctype)),
        ("figure",          Resolved::Ignore),
        ("firstname",       Resolved::Elem(PersonName)),
        ("glossary",        Resolved::Elem(VariableList)),
        ("glossdef",        Resolved::Ignore),
        ("glossdiv",        Resolved::Ignore),
        ("glossentry",      Resolved::Elem(VarListEntry)),
        ("glosslist",       Resolved::Elem(VariableList)),
        ("holder",          Resolved::Ignore),
        ("imageobject",     Resolved::Ignore),
        ("indexterm",       Resolved::Delete),
        ("informaltable",   Resolved::Elem(Table)),
        ("jobtitle",        Resolved::Ignore),
        ("keycap",          Resolved::Elem(KeySym)),
        ("keycode",         Resolved::Ignore),
        ("keycombo",        Resolved::Ignore),
        ("mediaobject",     Resolved::Elem(BlockQuote)),
        ("orgdiv",          Resolved::Ignore),
        ("orgname",         Resolved::Ignore),
        ("othercredit",     Resolved::Elem(Author)),
        ("othername",       Resolved::Elem(PersonName)),
        ("part",            Resolved::Elem(Section)),
        ("phrase",          Resolved::Ignore),
        ("primary",         Resolved::Delete),
        ("property",        Resolved::Elem(Parameter)),
        ("reference",       Resolved::Elem(Section)),
        ("refsect1",        Resolved::Elem(Section)),
        ("refsect2",        Resolved::Elem(Section)),
        ("refsect3",        Resolved::Elem(Section)),
        ("refsection",      Resolved::Elem(Section)),
        ("releaseinfo",     Resolved::Ignore),
        ("returnvalue",     Resolved::Ignore),
        ("secondary",       Resolved::Delete),
        ("sect1",           Resolved::Elem(Section)),
        ("sect2",           Resolved::Elem(Section)),
        ("sect3",           Resolved::Elem(Section)),
        ("sect4",           Resolved::Elem(Section)),
        ("sgmltag",         Resolved::Elem(Markup)),
        ("simpara",         Resolved::Elem(Para)),
        ("structfield",     Resolved::Elem(Parameter)),
        ("structname",      Resolved::Elem(Type)),
        ("surname",         Resolved::Elem(PersonName)),
        ("symbol",          Resolved::Elem(Constant)),
        ("tag",             Resolved::Elem(Markup)),
        ("trademark",       Resolved::Ignore),
        ("ulink",           Resolved::Elem(Link)),
        ("userinput",       Resolved::Elem(Literal)),
    ];
    for &(name, res) in table {
        m.insert(name, res);
    }
    m
}

/// All recognised attribute keys. Other attributes are discarded.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum AttrKey {
    Choice,
    Class,
    Close,
    Cols,
    Definition,
    EndTerm,
    EntityRef,
    FileRef,
    Href,
    Id,
    LinkEnd,
    LocalInfo,
    Name,
    Open,
    Public,
    Rep,
    System,
    TargetDoc,
    TargetPtr,
    Url,
    XlinkHref,
}

impl AttrKey {
    const ALL: &'static [AttrKey] = &[
        AttrKey::Choice,
        AttrKey::Class,
        AttrKey::Close,
        AttrKey::Cols,
        AttrKey::Definition,
        AttrKey::EndTerm,
        AttrKey::EntityRef,
        AttrKey::FileRef,
        AttrKey::Href,
        AttrKey::Id,
        AttrKey::LinkEnd,
        AttrKey::LocalInfo,
        AttrKey::Name,
        AttrKey::Open,
        AttrKey::Public,
        AttrKey::Rep,
        AttrKey::System,
        AttrKey::TargetDoc,
        AttrKey::TargetPtr,
        AttrKey::Url,
        AttrKey::XlinkHref,
    ];

    pub fn name(self) -> &'static str {
        match self {
            AttrKey::Choice => "choice",
            AttrKey::Class => "class",
            AttrKey::Close => "close",
            AttrKey::Cols => "cols",
            AttrKey::Definition => "DEFINITION",
            AttrKey::EndTerm => "endterm",
            AttrKey::EntityRef => "entityref",
            AttrKey::FileRef => "fileref",
            AttrKey::Href => "href",
            AttrKey::Id => "id",
            AttrKey::LinkEnd => "linkend",
            AttrKey::LocalInfo => "localinfo",
            AttrKey::Name => "NAME",
            AttrKey::Open => "open",
            AttrKey::Public => "PUBLIC",
            AttrKey::Rep => "rep",
            AttrKey::System => "SYSTEM",
            AttrKey::TargetDoc => "targetdoc",
            AttrKey::TargetPtr => "targetptr",
            AttrKey::Url => "url",
            AttrKey::XlinkHref => "xlink:href",
        }
    }

    pub(crate) fn parse(name: &str) -> Option<AttrKey> {
        AttrKey::ALL.iter().copied().find(|k| k.name() == name)
    }
}

/// All explicitly recognised attribute values. Any other value is kept
/// as a free-form string.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum AttrVal {
    Event,
    IpAddress,
    Monospaced,
    NoRepeat,
    Opt,
    Plain,
    Repeat,
    Req,
    SystemName,
}

impl AttrVal {
    const ALL: &'static [AttrVal] = &[
        AttrVal::Event,
        AttrVal::IpAddress,
        AttrVal::Monospaced,
        AttrVal::NoRepeat,
        AttrVal::Opt,
        AttrVal::Plain,
        AttrVal::Repeat,
        AttrVal::Req,
        AttrVal::SystemName,
    ];

    pub fn name(self) -> &'static str {
        match self {
            AttrVal::Event => "event",
            AttrVal::IpAddress => "ipaddress",
            AttrVal::Monospaced => "monospaced",
            AttrVal::NoRepeat => "norepeat",
            AttrVal::Opt => "opt",
            AttrVal::Plain => "plain",
            AttrVal::Repeat => "repeat",
            AttrVal::Req => "req",
            AttrVal::SystemName => "systemname",
        }
    }

    pub(crate) fn parse(name: &str) -> Option<AttrVal> {
        AttrVal::ALL.iter().copied().find(|v| v.name() == name)
    }
}

/// One DocBook XML element attribute.
#[derive(Clone, Debug)]
pub struct Attr {
    pub key: AttrKey,
    pub value: AttrData,
}

/// The value side of an attribute: pending, a recognized keyword, or a
/// free-form string.
#[derive(Clone, Debug)]
pub enum AttrData {
    Unset,
    Val(AttrVal),
    Raw(StrTendril),
}

impl AttrData {
    /// Parse a value string, keeping it raw if it is not a keyword.
    pub(crate) fn parse(value: &str) -> AttrData {
        match AttrVal::parse(value) {
            Some(v) => AttrData::Val(v),
            None => AttrData::Raw(value.into()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            AttrData::Unset => "",
            AttrData::Val(v) => v.name(),
            AttrData::Raw(s) => s.as_ref(),
        }
    }
}

/// Look up the troff replacement for a named character entity.
pub(crate) fn entity_escape(name: &str) -> Option<&'static str> {
    ENTITIES.get(name).copied()
}

fn init_entities() -> HashMap<&'static str, &'static str> {
    let mut m = HashMap::with_capacity(48);
    let table: &[(&str, &str)] = &[
        ("alpha",   "\\(*a"),
        ("amp",     "&"),
        ("apos",    "'"),
        ("auml",    "\\(:a"),
        ("beta",    "\\(*b"),
        ("circ",    "^"),        /* U+02C6 */
        ("copy",    "\\(co"),
        ("dagger",  "\\(dg"),
        ("Delta",   "\\(*D"),
        ("eacute",  "\\('e"),
        ("emsp",    "\\ "),      /* U+2003 */
        ("gt",      ">"),
        ("hairsp",  "\\^"),
        ("kappa",   "\\(*k"),
        ("larr",    "\\(<-"),
        ("ldquo",   "\\(lq"),
        ("le",      "\\(<="),
        ("lowbar",  "_"),
        ("lsqb",    "["),
        ("lt",      "<"),
        ("mdash",   "\\(em"),
        ("minus",   "\\-"),
        ("ndash",   "\\(en"),
        ("nbsp",    "\\ "),
        ("num",     "#"),
        ("oslash",  "\\(/o"),
        ("ouml",    "\\(:o"),
        ("percnt",  "%"),
        ("quot",    "\\(dq"),
        ("rarr",    "\\(->"),
        ("rArr",    "\\(rA"),
        ("rdquo",   "\\(rq"),
        ("reg",     "\\(rg"),
        ("rho",     "\\(*r"),
        ("rsqb",    "]"),
        ("sigma",   "\\(*s"),
        ("shy",     "\\&"),      /* U+00AD */
        ("tau",     "\\(*t"),
        ("tilde",   "\\[u02DC]"),
        ("times",   "\\[tmu]"),
        ("uuml",    "\\(:u"),
    ];
    for &(name, roff) in table {
        m.insert(name, roff);
    }
    m
}
