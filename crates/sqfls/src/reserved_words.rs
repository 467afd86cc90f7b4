/// Reserved identifiers for SQF.
///
/// Global-looking names in this set are language keywords, literals or core
/// commands. The symbol store never tracks them as global variables, and the
/// undefined-global check never reports them. SQF is case-insensitive, so every
/// check here lower-cases the candidate first.

/// Keywords, literals and core commands that never denote a user global.
pub const RESERVED_WORDS: &[&str] = &[
    "if",
    "then",
    "else",
    "exitwith",
    "while",
    "do",
    "for",
    "from",
    "to",
    "step",
    "foreach",
    "foreachreversed",
    "switch",
    "case",
    "default",
    "with",
    "waituntil",
    "try",
    "catch",
    "throw",
    "true",
    "false",
    "nil",
    "private",
    "params",
    "param",
    "call",
    "spawn",
    "execvm",
    "compile",
    "compilefinal",
    "preprocessfile",
    "preprocessfilelinenumbers",
    "and",
    "or",
    "not",
    "isnil",
    "isnull",
    "count",
    "select",
    "player",
    "this",
    "hint",
    "diag_log",
    "format",
    "str",
    "missionnamespace",
    "uinamespace",
    "profilenamespace",
    "parsingnamespace",
    "objnull",
    "grpnull",
    "controlnull",
    "displaynull",
    "scriptnull",
    "tasknull",
    "locationnull",
];

/// Local variables the engine defines implicitly inside certain constructs.
pub const MAGIC_LOCALS: &[&str] = &[
    "_this",
    "_x",
    "_y",
    "_foreachindex",
    "_exception",
    "_thisscript",
    "_thisfsm",
    "_thiseventhandler",
    "_thisarg",
    "_thistype",
];

/// Check if a name is a reserved SQF identifier (case-insensitive).
///
/// # Examples
///
/// ```
/// use sqfls::reserved_words::is_reserved_word;
///
/// assert!(is_reserved_word("if"));
/// assert!(is_reserved_word("ForEach"));
/// assert!(is_reserved_word("TRUE"));
///
/// assert!(!is_reserved_word("myGlobal"));
/// ```
pub fn is_reserved_word(name: &str) -> bool {
    RESERVED_WORDS
        .iter()
        .any(|word| word.eq_ignore_ascii_case(name))
}

/// Check if a local name is defined implicitly by the engine.
pub fn is_magic_local(name: &str) -> bool {
    let lower = name.to_lowercase();
    MAGIC_LOCALS.contains(&lower.as_str())
}
