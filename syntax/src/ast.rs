/// type alias just to make type signatures look more consistent.
pub type Ident<'a> = &'a str;

/// A value written out in a catalogue file.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal<'a> {
    /// "double quoted text"
    Str(&'a str),
    /// unquoted_word (including `true` and `false`)
    Word(&'a str),
    /// 42, -7
    Int(i64),
    /// 1.5, -0.25
    Float(f64),
    /// [value, value, ...]
    List(Vec<Literal<'a>>),
}

/// A parameter declaration:
/// `param name: type[!] [= default] [[constraint=value, ...]] ["doc"]`
#[derive(Debug, Clone, PartialEq)]
pub struct Param<'a> {
    pub name: Ident<'a>,
    /// Name of the declared type, checked later.
    pub ty: Ident<'a>,
    /// Marked with a trailing '!' on the type.
    pub required: bool,
    pub default: Option<Literal<'a>>,
    /// (constraint name, value) pairs, in the order written.
    pub constraints: Vec<(Ident<'a>, Literal<'a>)>,
    pub doc: Option<&'a str>,
}

/// A `key value...` line, e.g. `timeout 30` or `depends 1 2` or just `final`.
#[derive(Debug, Clone, PartialEq)]
pub struct Property<'a> {
    pub key: Ident<'a>,
    pub values: Vec<Literal<'a>>,
}

/// One line inside a braced block.
#[derive(Debug, Clone, PartialEq)]
pub enum Entry<'a> {
    Property(Property<'a>),
    Param(Param<'a>),
    /// Only meaningful directly inside a workflow block;
    /// the parser accepts it anywhere and the loader rejects misplaced ones.
    Stage(StageBlock<'a>),
}

/// `stage N task_type { ... }`
#[derive(Debug, Clone, PartialEq)]
pub struct StageBlock<'a> {
    pub number: u32,
    pub task_type: Ident<'a>,
    pub entries: Vec<Entry<'a>>,
}

/// `workflow job_type { ... }`, the only top-level item in a catalogue.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkflowBlock<'a> {
    pub job_type: Ident<'a>,
    pub entries: Vec<Entry<'a>>,
}

// These methods are just to assist with writing more legible tests.
#[cfg(test)]
impl<'a> Property<'a> {
    pub fn new(key: Ident<'a>, values: Vec<Literal<'a>>) -> Self {
        Self { key, values }
    }
    pub fn flag(key: Ident<'a>) -> Self {
        Self {
            key,
            values: Vec::new(),
        }
    }
}

#[cfg(test)]
impl<'a> Param<'a> {
    pub fn simple(name: Ident<'a>, ty: Ident<'a>) -> Self {
        Self {
            name,
            ty,
            required: false,
            default: None,
            constraints: Vec::new(),
            doc: None,
        }
    }
}
