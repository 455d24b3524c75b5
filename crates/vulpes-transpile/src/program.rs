use once_cell::unsync::OnceCell;
use std::ops::Range;
use vulpes_core::scan::{self, ItemKind, TopLevelItem};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParamQualifier {
    #[default]
    None,
    In,
    Out,
    InOut,
    /// Already a `thread T&` reference.
    Thread,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parameter {
    pub ty: String,
    pub qualifier: ParamQualifier,
    pub name: String,
    pub is_const: bool,
    pub is_reference: bool,
    /// Trailing `[N]` on the name, if any.
    pub array_suffix: Option<String>,
    pub span: Range<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionSignature {
    pub name: String,
    pub return_type: String,
    pub params: Vec<Parameter>,
    /// Whole top-level item: header, body and braces (or the prototype statement).
    pub span: Range<usize>,
    pub name_span: Range<usize>,
    pub open_paren: usize,
    pub close_paren: usize,
    /// Content strictly between the body braces; `None` for prototypes.
    pub body: Option<Range<usize>>,
}

impl FunctionSignature {
    pub fn is_definition(&self) -> bool {
        self.body.is_some()
    }

    pub fn arity(&self) -> usize {
        self.params.len()
    }

    pub fn has_param(&self, name: &str) -> bool {
        self.params.iter().any(|p| p.name == name)
    }

    /// Output-color and coordinate parameter names when this is shaped like the entry point:
    /// `void f(out vec4 color, in vec2 coord)`, before or after type and qualifier rewriting.
    pub fn entry_contract(&self) -> Option<(&str, &str)> {
        if self.return_type != "void" || self.params.len() != 2 {
            return None;
        }
        let color = &self.params[0];
        let coord = &self.params[1];
        let color_ok = matches!(color.ty.as_str(), "vec4" | "float4")
            && (matches!(color.qualifier, ParamQualifier::Out | ParamQualifier::InOut)
                || (color.qualifier == ParamQualifier::Thread && color.is_reference))
            && color.array_suffix.is_none();
        let coord_ok = matches!(coord.ty.as_str(), "vec2" | "float2")
            && matches!(coord.qualifier, ParamQualifier::In | ParamQualifier::None)
            && !coord.is_reference
            && coord.array_suffix.is_none();
        (color_ok && coord_ok && !color.name.is_empty() && !coord.name.is_empty())
            .then(|| (color.name.as_str(), coord.name.as_str()))
    }
}

/// Shader text plus the helper signatures discovered in it on first request.
///
/// Every stage produces a fresh program; nothing discovered survives a text change.
#[derive(Debug, Clone)]
pub struct SourceProgram {
    text: String,
    masked: OnceCell<String>,
    items: OnceCell<Vec<TopLevelItem>>,
    functions: OnceCell<Vec<FunctionSignature>>,
}

impl SourceProgram {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            masked: OnceCell::new(),
            items: OnceCell::new(),
            functions: OnceCell::new(),
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn into_text(self) -> String {
        self.text
    }

    /// Comment-masked copy with identical byte offsets.
    pub fn masked(&self) -> &str {
        self.masked.get_or_init(|| scan::mask_comments(&self.text))
    }

    pub fn items(&self) -> &[TopLevelItem] {
        self.items.get_or_init(|| scan::top_level_items(self.masked()))
    }

    /// Function definitions and prototypes in source order.
    pub fn functions(&self) -> &[FunctionSignature] {
        self.functions.get_or_init(|| {
            let masked = self.masked();
            self.items()
                .iter()
                .filter_map(|item| parse_signature(masked, item))
                .collect()
        })
    }

    pub fn definitions(&self) -> impl Iterator<Item = &FunctionSignature> {
        self.functions().iter().filter(|f| f.is_definition())
    }

    /// First definition matching the entry contract.
    pub fn entry_point(&self) -> Option<&FunctionSignature> {
        self.definitions().find(|f| f.entry_contract().is_some())
    }
}

impl From<&str> for SourceProgram {
    fn from(text: &str) -> Self {
        SourceProgram::new(text)
    }
}

impl From<String> for SourceProgram {
    fn from(text: String) -> Self {
        SourceProgram::new(text)
    }
}

const NON_RETURN_TYPES: &[&str] = &[
    "return", "struct", "if", "else", "for", "while", "switch", "do", "case", "layout",
    "uniform", "typedef", "using",
];

fn parse_signature(masked: &str, item: &TopLevelItem) -> Option<FunctionSignature> {
    let header = match item.kind {
        ItemKind::Block => item.body.as_ref().map(|_| item.header())?,
        // A prototype: `float f(float t);`
        ItemKind::Statement => {
            let stmt = item.range.start..item.range.end - 1;
            if masked[stmt.clone()].contains('=') {
                return None;
            }
            stmt
        }
        ItemKind::Directive => return None,
    };

    let open_paren = header.start + masked[header.clone()].find('(')?;
    let close_paren = scan::find_matching(masked, open_paren)?;
    if close_paren >= header.end || !masked[close_paren + 1..header.end].trim().is_empty() {
        return None;
    }

    let prefix = scan::trim_range(masked, header.start..open_paren);
    let prefix_text = &masked[prefix.clone()];
    let name_start = prefix.start
        + prefix_text
            .rfind(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
            .map(|i| i + 1)
            .unwrap_or(0);
    let name = &masked[name_start..prefix.end];
    let return_type = masked[prefix.start..name_start].trim();
    if !scan::is_identifier(name)
        || return_type.is_empty()
        || NON_RETURN_TYPES.contains(&return_type)
        || NON_RETURN_TYPES.contains(&name)
    {
        return None;
    }

    let params = scan::split_args(masked, open_paren, close_paren)
        .into_iter()
        .filter_map(|range| parse_parameter(masked, range))
        .collect();

    Some(FunctionSignature {
        name: name.to_string(),
        return_type: return_type.split_whitespace().collect::<Vec<_>>().join(" "),
        params,
        span: item.range.clone(),
        name_span: name_start..prefix.end,
        open_paren,
        close_paren,
        body: item.body.clone(),
    })
}

fn parse_parameter(masked: &str, span: Range<usize>) -> Option<Parameter> {
    let source = masked[span.clone()].replace('&', " & ");
    let mut tokens: Vec<&str> = source.split_whitespace().collect();
    if tokens.is_empty() || tokens == ["void"] {
        return None;
    }

    let mut qualifier = ParamQualifier::None;
    let mut is_const = false;
    while let Some(&token) = tokens.first() {
        match token {
            "const" => is_const = true,
            "in" => qualifier = ParamQualifier::In,
            "out" => qualifier = ParamQualifier::Out,
            "inout" => qualifier = ParamQualifier::InOut,
            "thread" => qualifier = ParamQualifier::Thread,
            _ => break,
        }
        tokens.remove(0);
    }

    let is_reference = tokens.contains(&"&");
    tokens.retain(|t| *t != "&");

    let (ty, name, array_suffix) = match tokens.as_slice() {
        [] => return None,
        [ty] => (ty.to_string(), String::new(), None),
        [ty @ .., last] => {
            let (name, suffix) = match last.find('[') {
                Some(i) => (&last[..i], Some(last[i..].to_string())),
                None => (*last, None),
            };
            (ty.join(" "), name.to_string(), suffix)
        }
    };

    Some(Parameter {
        ty,
        qualifier,
        name,
        is_const,
        is_reference,
        array_suffix,
        span,
    })
}
