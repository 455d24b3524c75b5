//! Threads ambient values (`iResolution`, `iTime`) into helper functions.
//!
//! The generated entry point declares the ambient values as locals, but helpers defined in the
//! preamble cannot see them. Every helper whose body names an ambient value gets it appended as
//! a trailing parameter, and every call to that helper passes it along.
//!
//! Discovery only sees direct use. A helper that calls a user without naming the value itself
//! is a transitive user; [`PropagationMode::SingleHop`] reports those, while
//! [`PropagationMode::Transitive`] keeps rewriting until nothing changes.

use super::STAGE_UNIFORMS;
use crate::ambient::{AmbientValue, AMBIENT_VALUES};
use crate::options::PropagationMode;
use crate::program::{FunctionSignature, SourceProgram};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, warn};
use vulpes_core::diagnostics::Diagnostic;
use vulpes_core::scan::{self, TextEdits};
use vulpes_core::Span;
use vulpes_pipeline::PipelineDiagnostics;

/// Words that may precede a call without making it a declaration.
const NON_TYPE_WORDS: &[&str] = &["return", "else", "case", "do"];

/// A function as it appears in one program text. Overloads are told apart by parameter
/// count; `index` is the position among [`SourceProgram::functions`].
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FunctionKey {
    pub name: String,
    pub arity: usize,
    pub index: usize,
}

impl FunctionKey {
    pub fn of(index: usize, function: &FunctionSignature) -> Self {
        Self {
            name: function.name.clone(),
            arity: function.arity(),
            index,
        }
    }
}

/// Ambient identifiers each helper definition mentions directly in its body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UniformUsageSet {
    uses: BTreeMap<FunctionKey, BTreeSet<&'static str>>,
}

impl UniformUsageSet {
    /// Scan every definition except the entry point. Helpers that already declare a parameter
    /// named after an ambient value are not users of it.
    pub fn discover(program: &SourceProgram, ambients: &[AmbientValue]) -> Self {
        let masked = program.masked();
        let entry_start = program.entry_point().map(|entry| entry.span.start);
        let mut uses: BTreeMap<FunctionKey, BTreeSet<&'static str>> = BTreeMap::new();
        for (index, function) in program.functions().iter().enumerate() {
            if Some(function.span.start) == entry_start {
                continue;
            }
            let Some(body) = function.body.clone() else {
                continue;
            };
            for ambient in ambients {
                if function.has_param(ambient.name) {
                    continue;
                }
                if scan::contains_identifier(&masked[body.clone()], ambient.name) {
                    uses.entry(FunctionKey::of(index, function))
                        .or_default()
                        .insert(ambient.name);
                }
            }
        }
        Self { uses }
    }

    pub fn is_empty(&self) -> bool {
        self.uses.is_empty()
    }

    pub fn len(&self) -> usize {
        self.uses.len()
    }

    pub fn users_of<'a>(&'a self, ambient: &'a str) -> impl Iterator<Item = &'a FunctionKey> + 'a {
        self.uses
            .iter()
            .filter(move |(_, names)| names.contains(ambient))
            .map(|(key, _)| key)
    }

    pub fn ambients_of(&self, name: &str, arity: usize) -> Option<&BTreeSet<&'static str>> {
        self.uses
            .iter()
            .find(|(key, _)| key.name == name && key.arity == arity)
            .map(|(_, names)| names)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&FunctionKey, &BTreeSet<&'static str>)> {
        self.uses.iter()
    }
}

/// An overload as it was declared before propagation, and the ambient values appended to it
/// so far in that order.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Overload {
    name: String,
    arity: usize,
    threaded: Vec<&'static str>,
}

/// Overload identity for every function of the input program. Appending parameters never
/// adds or removes top-level items, so function positions stay valid across rewrites.
#[derive(Debug, Clone, Default)]
struct Overloads {
    by_function: Vec<usize>,
    overloads: Vec<Overload>,
}

impl Overloads {
    fn collect(program: &SourceProgram) -> Self {
        let mut table = Self::default();
        for function in program.functions() {
            let arity = function.arity();
            let id = match table
                .overloads
                .iter()
                .position(|o| o.name == function.name && o.arity == arity)
            {
                Some(id) => id,
                None => {
                    table.overloads.push(Overload {
                        name: function.name.clone(),
                        arity,
                        threaded: Vec::new(),
                    });
                    table.overloads.len() - 1
                }
            };
            table.by_function.push(id);
        }
        table
    }

    fn of_key(&self, key: &FunctionKey) -> Option<usize> {
        self.by_function.get(key.index).copied()
    }

    /// Overload a call with these arguments targets. Calls made by earlier propagation end
    /// in the ambient names already threaded, which tells apart overloads whose current
    /// arities coincide.
    fn resolve(&self, name: &str, args: &[&str]) -> Option<usize> {
        self.overloads
            .iter()
            .enumerate()
            .filter(|(_, o)| o.name == name && o.arity + o.threaded.len() == args.len())
            .filter(|(_, o)| args[o.arity..] == o.threaded[..])
            .max_by_key(|(_, o)| o.threaded.len())
            .map(|(id, _)| id)
    }
}

#[derive(Debug, Clone)]
pub struct UniformUsagePropagator {
    pub mode: PropagationMode,
    pub ambients: Vec<AmbientValue>,
    /// Round cap for [`PropagationMode::Transitive`]. Defaults to one round per definition
    /// and ambient value, which any call chain fits in.
    pub max_rounds: Option<usize>,
}

impl Default for UniformUsagePropagator {
    fn default() -> Self {
        Self::new(PropagationMode::default())
    }
}

impl UniformUsagePropagator {
    pub fn new(mode: PropagationMode) -> Self {
        Self {
            mode,
            ambients: AMBIENT_VALUES.to_vec(),
            max_rounds: None,
        }
    }

    pub fn with_max_rounds(mut self, rounds: usize) -> Self {
        self.max_rounds = Some(rounds);
        self
    }

    pub fn rewrite(
        &self,
        program: &SourceProgram,
        diagnostics: &mut PipelineDiagnostics,
    ) -> SourceProgram {
        let mut overloads = Overloads::collect(program);
        let rounds = match self.mode {
            PropagationMode::SingleHop => 1,
            PropagationMode::Transitive => self
                .max_rounds
                .unwrap_or(program.definitions().count() * self.ambients.len() + 1),
        };

        let mut current = program.clone();
        for round in 0..rounds {
            if UniformUsageSet::discover(&current, &self.ambients).is_empty() {
                debug!(rounds = round, "uniform propagation reached a fixed point");
                break;
            }
            current = self.propagate_once(current, &mut overloads);
        }

        let remaining = UniformUsageSet::discover(&current, &self.ambients);
        if !remaining.is_empty() {
            report_unthreaded_users(&current, &remaining, self.mode, diagnostics);
        }
        current
    }

    /// One discovery and rewrite per ambient value.
    fn propagate_once(&self, program: SourceProgram, overloads: &mut Overloads) -> SourceProgram {
        let mut current = program;
        for ambient in &self.ambients {
            let usage = UniformUsageSet::discover(&current, std::slice::from_ref(ambient));
            let users: BTreeSet<usize> = usage
                .users_of(ambient.name)
                .filter_map(|key| overloads.of_key(key))
                .collect();
            if users.is_empty() {
                continue;
            }
            debug!(
                ambient = ambient.name,
                users = ?usage.iter().map(|(key, _)| key.name.as_str()).collect::<Vec<_>>(),
                "threading ambient value"
            );
            current = SourceProgram::new(thread_ambient(&current, ambient, &users, overloads));
            for id in users {
                overloads.overloads[id].threaded.push(ambient.name);
            }
        }
        current
    }
}

fn thread_ambient(
    program: &SourceProgram,
    ambient: &AmbientValue,
    users: &BTreeSet<usize>,
    overloads: &Overloads,
) -> String {
    let masked = program.masked();
    let bytes = masked.as_bytes();
    let mut edits = TextEdits::new();

    for (index, function) in program.functions().iter().enumerate() {
        let is_user = overloads
            .by_function
            .get(index)
            .is_some_and(|id| users.contains(id));
        if !is_user || function.has_param(ambient.name) {
            continue;
        }
        match function.params.last() {
            Some(last) => edits.insert(last.span.end, format!(", {}", ambient.parameter())),
            None => edits.replace(function.open_paren + 1..function.close_paren, ambient.parameter()),
        }
    }

    let names: BTreeSet<&str> = users
        .iter()
        .map(|id| overloads.overloads[*id].name.as_str())
        .collect();
    for name in names {
        for pos in scan::find_identifier(masked, name) {
            if pos > 0 && bytes[pos - 1] == b'.' {
                continue;
            }
            if let Some(word) = scan::previous_word(masked, pos) {
                if !NON_TYPE_WORDS.contains(&word) {
                    continue;
                }
            }
            let Some(open) = scan::next_non_space(masked, pos + name.len()) else {
                continue;
            };
            if bytes[open] != b'(' {
                continue;
            }
            let Some(close) = scan::find_matching(masked, open) else {
                continue;
            };
            let args = scan::split_args(masked, open, close);
            let texts: Vec<&str> = args.iter().map(|range| masked[range.clone()].trim()).collect();
            // Calls already carrying the argument resolve to no user, as do other overloads.
            if !overloads
                .resolve(name, &texts)
                .is_some_and(|id| users.contains(&id))
            {
                continue;
            }
            match args.last() {
                Some(last) => edits.insert(last.end, format!(", {}", ambient.name)),
                None => edits.replace(open + 1..close, ambient.name),
            }
        }
    }

    edits.apply(program.text())
}

fn report_unthreaded_users(
    program: &SourceProgram,
    remaining: &UniformUsageSet,
    mode: PropagationMode,
    diagnostics: &mut PipelineDiagnostics,
) {
    let suggestion = match mode {
        PropagationMode::SingleHop => {
            "use transitive propagation to thread ambient values through call chains"
        }
        PropagationMode::Transitive => "raise the propagation round limit",
    };
    for (key, names) in remaining.iter() {
        let span = program
            .functions()
            .get(key.index)
            .map(|function| Span::from_range(function.name_span.clone()));
        for name in names {
            warn!(function = %key.name, ambient = name, %mode, "transitive ambient use not threaded");
            let mut diagnostic = Diagnostic::warning(format!(
                "`{}` reaches `{}` only through a helper call and does not receive it",
                key.name, name
            ))
            .with_suggestion(suggestion)
            .with_code("transitive-uniform-use")
            .with_source_context(STAGE_UNIFORMS);
            if let Some(span) = span {
                diagnostic = diagnostic.with_span(span);
            }
            diagnostics.push(diagnostic);
        }
    }
}

super::text_stage!(UniformUsagePropagator, super::STAGE_UNIFORMS);

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn propagate(source: &str, mode: PropagationMode) -> (String, PipelineDiagnostics) {
        let mut diagnostics = PipelineDiagnostics::default();
        let text = UniformUsagePropagator::new(mode)
            .rewrite(&SourceProgram::new(source), &mut diagnostics)
            .into_text();
        (text, diagnostics)
    }

    const CHAIN: &str = "float wobble(float t) { return sin(t * iTime); }\n\
                         float scene(float x) { return wobble(x) * 2.0; }\n\
                         void mainImage(thread float4& c, float2 p) { c = float4(scene(p.x)); }\n";

    #[test]
    fn discovery_skips_entry_and_comments() {
        let program = SourceProgram::new(
            "float a() { return iTime; }\n\
             float b() { /* iTime */ return 1.0; }\n\
             float c(float2 iResolution) { return iResolution.x; }\n\
             void mainImage(out vec4 o, in vec2 p) { o = vec4(iTime); }\n",
        );
        let usage = UniformUsageSet::discover(&program, &AMBIENT_VALUES);
        let names: Vec<&str> = usage.iter().map(|(key, _)| key.name.as_str()).collect();
        assert_eq!(names, vec!["a"]);
        assert!(usage.ambients_of("a", 0).unwrap().contains("iTime"));
    }

    #[test]
    fn threads_parameter_and_call_sites() {
        let (text, diagnostics) = propagate(
            "float wobble(float t);\n\
             float wobble(float t) { return sin(t * iTime); }\n\
             void mainImage(thread float4& c, float2 p) { c = float4(wobble(1.0)); }\n",
            PropagationMode::SingleHop,
        );
        assert_eq!(
            text,
            "float wobble(float t, float iTime);\n\
             float wobble(float t, float iTime) { return sin(t * iTime); }\n\
             void mainImage(thread float4& c, float2 p) { c = float4(wobble(1.0, iTime)); }\n"
        );
        assert!(diagnostics.items.is_empty());
    }

    #[test]
    fn empty_parameter_lists_receive_the_value_alone() {
        let (text, _) = propagate(
            "float2 res(void) { return iResolution; }\nfloat k() { return res().x; }\n",
            PropagationMode::SingleHop,
        );
        assert!(text.starts_with("float2 res(float2 iResolution) {"));
        assert!(text.contains("return res(iResolution).x;"));
    }

    #[test]
    fn single_hop_reports_the_gap() {
        let (text, diagnostics) = propagate(CHAIN, PropagationMode::SingleHop);
        assert!(text.contains("float scene(float x) { return wobble(x, iTime) * 2.0; }"));
        let gaps: Vec<_> = diagnostics.with_code("transitive-uniform-use").collect();
        assert_eq!(gaps.len(), 1);
        assert!(gaps[0].message.contains("`scene`"));
    }

    #[test]
    fn transitive_mode_closes_the_chain() {
        let (text, diagnostics) = propagate(CHAIN, PropagationMode::Transitive);
        assert_eq!(
            text,
            "float wobble(float t, float iTime) { return sin(t * iTime); }\n\
             float scene(float x, float iTime) { return wobble(x, iTime) * 2.0; }\n\
             void mainImage(thread float4& c, float2 p) { c = float4(scene(p.x, iTime)); }\n"
        );
        assert_eq!(diagnostics.with_code("transitive-uniform-use").count(), 0);
    }

    #[test]
    fn overloads_are_keyed_by_arity() {
        let (text, _) = propagate(
            "float f(float a) { return a * iTime; }\n\
             float f(float a, float b) { return a + b; }\n\
             float g() { return f(1.0) + f(1.0, 2.0); }\n",
            PropagationMode::SingleHop,
        );
        assert!(text.contains("float f(float a, float iTime) { return a * iTime; }"));
        assert!(text.contains("float f(float a, float b) { return a + b; }"));
        assert!(text.contains("return f(1.0, iTime) + f(1.0, 2.0);"));
    }

    #[test]
    fn propagation_is_idempotent() {
        let (once, _) = propagate(CHAIN, PropagationMode::Transitive);
        let (twice, _) = propagate(&once, PropagationMode::Transitive);
        assert_eq!(once, twice);
    }

    #[test]
    fn overloads_keep_their_identity_across_ambient_values() {
        let (text, _) = propagate(
            "float f(float a) { return a * iResolution.x; }\n\
             float f(float a, float b) { return a + b * iTime; }\n\
             float g(float x) { return f(x) + f(x, 2.0); }\n",
            PropagationMode::SingleHop,
        );
        assert_eq!(
            text,
            "float f(float a, float2 iResolution) { return a * iResolution.x; }\n\
             float f(float a, float b, float iTime) { return a + b * iTime; }\n\
             float g(float x) { return f(x, iResolution) + f(x, 2.0, iTime); }\n"
        );
    }

    #[test]
    fn exhausted_round_limit_reports_the_gap() {
        let mut diagnostics = PipelineDiagnostics::default();
        let text = UniformUsagePropagator::new(PropagationMode::Transitive)
            .with_max_rounds(1)
            .rewrite(&SourceProgram::new(CHAIN), &mut diagnostics)
            .into_text();
        assert!(text.contains("float scene(float x) { return wobble(x, iTime) * 2.0; }"));
        let gaps: Vec<_> = diagnostics.with_code("transitive-uniform-use").collect();
        assert_eq!(gaps.len(), 1);
        assert!(gaps[0].message.contains("`scene`"));
        assert_eq!(gaps[0].suggestions, vec!["raise the propagation round limit".to_string()]);
    }
}
