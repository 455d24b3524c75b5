use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use vulpes_pipeline::PipelineOptions;

/// Fragment function name used when the caller does not override it.
pub const DEFAULT_ENTRY_SYMBOL: &str = "vulpes_custom_fragment";

/// How far ambient values are threaded through the helper call graph.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PropagationMode {
    /// Only helpers whose own body names the value receive it. Longer chains are reported.
    #[default]
    SingleHop,
    /// Repeat discovery and rewrite until no helper changes.
    Transitive,
}

/// Mapping used for GLSL `mod`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ModSemantics {
    /// Rename to MSL `fmod`. Differs from GLSL when the operands have opposite signs:
    /// `fmod` follows the dividend, GLSL `mod` follows the divisor.
    #[default]
    Approximate,
    /// Rename to `glsl_mod`, a floor-based helper emitted with the boilerplate.
    Exact,
}

impl ModSemantics {
    /// Target-side function name.
    pub fn function_name(self) -> &'static str {
        match self {
            ModSemantics::Approximate => "fmod",
            ModSemantics::Exact => "glsl_mod",
        }
    }

    /// Scalar model of what the emitted call computes on the GPU.
    pub fn evaluate(self, x: f32, y: f32) -> f32 {
        match self {
            ModSemantics::Approximate => x - y * (x / y).trunc(),
            ModSemantics::Exact => x - y * (x / y).floor(),
        }
    }
}

macro_rules! kebab_enum_str {
    ($ty:ty { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                match self {
                    $(Self::$variant => f.write_str($text),)+
                }
            }
        }

        impl FromStr for $ty {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok(Self::$variant),)+
                    other => Err(format!("unknown value `{}`", other)),
                }
            }
        }
    };
}

kebab_enum_str!(PropagationMode { SingleHop => "single-hop", Transitive => "transitive" });
kebab_enum_str!(ModSemantics { Approximate => "approximate", Exact => "exact" });

/// Options for one transpile call.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TranspileOptions {
    /// Generated fragment function name; disambiguates several custom shaders in one process
    pub entry_symbol: Option<String>,
    pub propagation: PropagationMode,
    pub mod_semantics: ModSemantics,
    pub pipeline: PipelineOptions,
}

impl TranspileOptions {
    pub fn entry_symbol(&self) -> &str {
        self.entry_symbol.as_deref().unwrap_or(DEFAULT_ENTRY_SYMBOL)
    }

    pub fn with_entry_symbol(mut self, symbol: impl Into<String>) -> Self {
        self.entry_symbol = Some(symbol.into());
        self
    }
}
