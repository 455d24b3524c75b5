/// A value the entry point sees through its wrapper and helpers receive as a parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AmbientValue {
    pub name: &'static str,
    pub ty: &'static str,
}

pub const I_RESOLUTION: AmbientValue = AmbientValue {
    name: "iResolution",
    ty: "float2",
};

pub const I_TIME: AmbientValue = AmbientValue {
    name: "iTime",
    ty: "float",
};

/// The wrapper exposes exactly these, in uniform-struct order.
pub const AMBIENT_VALUES: [AmbientValue; 2] = [I_RESOLUTION, I_TIME];

impl AmbientValue {
    /// Parameter declaration appended to helper signatures.
    pub fn parameter(&self) -> String {
        format!("{} {}", self.ty, self.name)
    }
}
