use std::fmt;

/// Non-fatal reflection diagnostics.
///
/// These cover cases the pipeline deliberately degrades on instead of
/// failing: the affected item is absent from the output, and the warning
/// says why. Callers can surface them during shader authoring.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Warning {
    /// A struct never resolved (cyclic or unknown field type) and was
    /// dropped from the layout table.
    UnresolvedStruct { name: String },
    /// A vertex-input struct contained a field type with no vertex format
    /// mapping; the whole struct was skipped.
    SkippedVertexStruct { name: String, field_type: String },
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Warning::UnresolvedStruct { name } => {
                write!(f, "struct `{name}` never resolved and was dropped")
            }
            Warning::SkippedVertexStruct { name, field_type } => {
                write!(
                    f,
                    "vertex struct `{name}` skipped: no vertex format for `{field_type}`"
                )
            }
        }
    }
}
