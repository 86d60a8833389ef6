//! WGSL memory layout rules: per-type size/alignment and struct packing.
//!
//! Follows the std430-style host-shareable layout rules: scalars are 4 bytes
//! (f16 is 2), vec3 aligns to 16, array strides round the element size up to
//! the element alignment, and struct sizes round up to the largest member
//! alignment.

use std::collections::BTreeMap;

use tracing::{debug, trace};

use crate::diagnostics::Warning;
use crate::parse::ParsedStruct;

/// Byte size and required alignment of a type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeLayout {
    pub size: u64,
    pub align: u64,
}

impl TypeLayout {
    pub const fn new(size: u64, align: u64) -> Self {
        Self { size, align }
    }
}

/// Round `value` up to a multiple of `align`.
///
/// `align` must be a power of two; the bitmask rounding is undefined
/// otherwise.
pub fn align_up(align: u64, value: u64) -> u64 {
    (value + align - 1) & !(align - 1)
}

/// Fixed layout table for scalar, vector, matrix and atomic types.
///
/// Both shorthand (`vec3f`) and generic (`vec3<f32>`) spellings resolve to
/// the same layout.
fn primitive_layout(name: &str) -> Option<TypeLayout> {
    let layout = match name {
        "f32" | "i32" | "u32" | "atomic<u32>" | "atomic<i32>" => TypeLayout::new(4, 4),
        "f16" => TypeLayout::new(2, 2),

        "vec2<f32>" | "vec2f" | "vec2<i32>" | "vec2i" | "vec2<u32>" | "vec2u" => {
            TypeLayout::new(8, 8)
        }
        "vec3<f32>" | "vec3f" | "vec3<i32>" | "vec3i" | "vec3<u32>" | "vec3u" => {
            TypeLayout::new(12, 16)
        }
        "vec4<f32>" | "vec4f" | "vec4<i32>" | "vec4i" | "vec4<u32>" | "vec4u" => {
            TypeLayout::new(16, 16)
        }

        "vec2<f16>" | "vec2h" => TypeLayout::new(4, 4),
        "vec3<f16>" | "vec3h" => TypeLayout::new(6, 8),
        "vec4<f16>" | "vec4h" => TypeLayout::new(8, 8),

        // Column-major: size = columns x round_up(align(col), size(col)).
        "mat2x2<f32>" | "mat2x2f" => TypeLayout::new(16, 8),
        "mat2x3<f32>" | "mat2x3f" => TypeLayout::new(32, 16),
        "mat2x4<f32>" | "mat2x4f" => TypeLayout::new(32, 16),
        "mat3x2<f32>" | "mat3x2f" => TypeLayout::new(24, 8),
        "mat3x3<f32>" | "mat3x3f" => TypeLayout::new(48, 16),
        "mat3x4<f32>" | "mat3x4f" => TypeLayout::new(48, 16),
        "mat4x2<f32>" | "mat4x2f" => TypeLayout::new(32, 8),
        "mat4x3<f32>" | "mat4x3f" => TypeLayout::new(64, 16),
        "mat4x4<f32>" | "mat4x4f" => TypeLayout::new(64, 16),

        _ => return None,
    };
    Some(layout)
}

/// Resolve the layout of a type name against already-computed struct layouts.
///
/// Returns `None` for unknown types; callers decide how to degrade.
pub fn resolve_type(name: &str, known: &BTreeMap<String, TypeLayout>) -> Option<TypeLayout> {
    let name = name.trim();
    if let Some(layout) = primitive_layout(name) {
        return Some(layout);
    }
    if let Some(inner) = name
        .strip_prefix("array<")
        .and_then(|rest| rest.strip_suffix('>'))
    {
        return resolve_array(inner, known);
    }
    known.get(name).copied()
}

/// Layout of `array<T, N>` or the per-element stride of `array<T>`.
fn resolve_array(inner: &str, known: &BTreeMap<String, TypeLayout>) -> Option<TypeLayout> {
    let (element, count) = match split_array_params(inner) {
        (element, Some(count_text)) => {
            let count: u64 = count_text.trim().parse().ok()?;
            (element, Some(count))
        }
        (element, None) => (element, None),
    };
    let elem = resolve_type(element, known)?;
    let stride = align_up(elem.align, elem.size);
    match count {
        Some(n) => Some(TypeLayout::new(n * stride, elem.align)),
        // Runtime-sized: the stride doubles as the minimum binding size.
        None => Some(TypeLayout::new(stride, elem.align)),
    }
}

/// Split `T, N` at the top-level comma, if any.
fn split_array_params(inner: &str) -> (&str, Option<&str>) {
    let mut depth = 0i32;
    for (i, c) in inner.char_indices() {
        match c {
            '<' => depth += 1,
            '>' => depth -= 1,
            ',' if depth == 0 => return (inner[..i].trim(), Some(&inner[i + 1..])),
            _ => {}
        }
    }
    (inner.trim(), None)
}

fn is_runtime_array(name: &str) -> bool {
    match name.trim().strip_prefix("array<") {
        Some(rest) => match rest.strip_suffix('>') {
            Some(inner) => split_array_params(inner).1.is_none(),
            None => false,
        },
        None => false,
    }
}

/// Compute one struct's layout; `None` when a field type cannot resolve yet.
///
/// Builtin fields occupy no buffer space. A trailing runtime-sized array
/// does not contribute to the size: the struct reports its fixed prefix, and
/// a struct that is *only* a runtime array reports the element stride.
pub fn struct_layout(
    parsed: &ParsedStruct,
    known: &BTreeMap<String, TypeLayout>,
) -> Option<TypeLayout> {
    let mut offset = 0u64;
    let mut max_align = 0u64;
    let last = parsed.fields.len().wrapping_sub(1);

    for (i, field) in parsed.fields.iter().enumerate() {
        if field.is_builtin {
            continue;
        }
        if i == last && is_runtime_array(&field.type_name) {
            if offset == 0 {
                // Struct is nothing but the runtime array.
                return resolve_type(&field.type_name, known);
            }
            return Some(TypeLayout::new(offset, max_align.max(1)));
        }
        let layout = resolve_type(&field.type_name, known)?;
        offset = align_up(layout.align, offset) + layout.size;
        max_align = max_align.max(layout.align);
    }

    if max_align == 0 {
        // Only builtin fields (or none): zero-size struct.
        return Some(TypeLayout::new(0, 1));
    }
    Some(TypeLayout::new(align_up(max_align, offset), max_align))
}

/// Resolve every struct to a layout via fixed-point iteration.
///
/// Each pass attempts all still-unresolved structs; passes repeat until one
/// makes no progress or nothing remains. Structs that never resolve (cyclic
/// or referencing unknown types) are omitted from the result and reported on
/// the warnings channel.
pub fn compute_layouts(
    structs: &[ParsedStruct],
    warnings: &mut Vec<Warning>,
) -> BTreeMap<String, TypeLayout> {
    let mut resolved: BTreeMap<String, TypeLayout> = BTreeMap::new();
    let mut pending: Vec<&ParsedStruct> = structs.iter().collect();

    loop {
        let mut progressed = false;
        pending.retain(|s| match struct_layout(s, &resolved) {
            Some(layout) => {
                trace!(name = %s.name, size = layout.size, align = layout.align, "struct resolved");
                resolved.insert(s.name.clone(), layout);
                progressed = true;
                false
            }
            None => true,
        });
        if pending.is_empty() || !progressed {
            break;
        }
    }

    for s in &pending {
        debug!(name = %s.name, "dropping unresolvable struct");
        warnings.push(Warning::UnresolvedStruct {
            name: s.name.clone(),
        });
    }

    resolved
}
