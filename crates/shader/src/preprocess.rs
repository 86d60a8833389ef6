//! Line-walking pre-processor: expands `@oxy:` directives into WGSL text
//! and accumulates binding declarations for resource wiring.

use thiserror::Error;
use tracing::{debug, trace};

use crate::annotation::{self, Annotation, AnnotationError, AnnotationKind};
use crate::registry::{AddressSpace, StructRegistry};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PreprocessError {
    #[error(transparent)]
    Annotation(#[from] AnnotationError),
    /// The annotation parser validated a key the registry no longer has.
    /// This indicates a parser/registry mismatch, not an authoring mistake.
    #[error("line {line}: no registered struct source for `{key}`")]
    MissingRegistryEntry { line: usize, key: String },
}

/// Per-shader pre-processor.
///
/// The registry is shared and read-only; the declarations list is owned by
/// this instance and reset at the start of every [`process`](Self::process)
/// call. Use one instance per shader (or serialize calls externally).
pub struct Preprocessor<'r> {
    registry: &'r StructRegistry,
    declarations: Vec<Annotation>,
}

impl<'r> Preprocessor<'r> {
    pub fn new(registry: &'r StructRegistry) -> Self {
        Self {
            registry,
            declarations: Vec::new(),
        }
    }

    /// Expand all directives in `source`.
    ///
    /// Non-annotation lines pass through unchanged. Any parse error aborts
    /// immediately; no partial output is returned.
    pub fn process(&mut self, source: &str) -> Result<String, PreprocessError> {
        self.declarations.clear();
        let mut out = String::with_capacity(source.len());

        for (idx, line) in source.lines().enumerate() {
            let number = idx + 1;
            let Some(ann) = annotation::parse_line(line, number, self.registry)? else {
                out.push_str(line);
                out.push('\n');
                continue;
            };
            match ann.kind {
                AnnotationKind::Include => {
                    let key = &ann.args[0];
                    let entry = self.registry.get(key).ok_or_else(|| {
                        PreprocessError::MissingRegistryEntry {
                            line: number,
                            key: key.clone(),
                        }
                    })?;
                    trace!(key = %key, line = number, "include substituted");
                    out.push_str(entry.source);
                }
                AnnotationKind::BindingGroup => {
                    out.push_str(&self.synthesize_binding(&ann, number)?);
                    out.push('\n');
                    self.declarations.push(ann);
                }
                AnnotationKind::Provider => {
                    // The hand-written binding line below stays untouched;
                    // only the declaration is recorded.
                    self.declarations.push(ann);
                }
            }
        }

        debug!(declarations = self.declarations.len(), "source processed");
        Ok(out)
    }

    /// Declarations accumulated by the most recent `process` call.
    pub fn declarations(&self) -> &[Annotation] {
        &self.declarations
    }

    fn synthesize_binding(
        &self,
        ann: &Annotation,
        line: usize,
    ) -> Result<String, PreprocessError> {
        // Args and indices were validated by the annotation parser; any miss
        // here is an internal-consistency failure.
        let space = AddressSpace::from_token(&ann.args[0]).ok_or_else(|| {
            PreprocessError::MissingRegistryEntry {
                line,
                key: ann.args[0].clone(),
            }
        })?;
        let var_name = &ann.args[1];
        let type_key = &ann.args[2];

        let resolve = |key: &str| -> Result<&'static str, PreprocessError> {
            self.registry
                .get(key)
                .map(|entry| entry.type_name)
                .ok_or_else(|| PreprocessError::MissingRegistryEntry {
                    line,
                    key: key.to_string(),
                })
        };

        let type_text = match type_key
            .strip_prefix("array<")
            .and_then(|rest| rest.strip_suffix('>'))
        {
            Some(inner) => format!("array<{}>", resolve(inner)?),
            None => resolve(type_key)?.to_string(),
        };

        let group = ann.group.unwrap_or(0);
        let binding = ann.binding.unwrap_or(0);
        Ok(format!(
            "@group({group}) @binding({binding}) {} {var_name}: {type_text};",
            space.wgsl()
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> StructRegistry {
        StructRegistry::engine()
    }

    #[test]
    fn passes_plain_source_through() {
        let registry = registry();
        let mut pre = Preprocessor::new(&registry);
        let src = "fn main() {\n    let x = 1.0;\n}\n";
        let out = pre.process(src).unwrap();
        assert_eq!(out, src);
        assert!(pre.declarations().is_empty());
    }

    #[test]
    fn group_annotation_synthesizes_declaration() {
        let registry = registry();
        let mut pre = Preprocessor::new(&registry);
        let out = pre
            .process("//@oxy:group 0 0 storage_uniform camera camera\n")
            .unwrap();
        assert_eq!(out, "@group(0) @binding(0) var<uniform> camera: CameraUniform;\n");
        assert_eq!(pre.declarations().len(), 1);
        assert_eq!(pre.declarations()[0].group, Some(0));
    }

    #[test]
    fn array_types_wrap_the_resolved_element() {
        let registry = registry();
        let mut pre = Preprocessor::new(&registry);
        let out = pre
            .process("//@oxy:group 1 3 storage_read scene_lights array<light>\n")
            .unwrap();
        assert_eq!(
            out,
            "@group(1) @binding(3) var<storage, read> scene_lights: array<Light>;\n"
        );
    }

    #[test]
    fn include_substitutes_registered_source() {
        let registry = registry();
        let mut pre = Preprocessor::new(&registry);
        let out = pre.process("//@oxy:include camera\n").unwrap();
        assert!(out.contains("struct CameraUniform"));
        assert!(out.contains("view_proj: mat4x4<f32>"));
        assert!(pre.declarations().is_empty());
    }

    #[test]
    fn provider_emits_no_text_but_records_declaration() {
        let registry = registry();
        let mut pre = Preprocessor::new(&registry);
        let src = "//@oxy:provider 2 0 material diffuse_texture\nvar t_diffuse: texture_2d<f32>;\n";
        let out = pre.process(src).unwrap();
        assert_eq!(out, "var t_diffuse: texture_2d<f32>;\n");
        assert_eq!(pre.declarations().len(), 1);
        assert_eq!(pre.declarations()[0].args[0], "material");
    }

    #[test]
    fn errors_abort_with_no_partial_output() {
        let registry = registry();
        let mut pre = Preprocessor::new(&registry);
        let src = "let keep = 1.0;\n//@oxy:group 0 0 bogus_space camera camera\n";
        let err = pre.process(src).unwrap_err();
        let text = err.to_string();
        assert!(text.contains("bogus_space"));
        assert!(text.contains("line 2"));
    }

    #[test]
    fn declarations_reset_between_calls() {
        let registry = registry();
        let mut pre = Preprocessor::new(&registry);
        pre.process("//@oxy:provider 0 0 camera\n//@oxy:provider 1 0 lights\n")
            .unwrap();
        assert_eq!(pre.declarations().len(), 2);

        pre.process("fn main() {}\n").unwrap();
        assert!(pre.declarations().is_empty());
    }

    #[test]
    fn declarations_preserve_source_line_order() {
        let registry = registry();
        let mut pre = Preprocessor::new(&registry);
        let src = "\
//@oxy:provider 0 0 camera
//@oxy:group 1 0 storage_uniform mat material
//@oxy:provider 2 0 material diffuse_texture
";
        pre.process(src).unwrap();
        let lines: Vec<usize> = pre.declarations().iter().map(|d| d.line).collect();
        assert_eq!(lines, vec![1, 2, 3]);
    }
}
