//! Handle Registry: the single source of truth for what input/output
//! handles each node kind exposes and what type flows through them.

use super::model::{DataType, NodeKind};
use std::collections::HashMap;

/// Specification of one input handle.
#[derive(Debug, Clone, Copy)]
pub struct InputHandle {
    pub data_type: DataType,
    pub required: bool,
    pub multiple: bool,
}

#[derive(Debug, Clone, Copy)]
struct OutputHandle {
    data_type: DataType,
}

/// Lookup table of handle types and compatibility for every node kind.
///
/// Built once as a constant table; matching is strict by type so an
/// editor-time validation pass and the runtime resolver never disagree
/// about what is wired to what.
pub struct HandleRegistry {
    inputs: HashMap<(NodeKind, &'static str), InputHandle>,
    outputs: HashMap<(NodeKind, &'static str), OutputHandle>,
}

impl HandleRegistry {
    pub fn new() -> Self {
        use DataType::*;
        use NodeKind::*;

        let mut inputs = HashMap::new();
        let mut outputs = HashMap::new();

        let mut input = |kind: NodeKind, handle: &'static str, data_type: DataType, required: bool, multiple: bool| {
            inputs.insert((kind, handle), InputHandle { data_type, required, multiple });
        };
        let mut output = |kind: NodeKind, handle: &'static str, data_type: DataType| {
            outputs.insert((kind, handle), OutputHandle { data_type });
        };

        output(NodeKind::Text, "value", DataType::Text);

        output(UploadImage, "image", Image);
        output(UploadVideo, "video", Video);

        input(Llm, "user_message", DataType::Text, true, false);
        input(Llm, "system_prompt", DataType::Text, false, false);
        input(Llm, "images", Image, false, true);
        output(Llm, "text", DataType::Text);

        input(CropImage, "image", Image, true, false);
        output(CropImage, "image", Image);

        input(ExtractFrame, "video", Video, true, false);
        output(ExtractFrame, "image", Image);

        input(GenerateImage, "prompt", DataType::Text, true, false);
        input(GenerateImage, "reference_a", Image, false, false);
        input(GenerateImage, "reference_b", Image, false, false);
        output(GenerateImage, "image", Image);

        input(ExportText, "text", DataType::Text, true, false);
        input(ExportImage, "image", Image, true, false);
        input(ExportVideo, "video", Video, true, false);

        Self { inputs, outputs }
    }

    /// Resolve the type flowing through `handle` on `kind`, whether it is
    /// used as an input or an output slot.
    pub fn type_of(&self, kind: NodeKind, handle: &str) -> Option<DataType> {
        self.outputs
            .get(&(kind, handle))
            .map(|h| h.data_type)
            .or_else(|| self.inputs.get(&(kind, handle)).map(|h| h.data_type))
    }

    /// An edge is valid iff its source is a real output, its target is a
    /// real input, and their types match exactly.
    pub fn compatible(
        &self,
        src_kind: NodeKind,
        src_handle: &str,
        dst_kind: NodeKind,
        dst_handle: &str,
    ) -> bool {
        let src = self.outputs.get(&(src_kind, src_handle));
        let dst = self.inputs.get(&(dst_kind, dst_handle));
        match (src, dst) {
            (Some(src), Some(dst)) => src.data_type == dst.data_type,
            _ => false,
        }
    }

    pub fn input_spec(&self, kind: NodeKind, handle: &str) -> Option<InputHandle> {
        self.inputs.get(&(kind, handle)).copied()
    }

    pub fn required_inputs(&self, kind: NodeKind) -> impl Iterator<Item = (&'static str, InputHandle)> + '_ {
        self.inputs
            .iter()
            .filter(move |((k, _), spec)| *k == kind && spec.required)
            .map(|((_, handle), spec)| (*handle, *spec))
    }
}

impl Default for HandleRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use NodeKind::*;

    #[test]
    fn text_to_llm_user_message_is_compatible() {
        let reg = HandleRegistry::new();
        assert!(reg.compatible(Text, "value", Llm, "user_message"));
    }

    #[test]
    fn image_to_text_slot_is_incompatible() {
        let reg = HandleRegistry::new();
        assert!(!reg.compatible(UploadImage, "image", Llm, "user_message"));
    }

    #[test]
    fn unknown_handle_is_incompatible() {
        let reg = HandleRegistry::new();
        assert!(!reg.compatible(Text, "value", Llm, "nope"));
    }

    #[test]
    fn required_inputs_lists_only_required() {
        let reg = HandleRegistry::new();
        let required: Vec<_> = reg.required_inputs(Llm).map(|(h, _)| h).collect();
        assert!(required.contains(&"user_message"));
        assert!(!required.contains(&"system_prompt"));
    }
}
