//! PDF writing module for generating PDF files.
//!
//! This module provides components for creating PDF files from ContentElements.
//!
//! ## Architecture
//!
//! ```text
//! ContentElement[]
//!     ↓
//! [ContentStreamBuilder] (elements → content stream bytes)
//!     ↓
//! [PdfWriter] (assembles complete PDF structure)
//!     ↓
//! [ObjectSerializer] (serializes PDF objects)
//!     ↓
//! PDF bytes
//! ```
//!
//! ## Example
//!
//! ```ignore
//! use pdf_oxide::writer::{PdfWriter, ContentStreamBuilder};
//!
//! let mut writer = PdfWriter::new();
//! let page = writer.add_page(612.0, 792.0);
//! page.add_text("Hello, World!", 72.0, 720.0);
//! let bytes = writer.finish()?;
//! ```

mod acroform;
mod appearance_stream;
mod content_stream;
mod font_manager;
pub mod form_fields;
mod graphics_state;
mod object_serializer;
mod pdf_writer;

pub use acroform::AcroFormBuilder;
pub use appearance_stream::AppearanceStreamBuilder;
pub use content_stream::{
    BlendMode, ContentStreamBuilder, ContentStreamOp, LineCap, LineJoin, PendingImage,
    TextArrayItem,
};
pub use font_manager::{
    EmbeddedFont, EmbeddedFontManager, FontFamily, FontInfo, FontManager, FontWeight, TextLayout,
};
pub use form_fields::{
    ButtonFieldFlags, CheckboxWidget, ChoiceFieldFlags, ChoiceOption, ComboBoxWidget, FieldFlags,
    FormAction, FormAppearanceGenerator, FormFieldEntry, FormFieldWidget, ListBoxWidget,
    PushButtonWidget, RadioButtonGroup, RadioButtonWidget, SubmitFormFlags, TextAlignment,
    TextFieldFlags, TextFieldWidget,
};
pub use graphics_state::{ExtGStateBuilder, SoftMask, SoftMaskSubtype};
pub use object_serializer::ObjectSerializer;
pub use pdf_writer::{PageBuilder, PdfWriter, PdfWriterConfig};

use crate::elements::ContentElement;
use crate::error::Result;

/// Trait for building content streams from elements.
///
/// Content streams contain the PDF operators that render content on a page.
pub trait ContentBuilder: Send + Sync {
    /// Build a content stream from elements.
    fn build(&self, elements: &[ContentElement]) -> Result<Vec<u8>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_module_exports() {
        // Verify key types are exported
        let _serializer = ObjectSerializer::new();
        let _builder = ContentStreamBuilder::new();
    }
}
