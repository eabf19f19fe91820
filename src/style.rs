//! Style model applied to cells through the facade.
//!
//! One composed [`CellStyle`] value object with a descriptor per concern
//! (font, fill, borders, alignment, protection, number format). Every field
//! is optional; only the populated parts touch the backing style, so a
//! partially-filled value behaves like a patch.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use strum::EnumString;
use umya_spreadsheet::structs::{HorizontalAlignmentValues, VerticalAlignmentValues};
use umya_spreadsheet::{PatternValues, Style};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CellStyle {
    pub font: Option<FontSpec>,
    pub fill: Option<FillSpec>,
    pub borders: Option<BorderSpec>,
    pub alignment: Option<AlignmentSpec>,
    pub protection: Option<ProtectionSpec>,
    pub number_format: Option<String>,
}

impl CellStyle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn font_mut(&mut self) -> &mut FontSpec {
        self.font.get_or_insert_with(Default::default)
    }

    pub fn fill_mut(&mut self) -> &mut FillSpec {
        self.fill.get_or_insert_with(Default::default)
    }

    pub fn borders_mut(&mut self) -> &mut BorderSpec {
        self.borders.get_or_insert_with(Default::default)
    }

    pub fn alignment_mut(&mut self) -> &mut AlignmentSpec {
        self.alignment.get_or_insert_with(Default::default)
    }

    pub fn protection_mut(&mut self) -> &mut ProtectionSpec {
        self.protection.get_or_insert_with(Default::default)
    }

    pub fn set_number_format(&mut self, code: impl Into<String>) -> &mut Self {
        self.number_format = Some(code.into());
        self
    }

    /// Writes the populated parts of this value into a backing style.
    pub(crate) fn apply_to(&self, target: &mut Style) {
        if let Some(font) = &self.font {
            font.apply_to(target);
        }
        if let Some(fill) = &self.fill {
            fill.apply_to(target);
        }
        if let Some(borders) = &self.borders {
            borders.apply_to(target);
        }
        if let Some(alignment) = &self.alignment {
            alignment.apply_to(target);
        }
        if let Some(protection) = &self.protection {
            protection.apply_to(target);
        }
        if let Some(code) = &self.number_format {
            target.get_number_format_mut().set_format_code(code.as_str());
        }
    }
}

/// Short content-derived fingerprint, stable across equal style values.
pub fn stable_style_id(style: &CellStyle) -> String {
    let bytes = serde_json::to_vec(style).unwrap_or_default();
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    let digest = hasher.finalize();
    let hex = format!("{digest:x}");
    hex.chars().take(12).collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColorSpec {
    argb: String,
}

impl ColorSpec {
    pub fn from_rgb(r: u8, g: u8, b: u8) -> Self {
        Self {
            argb: format!("FF{r:02X}{g:02X}{b:02X}"),
        }
    }

    pub fn from_argb(argb: impl Into<String>) -> Self {
        Self { argb: argb.into() }
    }

    pub fn argb(&self) -> &str {
        &self.argb
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FontSpec {
    pub name: Option<String>,
    pub size: Option<f64>,
    pub bold: Option<bool>,
    pub italic: Option<bool>,
    pub underline: Option<UnderlineStyle>,
    pub strikethrough: Option<bool>,
    pub color: Option<ColorSpec>,
}

impl FontSpec {
    pub fn set_bold(&mut self, bold: bool) -> &mut Self {
        self.bold = Some(bold);
        self
    }

    pub fn set_italic(&mut self, italic: bool) -> &mut Self {
        self.italic = Some(italic);
        self
    }

    pub fn set_size(&mut self, size: f64) -> &mut Self {
        self.size = Some(size);
        self
    }

    pub fn set_color(&mut self, color: ColorSpec) -> &mut Self {
        self.color = Some(color);
        self
    }

    fn apply_to(&self, target: &mut Style) {
        let font = target.get_font_mut();
        if let Some(name) = &self.name {
            font.set_name(name.as_str());
        }
        if let Some(size) = self.size {
            font.set_size(size);
        }
        if let Some(bold) = self.bold {
            font.set_bold(bold);
        }
        if let Some(italic) = self.italic {
            font.set_italic(italic);
        }
        if let Some(underline) = self.underline {
            font.set_underline(underline.ooxml_name());
        }
        if let Some(strikethrough) = self.strikethrough {
            font.set_strikethrough(strikethrough);
        }
        if let Some(color) = &self.color {
            font.get_color_mut().set_argb(color.argb());
        }
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumString, strum::Display,
)]
#[strum(ascii_case_insensitive)]
pub enum UnderlineStyle {
    None,
    Single,
    Double,
}

impl UnderlineStyle {
    fn ooxml_name(self) -> &'static str {
        match self {
            UnderlineStyle::None => "none",
            UnderlineStyle::Single => "single",
            UnderlineStyle::Double => "double",
        }
    }
}

/// Solid background fill. Excel stores a solid fill's visible color as the
/// pattern foreground.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FillSpec {
    pub background: Option<ColorSpec>,
}

impl FillSpec {
    pub fn set_background(&mut self, color: ColorSpec) -> &mut Self {
        self.background = Some(color);
        self
    }

    fn apply_to(&self, target: &mut Style) {
        if let Some(color) = &self.background {
            target
                .get_fill_mut()
                .get_pattern_fill_mut()
                .set_pattern_type(PatternValues::Solid)
                .get_foreground_color_mut()
                .set_argb(color.argb());
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BorderSpec {
    pub top: Option<BorderEdge>,
    pub bottom: Option<BorderEdge>,
    pub left: Option<BorderEdge>,
    pub right: Option<BorderEdge>,
    pub diagonal: Option<BorderEdge>,
    pub diagonal_up: Option<bool>,
    pub diagonal_down: Option<bool>,
}

impl BorderSpec {
    fn apply_to(&self, target: &mut Style) {
        let borders = target.get_borders_mut();
        if let Some(edge) = &self.top {
            edge.apply_to(borders.get_top_border_mut());
        }
        if let Some(edge) = &self.bottom {
            edge.apply_to(borders.get_bottom_border_mut());
        }
        if let Some(edge) = &self.left {
            edge.apply_to(borders.get_left_border_mut());
        }
        if let Some(edge) = &self.right {
            edge.apply_to(borders.get_right_border_mut());
        }
        if let Some(edge) = &self.diagonal {
            edge.apply_to(borders.get_diagonal_border_mut());
        }
        if let Some(up) = self.diagonal_up {
            borders.set_diagonal_up(up);
        }
        if let Some(down) = self.diagonal_down {
            borders.set_diagonal_down(down);
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BorderEdge {
    pub line: BorderLine,
    pub color: Option<ColorSpec>,
}

impl BorderEdge {
    pub fn new(line: BorderLine) -> Self {
        Self { line, color: None }
    }

    pub fn colored(line: BorderLine, color: ColorSpec) -> Self {
        Self {
            line,
            color: Some(color),
        }
    }

    fn apply_to(&self, border: &mut umya_spreadsheet::Border) {
        border.set_border_style(self.line.ooxml_name());
        if let Some(color) = &self.color {
            border.get_color_mut().set_argb(color.argb());
        }
    }
}

/// Border line styles, parseable from their OOXML names in any case
/// (`"THICK".parse()` works).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumString, strum::Display,
)]
#[strum(ascii_case_insensitive)]
pub enum BorderLine {
    None,
    Thin,
    Medium,
    Thick,
    Dashed,
    Dotted,
    Double,
    Hair,
    MediumDashed,
    DashDot,
    MediumDashDot,
    DashDotDot,
    MediumDashDotDot,
    SlantDashDot,
}

impl BorderLine {
    fn ooxml_name(self) -> &'static str {
        match self {
            BorderLine::None => "none",
            BorderLine::Thin => "thin",
            BorderLine::Medium => "medium",
            BorderLine::Thick => "thick",
            BorderLine::Dashed => "dashed",
            BorderLine::Dotted => "dotted",
            BorderLine::Double => "double",
            BorderLine::Hair => "hair",
            BorderLine::MediumDashed => "mediumDashed",
            BorderLine::DashDot => "dashDot",
            BorderLine::MediumDashDot => "mediumDashDot",
            BorderLine::DashDotDot => "dashDotDot",
            BorderLine::MediumDashDotDot => "mediumDashDotDot",
            BorderLine::SlantDashDot => "slantDashDot",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AlignmentSpec {
    pub horizontal: Option<HorizontalAlign>,
    pub vertical: Option<VerticalAlign>,
    pub wrap_text: Option<bool>,
    pub text_rotation: Option<u32>,
}

impl AlignmentSpec {
    pub fn set_horizontal(&mut self, align: HorizontalAlign) -> &mut Self {
        self.horizontal = Some(align);
        self
    }

    pub fn set_vertical(&mut self, align: VerticalAlign) -> &mut Self {
        self.vertical = Some(align);
        self
    }

    pub fn set_wrap_text(&mut self, wrap: bool) -> &mut Self {
        self.wrap_text = Some(wrap);
        self
    }

    pub fn set_text_rotation(&mut self, rotation: u32) -> &mut Self {
        self.text_rotation = Some(rotation);
        self
    }

    fn apply_to(&self, target: &mut Style) {
        let alignment = target.get_alignment_mut();
        if let Some(horizontal) = self.horizontal {
            alignment.set_horizontal(horizontal.to_backend());
        }
        if let Some(vertical) = self.vertical {
            alignment.set_vertical(vertical.to_backend());
        }
        if let Some(wrap) = self.wrap_text {
            alignment.set_wrap_text(wrap);
        }
        if let Some(rotation) = self.text_rotation {
            alignment.set_text_rotation(rotation);
        }
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumString, strum::Display,
)]
#[strum(ascii_case_insensitive)]
pub enum HorizontalAlign {
    General,
    Left,
    Center,
    Right,
    Fill,
    Justify,
    Distributed,
}

impl HorizontalAlign {
    fn to_backend(self) -> HorizontalAlignmentValues {
        match self {
            HorizontalAlign::General => HorizontalAlignmentValues::General,
            HorizontalAlign::Left => HorizontalAlignmentValues::Left,
            HorizontalAlign::Center => HorizontalAlignmentValues::Center,
            HorizontalAlign::Right => HorizontalAlignmentValues::Right,
            HorizontalAlign::Fill => HorizontalAlignmentValues::Fill,
            HorizontalAlign::Justify => HorizontalAlignmentValues::Justify,
            HorizontalAlign::Distributed => HorizontalAlignmentValues::Distributed,
        }
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumString, strum::Display,
)]
#[strum(ascii_case_insensitive)]
pub enum VerticalAlign {
    Top,
    #[strum(serialize = "Center", serialize = "Middle")]
    Center,
    Bottom,
    Justify,
    Distributed,
}

impl VerticalAlign {
    fn to_backend(self) -> VerticalAlignmentValues {
        match self {
            VerticalAlign::Top => VerticalAlignmentValues::Top,
            VerticalAlign::Center => VerticalAlignmentValues::Center,
            VerticalAlign::Bottom => VerticalAlignmentValues::Bottom,
            VerticalAlign::Justify => VerticalAlignmentValues::Justify,
            VerticalAlign::Distributed => VerticalAlignmentValues::Distributed,
        }
    }
}

/// Cell-level lock/hide flags honored when the owning sheet is protected.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtectionSpec {
    pub locked: Option<bool>,
    pub hidden: Option<bool>,
}

impl ProtectionSpec {
    fn apply_to(&self, target: &mut Style) {
        let protection = target.get_protection_mut();
        if let Some(locked) = self.locked {
            protection.set_locked(locked);
        }
        if let Some(hidden) = self.hidden {
            protection.set_hidden(hidden);
        }
    }
}
