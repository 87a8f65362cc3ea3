//! Rendering templates with named insertion points.
//!
//! A template is plain program text containing markers of the form `/*@slot NAME@*/`
//! (an insertion point) and optionally one `/*@template VERSION@*/` header. Parsing
//! splits the text into literal runs and slots; rendering only ever replaces slots, the
//! literal text passes through unchanged.

use std::path::Path;

use crate::foundation::error::{Stage, WovenError, WovenResult};

const OPEN: &str = "/*@";
const CLOSE: &str = "@*/";

/// A named insertion point.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Slot {
    /// The data artifact (points and segments).
    Data,
    /// [`crate::StyleParams`].
    Style,
    /// [`crate::Viewport`].
    Viewport,
}

impl Slot {
    /// Slots every template must contain.
    pub const REQUIRED: [Slot; 3] = [Slot::Data, Slot::Style, Slot::Viewport];

    /// Name used in `/*@slot NAME@*/`.
    pub fn name(self) -> &'static str {
        match self {
            Self::Data => "data",
            Self::Style => "style",
            Self::Viewport => "viewport",
        }
    }

    /// The marker text as it appears in a template.
    pub fn marker(self) -> String {
        format!("{OPEN}slot {}{CLOSE}", self.name())
    }

    fn parse(name: &str) -> Option<Self> {
        match name {
            "data" => Some(Self::Data),
            "style" => Some(Self::Style),
            "viewport" => Some(Self::Viewport),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
enum Part {
    Text(String),
    Slot(Slot),
}

/// A parsed template.
#[derive(Clone, Debug, PartialEq)]
pub struct EffectTemplate {
    version: Option<String>,
    parts: Vec<Part>,
}

impl EffectTemplate {
    /// Parse template text, checking that every required slot is present.
    pub fn parse(source: &str) -> WovenResult<Self> {
        let mut parts = Vec::new();
        let mut version = None;
        let mut rest = source;

        while let Some(start) = rest.find(OPEN) {
            let after_open = &rest[start + OPEN.len()..];
            let Some(len) = after_open.find(CLOSE) else {
                let snippet: String = rest[start..].chars().take(32).collect();
                return Err(WovenError::template(snippet, "unterminated marker"));
            };
            let body = after_open[..len].trim();
            let marker = format!("{OPEN}{body}{CLOSE}");

            if start > 0 {
                parts.push(Part::Text(rest[..start].to_string()));
            }

            match body.split_once(char::is_whitespace) {
                Some(("slot", name)) => {
                    let slot = Slot::parse(name.trim())
                        .ok_or_else(|| WovenError::template(&marker, "unknown slot name"))?;
                    parts.push(Part::Slot(slot));
                }
                Some(("template", v)) => {
                    if version.is_some() {
                        return Err(WovenError::template(
                            &marker,
                            "template version declared twice",
                        ));
                    }
                    version = Some(v.trim().to_string());
                }
                _ => return Err(WovenError::template(&marker, "unknown marker directive")),
            }

            rest = &after_open[len + CLOSE.len()..];
        }
        if !rest.is_empty() {
            parts.push(Part::Text(rest.to_string()));
        }

        let template = Self { version, parts };
        for slot in Slot::REQUIRED {
            if !template.has_slot(slot) {
                return Err(WovenError::template(
                    slot.marker(),
                    "required insertion marker is missing",
                ));
            }
        }
        Ok(template)
    }

    /// Read and parse a template file.
    ///
    /// A missing or unreadable file is a configuration problem, not a template defect.
    pub fn load(path: &Path) -> WovenResult<Self> {
        let source = std::fs::read_to_string(path).map_err(|e| {
            WovenError::config(
                Stage::Program,
                format!("template_source '{}' cannot be read: {e}", path.display()),
            )
        })?;
        Self::parse(&source)
    }

    /// Declared `/*@template VERSION@*/`, if any.
    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    /// Whether `slot` occurs at least once.
    pub fn has_slot(&self, slot: Slot) -> bool {
        self.parts.iter().any(|p| *p == Part::Slot(slot))
    }

    /// Render the template, filling each slot with the JSON text `fill` returns for it.
    ///
    /// The text is embedded as is, except that `</` is escaped so it cannot close an
    /// enclosing `<script>` element.
    pub fn render(
        &self,
        mut fill: impl FnMut(Slot) -> WovenResult<String>,
    ) -> WovenResult<String> {
        let mut out = String::new();
        for part in &self.parts {
            match part {
                Part::Text(t) => out.push_str(t),
                Part::Slot(slot) => {
                    let json = fill(*slot)?;
                    out.push_str(&json.replace("</", "<\\/"));
                }
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/program/template.rs"]
mod tests;
