use std::{path::Path, sync::Arc};

use anyhow::Context as _;

use crate::{
    foundation::config::Viewport,
    foundation::error::{WovenError, WovenResult},
    program::{
        data::EffectData,
        style::{StyleParams, Timeline},
        template::{EffectTemplate, Slot},
    },
};

/// A concrete, self-contained rendering program.
///
/// Holds the rendered template source together with the immutable data, style and
/// viewport that were embedded into it. Hosts replay the program from these embedded
/// values only.
#[derive(Clone, Debug)]
pub struct EffectProgram {
    source: String,
    template_version: Option<String>,
    data: Arc<EffectData>,
    style: StyleParams,
    viewport: Viewport,
}

impl EffectProgram {
    /// Embed `data`, `style` and `viewport` into `template`.
    #[tracing::instrument(skip_all, fields(points = data.points().len(), segments = data.segments().len()))]
    pub fn generate(
        template: &EffectTemplate,
        data: EffectData,
        style: StyleParams,
        viewport: Viewport,
    ) -> WovenResult<Self> {
        style.validate()?;

        // The data slot is the artifact text itself.
        let source = template.render(|slot| match slot {
            Slot::Data => data.to_json(),
            Slot::Style => encode_slot(slot, &style),
            Slot::Viewport => encode_slot(slot, &viewport),
        })?;

        Ok(Self {
            source,
            template_version: template.version().map(str::to_string),
            data: Arc::new(data),
            style,
            viewport,
        })
    }

    /// The rendered program text.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Version declared by the template, if any.
    pub fn template_version(&self) -> Option<&str> {
        self.template_version.as_deref()
    }

    /// The embedded data.
    pub fn data(&self) -> &EffectData {
        &self.data
    }

    /// The embedded style.
    pub fn style(&self) -> &StyleParams {
        &self.style
    }

    /// Viewport the program was generated for.
    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    /// Natural length of this program.
    pub fn timeline(&self) -> Timeline {
        Timeline::of(&self.data, &self.style)
    }

    /// Write the rendered source to `path`.
    pub fn write(&self, path: &Path) -> WovenResult<()> {
        std::fs::write(path, &self.source)
            .with_context(|| format!("write program '{}'", path.display()))?;
        Ok(())
    }
}

fn encode_slot<T: serde::Serialize>(slot: Slot, value: &T) -> WovenResult<String> {
    serde_json::to_string(value)
        .map_err(|e| WovenError::serde(format!("encode slot `{}`: {e}", slot.name())))
}

#[cfg(test)]
#[path = "../../tests/unit/program/generator.rs"]
mod tests;
