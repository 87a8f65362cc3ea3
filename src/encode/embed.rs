use std::path::Path;

use anyhow::Context as _;
use base64::Engine as _;

use crate::foundation::error::{Stage, WovenError, WovenResult};

/// Self-playing HTML page carrying `video` as a base64 data URI.
///
/// The page references nothing external. Its background is transparent when
/// `transparent`, black otherwise. Identical bytes give an identical document.
pub fn embed_document(video: &[u8], transparent: bool) -> String {
    let b64 = base64::engine::general_purpose::STANDARD.encode(video);
    let background = if transparent { "transparent" } else { "#000" };
    format!(
        "<!doctype html>\n\
         <html lang=\"en\">\n\
         <head>\n\
         <meta charset=\"utf-8\" />\n\
         <meta name=\"viewport\" content=\"width=device-width, initial-scale=1\" />\n\
         <title>woven glow</title>\n\
         <style>html,body{{height:100%;margin:0;background:{background}}}\
         body{{display:flex;align-items:center;justify-content:center}}\
         video{{max-width:100%;max-height:100%}}</style>\n\
         </head>\n\
         <body>\n\
         <video autoplay loop muted playsinline src=\"data:video/webm;base64,{b64}\"></video>\n\
         </body>\n\
         </html>\n"
    )
}

/// Read the encoded video at `video_path` and write its embed document to `out_path`.
#[tracing::instrument(fields(video = %video_path.display(), out = %out_path.display()))]
pub fn write_embed(video_path: &Path, out_path: &Path, transparent: bool) -> WovenResult<()> {
    let bytes = std::fs::read(video_path).map_err(|e| {
        WovenError::input(
            Stage::Embed,
            format!("cannot read video '{}': {e}", video_path.display()),
        )
    })?;
    if bytes.is_empty() {
        return Err(WovenError::input(
            Stage::Embed,
            format!("video '{}' is empty", video_path.display()),
        ));
    }
    let doc = embed_document(&bytes, transparent);
    std::fs::write(out_path, doc)
        .with_context(|| format!("write embed '{}'", out_path.display()))?;
    tracing::info!(bytes = bytes.len(), "wrote embed document");
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/encode/embed.rs"]
mod tests;
