use super::*;

const MINIMAL: &str =
    "<script>/*@template t/1@*/const D = /*@slot data@*/; const S = /*@slot style@*/; const V = /*@slot viewport@*/;</script>";

fn fill_names(slot: Slot) -> WovenResult<String> {
    Ok(format!("\"{}\"", slot.name()))
}

#[test]
fn parses_slots_and_version() {
    let t = EffectTemplate::parse(MINIMAL).unwrap();
    assert_eq!(t.version(), Some("t/1"));
    for slot in Slot::REQUIRED {
        assert!(t.has_slot(slot));
    }
}

#[test]
fn render_replaces_slots_and_keeps_literal_text() {
    let t = EffectTemplate::parse(MINIMAL).unwrap();
    let out = t.render(fill_names).unwrap();
    assert_eq!(
        out,
        "<script>const D = \"data\"; const S = \"style\"; const V = \"viewport\";</script>"
    );
}

#[test]
fn render_escapes_script_close() {
    let t = EffectTemplate::parse(MINIMAL).unwrap();
    let out = t
        .render(|slot| {
            Ok(match slot {
                Slot::Data => serde_json::json!({ "x": "</script><b>" }).to_string(),
                _ => "null".to_string(),
            })
        })
        .unwrap();
    assert!(!out.contains("</script><b>"));
    assert!(out.contains(r#"{"x":"<\/script><b>"}"#));
}

#[test]
fn missing_required_slot_names_the_marker() {
    let src = "/*@slot data@*/ /*@slot style@*/";
    let err = EffectTemplate::parse(src).unwrap_err();
    match err {
        WovenError::Template { marker, .. } => assert_eq!(marker, "/*@slot viewport@*/"),
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn malformed_markers_are_template_errors() {
    let unknown = format!("{MINIMAL}/*@slot colors@*/");
    let err = EffectTemplate::parse(&unknown).unwrap_err();
    assert!(err.to_string().contains("/*@slot colors@*/"));

    let unterminated = format!("{MINIMAL}/*@slot data");
    assert!(matches!(
        EffectTemplate::parse(&unterminated).unwrap_err(),
        WovenError::Template { .. }
    ));

    let directive = format!("{MINIMAL}/*@include x@*/");
    assert!(EffectTemplate::parse(&directive).is_err());

    let twice = format!("/*@template a@*/{MINIMAL}");
    assert!(EffectTemplate::parse(&twice).is_err());
}

#[test]
fn plain_comments_are_literal_text() {
    let src = format!("/* a normal comment */{MINIMAL}");
    let t = EffectTemplate::parse(&src).unwrap();
    assert!(t.render(fill_names).unwrap().starts_with("/* a normal comment */"));
}

#[test]
fn bundled_template_parses() {
    let path = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("templates/woven_glow.html");
    let t = EffectTemplate::load(&path).unwrap();
    assert_eq!(t.version(), Some(crate::program::style::STYLE_VERSION));
}

#[test]
fn unreadable_template_is_a_config_error() {
    let err = EffectTemplate::load(Path::new("target/no-such-template.html")).unwrap_err();
    assert!(matches!(err, WovenError::Config { stage: Stage::Program, .. }));
}

#[test]
fn render_embeds_slot_text_unchanged() {
    let t = EffectTemplate::parse(MINIMAL).unwrap();
    let out = t
        .render(|slot| {
            Ok(match slot {
                Slot::Data => r#"{"version":1,"w":10,"nx":0.1}"#.to_string(),
                _ => "{}".to_string(),
            })
        })
        .unwrap();
    assert!(out.contains(r#"const D = {"version":1,"w":10,"nx":0.1};"#));
}
