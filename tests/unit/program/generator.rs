use super::*;
use crate::{
    extract::points::{FeaturePoint, PointSet},
    foundation::config::RenderConfig,
    weave::builder::{WeaveSegment, WeaveSegments},
};

fn bundled() -> EffectTemplate {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("templates/woven_glow.html");
    EffectTemplate::load(&path).unwrap()
}

fn data() -> EffectData {
    let points = PointSet::new(
        40,
        30,
        vec![
            FeaturePoint { x: 2, y: 15, nx: 0.0, ny: 1.0, mag: 200 },
            FeaturePoint { x: 38, y: 15, nx: 0.0, ny: 1.0, mag: 100 },
        ],
    );
    let segments = WeaveSegments::from_vec(vec![WeaveSegment {
        from: 0,
        to: 1,
        phase: 0.5,
        delay: 0.25,
        weight: 0.75,
    }]);
    EffectData::new(points, segments, 7).unwrap()
}

#[test]
fn embeds_data_style_and_viewport() {
    let viewport = RenderConfig::default().viewport();
    let program =
        EffectProgram::generate(&bundled(), data(), StyleParams::default(), viewport).unwrap();

    let src = program.source();
    assert!(!src.contains("/*@"));
    assert!(src.contains(&data().to_json().unwrap()));
    assert!(src.contains(r#""width":800,"height":800,"dpr":2.0,"transparent":false"#));
    assert!(src.contains(r#""color":[120,220,255]"#));
    assert_eq!(program.template_version(), Some("woven-glow/1"));
    assert_eq!(program.data(), &data());
    assert_eq!(program.viewport(), viewport);
}

#[test]
fn generation_is_deterministic() {
    let vp = RenderConfig::default().viewport();
    let a = EffectProgram::generate(&bundled(), data(), StyleParams::default(), vp).unwrap();
    let b = EffectProgram::generate(&bundled(), data(), StyleParams::default(), vp).unwrap();
    assert_eq!(a.source(), b.source());
}

#[test]
fn timeline_comes_from_embedded_data() {
    let vp = RenderConfig::default().viewport();
    let program = EffectProgram::generate(&bundled(), data(), StyleParams::default(), vp).unwrap();
    let t = program.timeline();
    assert!((t.duration_seconds - (0.25 + 1.6 + 1.0)).abs() < 1e-6);
}

#[test]
fn invalid_style_is_rejected() {
    let style = StyleParams {
        strand_seconds: 0.0,
        ..StyleParams::default()
    };
    let err = EffectProgram::generate(
        &bundled(),
        data(),
        style,
        RenderConfig::default().viewport(),
    )
    .unwrap_err();
    assert!(matches!(err, WovenError::Config { .. }));
}

#[test]
fn write_outputs_the_source() {
    let dir = std::path::PathBuf::from("target").join("wovenglow-unit").join("generator");
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("woven_glow.html");
    let vp = RenderConfig::default().viewport();
    let program = EffectProgram::generate(&bundled(), data(), StyleParams::default(), vp).unwrap();
    program.write(&path).unwrap();
    assert_eq!(std::fs::read_to_string(&path).unwrap(), program.source());
}

#[test]
fn data_slot_is_the_artifact_text_verbatim() {
    let points = PointSet::new(
        10,
        10,
        vec![
            FeaturePoint { x: 1, y: 1, nx: 0.1, ny: 0.995, mag: 100 },
            FeaturePoint { x: 8, y: 1, nx: -0.7, ny: 0.3, mag: 90 },
        ],
    );
    let segments = WeaveSegments::from_vec(vec![WeaveSegment {
        from: 0,
        to: 1,
        phase: 0.1,
        delay: 0.3,
        weight: 0.9,
    }]);
    let data = EffectData::new(points, segments, 3).unwrap();
    let artifact = data.to_json().unwrap();
    assert!(artifact.starts_with(r#"{"version":1,"w":10,"h":10,"seed":3,"points":"#));

    let vp = RenderConfig::default().viewport();
    let program = EffectProgram::generate(&bundled(), data, StyleParams::default(), vp).unwrap();
    let src = program.source();
    assert!(src.contains(&artifact));
    assert!(!src.contains("0.10000000149011612"));
    assert!(src.contains(r#""width":800,"height":800"#));
}
