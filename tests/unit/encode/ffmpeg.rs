use super::*;

fn cfg(lossless: bool, alpha: bool) -> EncodeConfig {
    EncodeConfig {
        fps: 30,
        lossless,
        alpha,
        out_path: PathBuf::from("target/out.webm"),
    }
}

const VP9: EncoderCaps = EncoderCaps { vp9: true };
const NO_VP9: EncoderCaps = EncoderCaps { vp9: false };

#[test]
fn profiles_follow_lossless_and_alpha() {
    let p = plan_profile(&cfg(false, false), false, VP9).unwrap();
    assert_eq!(
        p.codec_args(),
        vec!["-c:v", "libvpx-vp9", "-b:v", "0", "-crf", "18", "-row-mt", "1", "-pix_fmt", "yuv444p"]
    );

    let p = plan_profile(&cfg(true, false), false, VP9).unwrap();
    assert_eq!(
        p.codec_args(),
        vec!["-c:v", "libvpx-vp9", "-lossless", "1", "-pix_fmt", "gbrp"]
    );

    let p = plan_profile(&cfg(true, true), true, VP9).unwrap();
    assert_eq!(
        p.codec_args(),
        vec![
            "-c:v",
            "libvpx-vp9",
            "-lossless",
            "1",
            "-pix_fmt",
            "yuva420p",
            "-metadata:s:v:0",
            "alpha_mode=1",
            "-auto-alt-ref",
            "0"
        ]
    );
}

#[test]
fn alpha_without_alpha_frames_is_a_config_error() {
    let err = plan_profile(&cfg(false, true), false, VP9).unwrap_err();
    assert!(matches!(err, WovenError::Config { stage: Stage::Encode, .. }));
}

#[test]
fn missing_vp9_depends_on_alpha() {
    let err = plan_profile(&cfg(false, true), true, NO_VP9).unwrap_err();
    assert!(matches!(err, WovenError::Config { stage: Stage::Encode, .. }));

    let err = plan_profile(&cfg(false, false), false, NO_VP9).unwrap_err();
    assert!(matches!(err, WovenError::EncodingUnavailable(_)));
    assert!(!err.is_fatal());
}

#[test]
fn args_read_the_numbered_sequence() {
    let profile = EncodeProfile {
        lossless: false,
        alpha: false,
    };
    let args = build_args(
        profile,
        Path::new("out/frames/frame_%05d.png"),
        24,
        Path::new("out/v.webm.partial"),
    );
    let args: Vec<String> = args.iter().map(|a| a.to_string_lossy().into_owned()).collect();
    let pos = |s: &str| args.iter().position(|a| a == s).unwrap();
    assert_eq!(args[pos("-framerate") + 1], "24");
    assert_eq!(args[pos("-start_number") + 1], "0");
    assert_eq!(args[pos("-i") + 1], "out/frames/frame_%05d.png");
    assert_eq!(args[pos("-f") + 1], "webm");
    assert_eq!(args.last().unwrap(), "out/v.webm.partial");
    assert!(pos("-i") < pos("-c:v"));
}

#[test]
fn encoder_listing_is_parsed() {
    let listing = "Encoders:\n V..... = Video\n ------\n V....D libx264              libx264 H.264\n V....D libvpx-vp9           libvpx VP9 (codec vp9)\n";
    assert!(parse_encoder_caps(listing).vp9);
    assert!(!parse_encoder_caps(" V....D libvpx               libvpx VP8\n").vp9);
}

#[test]
fn partial_path_appends_suffix() {
    assert_eq!(
        partial_path(Path::new("out/woven_glow.webm")),
        PathBuf::from("out/woven_glow.webm.partial")
    );
}

#[test]
fn unrunnable_ffmpeg_is_unavailable() {
    let settings = EncoderSettings {
        ffmpeg: Some(PathBuf::from("target/definitely-not-ffmpeg")),
        ffprobe: None,
    };
    let err = VideoAssembler::locate(&settings).unwrap_err();
    assert!(matches!(err, WovenError::EncodingUnavailable(_)));
}

#[test]
fn explicit_settings_win() {
    let settings = EncoderSettings {
        ffmpeg: Some(PathBuf::from("/opt/ff/ffmpeg")),
        ffprobe: Some(PathBuf::from("/opt/ff/ffprobe")),
    };
    assert_eq!(settings.ffmpeg_program(), PathBuf::from("/opt/ff/ffmpeg"));
    assert_eq!(settings.ffprobe_program(), PathBuf::from("/opt/ff/ffprobe"));
}

#[cfg(unix)]
mod fake_tools {
    use std::os::unix::fs::PermissionsExt as _;

    use super::*;
    use crate::foundation::core::FrameRGBA;

    fn scratch(name: &str) -> PathBuf {
        let dir = PathBuf::from("target")
            .join("wovenglow-unit")
            .join("ffmpeg")
            .join(name);
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn script(dir: &Path, name: &str, body: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        let mut perms = std::fs::metadata(&path).unwrap().permissions();
        perms.set_mode(0o755);
        std::fs::set_permissions(&path, perms).unwrap();
        std::fs::canonicalize(path).unwrap()
    }

    /// A fake ffmpeg that lists `encoders` and, when encoding, writes `payload` to its
    /// last argument and exits with `status`.
    fn fake_ffmpeg(dir: &Path, encoders: &str, status: i32) -> PathBuf {
        let body = format!(
            "case \"$*\" in\n  *-encoders*) echo ' V....D {encoders}'; exit 0 ;;\n  *-framerate*) for last; do :; done; echo webm > \"$last\"; exit {status} ;;\nesac\nexit 0"
        );
        script(dir, "ffmpeg", &body)
    }

    fn sequence(dir: &Path, frames: u64, alpha: bool) -> CapturedSequence {
        let frames_dir = dir.join("frames");
        std::fs::create_dir_all(&frames_dir).unwrap();
        let seq = CapturedSequence {
            dir: frames_dir,
            frame_count: frames,
            width: 2,
            height: 2,
            fps: 30,
            has_alpha: alpha,
            pad: 5,
        };
        let frame = FrameRGBA {
            width: 2,
            height: 2,
            data: vec![10, 20, 30, 255].repeat(4),
            premultiplied: true,
        };
        for i in 0..frames {
            crate::capture::session::write_frame_png(&seq.frame_path(FrameIndex(i)), &frame, alpha)
                .unwrap();
        }
        seq
    }

    #[test]
    fn alpha_frames_missing_is_reported_before_locating_ffmpeg() {
        let dir = scratch("alpha-frames");
        let seq = sequence(&dir, 1, false);
        let settings = EncoderSettings {
            ffmpeg: Some(dir.join("missing-ffmpeg")),
            ffprobe: None,
        };
        let encode = EncodeConfig {
            out_path: dir.join("v.webm"),
            ..cfg(false, true)
        };
        let err = encode_sequence(&settings, &seq, &encode).unwrap_err();
        assert!(matches!(err, WovenError::Config { stage: Stage::Encode, .. }));
    }

    #[test]
    fn alpha_without_vp9_leaves_no_video() {
        let dir = scratch("no-vp9");
        let seq = sequence(&dir, 2, true);
        let settings = EncoderSettings {
            ffmpeg: Some(fake_ffmpeg(&dir, "libx264 H.264", 0)),
            ffprobe: Some(dir.join("missing-ffprobe")),
        };
        let encode = EncodeConfig {
            out_path: dir.join("v.webm"),
            ..cfg(false, true)
        };
        let err = encode_sequence(&settings, &seq, &encode).unwrap_err();
        assert!(matches!(err, WovenError::Config { stage: Stage::Encode, .. }));
        assert!(!dir.join("v.webm").exists());
        assert!(!dir.join("v.webm.partial").exists());
    }

    #[test]
    fn failed_encode_removes_partial_output() {
        let dir = scratch("fails");
        let seq = sequence(&dir, 2, false);
        let settings = EncoderSettings {
            ffmpeg: Some(fake_ffmpeg(&dir, "libvpx-vp9 VP9", 1)),
            ffprobe: Some(dir.join("missing-ffprobe")),
        };
        let encode = EncodeConfig {
            out_path: dir.join("v.webm"),
            ..cfg(false, false)
        };
        let err = encode_sequence(&settings, &seq, &encode).unwrap_err();
        assert!(matches!(err, WovenError::Encoding(_)));
        assert!(!dir.join("v.webm").exists());
        assert!(!dir.join("v.webm.partial").exists());
    }

    #[test]
    fn frame_count_mismatch_is_an_encoding_error() {
        let dir = scratch("mismatch");
        let seq = sequence(&dir, 2, false);
        let settings = EncoderSettings {
            ffmpeg: Some(fake_ffmpeg(&dir, "libvpx-vp9 VP9", 0)),
            ffprobe: Some(script(&dir, "ffprobe", "echo 3")),
        };
        let encode = EncodeConfig {
            out_path: dir.join("v.webm"),
            ..cfg(false, false)
        };
        let err = encode_sequence(&settings, &seq, &encode).unwrap_err();
        assert!(err.to_string().contains("encoded 3 frames but captured 2"));
        assert!(!dir.join("v.webm").exists());
    }

    #[test]
    fn successful_encode_is_promoted() {
        let dir = scratch("ok");
        let seq = sequence(&dir, 2, false);
        let settings = EncoderSettings {
            ffmpeg: Some(fake_ffmpeg(&dir, "libvpx-vp9 VP9", 0)),
            ffprobe: Some(script(&dir, "ffprobe", "echo 2")),
        };
        let encode = EncodeConfig {
            out_path: dir.join("v.webm"),
            ..cfg(true, false)
        };
        let out = encode_sequence(&settings, &seq, &encode).unwrap();
        assert_eq!(out, dir.join("v.webm"));
        assert_eq!(std::fs::read_to_string(&out).unwrap(), "webm\n");
        assert!(!dir.join("v.webm.partial").exists());
    }
}
