use crate::options::{STDIO_MARKER, default_output_path, resolve_format};
use crate::*;
use serde_json::json;
use std::fs;
use std::path::{Path, PathBuf};

fn input_in(dir: &Path) -> PathBuf {
    let input = dir.join("flow.mmd");
    fs::write(&input, "graph LR; A-->B").unwrap();
    input
}

fn raw_for(input: &Path) -> RawOptions {
    RawOptions {
        input: Some(input.to_path_buf()),
        ..RawOptions::default()
    }
}

#[test]
fn defaults_resolve_to_svg_next_to_the_input() {
    let tmp = tempfile::tempdir().unwrap();
    let input = input_in(tmp.path());

    let req = resolve(raw_for(&input)).unwrap();

    assert_eq!(req.input, InputSource::File(input.clone()));
    assert_eq!(
        req.output,
        OutputTarget::File(tmp.path().join("flow.mmd.svg"))
    );
    assert_eq!(req.format, OutputFormat::Svg);
    assert_eq!(req.theme, Theme::Default);
    assert_eq!((req.width, req.height), (800, 600));
    assert_eq!(req.scale, 1.0);
    assert_eq!(req.background, Background::Color("white".to_string()));
    assert!(req.mermaid_config.is_none());
    assert!(req.css.is_none());
    assert!(req.custom_theme_css.is_none());
    assert_eq!(req.launch, LaunchOptions::default());
}

#[test]
fn viewport_and_theme_are_taken_verbatim() {
    let tmp = tempfile::tempdir().unwrap();
    let input = input_in(tmp.path());

    for theme in [Theme::Default, Theme::Forest, Theme::Dark, Theme::Neutral] {
        for (width, height) in [(1, 1), (800, 600), (1920, 1080), (4096, 17)] {
            let req = resolve(RawOptions {
                theme,
                width,
                height,
                ..raw_for(&input)
            })
            .unwrap();
            assert_eq!(req.theme, theme);
            assert_eq!((req.width, req.height), (width, height));
        }
    }
}

#[test]
fn output_extension_decides_the_format() {
    let tmp = tempfile::tempdir().unwrap();
    let input = input_in(tmp.path());

    for (name, format) in [
        ("chart.png", OutputFormat::Png),
        ("chart.pdf", OutputFormat::Pdf),
        ("chart.svg", OutputFormat::Svg),
        ("CHART.PNG", OutputFormat::Png),
    ] {
        let req = resolve(RawOptions {
            output: Some(tmp.path().join(name)),
            ..raw_for(&input)
        })
        .unwrap();
        assert_eq!(req.format, format, "{name}");
    }
}

#[test]
fn explicit_format_shapes_the_default_output_path() {
    let tmp = tempfile::tempdir().unwrap();
    let input = input_in(tmp.path());

    let req = resolve(RawOptions {
        format: Some(OutputFormat::Png),
        ..raw_for(&input)
    })
    .unwrap();

    assert_eq!(req.format, OutputFormat::Png);
    assert_eq!(
        req.output,
        OutputTarget::File(tmp.path().join("flow.mmd.png"))
    );
}

#[test]
fn explicit_format_must_agree_with_the_output_extension() {
    let tmp = tempfile::tempdir().unwrap();
    let input = input_in(tmp.path());

    let err = resolve(RawOptions {
        format: Some(OutputFormat::Pdf),
        output: Some(tmp.path().join("chart.png")),
        ..raw_for(&input)
    })
    .unwrap_err();

    assert!(matches!(
        err,
        Error::FormatMismatch {
            format: OutputFormat::Pdf,
            ..
        }
    ));
}

#[test]
fn unknown_output_extension_is_rejected() {
    let tmp = tempfile::tempdir().unwrap();
    let input = input_in(tmp.path());

    for name in ["chart.jpg", "chart", "chart.svg.bak"] {
        let err = resolve(RawOptions {
            output: Some(tmp.path().join(name)),
            ..raw_for(&input)
        })
        .unwrap_err();
        assert!(
            matches!(err, Error::InvalidOutputExtension { .. }),
            "{name}: {err}"
        );
        assert_eq!(err.exit_code(), 1);
    }
}

#[test]
fn missing_output_directory_is_rejected() {
    let tmp = tempfile::tempdir().unwrap();
    let input = input_in(tmp.path());
    let missing = tmp.path().join("nope");

    let err = resolve(RawOptions {
        output: Some(missing.join("chart.svg")),
        ..raw_for(&input)
    })
    .unwrap_err();

    match err {
        Error::OutputDirectoryMissing { dir } => assert_eq!(dir, missing),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn bare_output_file_name_uses_the_current_directory() {
    let tmp = tempfile::tempdir().unwrap();
    let input = input_in(tmp.path());

    let req = resolve(RawOptions {
        output: Some(PathBuf::from("chart.svg")),
        ..raw_for(&input)
    })
    .unwrap();

    assert_eq!(req.output, OutputTarget::File(PathBuf::from("chart.svg")));
}

#[test]
fn missing_input_is_rejected() {
    let tmp = tempfile::tempdir().unwrap();
    let missing = tmp.path().join("missing.mmd");

    let err = resolve(raw_for(&missing)).unwrap_err();

    assert!(matches!(err, Error::InputNotFound { ref path } if path == &missing));
    assert_eq!(err.stage(), Stage::Validation);
    assert!(err.to_string().contains("doesn't exist"));
}

#[test]
fn stdin_input_defaults_to_out_file() {
    let req = resolve(RawOptions::default()).unwrap();
    assert_eq!(req.input, InputSource::Stdin);
    assert_eq!(req.output, OutputTarget::File(PathBuf::from("out.svg")));

    let req = resolve(RawOptions {
        input: Some(PathBuf::from(STDIO_MARKER)),
        format: Some(OutputFormat::Pdf),
        ..RawOptions::default()
    })
    .unwrap();
    assert_eq!(req.input, InputSource::Stdin);
    assert_eq!(req.output, OutputTarget::File(PathBuf::from("out.pdf")));
}

#[test]
fn dash_output_streams_to_stdout() {
    let tmp = tempfile::tempdir().unwrap();
    let input = input_in(tmp.path());

    let req = resolve(RawOptions {
        output: Some(PathBuf::from(STDIO_MARKER)),
        format: Some(OutputFormat::Png),
        ..raw_for(&input)
    })
    .unwrap();
    assert_eq!(req.output, OutputTarget::Stdout);
    assert_eq!(req.format, OutputFormat::Png);

    let req = resolve(RawOptions {
        output: Some(PathBuf::from(STDIO_MARKER)),
        ..raw_for(&input)
    })
    .unwrap();
    assert_eq!(req.format, OutputFormat::Svg);
}

#[test]
fn background_defaults_and_transparent_sentinel() {
    assert_eq!(Background::parse(None), Background::Color("white".into()));
    assert_eq!(Background::parse(Some("  ")), Background::Color("white".into()));
    assert_eq!(Background::parse(Some("transparent")), Background::Transparent);
    assert_eq!(Background::parse(Some("Transparent")), Background::Transparent);
    assert_eq!(
        Background::parse(Some("#F0F0F0")),
        Background::Color("#F0F0F0".into())
    );
    assert!(Background::Transparent.is_transparent());
    assert_eq!(Background::Transparent.css_value(), "transparent");
    assert_eq!(Background::parse(Some("red")).css_value(), "red");
}

#[test]
fn config_and_css_files_are_loaded() {
    let tmp = tempfile::tempdir().unwrap();
    let input = input_in(tmp.path());
    let config = tmp.path().join("config.json");
    fs::write(&config, r#"{"theme":"dark","sequence":{"mirrorActors":false}}"#).unwrap();
    let css = tmp.path().join("style.css");
    fs::write(&css, "text { fill: red; }").unwrap();
    let puppeteer = tmp.path().join("puppeteer.json");
    fs::write(&puppeteer, r#"{"args":["--no-sandbox"]}"#).unwrap();

    let req = resolve(RawOptions {
        config_file: Some(config),
        css_file: Some(css),
        puppeteer_config_file: Some(puppeteer),
        ..raw_for(&input)
    })
    .unwrap();

    assert_eq!(
        req.mermaid_config,
        Some(json!({"theme": "dark", "sequence": {"mirrorActors": false}}))
    );
    assert_eq!(req.css.as_deref(), Some("text { fill: red; }"));
    assert_eq!(req.launch.args, vec!["--no-sandbox".to_string()]);
    assert!(req.launch.headless);
}

#[test]
fn missing_config_file_is_rejected() {
    let tmp = tempfile::tempdir().unwrap();
    let input = input_in(tmp.path());

    let err = resolve(RawOptions {
        config_file: Some(tmp.path().join("missing.json")),
        ..raw_for(&input)
    })
    .unwrap_err();
    assert!(matches!(
        err,
        Error::ConfigFileNotFound {
            kind: "Configuration",
            ..
        }
    ));

    let err = resolve(RawOptions {
        puppeteer_config_file: Some(tmp.path().join("missing.json")),
        ..raw_for(&input)
    })
    .unwrap_err();
    assert!(matches!(err, Error::ConfigFileNotFound { .. }));
}

#[test]
fn config_file_extensions_are_checked() {
    let tmp = tempfile::tempdir().unwrap();
    let input = input_in(tmp.path());
    let yaml = tmp.path().join("config.yaml");
    fs::write(&yaml, "theme: dark").unwrap();
    let txt = tmp.path().join("style.txt");
    fs::write(&txt, "svg {}").unwrap();

    let err = resolve(RawOptions {
        config_file: Some(yaml),
        ..raw_for(&input)
    })
    .unwrap_err();
    assert!(matches!(
        err,
        Error::InvalidConfigExtension {
            expected: ".json",
            ..
        }
    ));

    let err = resolve(RawOptions {
        custom_theme: Some(txt),
        ..raw_for(&input)
    })
    .unwrap_err();
    assert!(matches!(
        err,
        Error::InvalidConfigExtension {
            expected: ".css",
            ..
        }
    ));
}

#[test]
fn config_json_must_be_an_object() {
    let tmp = tempfile::tempdir().unwrap();
    let input = input_in(tmp.path());
    let broken = tmp.path().join("broken.json");
    fs::write(&broken, "{ theme: ").unwrap();
    let array = tmp.path().join("array.json");
    fs::write(&array, "[1, 2]").unwrap();

    for path in [broken, array] {
        let err = resolve(RawOptions {
            config_file: Some(path.clone()),
            ..raw_for(&input)
        })
        .unwrap_err();
        assert!(
            matches!(err, Error::InvalidConfigJson { .. }),
            "{}: {err}",
            path.display()
        );
        assert_eq!(err.exit_code(), 1);
    }
}

#[test]
fn zero_dimensions_and_bad_scale_are_rejected() {
    let tmp = tempfile::tempdir().unwrap();
    let input = input_in(tmp.path());

    let err = resolve(RawOptions {
        width: 0,
        ..raw_for(&input)
    })
    .unwrap_err();
    assert!(matches!(err, Error::InvalidDimension { what: "width", .. }));

    let err = resolve(RawOptions {
        height: 0,
        ..raw_for(&input)
    })
    .unwrap_err();
    assert!(matches!(err, Error::InvalidDimension { what: "height", .. }));

    for scale in [0.0, -1.0, f64::NAN, f64::INFINITY] {
        let err = resolve(RawOptions {
            scale,
            ..raw_for(&input)
        })
        .unwrap_err();
        assert!(matches!(err, Error::InvalidDimension { what: "scale", .. }));
    }
}

#[test]
fn missing_local_assets_are_rejected() {
    let tmp = tempfile::tempdir().unwrap();
    let input = input_in(tmp.path());

    let err = resolve(RawOptions {
        mermaid_js: Some(tmp.path().join("mermaid.min.js")),
        ..raw_for(&input)
    })
    .unwrap_err();
    assert!(matches!(
        err,
        Error::AssetNotFound {
            kind: "Mermaid script",
            ..
        }
    ));
}

#[test]
fn resolve_format_precedence() {
    assert_eq!(resolve_format(None, None).unwrap(), OutputFormat::Svg);
    assert_eq!(
        resolve_format(Some(OutputFormat::Pdf), None).unwrap(),
        OutputFormat::Pdf
    );
    assert_eq!(
        resolve_format(None, Some(Path::new("a/b/chart.png"))).unwrap(),
        OutputFormat::Png
    );
    assert_eq!(
        resolve_format(Some(OutputFormat::Png), Some(Path::new("chart.png"))).unwrap(),
        OutputFormat::Png
    );
}

#[test]
fn default_output_path_appends_the_format() {
    let input = InputSource::File(PathBuf::from("docs/flow.mmd"));
    assert_eq!(
        default_output_path(&input, OutputFormat::Svg),
        PathBuf::from("docs/flow.mmd.svg")
    );
    assert_eq!(
        default_output_path(&InputSource::Stdin, OutputFormat::Png),
        PathBuf::from("out.png")
    );
}

#[test]
fn theme_and_format_parse_case_insensitively() {
    assert_eq!("Forest".parse::<Theme>().unwrap(), Theme::Forest);
    assert_eq!("NEUTRAL".parse::<Theme>().unwrap(), Theme::Neutral);
    assert!(matches!(
        "solarized".parse::<Theme>(),
        Err(Error::UnknownTheme(_))
    ));
    assert_eq!("PDF".parse::<OutputFormat>().unwrap(), OutputFormat::Pdf);
    assert!(matches!(
        "jpg".parse::<OutputFormat>(),
        Err(Error::UnknownFormat(_))
    ));
    assert_eq!(Theme::Dark.to_string(), "dark");
    assert_eq!(OutputFormat::Png.to_string(), "png");
}
