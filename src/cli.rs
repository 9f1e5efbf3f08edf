// ============================================================================
// PixelFE CLI — headless editing via command-line arguments
// ============================================================================
//
// Usage examples:
//   pixelfe -i photo.png --effect sepia -o result.jpeg
//   pixelfe -i photo.jpg --region 10,10,200,120 --effect invert --effect crop
//   pixelfe -i *.jpg --resize 800x600 --output-dir out/ --format png
//   pixelfe -i card.png --text "Hello" --font serif --font-size 32 --color #ff0000 --text-pos 20,20
//   pixelfe -i photo.png --effect showhistogram --histogram -o out.jpeg
//
// Each file runs through one EditorSession: load, optional region, effects in
// the order given, resize and text, then the visible image is saved. As in the
// editor, every filter is re-derived from the loaded image, so only the last
// filter in the list is visible (inside the region, if one is set).

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;

use clap::Parser;

use crate::io::{self, SaveFormat};
use crate::ops::selection::SelectionRect;
use crate::ops::text::{self, SingleFont};
use crate::session::{EditorSession, EffectKind};
use crate::settings::EditorSettings;

// ============================================================================
// CLI argument definition (clap Derive)
// ============================================================================

/// PixelFE headless image editor.
#[derive(Parser, Debug)]
#[command(
    name = "pixelfe",
    version,
    about = "PixelFE headless image editor",
    long_about = "Apply filters, crop, resize and text overlays to image files without\n\
                  a GUI. Reads anything the image crate decodes; writes JPEG (default),\n\
                  PNG, BMP or TGA.\n\n\
                  Effects: normal, grayscale, redonly, sepia, threshold, invert, delete,\n\
                  crop, resize, addtext, select, deselect, showhistogram, hidehistogram.\n\n\
                  Example:\n  \
                  pixelfe -i photo.png --region 0,0,64,64 --effect grayscale -o out.jpeg"
)]
pub struct CliArgs {
    /// Input file(s). Glob patterns accepted (e.g. "*.png", "shots/*.jpg").
    #[arg(short, long, required = true, num_args = 1..)]
    pub input: Vec<String>,

    /// Selection rectangle in image pixels: x0,y0,x1,y1.
    #[arg(long, value_name = "X0,Y0,X1,Y1", value_parser = parse_region)]
    pub region: Option<SelectionRect>,

    /// Effect to activate. Repeatable; applied in order.
    #[arg(short, long = "effect", value_name = "TAG", value_parser = parse_effect)]
    pub effects: Vec<EffectKind>,

    /// Resize target WIDTHxHEIGHT, clamped to the configured bounds.
    /// Runs where `--effect resize` appears, else after all effects.
    #[arg(long, value_name = "WxH", value_parser = parse_size)]
    pub resize: Option<(f64, f64)>,

    /// Text to draw. Runs where `--effect addtext` appears, else last.
    #[arg(long, value_name = "TEXT")]
    pub text: Option<String>,

    /// Font family for --text (CSS generic names allowed). Defaults to the configured family.
    #[arg(long, value_name = "FAMILY")]
    pub font: Option<String>,

    /// TrueType / OpenType file to use for --text instead of a system font.
    #[arg(long, value_name = "FILE")]
    pub font_file: Option<PathBuf>,

    /// Font size in pixels.
    #[arg(long, value_name = "PX")]
    pub font_size: Option<f32>,

    /// Text colour: #rgb, #rrggbb, #rrggbbaa or a colour name.
    #[arg(long, value_name = "COLOR", value_parser = parse_color)]
    pub color: Option<[u8; 4]>,

    /// Top-left of the text: X,Y. The baseline sits one font size below.
    #[arg(long, value_name = "X,Y", value_parser = parse_point, default_value = "0,0")]
    pub text_pos: (f64, f64),

    /// Also write the luma histogram of the result as `<output>_histogram.png`.
    #[arg(long)]
    pub histogram: bool,

    /// Output file path. Only valid for single-file input, which otherwise
    /// lands next to the input under the configured export name.
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Output directory for batch processing.
    #[arg(long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Output format: jpeg, png, bmp, tga. Inferred from --output (or the
    /// export name) when omitted.
    #[arg(short, long, value_name = "FORMAT")]
    pub format: Option<String>,

    /// JPEG quality (1–100). Defaults to the configured quality.
    #[arg(short, long, value_name = "1-100", value_parser = clap::value_parser!(u8).range(1..=100))]
    pub quality: Option<u8>,

    /// Settings file to use instead of the per-user one.
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Print per-file timing and mirror the session log to stderr.
    #[arg(short, long)]
    pub verbose: bool,
}

fn parse_numbers<const N: usize>(s: &str, sep: char, what: &str) -> Result<[f64; N], String> {
    let parts: Vec<&str> = s.split(sep).map(str::trim).collect();
    if parts.len() != N {
        return Err(format!("expected {} as {} numbers separated by '{}'", what, N, sep));
    }
    let mut out = [0.0; N];
    for (slot, part) in out.iter_mut().zip(parts) {
        *slot = part
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .ok_or_else(|| format!("'{}' is not a number", part))?;
    }
    Ok(out)
}

fn parse_region(s: &str) -> Result<SelectionRect, String> {
    let [x0, y0, x1, y1] = parse_numbers::<4>(s, ',', "a region")?;
    Ok(SelectionRect::new(x0, y0, x1, y1))
}

fn parse_size(s: &str) -> Result<(f64, f64), String> {
    let [w, h] = parse_numbers::<2>(&s.to_lowercase(), 'x', "a size")?;
    Ok((w, h))
}

fn parse_point(s: &str) -> Result<(f64, f64), String> {
    let [x, y] = parse_numbers::<2>(s, ',', "a position")?;
    Ok((x, y))
}

fn parse_color(s: &str) -> Result<[u8; 4], String> {
    text::parse_css_color(s).ok_or_else(|| format!("'{}' is not a colour", s))
}

fn parse_effect(s: &str) -> Result<EffectKind, String> {
    s.parse::<EffectKind>().map_err(|e| e.to_string())
}

// ============================================================================
// Public entry point
// ============================================================================

/// Run all CLI processing and return an OS exit code.
/// `0` = all files succeeded, `1` = one or more files failed.
pub fn run(args: CliArgs) -> ExitCode {
    let inputs = resolve_inputs(&args.input);
    if inputs.is_empty() {
        eprintln!("error: no input files matched the given pattern(s).");
        return ExitCode::FAILURE;
    }

    if inputs.len() > 1 && args.output.is_some() && args.output_dir.is_none() {
        eprintln!(
            "error: {} input files given but --output only accepts a single file path.\n\
             Use --output-dir to specify a destination directory for batch processing.",
            inputs.len()
        );
        return ExitCode::FAILURE;
    }

    let settings = match &args.config {
        Some(path) => EditorSettings::load_from(path),
        None => EditorSettings::load(),
    };

    // A lone input without -o is written under the configured export name.
    let export_name = (inputs.len() == 1).then_some(settings.export_name.as_str());
    let format_hint = args.output.clone().or_else(|| export_name.map(PathBuf::from));

    let save_format = match parse_format(args.format.as_deref(), format_hint.as_deref()) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let font_override = match &args.font_file {
        Some(path) => match text::load_font_file(path) {
            Some(font) => Some(SingleFont(font)),
            None => {
                eprintln!("error: could not load font file '{}'.", path.display());
                return ExitCode::FAILURE;
            }
        },
        None => None,
    };

    if let Some(dir) = &args.output_dir
        && let Err(e) = std::fs::create_dir_all(dir)
    {
        eprintln!(
            "error: could not create output directory '{}': {}",
            dir.display(), e
        );
        return ExitCode::FAILURE;
    }

    let total = inputs.len();
    let multi = total > 1;
    let mut any_failure = false;

    for (idx, input_path) in inputs.iter().enumerate() {
        if multi || args.verbose {
            println!("[{}/{}] {}", idx + 1, total, input_path.display());
        }

        let file_start = Instant::now();

        let Some(output_path) = build_output_path(
            input_path,
            args.output.as_deref(),
            args.output_dir.as_deref(),
            export_name,
            save_format,
        ) else {
            eprintln!(
                "  error: cannot determine output path for '{}'.",
                input_path.display()
            );
            any_failure = true;
            continue;
        };

        let mut session = EditorSession::with_settings(settings.clone());
        if let Some(font) = &font_override {
            session = session.with_fonts(font.clone());
        }

        match run_one(&mut session, &args, input_path, &output_path, save_format) {
            Ok(()) => {
                if args.verbose || multi {
                    println!(
                        "  → {} ({:.0}ms)",
                        output_path.display(),
                        file_start.elapsed().as_secs_f64() * 1000.0
                    );
                }
            }
            Err(e) => {
                eprintln!("  error: {}", e);
                any_failure = true;
            }
        }
    }

    if any_failure { ExitCode::FAILURE } else { ExitCode::SUCCESS }
}

// ============================================================================
// Per-file processing pipeline
// ============================================================================

fn run_one(
    session: &mut EditorSession,
    args:    &CliArgs,
    input:   &Path,
    output:  &Path,
    format:  SaveFormat,
) -> Result<(), String> {
    // -- Step 1: Load ----------------------------------------------------
    let buf = io::load_image(input).map_err(|e| format!("load failed: {}", e))?;
    session.load_buffer(buf);

    // -- Step 2: Region --------------------------------------------------
    if let Some(rect) = args.region {
        session.select_rect(rect).map_err(|e| format!("region: {}", e))?;
    }

    // -- Step 3: Effects, in order ----------------------------------------
    let mut resized = false;
    let mut texted = false;
    for &kind in &args.effects {
        session.set_effect(kind).map_err(|e| format!("effect '{}': {}", kind, e))?;
        match kind {
            EffectKind::Resize if !resized => {
                apply_resize(session, args)?;
                resized = true;
            }
            EffectKind::AddText if !texted => {
                apply_text(session, args)?;
                texted = true;
            }
            _ => {}
        }
    }
    if !resized {
        apply_resize(session, args)?;
    }
    if !texted {
        apply_text(session, args)?;
    }

    // -- Step 4: Histogram -------------------------------------------------
    if args.histogram {
        if !session.is_histogram_visible() {
            session.show_histogram().map_err(|e| format!("histogram: {}", e))?;
        }
        write_histogram(session, output, args.verbose)?;
    }

    // -- Step 5: Save ------------------------------------------------------
    let visible = session.visible().ok_or_else(|| "nothing to save".to_string())?;
    let quality = args.quality.unwrap_or(session.settings().jpeg_quality);
    io::encode_and_write(visible, output, format, quality)
        .map_err(|e| format!("save failed: {}", e))?;

    Ok(())
}

fn apply_resize(session: &mut EditorSession, args: &CliArgs) -> Result<(), String> {
    match args.resize {
        Some((w, h)) => session.resize(w, h).map_err(|e| format!("resize: {}", e)),
        None => Ok(()),
    }
}

fn apply_text(session: &mut EditorSession, args: &CliArgs) -> Result<(), String> {
    let Some(content) = args.text.as_deref() else { return Ok(()) };
    let family = args.font.clone().unwrap_or_else(|| session.settings().font_family.clone());
    let size = args.font_size.unwrap_or(session.settings().font_size);
    let color = args.color.unwrap_or(session.settings().text_color);
    let (x, top) = args.text_pos;
    let baseline = top as f32 + size;
    let painted = session
        .add_text(content, &family, size, color, x as f32, baseline)
        .map_err(|e| format!("text: {}", e))?;
    if !painted && args.verbose {
        println!("  text '{}' fell outside the image", content);
    }
    Ok(())
}

fn write_histogram(session: &EditorSession, output: &Path, verbose: bool) -> Result<(), String> {
    let Some(hist) = session.histogram() else { return Ok(()) };
    if verbose {
        println!(
            "  histogram: {} px, peak {:?}, mean {:.1}",
            hist.total(),
            hist.peak(),
            hist.mean().unwrap_or(0.0)
        );
    }
    let Some(chart) = session.histogram_image().map_err(|e| format!("histogram: {}", e))? else {
        return Ok(());
    };
    let path = histogram_path(output);
    io::encode_and_write(&chart, &path, SaveFormat::Png, 100)
        .map_err(|e| format!("histogram save failed: {}", e))
}

// ============================================================================
// Helpers
// ============================================================================

/// Expand glob patterns and literal paths into a deduplicated, ordered list.
fn resolve_inputs(patterns: &[String]) -> Vec<PathBuf> {
    let mut result: Vec<PathBuf> = Vec::new();

    for pattern in patterns {
        let as_path = Path::new(pattern);

        if as_path.exists() {
            if !result.iter().any(|p| p.as_path() == as_path) {
                result.push(as_path.to_path_buf());
            }
            continue;
        }

        match glob::glob(pattern) {
            Ok(entries) => {
                let mut matched = false;
                for entry in entries.flatten() {
                    if !result.contains(&entry) {
                        result.push(entry);
                    }
                    matched = true;
                }
                if !matched {
                    eprintln!("warning: pattern '{}' matched no files.", pattern);
                }
            }
            Err(e) => {
                eprintln!("warning: invalid glob '{}': {}", pattern, e);
            }
        }
    }

    result
}

/// Choose the [`SaveFormat`] from the `--format` string or infer it from the
/// output file extension. Defaults to JPEG.
fn parse_format(format_arg: Option<&str>, output: Option<&Path>) -> Result<SaveFormat, String> {
    if let Some(f) = format_arg {
        return SaveFormat::from_name(f).ok_or_else(|| format!("unsupported output format '{}'", f));
    }
    Ok(output.map(SaveFormat::from_path).unwrap_or_default())
}

/// Compute the output path for a single input file.
///
/// Priority:
/// 1. `--output` (explicit path, used for single-file input)
/// 2. `--output-dir` (batch directory)
/// 3. Fallback: same directory as input
///
/// The file stem is `export_name`'s when given (single-file runs), else the
/// input's. The extension always follows `format`. `_out` is appended to the
/// stem if the result would collide with the input path.
fn build_output_path(
    input:       &Path,
    output:      Option<&Path>,
    output_dir:  Option<&Path>,
    export_name: Option<&str>,
    format:      SaveFormat,
) -> Option<PathBuf> {
    if let Some(out) = output {
        return Some(out.to_path_buf());
    }

    let ext  = format.extension();
    let stem = match export_name.and_then(|name| Path::new(name).file_stem()) {
        Some(s) => s.to_string_lossy().into_owned(),
        None => input.file_stem()?.to_string_lossy().into_owned(),
    };

    let dir = output_dir.unwrap_or_else(|| input.parent().unwrap_or(Path::new(".")));
    let candidate = dir.join(format!("{}.{}", stem, ext));

    if candidate == input {
        Some(dir.join(format!("{}_out.{}", stem, ext)))
    } else {
        Some(candidate)
    }
}

/// `out/photo.jpeg` → `out/photo_histogram.png`
fn histogram_path(output: &Path) -> PathBuf {
    let stem = output
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "image".to_string());
    output.with_file_name(format!("{}_histogram.png", stem))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::PixelBuffer;

    fn write_png(dir: &Path, name: &str, buf: &PixelBuffer) -> PathBuf {
        let path = dir.join(name);
        io::encode_and_write(buf, &path, SaveFormat::Png, 100).unwrap();
        path
    }

    fn args(list: &[&str]) -> CliArgs {
        CliArgs::try_parse_from(std::iter::once("pixelfe").chain(list.iter().copied())).unwrap()
    }

    #[test]
    fn value_parsers() {
        assert_eq!(parse_region("1, 2,3.5,4"), Ok(SelectionRect::new(1.0, 2.0, 3.5, 4.0)));
        assert!(parse_region("1,2,3").is_err());
        assert!(parse_region("1,2,3,nan").is_err());
        assert_eq!(parse_size("640X480"), Ok((640.0, 480.0)));
        assert!(parse_size("640").is_err());
        assert_eq!(parse_point("5,-2"), Ok((5.0, -2.0)));
        assert_eq!(parse_color("#00ff00"), Ok([0, 255, 0, 255]));
        assert_eq!(parse_effect("Re-Resize"), Ok(EffectKind::Resize));
        assert!(parse_effect("blur").is_err());
    }

    #[test]
    fn effects_keep_command_line_order() {
        let a = args(&["-i", "x.png", "--effect", "select", "-e", "crop", "--quality", "70"]);
        assert_eq!(a.effects, vec![EffectKind::Select, EffectKind::Crop]);
        assert_eq!(a.quality, Some(70));
        assert_eq!(a.text_pos, (0.0, 0.0));
        assert!(CliArgs::try_parse_from(["pixelfe", "-i", "x.png", "--quality", "0"]).is_err());
    }

    #[test]
    fn output_path_priority() {
        let input = Path::new("shots/photo.jpeg");
        assert_eq!(
            build_output_path(input, Some(Path::new("a.png")), None, Some("image.jpeg"), SaveFormat::Png),
            Some(PathBuf::from("a.png"))
        );
        assert_eq!(
            build_output_path(input, None, Some(Path::new("out")), None, SaveFormat::Png),
            Some(PathBuf::from("out/photo.png"))
        );
        assert_eq!(
            build_output_path(input, None, None, None, SaveFormat::Jpeg),
            Some(PathBuf::from("shots/photo_out.jpeg"))
        );
        assert_eq!(
            build_output_path(input, None, None, Some("image.jpeg"), SaveFormat::Png),
            Some(PathBuf::from("shots/image.png"))
        );
        assert_eq!(
            build_output_path(Path::new("shots/image.jpeg"), None, None, Some("image.jpeg"), SaveFormat::Jpeg),
            Some(PathBuf::from("shots/image_out.jpeg"))
        );
        assert_eq!(histogram_path(Path::new("out/photo.jpeg")), PathBuf::from("out/photo_histogram.png"));
        assert!(parse_format(Some("gif"), None).is_err());
        assert_eq!(parse_format(None, Some(Path::new("x.BMP"))), Ok(SaveFormat::Bmp));
    }

    #[test]
    fn single_input_is_saved_under_export_name() {
        let dir = tempfile::tempdir().unwrap();
        let input = write_png(dir.path(), "scan.png", &PixelBuffer::filled(3, 3, [9, 9, 9, 255]).unwrap());
        let defaults = dir.path().join("none.cfg");
        let code = run(args(&["-i", input.to_str().unwrap(), "--config", defaults.to_str().unwrap()]));
        assert_eq!(code, ExitCode::SUCCESS);
        assert_eq!(io::load_image(&dir.path().join(io::DEFAULT_EXPORT_NAME)).unwrap().dimensions(), (3, 3));

        let custom = dir.path().join("custom.cfg");
        std::fs::write(&custom, "export_name=result.png\n").unwrap();
        let code = run(args(&["-i", input.to_str().unwrap(), "--config", custom.to_str().unwrap()]));
        assert_eq!(code, ExitCode::SUCCESS);
        let out = io::load_image(&dir.path().join("result.png")).unwrap();
        assert_eq!(out.pixel(1, 1), [9, 9, 9, 255]);
    }

    #[test]
    fn pipeline_crops_region_and_applies_filter() {
        let dir = tempfile::tempdir().unwrap();
        let input = write_png(dir.path(), "in.png", &PixelBuffer::filled(10, 10, [255, 0, 0, 255]).unwrap());
        let output = dir.path().join("out.png");
        let cfg = dir.path().join("none.cfg");
        let code = run(args(&[
            "-i", input.to_str().unwrap(),
            "--region", "2,2,6,8",
            "-e", "grayscale",
            "-e", "crop",
            "--histogram",
            "--config", cfg.to_str().unwrap(),
            "-o", output.to_str().unwrap(),
        ]));
        assert_eq!(code, ExitCode::SUCCESS);

        let out = io::load_image(&output).unwrap();
        assert_eq!(out.dimensions(), (4, 6));
        assert_eq!(out.pixel(0, 0), [85, 85, 85, 255]);
        assert!(dir.path().join("out_histogram.png").exists());
    }

    #[test]
    fn pipeline_resizes_batch_into_directory() {
        let dir = tempfile::tempdir().unwrap();
        let img = PixelBuffer::filled(8, 4, [0, 0, 255, 255]).unwrap();
        write_png(dir.path(), "a.png", &img);
        write_png(dir.path(), "b.png", &img);
        let out_dir = dir.path().join("out");
        let pattern = dir.path().join("*.png");
        let code = run(args(&[
            "-i", pattern.to_str().unwrap(),
            "--resize", "4x2",
            "--format", "png",
            "--config", dir.path().join("none.cfg").to_str().unwrap(),
            "--output-dir", out_dir.to_str().unwrap(),
        ]));
        assert_eq!(code, ExitCode::SUCCESS);
        for name in ["a.png", "b.png"] {
            assert_eq!(io::load_image(&out_dir.join(name)).unwrap().dimensions(), (4, 2));
        }
    }

    #[test]
    fn failing_file_sets_exit_code() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("broken.png");
        std::fs::write(&input, b"not a png").unwrap();
        let code = run(args(&[
            "-i", input.to_str().unwrap(),
            "--config", dir.path().join("none.cfg").to_str().unwrap(),
            "-o", dir.path().join("out.jpeg").to_str().unwrap(),
        ]));
        assert_eq!(code, ExitCode::FAILURE);
    }
}
