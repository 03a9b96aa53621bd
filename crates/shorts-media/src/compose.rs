//! Single-pass composition of materialized clips onto a canvas.
//!
//! Every clip becomes one FFmpeg input and a filter chain; visual clips are
//! overlaid in timeline order on a black canvas, subtitles are drawn on top
//! of all visuals, and audio clips are delayed to their start and mixed.

use std::path::{Path, PathBuf};

use shorts_models::{RenderSettings, SegmentKind};

use crate::command::FfmpegCommand;

/// A timeline segment after materialization.
#[derive(Debug, Clone, PartialEq)]
pub enum ClipSource {
    Video(PathBuf),
    Image(PathBuf),
    /// UTF-8 file holding the subtitle text
    Subtitle(PathBuf),
    Audio(PathBuf),
}

impl ClipSource {
    pub fn kind(&self) -> SegmentKind {
        match self {
            Self::Video(_) => SegmentKind::Video,
            Self::Image(_) => SegmentKind::Image,
            Self::Subtitle(_) => SegmentKind::Subtitle,
            Self::Audio(_) => SegmentKind::Audio,
        }
    }

    /// Whether the clip draws on the canvas.
    pub fn is_on_canvas(&self) -> bool {
        !matches!(self, Self::Audio(_))
    }
}

/// A clip placed at `[start, end)` on the output timeline.
#[derive(Debug, Clone, PartialEq)]
pub struct MaterializedClip {
    pub source: ClipSource,
    pub start: f64,
    pub end: f64,
}

impl MaterializedClip {
    pub fn new(source: ClipSource, start: f64, end: f64) -> Self {
        Self { source, start, end }
    }

    pub fn duration(&self) -> f64 {
        (self.end - self.start).max(0.0)
    }
}

/// One FFmpeg input of a composition, in input-index order.
#[derive(Debug, Clone, PartialEq)]
pub enum CompositionInput {
    /// Black lavfi canvas covering the whole output
    Canvas { expr: String },
    Video(PathBuf),
    /// Still image looped for `duration` seconds
    Image { path: PathBuf, duration: f64 },
    Audio(PathBuf),
}

/// The inputs and filter graph of a render.
#[derive(Debug, Clone, PartialEq)]
pub struct Composition {
    pub inputs: Vec<CompositionInput>,
    pub filter_complex: String,
    pub video_label: String,
    /// `None` when the timeline has no audio clip
    pub audio_label: Option<String>,
    /// Output duration in seconds
    pub duration: f64,
}

impl Composition {
    /// Build the FFmpeg command writing this composition to `output`.
    pub fn to_command(&self, output: impl AsRef<Path>, settings: &RenderSettings) -> FfmpegCommand {
        let mut cmd = FfmpegCommand::new(output);
        for input in &self.inputs {
            cmd = match input {
                CompositionInput::Canvas { expr } => cmd.lavfi(expr.clone()),
                CompositionInput::Video(path) | CompositionInput::Audio(path) => cmd.input(path),
                CompositionInput::Image { path, duration } => cmd.looped_image(path, *duration),
            };
        }

        cmd = cmd
            .filter_complex(self.filter_complex.clone())
            .map(self.video_label.clone());
        cmd = match &self.audio_label {
            Some(label) => cmd.map(label.clone()),
            None => cmd.no_audio(),
        };

        cmd.output_args(settings.to_ffmpeg_args())
            .output_args(["-movflags", "+faststart"])
            .output_duration(self.duration)
    }
}

/// Compose `clips` onto a canvas described by `settings`.
///
/// The output lasts until the latest clip end.
pub fn compose(clips: &[MaterializedClip], settings: &RenderSettings) -> Composition {
    let duration = clips.iter().map(|c| c.end).fold(0.0_f64, f64::max);
    let (w, h, fps) = (settings.width, settings.height, settings.fps);

    let mut inputs = vec![CompositionInput::Canvas {
        expr: format!("color=c=black:s={}x{}:r={}:d={}", w, h, fps, secs(duration)),
    }];
    let mut chains = Vec::new();
    let mut base = "0:v".to_string();

    let fit = format!(
        "scale={w}:{h}:force_original_aspect_ratio=decrease,\
         pad={w}:{h}:(ow-iw)/2:(oh-ih)/2:color=black,setsar=1",
        w = w,
        h = h
    );

    let visuals = clips.iter().filter(|c| {
        matches!(c.source, ClipSource::Video(_) | ClipSource::Image(_))
    });
    for (k, clip) in visuals.enumerate() {
        let index = inputs.len();
        let d = secs(clip.duration());
        let shift = format!("setpts=PTS+{}/TB", secs(clip.start));

        let chain = match &clip.source {
            ClipSource::Video(path) => {
                inputs.push(CompositionInput::Video(path.clone()));
                format!(
                    "[{index}:v]trim=duration={d},setpts=PTS-STARTPTS,{fit},fps={fps},\
                     tpad=stop_mode=clone:stop_duration={d},trim=duration={d},\
                     format=yuva420p,fade=t=in:st=0:d={fade}:alpha=1,{shift}[v{k}]",
                    index = index,
                    d = d,
                    fit = fit,
                    fps = fps,
                    fade = secs(settings.video_fade_in),
                    shift = shift,
                    k = k
                )
            }
            ClipSource::Image(path) => {
                inputs.push(CompositionInput::Image {
                    path: path.clone(),
                    duration: clip.duration(),
                });
                format!(
                    "[{index}:v]{fit},fps={fps},format=yuva420p,\
                     fade=t=in:st=0:d={fade}:alpha=1,{shift}[v{k}]",
                    index = index,
                    fit = fit,
                    fps = fps,
                    fade = secs(settings.image_fade_in),
                    shift = shift,
                    k = k
                )
            }
            _ => continue,
        };
        chains.push(chain);
        chains.push(format!(
            "[{base}][v{k}]overlay=eof_action=pass:enable='{window}'[o{k}]",
            base = base,
            k = k,
            window = window(clip)
        ));
        base = format!("o{}", k);
    }

    let subtitles: Vec<String> = clips
        .iter()
        .filter_map(|clip| match &clip.source {
            ClipSource::Subtitle(text_file) => Some(drawtext(text_file, clip, settings)),
            _ => None,
        })
        .collect();
    let mut video_chain = format!("[{}]", base);
    if !subtitles.is_empty() {
        video_chain.push_str(&subtitles.join(","));
        video_chain.push(',');
    }
    video_chain.push_str("format=yuv420p[vout]");
    chains.push(video_chain);

    let mut audio_labels = Vec::new();
    for clip in clips {
        if let ClipSource::Audio(path) = &clip.source {
            let index = inputs.len();
            inputs.push(CompositionInput::Audio(path.clone()));
            let k = audio_labels.len();
            let delay_ms = (clip.start * 1000.0).round() as u64;
            chains.push(format!(
                "[{}:a]atrim=duration={},asetpts=PTS-STARTPTS,adelay={}:all=1[a{}]",
                index,
                secs(clip.duration()),
                delay_ms,
                k
            ));
            audio_labels.push(format!("[a{}]", k));
        }
    }

    let audio_label = match audio_labels.len() {
        0 => None,
        1 => audio_labels.pop(),
        n => {
            chains.push(format!(
                "{}amix=inputs={}:duration=longest:dropout_transition=0[aout]",
                audio_labels.concat(),
                n
            ));
            Some("[aout]".to_string())
        }
    };

    Composition {
        inputs,
        filter_complex: chains.join(";"),
        video_label: "[vout]".to_string(),
        audio_label,
        duration,
    }
}

fn drawtext(text_file: &Path, clip: &MaterializedClip, settings: &RenderSettings) -> String {
    let mut filter = format!(
        "drawtext=textfile={}:expansion=none",
        escape_filter_value(&text_file.to_string_lossy())
    );
    if let Some(font) = settings.font_file.as_deref() {
        filter.push_str(&format!(":fontfile={}", escape_filter_value(font)));
    }
    filter.push_str(&format!(
        ":fontsize={}:fontcolor={}:borderw={}:bordercolor={}:x=(w-text_w)/2:y=h-{}:enable='{}'",
        settings.font_size,
        settings.font_color,
        settings.border_width,
        settings.border_color,
        settings.subtitle_bottom_offset,
        window(clip)
    ));
    filter
}

fn window(clip: &MaterializedClip) -> String {
    format!("between(t,{},{})", secs(clip.start), secs(clip.end))
}

fn secs(value: f64) -> String {
    format!("{:.3}", value)
}

/// Escape a filter option value for both the option parser and the
/// filtergraph parser.
fn escape_filter_value(value: &str) -> String {
    let mut option_level = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '\\' | '\'' | ':') {
            option_level.push('\\');
        }
        option_level.push(c);
    }

    let mut graph_level = String::with_capacity(option_level.len());
    for c in option_level.chars() {
        if matches!(c, '\\' | '\'' | '[' | ']' | ',' | ';') {
            graph_level.push('\\');
        }
        graph_level.push(c);
    }
    graph_level
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clip(source: ClipSource, start: f64, end: f64) -> MaterializedClip {
        MaterializedClip::new(source, start, end)
    }

    #[test]
    fn test_canvas_spans_latest_end() {
        let clips = vec![
            clip(ClipSource::Image("a.png".into()), 0.0, 3.0),
            clip(ClipSource::Audio("m.mp3".into()), 0.0, 10.0),
        ];
        let composition = compose(&clips, &RenderSettings::default());

        assert_eq!(composition.duration, 10.0);
        assert_eq!(
            composition.inputs[0],
            CompositionInput::Canvas {
                expr: "color=c=black:s=1080x1920:r=30:d=10.000".into()
            }
        );
    }

    #[test]
    fn test_video_and_image_overlays_in_order() {
        let clips = vec![
            clip(ClipSource::Video("a.mp4".into()), 0.0, 4.0),
            clip(ClipSource::Image("b.png".into()), 4.0, 7.0),
        ];
        let composition = compose(&clips, &RenderSettings::default());
        let graph = &composition.filter_complex;

        assert_eq!(composition.inputs.len(), 3);
        assert_eq!(
            composition.inputs[2],
            CompositionInput::Image {
                path: "b.png".into(),
                duration: 3.0
            }
        );
        assert!(graph.contains("[1:v]trim=duration=4.000,setpts=PTS-STARTPTS"));
        assert!(graph.contains("fade=t=in:st=0:d=0.200:alpha=1,setpts=PTS+0.000/TB[v0]"));
        assert!(graph.contains("fade=t=in:st=0:d=0.300:alpha=1,setpts=PTS+4.000/TB[v1]"));
        assert!(graph.contains("[0:v][v0]overlay=eof_action=pass:enable='between(t,0.000,4.000)'[o0]"));
        assert!(graph.contains("[o0][v1]overlay=eof_action=pass:enable='between(t,4.000,7.000)'[o1]"));
        assert!(graph.ends_with("[o1]format=yuv420p[vout]"));
        assert_eq!(composition.audio_label, None);
    }

    #[test]
    fn test_subtitles_drawn_on_top() {
        let clips = vec![
            clip(ClipSource::Video("a.mp4".into()), 0.0, 4.0),
            clip(ClipSource::Subtitle("/tmp/sub_1.txt".into()), 0.0, 4.0),
        ];
        let composition = compose(&clips, &RenderSettings::default());

        assert_eq!(composition.inputs.len(), 2);
        assert!(composition.filter_complex.contains(
            "[o0]drawtext=textfile=/tmp/sub_1.txt:expansion=none:fontsize=60:fontcolor=white:\
             borderw=2:bordercolor=black:x=(w-text_w)/2:y=h-150:enable='between(t,0.000,4.000)',\
             format=yuv420p[vout]"
        ));
    }

    #[test]
    fn test_subtitle_only_draws_on_canvas() {
        let clips = vec![clip(ClipSource::Subtitle("s.txt".into()), 1.0, 4.0)];
        let composition = compose(&clips, &RenderSettings::default());

        assert_eq!(composition.inputs.len(), 1);
        assert!(composition.filter_complex.starts_with("[0:v]drawtext=textfile=s.txt"));
    }

    #[test]
    fn test_audio_delayed_and_mixed() {
        let clips = vec![
            clip(ClipSource::Image("a.png".into()), 0.0, 3.0),
            clip(ClipSource::Audio("bed.mp3".into()), 0.0, 10.0),
            clip(ClipSource::Audio("sfx.wav".into()), 2.5, 5.5),
        ];
        let composition = compose(&clips, &RenderSettings::default());
        let graph = &composition.filter_complex;

        assert!(graph.contains("[2:a]atrim=duration=10.000,asetpts=PTS-STARTPTS,adelay=0:all=1[a0]"));
        assert!(graph.contains("[3:a]atrim=duration=3.000,asetpts=PTS-STARTPTS,adelay=2500:all=1[a1]"));
        assert!(graph.ends_with("[a0][a1]amix=inputs=2:duration=longest:dropout_transition=0[aout]"));
        assert_eq!(composition.audio_label.as_deref(), Some("[aout]"));
    }

    #[test]
    fn test_single_audio_maps_directly() {
        let clips = vec![
            clip(ClipSource::Image("a.png".into()), 0.0, 3.0),
            clip(ClipSource::Audio("bed.mp3".into()), 0.0, 3.0),
        ];
        let composition = compose(&clips, &RenderSettings::default());
        assert_eq!(composition.audio_label.as_deref(), Some("[a0]"));
    }

    #[test]
    fn test_command_args() {
        let clips = vec![
            clip(ClipSource::Image("a.png".into()), 0.0, 3.0),
        ];
        let settings = RenderSettings::default();
        let args = compose(&clips, &settings)
            .to_command("out.mp4", &settings)
            .build_args();
        let joined = args.join(" ");

        assert!(joined.contains("-f lavfi -i color=c=black:s=1080x1920:r=30:d=3.000"));
        assert!(joined.contains("-loop 1 -t 3.000 -i a.png"));
        assert!(joined.contains("-map [vout] -an"));
        assert!(joined.contains("-c:v libx264"));
        assert!(joined.ends_with("-t 3.000 out.mp4"));
    }

    #[test]
    fn test_escape_filter_value() {
        assert_eq!(escape_filter_value("/tmp/a.txt"), "/tmp/a.txt");
        assert_eq!(escape_filter_value("C:/fonts/a.ttf"), "C\\\\:/fonts/a.ttf");
        assert_eq!(escape_filter_value("it's[1],x"), "it\\\\\\'s\\[1\\]\\,x");
    }

    #[test]
    fn test_font_file_option() {
        let settings = RenderSettings {
            font_file: Some("/fonts/Bold.ttf".into()),
            ..Default::default()
        };
        let clips = vec![clip(ClipSource::Subtitle("s.txt".into()), 0.0, 3.0)];
        let composition = compose(&clips, &settings);
        assert!(composition
            .filter_complex
            .contains("expansion=none:fontfile=/fonts/Bold.ttf:fontsize=60"));
    }
}
