use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Progress template passed to the downloader; its percent/ETA updates are
/// what the demultiplexer sees as carriage-return overwrites
const PROGRESS_TEMPLATE: &str = "%(progress._percent_str)s %(progress._eta_str)s";

/// Browsers the downloader can lift session cookies from
pub const BROWSERS: [&str; 7] = [
    "chrome", "chromium", "edge", "firefox", "opera", "safari", "vivaldi",
];

/// Quality/format preset selectable in the UI
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum FormatPreset {
    /// Best video+audio, preferring an MP4 container
    #[default]
    BestMp4,
    /// Best available quality in any container
    BestAny,
    /// Up to 1080p, MP4 with fallbacks
    Mp4At1080,
    /// Up to 720p, MP4 with fallbacks
    Mp4At720,
    /// Up to 480p, MP4 with fallbacks
    Mp4At480,
    /// Best audio only, converted to MP3
    AudioMp3,
}

impl FormatPreset {
    pub const ALL: [FormatPreset; 6] = [
        FormatPreset::BestMp4,
        FormatPreset::BestAny,
        FormatPreset::Mp4At1080,
        FormatPreset::Mp4At720,
        FormatPreset::Mp4At480,
        FormatPreset::AudioMp3,
    ];

    /// Human-readable label for the settings line
    pub fn label(&self) -> &'static str {
        match self {
            FormatPreset::BestMp4 => "Best Quality (MP4)",
            FormatPreset::BestAny => "Best Quality (Any Format)",
            FormatPreset::Mp4At1080 => "1080p (MP4)",
            FormatPreset::Mp4At720 => "720p (MP4)",
            FormatPreset::Mp4At480 => "480p (MP4)",
            FormatPreset::AudioMp3 => "Audio only (MP3)",
        }
    }

    /// Next preset in display order, wrapping
    pub fn cycle(&self) -> FormatPreset {
        let idx = Self::ALL.iter().position(|p| p == self).unwrap_or(0);
        Self::ALL[(idx + 1) % Self::ALL.len()]
    }

    /// Downloader format-selection arguments for this preset
    fn format_args(&self) -> Vec<String> {
        match self {
            FormatPreset::BestMp4 => vec![
                "-f".into(),
                "best[ext=mp4]/bestvideo[ext=mp4]+bestaudio[ext=m4a]/bestvideo+bestaudio/best"
                    .into(),
            ],
            FormatPreset::BestAny => vec!["-f".into(), "bestvideo+bestaudio/best".into()],
            FormatPreset::Mp4At1080 => vec![
                "-f".into(),
                "best[height<=1080][ext=mp4]/bestvideo[height<=1080]+bestaudio[ext=m4a]/best[height<=1080]/best"
                    .into(),
            ],
            FormatPreset::Mp4At720 => vec![
                "-f".into(),
                "best[height<=720][ext=mp4]/bestvideo[height<=720]+bestaudio[ext=m4a]/best[height<=720]/best"
                    .into(),
            ],
            FormatPreset::Mp4At480 => vec![
                "-f".into(),
                "best[height<=480][ext=mp4]/bestvideo[height<=480]+bestaudio[ext=m4a]/best[height<=480]/best"
                    .into(),
            ],
            FormatPreset::AudioMp3 => vec![
                "-f".into(),
                "bestaudio".into(),
                "-x".into(),
                "--audio-format".into(),
                "mp3".into(),
                "--audio-quality".into(),
                "0".into(),
            ],
        }
    }
}

/// Where the downloader gets its session cookies from
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CookieSource {
    /// The managed cookies.txt file; skipped entirely while it is empty
    #[default]
    File,
    /// Delegate cookie extraction to an installed browser
    Browser(String),
}

impl CookieSource {
    /// Human-readable label for the settings line
    pub fn label(&self) -> String {
        match self {
            CookieSource::File => "cookies.txt (file)".into(),
            CookieSource::Browser(name) => name.clone(),
        }
    }

    /// Next source in display order: the file first, then each browser
    pub fn cycle(&self) -> CookieSource {
        match self {
            CookieSource::File => CookieSource::Browser(BROWSERS[0].into()),
            CookieSource::Browser(name) => {
                match BROWSERS.iter().position(|b| *b == name.as_str()) {
                    Some(idx) if idx + 1 < BROWSERS.len() => {
                        CookieSource::Browser(BROWSERS[idx + 1].into())
                    }
                    _ => CookieSource::File,
                }
            }
        }
    }
}

/// Everything needed to launch one logical download
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadRequest {
    pub url: String,
    pub dest_dir: PathBuf,
    pub preset: FormatPreset,
    pub cookies: CookieSource,
}

/// Resolved locations of the external tools
#[derive(Debug, Clone)]
pub struct ToolPaths {
    pub ytdlp: PathBuf,
    /// Directory containing both ffmpeg and ffprobe, when available
    pub ffmpeg_dir: Option<PathBuf>,
}

/// Locate the downloader and optional transcoder helpers
///
/// A `bin` directory next to the running executable wins over `PATH`, so a
/// bundled distribution can carry its own tools.
pub fn discover_tools() -> Result<ToolPaths> {
    let ytdlp = bundled("yt-dlp")
        .or_else(|| which::which("yt-dlp").ok())
        .ok_or_else(|| Error::DownloaderNotFound {
            name: "yt-dlp".into(),
        })?;

    let ffmpeg = bundled("ffmpeg").or_else(|| which::which("ffmpeg").ok());
    let ffprobe = bundled("ffprobe").or_else(|| which::which("ffprobe").ok());
    // The downloader needs both to transcode; pass the location only when
    // they live side by side
    let ffmpeg_dir = match (ffmpeg, ffprobe) {
        (Some(ffmpeg), Some(ffprobe)) if ffmpeg.parent() == ffprobe.parent() => {
            ffmpeg.parent().map(Path::to_path_buf)
        }
        _ => None,
    };

    Ok(ToolPaths { ytdlp, ffmpeg_dir })
}

fn bundled(name: &str) -> Option<PathBuf> {
    let exe = std::env::current_exe().ok()?;
    let candidate = exe.parent()?.join("bin").join(name);
    candidate.exists().then_some(candidate)
}

/// Build the full argument vector for one download invocation
///
/// Pure over its inputs: the only I/O is the cookie file size probe. An
/// empty or absent cookie file never reaches the command line.
pub fn build_args(request: &DownloadRequest, cookie_file: &Path, tools: &ToolPaths) -> Vec<String> {
    let mut argv = vec![
        tools.ytdlp.to_string_lossy().into_owned(),
        "--no-check-certificates".into(),
        "--prefer-free-formats".into(),
        "--merge-output-format".into(),
        "mp4".into(),
        request.url.clone(),
        "-P".into(),
        request.dest_dir.to_string_lossy().into_owned(),
        "--progress-template".into(),
        PROGRESS_TEMPLATE.into(),
    ];

    match &request.cookies {
        CookieSource::File => {
            let has_cookies = std::fs::metadata(cookie_file)
                .map(|m| m.len() > 0)
                .unwrap_or(false);
            if has_cookies {
                argv.push("--cookies".into());
                argv.push(cookie_file.to_string_lossy().into_owned());
            }
        }
        CookieSource::Browser(name) => {
            argv.push("--cookies-from-browser".into());
            argv.push(name.clone());
        }
    }

    argv.extend(request.preset.format_args());

    if let Some(dir) = &tools.ffmpeg_dir {
        argv.push("--ffmpeg-location".into());
        argv.push(dir.to_string_lossy().into_owned());
    }

    argv
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn request(cookies: CookieSource) -> DownloadRequest {
        DownloadRequest {
            url: "https://example.com/watch?v=abc".into(),
            dest_dir: PathBuf::from("/tmp/videos"),
            preset: FormatPreset::BestMp4,
            cookies,
        }
    }

    fn tools() -> ToolPaths {
        ToolPaths {
            ytdlp: PathBuf::from("/usr/bin/yt-dlp"),
            ffmpeg_dir: None,
        }
    }

    #[test]
    fn build_args_skips_empty_cookie_file() {
        let dir = tempfile::tempdir().unwrap();
        let cookie_file = dir.path().join("cookies.txt");
        std::fs::File::create(&cookie_file).unwrap();

        let argv = build_args(&request(CookieSource::File), &cookie_file, &tools());

        assert!(!argv.iter().any(|a| a == "--cookies"));
    }

    #[test]
    fn build_args_skips_absent_cookie_file() {
        let dir = tempfile::tempdir().unwrap();
        let cookie_file = dir.path().join("missing.txt");

        let argv = build_args(&request(CookieSource::File), &cookie_file, &tools());

        assert!(!argv.iter().any(|a| a == "--cookies"));
    }

    #[test]
    fn build_args_passes_non_empty_cookie_file() {
        let dir = tempfile::tempdir().unwrap();
        let cookie_file = dir.path().join("cookies.txt");
        let mut f = std::fs::File::create(&cookie_file).unwrap();
        writeln!(f, "# Netscape HTTP Cookie File").unwrap();

        let argv = build_args(&request(CookieSource::File), &cookie_file, &tools());

        let pos = argv.iter().position(|a| a == "--cookies").unwrap();
        assert_eq!(argv[pos + 1], cookie_file.to_string_lossy());
    }

    #[test]
    fn build_args_delegates_to_browser() {
        let dir = tempfile::tempdir().unwrap();
        let cookie_file = dir.path().join("cookies.txt");

        let argv = build_args(
            &request(CookieSource::Browser("firefox".into())),
            &cookie_file,
            &tools(),
        );

        let pos = argv.iter().position(|a| a == "--cookies-from-browser").unwrap();
        assert_eq!(argv[pos + 1], "firefox");
        assert!(!argv.iter().any(|a| a == "--cookies"));
    }

    #[test]
    fn build_args_starts_with_downloader_and_url_before_options() {
        let dir = tempfile::tempdir().unwrap();
        let argv = build_args(
            &request(CookieSource::File),
            &dir.path().join("cookies.txt"),
            &tools(),
        );

        assert_eq!(argv[0], "/usr/bin/yt-dlp");
        assert!(argv.contains(&"https://example.com/watch?v=abc".to_string()));
        assert!(argv.contains(&"--progress-template".to_string()));
    }

    #[test]
    fn build_args_includes_ffmpeg_location_when_discovered() {
        let dir = tempfile::tempdir().unwrap();
        let tools = ToolPaths {
            ytdlp: PathBuf::from("yt-dlp"),
            ffmpeg_dir: Some(PathBuf::from("/opt/ffmpeg/bin")),
        };

        let argv = build_args(
            &request(CookieSource::File),
            &dir.path().join("cookies.txt"),
            &tools,
        );

        let pos = argv.iter().position(|a| a == "--ffmpeg-location").unwrap();
        assert_eq!(argv[pos + 1], "/opt/ffmpeg/bin");
    }

    #[test]
    fn format_preset_audio_only_extracts_mp3() {
        let dir = tempfile::tempdir().unwrap();
        let mut req = request(CookieSource::File);
        req.preset = FormatPreset::AudioMp3;

        let argv = build_args(&req, &dir.path().join("cookies.txt"), &tools());

        assert!(argv.contains(&"-x".to_string()));
        let pos = argv.iter().position(|a| a == "--audio-format").unwrap();
        assert_eq!(argv[pos + 1], "mp3");
    }

    #[test]
    fn format_preset_cycle_visits_all_and_wraps() {
        let mut preset = FormatPreset::BestMp4;
        let mut seen = Vec::new();
        for _ in 0..FormatPreset::ALL.len() {
            seen.push(preset);
            preset = preset.cycle();
        }

        assert_eq!(seen, FormatPreset::ALL);
        assert_eq!(preset, FormatPreset::BestMp4);
    }

    #[test]
    fn cookie_source_cycle_walks_file_then_browsers() {
        let mut source = CookieSource::File;
        source = source.cycle();
        assert_eq!(source, CookieSource::Browser("chrome".into()));

        for _ in 1..BROWSERS.len() {
            source = source.cycle();
        }
        assert_eq!(source, CookieSource::Browser("vivaldi".into()));
        assert_eq!(source.cycle(), CookieSource::File);
    }
}
