//! Content-type inference from file extensions.

/// Content type reported when an extension is missing or unknown.
pub const DEFAULT_MIME_TYPE: &str = "text/plain";

/// Mime types and the extensions that map to them.
///
/// The first entry listing an extension wins.
static MIME_TYPES: &[(&str, &[&str])] = &[
    // Video
    ("video/mp4", &["mp4", "m4v", "mp4v", "mpg4"]),
    ("video/webm", &["webm"]),
    ("video/x-matroska", &["mkv", "mk3d", "mks"]),
    ("video/quicktime", &["mov", "qt"]),
    ("video/x-msvideo", &["avi"]),
    ("video/x-flv", &["flv"]),
    ("video/x-ms-wmv", &["wmv"]),
    ("video/mpeg", &["mpeg", "mpg", "mpe", "m1v", "m2v"]),
    ("video/mp2t", &["ts", "m2t", "m2ts", "mts"]),
    ("video/ogg", &["ogv"]),
    ("video/3gpp", &["3gp", "3gpp"]),
    ("video/3gpp2", &["3g2"]),
    // Audio
    ("audio/mpeg", &["mp3", "mpga", "mp2", "mp2a", "m2a", "m3a"]),
    ("audio/mp4", &["m4a", "mp4a"]),
    ("audio/aac", &["aac"]),
    ("audio/ogg", &["oga", "ogg", "spx", "opus"]),
    ("audio/wav", &["wav"]),
    ("audio/webm", &["weba"]),
    ("audio/flac", &["flac"]),
    ("audio/x-aiff", &["aif", "aiff", "aifc"]),
    ("audio/x-ms-wma", &["wma"]),
    ("audio/amr", &["amr"]),
    ("audio/midi", &["mid", "midi", "kar", "rmi"]),
    // Images
    ("image/jpeg", &["jpeg", "jpg", "jpe"]),
    ("image/png", &["png"]),
    ("image/gif", &["gif"]),
    ("image/webp", &["webp"]),
    ("image/bmp", &["bmp"]),
    ("image/tiff", &["tif", "tiff"]),
    ("image/svg+xml", &["svg", "svgz"]),
    ("image/x-icon", &["ico"]),
    ("image/avif", &["avif"]),
    // Text and subtitles
    ("text/plain", &["txt", "text", "conf", "def", "list", "log", "in", "ini"]),
    ("text/vtt", &["vtt"]),
    ("application/x-subrip", &["srt"]),
    ("text/x-ssa", &["ssa", "ass"]),
    ("text/csv", &["csv"]),
    ("text/html", &["html", "htm", "shtml"]),
    ("text/css", &["css"]),
    ("text/markdown", &["md", "markdown"]),
    // Application
    ("application/json", &["json", "map"]),
    ("application/xml", &["xml", "xsl", "xsd", "rng"]),
    ("application/pdf", &["pdf"]),
    ("application/zip", &["zip"]),
    ("application/gzip", &["gz"]),
    ("application/x-tar", &["tar"]),
    ("application/javascript", &["js", "mjs"]),
    ("application/wasm", &["wasm"]),
    ("application/vnd.apple.mpegurl", &["m3u8"]),
    ("application/dash+xml", &["mpd"]),
    ("application/octet-stream", &["bin", "dms", "so", "pkg", "dump", "deploy"]),
];

/// Look up the content type of a file extension (without the leading dot).
///
/// Matching ignores ASCII case. An empty or unknown extension yields
/// [`DEFAULT_MIME_TYPE`].
pub fn mime_type_for_extension(extension: &str) -> &'static str {
    if extension.is_empty() {
        return DEFAULT_MIME_TYPE;
    }

    MIME_TYPES
        .iter()
        .find(|(_, extensions)| {
            extensions
                .iter()
                .any(|candidate| candidate.eq_ignore_ascii_case(extension))
        })
        .map(|(mime_type, _)| *mime_type)
        .unwrap_or(DEFAULT_MIME_TYPE)
}

/// Infer the content type of a file from its name.
///
/// The extension is everything after the last `.`; a name without a dot has
/// no extension.
pub fn mime_type_for_name(name: &str) -> &'static str {
    let extension = name.rsplit_once('.').map(|(_, ext)| ext).unwrap_or("");
    mime_type_for_extension(extension)
}
