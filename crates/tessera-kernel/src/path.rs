//! Pure path helpers shared by every read, write and existence check.
//!
//! Sandbox paths are POSIX-style strings, not `std::path::Path`: the remote
//! store is not the local OS, so separators and `..` handling must not depend
//! on the platform the kernel runs on.

use serde::{Deserialize, Serialize};

/// Extensions that go through the JSX id-injection pipeline on write.
pub const SOURCE_EXTENSIONS: &[&str] = &["js", "jsx", "ts", "tsx"];

/// Extensions read as raw bytes and returned base64-encoded.
pub const IMAGE_EXTENSIONS: &[&str] = &[
    "png", "jpg", "jpeg", "gif", "webp", "bmp", "ico", "avif", "tif", "tiff", "heic",
];

/// Non-image extensions that are still binary.
pub const BINARY_EXTENSIONS: &[&str] = &[
    "woff", "woff2", "ttf", "otf", "eot", "pdf", "zip", "gz", "tar", "wasm", "mp3", "mp4",
    "webm", "wav", "ogg", "mov",
];

/// How a file is treated by the read, edit and write paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileClass {
    /// JS/TS source; writes run through the content transformer.
    SourceLike,
    /// Image; read as bytes.
    Image,
    /// Other binary formats; read as bytes.
    Binary,
    /// Anything else; read as UTF-8 text.
    Text,
}

impl FileClass {
    /// Returns true when the file must be read as bytes and never edited.
    pub fn is_binary(self) -> bool {
        matches!(self, FileClass::Image | FileClass::Binary)
    }
}

/// Routing convention used to find the project's entry layout file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RouterType {
    /// `app/layout.*`
    #[default]
    App,
    /// `pages/_document.*`
    Pages,
}

/// Normalize a sandbox path.
///
/// Backslashes become `/`, empty and `.` segments are dropped, `..` pops a
/// segment but never climbs above the root, and trailing slashes are removed.
/// An empty input is returned unchanged.
pub fn normalize(path: &str) -> String {
    if path.is_empty() {
        return String::new();
    }

    let unified = path.replace('\\', "/");
    let absolute = unified.starts_with('/');

    let mut segments: Vec<&str> = Vec::new();
    for segment in unified.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }

    let joined = segments.join("/");
    match (absolute, joined.is_empty()) {
        (true, _) => format!("/{}", joined),
        (false, true) => ".".to_string(),
        (false, false) => joined,
    }
}

/// Parent directory of a path.
pub fn dir_name(path: &str) -> String {
    let normalized = normalize(path);
    match normalized.rfind('/') {
        Some(0) => "/".to_string(),
        Some(idx) => normalized[..idx].to_string(),
        None => ".".to_string(),
    }
}

/// Final segment of a path. Empty for the root.
pub fn base_name(path: &str) -> String {
    let normalized = normalize(path);
    match normalized.rfind('/') {
        Some(idx) => normalized[idx + 1..].to_string(),
        None if normalized == "." => String::new(),
        None => normalized,
    }
}

/// Lowercased extension without the dot.
pub fn extension(path: &str) -> Option<String> {
    let name = base_name(path);
    let (stem, ext) = name.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

/// Classify a path by extension.
pub fn classify(path: &str) -> FileClass {
    let Some(ext) = extension(path) else {
        return FileClass::Text;
    };
    let ext = ext.as_str();
    if SOURCE_EXTENSIONS.contains(&ext) {
        FileClass::SourceLike
    } else if IMAGE_EXTENSIONS.contains(&ext) {
        FileClass::Image
    } else if BINARY_EXTENSIONS.contains(&ext) {
        FileClass::Binary
    } else {
        FileClass::Text
    }
}

/// Images are returned base64-encoded by `read_files`.
pub fn is_image_file(path: &str) -> bool {
    classify(path) == FileClass::Image
}

/// JS/TS sources that go through the transformer on write.
pub fn is_source_like(path: &str) -> bool {
    classify(path) == FileClass::SourceLike
}

/// Whether `path` is the root layout for the given router convention.
///
/// `project_root` is stripped first so `/project/app/layout.tsx` matches when
/// the project lives at `/project`.
pub fn is_root_layout_file(path: &str, router: RouterType, project_root: &str) -> bool {
    let normalized = normalize(path);
    let root = normalize(project_root);

    let relative = if root.is_empty() || root == "/" || root == "." {
        normalized.as_str()
    } else {
        match normalized.strip_prefix(root.as_str()) {
            Some(rest) if rest.starts_with('/') => rest,
            _ => return false,
        }
    };
    let relative = relative.trim_start_matches('/');

    let (dirs, stem): (&[&str], &str) = match router {
        RouterType::App => (&["app", "src/app"], "layout"),
        RouterType::Pages => (&["pages", "src/pages"], "_document"),
    };

    dirs.iter().any(|dir| {
        SOURCE_EXTENSIONS
            .iter()
            .any(|ext| relative == format!("{}/{}.{}", dir, stem, ext))
    })
}
