use std::{
    collections::{HashMap, hash_map::Entry},
    ffi::OsString,
    fs, io,
    num::NonZeroUsize,
    panic,
    path::{Path, PathBuf},
    sync::atomic::{AtomicUsize, Ordering},
    thread,
};

use anyhow::{Context, Result, anyhow};
use image::{Rgba, RgbaImage};
use log::{error, info};

use crate::{Image, load};

impl Image {
    /// Copies the pixels into an `image` buffer, ready to be saved in any
    /// format that crate supports.
    pub fn to_rgba_image(&self) -> RgbaImage {
        RgbaImage::from_fn(self.width(), self.height(), |x, y| {
            Rgba(self[(x, y)].to_array())
        })
    }
}

impl From<&Image> for RgbaImage {
    fn from(image: &Image) -> Self {
        image.to_rgba_image()
    }
}

#[derive(Debug, Clone)]
pub struct Options {
    pub input_dir: PathBuf,
    /// Defaults to `<input_dir>/converted`.
    pub output_dir: Option<PathBuf>,
    /// Defaults to the available parallelism.
    pub jobs: Option<NonZeroUsize>,
}

impl Options {
    pub fn new(input_dir: impl Into<PathBuf>) -> Self {
        Self {
            input_dir: input_dir.into(),
            output_dir: None,
            jobs: None,
        }
    }

    pub fn output_dir(&self) -> PathBuf {
        self.output_dir
            .clone()
            .unwrap_or_else(|| self.input_dir.join("converted"))
    }
}

/// Outcome of a batch, in the order the inputs were found.
#[derive(Debug, Default)]
pub struct Report {
    /// Paths of the PNG files written.
    pub converted: Vec<PathBuf>,
    /// Inputs that could not be converted.
    pub failed: Vec<(PathBuf, anyhow::Error)>,
}

impl Report {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Regular files directly inside `dir` with a `qoi` extension, sorted.
pub fn find_qoi_files(dir: &Path) -> io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        let is_qoi = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("qoi"));
        if is_qoi && path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// `output_dir/<stem of input>.png`
pub fn output_path(input: &Path, output_dir: &Path) -> PathBuf {
    let mut name = input
        .file_stem()
        .map(OsString::from)
        .unwrap_or_else(|| OsString::from("image"));
    name.push(".png");
    output_dir.join(name)
}

/// Decodes one file and writes it as PNG into `output_dir`.
pub fn convert_file(input: &Path, output_dir: &Path) -> Result<PathBuf> {
    let image = load(input)?;
    let output = output_path(input, output_dir);
    image
        .to_rgba_image()
        .save(&output)
        .with_context(|| format!("failed to write {}", output.display()))?;
    Ok(output)
}

/// Converts every `.qoi` file in `options.input_dir`.
///
/// A file that fails is logged and recorded in the report, the others are
/// still converted. Only problems with the directories themselves are
/// returned as errors.
pub fn convert_dir(options: &Options) -> Result<Report> {
    let input_dir = &options.input_dir;
    let output_dir = options.output_dir();
    let files = find_qoi_files(input_dir)
        .with_context(|| format!("failed to list {}", input_dir.display()))?;
    fs::create_dir_all(&output_dir)
        .with_context(|| format!("failed to create {}", output_dir.display()))?;

    let jobs = options
        .jobs
        .or_else(|| thread::available_parallelism().ok())
        .map_or(1, NonZeroUsize::get)
        .clamp(1, files.len().max(1));
    info!(
        "converting {} files from {} into {} with {jobs} workers",
        files.len(),
        input_dir.display(),
        output_dir.display()
    );

    // `a.qoi` and `a.QOI` share an output name; only the first one is written.
    let mut claimed = HashMap::new();
    let mut pending = Vec::with_capacity(files.len());
    let mut results = Vec::with_capacity(files.len());
    for (i, input) in files.iter().enumerate() {
        match claimed.entry(output_path(input, &output_dir)) {
            Entry::Vacant(entry) => {
                entry.insert(i);
                pending.push(i);
            }
            Entry::Occupied(entry) => {
                let err = anyhow!(
                    "{} would overwrite {}, already written for {}",
                    input.display(),
                    entry.key().display(),
                    files[*entry.get()].display()
                );
                results.push((i, Err(err)));
            }
        }
    }

    let next = AtomicUsize::new(0);
    thread::scope(|scope| {
        let mut workers = Vec::with_capacity(jobs);
        for _ in 0..jobs {
            workers.push(scope.spawn(|| {
                let mut done = Vec::new();
                loop {
                    let n = next.fetch_add(1, Ordering::Relaxed);
                    let Some(&i) = pending.get(n) else {
                        break done;
                    };
                    done.push((i, convert_file(&files[i], &output_dir)));
                }
            }));
        }

        for worker in workers {
            match worker.join() {
                Ok(done) => results.extend(done),
                Err(payload) => panic::resume_unwind(payload),
            }
        }
    });
    results.sort_by_key(|(i, _)| *i);

    let mut report = Report::default();
    for (i, result) in results {
        let input = &files[i];
        match result {
            Ok(output) => {
                info!("{} -> {}", input.display(), output.display());
                report.converted.push(output);
            }
            Err(err) => {
                error!("{:#}", err);
                report.failed.push((input.clone(), err));
            }
        }
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Color, Colorspace};

    #[test]
    fn output_path_replaces_extension() {
        let out = Path::new("/tmp/out");
        assert_eq!(
            output_path(Path::new("/data/photo.qoi"), out),
            Path::new("/tmp/out/photo.png")
        );
        assert_eq!(
            output_path(Path::new("/data/v1.2.QOI"), out),
            Path::new("/tmp/out/v1.2.png")
        );
    }

    #[test]
    fn extension_case_clash_is_reported() {
        let dir = std::env::temp_dir().join(format!("qoi-convert-unit-{}-clash", std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        let mut bytes = b"qoif\0\0\0\x01\0\0\0\x01\x04\0".to_vec();
        bytes.extend_from_slice(&[0xff, 9, 8, 7, 6]);
        fs::write(dir.join("a.qoi"), &bytes).unwrap();
        fs::write(dir.join("a.QOI"), &bytes).unwrap();

        let report = convert_dir(&Options::new(&dir)).unwrap();
        assert_eq!(report.converted, [dir.join("converted").join("a.png")]);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0, dir.join("a.qoi"));
        assert!(report.failed[0].1.to_string().contains("would overwrite"));

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn default_output_dir() {
        let options = Options::new("/data");
        assert_eq!(options.output_dir(), Path::new("/data/converted"));
    }

    #[test]
    fn rgba_image_matches_pixels() {
        let pixels = vec![
            Color::rgba(1, 2, 3, 4),
            Color::rgba(5, 6, 7, 8),
            Color::rgba(9, 10, 11, 12),
            Color::rgba(13, 14, 15, 16),
            Color::rgba(17, 18, 19, 20),
            Color::rgba(21, 22, 23, 24),
        ];
        let image = Image::from_pixels(2, 3, Colorspace::Srgb, pixels).unwrap();
        let rgba = RgbaImage::from(&image);
        assert_eq!(rgba.dimensions(), (2, 3));
        assert_eq!(rgba.get_pixel(1, 0), &Rgba([5, 6, 7, 8]));
        assert_eq!(rgba.get_pixel(0, 2), &Rgba([17, 18, 19, 20]));
    }
}
