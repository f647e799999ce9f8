use std::path::Path;

/// File-level facts shown in the info panel.
#[derive(Debug, Clone, PartialEq)]
pub struct FileInfo {
    pub filename: String,
    pub file_size: u64,
    pub dimensions: Option<(u32, u32)>,
    pub date_modified: Option<String>,
}

/// One EXIF tag as `(name, displayed value)`.
#[derive(Debug, Clone, PartialEq)]
pub struct ExifEntry {
    pub tag: String,
    pub value: String,
}

pub fn read_file_info(path: &Path) -> FileInfo {
    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();

    let fs_meta = std::fs::metadata(path).ok();
    let file_size = fs_meta.as_ref().map(|m| m.len()).unwrap_or(0);
    let date_modified = fs_meta
        .as_ref()
        .and_then(|m| m.modified().ok())
        .map(format_system_time);

    FileInfo {
        filename,
        file_size,
        dimensions: image::image_dimensions(path).ok(),
        date_modified,
    }
}

/// Every EXIF field in the file, in file order. `None` when the file carries
/// no EXIF block or it can't be parsed.
pub fn read_exif_entries(path: &Path) -> Option<Vec<ExifEntry>> {
    let file = std::fs::File::open(path).ok()?;
    let mut reader = std::io::BufReader::new(file);
    let exif = match exif::Reader::new().read_from_container(&mut reader) {
        Ok(exif) => exif,
        Err(e) => {
            log::debug!("No EXIF in {}: {}", path.display(), e);
            return None;
        }
    };

    let entries: Vec<ExifEntry> = exif
        .fields()
        .map(|f| {
            let tag = if f.ifd_num == exif::In::PRIMARY {
                f.tag.to_string()
            } else {
                format!("{} ({})", f.tag, f.ifd_num)
            };
            ExifEntry {
                tag,
                value: f.display_value().with_unit(&exif).to_string(),
            }
        })
        .collect();
    if entries.is_empty() { None } else { Some(entries) }
}

fn format_system_time(time: std::time::SystemTime) -> String {
    let duration = time
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default();
    let secs = duration.as_secs() as i64;

    let days = secs / 86400;
    let time_of_day = secs % 86400;
    let hours = time_of_day / 3600;
    let minutes = (time_of_day % 3600) / 60;
    let seconds = time_of_day % 60;

    let (year, month, day) = days_to_date(days);
    format!(
        "{:04}-{:02}-{:02} {:02}:{:02}:{:02}",
        year, month, day, hours, minutes, seconds
    )
}

// Civil date from days since 1970-01-01 (Howard Hinnant's algorithm).
fn days_to_date(mut days: i64) -> (i64, i64, i64) {
    days += 719468;
    let era = if days >= 0 { days } else { days - 146096 } / 146097;
    let doe = days - era * 146097;
    let yoe = (doe - doe / 1460 + doe / 36524 - doe / 146096) / 365;
    let y = yoe + era * 400;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let d = doy - (153 * mp + 2) / 5 + 1;
    let m = if mp < 10 { mp + 3 } else { mp - 9 };
    let y = if m <= 2 { y + 1 } else { y };
    (y, m, d)
}

pub fn format_file_size(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else if bytes < 1024 * 1024 * 1024 {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    } else {
        format!("{:.2} GB", bytes as f64 / (1024.0 * 1024.0 * 1024.0))
    }
}
