use std::path::Path;

use hma_post::io::Format;

pub fn input(path: &Path) -> Option<Format> {
    // Only the raw layout lives in a directory.
    if path.is_dir() {
        return Some(Format::Raw);
    }

    let name = path.file_name()?.to_str()?.to_lowercase();
    if name.starts_with("outcar") {
        return Some(Format::Outcar);
    }
    if name.ends_with(".xml") {
        return Some(Format::Vasprun);
    }
    None
}
