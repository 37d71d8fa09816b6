//! Starter fallback pages for a fresh web root.

use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use crate::config::Config;

const NOT_FOUND_PAGE: &str = r#"<!DOCTYPE html>
<html>
    <head>
        <title>404 - Not found</title>
    </head>
    <body>
        <h1>404 - Not found</h1>
        <p>The requested page could not be found on the server</p>
        <hr>
        <em>rust-cgi-server on {os}.</em>
    </body>
</html>
"#;

const NOT_SUPPORTED_PAGE: &str = r#"<!DOCTYPE html>
<html>
    <head>
        <title>501 - Not implemented</title>
    </head>
    <body>
        <h1>501 - Not implemented</h1>
        <p>The request method is not supported by the server</p>
        <hr>
        <em>rust-cgi-server on {os}.</em>
    </body>
</html>
"#;

/// Writes the 404 and not-supported pages into the web root. Pages that
/// already exist are left alone. Returns the files written.
pub fn configure(config: &Config) -> io::Result<Vec<PathBuf>> {
    let pages = [
        (&config.not_found_page, NOT_FOUND_PAGE),
        (&config.not_supported_page, NOT_SUPPORTED_PAGE)
    ];
    let mut written = Vec::new();
    for (name, template) in pages.iter() {
        let path = config.web_root.join(name);
        if write_new(&path, &template.replace("{os}", std::env::consts::OS))? {
            written.push(path);
        }
    }
    Ok(written)
}

fn write_new(path: &Path, contents: &str) -> io::Result<bool> {
    match OpenOptions::new().write(true).create_new(true).open(path) {
        Ok(mut file) => {
            file.write_all(contents.as_bytes())?;
            Ok(true)
        },
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => Ok(false),
        Err(e) => Err(e)
    }
}

#[cfg(test)]
mod tests {
    use super::configure;
    use crate::config::Config;
    use std::fs;

    #[test]
    fn writes_missing_pages_only() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("404.html"), "custom").unwrap();
        let config = Config::new(dir.path().to_path_buf());

        let written = configure(&config).unwrap();

        assert_eq!(vec![dir.path().join("not_supported.html")], written);
        assert_eq!("custom", fs::read_to_string(dir.path().join("404.html")).unwrap());
        let page = fs::read_to_string(dir.path().join("not_supported.html")).unwrap();
        assert!(page.contains("501 - Not implemented"));
        assert!(!page.contains("{os}"));
    }
}
