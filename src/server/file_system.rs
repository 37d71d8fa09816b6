use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};
use tracing::debug;
use crate::config::Config;
use super::cgi::{cgi_arguments, Invocation};
use super::content_manager::{Content, ContentError, ContentKind, ContentManager, Fallback};
use super::http::InboundRequest;

#[derive(Debug)]
pub struct ResolvedTarget {
    pub path: PathBuf,
    pub file_name: String,
    pub kind: ContentKind
}

/// Serves a web root: static files are read, delegated files are run.
pub struct FileSystemAdapter {
    root: PathBuf,
    port: u16,
    delegate_extension: String,
    launcher: Vec<String>,
    not_found_page: String,
    not_supported_page: String
}

impl FileSystemAdapter {
    pub fn new(config: &Config) -> FileSystemAdapter {
        // Delegated programs get an absolute path even if the root was given relative.
        let root = fs::canonicalize(&config.web_root).unwrap_or_else(|_| config.web_root.clone());
        FileSystemAdapter {
            root,
            port: config.port,
            delegate_extension: config.delegate_extension.to_lowercase(),
            launcher: config.launcher.clone(),
            not_found_page: config.not_found_page.clone(),
            not_supported_page: config.not_supported_page.clone()
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Maps a request path onto a regular file under the root.
    pub fn resolve(&self, url: &str) -> Result<ResolvedTarget, ContentError> {
        let mut path = self.root.clone();
        for component in Path::new(url.trim_start_matches('/')).components() {
            match component {
                Component::Normal(part) => path.push(part),
                Component::CurDir => {},
                _ => {
                    debug!("rejecting {} outside the web root", url);
                    return Err(ContentError::NotFound(PathBuf::from(url)));
                }
            }
        }

        match fs::metadata(&path) {
            Ok(md) if md.is_file() => {},
            Ok(_) => return Err(ContentError::NotFound(path)),
            Err(e) => {
                debug!("error finding file {}:{}", path.display(), e);
                return Err(ContentError::NotFound(path));
            }
        }

        let file_name = path.file_name()
            .map(|name| name.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        let kind = ContentKind::from_file_name(&file_name, &self.delegate_extension);
        Ok(ResolvedTarget { path, file_name, kind })
    }

    fn read_file(&self, path: &Path) -> Result<Vec<u8>, ContentError> {
        match fs::read(path) {
            Ok(data) => Ok(data),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Err(ContentError::NotFound(path.to_path_buf())),
            Err(e) => Err(ContentError::Io { path: path.to_path_buf(), source: e })
        }
    }
}

impl ContentManager for FileSystemAdapter {
    fn find_content(&self, request: &InboundRequest) -> Result<Content, ContentError> {
        let target = self.resolve(&request.path)?;
        debug!("loading {} as {:?}", target.file_name, target.kind);

        let body = match target.kind {
            ContentKind::Delegated => {
                let invocation = Invocation::new(&self.launcher, &target.path, cgi_arguments(request, self.port), &self.root);
                invocation.run()?
            },
            _ => self.read_file(&target.path)?
        };
        Ok(Content { content_type: target.kind.mime_type(), body })
    }

    fn fallback_page(&self, which: Fallback) -> io::Result<Vec<u8>> {
        let name = match which {
            Fallback::NotFound => &self.not_found_page,
            Fallback::NotSupported => &self.not_supported_page
        };
        fs::read(self.root.join(name))
    }
}

#[cfg(test)]
mod tests {
    use super::FileSystemAdapter;
    use crate::config::Config;
    use crate::server::content_manager::{ContentError, ContentKind, ContentManager, Fallback};
    use crate::server::http::{InboundRequest, Method};
    use std::fs;
    use tempfile::TempDir;

    fn web_root() -> TempDir {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("index.html"), "<h1>home</h1>").unwrap();
        fs::write(dir.path().join("404.html"), "missing").unwrap();
        fs::create_dir(dir.path().join("img")).unwrap();
        fs::write(dir.path().join("img").join("logo.png"), [0x89u8, 0x50, 0x4e, 0x47]).unwrap();
        dir
    }

    fn get(path: &str) -> InboundRequest {
        InboundRequest {
            method: Method::Get,
            path: path.to_string(),
            arguments: Vec::new(),
            host: "localhost".to_string(),
            referer: String::new(),
            user_agent: String::new()
        }
    }

    #[test]
    fn resolves_nested_file() {
        let dir = web_root();
        let adapter = FileSystemAdapter::new(&Config::new(dir.path().to_path_buf()));
        let target = adapter.resolve("/img/logo.png").unwrap();
        assert_eq!("logo.png", target.file_name);
        assert_eq!(ContentKind::Png, target.kind);
        assert!(target.path.starts_with(adapter.root()));
    }

    #[test]
    fn missing_file_and_directories_are_not_found() {
        let dir = web_root();
        let adapter = FileSystemAdapter::new(&Config::new(dir.path().to_path_buf()));
        assert!(matches!(adapter.resolve("/nope.html"), Err(ContentError::NotFound(_))));
        assert!(matches!(adapter.resolve("/img"), Err(ContentError::NotFound(_))));
    }

    #[test]
    fn parent_components_are_rejected() {
        let dir = web_root();
        let adapter = FileSystemAdapter::new(&Config::new(dir.path().join("img")));
        assert!(matches!(adapter.resolve("/../index.html"), Err(ContentError::NotFound(_))));
    }

    #[test]
    fn static_content_has_file_bytes() {
        let dir = web_root();
        let adapter = FileSystemAdapter::new(&Config::new(dir.path().to_path_buf()));
        let content = adapter.find_content(&get("/index.html")).unwrap();
        assert_eq!("text/html", content.content_type);
        assert_eq!(b"<h1>home</h1>".to_vec(), content.body);
    }

    #[test]
    fn fallback_pages_come_from_root() {
        let dir = web_root();
        let adapter = FileSystemAdapter::new(&Config::new(dir.path().to_path_buf()));
        assert_eq!(b"missing".to_vec(), adapter.fallback_page(Fallback::NotFound).unwrap());
        assert!(adapter.fallback_page(Fallback::NotSupported).is_err());
    }

    #[cfg(unix)]
    #[test]
    fn delegated_content_is_program_output() {
        let dir = web_root();
        fs::write(dir.path().join("hello.cgi"), "printf 'hi %s on %s' \"$1\" \"$3\"").unwrap();
        let mut config = Config::new(dir.path().to_path_buf());
        config.port = 4242;
        config.launcher = vec!["sh".to_string()];
        let adapter = FileSystemAdapter::new(&config);

        let content = adapter.find_content(&get("/hello.cgi")).unwrap();
        assert_eq!("text/html", content.content_type);
        assert_eq!(b"hi GET on 4242".to_vec(), content.body);
    }
}
