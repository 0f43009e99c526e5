#![allow(dead_code)]

use std::collections::HashMap;
use std::fs;
use std::io::{Cursor, Write};
use std::thread;

use sumverify::{hash_dir, ArchiveFetcher, FetchError, FetchedArchive, HttpFetcher};
use tempfile::TempDir;
use tiny_http::{Response, Server, StatusCode};
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

/// Build a zip with every file placed under `root/`
pub fn module_zip(root: &str, files: &[(&str, &str)]) -> Vec<u8> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    writer
        .add_directory(format!("{}/", root), SimpleFileOptions::default())
        .unwrap();
    for (name, contents) in files {
        writer
            .start_file(format!("{}/{}", root, name), SimpleFileOptions::default())
            .unwrap();
        writer.write_all(contents.as_bytes()).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

/// Digest of `files` laid out on disk directly, independent of extraction
pub fn expected_digest(prefix: &str, files: &[(&str, &str)]) -> String {
    let temp_dir = TempDir::new().unwrap();
    for (name, contents) in files {
        let path = temp_dir.path().join(name);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }
    hash_dir(temp_dir.path(), prefix).unwrap().to_string()
}

/// Serves archives from memory keyed by `path@version`
#[derive(Default)]
pub struct MemoryFetcher {
    archives: HashMap<String, Vec<u8>>,
}

impl MemoryFetcher {
    pub fn with(mut self, id: &str, bytes: Vec<u8>) -> Self {
        self.archives.insert(id.to_string(), bytes);
        self
    }
}

impl ArchiveFetcher for MemoryFetcher {
    fn fetch(&self, module_path: &str, version: &str) -> Result<FetchedArchive, FetchError> {
        let id = format!("{}@{}", module_path, version);
        match self.archives.get(&id) {
            Some(bytes) => Ok(FetchedArchive {
                url: format!("memory://{}", id),
                bytes: bytes.clone(),
            }),
            None => Err(FetchError::NotFound(id)),
        }
    }
}

/// Fetches `<base>/<path>/@v/<version>.zip` through a real HTTP client
pub struct MirrorFetcher {
    pub http: HttpFetcher,
    pub base: String,
}

impl ArchiveFetcher for MirrorFetcher {
    fn fetch(&self, module_path: &str, version: &str) -> Result<FetchedArchive, FetchError> {
        self.http
            .fetch_url(&format!("{}/{}/@v/{}.zip", self.base, module_path, version))
    }
}

/// Start a local server answering `requests` requests from `routes`
/// (URL path -> body); unknown paths get a 404.
pub fn serve(routes: HashMap<String, Vec<u8>>, requests: usize) -> (String, thread::JoinHandle<()>) {
    let server = Server::http("127.0.0.1:0").unwrap();
    let addr = server.server_addr().to_ip().unwrap();

    let handle = thread::spawn(move || {
        for _ in 0..requests {
            let Ok(request) = server.recv() else { break };
            let response = match routes.get(request.url()) {
                Some(body) => Response::from_data(body.clone()),
                None => Response::from_data(b"not found".to_vec()).with_status_code(StatusCode(404)),
            };
            let _ = request.respond(response);
        }
    });

    (format!("http://{}", addr), handle)
}
