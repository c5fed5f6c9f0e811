//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use site_router::manifest::{Manifest, ManifestEntry};
use site_router::storage::MemoryStore;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;

pub const PRODUCTION_DOMAIN: &str = "site.example";

/// One published object: storage key, bytes, content type.
pub struct Object {
    pub key: String,
    pub bytes: Vec<u8>,
    pub content_type: &'static str,
}

/// A small two-build site: `main` and preview `pr-7`.
pub struct Fixture {
    pub manifests: Vec<(String, Manifest)>,
    pub blobs: Vec<Object>,
}

impl Fixture {
    pub fn site() -> Self {
        let home = b"<h1>Home</h1>".to_vec();
        let about = b"<h1>About</h1>".to_vec();
        let css = b"body{margin:0}".to_vec();
        let preview_home = b"<h1>Preview</h1>".to_vec();

        let main: Manifest = [
            ("/".to_string(), ManifestEntry::new("h1", "blobs/h1.html", home.len() as u64)),
            ("/style.css".to_string(), ManifestEntry::new("h3", "blobs/h3.css", css.len() as u64)),
        ]
        .into_iter()
        .collect();

        let preview: Manifest = [
            ("/".to_string(), ManifestEntry::new("h4", "blobs/h4.html", preview_home.len() as u64)),
            ("/about.html".to_string(), ManifestEntry::new("h2", "blobs/h2.html", about.len() as u64)),
            ("/docs/index.html".to_string(), ManifestEntry::new("h1", "blobs/h1.html", home.len() as u64)),
            ("/orphan".to_string(), ManifestEntry::new("h9", "blobs/h9.html", 10)),
        ]
        .into_iter()
        .collect();

        Self {
            manifests: vec![("main".to_string(), main), ("pr-7".to_string(), preview)],
            blobs: vec![
                Object { key: "blobs/h1.html".into(), bytes: home, content_type: "text/html" },
                Object { key: "blobs/h2.html".into(), bytes: about, content_type: "text/html" },
                Object { key: "blobs/h3.css".into(), bytes: css, content_type: "text/css" },
                Object { key: "blobs/h4.html".into(), bytes: preview_home, content_type: "text/html" },
            ],
        }
    }

    /// Publish into an in-memory store.
    pub fn publish(&self, store: &MemoryStore) {
        for (build_id, manifest) in &self.manifests {
            store.put_manifest(build_id, manifest);
        }
        for blob in &self.blobs {
            store.put_blob(&blob.key, blob.bytes.clone(), Some(blob.content_type));
        }
    }

    /// Every object keyed the way the bucket lays it out.
    pub fn objects(&self) -> HashMap<String, (Vec<u8>, &'static str)> {
        let mut objects = HashMap::new();
        for (build_id, manifest) in &self.manifests {
            let json = serde_json::to_vec(manifest).unwrap();
            objects.insert(format!("manifests/{build_id}.json"), (json, "application/json"));
        }
        for blob in &self.blobs {
            objects.insert(blob.key.clone(), (blob.bytes.clone(), blob.content_type));
        }
        objects
    }

    /// Write the bucket layout under a fresh temp directory.
    pub fn write_bucket(&self) -> TempBucket {
        let root = std::env::temp_dir().join(format!("site-router-it-{}", uuid::Uuid::new_v4()));
        for (key, (bytes, _)) in self.objects() {
            let path = root.join(&key);
            std::fs::create_dir_all(path.parent().unwrap()).unwrap();
            std::fs::write(path, bytes).unwrap();
        }
        TempBucket { root }
    }
}

/// Temp bucket directory removed on drop.
pub struct TempBucket {
    root: PathBuf,
}

impl TempBucket {
    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl Drop for TempBucket {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.root);
    }
}

/// Start a minimal HTTP origin serving `objects` by path, 404 otherwise.
pub async fn start_bucket_origin(objects: HashMap<String, (Vec<u8>, &'static str)>) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let objects = Arc::new(objects);

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((socket, _)) => {
                    let objects = objects.clone();
                    tokio::spawn(async move {
                        let (read, mut write) = socket.into_split();
                        let mut lines = BufReader::new(read).lines();
                        let Ok(Some(request_line)) = lines.next_line().await else {
                            return;
                        };
                        // Drain headers
                        while let Ok(Some(line)) = lines.next_line().await {
                            if line.is_empty() {
                                break;
                            }
                        }

                        let path = request_line.split_whitespace().nth(1).unwrap_or("/");
                        let key = path.trim_start_matches('/');
                        let response = match objects.get(key) {
                            Some((bytes, content_type)) => {
                                let mut response = format!(
                                    "HTTP/1.1 200 OK\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                                    content_type,
                                    bytes.len()
                                )
                                .into_bytes();
                                response.extend_from_slice(bytes);
                                response
                            }
                            None => b"HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\nConnection: close\r\n\r\n".to_vec(),
                        };
                        let _ = write.write_all(&response).await;
                        let _ = write.shutdown().await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    addr
}
